//! word — select one field of a separator-joined list.

use crate::directives::split_list;
use crate::dispatch::{Directive, DirectiveCall};
use crate::error::DirectiveError;

pub struct Word;

impl Directive for Word {
    fn name(&self) -> &str {
        "word"
    }

    fn description(&self) -> &str {
        "Select the n-th field of a separator-joined list"
    }

    fn options(&self) -> &[&[&str]] {
        &[&["index", "i"], &["separator", "s"]]
    }

    fn evaluate(&self, call: &mut DirectiveCall<'_>) -> Result<String, DirectiveError> {
        let positionals = call.positionals();
        if positionals.len() != 1 {
            return Err(DirectiveError::WrongArity {
                directive: "word".to_string(),
                expected: 1,
                got: positionals.len(),
            });
        }
        let list = call.expand(positionals[0])?;
        let separator = call
            .args
            .arg_firstof(&call.env.field_separator, &["separator", "s"])
            .to_string();
        let index_text = call.args.arg_firstof("1", &["index", "i"]).to_string();
        let index: usize = index_text
            .parse()
            .map_err(|_| DirectiveError::MalformedCall {
                directive: "word".to_string(),
                detail: format!("index '{}' is not a number", index_text),
            })?;

        // 1-based; out of range selects nothing.
        let fields = split_list(&list, &separator);
        Ok(fields
            .get(index.wrapping_sub(1))
            .map(|f| f.to_string())
            .unwrap_or_default())
    }
}
