//! eval — expand text in a scratch scope.
//!
//! Named arguments are stored into the local scope (never the global map),
//! then the positional arguments are expanded in that scope and joined with
//! single spaces. `\sift_eval ( a=1 b=2 ${a}${b} )` yields `12`.

use crate::dispatch::{Directive, DirectiveCall};
use crate::error::DirectiveError;

pub struct Eval;

impl Directive for Eval {
    fn name(&self) -> &str {
        "eval"
    }

    fn description(&self) -> &str {
        "Expand positional text with named arguments bound in the local scope"
    }

    fn allows_unknown_options(&self) -> bool {
        true
    }

    fn evaluate(&self, call: &mut DirectiveCall<'_>) -> Result<String, DirectiveError> {
        let bindings: Vec<(String, String)> = call
            .args
            .terms()
            .iter()
            .filter(|t| !t.positional)
            .map(|t| (t.name.clone(), t.value.clone()))
            .collect();
        for (name, value) in bindings {
            let expanded = call.expand(&value)?;
            call.local.store(name, expanded);
        }

        let positionals: Vec<String> =
            call.positionals().iter().map(|v| v.to_string()).collect();
        let mut parts = Vec::with_capacity(positionals.len());
        for value in positionals {
            parts.push(call.expand(&value)?);
        }
        Ok(parts.join(" "))
    }
}
