//! copy — resolve files and copy them into the output directory.

use crate::dispatch::{Directive, DirectiveCall};
use crate::error::DirectiveError;
use crate::paths;

pub struct Copy;

impl Directive for Copy {
    fn name(&self) -> &str {
        "copy"
    }

    fn description(&self) -> &str {
        "Copy the named files into the output directory"
    }

    fn evaluate(&self, call: &mut DirectiveCall<'_>) -> Result<String, DirectiveError> {
        let positionals = call.positionals();
        if positionals.is_empty() {
            return Err(DirectiveError::WrongArity {
                directive: "copy".to_string(),
                expected: 1,
                got: 0,
            });
        }
        let names: Vec<String> = positionals.iter().map(|v| v.to_string()).collect();

        paths::ensure_dir(&call.env.output_dir).map_err(|e| DirectiveError::CommandFailed {
            command: "copy".to_string(),
            detail: e.to_string(),
        })?;

        let mut copied = Vec::new();
        for name in names {
            let name = call.expand(&name)?;
            let Some(source) = paths::search(&name, &call.env.include_paths) else {
                call.env.record_missing()?;
                continue;
            };
            let base = source
                .file_name()
                .map(|b| b.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.clone());
            let target = call.env.output_dir.join(&base);
            std::fs::copy(&source, &target).map_err(|e| DirectiveError::CommandFailed {
                command: format!("copy {}", source.display()),
                detail: e.to_string(),
            })?;
            copied.push(base);
        }
        Ok(copied.join(" "))
    }
}
