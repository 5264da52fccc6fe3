//! shell — run a command line and capture its output.

use crate::directives::flag_enabled;
use crate::dispatch::{Directive, DirectiveCall};
use crate::error::DirectiveError;
use crate::exec;

pub struct Shell;

impl Directive for Shell {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Run the positional text as a shell command, capturing stdout"
    }

    fn options(&self) -> &[&[&str]] {
        &[&["stderr", "s"], &["trim", "t"]]
    }

    fn evaluate(&self, call: &mut DirectiveCall<'_>) -> Result<String, DirectiveError> {
        let positionals = call.positionals();
        if positionals.is_empty() {
            return Err(DirectiveError::WrongArity {
                directive: "shell".to_string(),
                expected: 1,
                got: 0,
            });
        }
        let command_line = call.expand(&positionals.join(" "))?;
        let with_stderr = flag_enabled(call.args.arg_firstof("0", &["stderr", "s"]));
        let trim = flag_enabled(call.args.arg_firstof("0", &["trim", "t"]));

        let captured = exec::capture_shell(&call.env.shell, &command_line)?;
        let mut output = captured.stdout;
        if with_stderr {
            output.push_str(&captured.stderr);
        }
        if trim {
            while output.ends_with('\n') || output.ends_with('\r') {
                output.pop();
            }
        }
        Ok(output)
    }
}
