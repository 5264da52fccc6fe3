//! Blocking subprocess capture
//!
//! Shell-style directives and external functions run to completion before
//! the scan resumes; there is no timeout or cancellation. A hung command
//! hangs the filter run.

use std::path::Path;
use std::process::Command;

use crate::error::DirectiveError;

/// Captured output of a finished command.
#[derive(Debug)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
}

/// Run `program` with `args`, capturing stdout and stderr. Spawn failure or
/// a nonzero exit is a directive-level error.
pub fn capture(program: &Path, args: &[String]) -> Result<Captured, DirectiveError> {
    let display = program.display().to_string();
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| DirectiveError::CommandFailed {
            command: display.clone(),
            detail: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(DirectiveError::CommandFailed {
            command: display,
            detail: format!(
                "exit status {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(Captured {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run a command line through the shell, as the `shell` directive does.
pub fn capture_shell(shell: &Path, command_line: &str) -> Result<Captured, DirectiveError> {
    let output = Command::new(shell)
        .arg("-c")
        .arg(command_line)
        .output()
        .map_err(|e| DirectiveError::CommandFailed {
            command: command_line.to_string(),
            detail: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(DirectiveError::CommandFailed {
            command: command_line.to_string(),
            detail: format!(
                "exit status {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(Captured {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// `true` when the path names a regular file the current user may execute.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    meta.is_file() && has_exec_bit(&meta)
}

#[cfg(unix)]
fn has_exec_bit(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_exec_bit(_meta: &std::fs::Metadata) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh() -> PathBuf {
        which::which("sh").expect("sh available in test environment")
    }

    #[test]
    fn capture_shell_stdout() {
        let out = capture_shell(&sh(), "echo hello").unwrap();
        assert_eq!(out.stdout, "hello\n");
    }

    #[test]
    fn nonzero_exit_is_command_failed() {
        let err = capture_shell(&sh(), "exit 3").unwrap_err();
        match err {
            DirectiveError::CommandFailed { detail, .. } => assert!(detail.contains("3")),
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[test]
    fn missing_program_is_command_failed() {
        let err = capture(Path::new("/nonexistent/sift-no-such-tool"), &[]).unwrap_err();
        assert!(matches!(err, DirectiveError::CommandFailed { .. }));
    }

    #[test]
    fn shell_is_executable() {
        assert!(is_executable(&sh()));
        assert!(!is_executable(Path::new("/nonexistent/sift-no-such-tool")));
    }
}
