//! Error types for the filter core
//!
//! Two families, mirroring how failures surface to the user: `ScanError`
//! aborts the whole run, `DirectiveError` is rendered as an inline marker in
//! the output stream and echoed to the diagnostic stream while the scan
//! continues.

use std::fmt;
use std::path::PathBuf;

/// Fatal errors: the scan cannot continue and the process exits nonzero.
#[derive(Debug)]
pub enum ScanError {
    /// The root or an included input file could not be read.
    UnreadableFile { path: PathBuf, reason: String },
    /// The expansion token pattern could not be compiled.
    BadTokenPattern(String),
    /// A directive result variable was bound a second time during the scan.
    VariableRedefined {
        name: String,
        file: String,
        line: usize,
    },
    /// An included file was not found in any configured include path.
    IncludeNotFound { name: String },
    /// A generated artifact could not be written.
    OutputWrite { path: PathBuf, reason: String },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::UnreadableFile { path, reason } => {
                write!(f, "unable to read file {}: {}", path.display(), reason)
            }
            ScanError::BadTokenPattern(detail) => {
                write!(f, "invalid variable token pattern: {}", detail)
            }
            ScanError::VariableRedefined { name, file, line } => {
                write!(
                    f,
                    "result variable '{}' previously defined ({}:{})",
                    name, file, line
                )
            }
            ScanError::IncludeNotFound { name } => {
                write!(f, "unable to find file '{}'", name)
            }
            ScanError::OutputWrite { path, reason } => {
                write!(f, "unable to write {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for ScanError {}

/// Directive-level errors: reported inline, never fatal to the scan.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveError {
    /// No builtin and no external executable matched the directive name.
    UnknownFunction(String),
    /// An external candidate exists but is not a regular executable file.
    NotExecutable(PathBuf),
    /// A supplied named argument matched no declared option alias.
    UnknownOption { directive: String, option: String },
    /// Wrong number of positional arguments.
    WrongArity {
        directive: String,
        expected: usize,
        got: usize,
    },
    /// Parallel list options disagree on length (e.g. headings vs. columns).
    ListLengthMismatch {
        directive: String,
        option: String,
        expected: usize,
        got: usize,
    },
    /// A conditional expression did not reduce to a single boolean.
    MalformedExpression(String),
    /// A directive call did not follow the call grammar.
    MalformedCall { directive: String, detail: String },
    /// A shell or external command failed to spawn or exited nonzero.
    CommandFailed { command: String, detail: String },
    /// A searched file was not found in any include path.
    FileNotFound { name: String },
    /// The configured file-not-found tolerance was exceeded.
    TooManyMissingFiles { count: u32, limit: u32 },
    /// The opt-in expansion pass ceiling was exceeded.
    ExpansionOverflow { passes: usize },
}

impl fmt::Display for DirectiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveError::UnknownFunction(name) => {
                write!(f, "unknown function '{}'", name)
            }
            DirectiveError::NotExecutable(path) => {
                write!(f, "'{}' is not an executable file", path.display())
            }
            DirectiveError::UnknownOption { directive, option } => {
                write!(f, "{}: unrecognized option '{}'", directive, option)
            }
            DirectiveError::WrongArity {
                directive,
                expected,
                got,
            } => {
                write!(
                    f,
                    "{}: expected {} positional argument(s), got {}",
                    directive, expected, got
                )
            }
            DirectiveError::ListLengthMismatch {
                directive,
                option,
                expected,
                got,
            } => {
                write!(
                    f,
                    "{}: option '{}' lists {} value(s), expected {}",
                    directive, option, got, expected
                )
            }
            DirectiveError::MalformedExpression(detail) => {
                write!(f, "malformed expression: {}", detail)
            }
            DirectiveError::MalformedCall { directive, detail } => {
                write!(f, "{}: malformed call: {}", directive, detail)
            }
            DirectiveError::CommandFailed { command, detail } => {
                write!(f, "command '{}' failed: {}", command, detail)
            }
            DirectiveError::FileNotFound { name } => {
                write!(f, "file not found: '{}'", name)
            }
            DirectiveError::TooManyMissingFiles { count, limit } => {
                write!(
                    f,
                    "{} file(s) not found, exceeds tolerance of {}",
                    count, limit
                )
            }
            DirectiveError::ExpansionOverflow { passes } => {
                write!(
                    f,
                    "variable expansion did not settle after {} passes",
                    passes
                )
            }
        }
    }
}

impl std::error::Error for DirectiveError {}
