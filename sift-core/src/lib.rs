//! # sift-core
//!
//! Core library for sift, a documentation-preprocessing input filter. It
//! scans comment-annotated source text, evaluates `\sift_*` directives
//! (text substitution, shell invocation, table/image generation, file
//! search, variable expansion, conditionals, nested inclusion), and
//! rewrites the stream for a documentation generator while keeping output
//! line numbers aligned with the input.
//!
//! The pieces, leaf first:
//!
//! - [`varmap`] — `${NAME}` variables with escape-aware fixed-point
//!   expansion, in global and per-invocation local scopes.
//! - [`args`] — positional/named/flag argument terms with first-match-wins
//!   alias lookup.
//! - [`expr`] — the boolean stack machine behind conditional guards.
//! - [`dispatch`] — directive resolution: builtins, then external
//!   executables, then an inline unknown-function error.
//! - [`scanner`] — the front end driving all of the above over the token
//!   stream, plus include handling and line padding.
//! - [`extract`] — the parallel scope-tracking script splitter.

#![allow(rustdoc::invalid_html_tags)]

pub mod args;
pub mod directives;
pub mod dispatch;
pub mod error;
pub mod exec;
pub mod expr;
pub mod extract;
pub mod paths;
pub mod scanner;
pub mod varmap;

pub use args::{Arg, ArgList};
pub use dispatch::{Directive, DirectiveCall, DirectiveRegistry, RunEnv};
pub use error::{DirectiveError, ScanError};
pub use extract::{ExtractConfig, ExtractReport};
pub use scanner::Scanner;
pub use varmap::{ExpandError, ExpandPolicy, VarMap};
