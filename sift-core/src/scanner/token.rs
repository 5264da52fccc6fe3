//! Outer tokenization for the scanner
//!
//! The raw source is tokenized into coarse lexical classes: comment
//! delimiters, directive starts, newlines, and plain text runs. Everything
//! the scanner does not rewrite is copied through from the token slices
//! verbatim, so the token set must cover every input byte.

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    #[token("/*")]
    BlockOpen,

    #[token("*/")]
    BlockClose,

    #[token("//")]
    LineOpen,

    /// A backslash-introduced word, potentially a namespaced directive.
    #[regex(r"\\[A-Za-z_][A-Za-z0-9_]*")]
    Directive,

    #[token("\n")]
    Newline,

    /// Any run of characters with no lexical significance.
    #[regex(r"[^/*\\\n]+")]
    Text,

    #[token("/")]
    Slash,

    #[token("*")]
    Star,

    #[token("\\")]
    Backslash,
}
