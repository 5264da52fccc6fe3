//! Variable map and recursive text expansion
//!
//! A `VarMap` stores string-valued variables and expands `${NAME}`-style
//! references. `expand_text` runs the scan to a fixed point so that a
//! variable's value may itself contain references, while `\${NAME}` defers
//! expansion: the escape survives one whole call and is stripped at the end,
//! so the literal token is only expanded if a *later* call sees it.
//!
//! There is deliberately no cycle guard by default: a variable whose value
//! expands to itself loops forever, which is treated as an authoring error.
//! `ExpandPolicy::max_passes` is an opt-in ceiling for callers that want a
//! distinguishable error instead.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DirectiveError, ScanError};

/// Variable names: a word starting with a letter or underscore.
const NAME_PATTERN: &str = r"[A-Za-z_][A-Za-z0-9_]*";

/// Failure inside a single `expand_text` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    /// The opt-in pass ceiling was hit before expansion settled.
    Ceiling { passes: usize },
}

impl fmt::Display for ExpandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpandError::Ceiling { passes } => {
                write!(f, "expansion did not settle after {} passes", passes)
            }
        }
    }
}

impl std::error::Error for ExpandError {}

impl From<ExpandError> for DirectiveError {
    fn from(err: ExpandError) -> Self {
        match err {
            ExpandError::Ceiling { passes } => DirectiveError::ExpansionOverflow { passes },
        }
    }
}

/// How tokens and their escaped forms are written and un-escaped.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandPolicy {
    /// Token opener, e.g. `${`.
    pub prefix: String,
    /// Token closer, e.g. `}`.
    pub suffix: String,
    /// Escaped-token opener, e.g. `\${`.
    pub escape_prefix: String,
    /// Escaped-token closer, e.g. `}`.
    pub escape_suffix: String,
    /// Characters stripped from the front of an escaped match when un-escaping.
    pub escape_prefix_strip: usize,
    /// Characters stripped from the back of an escaped match when un-escaping.
    pub escape_suffix_strip: usize,
    /// Substitute a placeholder for undefined variables.
    pub report_on_miss: bool,
    /// The placeholder substituted when `report_on_miss` is set.
    pub report_message: String,
    /// Opt-in ceiling on expansion passes. `None` means unbounded.
    pub max_passes: Option<usize>,
}

impl Default for ExpandPolicy {
    fn default() -> Self {
        Self {
            prefix: "${".to_string(),
            suffix: "}".to_string(),
            escape_prefix: r"\${".to_string(),
            escape_suffix: "}".to_string(),
            escape_prefix_strip: 1,
            escape_suffix_strip: 0,
            report_on_miss: true,
            report_message: "__undefined__".to_string(),
            max_passes: None,
        }
    }
}

impl ExpandPolicy {
    /// Compile the combined token pattern. The escaped alternative comes
    /// first so it wins leftmost matches over the plain token it contains.
    fn compile(&self) -> Result<Regex, ScanError> {
        let source = format!(
            "(?P<esc>{}{}{})|(?P<tok>{}{}{})",
            regex::escape(&self.escape_prefix),
            NAME_PATTERN,
            regex::escape(&self.escape_suffix),
            regex::escape(&self.prefix),
            NAME_PATTERN,
            regex::escape(&self.suffix),
        );
        Regex::new(&source).map_err(|e| ScanError::BadTokenPattern(e.to_string()))
    }
}

static DEFAULT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    ExpandPolicy::default()
        .compile()
        .expect("default token pattern compiles")
});

/// String-valued variable store with escape-aware recursive expansion.
///
/// One global instance persists for the whole run; each directive invocation
/// clones it into a local scope and mutates only the clone unless it stores
/// back explicitly.
#[derive(Debug, Clone)]
pub struct VarMap {
    policy: ExpandPolicy,
    pattern: Regex,
    vars: HashMap<String, String>,
}

impl Default for VarMap {
    fn default() -> Self {
        Self {
            policy: ExpandPolicy::default(),
            pattern: DEFAULT_PATTERN.clone(),
            vars: HashMap::new(),
        }
    }
}

impl VarMap {
    /// Create a map with the default `${NAME}` / `\${NAME}` policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a map with a custom token policy. Pattern compilation failure
    /// is fatal configuration breakage.
    pub fn with_policy(policy: ExpandPolicy) -> Result<Self, ScanError> {
        let pattern = policy.compile()?;
        Ok(Self {
            policy,
            pattern,
            vars: HashMap::new(),
        })
    }

    pub fn policy(&self) -> &ExpandPolicy {
        &self.policy
    }

    /// The placeholder substituted for undefined variables.
    pub fn report_message(&self) -> &str {
        &self.policy.report_message
    }

    /// Set (or overwrite) a variable. Upserts never fail.
    pub fn store(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Remove a variable. Returns `true` if it existed.
    pub fn unstore(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Expand a single `${NAME}` token to its stored value.
    ///
    /// Absent variables yield the report message when reporting is enabled,
    /// else the empty string. Pure read, no side effects.
    pub fn expand(&self, token: &str) -> String {
        let name = token
            .strip_prefix(self.policy.prefix.as_str())
            .and_then(|t| t.strip_suffix(self.policy.suffix.as_str()))
            .unwrap_or(token);
        match self.vars.get(name) {
            Some(value) => value.clone(),
            None if self.policy.report_on_miss => self.policy.report_message.clone(),
            None => String::new(),
        }
    }

    /// Expand every token in `text`, re-scanning the output until a pass
    /// performs zero substitutions, then strip escapes once.
    ///
    /// Escaped tokens ride through the fixed-point passes untouched and do
    /// not count as substitutions, so `\${X}` comes out as the literal
    /// `${X}` exactly once per call regardless of how many passes the rest
    /// of the text forced.
    pub fn expand_text(&self, text: &str) -> Result<String, ExpandError> {
        let mut current = text.to_string();
        let mut passes = 0usize;
        loop {
            let (next, substitutions) = self.expand_pass(&current);
            current = next;
            if substitutions == 0 {
                break;
            }
            passes += 1;
            if let Some(limit) = self.policy.max_passes {
                if passes >= limit {
                    return Err(ExpandError::Ceiling { passes });
                }
            }
        }
        Ok(self.strip_escapes(&current))
    }

    /// One left-to-right scan: expand plain tokens, carry escaped matches
    /// through verbatim. Returns the rewritten text and the substitution
    /// count.
    fn expand_pass(&self, text: &str) -> (String, usize) {
        let mut out = String::with_capacity(text.len());
        let mut substitutions = 0usize;
        let mut last = 0usize;
        for caps in self.pattern.captures_iter(text) {
            let whole = caps.get(0).expect("match always has a group 0");
            out.push_str(&text[last..whole.start()]);
            if caps.name("esc").is_some() {
                out.push_str(whole.as_str());
            } else {
                out.push_str(&self.expand(whole.as_str()));
                substitutions += 1;
            }
            last = whole.end();
        }
        out.push_str(&text[last..]);
        (out, substitutions)
    }

    /// Strip the escape prefix/suffix from every escaped token, by the
    /// configured character counts. Runs once, at the end of `expand_text`.
    fn strip_escapes(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0usize;
        for caps in self.pattern.captures_iter(text) {
            let whole = caps.get(0).expect("match always has a group 0");
            if caps.name("esc").is_none() {
                continue;
            }
            out.push_str(&text[last..whole.start()]);
            out.push_str(unescape(
                whole.as_str(),
                self.policy.escape_prefix_strip,
                self.policy.escape_suffix_strip,
            ));
            last = whole.end();
        }
        out.push_str(&text[last..]);
        out
    }
}

/// Drop `front` characters from the start and `back` characters from the end.
fn unescape(s: &str, front: usize, back: usize) -> &str {
    let start = char_offset(s, front);
    let keep = s.chars().count().saturating_sub(back);
    let end = char_offset(s, keep).max(start);
    &s[start..end]
}

/// Byte offset of the `n`-th character, or the string length past the end.
fn char_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}
