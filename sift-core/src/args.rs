//! Directive argument lists
//!
//! Arguments accumulate term-by-term while a call is parsed. A term stored
//! without a pending name becomes positional and is named
//! `<positional-prefix><counter>`; by convention term 0 is the directive's
//! own name. `set_next_name` is one-shot: it names exactly the next stored
//! value.

use serde::Serialize;

/// One parsed argument term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arg {
    pub name: String,
    pub value: String,
    pub positional: bool,
}

/// Ordered argument terms for a single directive invocation.
#[derive(Debug, Clone)]
pub struct ArgList {
    terms: Vec<Arg>,
    next_name: Option<String>,
    positional_prefix: String,
    positional_count: usize,
}

impl ArgList {
    pub fn new(positional_prefix: impl Into<String>) -> Self {
        Self {
            terms: Vec::new(),
            next_name: None,
            positional_prefix: positional_prefix.into(),
            positional_count: 0,
        }
    }

    /// Name the next stored value. Consumed by exactly one `store`.
    pub fn set_next_name(&mut self, name: impl Into<String>) {
        self.next_name = Some(name.into());
    }

    /// Append a term. Named if a name is pending, else positional with a
    /// synthesized name. Never errors; call-syntax validation is the
    /// directive's concern.
    pub fn store(&mut self, value: impl Into<String>) {
        match self.next_name.take() {
            Some(name) => self.terms.push(Arg {
                name,
                value: value.into(),
                positional: false,
            }),
            None => {
                let name = format!("{}{}", self.positional_prefix, self.positional_count);
                self.positional_count += 1;
                self.terms.push(Arg {
                    name,
                    value: value.into(),
                    positional: true,
                });
            }
        }
    }

    /// Convenience: `set_next_name` then `store`.
    pub fn store_named(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set_next_name(name);
        self.store(value);
    }

    /// Count terms by kind.
    pub fn size(&self, count_named: bool, count_positional: bool) -> usize {
        self.terms
            .iter()
            .filter(|t| (count_named && !t.positional) || (count_positional && t.positional))
            .count()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.terms.iter().any(|t| t.name == name)
    }

    /// Value of the first term with the given name.
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.terms
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }

    /// Try each alias in declared order; the first alias matching any term
    /// wins, else the supplied default. This realizes short/long option
    /// aliasing such as `("stderr", "s")`.
    pub fn arg_firstof<'a>(&'a self, default: &'a str, aliases: &[&str]) -> &'a str {
        for alias in aliases {
            if let Some(value) = self.arg(alias) {
                return value;
            }
        }
        default
    }

    /// Values of the selected kinds, preserving call order.
    pub fn values(&self, named: bool, positional: bool) -> Vec<&str> {
        self.terms
            .iter()
            .filter(|t| (named && !t.positional) || (positional && t.positional))
            .map(|t| t.value.as_str())
            .collect()
    }

    /// Names of the selected kinds, preserving call order.
    pub fn names(&self, named: bool, positional: bool) -> Vec<&str> {
        self.terms
            .iter()
            .filter(|t| (named && !t.positional) || (positional && t.positional))
            .map(|t| t.name.as_str())
            .collect()
    }

    /// All terms in call order.
    pub fn terms(&self) -> &[Arg] {
        &self.terms
    }

    /// Named terms as they would be handed to an external function.
    pub fn named_pairs(&self) -> Vec<String> {
        self.terms
            .iter()
            .filter(|t| !t.positional)
            .map(|t| format!("{}={}", t.name, t.value))
            .collect()
    }

    /// Debug serialization of all terms.
    pub fn pairs_str(&self) -> String {
        serde_json::to_string(&self.terms).unwrap_or_default()
    }
}
