//! Boolean expression stack machine
//!
//! Conditional cases evaluate through two stacks: operators (`(`, `!`, `&`,
//! `|`) and already-computed boolean values. There is no operator
//! precedence; reduction is strict stack order, with `(` as the group
//! sentinel popped by `reduce_to_group` at each `)`. Both operands of an
//! and/or are always evaluated before being pushed, so the machine never
//! short-circuits. That is the contract, not an oversight.

use crate::error::DirectiveError;

/// Comparison operators for two-argument tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CmpOp {
    pub fn from_symbol(sym: &str) -> Option<Self> {
        match sym {
            "==" => Some(CmpOp::Eq),
            "!=" => Some(CmpOp::Ne),
            "<" => Some(CmpOp::Lt),
            ">" => Some(CmpOp::Gt),
            "<=" => Some(CmpOp::Le),
            ">=" => Some(CmpOp::Ge),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Group,
    Not,
    And,
    Or,
}

/// The two evaluation stacks for one conditional case.
#[derive(Debug, Default)]
pub struct ExprEval {
    ops: Vec<Op>,
    vals: Vec<bool>,
}

impl ExprEval {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the `(` sentinel.
    pub fn push_group_start(&mut self) {
        self.ops.push(Op::Group);
    }

    pub fn push_negate(&mut self) {
        self.ops.push(Op::Not);
    }

    pub fn push_and(&mut self) {
        self.ops.push(Op::And);
    }

    pub fn push_or(&mut self) {
        self.ops.push(Op::Or);
    }

    /// Push an already-evaluated atomic test result.
    pub fn push_value(&mut self, value: bool) {
        self.vals.push(value);
    }

    /// Pop and apply operators until the matching `(` sentinel, then pop the
    /// sentinel. Invoked at each `)`.
    pub fn reduce_to_group(&mut self) -> Result<(), DirectiveError> {
        loop {
            match self.ops.pop() {
                Some(Op::Group) => return Ok(()),
                Some(op) => self.apply(op)?,
                None => {
                    return Err(DirectiveError::MalformedExpression(
                        "unbalanced ')'".to_string(),
                    ))
                }
            }
        }
    }

    /// Reduce whatever remains and return the case's truth value. Valid only
    /// when the operator stack empties and exactly one boolean is left; any
    /// other terminal configuration is malformed.
    pub fn final_result(mut self) -> Result<bool, DirectiveError> {
        while let Some(op) = self.ops.pop() {
            if op == Op::Group {
                return Err(DirectiveError::MalformedExpression(
                    "unbalanced '('".to_string(),
                ));
            }
            self.apply(op)?;
        }
        if self.vals.len() == 1 {
            Ok(self.vals[0])
        } else {
            Err(DirectiveError::MalformedExpression(format!(
                "{} value(s) left after reduction",
                self.vals.len()
            )))
        }
    }

    fn apply(&mut self, op: Op) -> Result<(), DirectiveError> {
        match op {
            Op::Group => unreachable!("group sentinel is never applied"),
            Op::Not => {
                let a = self.pop_value()?;
                self.vals.push(!a);
            }
            Op::And => {
                let b = self.pop_value()?;
                let a = self.pop_value()?;
                self.vals.push(a && b);
            }
            Op::Or => {
                let b = self.pop_value()?;
                let a = self.pop_value()?;
                self.vals.push(a || b);
            }
        }
        Ok(())
    }

    fn pop_value(&mut self) -> Result<bool, DirectiveError> {
        self.vals.pop().ok_or_else(|| {
            DirectiveError::MalformedExpression("operator without operand".to_string())
        })
    }
}

/// `true` when the operand is a non-negative integer literal.
fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Compare two digit strings numerically without parsing, so arbitrarily
/// long operands cannot overflow: strip leading zeros, then longer wins,
/// then byte order decides.
fn numeric_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Two-argument comparison: numeric iff both operands are all digits, else
/// byte-wise string comparison. `<=`/`>=` are the documented disjunctions.
pub fn compare(a: &str, op: CmpOp, b: &str) -> bool {
    use std::cmp::Ordering;
    let ord = if is_numeric(a) && is_numeric(b) {
        numeric_cmp(a, b)
    } else {
        a.cmp(b)
    };
    match op {
        CmpOp::Eq => ord == Ordering::Equal,
        CmpOp::Ne => ord != Ordering::Equal,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Le => ord == Ordering::Less || ord == Ordering::Equal,
        CmpOp::Ge => ord == Ordering::Greater || ord == Ordering::Equal,
    }
}

/// Truth test for a bare operand with no operator.
pub fn truthy(s: &str) -> bool {
    !(s.is_empty() || s == "0" || s == "false")
}
