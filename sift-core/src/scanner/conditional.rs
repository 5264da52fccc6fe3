//! Conditional expressions and case selection
//!
//! One `if`/`elseif`/`else` chain is a sequence of [`Case`]s. Expression
//! text is variable-expanded in the invocation's local scope, tokenized
//! here, and driven through the [`ExprEval`] stack machine. Atomic tests
//! that need context (defined-ness, file search) close over the scope and
//! run environment.

use crate::dispatch::RunEnv;
use crate::error::DirectiveError;
use crate::expr::{compare, truthy, CmpOp, ExprEval};
use crate::paths;
use crate::varmap::VarMap;

/// One `if`/`elseif`/`else` clause: its raw guard (None for `else`) and its
/// raw, unexpanded body text.
#[derive(Debug, Clone)]
pub struct Case {
    pub guard: Option<String>,
    pub body: String,
}

/// Select the first case whose guard holds; guards after the first match
/// are not evaluated. Returns the raw body, or None when nothing matched.
pub fn select_case<'c>(
    cases: &'c [Case],
    local: &VarMap,
    env: &RunEnv,
) -> Result<Option<&'c str>, DirectiveError> {
    for case in cases {
        let matched = match &case.guard {
            Some(guard) => {
                let expanded = local.expand_text(guard).map_err(DirectiveError::from)?;
                eval_expr(&expanded, local, env)?
            }
            None => true,
        };
        if matched {
            return Ok(Some(&case.body));
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, PartialEq)]
enum ExprToken {
    GroupStart,
    GroupEnd,
    Not,
    And,
    Or,
    Unary(UnaryOp),
    Cmp(CmpOp),
    Operand(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
    NonEmpty,
    Empty,
    Defined,
    Locatable,
}

/// Evaluate one already-expanded case expression.
pub fn eval_expr(expr: &str, local: &VarMap, env: &RunEnv) -> Result<bool, DirectiveError> {
    let tokens = tokenize(expr)?;
    let mut eval = ExprEval::new();
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            ExprToken::GroupStart => eval.push_group_start(),
            ExprToken::GroupEnd => eval.reduce_to_group()?,
            ExprToken::Not => eval.push_negate(),
            ExprToken::And => eval.push_and(),
            ExprToken::Or => eval.push_or(),
            ExprToken::Unary(op) => {
                let ExprToken::Operand(a) = tokens.get(i + 1).ok_or_else(|| {
                    DirectiveError::MalformedExpression("test without operand".to_string())
                })?
                else {
                    return Err(DirectiveError::MalformedExpression(
                        "test without operand".to_string(),
                    ));
                };
                eval.push_value(unary_test(*op, a, local, env));
                i += 1;
            }
            ExprToken::Cmp(_) => {
                return Err(DirectiveError::MalformedExpression(
                    "comparison without left operand".to_string(),
                ));
            }
            ExprToken::Operand(a) => {
                if let Some(ExprToken::Cmp(op)) = tokens.get(i + 1) {
                    let ExprToken::Operand(b) = tokens.get(i + 2).ok_or_else(|| {
                        DirectiveError::MalformedExpression(
                            "comparison without right operand".to_string(),
                        )
                    })?
                    else {
                        return Err(DirectiveError::MalformedExpression(
                            "comparison without right operand".to_string(),
                        ));
                    };
                    eval.push_value(compare(a, *op, b));
                    i += 2;
                } else {
                    eval.push_value(truthy(a));
                }
            }
        }
        i += 1;
    }
    eval.final_result()
}

fn unary_test(op: UnaryOp, operand: &str, local: &VarMap, env: &RunEnv) -> bool {
    match op {
        UnaryOp::NonEmpty => !operand.is_empty(),
        UnaryOp::Empty => operand.is_empty(),
        // The operand reaches us already expanded; an undefined variable
        // shows as the report sentinel, as does one explicitly set to it.
        UnaryOp::Defined => operand != local.report_message(),
        UnaryOp::Locatable => paths::search(operand, &env.include_paths).is_some(),
    }
}

fn tokenize(expr: &str) -> Result<Vec<ExprToken>, DirectiveError> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(ExprToken::GroupStart),
            ')' => tokens.push(ExprToken::GroupEnd),
            '&' => match chars.next() {
                Some((_, '&')) => tokens.push(ExprToken::And),
                _ => {
                    return Err(DirectiveError::MalformedExpression(
                        "expected '&&'".to_string(),
                    ))
                }
            },
            '|' => match chars.next() {
                Some((_, '|')) => tokens.push(ExprToken::Or),
                _ => {
                    return Err(DirectiveError::MalformedExpression(
                        "expected '||'".to_string(),
                    ))
                }
            },
            '!' => {
                if chars.peek().map(|(_, c)| *c) == Some('=') {
                    chars.next();
                    tokens.push(ExprToken::Cmp(CmpOp::Ne));
                } else {
                    tokens.push(ExprToken::Not);
                }
            }
            '=' => match chars.next() {
                Some((_, '=')) => tokens.push(ExprToken::Cmp(CmpOp::Eq)),
                _ => {
                    return Err(DirectiveError::MalformedExpression(
                        "expected '=='".to_string(),
                    ))
                }
            },
            '<' => {
                if chars.peek().map(|(_, c)| *c) == Some('=') {
                    chars.next();
                    tokens.push(ExprToken::Cmp(CmpOp::Le));
                } else {
                    tokens.push(ExprToken::Cmp(CmpOp::Lt));
                }
            }
            '>' => {
                if chars.peek().map(|(_, c)| *c) == Some('=') {
                    chars.next();
                    tokens.push(ExprToken::Cmp(CmpOp::Ge));
                } else {
                    tokens.push(ExprToken::Cmp(CmpOp::Gt));
                }
            }
            '"' | '\'' => {
                let quote = c;
                let mut value = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == quote {
                        closed = true;
                        break;
                    }
                    value.push(c);
                }
                if !closed {
                    return Err(DirectiveError::MalformedExpression(
                        "unterminated quote".to_string(),
                    ));
                }
                tokens.push(ExprToken::Operand(value));
            }
            '-' if matches!(chars.peek(), Some((_, 'n' | 'z' | 'd' | 'l'))) => {
                let (_, test) = chars.next().expect("peeked");
                let at_boundary = chars
                    .peek()
                    .map(|(_, c)| c.is_whitespace() || *c == '(' || *c == ')')
                    .unwrap_or(true);
                if at_boundary {
                    let op = match test {
                        'n' => UnaryOp::NonEmpty,
                        'z' => UnaryOp::Empty,
                        'd' => UnaryOp::Defined,
                        _ => UnaryOp::Locatable,
                    };
                    tokens.push(ExprToken::Unary(op));
                } else {
                    // A bare word that merely starts with -n/-z/...: operand.
                    let mut word = String::from(c);
                    word.push(test);
                    consume_word(&mut chars, &mut word);
                    tokens.push(ExprToken::Operand(word));
                }
            }
            _ => {
                let mut word = String::from(c);
                consume_word(&mut chars, &mut word);
                tokens.push(ExprToken::Operand(word));
            }
        }
    }
    Ok(tokens)
}

/// Extend `word` with characters up to the next delimiter.
fn consume_word(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    word: &mut String,
) {
    while let Some((_, c)) = chars.peek() {
        if c.is_whitespace() || matches!(c, '(' | ')' | '&' | '|' | '!' | '=' | '<' | '>') {
            break;
        }
        word.push(*c);
        chars.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> Result<bool, DirectiveError> {
        let local = VarMap::new();
        let env = RunEnv::new("sift_");
        eval_expr(expr, &local, &env)
    }

    #[test]
    fn empty_and_nonempty_tests() {
        assert!(eval("-z \"\"").unwrap());
        assert!(eval("-n \"x\"").unwrap());
        assert!(!eval("-n \"\"").unwrap());
    }

    #[test]
    fn grouped_and_of_comparisons() {
        assert!(eval("(1==1) && (2>1)").unwrap());
        assert!(!eval("(1==1) && (1>2)").unwrap());
    }

    #[test]
    fn negated_group() {
        assert!(eval("!(1==2)").unwrap());
    }

    #[test]
    fn comparison_then_bare_operand() {
        assert!(!eval("1 < 2 && 0").unwrap());
        assert!(eval("1 < 2 && 1").unwrap());
    }

    #[test]
    fn numeric_vs_string_dispatch() {
        assert!(eval("10 > 9").unwrap());
        assert!(!eval("10a > 9a").unwrap());
    }

    #[test]
    fn defined_test_uses_the_sentinel() {
        let mut local = VarMap::new();
        local.store("A", "set");
        let env = RunEnv::new("sift_");
        let expanded = local.expand_text("-d ${A}").unwrap();
        assert!(eval_expr(&expanded, &local, &env).unwrap());
        let expanded = local.expand_text("-d ${MISSING}").unwrap();
        assert!(!eval_expr(&expanded, &local, &env).unwrap());
        // Explicitly storing the sentinel also reads as undefined.
        local.store("B", local.report_message().to_string());
        let expanded = local.expand_text("-d ${B}").unwrap();
        assert!(!eval_expr(&expanded, &local, &env).unwrap());
    }

    #[test]
    fn locatable_test_searches_include_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.scad"), "x").unwrap();
        let local = VarMap::new();
        let mut env = RunEnv::new("sift_");
        env.include_paths = vec![dir.path().to_path_buf()];
        assert!(eval_expr("-l lib.scad", &local, &env).unwrap());
        assert!(!eval_expr("-l ghost.scad", &local, &env).unwrap());
    }

    #[test]
    fn malformed_expressions_error() {
        assert!(eval("&& 1").is_err());
        assert!(eval("(1==1").is_err());
        assert!(eval("1 ==").is_err());
        assert!(eval("").is_err());
    }

    #[test]
    fn negative_number_is_an_operand() {
        // "-1" must not lex as a unary test.
        assert!(eval("-1 == -1").unwrap());
    }

    #[test]
    fn select_first_matching_case() {
        let cases = vec![
            Case {
                guard: Some("1 == 2".to_string()),
                body: "first".to_string(),
            },
            Case {
                guard: Some("1 == 1".to_string()),
                body: "second".to_string(),
            },
            Case {
                guard: Some("2 == 2".to_string()),
                body: "third".to_string(),
            },
        ];
        let local = VarMap::new();
        let env = RunEnv::new("sift_");
        assert_eq!(select_case(&cases, &local, &env).unwrap(), Some("second"));
    }

    #[test]
    fn else_case_matches_when_nothing_else_does() {
        let cases = vec![
            Case {
                guard: Some("1 == 2".to_string()),
                body: "guarded".to_string(),
            },
            Case {
                guard: None,
                body: "fallback".to_string(),
            },
        ];
        let local = VarMap::new();
        let env = RunEnv::new("sift_");
        assert_eq!(select_case(&cases, &local, &env).unwrap(), Some("fallback"));
    }

    #[test]
    fn no_match_and_no_else_is_empty() {
        let cases = vec![Case {
            guard: Some("1 == 2".to_string()),
            body: "x".to_string(),
        }];
        let local = VarMap::new();
        let env = RunEnv::new("sift_");
        assert_eq!(select_case(&cases, &local, &env).unwrap(), None);
    }

    #[test]
    fn guards_expand_in_the_local_scope() {
        let mut local = VarMap::new();
        local.store("N", "3");
        let env = RunEnv::new("sift_");
        let cases = vec![Case {
            guard: Some("${N} >= 2".to_string()),
            body: "big".to_string(),
        }];
        assert_eq!(select_case(&cases, &local, &env).unwrap(), Some("big"));
    }
}
