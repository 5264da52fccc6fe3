//! Auxiliary script extraction
//!
//! The parallel pass over an annotated source: `\<ns>begin ( id )` and
//! `\<ns>end ()` markers inside comments delimit embedded scripts. Raw text
//! between the markers belongs to every open scope; nested scope ids are
//! joined with the configured joiner, and each completed scope is written
//! to `<output>/<stem><joiner><scope-id><ext>`.

use std::path::PathBuf;

use logos::Logos;

use crate::error::ScanError;
use crate::paths;
use crate::scanner::token::Token;

/// Extraction settings. The marker names ride inside the same directive
/// namespace the filter uses.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub namespace: String,
    pub begin_name: String,
    pub end_name: String,
    pub joiner: String,
    pub extension: String,
    pub output_dir: PathBuf,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            namespace: "sift_".to_string(),
            begin_name: "begin".to_string(),
            end_name: "end".to_string(),
            joiner: "_".to_string(),
            extension: ".bash".to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

/// One script written by [`extract`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedScript {
    pub scope: String,
    pub path: PathBuf,
}

/// What an extraction pass produced: written scripts plus diagnostics for
/// unbalanced markers.
#[derive(Debug, Default)]
pub struct ExtractReport {
    pub scripts: Vec<ExtractedScript>,
    pub diagnostics: Vec<String>,
}

struct OpenScope {
    id: String,
    buffer: String,
}

/// Split the embedded scripts out of `source`. `stem` names the input file
/// (without extension) and prefixes every script file.
pub fn extract(
    source: &str,
    stem: &str,
    config: &ExtractConfig,
) -> Result<ExtractReport, ScanError> {
    let mut report = ExtractReport::default();
    let mut open: Vec<OpenScope> = Vec::new();
    let mut in_block = false;
    let mut in_line = false;

    let mut lexer = Token::lexer(source);
    while let Some(token) = lexer.next() {
        let slice = lexer.slice();
        match token {
            Ok(Token::BlockOpen) => {
                if !in_line {
                    in_block = true;
                }
                capture(&mut open, slice);
            }
            Ok(Token::BlockClose) => {
                if !in_line {
                    in_block = false;
                }
                capture(&mut open, slice);
            }
            Ok(Token::LineOpen) => {
                if !in_block {
                    in_line = true;
                }
                capture(&mut open, slice);
            }
            Ok(Token::Newline) => {
                in_line = false;
                capture(&mut open, slice);
            }
            Ok(Token::Directive) if in_block || in_line => {
                let word = &slice[1..];
                let Some(bare) = word.strip_prefix(config.namespace.as_str()) else {
                    capture(&mut open, slice);
                    continue;
                };
                if bare == config.begin_name {
                    match marker_argument(lexer.remainder()) {
                        Some((id, consumed)) if !id.is_empty() => {
                            open.push(OpenScope {
                                id,
                                buffer: String::new(),
                            });
                            lexer.bump(consumed);
                        }
                        Some((_, consumed)) => {
                            report
                                .diagnostics
                                .push("begin marker without a scope id".to_string());
                            lexer.bump(consumed);
                        }
                        None => report
                            .diagnostics
                            .push("malformed begin marker".to_string()),
                    }
                } else if bare == config.end_name {
                    match marker_argument(lexer.remainder()) {
                        Some((_, consumed)) => {
                            lexer.bump(consumed);
                            match open.pop() {
                                Some(scope) => {
                                    let script =
                                        write_scope(&open, scope, stem, config)?;
                                    report.scripts.push(script);
                                }
                                None => report
                                    .diagnostics
                                    .push("end marker without an open scope".to_string()),
                            }
                        }
                        None => report.diagnostics.push("malformed end marker".to_string()),
                    }
                } else {
                    capture(&mut open, slice);
                }
            }
            Ok(_) | Err(()) => capture(&mut open, slice),
        }
    }

    for scope in open {
        report
            .diagnostics
            .push(format!("scope '{}' not closed before end of input", scope.id));
    }
    Ok(report)
}

/// Append raw text to every open scope.
fn capture(open: &mut [OpenScope], slice: &str) {
    for scope in open.iter_mut() {
        scope.buffer.push_str(slice);
    }
}

/// Parse `( id )` after a marker name. Returns the trimmed id and the
/// consumed byte count, or None when no parenthesized group follows.
fn marker_argument(remainder: &str) -> Option<(String, usize)> {
    let mut pos = 0;
    for c in remainder.chars() {
        if c == '(' {
            pos += c.len_utf8();
            break;
        }
        if !c.is_whitespace() {
            return None;
        }
        pos += c.len_utf8();
    }
    if pos == 0 || !remainder[..pos].ends_with('(') {
        return None;
    }
    let close = remainder[pos..].find(')')?;
    let id = remainder[pos..pos + close].trim().to_string();
    Some((id, pos + close + 1))
}

fn write_scope(
    outer: &[OpenScope],
    scope: OpenScope,
    stem: &str,
    config: &ExtractConfig,
) -> Result<ExtractedScript, ScanError> {
    let mut parts: Vec<&str> = outer.iter().map(|s| s.id.as_str()).collect();
    parts.push(&scope.id);
    let full_id = parts.join(&config.joiner);
    let file_name = format!(
        "{}{}{}{}",
        stem, config.joiner, full_id, config.extension
    );
    let path = config.output_dir.join(file_name);

    paths::ensure_dir(&config.output_dir).map_err(|e| ScanError::OutputWrite {
        path: config.output_dir.clone(),
        reason: e.to_string(),
    })?;
    std::fs::write(&path, &scope.buffer).map_err(|e| ScanError::OutputWrite {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    Ok(ExtractedScript {
        scope: full_id,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config(dir: &Path) -> ExtractConfig {
        ExtractConfig {
            output_dir: dir.to_path_buf(),
            ..ExtractConfig::default()
        }
    }

    #[test]
    fn extracts_one_scope() {
        let dir = tempfile::tempdir().unwrap();
        let source = "/* \\sift_begin ( build )\nmake all\n\\sift_end ()\n*/\n";
        let report = extract(source, "model", &config(dir.path())).unwrap();
        assert_eq!(report.scripts.len(), 1);
        assert_eq!(report.scripts[0].scope, "build");
        let written = std::fs::read_to_string(&report.scripts[0].path).unwrap();
        assert!(written.contains("make all"));
        assert!(report.diagnostics.is_empty());
        assert!(report.scripts[0]
            .path
            .ends_with("model_build.bash"));
    }

    #[test]
    fn nested_scopes_join_ids_and_share_text() {
        let dir = tempfile::tempdir().unwrap();
        let source = "// \\sift_begin ( outer )\nshared\n// \\sift_begin ( inner )\ndeep\n// \\sift_end ()\n// \\sift_end ()\n";
        let report = extract(source, "m", &config(dir.path())).unwrap();
        assert_eq!(report.scripts.len(), 2);
        // Inner closes first.
        assert_eq!(report.scripts[0].scope, "outer_inner");
        assert_eq!(report.scripts[1].scope, "outer");
        let inner = std::fs::read_to_string(&report.scripts[0].path).unwrap();
        assert!(inner.contains("deep"));
        assert!(!inner.contains("shared"));
        let outer = std::fs::read_to_string(&report.scripts[1].path).unwrap();
        assert!(outer.contains("shared"));
        assert!(outer.contains("deep"));
    }

    #[test]
    fn unbalanced_end_is_diagnosed() {
        let dir = tempfile::tempdir().unwrap();
        let report = extract("// \\sift_end ()\n", "m", &config(dir.path())).unwrap();
        assert!(report.scripts.is_empty());
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn unterminated_scope_is_diagnosed_and_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let report = extract("// \\sift_begin ( x )\ntext\n", "m", &config(dir.path())).unwrap();
        assert!(report.scripts.is_empty());
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn markers_outside_comments_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let report = extract("\\sift_begin ( x )\n", "m", &config(dir.path())).unwrap();
        assert!(report.scripts.is_empty());
        assert!(report.diagnostics.is_empty());
    }
}
