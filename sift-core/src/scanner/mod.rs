//! Scanner front end
//!
//! Drives the outer token stream, recognizes `\<namespace><name>` directives
//! inside comments, parses their call syntax, and routes evaluation through
//! the dispatcher. Text outside comments is copied through verbatim.
//!
//! Line correspondence is an output contract: every directive invocation
//! records its source span and its emitted text is padded with blank lines
//! to `max(0, span - emitted)`, so line references in the generated
//! documentation still point at meaningful source locations.

pub mod conditional;
pub mod token;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use logos::Logos;

use crate::args::ArgList;
use crate::dispatch::{DirectiveCall, DirectiveRegistry, RunEnv};
use crate::error::{DirectiveError, ScanError};
use crate::paths::{self, FileParts};
use crate::varmap::VarMap;

use conditional::Case;
use token::Token;

/// Character cursor over the unlexed remainder of a directive call.
/// Tracks consumed bytes and newlines so the caller can resume the outer
/// lexer and keep the line counter honest.
struct Cursor<'s> {
    src: &'s str,
    pos: usize,
    lines: usize,
}

impl<'s> Cursor<'s> {
    fn new(src: &'s str) -> Self {
        Self {
            src,
            pos: 0,
            lines: 0,
        }
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.lines += 1;
        }
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn eat_ident(&mut self) -> Option<&'s str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.bump();
            }
            _ => return None,
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        Some(&self.src[start..self.pos])
    }

    /// A bare argument word: everything up to whitespace, parens, quotes,
    /// or a backslash.
    fn eat_arg_word(&mut self) -> &'s str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, '(' | ')' | '"' | '\'' | '\\') {
                break;
            }
            self.bump();
        }
        &self.src[start..self.pos]
    }

    /// Consume `open`..`close` with nesting, returning the raw content.
    fn eat_delimited(&mut self, open: char, close: char) -> Option<&'s str> {
        self.skip_ws();
        if self.peek() != Some(open) {
            return None;
        }
        self.bump();
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.bump() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return Some(&self.src[start..self.pos - close.len_utf8()]);
                }
            }
        }
        None
    }
}

/// The documentation input filter.
///
/// Owns the global variable map and run environment; borrows the directive
/// registry so nested evaluation can reach it while the scanner state is
/// mutably in play.
pub struct Scanner<'r> {
    registry: &'r DirectiveRegistry,
    global: VarMap,
    env: RunEnv,
    bound_results: HashSet<String>,
    diagnostics: Vec<String>,
}

impl<'r> Scanner<'r> {
    pub fn new(registry: &'r DirectiveRegistry, global: VarMap, env: RunEnv) -> Self {
        Self {
            registry,
            global,
            env,
            bound_results: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn global(&self) -> &VarMap {
        &self.global
    }

    pub fn env(&self) -> &RunEnv {
        &self.env
    }

    /// Inline error markers emitted so far, in order.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Filter a root input file: seed the predefined file variables, then
    /// scan the content.
    pub fn scan_file(&mut self, path: &Path) -> Result<String, ScanError> {
        let source =
            std::fs::read_to_string(path).map_err(|e| ScanError::UnreadableFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        self.seed_root_vars(path);
        self.env.current_file = path.display().to_string();
        self.env.current_line = 1;
        self.scan_text(&source, false)
    }

    /// Predefined variables for the root input file.
    fn seed_root_vars(&mut self, path: &Path) {
        let parts = FileParts::of(path);
        let abs = path
            .canonicalize()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| parts.name.clone());
        self.global.store("ABS_FILE", abs);
        self.global.store("FILE", parts.name.clone());
        self.global.store("PATH", parts.path);
        self.global.store("BASE", parts.base);
        self.global.store("STEM", parts.stem);
        self.global.store("EXT", parts.ext);
        self.global.store("CURRENT_FILE", parts.name.clone());
        self.global.store("FILE_LIST", parts.name);
        self.global
            .store("EFS", self.env.field_separator.clone());
    }

    /// Scan a text fragment. With `ambient_comment` set the whole fragment
    /// counts as comment content (used for conditional bodies), otherwise
    /// directives are only recognized between comment markers.
    pub fn scan_text(
        &mut self,
        source: &str,
        ambient_comment: bool,
    ) -> Result<String, ScanError> {
        let mut lexer = Token::lexer(source);
        let mut out = String::new();
        let mut in_block = false;
        let mut in_line = false;
        while let Some(token) = lexer.next() {
            match token {
                Ok(Token::BlockOpen) => {
                    if !in_line {
                        in_block = true;
                    }
                    out.push_str(lexer.slice());
                }
                Ok(Token::BlockClose) => {
                    if !in_line {
                        in_block = false;
                    }
                    out.push_str(lexer.slice());
                }
                Ok(Token::LineOpen) => {
                    if !in_block {
                        in_line = true;
                    }
                    out.push_str(lexer.slice());
                }
                Ok(Token::Newline) => {
                    in_line = false;
                    self.env.current_line += 1;
                    out.push('\n');
                }
                Ok(Token::Directive) if in_block || in_line || ambient_comment => {
                    let slice = lexer.slice();
                    let bare = slice[1..]
                        .strip_prefix(self.env.namespace.as_str())
                        .unwrap_or("")
                        .to_string();
                    if bare.is_empty() {
                        out.push_str(slice);
                        continue;
                    }
                    let remainder = lexer.remainder();
                    let (output, consumed) = match bare.as_str() {
                        "if" => self.handle_if(remainder)?,
                        "include" => self.handle_include(remainder)?,
                        "begin" | "end" => self.handle_marker(&bare, remainder),
                        _ => self.handle_call(&bare, remainder)?,
                    };
                    out.push_str(&output);
                    lexer.bump(consumed);
                }
                Ok(_) => out.push_str(lexer.slice()),
                Err(()) => out.push_str(lexer.slice()),
            }
        }
        Ok(out)
    }

    /// Format a recoverable error as an inline marker and echo it to the
    /// diagnostic stream.
    fn report(&mut self, err: &DirectiveError) -> String {
        let marker = format!(
            "[sift error: {} ({}:{})]",
            err, self.env.current_file, self.env.current_line
        );
        eprintln!(
            "sift: {}:{}: {}",
            self.env.current_file, self.env.current_line, err
        );
        self.diagnostics.push(marker.clone());
        marker
    }

    /// Bind a directive result variable. Rebinding a name is a structural
    /// authoring mistake and aborts the scan.
    fn store_result(&mut self, name: String, value: String) -> Result<(), ScanError> {
        if self.bound_results.contains(&name) {
            return Err(ScanError::VariableRedefined {
                name,
                file: self.env.current_file.clone(),
                line: self.env.current_line,
            });
        }
        self.bound_results.insert(name.clone());
        self.global.store(name, value);
        Ok(())
    }

    fn evaluate_call(
        &mut self,
        name: &str,
        args: ArgList,
        local: VarMap,
    ) -> Result<String, DirectiveError> {
        let registry = self.registry;
        let mut call = DirectiveCall {
            args,
            local,
            global: &mut self.global,
            env: &mut self.env,
        };
        registry.evaluate(name, &mut call)
    }

    /// A general directive call: parse, evaluate, route the result, pad to
    /// the source span. Returns the emitted text and consumed bytes.
    fn handle_call(&mut self, name: &str, remainder: &str) -> Result<(String, usize), ScanError> {
        let mut cur = Cursor::new(remainder);
        let mut local = self.global.clone();
        let output = match self.parse_call(&mut cur, &mut local, name) {
            Ok((leading, args)) => {
                if leading.len() > 1 {
                    let err = DirectiveError::MalformedCall {
                        directive: name.to_string(),
                        detail: "more than one result variable".to_string(),
                    };
                    self.report(&err)
                } else {
                    let target = leading.into_iter().next();
                    match self.evaluate_call(name, args, local) {
                        Ok(result) => match target {
                            Some(var) => {
                                self.store_result(var, result)?;
                                String::new()
                            }
                            None => result,
                        },
                        Err(err) => self.report(&err),
                    }
                }
            }
            Err(err) => self.report(&err),
        };
        let padded = pad_to_span(&output, cur.lines);
        self.env.current_line += cur.lines;
        Ok((padded, cur.pos))
    }

    /// Extractor scope markers are the splitter's business; the filter
    /// consumes them and emits only span padding.
    fn handle_marker(&mut self, name: &str, remainder: &str) -> (String, usize) {
        let mut cur = Cursor::new(remainder);
        let mut local = self.global.clone();
        if let Err(err) = self.parse_call(&mut cur, &mut local, name) {
            self.report(&err);
        }
        let padded = pad_to_span("", cur.lines);
        self.env.current_line += cur.lines;
        (padded, cur.pos)
    }

    /// `include [copy] [no_switch] [search] ( file )`
    fn handle_include(&mut self, remainder: &str) -> Result<(String, usize), ScanError> {
        let mut cur = Cursor::new(remainder);
        let mut local = self.global.clone();
        let output = match self.parse_call(&mut cur, &mut local, "include") {
            Ok((leading, args)) => self.run_include(&leading, &args, &local)?,
            Err(err) => self.report(&err),
        };
        let padded = pad_to_span(&output, cur.lines);
        self.env.current_line += cur.lines;
        Ok((padded, cur.pos))
    }

    fn run_include(
        &mut self,
        leading: &[String],
        args: &ArgList,
        local: &VarMap,
    ) -> Result<String, ScanError> {
        let mut copy = false;
        let mut no_switch = false;
        let mut search = false;
        for modifier in leading {
            match modifier.as_str() {
                "copy" => copy = true,
                "no_switch" => no_switch = true,
                "search" => search = true,
                other => {
                    let err = DirectiveError::MalformedCall {
                        directive: "include".to_string(),
                        detail: format!("unknown modifier '{}'", other),
                    };
                    return Ok(self.report(&err));
                }
            }
        }

        let positionals = args.values(false, true);
        if positionals.len() != 2 {
            let err = DirectiveError::WrongArity {
                directive: "include".to_string(),
                expected: 1,
                got: positionals.len().saturating_sub(1),
            };
            return Ok(self.report(&err));
        }
        let file_expr = positionals[1].to_string();
        let name = match local.expand_text(&file_expr) {
            Ok(name) => name,
            Err(e) => return Ok(self.report(&e.into())),
        };

        let resolved = if search {
            match paths::search(&name, &self.env.include_paths) {
                Some(found) => found,
                None => return Err(ScanError::IncludeNotFound { name }),
            }
        } else {
            PathBuf::from(&name)
        };
        let content =
            std::fs::read_to_string(&resolved).map_err(|e| ScanError::UnreadableFile {
                path: resolved.clone(),
                reason: e.to_string(),
            })?;

        if copy {
            return Ok(content);
        }

        // Stream switch: the included file scans with its own line counter,
        // then the parent stream resumes where it left off.
        let display = resolved.display().to_string();
        let list = match self.global.value("FILE_LIST") {
            Some(list) if !list.is_empty() => format!("{} {}", list, display),
            _ => display.clone(),
        };
        self.global.store("FILE_LIST", list);

        let saved_file = self.env.current_file.clone();
        let saved_line = self.env.current_line;
        if !no_switch {
            self.global.store("CURRENT_FILE", display.clone());
            self.env.current_file = display;
        }
        self.env.current_line = 1;
        let scanned = self.scan_text(&content, false)?;
        self.env.current_file = saved_file;
        self.env.current_line = saved_line;
        if !no_switch {
            self.global
                .store("CURRENT_FILE", self.env.current_file.clone());
        }
        Ok(scanned)
    }

    /// `if [var] ( expr ) { body } [elseif (expr) { body }]* [else { body }]? endif`
    fn handle_if(&mut self, remainder: &str) -> Result<(String, usize), ScanError> {
        let mut cur = Cursor::new(remainder);
        let local = self.global.clone();
        let output = match parse_if(&mut cur) {
            Ok((target, cases)) => {
                match conditional::select_case(&cases, &local, &self.env) {
                    Ok(Some(body)) => {
                        let body = body.to_string();
                        match local.expand_text(&body) {
                            Ok(expanded) => {
                                // The matched body may itself contain
                                // directives; rescan it as comment content.
                                let saved_line = self.env.current_line;
                                let scanned = self.scan_text(&expanded, true)?;
                                self.env.current_line = saved_line;
                                match target {
                                    Some(var) => {
                                        self.store_result(var, scanned)?;
                                        String::new()
                                    }
                                    None => scanned,
                                }
                            }
                            Err(e) => self.report(&e.into()),
                        }
                    }
                    Ok(None) => String::new(),
                    Err(err) => self.report(&err),
                }
            }
            Err(err) => self.report(&err),
        };
        let padded = pad_to_span(&output, cur.lines);
        self.env.current_line += cur.lines;
        Ok((padded, cur.pos))
    }

    /// Parse `[<result-var>] ( <terms> )`, resolving flag and
    /// increment/decrement forms against the scopes as terms are stored.
    fn parse_call(
        &mut self,
        cur: &mut Cursor<'_>,
        local: &mut VarMap,
        directive: &str,
    ) -> Result<(Vec<String>, ArgList), DirectiveError> {
        let mut args = ArgList::new(self.env.positional_prefix.clone());
        args.store(format!("{}{}", self.env.namespace, directive));

        let mut leading = Vec::new();
        loop {
            cur.skip_ws();
            match cur.peek() {
                Some('(') => {
                    cur.bump();
                    break;
                }
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                    leading.push(cur.eat_ident().expect("ident start peeked").to_string());
                }
                _ => {
                    return Err(DirectiveError::MalformedCall {
                        directive: directive.to_string(),
                        detail: "missing '('".to_string(),
                    })
                }
            }
        }

        loop {
            cur.skip_ws();
            let Some(c) = cur.peek() else {
                return Err(DirectiveError::MalformedCall {
                    directive: directive.to_string(),
                    detail: "unterminated argument list".to_string(),
                });
            };
            match c {
                ')' => {
                    cur.bump();
                    break;
                }
                '"' | '\'' => {
                    let value = eat_quoted(cur, directive)?;
                    args.store(value);
                }
                '\\' => self.nested_or_word(cur, &mut args, local),
                _ => {
                    let word = cur.eat_arg_word().to_string();
                    if word.is_empty() {
                        return Err(DirectiveError::MalformedCall {
                            directive: directive.to_string(),
                            detail: format!("unexpected '{}'", c),
                        });
                    }
                    self.store_word(&word, &mut args, local);
                }
            }
        }
        Ok((leading, args))
    }

    /// A backslash inside an argument list: either a nested directive call
    /// whose result becomes a term, or an ordinary word.
    fn nested_or_word(&mut self, cur: &mut Cursor<'_>, args: &mut ArgList, local: &mut VarMap) {
        let save_pos = cur.pos;
        let save_lines = cur.lines;
        cur.bump(); // the backslash
        let nested = cur
            .eat_ident()
            .and_then(|word| word.strip_prefix(self.env.namespace.as_str()))
            .filter(|bare| !bare.is_empty())
            .map(|bare| bare.to_string());
        match nested {
            Some(bare) if !matches!(bare.as_str(), "if" | "include" | "begin" | "end") => {
                let result = self
                    .nested_call(cur, &bare)
                    .unwrap_or_else(|err| self.report(&err));
                args.store(result);
            }
            _ => {
                // Not a nested call: rewind and take the run as a word.
                cur.pos = save_pos;
                cur.lines = save_lines;
                let start = cur.pos;
                cur.bump();
                while let Some(c) = cur.peek() {
                    if c.is_whitespace() || matches!(c, '(' | ')' | '"' | '\'') {
                        break;
                    }
                    cur.bump();
                }
                let word = cur.src[start..cur.pos].to_string();
                self.store_word(&word, args, local);
            }
        }
    }

    fn nested_call(&mut self, cur: &mut Cursor<'_>, bare: &str) -> Result<String, DirectiveError> {
        let mut local = self.global.clone();
        let (leading, args) = self.parse_call(cur, &mut local, bare)?;
        if !leading.is_empty() {
            return Err(DirectiveError::MalformedCall {
                directive: bare.to_string(),
                detail: "result variable not allowed on a nested call".to_string(),
            });
        }
        self.evaluate_call(bare, args, local)
    }

    /// Store one bare word, resolving `name=value`, flag, and
    /// increment/decrement forms.
    fn store_word(&mut self, word: &str, args: &mut ArgList, local: &mut VarMap) {
        // ++name / --name: pre-increment when locally bound, else a flag.
        for (prefix, step, flag) in [("++", 1i64, "1"), ("--", -1i64, "-1")] {
            if let Some(rest) = word.strip_prefix(prefix) {
                if is_ident(rest) {
                    if local.exists(rest) {
                        let next = parse_num(local.value(rest)) + step;
                        local.store(rest, next.to_string());
                        args.store_named(rest, next.to_string());
                    } else {
                        args.store_named(rest, flag);
                    }
                    return;
                }
            }
        }
        // name++ / name--: post forms read the old global value.
        for (suffix, step) in [("++", 1i64), ("--", -1i64)] {
            if let Some(base) = word.strip_suffix(suffix) {
                if is_ident(base) {
                    let old = parse_num(self.global.value(base));
                    self.global.store(base, (old + step).to_string());
                    args.store_named(base, old.to_string());
                    return;
                }
            }
        }
        // name=value introduces a named term; a trailing '=' names the next
        // stored token instead.
        if let Some(eq) = word.find('=') {
            let (name, value) = word.split_at(eq);
            if is_ident(name) {
                args.set_next_name(name);
                let value = &value[1..];
                if !value.is_empty() {
                    args.store(value);
                }
                return;
            }
        }
        args.store(word);
    }
}

/// Structural parse of an if-chain; no expression is evaluated here.
fn parse_if(cur: &mut Cursor<'_>) -> Result<(Option<String>, Vec<Case>), DirectiveError> {
    let malformed = |detail: &str| DirectiveError::MalformedCall {
        directive: "if".to_string(),
        detail: detail.to_string(),
    };

    let mut target = None;
    loop {
        cur.skip_ws();
        match cur.peek() {
            Some('(') => break,
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let ident = cur.eat_ident().expect("ident start peeked").to_string();
                if target.is_some() {
                    return Err(malformed("more than one result variable"));
                }
                target = Some(ident);
            }
            _ => return Err(malformed("missing '('")),
        }
    }

    let mut cases = Vec::new();
    let guard = cur
        .eat_delimited('(', ')')
        .ok_or_else(|| malformed("unterminated guard expression"))?
        .to_string();
    let body = cur
        .eat_delimited('{', '}')
        .ok_or_else(|| malformed("unterminated case body"))?
        .to_string();
    cases.push(Case {
        guard: Some(guard),
        body,
    });

    let mut saw_else = false;
    loop {
        cur.skip_ws();
        let Some(word) = cur.eat_ident() else {
            return Err(malformed("missing 'endif'"));
        };
        match word {
            "endif" => break,
            "elseif" => {
                if saw_else {
                    return Err(malformed("'elseif' after 'else'"));
                }
                let guard = cur
                    .eat_delimited('(', ')')
                    .ok_or_else(|| malformed("unterminated guard expression"))?
                    .to_string();
                let body = cur
                    .eat_delimited('{', '}')
                    .ok_or_else(|| malformed("unterminated case body"))?
                    .to_string();
                cases.push(Case {
                    guard: Some(guard),
                    body,
                });
            }
            "else" => {
                if saw_else {
                    return Err(malformed("duplicate 'else'"));
                }
                saw_else = true;
                let body = cur
                    .eat_delimited('{', '}')
                    .ok_or_else(|| malformed("unterminated case body"))?
                    .to_string();
                cases.push(Case { guard: None, body });
            }
            other => return Err(malformed(&format!("unexpected '{}'", other))),
        }
    }
    Ok((target, cases))
}

fn eat_quoted(cur: &mut Cursor<'_>, directive: &str) -> Result<String, DirectiveError> {
    let quote = cur.bump().expect("quote char peeked");
    let mut value = String::new();
    loop {
        match cur.bump() {
            None => {
                return Err(DirectiveError::MalformedCall {
                    directive: directive.to_string(),
                    detail: "unterminated quote".to_string(),
                })
            }
            Some('\\') => match cur.peek() {
                Some(c) if c == quote || c == '\\' => {
                    value.push(c);
                    cur.bump();
                }
                _ => value.push('\\'),
            },
            Some(c) if c == quote => break,
            Some(c) => value.push(c),
        }
    }
    Ok(value)
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_num(value: Option<&str>) -> i64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}

/// Pad emitted text with blank lines up to the source span length.
fn pad_to_span(output: &str, span_lines: usize) -> String {
    let emitted = output.matches('\n').count();
    let mut padded = output.to_string();
    for _ in emitted..span_lines {
        padded.push('\n');
    }
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> (String, Vec<String>) {
        let registry = DirectiveRegistry::with_defaults();
        let env = RunEnv::new("sift_");
        let mut scanner = Scanner::new(&registry, VarMap::new(), env);
        let out = scanner.scan_text(source, false).unwrap();
        (out, scanner.diagnostics().to_vec())
    }

    #[test]
    fn non_comment_text_passes_through() {
        let source = "cube(10);\nsphere(r = 2); // plain note\n";
        let (out, diags) = scan(source);
        assert_eq!(out, source);
        assert!(diags.is_empty());
    }

    #[test]
    fn directive_outside_comment_is_untouched() {
        let source = r"\sift_eval ( x )";
        let (out, _) = scan(source);
        assert_eq!(out, source);
    }

    #[test]
    fn eval_directive_in_line_comment() {
        let (out, _) = scan("// \\sift_eval ( a=1 b=2 ${a}${b} )\n");
        assert_eq!(out, "// 12\n");
    }

    #[test]
    fn eval_directive_in_block_comment() {
        let (out, _) = scan("/* \\sift_eval ( a=hi ${a} ) */");
        assert_eq!(out, "/* hi */");
    }

    #[test]
    fn unknown_directive_reports_inline_and_continues() {
        let (out, diags) = scan("// \\sift_bogus ( ) after\n// next line\n");
        assert!(out.contains("unknown function"));
        assert!(out.contains("sift_bogus"));
        assert!(out.contains("after"));
        assert!(out.contains("next line"));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn result_variable_stores_globally() {
        let registry = DirectiveRegistry::with_defaults();
        let env = RunEnv::new("sift_");
        let mut scanner = Scanner::new(&registry, VarMap::new(), env);
        let out = scanner
            .scan_text("// \\sift_eval answer ( a=42 ${a} ) tail\n", false)
            .unwrap();
        assert_eq!(scanner.global().value("answer"), Some("42"));
        // The stored call emits nothing in place of itself.
        assert_eq!(out, "//  tail\n");
    }

    #[test]
    fn rebinding_a_result_variable_is_fatal() {
        let registry = DirectiveRegistry::with_defaults();
        let env = RunEnv::new("sift_");
        let mut scanner = Scanner::new(&registry, VarMap::new(), env);
        let source = "// \\sift_eval x ( 1 )\n// \\sift_eval x ( 2 )\n";
        match scanner.scan_text(source, false) {
            Err(ScanError::VariableRedefined { name, .. }) => assert_eq!(name, "x"),
            other => panic!("expected VariableRedefined, got {:?}", other),
        }
    }

    #[test]
    fn multi_line_call_pads_to_span() {
        let source = "/* \\sift_eval (\n  a=1\n  ${a}\n) */\nnext\n";
        let (out, _) = scan(source);
        // The call spans three newlines; the single-line result is padded so
        // following lines keep their numbers.
        assert_eq!(out, "/* 1\n\n\n */\nnext\n");
    }

    #[test]
    fn variables_persist_across_directives() {
        let source = "// \\sift_eval v ( width=10 ${width} )\n// \\sift_eval ( ${v} )\n";
        let registry = DirectiveRegistry::with_defaults();
        let env = RunEnv::new("sift_");
        let mut scanner = Scanner::new(&registry, VarMap::new(), env);
        let out = scanner.scan_text(source, false).unwrap();
        assert!(out.contains("// 10"));
    }

    #[test]
    fn define_defers_expansion_to_use() {
        let source = "// \\sift_define title ( Model ${NAME} )\n// \\sift_eval ( NAME=X ${title} )\n";
        let registry = DirectiveRegistry::with_defaults();
        let env = RunEnv::new("sift_");
        let mut scanner = Scanner::new(&registry, VarMap::new(), env);
        let out = scanner.scan_text(source, false).unwrap();
        assert!(out.contains("Model X"));
    }

    #[test]
    fn quoted_arguments_keep_spaces() {
        let (out, _) = scan("// \\sift_eval ( msg=\"a b\" ${msg} )\n");
        assert!(out.contains("a b"));
    }

    #[test]
    fn flags_and_increments() {
        let registry = DirectiveRegistry::with_defaults();
        let env = RunEnv::new("sift_");
        let mut global = VarMap::new();
        global.store("count", "5");
        let mut scanner = Scanner::new(&registry, global, env);
        // count++ reads 5, bumps the global to 6.
        let out = scanner
            .scan_text("// \\sift_eval ( count++ ${count} )\n", false)
            .unwrap();
        assert!(out.contains("5"));
        assert_eq!(scanner.global().value("count"), Some("6"));
    }

    #[test]
    fn pre_increment_updates_the_local_binding() {
        let registry = DirectiveRegistry::with_defaults();
        let env = RunEnv::new("sift_");
        let mut global = VarMap::new();
        global.store("n", "1");
        let mut scanner = Scanner::new(&registry, global, env);
        let out = scanner
            .scan_text("// \\sift_eval ( ++n ${n} )\n", false)
            .unwrap();
        // The term and the local binding see the new value; the global map
        // is untouched by the pre form.
        assert!(out.contains("2"));
        assert_eq!(scanner.global().value("n"), Some("1"));
    }

    #[test]
    fn unbound_plus_plus_is_an_enable_flag() {
        let (out, diags) = scan("// \\sift_eval ( ++verbose ${verbose} )\n");
        assert!(out.contains("// 1"));
        assert!(diags.is_empty());
    }

    #[test]
    fn conditional_first_match_wins() {
        let source = "// \\sift_if ( 1 == 1 ) { first } elseif ( 2 == 2 ) { second } else { third } endif\n";
        let (out, _) = scan(source);
        assert!(out.contains("first"));
        assert!(!out.contains("second"));
        assert!(!out.contains("third"));
    }

    #[test]
    fn conditional_else_branch() {
        let source = "// \\sift_if ( 1 == 2 ) { a } else { b } endif\n";
        let (out, _) = scan(source);
        assert!(out.contains("b"));
        assert!(!out.contains(" a "));
    }

    #[test]
    fn conditional_no_match_is_empty() {
        let source = "// \\sift_if ( 1 == 2 ) { a } endif tail\n";
        let (out, _) = scan(source);
        assert!(!out.contains(" a "));
        assert!(out.contains("tail"));
    }

    #[test]
    fn conditional_body_expands_variables() {
        let registry = DirectiveRegistry::with_defaults();
        let env = RunEnv::new("sift_");
        let mut global = VarMap::new();
        global.store("W", "32");
        let mut scanner = Scanner::new(&registry, global, env);
        let out = scanner
            .scan_text("// \\sift_if ( -n ${W} ) { width=${W} } endif\n", false)
            .unwrap();
        assert!(out.contains("width=32"));
    }

    #[test]
    fn conditional_body_runs_nested_directives() {
        let source = "// \\sift_if ( 1 == 1 ) { \\sift_eval ( a=9 ${a} ) } endif\n";
        let (out, _) = scan(source);
        assert!(out.contains("9"));
    }

    #[test]
    fn nested_directive_inside_arguments() {
        let source = "// \\sift_eval ( x=\\sift_eval ( a=7 ${a} ) ${x} )\n";
        let (out, _) = scan(source);
        assert!(out.contains("// 7"));
    }

    #[test]
    fn malformed_call_is_reported_inline() {
        let (out, diags) = scan("// \\sift_eval no parens here\n");
        assert!(out.contains("malformed call"));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn include_splices_and_restores_current_file() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("inner.scad");
        std::fs::write(&inner, "// \\sift_eval ( a=in ${a} )\n").unwrap();

        let registry = DirectiveRegistry::with_defaults();
        let env = RunEnv::new("sift_");
        let mut scanner = Scanner::new(&registry, VarMap::new(), env);
        scanner.env.current_file = "outer.scad".to_string();
        let source = format!("// \\sift_include ( {} )\nafter\n", inner.display());
        let out = scanner.scan_text(&source, false).unwrap();
        assert!(out.contains("// in"));
        assert!(out.contains("after"));
        assert_eq!(scanner.env().current_file, "outer.scad");
        assert!(scanner
            .global()
            .value("FILE_LIST")
            .unwrap()
            .contains("inner.scad"));
    }

    #[test]
    fn include_with_search_miss_is_fatal() {
        let registry = DirectiveRegistry::with_defaults();
        let env = RunEnv::new("sift_");
        let mut scanner = Scanner::new(&registry, VarMap::new(), env);
        let result = scanner.scan_text("// \\sift_include search ( ghost.scad )\n", false);
        match result {
            Err(ScanError::IncludeNotFound { name }) => assert_eq!(name, "ghost.scad"),
            other => panic!("expected IncludeNotFound, got {:?}", other),
        }
    }

    #[test]
    fn include_copy_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("raw.txt");
        std::fs::write(&inner, "// \\sift_eval ( never )\n").unwrap();

        let registry = DirectiveRegistry::with_defaults();
        let env = RunEnv::new("sift_");
        let mut scanner = Scanner::new(&registry, VarMap::new(), env);
        let source = format!("// \\sift_include copy ( {} )\n", inner.display());
        let out = scanner.scan_text(&source, false).unwrap();
        // The directive inside the copied file is not evaluated.
        assert!(out.contains("\\sift_eval ( never )"));
    }

    #[test]
    fn scan_file_seeds_predefined_variables() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("model.scad");
        std::fs::write(&file, "// \\sift_eval ( ${BASE}:${STEM}:${EXT} )\n").unwrap();

        let registry = DirectiveRegistry::with_defaults();
        let env = RunEnv::new("sift_");
        let mut scanner = Scanner::new(&registry, VarMap::new(), env);
        let out = scanner.scan_file(&file).unwrap();
        assert!(out.contains("model.scad:model:scad"));
    }

    #[test]
    fn escaped_token_survives_one_directive() {
        let (out, _) = scan("// \\sift_eval ( \"\\${LATER}\" )\n");
        assert!(out.contains("${LATER}"));
    }
}
