//! Directive dispatch
//!
//! `DirectiveRegistry` resolves a directive name to a builtin handler or,
//! failing that, to an external executable named by convention under
//! `<lib-path>/functions/`. Every invocation runs against a fresh local
//! scope: a field-wise copy of the global variable map taken when the call
//! starts. Directives mutate only their local copy; promotion to the global
//! map happens solely through the caller's explicit result-variable store.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::args::ArgList;
use crate::error::DirectiveError;
use crate::exec;
use crate::varmap::VarMap;

/// Run-wide environment shared by the scanner and the directive handlers.
#[derive(Debug, Clone)]
pub struct RunEnv {
    /// Directive namespace prefix, e.g. `sift_`.
    pub namespace: String,
    /// Prefix for synthesized positional argument names.
    pub positional_prefix: String,
    /// Separator splitting list-valued option strings.
    pub field_separator: String,
    /// Root of the support library (external functions live below it).
    pub lib_path: PathBuf,
    /// Search path for included and referenced files.
    pub include_paths: Vec<PathBuf>,
    /// Where generated artifacts (copies, extracted scripts) are written.
    pub output_dir: PathBuf,
    /// Shell used by the `shell` directive.
    pub shell: PathBuf,
    /// How many missing files are tolerated before an error is raised.
    pub not_found_limit: u32,
    not_found_count: u32,
    /// File and line of the directive currently being evaluated.
    pub current_file: String,
    pub current_line: usize,
}

impl RunEnv {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            positional_prefix: "arg".to_string(),
            field_separator: ",".to_string(),
            lib_path: PathBuf::new(),
            include_paths: Vec::new(),
            output_dir: PathBuf::from("."),
            shell: which::which("sh").unwrap_or_else(|_| PathBuf::from("/bin/sh")),
            not_found_limit: 0,
            not_found_count: 0,
            current_file: String::new(),
            current_line: 1,
        }
    }

    /// Directory searched for external function executables.
    pub fn functions_dir(&self) -> PathBuf {
        self.lib_path.join("functions")
    }

    /// Record a missing file against the tolerance counter. Returns an
    /// error once the configured limit is exceeded.
    pub fn record_missing(&mut self) -> Result<(), DirectiveError> {
        self.not_found_count += 1;
        if self.not_found_count > self.not_found_limit {
            return Err(DirectiveError::TooManyMissingFiles {
                count: self.not_found_count,
                limit: self.not_found_limit,
            });
        }
        Ok(())
    }

    pub fn missing_count(&self) -> u32 {
        self.not_found_count
    }
}

/// Everything a handler sees for one invocation.
pub struct DirectiveCall<'a> {
    /// Parsed argument terms; term 0 is the directive's own name.
    pub args: ArgList,
    /// Snapshot of the global map at call start. Discarded afterwards.
    pub local: VarMap,
    /// The persistent global map; written only for explicit stores.
    pub global: &'a mut VarMap,
    pub env: &'a mut RunEnv,
}

impl<'a> DirectiveCall<'a> {
    /// Expand `text` in the local scope.
    pub fn expand(&self, text: &str) -> Result<String, DirectiveError> {
        self.local.expand_text(text).map_err(DirectiveError::from)
    }

    /// Positional argument values after the directive-name term.
    pub fn positionals(&self) -> Vec<&str> {
        let values = self.args.values(false, true);
        values.into_iter().skip(1).collect()
    }
}

/// A builtin directive.
///
/// Implementations declare their recognized option aliases; the registry
/// rejects any supplied named argument that matches none of them before the
/// handler runs. Arity and list-length checks are the handler's own
/// concern.
pub trait Directive: Send + Sync {
    /// The directive name without the namespace prefix.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Recognized named-option alias groups, first alias canonical.
    fn options(&self) -> &[&[&str]] {
        &[]
    }

    /// Directives whose named arguments are data rather than options (e.g.
    /// `eval`) opt out of option validation.
    fn allows_unknown_options(&self) -> bool {
        false
    }

    fn evaluate(&self, call: &mut DirectiveCall<'_>) -> Result<String, DirectiveError>;
}

/// Reject named arguments that match no declared alias.
pub fn validate_options(
    directive: &str,
    options: &[&[&str]],
    args: &ArgList,
) -> Result<(), DirectiveError> {
    for term in args.terms().iter().filter(|t| !t.positional) {
        let known = options
            .iter()
            .any(|aliases| aliases.contains(&term.name.as_str()));
        if !known {
            return Err(DirectiveError::UnknownOption {
                directive: directive.to_string(),
                option: term.name.clone(),
            });
        }
    }
    Ok(())
}

/// Registry of builtin directives with external-executable fallback.
pub struct DirectiveRegistry {
    directives: HashMap<String, Box<dyn Directive>>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self {
            directives: HashMap::new(),
        }
    }

    /// Register a directive. Same-name registration replaces.
    pub fn register<D: Directive + 'static>(&mut self, directive: D) {
        self.directives
            .insert(directive.name().to_string(), Box::new(directive));
    }

    pub fn has(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    /// All registered names with descriptions, sorted.
    pub fn list(&self) -> Vec<(String, String)> {
        let mut entries: Vec<_> = self
            .directives
            .values()
            .map(|d| (d.name().to_string(), d.description().to_string()))
            .collect();
        entries.sort();
        entries
    }

    /// Resolve and run a directive: builtin first, then the external
    /// convention, else an unknown-function error for the caller to render
    /// inline.
    pub fn evaluate(
        &self,
        name: &str,
        call: &mut DirectiveCall<'_>,
    ) -> Result<String, DirectiveError> {
        if let Some(directive) = self.directives.get(name) {
            if !directive.allows_unknown_options() {
                validate_options(name, directive.options(), &call.args)?;
            }
            return directive.evaluate(call);
        }
        self.evaluate_external(name, call)
    }

    /// Run `<lib-path>/functions/<namespace><name>` with positional args as
    /// bare tokens and named args as `name=value` tokens, capturing stdout.
    fn evaluate_external(
        &self,
        name: &str,
        call: &mut DirectiveCall<'_>,
    ) -> Result<String, DirectiveError> {
        let full_name = format!("{}{}", call.env.namespace, name);
        let candidate = call.env.functions_dir().join(&full_name);
        if !candidate.exists() {
            return Err(DirectiveError::UnknownFunction(full_name));
        }
        if !exec::is_executable(&candidate) {
            return Err(DirectiveError::NotExecutable(candidate));
        }
        let mut argv = Vec::new();
        for value in call.positionals() {
            argv.push(call.expand(value)?);
        }
        for pair in call.args.named_pairs() {
            argv.push(call.expand(&pair)?);
        }
        let captured = exec::capture(&candidate, &argv)?;
        Ok(captured.stdout)
    }

    /// Registry preloaded with the builtin directive set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(crate::directives::eval::Eval);
        registry.register(crate::directives::define::Define);
        registry.register(crate::directives::define::Undefine);
        registry.register(crate::directives::shell::Shell);
        registry.register(crate::directives::find::Find);
        registry.register(crate::directives::copy::Copy);
        registry.register(crate::directives::word::Word);
        registry.register(crate::directives::table::Table);
        registry.register(crate::directives::image::Image);
        registry
    }
}

impl Default for DirectiveRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
