//! define / undefine — deferred macro text and its removal.
//!
//! `define` returns its positional text raw, without expansion; combined
//! with a result variable it is the macro-definition form, and `\${...}`
//! escapes inside the body defer expansion to the point of use. `undefine`
//! removes bindings from the global map.

use crate::dispatch::{Directive, DirectiveCall};
use crate::error::DirectiveError;

pub struct Define;

impl Directive for Define {
    fn name(&self) -> &str {
        "define"
    }

    fn description(&self) -> &str {
        "Return positional text unexpanded, for storing into a variable"
    }

    fn evaluate(&self, call: &mut DirectiveCall<'_>) -> Result<String, DirectiveError> {
        Ok(call.positionals().join(" "))
    }
}

pub struct Undefine;

impl Directive for Undefine {
    fn name(&self) -> &str {
        "undefine"
    }

    fn description(&self) -> &str {
        "Remove the named variables from the global map"
    }

    fn evaluate(&self, call: &mut DirectiveCall<'_>) -> Result<String, DirectiveError> {
        let names: Vec<String> = call.positionals().iter().map(|n| n.to_string()).collect();
        for name in names {
            call.global.unstore(&name);
        }
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ArgList;
    use crate::dispatch::RunEnv;
    use crate::varmap::VarMap;

    #[test]
    fn define_returns_text_unexpanded() {
        let mut global = VarMap::new();
        global.store("X", "now");
        let mut env = RunEnv::new("sift_");
        let mut args = ArgList::new("arg");
        args.store("define");
        args.store("${X}");
        args.store("later");
        let mut call = DirectiveCall {
            args,
            local: global.clone(),
            global: &mut global,
            env: &mut env,
        };
        assert_eq!(Define.evaluate(&mut call).unwrap(), "${X} later");
    }

    #[test]
    fn undefine_removes_from_global() {
        let mut global = VarMap::new();
        global.store("A", "1");
        global.store("B", "2");
        let mut env = RunEnv::new("sift_");
        let mut args = ArgList::new("arg");
        args.store("undefine");
        args.store("A");
        args.store("B");
        let mut call = DirectiveCall {
            args,
            local: global.clone(),
            global: &mut global,
            env: &mut env,
        };
        assert_eq!(Undefine.evaluate(&mut call).unwrap(), "");
        assert!(!global.exists("A"));
        assert!(!global.exists("B"));
    }

    #[test]
    fn define_rejects_named_arguments() {
        use crate::dispatch::validate_options;
        let mut args = ArgList::new("arg");
        args.store("define");
        args.store_named("oops", "1");
        assert!(validate_options("define", Define.options(), &args).is_err());
    }
}
