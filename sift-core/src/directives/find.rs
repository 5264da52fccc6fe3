//! find — locate a file through the include search paths.
//!
//! Returns the resolved path, or the empty string when the file is missing
//! and the miss is still within the configured tolerance.

use crate::dispatch::{Directive, DirectiveCall};
use crate::error::DirectiveError;
use crate::paths;

pub struct Find;

impl Directive for Find {
    fn name(&self) -> &str {
        "find"
    }

    fn description(&self) -> &str {
        "Resolve a file name through the include search paths"
    }

    fn evaluate(&self, call: &mut DirectiveCall<'_>) -> Result<String, DirectiveError> {
        let positionals = call.positionals();
        if positionals.len() != 1 {
            return Err(DirectiveError::WrongArity {
                directive: "find".to_string(),
                expected: 1,
                got: positionals.len(),
            });
        }
        let name = call.expand(positionals[0])?;
        match paths::search(&name, &call.env.include_paths) {
            Some(found) => Ok(found.to_string_lossy().into_owned()),
            None => {
                call.env.record_missing()?;
                Ok(String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ArgList;
    use crate::dispatch::RunEnv;
    use crate::varmap::VarMap;

    fn run(env: &mut RunEnv, name: &str) -> Result<String, DirectiveError> {
        let mut global = VarMap::new();
        let mut args = ArgList::new("arg");
        args.store("find");
        args.store(name);
        let mut call = DirectiveCall {
            args,
            local: global.clone(),
            global: &mut global,
            env,
        };
        Find.evaluate(&mut call)
    }

    #[test]
    fn finds_through_include_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("part.scad"), "x").unwrap();
        let mut env = RunEnv::new("sift_");
        env.include_paths = vec![dir.path().to_path_buf()];
        let found = run(&mut env, "part.scad").unwrap();
        assert!(found.ends_with("part.scad"));
    }

    #[test]
    fn miss_within_tolerance_returns_empty() {
        let mut env = RunEnv::new("sift_");
        env.not_found_limit = 1;
        assert_eq!(run(&mut env, "absent.scad").unwrap(), "");
        assert_eq!(env.missing_count(), 1);
    }

    #[test]
    fn miss_beyond_tolerance_is_an_error() {
        let mut env = RunEnv::new("sift_");
        env.not_found_limit = 0;
        assert!(matches!(
            run(&mut env, "absent.scad"),
            Err(DirectiveError::TooManyMissingFiles { .. })
        ));
    }

    #[test]
    fn wrong_arity() {
        let mut global = VarMap::new();
        let mut env = RunEnv::new("sift_");
        let mut args = ArgList::new("arg");
        args.store("find");
        let mut call = DirectiveCall {
            args,
            local: global.clone(),
            global: &mut global,
            env: &mut env,
        };
        assert!(matches!(
            Find.evaluate(&mut call),
            Err(DirectiveError::WrongArity { .. })
        ));
    }
}
