//! Command-line interface for sift
//! This binary filters a comment-annotated source file into the stream a
//! documentation generator consumes, or extracts the embedded auxiliary
//! scripts from the same source.
//!
//! Usage:
//!   sift `<path>` [--config `<file>`] [-I `<dir>`]... [-D NAME=VALUE]...  - Filter a source file
//!   sift `<path>` --extract                                              - Extract embedded scripts
//!   sift --list-directives                                               - List builtin directives

use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction, Command};

use sift_config::{Loader, SiftConfig};
use sift_core::extract::ExtractConfig;
use sift_core::paths::FileParts;
use sift_core::{DirectiveRegistry, ExpandPolicy, RunEnv, Scanner, VarMap};

fn main() {
    let matches = Command::new("sift")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A documentation input filter for comment-annotated sources")
        .arg_required_else_help(true)
        .arg(
            Arg::new("path")
                .help("Path to the annotated source file")
                .required_unless_present("list-directives")
                .index(1),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file (TOML), layered over the built-in defaults"),
        )
        .arg(
            Arg::new("lib-path")
                .long("lib-path")
                .help("Support library root; external functions live under functions/"),
        )
        .arg(
            Arg::new("include")
                .long("include")
                .short('I')
                .help("Add an include search path (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("define")
                .long("define")
                .short('D')
                .help("Predefine a variable as NAME=VALUE (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Write the filtered stream to a file instead of stdout"),
        )
        .arg(
            Arg::new("extract")
                .long("extract")
                .help("Extract embedded scripts instead of filtering")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-directives")
                .long("list-directives")
                .help("List builtin directives")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("list-directives") {
        handle_list_directives();
        return;
    }

    let config = load_config(matches.get_one::<String>("config"));
    let path = matches
        .get_one::<String>("path")
        .expect("path is required unless listing directives");

    if matches.get_flag("extract") {
        handle_extract(path, &config);
        return;
    }

    let includes: Vec<String> = matches
        .get_many::<String>("include")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let defines: Vec<String> = matches
        .get_many::<String>("define")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let lib_path = matches.get_one::<String>("lib-path").cloned();
    let output = matches.get_one::<String>("output").cloned();

    handle_filter(path, &config, &includes, &defines, lib_path, output);
}

fn load_config(file: Option<&String>) -> SiftConfig {
    let loader = match file {
        Some(path) => Loader::new().with_file(path),
        None => Loader::new().with_optional_file("sift.toml"),
    };
    loader.build().unwrap_or_else(|e| {
        eprintln!("sift: configuration error: {}", e);
        std::process::exit(1);
    })
}

/// Build the expansion policy the configuration describes.
fn expand_policy(config: &SiftConfig) -> ExpandPolicy {
    ExpandPolicy {
        prefix: config.expand.prefix.clone(),
        suffix: config.expand.suffix.clone(),
        escape_prefix: config.expand.escape_prefix.clone(),
        escape_suffix: config.expand.escape_suffix.clone(),
        escape_prefix_strip: config.expand.escape_prefix_strip,
        escape_suffix_strip: config.expand.escape_suffix_strip,
        report_on_miss: config.expand.report_on_miss,
        report_message: config.expand.report_message.clone(),
        max_passes: match config.expand.max_passes {
            0 => None,
            n => Some(n),
        },
    }
}

fn run_env(config: &SiftConfig, includes: &[String], lib_path: Option<String>) -> RunEnv {
    let mut env = RunEnv::new(config.filter.namespace.clone());
    env.positional_prefix = config.filter.positional_prefix.clone();
    env.field_separator = config.filter.field_separator.clone();
    env.lib_path = PathBuf::from(lib_path.unwrap_or_else(|| config.paths.lib_path.clone()));
    env.output_dir = PathBuf::from(&config.paths.output_dir);
    env.not_found_limit = config.limits.not_found_tolerance;
    env.include_paths = config
        .paths
        .include_paths
        .iter()
        .chain(includes.iter())
        .map(PathBuf::from)
        .collect();
    env
}

/// Handle the filter command
fn handle_filter(
    path: &str,
    config: &SiftConfig,
    includes: &[String],
    defines: &[String],
    lib_path: Option<String>,
    output: Option<String>,
) {
    let mut global = VarMap::with_policy(expand_policy(config)).unwrap_or_else(|e| {
        eprintln!("sift: {}", e);
        std::process::exit(1);
    });
    let env = run_env(config, includes, lib_path);

    // Run-configuration variables, pushed in after config parsing.
    global.store("OUTPUT_DIR", config.paths.output_dir.clone());
    global.store(
        "HTML_OUTPUT",
        Path::new(&config.paths.output_dir)
            .join(&config.paths.html_dir)
            .display()
            .to_string(),
    );
    global.store(
        "LATEX_OUTPUT",
        Path::new(&config.paths.output_dir)
            .join(&config.paths.latex_dir)
            .display()
            .to_string(),
    );
    global.store("PATH_JOINER", config.paths.path_joiner.clone());
    global.store("LIB_PATH", env.lib_path.display().to_string());
    global.store("SHELL", env.shell.display().to_string());

    for define in defines {
        match define.split_once('=') {
            Some((name, value)) => global.store(name, value),
            None => global.store(define.as_str(), "1"),
        }
    }

    let registry = DirectiveRegistry::with_defaults();
    let mut scanner = Scanner::new(&registry, global, env);
    let filtered = scanner.scan_file(Path::new(path)).unwrap_or_else(|e| {
        eprintln!("sift: {}", e);
        std::process::exit(1);
    });

    match output {
        Some(target) => {
            std::fs::write(&target, filtered).unwrap_or_else(|e| {
                eprintln!("sift: unable to write {}: {}", target, e);
                std::process::exit(1);
            });
        }
        None => print!("{}", filtered),
    }
}

/// Handle the extract command
fn handle_extract(path: &str, config: &SiftConfig) {
    let source = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("sift: unable to read file {}: {}", path, e);
        std::process::exit(1);
    });
    let extract_config = ExtractConfig {
        namespace: config.filter.namespace.clone(),
        begin_name: config.extract.begin_name.clone(),
        end_name: config.extract.end_name.clone(),
        joiner: config.extract.joiner.clone(),
        extension: config.extract.extension.clone(),
        output_dir: PathBuf::from(&config.paths.output_dir),
    };
    let stem = FileParts::of(Path::new(path)).stem;
    let report = sift_core::extract::extract(&source, &stem, &extract_config).unwrap_or_else(|e| {
        eprintln!("sift: {}", e);
        std::process::exit(1);
    });
    for diagnostic in &report.diagnostics {
        eprintln!("sift: {}: {}", path, diagnostic);
    }
    for script in &report.scripts {
        println!("{}", script.path.display());
    }
}

/// Handle the list-directives command
fn handle_list_directives() {
    let registry = DirectiveRegistry::with_defaults();
    println!("Builtin directives:\n");
    for (name, description) in registry.list() {
        println!("  {:<10} {}", name, description);
    }
    println!("\nScanner forms: if/elseif/else/endif, include, begin/end");
}
