//! importloc CLI - загрузить модуль или объект по локации и напечатать его.
//!
//! Использование:
//!   importloc <SPEC>                 - загрузить `pkg.mod:Obj` или `dir/file.sx:Obj`
//!   importloc <SPEC> --json          - вывести результат в JSON
//!   importloc --help                 - справка

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::PoisonError;

use clap::Parser;
use importloc::{
    ConflictResolution, LoadOptions, LocError, Location, ModuleConfig, ModuleLoader, Value,
};
use serde_json::json;

const ENVIRONMENT: &str = "\
ENVIRONMENT:
    IMPORTLOC_PATH       Extra search paths (platform path list)
    IMPORTLOC_WORKDIR    Base directory for relative paths
    RUST_LOG             Log filter, e.g. RUST_LOG=importloc=debug";

/// Load SX modules and objects by location
#[derive(Parser, Debug)]
#[command(name = "importloc", version, about, long_about = None, after_help = ENVIRONMENT)]
struct Args {
    /// `pkg.mod`, `pkg.mod:Obj.Nested` or `dir/file.sx[:Obj]`
    spec: String,

    /// Register the module under NAME
    #[arg(long)]
    name: Option<String>,

    /// reuse | reload | replace | rename | raise (default: raise)
    #[arg(long, value_name = "POLICY")]
    on_conflict: Option<ConflictResolution>,

    /// On conflict retry under a random name
    #[arg(long, conflicts_with = "on_conflict")]
    rename_random: bool,

    /// Add a module search path (repeatable)
    #[arg(long = "path", value_name = "DIR")]
    paths: Vec<PathBuf>,

    /// Read search paths and working dir from a JSON file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    if let Err(err) = run(args) {
        eprintln!("Error: {}", err);
        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), LocError> {
    let location = Location::parse(&args.spec)?;

    let mut loader = ModuleLoader::global()
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(path) = &args.config {
        let text = fs::read_to_string(path).map_err(|source| LocError::Io {
            path: path.clone(),
            source,
        })?;
        let config = ModuleConfig::from_json_str(&text)?;
        for dir in config.search_paths {
            loader.add_search_path(dir);
        }
        if config.working_dir.is_some() {
            loader.set_working_dir(config.working_dir);
        }
    }
    for dir in args.paths {
        loader.add_search_path(dir);
    }

    let mut options = LoadOptions::new();
    if let Some(name) = args.name {
        options = options.module_name(name);
    }
    if args.rename_random {
        options = options.rename_random();
    } else if let Some(policy) = args.on_conflict {
        options = options.on_conflict(policy);
    }

    let value = location.load_with(&mut loader, &options)?;

    if args.json {
        let report = json!({
            "location": location,
            "type": value.type_name(),
            "value": value.to_string(),
            "module": module_name(&value),
        });
        println!("{}", report);
    } else {
        println!("{}", value);
    }
    Ok(())
}

fn module_name(value: &Value) -> Option<String> {
    match value {
        Value::Module(module) => Some(module.name().to_string()),
        Value::Class(class) => Some(class.module_name().to_string()),
        Value::Function(function) => Some(function.module_name().to_string()),
        Value::Instance(instance) => Some(instance.class().module_name().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("importloc").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_full_args() {
        let args = parse(&[
            "app/config.sx:Config",
            "--name",
            "conf",
            "--on-conflict",
            "reuse",
            "--path",
            "lib",
            "--path",
            "vendor",
            "--json",
        ])
        .unwrap();

        assert_eq!(args.spec, "app/config.sx:Config");
        assert_eq!(args.name.as_deref(), Some("conf"));
        assert_eq!(args.on_conflict, Some(ConflictResolution::Reuse));
        assert_eq!(args.paths, vec![PathBuf::from("lib"), PathBuf::from("vendor")]);
        assert!(args.json);
        assert!(!args.rename_random);
    }

    #[test]
    fn test_parse_errors() {
        let kind = |args: &[&str]| parse(args).unwrap_err().kind();

        assert_eq!(kind(&[]), ErrorKind::MissingRequiredArgument);
        assert_eq!(kind(&["a", "b"]), ErrorKind::UnknownArgument);
        assert_eq!(kind(&["a", "--on-conflict", "nope"]), ErrorKind::ValueValidation);
        assert_eq!(kind(&["a", "--name"]), ErrorKind::InvalidValue);
        assert_eq!(kind(&["a", "--bogus"]), ErrorKind::UnknownArgument);
        assert_eq!(
            kind(&["a", "--rename-random", "--on-conflict", "reuse"]),
            ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_rename_random_alone() {
        let args = parse(&["pkg.mod", "--rename-random"]).unwrap();
        assert!(args.rename_random);
        assert_eq!(args.on_conflict, None);
    }

    #[test]
    fn test_command_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
