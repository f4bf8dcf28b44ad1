//! Small CLI around the loader. Every command goes through the same `load` a
//! host program would call, so operators can verify their setup before
//! starting anything that needs the key.

use std::env;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use secret_config::config::{ConfigError, Configuration};
use secret_config::exclusion::{is_excluded, setup_instructions};
use secret_config::integrity::{sha256_file, IntegrityError};
use secret_config::SecretValue;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Overrides the secret file location when no path argument is given.
const CONFIG_ENV: &str = "SECRET_CONFIG";
const DEFAULT_SECRET_FILE: &str = "secrets.json";
const EXAMPLE_SECRET_FILE: &str = "secrets.example.json";

/// Failures of a CLI command. Each one ends the process with a non-zero code.
#[derive(Debug, Error)]
enum CliError {
    #[error("config load failed: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error("{} already exists; refusing to overwrite", .0.display())]
    AlreadyExists(PathBuf),
    #[error("unable to copy example {}: {source}", .path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport {
    path: String,
    keys: Vec<KeyReport>,
    fingerprint: String,
    excluded_from_vcs: bool,
}

#[derive(Debug, Serialize)]
struct KeyReport {
    name: &'static str,
    length: usize,
    value: &'static str,
}

fn print_usage() {
    eprintln!("Commands:\n  check [path]\n  init [path]\n  get <KEY> [path]\n  fingerprint [path]\n\nWithout a path, ${CONFIG_ENV} is used, then {DEFAULT_SECRET_FILE}.");
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_path(arg: Option<&String>) -> PathBuf {
    arg.map(PathBuf::from)
        .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRET_FILE))
}

fn example_for(target: &Path) -> PathBuf {
    target.with_file_name(EXAMPLE_SECRET_FILE)
}

fn ignore_file_for(target: &Path) -> PathBuf {
    match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(".gitignore"),
        _ => PathBuf::from(".gitignore"),
    }
}

fn file_name_of(target: &Path) -> String {
    target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Loads the file, printing setup instructions when it does not exist yet.
fn load_or_explain(path: &Path) -> Result<Configuration, CliError> {
    Configuration::load(path).map_err(|err| {
        if matches!(err, ConfigError::NotFound(_)) {
            eprintln!("{}", setup_instructions(&example_for(path), path));
        }
        CliError::from(err)
    })
}

fn check(path: &Path) -> Result<CheckReport, CliError> {
    let config = load_or_explain(path)?;
    let fingerprint = sha256_file(path)?;

    let excluded = is_excluded(ignore_file_for(path), &file_name_of(path));
    if !excluded {
        warn!(
            path = %path.display(),
            "secret file is not listed in .gitignore; add it before committing"
        );
    }

    Ok(CheckReport {
        path: path.display().to_string(),
        keys: config
            .keys()
            .map(|key| KeyReport {
                name: key.as_str(),
                length: config.secret(key).len(),
                value: "<redacted in output>",
            })
            .collect(),
        fingerprint,
        excluded_from_vcs: excluded,
    })
}

/// Copies the example next to `path` into `path`. The target is opened with
/// `create_new`, so an existing secret file is never overwritten.
fn init(path: &Path) -> Result<(), CliError> {
    let example = example_for(path);
    let mut source = File::open(&example).map_err(|source| CliError::Copy {
        path: example.clone(),
        source,
    })?;
    let mut target = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| {
            if source.kind() == io::ErrorKind::AlreadyExists {
                CliError::AlreadyExists(path.to_path_buf())
            } else {
                CliError::Copy {
                    path: example.clone(),
                    source,
                }
            }
        })?;
    io::copy(&mut source, &mut target).map_err(|source| CliError::Copy {
        path: example.clone(),
        source,
    })?;

    info!(path = %path.display(), "created secret file from example");
    eprintln!("Now replace the placeholder key in {}.", path.display());
    if !is_excluded(ignore_file_for(path), &file_name_of(path)) {
        warn!("add {} to .gitignore before committing", file_name_of(path));
    }
    Ok(())
}

fn get_value(key_name: &str, path: &Path) -> Result<SecretValue, CliError> {
    let config = load_or_explain(path)?;
    Ok(config.get(key_name)?.clone())
}

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return ExitCode::FAILURE;
    }

    let outcome = match args[1].as_str() {
        "check" if args.len() <= 3 => check(&resolve_path(args.get(2))).and_then(|report| {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }),
        "init" if args.len() <= 3 => init(&resolve_path(args.get(2))),
        "get" if (3..=4).contains(&args.len()) => {
            get_value(&args[2], &resolve_path(args.get(3))).map(|value| println!("{}", value.expose()))
        }
        "fingerprint" if args.len() <= 3 => sha256_file(resolve_path(args.get(2)))
            .map(|digest| println!("{digest}"))
            .map_err(CliError::from),
        _ => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
