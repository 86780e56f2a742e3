//! The testgen command-line interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::path::Path;
use std::process;
use std::sync::Once;

use clap::Parser;
use tracing::debug;
use walkdir::WalkDir;

use crate::cli::args::{Command, TestgenArgs};
use crate::config::{GeneratorConfig, InstanceMode};
use crate::errors::{print_error, unspanned, ErrorKind, ErrorReporting, PhaseContext, TestgenError};
use crate::pipeline::{extract_from_source, generate_from_file, read_source};

pub mod args;
pub mod output;

static TRACING_INIT: Once = Once::new();

/// Installs the stderr log subscriber once. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = match std::env::var("RUST_LOG") {
            Ok(_) => EnvFilter::from_default_env(),
            Err(_) if verbose => EnvFilter::new("testgen=debug"),
            Err(_) => return,
        };
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(filter)
            .init();
    });
}

/// The main entry point for the CLI.
pub fn run() {
    let args = TestgenArgs::parse();
    init_tracing(args.verbose);

    let result = match args.command {
        Command::Generate {
            file,
            class,
            output,
            shared,
            config,
            check,
        } => {
            let options = GenerateOptions {
                class,
                output: output.as_deref(),
                shared,
                config: config.as_deref(),
                check,
            };
            handle_generate(&file, options)
        }
        Command::Inspect { file, class, json } => handle_inspect(&file, class.as_deref(), json),
        Command::Scan { path } => handle_scan(&path),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            print_error(e);
            process::exit(1);
        }
    }
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

struct GenerateOptions<'a> {
    class: Option<String>,
    output: Option<&'a Path>,
    shared: bool,
    config: Option<&'a Path>,
    check: bool,
}

/// Returns `Ok(false)` when `--check` found a stale file.
fn handle_generate(file: &Path, options: GenerateOptions<'_>) -> Result<bool, TestgenError> {
    let mut config = match options.config {
        Some(path) => GeneratorConfig::from_yaml_file(path)?,
        None => GeneratorConfig::default(),
    };
    if options.class.is_some() {
        config.class_filter = options.class;
    }
    if options.shared {
        config.instance_mode = InstanceMode::Shared;
    }
    debug!(?config, "resolved configuration");

    let generation = generate_from_file(file, &config)?;
    output::print_warnings(&generation.warnings);

    let Some(target) = options.output else {
        print!("{}", generation.output);
        return Ok(true);
    };

    if options.check {
        let existing = read_source(target)?;
        if existing == generation.output {
            output::print_status(&format!("{} is up to date", target.display()), true);
            return Ok(true);
        }
        output::print_diff(&existing, &generation.output);
        output::print_status(
            &format!("{} is out of date; regenerate it", target.display()),
            false,
        );
        return Ok(false);
    }

    generation.write_to(target)?;
    output::print_status(
        &format!(
            "wrote {} test cases from {} classes to {}",
            generation.case_count(),
            generation.units.len(),
            target.display()
        ),
        true,
    );
    Ok(true)
}

fn handle_inspect(file: &Path, class: Option<&str>, json: bool) -> Result<bool, TestgenError> {
    let source = read_source(file)?;
    let extracted = extract_from_source(&source, &file.display().to_string(), class)?;

    if json {
        output::print_json(&extracted.units).map_err(|e| {
            PhaseContext::detached("inspect").report(
                ErrorKind::Io {
                    operation: "serialize".into(),
                    path: file.display().to_string(),
                    reason: e.to_string(),
                },
                unspanned(),
            )
        })?;
    } else {
        output::print_inspection(&extracted.units);
    }
    output::print_warnings(&extracted.warnings);
    Ok(true)
}

fn handle_scan(root: &Path) -> Result<bool, TestgenError> {
    if !root.exists() {
        let ctx = PhaseContext::detached("scan");
        return Err(ctx.report(
            ErrorKind::SourceNotFound {
                path: root.display().to_string(),
            },
            unspanned(),
        ));
    }

    let mut files: Vec<_> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "py"))
        .collect();
    files.sort();

    let (mut total_cases, mut skipped) = (0, 0);
    for path in &files {
        let name = path.display().to_string();
        let extracted = read_source(path).and_then(|source| extract_from_source(&source, &name, None));
        match extracted {
            Ok(extracted) => {
                let cases: usize = extracted.units.iter().map(|u| u.case_count()).sum();
                total_cases += cases;
                output::print_scan_row(&name, extracted.units.len(), cases);
            }
            Err(e) => {
                debug!(path = %name, error = %e, "skipping unreadable file");
                skipped += 1;
            }
        }
    }

    output::print_status(
        &format!(
            "{} test cases in {} files ({} skipped)",
            total_cases,
            files.len() - skipped,
            skipped
        ),
        true,
    );
    Ok(true)
}
