//! Orchestrates one generation run: read, extract, lower, print.
//!
//! Fatal conditions come back as [`TestgenError`]; everything that only
//! degrades individual lines or cases is collected as warnings on the
//! [`Generation`].

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::codegen::{is_identifier, lower_module, print_module};
use crate::config::GeneratorConfig;
use crate::errors::{
    unspanned, ErrorKind, ErrorReporting, GenerationWarning, PhaseContext, SourceContext,
    TestgenError,
};
use crate::source::{extract_units, normalize_source, ExtractedSource, SourceUnit};

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct Generation {
    /// The emitted Python test module.
    pub output: String,
    pub units: Vec<SourceUnit>,
    pub warnings: Vec<GenerationWarning>,
}

impl Generation {
    pub fn case_count(&self) -> usize {
        self.units.iter().map(SourceUnit::case_count).sum()
    }

    /// Writes the emitted module, creating missing parent directories.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), TestgenError> {
        let path = path.as_ref();
        let ctx = PhaseContext::detached("write");
        let io_error = |e: std::io::Error| {
            ctx.report(
                ErrorKind::Io {
                    operation: "write".into(),
                    path: path.display().to_string(),
                    reason: e.to_string(),
                },
                unspanned(),
            )
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(path, &self.output).map_err(io_error)?;
        info!(path = %path.display(), bytes = self.output.len(), "wrote test module");
        Ok(())
    }
}

/// Generates a test module from source text. `source_name` is the path the
/// generated module uses to import the source.
pub fn generate_from_source(
    source: &str,
    source_name: &str,
    config: &GeneratorConfig,
) -> Result<Generation, TestgenError> {
    config.validate().map_err(|e| {
        PhaseContext::detached("config").report(
            ErrorKind::InvalidConfig {
                path: "<options>".into(),
                reason: e.to_string(),
            },
            unspanned(),
        )
    })?;

    let extracted = extract_from_source(source, source_name, config.class_filter.as_deref())?;
    if extracted.units.is_empty() {
        let ctx = PhaseContext::detached("generate");
        return Err(ctx.report(
            ErrorKind::NoQualifyingContent {
                source: source_name.to_string(),
            },
            unspanned(),
        ));
    }
    for warning in &extracted.warnings {
        warn!(source = source_name, "{}", warning);
    }

    let module = module_name(source_name, config);
    if !module.split('.').all(is_identifier) {
        warn!(module = %module, "source file name is not importable as a module");
    }
    let lowered = lower_module(&extracted.units, source_name, &module, config);
    let output = print_module(&lowered);

    let generation = Generation {
        output,
        units: extracted.units,
        warnings: extracted.warnings,
    };
    debug!(
        source = source_name,
        classes = generation.units.len(),
        cases = generation.case_count(),
        "generated test module"
    );
    Ok(generation)
}

/// Reads `path` and generates from its contents.
pub fn generate_from_file(
    path: impl AsRef<Path>,
    config: &GeneratorConfig,
) -> Result<Generation, TestgenError> {
    let path = path.as_ref();
    let source = read_source(path)?;
    generate_from_source(&source, &path.display().to_string(), config)
}

/// Tokenizes and extracts without emitting anything.
pub fn extract_from_source(
    source: &str,
    source_name: &str,
    filter: Option<&str>,
) -> Result<ExtractedSource, TestgenError> {
    let source = normalize_source(source);
    let ctx = PhaseContext::new(SourceContext::from_file(source_name, source.as_str()), "extract");
    extract_units(&source, filter, &ctx)
}

pub fn read_source(path: &Path) -> Result<String, TestgenError> {
    let ctx = PhaseContext::detached("read");
    let display = path.display().to_string();
    if !path.exists() {
        return Err(ctx.report(ErrorKind::SourceNotFound { path: display }, unspanned()));
    }
    fs::read_to_string(path).map_err(|e| {
        ctx.report(
            ErrorKind::Io {
                operation: "read".into(),
                path: display,
                reason: e.to_string(),
            },
            unspanned(),
        )
    })
}

/// Configured module name, or the file stem of `source_name`.
pub fn module_name(source_name: &str, config: &GeneratorConfig) -> String {
    if let Some(name) = &config.module_name {
        return name.clone();
    }
    Path::new(source_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_name.to_string())
}
