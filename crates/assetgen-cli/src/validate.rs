//! # Validate Subcommand
//!
//! Validates material definitions against a schema from the schema set.
//!
//! Strict mode (the default) turns any invalid file into exit code 1, the
//! way the generator refuses to run on invalid input. `--no-strict` reports
//! the same failures and exits 0. A schema set that cannot be loaded is
//! always exit code 2.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use assetgen_schema::{SchemaValidator, ValidationReport};

/// Report format for `assetgen validate`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per failure plus a summary.
    #[default]
    Text,
    /// The full report as a JSON object.
    Json,
}

/// Arguments for the `assetgen validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Input directory holding `schemas/` and `materials/`.
    #[arg(long, default_value = crate::DEFAULT_INPUT_DIR)]
    pub input: PathBuf,

    /// Schema root used for cross-file `$ref`s [default: <INPUT>/schemas].
    #[arg(long)]
    pub schema_root: Option<PathBuf>,

    /// Schema to validate against, relative to the schema root.
    #[arg(long, default_value = "material.schema.json")]
    pub schema: PathBuf,

    /// Fail on schema validation errors (default).
    #[arg(long, overrides_with = "no_strict")]
    pub strict: bool,

    /// Report validation errors but exit successfully.
    #[arg(long, overrides_with = "strict")]
    pub no_strict: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Files or directories to validate [default: <INPUT>/materials].
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,
}

impl ValidateArgs {
    pub fn is_strict(&self) -> bool {
        !self.no_strict
    }

    pub fn schema_root(&self) -> PathBuf {
        match &self.schema_root {
            Some(root) => root.clone(),
            None => self.input.join("schemas"),
        }
    }

    /// Paths to validate; relative paths are taken from the working directory.
    pub fn targets(&self) -> Vec<PathBuf> {
        if self.paths.is_empty() {
            vec![self.input.join("materials")]
        } else {
            self.paths.clone()
        }
    }
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 on success, 1 on validation failure in strict mode,
/// 2 when the schema set itself is broken.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let schema_root = args.schema_root();
    anyhow::ensure!(
        schema_root.is_dir(),
        "schema root {} is not a directory",
        schema_root.display()
    );

    let validator = SchemaValidator::new(&schema_root);
    if let Err(e) = validator.load_schema(&args.schema) {
        tracing::error!(schema = %args.schema.display(), error = %e, "cannot load root schema");
        println!("ERROR: {e}");
        return Ok(2);
    }

    tracing::info!(
        schema_root = %schema_root.display(),
        schema = %args.schema.display(),
        strict = args.is_strict(),
        "validating material definitions"
    );

    let report = validator.validate_paths(&args.targets(), &args.schema);
    print_report(&report, args.format, &args.input)?;

    if !report.is_success() && !args.is_strict() {
        tracing::warn!(
            failed = report.failed,
            "continuing despite validation failures (--no-strict)"
        );
    }

    Ok(exit_code(&report, args.is_strict()))
}

fn exit_code(report: &ValidationReport, strict: bool) -> u8 {
    if report.has_fatal() {
        2
    } else if strict && !report.is_success() {
        1
    } else {
        0
    }
}

fn print_report(report: &ValidationReport, format: OutputFormat, input: &Path) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
            println!("{json}");
        }
        OutputFormat::Text => {
            for failure in &report.failures {
                let rel = failure.path.strip_prefix(input).unwrap_or(&failure.path);
                println!("FAIL: {}: {}", rel.display(), failure.message);
            }
            println!("Materials: {}/{} passed", report.passed, report.total);
        }
    }
    Ok(())
}
