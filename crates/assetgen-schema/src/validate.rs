//! # Validation Entry Point
//!
//! [`SchemaValidator`] ties the pieces together for one generator run: it
//! owns the schema root, the schema document cache, and the compiled
//! pattern cache, and answers "does this file conform?".
//!
//! ## Boundary
//!
//! [`SchemaValidator::validate_file`] never returns an error. Every failure
//! below it is logged against the instance path and turned into `false`, so
//! batch callers can keep going after a bad file. Callers that need the
//! reason use [`SchemaValidator::check_file`].
//!
//! Whether a `false` aborts the run is the caller's decision.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::Level;

use crate::cache::{SchemaCache, SchemaDocument, SchemaSource};
use crate::engine::{Engine, PatternCache, ValidationContext};
use crate::error::SchemaError;
use crate::resolve::Resolver;
use crate::value::{self, Value};

/// Maximum number of chained `$ref` hops before validation gives up.
pub const DEFAULT_MAX_REF_DEPTH: usize = 128;

/// Tunables for a [`SchemaValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Limit on nested `$ref` resolution; guards against cyclic schema sets.
    pub max_ref_depth: usize,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            max_ref_depth: DEFAULT_MAX_REF_DEPTH,
        }
    }
}

/// Validates instance documents against a directory of schema files.
///
/// ## Thread Safety
///
/// `SchemaValidator` is `Send + Sync`. Workers validating different files
/// can share one validator; each schema file is still parsed only once.
#[derive(Debug)]
pub struct SchemaValidator {
    /// Base directory for schema paths and cross-file `$ref`s.
    schema_root: PathBuf,
    cache: SchemaCache,
    patterns: PatternCache,
    options: ValidatorOptions,
}

impl SchemaValidator {
    /// Create a validator reading schemas from the filesystem under `schema_root`.
    pub fn new(schema_root: impl Into<PathBuf>) -> Self {
        Self::with_cache(schema_root, SchemaCache::new(), ValidatorOptions::default())
    }

    /// Create a validator with a custom schema source and options.
    pub fn with_source(
        schema_root: impl Into<PathBuf>,
        source: Arc<dyn SchemaSource>,
        options: ValidatorOptions,
    ) -> Self {
        Self::with_cache(schema_root, SchemaCache::with_source(source), options)
    }

    fn with_cache(
        schema_root: impl Into<PathBuf>,
        cache: SchemaCache,
        options: ValidatorOptions,
    ) -> Self {
        Self {
            schema_root: schema_root.into(),
            cache,
            patterns: PatternCache::default(),
            options,
        }
    }

    pub fn schema_root(&self) -> &Path {
        &self.schema_root
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    pub fn options(&self) -> ValidatorOptions {
        self.options
    }

    /// Load a schema by path. Relative paths are taken from the schema root.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::SchemaLoad`] if the schema cannot be loaded.
    pub fn load_schema(&self, schema_path: &Path) -> Result<Arc<SchemaDocument>, SchemaError> {
        self.cache.get(&self.schema_root.join(schema_path))
    }

    /// Validate an in-memory instance against the schema at `schema_path`.
    ///
    /// # Errors
    ///
    /// Returns the first violation, or the reason the schema or one of its
    /// references could not be used.
    pub fn check_value(&self, instance: &Value, schema_path: &Path) -> Result<(), SchemaError> {
        let document = self.load_schema(schema_path)?;
        let engine = Engine::new(
            Resolver::new(&self.cache, &self.schema_root),
            &self.patterns,
            self.options.max_ref_depth,
        );
        engine.validate(instance, document.root(), &ValidationContext::new(&document))
    }

    /// Parse the instance file and validate it against the schema at `schema_path`.
    ///
    /// `.yaml`/`.yml` instances are parsed as YAML, everything else as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DocumentLoad`] or [`SchemaError::Parse`] if the
    /// instance cannot be read, otherwise the same errors as [`Self::check_value`].
    pub fn check_file(&self, instance_path: &Path, schema_path: &Path) -> Result<(), SchemaError> {
        let instance = load_instance(instance_path)?;
        self.check_value(&instance, schema_path)
    }

    /// Validate a file and report the outcome as a boolean.
    ///
    /// Failures are logged with the instance path: broken schemas and
    /// unparseable instances at error level, everything else at warn level.
    pub fn validate_file(&self, instance_path: &Path, schema_path: &Path) -> bool {
        self.check_and_log(instance_path, schema_path).is_ok()
    }

    /// Validate every instance file under `dir`, in path order.
    ///
    /// A missing directory produces an empty report.
    pub fn validate_dir(&self, dir: &Path, schema_path: &Path) -> ValidationReport {
        let mut report = ValidationReport::default();
        for path in find_instance_files(dir) {
            let result = self.check_and_log(&path, schema_path);
            report.record(path, result);
        }
        report
    }

    /// Validate a mix of files and directories into one report.
    pub fn validate_paths(&self, paths: &[PathBuf], schema_path: &Path) -> ValidationReport {
        let mut report = ValidationReport::default();
        for path in paths {
            if path.is_dir() {
                report.merge(self.validate_dir(path, schema_path));
            } else {
                let result = self.check_and_log(path, schema_path);
                report.record(path.clone(), result);
            }
        }
        report
    }

    fn check_and_log(&self, instance_path: &Path, schema_path: &Path) -> Result<(), SchemaError> {
        let result = self.check_file(instance_path, schema_path);
        let instance = instance_path.display();
        match &result {
            Ok(()) => {
                tracing::debug!(instance = %instance, "instance is valid");
            }
            Err(e) if failure_level(e) == Level::ERROR => {
                tracing::error!(instance = %instance, error = %e, "schema validation failed");
            }
            Err(e) => {
                tracing::warn!(instance = %instance, error = %e, "schema validation failed");
            }
        }
        result
    }
}

/// Severity a failed check is logged at: broken schema sets and unparseable
/// instances are errors, rejected instances are warnings.
fn failure_level(error: &SchemaError) -> Level {
    match error {
        SchemaError::SchemaLoad { .. } | SchemaError::Parse { .. } => Level::ERROR,
        _ => Level::WARN,
    }
}

/// Read and parse an instance document.
fn load_instance(path: &Path) -> Result<Value, SchemaError> {
    let text = std::fs::read_to_string(path).map_err(|e| SchemaError::DocumentLoad {
        path: path.display().to_string(),
        reason: format!("cannot read file: {e}"),
    })?;

    let parsed = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => value::parse_yaml(&text),
        _ => value::parse_json(&text),
    };
    parsed.map_err(|source| SchemaError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Recursively collect `.json`, `.yaml` and `.yml` files under `dir`, sorted.
fn find_instance_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    walk_for_instances(dir, &mut files);
    files.sort();
    files
}

fn walk_for_instances(dir: &Path, acc: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(
                dir = %dir.display(),
                error = %e,
                "failed to read directory during file walk"
            );
            return;
        }
    };
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "failed to read directory entry");
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            walk_for_instances(&path, acc);
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("json" | "yaml" | "yml")
        ) {
            acc.push(path);
        }
    }
}

// ---------------------------------------------------------------------------
// Validation report types
// ---------------------------------------------------------------------------

/// Outcome of validating a batch of instance files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Number of files validated.
    pub total: usize,
    /// Number that passed validation.
    pub passed: usize,
    /// Number that failed validation.
    pub failed: usize,
    /// Details of each failure, in validation order.
    pub failures: Vec<FileFailure>,
}

/// A single file that did not validate.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    /// The first violation or load error, rendered for humans.
    pub message: String,
    /// Whether the failure came from a broken schema rather than the file.
    pub fatal: bool,
}

impl ValidationReport {
    /// Count one file's result.
    pub fn record(&mut self, path: PathBuf, result: Result<(), SchemaError>) {
        self.total += 1;
        match result {
            Ok(()) => self.passed += 1,
            Err(e) => {
                self.failed += 1;
                self.failures.push(FileFailure {
                    path,
                    fatal: e.is_fatal(),
                    message: e.to_string(),
                });
            }
        }
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: ValidationReport) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.failures.extend(other.failures);
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// True if any failure was caused by a broken schema.
    pub fn has_fatal(&self) -> bool {
        self.failures.iter().any(|f| f.fatal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn schema_set() -> TempDir {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "material.schema.json",
            &json!({
                "type": "object",
                "required": ["id"],
                "properties": {"id": {"type": "string", "pattern": "^[a-z_]+$"}}
            })
            .to_string(),
        );
        tmp
    }

    #[test]
    fn validate_file_accepts_and_rejects() {
        let schemas = schema_set();
        let data = TempDir::new().unwrap();
        let validator = SchemaValidator::new(schemas.path());
        let schema = Path::new("material.schema.json");

        let good = write(data.path(), "oak.json", r#"{"id": "oak_plank"}"#);
        let bad = write(data.path(), "bad.json", r#"{"id": "Oak-Plank"}"#);
        let empty = write(data.path(), "empty.json", "{}");

        assert!(validator.validate_file(&good, schema));
        assert!(!validator.validate_file(&bad, schema));
        assert!(!validator.validate_file(&empty, schema));
    }

    #[test]
    fn validate_file_swallows_every_error_kind() {
        let schemas = schema_set();
        write(schemas.path(), "broken.schema.json", "{ not json");
        let data = TempDir::new().unwrap();
        let validator = SchemaValidator::new(schemas.path());

        let malformed = write(data.path(), "malformed.json", r#"{"id": "#);
        let good = write(data.path(), "oak.json", r#"{"id": "oak"}"#);

        assert!(!validator.validate_file(&malformed, Path::new("material.schema.json")));
        assert!(!validator.validate_file(
            &data.path().join("absent.json"),
            Path::new("material.schema.json")
        ));
        assert!(!validator.validate_file(&good, Path::new("broken.schema.json")));
        assert!(!validator.validate_file(&good, Path::new("absent.schema.json")));
    }

    #[test]
    fn check_file_reports_error_kinds() {
        let schemas = schema_set();
        let data = TempDir::new().unwrap();
        let validator = SchemaValidator::new(schemas.path());
        let schema = Path::new("material.schema.json");

        let malformed = write(data.path(), "malformed.json", "[1,");
        assert!(matches!(
            validator.check_file(&malformed, schema),
            Err(SchemaError::Parse { .. })
        ));
        assert!(matches!(
            validator.check_file(&data.path().join("absent.json"), schema),
            Err(SchemaError::DocumentLoad { .. })
        ));

        let good = write(data.path(), "oak.json", r#"{"id": "oak"}"#);
        let err = validator
            .check_file(&good, Path::new("absent.schema.json"))
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn broken_schemas_log_at_error_and_rejections_at_warn() {
        let schemas = schema_set();
        write(schemas.path(), "broken.schema.json", "{ not json");
        write(
            schemas.path(),
            "wrapper.schema.json",
            r#"{"oneOf": [{"$ref": "broken.schema.json"}, {"type": "object"}]}"#,
        );
        write(schemas.path(), "dangling.schema.json", r#"{"$ref": "absent.schema.json"}"#);
        let data = TempDir::new().unwrap();
        let validator = SchemaValidator::new(schemas.path());
        let good = write(data.path(), "oak.json", r#"{"id": "oak"}"#);
        let bad = write(data.path(), "bad.json", r#"{"id": "Oak"}"#);
        let malformed = write(data.path(), "malformed.json", "[1,");
        let level = |instance: &Path, schema: &str| {
            failure_level(&validator.check_file(instance, Path::new(schema)).unwrap_err())
        };

        assert_eq!(level(&good, "wrapper.schema.json"), Level::ERROR);
        assert_eq!(level(&good, "absent.schema.json"), Level::ERROR);
        assert_eq!(level(&malformed, "material.schema.json"), Level::ERROR);
        assert_eq!(level(&bad, "material.schema.json"), Level::WARN);
        assert_eq!(level(&good, "dangling.schema.json"), Level::WARN);
    }

    #[test]
    fn yaml_instances_are_supported() {
        let schemas = schema_set();
        let data = TempDir::new().unwrap();
        let validator = SchemaValidator::new(schemas.path());
        let yaml = write(data.path(), "oak.yaml", "id: oak_log\n");
        assert!(validator
            .check_file(&yaml, Path::new("material.schema.json"))
            .is_ok());
    }

    #[test]
    fn absolute_schema_path_bypasses_root() {
        let schemas = schema_set();
        let validator = SchemaValidator::new("/nonexistent/root");
        let absolute = schemas.path().join("material.schema.json");
        assert!(validator
            .check_value(&json!({"id": "oak"}), &absolute)
            .is_ok());
    }

    #[test]
    fn validate_dir_walks_sorted_and_continues_after_failures() {
        let schemas = schema_set();
        let data = TempDir::new().unwrap();
        write(data.path(), "b/birch.json", r#"{"id": "birch"}"#);
        write(data.path(), "a/acacia.json", r#"{"id": "Acacia"}"#);
        write(data.path(), "c/cherry.yml", "id: cherry\n");
        write(data.path(), "c/notes.txt", "not an instance");

        let validator = SchemaValidator::new(schemas.path());
        let report = validator.validate_dir(data.path(), Path::new("material.schema.json"));

        assert_eq!(report.total, 3);
        assert_eq!(report.passed, 2);
        assert_eq!(report.failed, 1);
        assert!(report.failures[0].path.ends_with("a/acacia.json"));
        assert!(!report.failures[0].fatal);
        assert!(!report.is_success());
        assert!(!report.has_fatal());
    }

    #[test]
    fn validate_dir_missing_directory_is_empty() {
        let schemas = schema_set();
        let validator = SchemaValidator::new(schemas.path());
        let report = validator.validate_dir(
            &schemas.path().join("no-such-dir"),
            Path::new("material.schema.json"),
        );
        assert_eq!(report.total, 0);
        assert!(report.is_success());
    }

    #[test]
    fn validate_paths_merges_files_and_directories() {
        let schemas = schema_set();
        let data = TempDir::new().unwrap();
        write(data.path(), "dir/oak.json", r#"{"id": "oak"}"#);
        let single = write(data.path(), "spruce.json", r#"{"id": "spruce"}"#);

        let validator = SchemaValidator::new(schemas.path());
        let report = validator.validate_paths(
            &[data.path().join("dir"), single],
            Path::new("material.schema.json"),
        );
        assert_eq!(report.total, 2);
        assert_eq!(report.passed, 2);
    }

    #[test]
    fn report_flags_fatal_failures() {
        let schemas = schema_set();
        let data = TempDir::new().unwrap();
        write(data.path(), "oak.json", r#"{"id": "oak"}"#);
        let validator = SchemaValidator::new(schemas.path());
        let report = validator.validate_dir(data.path(), Path::new("absent.schema.json"));
        assert_eq!(report.failed, 1);
        assert!(report.has_fatal());
    }

    #[test]
    fn report_serializes() {
        let mut report = ValidationReport::default();
        report.record(PathBuf::from("ok.json"), Ok(()));
        report.record(
            PathBuf::from("bad.json"),
            Err(crate::ValidationError::new("/id", "bad").into()),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["failures"][0]["message"], "/id: bad");
        assert_eq!(json["failures"][0]["fatal"], false);
    }

    #[test]
    fn default_options() {
        let validator = SchemaValidator::new("schemas");
        assert_eq!(validator.options().max_ref_depth, DEFAULT_MAX_REF_DEPTH);
        assert!(validator.cache().is_empty());
    }
}
