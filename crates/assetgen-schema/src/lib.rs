//! # assetgen-schema — Structural Schema Validation
//!
//! Decides whether a material/asset definition conforms to a schema
//! written in a constrained subset of JSON Schema, resolving `$ref`s within
//! and across schema files and stopping at the first violation.
//!
//! ## Pipeline
//!
//! ```text
//! validate_file(instance, schema)
//!   → value::parse_json / parse_yaml (instance)
//!   → SchemaCache::get (schema root, parsed once per run)
//!   → Engine::validate ──$ref──→ Resolver → SchemaCache::get
//!   → bool (failures logged via tracing)
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use assetgen_schema::SchemaValidator;
//!
//! let validator = SchemaValidator::new("src/main/resources/schemas");
//! let ok = validator.validate_file(
//!     Path::new("src/main/resources/materials/oak_plank.json"),
//!     Path::new("material.schema.json"),
//! );
//! println!("oak_plank valid: {ok}");
//! ```
//!
//! ## Crate Policy
//!
//! - No `panic!()` or `.unwrap()` outside tests.
//! - The library logs through `tracing` but never installs a subscriber.
//! - Keyword semantics (`$ref` sibling suppression, first-match `oneOf`,
//!   permissive unknown `type` names) match the existing schema corpus and
//!   must not change without checking every schema file against it.

pub mod cache;
pub mod engine;
pub mod error;
pub mod resolve;
pub mod validate;
pub mod value;

// Re-export primary types.
pub use cache::{FsSource, SchemaCache, SchemaDocument, SchemaSource};
pub use engine::{Engine, ValidationContext};
pub use error::{ReferenceError, SchemaError, ValidationError, ValueError};
pub use resolve::Resolver;
pub use validate::{
    FileFailure, SchemaValidator, ValidationReport, ValidatorOptions, DEFAULT_MAX_REF_DEPTH,
};
pub use value::Value;
