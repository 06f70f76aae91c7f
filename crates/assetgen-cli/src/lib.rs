//! # assetgen-cli — Asset Generator Command-Line Interface
//!
//! Provides the `assetgen` binary. The generator validates every material
//! definition against the schema set before writing any assets; this crate
//! exposes that step on its own.
//!
//! ## Subcommands
//!
//! - `assetgen validate`: validate material definitions against a schema.
//!
//! ```bash
//! assetgen validate --input src/main/resources
//! assetgen validate --schema-root schemas --schema material.schema.json materials/
//! assetgen validate --no-strict --format json materials/oak_plank.json
//! ```
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; validation semantics live in `assetgen-schema`.
//! - Exit codes: 0 success, 1 validation failures in strict mode, 2 broken
//!   schema set or operational error.

pub mod validate;

/// Default input directory, matching the generator's resource layout.
pub const DEFAULT_INPUT_DIR: &str = "src/main/resources";

