//! # Reference Resolution
//!
//! Turns a `$ref` string into the schema node it names.
//!
//! | Form                     | Document                     | Pointer  |
//! |--------------------------|------------------------------|----------|
//! | `#/a/b`                  | the current document         | `a/b`    |
//! | `file.schema.json#/a/b`  | `<schema root>/file.schema.json` | `a/b` |
//! | `file.schema.json`       | `<schema root>/file.schema.json` | root  |
//!
//! File parts are always joined onto the schema root directory of the run,
//! never onto the directory of the referencing document. Pointer segments
//! are matched against object keys exactly; `~0`/`~1` escapes are not
//! decoded.

use std::path::Path;
use std::sync::Arc;

use crate::cache::{LoadFailure, SchemaCache, SchemaDocument};
use crate::error::{ReferenceError, SchemaError};
use crate::value::Value;

/// Where a `$ref` points: a document and a pointer into its root.
#[derive(Debug, Clone)]
pub struct Target {
    pub document: Arc<SchemaDocument>,
    /// Pointer without the leading `/`; empty for the document root.
    pub pointer: String,
}

/// Resolves `$ref` strings against a fixed schema root.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    cache: &'a SchemaCache,
    schema_root: &'a Path,
}

impl<'a> Resolver<'a> {
    pub fn new(cache: &'a SchemaCache, schema_root: &'a Path) -> Self {
        Self { cache, schema_root }
    }

    pub fn schema_root(&self) -> &'a Path {
        self.schema_root
    }

    /// Find the document a reference targets, loading it through the cache
    /// if it lives in another file.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Document`] if the target file cannot be read,
    /// and [`SchemaError::SchemaLoad`] if it is malformed or not object-rooted.
    pub fn locate(
        &self,
        reference: &str,
        current: &Arc<SchemaDocument>,
    ) -> Result<Target, SchemaError> {
        if let Some(pointer) = reference.strip_prefix("#/") {
            return Ok(Target {
                document: Arc::clone(current),
                pointer: pointer.to_string(),
            });
        }

        let (file_part, fragment) = match reference.split_once('#') {
            Some((file, fragment)) => (file, Some(fragment)),
            None => (reference, None),
        };

        let document = if file_part.is_empty() {
            Arc::clone(current)
        } else {
            self.cache
                .fetch(&self.schema_root.join(file_part))
                .map_err(|failure| match failure {
                    LoadFailure::Unreadable(e) => ReferenceError::Document {
                        reference: reference.to_string(),
                        reason: e.to_string(),
                    }
                    .into(),
                    LoadFailure::Invalid(e) => e,
                })?
        };

        let pointer = fragment
            .map(|f| f.strip_prefix('/').unwrap_or(f))
            .unwrap_or_default()
            .to_string();

        Ok(Target { document, pointer })
    }

    /// Resolve a reference to an owned copy of the schema node it names.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Reference`] if the document cannot be loaded or
    /// the pointer does not lead to an object.
    pub fn resolve(
        &self,
        reference: &str,
        current: &Arc<SchemaDocument>,
    ) -> Result<Value, SchemaError> {
        let target = self.locate(reference, current)?;
        resolve_pointer(target.document.root(), &target.pointer, reference).cloned()
    }
}

/// Walk `pointer` (segments separated by `/`, no leading slash) from `root`.
/// `reference` is the original `$ref` string, used in error messages.
///
/// # Errors
///
/// Returns [`ReferenceError::MissingSegment`] if a segment cannot be followed
/// and [`ReferenceError::NotAnObject`] if the final node is not an object.
pub fn resolve_pointer<'v>(
    root: &'v Value,
    pointer: &str,
    reference: &str,
) -> Result<&'v Value, SchemaError> {
    let mut node = root;
    if !pointer.is_empty() {
        for segment in pointer.split('/') {
            node = node
                .as_object()
                .and_then(|object| object.get(segment))
                .ok_or_else(|| ReferenceError::MissingSegment {
                    reference: reference.to_string(),
                    segment: segment.to_string(),
                })?;
        }
    }

    if !node.is_object() {
        return Err(ReferenceError::NotAnObject {
            reference: reference.to_string(),
        }
        .into());
    }
    Ok(node)
}
