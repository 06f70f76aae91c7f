//! # Validation Engine
//!
//! Recursive, fail-fast evaluation of an instance against a schema node.
//! The first violated keyword ends the evaluation of the whole tree.
//!
//! ## Keyword order
//!
//! 1. `$ref`: resolved and followed; sibling keywords are ignored.
//! 2. `oneOf`: candidates tried in order; the first success wins and the
//!    remaining candidates are never evaluated. A broken schema file met in
//!    a candidate ends the evaluation instead of counting as a mismatch.
//! 3. `type`: `object`, `array`, `string`, `boolean`, `integer`, `number`.
//!    Any other name is accepted without a check.
//! 4. `const`, then `enum`.
//! 5. Strings: `minLength`, `maxLength` (counted in Unicode scalar values),
//!    `pattern` (must match the whole string).
//! 6. Arrays: `minItems`, `maxItems`, `items`.
//! 7. Objects: `required`, `properties`, `additionalProperties: false`
//!    (enforced only when `properties` is present on the same node).
//!
//! Unknown keywords are ignored.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use regex::Regex;

use crate::cache::SchemaDocument;
use crate::error::{ReferenceError, SchemaError, ValidationError};
use crate::resolve::{resolve_pointer, Resolver};
use crate::value::{self, Object, Value};

/// Per-call state: the document the current schema node came from, and how
/// many `$ref` hops led here.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    document: &'a Arc<SchemaDocument>,
    depth: usize,
}

impl<'a> ValidationContext<'a> {
    pub fn new(document: &'a Arc<SchemaDocument>) -> Self {
        Self { document, depth: 0 }
    }

    pub fn document(&self) -> &'a Arc<SchemaDocument> {
        self.document
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn follow<'b>(&self, document: &'b Arc<SchemaDocument>) -> ValidationContext<'b> {
        ValidationContext {
            document,
            depth: self.depth + 1,
        }
    }
}

/// Compiled `pattern` regexes, keyed by pattern source.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: Mutex<HashMap<String, Regex>>,
}

impl PatternCache {
    /// True if `pattern` matches all of `text`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidSchema`] if `pattern` is not a valid regex.
    pub fn is_full_match(&self, pattern: &str, text: &str) -> Result<bool, SchemaError> {
        let regex = {
            let mut compiled = self.compiled.lock();
            match compiled.get(pattern) {
                Some(regex) => regex.clone(),
                None => {
                    let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
                        SchemaError::invalid_schema("pattern", format!("{pattern}: {e}"))
                    })?;
                    compiled.insert(pattern.to_string(), regex.clone());
                    regex
                }
            }
        };
        Ok(regex.is_match(text))
    }

    pub fn len(&self) -> usize {
        self.compiled.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The recursive decision procedure.
#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    resolver: Resolver<'a>,
    patterns: &'a PatternCache,
    max_ref_depth: usize,
}

impl<'a> Engine<'a> {
    pub fn new(resolver: Resolver<'a>, patterns: &'a PatternCache, max_ref_depth: usize) -> Self {
        Self {
            resolver,
            patterns,
            max_ref_depth,
        }
    }

    /// Validate `instance` against `schema`, which was read from
    /// `ctx.document()`.
    ///
    /// # Errors
    ///
    /// Returns the first violation as [`SchemaError::Validation`]; unresolvable
    /// references and malformed keyword values surface as their own variants.
    pub fn validate(
        &self,
        instance: &Value,
        schema: &Value,
        ctx: &ValidationContext<'_>,
    ) -> Result<(), SchemaError> {
        self.validate_at(instance, schema, ctx, "")
    }

    fn validate_at(
        &self,
        instance: &Value,
        schema: &Value,
        ctx: &ValidationContext<'_>,
        path: &str,
    ) -> Result<(), SchemaError> {
        let Some(schema) = schema.as_object() else {
            return Err(SchemaError::invalid_schema(
                "schema",
                format!("expected an object, found {}", value::kind(schema)),
            ));
        };

        if let Some(reference) = schema.get("$ref") {
            let reference = reference
                .as_str()
                .ok_or_else(|| SchemaError::invalid_schema("$ref", "expected a string"))?;
            return self.follow_ref(instance, reference, ctx, path);
        }

        if let Some(candidates) = schema.get("oneOf") {
            self.check_one_of(instance, candidates, ctx, path)?;
        }

        if let Some(expected) = schema.get("type") {
            check_type(instance, expected, path)?;
        }

        if let Some(constant) = schema.get("const") {
            if !value::deep_equal(instance, constant) {
                return Err(violation(path, format!("expected constant {constant}")));
            }
        }

        if let Some(allowed) = schema.get("enum") {
            let allowed = allowed
                .as_array()
                .ok_or_else(|| SchemaError::invalid_schema("enum", "expected an array"))?;
            if !allowed.iter().any(|v| value::deep_equal(instance, v)) {
                return Err(violation(
                    path,
                    format!("{instance} is not one of {}", Value::Array(allowed.clone())),
                ));
            }
        }

        match instance {
            Value::String(text) => self.check_string(text, schema, path),
            Value::Array(items) => self.check_array(items, schema, ctx, path),
            Value::Object(members) => self.check_object(members, schema, ctx, path),
            _ => Ok(()),
        }
    }

    fn follow_ref(
        &self,
        instance: &Value,
        reference: &str,
        ctx: &ValidationContext<'_>,
        path: &str,
    ) -> Result<(), SchemaError> {
        if ctx.depth() >= self.max_ref_depth {
            return Err(ReferenceError::DepthExceeded {
                reference: reference.to_string(),
                limit: self.max_ref_depth,
            }
            .into());
        }

        tracing::trace!(reference, depth = ctx.depth(), "resolving $ref");
        let target = self.resolver.locate(reference, ctx.document())?;
        let schema = resolve_pointer(target.document.root(), &target.pointer, reference)?;
        self.validate_at(instance, schema, &ctx.follow(&target.document), path)
    }

    fn check_one_of(
        &self,
        instance: &Value,
        candidates: &Value,
        ctx: &ValidationContext<'_>,
        path: &str,
    ) -> Result<(), SchemaError> {
        let candidates = candidates
            .as_array()
            .ok_or_else(|| SchemaError::invalid_schema("oneOf", "expected an array"))?;

        for (branch, candidate) in candidates.iter().enumerate() {
            match self.validate_at(instance, candidate, ctx, path) {
                Ok(()) => {
                    tracing::trace!(branch, path, "oneOf branch matched");
                    return Ok(());
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::trace!(branch, path, error = %e, "oneOf branch rejected"),
            }
        }
        Err(violation(path, "no oneOf branch matched"))
    }

    fn check_string(&self, text: &str, schema: &Object, path: &str) -> Result<(), SchemaError> {
        let length = text.chars().count();

        if let Some(min) = count_bound(schema, "minLength")? {
            if length < min {
                return Err(violation(
                    path,
                    format!("string of length {length} is shorter than minLength {min}"),
                ));
            }
        }

        if let Some(max) = count_bound(schema, "maxLength")? {
            if length > max {
                return Err(violation(
                    path,
                    format!("string of length {length} is longer than maxLength {max}"),
                ));
            }
        }

        if let Some(pattern) = schema.get("pattern") {
            let pattern = pattern
                .as_str()
                .ok_or_else(|| SchemaError::invalid_schema("pattern", "expected a string"))?;
            if !self.patterns.is_full_match(pattern, text)? {
                return Err(violation(
                    path,
                    format!("\"{text}\" does not match pattern \"{pattern}\""),
                ));
            }
        }

        Ok(())
    }

    fn check_array(
        &self,
        items: &[Value],
        schema: &Object,
        ctx: &ValidationContext<'_>,
        path: &str,
    ) -> Result<(), SchemaError> {
        let count = items.len();

        if let Some(min) = count_bound(schema, "minItems")? {
            if count < min {
                return Err(violation(
                    path,
                    format!("array has {count} items, fewer than minItems {min}"),
                ));
            }
        }

        if let Some(max) = count_bound(schema, "maxItems")? {
            if count > max {
                return Err(violation(
                    path,
                    format!("array has {count} items, more than maxItems {max}"),
                ));
            }
        }

        if let Some(item_schema) = schema.get("items") {
            for (index, item) in items.iter().enumerate() {
                self.validate_at(item, item_schema, ctx, &format!("{path}/{index}"))?;
            }
        }

        Ok(())
    }

    fn check_object(
        &self,
        members: &Object,
        schema: &Object,
        ctx: &ValidationContext<'_>,
        path: &str,
    ) -> Result<(), SchemaError> {
        if let Some(required) = schema.get("required") {
            let required = required
                .as_array()
                .ok_or_else(|| SchemaError::invalid_schema("required", "expected an array"))?;
            for key in required {
                let key = key.as_str().ok_or_else(|| {
                    SchemaError::invalid_schema("required", "expected an array of strings")
                })?;
                if !members.contains_key(key) {
                    return Err(violation(path, format!("missing required property '{key}'")));
                }
            }
        }

        let Some(properties) = schema.get("properties") else {
            return Ok(());
        };
        let properties = properties
            .as_object()
            .ok_or_else(|| SchemaError::invalid_schema("properties", "expected an object"))?;

        for (key, property_schema) in properties {
            if let Some(member) = members.get(key) {
                self.validate_at(member, property_schema, ctx, &child_path(path, key))?;
            }
        }

        if let Some(Value::Bool(false)) = schema.get("additionalProperties") {
            if let Some(extra) = members.keys().find(|key| !properties.contains_key(*key)) {
                return Err(violation(path, format!("unexpected property '{extra}'")));
            }
        }

        Ok(())
    }
}

fn check_type(instance: &Value, expected: &Value, path: &str) -> Result<(), SchemaError> {
    let name = expected
        .as_str()
        .ok_or_else(|| SchemaError::invalid_schema("type", "expected a string"))?;

    let matches = match name {
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "boolean" => instance.is_boolean(),
        "integer" => value::is_integer_valued(instance),
        "number" => instance.is_number(),
        _ => true,
    };

    if matches {
        Ok(())
    } else {
        Err(violation(
            path,
            format!("expected type {name}, found {}", value::kind(instance)),
        ))
    }
}

/// Read a non-negative integer keyword such as `minLength`.
fn count_bound(schema: &Object, keyword: &str) -> Result<Option<usize>, SchemaError> {
    let Some(bound) = schema.get(keyword) else {
        return Ok(None);
    };
    match bound.as_f64() {
        Some(n) if n.is_finite() && n >= 0.0 && n.fract() == 0.0 => Ok(Some(n as usize)),
        _ => Err(SchemaError::invalid_schema(
            keyword,
            format!("expected a non-negative integer, found {bound}"),
        )),
    }
}

fn violation(path: &str, message: impl Into<String>) -> SchemaError {
    ValidationError::new(path, message).into()
}

/// Append an object key to a JSON Pointer, escaping `~` and `/`.
fn child_path(path: &str, key: &str) -> String {
    format!("{path}/{}", key.replace('~', "~0").replace('/', "~1"))
}
