//! # Error Types
//!
//! Every failure the validator can produce, from malformed text up to a
//! violated keyword. All errors use `thiserror` for derive-based `Display`
//! and `Error` implementations.
//!
//! ## Severity
//!
//! - [`SchemaError::SchemaLoad`] is a configuration defect: the schema set
//!   itself is broken. It is the only fatal kind.
//! - Everything else describes why one instance document was rejected.

use std::fmt;

use thiserror::Error;

/// Error produced by the value model: parse failures and typed accessors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The text is not syntactically valid JSON or YAML.
    #[error("{message} (line {line}, column {column})")]
    Parse {
        /// Parser diagnostic.
        message: String,
        /// 1-based line of the failure, `0` when unknown.
        line: usize,
        /// 1-based column of the failure, `0` when unknown.
        column: usize,
    },

    /// A typed accessor was called on a value of another kind.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The kind the caller asked for.
        expected: &'static str,
        /// The kind the value actually has.
        found: &'static str,
    },
}

/// The first keyword violation found in an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// JSON Pointer to the violating value; empty for the document root.
    pub instance_path: String,
    /// Human-readable description of the violated constraint.
    pub message: String,
}

impl ValidationError {
    pub fn new(instance_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            instance_path: instance_path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// A `$ref` that could not be turned into a schema node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// A pointer segment names a member that does not exist.
    #[error("$ref '{reference}': no member '{segment}' along the pointer")]
    MissingSegment {
        /// The full `$ref` string as written in the schema.
        reference: String,
        /// The segment that could not be followed.
        segment: String,
    },

    /// The pointer resolved, but not to an object.
    #[error("$ref '{reference}': target is not a schema object")]
    NotAnObject {
        /// The full `$ref` string as written in the schema.
        reference: String,
    },

    /// The referenced schema file could not be loaded.
    #[error("$ref '{reference}': {reason}")]
    Document {
        /// The full `$ref` string as written in the schema.
        reference: String,
        /// Why the target document failed to load.
        reason: String,
    },

    /// Too many nested `$ref` hops; the schema set most likely cycles.
    #[error("$ref '{reference}': reference depth exceeds {limit}")]
    DepthExceeded {
        /// The `$ref` that would have crossed the limit.
        reference: String,
        /// The configured maximum depth.
        limit: usize,
    },
}

/// Errors returned by schema loading and validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The instance document is not valid JSON/YAML.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path to the document that failed to parse.
        path: String,
        /// Underlying parser error.
        source: ValueError,
    },

    /// The instance document could not be read.
    #[error("failed to load document {path}: {reason}")]
    DocumentLoad {
        /// Path to the document that failed to load.
        path: String,
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// A schema file is missing, unreadable, malformed, or not object-rooted.
    #[error("failed to load schema {path}: {reason}")]
    SchemaLoad {
        /// Normalized path of the schema file.
        path: String,
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// A `$ref` could not be resolved.
    #[error("reference resolution failed: {0}")]
    Reference(#[from] ReferenceError),

    /// A recognised keyword carries a value of the wrong shape.
    #[error("invalid schema keyword '{keyword}': {reason}")]
    InvalidSchema {
        /// The offending keyword.
        keyword: String,
        /// What was wrong with its value.
        reason: String,
    },

    /// The instance violates a schema constraint.
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

impl SchemaError {
    pub(crate) fn invalid_schema(keyword: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            keyword: keyword.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors that indicate a broken schema set rather than a bad instance.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SchemaLoad { .. })
    }
}
