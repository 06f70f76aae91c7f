//! # Schema Document Cache
//!
//! Loads schema files on first use and keeps them for the lifetime of the
//! cache (one generator run). Entries are keyed by normalized absolute path,
//! so `schemas/./a.schema.json` and `schemas/a.schema.json` share an entry.
//!
//! ## Concurrency
//!
//! Each path owns a [`OnceCell`] slot. The map lock is held only long enough
//! to fetch or create the slot; the load itself runs inside
//! `get_or_try_init`, which blocks concurrent callers for the same path
//! until the first load finishes. A path is therefore read and parsed at
//! most once, and every caller observes the same [`Arc<SchemaDocument>`].
//! A failed load drops the slot so a later call retries.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::SchemaError;
use crate::value::{self, Value};

/// Reads schema file contents. The filesystem implementation is [`FsSource`];
/// tests substitute in-memory or instrumented sources.
pub trait SchemaSource: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// Reads schema files from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSource;

impl SchemaSource for FsSource {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// A parsed schema file. The root is always an object.
#[derive(Debug, PartialEq)]
pub struct SchemaDocument {
    path: PathBuf,
    root: Value,
}

impl SchemaDocument {
    /// Wrap an already-parsed schema root.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::SchemaLoad`] if `root` is not an object.
    pub fn new(path: impl Into<PathBuf>, root: Value) -> Result<Self, SchemaError> {
        let path = path.into();
        if !root.is_object() {
            return Err(SchemaError::SchemaLoad {
                path: path.display().to_string(),
                reason: format!("schema root must be an object, found {}", value::kind(&root)),
            });
        }
        Ok(Self { path, root })
    }

    /// Normalized path the document was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Value {
        &self.root
    }
}

type Slot = Arc<OnceCell<Arc<SchemaDocument>>>;

/// Why a schema file could not be loaded.
#[derive(Debug)]
pub(crate) enum LoadFailure {
    /// The file is missing or could not be read.
    Unreadable(SchemaError),
    /// The file was read but is not valid JSON or not object-rooted.
    Invalid(SchemaError),
}

impl LoadFailure {
    pub(crate) fn into_error(self) -> SchemaError {
        match self {
            Self::Unreadable(e) | Self::Invalid(e) => e,
        }
    }
}

/// Memoizing, thread-safe loader of [`SchemaDocument`]s.
pub struct SchemaCache {
    source: Arc<dyn SchemaSource>,
    entries: Mutex<HashMap<PathBuf, Slot>>,
}

impl fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaCache")
            .field("loaded", &self.len())
            .finish()
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaCache {
    /// A cache reading from the filesystem.
    pub fn new() -> Self {
        Self::with_source(Arc::new(FsSource))
    }

    pub fn with_source(source: Arc<dyn SchemaSource>) -> Self {
        Self {
            source,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the document at `path`, loading it on first request.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::SchemaLoad`] if the file cannot be read, is not
    /// valid JSON, or its root is not an object.
    pub fn get(&self, path: &Path) -> Result<Arc<SchemaDocument>, SchemaError> {
        self.fetch(path).map_err(LoadFailure::into_error)
    }

    /// Like [`Self::get`], but keeps apart files that could not be read from
    /// files whose content is broken.
    pub(crate) fn fetch(&self, path: &Path) -> Result<Arc<SchemaDocument>, LoadFailure> {
        let key = normalize_path(path);
        let slot = {
            let mut entries = self.entries.lock();
            Arc::clone(entries.entry(key.clone()).or_default())
        };

        if let Some(document) = slot.get() {
            tracing::trace!(path = %key.display(), "schema cache hit");
            return Ok(Arc::clone(document));
        }

        let result = slot
            .get_or_try_init(|| self.load(&key).map(Arc::new))
            .map(Arc::clone);
        if result.is_err() {
            let mut entries = self.entries.lock();
            let stale = entries
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(current, &slot) && current.get().is_none());
            if stale {
                entries.remove(&key);
            }
        }
        result
    }

    /// True if `path` has been loaded successfully.
    pub fn contains(&self, path: &Path) -> bool {
        let key = normalize_path(path);
        self.entries
            .lock()
            .get(&key)
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Number of successfully loaded documents.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Documents already handed out stay alive.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn load(&self, path: &Path) -> Result<SchemaDocument, LoadFailure> {
        let load_error = |reason: String| SchemaError::SchemaLoad {
            path: path.display().to_string(),
            reason,
        };

        let text = self
            .source
            .read_to_string(path)
            .map_err(|e| LoadFailure::Unreadable(load_error(format!("cannot read file: {e}"))))?;
        let root = value::parse_json(&text)
            .map_err(|e| LoadFailure::Invalid(load_error(format!("invalid JSON: {e}"))))?;
        let document = SchemaDocument::new(path, root).map_err(LoadFailure::Invalid)?;

        tracing::debug!(path = %path.display(), "loaded schema document");
        Ok(document)
    }
}

/// Make `path` absolute and resolve it through the filesystem. Paths that do
/// not exist fall back to collapsing `.`/`..` lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(lexical.components().next_back(), Some(Component::Normal(_))) {
                    lexical.pop();
                }
            }
            other => lexical.push(other.as_os_str()),
        }
    }
    lexical
}
