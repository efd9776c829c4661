//! Template lookup
//!
//! Translation templates live outside the engine; the worker only needs a
//! way to turn a schema identity into template text. The filesystem
//! implementation caches one directory scan and can be refreshed
//! periodically; readers see whatever snapshot is visible.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::schema::VersionedSchema;

/// Error locating template text for a schema.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("no template found for schema {0}")]
    TemplateNotFound(String),
    #[error("template library io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of template text, keyed by schema identity.
pub trait TemplateLibrary: Send + Sync {
    fn locate(&self, schema: &VersionedSchema) -> Result<String, LibraryError>;
}

/// In-memory library, used by tests and embedders that manage their own
/// template storage.
#[derive(Default)]
pub struct MemoryLibrary {
    templates: HashMap<String, String>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, schema: &VersionedSchema, template: impl Into<String>) {
        self.templates
            .insert(file_name_for(schema), template.into());
    }
}

impl TemplateLibrary for MemoryLibrary {
    fn locate(&self, schema: &VersionedSchema) -> Result<String, LibraryError> {
        self.templates
            .get(&file_name_for(schema))
            .cloned()
            .ok_or_else(|| LibraryError::TemplateNotFound(schema.to_string()))
    }
}

/// Directory-backed library. Templates are files named
/// `<name>-<version>.<type>` anywhere under the base directory; the
/// name-to-path index is built once and refreshed on [`FilesystemLibrary::rescan`].
pub struct FilesystemLibrary {
    base: PathBuf,
    index: RwLock<HashMap<String, PathBuf>>,
}

impl FilesystemLibrary {
    pub fn new(base: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let library = Self {
            base: base.as_ref().to_path_buf(),
            index: RwLock::new(HashMap::new()),
        };
        library.rescan()?;
        Ok(library)
    }

    /// Rebuild the filename index from the directory tree. Safe to call
    /// while other threads are resolving; they read the previous snapshot
    /// until the swap.
    pub fn rescan(&self) -> Result<(), LibraryError> {
        let mut index = HashMap::new();
        scan_dir(&self.base, &mut index)?;
        debug!(
            "template library indexed {} files under {}",
            index.len(),
            self.base.display()
        );
        *self.index.write().expect("library index lock") = index;
        Ok(())
    }
}

impl TemplateLibrary for FilesystemLibrary {
    fn locate(&self, schema: &VersionedSchema) -> Result<String, LibraryError> {
        let wanted = file_name_for(schema);
        let path = {
            let index = self.index.read().expect("library index lock");
            index.get(&wanted).cloned()
        };
        match path {
            Some(path) => Ok(fs::read_to_string(path)?),
            None => {
                warn!("no template file {} for schema {}", wanted, schema);
                Err(LibraryError::TemplateNotFound(schema.to_string()))
            }
        }
    }
}

fn file_name_for(schema: &VersionedSchema) -> String {
    format!(
        "{}-{}.{}",
        schema.name(),
        schema.version(),
        schema.schema_type()
    )
}

fn scan_dir(dir: &Path, index: &mut HashMap<String, PathBuf>) -> Result<(), LibraryError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            scan_dir(&path, index)?;
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            index.insert(name.to_string(), path.clone());
        }
    }
    Ok(())
}
