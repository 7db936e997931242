//! File-based persistence implementation for native platforms.

use super::{BoxFuture, Persistence, PersistenceError, PersistenceResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Stores the document as a single file on disk.
///
/// Starts unconfigured; a path arrives either through [`FilePersistence::new`]
/// or through `load_config`. Operations before that fail with
/// [`PersistenceError::NotConfigured`].
pub struct FilePersistence {
    path: Option<PathBuf>,
}

impl FilePersistence {
    /// Create a file persistence targeting `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Create a file persistence with no target yet.
    pub fn unconfigured() -> Self {
        Self { path: None }
    }

    /// The configured target, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Persistence for FilePersistence {
    fn load(&self) -> BoxFuture<'_, PersistenceResult<String>> {
        let path = self.path.clone();
        Box::pin(async move {
            let path = path.ok_or(PersistenceError::NotConfigured)?;
            if !path.exists() {
                return Err(PersistenceError::NotFound);
            }
            fs::read_to_string(&path).map_err(|e| {
                PersistenceError::Io(format!("Failed to read {}: {}", path.display(), e))
            })
        })
    }

    fn save(&self, data: String) -> BoxFuture<'_, PersistenceResult<bool>> {
        let path = self.path.clone();
        Box::pin(async move {
            let path = path.ok_or(PersistenceError::NotConfigured)?;
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent).map_err(|e| {
                        PersistenceError::Io(format!(
                            "Failed to create {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
            }
            fs::write(&path, data).map_err(|e| {
                PersistenceError::Io(format!("Failed to write {}: {}", path.display(), e))
            })?;
            Ok(true)
        })
    }

    fn make_config(&self) -> serde_json::Value {
        match &self.path {
            Some(path) => serde_json::json!({ "path": path.display().to_string() }),
            None => serde_json::json!({ "path": null }),
        }
    }

    fn load_config(&mut self, config: &serde_json::Value) -> bool {
        match config.get("path").and_then(|v| v.as_str()) {
            Some(path) => {
                self.path = Some(PathBuf::from(path));
                true
            }
            None => false,
        }
    }
}
