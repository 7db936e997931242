//! In-memory persistence implementation.

use super::{BoxFuture, Persistence, PersistenceError, PersistenceResult};
use std::sync::RwLock;

/// Holds the last saved payload in memory. For testing and ephemeral use.
#[derive(Default)]
pub struct MemoryPersistence {
    data: RwLock<Option<String>>,
}

impl MemoryPersistence {
    /// Create a new empty memory persistence.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self) -> BoxFuture<'_, PersistenceResult<String>> {
        Box::pin(async move {
            let data = self
                .data
                .read()
                .map_err(|e| PersistenceError::Other(format!("Lock error: {}", e)))?;
            data.clone().ok_or(PersistenceError::NotFound)
        })
    }

    fn save(&self, data: String) -> BoxFuture<'_, PersistenceResult<bool>> {
        Box::pin(async move {
            let mut slot = self
                .data
                .write()
                .map_err(|e| PersistenceError::Other(format!("Lock error: {}", e)))?;
            *slot = Some(data);
            Ok(true)
        })
    }

    fn make_config(&self) -> serde_json::Value {
        // Nothing to configure.
        serde_json::json!({})
    }

    fn load_config(&mut self, _config: &serde_json::Value) -> bool {
        true
    }
}
