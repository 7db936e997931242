//! Persistence abstraction for serialized documents.
//!
//! Backends move opaque strings in and out of some storage location and
//! never parse them; serialization and migration stay in [`crate::data`].

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use memory::MemoryPersistence;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FilePersistence;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Backend is not configured")]
    NotConfigured,
    #[error("No document stored")]
    NotFound,
    #[error("IO error: {0}")]
    Io(String),
    #[error("Persistence error: {0}")]
    Other(String),
}

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Trait for document persistence backends.
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait Persistence: Send + Sync {
    /// Load the stored document payload.
    fn load(&self) -> BoxFuture<'_, PersistenceResult<String>>;

    /// Store a document payload. Returns whether the backend accepted it.
    fn save(&self, data: String) -> BoxFuture<'_, PersistenceResult<bool>>;

    /// Snapshot the backend's own settings as JSON.
    fn make_config(&self) -> serde_json::Value;

    /// Restore settings from [`Persistence::make_config`] output.
    /// Returns false when the config is unusable for this backend.
    fn load_config(&mut self, config: &serde_json::Value) -> bool;
}

/// Trait for document persistence backends (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait Persistence {
    /// Load the stored document payload.
    fn load(&self) -> BoxFuture<'_, PersistenceResult<String>>;

    /// Store a document payload. Returns whether the backend accepted it.
    fn save(&self, data: String) -> BoxFuture<'_, PersistenceResult<bool>>;

    /// Snapshot the backend's own settings as JSON.
    fn make_config(&self) -> serde_json::Value;

    /// Restore settings from [`Persistence::make_config`] output.
    /// Returns false when the config is unusable for this backend.
    fn load_config(&mut self, config: &serde_json::Value) -> bool;
}

/// A backend selection plus its settings, as stored in the workspace
/// config document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Backend identifier, e.g. "memory" or "file".
    pub id: String,
    pub config: serde_json::Value,
}

impl PersistenceConfig {
    pub fn new(id: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            config,
        }
    }
}

/// Single-threaded executor for the boxed futures above. The backends
/// never actually suspend, so busy-polling with a no-op waker is enough.
#[cfg(test)]
pub(crate) fn block_on<F: std::future::Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);

    loop {
        match f.as_mut().poll(&mut cx) {
            Poll::Ready(result) => return result,
            Poll::Pending => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_round_trip() {
        let config = PersistenceConfig::new("file", json!({ "path": "/tmp/pool.json" }));
        let text = serde_json::to_string(&config).unwrap();
        let restored: PersistenceConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(restored, config);
    }
}
