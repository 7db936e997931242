//! MindPool Core Library
//!
//! Platform-agnostic editing core for the MindPool node-link editor:
//! the node pool, tool state machine, document schema and persistence
//! contract. Rendering lives in `mindpool-render`; this crate never
//! draws.

pub mod data;
pub mod editor;
pub mod geometry;
pub mod input;
pub mod layout;
pub mod persistence;
pub mod pool;
pub mod tools;

pub use data::{CURRENT_VERSION, DataAdapter, DataError, DataLoader, PoolDocument};
pub use editor::{Editor, EditingKind, EditingTarget};
pub use input::{Modifiers, MouseButton, PointerEvent};
pub use layout::LayoutCache;
pub use persistence::{
    MemoryPersistence, Persistence, PersistenceConfig, PersistenceError, PersistenceResult,
};
pub use pool::{
    LinkPainterId, MindLink, MindNode, NodePatch, NodePool, NodeRenderer, Uid, VIRTUAL_TARGET_UID,
};
pub use tools::{ToolController, ToolEvent, ToolFlag};

#[cfg(not(target_arch = "wasm32"))]
pub use persistence::FilePersistence;
