//! The editor facade tying pool, layout, selection and tools together.
//!
//! The host shell owns one [`Editor`], feeds it pointer events and asks
//! [`Editor::take_dirty`] whether a repaint is due. Everything the shell
//! or the painters need to read goes through here.

use crate::data::{CURRENT_VERSION, PoolDocument};
use crate::input::{Modifiers, PointerEvent};
use crate::layout::LayoutCache;
use crate::pool::{MindLink, MindNode, NodePatch, NodePool, Uid};
use crate::tools::{ToolController, ToolEvent, ToolFlag};
use kurbo::{Point, Rect, Size, Vec2};
use std::collections::HashSet;

/// What kind of entity is open for text editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditingKind {
    Node,
    Link,
}

/// The entity currently open for text editing, by uid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditingTarget {
    pub kind: EditingKind,
    pub uid: Uid,
}

/// Editing session over one [`NodePool`].
///
/// Selection and editing state hold uids only and re-resolve through
/// the pool on every read, so stale entries degrade to absence instead
/// of dangling.
#[derive(Debug, Default)]
pub struct Editor {
    pub pool: NodePool,
    pub layout: LayoutCache,
    /// Signed rubber-band rectangle while a select gesture is dragging.
    pub selection_area: Option<Rect>,
    /// Free endpoint of the link preview while a link gesture is
    /// dragging, in surface-pixel coordinates.
    pub virtual_target: Option<Point>,
    selected: HashSet<Uid>,
    editing: Option<EditingTarget>,
    /// Surface center; pool coordinate (0,0) maps here at zero offset.
    origin: Vec2,
    /// Client position of the surface, subtracted from incoming events.
    pool_fix: Vec2,
    dirty: bool,
    tools: ToolController,
}

impl Editor {
    pub fn new() -> Self {
        Self {
            // An initial paint is always due.
            dirty: true,
            ..Self::default()
        }
    }

    /// Update the surface size. The pool origin tracks the center.
    pub fn set_viewport_size(&mut self, size: Size) {
        self.origin = Vec2::new(size.width / 2.0, size.height / 2.0);
        self.notify_update();
    }

    /// Update the surface's client position.
    pub fn set_pool_fix(&mut self, pool_fix: Vec2) {
        self.pool_fix = pool_fix;
    }

    pub fn pool_fix(&self) -> Vec2 {
        self.pool_fix
    }

    /// Translation from pool coordinates to surface pixels.
    pub fn anchor(&self) -> Vec2 {
        self.origin + self.pool.offset
    }

    /// Surface-pixel position to pool coordinates.
    pub fn pixel_to_pool(&self, pixel: Point) -> Point {
        pixel - self.anchor()
    }

    /// Pool coordinates to surface-pixel position.
    pub fn pool_to_pixel(&self, pool: Point) -> Point {
        pool + self.anchor()
    }

    pub fn tool_flag(&self) -> ToolFlag {
        self.tools.flag()
    }

    pub fn set_tool_flag(&mut self, flag: ToolFlag) {
        self.tools.set_flag(flag);
        self.notify_update();
    }

    /// Feed one pointer event to the active tool.
    ///
    /// `Leave` is treated as `Up`: leaving the surface always ends the
    /// gesture.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        let position = event.position() - self.pool_fix;
        let (button, modifiers) = match event {
            PointerEvent::Down {
                button, modifiers, ..
            } => (Some(button), modifiers),
            PointerEvent::Move { .. } => (None, Modifiers::default()),
            PointerEvent::Up { modifiers, .. } | PointerEvent::Leave { modifiers, .. } => {
                (None, modifiers)
            }
        };
        let tool_event = ToolEvent {
            position,
            node: self.layout.node_at_point(position),
            button,
            modifiers,
        };

        // The controller is moved out so gestures can borrow the whole
        // editor mutably.
        let mut tools = std::mem::take(&mut self.tools);
        match event {
            PointerEvent::Down { .. } => tools.on_start(self, &tool_event),
            PointerEvent::Move { .. } => tools.on_move(self, &tool_event),
            PointerEvent::Up { .. } | PointerEvent::Leave { .. } => tools.on_end(self, &tool_event),
        }
        self.tools = tools;
        self.notify_update();
    }

    pub fn is_selected(&self, uid: Uid) -> bool {
        self.selected.contains(&uid)
    }

    /// Selected uids that still resolve to live nodes, sorted for
    /// deterministic iteration.
    pub fn selected_uids(&self) -> Vec<Uid> {
        let mut uids: Vec<Uid> = self
            .selected
            .iter()
            .copied()
            .filter(|&uid| self.pool.node(uid).is_some())
            .collect();
        uids.sort_unstable();
        uids
    }

    pub fn selected_nodes(&self) -> impl Iterator<Item = &MindNode> {
        self.selected.iter().filter_map(|&uid| self.pool.node(uid))
    }

    pub fn select_only(&mut self, uid: Uid) {
        self.selected.clear();
        self.selected.insert(uid);
    }

    pub fn add_to_selection(&mut self, uid: Uid) {
        self.selected.insert(uid);
    }

    pub fn set_selection(&mut self, uids: HashSet<Uid>) {
        self.selected = uids;
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn set_editing_node(&mut self, uid: Uid) {
        self.editing = Some(EditingTarget {
            kind: EditingKind::Node,
            uid,
        });
    }

    pub fn set_editing_link(&mut self, uid: Uid) {
        self.editing = Some(EditingTarget {
            kind: EditingKind::Link,
            uid,
        });
    }

    pub fn clear_editing(&mut self) {
        self.editing = None;
    }

    /// The editing target, if it still resolves in the pool.
    pub fn editing_target(&self) -> Option<EditingTarget> {
        let target = self.editing?;
        let alive = match target.kind {
            EditingKind::Node => self.pool.node(target.uid).is_some(),
            EditingKind::Link => self.pool.link(target.uid).is_some(),
        };
        alive.then_some(target)
    }

    /// The node open for editing, if any.
    pub fn editing_node(&self) -> Option<&MindNode> {
        match self.editing_target()? {
            EditingTarget {
                kind: EditingKind::Node,
                uid,
            } => self.pool.node(uid),
            _ => None,
        }
    }

    /// Create a node, select it and open it for editing.
    pub fn create_node(&mut self, data: NodePatch) -> Uid {
        let uid = self.pool.create_node(data);
        self.select_only(uid);
        self.set_editing_node(uid);
        self.notify_update();
        uid
    }

    /// Remove a node and every trace of it: attached links (in the
    /// pool), cached layout rect, selection membership and editing
    /// target.
    pub fn remove_node_by_uid(&mut self, uid: Uid) -> bool {
        if self.pool.remove_node_by_uid(uid).is_none() {
            return false;
        }
        self.layout.remove(uid);
        self.selected.remove(&uid);
        if self.editing.is_some_and(|t| t.uid == uid && t.kind == EditingKind::Node) {
            self.editing = None;
        }
        self.notify_update();
        true
    }

    /// Mark the editor as needing a repaint.
    pub fn notify_update(&mut self) {
        self.dirty = true;
    }

    /// Consume the dirty flag. The shell repaints when this is true.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Replace the whole pool from a parsed document and reset all
    /// session state. The document must already be at the current
    /// version; parsing and migration happen before any mutation.
    pub fn load_document(&mut self, document: PoolDocument) {
        log::info!(
            "loading document: {} nodes, {} links",
            document.nodes.len(),
            document.links.len()
        );
        self.pool.replace(
            document.nodes,
            document.links,
            document.uid_counter,
            document.offset,
            document.scale_factor,
            document.link_painter_id,
        );
        self.layout.clear();
        self.selected.clear();
        self.editing = None;
        self.selection_area = None;
        self.virtual_target = None;
        let flag = self.tools.flag();
        self.tools.set_flag(flag);
        self.notify_update();
    }

    /// Snapshot the pool as a document, nodes and links sorted by uid
    /// so the output is deterministic.
    pub fn build_document(&self) -> PoolDocument {
        let mut nodes: Vec<MindNode> = self.pool.nodes().cloned().collect();
        nodes.sort_unstable_by_key(|n| n.uid);
        let mut links: Vec<MindLink> = self.pool.links().cloned().collect();
        links.sort_unstable_by_key(|l| l.uid);
        PoolDocument {
            version: CURRENT_VERSION,
            link_painter_id: self.pool.link_painter_id,
            uid_counter: self.pool.uid_counter(),
            offset: self.pool.offset,
            scale_factor: self.pool.scale_factor,
            nodes,
            links,
        }
    }

}
