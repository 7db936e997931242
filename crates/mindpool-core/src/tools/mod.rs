//! Pointer-gesture tool state machine.
//!
//! Exactly one tool is active per gesture. The controller either uses an
//! explicitly selected tool or, in [`ToolFlag::Auto`] mode, inspects the
//! press event and picks the concrete tool for the gesture's duration.
//! Every gesture follows the same three-phase start/move/end protocol
//! against the [`Editor`].

use crate::editor::Editor;
use crate::input::{Modifiers, MouseButton};
use crate::pool::{NodePatch, Uid};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Squared pointer travel below which a press/release pair counts as a
/// click rather than a drag.
pub const CLICK_EPSILON: f64 = 0.01;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolFlag {
    #[default]
    Auto,
    CreateNode,
    LinkNode,
    CopyNode,
    DragNode,
    DragPool,
    Select,
}

/// A pointer event translated for tool consumption.
#[derive(Debug, Clone, Copy)]
pub struct ToolEvent {
    /// Pointer position in surface-pixel coordinates.
    pub position: Point,
    /// Node under the pointer, if any.
    pub node: Option<Uid>,
    /// Button that triggered the event (press only).
    pub button: Option<MouseButton>,
    pub modifiers: Modifiers,
}

/// Holds the configured tool and the in-flight gesture, if any.
#[derive(Debug, Default)]
pub struct ToolController {
    flag: ToolFlag,
    gesture: Option<Gesture>,
}

impl ToolController {
    pub fn new() -> Self {
        Self::default()
    }

    /// The configured tool.
    pub fn flag(&self) -> ToolFlag {
        self.flag
    }

    /// Switch tools. Any in-flight gesture is dropped.
    pub fn set_flag(&mut self, flag: ToolFlag) {
        self.flag = flag;
        self.gesture = None;
    }

    /// Whether a gesture is in flight.
    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn on_start(&mut self, editor: &mut Editor, event: &ToolEvent) {
        let flag = match self.flag {
            ToolFlag::Auto => auto_dispatch(event),
            explicit => explicit,
        };
        log::debug!("gesture start: {flag:?}");
        self.gesture = Some(Gesture::start(flag, editor, event));
    }

    pub fn on_move(&mut self, editor: &mut Editor, event: &ToolEvent) {
        if let Some(gesture) = &mut self.gesture {
            gesture.on_move(editor, event);
        }
    }

    pub fn on_end(&mut self, editor: &mut Editor, event: &ToolEvent) {
        if let Some(gesture) = self.gesture.take() {
            gesture.on_end(editor, event);
        }
    }
}

/// Pick the concrete tool for a press in auto mode.
///
/// Priority: middle button pans, right button links, then ctrl selects,
/// shift creates, alt copies, a press on a node drags it, and anything
/// else starts a rubber-band selection.
fn auto_dispatch(event: &ToolEvent) -> ToolFlag {
    match event.button {
        Some(MouseButton::Middle) => ToolFlag::DragPool,
        Some(MouseButton::Right) => ToolFlag::LinkNode,
        _ => {
            if event.modifiers.ctrl {
                ToolFlag::Select
            } else if event.modifiers.shift {
                ToolFlag::CreateNode
            } else if event.modifiers.alt {
                ToolFlag::CopyNode
            } else if event.node.is_some() {
                ToolFlag::DragNode
            } else {
                ToolFlag::Select
            }
        }
    }
}

/// Per-gesture state, one variant per concrete tool.
#[derive(Debug)]
enum Gesture {
    DragNode(DragNodeGesture),
    DragPool(DragPoolGesture),
    Select(SelectGesture),
    LinkNode(LinkNodeGesture),
    CreateNode,
    CopyNode(DragNodeGesture),
}

impl Gesture {
    fn start(flag: ToolFlag, editor: &mut Editor, event: &ToolEvent) -> Self {
        match flag {
            // Auto never reaches here; treat it like Select if it does.
            ToolFlag::Auto | ToolFlag::Select => Gesture::Select(SelectGesture::start(event)),
            ToolFlag::DragNode => Gesture::DragNode(DragNodeGesture::start(editor, event)),
            ToolFlag::DragPool => Gesture::DragPool(DragPoolGesture::start(editor, event)),
            ToolFlag::LinkNode => Gesture::LinkNode(LinkNodeGesture::start(editor, event)),
            ToolFlag::CreateNode => Gesture::CreateNode,
            ToolFlag::CopyNode => Gesture::CopyNode(DragNodeGesture::start_copy(editor, event)),
        }
    }

    fn on_move(&mut self, editor: &mut Editor, event: &ToolEvent) {
        match self {
            Gesture::DragNode(g) | Gesture::CopyNode(g) => g.on_move(editor, event),
            Gesture::DragPool(g) => g.on_move(editor, event),
            Gesture::Select(g) => g.on_move(editor, event),
            Gesture::LinkNode(g) => g.on_move(editor, event),
            Gesture::CreateNode => {}
        }
    }

    fn on_end(self, editor: &mut Editor, event: &ToolEvent) {
        match self {
            Gesture::DragNode(g) => g.on_end(editor, event),
            // Copies stay where the drag left them; a degenerate click
            // must not undo the copy placement.
            Gesture::CopyNode(_) => {}
            Gesture::DragPool(_) => {}
            Gesture::Select(g) => g.on_end(editor, event),
            Gesture::LinkNode(g) => g.on_end(editor, event),
            Gesture::CreateNode => {
                let position = editor.pixel_to_pool(event.position);
                editor.create_node(NodePatch::position(position));
            }
        }
    }
}

/// Drags every selected node by the pointer delta. Also the drag phase
/// of the copy tool.
#[derive(Debug)]
struct DragNodeGesture {
    start_mouse: Point,
    /// Pool-space start position per dragged node.
    start_positions: Vec<(Uid, Point)>,
    /// Node the press landed on, for click disambiguation.
    pressed: Option<Uid>,
    moved: bool,
}

impl DragNodeGesture {
    fn start(editor: &mut Editor, event: &ToolEvent) -> Self {
        // A press on an unselected node retargets the selection to it.
        if let Some(uid) = event.node {
            if !editor.is_selected(uid) {
                editor.select_only(uid);
            }
        }

        let start_positions = editor
            .selected_uids()
            .into_iter()
            .filter_map(|uid| editor.pool.node(uid).map(|n| (uid, n.position)))
            .collect();

        Self {
            start_mouse: event.position,
            start_positions,
            pressed: event.node,
            moved: false,
        }
    }

    /// Copy-tool variant: duplicate the selection first, then drag the
    /// fresh copies.
    fn start_copy(editor: &mut Editor, event: &ToolEvent) -> Self {
        if let Some(uid) = event.node {
            if !editor.is_selected(uid) {
                editor.select_only(uid);
            }
        }

        let copies: Vec<Uid> = editor
            .selected_uids()
            .into_iter()
            .filter_map(|uid| editor.pool.copy_node(uid))
            .collect();

        editor.set_selection(copies.iter().copied().collect());
        if let [single] = copies[..] {
            editor.set_editing_node(single);
        }

        let start_positions = copies
            .into_iter()
            .filter_map(|uid| editor.pool.node(uid).map(|n| (uid, n.position)))
            .collect();

        Self {
            start_mouse: event.position,
            start_positions,
            pressed: None,
            moved: false,
        }
    }

    fn on_move(&mut self, editor: &mut Editor, event: &ToolEvent) {
        self.moved = true;
        // Every move recomputes from the recorded start, so only the
        // final delta matters regardless of intermediate events.
        let delta = event.position - self.start_mouse;
        for &(uid, start) in &self.start_positions {
            editor
                .pool
                .modify_node(uid, NodePatch::position(start + delta));
        }
    }

    fn on_end(self, editor: &mut Editor, event: &ToolEvent) {
        let delta = event.position - self.start_mouse;
        if !self.moved || delta.hypot2() < CLICK_EPSILON {
            // A click, not a drag: undo any sub-epsilon jitter and open
            // the pressed node for editing.
            for &(uid, start) in &self.start_positions {
                editor.pool.modify_node(uid, NodePatch::position(start));
            }
            if let Some(uid) = self.pressed {
                editor.set_editing_node(uid);
            }
        }
    }
}

/// Pans the pool view one-to-one with the pointer.
#[derive(Debug)]
struct DragPoolGesture {
    start_offset: Vec2,
    start_mouse: Point,
}

impl DragPoolGesture {
    fn start(editor: &Editor, event: &ToolEvent) -> Self {
        Self {
            start_offset: editor.pool.offset,
            start_mouse: event.position,
        }
    }

    fn on_move(&mut self, editor: &mut Editor, event: &ToolEvent) {
        editor.pool.offset = self.start_offset + (event.position - self.start_mouse);
    }
}

/// Rubber-band selection, degrading to a single-node click-select when
/// the pointer never travels.
#[derive(Debug)]
struct SelectGesture {
    start_mouse: Point,
    moved: bool,
}

impl SelectGesture {
    fn start(event: &ToolEvent) -> Self {
        Self {
            start_mouse: event.position,
            moved: false,
        }
    }

    fn on_move(&mut self, editor: &mut Editor, event: &ToolEvent) {
        self.moved = true;
        // Signed rectangle between anchor and pointer; consumers
        // normalize.
        editor.selection_area = Some(Rect::new(
            self.start_mouse.x,
            self.start_mouse.y,
            event.position.x,
            event.position.y,
        ));
    }

    fn on_end(self, editor: &mut Editor, event: &ToolEvent) {
        let picked: Vec<Uid> = if !self.moved || self.start_mouse == event.position {
            event.node.into_iter().collect()
        } else {
            let area = Rect::new(
                self.start_mouse.x,
                self.start_mouse.y,
                event.position.x,
                event.position.y,
            )
            .abs();
            editor
                .pool
                .nodes()
                .map(|node| node.uid)
                .filter(|&uid| {
                    editor
                        .layout
                        .rect(uid)
                        .is_some_and(|rect| crate::geometry::rect_contains_rect(area, rect))
                })
                .collect()
        };

        if event.modifiers.ctrl {
            for uid in picked {
                editor.add_to_selection(uid);
            }
        } else {
            let single = (picked.len() == 1).then(|| picked[0]);
            editor.set_selection(picked.into_iter().collect::<HashSet<_>>());
            if let Some(uid) = single {
                editor.set_editing_node(uid);
            }
        }

        editor.selection_area = None;
    }
}

/// Drags a link from the selected node(s) to a drop target, toggling
/// existing links.
#[derive(Debug)]
struct LinkNodeGesture {
    active: bool,
}

impl LinkNodeGesture {
    fn start(editor: &mut Editor, event: &ToolEvent) -> Self {
        let Some(uid) = event.node else {
            return Self { active: false };
        };
        if !editor.is_selected(uid) {
            editor.select_only(uid);
        }
        Self { active: true }
    }

    fn on_move(&mut self, editor: &mut Editor, event: &ToolEvent) {
        if self.active {
            editor.virtual_target = Some(event.position);
        }
    }

    fn on_end(self, editor: &mut Editor, event: &ToolEvent) {
        if !self.active {
            return;
        }
        editor.virtual_target = None;

        if let Some(target) = event.node {
            for source in editor.selected_uids() {
                // Toggle: a second link drag over an existing link
                // removes it.
                if editor.pool.link_between(source, target).is_some() {
                    editor.pool.remove_link(source, target);
                } else {
                    editor.pool.create_link(source, target);
                }
            }
        }
    }
}
