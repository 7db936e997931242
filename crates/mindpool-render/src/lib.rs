//! MindPool Render Library
//!
//! Drawing surface abstraction and the link painters for the MindPool
//! editor. Painters read the editor state and emit plain `kurbo` path
//! geometry; rasterization is left to the [`Surface`] implementation.

mod painter;
mod surface;

pub use painter::{
    BezierLinkPainter, LINK_LINE_WIDTH, LinkPainter, StraightLinkPainter, painter_for,
};
pub use surface::{DrawOp, RecordingSurface, Surface, parse_color};
