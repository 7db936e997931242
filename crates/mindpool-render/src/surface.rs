//! Drawing surface abstraction.
//!
//! The painters emit plain path geometry; a surface turns it into
//! pixels. [`RecordingSurface`] just keeps the ops, for tests and
//! headless consumers.

use kurbo::BezPath;
use peniko::Color;

/// A target the link painters draw into.
pub trait Surface {
    /// Erase everything drawn so far.
    fn clear(&mut self);

    fn stroke_path(&mut self, path: &BezPath, color: Color, width: f64);

    fn fill_path(&mut self, path: &BezPath, color: Color);
}

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    Stroke {
        path: BezPath,
        color: Color,
        width: f64,
    },
    Fill {
        path: BezPath,
        color: Color,
    },
}

/// Surface that records operations instead of rasterizing them.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything drawn since creation or the last [`Surface::clear`].
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn strokes(&self) -> impl Iterator<Item = &DrawOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Stroke { .. }))
    }

    pub fn fills(&self) -> impl Iterator<Item = &DrawOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Fill { .. }))
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear);
    }

    fn stroke_path(&mut self, path: &BezPath, color: Color, width: f64) {
        self.ops.push(DrawOp::Stroke {
            path: path.clone(),
            color,
            width,
        });
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) {
        self.ops.push(DrawOp::Fill {
            path: path.clone(),
            color,
        });
    }
}

/// Parse a CSS-style hex color string (`#rgb`, `#rrggbb`, `#rrggbbaa`).
///
/// Anything else, CSS named colors included, falls back to mid gray so
/// a bad color string never hides a link entirely.
pub fn parse_color(color: &str) -> Color {
    let fallback = Color::from_rgba8(128, 128, 128, 255);

    let Some(hex) = color.trim().strip_prefix('#') else {
        return fallback;
    };
    // Color strings come straight from documents; a multi-byte payload
    // must fall back, not panic on a non-boundary slice.
    if !hex.is_ascii() {
        return fallback;
    }
    match hex.len() {
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).unwrap_or(8) * 17;
            let g = u8::from_str_radix(&hex[1..2], 16).unwrap_or(8) * 17;
            let b = u8::from_str_radix(&hex[2..3], 16).unwrap_or(8) * 17;
            Color::from_rgba8(r, g, b, 255)
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(128);
            let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(128);
            let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(128);
            Color::from_rgba8(r, g, b, 255)
        }
        8 => {
            let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(128);
            let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(128);
            let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(128);
            let a = u8::from_str_radix(&hex[6..8], 16).unwrap_or(255);
            Color::from_rgba8(r, g, b, a)
        }
        _ => fallback,
    }
}
