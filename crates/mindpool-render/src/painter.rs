//! Link painters: turn the pool's links into drawable geometry.
//!
//! Both painters share the same setup. Node endpoints resolve to the
//! center of the node's cached layout rectangle; the sentinel uid -1
//! resolves to the live drag position while a link gesture is in
//! flight, and a synthetic preview link from every selected node is
//! injected so the user sees curve-accurate feedback before dropping.

use crate::surface::{Surface, parse_color};
use kurbo::{BezPath, Point, Vec2};
use mindpool_core::editor::Editor;
use mindpool_core::geometry::{
    angle_of, bezier_point_and_angle, normalize, rect_edge_exit_point, vec_from_angle,
};
use mindpool_core::pool::{DEFAULT_LINK_COLOR, LinkPainterId, MindLink, Uid, VIRTUAL_TARGET_UID};
use std::collections::HashMap;
use std::f64::consts::PI;

/// Stroke width for link lines; the arrowhead radius derives from it.
pub const LINK_LINE_WIDTH: f64 = 1.5;

/// Arrowhead wing angle relative to the pointing direction.
const ARROW_WING_ANGLE: f64 = 0.8 * PI;

/// Paints every link of a pool onto a surface.
pub trait LinkPainter {
    fn id(&self) -> LinkPainterId;

    fn paint(&self, editor: &Editor, surface: &mut dyn Surface);
}

/// The painter a document's `linkPainterId` asks for.
pub fn painter_for(id: LinkPainterId) -> Box<dyn LinkPainter> {
    match id {
        LinkPainterId::StraightLine => Box::new(StraightLinkPainter),
        LinkPainterId::BezierCurve => Box::new(BezierLinkPainter),
    }
}

/// Per-paint-pass caches. Point and angle lookups are memoized so a
/// node shared by many links is resolved once.
struct PaintCtx<'a> {
    editor: &'a Editor,
    points: HashMap<Uid, Point>,
    angles: HashMap<Uid, f64>,
}

impl<'a> PaintCtx<'a> {
    fn new(editor: &'a Editor) -> Self {
        Self {
            editor,
            points: HashMap::new(),
            angles: HashMap::new(),
        }
    }

    /// Screen-space endpoint for a uid. Unknown uids resolve to the
    /// origin; callers that care check the layout cache themselves.
    fn point(&mut self, uid: Uid) -> Point {
        if let Some(&point) = self.points.get(&uid) {
            return point;
        }
        let point = if uid == VIRTUAL_TARGET_UID {
            self.editor.virtual_target.unwrap_or(Point::ZERO)
        } else {
            self.editor
                .layout
                .rect(uid)
                .map(|rect| rect.center())
                .unwrap_or(Point::ZERO)
        };
        self.points.insert(uid, point);
        point
    }

    /// Blended outward tangent angle for a node, used by the bezier
    /// painter.
    ///
    /// Every inbound neighbor contributes a unit vector pointing into
    /// the node and every outbound neighbor one pointing out; the two
    /// sums are normalized and blended, which keeps the tangent stable
    /// as links come and go. NaN means "no usable angle": the node has
    /// no inbound links, or no outbound links and no live preview from
    /// it. The virtual target itself never has an angle.
    fn tangent_angle(&mut self, uid: Uid) -> f64 {
        if uid == VIRTUAL_TARGET_UID {
            return f64::NAN;
        }
        if let Some(&angle) = self.angles.get(&uid) {
            return angle;
        }
        if self.editor.pool.node(uid).is_none() {
            return f64::NAN;
        }

        let position = self.point(uid);
        let in_ports: Vec<Uid> = self
            .editor
            .pool
            .links_of_target(uid)
            .iter()
            .map(|link| link.source)
            .collect();
        let out_ports: Vec<Uid> = self
            .editor
            .pool
            .links_of_source(uid)
            .iter()
            .map(|link| link.target)
            .collect();
        let previewing = self.editor.is_selected(uid) && self.editor.virtual_target.is_some();

        if in_ports.is_empty() || (out_ports.is_empty() && !previewing) {
            self.angles.insert(uid, f64::NAN);
            return f64::NAN;
        }

        let mut in_relative = Vec2::ZERO;
        for source in in_ports {
            let source_point = self.point(source);
            in_relative += normalize(position - source_point);
        }
        in_relative = normalize(in_relative);

        let mut out_relative = Vec2::ZERO;
        for target in out_ports {
            let target_point = self.point(target);
            out_relative += normalize(target_point - position);
        }
        if let Some(virtual_target) = self.editor.virtual_target {
            if self.editor.is_selected(uid) {
                out_relative += normalize(virtual_target - position);
            }
        }
        out_relative = normalize(out_relative);

        let angle = angle_of(in_relative + out_relative);
        self.angles.insert(uid, angle);
        angle
    }
}

/// Real links in uid order, plus one preview link per selected node
/// while a link drag is in flight.
fn links_with_preview(editor: &Editor) -> Vec<MindLink> {
    let mut links: Vec<MindLink> = editor.pool.links().cloned().collect();
    links.sort_unstable_by_key(|link| link.uid);
    if editor.virtual_target.is_some() {
        for source in editor.selected_uids() {
            links.push(MindLink {
                uid: VIRTUAL_TARGET_UID,
                source,
                target: VIRTUAL_TARGET_UID,
                text: String::new(),
                color: DEFAULT_LINK_COLOR.to_string(),
            });
        }
    }
    links
}

/// Whether an endpoint can be drawn: real nodes need a cached rect,
/// the virtual target is always drawable.
fn endpoint_ready(editor: &Editor, uid: Uid) -> bool {
    uid == VIRTUAL_TARGET_UID || editor.layout.rect(uid).is_some()
}

/// Filled triangle pointing along `angle`: the tip plus two wing points
/// at +-0.8 pi, all at three line widths from the anchor.
fn arrow_path(position: Point, angle: f64) -> BezPath {
    let radius = LINK_LINE_WIDTH * 3.0;
    let mut path = BezPath::new();
    path.move_to(position + vec_from_angle(angle, radius));
    path.line_to(position + vec_from_angle(angle + ARROW_WING_ANGLE, radius));
    path.line_to(position + vec_from_angle(angle - ARROW_WING_ANGLE, radius));
    path.close_path();
    path
}

/// Draws each link as a straight segment clipped to the node borders.
pub struct StraightLinkPainter;

impl LinkPainter for StraightLinkPainter {
    fn id(&self) -> LinkPainterId {
        LinkPainterId::StraightLine
    }

    fn paint(&self, editor: &Editor, surface: &mut dyn Surface) {
        let mut ctx = PaintCtx::new(editor);
        surface.clear();

        for link in links_with_preview(editor) {
            if !endpoint_ready(editor, link.source) || !endpoint_ready(editor, link.target) {
                continue;
            }
            let source_point = ctx.point(link.source);
            let target_point = ctx.point(link.target);
            if source_point == target_point {
                continue;
            }
            // Adjacent or overlapping rects leave no room for a line.
            let source_rect = editor.layout.rect(link.source);
            let target_rect = editor.layout.rect(link.target);
            if source_rect.is_some_and(|rect| rect.contains(target_point))
                || target_rect.is_some_and(|rect| rect.contains(source_point))
            {
                continue;
            }

            // Clip both ends to the border instead of drawing from
            // center to center. The preview endpoint has no rect and
            // stays at the pointer.
            let start = source_rect
                .map_or(source_point, |rect| rect_edge_exit_point(rect, target_point));
            let end = target_rect
                .map_or(target_point, |rect| rect_edge_exit_point(rect, source_point));

            let color = parse_color(&link.color);
            let mut path = BezPath::new();
            path.move_to(start);
            path.line_to(end);
            surface.stroke_path(&path, color, LINK_LINE_WIDTH);

            let angle = angle_of(end - start);
            surface.fill_path(&arrow_path(start.midpoint(end), angle), color);
        }
    }
}

/// Draws each link as a cubic bezier whose control handles follow the
/// blended tangent angle of the endpoint nodes.
pub struct BezierLinkPainter;

impl LinkPainter for BezierLinkPainter {
    fn id(&self) -> LinkPainterId {
        LinkPainterId::BezierCurve
    }

    fn paint(&self, editor: &Editor, surface: &mut dyn Surface) {
        let mut ctx = PaintCtx::new(editor);
        surface.clear();

        for link in links_with_preview(editor) {
            if !endpoint_ready(editor, link.source) || !endpoint_ready(editor, link.target) {
                continue;
            }
            let source_point = ctx.point(link.source);
            let target_point = ctx.point(link.target);
            if source_point == target_point {
                continue;
            }

            let source_angle = ctx.tangent_angle(link.source);
            let target_angle = ctx.tangent_angle(link.target);

            // An undefined angle degrades that end to a straight
            // segment via a zero-length handle.
            let base_length = (target_point - source_point).hypot() / 3.0;
            let source_handle = if source_angle.is_nan() {
                Vec2::ZERO
            } else {
                vec_from_angle(source_angle, base_length)
            };
            let target_handle = if target_angle.is_nan() {
                Vec2::ZERO
            } else {
                vec_from_angle(target_angle, base_length)
            };
            let control1 = source_point + source_handle;
            let control2 = target_point - target_handle;

            let color = parse_color(&link.color);
            let mut path = BezPath::new();
            path.move_to(source_point);
            path.curve_to(control1, control2, target_point);
            surface.stroke_path(&path, color, LINK_LINE_WIDTH);

            // Slightly past the midpoint, oriented along the curve's
            // local tangent rather than the secant.
            let (center, center_angle) =
                bezier_point_and_angle(0.55, source_point, control1, control2, target_point);
            surface.fill_path(&arrow_path(center, center_angle), color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawOp, RecordingSurface};
    use kurbo::{PathEl, Rect};
    use mindpool_core::pool::NodePatch;

    fn editor_with_pair() -> (Editor, Uid, Uid) {
        let mut editor = Editor::new();
        let a = editor.pool.create_node(NodePatch::default());
        let b = editor.pool.create_node(NodePatch::default());
        editor.layout.set_rect(a, Rect::new(0.0, 0.0, 20.0, 20.0));
        editor.layout.set_rect(b, Rect::new(100.0, 0.0, 120.0, 20.0));
        (editor, a, b)
    }

    fn path_points(path: &BezPath) -> Vec<Point> {
        let mut points = Vec::new();
        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) | PathEl::LineTo(p) => points.push(p),
                PathEl::QuadTo(p1, p2) => points.extend([p1, p2]),
                PathEl::CurveTo(p1, p2, p3) => points.extend([p1, p2, p3]),
                PathEl::ClosePath => {}
            }
        }
        points
    }

    fn assert_finite(path: &BezPath) {
        for point in path_points(path) {
            assert!(point.x.is_finite() && point.y.is_finite(), "non-finite point in {path:?}");
        }
    }

    #[test]
    fn test_painter_for_ids() {
        assert_eq!(
            painter_for(LinkPainterId::StraightLine).id(),
            LinkPainterId::StraightLine
        );
        assert_eq!(
            painter_for(LinkPainterId::BezierCurve).id(),
            LinkPainterId::BezierCurve
        );
    }

    #[test]
    fn test_straight_clips_to_borders() {
        let (mut editor, a, b) = editor_with_pair();
        editor.pool.create_link(a, b);

        let mut surface = RecordingSurface::new();
        StraightLinkPainter.paint(&editor, &mut surface);

        assert_eq!(surface.strokes().count(), 1);
        assert_eq!(surface.fills().count(), 1);

        let Some(DrawOp::Stroke { path, width, .. }) = surface.strokes().next() else {
            unreachable!()
        };
        assert_eq!(*width, LINK_LINE_WIDTH);
        let points = path_points(path);
        // Centers are (10,10) and (110,10); the line starts and ends on
        // the facing borders.
        assert_eq!(points[0], Point::new(20.0, 10.0));
        assert_eq!(points[1], Point::new(100.0, 10.0));

        // The arrow sits at the midpoint of the clipped segment.
        let Some(DrawOp::Fill { path, .. }) = surface.fills().next() else {
            unreachable!()
        };
        let tip = path_points(path)[0];
        assert!((tip.x - (60.0 + LINK_LINE_WIDTH * 3.0)).abs() < 1e-9);
        assert!((tip.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_straight_skips_degenerate() {
        let (mut editor, a, b) = editor_with_pair();
        editor.pool.create_link(a, b);
        // Move b's rect on top of a so the centers see each other.
        editor.layout.set_rect(b, Rect::new(5.0, 5.0, 25.0, 25.0));

        let mut surface = RecordingSurface::new();
        StraightLinkPainter.paint(&editor, &mut surface);
        assert_eq!(surface.strokes().count(), 0);

        // Identical centers are skipped too.
        editor.layout.set_rect(b, Rect::new(0.0, 0.0, 20.0, 20.0));
        let mut surface = RecordingSurface::new();
        StraightLinkPainter.paint(&editor, &mut surface);
        assert_eq!(surface.strokes().count(), 0);
    }

    #[test]
    fn test_straight_skips_unlaid_out_node() {
        let (mut editor, a, b) = editor_with_pair();
        editor.pool.create_link(a, b);
        editor.layout.remove(b);

        let mut surface = RecordingSurface::new();
        StraightLinkPainter.paint(&editor, &mut surface);
        assert_eq!(surface.strokes().count(), 0);
    }

    #[test]
    fn test_preview_links_drawn_per_selected_node() {
        let (mut editor, a, b) = editor_with_pair();
        editor.set_selection([a, b].into_iter().collect());
        editor.virtual_target = Some(Point::new(60.0, 200.0));

        let mut surface = RecordingSurface::new();
        StraightLinkPainter.paint(&editor, &mut surface);
        // No real links; one preview per selected node.
        assert_eq!(surface.strokes().count(), 2);

        // The preview endpoint is the pointer itself, unclipped.
        let Some(DrawOp::Stroke { path, .. }) = surface.strokes().next() else {
            unreachable!()
        };
        assert_eq!(path_points(path)[1], Point::new(60.0, 200.0));
    }

    #[test]
    fn test_no_preview_without_virtual_target() {
        let (mut editor, a, _) = editor_with_pair();
        editor.select_only(a);

        let mut surface = RecordingSurface::new();
        StraightLinkPainter.paint(&editor, &mut surface);
        assert_eq!(surface.strokes().count(), 0);
    }

    #[test]
    fn test_bezier_isolated_pair_stays_finite() {
        let (mut editor, a, b) = editor_with_pair();
        editor.pool.create_link(a, b);

        let mut surface = RecordingSurface::new();
        BezierLinkPainter.paint(&editor, &mut surface);

        assert_eq!(surface.strokes().count(), 1);
        assert_eq!(surface.fills().count(), 1);
        for op in surface.ops() {
            match op {
                DrawOp::Stroke { path, .. } | DrawOp::Fill { path, .. } => assert_finite(path),
                DrawOp::Clear => {}
            }
        }

        // Both endpoint angles are undefined here, so the curve is a
        // straight horizontal segment and the arrow stays on it.
        let Some(DrawOp::Fill { path, .. }) = surface.fills().next() else {
            unreachable!()
        };
        for point in path_points(path) {
            assert!((point.y - 10.0).abs() < LINK_LINE_WIDTH * 3.0 + 1e-9);
        }
    }

    #[test]
    fn test_bezier_chain_gets_curved_middle() {
        let (mut editor, a, b) = editor_with_pair();
        let c = editor.pool.create_node(NodePatch::default());
        editor.layout.set_rect(c, Rect::new(100.0, 100.0, 120.0, 120.0));
        editor.pool.create_link(a, b);
        editor.pool.create_link(b, c);

        let mut surface = RecordingSurface::new();
        BezierLinkPainter.paint(&editor, &mut surface);

        assert_eq!(surface.strokes().count(), 2);
        assert_eq!(surface.fills().count(), 2);
        for op in surface.ops() {
            match op {
                DrawOp::Stroke { path, .. } | DrawOp::Fill { path, .. } => assert_finite(path),
                DrawOp::Clear => {}
            }
        }

        // The middle node has both sides, so the a->b curve bends: its
        // incoming control point leaves the straight line.
        let strokes: Vec<&BezPath> = surface
            .strokes()
            .map(|op| match op {
                DrawOp::Stroke { path, .. } => path,
                _ => unreachable!(),
            })
            .collect();
        let ab_points = path_points(strokes[0]);
        // control2 = target - handle; the handle is non-zero.
        assert_ne!(ab_points[2], ab_points[3]);
    }

    #[test]
    fn test_bezier_preview_reaches_pointer() {
        let (mut editor, a, _) = editor_with_pair();
        editor.select_only(a);
        editor.virtual_target = Some(Point::new(200.0, 50.0));

        let mut surface = RecordingSurface::new();
        BezierLinkPainter.paint(&editor, &mut surface);

        assert_eq!(surface.strokes().count(), 1);
        let Some(DrawOp::Stroke { path, .. }) = surface.strokes().next() else {
            unreachable!()
        };
        let points = path_points(path);
        assert_eq!(points[0], Point::new(10.0, 10.0));
        assert_eq!(*points.last().unwrap(), Point::new(200.0, 50.0));
        assert_finite(path);
    }
}
