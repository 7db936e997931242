//! 2D geometry helpers shared by the editor core and the link painters.

use kurbo::{Point, Rect, Vec2};

/// Build a vector from a direction angle (radians) and a length.
pub fn vec_from_angle(angle: f64, length: f64) -> Vec2 {
    Vec2::new(angle.cos() * length, angle.sin() * length)
}

/// Normalize a vector to unit length. The zero vector stays zero.
pub fn normalize(v: Vec2) -> Vec2 {
    let len = v.hypot();
    if len < f64::EPSILON {
        Vec2::ZERO
    } else {
        v / len
    }
}

/// Direction angle of a vector in radians.
pub fn angle_of(v: Vec2) -> f64 {
    v.y.atan2(v.x)
}

/// Evaluate a 4-point cubic bezier at `t` via De Casteljau subdivision.
///
/// Returns the point on the curve together with the local tangent angle,
/// taken from the final interpolation segment (not the overall secant).
pub fn bezier_point_and_angle(t: f64, p0: Point, c1: Point, c2: Point, p1: Point) -> (Point, f64) {
    let a = p0.lerp(c1, t);
    let b = c1.lerp(c2, t);
    let c = c2.lerp(p1, t);
    let d = a.lerp(b, t);
    let e = b.lerp(c, t);
    (d.lerp(e, t), angle_of(e - d))
}

/// Whether `inner` lies fully inside `outer`.
///
/// The left/top edges are inclusive and the right/bottom edges exclusive,
/// so a rectangle touching the right or bottom boundary is not contained.
/// Both rectangles must already be normalized.
pub fn rect_contains_rect(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 && inner.y0 >= outer.y0 && inner.x1 < outer.x1 && inner.y1 < outer.y1
}

/// Intersection of the ray from the center of `rect` toward `toward` with
/// the edge the ray exits through.
///
/// The exit edge is picked by comparing the ray direction against the
/// rectangle's diagonal: a ray flatter than the diagonal leaves through
/// the left or right edge, a steeper one through the top or bottom.
/// Returns the center itself when `toward` coincides with it.
pub fn rect_edge_exit_point(rect: Rect, toward: Point) -> Point {
    let center = rect.center();
    let dir = toward - center;
    if dir.hypot() < f64::EPSILON {
        return center;
    }

    let half_width = rect.width().abs() / 2.0;
    let half_height = rect.height().abs() / 2.0;

    // dir.x.abs() * half_height >= dir.y.abs() * half_width is the
    // cross-multiplied form of |angle| <= diagonal angle.
    let scale = if dir.x.abs() * half_height >= dir.y.abs() * half_width {
        half_width / dir.x.abs()
    } else {
        half_height / dir.y.abs()
    };

    center + dir * scale
}
