//! Planar (2D) primitives: intersections, normals, and arc centers.

use crate::{Point2, Tolerance, Vec2};

/// 2D cross product (z component of the 3D cross product).
pub fn cross2(a: &Vec2, b: &Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Vector rotated a quarter turn counter-clockwise.
pub fn left_normal(v: &Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Rotate a vector by `angle` radians counter-clockwise.
pub fn rotate_vec2(v: &Vec2, angle: f64) -> Vec2 {
    let (s, c) = angle.sin_cos();
    Vec2::new(c * v.x - s * v.y, s * v.x + c * v.y)
}

/// Point at `fraction` of the way from `a` to `b`.
pub fn place_along(a: &Point2, b: &Point2, fraction: f64) -> Point2 {
    a + (b - a) * fraction
}

/// Unsigned distance from `p` to the infinite line through `origin` along `dir`.
pub fn distance_to_line(p: &Point2, origin: &Point2, dir: &Vec2) -> f64 {
    let d = dir.normalize();
    cross2(&d, &(p - origin)).abs()
}

/// Parameter of the orthogonal projection of `p` onto the line
/// `origin + t * dir` (in units of `dir`).
pub fn project_on_line(p: &Point2, origin: &Point2, dir: &Vec2) -> f64 {
    (p - origin).dot(dir) / dir.norm_squared()
}

/// Intersection of two infinite lines with the parameters along each.
#[derive(Debug, Clone, Copy)]
pub struct LineHit {
    /// The intersection point.
    pub point: Point2,
    /// Parameter along the first line (in units of its direction).
    pub t: f64,
    /// Parameter along the second line.
    pub u: f64,
}

/// Intersect `p1 + t * d1` with `p2 + u * d2`. `None` for parallel lines.
pub fn intersect_lines(p1: &Point2, d1: &Vec2, p2: &Point2, d2: &Vec2) -> Option<LineHit> {
    let denom = cross2(d1, d2);
    if denom.abs() < 1e-12 * d1.norm().max(1.0) * d2.norm().max(1.0) {
        return None;
    }
    let w = p2 - p1;
    let t = cross2(&w, d2) / denom;
    let u = cross2(&w, d1) / denom;
    Some(LineHit {
        point: p1 + d1 * t,
        t,
        u,
    })
}

/// Parameters `t` where `p + t * d` meets the circle, in increasing order.
///
/// A tangent line yields a single parameter.
pub fn intersect_line_circle(p: &Point2, d: &Vec2, center: &Point2, radius: f64) -> Vec<f64> {
    let f = p - center;
    let a = d.norm_squared();
    let b = 2.0 * f.dot(d);
    let c = f.norm_squared() - radius * radius;
    let disc = b * b - 4.0 * a * c;
    let tol = Tolerance::DEFAULT.linear;
    if disc < -tol * a.max(1.0) {
        return Vec::new();
    }
    if disc.abs() <= tol * a.max(1.0) {
        return vec![-b / (2.0 * a)];
    }
    let root = disc.sqrt();
    vec![(-b - root) / (2.0 * a), (-b + root) / (2.0 * a)]
}

/// Intersection points of two circles.
pub fn intersect_circles(c1: &Point2, r1: f64, c2: &Point2, r2: f64) -> Vec<Point2> {
    let delta = c2 - c1;
    let d = delta.norm();
    let tol = Tolerance::DEFAULT.linear;
    if d < tol || d > r1 + r2 + tol || d < (r1 - r2).abs() - tol {
        return Vec::new();
    }
    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h = (r1 * r1 - a * a).max(0.0).sqrt();
    let base = c1 + delta * (a / d);
    if h < tol {
        return vec![base];
    }
    let n = left_normal(&delta) / d;
    vec![base + n * h, base - n * h]
}

/// Center of the minor arc of `radius` from `start` to `end`, travelled
/// counter-clockwise when `ccw` is set.
///
/// Returns `None` when the chord is longer than the diameter (beyond
/// tolerance) or the endpoints coincide.
pub fn arc_center(start: &Point2, end: &Point2, radius: f64, ccw: bool) -> Option<Point2> {
    let chord = end - start;
    let half = chord.norm() / 2.0;
    let tol = Tolerance::DEFAULT.linear;
    if half < tol || half > radius.abs() + tol {
        return None;
    }
    let h = (radius * radius - half * half).max(0.0).sqrt();
    let mid = start + chord / 2.0;
    let n = left_normal(&chord).normalize();
    Some(if ccw { mid + n * h } else { mid - n * h })
}
