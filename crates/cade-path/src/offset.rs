//! Offsetting closed contours and thickening open ones.
//!
//! Lines move along their outward normal and arcs keep their center while
//! the radius changes. Neighbouring offset segments meet at the intersection
//! of their carriers closest to the original vertex (a miter join). When the
//! carriers do not meet, or the miter reaches further than four times the
//! offset distance, the gap is bridged by a straight line (a bevel join).

use cade_math::{intersect_circles, intersect_line_circle, intersect_lines, left_normal, Point2, Vec2};
use tracing::debug;

use crate::{Path, PathError, Result, Segment, EPSILON};

const MITER_LIMIT: f64 = 4.0;

/// How far to move the edges of a closed path. Positive grows the region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OffsetSpec {
    /// Every edge by the same distance.
    Uniform(f64),
    /// Per side `[left, top, right, bottom]`, chosen by the dominant
    /// direction of each segment's outward normal.
    PerSide([f64; 4]),
}

impl OffsetSpec {
    /// Per-side offsets from up to four values; missing sides stay put.
    pub fn sides(values: &[f64]) -> Self {
        let mut sides = [0.0; 4];
        for (side, v) in sides.iter_mut().zip(values) {
            *side = *v;
        }
        OffsetSpec::PerSide(sides)
    }

    fn distance_for(&self, outward: &Vec2) -> f64 {
        match self {
            OffsetSpec::Uniform(d) => *d,
            OffsetSpec::PerSide([left, top, right, bottom]) => {
                if outward.x.abs() >= outward.y.abs() {
                    if outward.x < 0.0 {
                        *left
                    } else {
                        *right
                    }
                } else if outward.y > 0.0 {
                    *top
                } else {
                    *bottom
                }
            }
        }
    }

    fn largest(&self) -> f64 {
        match self {
            OffsetSpec::Uniform(d) => *d,
            OffsetSpec::PerSide(sides) => sides
                .iter()
                .copied()
                .fold(0.0, |acc: f64, d| if d.abs() > acc.abs() { d } else { acc }),
        }
    }
}

impl From<f64> for OffsetSpec {
    fn from(d: f64) -> Self {
        OffsetSpec::Uniform(d)
    }
}

impl From<[f64; 4]> for OffsetSpec {
    fn from(sides: [f64; 4]) -> Self {
        OffsetSpec::PerSide(sides)
    }
}

/// One segment with its displaced copy.
struct Piece {
    original: Segment,
    shifted: Segment,
    left: f64,
}

/// Move `seg` by `left` towards its left side. `None` if an arc vanishes.
fn shift_segment(seg: &Segment, left: f64) -> Option<Segment> {
    match seg {
        Segment::Line { start, end } => {
            let n = left_normal(&(end - start).normalize()) * left;
            Some(Segment::line(start + n, end + n))
        }
        Segment::Arc {
            start,
            end,
            center,
            ccw,
        } => {
            let r = (start - center).norm();
            let r2 = if *ccw { r - left } else { r + left };
            if r2 <= EPSILON {
                return None;
            }
            let k = r2 / r;
            Some(Segment::arc(
                center + (start - center) * k,
                center + (end - center) * k,
                *center,
                *ccw,
            ))
        }
    }
}

/// Where the carriers of `a` and `b` meet near `vertex`, if acceptably close.
fn miter_point(a: &Segment, b: &Segment, vertex: &Point2, limit: f64) -> Option<Point2> {
    let (ae, bs) = (a.end(), b.start());
    if (ae - bs).norm() <= EPSILON {
        return Some(ae);
    }
    let candidates: Vec<Point2> = match (a, b) {
        (Segment::Line { start, end }, Segment::Line { start: s2, end: e2 }) => {
            intersect_lines(start, &(end - start), s2, &(e2 - s2))
                .map(|hit| hit.point)
                .into_iter()
                .collect()
        }
        (Segment::Line { start, end }, Segment::Arc { center, .. })
        | (Segment::Arc { center, .. }, Segment::Line { start, end }) => {
            let radius = if a.is_line() { b.radius() } else { a.radius() };
            let d = end - start;
            radius
                .map(|r| intersect_line_circle(start, &d, center, r))
                .unwrap_or_default()
                .into_iter()
                .map(|t| start + d * t)
                .collect()
        }
        (Segment::Arc { center: c1, .. }, Segment::Arc { center: c2, .. }) => {
            match (a.radius(), b.radius()) {
                (Some(r1), Some(r2)) => intersect_circles(c1, r1, c2, r2),
                _ => Vec::new(),
            }
        }
    };
    candidates
        .into_iter()
        .filter(|p| (p - vertex).norm() <= limit)
        .min_by(|p, q| (p - vertex).norm().total_cmp(&(q - vertex).norm()))
}

/// Join the shifted pieces listed in `alive`. Entries carry the piece index,
/// or `None` for bevel lines.
fn join_pieces(pieces: &[Piece], alive: &[usize], closed: bool) -> Vec<(Option<usize>, Segment)> {
    let m = alive.len();
    let mut shifted: Vec<Segment> = alive.iter().map(|&i| pieces[i].shifted.clone()).collect();
    let mut bevels: Vec<Option<Segment>> = vec![None; m];
    let joints = if closed { m } else { m.saturating_sub(1) };
    for k in 0..joints {
        let j = (k + 1) % m;
        let (pa, pb) = (&pieces[alive[k]], &pieces[alive[j]]);
        let vertex = pa.original.end();
        let limit = MITER_LIMIT * pa.left.abs().max(pb.left.abs()) + EPSILON;
        match miter_point(&shifted[k], &shifted[j], &vertex, limit) {
            Some(x) => {
                shifted[k].set_end(x);
                shifted[j].set_start(x);
            }
            None => {
                bevels[k] = Some(Segment::line(shifted[k].end(), shifted[j].start()));
            }
        }
    }
    let mut out = Vec::with_capacity(2 * m);
    for (k, seg) in shifted.into_iter().enumerate() {
        out.push((Some(alive[k]), seg));
        if let Some(bevel) = bevels[k].take() {
            out.push((None, bevel));
        }
    }
    out
}

/// True if the joined copy of a segment runs against its original.
fn is_flipped(original: &Segment, joined: &Segment) -> bool {
    if joined.is_degenerate() {
        return true;
    }
    match original {
        Segment::Line { start, end } => (joined.end() - joined.start()).dot(&(end - start)) <= 0.0,
        Segment::Arc { .. } => {
            let (s0, s1) = (original.sweep(), joined.sweep());
            s0 * s1 <= 0.0 || s1.abs() > s0.abs() + std::f64::consts::PI
        }
    }
}

/// Offset a chain, moving segment `i` by `lefts[i]` towards its left.
fn offset_chain(segments: &[Segment], lefts: &[f64], closed: bool) -> Option<Vec<Segment>> {
    let pieces: Vec<Piece> = segments
        .iter()
        .zip(lefts)
        .filter(|(s, _)| !s.is_degenerate())
        .filter_map(|(s, &left)| {
            shift_segment(s, left).map(|shifted| Piece {
                original: s.clone(),
                shifted,
                left,
            })
        })
        .collect();
    let mut alive: Vec<usize> = (0..pieces.len()).collect();
    let min_pieces = if closed { 2 } else { 1 };
    while alive.len() >= min_pieces {
        let joined = join_pieces(&pieces, &alive, closed);
        let flipped: Vec<usize> = joined
            .iter()
            .filter_map(|(idx, seg)| idx.filter(|&i| is_flipped(&pieces[i].original, seg)))
            .collect();
        if flipped.is_empty() {
            return Some(
                joined
                    .into_iter()
                    .map(|(_, s)| s)
                    .filter(|s| !s.is_degenerate())
                    .collect(),
            );
        }
        alive.retain(|i| !flipped.contains(i));
    }
    None
}

/// Outward unit normal of `seg` at its midpoint, for a contour of the given winding.
fn outward_normal(seg: &Segment, ccw: bool) -> Vec2 {
    let t = seg.tangent_at(seg.length() / 2.0);
    if ccw {
        -left_normal(&t)
    } else {
        left_normal(&t)
    }
}

impl Path {
    /// Offset a closed path; positive distances grow the region.
    ///
    /// Holes move by the opposite uniform distance; holes that vanish are
    /// dropped. Per-side offsets leave holes untouched.
    pub fn offset(&self, spec: impl Into<OffsetSpec>) -> Result<Path> {
        let spec = spec.into();
        if !self.is_closed() {
            return Err(PathError::NotClosed);
        }
        let area = self.area();
        let ccw = area > 0.0;
        let distances: Vec<f64> = self
            .segments
            .iter()
            .map(|s| spec.distance_for(&outward_normal(s, ccw)))
            .collect();
        let lefts: Vec<f64> = distances
            .iter()
            .map(|d| if ccw { -d } else { *d })
            .collect();
        let collapsed = PathError::OffsetCollapsed(spec.largest());
        let segments = offset_chain(&self.segments, &lefts, true).ok_or(collapsed.clone())?;
        let mut out = Path::from_segments(segments)?;
        out.close();

        let new_area = out.area();
        let grows = distances.iter().all(|d| *d >= 0.0);
        let shrinks = distances.iter().all(|d| *d <= 0.0);
        if new_area.abs() <= EPSILON
            || new_area.signum() != area.signum()
            || (grows && new_area.abs() < area.abs() - EPSILON)
            || (shrinks && new_area.abs() > area.abs() + EPSILON)
        {
            return Err(collapsed);
        }

        if let OffsetSpec::Uniform(d) = spec {
            for hole in &self.holes {
                match hole.offset(-d) {
                    Ok(h) => out.holes.push(h),
                    Err(PathError::OffsetCollapsed(_)) => {
                        debug!(distance = d, "hole vanished while offsetting");
                    }
                    Err(e) => return Err(e),
                }
            }
        } else {
            out.holes = self.holes.clone();
        }
        Ok(out)
    }

    /// Copy of an open chain moved `distance` towards its left side.
    pub fn offset_open(&self, distance: f64) -> Result<Path> {
        if self.segments.is_empty() {
            return Err(PathError::Empty);
        }
        let lefts = vec![distance; self.segments.len()];
        let segments = offset_chain(&self.segments, &lefts, false)
            .ok_or(PathError::OffsetCollapsed(distance))?;
        Path::from_segments(segments)
    }

    /// Closed band of width `thickness` on the left side of the chain.
    pub fn thicken_and_close(&self, thickness: f64) -> Result<Path> {
        let inner = self.offset_open(thickness)?.invert();
        let mut band = Path::from_segments(self.segments.clone())?;
        if let Some(first) = inner.segments.first() {
            band.line_to(first.start());
        }
        for seg in inner.segments {
            band.push_segment(seg)?;
        }
        band.close();
        Ok(band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn radii(p: &Path) -> Vec<f64> {
        p.segments().iter().filter_map(Segment::radius).collect()
    }

    #[test]
    fn test_circle_offsets() {
        let grown = Path::make_circle(5.0).offset(2.0).unwrap();
        let r = radii(&grown);
        assert_eq!(r.len(), 2);
        for radius in r {
            assert_relative_eq!(radius, 7.0, epsilon = 1e-9);
        }
        let shrunk = Path::make_circle(5.0).offset(-2.0).unwrap();
        for radius in radii(&shrunk) {
            assert_relative_eq!(radius, 3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_circle_offset_ignores_winding() {
        let grown = Path::make_circle(5.0).invert().offset(2.0).unwrap();
        for radius in radii(&grown) {
            assert_relative_eq!(radius, 7.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_circle_collapses() {
        assert!(matches!(
            Path::make_circle(5.0).offset(-5.0),
            Err(PathError::OffsetCollapsed(_))
        ));
    }

    #[test]
    fn test_rect_miter() {
        let r = Path::make_rect(20.0, 10.0).offset(1.0).unwrap();
        assert_eq!(r.len(), 4);
        assert_relative_eq!(r.area(), 22.0 * 12.0, epsilon = 1e-9);
        let (min, max) = r.bounding_box().unwrap();
        assert_relative_eq!(min.x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(max.y, 11.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rect_shrinks_past_short_side() {
        assert!(Path::make_rect(20.0, 10.0).offset(-5.0).is_err());
        let thin = Path::make_rect(20.0, 10.0).offset(-4.0).unwrap();
        assert_relative_eq!(thin.area(), 12.0 * 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_per_side_offsets() {
        let r = Path::make_rect(20.0, 10.0)
            .offset(OffsetSpec::sides(&[0.0, 0.0, -0.3]))
            .unwrap();
        let (min, max) = r.bounding_box().unwrap();
        assert_relative_eq!(min.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(max.x, 19.7, epsilon = 1e-12);
        assert_relative_eq!(max.y, 10.0, epsilon = 1e-12);

        let r = Path::make_rect(20.0, 10.0)
            .offset([1.0, 2.0, 3.0, 4.0])
            .unwrap();
        let (min, max) = r.bounding_box().unwrap();
        assert_relative_eq!(min.x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(max.y, 12.0, epsilon = 1e-12);
        assert_relative_eq!(max.x, 23.0, epsilon = 1e-12);
        assert_relative_eq!(min.y, -4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rounded_rect_offset_keeps_tangency() {
        let r = Path::make_rounded_rect(40.0, 20.0, 5.0).unwrap();
        let grown = r.offset(2.0).unwrap();
        assert_eq!(grown.len(), r.len());
        for radius in radii(&grown) {
            assert_relative_eq!(radius, 7.0, epsilon = 1e-9);
        }
        let shrunk = r.offset(-5.0).unwrap();
        // corner arcs vanish and the lines meet at sharp corners
        assert!(radii(&shrunk).is_empty());
        assert_relative_eq!(shrunk.area(), 30.0 * 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_open_path_fails_offset() {
        let mut p = Path::new();
        p.line_to(Point2::new(0.0, 0.0)).line_to(Point2::new(10.0, 0.0));
        assert!(matches!(p.offset(1.0), Err(PathError::NotClosed)));
    }

    #[test]
    fn test_holes_move_opposite() {
        let mut r = Path::make_rect(20.0, 20.0);
        r.add_hole(Path::make_circle(3.0).translate(Vec2::new(10.0, 10.0)))
            .unwrap();
        let grown = r.offset(1.0).unwrap();
        assert_eq!(grown.holes().len(), 1);
        for radius in radii(&grown.holes()[0]) {
            assert_relative_eq!(radius, 2.0, epsilon = 1e-9);
        }
        let grown = r.offset(4.0).unwrap();
        assert!(grown.holes().is_empty());
    }

    #[test]
    fn test_thicken_open_chain() {
        let mut u = Path::new();
        u.line_to(Point2::new(0.0, 10.0))
            .line_to(Point2::new(0.0, 0.0))
            .line_to(Point2::new(20.0, 0.0))
            .line_to(Point2::new(20.0, 10.0));
        let band = u.thicken_and_close(1.0).unwrap();
        assert!(band.is_closed());
        // 10 + 20 + 10 centreline, one unit wide, minus the corner overlaps
        assert_relative_eq!(band.area().abs(), 10.0 + 20.0 + 10.0 - 2.0, epsilon = 1e-9);
    }
}
