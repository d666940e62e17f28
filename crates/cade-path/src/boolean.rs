//! Region booleans on closed paths.
//!
//! Operands are tessellated (arcs within [`ARC_TOLERANCE`]) and combined
//! with `geo`'s boolean operations. Output vertices are snapped back onto
//! the operands' vertices, lines and circles, and runs of output edges lying
//! on one source circle become arcs again.

use cade_math::{
    cross2, distance_to_line, intersect_circles, intersect_line_circle, intersect_lines,
    left_normal, project_on_line, Point2, Vec2,
};
use geo::{BooleanOps, LineString, MultiPolygon, Polygon};
use tracing::debug;

use crate::{Path, PathError, Result, Segment, ARC_TOLERANCE, EPSILON};

/// Distance within which output vertices snap to source vertices and lines.
const SNAP: f64 = 1e-4;

/// Which boolean to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    /// Points in either region.
    Union,
    /// Points in both regions.
    Intersection,
    /// Points in the first region but not the second.
    Difference,
}

fn ring(path: &Path) -> LineString<f64> {
    LineString::from(
        path.to_polyline(ARC_TOLERANCE)
            .iter()
            .map(|p| (p.x, p.y))
            .collect::<Vec<_>>(),
    )
}

fn to_polygon(path: &Path) -> Result<Polygon<f64>> {
    if !path.is_closed() {
        return Err(PathError::NotClosed);
    }
    Ok(Polygon::new(
        ring(path),
        path.holes.iter().map(ring).collect(),
    ))
}

/// Geometry of the operands, used to restore exact output coordinates.
struct Snapper {
    vertices: Vec<Point2>,
    lines: Vec<(Point2, Point2)>,
    circles: Vec<(Point2, f64)>,
}

impl Snapper {
    fn new(paths: &[&Path]) -> Self {
        let mut snapper = Snapper {
            vertices: Vec::new(),
            lines: Vec::new(),
            circles: Vec::new(),
        };
        for path in paths {
            snapper.collect(path);
        }
        snapper
    }

    fn collect(&mut self, path: &Path) {
        for seg in &path.segments {
            self.vertices.push(seg.start());
            match seg {
                Segment::Line { start, end } => self.lines.push((*start, *end)),
                Segment::Arc { center, .. } => {
                    let Some(r) = seg.radius() else { continue };
                    let known = self
                        .circles
                        .iter()
                        .any(|(c, r2)| (c - center).norm() <= EPSILON && (r - r2).abs() <= EPSILON);
                    if !known {
                        self.circles.push((*center, r));
                    }
                }
            }
        }
        for hole in &path.holes {
            self.collect(hole);
        }
    }

    fn snap(&self, p: Point2) -> Point2 {
        if let Some(v) = self.vertices.iter().find(|v| (*v - p).norm() <= SNAP) {
            return *v;
        }
        let lines: Vec<&(Point2, Point2)> = self
            .lines
            .iter()
            .filter(|(a, b)| {
                let d = b - a;
                let t = project_on_line(&p, a, &d);
                let slack = SNAP / d.norm();
                (-slack..=1.0 + slack).contains(&t) && distance_to_line(&p, a, &d) <= SNAP
            })
            .collect();
        let circles: Vec<&(Point2, f64)> = self
            .circles
            .iter()
            .filter(|(c, r)| ((p - c).norm() - r).abs() <= 1.5 * ARC_TOLERANCE)
            .collect();
        let reach = 2.0 * ARC_TOLERANCE;
        let nearest = |candidates: Vec<Point2>| {
            candidates
                .into_iter()
                .filter(|q| (q - p).norm() <= reach)
                .min_by(|a, b| (a - p).norm().total_cmp(&(b - p).norm()))
        };

        if lines.len() >= 2 {
            let (a, b) = (lines[0], lines[1]);
            if let Some(hit) = intersect_lines(&a.0, &(a.1 - a.0), &b.0, &(b.1 - b.0)) {
                if (hit.point - p).norm() <= reach {
                    return hit.point;
                }
            }
        }
        if let Some((a, b)) = lines.first() {
            let d = b - a;
            if let Some((c, r)) = circles.first() {
                let hits = intersect_line_circle(a, &d, c, *r)
                    .into_iter()
                    .map(|t| a + d * t)
                    .collect();
                if let Some(q) = nearest(hits) {
                    return q;
                }
            }
            return a + d * project_on_line(&p, a, &d);
        }
        if circles.len() >= 2 {
            let (c1, r1) = circles[0];
            let (c2, r2) = circles[1];
            if let Some(q) = nearest(intersect_circles(c1, *r1, c2, *r2)) {
                return q;
            }
        }
        if let Some((c, r)) = circles.first() {
            let radial = p - c;
            if radial.norm() > EPSILON {
                return c + radial * (r / radial.norm());
            }
        }
        p
    }

    /// Circle carrying the edge `a`-`b`, if both ends sit on one source
    /// circle and the edge is no longer than a tessellation chord.
    fn circle_of(&self, a: &Point2, b: &Point2) -> Option<usize> {
        let chord = (b - a).norm();
        self.circles.iter().position(|(c, r)| {
            let on = |p: &Point2| ((p - c).norm() - r).abs() <= 10.0 * EPSILON;
            let step = if ARC_TOLERANCE < *r {
                2.0 * (1.0 - ARC_TOLERANCE / r).acos()
            } else {
                std::f64::consts::FRAC_PI_2
            };
            let max_chord = 2.0 * r * (step / 2.0).sin() * 1.05 + EPSILON;
            on(a) && on(b) && chord <= max_chord
        })
    }

    /// Rebuild a path from one output ring.
    fn ring_path(&self, ring: &LineString<f64>) -> Option<Path> {
        let mut pts: Vec<Point2> = Vec::new();
        for c in ring.coords() {
            let p = self.snap(Point2::new(c.x, c.y));
            if pts.last().map_or(true, |q| (q - p).norm() > EPSILON) {
                pts.push(p);
            }
        }
        while pts.len() > 1 && (pts[0] - pts[pts.len() - 1]).norm() <= EPSILON {
            pts.pop();
        }
        let n = pts.len();
        if n < 3 {
            return None;
        }

        let class: Vec<Option<usize>> = (0..n)
            .map(|i| self.circle_of(&pts[i], &pts[(i + 1) % n]))
            .collect();
        let first = (0..n).find(|&i| class[i] != class[(i + n - 1) % n]);
        let mut segments = Vec::new();
        match first {
            None => {
                // One class all the way round: a full circle or a polygon.
                let Some(ci) = class[0] else {
                    return polygon(&pts);
                };
                let (c, _) = self.circles[ci];
                let ccw = cross2(&(pts[0] - c), &(pts[1] - c)) > 0.0;
                let half = n / 2;
                segments.push(Segment::arc(pts[0], pts[half], c, ccw));
                segments.push(Segment::arc(pts[half], pts[0], c, ccw));
            }
            Some(start) => {
                let mut k = 0;
                while k < n {
                    let i = (start + k) % n;
                    match class[i] {
                        None => {
                            segments.push(Segment::line(pts[i], pts[(i + 1) % n]));
                            k += 1;
                        }
                        Some(ci) => {
                            let mut run = 1;
                            while k + run < n && class[(start + k + run) % n] == Some(ci) {
                                run += 1;
                            }
                            let (c, _) = self.circles[ci];
                            let end = (i + run) % n;
                            let ccw = cross2(&(pts[i] - c), &(pts[(i + 1) % n] - c)) > 0.0;
                            segments.push(Segment::arc(pts[i], pts[end], c, ccw));
                            k += run;
                        }
                    }
                }
            }
        }
        Path::from_segments(merge_collinear(segments)).ok()
    }

    fn rebuild(&self, polygon: &Polygon<f64>) -> Option<Path> {
        let mut outer = self.ring_path(polygon.exterior())?;
        if !outer.is_ccw() {
            outer = outer.invert();
        }
        for interior in polygon.interiors() {
            if let Some(mut hole) = self.ring_path(interior) {
                if hole.is_ccw() {
                    hole = hole.invert();
                }
                outer.holes.push(hole);
            }
        }
        Some(outer)
    }
}

fn polygon(points: &[Point2]) -> Option<Path> {
    let segments = (0..points.len())
        .map(|i| Segment::line(points[i], points[(i + 1) % points.len()]))
        .collect();
    Path::from_segments(merge_collinear(segments)).ok()
}

/// Merge consecutive collinear lines of a closed chain.
fn merge_collinear(segments: Vec<Segment>) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if let (Some(Segment::Line { start, .. }), Segment::Line { end, .. }) = (out.last(), &seg) {
            let joint = seg.start();
            let d = end - start;
            if d.norm() > EPSILON
                && distance_to_line(&joint, start, &d) <= EPSILON
                && (joint - start).dot(&d) > 0.0
            {
                let merged = Segment::line(*start, *end);
                out.pop();
                out.push(merged);
                continue;
            }
        }
        out.push(seg);
    }
    if out.len() > 2 {
        if let (Some(Segment::Line { start, .. }), Some(Segment::Line { end, .. })) =
            (out.last(), out.first())
        {
            let joint = out[0].start();
            let d = end - start;
            if distance_to_line(&joint, start, &d) <= EPSILON && (joint - start).dot(&d) > 0.0 {
                let merged = Segment::line(*start, *end);
                out.pop();
                out[0] = merged;
            }
        }
    }
    out
}

impl Path {
    /// All regions of `self` combined with `other`.
    pub fn boolean_regions(&self, other: &Path, op: BooleanOp) -> Result<Vec<Path>> {
        let a = MultiPolygon(vec![to_polygon(self)?]);
        let b = MultiPolygon(vec![to_polygon(other)?]);
        let result = match op {
            BooleanOp::Union => a.union(&b),
            BooleanOp::Intersection => a.intersection(&b),
            BooleanOp::Difference => a.difference(&b),
        };
        let snapper = Snapper::new(&[self, other]);
        let regions: Vec<Path> = result
            .0
            .iter()
            .filter_map(|poly| snapper.rebuild(poly))
            .filter(|p| p.region_area() > EPSILON)
            .collect();
        debug!(?op, regions = regions.len(), "path boolean");
        Ok(regions)
    }

    fn single_region(&self, other: &Path, op: BooleanOp) -> Result<Path> {
        let mut regions = self.boolean_regions(other, op)?;
        match regions.len() {
            0 => Err(PathError::EmptyBoolean),
            1 => Ok(regions.remove(0)),
            n => Err(PathError::DisjointBoolean(n)),
        }
    }

    /// Region covered by either path. Must be a single region.
    pub fn boolean_union(&self, other: &Path) -> Result<Path> {
        self.single_region(other, BooleanOp::Union)
    }

    /// Region of `self` outside `other`. Must be a single region.
    pub fn boolean_difference(&self, other: &Path) -> Result<Path> {
        self.single_region(other, BooleanOp::Difference)
    }

    /// Region covered by both paths. Must be a single region.
    pub fn boolean_intersection(&self, other: &Path) -> Result<Path> {
        self.single_region(other, BooleanOp::Intersection)
    }

    /// Part of the region on one side of the line through `point` along
    /// `direction`. When the cut leaves several pieces the largest is kept.
    pub fn cut_on_line(&self, point: Point2, direction: Vec2, keep_right: bool) -> Result<Path> {
        let (min, max) = self.bounding_box().ok_or(PathError::Empty)?;
        let center = Point2::from((min.coords + max.coords) / 2.0);
        let reach = 2.0 * ((max - min).norm() + (point - center).norm()) + 1.0;
        let d = direction.normalize();
        let side = if keep_right {
            -left_normal(&d)
        } else {
            left_normal(&d)
        };
        let a = point - d * reach;
        let b = point + d * reach;
        let half_plane = Path::from_polyline(&[a, b, b + side * reach, a + side * reach])?;
        self.boolean_regions(&half_plane, BooleanOp::Intersection)?
            .into_iter()
            .max_by(|p, q| p.region_area().total_cmp(&q.region_area()))
            .ok_or(PathError::EmptyBoolean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn square_at(x: f64, y: f64, side: f64) -> Path {
        Path::make_square(side).translate(Vec2::new(x, y))
    }

    #[test]
    fn test_union_idempotent() {
        let a = Path::make_rect(30.0, 10.0);
        let u = a.boolean_union(&a).unwrap();
        assert_relative_eq!(u.region_area(), 300.0, epsilon = 1e-6);
        assert_eq!(u.len(), 4);
    }

    #[test]
    fn test_intersection_idempotent() {
        let a = Path::make_circle(4.0);
        let i = a.boolean_intersection(&a).unwrap();
        assert_relative_eq!(i.region_area(), 16.0 * PI, epsilon = 1e-6);
        assert!(i.segments().iter().all(|s| !s.is_line()));
    }

    #[test]
    fn test_overlapping_squares() {
        let a = square_at(0.0, 0.0, 10.0);
        let b = square_at(5.0, 5.0, 10.0);
        let u = a.boolean_union(&b).unwrap();
        assert_relative_eq!(u.region_area(), 175.0, epsilon = 1e-6);
        assert_eq!(u.len(), 8);
        let d = a.boolean_difference(&b).unwrap();
        assert_relative_eq!(d.region_area(), 75.0, epsilon = 1e-6);
        let i = a.boolean_intersection(&b).unwrap();
        assert_relative_eq!(i.region_area(), 25.0, epsilon = 1e-6);
        assert!(i.is_ccw());
    }

    #[test]
    fn test_contained_difference_makes_hole() {
        let outer = square_at(0.0, 0.0, 20.0);
        let inner = Path::make_circle(3.0).translate(Vec2::new(10.0, 10.0));
        let d = outer.boolean_difference(&inner).unwrap();
        assert_eq!(d.holes().len(), 1);
        assert!(!d.holes()[0].is_ccw());
        assert!(d.holes()[0].segments().iter().all(|s| !s.is_line()));
        assert!(!d.contains(&Point2::new(10.0, 10.0)));
        assert!(d.contains(&Point2::new(1.0, 1.0)));
    }

    #[test]
    fn test_disjoint_and_empty_policies() {
        let a = square_at(0.0, 0.0, 10.0);
        let b = square_at(50.0, 0.0, 10.0);
        assert!(matches!(
            a.boolean_union(&b),
            Err(PathError::DisjointBoolean(2))
        ));
        assert!(matches!(
            a.boolean_intersection(&b),
            Err(PathError::EmptyBoolean)
        ));
        assert_eq!(
            a.boolean_regions(&b, BooleanOp::Union).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_rect_minus_circle_keeps_arc() {
        let rect = Path::make_rect(20.0, 10.0);
        let bite = Path::make_circle(5.0).translate(Vec2::new(20.0, 5.0));
        let d = rect.boolean_difference(&bite).unwrap();
        assert_relative_eq!(d.region_area(), 200.0 - 12.5 * PI, epsilon = 0.05);
        let arcs: Vec<&Segment> = d.segments().iter().filter(|s| !s.is_line()).collect();
        assert_eq!(arcs.len(), 1);
        assert_relative_eq!(arcs[0].radius().unwrap(), 5.0, epsilon = 1e-9);
        assert_eq!(
            d.find_segments_on_line(Point2::new(0.0, 0.0), Vec2::new(1.0, 0.0))
                .len(),
            1
        );
    }

    #[test]
    fn test_cut_on_line() {
        let rect = Path::make_rect(20.0, 10.0);
        let left = rect
            .cut_on_line(Point2::new(5.0, 0.0), Vec2::new(0.0, 1.0), false)
            .unwrap();
        assert_relative_eq!(left.region_area(), 50.0, epsilon = 1e-6);
        let right = rect
            .cut_on_line(Point2::new(5.0, 0.0), Vec2::new(0.0, 1.0), true)
            .unwrap();
        assert_relative_eq!(right.region_area(), 150.0, epsilon = 1e-6);
    }

    #[test]
    fn test_open_operand_rejected() {
        let mut open = Path::new();
        open.line_to(Point2::new(0.0, 0.0)).line_to(Point2::new(1.0, 0.0));
        assert!(matches!(
            open.boolean_union(&Path::make_square(1.0)),
            Err(PathError::NotClosed)
        ));
    }
}
