//! The [`Path`] type: construction, transforms and queries.

use cade_math::{
    arc_center, distance_to_line, intersect_line_circle, intersect_lines, rotate_vec2, Point2,
    Transform, Vec2,
};

use crate::{PathError, Result, Segment, ARC_TOLERANCE, EPSILON};

/// Which axes [`Path::recenter`] moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Recenter {
    /// Center the bounding box on the origin.
    #[default]
    Both,
    /// Only center horizontally.
    OnlyX,
    /// Only center vertically.
    OnlyY,
}

/// A crossing between a line and a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathHit {
    /// Where the line crosses the path.
    pub point: Point2,
    /// Index of the crossed segment.
    pub segment: usize,
    /// Parameter along the query line: 0 at its first point, 1 at its second.
    pub t: f64,
}

/// A chain of line and arc segments.
///
/// Segment `i` ends where segment `i + 1` starts. The path is closed when
/// the last segment ends at the first start point. A closed path can own
/// holes, in which case it describes a region with cutouts (even-odd fill).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    pub(crate) segments: Vec<Segment>,
    pub(crate) cursor: Option<Point2>,
    pub(crate) holes: Vec<Path>,
}

impl Path {
    /// An empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a path from already chained segments.
    pub fn from_segments(segments: Vec<Segment>) -> Result<Self> {
        for i in 1..segments.len() {
            if (segments[i].start() - segments[i - 1].end()).norm() > EPSILON {
                return Err(PathError::Disconnected(i));
            }
        }
        Ok(Self {
            segments,
            cursor: None,
            holes: Vec::new(),
        })
    }

    /// Closed polygon through `points`.
    pub fn from_polyline(points: &[Point2]) -> Result<Self> {
        if points.len() < 2 {
            return Err(PathError::Empty);
        }
        let mut path = Path::new();
        for p in points {
            path.line_to(*p);
        }
        path.close();
        Ok(path)
    }

    /// Counter-clockwise rectangle with its lower-left corner at the origin.
    pub fn make_rect(width: f64, height: f64) -> Self {
        let mut path = Path::new();
        path.line_to(Point2::new(0.0, 0.0))
            .line_to(Point2::new(width, 0.0))
            .line_to(Point2::new(width, height))
            .line_to(Point2::new(0.0, height))
            .close();
        path
    }

    /// Square with its lower-left corner at the origin.
    pub fn make_square(side: f64) -> Self {
        Self::make_rect(side, side)
    }

    /// Rectangle with every corner rounded to `radius`.
    pub fn make_rounded_rect(width: f64, height: f64, radius: f64) -> Result<Self> {
        let mut path = Self::make_rect(width, height);
        path.round_fillet_all(radius)?;
        Ok(path)
    }

    /// Circle of `radius` around the origin, made of two semicircles.
    pub fn make_circle(radius: f64) -> Self {
        let right = Point2::new(radius, 0.0);
        let left = Point2::new(-radius, 0.0);
        let center = Point2::origin();
        Self {
            segments: vec![
                Segment::arc(right, left, center, true),
                Segment::arc(left, right, center, true),
            ],
            cursor: None,
            holes: Vec::new(),
        }
    }

    /// The segments of the outer chain.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Holes of a region, each a closed path.
    pub fn holes(&self) -> &[Path] {
        &self.holes
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True if the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// First point of the chain.
    pub fn start_point(&self) -> Option<Point2> {
        self.segments.first().map(Segment::start).or(self.cursor)
    }

    /// Where the next segment will start.
    pub fn current_point(&self) -> Option<Point2> {
        self.segments.last().map(Segment::end).or(self.cursor)
    }

    /// True if the last segment ends at the first start point.
    pub fn is_closed(&self) -> bool {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => (last.end() - first.start()).norm() <= EPSILON,
            _ => false,
        }
    }

    /// Add a cutout to this region.
    pub fn add_hole(&mut self, hole: Path) -> Result<()> {
        if !self.is_closed() || !hole.is_closed() {
            return Err(PathError::NotClosed);
        }
        self.holes.push(hole);
        Ok(())
    }

    /// Start the chain at `p`.
    pub fn move_to(&mut self, p: Point2) -> Result<&mut Self> {
        if !self.segments.is_empty() {
            return Err(PathError::MoveAfterDraw);
        }
        self.cursor = Some(p);
        Ok(self)
    }

    /// Straight segment to `p`. On an empty path this only sets the start.
    pub fn line_to(&mut self, p: Point2) -> &mut Self {
        match self.current_point() {
            None => self.cursor = Some(p),
            Some(current) => {
                if (p - current).norm() > EPSILON {
                    self.segments.push(Segment::line(current, p));
                }
            }
        }
        self
    }

    /// Minor circular arc of `radius` to `p`, counter-clockwise when `ccw`.
    pub fn arc(&mut self, p: Point2, radius: f64, ccw: bool) -> Result<&mut Self> {
        let current = self.current_point().ok_or(PathError::NoCurrentPoint)?;
        let chord = (p - current).norm();
        if chord <= EPSILON {
            return Ok(self);
        }
        let center =
            arc_center(&current, &p, radius, ccw).ok_or(PathError::RadiusTooSmall { chord, radius })?;
        self.segments.push(Segment::arc(current, p, center, ccw));
        Ok(self)
    }

    /// Append a segment that starts at the current point.
    pub fn push_segment(&mut self, segment: Segment) -> Result<&mut Self> {
        if let Some(current) = self.current_point() {
            if (segment.start() - current).norm() > EPSILON {
                return Err(PathError::Disconnected(self.segments.len()));
            }
        }
        self.segments.push(segment);
        Ok(self)
    }

    /// Line back to the start point unless already there.
    pub fn close(&mut self) -> &mut Self {
        if let (Some(first), Some(last)) = (self.segments.first(), self.segments.last()) {
            let (start, end) = (first.start(), last.end());
            if (end - start).norm() > EPSILON {
                self.segments.push(Segment::line(end, start));
            }
        }
        self
    }

    /// Complete a half profile with its reflection across the Y axis.
    pub fn mirror(&self) -> Path {
        self.mirror_about(Point2::origin(), Vec2::new(0.0, 1.0))
    }

    /// Append the reflection of the chain across the line through `point`
    /// along `direction`, travelled backwards.
    ///
    /// A half profile drawn from the axis back to the axis comes out closed.
    /// When the chain ends off the axis a bridging line is drawn to the
    /// reflected end.
    pub fn mirror_about(&self, point: Point2, direction: Vec2) -> Path {
        let reflect = reflector(point, direction);
        let mut out = self.clone();
        let Some(end) = self.current_point() else {
            return out;
        };
        let reflected_end = reflect(&end);
        if (reflected_end - end).norm() > EPSILON && !self.segments.is_empty() {
            out.segments.push(Segment::line(end, reflected_end));
        }
        out.segments.extend(
            self.segments
                .iter()
                .rev()
                .map(|s| s.reversed().map(&reflect, true)),
        );
        out.holes
            .extend(self.holes.iter().map(|h| h.map_points(&reflect, true)));
        out
    }

    /// Reflection of the whole path across a line, with no other change.
    pub fn reflected(&self, point: Point2, direction: Vec2) -> Path {
        self.map_points(&reflector(point, direction), true)
    }

    pub(crate) fn map_points(&self, f: &dyn Fn(&Point2) -> Point2, mirrored: bool) -> Path {
        Path {
            segments: self.segments.iter().map(|s| s.map(f, mirrored)).collect(),
            cursor: self.cursor.map(|c| f(&c)),
            holes: self.holes.iter().map(|h| h.map_points(f, mirrored)).collect(),
        }
    }

    /// Translated copy.
    pub fn translate(&self, offset: Vec2) -> Path {
        self.map_points(&|p| p + offset, false)
    }

    /// Copy rotated by `angle` radians around the origin.
    pub fn rotate(&self, angle: f64) -> Path {
        self.rotate_around(Point2::origin(), angle)
    }

    /// Copy rotated by `angle` radians around `center`.
    pub fn rotate_around(&self, center: Point2, angle: f64) -> Path {
        self.map_points(&|p| center + rotate_vec2(&(p - center), angle), false)
    }

    /// Copy scaled about the origin. Arcs only survive scales with equal
    /// magnitudes; a negative factor mirrors them.
    pub fn scale(&self, sx: f64, sy: f64) -> Result<Path> {
        if (sx.abs() - sy.abs()).abs() > EPSILON && self.has_arcs() {
            return Err(PathError::NonUniformArcScale(sx, sy));
        }
        Ok(self.map_points(&|p| Point2::new(p.x * sx, p.y * sy), sx * sy < 0.0))
    }

    /// Copy mapped through the XY part of a placement.
    pub fn transformed(&self, transform: &Transform) -> Path {
        let m = &transform.matrix;
        let det = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];
        self.map_points(&|p| transform.apply_point2(p), det < 0.0)
    }

    /// Copy moved so its bounding box is centered on the origin.
    pub fn recenter(&self, mode: Recenter) -> Path {
        let Some((min, max)) = self.bounding_box() else {
            return self.clone();
        };
        let c = Point2::from((min.coords + max.coords) / 2.0);
        let shift = match mode {
            Recenter::Both => Vec2::new(-c.x, -c.y),
            Recenter::OnlyX => Vec2::new(-c.x, 0.0),
            Recenter::OnlyY => Vec2::new(0.0, -c.y),
        };
        self.translate(shift)
    }

    /// The same contour travelled in the opposite direction.
    pub fn invert(&self) -> Path {
        Path {
            segments: self.segments.iter().rev().map(Segment::reversed).collect(),
            cursor: if self.segments.is_empty() {
                self.cursor
            } else {
                None
            },
            holes: self.holes.iter().map(Path::invert).collect(),
        }
    }

    pub(crate) fn has_arcs(&self) -> bool {
        self.segments.iter().any(|s| !s.is_line()) || self.holes.iter().any(Path::has_arcs)
    }

    /// Axis-aligned bounds as `(min, max)`, `None` when empty.
    pub fn bounding_box(&self) -> Option<(Point2, Point2)> {
        let mut points = self
            .segments
            .iter()
            .flat_map(Segment::extreme_points)
            .peekable();
        let first = *points.peek()?;
        let (mut min, mut max) = (first, first);
        for p in points {
            min = Point2::new(min.x.min(p.x), min.y.min(p.y));
            max = Point2::new(max.x.max(p.x), max.y.max(p.y));
        }
        Some((min, max))
    }

    /// Signed area of the outer chain, positive when counter-clockwise.
    ///
    /// An open chain is measured as if closed by a straight line.
    pub fn area(&self) -> f64 {
        let mut twice: f64 = self.segments.iter().map(Segment::doubled_area).sum();
        if let (Some(first), Some(last)) = (self.segments.first(), self.segments.last()) {
            let (s, e) = (last.end(), first.start());
            twice += s.x * e.y - e.x * s.y;
        }
        twice / 2.0
    }

    /// Unsigned area of the region: outer chain minus holes.
    pub fn region_area(&self) -> f64 {
        self.area().abs() - self.holes.iter().map(|h| h.area().abs()).sum::<f64>()
    }

    /// True if the outer chain winds counter-clockwise.
    pub fn is_ccw(&self) -> bool {
        self.area() > 0.0
    }

    /// Vertices approximating the outer chain within `tolerance`.
    ///
    /// A closed chain does not repeat its first point.
    pub fn to_polyline(&self, tolerance: f64) -> Vec<Point2> {
        let Some(start) = self.start_point() else {
            return Vec::new();
        };
        let mut points = vec![start];
        for seg in &self.segments {
            seg.tessellate_into(tolerance, &mut points);
        }
        if self.is_closed() && points.len() > 1 {
            points.pop();
        }
        points
    }

    /// Even-odd containment test against the region.
    pub fn contains(&self, p: &Point2) -> bool {
        point_in_ring(p, &self.to_polyline(ARC_TOLERANCE))
            && !self
                .holes
                .iter()
                .any(|h| point_in_ring(p, &h.to_polyline(ARC_TOLERANCE)))
    }

    /// Indices of line segments lying on the infinite line through `point`
    /// along `direction`.
    pub fn find_segments_on_line(&self, point: Point2, direction: Vec2) -> Vec<usize> {
        if direction.norm() < EPSILON {
            return Vec::new();
        }
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                s.is_line()
                    && !s.is_degenerate()
                    && distance_to_line(&s.start(), &point, &direction) <= EPSILON
                    && distance_to_line(&s.end(), &point, &direction) <= EPSILON
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub(crate) fn resolve_index(&self, index: isize) -> Result<usize> {
        let len = self.segments.len();
        let resolved = if index < 0 {
            len as isize + index
        } else {
            index
        };
        if resolved < 0 || resolved as usize >= len {
            return Err(PathError::SegmentIndex { index, len });
        }
        Ok(resolved as usize)
    }

    /// Segment at `index`; negative indices count from the end.
    pub fn segment_at(&self, index: isize) -> Result<&Segment> {
        let i = self.resolve_index(index)?;
        Ok(&self.segments[i])
    }

    /// Crossings of the line from `p1` to `p2` with the outer chain, ordered
    /// along the line. Unless `bounded`, the line extends past both points.
    pub fn intersect_line(&self, p1: Point2, p2: Point2, bounded: bool) -> Vec<PathHit> {
        let d = p2 - p1;
        let span = d.norm();
        if span < EPSILON {
            return Vec::new();
        }
        let mut hits = Vec::new();
        for (i, seg) in self.segments.iter().enumerate() {
            match seg {
                Segment::Line { start, end } => {
                    let seg_d = end - start;
                    let seg_len = seg_d.norm();
                    if seg_len < EPSILON {
                        continue;
                    }
                    if let Some(hit) = intersect_lines(&p1, &d, start, &seg_d) {
                        let tol = EPSILON / seg_len;
                        if hit.u >= -tol && hit.u <= 1.0 + tol {
                            hits.push(PathHit {
                                point: hit.point,
                                segment: i,
                                t: hit.t,
                            });
                        }
                    }
                }
                Segment::Arc { center, .. } => {
                    let Some(r) = seg.radius() else { continue };
                    for t in intersect_line_circle(&p1, &d, center, r) {
                        let point = p1 + d * t;
                        if seg.locate(&point, EPSILON * 10.0).is_some() {
                            hits.push(PathHit {
                                point,
                                segment: i,
                                t,
                            });
                        }
                    }
                }
            }
        }
        if bounded {
            let tol = EPSILON / span;
            hits.retain(|h| h.t >= -tol && h.t <= 1.0 + tol);
        }
        hits.sort_by(|a, b| a.t.total_cmp(&b.t));
        hits.dedup_by(|b, a| (a.point - b.point).norm() <= EPSILON);
        hits
    }
}

fn reflector(point: Point2, direction: Vec2) -> impl Fn(&Point2) -> Point2 {
    let d = direction.normalize();
    move |p: &Point2| {
        let v = p - point;
        point + d * (2.0 * v.dot(&d)) - v
    }
}

/// Even-odd ray casting against a polygon ring.
pub(crate) fn point_in_ring(point: &Point2, ring: &[Point2]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = &ring[i];
        let pj = &ring[j];
        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}
