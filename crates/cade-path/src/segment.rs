//! Line and arc segments of a planar contour.

use std::f64::consts::{FRAC_PI_2, TAU};

use cade_math::{cross2, left_normal, Point2, Tolerance, Vec2};

/// A segment of a 2D path.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// A straight segment from start to end.
    Line {
        /// Start point.
        start: Point2,
        /// End point.
        end: Point2,
    },
    /// A circular arc from start to end around a center.
    Arc {
        /// Start point.
        start: Point2,
        /// End point.
        end: Point2,
        /// Center of the supporting circle.
        center: Point2,
        /// If true, the arc runs counter-clockwise from start to end.
        ccw: bool,
    },
}

impl Segment {
    /// A line segment.
    pub fn line(start: Point2, end: Point2) -> Self {
        Segment::Line { start, end }
    }

    /// An arc segment.
    pub fn arc(start: Point2, end: Point2, center: Point2, ccw: bool) -> Self {
        Segment::Arc {
            start,
            end,
            center,
            ccw,
        }
    }

    /// Get the start point of this segment.
    pub fn start(&self) -> Point2 {
        match self {
            Segment::Line { start, .. } => *start,
            Segment::Arc { start, .. } => *start,
        }
    }

    /// Get the end point of this segment.
    pub fn end(&self) -> Point2 {
        match self {
            Segment::Line { end, .. } => *end,
            Segment::Arc { end, .. } => *end,
        }
    }

    pub(crate) fn set_start(&mut self, p: Point2) {
        match self {
            Segment::Line { start, .. } | Segment::Arc { start, .. } => *start = p,
        }
    }

    pub(crate) fn set_end(&mut self, p: Point2) {
        match self {
            Segment::Line { end, .. } | Segment::Arc { end, .. } => *end = p,
        }
    }

    /// True for straight segments.
    pub fn is_line(&self) -> bool {
        matches!(self, Segment::Line { .. })
    }

    /// Radius of an arc, `None` for lines.
    pub fn radius(&self) -> Option<f64> {
        match self {
            Segment::Line { .. } => None,
            Segment::Arc { start, center, .. } => Some((start - center).norm()),
        }
    }

    /// Center of an arc, `None` for lines.
    pub fn center(&self) -> Option<Point2> {
        match self {
            Segment::Line { .. } => None,
            Segment::Arc { center, .. } => Some(*center),
        }
    }

    /// Check if this segment is degenerate (zero length).
    pub fn is_degenerate(&self) -> bool {
        self.length() < Tolerance::DEFAULT.linear
    }

    /// Signed angle swept by an arc: positive counter-clockwise. Zero for lines.
    pub fn sweep(&self) -> f64 {
        match self {
            Segment::Line { .. } => 0.0,
            Segment::Arc {
                start,
                end,
                center,
                ccw,
            } => {
                let d_start = start - center;
                let d_end = end - center;
                let mut angle = d_end.y.atan2(d_end.x) - d_start.y.atan2(d_start.x);
                if *ccw {
                    if angle < 0.0 {
                        angle += TAU;
                    }
                } else if angle > 0.0 {
                    angle -= TAU;
                }
                angle
            }
        }
    }

    /// Get the length of this segment.
    pub fn length(&self) -> f64 {
        match self {
            Segment::Line { start, end } => (end - start).norm(),
            Segment::Arc { start, center, .. } => (start - center).norm() * self.sweep().abs(),
        }
    }

    /// The same geometry travelled the other way.
    pub fn reversed(&self) -> Self {
        match *self {
            Segment::Line { start, end } => Segment::Line {
                start: end,
                end: start,
            },
            Segment::Arc {
                start,
                end,
                center,
                ccw,
            } => Segment::Arc {
                start: end,
                end: start,
                center,
                ccw: !ccw,
            },
        }
    }

    /// Map every defining point through `f`.
    ///
    /// `mirrored` must be set when `f` reverses orientation so arcs keep
    /// bulging to the correct side. `f` must preserve circles.
    pub fn map(&self, f: impl Fn(&Point2) -> Point2, mirrored: bool) -> Self {
        match self {
            Segment::Line { start, end } => Segment::Line {
                start: f(start),
                end: f(end),
            },
            Segment::Arc {
                start,
                end,
                center,
                ccw,
            } => Segment::Arc {
                start: f(start),
                end: f(end),
                center: f(center),
                ccw: *ccw != mirrored,
            },
        }
    }

    /// Point at arc length `s` from the start, clamped to the segment.
    pub fn point_at(&self, s: f64) -> Point2 {
        match self {
            Segment::Line { start, end } => {
                let len = (end - start).norm();
                if len < f64::EPSILON {
                    return *start;
                }
                start + (end - start) * (s.clamp(0.0, len) / len)
            }
            Segment::Arc { start, center, .. } => {
                let r = (start - center).norm();
                if r < f64::EPSILON {
                    return *start;
                }
                let sweep = self.sweep();
                let s = s.clamp(0.0, r * sweep.abs());
                let a0 = (start.y - center.y).atan2(start.x - center.x);
                let a = a0 + sweep.signum() * s / r;
                Point2::new(center.x + r * a.cos(), center.y + r * a.sin())
            }
        }
    }

    /// Point halfway along the segment.
    pub fn midpoint(&self) -> Point2 {
        self.point_at(self.length() / 2.0)
    }

    /// Unit tangent at arc length `s`, in the direction of travel.
    pub fn tangent_at(&self, s: f64) -> Vec2 {
        match self {
            Segment::Line { start, end } => (end - start).normalize(),
            Segment::Arc { center, ccw, .. } => {
                let radial = (self.point_at(s) - center).normalize();
                let t = left_normal(&radial);
                if *ccw {
                    t
                } else {
                    -t
                }
            }
        }
    }

    /// Unit tangent leaving the start point.
    pub fn start_tangent(&self) -> Vec2 {
        self.tangent_at(0.0)
    }

    /// Unit tangent arriving at the end point.
    pub fn end_tangent(&self) -> Vec2 {
        self.tangent_at(self.length())
    }

    /// Arc length from the start to `p`, if `p` lies on the segment.
    pub fn locate(&self, p: &Point2, tol: f64) -> Option<f64> {
        match self {
            Segment::Line { start, end } => {
                let d = end - start;
                let len = d.norm();
                if len < f64::EPSILON {
                    return None;
                }
                let u = d / len;
                let w = p - start;
                let along = w.dot(&u);
                if cross2(&u, &w).abs() > tol || along < -tol || along > len + tol {
                    return None;
                }
                Some(along.clamp(0.0, len))
            }
            Segment::Arc { start, center, .. } => {
                let r = (start - center).norm();
                if ((p - center).norm() - r).abs() > tol {
                    return None;
                }
                let sweep = self.sweep();
                let a0 = (start.y - center.y).atan2(start.x - center.x);
                let a = (p.y - center.y).atan2(p.x - center.x);
                let mut rel = (a - a0) * sweep.signum();
                rel = rel.rem_euclid(TAU);
                let angle_tol = tol / r.max(f64::EPSILON);
                if rel <= sweep.abs() + angle_tol {
                    Some((rel * r).min(r * sweep.abs()))
                } else if rel >= TAU - angle_tol {
                    Some(0.0)
                } else {
                    None
                }
            }
        }
    }

    /// Append a polyline approximation of this segment to `out`.
    ///
    /// The start point is not pushed; the end point is. Arcs are split so
    /// that no chord deviates from the circle by more than `tolerance`.
    pub fn tessellate_into(&self, tolerance: f64, out: &mut Vec<Point2>) {
        match self {
            Segment::Line { end, .. } => out.push(*end),
            Segment::Arc { end, .. } => {
                let n = self.arc_steps(tolerance);
                let len = self.length();
                for i in 1..n {
                    out.push(self.point_at(len * i as f64 / n as f64));
                }
                out.push(*end);
            }
        }
    }

    /// Number of chords used to approximate this segment.
    pub(crate) fn arc_steps(&self, tolerance: f64) -> usize {
        let Some(r) = self.radius() else {
            return 1;
        };
        let step = if tolerance < r {
            2.0 * (1.0 - tolerance / r).acos()
        } else {
            FRAC_PI_2
        };
        ((self.sweep().abs() / step).ceil() as usize).max(1)
    }

    /// Points that bound the segment: endpoints plus arc extremes.
    pub(crate) fn extreme_points(&self) -> Vec<Point2> {
        let mut points = vec![self.start(), self.end()];
        if let Segment::Arc { center, .. } = self {
            let Some(r) = self.radius() else {
                return points;
            };
            for k in 0..4 {
                let angle = k as f64 * FRAC_PI_2;
                let p = Point2::new(center.x + r * angle.cos(), center.y + r * angle.sin());
                if self.locate(&p, 1e-9).is_some() {
                    points.push(p);
                }
            }
        }
        points
    }

    /// Twice the signed area this segment contributes to its contour.
    ///
    /// Summed over a closed contour this yields twice the enclosed area,
    /// positive for counter-clockwise contours.
    pub(crate) fn doubled_area(&self) -> f64 {
        let (s, e) = (self.start(), self.end());
        let chord = s.x * e.y - e.x * s.y;
        match self.radius() {
            None => chord,
            Some(r) => {
                let theta = self.sweep();
                chord + r * r * (theta - theta.sin())
            }
        }
    }
}
