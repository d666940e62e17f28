//! Corner rounding and cutter relief ("dog-bone") corners.

use cade_math::{cross2, left_normal, Point2, Vec2};

use crate::{Path, PathError, Result, Segment, EPSILON};

/// Tangent arc replacing a sharp corner, trimming `trim` from both legs.
struct CornerRound {
    trim: f64,
    arc: Segment,
}

/// Round the corner where a leg along `d_in` meets a leg along `d_out`.
/// `None` for collinear legs.
fn round_corner(d_in: &Vec2, d_out: &Vec2, corner: &Point2, radius: f64) -> Option<CornerRound> {
    let cross = cross2(d_in, d_out);
    let turn = cross.abs().atan2(d_in.dot(d_out));
    if turn < 1e-9 {
        return None;
    }
    let trim = radius * (turn / 2.0).tan();
    let start = corner - d_in * trim;
    let end = corner + d_out * trim;
    let side = if cross > 0.0 {
        left_normal(d_in)
    } else {
        -left_normal(d_in)
    };
    Some(CornerRound {
        trim,
        arc: Segment::arc(start, end, start + side * radius, cross > 0.0),
    })
}

/// Arc through a corner so a round cutter reaches the corner point.
struct Relief {
    back: f64,
    forward: f64,
    arc: Segment,
}

/// The circle of `radius` touching `corner` inside the angle between the
/// legs; the legs are cut back where they cross it.
fn corner_relief(d_in: &Vec2, d_out: &Vec2, corner: &Point2, radius: f64) -> Option<Relief> {
    let cross = cross2(d_in, d_out);
    if cross.abs() < 1e-9 {
        return None;
    }
    let u = (d_out - d_in).normalize();
    let center = corner + u * radius;
    let back = -2.0 * radius * d_in.dot(&u);
    let forward = 2.0 * radius * d_out.dot(&u);
    Some(Relief {
        back,
        forward,
        arc: Segment::arc(corner - d_in * back, corner + d_out * forward, center, cross > 0.0),
    })
}

impl Path {
    /// Round the corner between the last two segments, which must be lines.
    ///
    /// Collinear segments are left as they are.
    pub fn fillet(&mut self, radius: f64) -> Result<&mut Self> {
        let n = self.segments.len();
        if n == 0 && self.cursor.is_none() {
            return Err(PathError::NoCurrentPoint);
        }
        if n < 2 {
            return Err(PathError::NoCorner);
        }
        for i in [n - 2, n - 1] {
            if !self.segments[i].is_line() {
                return Err(PathError::NotALine(i));
            }
        }
        let (a, b) = (&self.segments[n - 2], &self.segments[n - 1]);
        let corner = a.end();
        let Some(round) = round_corner(&a.end_tangent(), &b.start_tangent(), &corner, radius)
        else {
            return Ok(self);
        };
        if round.trim > a.length() + EPSILON || round.trim > b.length() + EPSILON {
            return Err(PathError::FilletTooLarge { radius, corner });
        }

        let tail = self.segments.split_off(n - 2);
        let (a, b) = (&tail[0], &tail[1]);
        let before = Segment::line(a.start(), round.arc.start());
        let after = Segment::line(round.arc.end(), b.end());
        for seg in [before, round.arc, after] {
            if !seg.is_degenerate() {
                self.segments.push(seg);
            }
        }
        Ok(self)
    }

    /// Draw a line to `p`, rounding the corner at the current point.
    pub fn arc_to(&mut self, p: Point2, radius: f64) -> Result<&mut Self> {
        if self.current_point().is_none() {
            return Err(PathError::NoCurrentPoint);
        }
        if self.segments.is_empty() {
            return Err(PathError::NoCorner);
        }
        self.line_to(p);
        self.fillet(radius)
    }

    /// Round every line/line corner of a closed path.
    ///
    /// Corners touching an arc and collinear joints are kept. Fails before
    /// changing anything if any corner cannot take the radius.
    pub fn round_fillet_all(&mut self, radius: f64) -> Result<&mut Self> {
        if !self.is_closed() {
            return Err(PathError::NotClosed);
        }
        self.segments.retain(|s| !s.is_degenerate());
        let n = self.segments.len();
        let mut rounds: Vec<Option<Segment>> = vec![None; n];
        let mut trim_start = vec![0.0; n];
        let mut trim_end = vec![0.0; n];
        for i in 0..n {
            let j = (i + 1) % n;
            let (a, b) = (&self.segments[i], &self.segments[j]);
            if !a.is_line() || !b.is_line() {
                continue;
            }
            if let Some(round) = round_corner(&a.end_tangent(), &b.start_tangent(), &a.end(), radius)
            {
                trim_end[i] = round.trim;
                trim_start[j] = round.trim;
                rounds[i] = Some(round.arc);
            }
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if trim_start[i] + trim_end[i] > seg.length() + EPSILON {
                let corner = if trim_end[i] > 0.0 {
                    seg.end()
                } else {
                    seg.start()
                };
                return Err(PathError::FilletTooLarge { radius, corner });
            }
        }

        let mut out = Vec::with_capacity(2 * n);
        for (i, seg) in self.segments.iter().enumerate() {
            if seg.is_line() {
                let u = seg.start_tangent();
                let line = Segment::line(seg.start() + u * trim_start[i], seg.end() - u * trim_end[i]);
                if !line.is_degenerate() {
                    out.push(line);
                }
            } else {
                out.push(seg.clone());
            }
            if let Some(arc) = rounds[i].take() {
                out.push(arc);
            }
        }
        self.segments = out;
        Ok(self)
    }

    /// Draw a line to `p` and relieve the corner at the current point so a
    /// cutter of `spindle_radius` reaches the corner.
    pub fn spindle_cleared_line_to(&mut self, p: Point2, spindle_radius: f64) -> Result<&mut Self> {
        let corner = self.current_point().ok_or(PathError::NoCurrentPoint)?;
        let n = self.segments.len();
        let prev = self.segments.last().ok_or(PathError::NoCorner)?;
        if !prev.is_line() {
            return Err(PathError::NotALine(n - 1));
        }
        let out = p - corner;
        if out.norm() <= EPSILON {
            return Ok(self);
        }
        let Some(relief) =
            corner_relief(&prev.end_tangent(), &out.normalize(), &corner, spindle_radius)
        else {
            return Ok(self.line_to(p));
        };
        if relief.back > prev.length() + EPSILON || relief.forward > out.norm() + EPSILON {
            return Err(PathError::FilletTooLarge {
                radius: spindle_radius,
                corner,
            });
        }
        let arc_start = relief.arc.start();
        self.segments[n - 1].set_end(arc_start);
        if self.segments[n - 1].is_degenerate() {
            self.segments.pop();
        }
        self.segments.push(relief.arc);
        self.line_to(p);
        Ok(self)
    }

    /// Closed polygon through `points` with every corner relieved for a
    /// cutter of `spindle_radius`, as needed for a mortise.
    pub fn dogbone_polygon(points: &[Point2], spindle_radius: f64) -> Result<Path> {
        let n = points.len();
        if n < 3 {
            return Err(PathError::Empty);
        }
        if spindle_radius <= 0.0 {
            return Path::from_polyline(points);
        }
        let reliefs: Vec<Option<Relief>> = (0..n)
            .map(|i| {
                let prev = points[(i + n - 1) % n];
                let next = points[(i + 1) % n];
                corner_relief(
                    &(points[i] - prev).normalize(),
                    &(next - points[i]).normalize(),
                    &points[i],
                    spindle_radius,
                )
            })
            .collect();
        for i in 0..n {
            let j = (i + 1) % n;
            let edge = (points[j] - points[i]).norm();
            let used = reliefs[i].as_ref().map_or(0.0, |r| r.forward)
                + reliefs[j].as_ref().map_or(0.0, |r| r.back);
            if used > edge + EPSILON {
                return Err(PathError::FilletTooLarge {
                    radius: spindle_radius,
                    corner: points[i],
                });
            }
        }

        let mut path = Path::new();
        path.line_to(reliefs[0].as_ref().map_or(points[0], |r| r.arc.end()));
        for k in 1..=n {
            let i = k % n;
            match &reliefs[i] {
                Some(relief) => {
                    path.line_to(relief.arc.start());
                    path.push_segment(relief.arc.clone())?;
                }
                None => {
                    path.line_to(points[i]);
                }
            }
        }
        path.close();
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn corner_path() -> Path {
        let mut p = Path::new();
        p.line_to(Point2::new(0.0, 0.0))
            .line_to(Point2::new(10.0, 0.0))
            .line_to(Point2::new(10.0, 10.0));
        p
    }

    #[test]
    fn test_fillet_right_angle() {
        let mut p = corner_path();
        p.fillet(2.0).unwrap();
        assert_eq!(p.len(), 3);
        let arc = &p.segments()[1];
        assert!((arc.center().unwrap() - Point2::new(8.0, 2.0)).norm() < 1e-12);
        assert!((arc.start() - Point2::new(8.0, 0.0)).norm() < 1e-12);
        assert!((arc.end() - Point2::new(10.0, 2.0)).norm() < 1e-12);
        assert!((arc.sweep() - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_fillet_collinear_is_noop() {
        let mut p = Path::new();
        p.line_to(Point2::new(0.0, 0.0))
            .line_to(Point2::new(5.0, 0.0))
            .line_to(Point2::new(10.0, 0.0));
        let before = p.clone();
        p.fillet(3.0).unwrap();
        assert_eq!(p, before);
    }

    #[test]
    fn test_fillet_too_large() {
        let mut p = corner_path();
        assert!(matches!(
            p.fillet(12.0),
            Err(PathError::FilletTooLarge { .. })
        ));
    }

    #[test]
    fn test_arc_to_matches_line_and_fillet() {
        let mut a = Path::new();
        a.line_to(Point2::new(0.0, 0.0)).line_to(Point2::new(10.0, 0.0));
        a.arc_to(Point2::new(10.0, 10.0), 2.0).unwrap();
        let mut b = corner_path();
        b.fillet(2.0).unwrap();
        assert_eq!(a, b);

        let mut empty = Path::new();
        assert!(matches!(
            empty.arc_to(Point2::new(1.0, 1.0), 1.0),
            Err(PathError::NoCurrentPoint)
        ));
    }

    #[test]
    fn test_round_fillet_all_rect() {
        let mut r = Path::make_rect(20.0, 10.0);
        r.round_fillet_all(2.0).unwrap();
        assert_eq!(r.len(), 8);
        assert!(r.is_closed());
        let expected = 200.0 - 4.0 * (4.0 - PI);
        assert!((r.area() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_round_fillet_all_full_side() {
        // radius equal to half the short side leaves no straight end
        let r = Path::make_rounded_rect(20.0, 10.0, 5.0).unwrap();
        assert_eq!(r.len(), 6);
        assert!(r.is_closed());
    }

    #[test]
    fn test_round_fillet_all_too_large() {
        let mut r = Path::make_rect(20.0, 10.0);
        let before = r.clone();
        assert!(r.round_fillet_all(6.0).is_err());
        assert_eq!(r, before);
    }

    #[test]
    fn test_round_fillet_all_skips_arcs() {
        let mut c = Path::make_circle(3.0);
        let before = c.clone();
        c.round_fillet_all(1.0).unwrap();
        assert_eq!(c, before);
    }

    #[test]
    fn test_spindle_cleared_corner_reaches_corner() {
        let mut p = Path::new();
        p.line_to(Point2::new(0.0, 0.0)).line_to(Point2::new(10.0, 0.0));
        p.spindle_cleared_line_to(Point2::new(10.0, 10.0), 1.0)
            .unwrap();
        assert_eq!(p.len(), 3);
        let arc = &p.segments()[1];
        assert!(arc.locate(&Point2::new(10.0, 0.0), 1e-9).is_some());
        let s = 2f64.sqrt();
        assert!((arc.start() - Point2::new(10.0 - s, 0.0)).norm() < 1e-9);
        assert!((arc.end() - Point2::new(10.0, s)).norm() < 1e-9);
        assert_eq!(p.current_point(), Some(Point2::new(10.0, 10.0)));
    }

    #[test]
    fn test_dogbone_polygon_grows_mortise() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(30.0, 0.0),
            Point2::new(30.0, 15.0),
            Point2::new(0.0, 15.0),
        ];
        let m = Path::dogbone_polygon(&pts, 3.0).unwrap();
        assert!(m.is_closed());
        assert_eq!(m.len(), 8);
        assert!(m.area() > 450.0);
        for p in &pts {
            assert!(m.segments().iter().any(|s| s.locate(p, 1e-9).is_some()));
        }
        assert!(Path::dogbone_polygon(&pts, 6.0).is_err());
    }
}
