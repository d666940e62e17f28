//! Splicing features into an edge of a contour.

use cade_math::{cross2, left_normal, Point2};

use crate::{Path, PathError, Result, Segment, EPSILON};

/// Where a feature sits along its edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    /// Distance from the edge's start point.
    FromStart(f64),
    /// Distance back from the edge's end point.
    FromEnd(f64),
}

impl Path {
    /// Replace part of line segment `index` with `feature`.
    ///
    /// The feature is an open chain in the edge frame: x runs along the
    /// segment starting at the anchor, y points out of the region. Both of
    /// its ends lie on y = 0 with x increasing from first to last, so a
    /// positive y bump becomes a tab and a negative one a notch.
    pub fn insert_feature(&mut self, feature: &Path, index: isize, anchor: Anchor) -> Result<()> {
        let i = self.resolve_index(index)?;
        let seg = &self.segments[i];
        if !seg.is_line() {
            return Err(PathError::NotALine(i));
        }
        let (f0, f1) = match (feature.start_point(), feature.current_point()) {
            (Some(a), Some(b)) if !feature.is_empty() => (a, b),
            _ => return Err(PathError::Empty),
        };
        if f0.y.abs() > EPSILON || f1.y.abs() > EPSILON || f1.x <= f0.x + EPSILON {
            return Err(PathError::FeatureMisaligned);
        }

        let length = seg.length();
        let at = match anchor {
            Anchor::FromStart(d) => d,
            Anchor::FromEnd(d) => length - d,
        };
        if at + f0.x < -EPSILON || at + f1.x > length + EPSILON {
            return Err(PathError::FeatureOutOfRange {
                start: at + f0.x,
                end: at + f1.x,
                length,
            });
        }

        let origin = seg.start();
        let u = seg.start_tangent();
        let n = if self.is_ccw() {
            -left_normal(&u)
        } else {
            left_normal(&u)
        };
        let to_edge = |p: &Point2| origin + u * (at + p.x) + n * p.y;
        let mirrored = cross2(&u, &n) < 0.0;

        let mut spliced = Vec::with_capacity(feature.len() + 2);
        let head = Segment::line(origin, to_edge(&f0));
        if !head.is_degenerate() {
            spliced.push(head);
        }
        spliced.extend(feature.segments.iter().map(|s| s.map(&to_edge, mirrored)));
        let tail = Segment::line(to_edge(&f1), seg.end());
        if !tail.is_degenerate() {
            spliced.push(tail);
        }
        self.segments.splice(i..=i, spliced);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tab(width: f64, depth: f64) -> Path {
        let mut p = Path::new();
        p.line_to(Point2::new(0.0, 0.0))
            .line_to(Point2::new(0.0, depth))
            .line_to(Point2::new(width, depth))
            .line_to(Point2::new(width, 0.0));
        p
    }

    #[test]
    fn test_tab_grows_region() {
        let mut r = Path::make_rect(100.0, 50.0);
        r.insert_feature(&tab(30.0, 15.0), 0, Anchor::FromStart(20.0))
            .unwrap();
        assert!(r.is_closed());
        assert_eq!(r.len(), 4 + 4);
        assert_relative_eq!(r.area(), 5000.0 + 450.0, epsilon = 1e-9);
        let (min, _) = r.bounding_box().unwrap();
        assert_relative_eq!(min.y, -15.0, epsilon = 1e-12);
    }

    #[test]
    fn test_notch_from_end() {
        let mut r = Path::make_rect(100.0, 50.0);
        r.insert_feature(&tab(10.0, -5.0), -1, Anchor::FromEnd(10.0))
            .unwrap();
        assert_relative_eq!(r.area(), 5000.0 - 50.0, epsilon = 1e-9);
        // the last edge runs down x = 0; the notch spans y in 0..10 from the end
        assert!(r.contains(&Point2::new(2.0, 20.0)));
        assert!(!r.contains(&Point2::new(2.0, 5.0)));
    }

    #[test]
    fn test_clockwise_region_tab() {
        let mut r = Path::make_rect(100.0, 50.0).invert();
        r.insert_feature(&tab(30.0, 15.0), 0, Anchor::FromStart(20.0))
            .unwrap();
        assert_relative_eq!(r.area().abs(), 5000.0 + 450.0, epsilon = 1e-9);
    }

    #[test]
    fn test_feature_with_arc() {
        let mut bump = Path::new();
        bump.line_to(Point2::new(0.0, 0.0))
            .arc(Point2::new(10.0, 0.0), 5.0, false)
            .unwrap();
        let mut r = Path::make_rect(100.0, 50.0);
        r.insert_feature(&bump, 0, Anchor::FromStart(45.0)).unwrap();
        let half_disk = std::f64::consts::PI * 12.5;
        assert_relative_eq!(r.area(), 5000.0 + half_disk, epsilon = 1e-9);
    }

    #[test]
    fn test_feature_errors() {
        let mut r = Path::make_rect(100.0, 50.0);
        assert!(matches!(
            r.insert_feature(&tab(30.0, 15.0), 0, Anchor::FromStart(80.0)),
            Err(PathError::FeatureOutOfRange { .. })
        ));
        let mut skew = Path::new();
        skew.line_to(Point2::new(0.0, 0.0)).line_to(Point2::new(5.0, 1.0));
        assert!(matches!(
            r.insert_feature(&skew, 0, Anchor::FromStart(0.0)),
            Err(PathError::FeatureMisaligned)
        ));
        let mut c = Path::make_circle(10.0);
        assert!(matches!(
            c.insert_feature(&tab(1.0, 1.0), 0, Anchor::FromStart(0.0)),
            Err(PathError::NotALine(0))
        ));
    }
}
