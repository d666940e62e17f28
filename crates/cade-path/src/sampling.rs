//! Arc-length bookkeeping and sampling along a path.

use cade_math::Point2;

use crate::{Path, PathError, Result, Segment, EPSILON};

/// Cumulative arc length per segment.
#[derive(Debug, Clone, PartialEq)]
pub struct LengthInfo {
    cumulative: Vec<f64>,
}

impl LengthInfo {
    /// Length of the path up to the end of each segment.
    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    /// Total length.
    pub fn total(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Distance along the path where segment `i` starts.
    pub fn segment_start(&self, i: usize) -> Option<f64> {
        if i >= self.cumulative.len() {
            return None;
        }
        Some(if i == 0 { 0.0 } else { self.cumulative[i - 1] })
    }

    /// Length of segment `i`.
    pub fn segment_length(&self, i: usize) -> Option<f64> {
        Some(self.cumulative.get(i)? - self.segment_start(i)?)
    }

    /// Segment containing `distance` and the offset into it.
    pub fn locate(&self, distance: f64) -> Option<(usize, f64)> {
        if distance < -EPSILON || distance > self.total() + EPSILON {
            return None;
        }
        let i = self
            .cumulative
            .iter()
            .position(|&c| distance <= c)
            .unwrap_or(self.cumulative.len().checked_sub(1)?);
        let start = self.segment_start(i)?;
        Some((i, (distance - start).max(0.0)))
    }
}

/// Points at a fixed arc-length pitch along a path, starting at its start.
///
/// Created by [`Path::equidistant_points`].
#[derive(Debug, Clone)]
pub struct EquidistantPoints<'a> {
    segments: &'a [Segment],
    pitch: f64,
    total: f64,
    next: usize,
    segment: usize,
    segment_start: f64,
}

impl Iterator for EquidistantPoints<'_> {
    type Item = Point2;

    fn next(&mut self) -> Option<Point2> {
        let distance = self.next as f64 * self.pitch;
        if self.segments.is_empty() || distance > self.total + EPSILON {
            return None;
        }
        while self.segment + 1 < self.segments.len() {
            let len = self.segments[self.segment].length();
            if distance <= self.segment_start + len {
                break;
            }
            self.segment_start += len;
            self.segment += 1;
        }
        self.next += 1;
        Some(self.segments[self.segment].point_at(distance - self.segment_start))
    }
}

impl Path {
    /// Cumulative segment lengths.
    pub fn length_info(&self) -> LengthInfo {
        let mut total = 0.0;
        let cumulative = self
            .segments
            .iter()
            .map(|s| {
                total += s.length();
                total
            })
            .collect();
        LengthInfo { cumulative }
    }

    /// Total arc length of the outer chain.
    pub fn length(&self) -> f64 {
        self.segments.iter().map(Segment::length).sum()
    }

    /// Point at arc length `distance` from the start.
    pub fn point_at_distance(&self, distance: f64) -> Option<Point2> {
        let (i, offset) = self.length_info().locate(distance)?;
        Some(self.segments[i].point_at(offset))
    }

    /// Lazily sample the path every `pitch` of arc length.
    pub fn equidistant_points(&self, pitch: f64) -> Result<EquidistantPoints<'_>> {
        if pitch.is_nan() || pitch <= 0.0 {
            return Err(PathError::InvalidPitch(pitch));
        }
        Ok(EquidistantPoints {
            segments: &self.segments,
            pitch,
            total: self.length(),
            next: 0,
            segment: 0,
            segment_start: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn directrix() -> Path {
        let mut p = Path::new();
        p.line_to(Point2::new(0.0, 0.0))
            .line_to(Point2::new(10.0, 0.0))
            .arc(Point2::new(10.0, 20.0), 10.0, true)
            .unwrap()
            .line_to(Point2::new(0.0, 20.0));
        p
    }

    #[test]
    fn test_length_info() {
        let info = directrix().length_info();
        assert_eq!(info.cumulative().len(), 3);
        assert_relative_eq!(info.total(), 20.0 + 10.0 * PI, epsilon = 1e-9);
        assert_relative_eq!(info.segment_length(1).unwrap(), 10.0 * PI, epsilon = 1e-9);
        assert_eq!(info.segment_start(0), Some(0.0));
        assert_relative_eq!(info.segment_start(2).unwrap(), 10.0 + 10.0 * PI, epsilon = 1e-9);
        assert_eq!(info.segment_start(3), None);
        let (i, offset) = info.locate(12.0).unwrap();
        assert_eq!(i, 1);
        assert_relative_eq!(offset, 2.0, epsilon = 1e-9);
        assert!(info.locate(100.0).is_none());
    }

    #[test]
    fn test_equidistant_points_follow_arcs() {
        let p = directrix();
        let pitch = 5.0;
        let points: Vec<Point2> = p.equidistant_points(pitch).unwrap().collect();
        let expected = (p.length() / pitch).floor() as usize + 1;
        assert_eq!(points.len(), expected);
        assert_relative_eq!(points[0].x, 0.0);
        // sample 3 lies 5 units into the half turn
        let angle: f64 = 5.0 / 10.0;
        assert_relative_eq!(points[3].x, 10.0 + 10.0 * angle.sin(), epsilon = 1e-9);
        assert_relative_eq!(points[3].y, 10.0 - 10.0 * angle.cos(), epsilon = 1e-9);
        for p in &points {
            assert!(p.x >= -1e-9 && p.x <= 20.0 + 1e-9);
        }
    }

    #[test]
    fn test_pitch_must_be_positive() {
        assert!(matches!(
            directrix().equidistant_points(0.0),
            Err(PathError::InvalidPitch(_))
        ));
    }

    #[test]
    fn test_point_at_distance_end() {
        let p = directrix();
        let end = p.point_at_distance(p.length()).unwrap();
        assert_relative_eq!(end.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(end.y, 20.0, epsilon = 1e-9);
    }
}
