#![warn(missing_docs)]

//! Planar contours for sheet-stock parts.
//!
//! A [`Path`] is a chain of line and arc [`Segment`]s that is usually closed
//! and then used as a region: the outline of a board, a cutout, a tenon.
//! Paths support incremental construction, rigid transforms, offsetting,
//! region booleans, and splicing features into an edge.
//!
//! # Example
//!
//! ```
//! use cade_path::Path;
//! use cade_math::Point2;
//!
//! let mut outline = Path::new();
//! outline
//!     .line_to(Point2::new(0.0, 0.0))
//!     .line_to(Point2::new(100.0, 0.0))
//!     .line_to(Point2::new(100.0, 40.0))
//!     .line_to(Point2::new(0.0, 40.0))
//!     .close();
//! assert!(outline.is_closed());
//! assert!((outline.area() - 4000.0).abs() < 1e-9);
//! ```

mod boolean;
mod feature;
mod fillet;
mod offset;
mod path;
mod sampling;
mod segment;

pub use boolean::BooleanOp;
pub use feature::Anchor;
pub use offset::OffsetSpec;
pub use path::{Path, PathHit, Recenter};
pub use sampling::{EquidistantPoints, LengthInfo};
pub use segment::Segment;

use cade_math::Point2;
use thiserror::Error;

/// Linear tolerance for point equality, collinearity and closedness (mm).
pub const EPSILON: f64 = 1e-6;

/// Maximum chordal deviation when arcs are approximated by polylines (mm).
pub const ARC_TOLERANCE: f64 = 0.01;

/// Errors from path construction and geometry operations.
#[derive(Debug, Clone, Error)]
pub enum PathError {
    /// A drawing call needs a current point.
    #[error("path has no current point")]
    NoCurrentPoint,

    /// `move_to` was called after segments were drawn.
    #[error("move_to after drawing: a path is a single chain")]
    MoveAfterDraw,

    /// The requested arc cannot span the chord.
    #[error("arc radius {radius} cannot span a chord of {chord}")]
    RadiusTooSmall {
        /// Distance between the arc endpoints.
        chord: f64,
        /// Requested radius.
        radius: f64,
    },

    /// The tangent points of a rounded corner fall outside its segments.
    #[error("radius {radius} does not fit the corner at {corner}")]
    FilletTooLarge {
        /// Requested radius.
        radius: f64,
        /// The corner being rounded.
        corner: Point2,
    },

    /// Rounding needs two segments meeting at a corner.
    #[error("no corner to round")]
    NoCorner,

    /// The operation requires a line segment.
    #[error("segment {0} is not a line")]
    NotALine(usize),

    /// The operation requires a closed path.
    #[error("path is not closed")]
    NotClosed,

    /// The path has no segments.
    #[error("path is empty")]
    Empty,

    /// Consecutive segments do not share an endpoint.
    #[error("segment {0} does not start where the previous one ends")]
    Disconnected(usize),

    /// The offset contour degenerated.
    #[error("offset by {0} collapses the contour")]
    OffsetCollapsed(f64),

    /// Arcs cannot be scaled non-uniformly.
    #[error("non-uniform scale ({0}, {1}) of a path with arcs")]
    NonUniformArcScale(f64, f64),

    /// A boolean operation produced nothing.
    #[error("boolean operation produced an empty region")]
    EmptyBoolean,

    /// A boolean operation produced several regions.
    #[error("boolean operation produced {0} disjoint regions")]
    DisjointBoolean(usize),

    /// A segment index is out of range.
    #[error("segment index {index} out of range for {len} segments")]
    SegmentIndex {
        /// Requested index (negative counts from the end).
        index: isize,
        /// Number of segments.
        len: usize,
    },

    /// A feature's open ends are not on its edge line.
    #[error("feature ends must lie on the edge line with increasing x")]
    FeatureMisaligned,

    /// A feature does not fit within its edge.
    #[error("feature spans {start:.3}..{end:.3} on an edge of length {length:.3}")]
    FeatureOutOfRange {
        /// Feature start along the edge.
        start: f64,
        /// Feature end along the edge.
        end: f64,
        /// Edge length.
        length: f64,
    },

    /// Sampling pitch must be positive.
    #[error("sampling pitch must be positive, got {0}")]
    InvalidPitch(f64),
}

/// Result type for path operations.
pub type Result<T> = std::result::Result<T, PathError>;
