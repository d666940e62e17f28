#![warn(missing_docs)]

//! Flat sheet-stock parts and the joinery that holds them together.
//!
//! A [`FlatPart`] is a board cut from sheet goods: a closed outside contour,
//! cutouts, and a thickness. Parts are shared through [`FlatPartRef`] handles
//! and placed in an [`Assembly`]. Joints between placed boards are laid out
//! along their shared edge by [`join_parts`], which splices tenons into one
//! board, carves mortises and bolt holes into the other, and adds the
//! hardware from a [`FastenerCatalog`].
//!
//! # Example
//!
//! ```
//! use cade_flat::{Assembly, Entity, FlatPart};
//! use cade_math::{Transform, Vec3, Point3};
//! use cade_path::Path;
//!
//! let side = FlatPart::new("side", Path::make_rect(200.0, 100.0), 15.0)
//!     .unwrap()
//!     .into_ref();
//! let mut frame = Assembly::new("frame");
//! frame.add_child(Entity::Flat(side.clone()), Transform::identity());
//! frame.add_child(
//!     Entity::Flat(side.clone()),
//!     Transform::from_frame(Point3::new(0.0, 0.0, 150.0), Vec3::z(), None),
//! );
//! assert_eq!(frame.find_all(&Entity::Flat(side)).len(), 2);
//! ```

mod assembly;
mod fasteners;
mod fastening;
mod join;
mod locate;
mod part;
mod shelf;
mod slots;

pub use assembly::{Assembly, AssemblyRef, Entity, Solid, SolidKind};
pub use fasteners::{
    BarrelNutKit, FastenerCatalog, FastenerKit, MetricSize, BOLT_LENGTHS, CYLINDER_NUT_DIAMETER,
    CYLINDER_NUT_LENGTH, LENGTH_MARGIN,
};
pub use fastening::{
    bolt_threaded_subpart_to_flat_part, clear_bolts_on_flat_part, fasten_subpart_to_flat_part,
    fasten_subpart_to_flat_part_edge, FastenOptions, FastenerMount, HoleSpec,
};
pub use join::{default_slot_layout, join_parts, JointReport};
pub use locate::{
    face_placement, half_lap_cross_join, locate_origin_on_flat_part, project_plane,
    trim_flat_part_with_another, Plane,
};
pub use part::{FlatPart, FlatPartRef};
pub use shelf::{make_shelf_on_plane, ShelfMaker};
pub use slots::{
    EdgeFrame, Slot, SlotCut, SlotPosition, DEFAULT_BOLT_DIAMETER, DEFAULT_DRAWER_LENGTH,
    DEFAULT_HORN_WIDTH, DEFAULT_NUT_OFFSET, DEFAULT_OVERHANG, DEFAULT_SPINDLE_DIAMETER,
    DEFAULT_TENON_WIDTH,
};

use cade_path::PathError;
use thiserror::Error;

/// Maximum distance (mm) between a fastener hole and the board face it
/// should bear on.
pub const HOLE_PLACEMENT_TOLERANCE: f64 = 1.0;

/// Errors from flat-part construction, joinery and fastening.
#[derive(Debug, Clone, Error)]
pub enum FlatError {
    /// Underlying contour operation failed.
    #[error(transparent)]
    Path(#[from] PathError),

    /// Boards need a positive thickness.
    #[error("invalid thickness {0}")]
    InvalidThickness(f64),

    /// The part or entity is not placed in the assembly.
    #[error("{0} is not placed in the assembly")]
    NotInAssembly(String),

    /// A placement could not be inverted.
    #[error("placement is singular")]
    SingularPlacement,

    /// A joint needs two distinct parts.
    #[error("cannot join {0} to itself")]
    SamePart(String),

    /// No outside edge of the tab lies on a face of the receiver.
    #[error("no edge of {tab} lies on a face of {receiver}")]
    NoSharedEdge {
        /// Part receiving the tenons.
        tab: String,
        /// Part receiving the mortises.
        receiver: String,
    },

    /// More than one edge of the tab lies on a face of the receiver.
    #[error("{0} edges qualify as the shared edge")]
    AmbiguousSharedEdge(usize),

    /// A slot does not fit on its edge.
    #[error("slot at {position:.3} does not fit an edge of length {length:.3}")]
    SlotOutOfRange {
        /// Slot position along the edge.
        position: f64,
        /// Edge length.
        length: f64,
    },

    /// Two slots claim the same stretch of edge.
    #[error("slots overlap between {start:.3} and {end:.3}")]
    SlotOverlap {
        /// Start of the overlap along the edge.
        start: f64,
        /// End of the overlap along the edge.
        end: f64,
    },

    /// No catalog size covers the diameter.
    #[error("no fastener size for diameter {0}")]
    UnsupportedDiameter(f64),

    /// No catalog bolt is long enough.
    #[error("no M{size} bolt reaches {required:.1}mm")]
    BoltTooLong {
        /// Nominal diameter.
        size: u32,
        /// Required length.
        required: f64,
    },

    /// A fastener hole does not meet the board it should go through.
    #[error("hole {index} misplaced on {part}: {reason}")]
    MisplacedHole {
        /// Board name.
        part: String,
        /// Hole index within the sub-part.
        index: usize,
        /// What went wrong.
        reason: String,
    },

    /// Two boards do not cross each other.
    #[error("{0} and {1} do not cross")]
    NotCrossing(String, String),

    /// No board or feature touches the shelf plane.
    #[error("nothing crosses the shelf plane")]
    EmptyShelf,
}

/// Result type for flat-part operations.
pub type Result<T> = std::result::Result<T, FlatError>;
