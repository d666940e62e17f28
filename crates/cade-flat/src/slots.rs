//! Joint descriptors laid out along a shared edge.
//!
//! Each [`Slot`] knows the stretch of edge it occupies and how to turn
//! itself into geometry: a feature spliced into the tab board's edge,
//! cutouts in either board, and hardware.

use std::rc::Rc;

use cade_math::{Point2, Point3, Transform, Vec2, Vec3};
use cade_path::Path;

use crate::fasteners::{FastenerCatalog, CYLINDER_NUT_DIAMETER};
use crate::{FlatError, Result, Solid};

/// Default tenon width (mm).
pub const DEFAULT_TENON_WIDTH: f64 = 30.0;
/// Default cutter diameter for dog-bone corners (mm).
pub const DEFAULT_SPINDLE_DIAMETER: f64 = 6.0;
/// Default bolt diameter for cylinder-nut joints (mm).
pub const DEFAULT_BOLT_DIAMETER: f64 = 6.0;
/// Default distance from the edge to the cylinder nut axis (mm).
pub const DEFAULT_NUT_OFFSET: f64 = 20.0;
/// Default drawer slot length (mm).
pub const DEFAULT_DRAWER_LENGTH: f64 = 40.0;
/// Default horn width (mm).
pub const DEFAULT_HORN_WIDTH: f64 = 20.0;
/// Default protrusion of a trough support past the receiver (mm).
pub const DEFAULT_OVERHANG: f64 = 15.0;

/// Where along the edge a slot is centered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotPosition {
    /// Fraction of the edge length, 0 at the edge start.
    Fraction(f64),
    /// Distance from the edge start (mm).
    Absolute(f64),
}

impl SlotPosition {
    /// Distance from the edge start on an edge of `length`.
    pub fn resolve(self, length: f64) -> Result<f64> {
        let at = match self {
            SlotPosition::Fraction(f) => f * length,
            SlotPosition::Absolute(d) => d,
        };
        if at.is_nan() || at < -1e-9 || at > length + 1e-9 {
            return Err(FlatError::SlotOutOfRange {
                position: at,
                length,
            });
        }
        Ok(at)
    }
}

impl From<f64> for SlotPosition {
    fn from(fraction: f64) -> Self {
        SlotPosition::Fraction(fraction)
    }
}

/// A joint element on a shared edge.
///
/// In the edge frame x runs along the tab board's edge, y points out of
/// the tab into the receiving board and z runs through the tab's
/// thickness.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Tenon on the tab, dog-boned mortise through the receiver.
    TenonMortise {
        /// Center of the tenon.
        position: SlotPosition,
        /// Tenon width along the edge.
        width: f64,
        /// Cutter diameter for the mortise corners.
        spindle_diameter: f64,
        /// Extra room around the tenon in the mortise.
        clearance: f64,
    },
    /// Bolt through the receiver into a cylinder nut set in the tab.
    CylinderNutFastener {
        /// Bolt position.
        position: SlotPosition,
        /// Bolt diameter.
        diameter: f64,
        /// Distance from the edge to the nut axis.
        nut_offset: f64,
    },
    /// Tenon flush with an end of the edge; the mortise opens past that end
    /// so the tab slides in along the edge.
    DrawerSlot {
        /// Flush with the edge end instead of its start.
        at_end: bool,
        /// Tenon length.
        length: f64,
    },
    /// Tenon whose mortise opens across the tab's thickness.
    CenterDrawerSlot {
        /// Center of the tenon.
        position: SlotPosition,
        /// Tenon width.
        width: f64,
    },
    /// Tenon flush with an end of the edge in a closed mortise.
    HornSlot {
        /// Flush with the edge end instead of its start.
        at_end: bool,
        /// Tenon width.
        width: f64,
    },
    /// Through tenon standing proud of the receiver.
    TroughAngleSupport {
        /// Center of the tenon.
        position: SlotPosition,
        /// Tenon width.
        width: f64,
        /// Protrusion past the receiver's far face.
        overhang: f64,
    },
}

impl Slot {
    /// Tenon and mortise with default sizes.
    pub fn tenon_mortise(position: impl Into<SlotPosition>) -> Self {
        Slot::TenonMortise {
            position: position.into(),
            width: DEFAULT_TENON_WIDTH,
            spindle_diameter: DEFAULT_SPINDLE_DIAMETER,
            clearance: 0.0,
        }
    }

    /// Cylinder-nut fastener with default sizes.
    pub fn cylinder_nut(position: impl Into<SlotPosition>) -> Self {
        Slot::CylinderNutFastener {
            position: position.into(),
            diameter: DEFAULT_BOLT_DIAMETER,
            nut_offset: DEFAULT_NUT_OFFSET,
        }
    }

    /// Drawer slot with the default length.
    pub fn drawer(at_end: bool) -> Self {
        Slot::DrawerSlot {
            at_end,
            length: DEFAULT_DRAWER_LENGTH,
        }
    }

    /// Center drawer slot with the default width.
    pub fn center_drawer(position: impl Into<SlotPosition>) -> Self {
        Slot::CenterDrawerSlot {
            position: position.into(),
            width: DEFAULT_TENON_WIDTH,
        }
    }

    /// Horn slot with the default width.
    pub fn horn(at_end: bool) -> Self {
        Slot::HornSlot {
            at_end,
            width: DEFAULT_HORN_WIDTH,
        }
    }

    /// Trough support with default sizes.
    pub fn trough_angle_support(position: impl Into<SlotPosition>) -> Self {
        Slot::TroughAngleSupport {
            position: position.into(),
            width: DEFAULT_TENON_WIDTH,
            overhang: DEFAULT_OVERHANG,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Slot::TenonMortise { .. } => "tenon",
            Slot::CylinderNutFastener { .. } => "cylinder nut",
            Slot::DrawerSlot { .. } => "drawer",
            Slot::CenterDrawerSlot { .. } => "center drawer",
            Slot::HornSlot { .. } => "horn",
            Slot::TroughAngleSupport { .. } => "trough support",
        }
    }

    /// Whether the slot puts hardware in the joint.
    pub fn is_fastener(&self) -> bool {
        matches!(self, Slot::CylinderNutFastener { .. })
    }

    /// Stretch of an edge of `length` the slot occupies.
    pub fn interval(&self, length: f64) -> Result<(f64, f64)> {
        let centered = |position: &SlotPosition, width: f64| -> Result<(f64, f64)> {
            let c = position.resolve(length)?;
            let (a, b) = (c - width / 2.0, c + width / 2.0);
            if a < -1e-9 || b > length + 1e-9 {
                return Err(FlatError::SlotOutOfRange {
                    position: c,
                    length,
                });
            }
            Ok((a, b))
        };
        let flush = |at_end: bool, width: f64| -> Result<(f64, f64)> {
            if width > length + 1e-9 {
                return Err(FlatError::SlotOutOfRange {
                    position: if at_end { length } else { 0.0 },
                    length,
                });
            }
            Ok(if at_end {
                (length - width, length)
            } else {
                (0.0, width)
            })
        };
        match self {
            Slot::TenonMortise {
                position,
                width,
                clearance,
                ..
            } => centered(position, width + 2.0 * clearance),
            Slot::CylinderNutFastener { position, .. } => {
                centered(position, CYLINDER_NUT_DIAMETER)
            }
            Slot::DrawerSlot { at_end, length: l } => flush(*at_end, *l),
            Slot::HornSlot { at_end, width } => flush(*at_end, *width),
            Slot::CenterDrawerSlot { position, width }
            | Slot::TroughAngleSupport {
                position, width, ..
            } => centered(position, *width),
        }
    }

    /// Geometry and hardware for this slot on `frame`.
    pub fn materialize(&self, frame: &EdgeFrame, catalog: &mut FastenerCatalog) -> Result<SlotCut> {
        let (x0, x1) = self.interval(frame.length)?;
        let mut cut = SlotCut::default();
        let tb = frame.receiver_thickness;
        let ta = frame.tab_thickness;
        match self {
            Slot::TenonMortise {
                width,
                spindle_diameter,
                clearance,
                ..
            } => {
                let c = (x0 + x1) / 2.0;
                let (t0, t1) = (c - width / 2.0, c + width / 2.0);
                cut.tab_feature = Some(tenon(t0, t1, tb));
                cut.receiver_cuts.push(frame.mortise(
                    (t0 - clearance, t1 + clearance),
                    (-clearance, ta + clearance),
                    spindle_diameter / 2.0,
                )?);
            }
            Slot::CylinderNutFastener {
                diameter,
                nut_offset,
                ..
            } => {
                let x = (x0 + x1) / 2.0;
                let pocket = frame.tab_point(x, -nut_offset);
                cut.tab_insides
                    .push(Path::make_circle(CYLINDER_NUT_DIAMETER / 2.0).translate(pocket.coords));
                let hole = frame.receiver_point(x, tb / 2.0, ta / 2.0);
                cut.receiver_cuts
                    .push(Path::make_circle(diameter / 2.0).translate(hole.coords));

                let kit = catalog.bolt_and_barrel_nut(*diameter, tb + nut_offset)?;
                let size = crate::MetricSize::from_diameter(*diameter)?;
                let into_joint = -frame.outward3();
                let along = frame.direction3();
                let seat = frame.tab_point3(x, tb + size.washer_thickness(), ta / 2.0);
                let bolt = Transform::from_frame(seat, into_joint, Some(along));
                cut.hardware.push((kit.washer, bolt.clone()));
                cut.hardware.push((kit.bolt, bolt));
                let nut = Transform::from_frame(
                    frame.tab_point3(x, -nut_offset, ta / 2.0),
                    Vec3::z(),
                    Some(along),
                );
                cut.hardware.push((kit.cylinder_nut, nut));
            }
            Slot::DrawerSlot { at_end, .. } => {
                cut.tab_feature = Some(tenon(x0, x1, tb));
                let (m0, m1) = if *at_end {
                    (x0, x1 + frame.reach)
                } else {
                    (x0 - frame.reach, x1)
                };
                cut.receiver_cuts.push(frame.mortise(
                    (m0, m1),
                    (0.0, ta),
                    DEFAULT_SPINDLE_DIAMETER / 2.0,
                )?);
            }
            Slot::CenterDrawerSlot { .. } => {
                cut.tab_feature = Some(tenon(x0, x1, tb));
                cut.receiver_cuts.push(frame.mortise(
                    (x0, x1),
                    (0.0, ta + frame.reach),
                    DEFAULT_SPINDLE_DIAMETER / 2.0,
                )?);
            }
            Slot::HornSlot { .. } => {
                cut.tab_feature = Some(tenon(x0, x1, tb));
                cut.receiver_cuts.push(frame.mortise(
                    (x0, x1),
                    (0.0, ta),
                    DEFAULT_SPINDLE_DIAMETER / 2.0,
                )?);
            }
            Slot::TroughAngleSupport { overhang, .. } => {
                cut.tab_feature = Some(tenon(x0, x1, tb + overhang));
                cut.receiver_cuts.push(frame.mortise(
                    (x0, x1),
                    (0.0, ta),
                    DEFAULT_SPINDLE_DIAMETER / 2.0,
                )?);
            }
        }
        Ok(cut)
    }
}

/// Open rectangular bump in edge coordinates.
fn tenon(x0: f64, x1: f64, depth: f64) -> Path {
    let mut p = Path::new();
    p.line_to(Point2::new(x0, 0.0))
        .line_to(Point2::new(x0, depth))
        .line_to(Point2::new(x1, depth))
        .line_to(Point2::new(x1, 0.0));
    p
}

/// What a slot does to the two boards.
#[derive(Debug, Clone, Default)]
pub struct SlotCut {
    /// Feature for the tab's edge, x measured from the edge start.
    pub tab_feature: Option<Path>,
    /// Cutouts in the tab, in the tab's frame.
    pub tab_insides: Vec<Path>,
    /// Cutouts in the receiver, in the receiver's frame.
    pub receiver_cuts: Vec<Path>,
    /// Hardware placed in the tab's frame.
    pub hardware: Vec<(Rc<Solid>, Transform)>,
}

/// A shared edge seen from both boards.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeFrame {
    /// Start of the edge in the tab's frame.
    pub origin: Point2,
    /// Unit direction of the edge.
    pub direction: Vec2,
    /// Unit normal pointing out of the tab.
    pub outward: Vec2,
    /// Edge length.
    pub length: f64,
    /// Tab board thickness.
    pub tab_thickness: f64,
    /// Receiving board thickness.
    pub receiver_thickness: f64,
    /// Maps the tab's frame into the receiver's.
    pub to_receiver: Transform,
    /// Distance that takes an open cut clear of the receiver.
    pub reach: f64,
}

impl EdgeFrame {
    /// Edge coordinates to the tab's plane.
    pub fn tab_point(&self, x: f64, y: f64) -> Point2 {
        self.origin + self.direction * x + self.outward * y
    }

    /// Edge coordinates to the tab's frame.
    pub fn tab_point3(&self, x: f64, y: f64, z: f64) -> Point3 {
        let p = self.tab_point(x, y);
        Point3::new(p.x, p.y, z)
    }

    /// Edge coordinates to the receiver's plane.
    pub fn receiver_point(&self, x: f64, y: f64, z: f64) -> Point2 {
        let p = self.to_receiver.apply_point(&self.tab_point3(x, y, z));
        Point2::new(p.x, p.y)
    }

    fn outward3(&self) -> Vec3 {
        Vec3::new(self.outward.x, self.outward.y, 0.0)
    }

    fn direction3(&self) -> Vec3 {
        Vec3::new(self.direction.x, self.direction.y, 0.0)
    }

    /// The block `xs` x `zs` of the joint seen through the receiver, with
    /// relieved corners.
    fn mortise(&self, xs: (f64, f64), zs: (f64, f64), spindle_radius: f64) -> Result<Path> {
        let y = self.receiver_thickness / 2.0;
        let corners = [
            self.receiver_point(xs.0, y, zs.0),
            self.receiver_point(xs.1, y, zs.0),
            self.receiver_point(xs.1, y, zs.1),
            self.receiver_point(xs.0, y, zs.1),
        ];
        if spindle_radius > 0.0 {
            Ok(Path::dogbone_polygon(&corners, spindle_radius)?)
        } else {
            Ok(Path::from_polyline(&corners)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Tab edge along x from the origin, receiver lying flat beyond it.
    fn frame() -> EdgeFrame {
        // receiver frame: x along the edge, y along the tab's thickness,
        // z out of the tab
        let to_receiver =
            Transform::from_frame(Point3::origin(), -Vec3::y(), Some(Vec3::x()))
                .inverse()
                .unwrap();
        EdgeFrame {
            origin: Point2::origin(),
            direction: Vec2::x(),
            outward: -Vec2::y(),
            length: 200.0,
            tab_thickness: 15.0,
            receiver_thickness: 12.0,
            to_receiver,
            reach: 500.0,
        }
    }

    #[test]
    fn test_position_resolution() {
        assert_relative_eq!(SlotPosition::Fraction(0.25).resolve(200.0).unwrap(), 50.0);
        assert_relative_eq!(SlotPosition::Absolute(70.0).resolve(200.0).unwrap(), 70.0);
        assert!(matches!(
            SlotPosition::Fraction(1.5).resolve(200.0),
            Err(FlatError::SlotOutOfRange { .. })
        ));
    }

    #[test]
    fn test_intervals() {
        let (a, b) = Slot::tenon_mortise(0.5).interval(200.0).unwrap();
        assert_relative_eq!(a, 85.0);
        assert_relative_eq!(b, 115.0);
        let (a, b) = Slot::drawer(true).interval(200.0).unwrap();
        assert_relative_eq!(a, 160.0);
        assert_relative_eq!(b, 200.0);
        let (a, _) = Slot::horn(false).interval(200.0).unwrap();
        assert_relative_eq!(a, 0.0);
        assert!(Slot::tenon_mortise(SlotPosition::Absolute(5.0))
            .interval(200.0)
            .is_err());
    }

    #[test]
    fn test_tenon_mortise_materializes() {
        let mut catalog = FastenerCatalog::new();
        let cut = Slot::tenon_mortise(0.5)
            .materialize(&frame(), &mut catalog)
            .unwrap();
        let feature = cut.tab_feature.unwrap();
        let (min, max) = feature.bounding_box().unwrap();
        assert_relative_eq!(min.x, 85.0, epsilon = 1e-9);
        assert_relative_eq!(max.y, 12.0, epsilon = 1e-9);
        assert_eq!(cut.receiver_cuts.len(), 1);
        let (min, max) = cut.receiver_cuts[0].bounding_box().unwrap();
        // dog-bones poke past the 30 x 15 block
        assert!(max.x - min.x > 30.0);
        assert!(max.y - min.y > 15.0 - 1e-9);
        assert!(cut.hardware.is_empty());
    }

    #[test]
    fn test_cylinder_nut_materializes() {
        let mut catalog = FastenerCatalog::new();
        let cut = Slot::cylinder_nut(SlotPosition::Absolute(70.0))
            .materialize(&frame(), &mut catalog)
            .unwrap();
        assert!(cut.tab_feature.is_none());
        assert_eq!(cut.tab_insides.len(), 1);
        let (min, max) = cut.tab_insides[0].bounding_box().unwrap();
        assert_relative_eq!((min.x + max.x) / 2.0, 70.0, epsilon = 1e-9);
        // the pocket sits inside the tab, away from the edge
        assert_relative_eq!((min.y + max.y) / 2.0, 20.0, epsilon = 1e-9);
        assert_eq!(cut.receiver_cuts.len(), 1);
        let (min, max) = cut.receiver_cuts[0].bounding_box().unwrap();
        assert_relative_eq!(max.x - min.x, 6.0, epsilon = 1e-9);
        assert_relative_eq!((min.x + max.x) / 2.0, 70.0, epsilon = 1e-9);
        assert_eq!(cut.hardware.len(), 3);
    }

    #[test]
    fn test_drawer_mortise_opens_past_end() {
        let mut catalog = FastenerCatalog::new();
        let cut = Slot::drawer(false)
            .materialize(&frame(), &mut catalog)
            .unwrap();
        let (min, _) = cut.receiver_cuts[0].bounding_box().unwrap();
        assert!(min.x < -400.0);
    }

    #[test]
    fn test_trough_support_stands_proud() {
        let mut catalog = FastenerCatalog::new();
        let cut = Slot::trough_angle_support(0.5)
            .materialize(&frame(), &mut catalog)
            .unwrap();
        let (_, max) = cut.tab_feature.unwrap().bounding_box().unwrap();
        assert_relative_eq!(max.y, 12.0 + DEFAULT_OVERHANG, epsilon = 1e-9);
    }
}
