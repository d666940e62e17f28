//! Laying out joints along the edge two boards share.

use cade_math::{left_normal, Vec3};
use cade_path::{Anchor, Path, ARC_TOLERANCE};
use tracing::debug;

use crate::fasteners::FastenerCatalog;
use crate::locate::{project_plane, Plane};
use crate::slots::{EdgeFrame, Slot, SlotPosition};
use crate::{Assembly, Entity, FlatError, FlatPartRef, Result};

/// Spacing that decides how many fasteners an edge gets (mm).
const FASTENER_SPACING: f64 = 250.0;

/// Distance of the outermost fasteners from the edge ends (mm).
const END_OFFSET: f64 = 70.0;

/// What [`join_parts`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct JointReport {
    /// Index of the tab's outside segment that carried the joint.
    pub segment: usize,
    /// Length of that segment.
    pub length: f64,
    /// Slot centers along the edge, in layout order.
    pub positions: Vec<f64>,
    /// Features spliced into the tab's outside.
    pub features: usize,
    /// Cutouts added to the tab.
    pub tab_cutouts: usize,
    /// Cutouts carved into the receiver.
    pub receiver_cutouts: usize,
    /// Fastener solids added to the assembly.
    pub hardware: usize,
}

/// Fasteners every 250 mm or so, the outer ones 70 mm from the ends, with
/// tenons halfway between neighbors.
///
/// A single fastener sits 70 mm from the start, or mid-edge on edges
/// shorter than 140 mm.
pub fn default_slot_layout(length: f64) -> Vec<Slot> {
    let n = ((length / FASTENER_SPACING).ceil() as usize).max(1);
    if n == 1 {
        let at = if length < 2.0 * END_OFFSET {
            length / 2.0
        } else {
            END_OFFSET
        };
        return vec![Slot::cylinder_nut(SlotPosition::Absolute(at))];
    }
    let step = (length - 2.0 * END_OFFSET) / (n - 1) as f64;
    let mut layout = Vec::with_capacity(2 * n - 1);
    for k in 0..n {
        let at = END_OFFSET + k as f64 * step;
        if k > 0 {
            layout.push(Slot::tenon_mortise(SlotPosition::Absolute(at - step / 2.0)));
        }
        layout.push(Slot::cylinder_nut(SlotPosition::Absolute(at)));
    }
    layout
}

/// Joint `tab` to `receiver` along the one outside edge of `tab` that lies
/// on a face of `receiver`.
///
/// Tenons are spliced into the tab's edge, mortises and bolt holes cut into
/// the receiver, nut pockets into the tab, and hardware added to
/// `assembly` at the tab's placement. Without a `layout` the edge gets
/// [`default_slot_layout`].
pub fn join_parts(
    assembly: &mut Assembly,
    catalog: &mut FastenerCatalog,
    tab: &FlatPartRef,
    receiver: &FlatPartRef,
    layout: Option<&[Slot]>,
) -> Result<JointReport> {
    if std::rc::Rc::ptr_eq(tab, receiver) {
        return Err(FlatError::SamePart(tab.borrow().name.clone()));
    }
    let tab_placement = assembly.placement_of_part(tab)?;
    let receiver_placement = assembly.placement_of_part(receiver)?;
    let to_tab = tab_placement
        .inverse()
        .ok_or(FlatError::SingularPlacement)?;
    let to_receiver = receiver_placement
        .inverse()
        .ok_or(FlatError::SingularPlacement)?
        .then(&tab_placement);

    let (segment, frame) = {
        let tab_part = tab.borrow();
        let receiver_part = receiver.borrow();
        let outside = tab_part.outside();
        let outward_of = |u: cade_math::Vec2| {
            if outside.is_ccw() {
                -left_normal(&u)
            } else {
                left_normal(&u)
            }
        };

        let mut candidates = Vec::new();
        for face_z in [0.0, receiver_part.thickness()] {
            let face = Plane::from_placement(&receiver_placement.translated(0.0, 0.0, face_z));
            let Some((point, direction)) = project_plane(&face, &to_tab) else {
                continue;
            };
            for i in outside.find_segments_on_line(point, direction) {
                // the edge must face into the receiver's material
                let n = outward_of(outside.segments()[i].start_tangent());
                let into = to_receiver.apply_vec(&Vec3::new(n.x, n.y, 0.0)).z;
                let faces_material = if face_z == 0.0 { into > 0.5 } else { into < -0.5 };
                if faces_material {
                    candidates.push(i);
                }
            }
        }
        let segment = match candidates.as_slice() {
            [] => {
                return Err(FlatError::NoSharedEdge {
                    tab: tab_part.name.clone(),
                    receiver: receiver_part.name.clone(),
                })
            }
            [i] => *i,
            many => return Err(FlatError::AmbiguousSharedEdge(many.len())),
        };

        let seg = &outside.segments()[segment];
        let length = outside
            .length_info()
            .segment_length(segment)
            .unwrap_or_else(|| seg.length());
        let extent = receiver_part
            .bounding_box()
            .map(|(min, max)| (max - min).norm())
            .unwrap_or(0.0);
        let frame = EdgeFrame {
            origin: seg.start(),
            direction: seg.start_tangent(),
            outward: outward_of(seg.start_tangent()),
            length,
            tab_thickness: tab_part.thickness(),
            receiver_thickness: receiver_part.thickness(),
            to_receiver,
            reach: extent + length + tab_part.thickness() + receiver_part.thickness(),
        };
        (segment, frame)
    };
    let default_layout;
    let layout = match layout {
        Some(l) => l,
        None => {
            default_layout = default_slot_layout(frame.length);
            &default_layout[..]
        }
    };

    // every slot claims its stretch before anything is cut
    let mut placed = Vec::with_capacity(layout.len());
    for slot in layout {
        placed.push((slot.interval(frame.length)?, slot));
    }
    let positions = placed.iter().map(|((a, b), _)| (a + b) / 2.0).collect();
    placed.sort_by(|a, b| a.0 .0.total_cmp(&b.0 .0));
    for pair in placed.windows(2) {
        let (prev, next) = (pair[0].0, pair[1].0);
        if next.0 < prev.1 - 1e-9 {
            return Err(FlatError::SlotOverlap {
                start: next.0,
                end: prev.1,
            });
        }
    }

    // splice from the far end back so the edge keeps its index
    let mut outside = tab.borrow().outside().clone();
    let mut tab_cuts = Vec::new();
    let mut receiver_cuts = Vec::new();
    let mut hardware = Vec::new();
    let mut features = 0;
    for ((x0, x1), slot) in placed.iter().rev() {
        let cut = slot.materialize(&frame, catalog)?;
        debug!(
            kind = slot.kind(),
            from = x0,
            to = x1,
            tab = %tab.borrow().name,
            receiver = %receiver.borrow().name,
            "placing slot"
        );
        if let Some(feature) = cut.tab_feature {
            outside.insert_feature(&feature, segment as isize, Anchor::FromStart(0.0))?;
            features += 1;
        }
        tab_cuts.extend(cut.tab_insides);
        receiver_cuts.extend(cut.receiver_cuts);
        hardware.extend(
            cut.hardware
                .into_iter()
                .map(|(solid, local)| (solid, tab_placement.then(&local))),
        );
    }

    let report = JointReport {
        segment,
        length: frame.length,
        positions,
        features,
        tab_cutouts: tab_cuts.len(),
        receiver_cutouts: receiver_cuts.len(),
        hardware: hardware.len(),
    };

    // work out the receiver before touching either board
    let mut receiver_outside = receiver.borrow().outside().clone();
    let mut receiver_insides = Vec::new();
    for cut in receiver_cuts {
        if is_within(&receiver_outside, &cut) {
            receiver_insides.push(cut);
        } else {
            receiver_outside = receiver_outside.boolean_difference(&cut)?;
        }
    }
    {
        let mut part = receiver.borrow_mut();
        part.assign_outside_path(receiver_outside)?;
        part.add_insides(receiver_insides)?;
    }
    {
        let mut part = tab.borrow_mut();
        part.assign_outside_path(outside)?;
        part.add_insides(tab_cuts)?;
    }
    for (solid, placement) in hardware {
        assembly.add_child(Entity::Solid(solid), placement);
    }
    Ok(report)
}

fn is_within(region: &Path, cut: &Path) -> bool {
    cut.to_polyline(ARC_TOLERANCE)
        .iter()
        .all(|p| region.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlatPart, SolidKind};
    use cade_math::{Point2, Point3, Transform};
    use approx::assert_relative_eq;

    fn positions(layout: &[Slot]) -> Vec<(bool, f64)> {
        layout
            .iter()
            .map(|s| match s {
                Slot::CylinderNutFastener {
                    position: SlotPosition::Absolute(at),
                    ..
                } => (true, *at),
                Slot::TenonMortise {
                    position: SlotPosition::Absolute(at),
                    ..
                } => (false, *at),
                other => panic!("unexpected slot {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_default_layout_single_fastener() {
        assert_eq!(positions(&default_slot_layout(150.0)), vec![(true, 70.0)]);
        assert_eq!(positions(&default_slot_layout(100.0)), vec![(true, 50.0)]);
    }

    #[test]
    fn test_default_layout_spacing() {
        let layout = positions(&default_slot_layout(640.0));
        // ceil(640 / 250) = 3 fasteners, 2 tenons between them
        assert_eq!(layout.len(), 5);
        let expected = [(true, 70.0), (false, 195.0), (true, 320.0), (false, 445.0), (true, 570.0)];
        for ((kind, at), (want_kind, want_at)) in layout.iter().zip(expected) {
            assert_eq!(*kind, want_kind);
            assert_relative_eq!(*at, want_at, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_default_layout_fastener_positions() {
        let layout = positions(&default_slot_layout(1000.0));
        let fasteners: Vec<f64> = layout.iter().filter(|(f, _)| *f).map(|(_, at)| *at).collect();
        let tenons: Vec<f64> = layout.iter().filter(|(f, _)| !*f).map(|(_, at)| *at).collect();
        assert_eq!(fasteners.len(), 4);
        assert_eq!(tenons.len(), 3);
        assert_relative_eq!(fasteners[0], 70.0, epsilon = 1e-9);
        assert_relative_eq!(fasteners[3], 1000.0 - 70.0, epsilon = 1e-9);
        for pair in fasteners.windows(2) {
            assert_relative_eq!(pair[1] - pair[0], 860.0 / 3.0, epsilon = 1e-9);
        }
        for (k, tenon) in tenons.iter().enumerate() {
            assert_relative_eq!(*tenon, (fasteners[k] + fasteners[k + 1]) / 2.0, epsilon = 1e-9);
        }
    }

    /// A 300 x 100 board standing on the top face of a 300 x 200 plate.
    fn standing_board(lift: f64, outline: Path) -> (Assembly, FlatPartRef, FlatPartRef) {
        let plate = FlatPart::new("plate", Path::make_rect(300.0, 200.0), 15.0)
            .unwrap()
            .into_ref();
        let wall = FlatPart::new("wall", outline, 15.0).unwrap().into_ref();
        let mut asm = Assembly::new("test");
        asm.add_child(Entity::Flat(plate.clone()), Transform::identity());
        asm.add_child(
            Entity::Flat(wall.clone()),
            Transform::from_frame(Point3::new(0.0, 100.0, 15.0 + lift), -Vec3::y(), Some(Vec3::x())),
        );
        (asm, wall, plate)
    }

    #[test]
    fn test_join_with_default_layout() {
        let (mut asm, wall, plate) = standing_board(0.0, Path::make_rect(300.0, 100.0));
        let mut catalog = FastenerCatalog::new();
        let report = join_parts(&mut asm, &mut catalog, &wall, &plate, None).unwrap();
        assert_eq!(report.segment, 0);
        assert_relative_eq!(report.length, 300.0, epsilon = 1e-9);
        // two fasteners and the tenon between them
        assert_eq!(report.features, 1);
        assert_eq!(report.receiver_cutouts, 3);
        assert_eq!(plate.borrow().insides().len(), 3);
        assert_eq!(wall.borrow().insides().len(), 2);
        assert_eq!(wall.borrow().outside().len(), 8);
        assert_relative_eq!(
            wall.borrow().outside().region_area(),
            30000.0 + 30.0 * 15.0,
            epsilon = 1e-6
        );
        // bolt, washer and cylinder nut per fastener
        assert_eq!(report.hardware, 6);
        let bolts: Vec<_> = asm
            .solids()
            .into_iter()
            .filter(|(s, _)| matches!(s.kind, SolidKind::Bolt { .. }))
            .collect();
        assert_eq!(bolts.len(), 2);
        // bolts come up through the plate from below
        let (_, placement) = &bolts[0];
        assert!(placement.origin().z < 0.0);
        assert!((placement.z_axis() - Vec3::z()).norm() < 1e-9);
    }

    #[test]
    fn test_mortise_lands_under_tenon() {
        let (mut asm, wall, plate) = standing_board(0.0, Path::make_rect(300.0, 100.0));
        let mut catalog = FastenerCatalog::new();
        let layout = [Slot::tenon_mortise(0.5)];
        join_parts(&mut asm, &mut catalog, &wall, &plate, Some(&layout)).unwrap();
        let (min, max) = plate.borrow().insides()[0].bounding_box().unwrap();
        assert!(min.x < 135.0 && min.x > 130.0);
        assert!(max.x > 165.0 && max.x < 170.0);
        assert!(min.y < 85.0 && max.y > 100.0);
        let mid = Point2::new(150.0, 92.5);
        assert!(!plate.borrow().insides()[0].is_empty());
        assert!(plate.borrow().insides()[0].contains(&mid));
    }

    #[test]
    fn test_join_requires_exactly_one_edge() {
        let (mut asm, wall, plate) = standing_board(5.0, Path::make_rect(300.0, 100.0));
        let mut catalog = FastenerCatalog::new();
        assert!(matches!(
            join_parts(&mut asm, &mut catalog, &wall, &plate, None),
            Err(FlatError::NoSharedEdge { .. })
        ));

        let notched = Path::from_polyline(&[
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            Point2::new(100.0, 20.0),
            Point2::new(200.0, 20.0),
            Point2::new(200.0, 0.0),
            Point2::new(300.0, 0.0),
            Point2::new(300.0, 100.0),
            Point2::new(0.0, 100.0),
        ])
        .unwrap();
        let (mut asm, wall, plate) = standing_board(0.0, notched);
        assert!(matches!(
            join_parts(&mut asm, &mut catalog, &wall, &plate, None),
            Err(FlatError::AmbiguousSharedEdge(2))
        ));
        assert!(matches!(
            join_parts(&mut asm, &mut catalog, &plate, &plate, None),
            Err(FlatError::SamePart(_))
        ));
    }

    #[test]
    fn test_overlapping_slots_rejected() {
        let (mut asm, wall, plate) = standing_board(0.0, Path::make_rect(300.0, 100.0));
        let mut catalog = FastenerCatalog::new();
        let layout = [Slot::tenon_mortise(0.5), Slot::cylinder_nut(0.55)];
        assert!(matches!(
            join_parts(&mut asm, &mut catalog, &wall, &plate, Some(&layout)),
            Err(FlatError::SlotOverlap { .. })
        ));
        // nothing was cut
        assert!(plate.borrow().insides().is_empty());
        assert_eq!(wall.borrow().outside().len(), 4);
    }

    #[test]
    fn test_drawer_slot_carves_receiver_outline() {
        let (mut asm, wall, plate) = standing_board(0.0, Path::make_rect(300.0, 100.0));
        let mut catalog = FastenerCatalog::new();
        let layout = [Slot::drawer(false)];
        let report = join_parts(&mut asm, &mut catalog, &wall, &plate, Some(&layout)).unwrap();
        assert_eq!(report.features, 1);
        assert!(plate.borrow().insides().is_empty());
        assert!(plate.borrow().outside().len() > 4);
        assert!(plate.borrow().outside().region_area() < 60000.0);
    }

    #[test]
    fn test_center_drawer_slot_opens_front_edge() {
        let (mut asm, wall, plate) = standing_board(0.0, Path::make_rect(300.0, 100.0));
        let mut catalog = FastenerCatalog::new();
        let layout = [Slot::center_drawer(0.5)];
        let report = join_parts(&mut asm, &mut catalog, &wall, &plate, Some(&layout)).unwrap();
        assert_eq!(report.features, 1);
        assert_eq!(report.receiver_cutouts, 1);
        assert_eq!(report.hardware, 0);

        // 30 mm tenon, as deep as the plate is thick, centered on the edge
        let wall = wall.borrow();
        let outside = wall.outside();
        assert_eq!(outside.len(), 8);
        assert_relative_eq!(outside.region_area(), 30000.0 + 30.0 * 15.0, epsilon = 1e-6);
        let (min, _) = outside.bounding_box().unwrap();
        assert_relative_eq!(min.y, -15.0, epsilon = 1e-9);
        assert!(outside.contains(&Point2::new(150.0, -7.5)));
        assert!(!outside.contains(&Point2::new(120.0, -7.5)));
        assert!(wall.insides().is_empty());

        // the mortise runs out through the plate's front edge
        let plate = plate.borrow();
        assert!(plate.insides().is_empty());
        let cut = plate.outside();
        assert!(!cut.contains(&Point2::new(150.0, 50.0)));
        assert!(!cut.contains(&Point2::new(150.0, 95.0)));
        assert!(cut.contains(&Point2::new(150.0, 120.0)));
        assert!(cut.contains(&Point2::new(120.0, 50.0)));
        let removed = 60000.0 - cut.region_area();
        assert!(removed > 30.0 * 100.0 && removed < 30.0 * 100.0 + 100.0);
    }
}
