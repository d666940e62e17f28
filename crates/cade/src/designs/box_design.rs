use cade_flat::{
    face_placement, join_parts, Assembly, Entity, FastenerCatalog, FlatPart, FlatPartRef,
    JointReport, ShelfMaker, Slot, SlotPosition,
};
use cade_math::{Point2, Point3, Transform, Vec2, Vec3};
use cade_path::{Path, Recenter};
use tracing::debug;

use crate::MachineDimensions;

/// Inside width of the box, between the sides.
pub const BOX_WIDTH: f64 = 150.0;
/// Height of the sides.
pub const BOX_HEIGHT: f64 = 100.0;
/// Length of the sides.
pub const BOX_LENGTH: f64 = 200.0;

const HANDLE_WIDTH: f64 = 80.0;
const HANDLE_HEIGHT: f64 = 21.0;
const HANDLE_MARGIN: f64 = 10.0;

/// A jointed box with two sides, a bottom and two handled ends.
#[derive(Debug)]
pub struct BoxDesign {
    /// Every board and fastener.
    pub assembly: Assembly,
    /// The bottom board.
    pub bottom: FlatPartRef,
    /// Left and right sides.
    pub sides: [FlatPartRef; 2],
    /// Front and back ends.
    pub ends: [FlatPartRef; 2],
    /// One report per joint, in the order they were cut.
    pub joints: Vec<JointReport>,
}

/// `count` slots spread evenly along an edge, starting and ending with a
/// tenon and alternating with cylinder-nut fasteners.
pub fn alternating_layout(count: usize) -> Vec<Slot> {
    (0..count)
        .map(|k| {
            let at = SlotPosition::Fraction((2 * k + 1) as f64 / (2 * count) as f64);
            if k % 2 == 0 {
                Slot::tenon_mortise(at)
            } else {
                Slot::cylinder_nut(at)
            }
        })
        .collect()
}

/// Build the box from `dims`.
///
/// The sides stand on the YZ plane 150 apart. The bottom fills the space
/// between them `join_offset` above the floor, and both ends cover the
/// sides and the bottom, with a rounded handle hole near the top.
pub fn box_design(dims: &MachineDimensions) -> cade_flat::Result<BoxDesign> {
    let t = dims.wood_thickness;
    let mut catalog = FastenerCatalog::new();
    let mut assembly = Assembly::new("box");

    let side = FlatPart::new("side", Path::make_rect(BOX_LENGTH, BOX_HEIGHT), t)?.into_ref();
    let other_side = side.borrow().deep_clone();
    let upright = Transform::from_frame(Point3::origin(), Vec3::x(), None);
    assembly.add_child(Entity::Flat(side.clone()), upright.clone());
    assembly.add_child(
        Entity::Flat(other_side.clone()),
        Transform::translation(BOX_WIDTH, 0.0, 0.0).then(&upright),
    );

    let bottom_placement = Transform::translation(0.0, 0.0, dims.join_offset);
    let bottom_path = ShelfMaker::new(&bottom_placement)?
        .add_flat_part(&side, &assembly.placement_of_part(&side)?)
        .add_flat_part(&other_side, &assembly.placement_of_part(&other_side)?)
        .make()?;
    let bottom = FlatPart::new("bottom", bottom_path, t)?.into_ref();
    assembly.add_child(Entity::Flat(bottom.clone()), bottom_placement.clone());

    // the front end stands on the bottom's first edge
    let end_placement = {
        let part = bottom.borrow();
        let (min, _) = part.bounding_box().ok_or(cade_path::PathError::Empty)?;
        bottom_placement.then(&face_placement(&part, min, Vec2::x()))
    };
    let mut end_path = ShelfMaker::new(&end_placement)?
        .add_flat_part(&side, &assembly.placement_of_part(&side)?)
        .add_flat_part(&other_side, &assembly.placement_of_part(&other_side)?)
        .add_flat_part(&bottom, &bottom_placement)
        .make()?;
    let (min, max) = end_path
        .bounding_box()
        .ok_or(cade_path::PathError::Empty)?;
    let top_center = Point2::new((min.x + max.x) / 2.0, max.y);
    let handle = Path::make_rounded_rect(HANDLE_WIDTH, HANDLE_HEIGHT, dims.rounding_radius)?
        .recenter(Recenter::Both)
        .translate(top_center.coords);
    end_path.round_fillet_all(dims.rounding_radius)?;
    let end_path = end_path.boolean_union(&handle.offset(HANDLE_MARGIN)?)?;

    let mut end = FlatPart::new("end", end_path, t)?;
    end.add_inside(handle)?;
    let end = end.into_ref();
    let back = end.borrow().deep_clone();
    assembly.add_child(Entity::Flat(end.clone()), end_placement.clone());
    assembly.add_child(
        Entity::Flat(back.clone()),
        end_placement.translated(0.0, 0.0, -t - BOX_LENGTH),
    );

    let along_sides = alternating_layout(5);
    let along_ends = alternating_layout(3);
    let front_corner = [
        Slot::cylinder_nut(SlotPosition::Fraction(0.2)),
        Slot::tenon_mortise(SlotPosition::Fraction(0.5)),
    ];
    let back_corner = [
        Slot::cylinder_nut(SlotPosition::Fraction(0.8)),
        Slot::tenon_mortise(SlotPosition::Fraction(0.5)),
    ];

    let mut joints = Vec::with_capacity(8);
    let mut join = |tab: &FlatPartRef,
                    receiver: &FlatPartRef,
                    layout: &[Slot]|
     -> cade_flat::Result<()> {
        let report = join_parts(&mut assembly, &mut catalog, tab, receiver, Some(layout))?;
        debug!(
            tab = %tab.borrow().name,
            receiver = %receiver.borrow().name,
            slots = report.positions.len(),
            "joined"
        );
        joints.push(report);
        Ok(())
    };
    join(&bottom, &side, &along_sides)?;
    join(&bottom, &other_side, &along_sides)?;
    join(&bottom, &end, &along_ends)?;
    join(&bottom, &back, &along_ends)?;
    join(&side, &end, &front_corner)?;
    join(&side, &back, &back_corner)?;
    join(&other_side, &end, &front_corner)?;
    join(&other_side, &back, &back_corner)?;

    Ok(BoxDesign {
        assembly,
        bottom,
        sides: [side, other_side],
        ends: [end, back],
        joints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_alternating_layout() {
        let layout = alternating_layout(3);
        assert_eq!(layout.len(), 3);
        assert!(!layout[0].is_fastener());
        assert!(layout[1].is_fastener());
        assert!(!layout[2].is_fastener());
        let (a, b) = layout[1].interval(135.0).unwrap();
        assert_relative_eq!((a + b) / 2.0, 67.5, epsilon = 1e-9);
    }

    #[test]
    fn test_box_boards() {
        let design = box_design(&MachineDimensions::standard()).unwrap();
        assert_eq!(design.assembly.flat_parts().len(), 5);
        assert_eq!(design.joints.len(), 8);

        let bottom = design.bottom.borrow();
        let (min, max) = bottom.bounding_box().unwrap();
        // tenons reach through the sides and ends
        assert_relative_eq!(min.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(min.y, -15.0, epsilon = 1e-6);
        assert_relative_eq!(max.x - min.x, 135.0 + 30.0, epsilon = 1e-6);
        assert_relative_eq!(max.y - min.y, 200.0 + 30.0, epsilon = 1e-6);
    }

    #[test]
    fn test_box_hardware() {
        let design = box_design(&MachineDimensions::standard()).unwrap();
        // two fasteners on each long edge, one on each short edge and
        // one per corner, each with bolt, washer and cylinder nut
        let fasteners = 2 * 2 + 2 + 4;
        assert_eq!(design.assembly.solids().len(), 3 * fasteners);
        let hardware: usize = design.joints.iter().map(|j| j.hardware).sum();
        assert_eq!(hardware, 3 * fasteners);
    }

    #[test]
    fn test_box_cutouts() {
        let design = box_design(&MachineDimensions::standard()).unwrap();
        // nut pockets only
        assert_eq!(design.bottom.borrow().insides().len(), 6);
        for side in &design.sides {
            // three mortises, two bolt holes, two nut pockets
            assert_eq!(side.borrow().insides().len(), 7);
        }
        for end in &design.ends {
            let end = end.borrow();
            // handle plus the bottom's two mortises and bolt hole plus
            // the bolt holes from the sides
            assert!(end.insides().len() >= 6);
        }
    }

    #[test]
    fn test_ends_are_separate_boards() {
        let design = box_design(&MachineDimensions::desktop()).unwrap();
        let [end, back] = &design.ends;
        assert!(!std::rc::Rc::ptr_eq(end, back));
        assert_eq!(
            design.assembly.find_all(&Entity::Flat(back.clone())).len(),
            1
        );
    }
}
