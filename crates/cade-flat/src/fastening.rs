//! Bolting sub-parts to boards.
//!
//! A sub-part (a bracket, a motor mount, a rail) describes the holes it
//! expects as [`HoleSpec`]s in its own frame. The helpers here follow those
//! holes into a board at every placement of the sub-part, drill the board
//! and add the hardware.

use std::rc::Rc;

use cade_math::{Point2, Point3, Transform, Vec3};
use cade_path::Path;
use tracing::{debug, warn};

use crate::fasteners::{FastenerCatalog, MetricSize, CYLINDER_NUT_DIAMETER};
use crate::slots::DEFAULT_NUT_OFFSET;
use crate::{
    Assembly, Entity, FlatError, FlatPartRef, Result, Solid, HOLE_PLACEMENT_TOLERANCE,
};

/// A hole a sub-part expects a bolt through.
///
/// `hole` lies in the XY plane of `transform`, which is relative to the
/// sub-part. The Z axis of `transform` points from the mating face into the
/// sub-part; `depth` is how much of the sub-part the bolt passes through
/// or threads into.
#[derive(Debug, Clone, PartialEq)]
pub struct HoleSpec {
    /// Hole outline.
    pub hole: Path,
    /// Depth along the hole axis.
    pub depth: f64,
    /// Hole frame in the sub-part's frame.
    pub transform: Transform,
}

impl HoleSpec {
    /// Round hole of `diameter`.
    pub fn new(diameter: f64, depth: f64, transform: Transform) -> Self {
        Self {
            hole: Path::make_circle(diameter / 2.0),
            depth,
            transform,
        }
    }

    /// Width of the hole outline.
    pub fn diameter(&self) -> f64 {
        self.hole
            .bounding_box()
            .map(|(min, max)| max.x - min.x)
            .unwrap_or(0.0)
    }
}

/// Knobs shared by the fastening helpers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastenOptions {
    /// Skip holes that miss the board with a warning instead of failing.
    pub ignore_misplaced_holes: bool,
    /// Distance from the board edge to a cylinder nut axis (mm).
    pub nut_offset: f64,
}

impl Default for FastenOptions {
    fn default() -> Self {
        Self {
            ignore_misplaced_holes: false,
            nut_offset: DEFAULT_NUT_OFFSET,
        }
    }
}

/// A bolt placed by one of the fastening helpers.
#[derive(Debug, Clone)]
pub struct FastenerMount {
    /// The bolt solid.
    pub bolt: Rc<Solid>,
    /// Bolt placement in the assembly: origin under the head, Z down the
    /// shank.
    pub placement: Transform,
    /// Thread size.
    pub size: MetricSize,
    /// Shank length.
    pub length: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joint {
    Through,
    Threaded,
    Edge,
}

/// Bolt a sub-part to a board face with bolts through both and nuts on the
/// sub-part's side.
pub fn fasten_subpart_to_flat_part<F, I>(
    assembly: &mut Assembly,
    catalog: &mut FastenerCatalog,
    subpart: &Entity,
    part: &FlatPartRef,
    holes: F,
    options: FastenOptions,
) -> Result<Vec<FastenerMount>>
where
    F: Fn() -> I,
    I: IntoIterator<Item = HoleSpec>,
{
    fasten(assembly, catalog, subpart, part, holes, options, Joint::Through)
}

/// Bolt a sub-part to a board face with bolts through the board threading
/// into the sub-part.
pub fn bolt_threaded_subpart_to_flat_part<F, I>(
    assembly: &mut Assembly,
    catalog: &mut FastenerCatalog,
    subpart: &Entity,
    part: &FlatPartRef,
    holes: F,
    options: FastenOptions,
) -> Result<Vec<FastenerMount>>
where
    F: Fn() -> I,
    I: IntoIterator<Item = HoleSpec>,
{
    fasten(assembly, catalog, subpart, part, holes, options, Joint::Threaded)
}

/// Bolt a sub-part against a board edge with bolts through the sub-part
/// into cylinder nuts set in the board.
pub fn fasten_subpart_to_flat_part_edge<F, I>(
    assembly: &mut Assembly,
    catalog: &mut FastenerCatalog,
    subpart: &Entity,
    part: &FlatPartRef,
    holes: F,
    options: FastenOptions,
) -> Result<Vec<FastenerMount>>
where
    F: Fn() -> I,
    I: IntoIterator<Item = HoleSpec>,
{
    fasten(assembly, catalog, subpart, part, holes, options, Joint::Edge)
}

fn fasten<F, I>(
    assembly: &mut Assembly,
    catalog: &mut FastenerCatalog,
    subpart: &Entity,
    part: &FlatPartRef,
    holes: F,
    options: FastenOptions,
    joint: Joint,
) -> Result<Vec<FastenerMount>>
where
    F: Fn() -> I,
    I: IntoIterator<Item = HoleSpec>,
{
    let placements = assembly.find_all(subpart);
    if placements.is_empty() {
        return Err(FlatError::NotInAssembly(subpart.name()));
    }
    let board = assembly.placement_of_part(part)?;
    let to_board = board.inverse().ok_or(FlatError::SingularPlacement)?;
    let (name, thickness, outside) = {
        let p = part.borrow();
        (p.name.clone(), p.thickness(), p.outside().clone())
    };

    let mut cutouts = Vec::new();
    let mut hardware: Vec<(Rc<Solid>, Transform)> = Vec::new();
    let mut mounts = Vec::new();
    for placement in &placements {
        for (index, spec) in holes().into_iter().enumerate() {
            let local = to_board.then(placement).then(&spec.transform);
            let entry = local.origin();
            let axis = local.z_axis().normalize();
            let diameter = spec.diameter();

            let fit = match joint {
                Joint::Edge => check_edge(&outside, thickness, &entry, &axis),
                Joint::Through | Joint::Threaded => check_face(&outside, thickness, &entry, &axis),
            };
            let along = match fit {
                Ok(along) => along,
                Err(reason) if options.ignore_misplaced_holes => {
                    warn!(part = %name, hole = index, %reason, "skipping misplaced fastener hole");
                    continue;
                }
                Err(reason) => {
                    return Err(FlatError::MisplacedHole {
                        part: name,
                        index,
                        reason,
                    })
                }
            };

            let size = MetricSize::from_diameter(diameter)?;
            let washer = size.washer_thickness();
            let (bolt, bolt_at) = match joint {
                Joint::Through | Joint::Threaded => {
                    // `along` runs from the mating face into the board
                    let far = entry.z + along * thickness;
                    let seat = Point3::new(entry.x, entry.y, far + along * washer);
                    let bolt_at = Transform::from_frame(seat, Vec3::z() * -along, None);
                    cutouts.push(spec.hole.transformed(&local));
                    let clamp = thickness + spec.depth;
                    if joint == Joint::Through {
                        let kit = catalog.get_fastener_kit(diameter, clamp, true)?;
                        let nut = Point3::new(entry.x, entry.y, entry.z - along * spec.depth);
                        hardware.push((
                            kit.nut,
                            board.then(&Transform::from_frame(nut, Vec3::z() * -along, None)),
                        ));
                        hardware.push((kit.washer, board.then(&bolt_at)));
                        (kit.bolt, bolt_at)
                    } else {
                        let kit = catalog.get_fastener_kit(diameter, clamp, false)?;
                        hardware.push((kit.washer, board.then(&bolt_at)));
                        (kit.bolt, bolt_at)
                    }
                }
                Joint::Edge => {
                    let kit = catalog.bolt_and_barrel_nut(diameter, spec.depth + options.nut_offset)?;
                    let seat = entry + axis * (spec.depth + washer);
                    let bolt_at = Transform::from_frame(seat, -axis, None);
                    let pocket = Point2::new(entry.x, entry.y)
                        - Point2::new(axis.x, axis.y).coords * options.nut_offset;
                    cutouts.push(
                        Path::make_circle(CYLINDER_NUT_DIAMETER / 2.0).translate(pocket.coords),
                    );
                    let nut_at = Transform::from_frame(
                        Point3::new(pocket.x, pocket.y, thickness / 2.0),
                        Vec3::z(),
                        Some(axis),
                    );
                    hardware.push((kit.cylinder_nut, board.then(&nut_at)));
                    hardware.push((kit.washer, board.then(&bolt_at)));
                    (kit.bolt, bolt_at)
                }
            };
            let length = match bolt.kind {
                crate::SolidKind::Bolt { length, .. } => length,
                _ => 0.0,
            };
            let placement = board.then(&bolt_at);
            hardware.push((bolt.clone(), placement.clone()));
            mounts.push(FastenerMount {
                bolt,
                placement,
                size,
                length,
            });
        }
    }

    debug!(part = %name, bolts = mounts.len(), ?joint, "fastened sub-part");
    part.borrow_mut().add_insides(cutouts)?;
    for (solid, placement) in hardware {
        assembly.add_child(Entity::Solid(solid), placement);
    }
    Ok(mounts)
}

/// Direction from the mating face into the board (+1 or -1 along Z).
fn check_face(
    outside: &Path,
    thickness: f64,
    entry: &Point3,
    axis: &Vec3,
) -> std::result::Result<f64, String> {
    if axis.z.abs() < 1.0 - 1e-6 {
        return Err("axis is not normal to the board".to_string());
    }
    let (bottom, top) = (entry.z.abs(), (entry.z - thickness).abs());
    let distance = bottom.min(top);
    if distance > HOLE_PLACEMENT_TOLERANCE {
        return Err(format!("entry is {distance:.2}mm from the nearest face"));
    }
    if !outside.contains(&Point2::new(entry.x, entry.y)) {
        return Err("center falls outside the board".to_string());
    }
    Ok(if bottom <= top { 1.0 } else { -1.0 })
}

/// The axis must lie in the board plane and cross the outside contour
/// at the entry point.
fn check_edge(
    outside: &Path,
    thickness: f64,
    entry: &Point3,
    axis: &Vec3,
) -> std::result::Result<f64, String> {
    if axis.z.abs() > 1e-6 {
        return Err("axis is not in the board plane".to_string());
    }
    let tol = HOLE_PLACEMENT_TOLERANCE;
    if entry.z < -tol || entry.z > thickness + tol {
        return Err(format!("entry at z = {:.2} misses the board", entry.z));
    }
    let e = Point2::new(entry.x, entry.y);
    let a = cade_math::Vec2::new(axis.x, axis.y).normalize();
    if !outside.contains(&(e - a * tol)) || outside.contains(&(e + a * tol)) {
        return Err("entry is not on the board edge".to_string());
    }
    Ok(1.0)
}

/// Drill clearance for bolt heads of `mounts` that would hit `part`.
///
/// Bolts that pass through the board are left alone. Returns the number
/// of holes cut.
pub fn clear_bolts_on_flat_part(
    assembly: &Assembly,
    part: &FlatPartRef,
    mounts: &[FastenerMount],
    clearance: f64,
) -> Result<usize> {
    let to_board = assembly
        .placement_of_part(part)?
        .inverse()
        .ok_or(FlatError::SingularPlacement)?;
    let (thickness, outside) = {
        let p = part.borrow();
        (p.thickness(), p.outside().clone())
    };
    let overlaps = |a: f64, b: f64, lo: f64, hi: f64| a.min(b) < hi && a.max(b) > lo;

    let mut holes = Vec::new();
    for mount in mounts {
        let local = to_board.then(&mount.placement);
        let o = local.origin();
        let axis = local.z_axis().normalize();
        if axis.z.abs() < 1.0 - 1e-6 {
            continue;
        }
        let shank_end = o.z + axis.z * mount.length;
        if overlaps(o.z, shank_end, 0.0, thickness) {
            continue;
        }
        let head_top = o.z - axis.z * mount.size.head_height();
        if !overlaps(o.z, head_top, -clearance, thickness + clearance) {
            continue;
        }
        let center = Point2::new(o.x, o.y);
        if !outside.contains(&center) {
            continue;
        }
        let radius = mount.size.washer_diameter() / 2.0 + clearance;
        holes.push(Path::make_circle(radius).translate(center.coords));
    }
    let count = holes.len();
    part.borrow_mut().add_insides(holes)?;
    debug!(part = %part.borrow().name, count, "cleared bolt heads");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlatPart, SolidKind};
    use approx::assert_relative_eq;

    fn setup() -> (Assembly, FlatPartRef, Entity) {
        let board = FlatPart::new("plate", Path::make_rect(200.0, 100.0), 15.0)
            .unwrap()
            .into_ref();
        let bracket = Entity::Solid(Rc::new(Solid::new("bracket")));
        let mut asm = Assembly::new("test");
        asm.add_child(Entity::Flat(board.clone()), Transform::identity());
        asm.add_child(bracket.clone(), Transform::translation(50.0, 50.0, 15.0));
        asm.add_child(bracket.clone(), Transform::translation(120.0, 50.0, 15.0));
        (asm, board, bracket)
    }

    fn bracket_holes() -> Vec<HoleSpec> {
        vec![
            HoleSpec::new(6.0, 5.0, Transform::identity()),
            HoleSpec::new(6.0, 5.0, Transform::translation(20.0, 0.0, 0.0)),
        ]
    }

    #[test]
    fn test_through_bolts_every_placement() {
        let (mut asm, board, bracket) = setup();
        let mut catalog = FastenerCatalog::new();
        let mounts = fasten_subpart_to_flat_part(
            &mut asm,
            &mut catalog,
            &bracket,
            &board,
            bracket_holes,
            FastenOptions::default(),
        )
        .unwrap();
        assert_eq!(mounts.len(), 4);
        assert_eq!(board.borrow().insides().len(), 4);
        // 15 + 5 clamped, plus nut and margin
        assert_relative_eq!(mounts[0].length, 30.0);
        // heads under the board, shanks pointing up
        let p = &mounts[0].placement;
        assert_relative_eq!(p.origin().z, -1.6, epsilon = 1e-9);
        assert!((p.z_axis() - Vec3::z()).norm() < 1e-9);
        // bolt, washer and nut per hole on top of the two brackets and the board
        assert_eq!(asm.len(), 3 + 4 * 3);
    }

    #[test]
    fn test_threaded_bolts_skip_nut() {
        let (mut asm, board, bracket) = setup();
        let mut catalog = FastenerCatalog::new();
        let mounts = bolt_threaded_subpart_to_flat_part(
            &mut asm,
            &mut catalog,
            &bracket,
            &board,
            bracket_holes,
            FastenOptions::default(),
        )
        .unwrap();
        assert_relative_eq!(mounts[0].length, 20.0);
        let nuts = asm
            .solids()
            .iter()
            .filter(|(s, _)| matches!(s.kind, SolidKind::Nut { .. }))
            .count();
        assert_eq!(nuts, 0);
    }

    #[test]
    fn test_misplaced_hole() {
        let (mut asm, board, bracket) = setup();
        let mut catalog = FastenerCatalog::new();
        let tilted = || {
            vec![HoleSpec::new(
                6.0,
                5.0,
                Transform::from_frame(Point3::origin(), Vec3::x(), None),
            )]
        };
        let err = fasten_subpart_to_flat_part(
            &mut asm,
            &mut catalog,
            &bracket,
            &board,
            tilted,
            FastenOptions::default(),
        );
        assert!(matches!(err, Err(FlatError::MisplacedHole { index: 0, .. })));

        let options = FastenOptions {
            ignore_misplaced_holes: true,
            ..FastenOptions::default()
        };
        let mounts =
            fasten_subpart_to_flat_part(&mut asm, &mut catalog, &bracket, &board, tilted, options)
                .unwrap();
        assert!(mounts.is_empty());
        assert!(board.borrow().insides().is_empty());
    }

    #[test]
    fn test_edge_fastening_sets_cylinder_nut() {
        let board = FlatPart::new("plate", Path::make_rect(200.0, 100.0), 15.0)
            .unwrap()
            .into_ref();
        let rail = Entity::Solid(Rc::new(Solid::new("rail")));
        let mut asm = Assembly::new("test");
        asm.add_child(Entity::Flat(board.clone()), Transform::identity());
        asm.add_child(
            rail.clone(),
            Transform::from_frame(Point3::new(100.0, 0.0, 7.5), -Vec3::y(), None),
        );
        let mut catalog = FastenerCatalog::new();
        let mounts = fasten_subpart_to_flat_part_edge(
            &mut asm,
            &mut catalog,
            &rail,
            &board,
            || [HoleSpec::new(6.0, 10.0, Transform::identity())],
            FastenOptions::default(),
        )
        .unwrap();
        assert_eq!(mounts.len(), 1);
        assert_relative_eq!(mounts[0].length, 40.0);
        let (min, max) = board.borrow().insides()[0].bounding_box().unwrap();
        assert_relative_eq!((min.y + max.y) / 2.0, 20.0, epsilon = 1e-9);
        assert_relative_eq!(max.x - min.x, CYLINDER_NUT_DIAMETER, epsilon = 1e-9);
        // the bolt points back into the board edge
        assert!((mounts[0].placement.z_axis() - Vec3::y()).norm() < 1e-9);
    }

    #[test]
    fn test_clear_bolt_heads_on_board_below() {
        let (mut asm, board, bracket) = setup();
        let shelf = FlatPart::new("shelf", Path::make_rect(200.0, 100.0), 15.0)
            .unwrap()
            .into_ref();
        asm.add_child(Entity::Flat(shelf.clone()), Transform::translation(0.0, 0.0, -20.0));
        let mut catalog = FastenerCatalog::new();
        let mounts = fasten_subpart_to_flat_part(
            &mut asm,
            &mut catalog,
            &bracket,
            &board,
            bracket_holes,
            FastenOptions::default(),
        )
        .unwrap();
        assert_eq!(clear_bolts_on_flat_part(&asm, &shelf, &mounts, 1.0).unwrap(), 4);
        assert_eq!(shelf.borrow().insides().len(), 4);
        // the plate itself is clamped by these bolts
        assert_eq!(clear_bolts_on_flat_part(&asm, &board, &mounts, 1.0).unwrap(), 0);
    }
}
