//! Relating boards to each other in 3D: face placements, plane
//! projections, trimming and cross-halving.

use cade_math::{left_normal, Point2, Point3, Transform, Vec2, Vec3};
use cade_path::{Path, EPSILON};
use tracing::debug;

use crate::{Assembly, Entity, FlatError, FlatPart, FlatPartRef, Result};

/// An oriented plane in 3D.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    /// A point on the plane.
    pub origin: Point3,
    /// Unit normal.
    pub normal: Vec3,
}

impl Plane {
    /// Plane through `origin` with the given normal.
    pub fn new(origin: Point3, normal: Vec3) -> Self {
        Self {
            origin,
            normal: normal.normalize(),
        }
    }

    /// The XY plane of a placement.
    pub fn from_placement(placement: &Transform) -> Self {
        Self::new(placement.origin(), placement.z_axis())
    }

    /// The plane mapped through a transform.
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self::new(
            transform.apply_point(&self.origin),
            transform.apply_vec(&self.normal),
        )
    }

    /// Signed distance of a point, positive on the normal side.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        (p - self.origin).dot(&self.normal)
    }
}

/// Placement of a board face standing on an outside edge.
///
/// The frame sits at `origin` on the contour. Its X axis runs along
/// `direction`, its Y axis along the board normal, and its Z axis points out
/// of the board across the edge (for a counter-clockwise outline).
pub fn face_placement(part: &FlatPart, origin: Point2, direction: Vec2) -> Transform {
    let d = direction.normalize();
    let outward = if part.outside().is_ccw() {
        -left_normal(&d)
    } else {
        left_normal(&d)
    };
    let z = Vec3::new(outward.x, outward.y, 0.0);
    let x = Vec3::z().cross(&z);
    Transform::from_frame(Point3::new(origin.x, origin.y, 0.0), z, Some(x))
}

/// Line where `plane` crosses the XY plane of the frame `to_local` maps
/// into, as a point and a unit direction in that frame.
///
/// Returns `None` when the plane is parallel to the XY plane.
pub fn project_plane(plane: &Plane, to_local: &Transform) -> Option<(Point2, Vec2)> {
    let local = plane.transformed(to_local);
    let n = local.normal;
    let in_plane = n.x * n.x + n.y * n.y;
    if in_plane.sqrt() < EPSILON {
        return None;
    }
    let offset = n.dot(&local.origin.coords);
    let point = Point2::new(n.x * offset / in_plane, n.y * offset / in_plane);
    let direction = Vec2::new(n.y, -n.x).normalize();
    Some((point, direction))
}

/// Origin of `entity`'s placement expressed in the plane of `part`.
pub fn locate_origin_on_flat_part(
    assembly: &Assembly,
    part: &FlatPartRef,
    entity: &Entity,
) -> Result<Point2> {
    let to_part = part_inverse(assembly, part)?;
    let placement = assembly.placement_of(entity)?;
    let p = to_part.apply_point(&placement.origin());
    Ok(Point2::new(p.x, p.y))
}

fn part_inverse(assembly: &Assembly, part: &FlatPartRef) -> Result<Transform> {
    assembly
        .placement_of_part(part)?
        .inverse()
        .ok_or(FlatError::SingularPlacement)
}

/// Cut `part` along a face of `other`.
///
/// With `keep_below` the material behind `other`'s bottom face (local
/// z <= 0) is kept; otherwise the material beyond its top face.
pub fn trim_flat_part_with_another(
    assembly: &Assembly,
    part: &FlatPartRef,
    other: &FlatPartRef,
    keep_below: bool,
) -> Result<()> {
    let to_part = part_inverse(assembly, part)?;
    let other_placement = assembly.placement_of_part(other)?;
    let to_other = other_placement
        .inverse()
        .ok_or(FlatError::SingularPlacement)?;
    let face_z = if keep_below {
        0.0
    } else {
        other.borrow().thickness()
    };
    let face = Plane::from_placement(&other_placement.translated(0.0, 0.0, face_z));
    let Some((point, direction)) = project_plane(&face, &to_part) else {
        return Err(FlatError::NotCrossing(
            part.borrow().name.clone(),
            other.borrow().name.clone(),
        ));
    };

    // which side of the line lies on the kept side of the face
    let part_to_other = to_other.then(&to_part.inverse().ok_or(FlatError::SingularPlacement)?);
    let probe = point - left_normal(&direction);
    let z = part_to_other.apply_point(&Point3::new(probe.x, probe.y, 0.0)).z - face_z;
    let keep_right = if keep_below { z < 0.0 } else { z > 0.0 };

    let trimmed = part.borrow().outside().cut_on_line(point, direction, keep_right)?;
    debug!(part = %part.borrow().name, by = %other.borrow().name, keep_below, "trimmed board");
    part.borrow_mut().assign_outside_path(trimmed)
}

/// Cross-halving joint between two boards that pass through each other.
///
/// Each board gets a slot as wide as the other is thick, running from its
/// own contour to the middle of the overlap, from opposite sides. `flip`
/// swaps which board is slotted from which side.
pub fn half_lap_cross_join(
    assembly: &Assembly,
    a: &FlatPartRef,
    b: &FlatPartRef,
    flip: bool,
) -> Result<()> {
    let not_crossing = || FlatError::NotCrossing(a.borrow().name.clone(), b.borrow().name.clone());
    let placement_a = assembly.placement_of_part(a)?;
    let placement_b = assembly.placement_of_part(b)?;
    let lap_a = CrossSection::new(&placement_a, a, &placement_b, b).ok_or_else(not_crossing)?;
    let lap_b = CrossSection::new(&placement_b, b, &placement_a, a).ok_or_else(not_crossing)?;

    // measure b's line in a's parameter
    let b_origin = lap_a.along(&lap_b.world_point(0.0));
    let sense = lap_a.world_direction.dot(&lap_b.world_direction);
    let to_a = |s: f64| b_origin + sense * s;
    let to_b = |s: f64| (s - b_origin) * sense;
    let (b0, b1) = (to_a(lap_b.span.0), to_a(lap_b.span.1));
    let (b_lo, b_hi) = (b0.min(b1), b0.max(b1));
    let lo = lap_a.span.0.max(b_lo);
    let hi = lap_a.span.1.min(b_hi);
    if hi - lo < EPSILON {
        return Err(not_crossing());
    }
    let middle = (lo + hi) / 2.0;
    let (a_slot, b_slot) = if flip {
        ((middle, lap_a.span.1), (to_b(b_lo), to_b(middle)))
    } else {
        ((lap_a.span.0, middle), (to_b(middle), to_b(b_hi)))
    };

    lap_a.cut(a, a_slot)?;
    lap_b.cut(b, b_slot)?;
    debug!(a = %a.borrow().name, b = %b.borrow().name, lo, hi, "half lap");
    Ok(())
}

/// Where another board's mid-plane crosses a board, in the board's frame.
struct CrossSection {
    point: Point2,
    direction: Vec2,
    placement: Transform,
    world_direction: Vec3,
    /// Extent of the board along the line.
    span: (f64, f64),
    /// Width of the other board's footprint across the line.
    width: f64,
}

impl CrossSection {
    fn new(
        placement: &Transform,
        part: &FlatPartRef,
        other_placement: &Transform,
        other: &FlatPartRef,
    ) -> Option<Self> {
        let to_local = placement.inverse()?;
        let other_thickness = other.borrow().thickness();
        let mid = Plane::from_placement(&other_placement.translated(0.0, 0.0, other_thickness / 2.0));
        let (point, direction) = project_plane(&mid, &to_local)?;

        let outside = part.borrow().outside().clone();
        let hits = outside.intersect_line(point, point + direction, false);
        let first = hits.first()?.t;
        let last = hits.last()?.t;
        if last - first < EPSILON {
            return None;
        }

        let n = to_local.apply_vec(&mid.normal);
        let across = (n.x * n.x + n.y * n.y).sqrt();
        Some(Self {
            point,
            direction,
            placement: placement.clone(),
            world_direction: placement
                .apply_vec(&Vec3::new(direction.x, direction.y, 0.0))
                .normalize(),
            span: (first, last),
            width: other_thickness / across.max(EPSILON),
        })
    }

    fn world_point(&self, s: f64) -> Point3 {
        let p = self.point + self.direction * s;
        self.placement.apply_point(&Point3::new(p.x, p.y, 0.0))
    }

    fn along(&self, world: &Point3) -> f64 {
        (world - self.world_point(0.0)).dot(&self.world_direction)
    }

    /// Carve the slot between two positions along the line, extended past
    /// whichever end leaves the board.
    fn cut(&self, part: &FlatPartRef, (from, to): (f64, f64)) -> Result<()> {
        let (mut lo, mut hi) = (from.min(to), from.max(to));
        if lo <= self.span.0 + EPSILON {
            lo -= self.width;
        }
        if hi >= self.span.1 - EPSILON {
            hi += self.width;
        }
        let side = left_normal(&self.direction) * (self.width / 2.0);
        let at = |s: f64| self.point + self.direction * s;
        let slot = Path::from_polyline(&[
            at(lo) - side,
            at(hi) - side,
            at(hi) + side,
            at(lo) + side,
        ])?;
        let carved = part.borrow().outside().boolean_difference(&slot)?;
        part.borrow_mut().assign_outside_path(carved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::rc::Rc;

    fn board(name: &str, w: f64, h: f64) -> FlatPartRef {
        FlatPart::new(name, Path::make_rect(w, h), 10.0)
            .unwrap()
            .into_ref()
    }

    #[test]
    fn test_face_placement_axes() {
        let part = FlatPart::new("bottom", Path::make_rect(100.0, 50.0), 15.0).unwrap();
        let t = face_placement(&part, Point2::origin(), Vec2::x());
        assert!((t.z_axis() - Vec3::new(0.0, -1.0, 0.0)).norm() < 1e-12);
        assert!((t.y_axis() - Vec3::z()).norm() < 1e-12);
        assert!((t.x_axis() - Vec3::x()).norm() < 1e-12);
        // translating the face plane backwards moves it across the board
        let back = t.translated(0.0, 0.0, -50.0);
        assert_relative_eq!(back.origin().y, 50.0, epsilon = 1e-12);
    }

    #[test]
    fn test_project_plane() {
        let plane = Plane::new(Point3::new(30.0, 0.0, 0.0), Vec3::x());
        let (p, d) = project_plane(&plane, &Transform::identity()).unwrap();
        assert_relative_eq!(p.x, 30.0, epsilon = 1e-12);
        assert_relative_eq!(d.x.abs(), 0.0, epsilon = 1e-12);
        let flat = Plane::new(Point3::new(0.0, 0.0, 5.0), Vec3::z());
        assert!(project_plane(&flat, &Transform::identity()).is_none());
    }

    #[test]
    fn test_locate_origin_on_flat_part() {
        let plate = board("plate", 200.0, 100.0);
        let motor = Entity::Solid(Rc::new(crate::Solid::new("motor")));
        let mut asm = Assembly::new("a");
        asm.add_child(Entity::Flat(plate.clone()), Transform::translation(100.0, 0.0, 0.0));
        asm.add_child(motor.clone(), Transform::translation(150.0, 40.0, 10.0));
        let p = locate_origin_on_flat_part(&asm, &plate, &motor).unwrap();
        assert_relative_eq!(p.x, 50.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 40.0, epsilon = 1e-12);
    }

    #[test]
    fn test_trim_with_another() {
        // an upright post crossed by a shelf whose underside sits at z = 60
        let post = board("post", 40.0, 100.0);
        let shelf = board("shelf", 100.0, 100.0);
        let mut asm = Assembly::new("a");
        asm.add_child(
            Entity::Flat(post.clone()),
            Transform::from_frame(Point3::origin(), -Vec3::y(), Some(Vec3::x())),
        );
        asm.add_child(
            Entity::Flat(shelf.clone()),
            Transform::translation(-20.0, -50.0, 60.0),
        );
        trim_flat_part_with_another(&asm, &post, &shelf, true).unwrap();
        assert_relative_eq!(post.borrow().outside().region_area(), 2400.0, epsilon = 1e-6);
        let (_, max) = post.borrow().bounding_box().unwrap();
        assert_relative_eq!(max.y, 60.0, epsilon = 1e-6);
    }

    #[test]
    fn test_half_lap_cross_join() {
        let a = board("a", 200.0, 60.0);
        let b = board("b", 200.0, 60.0);
        let mut asm = Assembly::new("grid");
        // a stands in the XZ plane, b in the YZ plane; they cross at x = y = 100
        asm.add_child(
            Entity::Flat(a.clone()),
            Transform::from_frame(Point3::new(0.0, 95.0, 0.0), -Vec3::y(), Some(Vec3::x())),
        );
        asm.add_child(
            Entity::Flat(b.clone()),
            Transform::from_frame(Point3::new(105.0, 0.0, 0.0), Vec3::x(), Some(Vec3::y())),
        );
        half_lap_cross_join(&asm, &a, &b, false).unwrap();
        let area_a = a.borrow().outside().region_area();
        let area_b = b.borrow().outside().region_area();
        // each board loses a 10 wide slot through half its height
        assert_relative_eq!(area_a, 12000.0 - 300.0, epsilon = 1e-3);
        assert_relative_eq!(area_b, 12000.0 - 300.0, epsilon = 1e-3);
    }
}
