//! Deriving a board that fills the space between other boards.

use cade_math::{Point2, Point3, Transform};
use cade_path::{BooleanOp, Path, ARC_TOLERANCE, EPSILON};
use geo::{ConvexHull, MultiPoint};
use tracing::debug;

use crate::locate::{project_plane, Plane};
use crate::{Assembly, Entity, FlatError, FlatPartRef, Result};

/// Builds the outline of a shelf lying in a plane.
///
/// Boards that touch the plane contribute their footprint to a convex
/// hull; boards that pass through it also have their cross-section cut
/// away. Extra outline points can be added as features.
#[derive(Debug, Clone)]
pub struct ShelfMaker {
    to_plane: Transform,
    boards: Vec<(FlatPartRef, Transform)>,
    features: Vec<Vec<Point2>>,
    zone: Option<Point2>,
}

impl ShelfMaker {
    /// Shelf in the XY plane of `plane`.
    pub fn new(plane: &Transform) -> Result<Self> {
        Ok(Self {
            to_plane: plane.inverse().ok_or(FlatError::SingularPlacement)?,
            boards: Vec::new(),
            features: Vec::new(),
            zone: None,
        })
    }

    /// Take a placed board into account.
    pub fn add_flat_part(&mut self, part: &FlatPartRef, placement: &Transform) -> &mut Self {
        self.boards.push((part.clone(), placement.clone()));
        self
    }

    /// Extend the hull with a placed outline.
    pub fn add_feature(&mut self, path: &Path, placement: &Transform) -> &mut Self {
        let to_plane = self.to_plane.then(placement);
        let points = path
            .to_polyline(ARC_TOLERANCE)
            .iter()
            .map(|p| to_plane.apply_point2(p))
            .collect();
        self.features.push(points);
        self
    }

    /// Keep the region containing this point of the plane.
    pub fn zone_point(&mut self, point: Point2) -> &mut Self {
        self.zone = Some(point);
        self
    }

    /// Outline of the shelf.
    pub fn make(&self) -> Result<Path> {
        let mut hull_points: Vec<Point2> = self.features.iter().flatten().copied().collect();
        let mut sections = Vec::new();

        for (part, placement) in &self.boards {
            let part = part.borrow();
            let to_plane = self.to_plane.then(placement);
            let thickness = part.thickness();
            let outline = part.outside().to_polyline(ARC_TOLERANCE);
            let corners: Vec<Point3> = [0.0, thickness]
                .iter()
                .flat_map(|&z| {
                    outline
                        .iter()
                        .map(move |p| Point3::new(p.x, p.y, z))
                        .collect::<Vec<_>>()
                })
                .map(|p| to_plane.apply_point(&p))
                .collect();
            let (lo, hi) = corners
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                    (lo.min(p.z), hi.max(p.z))
                });
            if hi < -EPSILON || lo > EPSILON {
                debug!(part = %part.name, "board misses the shelf plane");
                continue;
            }
            if lo < -EPSILON && hi > EPSILON {
                for section in cross_sections(&outline, thickness, &to_plane)? {
                    hull_points.extend(section.to_polyline(ARC_TOLERANCE));
                    sections.push(section);
                }
            } else {
                hull_points.extend(
                    corners
                        .iter()
                        .filter(|p| p.z.abs() <= EPSILON)
                        .map(|p| Point2::new(p.x, p.y)),
                );
            }
        }

        let hull = convex_hull(&hull_points)?;
        let mut regions = vec![hull];
        for section in &sections {
            let mut next = Vec::new();
            for region in &regions {
                next.extend(region.boolean_regions(section, BooleanOp::Difference)?);
            }
            regions = next;
        }
        debug!(regions = regions.len(), sections = sections.len(), "shelf regions");

        let chosen = match self.zone {
            Some(zone) => regions.into_iter().find(|r| r.contains(&zone)),
            None => regions
                .into_iter()
                .max_by(|a, b| a.region_area().total_cmp(&b.region_area())),
        };
        chosen.ok_or(FlatError::EmptyShelf)
    }
}

/// Cross-sections of a board passing through the plane, in plane
/// coordinates. `to_plane` maps the board's frame into the plane's.
fn cross_sections(outline: &[Point2], thickness: f64, to_plane: &Transform) -> Result<Vec<Path>> {
    let from_plane = to_plane.inverse().ok_or(FlatError::SingularPlacement)?;
    let plane = Plane::new(Point3::origin(), cade_math::Vec3::z()).transformed(&from_plane);
    let ring = Path::from_polyline(outline)?;

    // stretches of the plane's trace on each face of the board
    let mut faces = Vec::new();
    for z in [0.0, thickness] {
        let to_face = Transform::translation(0.0, 0.0, -z);
        let Some((p, d)) = project_plane(&plane.transformed(&to_face), &Transform::identity())
        else {
            // the plane runs inside the board: the whole outline is the section
            let points: Vec<Point2> = outline
                .iter()
                .map(|q| to_plane.apply_point2(q))
                .collect();
            return Ok(vec![Path::from_polyline(&points)?]);
        };
        let hits = ring.intersect_line(p, p + d, false);
        let spans: Vec<(Point3, Point3)> = hits
            .chunks_exact(2)
            .map(|pair| {
                let a = pair[0].point;
                let b = pair[1].point;
                (Point3::new(a.x, a.y, z), Point3::new(b.x, b.y, z))
            })
            .collect();
        faces.push(spans);
    }

    let mut out = Vec::new();
    for (bottom, top) in faces[0].iter().zip(&faces[1]) {
        let quad: Vec<Point2> = [bottom.0, bottom.1, top.1, top.0]
            .iter()
            .map(|p| {
                let q = to_plane.apply_point(p);
                Point2::new(q.x, q.y)
            })
            .collect();
        let section = Path::from_polyline(&quad)?;
        if section.area().abs() > EPSILON {
            out.push(section);
        }
    }
    Ok(out)
}

fn convex_hull(points: &[Point2]) -> Result<Path> {
    if points.len() < 3 {
        return Err(FlatError::EmptyShelf);
    }
    let cloud: MultiPoint<f64> = points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>().into();
    let hull = cloud.convex_hull();
    let mut ring: Vec<Point2> = hull
        .exterior()
        .coords()
        .map(|c| Point2::new(c.x, c.y))
        .collect();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() < 3 {
        return Err(FlatError::EmptyShelf);
    }
    let path = Path::from_polyline(&ring)?;
    if path.area().abs() <= EPSILON {
        return Err(FlatError::EmptyShelf);
    }
    Ok(if path.is_ccw() { path } else { path.invert() })
}

/// Shelf in `plane` between every placement of `parts` in `assembly`.
pub fn make_shelf_on_plane(
    assembly: &Assembly,
    plane: &Transform,
    parts: &[FlatPartRef],
) -> Result<Path> {
    let mut maker = ShelfMaker::new(plane)?;
    for part in parts {
        for placement in assembly.find_all(&Entity::Flat(part.clone())) {
            maker.add_flat_part(part, &placement);
        }
    }
    maker.make()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlatPart;
    use approx::assert_relative_eq;
    use cade_math::{Vec2, Vec3};

    /// Two 200 x 100 sides standing 150 apart, as in a simple box.
    fn sides() -> (Assembly, FlatPartRef) {
        let side = FlatPart::new("side", Path::make_rect(200.0, 100.0), 15.0)
            .unwrap()
            .into_ref();
        let upright = Transform::from_frame(Point3::origin(), Vec3::x(), None);
        let mut asm = Assembly::new("box");
        asm.add_child(Entity::Flat(side.clone()), upright.clone());
        asm.add_child(
            Entity::Flat(side.clone()),
            Transform::translation(150.0, 0.0, 0.0).then(&upright),
        );
        (asm, side)
    }

    #[test]
    fn test_bottom_between_sides() {
        let (asm, side) = sides();
        let bottom = make_shelf_on_plane(&asm, &Transform::translation(0.0, 0.0, 10.0), &[side])
            .unwrap();
        assert_relative_eq!(bottom.region_area(), 135.0 * 200.0, epsilon = 1e-6);
        let (min, max) = bottom.bounding_box().unwrap();
        assert_relative_eq!(min.x, 15.0, epsilon = 1e-6);
        assert_relative_eq!(max.x, 150.0, epsilon = 1e-6);
    }

    #[test]
    fn test_end_plate_covers_touching_boards() {
        let (mut asm, side) = sides();
        let bottom = FlatPart::new("bottom", Path::make_rect(135.0, 200.0), 15.0)
            .unwrap()
            .into_ref();
        asm.add_child(Entity::Flat(bottom.clone()), Transform::translation(15.0, 0.0, 10.0));
        let end_plane = Transform::from_frame(Point3::origin(), -Vec3::y(), Some(Vec3::x()));
        let end = make_shelf_on_plane(&asm, &end_plane, &[side, bottom]).unwrap();
        assert_relative_eq!(end.region_area(), 165.0 * 100.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zone_point_picks_region() {
        let (mut asm, side) = sides();
        let divider = FlatPart::new("divider", Path::make_rect(200.0, 100.0), 15.0)
            .unwrap()
            .into_ref();
        asm.add_child(
            Entity::Flat(divider.clone()),
            Transform::translation(100.0, 0.0, 0.0)
                .then(&Transform::from_frame(Point3::origin(), Vec3::x(), None)),
        );
        let plane = Transform::translation(0.0, 0.0, 50.0);
        let mut maker = ShelfMaker::new(&plane).unwrap();
        for part in [&side, &divider] {
            for placement in asm.find_all(&Entity::Flat(part.clone())) {
                maker.add_flat_part(part, &placement);
            }
        }
        let left = maker.zone_point(Point2::new(50.0, 100.0)).make().unwrap();
        assert_relative_eq!(left.region_area(), 85.0 * 200.0, epsilon = 1e-6);
        let right = maker.zone_point(Point2::new(130.0, 100.0)).make().unwrap();
        assert_relative_eq!(right.region_area(), 35.0 * 200.0, epsilon = 1e-6);
    }

    #[test]
    fn test_feature_extends_hull() {
        let (asm, side) = sides();
        let plane = Transform::translation(0.0, 0.0, 10.0);
        let mut maker = ShelfMaker::new(&plane).unwrap();
        for placement in asm.find_all(&Entity::Flat(side.clone())) {
            maker.add_flat_part(&side, &placement);
        }
        let tongue = Path::make_rect(20.0, 20.0).translate(Vec2::new(70.0, 200.0));
        maker.add_feature(&tongue, &plane);
        let shelf = maker.make().unwrap();
        let (_, max) = shelf.bounding_box().unwrap();
        assert_relative_eq!(max.y, 220.0, epsilon = 1e-6);
    }

    #[test]
    fn test_nothing_on_plane() {
        let (asm, side) = sides();
        assert!(matches!(
            make_shelf_on_plane(&asm, &Transform::translation(0.0, 0.0, 500.0), &[side]),
            Err(FlatError::EmptyShelf)
        ));
    }
}
