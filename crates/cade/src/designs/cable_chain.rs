use std::f64::consts::PI;
use std::rc::Rc;

use cade_flat::{Assembly, Entity, Solid};
use cade_math::{Point2, Point3, Transform, Vec3};
use cade_path::Path;

/// Distance between two link pivots.
pub const LINK_PITCH: f64 = 13.0;

/// Outside height of a link.
pub const LINK_HEIGHT: f64 = 9.0 + 2.0 * 1.2;

/// Length of chain a design gets when it does not ask for one.
pub const DEFAULT_CHAIN_LENGTH: f64 = 700.0;

/// Curve the link pivots follow: a straight run, a half turn of diameter
/// `delta_z`, and a run back to `delta_x` on the upper level.
pub fn chain_directrix(delta_x: f64, delta_z: f64, overall_length: f64) -> cade_path::Result<Path> {
    let turn_length = delta_z * PI / 2.0;
    let middle = overall_length - turn_length + delta_x / 2.0;
    let mut directrix = Path::new();
    directrix
        .move_to(Point2::origin())?
        .line_to(Point2::new(middle, 0.0))
        .arc(Point2::new(middle, delta_z), delta_z / 2.0, true)?
        .line_to(Point2::new(delta_x, delta_z));
    Ok(directrix)
}

/// A cable chain whose ends sit `delta_x` apart horizontally and `delta_z`
/// vertically.
///
/// One link goes between every pair of consecutive pivots along the
/// directrix, turned to face the next pivot; the first and last links are
/// the mounting brackets.
pub fn cable_chain_links(
    delta_x: f64,
    delta_z: f64,
    overall_length: f64,
) -> cade_flat::Result<Assembly> {
    let directrix = chain_directrix(delta_x, delta_z, overall_length)?;
    let pivots: Vec<Point2> = directrix.equidistant_points(LINK_PITCH)?.collect();

    let link = Rc::new(Solid::new("chain element"));
    let start = Rc::new(Solid::new("start chain element"));
    let end = Rc::new(Solid::new("end chain element"));

    let mut chain = Assembly::new(format!("cable chain {delta_z}"));
    let stand_up = Transform::from_frame(Point3::new(0.0, 0.0, LINK_HEIGHT / 2.0), -Vec3::y(), None);
    let count = pivots.len().saturating_sub(1);
    for (i, pair) in pivots.windows(2).enumerate() {
        let (here, next) = (pair[0], pair[1]);
        let dir = next - here;
        let solid = if i == 0 {
            &start
        } else if i + 1 == count {
            &end
        } else {
            &link
        };
        let placement = stand_up.then(&Transform::from_frame(
            Point3::new(here.x, here.y, 0.0),
            Vec3::z(),
            Some(Vec3::new(dir.x, dir.y, 0.0)),
        ));
        chain.add_child(Entity::Solid(solid.clone()), placement);
    }
    Ok(chain)
}
