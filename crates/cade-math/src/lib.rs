#![warn(missing_docs)]

//! Math types for the cade parametric design tools.
//!
//! Thin wrappers around nalgebra providing domain-specific types for
//! sheet-stock design: points, vectors, placements (4x4 affine
//! transforms), coordinate frames, and tolerance constants.

mod planar;

pub use planar::{
    arc_center, cross2, distance_to_line, intersect_circles, intersect_line_circle,
    intersect_lines, left_normal, place_along, project_on_line, rotate_vec2, LineHit,
};

use nalgebra::{Matrix4, Unit, Vector2, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in the 2D plane of a board or sketch.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// A 4x4 affine transformation matrix.
///
/// Placements are rigid in normal use; mirrored assemblies introduce
/// reflections, which every consumer of this type must tolerate.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Rotation about an arbitrary axis through the origin by `angle` radians.
    ///
    /// Uses Rodrigues' rotation formula.
    pub fn rotation_about_axis(axis: &Dir3, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.as_ref().x, axis.as_ref().y, axis.as_ref().z);
        let mut m = Matrix4::identity();
        m[(0, 0)] = t * x * x + c;
        m[(0, 1)] = t * x * y - s * z;
        m[(0, 2)] = t * x * z + s * y;
        m[(1, 0)] = t * x * y + s * z;
        m[(1, 1)] = t * y * y + c;
        m[(1, 2)] = t * y * z - s * x;
        m[(2, 0)] = t * x * z - s * y;
        m[(2, 1)] = t * y * z + s * x;
        m[(2, 2)] = t * z * z + c;
        Self { matrix: m }
    }

    /// Reflection across the plane through the origin with the given normal.
    pub fn reflection(normal: &Vec3) -> Self {
        let n = normal.normalize();
        let mut m = Matrix4::identity();
        for i in 0..3 {
            for j in 0..3 {
                m[(i, j)] -= 2.0 * n[i] * n[j];
            }
        }
        Self { matrix: m }
    }

    /// Placement whose local Z axis is `z`, local X axis is `x` (projected
    /// to be orthogonal to `z`), and whose origin sits at `origin`.
    ///
    /// When `x` is `None` the world X axis is used, or the world Y axis if
    /// `z` is parallel to X. The local Y axis completes a right-handed frame.
    pub fn from_frame(origin: Point3, z: Vec3, x: Option<Vec3>) -> Self {
        let z = z.normalize();
        let candidate = match x {
            Some(x) if x.cross(&z).norm() > Tolerance::DEFAULT.linear => x,
            _ if z.x.abs() < 1.0 - 1e-6 => Vec3::x(),
            _ => Vec3::y(),
        };
        let x = (candidate - z * candidate.dot(&z)).normalize();
        let y = z.cross(&x);
        let mut m = Matrix4::identity();
        for i in 0..3 {
            m[(i, 0)] = x[i];
            m[(i, 1)] = y[i];
            m[(i, 2)] = z[i];
        }
        m[(0, 3)] = origin.x;
        m[(1, 3)] = origin.y;
        m[(2, 3)] = origin.z;
        Self { matrix: m }
    }

    /// Compose: `self` then `other` (self * other).
    ///
    /// The result maps a point through `other` first, then through `self`,
    /// which is how child placements nest inside parent placements.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Translation expressed in this transform's local frame.
    pub fn translated(&self, dx: f64, dy: f64, dz: f64) -> Self {
        self.then(&Self::translation(dx, dy, dz))
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation, applies rotation/scale).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Transform a point of the local XY plane and drop the resulting Z.
    pub fn apply_point2(&self, p: &Point2) -> Point2 {
        let q = self.apply_point(&Point3::new(p.x, p.y, 0.0));
        Point2::new(q.x, q.y)
    }

    /// Inverse of this transform, if it exists.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }

    /// Origin of the local frame.
    pub fn origin(&self) -> Point3 {
        Point3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }

    /// Local X axis expressed in the parent frame.
    pub fn x_axis(&self) -> Vec3 {
        self.apply_vec(&Vec3::x())
    }

    /// Local Y axis expressed in the parent frame.
    pub fn y_axis(&self) -> Vec3 {
        self.apply_vec(&Vec3::y())
    }

    /// Local Z axis expressed in the parent frame.
    pub fn z_axis(&self) -> Vec3 {
        self.apply_vec(&Vec3::z())
    }

    /// Whether the linear part flips handedness.
    pub fn is_reflection(&self) -> bool {
        self.matrix.fixed_view::<3, 3>(0, 0).clone_owned().determinant() < 0.0
    }

    /// Rigid placement mapping `from.0` to `to.0` and the direction `from.1`
    /// onto `to.1`.
    ///
    /// With `twist`, the residual rotation about the target axis is chosen so
    /// that `twist.0` (source frame) lines up with `twist.1` (target frame)
    /// once both are projected orthogonally to the target axis.
    pub fn locate_with_constraints(
        from: (Point3, Vec3),
        to: (Point3, Vec3),
        twist: Option<(Vec3, Vec3)>,
    ) -> Self {
        let a = from.1.normalize();
        let b = to.1.normalize();
        let mut rotation = align_vectors(&a, &b);

        if let Some((src_up, dst_up)) = twist {
            let rotated = rotation.apply_vec(&src_up);
            let p = rotated - b * rotated.dot(&b);
            let q = dst_up - b * dst_up.dot(&b);
            if p.norm() > Tolerance::DEFAULT.linear && q.norm() > Tolerance::DEFAULT.linear {
                let angle = p.cross(&q).dot(&b).atan2(p.dot(&q));
                let spin = Self::rotation_about_axis(&Dir3::new_normalize(b), angle);
                rotation = spin.then(&rotation);
            }
        }

        Self::translation(to.0.x, to.0.y, to.0.z)
            .then(&rotation)
            .then(&Self::translation(-from.0.x, -from.0.y, -from.0.z))
    }
}

/// Minimal rotation taking unit vector `a` onto unit vector `b`.
fn align_vectors(a: &Vec3, b: &Vec3) -> Transform {
    let axis = a.cross(b);
    let dot = a.dot(b);
    if axis.norm() < 1e-12 {
        if dot > 0.0 {
            return Transform::identity();
        }
        let helper = if a.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
        let perpendicular = Dir3::new_normalize(a.cross(&helper));
        return Transform::rotation_about_axis(&perpendicular, std::f64::consts::PI);
    }
    let angle = axis.norm().atan2(dot);
    Transform::rotation_about_axis(&Dir3::new_normalize(axis), angle)
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tolerance constants for geometric comparisons.
///
/// Coordinates are millimeters; the same linear tolerance governs point
/// equality, collinearity, and closedness checks.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in mm.
    pub linear: f64,
}

impl Tolerance {
    /// Default tolerance (1e-6 mm).
    pub const DEFAULT: Self = Self { linear: 1e-6 };
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}
