//! Math kernel on top of nalgebra.
//!
//! The simulation uses `f64` throughout. nalgebra supplies the value types and
//! arithmetic; this module adds the checked operations the engine relies on:
//! adjugate inversion that reports singular matrices, rotation-matrix and
//! unit-quaternion validation, similarity transforms, and the projection
//! helpers used by contact resolution and manifold constraints.

use core::f64::consts::PI;

use nalgebra::{Matrix3, Quaternion, Rotation3, Unit, UnitQuaternion, Vector3};

use crate::error::PhysicsError;

pub type Vec3 = Vector3<f64>;
pub type Mat3 = Matrix3<f64>;
pub type Quat = UnitQuaternion<f64>;

/// Absolute tolerance used for unit-length and orthogonality checks.
pub const TOLERANCE: f64 = 1e-10;

/// Determinant by the signed triple product of the columns: `c0 · (c1 × c2)`.
#[inline]
pub fn determinant(m: &Mat3) -> f64 {
    let c0: Vec3 = m.column(0).into_owned();
    let c1: Vec3 = m.column(1).into_owned();
    let c2: Vec3 = m.column(2).into_owned();
    c0.dot(&c1.cross(&c2))
}

/// Inverse by adjugate over determinant.
///
/// Fails only when the determinant is exactly zero; ill-conditioned matrices
/// are inverted as-is.
pub fn checked_inverse(m: &Mat3) -> Result<Mat3, PhysicsError> {
    let det = determinant(m);
    if det == 0.0 {
        return Err(PhysicsError::SingularMatrix { determinant: det });
    }
    let c0: Vec3 = m.column(0).into_owned();
    let c1: Vec3 = m.column(1).into_owned();
    let c2: Vec3 = m.column(2).into_owned();
    let adjugate = Mat3::from_rows(&[
        c1.cross(&c2).transpose(),
        c2.cross(&c0).transpose(),
        c0.cross(&c1).transpose(),
    ]);
    Ok(adjugate / det)
}

/// `true` when `mᵀm ≈ I` and `det(m) ≈ +1`.
pub fn is_orthogonal(m: &Mat3) -> bool {
    let gram = m.transpose() * m - Mat3::identity();
    gram.iter().all(|e| e.abs() <= TOLERANCE) && (determinant(m) - 1.0).abs() <= TOLERANCE
}

fn ensure_orthogonal(m: &Mat3) -> Result<(), PhysicsError> {
    if is_orthogonal(m) {
        Ok(())
    } else {
        Err(PhysicsError::NonOrthogonalMatrix {
            determinant: determinant(m),
        })
    }
}

/// Similarity transform `r · m · rᵀ` for an arbitrary matrix claimed to be a rotation.
pub fn similarity(m: &Mat3, r: &Mat3) -> Result<Mat3, PhysicsError> {
    ensure_orthogonal(r)?;
    Ok(r * m * r.transpose())
}

/// Similarity transform by a rotation whose orthogonality is guaranteed by its type.
#[inline]
pub fn similarity_rotation(m: &Mat3, r: &Rotation3<f64>) -> Mat3 {
    r.matrix() * m * r.matrix().transpose()
}

/// Quadratic form `d̂ᵀ · m · d̂`: how strongly `m` acts along `dir`.
pub fn magnitude_along(m: &Mat3, dir: &Vec3) -> f64 {
    match dir.try_normalize(0.0) {
        Some(d) => d.dot(&(m * d)),
        None => 0.0,
    }
}

/// Component of `v` lying in the plane with normal `normal`.
///
/// A zero normal leaves `v` untouched.
pub fn project_to_plane(v: &Vec3, normal: &Vec3) -> Vec3 {
    match normal.try_normalize(0.0) {
        Some(n) => v - n * v.dot(&n),
        None => *v,
    }
}

/// Component of `v` along `dir`. A zero direction yields the zero vector.
pub fn project_to_vector(v: &Vec3, dir: &Vec3) -> Vec3 {
    match dir.try_normalize(0.0) {
        Some(d) => d * v.dot(&d),
        None => Vec3::zeros(),
    }
}

/// Unsigned angle between two vectors in radians; zero if either is zero.
pub fn angle_between(a: &Vec3, b: &Vec3) -> f64 {
    if a.norm_squared() == 0.0 || b.norm_squared() == 0.0 {
        return 0.0;
    }
    a.angle(b)
}

/// Some unit vector perpendicular to `v`.
pub fn any_perpendicular(v: &Vec3) -> Vec3 {
    let (x, y, z) = (v.x.abs(), v.y.abs(), v.z.abs());
    let axis = if x <= y && x <= z {
        Vec3::x()
    } else if y <= z {
        Vec3::y()
    } else {
        Vec3::z()
    };
    v.cross(&axis).try_normalize(0.0).unwrap_or_else(Vec3::x)
}

/// Shortest rotation taking direction `from` onto direction `to`.
///
/// Antiparallel inputs rotate half a turn about an arbitrary perpendicular axis.
/// Zero inputs give the identity.
pub fn rotation_between(from: &Vec3, to: &Vec3) -> Quat {
    if from.norm_squared() == 0.0 || to.norm_squared() == 0.0 {
        return Quat::identity();
    }
    UnitQuaternion::rotation_between(from, to).unwrap_or_else(|| {
        let axis = Unit::new_normalize(any_perpendicular(from));
        Quat::from_axis_angle(&axis, PI)
    })
}

/// Validate a raw quaternion as a rotation.
pub fn unit_quaternion(q: Quaternion<f64>) -> Result<Quat, PhysicsError> {
    let norm = q.norm();
    if (norm - 1.0).abs() > TOLERANCE {
        return Err(PhysicsError::NonUnitQuaternion { norm });
    }
    Ok(Quat::new_unchecked(q))
}

/// Rotate `v` by a raw quaternion.
///
/// The zero quaternion is treated as "no rotation"; anything else must be unit.
pub fn rotate_by_quaternion(v: &Vec3, q: &Quaternion<f64>) -> Result<Vec3, PhysicsError> {
    if q.norm_squared() == 0.0 {
        return Ok(*v);
    }
    Ok(unit_quaternion(*q)? * v)
}

/// Rotate `v` by a matrix that must be a proper rotation.
pub fn rotate_by_matrix(v: &Vec3, m: &Mat3) -> Result<Vec3, PhysicsError> {
    ensure_orthogonal(m)?;
    Ok(m * v)
}

/// Quaternion of a rotation matrix; fails unless the matrix is a proper rotation.
pub fn quaternion_from_matrix(m: &Mat3) -> Result<Quat, PhysicsError> {
    ensure_orthogonal(m)?;
    Ok(Quat::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*m)))
}
