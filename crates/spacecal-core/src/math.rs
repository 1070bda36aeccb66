//! Mathematical type aliases and rotation conversion helpers.
//!
//! Quaternions use the Hamilton convention with scalar-first storage
//! `(w, x, y, z)`. Euler angles use the ZYX order throughout: component 0
//! rotates about Z, component 1 about Y, component 2 about X, composed as
//! `Rz(e0) * Ry(e1) * Rx(e2)` with the rightmost applied first. With Y up,
//! component 1 is yaw, component 2 is pitch and component 0 is roll.
//!
//! All functions here are pure and operate on fixed-size types.

use nalgebra::{
    Matrix3, Matrix4, Quaternion, Rotation3, UnitQuaternion, Vector3, Vector4,
};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 4D vector with [`Real`] components (homogeneous points).
pub type Vec4 = Vector4<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 4×4 matrix with [`Real`] entries.
pub type Mat4 = Matrix4<Real>;
/// Hamilton quaternion with [`Real`] components, scalar-first `(w, x, y, z)`.
pub type Quat = Quaternion<Real>;

/// Hamilton product of two quaternions.
pub fn quat_mul(lhs: &Quat, rhs: &Quat) -> Quat {
    lhs * rhs
}

/// Rotate a vector by a unit quaternion via conjugation `q * v * q^-1`.
///
/// `q` must be unit length.
pub fn quat_rotate_vec(q: &Quat, v: &Vec3) -> Vec3 {
    UnitQuaternion::new_unchecked(*q).transform_vector(v)
}

/// Rotation matrix of a unit quaternion.
///
/// `q` must be unit length.
pub fn quat_to_mat(q: &Quat) -> Mat3 {
    UnitQuaternion::new_unchecked(*q)
        .to_rotation_matrix()
        .into_inner()
}

/// Unit quaternion for ZYX Euler angles given in degrees.
///
/// Composes `Rz(e[0]) * Ry(e[1]) * Rx(e[2])`, rightmost applied first.
pub fn euler_zyx_to_quat(euler_deg: &Vec3) -> Quat {
    let e = euler_deg * (std::f64::consts::PI / 180.0);
    let q = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), e[0])
        * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), e[1])
        * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), e[2]);
    q.into_inner()
}

/// ZYX Euler angles (degrees) of a rotation matrix.
///
/// Inverse of [`euler_zyx_to_quat`] up to the principal branch: component 0
/// is the angle about Z, component 1 about Y, component 2 about X.
pub fn euler_zyx_from_mat(rot: &Mat3) -> Vec3 {
    let (roll_x, pitch_y, yaw_z) = Rotation3::from_matrix_unchecked(*rot).euler_angles();
    Vec3::new(yaw_z, pitch_y, roll_x) * (180.0 / std::f64::consts::PI)
}

/// Unnormalized rotation axis of a rotation matrix.
///
/// Returns `(R21 - R12, R02 - R20, R10 - R01)`; the magnitude grows with
/// the sine of the rotation angle, which makes it usable as a validity
/// check for near-identity rotations.
pub fn axis_from_rotation(rot: &Mat3) -> Vec3 {
    Vec3::new(
        rot[(2, 1)] - rot[(1, 2)],
        rot[(0, 2)] - rot[(2, 0)],
        rot[(1, 0)] - rot[(0, 1)],
    )
}

/// Rotation angle in radians of a rotation matrix.
///
/// `acos((trace(R) - 1) / 2)`, clamped for numerical safety.
pub fn angle_from_rotation(rot: &Mat3) -> Real {
    (((rot.trace() - 1.0) / 2.0).clamp(-1.0, 1.0)).acos()
}
