//! Paired-pose data model.
//!
//! A [`Pose`] is a rigid transform split into a rotation matrix and a
//! translation vector, as delivered by a room-scale tracking runtime. A
//! [`Sample`] pairs one reference-universe pose with one target-universe
//! pose drawn in the same tick; a [`DSample`] holds the rotation axes of
//! the motion between two samples, one axis per tracked body.

use crate::math::{Mat3, Mat4, Real, Vec3};
use serde::{Deserialize, Serialize};

/// Rigid pose: proper rotation `rot` and translation `trans` in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Orthonormal rotation matrix with determinant +1.
    pub rot: Mat3,
    /// Translation in metres.
    pub trans: Vec3,
}

impl Pose {
    /// Identity pose.
    pub fn identity() -> Self {
        Self {
            rot: Mat3::identity(),
            trans: Vec3::zeros(),
        }
    }

    /// Build a pose from a row-major 3×4 device-to-absolute affine matrix.
    pub fn from_affine34(m: &[[Real; 4]; 3]) -> Self {
        let mut rot = Mat3::zeros();
        for (i, row) in m.iter().enumerate() {
            for j in 0..3 {
                rot[(i, j)] = row[j];
            }
        }
        Self {
            rot,
            trans: Vec3::new(m[0][3], m[1][3], m[2][3]),
        }
    }

    /// Homogeneous 4×4 form of the pose.
    pub fn to_affine(&self) -> Mat4 {
        let mut matrix = Mat4::identity();
        for i in 0..3 {
            for j in 0..3 {
                matrix[(i, j)] = self.rot[(i, j)];
            }
            matrix[(i, 3)] = self.trans[i];
        }
        matrix
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Apply a rigid transform `(trans, rot)` to a pose.
///
/// Returns `Pose(rot * pose.rot, trans + rot * pose.trans)`.
pub fn apply_transform(pose: &Pose, trans: &Vec3, rot: &Mat3) -> Pose {
    Pose {
        rot: rot * pose.rot,
        trans: trans + rot * pose.trans,
    }
}

/// One paired observation of the rigidly attached bodies.
///
/// `valid` is only set when both poses came from tracking-valid devices
/// within the same runtime query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sample {
    /// Pose of the reference device in its own universe.
    pub reference: Pose,
    /// Pose of the target device in its own universe.
    pub target: Pose,
    /// Whether both poses were tracking-valid when drawn.
    pub valid: bool,
}

impl Sample {
    /// A valid sample from a pair of tracked poses.
    pub fn new(reference: Pose, target: Pose) -> Self {
        Self {
            reference,
            target,
            valid: true,
        }
    }

    /// Placeholder for a failed collection attempt.
    pub fn invalid() -> Self {
        Self {
            reference: Pose::identity(),
            target: Pose::identity(),
            valid: false,
        }
    }
}

/// Rotation axes of the motion between two samples, one per body.
///
/// Both axes are unit length when `valid`; they describe the same physical
/// rotation of the attached pair seen from the two universes.
#[derive(Debug, Clone, Copy)]
pub struct DSample {
    /// Rotation axis observed by the reference device.
    pub reference: Vec3,
    /// Rotation axis observed by the target device.
    pub target: Vec3,
    /// Whether the motion was large enough to yield well-conditioned axes.
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{euler_zyx_to_quat, quat_to_mat};

    #[test]
    fn affine34_roundtrip() {
        let rot = quat_to_mat(&euler_zyx_to_quat(&Vec3::new(25.0, -40.0, 80.0)));
        let m = [
            [rot[(0, 0)], rot[(0, 1)], rot[(0, 2)], 1.5],
            [rot[(1, 0)], rot[(1, 1)], rot[(1, 2)], -0.25],
            [rot[(2, 0)], rot[(2, 1)], rot[(2, 2)], 3.0],
        ];

        let pose = Pose::from_affine34(&m);
        assert!((pose.rot - rot).norm() < 1e-15);
        assert!((pose.trans - Vec3::new(1.5, -0.25, 3.0)).norm() < 1e-15);

        let affine = pose.to_affine();
        for i in 0..3 {
            for j in 0..4 {
                assert!((affine[(i, j)] - m[i][j]).abs() < 1e-15);
            }
        }
        assert!((affine[(3, 3)] - 1.0).abs() < 1e-15);
    }

    #[test]
    fn apply_transform_composes_rigidly() {
        let rot = quat_to_mat(&euler_zyx_to_quat(&Vec3::new(90.0, 0.0, 0.0)));
        let pose = Pose {
            rot: Mat3::identity(),
            trans: Vec3::new(1.0, 0.0, 0.0),
        };
        let out = apply_transform(&pose, &Vec3::new(0.0, 2.0, 0.0), &rot);

        // Z(90) sends +X to +Y, then the offset adds another +2 on Y.
        assert!((out.trans - Vec3::new(0.0, 3.0, 0.0)).norm() < 1e-12);
        assert!((out.rot - rot).norm() < 1e-12);
    }

    #[test]
    fn sample_validity_flags() {
        let sample = Sample::new(Pose::identity(), Pose::identity());
        assert!(sample.valid);
        assert!(!Sample::invalid().valid);
    }

    #[test]
    fn sample_json_roundtrip() {
        let sample = Sample::new(
            Pose {
                rot: quat_to_mat(&euler_zyx_to_quat(&Vec3::new(10.0, 20.0, 30.0))),
                trans: Vec3::new(0.1, 1.6, -0.4),
            },
            Pose::identity(),
        );

        let json = serde_json::to_string(&sample).unwrap();
        let restored: Sample = serde_json::from_str(&json).unwrap();

        assert!(restored.valid);
        assert!((restored.reference.rot - sample.reference.rot).norm() < 1e-15);
        assert!((restored.reference.trans - sample.reference.trans).norm() < 1e-15);
    }
}
