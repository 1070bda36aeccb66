//! Deterministic synthetic sample generation helpers.
//!
//! These build recordings of a rigidly attached device pair observed from
//! two tracking universes related by a known rigid transform. They are used
//! by solver and pipeline tests to verify ground-truth recovery, and are
//! deterministic by construction (no random number generation; stable
//! trajectories derived from the sample index).

use crate::math::{Mat3, Real, Vec3};
use crate::pose::{Pose, Sample};
use nalgebra::{Rotation3, Vector3};

/// Generate a reference-device trajectory sweeping two rotation axes.
///
/// Pose `k` rotates by `k * yaw_step` about +Y and `k * pitch_step` about
/// +X while translating on a bounded, deterministic path around head
/// height. Steps of roughly 0.45 rad guarantee that most pose pairs exceed
/// the solvers' minimum delta-rotation gate.
pub fn sweep_poses(count: usize, yaw_step: Real, pitch_step: Real) -> Vec<Pose> {
    (0..count)
        .map(|k| {
            let kf = k as Real;
            let rot = Rotation3::from_axis_angle(&Vector3::y_axis(), yaw_step * kf)
                * Rotation3::from_axis_angle(&Vector3::x_axis(), pitch_step * kf);
            Pose {
                rot: rot.into_inner(),
                trans: Vec3::new(
                    0.25 * (kf * 0.9).sin(),
                    1.6 + 0.10 * (kf * 0.6).cos(),
                    0.25 * (kf * 0.4).sin(),
                ),
            }
        })
        .collect()
}

/// Observe a rigidly attached pair from two universes.
///
/// The reference device follows `reference` in the reference universe
/// (treated as the world frame). The target device is mounted on the
/// reference body with fixed rotation `mount_rot` and offset `mount_offset`
/// (metres, reference-body frame). The target universe is related to the
/// reference universe by `world = universe_rot * point + universe_trans`,
/// so the returned target poses are expressed in target-universe
/// coordinates. A solver fed these samples should recover exactly
/// `(universe_rot, universe_trans)`.
pub fn attached_samples(
    reference: &[Pose],
    universe_rot: &Mat3,
    universe_trans: &Vec3,
    mount_rot: &Mat3,
    mount_offset: &Vec3,
) -> Vec<Sample> {
    let inv_rot = universe_rot.transpose();

    reference
        .iter()
        .map(|ref_pose| {
            let world_rot = ref_pose.rot * mount_rot;
            let world_pos = ref_pose.trans + ref_pose.rot * mount_offset;

            let target = Pose {
                rot: inv_rot * world_rot,
                trans: inv_rot * (world_pos - universe_trans),
            };
            Sample::new(*ref_pose, target)
        })
        .collect()
}
