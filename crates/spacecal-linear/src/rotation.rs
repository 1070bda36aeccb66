//! Rotation fit over paired delta-rotation axes.
//!
//! When stuck together, the two tracked bodies rotate as a pair, so their
//! world-space rotation axes must be equal between any two sample times —
//! each universe just reports that shared axis in its own frame. Kabsch
//! over the two unit-axis sets recovers the rotation between the frames.

use crate::SolveError;
use log::debug;
use spacecal_core::{
    angle_from_rotation, axis_from_rotation, euler_zyx_from_mat, DSample, Mat3, Real, Sample, Vec3,
};

/// Minimum rotation (radians) between two samples for a usable delta pair.
pub const MIN_DELTA_ANGLE: Real = 0.4;
/// Minimum unnormalized axis magnitude for a usable delta pair.
pub const MIN_AXIS_NORM: Real = 0.01;

/// Extract the paired rotation axes of the motion between two samples.
///
/// The result is `valid` only when both bodies rotated by more than
/// [`MIN_DELTA_ANGLE`] and both unnormalized axes exceed [`MIN_AXIS_NORM`];
/// near-identical pose pairs yield ill-conditioned axes and are gated out.
pub fn delta_rotation_samples(s1: &Sample, s2: &Sample) -> DSample {
    let dref = s1.reference.rot * s2.reference.rot.transpose();
    let dtarget = s1.target.rot * s2.target.rot.transpose();

    let mut reference = axis_from_rotation(&dref);
    let mut target = axis_from_rotation(&dtarget);

    let ref_angle = angle_from_rotation(&dref);
    let target_angle = angle_from_rotation(&dtarget);

    let valid = ref_angle > MIN_DELTA_ANGLE
        && target_angle > MIN_DELTA_ANGLE
        && reference.norm() > MIN_AXIS_NORM
        && target.norm() > MIN_AXIS_NORM;

    reference.normalize_mut();
    target.normalize_mut();

    DSample {
        reference,
        target,
        valid,
    }
}

/// Estimate the universe rotation from paired pose samples.
///
/// Builds delta-rotation axis pairs for every unordered sample pair, then
/// solves for the rotation aligning the target-universe axes onto the
/// reference-universe axes (Kabsch with determinant-sign correction).
///
/// Returns ZYX Euler angles in degrees.
pub fn calibrate_rotation(samples: &[Sample]) -> Result<Vec3, SolveError> {
    if samples.len() < 2 {
        return Err(SolveError::NotEnoughSamples {
            needed: 2,
            got: samples.len(),
        });
    }

    let mut deltas = Vec::new();
    for i in 0..samples.len() {
        for j in 0..i {
            let delta = delta_rotation_samples(&samples[i], &samples[j]);
            if delta.valid {
                deltas.push(delta);
            }
        }
    }
    debug!(
        "{} samples yielded {} delta rotation pairs",
        samples.len(),
        deltas.len()
    );

    if deltas.is_empty() {
        return Err(SolveError::NoUsableMotion);
    }

    let n = deltas.len() as Real;
    let ref_centroid = deltas.iter().map(|d| d.reference).sum::<Vec3>() / n;
    let target_centroid = deltas.iter().map(|d| d.target).sum::<Vec3>() / n;

    let mut cross_cov = Mat3::zeros();
    for d in &deltas {
        cross_cov += (d.reference - ref_centroid) * (d.target - target_centroid).transpose();
    }

    let svd = cross_cov.svd(true, true);
    let u = svd.u.ok_or(SolveError::DecompositionFailed)?;
    let v_t = svd.v_t.ok_or(SolveError::DecompositionFailed)?;

    let mut sign = Mat3::identity();
    if (u * v_t).determinant() < 0.0 {
        sign[(2, 2)] = -1.0;
    }

    let rot = (v_t.transpose() * sign * u.transpose()).transpose();

    let euler = euler_zyx_from_mat(&rot);
    debug!(
        "calibrated rotation: yaw={:.2} pitch={:.2} roll={:.2}",
        euler[1], euler[2], euler[0]
    );
    Ok(euler)
}
