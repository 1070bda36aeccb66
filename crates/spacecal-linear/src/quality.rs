//! Quality gates for a candidate calibration.
//!
//! All checks run on the original, un-rotated samples using the candidate
//! transform `(trans, rot_quat)` in metres/quaternion form:
//!
//! - [`derive_ref_to_target_offset`]: average target location in
//!   reference-local coordinates,
//! - [`retargeting_error_rms`]: RMS distance between the transformed
//!   target positions and the positions predicted from the reference pose
//!   and the derived offset,
//! - [`compute_independence`]: PCA coplanarity analysis of the sampled
//!   positions,
//! - [`compute_sensitivity`]: the combined report, including RMS deltas
//!   under 10 degree rotation perturbations.

use crate::SolveError;
use log::debug;
use nalgebra::SymmetricEigen;
use serde::{Deserialize, Serialize};
use spacecal_core::{
    apply_transform, euler_zyx_to_quat, quat_mul, quat_to_mat, Mat3, Quat, Real, Sample, Vec3,
    Vec4,
};

/// Acceptance gates for a candidate calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityOptions {
    /// Maximum acceptable retargeting RMS error in metres.
    pub error_limit: Real,
    /// Smallest-axis variance below which the samples count as coplanar.
    pub coplanarity_eps: Real,
    /// Treat coplanar sample sets as fatal instead of advisory.
    pub reject_coplanar: bool,
}

impl Default for QualityOptions {
    fn default() -> Self {
        Self {
            error_limit: 0.1,
            coplanarity_eps: 5e-5,
            reject_coplanar: false,
        }
    }
}

/// Quality metrics of a candidate calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityReport {
    /// Average target position in reference-local coordinates, homogeneous.
    pub offset: Vec4,
    /// Retargeting RMS error in metres for the candidate transform.
    pub base_error: Real,
    /// RMS error deltas for 10 degree perturbations about X, Y and Z.
    pub delta_errors: [Real; 3],
    /// Whether the sampled positions are nearly coplanar.
    pub coplanar: bool,
    /// Whether the calibration should be rejected.
    pub reject: bool,
}

fn valid_count(samples: &[Sample]) -> usize {
    samples.iter().filter(|s| s.valid).count()
}

/// Average location of the target device in reference-local coordinates.
///
/// Each valid target pose is mapped into the reference universe by the
/// candidate transform, then expressed relative to the reference device.
/// Returned as a homogeneous `(x, y, z, 1)` point.
pub fn derive_ref_to_target_offset(
    samples: &[Sample],
    trans: &Vec3,
    rot_quat: &Quat,
) -> Result<Vec4, SolveError> {
    let count = valid_count(samples);
    if count == 0 {
        return Err(SolveError::NotEnoughSamples { needed: 1, got: 0 });
    }

    let rot_mat = quat_to_mat(rot_quat);
    let mut accum = Vec3::zeros();

    for sample in samples.iter().filter(|s| s.valid) {
        let updated = apply_transform(&sample.target, trans, &rot_mat);
        let ref_origin = updated.trans - sample.reference.trans;
        accum += sample.reference.rot.transpose() * ref_origin;
    }
    accum /= count as Real;

    Ok(Vec4::new(accum[0], accum[1], accum[2], 1.0))
}

/// RMS retargeting error of a candidate transform, in metres.
///
/// Compares every transformed target position against the position
/// predicted from the reference pose and the derived reference-local
/// `offset`.
pub fn retargeting_error_rms(
    samples: &[Sample],
    offset: &Vec4,
    trans: &Vec3,
    rot_quat: &Quat,
) -> Result<Real, SolveError> {
    let count = valid_count(samples);
    if count == 0 {
        return Err(SolveError::NotEnoughSamples { needed: 1, got: 0 });
    }

    let rot_mat = quat_to_mat(rot_quat);
    let offset_pos = Vec3::new(offset[0], offset[1], offset[2]);
    let mut error_accum = 0.0;

    for sample in samples.iter().filter(|s| s.valid) {
        let updated = apply_transform(&sample.target, trans, &rot_mat);
        let predicted = sample.reference.rot * offset_pos + sample.reference.trans;
        error_accum += (updated.trans - predicted).norm_squared();
    }

    Ok((error_accum / count as Real).sqrt())
}

/// PCA coplanarity analysis of the sampled positions.
///
/// Rotating about two axes is sufficient for a unique solution, since the
/// third basis vector is determined by the cross product of the first two.
/// After removing the reference device's own motion, the question is
/// whether the sampled offsets are too close to a plane. Returns `true`
/// when the smallest-axis variance of the mean-distance-normalized points
/// falls below `eps`.
pub fn compute_independence(
    samples: &[Sample],
    trans: &Vec3,
    rot_quat: &Quat,
    eps: Real,
) -> Result<bool, SolveError> {
    let rot_mat = quat_to_mat(rot_quat);

    let mut points: Vec<Vec3> = samples
        .iter()
        .filter(|s| s.valid)
        .map(|s| (rot_mat * s.target.trans + trans) - s.reference.trans)
        .collect();

    if points.len() < 3 {
        return Err(SolveError::NotEnoughSamples {
            needed: 3,
            got: points.len(),
        });
    }

    let n = points.len() as Real;
    let mean: Vec3 = points.iter().sum::<Vec3>() / n;
    let mean_dist: Real = points.iter().map(|p| p.norm()).sum::<Real>() / n;
    if mean_dist < 1e-12 {
        // Every offset collapses onto the reference device; nothing to span.
        return Ok(true);
    }

    let mut cov = Mat3::zeros();
    for p in &points {
        let centered = p - mean;
        cov += centered * centered.transpose();
    }
    cov /= n;

    let eigen = SymmetricEigen::try_new(cov, 1e-12, 0).ok_or(SolveError::DecompositionFailed)?;
    debug!("independence eigenvalues: {:?}", eigen.eigenvalues);

    let mut basis = eigen.eigenvectors;
    for i in 0..3 {
        let col = basis.column(i).normalize();
        basis.set_column(i, &col);
    }
    let change_basis = basis
        .try_inverse()
        .ok_or(SolveError::DecompositionFailed)?;

    let mut basis_mean = Vec3::zeros();
    for p in &mut points {
        *p /= mean_dist;
        basis_mean += change_basis * *p;
    }
    basis_mean /= n;

    let mut sum_deviation = Vec3::zeros();
    for p in &points {
        let diff = basis_mean - change_basis * p;
        sum_deviation += diff.component_mul(&diff);
    }
    let variance = sum_deviation / n;
    debug!("independence axis variance: {:?}", variance);

    Ok(variance.min() < eps)
}

/// Full quality report for a candidate transform.
///
/// Derives the reference-local target offset, measures the base RMS error,
/// probes how the error responds to 10 degree rotation perturbations about
/// each axis, and runs the coplanarity analysis. `reject` is set when the
/// base error exceeds `opts.error_limit`, or additionally on coplanar data
/// when `opts.reject_coplanar` is enabled.
pub fn compute_sensitivity(
    samples: &[Sample],
    trans: &Vec3,
    rot_quat: &Quat,
    opts: &QualityOptions,
) -> Result<SensitivityReport, SolveError> {
    let offset = derive_ref_to_target_offset(samples, trans, rot_quat)?;
    let base_error = retargeting_error_rms(samples, &offset, trans, rot_quat)?;

    // Euler components are ZYX, so the X probe lives in component 2.
    let probes = [
        Vec3::new(0.0, 0.0, 10.0),
        Vec3::new(0.0, 10.0, 0.0),
        Vec3::new(10.0, 0.0, 0.0),
    ];
    let mut delta_errors = [0.0; 3];
    for (axis, probe) in probes.iter().enumerate() {
        let perturbed = quat_mul(&euler_zyx_to_quat(probe), rot_quat);
        delta_errors[axis] =
            retargeting_error_rms(samples, &offset, trans, &perturbed)? - base_error;
    }
    debug!(
        "sensitivity deltas: x={:.4} y={:.4} z={:.4}",
        delta_errors[0], delta_errors[1], delta_errors[2]
    );

    let coplanar = compute_independence(samples, trans, rot_quat, opts.coplanarity_eps)?;

    let reject = base_error > opts.error_limit || (opts.reject_coplanar && coplanar);

    Ok(SensitivityReport {
        offset,
        base_error,
        delta_errors,
        coplanar,
        reject,
    })
}
