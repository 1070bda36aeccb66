//! Combined closed-form calibration fit.
//!
//! Runs the rotation fit, rotates the target poses in place, runs the
//! translation fit, and gates the result with the quality analyzer on the
//! original samples. This is the pure-math entry point shared by the
//! tick-driven pipeline and the offline replay tool.

use crate::{
    calibrate_rotation, calibrate_translation, compute_sensitivity, QualityOptions,
    SensitivityReport, SolveError,
};
use serde::{Deserialize, Serialize};
use spacecal_core::{euler_zyx_to_quat, quat_to_mat, Sample, Vec3};

/// Result of a full closed-form calibration fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationFit {
    /// ZYX Euler rotation (degrees) mapping the target universe onto the
    /// reference universe.
    pub rotation_deg: Vec3,
    /// Universe translation in centimetres.
    pub translation_cm: Vec3,
    /// Quality metrics computed on the original samples.
    pub sensitivity: SensitivityReport,
}

/// Fit the full universe transform from paired pose samples.
///
/// The returned fit still carries its quality verdict; callers decide
/// whether to commit it based on `sensitivity.reject`.
pub fn fit_calibration(
    samples: &[Sample],
    opts: &QualityOptions,
) -> Result<CalibrationFit, SolveError> {
    let rotation_deg = calibrate_rotation(samples)?;
    let rot_quat = euler_zyx_to_quat(&rotation_deg);
    let rot_mat = quat_to_mat(&rot_quat);

    let mut rotated = samples.to_vec();
    for sample in &mut rotated {
        sample.target.rot = rot_mat * sample.target.rot;
        sample.target.trans = rot_mat * sample.target.trans;
    }

    let translation_cm = calibrate_translation(&rotated)?;
    let trans_m = translation_cm * 0.01;

    let sensitivity = compute_sensitivity(samples, &trans_m, &rot_quat, opts)?;

    Ok(CalibrationFit {
        rotation_deg,
        translation_cm,
        sensitivity,
    })
}
