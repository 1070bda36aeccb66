//! Translation fit over stacked pair constraints.
//!
//! For samples whose target poses have already been rotated into the
//! reference universe, the translational offset `t` satisfies, for any
//! sample pair `(i, j)` and either body's rotation `Q`,
//! `(Qj - Qi) * t = Qj * dj - Qi * di` with `d = ref.trans - target.trans`.
//! Stacking the reference- and target-frame instances of that constraint
//! for every pair regularizes the system, which is then solved by SVD.

use crate::SolveError;
use log::debug;
use nalgebra::{DMatrix, DVector};
use spacecal_core::{Mat3, Real, Sample, Vec3};

/// Estimate the universe translation from rotation-aligned pose samples.
///
/// The caller must have rotated every `target` pose in place by the
/// candidate rotation first. Returns the offset in centimetres.
pub fn calibrate_translation(samples: &[Sample]) -> Result<Vec3, SolveError> {
    if samples.len() < 2 {
        return Err(SolveError::NotEnoughSamples {
            needed: 2,
            got: samples.len(),
        });
    }

    let mut deltas: Vec<(Vec3, Mat3)> = Vec::new();

    for i in 0..samples.len() {
        for j in 0..i {
            let delta_i = samples[i].reference.trans - samples[i].target.trans;
            let delta_j = samples[j].reference.trans - samples[j].target.trans;

            let qa_i = samples[i].reference.rot.transpose();
            let qa_j = samples[j].reference.rot.transpose();
            deltas.push((qa_j * delta_j - qa_i * delta_i, qa_j - qa_i));

            let qb_i = samples[i].target.rot.transpose();
            let qb_j = samples[j].target.rot.transpose();
            deltas.push((qb_j * delta_j - qb_i * delta_i, qb_j - qb_i));
        }
    }

    let mut coefficients = DMatrix::<Real>::zeros(deltas.len() * 3, 3);
    let mut constants = DVector::<Real>::zeros(deltas.len() * 3);

    for (k, (constant, coefficient)) in deltas.iter().enumerate() {
        coefficients
            .view_mut((3 * k, 0), (3, 3))
            .copy_from(coefficient);
        constants.rows_mut(3 * k, 3).copy_from(constant);
    }

    let svd = coefficients.svd(true, true);
    let solution = svd
        .solve(&constants, 1e-12)
        .map_err(|_| SolveError::DecompositionFailed)?;

    let trans_cm = Vec3::new(solution[0], solution[1], solution[2]) * 100.0;
    debug!(
        "calibrated translation: x={:.2} y={:.2} z={:.2} cm",
        trans_cm[0], trans_cm[1], trans_cm[2]
    );
    Ok(trans_cm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacecal_core::synthetic::{attached_samples, sweep_poses};
    use spacecal_core::{euler_zyx_to_quat, quat_to_mat};

    fn rotate_targets(samples: &mut [Sample], rot: &Mat3) {
        for sample in samples {
            sample.target.rot = rot * sample.target.rot;
            sample.target.trans = rot * sample.target.trans;
        }
    }

    #[test]
    fn identity_pair_yields_zero_translation() {
        let samples: Vec<Sample> = sweep_poses(10, 0.45, 0.3)
            .into_iter()
            .map(|pose| Sample::new(pose, pose))
            .collect();

        let trans = calibrate_translation(&samples).unwrap();
        assert!(trans.norm() < 1e-6, "expected zero offset, got {trans}");
    }

    #[test]
    fn recovers_known_universe_translation() {
        let universe_rot = quat_to_mat(&euler_zyx_to_quat(&Vec3::new(30.0, 20.0, 0.0)));
        let universe_trans = Vec3::new(0.10, 0.20, -0.05);

        let mut samples = attached_samples(
            &sweep_poses(20, 0.45, 0.3),
            &universe_rot,
            &universe_trans,
            &Mat3::identity(),
            &Vec3::new(0.0, 0.1, 0.05),
        );
        rotate_targets(&mut samples, &universe_rot);

        let trans_cm = calibrate_translation(&samples).unwrap();
        // 1 mm tolerance in centimetres.
        assert!(
            (trans_cm - universe_trans * 100.0).norm() < 0.1,
            "translation not recovered: {trans_cm}"
        );
    }

    #[test]
    fn too_few_samples_is_an_error() {
        let samples = vec![Sample::new(Default::default(), Default::default())];
        assert!(matches!(
            calibrate_translation(&samples),
            Err(SolveError::NotEnoughSamples { needed: 2, got: 1 })
        ));
    }
}
