//! High-level entry crate for the `spacecal-rs` toolbox.
//!
//! `spacecal-rs` computes and continuously applies a rigid-body spatial
//! calibration between two independently tracked coordinate systems. A
//! target device is physically attached to a reference device (typically
//! the HMD); while the pair moves, paired pose samples are collected and
//! solved for the rotation and translation mapping the target universe
//! onto the reference universe. The solved transform is then pushed to a
//! pose-offset driver for every device of the target universe.
//!
//! ## Typical host integration
//!
//! ```ignore
//! use spacecal::pipeline::Calibrator;
//!
//! let mut calibrator = Calibrator::new(runtime, driver, shmem, profiles)?;
//! calibrator.load_profile()?;
//!
//! // Request a calibration once the user has attached the devices:
//! calibrator.ctx.reference_id = Some(0);
//! calibrator.ctx.target_id = Some(3);
//! calibrator.start_calibration();
//!
//! // Host main loop; the calibrator advertises its wanted cadence.
//! loop {
//!     calibrator.tick(now_seconds())?;
//!     sleep_for(calibrator.ctx.wanted_update_interval);
//! }
//! ```
//!
//! ## Offline solving
//!
//! Recorded sessions (`Vec<Sample>` as JSON) can be solved without a
//! tracking host through [`linear::fit_calibration`] or the `spacecal`
//! replay binary.
//!
//! ## Module organization
//!
//! - **[`core`]**: math kernel, pose/sample model, synthetic data
//! - **[`linear`]**: closed-form solvers and quality gates
//! - **[`pipeline`]**: tick-driven state machine, profile application,
//!   host adapter traits

/// Math kernel, pose/sample model and synthetic data helpers.
pub mod core {
    pub use spacecal_core::*;
}

/// Closed-form solvers and quality gates.
pub mod linear {
    pub use spacecal_linear::*;
}

/// Tick-driven state machine, profile application and adapter traits.
pub mod pipeline {
    pub use spacecal_pipeline::*;
}

// Re-exports for convenience
pub use spacecal_core::{Pose, Real, Sample, Vec3};
pub use spacecal_linear::{fit_calibration, CalibrationFit, QualityOptions, SolveError};
pub use spacecal_pipeline::{CalibrationContext, CalibrationState, Calibrator, Profile};

/// Convenient re-exports for common use cases.
pub mod prelude {
    // Core types
    pub use crate::core::{
        apply_transform, euler_zyx_from_mat, euler_zyx_to_quat, quat_to_mat, Mat3, Pose, Quat,
        Real, Sample, Vec3,
    };

    // Solvers and quality gates
    pub use crate::linear::{
        calibrate_rotation, calibrate_translation, compute_sensitivity, fit_calibration,
        CalibrationFit, QualityOptions, SensitivityReport, SolveError,
    };

    // Pipeline
    pub use crate::pipeline::{
        CalibrationContext, CalibrationState, Calibrator, ChaperoneSetup, DriverClient,
        DriverRequest, Profile, ProfileStore, RawPoseChannel, SetDeviceTransform,
        TrackingRuntime,
    };
}
