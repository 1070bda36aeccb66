//! Calibration state machine.
//!
//! [`Calibrator`] owns the process-wide context and the sample buffer of
//! the current calibration session, and is driven by an external tick
//! source through [`Calibrator::tick`]. The states are:
//!
//! - `None`: idle, applying the active profile at 1 Hz,
//! - `Editing`: applying the profile at 10 Hz while the user adjusts it,
//! - `Begin`: validating the requested reference/target pair,
//! - `Rotation`: collecting one paired sample per tick until the session
//!   reaches its sample count, then solving, gating and committing.
//!
//! Failures stay in-band: they roll the state back to `None` and leave a
//! message in the context log. Only driver-IPC and profile-store errors
//! propagate to the host.

use crate::context::{CalibrationContext, CalibrationState, MIN_TICK_INTERVAL};
use crate::driver::{
    reset_and_disable_offsets, DriverClient, DriverRequest, RawPoseChannel, SetDeviceTransform,
    RAW_POSE_SHMEM_NAME,
};
use crate::profile::{Profile, ProfileStore};
use crate::runtime::{
    ChaperoneSetup, DeviceProperty, TrackedDeviceIndex, TrackingRuntime, TrackingUniverse,
    MAX_TRACKED_DEVICES,
};
use anyhow::Result;
use spacecal_core::{euler_zyx_to_quat, Real, Sample};
use spacecal_linear::{fit_calibration, QualityOptions};

/// Tick-driven calibration pipeline.
///
/// Generic over the host adapters: `R` is the tracking runtime (which also
/// provides the chaperone working copy), `D` the offset-driver IPC client,
/// `C` the raw-pose shared-memory channel, and `P` the profile store.
pub struct Calibrator<R, D, C, P> {
    /// Process-wide calibration state.
    pub ctx: CalibrationContext,
    /// Acceptance gates applied to solved calibrations.
    pub quality: QualityOptions,
    samples: Vec<Sample>,
    pub(crate) runtime: R,
    pub(crate) driver: D,
    #[allow(dead_code)] // held to keep the channel mapped for process lifetime
    raw_poses: C,
    profiles: P,
}

impl<R, D, C, P> Calibrator<R, D, C, P>
where
    R: TrackingRuntime + ChaperoneSetup,
    D: DriverClient,
    C: RawPoseChannel,
    P: ProfileStore,
{
    /// Connect the pipeline to its host adapters.
    ///
    /// Opens the raw-pose shared-memory channel; the handle is kept for
    /// the lifetime of the calibrator.
    pub fn new(runtime: R, driver: D, mut raw_poses: C, profiles: P) -> Result<Self> {
        raw_poses.open(RAW_POSE_SHMEM_NAME)?;
        Ok(Self {
            ctx: CalibrationContext::default(),
            quality: QualityOptions::default(),
            samples: Vec::new(),
            runtime,
            driver,
            raw_poses,
            profiles,
        })
    }

    /// Load the stored profile into the context, if one exists.
    pub fn load_profile(&mut self) -> Result<bool> {
        match self.profiles.load()? {
            Some(profile) => {
                profile.apply_to_context(&mut self.ctx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Request a new calibration session.
    pub fn start_calibration(&mut self) {
        self.ctx.state = CalibrationState::Begin;
        self.ctx.wanted_update_interval = 0.0;
        self.ctx.clear_messages();
    }

    /// Advance the state machine.
    ///
    /// `time` is the host's monotonic clock in seconds. Ticks closer than
    /// [`MIN_TICK_INTERVAL`] to the previous processed tick are ignored,
    /// as are ticks while the tracking runtime is down.
    pub fn tick(&mut self, time: Real) -> Result<()> {
        if !self.runtime.is_available() {
            return Ok(());
        }
        if (time - self.ctx.time_last_tick) < MIN_TICK_INTERVAL {
            return Ok(());
        }
        self.ctx.time_last_tick = time;

        self.ctx.device_poses = self
            .runtime
            .device_poses(TrackingUniverse::RawAndUncalibrated, 0.0);

        match self.ctx.state {
            CalibrationState::None => {
                self.ctx.wanted_update_interval = 1.0;
                if (time - self.ctx.time_last_scan) >= 1.0 {
                    self.scan_and_apply_profile()?;
                    self.ctx.time_last_scan = time;
                }
                Ok(())
            }
            CalibrationState::Editing => {
                self.ctx.wanted_update_interval = 0.1;
                if (time - self.ctx.time_last_scan) >= 0.1 {
                    self.scan_and_apply_profile()?;
                    self.ctx.time_last_scan = time;
                }
                Ok(())
            }
            CalibrationState::Begin => self.begin_session(),
            CalibrationState::Rotation => self.collect_and_solve(),
        }
    }

    /// Number of samples collected in the current session.
    pub fn collected_samples(&self) -> usize {
        self.samples.len()
    }

    /// Mutable access to the tracking runtime adapter.
    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    /// Access to the driver client adapter.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the driver client adapter.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Mutable access to the profile store adapter.
    pub fn profile_store_mut(&mut self) -> &mut P {
        &mut self.profiles
    }

    fn begin_session(&mut self) -> Result<()> {
        let reference_ok = self.check_session_device("Reference", self.ctx.reference_id);
        let target_ok = self.check_session_device("Target", self.ctx.target_id);

        if let (true, true, Some(target)) = (reference_ok, target_ok, self.ctx.target_id) {
            reset_and_disable_offsets(&mut self.driver, target)?;
            self.samples.clear();
            self.ctx.state = CalibrationState::Rotation;
            self.ctx.wanted_update_interval = 0.0;
            self.ctx.log("Starting calibration...");
        } else {
            self.ctx.state = CalibrationState::None;
            self.ctx.log("Aborting calibration!");
        }
        Ok(())
    }

    fn check_session_device(&mut self, role: &str, device: Option<TrackedDeviceIndex>) -> bool {
        let Some(device) = device else {
            self.ctx
                .log(format!("Missing {} device", role.to_lowercase()));
            return false;
        };

        let serial = self
            .runtime
            .string_property(device, DeviceProperty::SerialNumber)
            .unwrap_or_else(|_| "<unknown>".to_string());
        self.ctx
            .log(format!("{role} device ID: {device}, serial: {serial}"));

        if (device as usize) >= MAX_TRACKED_DEVICES || !self.ctx.device_poses[device as usize].valid
        {
            self.ctx.log(format!("{role} device is not tracking"));
            return false;
        }
        true
    }

    fn collect_and_solve(&mut self) -> Result<()> {
        let sample = self.collect_sample();
        if !sample.valid {
            return Ok(());
        }

        self.samples.push(sample);
        self.ctx.progress(self.samples.len(), self.ctx.sample_count);

        if self.samples.len() < self.ctx.sample_count {
            return Ok(());
        }
        self.finish_session()
    }

    fn collect_sample(&mut self) -> Sample {
        let (Some(reference_id), Some(target_id)) = (self.ctx.reference_id, self.ctx.target_id)
        else {
            self.abort_session();
            return Sample::invalid();
        };

        let reference = self.ctx.device_poses[reference_id as usize];
        let target = self.ctx.device_poses[target_id as usize];

        let mut ok = true;
        if !reference.valid {
            self.ctx.log("Reference device is not tracking");
            ok = false;
        }
        if !target.valid {
            self.ctx.log("Target device is not tracking");
            ok = false;
        }
        if !ok {
            self.abort_session();
            return Sample::invalid();
        }

        Sample::new(reference.pose(), target.pose())
    }

    fn abort_session(&mut self) {
        self.ctx.log("Aborting calibration!");
        self.ctx.state = CalibrationState::None;
        self.samples.clear();
    }

    fn reject_session(&mut self) {
        self.samples.clear();
        self.ctx.state = CalibrationState::None;
    }

    fn finish_session(&mut self) -> Result<()> {
        let fit = match fit_calibration(&self.samples, &self.quality) {
            Ok(fit) => fit,
            Err(err) => {
                self.ctx.log(format!("Calibration failed: {err}"));
                self.reject_session();
                return Ok(());
            }
        };

        let report = &fit.sensitivity;
        self.ctx.log(format!(
            "HMD to target offset: ({:.2}, {:.2}, {:.2})",
            report.offset[0], report.offset[1], report.offset[2]
        ));
        self.ctx
            .log(format!("Position error (RMS error): {:.3}", report.base_error));
        for (axis, delta) in ["X", "Y", "Z"].iter().zip(report.delta_errors) {
            self.ctx.log(format!(
                "Sensitivity rotation {axis} (RMS error delta): {delta:.3}"
            ));
        }
        if report.coplanar {
            self.ctx
                .log("Calibration points are nearly coplanar. Try moving around more?");
        }

        if report.reject {
            self.ctx.log("Rejecting low quality calibration");
            self.reject_session();
            return Ok(());
        }

        self.ctx.calibrated_rotation = fit.rotation_deg;
        self.ctx.calibrated_translation = fit.translation_cm;

        let Some(target_id) = self.ctx.target_id else {
            self.reject_session();
            return Ok(());
        };
        let request = DriverRequest::SetDeviceTransform(SetDeviceTransform::new(
            target_id,
            fit.translation_cm * 0.01,
            euler_zyx_to_quat(&fit.rotation_deg),
        ));
        self.driver.send_blocking(&request)?;

        self.ctx.valid_profile = true;
        self.profiles.save(&Profile::from_context(&self.ctx))?;

        self.ctx.log(format!(
            "Final rotation: ({:.2}, {:.2}, {:.2})",
            fit.rotation_deg[0], fit.rotation_deg[1], fit.rotation_deg[2]
        ));
        self.ctx.log("Finished calibration, profile saved");

        self.ctx.state = CalibrationState::None;
        self.samples.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryProfileStore, MockRuntime, NullPoseChannel, RecordingDriver};
    use crate::runtime::TrackedDeviceClass;
    use spacecal_core::synthetic::{attached_samples, sweep_poses};
    use spacecal_core::{euler_zyx_from_mat, quat_to_mat, Mat3, Vec3};

    type TestCalibrator =
        Calibrator<MockRuntime, RecordingDriver, NullPoseChannel, MemoryProfileStore>;

    fn make_calibrator() -> TestCalibrator {
        let mut runtime = MockRuntime::default();
        runtime.add_device(0, TrackedDeviceClass::Hmd, "lighthouse", "HMD-001");
        runtime.add_device(1, TrackedDeviceClass::GenericTracker, "oculus", "TRK-042");

        Calibrator::new(
            runtime,
            RecordingDriver::default(),
            NullPoseChannel::default(),
            MemoryProfileStore::default(),
        )
        .unwrap()
    }

    #[test]
    fn construction_opens_the_raw_pose_channel() {
        let cal = make_calibrator();
        assert_eq!(
            cal.raw_poses.opened.as_deref(),
            Some(RAW_POSE_SHMEM_NAME)
        );
    }

    #[test]
    fn ticks_inside_the_rate_limit_are_ignored() {
        let mut cal = make_calibrator();
        cal.ctx.valid_profile = false;

        cal.tick(1.0).unwrap();
        let requests_after_first = cal.driver().requests.len();
        let scan_time = cal.ctx.time_last_scan;

        cal.tick(1.02).unwrap();
        assert_eq!(cal.driver().requests.len(), requests_after_first);
        assert!((cal.ctx.time_last_tick - 1.0).abs() < 1e-12);
        assert!((cal.ctx.time_last_scan - scan_time).abs() < 1e-12);
    }

    #[test]
    fn unavailable_runtime_drops_the_tick() {
        let mut cal = make_calibrator();
        cal.runtime_mut().available = false;

        cal.tick(1.0).unwrap();
        assert!((cal.ctx.time_last_tick - 0.0).abs() < 1e-12);
        assert!(cal.driver().requests.is_empty());
    }

    #[test]
    fn begin_rejects_untracked_reference() {
        let mut cal = make_calibrator();
        cal.ctx.reference_id = Some(3);
        cal.ctx.target_id = Some(1);
        cal.runtime_mut().set_pose(1, &Default::default());
        // Device 3 never gets a pose, so it reports as not tracking.

        cal.start_calibration();
        cal.tick(1.0).unwrap();

        assert_eq!(cal.ctx.state, CalibrationState::None);
        assert!(cal
            .ctx
            .messages
            .iter()
            .any(|m| m == "Reference device is not tracking"));
        assert!(cal.ctx.messages.iter().any(|m| m == "Aborting calibration!"));
    }

    #[test]
    fn begin_rejects_missing_target() {
        let mut cal = make_calibrator();
        cal.ctx.reference_id = Some(0);
        cal.runtime_mut().set_pose(0, &Default::default());

        cal.start_calibration();
        cal.tick(1.0).unwrap();

        assert_eq!(cal.ctx.state, CalibrationState::None);
        assert!(cal.ctx.messages.iter().any(|m| m == "Missing target device"));
    }

    fn run_session(cal: &mut TestCalibrator, samples: &[spacecal_core::Sample]) {
        cal.ctx.reference_id = Some(0);
        cal.ctx.target_id = Some(1);
        cal.ctx.sample_count = samples.len();

        // Prime poses so the Begin validation passes.
        let first = samples[0];
        cal.runtime_mut().set_pose(0, &first.reference);
        cal.runtime_mut().set_pose(1, &first.target);

        cal.start_calibration();
        let mut time = 1.0;
        cal.tick(time).unwrap();
        assert_eq!(cal.ctx.state, CalibrationState::Rotation);

        for sample in samples {
            cal.runtime_mut().set_pose(0, &sample.reference);
            cal.runtime_mut().set_pose(1, &sample.target);
            time += 0.1;
            cal.tick(time).unwrap();
        }
    }

    #[test]
    fn successful_session_commits_and_saves() {
        let universe_euler = Vec3::new(30.0, 20.0, 0.0);
        let universe_rot = quat_to_mat(&euler_zyx_to_quat(&universe_euler));
        let universe_trans = Vec3::new(0.10, 0.20, -0.05);

        let samples = attached_samples(
            &sweep_poses(40, 0.45, 0.3),
            &universe_rot,
            &universe_trans,
            &Mat3::identity(),
            &Vec3::new(0.0, 0.1, 0.05),
        );

        let mut cal = make_calibrator();
        run_session(&mut cal, &samples);

        assert_eq!(cal.ctx.state, CalibrationState::None);
        assert!(cal.ctx.valid_profile);
        assert_eq!(cal.collected_samples(), 0);

        let expected = euler_zyx_from_mat(&universe_rot);
        assert!((cal.ctx.calibrated_rotation - expected).norm() < 0.5);
        assert!((cal.ctx.calibrated_translation - universe_trans * 100.0).norm() < 0.5);

        // Begin clears the target offset, then the commit installs it.
        let requests = &cal.driver().requests;
        assert_eq!(requests.len(), 2);
        let DriverRequest::SetDeviceTransform(clear) = &requests[0];
        assert!(!clear.enabled);
        assert_eq!(clear.device, 1);
        let DriverRequest::SetDeviceTransform(commit) = &requests[1];
        assert!(commit.enabled);
        assert_eq!(commit.device, 1);
        assert!((commit.translation - cal.ctx.calibrated_translation * 0.01).norm() < 1e-12);

        assert_eq!(cal.profile_store_mut().saves, 1);
        let stored = cal.profile_store_mut().profile.clone().unwrap();
        assert!((stored.translation_cm - cal.ctx.calibrated_translation).norm() < 1e-12);

        assert!(cal
            .ctx
            .messages
            .iter()
            .any(|m| m == "Finished calibration, profile saved"));
    }

    #[test]
    fn low_quality_session_is_rejected() {
        let universe_rot = quat_to_mat(&euler_zyx_to_quat(&Vec3::new(30.0, 20.0, 0.0)));
        let mut samples = attached_samples(
            &sweep_poses(20, 0.45, 0.3),
            &universe_rot,
            &Vec3::new(0.10, 0.20, -0.05),
            &Mat3::identity(),
            &Vec3::new(0.0, 0.1, 0.05),
        );
        for (k, sample) in samples.iter_mut().enumerate() {
            let kf = k as f64;
            sample.target.trans += Vec3::new(
                0.4 * (kf * 1.3).sin(),
                0.4 * (kf * 2.1).cos(),
                0.4 * (kf * 0.7).sin(),
            );
        }

        let mut cal = make_calibrator();
        run_session(&mut cal, &samples);

        assert_eq!(cal.ctx.state, CalibrationState::None);
        assert!(!cal.ctx.valid_profile);
        assert_eq!(cal.collected_samples(), 0);
        assert_eq!(cal.profile_store_mut().saves, 0);
        assert!(cal
            .ctx
            .messages
            .iter()
            .any(|m| m == "Rejecting low quality calibration"));
    }

    #[test]
    fn losing_tracking_aborts_the_session() {
        let universe_rot = quat_to_mat(&euler_zyx_to_quat(&Vec3::new(30.0, 20.0, 0.0)));
        let samples = attached_samples(
            &sweep_poses(20, 0.45, 0.3),
            &universe_rot,
            &Vec3::new(0.10, 0.20, -0.05),
            &Mat3::identity(),
            &Vec3::new(0.0, 0.1, 0.05),
        );

        let mut cal = make_calibrator();
        cal.ctx.reference_id = Some(0);
        cal.ctx.target_id = Some(1);
        cal.ctx.sample_count = samples.len();

        cal.runtime_mut().set_pose(0, &samples[0].reference);
        cal.runtime_mut().set_pose(1, &samples[0].target);
        cal.start_calibration();
        cal.tick(1.0).unwrap();

        for (k, sample) in samples.iter().take(5).enumerate() {
            cal.runtime_mut().set_pose(0, &sample.reference);
            cal.runtime_mut().set_pose(1, &sample.target);
            cal.tick(1.1 + 0.1 * k as f64).unwrap();
        }
        assert_eq!(cal.collected_samples(), 5);

        cal.runtime_mut().clear_pose(1);
        cal.tick(2.0).unwrap();

        assert_eq!(cal.ctx.state, CalibrationState::None);
        assert_eq!(cal.collected_samples(), 0);
        assert!(cal
            .ctx
            .messages
            .iter()
            .any(|m| m == "Target device is not tracking"));
        assert!(cal.ctx.messages.iter().any(|m| m == "Aborting calibration!"));
    }

    #[test]
    fn load_profile_installs_stored_values() {
        let mut cal = make_calibrator();
        cal.profile_store_mut().profile = Some(Profile {
            reference_tracking_system: "lighthouse".to_string(),
            target_tracking_system: "oculus".to_string(),
            rotation_deg: Vec3::new(0.0, 20.0, 30.0),
            translation_cm: Vec3::new(10.0, 20.0, -5.0),
            scale: 1.0,
            chaperone: Default::default(),
        });

        assert!(cal.load_profile().unwrap());
        assert!(cal.ctx.valid_profile);
        assert_eq!(cal.ctx.target_tracking_system, "oculus");
    }
}
