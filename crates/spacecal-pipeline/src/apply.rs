//! Profile application and chaperone restoration.
//!
//! [`Calibrator::scan_and_apply_profile`] walks every device slot and
//! keeps the driver offsets in sync with the active profile: devices of
//! the target universe get the calibrated transform, everything else gets
//! a zero/identity disabled offset. When the HMD turns out to belong to a
//! different universe than the calibration's reference, the whole profile
//! is disabled for the scan. A stored chaperone snapshot is re-applied
//! whenever the live quad count diverges from it.

use crate::calibration::Calibrator;
use crate::driver::{
    reset_and_disable_offsets, DriverClient, DriverRequest, RawPoseChannel, SetDeviceTransform,
};
use crate::profile::ProfileStore;
use crate::runtime::{
    ChaperoneSetup, DeviceProperty, TrackedDeviceClass, TrackedDeviceIndex, TrackingRuntime,
    HMD_DEVICE_INDEX, MAX_TRACKED_DEVICES,
};
use anyhow::Result;
use spacecal_core::euler_zyx_to_quat;

impl<R, D, C, P> Calibrator<R, D, C, P>
where
    R: TrackingRuntime + ChaperoneSetup,
    D: DriverClient,
    C: RawPoseChannel,
    P: ProfileStore,
{
    /// Push the active profile to every device slot.
    pub fn scan_and_apply_profile(&mut self) -> Result<()> {
        self.ctx.enabled = self.ctx.valid_profile;

        for device in 0..MAX_TRACKED_DEVICES as TrackedDeviceIndex {
            if self.runtime.device_class(device) == TrackedDeviceClass::Invalid {
                continue;
            }

            if !self.ctx.enabled {
                reset_and_disable_offsets(&mut self.driver, device)?;
                continue;
            }

            let tracking_system = match self
                .runtime
                .string_property(device, DeviceProperty::TrackingSystemName)
            {
                Ok(name) => name,
                Err(_) => {
                    reset_and_disable_offsets(&mut self.driver, device)?;
                    continue;
                }
            };

            if device == HMD_DEVICE_INDEX {
                if tracking_system != self.ctx.reference_tracking_system {
                    // An HMD from a different universe than the one the
                    // calibration was made against.
                    self.ctx.enabled = false;
                }
                reset_and_disable_offsets(&mut self.driver, device)?;
                continue;
            }

            if tracking_system != self.ctx.target_tracking_system {
                reset_and_disable_offsets(&mut self.driver, device)?;
                continue;
            }

            let request = DriverRequest::SetDeviceTransform(
                SetDeviceTransform::new(
                    device,
                    self.ctx.calibrated_translation * 0.01,
                    euler_zyx_to_quat(&self.ctx.calibrated_rotation),
                )
                .with_scale(self.ctx.calibrated_scale),
            );
            self.driver.send_blocking(&request)?;
        }

        if self.ctx.enabled && self.ctx.chaperone.valid && self.ctx.chaperone.auto_apply {
            // A runtime reset leaves blank-ish geometry behind, while manual
            // play-space adjustments do not touch the geometry at all.
            let live_quads = self.runtime.live_collision_bounds().len();
            if live_quads != self.ctx.chaperone.geometry.len() {
                self.apply_chaperone_bounds();
            }
        }

        Ok(())
    }

    /// Snapshot the live chaperone geometry into the context.
    pub fn load_chaperone_bounds(&mut self) {
        self.runtime.revert_working_copy();
        self.ctx.chaperone.geometry = self.runtime.live_collision_bounds();
        self.ctx.chaperone.standing_center = self.runtime.working_standing_zero_pose();
        self.ctx.chaperone.play_space_size = self.runtime.working_play_area_size();
        self.ctx.chaperone.valid = true;
    }

    /// Write the stored chaperone snapshot back and commit it live.
    pub fn apply_chaperone_bounds(&mut self) {
        self.runtime.revert_working_copy();
        self.runtime
            .set_working_collision_bounds(&self.ctx.chaperone.geometry);
        self.runtime
            .set_working_standing_zero_pose(&self.ctx.chaperone.standing_center);
        let (x, z) = self.ctx.chaperone.play_space_size;
        self.runtime.set_working_play_area_size(x, z);
        self.runtime.commit_working_copy_live();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryProfileStore, MockRuntime, NullPoseChannel, RecordingDriver};
    use crate::runtime::BoundsQuad;
    use spacecal_core::{Real, Vec3};

    type TestCalibrator =
        Calibrator<MockRuntime, RecordingDriver, NullPoseChannel, MemoryProfileStore>;

    fn make_calibrator(runtime: MockRuntime) -> TestCalibrator {
        Calibrator::new(
            runtime,
            RecordingDriver::default(),
            NullPoseChannel::default(),
            MemoryProfileStore::default(),
        )
        .unwrap()
    }

    fn calibrated_runtime() -> MockRuntime {
        let mut runtime = MockRuntime::default();
        runtime.add_device(0, TrackedDeviceClass::Hmd, "lighthouse", "HMD-001");
        runtime.add_device(2, TrackedDeviceClass::GenericTracker, "oculus", "TRK-002");
        runtime.add_device(3, TrackedDeviceClass::Controller, "lighthouse", "CTL-003");
        runtime
    }

    fn install_profile(cal: &mut TestCalibrator) {
        cal.ctx.reference_tracking_system = "lighthouse".to_string();
        cal.ctx.target_tracking_system = "oculus".to_string();
        cal.ctx.calibrated_rotation = Vec3::new(0.0, 20.0, 30.0);
        cal.ctx.calibrated_translation = Vec3::new(10.0, 20.0, -5.0);
        cal.ctx.calibrated_scale = 1.02;
        cal.ctx.valid_profile = true;
    }

    fn transforms(cal: &TestCalibrator) -> Vec<SetDeviceTransform> {
        cal.driver()
            .requests
            .iter()
            .map(|req| {
                let DriverRequest::SetDeviceTransform(t) = req;
                *t
            })
            .collect()
    }

    #[test]
    fn cold_start_disables_every_offset() {
        let mut cal = make_calibrator(calibrated_runtime());
        cal.ctx.valid_profile = false;

        cal.tick(1.0).unwrap();

        let sent = transforms(&cal);
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|t| !t.enabled));
        assert!(!cal.ctx.enabled);
        assert_eq!(cal.runtime.commits, 0);
    }

    #[test]
    fn matching_devices_receive_the_transform() {
        let mut cal = make_calibrator(calibrated_runtime());
        install_profile(&mut cal);

        cal.scan_and_apply_profile().unwrap();

        let sent = transforms(&cal);
        assert_eq!(sent.len(), 3);

        // HMD always gets an identity-disabled offset.
        assert_eq!(sent[0].device, 0);
        assert!(!sent[0].enabled);

        // The oculus-universe tracker gets the calibration in metres.
        assert_eq!(sent[1].device, 2);
        assert!(sent[1].enabled);
        assert!((sent[1].translation - Vec3::new(0.10, 0.20, -0.05)).norm() < 1e-12);
        assert!((sent[1].scale - 1.02).abs() < 1e-15);

        // The reference-universe controller is reset.
        assert_eq!(sent[2].device, 3);
        assert!(!sent[2].enabled);

        assert!(cal.ctx.enabled);
    }

    #[test]
    fn hmd_universe_mismatch_disables_the_profile() {
        let mut runtime = calibrated_runtime();
        runtime.add_device(0, TrackedDeviceClass::Hmd, "oculus", "HMD-OTHER");
        let mut cal = make_calibrator(runtime);
        install_profile(&mut cal);

        cal.scan_and_apply_profile().unwrap();

        assert!(!cal.ctx.enabled);
        let sent = transforms(&cal);
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|t| !t.enabled));
    }

    #[test]
    fn unreadable_tracking_system_falls_back_to_identity() {
        let mut runtime = calibrated_runtime();
        runtime
            .properties
            .remove(&(2, DeviceProperty::TrackingSystemName));
        let mut cal = make_calibrator(runtime);
        install_profile(&mut cal);

        cal.scan_and_apply_profile().unwrap();

        let sent = transforms(&cal);
        let tracker = sent.iter().find(|t| t.device == 2).unwrap();
        assert!(!tracker.enabled);
        // The profile stays enabled; only that device is reset.
        assert!(cal.ctx.enabled);
    }

    #[test]
    fn scan_is_idempotent() {
        let mut cal = make_calibrator(calibrated_runtime());
        install_profile(&mut cal);

        cal.scan_and_apply_profile().unwrap();
        let first: Vec<_> = cal.driver().requests.clone();
        cal.scan_and_apply_profile().unwrap();
        let second = &cal.driver().requests[first.len()..];

        assert_eq!(first.as_slice(), second);
    }

    fn stored_quads(n: usize) -> Vec<BoundsQuad> {
        (0..n)
            .map(|i| {
                let x = i as Real;
                [
                    [x, 0.0, 0.0],
                    [x, 2.4, 0.0],
                    [x + 1.0, 2.4, 0.0],
                    [x + 1.0, 0.0, 0.0],
                ]
            })
            .collect()
    }

    #[test]
    fn chaperone_is_restored_when_quad_count_differs() {
        let mut cal = make_calibrator(calibrated_runtime());
        install_profile(&mut cal);
        cal.ctx.chaperone.geometry = stored_quads(8);
        cal.ctx.chaperone.play_space_size = (2.5, 3.0);
        cal.ctx.chaperone.valid = true;
        cal.ctx.chaperone.auto_apply = true;

        // The runtime lost its geometry (0 quads live).
        assert!(cal.runtime.live_bounds.is_empty());

        cal.scan_and_apply_profile().unwrap();

        assert_eq!(cal.runtime.commits, 1);
        assert_eq!(cal.runtime.live_bounds.len(), 8);
        assert!((cal.runtime.working_play_area.0 - 2.5).abs() < 1e-15);
    }

    #[test]
    fn chaperone_is_left_alone_when_quad_count_matches() {
        let mut runtime = calibrated_runtime();
        runtime.live_bounds = stored_quads(8);
        let mut cal = make_calibrator(runtime);
        install_profile(&mut cal);
        cal.ctx.chaperone.geometry = stored_quads(8);
        cal.ctx.chaperone.valid = true;

        cal.scan_and_apply_profile().unwrap();
        assert_eq!(cal.runtime.commits, 0);
    }

    #[test]
    fn load_chaperone_bounds_snapshots_live_geometry() {
        let mut runtime = calibrated_runtime();
        runtime.live_bounds = stored_quads(4);
        runtime.working_play_area = (2.0, 2.0);
        let mut cal = make_calibrator(runtime);

        cal.load_chaperone_bounds();

        assert!(cal.ctx.chaperone.valid);
        assert_eq!(cal.ctx.chaperone.geometry.len(), 4);
        assert!((cal.ctx.chaperone.play_space_size.0 - 2.0).abs() < 1e-15);
    }
}
