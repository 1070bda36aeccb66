//! In-memory adapters for tests and examples.
//!
//! These implement every pipeline trait against plain data structures so
//! the state machine and profile scan can be driven without a tracking
//! host, an IPC channel or a filesystem. They are public so downstream
//! hosts can reuse them for their own integration tests; they are not
//! intended for production use.

use crate::driver::{DriverClient, DriverRequest, RawPoseChannel};
use crate::profile::{Profile, ProfileStore};
use crate::runtime::{
    BoundsQuad, ChaperoneSetup, DevicePose, DeviceProperty, PropertyError, TrackedDeviceClass,
    TrackedDeviceIndex, TrackingRuntime, TrackingUniverse, MAX_TRACKED_DEVICES,
};
use anyhow::{bail, Result};
use spacecal_core::{Pose, Real};
use std::collections::HashMap;

/// Scriptable tracking runtime with a chaperone working copy.
#[derive(Debug, Clone)]
pub struct MockRuntime {
    /// Whether the runtime reports as up.
    pub available: bool,
    /// Poses returned by every pose query.
    pub poses: [DevicePose; MAX_TRACKED_DEVICES],
    /// Per-slot device classes.
    pub classes: [TrackedDeviceClass; MAX_TRACKED_DEVICES],
    /// String properties keyed by `(device, property)`.
    pub properties: HashMap<(TrackedDeviceIndex, DeviceProperty), String>,
    /// Live chaperone collision bounds.
    pub live_bounds: Vec<BoundsQuad>,
    /// Working-copy collision bounds.
    pub working_bounds: Vec<BoundsQuad>,
    /// Working-copy standing zero pose.
    pub working_standing_center: Pose,
    /// Working-copy play area size.
    pub working_play_area: (Real, Real),
    /// Number of working-copy reverts performed.
    pub reverts: usize,
    /// Number of live commits performed.
    pub commits: usize,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self {
            available: true,
            poses: [DevicePose::invalid(); MAX_TRACKED_DEVICES],
            classes: [TrackedDeviceClass::Invalid; MAX_TRACKED_DEVICES],
            properties: HashMap::new(),
            live_bounds: Vec::new(),
            working_bounds: Vec::new(),
            working_standing_center: Pose::identity(),
            working_play_area: (0.0, 0.0),
            reverts: 0,
            commits: 0,
        }
    }
}

impl MockRuntime {
    /// Register a device slot with its class, tracking system and serial.
    pub fn add_device(
        &mut self,
        device: TrackedDeviceIndex,
        class: TrackedDeviceClass,
        tracking_system: &str,
        serial: &str,
    ) {
        self.classes[device as usize] = class;
        self.properties.insert(
            (device, DeviceProperty::TrackingSystemName),
            tracking_system.to_string(),
        );
        self.properties
            .insert((device, DeviceProperty::SerialNumber), serial.to_string());
    }

    /// Give a device a tracking-valid pose.
    pub fn set_pose(&mut self, device: TrackedDeviceIndex, pose: &Pose) {
        self.poses[device as usize] = DevicePose::tracking(pose);
    }

    /// Mark a device as untracked.
    pub fn clear_pose(&mut self, device: TrackedDeviceIndex) {
        self.poses[device as usize] = DevicePose::invalid();
    }
}

impl TrackingRuntime for MockRuntime {
    fn is_available(&self) -> bool {
        self.available
    }

    fn device_poses(
        &mut self,
        _universe: TrackingUniverse,
        _prediction_seconds: Real,
    ) -> [DevicePose; MAX_TRACKED_DEVICES] {
        self.poses
    }

    fn device_class(&self, device: TrackedDeviceIndex) -> TrackedDeviceClass {
        self.classes[device as usize]
    }

    fn string_property(
        &self,
        device: TrackedDeviceIndex,
        property: DeviceProperty,
    ) -> Result<String, PropertyError> {
        self.properties
            .get(&(device, property))
            .cloned()
            .ok_or(PropertyError::NotAvailable(device))
    }
}

impl ChaperoneSetup for MockRuntime {
    fn revert_working_copy(&mut self) {
        self.working_bounds = self.live_bounds.clone();
        self.reverts += 1;
    }

    fn live_collision_bounds(&self) -> Vec<BoundsQuad> {
        self.live_bounds.clone()
    }

    fn set_working_collision_bounds(&mut self, quads: &[BoundsQuad]) {
        self.working_bounds = quads.to_vec();
    }

    fn working_standing_zero_pose(&self) -> Pose {
        self.working_standing_center
    }

    fn set_working_standing_zero_pose(&mut self, pose: &Pose) {
        self.working_standing_center = *pose;
    }

    fn working_play_area_size(&self) -> (Real, Real) {
        self.working_play_area
    }

    fn set_working_play_area_size(&mut self, x: Real, z: Real) {
        self.working_play_area = (x, z);
    }

    fn commit_working_copy_live(&mut self) {
        self.live_bounds = self.working_bounds.clone();
        self.commits += 1;
    }
}

/// Driver client that records every request.
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    /// Requests in send order.
    pub requests: Vec<DriverRequest>,
    /// Fail every send, for error-path tests.
    pub fail: bool,
}

impl DriverClient for RecordingDriver {
    fn send_blocking(&mut self, request: &DriverRequest) -> Result<()> {
        if self.fail {
            bail!("offset driver unreachable");
        }
        self.requests.push(request.clone());
        Ok(())
    }
}

/// Raw-pose channel that only records the opened name.
#[derive(Debug, Clone, Default)]
pub struct NullPoseChannel {
    /// Name passed to the last successful [`RawPoseChannel::open`].
    pub opened: Option<String>,
}

impl RawPoseChannel for NullPoseChannel {
    fn open(&mut self, name: &str) -> Result<()> {
        self.opened = Some(name.to_string());
        Ok(())
    }
}

/// Profile store keeping at most one profile in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    /// The stored profile, if any.
    pub profile: Option<Profile>,
    /// Number of saves performed.
    pub saves: usize,
}

impl ProfileStore for MemoryProfileStore {
    fn save(&mut self, profile: &Profile) -> Result<()> {
        self.profile = Some(profile.clone());
        self.saves += 1;
        Ok(())
    }

    fn load(&mut self) -> Result<Option<Profile>> {
        Ok(self.profile.clone())
    }
}
