//! Tracking runtime contract.
//!
//! The pipeline only needs a small slice of a room-scale tracking host:
//! batched raw pose queries, device classification, two string properties,
//! and the chaperone working-copy API. Both traits are consumer-defined so
//! tests can drive the pipeline with in-memory implementations.

use spacecal_core::{Pose, Real};
use thiserror::Error;

/// Index of a tracked device slot.
pub type TrackedDeviceIndex = u32;

/// Number of device slots exposed by the tracking runtime.
pub const MAX_TRACKED_DEVICES: usize = 64;

/// The head-mounted display always occupies slot 0.
pub const HMD_DEVICE_INDEX: TrackedDeviceIndex = 0;

/// One device's pose as reported by the tracking runtime.
#[derive(Debug, Clone, Copy)]
pub struct DevicePose {
    /// Whether the device was tracking when the pose was sampled.
    pub valid: bool,
    /// Row-major 3×4 device-to-absolute affine matrix.
    pub matrix: [[Real; 4]; 3],
}

impl DevicePose {
    /// An untracked slot.
    pub fn invalid() -> Self {
        Self {
            valid: false,
            matrix: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
        }
    }

    /// A tracking-valid pose from a rigid transform.
    pub fn tracking(pose: &Pose) -> Self {
        let mut matrix = [[0.0; 4]; 3];
        for (i, row) in matrix.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().take(3).enumerate() {
                *cell = pose.rot[(i, j)];
            }
            row[3] = pose.trans[i];
        }
        Self {
            valid: true,
            matrix,
        }
    }

    /// Interpret the affine matrix as a [`Pose`].
    pub fn pose(&self) -> Pose {
        Pose::from_affine34(&self.matrix)
    }
}

impl Default for DevicePose {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Coarse classification of a device slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedDeviceClass {
    /// Unoccupied slot.
    Invalid,
    /// Head-mounted display.
    Hmd,
    /// Hand controller.
    Controller,
    /// Standalone tracker puck.
    GenericTracker,
    /// Base station / lighthouse.
    TrackingReference,
}

/// String properties the pipeline reads from devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceProperty {
    /// Opaque name of the tracking system the device belongs to. Two
    /// devices with the same name share a universe.
    TrackingSystemName,
    /// Device serial number, used only for log messages.
    SerialNumber,
}

/// Failure to read a device property.
#[derive(Debug, Error)]
pub enum PropertyError {
    /// The device does not provide the requested property.
    #[error("device {0} does not provide the requested property")]
    NotAvailable(TrackedDeviceIndex),
    /// The runtime reported an error.
    #[error("tracking runtime error: {0}")]
    Runtime(String),
}

/// Coordinate frame for pose queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingUniverse {
    /// Raw tracking space, without any calibration applied. The pipeline
    /// always samples here so its own offsets never feed back into the
    /// solve.
    RawAndUncalibrated,
    /// Seated zero pose.
    Seated,
    /// Standing (room-scale) zero pose.
    Standing,
}

/// Pose and property access to the tracking host.
pub trait TrackingRuntime {
    /// Whether the runtime is up. Ticks are dropped while it is not.
    fn is_available(&self) -> bool;

    /// Poses of every device slot, drawn atomically in one query.
    fn device_poses(
        &mut self,
        universe: TrackingUniverse,
        prediction_seconds: Real,
    ) -> [DevicePose; MAX_TRACKED_DEVICES];

    /// Classification of a device slot.
    fn device_class(&self, device: TrackedDeviceIndex) -> TrackedDeviceClass;

    /// Read a string property of a device.
    fn string_property(
        &self,
        device: TrackedDeviceIndex,
        property: DeviceProperty,
    ) -> Result<String, PropertyError>;
}

/// One collision-bounds quad: four corners in tracking space, metres.
pub type BoundsQuad = [[Real; 3]; 4];

/// Chaperone working-copy access.
///
/// Mirrors the host's transactional model: mutate a working copy, then
/// commit it to the live configuration.
pub trait ChaperoneSetup {
    /// Discard working-copy changes and reload from the live config.
    fn revert_working_copy(&mut self);

    /// Collision bounds of the live configuration.
    fn live_collision_bounds(&self) -> Vec<BoundsQuad>;

    /// Replace the working copy's collision bounds.
    fn set_working_collision_bounds(&mut self, quads: &[BoundsQuad]);

    /// Standing zero pose of the working copy.
    fn working_standing_zero_pose(&self) -> Pose;

    /// Replace the working copy's standing zero pose.
    fn set_working_standing_zero_pose(&mut self, pose: &Pose);

    /// Play area size `(x, z)` of the working copy, metres.
    fn working_play_area_size(&self) -> (Real, Real);

    /// Replace the working copy's play area size.
    fn set_working_play_area_size(&mut self, x: Real, z: Real);

    /// Commit the working copy to the live configuration.
    fn commit_working_copy_live(&mut self);
}
