//! Pose-offset driver contract.
//!
//! The driver applies a persistent rigid offset to every device of the
//! target universe. The pipeline drives it through a single synchronous
//! request type, [`SetDeviceTransform`], and holds an open handle to the
//! driver's raw-pose shared-memory channel for future per-device
//! overrides; the channel is never read here.

use crate::runtime::{DevicePose, TrackedDeviceIndex};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use spacecal_core::{quat_to_mat, Quat, Real, Vec3};

/// Name of the shared-memory channel carrying raw driver poses.
pub const RAW_POSE_SHMEM_NAME: &str = "OPENVR_SPACECALIBRATOR_SHMEM_NAME";

/// Per-device offset update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetDeviceTransform {
    /// Device slot the offset applies to.
    pub device: TrackedDeviceIndex,
    /// Whether the offset is active. Disabled offsets reset the device.
    pub enabled: bool,
    /// Universe translation in metres.
    pub translation: Vec3,
    /// Universe rotation, unit quaternion, scalar-first.
    pub rotation: Quat,
    /// Uniform scale factor, externally configured.
    pub scale: Real,
}

impl SetDeviceTransform {
    /// An enabled offset with unit scale.
    pub fn new(device: TrackedDeviceIndex, translation: Vec3, rotation: Quat) -> Self {
        Self {
            device,
            enabled: true,
            translation,
            rotation,
            scale: 1.0,
        }
    }

    /// Replace the scale factor.
    pub fn with_scale(mut self, scale: Real) -> Self {
        self.scale = scale;
        self
    }

    /// A zero/identity offset that disables the device's transform.
    pub fn disabled(device: TrackedDeviceIndex) -> Self {
        Self {
            device,
            enabled: false,
            translation: Vec3::zeros(),
            rotation: Quat::new(1.0, 0.0, 0.0, 0.0),
            scale: 1.0,
        }
    }
}

/// Requests understood by the offset driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DriverRequest {
    /// Install or clear a per-device offset.
    SetDeviceTransform(SetDeviceTransform),
}

/// Synchronous IPC channel to the offset driver.
pub trait DriverClient {
    /// Send a request and wait for the driver to acknowledge it.
    fn send_blocking(&mut self, request: &DriverRequest) -> Result<()>;
}

/// Send a zero/identity disabled offset for a device.
pub fn reset_and_disable_offsets<D: DriverClient>(
    driver: &mut D,
    device: TrackedDeviceIndex,
) -> Result<()> {
    driver.send_blocking(&DriverRequest::SetDeviceTransform(
        SetDeviceTransform::disabled(device),
    ))
}

/// Open-by-name handle to the raw-pose shared memory.
pub trait RawPoseChannel {
    /// Open the named channel. Called once at pipeline construction.
    fn open(&mut self, name: &str) -> Result<()>;
}

/// Raw pose record as published by the driver over shared memory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DriverPose {
    /// Whether the device was tracking.
    pub valid: bool,
    /// Position in metres.
    pub position: [Real; 3],
    /// Orientation quaternion, scalar-first.
    pub rotation: [Real; 4],
    /// Linear velocity, metres per second.
    pub velocity: [Real; 3],
    /// Angular velocity, radians per second.
    pub angular_velocity: [Real; 3],
}

impl DevicePose {
    /// Convert a raw driver pose into the runtime's matrix form.
    pub fn from_driver_pose(raw: &DriverPose) -> Self {
        let rot = quat_to_mat(&Quat::new(
            raw.rotation[0],
            raw.rotation[1],
            raw.rotation[2],
            raw.rotation[3],
        ));

        let mut matrix = [[0.0; 4]; 3];
        for (i, row) in matrix.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().take(3).enumerate() {
                *cell = rot[(i, j)];
            }
            row[3] = raw.position[i];
        }

        Self {
            valid: raw.valid,
            matrix,
        }
    }
}
