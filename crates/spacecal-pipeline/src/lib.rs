//! Tick-driven calibration pipeline.
//!
//! This crate hosts the process-wide [`CalibrationContext`], the
//! [`Calibrator`] state machine that collects paired samples and commits
//! solved transforms, and the periodic profile application that keeps every
//! target-universe device offset in sync.
//!
//! The pipeline talks to its surroundings exclusively through narrow
//! adapter traits: [`TrackingRuntime`] and [`ChaperoneSetup`] for the
//! tracking host, [`DriverClient`] for the pose-offset driver IPC,
//! [`RawPoseChannel`] for the raw-pose shared memory, and [`ProfileStore`]
//! for persisted profiles. In-memory implementations of all of them live
//! in [`mock`] for tests and host integration work.

/// Profile application and chaperone restoration.
pub mod apply;
/// Calibration state machine.
pub mod calibration;
/// Process-wide calibration context.
pub mod context;
/// Pose-offset driver contract.
pub mod driver;
/// In-memory adapters for tests and examples.
pub mod mock;
/// Profile persistence.
pub mod profile;
/// Tracking runtime contract.
pub mod runtime;

pub use calibration::Calibrator;
pub use context::{
    CalibrationContext, CalibrationState, ChaperoneSnapshot, DEFAULT_SAMPLE_COUNT,
    MIN_TICK_INTERVAL,
};
pub use driver::{
    reset_and_disable_offsets, DriverClient, DriverPose, DriverRequest, RawPoseChannel,
    SetDeviceTransform, RAW_POSE_SHMEM_NAME,
};
pub use profile::{JsonProfileStore, Profile, ProfileStore};
pub use runtime::{
    BoundsQuad, ChaperoneSetup, DevicePose, DeviceProperty, PropertyError, TrackedDeviceClass,
    TrackedDeviceIndex, TrackingRuntime, TrackingUniverse, HMD_DEVICE_INDEX, MAX_TRACKED_DEVICES,
};
