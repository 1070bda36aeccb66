//! Process-wide calibration context.
//!
//! One [`CalibrationContext`] lives for the whole process and is mutated
//! only from the tick path. It carries the active calibration values in
//! their externally visible units (Euler ZYX degrees, centimetres), the
//! per-tick device pose snapshot, timing state, the chaperone snapshot and
//! the user-facing message log.

use crate::runtime::{BoundsQuad, DevicePose, TrackedDeviceIndex, MAX_TRACKED_DEVICES};
use serde::{Deserialize, Serialize};
use spacecal_core::{Pose, Real, Vec3};

/// Default number of samples collected per calibration session.
pub const DEFAULT_SAMPLE_COUNT: usize = 100;

/// Minimum spacing between processed ticks, seconds.
pub const MIN_TICK_INTERVAL: Real = 0.05;

/// Phase of the calibration state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationState {
    /// Idle; the profile scan runs at 1 Hz.
    #[default]
    None,
    /// The user is adjusting the calibration; the scan runs at 10 Hz.
    Editing,
    /// A calibration was requested; validate the device pair.
    Begin,
    /// Collecting paired samples while the user rotates the pair.
    Rotation,
}

/// Persisted play-area geometry and standing zero pose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChaperoneSnapshot {
    /// Collision-bound quads in tracking space.
    pub geometry: Vec<BoundsQuad>,
    /// Standing zero pose to raw tracking pose.
    pub standing_center: Pose,
    /// Play area size `(x, z)` in metres.
    pub play_space_size: (Real, Real),
    /// Whether the snapshot holds usable geometry.
    pub valid: bool,
    /// Re-apply the snapshot automatically when the live geometry differs.
    pub auto_apply: bool,
}

impl Default for ChaperoneSnapshot {
    fn default() -> Self {
        Self {
            geometry: Vec::new(),
            standing_center: Pose::identity(),
            play_space_size: (0.0, 0.0),
            valid: false,
            auto_apply: true,
        }
    }
}

/// Process-wide calibration state.
#[derive(Debug, Clone)]
pub struct CalibrationContext {
    /// Current phase of the state machine.
    pub state: CalibrationState,
    /// Device whose universe is treated as ground truth, typically the HMD.
    pub reference_id: Option<TrackedDeviceIndex>,
    /// Device rigidly attached to the reference during calibration.
    pub target_id: Option<TrackedDeviceIndex>,
    /// Raw-universe pose snapshot, refreshed every processed tick.
    pub device_poses: [DevicePose; MAX_TRACKED_DEVICES],
    /// Tracking system the calibration's reference belongs to.
    pub reference_tracking_system: String,
    /// Tracking system the calibration maps onto the reference.
    pub target_tracking_system: String,
    /// Calibrated rotation, ZYX Euler degrees (component 0 about Z,
    /// 1 about Y, 2 about X; with Y up, 1 is yaw, 2 pitch, 0 roll).
    pub calibrated_rotation: Vec3,
    /// Calibrated translation in centimetres.
    pub calibrated_translation: Vec3,
    /// Uniform scale, externally configured; never written by the solver.
    pub calibrated_scale: Real,
    /// Whether the calibration values form a usable profile.
    pub valid_profile: bool,
    /// Whether offsets are currently being applied.
    pub enabled: bool,
    /// Samples to collect per calibration session.
    pub sample_count: usize,
    /// Time of the last processed tick, seconds.
    pub time_last_tick: Real,
    /// Time of the last profile scan, seconds.
    pub time_last_scan: Real,
    /// Tick cadence the pipeline asks its host for, seconds. Zero means
    /// "as fast as possible"; the host is free to ignore it.
    pub wanted_update_interval: Real,
    /// Persisted chaperone geometry.
    pub chaperone: ChaperoneSnapshot,
    /// User-facing message log.
    pub messages: Vec<String>,
}

impl Default for CalibrationContext {
    fn default() -> Self {
        Self {
            state: CalibrationState::None,
            reference_id: None,
            target_id: None,
            device_poses: [DevicePose::invalid(); MAX_TRACKED_DEVICES],
            reference_tracking_system: String::new(),
            target_tracking_system: String::new(),
            calibrated_rotation: Vec3::zeros(),
            calibrated_translation: Vec3::zeros(),
            calibrated_scale: 1.0,
            valid_profile: false,
            enabled: false,
            sample_count: DEFAULT_SAMPLE_COUNT,
            time_last_tick: 0.0,
            time_last_scan: 0.0,
            wanted_update_interval: 0.0,
            chaperone: ChaperoneSnapshot::default(),
            messages: Vec::new(),
        }
    }
}

impl CalibrationContext {
    /// Append a user-facing message; also mirrored to the log facade.
    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{message}");
        self.messages.push(message);
    }

    /// Report sample-collection progress, collapsing consecutive updates
    /// into a single message line.
    pub fn progress(&mut self, collected: usize, wanted: usize) {
        let message = format!("Collected {collected}/{wanted} samples");
        log::debug!("{message}");
        match self.messages.last_mut() {
            Some(last) if last.starts_with("Collected ") => *last = message,
            _ => self.messages.push(message),
        }
    }

    /// Drop all user-facing messages.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }
}
