//! Profile persistence.
//!
//! A [`Profile`] captures everything needed to re-apply a finished
//! calibration after a restart: the two tracking-system names, the solved
//! transform in its externally visible units, the configured scale, and
//! the chaperone snapshot. [`JsonProfileStore`] persists profiles as
//! pretty-printed JSON files.

use crate::context::{CalibrationContext, ChaperoneSnapshot};
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use spacecal_core::{Real, Vec3};
use std::fs;
use std::path::PathBuf;

/// Persisted calibration profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Tracking system of the reference device.
    pub reference_tracking_system: String,
    /// Tracking system of the calibrated target universe.
    pub target_tracking_system: String,
    /// Calibrated rotation, ZYX Euler degrees.
    pub rotation_deg: Vec3,
    /// Calibrated translation, centimetres.
    pub translation_cm: Vec3,
    /// Uniform scale factor.
    pub scale: Real,
    /// Chaperone snapshot taken when the profile was saved.
    pub chaperone: ChaperoneSnapshot,
}

impl Profile {
    /// Snapshot the persistable fields of a context.
    pub fn from_context(ctx: &CalibrationContext) -> Self {
        Self {
            reference_tracking_system: ctx.reference_tracking_system.clone(),
            target_tracking_system: ctx.target_tracking_system.clone(),
            rotation_deg: ctx.calibrated_rotation,
            translation_cm: ctx.calibrated_translation,
            scale: ctx.calibrated_scale,
            chaperone: ctx.chaperone.clone(),
        }
    }

    /// Install the profile into a context and mark it valid.
    pub fn apply_to_context(&self, ctx: &mut CalibrationContext) {
        ctx.reference_tracking_system = self.reference_tracking_system.clone();
        ctx.target_tracking_system = self.target_tracking_system.clone();
        ctx.calibrated_rotation = self.rotation_deg;
        ctx.calibrated_translation = self.translation_cm;
        ctx.calibrated_scale = self.scale;
        ctx.chaperone = self.chaperone.clone();
        ctx.valid_profile = true;
    }
}

/// Persistence boundary for calibration profiles.
pub trait ProfileStore {
    /// Persist a profile, replacing any previous one.
    fn save(&mut self, profile: &Profile) -> Result<()>;

    /// Load the stored profile, if any.
    fn load(&mut self) -> Result<Option<Profile>>;
}

/// [`ProfileStore`] backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    /// A store reading and writing the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path the store persists to.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ProfileStore for JsonProfileStore {
    fn save(&mut self, profile: &Profile) -> Result<()> {
        let json = serde_json::to_string_pretty(profile)?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing profile to {}", self.path.display()))
    }

    fn load(&mut self) -> Result<Option<Profile>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("reading profile from {}", self.path.display()))?;
        let profile = serde_json::from_str(&data)
            .with_context(|| format!("parsing profile {}", self.path.display()))?;
        Ok(Some(profile))
    }
}
