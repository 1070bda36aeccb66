//! Closed-form solvers for the space calibration problem.
//!
//! Given paired pose samples of two rigidly attached tracked devices, this
//! crate estimates the rigid transform mapping the target device's tracking
//! universe onto the reference device's universe:
//!
//! - [`rotation`]: Kabsch fit over paired delta-rotation axes,
//! - [`translation`]: stacked linear least squares over per-pair
//!   translational constraints,
//! - [`quality`]: retargeting error, sensitivity probe and coplanarity
//!   analysis used to gate a candidate calibration,
//! - [`solve`]: the combined rotation → translation → quality fit.

use thiserror::Error;

/// Quality gates for a candidate calibration.
pub mod quality;
/// Rotation fit over paired delta-rotation axes.
pub mod rotation;
/// Combined closed-form fit.
pub mod solve;
/// Translation fit over stacked pair constraints.
pub mod translation;

pub use quality::*;
pub use rotation::*;
pub use solve::*;
pub use translation::*;

/// Errors that can occur during a calibration fit.
#[derive(Debug, Error)]
pub enum SolveError {
    /// Not enough valid samples were provided.
    #[error("need at least {needed} valid samples, got {got}")]
    NotEnoughSamples {
        /// Minimum number of valid samples for this operation.
        needed: usize,
        /// Number of valid samples actually provided.
        got: usize,
    },
    /// No sample pair moved past the delta-rotation gates.
    #[error("no sample pair rotated enough to constrain the fit; rotate the pair more")]
    NoUsableMotion,
    /// A singular value or eigen decomposition failed to converge.
    #[error("decomposition failed during calibration fit")]
    DecompositionFailed,
}
