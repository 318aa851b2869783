//! Aiming core for the near-field EM leakage localization platform.
//!
//! The modules cover the full aiming pipeline: PSD measurement chunks with
//! frequency-domain slicing, spatial denoising, percentile hot-spot
//! detection, two-stage density clustering with confidence scoring, and
//! grid-to-physical coordinate mapping.

pub mod aiming;
pub mod chunk;
pub mod math;
pub mod prelude;
pub mod telemetry;

pub use prelude::{AimError, AimResult, GridPoint};
