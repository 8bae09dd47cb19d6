#![deny(missing_docs)]
//! ## Crate Items Overview
//!
//! Real-time hand tracking from a sparse active-marker rig: occluded markers
//! are filled in by a pipeline of predictors and the completed marker set is
//! turned into joint rotations.
//!
//! ### Modules
//! - [`mocap_core`](crate::mocap_core) - Predictors, solvers, the neural
//!   inference engine and the hand template.
//! - [`mocap_utils`](crate::mocap_utils) - Vector and numerical helpers.
//! - [`tracker`] - The per-frame chain assembled from a configuration file.
//! - [`evaluation`] and [`simulation`] - Tooling to measure reconstruction
//!   quality on synthetic occlusions.
//!
//! ## Demos
//! `demos/replay` replays a synthetic hand motion with simulated occlusions
//! and reports the reconstruction error of the configured pipeline.
pub use mocap_core;
pub use mocap_utils;

/// Error metrics of reconstructed markers
pub mod evaluation;
/// Random occlusions for testing predictors
pub mod simulation;
/// Occlusion resolution and joint prediction driven by a configuration
pub mod tracker;
