//! Loudness input
//!
//! The core only needs one non-negative loudness value per tick; where it
//! comes from is up to the source.

pub mod loudness;

pub use loudness::{ConstantLoudness, LoudnessSource, ScriptedLoudness, SyntheticPerformer};
