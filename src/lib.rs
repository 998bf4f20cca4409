//! Ovation - Simulated Audience
//!
//! A simulated audience that reacts to a performer's loudness:
//! - Detects performance start/continue/end from a loudness signal with hysteresis
//! - Dims and brightens the stage lights over timed ramps
//! - Seats audience members who cough, shuffle and clap on cue
//! - Delivers stage events synchronously over an explicit event bus

pub mod audience;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod input;
pub mod output;
pub mod stage;
pub mod tasks;

pub use config::Config;
pub use error::{OvationError, Result};
pub use events::{EventBus, Publisher, StageEvent, StageListener, SubscriberId};
pub use stage::{Stage, StageBuilder, StageController, StageSnapshot};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
