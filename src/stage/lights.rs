//! Stage lighting ramps

use serde::Serialize;
use std::fmt;

use crate::tasks::reached;

/// House lights fully up
pub const FULL_INTENSITY: f32 = 1.0;
/// House lights during a performance
pub const DIMMED_INTENSITY: f32 = 0.5;

/// Receives light intensity updates while a ramp runs
pub trait LightingSink {
    fn set_intensity(&mut self, intensity: f32);
}

/// Linear interpolation, `t` clamped to [0, 1]
pub fn lerp(start: f32, end: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    start + (end - start) * t
}

/// Direction of a light ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RampKind {
    Dimming,
    Brightening,
}

impl fmt::Display for RampKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RampKind::Dimming => write!(f, "dimming"),
            RampKind::Brightening => write!(f, "brightening"),
        }
    }
}

/// What the lights are doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LightPhase {
    Steady,
    Dimming,
    Brightening,
}

impl From<RampKind> for LightPhase {
    fn from(kind: RampKind) -> Self {
        match kind {
            RampKind::Dimming => Self::Dimming,
            RampKind::Brightening => Self::Brightening,
        }
    }
}

/// An in-flight intensity ramp driven by accumulated tick time
#[derive(Debug, Clone, PartialEq)]
pub struct LightRamp {
    kind: RampKind,
    start: f32,
    end: f32,
    duration: f32,
    elapsed: f64,
}

impl LightRamp {
    /// Ramp from `from` down to [`DIMMED_INTENSITY`]
    pub fn dim(from: f32, duration: f32) -> Self {
        Self::new(RampKind::Dimming, from, DIMMED_INTENSITY, duration)
    }

    /// Ramp from `from` up to [`FULL_INTENSITY`]
    pub fn brighten(from: f32, duration: f32) -> Self {
        Self::new(RampKind::Brightening, from, FULL_INTENSITY, duration)
    }

    fn new(kind: RampKind, start: f32, end: f32, duration: f32) -> Self {
        Self {
            kind,
            start,
            end,
            duration: duration.max(0.0),
            elapsed: 0.0,
        }
    }

    pub fn kind(&self) -> RampKind {
        self.kind
    }

    /// Advance by `dt` seconds and return the new intensity
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed += f64::from(dt);
        lerp(self.start, self.end, self.progress())
    }

    /// Fraction complete in [0, 1]
    pub fn progress(&self) -> f32 {
        if self.is_done() {
            1.0
        } else {
            (self.elapsed / f64::from(self.duration)) as f32
        }
    }

    pub fn is_done(&self) -> bool {
        reached(self.elapsed, self.duration)
    }
}
