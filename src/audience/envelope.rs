//! Clap volume/speed envelope

use std::fmt;

use crate::stage::lights::lerp;
use crate::tasks::{reached, TIME_EPSILON};

/// Which way the envelope is moving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClapDirection {
    Increasing,
    Decreasing,
    #[default]
    Idle,
}

impl ClapDirection {
    pub fn sign(&self) -> f32 {
        match self {
            ClapDirection::Increasing => 1.0,
            ClapDirection::Decreasing => -1.0,
            ClapDirection::Idle => 0.0,
        }
    }
}

impl fmt::Display for ClapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClapDirection::Increasing => write!(f, "increasing"),
            ClapDirection::Decreasing => write!(f, "decreasing"),
            ClapDirection::Idle => write!(f, "idle"),
        }
    }
}

/// Elapsed time along a linear 0 -> 1 ramp of fixed duration.
///
/// The envelope never leaves [0, duration]; at either end it simply holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ClapEnvelope {
    elapsed: f64,
    duration: f32,
}

impl ClapEnvelope {
    pub fn new(duration: f32) -> Self {
        Self {
            elapsed: 0.0,
            duration: duration.max(f32::EPSILON),
        }
    }

    /// Move `dt` seconds in `direction` and return the new level
    pub fn advance(&mut self, dt: f32, direction: ClapDirection) -> f32 {
        let next = self.elapsed + f64::from(dt * direction.sign());
        self.elapsed = if next <= TIME_EPSILON {
            0.0
        } else if reached(next, self.duration) {
            f64::from(self.duration)
        } else {
            next
        };
        self.level()
    }

    /// Volume and animation speed, 0.0 - 1.0
    pub fn level(&self) -> f32 {
        lerp(0.0, 1.0, (self.elapsed / f64::from(self.duration)) as f32)
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed as f32
    }

    pub fn is_silent(&self) -> bool {
        self.elapsed <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_then_down_trace() {
        let mut envelope = ClapEnvelope::new(5.0);
        let mut trace = vec![envelope.level()];
        for _ in 0..5 {
            trace.push(envelope.advance(1.0, ClapDirection::Increasing));
        }
        assert_eq!(envelope.level(), 1.0);
        for _ in 0..5 {
            trace.push(envelope.advance(1.0, ClapDirection::Decreasing));
        }
        assert!(envelope.is_silent());

        assert_eq!(
            trace,
            vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0, 0.8, 0.6, 0.4, 0.2, 0.0]
        );
    }

    #[test]
    fn test_holds_at_full() {
        let mut envelope = ClapEnvelope::new(2.0);
        for _ in 0..10 {
            envelope.advance(1.0, ClapDirection::Increasing);
        }
        assert_eq!(envelope.elapsed(), 2.0);
        assert_eq!(envelope.level(), 1.0);
    }

    #[test]
    fn test_never_negative() {
        let mut envelope = ClapEnvelope::new(2.0);
        assert_eq!(envelope.advance(3.0, ClapDirection::Decreasing), 0.0);
        assert!(envelope.is_silent());
    }

    #[test]
    fn test_idle_direction_holds() {
        let mut envelope = ClapEnvelope::new(4.0);
        envelope.advance(1.0, ClapDirection::Increasing);
        assert_eq!(envelope.advance(1.0, ClapDirection::Idle), 0.25);
    }

    #[test]
    fn test_ends_on_time_at_120hz() {
        let dt = 1.0 / 120.0;
        let mut envelope = ClapEnvelope::new(5.0);

        for _ in 0..599 {
            envelope.advance(dt, ClapDirection::Increasing);
        }
        assert!(envelope.level() < 1.0);
        assert_eq!(envelope.advance(dt, ClapDirection::Increasing), 1.0);

        for _ in 0..599 {
            envelope.advance(dt, ClapDirection::Decreasing);
        }
        assert!(!envelope.is_silent());
        assert_eq!(envelope.advance(dt, ClapDirection::Decreasing), 0.0);
        assert!(envelope.is_silent());
    }
}
