//! Shared simulated clock

use std::cell::Cell;
use std::rc::Rc;

/// Seconds of simulated time, shared by the runner and the rigs it drives.
///
/// Cloning hands out another view of the same clock.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: Rc<Cell<f64>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.now.get()
    }

    pub fn advance(&self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.now.set(self.now.get() + f64::from(dt));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_time() {
        let clock = SimClock::new();
        let view = clock.clone();
        clock.advance(1.5);
        clock.advance(-3.0);
        assert_eq!(view.now(), 1.5);
    }
}
