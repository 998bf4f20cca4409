//! Lighting sink that logs instead of driving fixtures

use crate::stage::{LightingSink, DIMMED_INTENSITY, FULL_INTENSITY};

/// Smallest change worth a log line
const LOG_STEP: f32 = 0.1;

/// Reports intensity changes through tracing in coarse steps
#[derive(Debug, Clone)]
pub struct TracingLights {
    current: Option<f32>,
    last_logged: Option<f32>,
}

impl TracingLights {
    pub fn new() -> Self {
        Self {
            current: None,
            last_logged: None,
        }
    }

    /// Most recent intensity pushed by the controller
    pub fn current(&self) -> Option<f32> {
        self.current
    }

    fn should_log(&self, intensity: f32) -> bool {
        match self.last_logged {
            None => true,
            Some(last) if last == intensity => false,
            Some(last) => {
                (intensity - last).abs() >= LOG_STEP
                    || intensity == FULL_INTENSITY
                    || intensity == DIMMED_INTENSITY
            }
        }
    }
}

impl Default for TracingLights {
    fn default() -> Self {
        Self::new()
    }
}

impl LightingSink for TracingLights {
    fn set_intensity(&mut self, intensity: f32) {
        self.current = Some(intensity);

        if self.should_log(intensity) {
            tracing::info!("Stage lights at {:.0}%", intensity * 100.0);
            self.last_logged = Some(intensity);
        } else {
            tracing::trace!("Stage lights at {:.3}", intensity);
        }
    }
}
