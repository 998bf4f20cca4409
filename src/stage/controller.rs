//! Performance detection from the loudness signal
//!
//! Separate silence and noise timers give the controller hysteresis: a
//! performance only ends after sustained silence, and a noise spike only
//! counts once it has lasted long enough to rule out a cough or a door.

use serde::Serialize;
use std::fmt;

use super::lights::{LightPhase, LightRamp, LightingSink, RampKind, FULL_INTENSITY};
use crate::config::StageConfig;
use crate::events::{Publisher, StageEvent};
use crate::tasks::reached;

/// Whether a performance is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformancePhase {
    Idle,
    Performing,
}

impl fmt::Display for PerformancePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformancePhase::Idle => write!(f, "idle"),
            PerformancePhase::Performing => write!(f, "performing"),
        }
    }
}

/// Snapshot of everything the controller tracks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceState {
    /// A performance is recognized as ongoing
    pub active: bool,
    /// A dimming ramp is in flight
    pub lights_dimming: bool,
    /// Current stage light intensity, 0.5 - 1.0
    pub light_intensity: f32,
    /// Seconds of sustained silence
    pub silence_timer: f64,
    /// Seconds of sustained noise since the last silent tick
    pub noise_debounce_timer: f64,
    /// The audience has been told to clap and not yet told to stop
    pub audience_clapping: bool,
}

impl Default for PerformanceState {
    fn default() -> Self {
        Self {
            active: false,
            lights_dimming: false,
            light_intensity: FULL_INTENSITY,
            silence_timer: 0.0,
            noise_debounce_timer: 0.0,
            audience_clapping: false,
        }
    }
}

impl PerformanceState {
    pub fn phase(&self) -> PerformancePhase {
        if self.active {
            PerformancePhase::Performing
        } else {
            PerformancePhase::Idle
        }
    }
}

/// Converts loudness samples into performance transitions and drives the lights
pub struct StageController {
    config: StageConfig,
    state: PerformanceState,
    end_performance_time: f32,
    automatic_ending: bool,
    light_ramp: Option<LightRamp>,
    lights: Box<dyn LightingSink>,
}

impl StageController {
    pub fn new(config: StageConfig, mut lights: Box<dyn LightingSink>) -> Self {
        lights.set_intensity(FULL_INTENSITY);

        Self {
            end_performance_time: config.end_performance_time,
            config,
            state: PerformanceState::default(),
            automatic_ending: true,
            light_ramp: None,
            lights,
        }
    }

    pub fn state(&self) -> &PerformanceState {
        &self.state
    }

    pub fn is_performing(&self) -> bool {
        self.state.active
    }

    pub fn light_intensity(&self) -> f32 {
        self.state.light_intensity
    }

    pub fn light_phase(&self) -> LightPhase {
        self.light_ramp
            .as_ref()
            .map(|ramp| ramp.kind().into())
            .unwrap_or(LightPhase::Steady)
    }

    /// Silence needed before the performance ends
    pub fn end_performance_time(&self) -> f32 {
        self.end_performance_time
    }

    pub fn automatic_ending(&self) -> bool {
        self.automatic_ending
    }

    /// Process one loudness sample covering `dt` seconds
    pub fn tick<P: Publisher + ?Sized>(&mut self, loudness: f32, dt: f32, publisher: &mut P) {
        if !dt.is_finite() || dt <= 0.0 {
            tracing::warn!("Ignoring stage tick with invalid dt: {}", dt);
            return;
        }

        self.advance_lights(dt);

        let loudness = if loudness.is_finite() && loudness > 0.0 {
            loudness
        } else {
            0.0
        };
        let scaled = loudness * self.config.loudness_sensitivity;

        if scaled < self.config.loudness_threshold {
            self.on_silence(dt, publisher);
        } else {
            self.on_noise(dt, publisher);
        }
    }

    /// Begin a performance. Returns false if one is already running.
    pub fn start_performance<P: Publisher + ?Sized>(&mut self, publisher: &mut P) -> bool {
        if self.state.active {
            tracing::debug!("Performance already running, ignoring start");
            return false;
        }

        self.state.active = true;
        self.reset_timers();
        tracing::info!("Performance started");
        publisher.publish(StageEvent::PerformanceStarted);

        self.start_dimming();
        true
    }

    /// End the performance now. Returns false if none was running.
    pub fn end_performance<P: Publisher + ?Sized>(&mut self, publisher: &mut P) -> bool {
        if !self.state.active {
            tracing::debug!("No performance running, ignoring end");
            return false;
        }

        self.finish_performance(publisher);
        true
    }

    /// Flip between the short and the effectively-disabled silence window.
    /// Returns whether automatic ending is now on.
    pub fn toggle_automatic_ending(&mut self) -> bool {
        self.automatic_ending = !self.automatic_ending;
        self.end_performance_time = if self.automatic_ending {
            self.config.end_performance_time
        } else {
            self.config.manual_end_performance_time
        };

        tracing::info!(
            "Automatic ending {} (silence window {}s)",
            if self.automatic_ending { "on" } else { "off" },
            self.end_performance_time
        );
        self.automatic_ending
    }

    fn on_silence<P: Publisher + ?Sized>(&mut self, dt: f32, publisher: &mut P) {
        if !self.state.active {
            return;
        }

        self.state.silence_timer += f64::from(dt);
        self.state.noise_debounce_timer = 0.0;

        if !self.state.audience_clapping {
            self.state.audience_clapping = true;
            tracing::debug!("Silence detected, audience starts clapping");
            publisher.publish(StageEvent::ClappingStarted);
        }

        if reached(self.state.silence_timer, self.end_performance_time) {
            tracing::debug!(
                "Silent for {:.2}s (limit {}s)",
                self.state.silence_timer,
                self.end_performance_time
            );
            self.finish_performance(publisher);
        }
    }

    fn on_noise<P: Publisher + ?Sized>(&mut self, dt: f32, publisher: &mut P) {
        if !self.state.active {
            return;
        }

        self.state.noise_debounce_timer += f64::from(dt);

        if self.state.audience_clapping {
            self.state.audience_clapping = false;
            tracing::debug!("Noise resumed, audience stops clapping");
            publisher.publish(StageEvent::ClappingStopped);
        }

        if reached(
            self.state.noise_debounce_timer,
            self.config.continue_performance_time,
        ) && self.state.silence_timer > 0.0
        {
            tracing::debug!(
                "Noise sustained for {:.2}s, silence timer reset",
                self.state.noise_debounce_timer
            );
            self.state.silence_timer = 0.0;
        }
    }

    fn finish_performance<P: Publisher + ?Sized>(&mut self, publisher: &mut P) {
        self.state.active = false;
        self.state.audience_clapping = false;
        self.reset_timers();
        tracing::info!("Performance ended");
        publisher.publish(StageEvent::PerformanceEnded);

        self.start_brightening();
    }

    fn reset_timers(&mut self) {
        self.state.silence_timer = 0.0;
        self.state.noise_debounce_timer = 0.0;
    }

    fn start_dimming(&mut self) {
        if let Some(ramp) = &self.light_ramp {
            tracing::debug!("Lights already {}, not dimming", ramp.kind());
            return;
        }

        self.light_ramp = Some(LightRamp::dim(self.state.light_intensity, self.config.dim_time));
        self.state.lights_dimming = true;
        tracing::debug!("Lights dimming over {}s", self.config.dim_time);
    }

    fn start_brightening(&mut self) {
        if matches!(&self.light_ramp, Some(ramp) if ramp.kind() == RampKind::Brightening) {
            return;
        }

        self.light_ramp = Some(LightRamp::brighten(
            self.state.light_intensity,
            self.config.brighten_time,
        ));
        self.state.lights_dimming = false;
        tracing::debug!("Lights brightening over {}s", self.config.brighten_time);
    }

    fn advance_lights(&mut self, dt: f32) {
        let Some(ramp) = self.light_ramp.as_mut() else {
            return;
        };

        let intensity = ramp.advance(dt);
        self.state.light_intensity = intensity;
        self.lights.set_intensity(intensity);

        if ramp.is_done() {
            let kind = ramp.kind();
            self.light_ramp = None;
            if kind == RampKind::Dimming {
                self.state.lights_dimming = false;
            }
            tracing::info!("Lights finished {} at {:.2}", kind, intensity);
        }
    }
}
