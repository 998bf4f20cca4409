//! Simulated audience rig

use super::clock::SimClock;
use crate::audience::AudienceRig;
use crate::catalog::{SoundHandle, NO_ANIMATION};

/// State name reported while a triggered animation is still playing
pub const BUSY_STATE: &str = "Interruption";

/// Plays clips and animations on a simulated clock.
///
/// A non-zero animation keeps the rig out of its idle state for a fixed
/// duration, after which it reports the idle state name again.
#[derive(Debug, Clone)]
pub struct SimulatedRig {
    seat: String,
    clock: SimClock,
    animation_secs: f64,
    idle_state: String,
    animation_id: u32,
    busy_until: Option<f64>,
    looping: Option<SoundHandle>,
    loop_volume: f32,
    speed: f32,
}

impl SimulatedRig {
    pub fn new(
        seat: impl Into<String>,
        clock: SimClock,
        animation_secs: f32,
        idle_state: impl Into<String>,
    ) -> Self {
        Self {
            seat: seat.into(),
            clock,
            animation_secs: f64::from(animation_secs.max(0.0)),
            idle_state: idle_state.into(),
            animation_id: NO_ANIMATION,
            busy_until: None,
            looping: None,
            loop_volume: 1.0,
            speed: 1.0,
        }
    }

    pub fn animation_id(&self) -> u32 {
        self.animation_id
    }

    /// Clip on the loop channel, if any
    pub fn looping(&self) -> Option<&SoundHandle> {
        self.looping.as_ref()
    }

    pub fn loop_volume(&self) -> f32 {
        self.loop_volume
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    fn is_busy(&self) -> bool {
        self.busy_until
            .is_some_and(|until| self.clock.now() < until)
    }
}

impl AudienceRig for SimulatedRig {
    fn play_one_shot(&mut self, clip: &SoundHandle) {
        tracing::debug!("[{}] one-shot {}", self.seat, clip);
    }

    fn play_loop(&mut self, clip: &SoundHandle) {
        tracing::debug!(
            "[{}] looping {} at volume {:.2}",
            self.seat,
            clip,
            self.loop_volume
        );
        self.looping = Some(clip.clone());
    }

    fn stop_looping(&mut self) {
        if let Some(clip) = self.looping.take() {
            tracing::debug!("[{}] loop {} released", self.seat, clip);
        }
    }

    fn set_loop_volume(&mut self, volume: f32) {
        self.loop_volume = volume.clamp(0.0, 1.0);
    }

    fn trigger_animation(&mut self, animation_id: u32) {
        self.animation_id = animation_id;
        if animation_id == NO_ANIMATION {
            self.busy_until = None;
        } else {
            self.busy_until = Some(self.clock.now() + self.animation_secs);
            tracing::debug!("[{}] animation {}", self.seat, animation_id);
        }
    }

    fn set_animation_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    fn animation_state(&self) -> &str {
        if self.is_busy() {
            BUSY_STATE
        } else {
            &self.idle_state
        }
    }
}
