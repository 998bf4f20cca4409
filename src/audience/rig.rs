//! Playback collaborator for one audience member

use crate::catalog::SoundHandle;

/// Audio and animation controls for one seat.
///
/// Every call is fire-and-forget. The only thing the member ever reads back
/// is the current animation state name.
pub trait AudienceRig {
    /// Play a clip once at full volume, independent of the loop channel
    fn play_one_shot(&mut self, clip: &SoundHandle);

    /// Start a clip looping on the loop channel at the current loop volume
    fn play_loop(&mut self, clip: &SoundHandle);

    /// Clear the loop flag; the current iteration plays out
    fn stop_looping(&mut self);

    /// Volume of the loop channel, 0.0 - 1.0
    fn set_loop_volume(&mut self, volume: f32);

    /// Set the interruption animation parameter (0 = none)
    fn trigger_animation(&mut self, animation_id: u32);

    /// Playback speed multiplier for the current animation
    fn set_animation_speed(&mut self, speed: f32);

    /// Name of the animation state currently playing
    fn animation_state(&self) -> &str;
}
