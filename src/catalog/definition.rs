//! Interruption definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Animation id that means "no interruption animation"
pub const NO_ANIMATION: u32 = 0;

/// Opaque handle to an audio clip.
///
/// The core never inspects it; the playback collaborator resolves it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SoundHandle(Arc<str>);

impl SoundHandle {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SoundHandle {
    fn from(key: String) -> Self {
        Self(Arc::from(key))
    }
}

impl From<SoundHandle> for String {
    fn from(handle: SoundHandle) -> Self {
        handle.0.to_string()
    }
}

impl fmt::Display for SoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single interruption or clap: an animation to trigger and a clip to play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptionDefinition {
    /// Animation variant to trigger (0 = none)
    #[serde(default)]
    pub animation_id: u32,
    /// Clip to play, if any
    #[serde(default)]
    pub sound: Option<SoundHandle>,
}

impl InterruptionDefinition {
    pub fn new(animation_id: u32, sound: Option<SoundHandle>) -> Self {
        Self {
            animation_id,
            sound,
        }
    }

    /// Definition with only a sound
    pub fn sound_only(sound: impl AsRef<str>) -> Self {
        Self::new(NO_ANIMATION, Some(SoundHandle::new(sound)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sound_only_has_no_animation() {
        let def = InterruptionDefinition::sound_only("cough.wav");
        assert_eq!(def.animation_id, NO_ANIMATION);
        assert_eq!(def.sound.as_ref().map(|s| s.as_str()), Some("cough.wav"));
    }

    #[test]
    fn test_sound_handle_deserializes_from_string() {
        let def: InterruptionDefinition =
            toml::from_str("animation_id = 3\nsound = \"sneeze.ogg\"").unwrap();
        assert_eq!(def.animation_id, 3);
        assert_eq!(def.sound, Some(SoundHandle::new("sneeze.ogg")));
    }

    #[test]
    fn test_missing_fields_default() {
        let def: InterruptionDefinition = toml::from_str("").unwrap();
        assert_eq!(def, InterruptionDefinition::new(NO_ANIMATION, None));
    }
}
