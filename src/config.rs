//! Configuration parsing and management for Ovation

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, OvationError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub stage: StageConfig,
    pub audience: AudienceConfig,
    pub catalog: CatalogConfig,
    pub simulation: SimulationConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, OvationError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, OvationError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, OvationError> {
        let paths = [
            PathBuf::from("ovation.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration.
    ///
    /// Every duration and threshold must be finite and non-negative; a bad
    /// value is reported here rather than surfacing mid-ramp.
    pub fn validate(&self) -> Result<(), OvationError> {
        let stage = &self.stage;
        non_negative("stage.loudness_threshold", stage.loudness_threshold)?;
        non_negative("stage.loudness_sensitivity", stage.loudness_sensitivity)?;
        non_negative("stage.end_performance_time", stage.end_performance_time)?;
        non_negative(
            "stage.manual_end_performance_time",
            stage.manual_end_performance_time,
        )?;
        non_negative(
            "stage.continue_performance_time",
            stage.continue_performance_time,
        )?;
        non_negative("stage.dim_time", stage.dim_time)?;
        non_negative("stage.brighten_time", stage.brighten_time)?;

        let audience = &self.audience;
        non_negative(
            "audience.interruption_delay_time",
            audience.interruption_delay_time,
        )?;
        non_negative(
            "audience.interruption_variability",
            audience.interruption_variability,
        )?;
        non_negative("audience.clap_ramp_duration", audience.clap_ramp_duration)?;
        if audience.clap_ramp_duration == 0.0 {
            return Err(ConfigError::invalid(
                "audience.clap_ramp_duration",
                "Clap ramp duration must be greater than 0",
            )
            .into());
        }
        if audience.idle_animation_state.is_empty() {
            return Err(ConfigError::invalid(
                "audience.idle_animation_state",
                "Idle animation state name must not be empty",
            )
            .into());
        }

        let sim = &self.simulation;
        if !sim.tick_rate_hz.is_finite() || sim.tick_rate_hz <= 0.0 {
            return Err(ConfigError::invalid(
                "simulation.tick_rate_hz",
                "Tick rate must be greater than 0",
            )
            .into());
        }
        non_negative("simulation.play_secs", sim.play_secs)?;
        non_negative("simulation.pause_secs", sim.pause_secs)?;
        non_negative("simulation.level", sim.level)?;
        non_negative("simulation.jitter", sim.jitter)?;
        non_negative("simulation.animation_secs", sim.animation_secs)?;
        non_negative("simulation.status_secs", sim.status_secs)?;
        if let Some(duration) = sim.duration_secs {
            non_negative("simulation.duration_secs", duration)?;
        }

        Ok(())
    }
}

fn non_negative(field: &str, value: f32) -> Result<(), OvationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::invalid(field, "Value must be a finite number >= 0").into());
    }
    Ok(())
}

/// Stage controller tuning: loudness hysteresis and lighting ramps.
///
/// All times are in seconds of accumulated tick time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Scaled loudness at or above this value counts as noise
    pub loudness_threshold: f32,
    /// Multiplier applied to the raw loudness sample before thresholding
    pub loudness_sensitivity: f32,
    /// Sustained silence that ends a performance
    pub end_performance_time: f32,
    /// Silence window used while automatic ending is toggled off
    pub manual_end_performance_time: f32,
    /// Sustained noise needed to confirm the performance continues
    pub continue_performance_time: f32,
    /// Duration of the 1.0 -> 0.5 dimming ramp
    pub dim_time: f32,
    /// Duration of the 0.5 -> 1.0 brightening ramp
    pub brighten_time: f32,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            loudness_threshold: 1.0,
            loudness_sensitivity: 100.0,
            end_performance_time: 10.0,
            manual_end_performance_time: 1000.0,
            continue_performance_time: 2.0,
            dim_time: 2.0,
            brighten_time: 2.0,
        }
    }
}

/// Audience member behavior tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudienceConfig {
    /// Number of audience members to seat
    pub members: usize,
    /// Mean wait between interruptions
    pub interruption_delay_time: f32,
    /// Half-width of the uniform jitter around the mean wait
    pub interruption_variability: f32,
    /// Time for the clap envelope to go from silent to full
    pub clap_ramp_duration: f32,
    /// Animation state name the rig reports when nothing is playing
    pub idle_animation_state: String,
    /// Seed for reproducible runs (random if unset)
    pub seed: Option<u64>,
}

impl Default for AudienceConfig {
    fn default() -> Self {
        Self {
            members: 12,
            interruption_delay_time: 30.0,
            interruption_variability: 20.0,
            clap_ramp_duration: 5.0,
            idle_animation_state: "Idle".to_string(),
            seed: None,
        }
    }
}

/// Interruption catalog source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// TOML manifest listing interruptions and claps (built-in set if unset)
    pub manifest: Option<PathBuf>,
}

/// Settings for the bundled simulation runner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Ticks per second
    pub tick_rate_hz: f32,
    /// Pace ticks against the wall clock
    pub realtime: bool,
    /// Stop after this many simulated seconds
    pub duration_secs: Option<f32>,
    /// Loudness trace to replay instead of the synthetic performer
    pub script: Option<PathBuf>,
    /// Synthetic performer: seconds of playing per phase
    pub play_secs: f32,
    /// Synthetic performer: seconds of silence between phases
    pub pause_secs: f32,
    /// Synthetic performer: raw loudness while playing
    pub level: f32,
    /// Synthetic performer: random jitter added to the level
    pub jitter: f32,
    /// Simulated rig: how long a triggered animation stays non-idle
    pub animation_secs: f32,
    /// Seconds between status summaries in the log (0 disables)
    pub status_secs: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60.0,
            realtime: true,
            duration_secs: None,
            script: None,
            play_secs: 45.0,
            pause_secs: 15.0,
            level: 0.05,
            jitter: 0.02,
            animation_secs: 2.5,
            status_secs: 5.0,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("ovation");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/ovation");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/ovation");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("ovation");
        }
    }

    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.stage.end_performance_time, 10.0);
        assert_eq!(config.stage.manual_end_performance_time, 1000.0);
        assert_eq!(config.stage.continue_performance_time, 2.0);
        assert_eq!(config.stage.loudness_sensitivity, 100.0);
        assert_eq!(config.audience.interruption_delay_time, 30.0);
        assert_eq!(config.audience.interruption_variability, 20.0);
        assert_eq!(config.audience.clap_ramp_duration, 5.0);
        assert!(config.catalog.manifest.is_none());
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_duration_rejected() {
        let mut config = Config::default();
        config.stage.dim_time = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("stage.dim_time"));
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let mut config = Config::default();
        config.stage.loudness_threshold = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_clap_ramp_rejected() {
        let mut config = Config::default();
        config.audience.clap_ramp_duration = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("clap_ramp_duration"));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [stage]
            loudness_threshold = 0.2
            end_performance_time = 4.5

            [audience]
            members = 3
            seed = 7
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.stage.loudness_threshold, 0.2);
        assert_eq!(config.stage.end_performance_time, 4.5);
        assert_eq!(config.stage.dim_time, 2.0);
        assert_eq!(config.audience.members, 3);
        assert_eq!(config.audience.seed, Some(7));
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
