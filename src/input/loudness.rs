//! Loudness sources

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::path::Path;

use crate::config::SimulationConfig;
use crate::error::{InputError, OvationError};

/// Produces one raw loudness value per tick
pub trait LoudnessSource {
    /// Sample covering the next `dt` seconds
    fn sample(&mut self, dt: f32) -> f32;
}

/// Always the same value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantLoudness(pub f32);

impl LoudnessSource for ConstantLoudness {
    fn sample(&mut self, _dt: f32) -> f32 {
        self.0
    }
}

/// Replays a recorded trace, one value per tick, then falls silent.
///
/// The text format is numbers separated by whitespace or commas; `#` starts a
/// comment that runs to the end of the line.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLoudness {
    samples: VecDeque<f32>,
}

impl ScriptedLoudness {
    pub fn new(samples: impl IntoIterator<Item = f32>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, OvationError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| InputError::ReadScript(format!("{}: {}", path.as_ref().display(), e)))?;
        Ok(Self::parse(&contents)?)
    }

    pub fn parse(s: &str) -> Result<Self, InputError> {
        let mut samples = VecDeque::new();

        for (index, line) in s.lines().enumerate() {
            let line = line.split('#').next().unwrap_or_default();
            for token in line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|t| !t.is_empty())
            {
                let value: f32 = token.parse().map_err(|_| InputError::InvalidSample {
                    line: index + 1,
                    value: token.to_string(),
                })?;
                if !value.is_finite() || value < 0.0 {
                    return Err(InputError::InvalidSample {
                        line: index + 1,
                        value: token.to_string(),
                    });
                }
                samples.push_back(value);
            }
        }

        tracing::debug!("Parsed loudness script with {} samples", samples.len());
        Ok(Self { samples })
    }

    /// Samples not yet replayed
    pub fn remaining(&self) -> usize {
        self.samples.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.samples.is_empty()
    }
}

impl LoudnessSource for ScriptedLoudness {
    fn sample(&mut self, _dt: f32) -> f32 {
        self.samples.pop_front().unwrap_or(0.0)
    }
}

/// Stand-in performer: plays for a while, pauses, plays again
#[derive(Debug, Clone)]
pub struct SyntheticPerformer {
    play_secs: f32,
    pause_secs: f32,
    level: f32,
    jitter: f32,
    clock: f64,
    rng: StdRng,
}

impl SyntheticPerformer {
    pub fn new(play_secs: f32, pause_secs: f32, level: f32, jitter: f32, rng: StdRng) -> Self {
        Self {
            play_secs,
            pause_secs,
            level,
            jitter,
            clock: 0.0,
            rng,
        }
    }

    pub fn from_config(config: &SimulationConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(
            config.play_secs,
            config.pause_secs,
            config.level,
            config.jitter,
            rng,
        )
    }

    /// Whether the performer is in a playing phase at the current clock
    pub fn is_playing(&self) -> bool {
        let cycle = f64::from(self.play_secs + self.pause_secs);
        if cycle <= 0.0 {
            return false;
        }
        self.clock % cycle < f64::from(self.play_secs)
    }
}

impl LoudnessSource for SyntheticPerformer {
    fn sample(&mut self, dt: f32) -> f32 {
        let playing = self.is_playing();
        self.clock += f64::from(dt.max(0.0));

        if !playing {
            return 0.0;
        }
        if self.jitter <= 0.0 {
            return self.level;
        }
        let noise = self.rng.random_range(-self.jitter..=self.jitter);
        (self.level + noise).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = ScriptedLoudness::parse("0.1 0.2, 0.3\n# pause\n0 0 # trailing\n").unwrap();
        assert_eq!(script.remaining(), 5);
    }

    #[test]
    fn test_script_replays_then_silent() {
        let mut script = ScriptedLoudness::new([0.5, 0.25]);
        assert_eq!(script.sample(0.1), 0.5);
        assert_eq!(script.sample(0.1), 0.25);
        assert!(script.is_exhausted());
        assert_eq!(script.sample(0.1), 0.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = ScriptedLoudness::parse("0.1\n0.2 loud\n").unwrap_err();
        match err {
            InputError::InvalidSample { line, value } => {
                assert_eq!(line, 2);
                assert_eq!(value, "loud");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_rejects_negative() {
        assert!(ScriptedLoudness::parse("-0.5").is_err());
    }

    #[test]
    fn test_script_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.txt");
        std::fs::write(&path, "0.3\n0.0\n").unwrap();

        let mut script = ScriptedLoudness::from_file(&path).unwrap();
        assert_eq!(script.sample(1.0), 0.3);
        assert_eq!(script.sample(1.0), 0.0);
    }

    #[test]
    fn test_synthetic_phases() {
        let mut performer =
            SyntheticPerformer::new(2.0, 1.0, 0.5, 0.0, StdRng::seed_from_u64(3));

        let trace: Vec<f32> = (0..6).map(|_| performer.sample(1.0)).collect();
        assert_eq!(trace, vec![0.5, 0.5, 0.0, 0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_synthetic_jitter_stays_non_negative() {
        let mut performer =
            SyntheticPerformer::new(10.0, 0.0, 0.01, 0.5, StdRng::seed_from_u64(9));
        for _ in 0..100 {
            assert!(performer.sample(0.1) >= 0.0);
        }
    }

    #[test]
    fn test_constant() {
        let mut source = ConstantLoudness(0.7);
        assert_eq!(source.sample(1.0), 0.7);
    }
}
