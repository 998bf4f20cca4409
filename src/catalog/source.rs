//! Asset sources that supply catalog buckets

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use super::definition::{InterruptionDefinition, SoundHandle};
use crate::error::{CatalogError, OvationError};

/// The two named buckets a catalog is loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogBucket {
    /// Coughs, sneezes, rustling and other mid-performance noises
    Interruptions,
    /// Applause variants
    Claps,
}

impl CatalogBucket {
    pub const ALL: [CatalogBucket; 2] = [Self::Interruptions, Self::Claps];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Interruptions => "interruptions",
            Self::Claps => "claps",
        }
    }
}

impl fmt::Display for CatalogBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Something that can produce interruption definitions by bucket.
///
/// `Ok(None)` means the bucket is absent, which is not an error.
pub trait AssetSource {
    fn load_bucket(
        &self,
        bucket: CatalogBucket,
    ) -> Result<Option<Vec<InterruptionDefinition>>, CatalogError>;
}

/// In-memory buckets
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    interruptions: Option<Vec<InterruptionDefinition>>,
    claps: Option<Vec<InterruptionDefinition>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the contents of a bucket
    pub fn with_bucket(
        mut self,
        bucket: CatalogBucket,
        definitions: Vec<InterruptionDefinition>,
    ) -> Self {
        match bucket {
            CatalogBucket::Interruptions => self.interruptions = Some(definitions),
            CatalogBucket::Claps => self.claps = Some(definitions),
        }
        self
    }

    /// Small built-in set used when no manifest is configured
    pub fn demo() -> Self {
        let general = vec![
            InterruptionDefinition::new(1, Some(SoundHandle::new("builtin/cough"))),
            InterruptionDefinition::new(2, Some(SoundHandle::new("builtin/sneeze"))),
            InterruptionDefinition::new(3, Some(SoundHandle::new("builtin/program_rustle"))),
            InterruptionDefinition::new(4, None),
            InterruptionDefinition::sound_only("builtin/phone_buzz"),
        ];
        let claps = vec![
            InterruptionDefinition::new(10, Some(SoundHandle::new("builtin/clap_polite"))),
            InterruptionDefinition::new(11, Some(SoundHandle::new("builtin/clap_eager"))),
            InterruptionDefinition::new(12, Some(SoundHandle::new("builtin/clap_cheer"))),
        ];

        Self::new()
            .with_bucket(CatalogBucket::Interruptions, general)
            .with_bucket(CatalogBucket::Claps, claps)
    }
}

impl AssetSource for StaticSource {
    fn load_bucket(
        &self,
        bucket: CatalogBucket,
    ) -> Result<Option<Vec<InterruptionDefinition>>, CatalogError> {
        Ok(match bucket {
            CatalogBucket::Interruptions => self.interruptions.clone(),
            CatalogBucket::Claps => self.claps.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    interruptions: Option<Vec<InterruptionDefinition>>,
    claps: Option<Vec<InterruptionDefinition>>,
}

/// TOML manifest on disk.
///
/// ```toml
/// [[interruptions]]
/// animation_id = 1
/// sound = "sounds/cough.wav"
///
/// [[claps]]
/// animation_id = 10
/// sound = "sounds/clap.wav"
/// ```
///
/// Relative sound paths are resolved against the manifest's directory.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    base_dir: PathBuf,
    interruptions: Option<Vec<InterruptionDefinition>>,
    claps: Option<Vec<InterruptionDefinition>>,
}

impl ManifestSource {
    /// Read and parse a manifest file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OvationError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::ReadManifest(format!("{}: {}", path.display(), e)))?;

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self::parse(&contents, base_dir)?)
    }

    /// Parse manifest contents, resolving sounds against `base_dir`
    pub fn parse(contents: &str, base_dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let manifest: Manifest =
            toml::from_str(contents).map_err(|e| CatalogError::ParseManifest(e.to_string()))?;

        let mut source = Self {
            base_dir: base_dir.into(),
            interruptions: manifest.interruptions,
            claps: manifest.claps,
        };
        source.resolve_sounds();

        Ok(source)
    }

    /// Directory that relative sound paths are resolved against
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve_sounds(&mut self) {
        let base_dir = self.base_dir.clone();
        for definitions in [&mut self.interruptions, &mut self.claps]
            .into_iter()
            .flatten()
        {
            for def in definitions.iter_mut() {
                let Some(sound) = def.sound.take() else {
                    continue;
                };
                let path = Path::new(sound.as_str());
                let resolved = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    base_dir.join(path)
                };

                if resolved.exists() {
                    tracing::debug!("Resolved sound: {} -> {}", sound, resolved.display());
                } else {
                    tracing::warn!("Sound asset not found: {} ({})", sound, resolved.display());
                }
                def.sound = Some(SoundHandle::new(resolved.to_string_lossy()));
            }
        }
    }
}

impl AssetSource for ManifestSource {
    fn load_bucket(
        &self,
        bucket: CatalogBucket,
    ) -> Result<Option<Vec<InterruptionDefinition>>, CatalogError> {
        Ok(match bucket {
            CatalogBucket::Interruptions => self.interruptions.clone(),
            CatalogBucket::Claps => self.claps.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_static_source_missing_bucket() {
        let source = StaticSource::new()
            .with_bucket(CatalogBucket::Claps, vec![InterruptionDefinition::new(5, None)]);

        assert!(source
            .load_bucket(CatalogBucket::Interruptions)
            .unwrap()
            .is_none());
        assert_eq!(source.load_bucket(CatalogBucket::Claps).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_demo_has_both_buckets() {
        let source = StaticSource::demo();
        for bucket in CatalogBucket::ALL {
            let defs = source.load_bucket(bucket).unwrap().unwrap();
            assert!(!defs.is_empty(), "{} should not be empty", bucket);
        }
    }

    #[test]
    fn test_manifest_resolves_relative_sounds() {
        let manifest = r#"
            [[interruptions]]
            animation_id = 1
            sound = "sounds/cough.wav"

            [[interruptions]]
            animation_id = 2
        "#;

        let source = ManifestSource::parse(manifest, "/srv/show").unwrap();
        let general = source
            .load_bucket(CatalogBucket::Interruptions)
            .unwrap()
            .unwrap();

        assert_eq!(general.len(), 2);
        assert_eq!(
            general[0].sound.as_ref().map(|s| s.as_str()),
            Some(Path::new("/srv/show").join("sounds/cough.wav").to_str().unwrap())
        );
        assert!(general[1].sound.is_none());
        assert!(source.load_bucket(CatalogBucket::Claps).unwrap().is_none());
    }

    #[test]
    fn test_manifest_parse_error() {
        let err = ManifestSource::parse("[[claps]]\nanimation_id = \"loud\"", ".").unwrap_err();
        assert!(matches!(err, CatalogError::ParseManifest(_)));
    }

    #[test]
    fn test_manifest_open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clap.wav"), b"RIFF").unwrap();

        let path = dir.path().join("catalog.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[[claps]]\nanimation_id = 9\nsound = \"clap.wav\"").unwrap();

        let source = ManifestSource::open(&path).unwrap();
        assert_eq!(source.base_dir(), dir.path());

        let claps = source.load_bucket(CatalogBucket::Claps).unwrap().unwrap();
        assert_eq!(claps[0].animation_id, 9);
        assert_eq!(
            claps[0].sound.as_ref().map(|s| s.as_str()),
            dir.path().join("clap.wav").to_str()
        );
    }

    #[test]
    fn test_manifest_open_missing_file() {
        let err = ManifestSource::open("/no/such/catalog.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read catalog manifest"));
    }
}
