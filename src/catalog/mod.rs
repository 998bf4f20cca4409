//! Interruption catalog
//!
//! The immutable set of interruption and clap definitions audience members
//! draw from. Built once at startup and shared read-only.

pub mod definition;
pub mod source;

pub use definition::{InterruptionDefinition, SoundHandle, NO_ANIMATION};
pub use source::{AssetSource, CatalogBucket, ManifestSource, StaticSource};

use rand::Rng;

use crate::error::CatalogError;

/// General interruptions and claps, in load order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterruptionCatalog {
    general: Vec<InterruptionDefinition>,
    claps: Vec<InterruptionDefinition>,
}

impl InterruptionCatalog {
    pub fn new(general: Vec<InterruptionDefinition>, claps: Vec<InterruptionDefinition>) -> Self {
        Self { general, claps }
    }

    /// A catalog with nothing in it; members stay quiet
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load both buckets from an asset source.
    ///
    /// A missing bucket becomes an empty sequence.
    pub fn load(source: &dyn AssetSource) -> Result<Self, CatalogError> {
        let mut catalog = Self::empty();

        for bucket in CatalogBucket::ALL {
            let definitions = match source.load_bucket(bucket)? {
                Some(defs) => defs,
                None => {
                    tracing::warn!("Catalog bucket '{}' missing, loading it empty", bucket);
                    Vec::new()
                }
            };
            if definitions.is_empty() {
                tracing::warn!("Catalog bucket '{}' is empty", bucket);
            }

            match bucket {
                CatalogBucket::Interruptions => catalog.general = definitions,
                CatalogBucket::Claps => catalog.claps = definitions,
            }
        }

        tracing::info!(
            "Loaded catalog: {} interruptions, {} claps",
            catalog.general.len(),
            catalog.claps.len()
        );

        Ok(catalog)
    }

    pub fn general(&self) -> &[InterruptionDefinition] {
        &self.general
    }

    pub fn claps(&self) -> &[InterruptionDefinition] {
        &self.claps
    }

    pub fn is_empty(&self) -> bool {
        self.general.is_empty() && self.claps.is_empty()
    }

    /// Uniformly pick a general interruption
    pub fn pick_general<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&InterruptionDefinition> {
        pick(&self.general, rng)
    }

    /// Uniformly pick a clap
    pub fn pick_clap<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&InterruptionDefinition> {
        pick(&self.claps, rng)
    }
}

fn pick<'a, R: Rng + ?Sized>(
    definitions: &'a [InterruptionDefinition],
    rng: &mut R,
) -> Option<&'a InterruptionDefinition> {
    if definitions.is_empty() {
        return None;
    }
    definitions.get(rng.random_range(0..definitions.len()))
}
