// The sample catalog: which sounds exist, which collection each belongs to,
// how many blocks each spans, and where its audio lives.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::shared::{CollectionId, SoundId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub id: CollectionId,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SampleEntry {
    pub sound_id: SoundId,
    pub collection_id: CollectionId,
    pub blocks: u32,
    pub file: String, // asset locator
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub collections: Vec<CollectionEntry>,
    #[serde(default)]
    pub samples: Vec<SampleEntry>,
}

impl Catalog {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> anyhow::Result<Self> {
        let catalog: Catalog = serde_json::from_str(data).context("malformed catalog json")?;
        Ok(catalog)
    }

    pub fn sample(&self, sound_id: SoundId) -> Option<&SampleEntry> {
        self.samples.iter().find(|s| s.sound_id == sound_id)
    }

    pub fn collection(&self, id: CollectionId) -> Option<&CollectionEntry> {
        self.collections.iter().find(|c| c.id == id)
    }

    // In catalog order; that order defines a sample's index inside its collection
    pub fn samples_in(&self, collection: CollectionId) -> impl Iterator<Item = &SampleEntry> {
        self.samples.iter().filter(move |s| s.collection_id == collection)
    }
}
