use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::audio::SampleBuffer;
use crate::shared::SoundId;

use super::catalog::SampleEntry;

// Where sample bytes come from: locator -> bytes
pub trait AssetSource: Send + Sync {
    fn fetch(&self, locator: &str) -> anyhow::Result<Vec<u8>>;
}

// Assets laid out as files under one directory
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirAssets {
    fn fetch(&self, locator: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.root.join(locator);
        std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))
    }
}

// Fetches and decodes samples, caching decoded buffers by locator
pub struct SampleLoader {
    assets: Arc<dyn AssetSource>,
    cache: HashMap<String, Arc<SampleBuffer>>,
}

impl SampleLoader {
    pub fn new(assets: Arc<dyn AssetSource>) -> Self {
        Self {
            assets,
            cache: HashMap::new(),
        }
    }

    pub fn load(&mut self, entry: &SampleEntry) -> anyhow::Result<Arc<SampleBuffer>> {
        if let Some(buf) = self.cache.get(&entry.file) {
            return Ok(buf.clone());
        }
        let buf = Arc::new(fetch_and_decode(self.assets.as_ref(), &entry.file)?);
        self.cache.insert(entry.file.clone(), buf.clone());
        Ok(buf)
    }

    // Load a batch concurrently, one worker per uncached asset, and wait for
    // all of them. A failure is logged and skipped; it never aborts the rest.
    pub fn load_batch(&mut self, entries: &[SampleEntry]) -> Vec<(SoundId, Arc<SampleBuffer>)> {
        let mut loaded = Vec::with_capacity(entries.len());
        let mut pending: Vec<&SampleEntry> = Vec::new();
        for entry in entries {
            match self.cache.get(&entry.file) {
                Some(buf) => loaded.push((entry.sound_id, buf.clone())),
                None => pending.push(entry),
            }
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        let assets = self.assets.as_ref();
        std::thread::scope(|scope| {
            for entry in &pending {
                let tx = tx.clone();
                scope.spawn(move || {
                    let result = fetch_and_decode(assets, &entry.file);
                    let _ = tx.send((*entry, result));
                });
            }
        });
        drop(tx);

        for (entry, result) in rx.iter() {
            match result {
                Ok(buf) => {
                    let buf = Arc::new(buf);
                    self.cache.insert(entry.file.clone(), buf.clone());
                    loaded.push((entry.sound_id, buf));
                }
                Err(e) => log::error!("failed to load sample {} ({}): {e:#}", entry.sound_id.0, entry.file),
            }
        }
        log::debug!("loaded {}/{} samples", loaded.len(), entries.len());
        loaded
    }
}

fn fetch_and_decode(assets: &dyn AssetSource, locator: &str) -> anyhow::Result<SampleBuffer> {
    let bytes = assets.fetch(locator)?;
    SampleBuffer::decode_wav(&bytes).with_context(|| format!("failed to decode {locator}"))
}
