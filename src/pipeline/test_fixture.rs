// Purely for testing: a fake audio graph with a hand-driven clock, in-memory
// assets, and a small catalog to build sessions from.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use crate::audio::{SampleBuffer, StereoFrame};
use crate::audio_api::AudioGraph;
use crate::loader::{AssetSource, Catalog, SampleLoader};
use crate::shared::{ClipId, CollectionId, SoundId, TrackId, VoiceId};

use super::grid::GridConfig;
use super::session::Session;
use super::song::{Clip, ClipIds, Sample};

pub const FIXTURE_RATE: u32 = 1000;

// 7 and 8 span 2 blocks (4s), 9 spans 1 block (2s); 5 is listed but has no file
pub const CATALOG_JSON: &str = r#"{
    "collections": [
        { "id": 1, "name": "drums" },
        { "id": 2, "name": "keys" }
    ],
    "samples": [
        { "sound_id": 7, "collection_id": 1, "blocks": 2, "file": "s7.wav", "name": "kick loop" },
        { "sound_id": 8, "collection_id": 1, "blocks": 2, "file": "s8.wav", "name": "hat loop" },
        { "sound_id": 9, "collection_id": 2, "blocks": 1, "file": "s9.wav", "name": "stab" },
        { "sound_id": 5, "collection_id": 2, "blocks": 1, "file": "missing.wav" }
    ]
}"#;

pub fn wav_bytes(sample_rate: u32, channels: u16, frames: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..frames * channels as usize {
            writer.write_sample(((i % 64) as i16 - 32) * 500).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

pub struct MemAssets {
    pub files: HashMap<String, Vec<u8>>,
}

impl MemAssets {
    pub fn standard() -> Self {
        let mut files = HashMap::new();
        files.insert("s7.wav".to_string(), wav_bytes(FIXTURE_RATE, 1, 4 * FIXTURE_RATE as usize));
        files.insert("s8.wav".to_string(), wav_bytes(FIXTURE_RATE, 2, 4 * FIXTURE_RATE as usize));
        files.insert("s9.wav".to_string(), wav_bytes(FIXTURE_RATE, 1, 2 * FIXTURE_RATE as usize));
        Self { files }
    }
}

impl AssetSource for MemAssets {
    fn fetch(&self, locator: &str) -> anyhow::Result<Vec<u8>> {
        self.files
            .get(locator)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such asset: {locator}"))
    }
}

pub fn session() -> Session {
    session_with(MemAssets::standard())
}

pub fn session_with(assets: MemAssets) -> Session {
    let catalog = Catalog::from_json(CATALOG_JSON).unwrap();
    Session::new(GridConfig::default(), catalog, SampleLoader::new(Arc::new(assets)))
}

pub fn sample(sound: u32, collection: u32, blocks: u32, secs: f64) -> Arc<Sample> {
    let frames = (secs * FIXTURE_RATE as f64).round() as usize;
    Arc::new(Sample {
        sound_id: SoundId(sound),
        collection_id: CollectionId(collection),
        block_span: blocks,
        name: format!("sound {sound}"),
        buffer: Arc::new(SampleBuffer {
            data: vec![StereoFrame::mono(0.25); frames],
            sample_rate: FIXTURE_RATE,
        }),
    })
}

pub fn clip(ids: &mut ClipIds, sample: &Arc<Sample>, x: u32, width: u32) -> Clip {
    Clip {
        id: ids.next(),
        sample: sample.clone(),
        x,
        width,
        collection_id: sample.collection_id,
        duration_seconds: sample.buffer.duration_secs(),
    }
}

#[derive(Clone, Debug)]
pub struct Started {
    pub id: VoiceId,
    pub track: Option<TrackId>,
    pub buffer: Arc<SampleBuffer>,
    pub at: f64,
    pub offset: f64,
}

// Records everything submitted; `now` is set by the test
pub struct RecordingGraph {
    pub now: f64,
    pub started: Vec<Started>,
    pub stopped: Vec<VoiceId>,
    pub connected: Vec<(TrackId, f32, f64)>,
    pub lowpass: Option<bool>,
    next: u64,
}

impl RecordingGraph {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            started: Vec::new(),
            stopped: Vec::new(),
            connected: Vec::new(),
            lowpass: None,
            next: 0,
        }
    }

    pub fn clear(&mut self) {
        self.started.clear();
        self.stopped.clear();
        self.connected.clear();
    }

    fn alloc(&mut self) -> VoiceId {
        let id = VoiceId(self.next);
        self.next += 1;
        id
    }
}

impl AudioGraph for RecordingGraph {
    fn now(&self) -> f64 {
        self.now
    }

    fn sample_rate(&self) -> u32 {
        FIXTURE_RATE
    }

    fn connect_track(&mut self, track: TrackId, gain: f32, at: f64) {
        self.connected.push((track, gain, at));
    }

    fn start_voice(&mut self, track: TrackId, buffer: Arc<SampleBuffer>, at: f64, offset: f64) -> VoiceId {
        let id = self.alloc();
        self.started.push(Started { id, track: Some(track), buffer, at, offset });
        id
    }

    fn stop_voice(&mut self, voice: VoiceId) {
        self.stopped.push(voice);
    }

    fn set_lowpass(&mut self, on: bool) {
        self.lowpass = Some(on);
    }

    fn preview(&mut self, buffer: Arc<SampleBuffer>) -> VoiceId {
        let id = self.alloc();
        let at = self.now;
        self.started.push(Started { id, track: None, buffer, at, offset: 0.0 });
        id
    }
}

pub fn clip_ids(song_track: &super::song::Track) -> Vec<ClipId> {
    song_track.clips().iter().map(|c| c.id).collect()
}
