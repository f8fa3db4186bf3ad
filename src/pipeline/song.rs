use std::sync::Arc;

use crate::audio::SampleBuffer;
use crate::shared::{ClipId, CollectionId, DEFAULT_VOLUME, SoundId, TrackId};

use super::grid::seconds_per_pixel;

/// A loaded catalog sample: metadata plus the decoded audio.
#[derive(Debug)]
pub struct Sample {
    pub sound_id: SoundId,
    pub collection_id: CollectionId,
    pub block_span: u32, // canonical length from the catalog
    pub name: String,
    pub buffer: Arc<SampleBuffer>,
}

/// A placed instance of a sample.
#[derive(Clone, Debug)]
pub struct Clip {
    pub id: ClipId,
    pub sample: Arc<Sample>,
    pub x: u32,
    pub width: u32,
    pub collection_id: CollectionId,
    pub duration_seconds: f64,
}

impl Clip {
    pub fn end(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn sound_id(&self) -> SoundId {
        self.sample.sound_id
    }

    pub fn buffer(&self) -> &Arc<SampleBuffer> {
        &self.sample.buffer
    }

    pub fn contains(&self, px: u32) -> bool {
        px >= self.x && px < self.end()
    }
}

// Clip ids only need to be unique for one session's lifetime
#[derive(Clone, Debug, Default)]
pub struct ClipIds {
    next: u64,
}

impl ClipIds {
    pub fn next(&mut self) -> ClipId {
        let id = ClipId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Clone, Debug)]
pub struct Track {
    pub id: TrackId,
    clips: Vec<Clip>, // kept sorted by x
    pub volume: u8, // 1..=100
}

impl Track {
    pub fn new(id: TrackId) -> Self {
        Self {
            id,
            clips: Vec::new(),
            volume: DEFAULT_VOLUME,
        }
    }

    pub fn with_volume(id: TrackId, volume: u8) -> Self {
        let mut t = Self::new(id);
        t.set_volume(volume);
        t
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    // No overlap check here; callers go through collision::can_place first
    pub fn insert(&mut self, clip: Clip) {
        let at = self.clips.partition_point(|c| c.x <= clip.x);
        self.clips.insert(at, clip);
    }

    pub fn remove(&mut self, id: ClipId) -> Option<Clip> {
        let idx = self.clips.iter().position(|c| c.id == id)?;
        Some(self.clips.remove(idx))
    }

    pub fn retain_clips(&mut self, keep: impl FnMut(&Clip) -> bool) {
        self.clips.retain(keep);
    }

    pub fn clip_at(&self, px: u32) -> Option<&Clip> {
        self.clips.iter().find(|c| c.contains(px))
    }

    pub fn end_px(&self) -> u32 {
        self.clips.iter().map(Clip::end).max().unwrap_or(0)
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.clamp(1, 100);
    }

    pub fn gain(&self) -> f32 {
        self.volume as f32 / 100.0
    }
}

#[derive(Clone, Debug, Default)]
pub struct Song {
    pub tracks: Vec<Track>,
    pub is_filtered: bool,
    pub offset: u32, // horizontal scroll, px
    pub playhead_x: u32,
}

impl Song {
    pub fn add_track(&mut self) -> TrackId {
        let id = TrackId(self.tracks.len() as u32 + 1);
        self.tracks.push(Track::new(id));
        id
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.tracks.iter().flat_map(|t| t.clips.iter())
    }

    // Furthest clip end over all tracks
    pub fn total_timeline_pixels(&self) -> u32 {
        self.tracks.iter().map(Track::end_px).max().unwrap_or(0)
    }

    // Song-wide ratio, sampled from the first clip of the first track that
    // has any; an empty leading track falls through to the next one. Clips
    // are assumed to share the grid scale.
    pub fn seconds_per_px(&self) -> f64 {
        self.tracks
            .iter()
            .find_map(|t| t.clips.first())
            .map(seconds_per_pixel)
            .unwrap_or(0.0)
    }

    pub fn display_x(&self, x: u32) -> i64 {
        x as i64 - self.offset as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_fixture::{clip, sample};

    #[test]
    fn clips_stay_sorted_by_x() {
        let s = sample(7, 1, 2, 4.0);
        let mut ids = ClipIds::default();
        let mut t = Track::new(TrackId(1));
        t.insert(clip(&mut ids, &s, 180, 90));
        t.insert(clip(&mut ids, &s, 0, 90));
        t.insert(clip(&mut ids, &s, 90, 90));
        let xs: Vec<u32> = t.clips().iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![0, 90, 180]);
        assert_eq!(t.end_px(), 270);
    }

    #[test]
    fn remove_by_id() {
        let s = sample(7, 1, 2, 4.0);
        let mut ids = ClipIds::default();
        let mut t = Track::new(TrackId(1));
        let c = clip(&mut ids, &s, 0, 90);
        let id = c.id;
        t.insert(c);
        assert!(t.remove(id).is_some());
        assert!(t.remove(id).is_none());
        assert!(t.clips().is_empty());
    }

    #[test]
    fn volume_is_clamped() {
        let mut t = Track::new(TrackId(1));
        t.set_volume(0);
        assert_eq!(t.volume, 1);
        t.set_volume(250);
        assert_eq!(t.volume, 100);
        t.set_volume(45);
        assert!((t.gain() - 0.45).abs() < 1e-6);
    }

    #[test]
    fn timeline_extent_and_ratio() {
        let s = sample(7, 1, 2, 4.0);
        let mut ids = ClipIds::default();
        let mut song = Song::default();
        let a = song.add_track();
        let b = song.add_track();
        assert_eq!(b, TrackId(2));
        song.track_mut(a).unwrap().insert(clip(&mut ids, &s, 0, 90));
        song.track_mut(b).unwrap().insert(clip(&mut ids, &s, 135, 90));
        assert_eq!(song.total_timeline_pixels(), 225);
        assert!((song.seconds_per_px() - 4.0 / 90.0).abs() < 1e-12);
    }

    #[test]
    fn ratio_falls_through_empty_first_track() {
        let s = sample(7, 1, 2, 4.0);
        let mut ids = ClipIds::default();
        let mut song = Song::default();
        song.add_track();
        let b = song.add_track();
        assert_eq!(song.seconds_per_px(), 0.0);
        song.track_mut(b).unwrap().insert(clip(&mut ids, &s, 45, 90));
        assert!(song.seconds_per_px() > 0.0);
    }
}
