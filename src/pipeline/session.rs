// One open song plus everything needed to edit it: the grid, the catalog and
// its loaded samples, what the user has selected, and the transient playback
// state. Every edit goes through a method here so the playing check is never
// skipped.

use std::collections::HashMap;
use std::sync::Arc;

use crate::audio::SampleBuffer;
use crate::audio_api::AudioGraph;
use crate::loader::{Catalog, SampleLoader};
use crate::shared::{ClipId, CollectionId, MAX_SELECTED_COLLECTIONS, SoundId, TrackId, VoiceId};

use super::collision;
use super::grid::GridConfig;
use super::playback::{PlayState, PlaybackSession};
use super::render::Exporter;
use super::song::{Clip, ClipIds, Sample, Song};
use super::trax;

// shown for clips whose collection has been deselected
pub const UNKNOWN_SAMPLE_INDEX: u32 = 99;

pub struct Session {
    pub grid: GridConfig,
    pub song: Song,
    pub(super) playback: Option<PlaybackSession>,
    pub(super) state: PlayState,
    catalog: Catalog,
    loader: SampleLoader,
    samples: HashMap<SoundId, Arc<Sample>>, // loaded, keyed by sound
    selected_collections: Vec<CollectionId>,
    selected_sample: Option<SoundId>,
    clip_ids: ClipIds,
    preview: Option<VoiceId>,
    exporter: Exporter,
}

impl Session {
    pub fn new(grid: GridConfig, catalog: Catalog, loader: SampleLoader) -> Self {
        let mut song = Song::default();
        song.add_track();
        Self {
            grid,
            song,
            playback: None,
            state: PlayState::Stopped,
            catalog,
            loader,
            samples: HashMap::new(),
            selected_collections: Vec::new(),
            selected_sample: None,
            clip_ids: ClipIds::default(),
            preview: None,
            exporter: Exporter::default(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    pub fn play_state(&self) -> PlayState {
        self.state
    }

    // ── Editing ────────────────────────────────────────────────────

    pub fn add_track(&mut self) -> TrackId {
        self.song.add_track()
    }

    pub fn can_place(&self, track: TrackId, x: u32, width: u32) -> bool {
        if self.is_playing() {
            return false;
        }
        self.song
            .track(track)
            .is_some_and(|t| collision::can_place(t, x, width))
    }

    // Appends the selected sample at `x` without any overlap check; callers
    // validate with `can_place` first.
    pub fn insert_clip_at(&mut self, track: TrackId, x: u32) -> Option<ClipId> {
        let sample = self.selected()?;
        let width = self.grid.blocks_to_px(sample.block_span);
        let id = self.clip_ids.next();
        let clip = Clip {
            id,
            x,
            width,
            collection_id: sample.collection_id,
            duration_seconds: sample.buffer.duration_secs(),
            sample,
        };
        self.song.track_mut(track)?.insert(clip);
        Some(id)
    }

    // Snap a view-relative pixel to the grid and place the selected sample
    // there if it fits.
    pub fn place_clip(&mut self, track: TrackId, raw_px: f64) -> Option<ClipId> {
        if self.is_playing() {
            log::debug!("placement refused while playing");
            return None;
        }
        let Some(sample) = self.selected() else {
            log::debug!("no sample selected");
            return None;
        };
        let x = self.grid.snap_to_grid(raw_px, self.song.offset);
        let width = self.grid.blocks_to_px(sample.block_span);
        if !self.can_place(track, x, width) {
            log::debug!("clip at {x}px (width {width}) collides on track {}", track.0);
            return None;
        }
        self.insert_clip_at(track, x)
    }

    pub fn delete_clip(&mut self, track: TrackId, clip: ClipId) -> bool {
        if self.is_playing() {
            log::debug!("delete refused while playing");
            return false;
        }
        self.song
            .track_mut(track)
            .and_then(|t| t.remove(clip))
            .is_some()
    }

    pub fn set_volume(&mut self, track: TrackId, volume: u8) -> bool {
        match self.song.track_mut(track) {
            Some(t) => {
                t.set_volume(volume);
                true
            }
            None => false,
        }
    }

    pub fn clear_song(&mut self) -> bool {
        if self.is_playing() {
            log::debug!("clear refused while playing");
            return false;
        }
        self.song.is_filtered = false;
        self.song.tracks.clear();
        true
    }

    pub fn toggle_filter(&mut self) -> bool {
        self.song.is_filtered = !self.song.is_filtered;
        self.song.is_filtered
    }

    // Offset and playhead move together, one grid step at a time
    pub fn scroll_right(&mut self) {
        let step = self.grid.blocks_to_px(1);
        self.song.offset += step;
        self.song.playhead_x += step;
    }

    pub fn scroll_left(&mut self) {
        if self.song.offset == 0 {
            return;
        }
        let step = self.grid.blocks_to_px(1);
        self.song.offset = self.song.offset.saturating_sub(step);
        self.song.playhead_x = self.song.playhead_x.saturating_sub(step);
    }

    pub fn display_x(&self, x: u32) -> i64 {
        self.song.display_x(x)
    }

    // ── Collections and samples ────────────────────────────────────

    pub fn selected_collections(&self) -> &[CollectionId] {
        &self.selected_collections
    }

    pub fn is_selected(&self, collection: CollectionId) -> bool {
        self.selected_collections.contains(&collection)
    }

    // Toggle a collection. Deselecting drops every clip that came from it;
    // selecting loads all of its samples before returning.
    pub fn select_collection(&mut self, id: CollectionId, force: bool) -> bool {
        if let Some(idx) = self.selected_collections.iter().position(|c| *c == id) {
            if self.is_playing() {
                log::debug!("deselect refused while playing");
                return false;
            }
            self.selected_collections.remove(idx);
            for track in &mut self.song.tracks {
                track.retain_clips(|c| c.collection_id != id);
            }
            if self.selected().is_some_and(|s| s.collection_id == id) {
                self.selected_sample = None;
            }
            log::info!("deselected collection {}", id.0);
            return true;
        }

        if self.catalog.collection(id).is_none() && self.catalog.samples_in(id).next().is_none() {
            log::warn!("unknown collection {}", id.0);
            return false;
        }
        if !force && self.selected_collections.len() >= MAX_SELECTED_COLLECTIONS {
            log::info!("collection {} refused, {MAX_SELECTED_COLLECTIONS} already selected", id.0);
            return false;
        }

        self.selected_collections.push(id);
        let entries: Vec<_> = self.catalog.samples_in(id).cloned().collect();
        for (sound_id, buffer) in self.loader.load_batch(&entries) {
            if let Some(entry) = entries.iter().find(|e| e.sound_id == sound_id) {
                self.samples.insert(
                    sound_id,
                    Arc::new(Sample {
                        sound_id,
                        collection_id: entry.collection_id,
                        block_span: entry.blocks,
                        name: entry.name.clone(),
                        buffer,
                    }),
                );
            }
        }
        log::info!("selected collection {}", id.0);
        true
    }

    // Loaded samples of the selected collections, in selection then catalog order
    pub fn selectable_samples(&self) -> Vec<Arc<Sample>> {
        self.selected_collections
            .iter()
            .flat_map(|c| self.catalog.samples_in(*c))
            .filter_map(|e| self.samples.get(&e.sound_id).cloned())
            .collect()
    }

    pub fn select_sample(&mut self, sound: SoundId) -> bool {
        if !self.samples.contains_key(&sound) {
            log::debug!("sound {} is not loaded", sound.0);
            return false;
        }
        self.selected_sample = Some(sound);
        true
    }

    pub fn selected(&self) -> Option<Arc<Sample>> {
        self.selected_sample.and_then(|s| self.samples.get(&s).cloned())
    }

    pub fn sample(&self, sound: SoundId) -> Option<Arc<Sample>> {
        self.samples.get(&sound).cloned()
    }

    // 1-based position of the clip's sample inside its collection
    pub fn sample_index(&self, clip: &Clip) -> u32 {
        if !self.is_selected(clip.collection_id) {
            return UNKNOWN_SAMPLE_INDEX;
        }
        self.catalog
            .samples_in(clip.collection_id)
            .position(|e| e.sound_id == clip.sound_id())
            .map_or(0, |i| i as u32 + 1)
    }

    // Palette slot for a collection: its position in the selection
    pub fn color_index(&self, collection: CollectionId) -> Option<usize> {
        self.selected_collections.iter().position(|c| *c == collection)
    }

    // ── Preview ────────────────────────────────────────────────────

    pub fn preview_sample(&mut self, graph: &mut dyn AudioGraph) -> bool {
        if self.is_playing() {
            return false;
        }
        let Some(sample) = self.selected() else {
            return false;
        };
        self.stop_preview(graph);
        self.preview = Some(graph.preview(sample.buffer.clone()));
        true
    }

    pub fn stop_preview(&mut self, graph: &mut dyn AudioGraph) {
        if let Some(voice) = self.preview.take() {
            graph.stop_voice(voice);
        }
    }

    // ── Trax strings ───────────────────────────────────────────────

    pub fn trax_string(&self) -> String {
        trax::encode(&self.song, &self.grid)
    }

    // Replace the whole song with the decoded string. Collections the string
    // refers to are loaded first; nothing is built until they have settled.
    pub fn load_trax_string(&mut self, input: &str) -> bool {
        if self.is_playing() {
            log::debug!("load refused while playing");
            return false;
        }
        let spec = trax::parse(input);

        let mut needed: Vec<CollectionId> = Vec::new();
        for sound in spec.sounds() {
            match self.catalog.sample(sound) {
                Some(e) if !needed.contains(&e.collection_id) => needed.push(e.collection_id),
                Some(_) => {}
                None => log::warn!("sound {} is not in the catalog", sound.0),
            }
        }
        for c in needed {
            if !self.is_selected(c) {
                self.select_collection(c, true);
            }
        }

        let samples = &self.samples;
        let tracks = trax::build_tracks(&spec, &self.grid, &mut self.clip_ids, |id| samples.get(&id).cloned());
        log::info!("loaded song: {} tracks", tracks.len());

        self.song = Song {
            tracks,
            is_filtered: spec.lowpass,
            offset: 0,
            playhead_x: 0,
        };
        true
    }

    // ── Export ─────────────────────────────────────────────────────

    // Starts an offline render on a worker; refused while one is running
    pub fn export(&mut self) -> bool {
        self.exporter.start(self.song.clone())
    }

    pub fn is_exporting(&self) -> bool {
        self.exporter.is_busy()
    }

    pub fn poll_export(&mut self) -> Option<SampleBuffer> {
        self.exporter.poll()
    }

    pub fn wait_export(&mut self) -> Option<SampleBuffer> {
        self.exporter.wait()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_fixture::{MemAssets, RecordingGraph, clip_ids, session, session_with};

    fn ready() -> Session {
        let mut s = session();
        assert!(s.select_collection(CollectionId(1), false));
        assert!(s.select_sample(SoundId(7)));
        s
    }

    #[test]
    fn starts_with_one_empty_track() {
        let s = session();
        assert_eq!(s.song.tracks.len(), 1);
        assert_eq!(s.song.tracks[0].id, TrackId(1));
        assert_eq!(s.trax_string(), "1:");
    }

    #[test]
    fn placement_snaps_and_uses_block_span() {
        let mut s = ready();
        let id = s.place_clip(TrackId(1), 100.0).unwrap();
        let c = &s.song.tracks[0].clips()[0];
        assert_eq!(c.id, id);
        assert_eq!(c.x, 90);
        assert_eq!(c.width, 90);
        assert!((c.duration_seconds - 4.0).abs() < 1e-9);
    }

    #[test]
    fn placement_adds_the_scroll_offset() {
        let mut s = ready();
        s.scroll_right();
        s.scroll_right();
        s.place_clip(TrackId(1), 0.0).unwrap();
        assert_eq!(s.song.tracks[0].clips()[0].x, 90);
        assert_eq!(s.display_x(90), 0);
    }

    #[test]
    fn overlapping_placement_is_refused() {
        let mut s = ready();
        assert!(s.place_clip(TrackId(1), 0.0).is_some());
        assert!(s.place_clip(TrackId(1), 45.0).is_none());
        assert!(s.place_clip(TrackId(1), 90.0).is_some());
        assert_eq!(s.song.tracks[0].clips().len(), 2);
        // no track, no placement
        assert!(s.place_clip(TrackId(9), 500.0).is_none());
    }

    #[test]
    fn nothing_selected_places_nothing() {
        let mut s = session();
        assert!(s.place_clip(TrackId(1), 0.0).is_none());
        assert!(!s.select_sample(SoundId(9))); // collection 2 not loaded
    }

    #[test]
    fn editing_is_refused_while_playing() {
        let mut s = ready();
        let id = s.place_clip(TrackId(1), 0.0).unwrap();
        let mut g = RecordingGraph::new();
        assert!(s.play(&mut g));

        assert!(!s.can_place(TrackId(1), 450, 90));
        assert!(s.place_clip(TrackId(1), 450.0).is_none());
        assert!(!s.delete_clip(TrackId(1), id));
        assert!(!s.clear_song());
        assert!(!s.select_collection(CollectionId(1), false));
        assert!(!s.load_trax_string("1:8,2"));
        assert_eq!(clip_ids(&s.song.tracks[0]), vec![id]);

        s.pause(&mut g);
        assert!(s.delete_clip(TrackId(1), id));
    }

    #[test]
    fn deselect_drops_that_collections_clips() {
        let mut s = ready();
        assert!(s.select_collection(CollectionId(2), false));
        s.place_clip(TrackId(1), 0.0).unwrap();
        s.select_sample(SoundId(9));
        s.place_clip(TrackId(1), 90.0).unwrap();
        s.select_sample(SoundId(7));
        s.place_clip(TrackId(1), 135.0).unwrap();

        assert!(s.select_collection(CollectionId(1), false));
        let xs: Vec<u32> = s.song.tracks[0].clips().iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![90]);
        assert!(s.selected().is_none());
        assert_eq!(s.trax_string(), "1:0,2;9,1");
    }

    #[test]
    fn selection_is_capped_unless_forced() {
        let mut catalog = String::from(r#"{"samples": ["#);
        for i in 1..=11 {
            if i > 1 {
                catalog.push(',');
            }
            catalog.push_str(&format!(
                r#"{{"sound_id": {i}, "collection_id": {i}, "blocks": 1, "file": "s9.wav"}}"#
            ));
        }
        catalog.push_str("]}");
        let mut s = Session::new(
            GridConfig::default(),
            Catalog::from_json(&catalog).unwrap(),
            SampleLoader::new(Arc::new(MemAssets::standard())),
        );
        for i in 1..=10 {
            assert!(s.select_collection(CollectionId(i), false));
        }
        assert!(!s.select_collection(CollectionId(11), false));
        assert!(s.select_collection(CollectionId(11), true));
        assert_eq!(s.selected_collections().len(), 11);
    }

    #[test]
    fn unknown_collection_is_refused() {
        let mut s = session();
        assert!(!s.select_collection(CollectionId(42), true));
        assert!(s.selected_collections().is_empty());
    }

    #[test]
    fn failed_loads_leave_the_rest_usable() {
        let mut assets = MemAssets::standard();
        assets.files.remove("s8.wav");
        let mut s = session_with(assets);
        assert!(s.select_collection(CollectionId(1), false));
        assert!(s.select_sample(SoundId(7)));
        assert!(!s.select_sample(SoundId(8)));
        assert_eq!(s.selectable_samples().len(), 1);
    }

    #[test]
    fn sample_index_follows_catalog_order() {
        let mut s = ready();
        s.select_sample(SoundId(8));
        s.place_clip(TrackId(1), 0.0).unwrap();
        let c = s.song.tracks[0].clips()[0].clone();
        assert_eq!(s.sample_index(&c), 2);
        assert_eq!(s.color_index(c.collection_id), Some(0));
        s.select_collection(CollectionId(1), false);
        assert_eq!(s.sample_index(&c), UNKNOWN_SAMPLE_INDEX);
    }

    #[test]
    fn clear_song_drops_tracks_and_filter() {
        let mut s = ready();
        s.place_clip(TrackId(1), 0.0).unwrap();
        s.toggle_filter();
        assert!(s.clear_song());
        assert!(s.song.tracks.is_empty());
        assert!(!s.song.is_filtered);
        assert_eq!(s.trax_string(), "");
    }

    #[test]
    fn scrolling_moves_offset_and_playhead_together() {
        let mut s = session();
        s.scroll_left();
        assert_eq!((s.song.offset, s.song.playhead_x), (0, 0));
        s.scroll_right();
        assert_eq!((s.song.offset, s.song.playhead_x), (45, 45));
        s.scroll_left();
        assert_eq!((s.song.offset, s.song.playhead_x), (0, 0));
    }

    #[test]
    fn volume_goes_into_the_trax_string() {
        let mut s = ready();
        s.place_clip(TrackId(1), 0.0).unwrap();
        assert!(s.set_volume(TrackId(1), 45));
        assert_eq!(s.trax_string(), "1-45:7,2");
        assert!(!s.set_volume(TrackId(3), 45));
    }

    #[test]
    fn loading_a_string_selects_its_collections() {
        let mut s = session();
        assert!(s.load_trax_string("1:7,2;0,1;9,1:2-30:8,5--lowpass"));
        assert_eq!(s.selected_collections(), &[CollectionId(1), CollectionId(2)]);
        assert!(s.song.is_filtered);
        assert_eq!(s.song.tracks.len(), 2);
        assert_eq!(s.song.tracks[1].volume, 30);
        // 8 spans 2 blocks: 5 blocks tile into 3 copies
        assert_eq!(s.song.tracks[1].clips().len(), 3);
        assert_eq!(s.trax_string(), "1:7,2;0,1;9,1:2-30:8,6--lowpass");
    }

    #[test]
    fn loading_replaces_the_previous_song() {
        let mut s = ready();
        s.add_track();
        s.place_clip(TrackId(2), 0.0).unwrap();
        s.scroll_right();
        assert!(s.load_trax_string("1:9,1"));
        assert_eq!(s.song.tracks.len(), 1);
        assert_eq!(s.song.offset, 0);
        assert_eq!(s.trax_string(), "1:9,1");
    }

    #[test]
    fn unknown_and_unloadable_sounds_are_skipped() {
        let mut s = session();
        // 5 is in the catalog but its file is missing; 42 is unknown
        assert!(s.load_trax_string("1:5,1;42,2;9,1"));
        let clips = s.song.tracks[0].clips();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].x, 0);
    }

    #[test]
    fn preview_replaces_the_previous_one() {
        let mut s = ready();
        let mut g = RecordingGraph::new();
        assert!(s.preview_sample(&mut g));
        let first = g.started[0].id;
        assert!(s.preview_sample(&mut g));
        assert_eq!(g.stopped, vec![first]);
        assert!(g.started.iter().all(|v| v.track.is_none()));
        s.stop_preview(&mut g);
        assert_eq!(g.stopped.len(), 2);
    }

    #[test]
    fn preview_is_refused_while_playing() {
        let mut s = ready();
        s.place_clip(TrackId(1), 0.0).unwrap();
        let mut g = RecordingGraph::new();
        s.play(&mut g);
        assert!(!s.preview_sample(&mut g));
    }
}
