// Sits between the tui and the session: turns semantic input events into
// session operations, owns the (lazily started) audio graph, and builds the
// DisplayState the view draws each frame.

use std::path::PathBuf;

use crate::audio_api::AudioGraph;
use crate::config::{AppConfig, Features};
use crate::pipeline::persistence::{self, HostMessage};
use crate::pipeline::{Session, TickOutcome};
use crate::shared::{Cell, Direction, DisplayState, InputEvent, LaneView, SoundId, TrackId};

const VOLUME_STEP: u8 = 5;

pub type GraphFactory = Box<dyn FnMut() -> anyhow::Result<Box<dyn AudioGraph>>>;

pub struct Middle {
    pub session: Session,
    features: Features,
    project_dir: PathBuf,
    export_path: PathBuf,
    graph: Option<Box<dyn AudioGraph>>,
    start_graph: GraphFactory,
    cursor_track: usize,
    cursor_block: u32,
    status: String,
}

impl Middle {
    pub fn new(session: Session, config: &AppConfig, project_dir: PathBuf, start_graph: GraphFactory) -> Self {
        let export_path = config.export_path(&project_dir);
        Self {
            session,
            features: config.features,
            project_dir,
            export_path,
            graph: None,
            start_graph,
            cursor_track: 0,
            cursor_block: 0,
            status: String::new(),
        }
    }

    // Start the audio graph on first use. False if it could not be started.
    fn ensure_graph(&mut self) -> bool {
        if self.graph.is_some() {
            return true;
        }
        match (self.start_graph)() {
            Ok(g) => {
                self.graph = Some(g);
                true
            }
            Err(e) => {
                log::error!("failed to start audio: {e:#}");
                self.status = format!("audio unavailable: {e}");
                false
            }
        }
    }

    fn cursor_track_id(&self) -> Option<TrackId> {
        self.session.song.tracks.get(self.cursor_track).map(|t| t.id)
    }

    fn cursor_px(&self) -> u32 {
        self.session.grid.blocks_to_px(self.cursor_block)
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::MoveCursor(dir) => self.move_cursor(dir),
            InputEvent::PlaceClip => self.place(),
            InputEvent::DeleteClip => self.delete(),
            InputEvent::AddTrack => {
                let id = self.session.add_track();
                self.cursor_track = self.session.song.tracks.len() - 1;
                self.status = format!("track {} added", id.0);
            }
            InputEvent::ScrollLeft => self.session.scroll_left(),
            InputEvent::ScrollRight => self.session.scroll_right(),

            InputEvent::PlayPause => self.play_pause(),
            InputEvent::Stop => {
                if let Some(g) = self.graph.as_deref_mut() {
                    self.session.stop(g);
                } else {
                    self.session.song.playhead_x = 0;
                    self.session.song.offset = 0;
                }
            }

            InputEvent::SelectSample(n) => self.select_sample(n),
            InputEvent::ToggleCollection(n) => self.toggle_collection(n),
            InputEvent::PreviewSample => {
                if self.ensure_graph() {
                    if let Some(g) = self.graph.as_deref_mut() {
                        self.session.preview_sample(g);
                    }
                }
            }
            InputEvent::ToggleLowpass => {
                if !self.features.lowpass {
                    self.status = "lowpass is not enabled".into();
                    return;
                }
                let on = self.session.toggle_filter();
                if let Some(g) = self.graph.as_deref_mut() {
                    g.set_lowpass(on);
                }
            }
            InputEvent::VolumeDown => self.nudge_volume(-(VOLUME_STEP as i16)),
            InputEvent::VolumeUp => self.nudge_volume(VOLUME_STEP as i16),

            InputEvent::Export => {
                if !self.features.download {
                    self.status = "export is not enabled".into();
                } else if self.session.export() {
                    self.status = "exporting...".into();
                }
            }
            InputEvent::Save => match self.save() {
                Ok(()) => self.status = "saved".into(),
                Err(e) => {
                    log::error!("save failed: {e:#}");
                    self.status = format!("save failed: {e}");
                }
            },
            InputEvent::ClearSong => {
                if self.session.clear_song() {
                    self.cursor_track = 0;
                    if let Some(g) = self.graph.as_deref_mut() {
                        g.set_lowpass(false);
                    }
                }
            }
            InputEvent::Quit => {}
        }
    }

    fn move_cursor(&mut self, dir: Direction) {
        match dir {
            Direction::Left => self.cursor_block = self.cursor_block.saturating_sub(1),
            Direction::Right => self.cursor_block += 1,
            Direction::Up => self.cursor_track = self.cursor_track.saturating_sub(1),
            Direction::Down => {
                let last = self.session.song.tracks.len().saturating_sub(1);
                self.cursor_track = (self.cursor_track + 1).min(last);
            }
        }
    }

    fn place(&mut self) {
        let Some(track) = self.cursor_track_id() else {
            self.status = "no track here".into();
            return;
        };
        let raw = self.cursor_px() as f64 - self.session.song.offset as f64;
        if self.session.place_clip(track, raw).is_none() {
            self.status = "can't place here".into();
        }
    }

    fn delete(&mut self) {
        let px = self.cursor_px();
        let Some(track) = self.cursor_track_id() else {
            return;
        };
        let clip = self
            .session
            .song
            .track(track)
            .and_then(|t| t.clip_at(px))
            .map(|c| c.id);
        if let Some(clip) = clip {
            if !self.session.delete_clip(track, clip) {
                self.status = "can't edit while playing".into();
            }
        }
    }

    fn play_pause(&mut self) {
        if self.session.is_playing() {
            if let Some(g) = self.graph.as_deref_mut() {
                self.session.pause(g);
            }
            return;
        }
        if !self.ensure_graph() {
            return;
        }
        if let Some(g) = self.graph.as_deref_mut() {
            self.session.stop_preview(g);
            if !self.session.play(g) {
                self.status = "nothing to play".into();
            }
        }
    }

    fn select_sample(&mut self, n: u8) {
        let samples = self.session.selectable_samples();
        match samples.get((n as usize).wrapping_sub(1)) {
            Some(s) => {
                self.session.select_sample(s.sound_id);
                self.status = format!("sample {}", s.name);
            }
            None => self.status = format!("no sample {n}"),
        }
    }

    fn toggle_collection(&mut self, n: u8) {
        let id = self
            .session
            .catalog()
            .collections
            .get((n as usize).wrapping_sub(1))
            .map(|c| c.id);
        match id {
            Some(id) => {
                if !self.session.select_collection(id, false) {
                    self.status = format!("can't toggle collection {n}");
                }
            }
            None => self.status = format!("no collection {n}"),
        }
    }

    fn nudge_volume(&mut self, delta: i16) {
        if !self.features.volume {
            self.status = "volume is not enabled".into();
            return;
        }
        let Some(track) = self.session.song.tracks.get(self.cursor_track) else {
            return;
        };
        let (id, volume) = (track.id, (track.volume as i16 + delta).clamp(1, 100) as u8);
        self.session.set_volume(id, volume);

        // follow along live
        if self.session.is_playing() {
            if let Some(g) = self.graph.as_deref_mut() {
                let now = g.now();
                g.connect_track(id, volume as f32 / 100.0, now);
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        persistence::save_song(&self.project_dir, &self.session.trax_string())
    }

    pub fn handle_host_message(&mut self, msg: HostMessage) {
        match msg {
            HostMessage::LoadTraxString { string } => {
                if self.session.is_playing() {
                    if let Some(g) = self.graph.as_deref_mut() {
                        self.session.stop(g);
                    }
                }
                if self.session.load_trax_string(&string) {
                    self.cursor_track = 0;
                    self.cursor_block = 0;
                }
            }
            HostMessage::SaveSong { string } => {
                if let Err(e) = persistence::save_song(&self.project_dir, &string) {
                    log::error!("save failed: {e:#}");
                }
            }
        }
    }

    // Once per frame: advance the playhead and pick up a finished export
    pub fn tick(&mut self, visible_cols: u16) {
        if let Some(g) = self.graph.as_deref_mut() {
            let width = self.session.grid.blocks_to_px(visible_cols as u32);
            match self.session.tick(g, width) {
                TickOutcome::Finished => self.status = "stopped".into(),
                TickOutcome::Looped => log::debug!("looped"),
                TickOutcome::Idle | TickOutcome::Advanced => {}
            }
        }

        if let Some(mix) = self.session.poll_export() {
            self.status = match mix.write_wav(&self.export_path) {
                Ok(()) => format!("exported {}", self.export_path.display()),
                Err(e) => {
                    log::error!("export failed: {e:#}");
                    format!("export failed: {e}")
                }
            };
        }
    }

    // Let a running export finish before we exit
    pub fn finish_export(&mut self) {
        if let Some(mix) = self.session.wait_export() {
            if let Err(e) = mix.write_wav(&self.export_path) {
                log::error!("export failed: {e:#}");
            }
        }
    }

    pub fn display_state(&self, visible_cols: u16) -> DisplayState {
        let s = &self.session;
        let step = s.grid.blocks_to_px(1).max(1);
        let first_block = s.song.offset / step;

        let lanes = s
            .song
            .tracks
            .iter()
            .map(|track| {
                let cells = (first_block..first_block + visible_cols as u32)
                    .map(|block| {
                        let px = block * step;
                        match track.clip_at(px) {
                            None => Cell::Empty,
                            Some(c) => {
                                let color = s.color_index(c.collection_id).unwrap_or(0);
                                if c.x == px {
                                    Cell::ClipStart { sound: c.sound_id(), color }
                                } else {
                                    Cell::ClipBody { sound: c.sound_id(), color }
                                }
                            }
                        }
                    })
                    .collect();
                LaneView {
                    label: format!("{} vol {}", track.id.0, track.volume),
                    cells,
                }
            })
            .collect();

        let selected_sample = match s.selected() {
            Some(sample) => sample_label(sample.sound_id, &sample.name),
            None => String::from("-"),
        };
        let collections = s
            .catalog()
            .collections
            .iter()
            .map(|c| (c.name.clone(), s.is_selected(c.id)))
            .collect();

        DisplayState {
            lanes,
            first_block,
            playhead_block: s.song.playhead_x / step,
            cursor_track: self.cursor_track,
            cursor_block: self.cursor_block,
            playing: s.is_playing(),
            lowpass: s.song.is_filtered,
            exporting: s.is_exporting(),
            selected_sample,
            collections,
            status: self.status.clone(),
            trax: s.trax_string(),
        }
    }
}

fn sample_label(sound: SoundId, name: &str) -> String {
    if name.is_empty() {
        format!("#{}", sound.0)
    } else {
        format!("#{} {name}", sound.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_fixture::{RecordingGraph, session};
    use std::cell::Cell as StdCell;
    use std::rc::Rc;

    fn middle_with(features: &str) -> (Middle, Rc<StdCell<u32>>) {
        let starts = Rc::new(StdCell::new(0));
        let counter = starts.clone();
        let config = AppConfig {
            features: Features::parse(features),
            ..AppConfig::default()
        };
        let dir = std::env::temp_dir().join(format!("trax-middle-{}", std::process::id()));
        let m = Middle::new(
            session(),
            &config,
            dir,
            Box::new(move || -> anyhow::Result<Box<dyn AudioGraph>> {
                counter.set(counter.get() + 1);
                Ok(Box::new(RecordingGraph::new()))
            }),
        );
        (m, starts)
    }

    fn ready(features: &str) -> (Middle, Rc<StdCell<u32>>) {
        let (mut m, starts) = middle_with(features);
        m.handle_input(InputEvent::ToggleCollection(1));
        m.handle_input(InputEvent::SelectSample(1));
        (m, starts)
    }

    #[test]
    fn audio_starts_lazily_and_once() {
        let (mut m, starts) = ready("");
        m.handle_input(InputEvent::PlaceClip);
        assert_eq!(starts.get(), 0);
        m.handle_input(InputEvent::PlayPause);
        m.handle_input(InputEvent::PlayPause);
        m.handle_input(InputEvent::PreviewSample);
        assert_eq!(starts.get(), 1);
    }

    #[test]
    fn failing_audio_degrades_to_a_status() {
        let mut m = Middle::new(
            session(),
            &AppConfig::default(),
            std::env::temp_dir(),
            Box::new(|| -> anyhow::Result<Box<dyn AudioGraph>> { anyhow::bail!("no device") }),
        );
        m.handle_input(InputEvent::PlayPause);
        assert!(!m.session.is_playing());
        assert!(m.display_state(10).status.contains("no device"));
    }

    #[test]
    fn cursor_places_and_deletes() {
        let (mut m, _) = ready("");
        m.handle_input(InputEvent::MoveCursor(Direction::Right));
        m.handle_input(InputEvent::PlaceClip);
        assert_eq!(m.session.trax_string(), "1:0,1;7,2");

        let ds = m.display_state(4);
        assert_eq!(ds.lanes[0].cells[0], Cell::Empty);
        assert!(matches!(ds.lanes[0].cells[1], Cell::ClipStart { sound: SoundId(7), .. }));
        assert!(matches!(ds.lanes[0].cells[2], Cell::ClipBody { sound: SoundId(7), .. }));
        assert_eq!(ds.selected_sample, "#7 kick loop");
        assert_eq!(ds.collections[0], ("drums".to_string(), true));

        // any cell of the clip deletes it
        m.handle_input(InputEvent::MoveCursor(Direction::Right));
        m.handle_input(InputEvent::DeleteClip);
        assert_eq!(m.session.trax_string(), "1:");
    }

    #[test]
    fn cursor_moves_between_tracks() {
        let (mut m, _) = ready("");
        m.handle_input(InputEvent::MoveCursor(Direction::Down));
        assert_eq!(m.display_state(4).cursor_track, 0);
        m.handle_input(InputEvent::AddTrack);
        assert_eq!(m.display_state(4).cursor_track, 1);
        m.handle_input(InputEvent::PlaceClip);
        m.handle_input(InputEvent::MoveCursor(Direction::Up));
        m.handle_input(InputEvent::MoveCursor(Direction::Up));
        assert_eq!(m.display_state(4).cursor_track, 0);
        assert_eq!(m.session.trax_string(), "1::2:7,2");
    }

    #[test]
    fn features_gate_their_keys() {
        let (mut m, _) = ready("");
        m.handle_input(InputEvent::PlaceClip);
        m.handle_input(InputEvent::ToggleLowpass);
        m.handle_input(InputEvent::VolumeDown);
        m.handle_input(InputEvent::Export);
        assert_eq!(m.session.trax_string(), "1:7,2");
        assert!(!m.session.is_exporting());

        let (mut m, _) = ready("lowpass;volume");
        m.handle_input(InputEvent::PlaceClip);
        m.handle_input(InputEvent::ToggleLowpass);
        m.handle_input(InputEvent::VolumeDown);
        assert_eq!(m.session.trax_string(), "1-95:7,2--lowpass");
    }

    #[test]
    fn play_pause_toggles_and_tick_advances() {
        let (mut m, _) = ready("");
        m.handle_input(InputEvent::PlaceClip);
        m.handle_input(InputEvent::PlayPause);
        assert!(m.display_state(10).playing);
        m.tick(10);
        m.handle_input(InputEvent::PlayPause);
        assert!(!m.display_state(10).playing);
    }

    #[test]
    fn host_message_replaces_the_song_even_while_playing() {
        let (mut m, _) = ready("");
        m.handle_input(InputEvent::PlaceClip);
        m.handle_input(InputEvent::PlayPause);
        m.handle_host_message(HostMessage::LoadTraxString { string: "1:9,1:2:8,2".into() });
        assert!(!m.session.is_playing());
        assert_eq!(m.session.trax_string(), "1:9,1:2:8,2");
        assert_eq!(m.display_state(3).lanes.len(), 2);
    }

    #[test]
    fn collection_keys_toggle_by_position() {
        let (mut m, _) = middle_with("");
        m.handle_input(InputEvent::ToggleCollection(2));
        let ds = m.display_state(4);
        assert_eq!(ds.collections, vec![("drums".to_string(), false), ("keys".to_string(), true)]);
        m.handle_input(InputEvent::ToggleCollection(7));
        assert!(m.display_state(4).status.contains("no collection 7"));
        m.handle_input(InputEvent::SelectSample(0));
        assert!(m.display_state(4).status.contains("no sample 0"));
    }
}
