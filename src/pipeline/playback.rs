// Live transport. `play` schedules everything from the playhead onward in one
// go; after that the host calls `tick` once per frame to move the playhead,
// page the view, and loop or stop at the end.

use crate::audio_api::AudioGraph;
use crate::shared::{LOOKAHEAD_SECS, PAGE_MARGIN_BLOCKS, VoiceId};

use super::schedule::{plan, submit};
use super::session::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Playing,
    Paused,
}

// Exists only while playing
#[derive(Clone, Debug)]
pub struct PlaybackSession {
    pub anchor: f64, // graph time the session's start_x lines up with
    pub start_x: u32,
    pub voices: Vec<VoiceId>,
    pub duration: f64, // seconds from start_x to the end of the song
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Advanced,
    Looped,
    Finished,
}

impl Session {
    pub fn play(&mut self, graph: &mut dyn AudioGraph) -> bool {
        if self.is_playing() {
            return false;
        }

        self.song.playhead_x = self.grid.snap_to_grid(self.song.playhead_x as f64, 0);
        let start_x = self.song.playhead_x;

        let remaining = self.total_timeline_pixels().saturating_sub(start_x);
        let duration = remaining as f64 * self.seconds_per_px();
        if duration <= 0.0 {
            log::info!("nothing to play from {start_x}px");
            return false;
        }

        let anchor = graph.now() + LOOKAHEAD_SECS;
        graph.set_lowpass(self.song.is_filtered);
        for track in &self.song.tracks {
            graph.connect_track(track.id, track.gain(), anchor);
        }

        let entries = plan(&self.song.tracks, start_x);
        let voices = submit(graph, &entries, anchor);
        log::debug!("playing from {start_x}px: {} voices, {duration:.2}s", voices.len());

        self.playback = Some(PlaybackSession {
            anchor,
            start_x,
            voices,
            duration,
        });
        self.state = PlayState::Playing;
        true
    }

    // Tear down, keep the position
    pub fn pause(&mut self, graph: &mut dyn AudioGraph) {
        self.teardown(graph);
        self.state = PlayState::Paused;
    }

    // Tear down and rewind
    pub fn stop(&mut self, graph: &mut dyn AudioGraph) {
        self.teardown(graph);
        self.song.playhead_x = 0;
        self.song.offset = 0;
        self.state = PlayState::Stopped;
    }

    fn teardown(&mut self, graph: &mut dyn AudioGraph) {
        if let Some(session) = self.playback.take() {
            for voice in session.voices {
                graph.stop_voice(voice);
            }
        }
    }

    // One step of the playhead loop. `visible_width` is the timeline's
    // on-screen width in pixels.
    pub fn tick(&mut self, graph: &mut dyn AudioGraph, visible_width: u32) -> TickOutcome {
        let Some(session) = &self.playback else {
            return TickOutcome::Idle;
        };
        let elapsed = graph.now() - session.anchor;
        let start_x = session.start_x;

        if elapsed >= session.duration {
            if start_x > 0 {
                self.stop(graph);
                return TickOutcome::Finished;
            }
            // back to where this run began, then go again
            self.teardown(graph);
            self.song.playhead_x = start_x;
            self.song.offset = start_x;
            self.play(graph);
            return TickOutcome::Looped;
        }

        let step = self.grid.blocks_to_px(1);
        let steps = self.grid.blocks_elapsed(elapsed);
        let playhead = (start_x + steps * step).min(self.total_timeline_pixels());
        self.song.playhead_x = playhead;

        let blocks_per_page = (visible_width / step.max(1)) as i64 - PAGE_MARGIN_BLOCKS;
        if blocks_per_page > 0 {
            let page = blocks_per_page as u32 * step;
            if playhead > self.song.offset + page {
                self.song.offset += page;
            }
        }
        TickOutcome::Advanced
    }

    pub fn total_timeline_pixels(&self) -> u32 {
        self.song.total_timeline_pixels()
    }

    pub fn seconds_per_px(&self) -> f64 {
        self.song.seconds_per_px()
    }
}
