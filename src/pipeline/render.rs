// Offline mixdown. Same plan as live playback, always from pixel 0, pushed
// through a private engine at a fixed rate instead of the sound card.

use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::audio::{Engine, SampleBuffer};
use crate::audio_api::{AudioCommand, AudioGraph, TrackId, VoiceId, secs_to_frame};
use crate::shared::{RENDER_FILTER_Q, RENDER_SAMPLE_RATE, RENDER_TAIL_SECS};

use super::grid::seconds_per_pixel;
use super::schedule::{plan, submit};
use super::song::Song;

// A graph whose clock stands still at 0 while the song is scheduled
pub struct OfflineGraph {
    engine: Engine,
    next_voice: u64,
}

impl OfflineGraph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            engine: Engine::new(sample_rate, RENDER_FILTER_Q),
            next_voice: 0,
        }
    }

    pub fn render(mut self, seconds: f64) -> SampleBuffer {
        let rate = self.engine.sample_rate();
        let frames = (seconds.max(0.0) * rate as f64).ceil() as usize;
        SampleBuffer {
            data: self.engine.render(frames),
            sample_rate: rate,
        }
    }

    fn start(&mut self, track: Option<TrackId>, buffer: Arc<SampleBuffer>, at: f64, offset: f64) -> VoiceId {
        let id = VoiceId(self.next_voice);
        self.next_voice += 1;
        self.engine.handle_cmd(AudioCommand::Start {
            id,
            track,
            buffer,
            start_frame: secs_to_frame(at, self.engine.sample_rate()),
            offset_secs: offset,
        });
        id
    }
}

impl AudioGraph for OfflineGraph {
    fn now(&self) -> f64 {
        self.engine.frame() as f64 / self.engine.sample_rate() as f64
    }

    fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }

    fn connect_track(&mut self, track: TrackId, gain: f32, at: f64) {
        let at_frame = secs_to_frame(at, self.engine.sample_rate());
        self.engine.handle_cmd(AudioCommand::SetTrackGain { track, gain, at_frame });
    }

    fn start_voice(&mut self, track: TrackId, buffer: Arc<SampleBuffer>, at: f64, offset: f64) -> VoiceId {
        self.start(Some(track), buffer, at, offset)
    }

    fn stop_voice(&mut self, voice: VoiceId) {
        self.engine.handle_cmd(AudioCommand::Stop(voice));
    }

    fn set_lowpass(&mut self, on: bool) {
        self.engine.handle_cmd(AudioCommand::SetLowpass(on));
    }

    fn preview(&mut self, buffer: Arc<SampleBuffer>) -> VoiceId {
        let now = self.now();
        self.start(None, buffer, now, 0.0)
    }
}

// Seconds to render: the latest clip end on any track, plus a tail
pub fn render_length(song: &Song) -> f64 {
    let end = song
        .clips()
        .map(|c| c.x as f64 * seconds_per_pixel(c) + c.buffer().duration_secs())
        .fold(0.0, f64::max);
    end + RENDER_TAIL_SECS
}

pub fn render_song(song: &Song) -> SampleBuffer {
    let mut graph = OfflineGraph::new(RENDER_SAMPLE_RATE);
    graph.set_lowpass(song.is_filtered);
    for track in &song.tracks {
        graph.connect_track(track.id, track.gain(), 0.0);
    }
    let entries = plan(&song.tracks, 0);
    submit(&mut graph, &entries, 0.0);

    let seconds = render_length(song);
    log::debug!("rendering {} entries, {seconds:.2}s", entries.len());
    graph.render(seconds)
}

// Runs one render at a time on a worker thread
#[derive(Default)]
pub struct Exporter {
    pending: Option<Receiver<SampleBuffer>>,
}

impl Exporter {
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn start(&mut self, song: Song) -> bool {
        if self.is_busy() {
            log::warn!("export already running");
            return false;
        }
        let (tx, rx) = crossbeam_channel::bounded(1);
        std::thread::spawn(move || {
            let _ = tx.send(render_song(&song));
        });
        self.pending = Some(rx);
        true
    }

    // The finished mix, once; None while busy or idle
    pub fn poll(&mut self) -> Option<SampleBuffer> {
        let rx = self.pending.as_ref()?;
        match rx.try_recv() {
            Ok(buffer) => {
                self.pending = None;
                Some(buffer)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::error!("export worker exited without a result");
                self.pending = None;
                None
            }
        }
    }

    // Block until the running export (if any) is done
    pub fn wait(&mut self) -> Option<SampleBuffer> {
        let rx = self.pending.take()?;
        rx.recv().ok()
    }
}
