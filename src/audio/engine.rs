use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::effect::{Effect, Gain, Lowpass};
use super::frame::StereoFrame;
use super::voice::Voice;
use crate::audio_api::{AudioCommand, TrackId};
use crate::shared::{FILTER_CLOSED_HZ, FILTER_OPEN_HZ, MASTER_GAIN};

const BLOCK: usize = 1024;
const MAX_VOICES: usize = 256; // reserved up front so we wont malloc in audio callback

#[derive(Clone, Copy, Debug)]
struct TrackGain {
    current: f32,
    pending: Option<(u64, f32)>, // (at_frame, gain)
}

// Mixes scheduled voices into stereo blocks. Runs inside the cpal callback
// for live playback and in a plain loop for offline renders.
pub struct Engine {
    sample_rate: u32,
    frame: u64,
    voices: Vec<Voice>,
    gains: HashMap<TrackId, TrackGain>,
    filter: Lowpass,
    master: Gain,
    clock: Option<Arc<AtomicU64>>, // published frame counter for the ui thread
}

impl Engine {
    pub fn new(sample_rate: u32, filter_q: f32) -> Self {
        Self {
            sample_rate,
            frame: 0,
            voices: Vec::with_capacity(MAX_VOICES),
            gains: HashMap::new(),
            filter: Lowpass::new(sample_rate, FILTER_OPEN_HZ, filter_q),
            master: Gain::new(MASTER_GAIN),
            clock: None,
        }
    }

    pub fn set_clock(&mut self, clock: Arc<AtomicU64>) {
        clock.store(self.frame, Ordering::Relaxed);
        self.clock = Some(clock);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Start { id, track, buffer, start_frame, offset_secs } => {
                let voice = Voice::new(id, track, buffer, start_frame, offset_secs, self.sample_rate);
                self.voices.push(voice);
            }
            AudioCommand::Stop(id) => self.voices.retain(|v| v.id != id),
            AudioCommand::SetTrackGain { track, gain, at_frame } => {
                let entry = self.gains.entry(track).or_insert(TrackGain {
                    current: 1.0,
                    pending: None,
                });
                if at_frame <= self.frame {
                    entry.current = gain;
                    entry.pending = None;
                } else {
                    entry.pending = Some((at_frame, gain));
                }
            }
            AudioCommand::SetLowpass(on) => {
                // no ramp: the switch is immediate
                self.filter.set_cutoff(if on { FILTER_CLOSED_HZ } else { FILTER_OPEN_HZ });
                self.filter.set_enabled(on);
            }
        }
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::zero());
        let block_start = self.frame;
        let block_end = block_start + out.len() as u64;

        for g in self.gains.values_mut() {
            if let Some((at, gain)) = g.pending {
                if at < block_end {
                    g.current = gain;
                    g.pending = None;
                }
            }
        }

        // track voices go through the master chain
        for v in self.voices.iter_mut().filter(|v| v.track.is_some()) {
            let gain = v
                .track
                .and_then(|t| self.gains.get(&t))
                .map(|g| g.current)
                .unwrap_or(1.0);
            v.render_into(block_start, out, gain);
        }
        self.filter.process(out);
        self.master.process(out);

        // previews are added after it
        for v in self.voices.iter_mut().filter(|v| v.track.is_none()) {
            v.render_into(block_start, out, 1.0);
        }

        self.voices.retain(|v| v.active);
        self.frame = block_end;
        if let Some(clock) = &self.clock {
            clock.store(self.frame, Ordering::Relaxed);
        }
    }

    // Offline: render `frames` frames from the current position
    pub fn render(&mut self, frames: usize) -> Vec<StereoFrame> {
        let mut out = vec![StereoFrame::zero(); frames];
        for chunk in out.chunks_mut(BLOCK) {
            self.render_block(chunk);
        }
        out
    }
}
