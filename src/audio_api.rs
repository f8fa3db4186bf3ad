use std::sync::Arc;

pub use crate::audio::{SampleBuffer, StereoFrame};
pub use crate::shared::{TrackId, VoiceId};

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // The engine can't decode files (interrupts thread), so the buffer
    // travels with the command already decoded
    Start {
        id: VoiceId,
        track: Option<TrackId>, // None = preview, straight to the output
        buffer: Arc<SampleBuffer>,
        start_frame: u64,
        offset_secs: f64,
    },
    Stop(VoiceId),
    SetTrackGain { track: TrackId, gain: f32, at_frame: u64 },
    SetLowpass(bool),
}

// What the sequencer needs from an audio backend. The live cpal handle and
// the offline renderer both implement it, and tests use a recording fake.
pub trait AudioGraph {
    // monotonic clock, seconds
    fn now(&self) -> f64;

    fn sample_rate(&self) -> u32;

    // route a track's gain into the master chain; `gain` takes effect at `at`
    fn connect_track(&mut self, track: TrackId, gain: f32, at: f64);

    // play `buffer` on `track` from absolute time `at`, skipping `offset` seconds of it
    fn start_voice(&mut self, track: TrackId, buffer: Arc<SampleBuffer>, at: f64, offset: f64) -> VoiceId;

    fn stop_voice(&mut self, voice: VoiceId);

    fn set_lowpass(&mut self, on: bool);

    // immediate playback that bypasses track gain and the filter
    fn preview(&mut self, buffer: Arc<SampleBuffer>) -> VoiceId;
}

pub fn secs_to_frame(secs: f64, sample_rate: u32) -> u64 {
    (secs.max(0.0) * sample_rate as f64).round() as u64
}
