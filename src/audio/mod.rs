use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio_api::{AudioCommand, AudioGraph, TrackId, VoiceId, secs_to_frame};
use crate::shared::LIVE_FILTER_Q;

mod effect;
mod engine;
mod frame;
mod sample_buffer;
mod voice;

pub use effect::{Effect, Gain, Lowpass};
pub use engine::Engine;
pub use frame::StereoFrame;
pub use sample_buffer::SampleBuffer;

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    clock: Arc<AtomicU64>, // frames rendered so far, written by the callback
    sample_rate: u32,
    next_voice: u64,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) {
        if self.tx.try_send(cmd).is_err() {
            log::warn!("audio command queue full, dropping command");
        }
    }

    fn alloc_voice(&mut self) -> VoiceId {
        let id = VoiceId(self.next_voice);
        self.next_voice += 1;
        id
    }
}

impl AudioGraph for AudioHandle {
    fn now(&self) -> f64 {
        self.clock.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn connect_track(&mut self, track: TrackId, gain: f32, at: f64) {
        self.send(AudioCommand::SetTrackGain {
            track,
            gain,
            at_frame: secs_to_frame(at, self.sample_rate),
        });
    }

    fn start_voice(&mut self, track: TrackId, buffer: Arc<SampleBuffer>, at: f64, offset: f64) -> VoiceId {
        let id = self.alloc_voice();
        self.send(AudioCommand::Start {
            id,
            track: Some(track),
            buffer,
            start_frame: secs_to_frame(at, self.sample_rate),
            offset_secs: offset,
        });
        id
    }

    fn stop_voice(&mut self, voice: VoiceId) {
        self.send(AudioCommand::Stop(voice));
    }

    fn set_lowpass(&mut self, on: bool) {
        self.send(AudioCommand::SetLowpass(on));
    }

    fn preview(&mut self, buffer: Arc<SampleBuffer>) -> VoiceId {
        let id = self.alloc_voice();
        let now = self.clock.load(Ordering::Relaxed);
        self.send(AudioCommand::Start {
            id,
            track: None,
            buffer,
            start_frame: now,
            offset_secs: 0.0,
        });
        id
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(4096);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate: u32 = config.sample_rate().into();
    let channels = config.channels() as usize;
    let clock = Arc::new(AtomicU64::new(0));

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream = build_output_stream_f32(
                &device, &config.into(), rx, clock.clone(), sample_rate, channels,
            )?;
            output_stream.play().context("failed to play output stream")?;
            log::info!("audio started: {sample_rate} Hz, {channels} channels");

            Ok(AudioHandle {
                tx,
                clock,
                sample_rate,
                next_voice: 0,
                _output_stream: output_stream,
            })
        }
        _ => anyhow::bail!("unsupported sample format (only f32 supported for now)"),
    }
}

// ── Output stream ─────────────────────────────────────────────────

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    clock: Arc<AtomicU64>,
    sample_rate: u32,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = Engine::new(sample_rate, LIVE_FILTER_Q);
    engine.set_clock(clock);
    let mut scratch: Vec<StereoFrame> = Vec::with_capacity(4096);

    let err_fn = |err| log::error!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() { // set up command handling
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels.max(1);
            scratch.resize(n_frames, StereoFrame::zero());
            engine.render_block(&mut scratch);

            for (out, f) in data.chunks_exact_mut(channels.max(1)).zip(scratch.iter()) {
                match out.len() {
                    1 => out[0] = 0.5 * (f.left + f.right),
                    _ => {
                        out[0] = f.left;
                        out[1] = f.right;
                        for extra in out.iter_mut().skip(2) {
                            *extra = 0.0;
                        }
                    }
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
