use std::sync::Arc;

use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use crate::audio_api::{TrackId, VoiceId};

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

// A buffer scheduled to start at an absolute engine frame. `track` is None
// for previews, which skip the track gain and the master filter.
#[derive(Clone, Debug)]
pub struct Voice {
    pub id: VoiceId,
    pub track: Option<TrackId>,
    pub start_frame: u64,
    pub pos: f64, // read position in source frames
    pub pitch: f64, // source frames per output frame
    pub active: bool,
    buffer: Arc<SampleBuffer>,
}

impl Voice {
    pub fn new(
        id: VoiceId,
        track: Option<TrackId>,
        buffer: Arc<SampleBuffer>,
        start_frame: u64,
        offset_secs: f64,
        output_rate: u32,
    ) -> Self {
        let pitch = buffer.sample_rate as f64 / output_rate.max(1) as f64;
        let pos = offset_secs.max(0.0) * buffer.sample_rate as f64;
        Self {
            id,
            track,
            start_frame,
            pos,
            pitch,
            active: !buffer.is_empty(),
            buffer,
        }
    }

    // Mix this voice into `out`, whose first frame sits at absolute `block_start`
    pub fn render_into(&mut self, block_start: u64, out: &mut [StereoFrame], gain: f32) {
        if !self.active {
            return;
        }
        let block_end = block_start + out.len() as u64;
        if self.start_frame >= block_end {
            return; // not our turn yet
        }
        let skip = self.start_frame.saturating_sub(block_start) as usize;

        let data = &self.buffer.data;
        let len = data.len();

        for frame in out[skip..].iter_mut() {
            let i = self.pos as usize;
            if i >= len {
                self.active = false;
                break;
            }
            let frac = (self.pos - i as f64) as f32;
            let s0 = data[i];
            let s1 = data.get(i + 1).copied().unwrap_or(s0);

            frame.left += lerp(s0.left, s1.left, frac) * gain;
            frame.right += lerp(s0.right, s1.right, frac) * gain;

            self.pos += self.pitch;
        }
    }
}
