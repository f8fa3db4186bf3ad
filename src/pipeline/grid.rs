// Pixel <-> time conversion. One grid step (px_per_beat pixels) is one block
// (seconds_per_block seconds) at a sample's native scale.

use serde::{Deserialize, Serialize};

use super::song::Clip;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub seconds_per_block: f64,
    pub px_per_beat: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            seconds_per_block: 2.0,
            px_per_beat: 45,
        }
    }
}

impl GridConfig {
    // Nearest grid step to `raw_px` once the scroll offset is added back in
    pub fn snap_to_grid(&self, raw_px: f64, offset: u32) -> u32 {
        let step = self.step() as f64;
        let absolute = (raw_px + offset as f64).max(0.0);
        ((absolute / step).round() * step) as u32
    }

    pub fn blocks_to_px(&self, blocks: u32) -> u32 {
        blocks.saturating_mul(self.step())
    }

    pub fn px_to_blocks(&self, px: u32) -> u32 {
        (px as f64 / self.step() as f64).round() as u32
    }

    // Whole blocks elapsed after `secs`
    pub fn blocks_elapsed(&self, secs: f64) -> u32 {
        if self.seconds_per_block <= 0.0 {
            return 0;
        }
        (secs.max(0.0) / self.seconds_per_block).floor() as u32
    }

    // Number of whole blocks a decoded buffer spans
    pub fn native_blocks(&self, duration_secs: f64) -> u32 {
        if self.seconds_per_block <= 0.0 {
            return 1;
        }
        ((duration_secs.round() / self.seconds_per_block).round() as u32).max(1)
    }

    fn step(&self) -> u32 {
        self.px_per_beat.max(1)
    }
}

// Seconds covered by one pixel of this clip. Computed per clip since tracks
// can mix samples of different lengths.
pub fn seconds_per_pixel(clip: &Clip) -> f64 {
    if clip.width == 0 {
        return 0.0;
    }
    clip.duration_seconds.round() / clip.width as f64
}
