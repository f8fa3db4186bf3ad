// Overlap rule for placement: clips on one track never share a pixel.
// Intervals are half-open, so touching edges are fine.

use super::song::Track;

pub fn can_place(track: &Track, x: u32, width: u32) -> bool {
    let end = x.saturating_add(width);
    !track.clips().iter().any(|c| x < c.end() && c.x < end)
}
