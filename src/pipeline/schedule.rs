// Decides what to play when, without touching the audio graph. Live playback
// and the offline render both run `plan` and then hand the entries to
// `submit` against their own graph.

use std::sync::Arc;

use crate::audio::SampleBuffer;
use crate::audio_api::AudioGraph;
use crate::shared::{ClipId, TrackId, VoiceId};

use super::grid::seconds_per_pixel;
use super::song::Track;

#[derive(Clone, Debug)]
pub enum Source {
    Clip { id: ClipId, buffer: Arc<SampleBuffer> },
    // filler that keeps the track's absolute timing pixel-accurate
    Silence { seconds: f64 },
}

#[derive(Clone, Debug)]
pub struct ScheduleEntry {
    pub track: TrackId,
    pub start: f64, // seconds after the anchor
    pub offset: f64, // seconds skipped into the buffer
    pub source: Source,
}

pub fn plan(tracks: &[Track], from_px: u32) -> Vec<ScheduleEntry> {
    let mut entries = Vec::new();

    for track in tracks {
        let mut cursor = 0u32; // px accounted for so far on this track

        for clip in track.clips() {
            if clip.end() <= from_px {
                continue; // already behind the playhead
            }
            let spp = seconds_per_pixel(clip);

            if clip.contains(from_px) {
                // playhead inside: start now, head truncated
                entries.push(ScheduleEntry {
                    track: track.id,
                    start: 0.0,
                    offset: (from_px - clip.x) as f64 * spp,
                    source: Source::Clip { id: clip.id, buffer: clip.buffer().clone() },
                });
            } else {
                let gap_start = cursor.max(from_px);
                if clip.x > gap_start {
                    let seconds = (clip.x - gap_start) as f64 * spp;
                    if seconds > 0.0 {
                        entries.push(ScheduleEntry {
                            track: track.id,
                            start: (gap_start - from_px) as f64 * spp,
                            offset: 0.0,
                            source: Source::Silence { seconds },
                        });
                    }
                }
                entries.push(ScheduleEntry {
                    track: track.id,
                    start: (clip.x - from_px) as f64 * spp,
                    offset: 0.0,
                    source: Source::Clip { id: clip.id, buffer: clip.buffer().clone() },
                });
            }

            cursor = clip.end();
        }
    }

    entries
}

// Hand the plan to a graph; returns every voice started so they can be torn down
pub fn submit(graph: &mut dyn AudioGraph, entries: &[ScheduleEntry], anchor: f64) -> Vec<VoiceId> {
    let rate = graph.sample_rate();
    entries
        .iter()
        .map(|e| {
            let buffer = match &e.source {
                Source::Clip { buffer, .. } => buffer.clone(),
                Source::Silence { seconds } => Arc::new(SampleBuffer::silent(*seconds, rate)),
            };
            graph.start_voice(e.track, buffer, anchor + e.start, e.offset)
        })
        .collect()
}
