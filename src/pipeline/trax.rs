//! Trax strings: the text form of a whole song.
//!
//! ```text
//! song  := track (':' track)* ('--lowpass')?
//! track := trackId ('-' volume)? ':' run (';' run)*
//! run   := soundId ',' durationBlocks
//! ```
//!
//! Sound id 0 is a silence run. The encoder merges back-to-back runs of the
//! same sound, so one run does not have to correspond to one placed clip.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::shared::{DEFAULT_VOLUME, MAX_TIMELINE_BLOCKS, SoundId, TrackId};

use super::grid::GridConfig;
use super::song::{Clip, ClipIds, Sample, Song, Track};

pub const LOWPASS_SUFFIX: &str = "--lowpass";

#[derive(Error, Debug, PartialEq)]
pub enum TraxError {
    #[error("track header {0:?} has no runs")]
    MissingRuns(String),
    #[error("bad track id in header {0:?}")]
    BadTrackId(String),
    #[error("bad volume in header {0:?}")]
    BadVolume(String),
    #[error("run {0:?} is not `sound,blocks`")]
    BadRun(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Run {
    Silence { blocks: u32 },
    Sound { id: SoundId, blocks: u32 },
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Run::Silence { blocks } => write!(f, "0,{blocks}"),
            Run::Sound { id, blocks } => write!(f, "{},{blocks}", id.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackSpec {
    pub volume: u8,
    pub runs: Vec<Run>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SongSpec {
    pub tracks: Vec<TrackSpec>,
    pub lowpass: bool,
}

impl SongSpec {
    // Nonzero sound ids, in order of appearance
    pub fn sounds(&self) -> impl Iterator<Item = SoundId> + '_ {
        self.tracks.iter().flat_map(|t| t.runs.iter()).filter_map(|r| match r {
            Run::Sound { id, .. } => Some(*id),
            Run::Silence { .. } => None,
        })
    }
}

// ── Encode ─────────────────────────────────────────────────────────

pub fn encode(song: &Song, grid: &GridConfig) -> String {
    format(&canonical(song, grid))
}

// The merged run form of a song
pub fn canonical(song: &Song, grid: &GridConfig) -> SongSpec {
    let tracks = song
        .tracks
        .iter()
        .map(|track| TrackSpec {
            volume: track.volume,
            runs: track_runs(track.clips(), grid),
        })
        .collect();
    SongSpec {
        tracks,
        lowpass: song.is_filtered,
    }
}

fn track_runs(clips: &[Clip], grid: &GridConfig) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    let mut cursor: i64 = 0; // blocks

    for clip in clips {
        let start = grid.px_to_blocks(clip.x) as i64;
        let blocks = clip.sample.block_span;
        let gap = start - cursor;
        if gap > 0 {
            runs.push(Run::Silence { blocks: gap as u32 });
        }

        match runs.last_mut() {
            Some(Run::Sound { id, blocks: total }) if *id == clip.sound_id() && gap == 0 => {
                *total += blocks;
            }
            _ => runs.push(Run::Sound {
                id: clip.sound_id(),
                blocks,
            }),
        }
        cursor = start + blocks as i64;
    }
    runs
}

pub fn format(spec: &SongSpec) -> String {
    let body = spec
        .tracks
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let runs = t.runs.iter().map(Run::to_string).collect::<Vec<_>>().join(";");
            if t.volume == DEFAULT_VOLUME {
                format!("{}:{runs}", i + 1)
            } else {
                format!("{}-{}:{runs}", i + 1, t.volume)
            }
        })
        .collect::<Vec<_>>()
        .join(":");
    if spec.lowpass {
        body + LOWPASS_SUFFIX
    } else {
        body
    }
}

// ── Decode ─────────────────────────────────────────────────────────

// Unparseable tracks and runs are logged and dropped; parsing itself never fails
pub fn parse(input: &str) -> SongSpec {
    let mut parts = input.trim().split(LOWPASS_SUFFIX);
    let body = parts.next().unwrap_or_default();
    let lowpass = parts.next().is_some();

    let sections: Vec<&str> = body.split(':').collect();
    let mut tracks = Vec::new();

    for pair in sections.chunks(2) {
        match parse_track(pair) {
            Ok(t) => tracks.push(t),
            Err(e) => log::warn!("skipping track: {e}"),
        }
    }

    SongSpec { tracks, lowpass }
}

fn parse_track(pair: &[&str]) -> Result<TrackSpec, TraxError> {
    let header = pair[0].trim();
    let runs_part = match pair.get(1).map(|s| s.trim()) {
        Some(r) if !r.is_empty() => r,
        _ => return Err(TraxError::MissingRuns(header.to_string())),
    };

    let (id_str, volume_str) = match header.split_once('-') {
        Some((id, vol)) => (id, Some(vol)),
        None => (header, None),
    };
    match id_str.trim().parse::<u32>() {
        Ok(id) if id > 0 => {}
        _ => return Err(TraxError::BadTrackId(header.to_string())),
    }
    let volume = match volume_str.map(str::trim) {
        None | Some("") => DEFAULT_VOLUME,
        Some(v) => v
            .parse::<i64>()
            .map(|v| v.clamp(1, 100) as u8)
            .map_err(|_| TraxError::BadVolume(header.to_string()))?,
    };

    let mut runs = Vec::new();
    for s in runs_part.split(';') {
        match parse_run(s) {
            Ok(r) => runs.push(r),
            Err(e) => log::warn!("skipping run: {e}"),
        }
    }
    Ok(TrackSpec { volume, runs })
}

fn parse_run(s: &str) -> Result<Run, TraxError> {
    let bad = || TraxError::BadRun(s.to_string());
    let (sound, blocks) = s.split_once(',').ok_or_else(bad)?;
    let sound: u32 = sound.trim().parse().map_err(|_| bad())?;
    let blocks: u32 = blocks.trim().parse().map_err(|_| bad())?;
    Ok(match sound {
        0 => Run::Silence { blocks },
        id => Run::Sound { id: SoundId(id), blocks },
    })
}

// Lay the parsed runs out as clips. Sounds `resolve` can't produce are
// skipped without moving the cursor. A run longer than the sample is tiled
// with whole copies at the sample's native width. Runs that would end past
// MAX_TIMELINE_BLOCKS are skipped the same way.
pub fn build_tracks(
    spec: &SongSpec,
    grid: &GridConfig,
    ids: &mut ClipIds,
    resolve: impl Fn(SoundId) -> Option<Arc<Sample>>,
) -> Vec<Track> {
    let limit = grid.blocks_to_px(MAX_TIMELINE_BLOCKS);
    let fits = |end: Option<u32>| end.filter(|&e| e <= limit);
    let mut tracks = Vec::with_capacity(spec.tracks.len());

    for t in &spec.tracks {
        let mut track = Track::with_volume(TrackId(tracks.len() as u32 + 1), t.volume);
        let mut cursor = 0u32;

        for run in &t.runs {
            match *run {
                Run::Silence { blocks } => {
                    match fits(cursor.checked_add(grid.blocks_to_px(blocks))) {
                        Some(end) => cursor = end,
                        None => log::warn!("skipping run {run}: past the end of the timeline"),
                    }
                }
                Run::Sound { id, blocks } => {
                    let Some(sample) = resolve(id) else {
                        log::debug!("sound {} not loaded, skipping run", id.0);
                        continue;
                    };
                    let duration = sample.buffer.duration_secs();
                    let native = grid.native_blocks(duration);
                    let width = grid.blocks_to_px(native);
                    let copies = blocks.div_ceil(native);
                    let covered = copies.checked_mul(width).and_then(|px| cursor.checked_add(px));
                    if fits(covered).is_none() {
                        log::warn!("skipping run {run}: past the end of the timeline");
                        continue;
                    }

                    for _ in 0..copies {
                        track.insert(Clip {
                            id: ids.next(),
                            sample: sample.clone(),
                            x: cursor,
                            width,
                            collection_id: sample.collection_id,
                            duration_seconds: duration,
                        });
                        cursor += width;
                    }
                }
            }
        }
        tracks.push(track);
    }
    tracks
}
