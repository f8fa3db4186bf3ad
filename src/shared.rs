// Keys, as resolved by tui/input.rs:
//
// Timeline:
//   h j k l / arrows   //  MoveCursor(..)
//   Enter              //  PlaceClip
//   x                  //  DeleteClip
//   t                  //  AddTrack
//   < >                //  ScrollLeft / ScrollRight
//
// Transport:
//   Space              //  PlayPause
//   s                  //  Stop
//
// Sound:
//   1..9               //  SelectSample(n)      (ToggleCollection(n) while `c` is toggled on)
//   c                  //  collection mode toggle, handled by the tui
//   p                  //  PreviewSample
//   f                  //  ToggleLowpass
//   - =                //  VolumeDown / VolumeUp on the cursor track
//
// Song:
//   e                  //  Export
//   w                  //  Save
//   X                  //  ClearSong
//   Esc / q            //  Quit
//
// The middle layer owns the session; the tui only draws the DisplayState
// it is handed each frame.

use serde::{Deserialize, Serialize};

pub const LOOKAHEAD_SECS: f64 = 0.05; // scheduling margin ahead of the audio clock
pub const RENDER_SAMPLE_RATE: u32 = 22050;
pub const RENDER_TAIL_SECS: f64 = 0.5;
pub const MAX_SELECTED_COLLECTIONS: usize = 10;
pub const MASTER_GAIN: f32 = 0.9; // slight headroom
pub const FILTER_CLOSED_HZ: f32 = 300.0;
pub const FILTER_OPEN_HZ: f32 = 20000.0;
pub const LIVE_FILTER_Q: f32 = 0.1;
pub const RENDER_FILTER_Q: f32 = 1.0;
pub const PAGE_MARGIN_BLOCKS: i64 = 2; // blocks held back from the right edge when paging
pub const DEFAULT_VOLUME: u8 = 100;
pub const MAX_TIMELINE_BLOCKS: u32 = 4096; // decoded runs must end inside this

// ye olde types
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SoundId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollectionId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClipId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    MoveCursor(Direction),
    PlaceClip,
    DeleteClip,
    AddTrack,
    ScrollLeft,
    ScrollRight,

    PlayPause,
    Stop,

    SelectSample(u8), // nth sample across the selected collections, 1-based
    ToggleCollection(u8), // nth catalog collection, 1-based
    PreviewSample,
    ToggleLowpass,
    VolumeDown,
    VolumeUp,

    Export,
    Save,
    ClearSong,

    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Empty,
    ClipStart { sound: SoundId, color: usize },
    ClipBody { sound: SoundId, color: usize },
}

#[derive(Clone, Debug)]
pub struct LaneView {
    pub label: String, // "1 vol 45"
    pub cells: Vec<Cell>, // visible cells only, left to right
}

#[derive(Clone, Debug, Default)]
pub struct DisplayState {
    pub lanes: Vec<LaneView>,
    pub first_block: u32, // block index of the leftmost visible cell
    pub playhead_block: u32,
    pub cursor_track: usize,
    pub cursor_block: u32,
    pub playing: bool,
    pub lowpass: bool,
    pub exporting: bool,
    pub selected_sample: String,
    pub collections: Vec<(String, bool)>, // (name, selected)
    pub status: String,
    pub trax: String,
}
