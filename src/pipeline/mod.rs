pub mod collision;
pub mod grid;
pub mod persistence;
pub mod playback;
pub mod render;
pub mod schedule;
pub mod session;
pub mod song;
pub mod trax;

#[cfg(test)]
pub mod test_fixture;

pub use playback::{PlayState, TickOutcome};
pub use session::Session;
