pub mod audio;
pub mod audio_api;
pub mod config;
pub mod loader;
pub mod middle;
pub mod pipeline;
pub mod shared;
pub mod tui;
