// to be called on main startup and quit; keeps the song (as a trax string)
// and the app config on disk so we can reload them later
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

const TRAX_DIR: &str = ".trax";
const SONG_FILE: &str = "song.json";
const CONFIG_FILE: &str = "config.json";

// What a hosting surface sends us, and what we send back. The payload is
// always a trax string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostMessage {
    LoadTraxString { string: String },
    SaveSong { string: String },
}

impl HostMessage {
    pub fn from_json(data: &str) -> anyhow::Result<Self> {
        serde_json::from_str(data).context("malformed host message")
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// <project_dir>/.trax/<name>
fn trax_file_path(project_dir: &Path, name: &str) -> PathBuf {
    project_dir.join(TRAX_DIR).join(name)
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?; // create .trax/ if needed
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

// The saved trax string, if there is one; it comes back as the message
// that would load it.
pub fn load_song(project_dir: &Path) -> Option<HostMessage> {
    let data = std::fs::read_to_string(trax_file_path(project_dir, SONG_FILE)).ok()?;
    match HostMessage::from_json(&data).ok()? {
        HostMessage::SaveSong { string } | HostMessage::LoadTraxString { string } => {
            Some(HostMessage::LoadTraxString { string })
        }
    }
}

pub fn save_song(project_dir: &Path, trax: &str) -> anyhow::Result<()> {
    let msg = HostMessage::SaveSong { string: trax.to_string() };
    write_file(&trax_file_path(project_dir, SONG_FILE), &msg.to_json()?)
}

pub fn load_config(project_dir: &Path) -> Option<AppConfig> {
    let data = std::fs::read_to_string(trax_file_path(project_dir, CONFIG_FILE)).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("ignoring malformed config: {e}");
            None
        }
    }
}

pub fn save_config(project_dir: &Path, config: &AppConfig) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    write_file(&trax_file_path(project_dir, CONFIG_FILE), &json)
}
