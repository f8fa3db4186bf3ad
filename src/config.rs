use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pipeline::grid::GridConfig;

// Optional host controls, off unless asked for: `--config download;lowpass;volume`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub download: bool,
    pub lowpass: bool,
    pub volume: bool,
}

impl Features {
    pub fn parse(opts: &str) -> Self {
        let mut features = Self::default();
        for opt in opts.split(';').map(str::trim) {
            match opt {
                "download" => features.download = true,
                "lowpass" => features.lowpass = true,
                "volume" => features.volume = true,
                "" => {}
                other => log::warn!("unknown config option {other:?}"),
            }
        }
        features
    }

    pub fn merge(self, other: Features) -> Self {
        Self {
            download: self.download || other.download,
            lowpass: self.lowpass || other.lowpass,
            volume: self.volume || other.volume,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub grid: GridConfig,
    pub samples_dir: PathBuf, // relative to the project dir
    pub catalog_file: PathBuf,
    pub export_file: PathBuf,
    pub features: Features,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            samples_dir: PathBuf::from("samples"),
            catalog_file: PathBuf::from("catalog.json"),
            export_file: PathBuf::from("trax_song.wav"),
            features: Features::default(),
        }
    }
}

impl AppConfig {
    pub fn samples_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.samples_dir)
    }

    pub fn catalog_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.catalog_file)
    }

    pub fn export_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.export_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_option_string() {
        let f = Features::parse("download;volume");
        assert!(f.download && f.volume && !f.lowpass);
        assert_eq!(Features::parse(""), Features::default());
        assert!(Features::parse("lowpass;;bogus").lowpass);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"features": {"lowpass": true}}"#).unwrap();
        assert!(config.features.lowpass);
        assert!(!config.features.download);
        assert_eq!(config.grid, GridConfig::default());
        assert_eq!(config.export_file, PathBuf::from("trax_song.wav"));
    }

    #[test]
    fn merge_is_an_or() {
        let a = Features::parse("download");
        let b = Features::parse("volume");
        let m = a.merge(b);
        assert!(m.download && m.volume && !m.lowpass);
    }
}
