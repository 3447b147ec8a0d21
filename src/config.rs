use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::Level;

use crate::error::Result;

pub const DEFAULT_CONFIG_FILE: &str = "midi-keys.toml";

/*
    Example midi-keys.toml, every key optional:

    device_index = 0
    device_name = "MiniLab"
    mapping_file = "mappings.txt"
    frames_per_second = 120
    reconnect_cooldown_frames = 30
    keyboard_devices = ["/dev/input/event3"]
    log_file = "midi-keys.log"
    log_level = "debug"
*/
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// MIDI input to open when `device_name` is unset or not found.
    pub device_index: usize,
    /// Case-insensitive substring of the MIDI input name to prefer.
    pub device_name: Option<String>,
    pub mapping_file: PathBuf,
    pub frames_per_second: u32,
    pub reconnect_cooldown_frames: u32,
    /// Physical keyboards to watch for key capture; empty means autodetect.
    pub keyboard_devices: Vec<PathBuf>,
    pub log_file: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device_index: 0,
            device_name: None,
            mapping_file: PathBuf::from("mappings.txt"),
            frames_per_second: 120,
            reconnect_cooldown_frames: 30,
            keyboard_devices: Vec::new(),
            log_file: PathBuf::from("midi-keys.log"),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Read `path`, or the default config file if it exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Config::default());
                }
                default
            }
        };

        let contents = fs::read_to_string(path)?;
        Config::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Config> {
        Ok(toml::from_str(contents)?)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frames_per_second.max(1)
    }

    pub fn level(&self) -> Level {
        Level::from_str(&self.log_level).unwrap_or(Level::INFO)
    }
}
