use std::path::PathBuf;

use serde::Deserialize;

use crate::error::StartupError;

pub const DEFAULT_CONFIG_TOML: &str = include_str!("default-config.toml");

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    /// Directory holding `voices.txt` and drum kit tables.
    pub midi_data_dir: PathBuf,
    /// Tempo used when a score never issues a `bpm` directive.
    pub default_bpm: f64,
    /// Default note duration, in beats, when a token omits one.
    pub default_duration: f64,
    /// Percentage (0-100) of velocity randomization applied when `r` is set.
    pub default_randomness_percent: u8,
    /// Tick granularity for hairpin (crescendo/decrescendo) interpolation,
    /// in microseconds. Mirrors `EXPR_STEP`.
    pub expression_tick_us: i64,
    /// Duration of a full pitch-wheel slide, in microseconds. Mirrors
    /// `PITCH_WHEEL_DUR`.
    pub pitch_wheel_slide_us: i64,
    /// Attempt to request SCHED_FIFO real-time scheduling on Linux.
    pub realtime_priority: bool,
    /// MIDI output port name substring to connect to; `None` picks the
    /// first available port.
    #[serde(default)]
    pub output_port: Option<String>,
    /// MIDI input port name substring for auto-accompaniment; `None` scans
    /// for a port whose name contains "keyboard".
    #[serde(default)]
    pub input_port: Option<String>,
}

impl Config {
    pub fn load(config_path: Option<&PathBuf>) -> Result<Config, StartupError> {
        let toml_str = match config_path {
            None => DEFAULT_CONFIG_TOML.into(),
            Some(path) => std::fs::read_to_string(path).map_err(|source| StartupError::Io {
                context: format!("cannot load config file {:?}", path),
                source,
            })?,
        };
        toml::from_str(&toml_str).map_err(|source| StartupError::Config {
            context: "cannot parse config toml".to_string(),
            source,
        })
    }
}
