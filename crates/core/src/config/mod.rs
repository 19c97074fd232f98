use std::{path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::Result;

mod live;
mod shared;

pub use live::{
    Channel, ColorOverride, ColorTarget, ConfigUpdate, Configuration, EmotionColors, Experiment,
    Experiments, Rgb, AUDIO_SENSITIVITY_RANGE, CAMERA_OPACITY_RANGE, DOT_SIZE_RANGE,
    HEXAGON_RADIUS_RANGE, LINE_THICKNESS_RANGE,
};
pub use shared::SharedConfig;

/// Process-level settings. Unlike [`Configuration`] these are read once at
/// startup and never change while running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage_root: PathBuf,
    pub autosave_quiet_ms: u64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub target_fps: u32,
    pub audio: AudioConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("overlay-data"),
            autosave_quiet_ms: 1_000,
            frame_width: 1280,
            frame_height: 720,
            target_fps: 60,
            audio: AudioConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn autosave_quiet(&self) -> Duration {
        Duration::from_millis(self.autosave_quiet_ms)
    }

    /// Upper bound on a single display refresh wait.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.target_fps.max(1)))
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    /// RMS amplitude that maps to a level of 1.0.
    pub reference_scale: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 1024,
            reference_scale: 0.3,
        }
    }
}
