// src/config.rs
use crate::dispatch::EventCues;
use crate::error::ConfigError;
use crate::tracking::GestureConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub gestures: GestureConfig,
    pub cues: EventCues,
    pub source: SourceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub queue_capacity: usize,
    /// How long shutdown waits for queued commands to go out.
    pub drain_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_ms: 500,
            queue_capacity: 64,
            drain_timeout_ms: 2000,
        }
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Pacing for simulated and replayed frames.
    pub fps: f32,
    /// Seconds between performance reports in the log.
    pub report_interval_s: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            report_interval_s: 10,
        }
    }
}

/// Accepted frame rate range, inclusive.
pub const MIN_FPS: f32 = 0.1;
pub const MAX_FPS: f32 = 1000.0;

impl SourceConfig {
    pub fn frame_interval(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f32(1.0 / self.fps).map_err(|_| {
            ConfigError::Invalid(format!("fps {} has no usable frame interval", self.fps))
        })
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// `config.json` in the platform config directory, if one can be determined.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "eigen", "eigen_gesture")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Loads the explicit path, else the default location, else built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let zone = &self.gestures.zone;
        let ordered = 0.0 <= zone.zone1_min
            && zone.zone1_min <= zone.zone0_min
            && zone.zone0_min <= 180.0;
        if !ordered {
            return Err(ConfigError::Invalid(format!(
                "zone thresholds must satisfy 0 <= zone1_min <= zone0_min <= 180, got {} / {}",
                zone.zone1_min, zone.zone0_min
            )));
        }

        let jump = &self.gestures.jump;
        if !jump.rise.is_finite() || !jump.fall.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "jump thresholds must be finite, got rise {} / fall {}",
                jump.rise, jump.fall
            )));
        }
        if jump.fall > jump.rise {
            return Err(ConfigError::Invalid(format!(
                "jump fall threshold {} is above rise threshold {}",
                jump.fall, jump.rise
            )));
        }

        let fps = self.source.fps;
        if !(MIN_FPS..=MAX_FPS).contains(&fps) {
            return Err(ConfigError::Invalid(format!(
                "fps must be between {} and {}, got {}",
                MIN_FPS, MAX_FPS, fps
            )));
        }
        self.source.frame_interval()?;

        if self.gestures.max_bodies == 0 {
            return Err(ConfigError::Invalid("max_bodies must be at least 1".to_string()));
        }

        if self.service.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be at least 1".to_string()));
        }

        Ok(())
    }
}
