use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::{DEFAULT_BLOCK_SIZE, DEFAULT_SAMPLE_RATE, DEFAULT_TRACK_COUNT, MAX_TAPE_SECONDS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One shared output effect chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EffectKind {
    Nop,
    LowPass { cutoff_hz: f32 },
    HighPass { cutoff_hz: f32 },
    /// -1.0 = hard left, 1.0 = hard right
    Pan { pan: f32 },
}

/// How the scrub controller turns raw reel angles into emitted tape times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScrubPolicy {
    /// Emit the raw tape time, at most once per `min_emit_interval_ms`
    #[default]
    RateLimited,
    /// Emit on every move, exponentially smoothed toward the raw tape time
    Smoothed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// How far the motor ramp runs ahead (tape seconds == real seconds)
    pub forward_horizon_seconds: f64,
    /// Ramp duration used when a scrub or seek moves the tape
    pub seek_ramp_seconds: f64,
    /// Position changes smaller than this do not re-ramp the tracks
    pub dead_zone_seconds: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            forward_horizon_seconds: 120.0,
            seek_ramp_seconds: 0.1,
            dead_zone_seconds: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrubConfig {
    /// Presses farther than this from the reel center are ignored
    pub surface_radius: f64,
    /// 7" reel at 7.5 ips is roughly 3 seconds per turn
    pub seconds_per_rotation: f64,
    pub min_emit_interval_ms: u64,
    pub smoothing_half_life_ms: u64,
    pub policy: ScrubPolicy,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            surface_radius: 200.0,
            seconds_per_rotation: 3.0,
            min_emit_interval_ms: 50,
            smoothing_half_life_ms: 500,
            policy: ScrubPolicy::RateLimited,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    pub track_count: usize,
    pub sample_rate: u32,
    /// Frames per real-time block
    pub block_size: usize,
    pub max_duration_seconds: f64,
    /// Acquisition-path delay compensated while recording
    pub latency_seconds: f64,
    /// Capacity of each engine's control message queue
    pub command_queue_capacity: usize,
    /// Size of the input ring between capture and playback callbacks
    pub input_buffer_seconds: f64,
    pub transport: TransportConfig,
    pub scrub: ScrubConfig,
    pub effects: Vec<EffectKind>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            track_count: DEFAULT_TRACK_COUNT,
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            max_duration_seconds: MAX_TAPE_SECONDS,
            // 0.11 seems to be about right on most interfaces
            latency_seconds: 0.11,
            command_queue_capacity: 256,
            input_buffer_seconds: 1.0,
            transport: TransportConfig::default(),
            scrub: ScrubConfig::default(),
            effects: default_effects(),
        }
    }
}

/// Low-passes on the left, pans in the middle, high-passes on the right
pub fn default_effects() -> Vec<EffectKind> {
    vec![
        EffectKind::LowPass { cutoff_hz: 60.0 },
        EffectKind::LowPass { cutoff_hz: 120.0 },
        EffectKind::Pan { pan: -0.7 },
        EffectKind::Nop,
        EffectKind::Pan { pan: 0.7 },
        EffectKind::HighPass { cutoff_hz: 480.0 },
        EffectKind::HighPass { cutoff_hz: 960.0 },
    ]
}

impl DeckConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: DeckConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.track_count == 0 {
            return Err(ConfigError::Invalid("track_count must be at least 1".into()));
        }
        if self.block_size == 0 {
            return Err(ConfigError::Invalid("block_size must be at least 1".into()));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be positive".into()));
        }
        if !(self.max_duration_seconds > 0.0) {
            return Err(ConfigError::Invalid("max_duration_seconds must be positive".into()));
        }
        if !self.latency_seconds.is_finite() || self.latency_seconds < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "latency_seconds must be a non-negative number, got {}",
                self.latency_seconds
            )));
        }
        if self.command_queue_capacity == 0 {
            return Err(ConfigError::Invalid("command_queue_capacity must be at least 1".into()));
        }
        if self.effects.is_empty() {
            return Err(ConfigError::Invalid("at least one effect chain is required".into()));
        }
        Ok(())
    }

    /// Number of samples a single track's tape holds
    pub fn tape_frames(&self) -> usize {
        (self.sample_rate as f64 * self.max_duration_seconds) as usize
    }

    pub fn latency_frames(&self) -> u32 {
        latency_frames(self.latency_seconds, self.sample_rate)
    }
}

/// Convert a latency in seconds to a whole frame count at `sample_rate`
pub fn latency_frames(latency_seconds: f64, sample_rate: u32) -> u32 {
    if !latency_seconds.is_finite() || latency_seconds <= 0.0 {
        return 0;
    }
    (latency_seconds * sample_rate as f64).round() as u32
}
