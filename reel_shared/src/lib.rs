use serde::{Deserialize, Serialize};

pub mod config;

pub use config::{ConfigError, DeckConfig, EffectKind, ScrubConfig, ScrubPolicy, TransportConfig};

/// Commands sent from the UI layer (buttons, reel pointer, track strip) to the deck
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum DeckCommand {
    /// Transport play button. Toggles the motor.
    Play,
    /// External stop, always lands in `Stopped`
    Stop,
    /// Record-arm click on a track (track id, not slot)
    Arm(usize),
    /// Pointer pressed on the reel surface
    ScrubBegin { angle: f64, radius: f64 },
    /// Pointer moved while pressed
    ScrubMove { angle: f64 },
    /// Pointer released
    ScrubEnd,
    /// Jump the tape to an absolute time in seconds
    Seek(f64),
    /// Drag-and-drop of slot `source` onto slot `target`
    Reorder { source: usize, target: usize },
    /// Runtime latency slider, in seconds
    SetLatency(f64),
}

/// Transport state as seen by the synchronizer
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    /// Motor engaged, tape advancing at constant speed
    Playing,
    /// Scrub-driven, motor disengaged
    Seeking,
}

/// Events emitted by the deck for the UI layer
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum DeckEvent {
    /// The scrub controller produced a new tape time (seconds)
    PositionChanged(f64),
    /// Render-loop poll of the slot-0 track position (seconds)
    TapePosition(f64),
    Armed(usize),
    Disarmed(usize),
    TransportChanged(TransportState),
    /// New slot order, as track ids
    Reordered(Vec<usize>),
}

// Deck-wide defaults
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_BLOCK_SIZE: usize = 128;
pub const DEFAULT_TRACK_COUNT: usize = 4;
/// Tape capacity in seconds (5 minutes)
pub const MAX_TAPE_SECONDS: f64 = 300.0;
/// Stereo master
pub const CHANNEL_COUNT: usize = 2;
