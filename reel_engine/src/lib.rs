pub mod tape;
pub mod automation;
pub mod commands;
pub mod transport;
pub mod scrub;
pub mod router;
pub mod nodes;
pub mod mixer;
pub mod input;
pub mod deck;
pub mod synchronizer;
pub mod control;
pub mod engine; // AudioEngine lives here

// Re-exports
pub use commands::EngineCommand;
pub use deck::DeckProcessor;
pub use engine::AudioEngine;
pub use synchronizer::TrackManager;

#[cfg(test)]
mod tests_transport;
