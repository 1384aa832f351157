//! Deck construction and the real-time block processor.
use std::sync::Arc;

use arc_swap::ArcSwap;
use crossbeam_channel::Sender;
use reel_shared::{CHANNEL_COUNT, DeckConfig, DeckEvent};

use crate::input::InputCapture;
use crate::mixer::AudioBuffers;
use crate::nodes::{AudioNode, build_effect};
use crate::router::{OutputRouter, RoutingTable};
use crate::synchronizer::TrackManager;
use crate::transport::{EngineSettings, TransportEngine, transport_pair};

/// Build the control plane and the data plane of a deck.
///
/// Every track gets a tape and an engine; the engines go to the returned
/// processor (audio thread), their handles to the track manager.
pub fn build(config: &DeckConfig, events: Sender<DeckEvent>) -> (TrackManager, DeckProcessor) {
    let settings = EngineSettings {
        sample_rate: config.sample_rate as f64,
        max_duration_seconds: config.max_duration_seconds,
        block_size: config.block_size,
        latency_frames: config.latency_frames(),
        queue_capacity: config.command_queue_capacity,
    };

    let (handles, engines): (Vec<_>, Vec<_>) = (0..config.track_count)
        .map(|id| transport_pair(id, settings))
        .unzip();

    let mut router = OutputRouter::new(config.track_count, config.effects.len());
    let order: Vec<usize> = (0..config.track_count).collect();
    router.reconnect(&order);

    let effects = config
        .effects
        .iter()
        .map(|&kind| build_effect(kind, config.sample_rate as f32))
        .collect();

    let processor = DeckProcessor::new(engines, effects, router.table_handle(), config.block_size);
    let manager = TrackManager::new(config, handles, router, events);

    log::info!(
        "[Deck] {} tracks, {} effect chains, {:.0}s tape at {} Hz, block {}",
        config.track_count,
        config.effects.len(),
        config.max_duration_seconds,
        config.sample_rate,
        config.block_size
    );
    (manager, processor)
}

/// Data plane: runs every transport engine block by block, routes their
/// outputs through the effect chains and mixes the master.
pub struct DeckProcessor {
    engines: Vec<TransportEngine>,
    effects: Vec<Box<dyn AudioNode>>,
    routing: Arc<ArcSwap<RoutingTable>>,
    buffers: AudioBuffers,
    block_size: usize,
    input: Option<InputCapture>,
    /// Track feeding each effect during the previous block
    effect_sources: Vec<Option<usize>>,
    /// Frames of the last rendered block already handed to the device
    cursor: usize,
}

impl DeckProcessor {
    pub fn new(
        engines: Vec<TransportEngine>,
        effects: Vec<Box<dyn AudioNode>>,
        routing: Arc<ArcSwap<RoutingTable>>,
        block_size: usize,
    ) -> Self {
        let block_size = block_size.max(1);
        let buffers = AudioBuffers::new(engines.len(), effects.len(), block_size);
        let effect_sources = vec![None; effects.len()];
        Self {
            engines,
            effects,
            routing,
            buffers,
            block_size,
            input: None,
            effect_sources,
            cursor: block_size,
        }
    }

    pub fn attach_input(&mut self, input: InputCapture) {
        self.input = Some(input);
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn engines(&self) -> &[TransportEngine] {
        &self.engines
    }

    pub fn engine(&self, track: usize) -> Option<&TransportEngine> {
        self.engines.get(track)
    }

    /// Process exactly one block. `input` is the mono acquisition signal
    /// (shorter input is zero-padded). Returns the interleaved stereo master.
    pub fn process_block(&mut self, input: &[f32]) -> &[f32] {
        let n = input.len().min(self.block_size);
        self.buffers.input[..n].copy_from_slice(&input[..n]);
        self.buffers.input[n..].fill(0.0);
        self.run_block();
        &self.buffers.master_mix
    }

    /// Device callback entry point. Renders as many fixed-size blocks as
    /// needed, pulling input from the attached capture, and carries any
    /// remainder over to the next call.
    pub fn render(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let total = data.len() / channels;
        let mut written = 0;
        while written < total {
            if self.cursor >= self.block_size {
                match self.input.as_mut() {
                    Some(capture) => {
                        capture.fill(&mut self.buffers.input);
                    }
                    None => self.buffers.input.fill(0.0),
                }
                self.run_block();
                self.cursor = 0;
            }
            let n = (self.block_size - self.cursor).min(total - written);
            let out = &mut data[written * channels..(written + n) * channels];
            AudioBuffers::write_interleaved(&self.buffers.master_mix, self.cursor, out, channels);
            self.cursor += n;
            written += n;
        }
    }

    fn run_block(&mut self) {
        // One routing snapshot per block
        let table = self.routing.load();

        // An effect that changed source starts from silence, not from the
        // previous track's filter memory
        for (idx, (effect, last)) in self.effects.iter_mut().zip(self.effect_sources.iter_mut()).enumerate() {
            let source = table.source_of(idx);
            if source != *last {
                effect.reset();
                *last = source;
            }
        }

        for (engine, out) in self.engines.iter_mut().zip(self.buffers.track_bufs.iter_mut()) {
            engine.process(&self.buffers.input, out, CHANNEL_COUNT);
        }

        AudioBuffers::route_to_effects(&self.buffers.track_bufs, &mut self.buffers.effect_bufs, &table);
        for (effect, buf) in self.effects.iter_mut().zip(self.buffers.effect_bufs.iter_mut()) {
            effect.process(buf);
        }
        AudioBuffers::mix_to_master(&self.buffers.effect_bufs, &mut self.buffers.master_mix);
    }
}
