//! Per-track transport engine (data plane) and its control-side handle.
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::automation::{PositionAutomation, PositionBlock};
use crate::commands::EngineCommand;
use crate::tape::TapeBuffer;

/// Whether a block reads or writes the tape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    #[default]
    Playing,
    Recording,
}

/// Settings needed to build one engine
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub sample_rate: f64,
    pub max_duration_seconds: f64,
    pub block_size: usize,
    pub latency_frames: u32,
    pub queue_capacity: usize,
}

/// Build a connected handle/engine pair for track `id`
pub fn transport_pair(id: usize, settings: EngineSettings) -> (TrackHandle, TransportEngine) {
    let rb = HeapRb::<EngineCommand>::new(settings.queue_capacity.max(1));
    let (prod, cons) = rb.split();
    let shared_position = Arc::new(AtomicU64::new(0.0f64.to_bits()));
    let record_flag = Arc::new(AtomicBool::new(false));

    let handle = TrackHandle {
        id,
        commands: prod,
        backlog: VecDeque::new(),
        position: shared_position.clone(),
        record_flag: record_flag.clone(),
        armed: false,
    };
    let engine = TransportEngine {
        id,
        tape: TapeBuffer::new(settings.sample_rate, settings.max_duration_seconds),
        position: PositionAutomation::new(0.0, settings.block_size),
        mode: TransportMode::Playing,
        latency_frames: settings.latency_frames,
        commands: cons,
        shared_position,
        record_flag,
        sample_rate: settings.sample_rate,
    };
    (handle, engine)
}

/// Real-time block processor for one track. Owns the track's tape.
pub struct TransportEngine {
    id: usize,
    tape: TapeBuffer,
    position: PositionAutomation,
    mode: TransportMode,
    latency_frames: u32,
    commands: HeapCons<EngineCommand>,
    shared_position: Arc<AtomicU64>,
    record_flag: Arc<AtomicBool>,
    sample_rate: f64,
}

impl TransportEngine {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn latency_frames(&self) -> u32 {
        self.latency_frames
    }

    pub fn position(&self) -> f64 {
        self.position.value()
    }

    pub fn is_ramping(&self) -> bool {
        self.position.is_ramping()
    }

    pub fn tape(&self) -> &TapeBuffer {
        &self.tape
    }

    fn seconds_to_frames(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate).round() as u64
    }

    fn apply(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::SetLatency(frames) => self.latency_frames = frames,
            EngineCommand::SetPosition(t) => self.position.set_value(t),
            EngineCommand::RampPosition { target, duration_seconds } => {
                let frames = self.seconds_to_frames(duration_seconds);
                self.position.ramp_to(target, frames);
            }
            EngineCommand::Forward { from, horizon_seconds } => {
                let frames = self.seconds_to_frames(horizon_seconds);
                self.position.cancel_and_hold(from);
                self.position.ramp_to(from + horizon_seconds, frames);
            }
            EngineCommand::Hold(t) => self.position.cancel_and_hold(t),
        }
    }

    /// Process one block.
    ///
    /// `input` is the mono acquisition signal, `output` is interleaved with
    /// `channels` channels and `input.len()` frames. Queued commands are applied
    /// before any sample is touched.
    pub fn process(&mut self, input: &[f32], output: &mut [f32], channels: usize) {
        while let Some(cmd) = self.commands.try_pop() {
            self.apply(cmd);
        }
        self.mode = if self.record_flag.load(Ordering::Acquire) {
            TransportMode::Recording
        } else {
            TransportMode::Playing
        };

        let channels = channels.max(1);
        let frames = input.len().min(output.len() / channels);
        let block = self.position.render(frames);

        match self.mode {
            TransportMode::Playing => {
                for (i, frame) in output.chunks_exact_mut(channels).take(frames).enumerate() {
                    let sample = self.tape.read(block.at(i));
                    frame.fill(sample);
                }
            }
            TransportMode::Recording => {
                output.fill(0.0);
                let latency = self.latency_frames as i64;
                match block {
                    PositionBlock::Constant(t) => {
                        // Every frame lands on the same address, the last one wins
                        if let Some(&last) = input[..frames].last() {
                            self.tape.write_frame(self.tape.frame_at(t) - latency, last);
                        }
                    }
                    PositionBlock::Curve(_) => {
                        for (i, &sample) in input[..frames].iter().enumerate() {
                            let frame = self.tape.frame_at(block.at(i)) - latency;
                            self.tape.write_frame(frame, sample);
                        }
                    }
                }
            }
        }

        self.shared_position
            .store(self.position.value().to_bits(), Ordering::Relaxed);
    }
}

/// Control-plane side of one track: command queue producer, the shared
/// position the engine publishes after every block and the record flag it
/// reads before every block.
pub struct TrackHandle {
    id: usize,
    commands: HeapProd<EngineCommand>,
    /// Commands that did not fit in the queue, oldest first
    backlog: VecDeque<EngineCommand>,
    position: Arc<AtomicU64>,
    record_flag: Arc<AtomicBool>,
    armed: bool,
}

impl TrackHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Position after the engine's last processed block
    pub fn position(&self) -> f64 {
        f64::from_bits(self.position.load(Ordering::Relaxed))
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Queue a command. If the queue is full the command is held back on this
    /// side and pushed, in order, by a later `send` or `flush`. Returns false
    /// when it could not be queued right away.
    pub fn send(&mut self, cmd: EngineCommand) -> bool {
        if self.flush() == 0 && self.commands.try_push(cmd).is_ok() {
            return true;
        }
        if self.backlog.is_empty() {
            log::warn!("[Track {}] command queue full, holding {:?}", self.id, cmd);
        }
        self.backlog.push_back(cmd);
        false
    }

    /// Move held-back commands into the queue. Returns how many are still waiting.
    pub fn flush(&mut self) -> usize {
        while let Some(&cmd) = self.backlog.front() {
            if self.commands.try_push(cmd).is_err() {
                break;
            }
            self.backlog.pop_front();
        }
        self.backlog.len()
    }

    pub fn pending(&self) -> usize {
        self.backlog.len()
    }

    /// Switch to record mode from the next block on. No-op if already armed.
    pub fn arm(&mut self) -> bool {
        if self.armed {
            return false;
        }
        self.armed = true;
        self.record_flag.store(true, Ordering::Release);
        true
    }

    /// Switch back to play mode from the next block on. No-op if not armed.
    pub fn disarm(&mut self) -> bool {
        if !self.armed {
            return false;
        }
        self.armed = false;
        self.record_flag.store(false, Ordering::Release);
        true
    }

    /// Motor run-up: jump to `tape_time` and advance at real-time speed
    pub fn forward(&mut self, tape_time: f64, horizon_seconds: f64) {
        self.send(EngineCommand::Forward {
            from: tape_time,
            horizon_seconds,
        });
    }

    /// Motor stop: disarm and freeze at `tape_time`
    pub fn stop(&mut self, tape_time: f64) {
        self.disarm();
        self.send(EngineCommand::Hold(tape_time));
    }

    pub fn ramp_to(&mut self, tape_time: f64, duration_seconds: f64) {
        self.send(EngineCommand::RampPosition {
            target: tape_time,
            duration_seconds,
        });
    }
}
