//! Transport synchronizer: one shared transport driving every track engine.
//!
//! Owns the control-side handle of each track, the scrub controller and the
//! output router. All cross-track invariants live here:
//! - at most one track is armed at any time
//! - play, stop and seek are fanned out to every track
//! - slot order is an explicit, always contiguous list of track ids
use std::time::Instant;

use crossbeam_channel::Sender;
use reel_shared::config::latency_frames;
use reel_shared::{DeckCommand, DeckConfig, DeckEvent, TransportConfig, TransportState};

use crate::commands::EngineCommand;
use crate::router::OutputRouter;
use crate::scrub::ScrubController;
use crate::transport::TrackHandle;

pub struct TrackManager {
    /// Handles by track id
    tracks: Vec<TrackHandle>,
    /// Slot -> track id
    order: Vec<usize>,
    armed: Option<usize>,
    state: TransportState,
    scrub: ScrubController,
    router: OutputRouter,
    transport: TransportConfig,
    sample_rate: u32,
    latency_seconds: f64,
    events: Sender<DeckEvent>,
}

impl TrackManager {
    pub fn new(
        config: &DeckConfig,
        tracks: Vec<TrackHandle>,
        router: OutputRouter,
        events: Sender<DeckEvent>,
    ) -> Self {
        let order = (0..tracks.len()).collect();
        Self {
            tracks,
            order,
            armed: None,
            state: TransportState::Stopped,
            scrub: ScrubController::new(&config.scrub),
            router,
            transport: config.transport.clone(),
            sample_rate: config.sample_rate,
            latency_seconds: config.latency_seconds,
            events,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn motor_engaged(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn armed(&self) -> Option<usize> {
        self.armed
    }

    /// Track ids in slot order
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn router(&self) -> &OutputRouter {
        &self.router
    }

    pub fn scrub(&self) -> &ScrubController {
        &self.scrub
    }

    pub fn latency_seconds(&self) -> f64 {
        self.latency_seconds
    }

    pub fn track_position(&self, track: usize) -> Option<f64> {
        self.tracks.get(track).map(|t| t.position())
    }

    /// Shared tape time, read from the track in slot 0
    pub fn tape_time(&self) -> f64 {
        self.order
            .first()
            .and_then(|&id| self.tracks.get(id))
            .map(|t| t.position())
            .unwrap_or(0.0)
    }

    fn emit(&self, event: DeckEvent) {
        let _ = self.events.send(event);
    }

    fn set_state(&mut self, state: TransportState) {
        if self.state != state {
            self.state = state;
            self.emit(DeckEvent::TransportChanged(state));
        }
    }

    pub fn handle(&mut self, cmd: DeckCommand, now: Instant) {
        match cmd {
            DeckCommand::Play => self.toggle_play(),
            DeckCommand::Stop => self.stop(),
            DeckCommand::Arm(track) => self.arm(track),
            DeckCommand::ScrubBegin { angle, radius } => self.scrub_begin(angle, radius, now),
            DeckCommand::ScrubMove { angle } => self.scrub_move(angle, now),
            DeckCommand::ScrubEnd => self.scrub_end(),
            DeckCommand::Seek(t) => self.seek(t),
            DeckCommand::Reorder { source, target } => self.reorder(source, target),
            DeckCommand::SetLatency(seconds) => self.set_latency(seconds),
        }
    }

    /// Play button: engages the motor, or stops it when already running
    pub fn toggle_play(&mut self) {
        if self.motor_engaged() {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Engage the motor: every track restarts from the shared tape time and
    /// advances at real-time speed.
    pub fn start(&mut self) {
        if self.motor_engaged() {
            return;
        }
        let tape_time = self.tape_time();
        let horizon = self.transport.forward_horizon_seconds;
        for track in self.tracks.iter_mut() {
            track.forward(tape_time, horizon);
        }
        log::info!("[Deck] Motor engaged at {:.3}s", tape_time);
        self.set_state(TransportState::Playing);
    }

    /// Disengage the motor, freeze every track at the shared tape time and
    /// disarm whatever was armed.
    pub fn stop(&mut self) {
        let tape_time = self.tape_time();
        for track in self.tracks.iter_mut() {
            track.stop(tape_time);
        }
        if let Some(armed) = self.armed.take() {
            self.emit(DeckEvent::Disarmed(armed));
        }
        if self.state == TransportState::Playing {
            log::info!("[Deck] Motor stopped at {:.3}s", tape_time);
        }
        self.set_state(TransportState::Stopped);
    }

    /// Arm click. Arming one track disarms every other one.
    pub fn arm(&mut self, track: usize) {
        if track >= self.tracks.len() {
            log::warn!("[Deck] Arm ignored, no track {}", track);
            return;
        }
        if self.armed == Some(track) {
            self.tracks[track].disarm();
            self.armed = None;
            self.emit(DeckEvent::Disarmed(track));
            return;
        }
        for (id, other) in self.tracks.iter_mut().enumerate() {
            if id != track && other.disarm() {
                let _ = self.events.send(DeckEvent::Disarmed(id));
            }
        }
        self.tracks[track].arm();
        self.armed = Some(track);
        self.emit(DeckEvent::Armed(track));
    }

    pub fn scrub_begin(&mut self, angle: f64, radius: f64, now: Instant) {
        if !self.scrub.begin(angle, radius, now) {
            log::debug!("[Deck] Scrub press outside reel (r = {:.1})", radius);
        }
    }

    pub fn scrub_move(&mut self, angle: f64, now: Instant) {
        if let Some(tape_time) = self.scrub.drag(angle, now) {
            self.emit(DeckEvent::PositionChanged(tape_time));
            self.move_tape(tape_time);
            self.set_state(TransportState::Seeking);
        }
    }

    pub fn scrub_end(&mut self) {
        self.scrub.end();
        if self.state == TransportState::Seeking {
            self.set_state(TransportState::Stopped);
        }
    }

    /// Programmatic seek, same rules as a scrub event
    pub fn seek(&mut self, tape_time: f64) {
        self.move_tape(tape_time.max(0.0));
    }

    /// The motor yields to manual control, then every track ramps to
    /// `tape_time` unless it is already within the dead zone.
    fn move_tape(&mut self, tape_time: f64) {
        let current = self.tape_time();
        if self.motor_engaged() {
            self.stop();
        }
        if (current - tape_time).abs() <= self.transport.dead_zone_seconds {
            return;
        }
        let duration = self.transport.seek_ramp_seconds;
        for track in self.tracks.iter_mut() {
            track.ramp_to(tape_time, duration);
        }
    }

    /// Swap the tracks in slots `source` and `target`, then re-route outputs
    pub fn reorder(&mut self, source: usize, target: usize) {
        let len = self.order.len();
        if source >= len || target >= len {
            log::warn!("[Deck] Reorder {} -> {} out of range ({} slots)", source, target, len);
            return;
        }
        if source == target {
            return;
        }
        self.order.swap(source, target);
        let changes = self.router.reconnect(&self.order);
        log::info!(
            "[Deck] Slots {} and {} swapped, order {:?}, {} routing changes",
            source,
            target,
            self.order,
            changes.len()
        );
        self.emit(DeckEvent::Reordered(self.order.clone()));
    }

    /// Latency slider: broadcast the compensation to every engine
    pub fn set_latency(&mut self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        self.latency_seconds = seconds;
        let frames = latency_frames(seconds, self.sample_rate);
        for track in self.tracks.iter_mut() {
            track.send(EngineCommand::SetLatency(frames));
        }
        log::info!("[Deck] Latency {:.0}ms ({} frames)", seconds * 1000.0, frames);
    }

    /// Render-loop poll: current tape time for the reel visual. Keeps the
    /// reel angle in step with the transport while nobody holds it. Also pushes
    /// commands a full queue held back and frees routing tables the audio
    /// thread is done with.
    pub fn poll_position(&mut self) -> f64 {
        for track in self.tracks.iter_mut() {
            track.flush();
        }
        self.router.collect_retired();
        let tape_time = self.tape_time();
        self.scrub.sync(tape_time);
        tape_time
    }
}
