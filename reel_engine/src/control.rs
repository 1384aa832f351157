//! Control thread: applies deck commands and polls the tape position once
//! per display frame.
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use reel_shared::{DeckCommand, DeckEvent};

use crate::synchronizer::TrackManager;

/// Run `manager` on its own thread until every command sender is dropped.
/// Hands the manager back on exit.
pub fn spawn(
    mut manager: TrackManager,
    commands: Receiver<DeckCommand>,
    events: Sender<DeckEvent>,
    frame_interval: Duration,
) -> JoinHandle<TrackManager> {
    thread::spawn(move || {
        let mut next_frame = Instant::now() + frame_interval;
        let mut last_position = f64::NAN;
        loop {
            match commands.recv_deadline(next_frame) {
                Ok(cmd) => {
                    log::debug!("[Control] {:?}", cmd);
                    manager.handle(cmd, Instant::now());
                }
                Err(RecvTimeoutError::Timeout) => {
                    let position = manager.poll_position();
                    if position != last_position {
                        last_position = position;
                        let _ = events.send(DeckEvent::TapePosition(position));
                    }
                    next_frame += frame_interval;
                    let now = Instant::now();
                    if next_frame < now {
                        next_frame = now + frame_interval;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        log::info!("[Control] Command channel closed, stopping");
        manager
    })
}
