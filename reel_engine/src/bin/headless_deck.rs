use crossbeam_channel::unbounded;
use reel_engine::{AudioEngine, control};
use reel_shared::{DeckCommand, DeckConfig};
use std::thread;
use std::time::Duration;

/// Usage: headless_deck [config.json]
fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => DeckConfig::load(&path)?,
        None => DeckConfig::default(),
    };

    log::info!("[Headless] Starting deck...");
    let (event_tx, event_rx) = unbounded();
    let (engine, manager) = AudioEngine::new(&config, event_tx.clone())?;
    log::info!("[Headless] Engine initialized at {} Hz", engine.get_sample_rate());

    let (cmd_tx, cmd_rx) = unbounded();
    let control = control::spawn(manager, cmd_rx, event_tx, Duration::from_millis(16));

    // Record the input on track 0 for 5 seconds
    cmd_tx.send(DeckCommand::Arm(0))?;
    cmd_tx.send(DeckCommand::Play)?;
    thread::sleep(Duration::from_secs(5));

    log::info!("[Headless] Stopping, rewinding and playing back...");
    cmd_tx.send(DeckCommand::Stop)?;
    cmd_tx.send(DeckCommand::Seek(0.0))?;
    thread::sleep(Duration::from_millis(200));
    cmd_tx.send(DeckCommand::Play)?;
    thread::sleep(Duration::from_secs(5));
    cmd_tx.send(DeckCommand::Stop)?;
    thread::sleep(Duration::from_millis(100));

    drop(cmd_tx);
    let manager = control
        .join()
        .map_err(|_| anyhow::anyhow!("control thread panicked"))?;

    let events = event_rx.try_iter().count();
    log::info!(
        "[Headless] Done at {:.3}s, {} events received",
        manager.tape_time(),
        events
    );
    Ok(())
}
