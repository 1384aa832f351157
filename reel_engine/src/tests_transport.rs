#[cfg(test)]
mod tests {
    use crate::deck::{self, DeckProcessor};
    use crate::synchronizer::TrackManager;
    use crate::commands::EngineCommand;
    use crate::transport::{EngineSettings, TransportMode, transport_pair};
    use approx::assert_relative_eq;
    use crossbeam_channel::{Receiver, unbounded};
    use reel_shared::{DeckConfig, DeckEvent, EffectKind, TransportState};
    use std::time::{Duration, Instant};

    fn deck_with(config: DeckConfig) -> (TrackManager, DeckProcessor, Receiver<DeckEvent>) {
        let (tx, rx) = unbounded();
        let (manager, processor) = deck::build(&config, tx);
        (manager, processor, rx)
    }

    fn config(tracks: usize, latency_seconds: f64) -> DeckConfig {
        DeckConfig {
            track_count: tracks,
            max_duration_seconds: 20.0,
            latency_seconds,
            ..DeckConfig::default()
        }
    }

    fn run(processor: &mut DeckProcessor, blocks: usize, value: f32) {
        let input = vec![value; processor.block_size()];
        for _ in 0..blocks {
            processor.process_block(&input);
        }
    }

    /// Seek and wait for the 0.1 s seek ramp to land
    fn park(manager: &mut TrackManager, processor: &mut DeckProcessor, tape_time: f64) {
        manager.seek(tape_time);
        run(processor, 40, 0.0);
    }

    #[test]
    fn test_parked_record_writes_at_position() {
        let (mut manager, mut processor, _rx) = deck_with(config(2, 0.0));
        park(&mut manager, &mut processor, 5.0);
        assert_relative_eq!(manager.tape_time(), 5.0);

        manager.arm(0);
        run(&mut processor, 1, 1.0);

        let tape = processor.engine(0).unwrap().tape();
        assert_eq!(tape.as_slice()[240000], 1.0);
        assert_eq!(tape.as_slice()[240001], 0.0);
        // Only the armed track records
        assert!(processor.engine(1).unwrap().tape().as_slice().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_motor_advances_in_real_time() {
        let (mut manager, mut processor, rx) = deck_with(config(3, 0.11));
        park(&mut manager, &mut processor, 5.0);

        manager.handle(reel_shared::DeckCommand::Play, Instant::now());
        // 1875 blocks of 128 frames = 5 s at 48 kHz
        run(&mut processor, 1875, 0.0);

        assert_relative_eq!(manager.tape_time(), 10.0, epsilon = 1e-9);
        for track in 0..3 {
            assert_relative_eq!(manager.track_position(track).unwrap(), 10.0, epsilon = 1e-9);
        }
        assert!(rx.try_iter().any(|e| e == DeckEvent::TransportChanged(TransportState::Playing)));
    }

    #[test]
    fn test_latency_compensation_offsets_writes() {
        let (mut manager, mut processor, _rx) = deck_with(config(1, 0.1));
        park(&mut manager, &mut processor, 1.0);
        manager.arm(0);
        run(&mut processor, 1, 0.5);

        let tape = processor.engine(0).unwrap().tape().as_slice();
        assert_eq!(tape[43200], 0.5);
        assert_eq!(tape[48000], 0.0);
    }

    #[test]
    fn test_rolling_record_is_frame_accurate() {
        let (mut manager, mut processor, _rx) = deck_with(config(1, 0.0));
        manager.arm(0);
        manager.start();

        let block = processor.block_size();
        for b in 0..10 {
            let input: Vec<f32> = (0..block).map(|i| (b * block + i) as f32).collect();
            processor.process_block(&input);
        }

        let tape = processor.engine(0).unwrap().tape().as_slice();
        for (frame, &sample) in tape[..10 * block].iter().enumerate() {
            assert_eq!(sample, frame as f32, "frame {}", frame);
        }
    }

    #[test]
    fn test_random_arming_keeps_single_recorder() {
        let (mut manager, mut processor, _rx) = deck_with(config(4, 0.0));
        let mut rng = fastrand::Rng::with_seed(7);

        for _ in 0..300 {
            // Id 4 does not exist and must be ignored
            manager.arm(rng.usize(0..5));
            run(&mut processor, 1, 0.0);

            let recording: Vec<usize> = processor
                .engines()
                .iter()
                .filter(|e| e.mode() == TransportMode::Recording)
                .map(|e| e.id())
                .collect();
            assert!(recording.len() <= 1);
            assert_eq!(recording.first().copied(), manager.armed());
        }
    }

    #[test]
    fn test_small_scrub_stays_in_dead_zone() {
        let (mut manager, mut processor, rx) = deck_with(config(2, 0.0));
        let t0 = Instant::now();
        manager.scrub_begin(0.0, 100.0, t0);
        // 0.03 rad is about 14 ms of tape
        manager.scrub_move(0.03, t0);
        run(&mut processor, 1, 0.0);

        assert!(processor.engines().iter().all(|e| !e.is_ramping()));
        assert_eq!(manager.tape_time(), 0.0);
        assert!(rx.try_iter().any(|e| matches!(e, DeckEvent::PositionChanged(_))));
    }

    #[test]
    fn test_scrub_stops_motor_and_moves_all_tracks() {
        let (mut manager, mut processor, _rx) = deck_with(config(3, 0.0));
        manager.start();
        run(&mut processor, 100, 0.0);

        let rolled = manager.poll_position();
        let t0 = Instant::now();
        manager.scrub_begin(0.0, 100.0, t0);
        manager.scrub_move(std::f64::consts::PI, t0 + Duration::from_millis(10));
        assert!(!manager.motor_engaged());
        assert_eq!(manager.state(), TransportState::Seeking);

        run(&mut processor, 40, 0.0);
        let target = rolled + 1.5;
        for track in 0..3 {
            assert_relative_eq!(manager.track_position(track).unwrap(), target, epsilon = 1e-9);
        }
        assert!(processor.engines().iter().all(|e| !e.is_ramping()));

        manager.scrub_end();
        assert_eq!(manager.state(), TransportState::Stopped);
    }

    #[test]
    fn test_double_reorder_restores_routing() {
        let (mut manager, _processor, rx) = deck_with(config(4, 0.0));
        let before = manager.router().table();

        manager.reorder(0, 1);
        assert_eq!(manager.order(), &[1, 0, 2, 3]);
        for effect in 0..manager.router().effect_count() {
            assert!(manager.router().source_count(effect) <= 1);
        }

        manager.reorder(0, 1);
        assert_eq!(manager.order(), &[0, 1, 2, 3]);
        assert_eq!(*manager.router().table(), *before);
        for track in 0..4 {
            assert_eq!(manager.router().effect_of(track), Some(track));
        }

        let reorders = rx
            .try_iter()
            .filter(|e| matches!(e, DeckEvent::Reordered(_)))
            .count();
        assert_eq!(reorders, 2);
    }

    #[test]
    fn test_reorder_moves_track_to_other_effect() {
        let panned = DeckConfig {
            effects: vec![EffectKind::Pan { pan: -1.0 }, EffectKind::Pan { pan: 1.0 }],
            ..config(2, 0.0)
        };
        let (mut manager, mut processor, _rx) = deck_with(panned);

        // Lay down a constant signal on track 0, then rewind
        manager.arm(0);
        manager.start();
        run(&mut processor, 100, 1.0);
        manager.stop();
        park(&mut manager, &mut processor, 0.0);
        assert_eq!(manager.armed(), None);

        manager.start();
        let silence = vec![0.0; processor.block_size()];
        let master = processor.process_block(&silence);
        assert_relative_eq!(master[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(master[1], 0.0, epsilon = 1e-6);

        manager.reorder(0, 1);
        let master = processor.process_block(&silence);
        assert_relative_eq!(master[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(master[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_stop_disarms_and_freezes() {
        let (mut manager, mut processor, rx) = deck_with(config(2, 0.0));
        manager.arm(1);
        manager.start();
        run(&mut processor, 10, 0.25);
        manager.stop();
        run(&mut processor, 5, 0.0);

        let frozen = 10.0 * 128.0 / 48000.0;
        assert_relative_eq!(manager.tape_time(), frozen, epsilon = 1e-9);
        assert_eq!(processor.engine(1).unwrap().mode(), TransportMode::Playing);
        let events: Vec<_> = rx.try_iter().collect();
        assert!(events.contains(&DeckEvent::Disarmed(1)));
        assert_eq!(
            events.last(),
            Some(&DeckEvent::TransportChanged(TransportState::Stopped))
        );
    }

    #[test]
    fn test_rearm_with_saturated_queue_keeps_single_recorder() {
        let tight = DeckConfig {
            command_queue_capacity: 4,
            ..config(2, 0.0)
        };
        let (mut manager, mut processor, _rx) = deck_with(tight);
        manager.arm(0);
        manager.seek(1.0);
        manager.seek(3.0);
        manager.seek(5.0);
        manager.arm(1);
        run(&mut processor, 4, 0.0);

        let recording: Vec<usize> = processor
            .engines()
            .iter()
            .filter(|e| e.mode() == TransportMode::Recording)
            .map(|e| e.id())
            .collect();
        assert_eq!(manager.armed(), Some(1));
        assert_eq!(recording, vec![1]);
    }

    #[test]
    fn test_stop_survives_saturated_queue() {
        let tight = DeckConfig {
            command_queue_capacity: 2,
            ..config(1, 0.0)
        };
        let (mut manager, mut processor, _rx) = deck_with(tight);
        manager.start();
        run(&mut processor, 1, 0.0);
        for t in [1.0, 2.0, 3.0] {
            manager.seek(t);
            manager.start();
        }
        manager.stop();

        // Drain the queue as the render loop would
        for _ in 0..10 {
            manager.poll_position();
            run(&mut processor, 1, 0.0);
        }
        assert!(!manager.motor_engaged());
        assert!(processor.engines().iter().all(|e| !e.is_ramping()));
        let frozen = manager.tape_time();
        run(&mut processor, 10, 0.0);
        assert_eq!(manager.tape_time(), frozen);
    }

    #[test]
    fn test_write_then_read_at_random_times() {
        let settings = EngineSettings {
            sample_rate: 48_000.0,
            max_duration_seconds: 30.0,
            block_size: 1,
            latency_frames: 0,
            queue_capacity: 8,
        };
        let (mut handle, mut engine) = transport_pair(0, settings);
        // Keep the nearest frame inside the tape
        let span = engine.tape().duration_seconds() - 1.0 / 48_000.0;
        let mut rng = fastrand::Rng::with_seed(42);
        let mut out = [0.0; 2];

        for _ in 0..500 {
            let t = rng.f64() * span;
            let value = rng.f32() * 2.0 - 1.0;

            handle.send(EngineCommand::SetPosition(t));
            handle.arm();
            engine.process(&[value], &mut out, 2);

            handle.disarm();
            handle.send(EngineCommand::SetPosition(t));
            engine.process(&[0.0], &mut out, 2);
            assert_eq!(out, [value, value], "t = {}", t);
        }
    }
}
