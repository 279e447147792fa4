//! The frame loop: real time in, whole game minutes and cascade
//! runs out.

mod common;

use common::{engine, Spy};
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use std::{cell::RefCell, rc::Rc};
use tradecraft_core::{
    cascade::CascadeSlot,
    clock::Epoch,
    scheduler::{FrameHandle, ManualFrameScheduler},
    speed::SpeedMode,
};

#[test]
fn zero_delta_does_nothing() {
    let mut engine = engine();
    engine.set_mode(SpeedMode::VeryFast);
    let before = engine.clock().clone();

    let outcome = engine.frame(0.0);
    assert_eq!(outcome.minutes, 0);
    assert!(outcome.cascade.is_none());
    assert_eq!(engine.clock(), &before);
    assert_eq!(engine.ticks_fired(), 0);
}

#[test]
fn paused_frames_never_move_the_clock() {
    let mut engine = engine();
    engine.set_mode(SpeedMode::Normal);
    engine.set_mode(SpeedMode::Paused);
    assert!(engine.speed().is_paused());
    assert_eq!(engine.rate_multiplier(), 0.0);

    let before = engine.clock().clone();
    for _ in 0..10_000 {
        engine.frame(100.0);
    }
    assert_eq!(engine.clock(), &before);
    assert_eq!(engine.clock().accumulated_fraction(), 0.0);
    assert_eq!(engine.ticks_fired(), 0);
}

#[test]
fn huge_delta_is_clamped() {
    let mut engine = engine();
    engine.set_mode(SpeedMode::VeryFast);

    // A tab returning after an hour still only gets 100ms: 3 minutes.
    let outcome = engine.frame(3_600_000.0);
    assert_eq!(outcome.delta_ms, 100.0);
    assert_eq!(outcome.minutes, 3);
    assert_eq!(engine.clock().minute(), 3);
}

#[test]
fn negative_and_nan_deltas_are_ignored() {
    let mut engine = engine();
    engine.set_mode(SpeedMode::VeryFast);
    assert_eq!(engine.frame(-50.0).minutes, 0);
    assert_eq!(engine.frame(f64::NAN).minutes, 0);
    assert_eq!(engine.clock().as_epoch(), Epoch::default());
}

fn run_thirty_seconds(pattern: impl FnMut() -> f64) -> (Epoch, u32, u64) {
    let mut engine = engine();
    let journal = Rc::new(RefCell::new(Vec::new()));
    let spy = Spy::new("events", &journal);
    let calls = Rc::clone(&spy.calls);
    engine.register(CascadeSlot::EventsAndQuests, Box::new(spy));
    engine.set_mode(SpeedMode::Normal);

    let mut pattern = pattern;
    let mut elapsed = 0.0;
    while elapsed < 30_000.0 {
        let delta = pattern().min(30_000.0 - elapsed);
        let outcome = engine.frame(delta);
        elapsed += outcome.delta_ms;
    }
    (engine.clock().as_epoch(), calls.get(), engine.ticks_fired())
}

#[test]
fn thirty_real_seconds_at_normal_is_one_game_hour() {
    let expected = Epoch { hour: 9, minute: 0, ..Epoch::default() };

    for frame_ms in [16.0, 16.666_666_666_666_668, 50.0, 100.0, 250.0] {
        let (at, calls, ticks) = run_thirty_seconds(|| frame_ms);
        assert_eq!(at, expected, "frame {frame_ms}ms");
        assert_eq!(calls, 60, "frame {frame_ms}ms");
        assert_eq!(ticks, 60);
    }
}

#[test]
fn thirty_real_seconds_with_jittered_frames() {
    let mut rng = Pcg64Mcg::seed_from_u64(0xF4A3_E000);
    let (at, calls, _) = run_thirty_seconds(|| rng.gen_range(1..=100) as f64);
    assert_eq!((at.hour, at.minute), (9, 0));
    assert_eq!(calls, 60);
}

#[test]
fn lagging_frames_batch_minutes_into_one_cascade() {
    let mut engine = engine();
    let journal = Rc::new(RefCell::new(Vec::new()));
    let spy = Spy::new("market", &journal);
    let calls = Rc::clone(&spy.calls);
    engine.register(CascadeSlot::MarketPrices, Box::new(spy));
    engine.set_mode(SpeedMode::VeryFast);

    let outcome = engine.frame(100.0);
    assert_eq!(outcome.minutes, 3);
    assert_eq!(calls.get(), 1, "one cascade per frame, not per minute");
    assert_eq!(engine.clock().minute(), 3);
}

#[test]
fn start_schedules_exactly_one_frame() {
    let mut engine = engine();
    let mut frames = ManualFrameScheduler::new();

    engine.start(&mut frames);
    engine.start(&mut frames);
    assert!(engine.is_running());
    assert_eq!(frames.pending(), 1);
    assert_eq!(frames.requested, 1);

    for _ in 0..5 {
        frames.fire(&mut engine, 16.0).expect("frame scheduled");
        assert_eq!(frames.pending(), 1, "always exactly one frame in flight");
    }
    assert_eq!(frames.requested, 6);
}

#[test]
fn stop_cancels_the_pending_frame() {
    let mut engine = engine();
    let mut frames = ManualFrameScheduler::new();
    engine.set_mode(SpeedMode::Normal);
    engine.start(&mut frames);
    frames.fire(&mut engine, 100.0);

    engine.stop(&mut frames);
    assert!(!engine.is_running());
    assert!(!engine.has_pending_frame());
    assert_eq!(frames.pending(), 0);
    assert_eq!(frames.cancelled, 1);
    assert!(frames.fire(&mut engine, 100.0).is_none());
}

#[test]
fn stale_frame_handles_are_ignored() {
    let mut engine = engine();
    let mut frames = ManualFrameScheduler::new();
    engine.set_mode(SpeedMode::VeryFast);
    engine.start(&mut frames);

    let before = engine.clock().clone();
    let outcome = engine.on_frame(&mut frames, FrameHandle(999), 100.0);
    assert_eq!(outcome.minutes, 0);
    assert_eq!(engine.clock(), &before);
    assert_eq!(frames.pending(), 1);
}

#[test]
fn frames_through_the_scheduler_drive_the_clock() {
    let mut engine = engine();
    let mut frames = ManualFrameScheduler::new();
    engine.set_mode(SpeedMode::Fast);
    engine.start(&mut frames);

    // 10 game-min per real second: 6 seconds is one hour.
    for _ in 0..60 {
        frames.fire(&mut engine, 100.0);
    }
    assert_eq!((engine.clock().hour(), engine.clock().minute()), (9, 0));
}
