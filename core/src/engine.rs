//! The time engine — bridges real time to game time.
//!
//! PER FRAME (fixed, documented, never reordered):
//!   1. Clamp the real delta to `max_frame_delta_ms`.
//!   2. Convert to game minutes at the current rate.
//!   3. Accumulate; take out whole minutes, keep the fraction.
//!   4. On one or more whole minutes: advance the clock once, run the
//!      cascade once, publish boundary events, apply queued commands.
//!   5. Reschedule while running.
//!
//! RULES:
//!   - Only the engine mutates the clock and the speed controller.
//!   - The clock is never advanced while the cascade is running.
//!   - A frame never fails; step and handler errors stay contained.

use crate::{
    cascade::{CascadeReport, CascadeSlot, UpdateCascade},
    clock::{Advance, GameClock},
    command::ClockCommand,
    config::EngineConfig,
    error::{SimError, SimResult},
    event::{EventBus, EventKind, Handler, SubscriptionId, TimeEvent},
    presentation::{format_datetime, TimeInfo},
    save::SaveData,
    scheduler::{FrameHandle, FrameScheduler},
    speed::{SpeedChange, SpeedController, SpeedMode},
    subsystem::{Tickable, TravelHook},
    types::{GameMinutes, RealMillis, MINUTES_PER_DAY},
};

/// Longest single `skip_minutes` jump: one leap year.
pub const MAX_SKIP_MINUTES: GameMinutes = 366 * MINUTES_PER_DAY;

/// The shared clock + speed pair. Collaborators get `&TimeContext`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeContext {
    clock: GameClock,
    speed: SpeedController,
}

impl TimeContext {
    pub fn clock(&self) -> &GameClock { &self.clock }
    pub fn speed(&self) -> &SpeedController { &self.speed }
}

/// What one frame did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    /// Real delta after clamping.
    pub delta_ms: RealMillis,
    /// Whole game minutes applied this frame.
    pub minutes:  GameMinutes,
    /// Present when the cascade ran.
    pub cascade:  Option<CascadeReport>,
}

pub struct GameEngine {
    config:     EngineConfig,
    time:       TimeContext,
    cascade:    UpdateCascade,
    bus:        EventBus,
    travel:     Option<Box<dyn TravelHook>>,
    running:    bool,
    in_flight:  Option<FrameHandle>,
    in_cascade: bool,
    ticks:      u64,
}

impl GameEngine {
    pub fn new(config: EngineConfig) -> SimResult<Self> {
        config.validate()?;
        let time = TimeContext {
            clock: GameClock::new(config.epoch),
            speed: SpeedController::with_mode(config.starting_mode),
        };
        log::info!(
            "engine: created at {} ({})",
            format_datetime(&time.clock),
            time.speed.mode()
        );
        Ok(Self {
            config,
            time,
            cascade:    UpdateCascade::new(),
            bus:        EventBus::new(),
            travel:     None,
            running:    false,
            in_flight:  None,
            in_cascade: false,
            ticks:      0,
        })
    }

    // ── Wiring ─────────────────────────────────────────────────

    /// Register a dependent system. Position comes from `slot`.
    pub fn register(&mut self, slot: CascadeSlot, step: Box<dyn Tickable>) {
        self.cascade.register(slot, step);
    }

    pub fn set_travel_hook(&mut self, travel: Box<dyn TravelHook>) {
        self.travel = Some(travel);
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: Handler) -> SubscriptionId {
        self.bus.subscribe(kind, handler)
    }

    pub fn subscribe_all(&mut self, handler: Handler) -> SubscriptionId {
        self.bus.subscribe_all(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    // ── Read access ────────────────────────────────────────────

    pub fn time(&self) -> &TimeContext { &self.time }
    pub fn clock(&self) -> &GameClock { &self.time.clock }
    pub fn speed(&self) -> &SpeedController { &self.time.speed }
    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn cascade(&self) -> &UpdateCascade { &self.cascade }

    /// Number of cascade runs since the engine was created.
    pub fn ticks_fired(&self) -> u64 { self.ticks }

    pub fn rate_multiplier(&self) -> f64 {
        self.time.speed.rate_multiplier()
    }

    pub fn info(&self) -> TimeInfo {
        TimeInfo::capture(&self.time.clock, &self.time.speed, &self.config)
    }

    // ── Speed ──────────────────────────────────────────────────

    pub fn set_mode(&mut self, mode: SpeedMode) -> SpeedChange {
        let change = self.time.speed.set_mode(mode, self.travel.as_deref_mut());
        self.publish_speed_change(change);
        change
    }

    pub fn set_mode_str(&mut self, id: &str) -> SimResult<SpeedChange> {
        let mode: SpeedMode = id.parse()?;
        Ok(self.set_mode(mode))
    }

    pub fn toggle(&mut self) -> SpeedChange {
        let change = self.time.speed.toggle(self.travel.as_deref_mut());
        self.publish_speed_change(change);
        change
    }

    pub fn pause(&mut self) -> SpeedChange {
        self.set_mode(SpeedMode::Paused)
    }

    /// Resume at the last running speed, or `Normal`.
    pub fn resume(&mut self) -> SpeedChange {
        let mode = self.time.speed.last_active().unwrap_or(SpeedMode::Normal);
        self.set_mode(mode)
    }

    pub fn apply_command(&mut self, command: ClockCommand) -> SimResult<()> {
        match command {
            ClockCommand::Pause => { self.pause(); }
            ClockCommand::Resume => { self.resume(); }
            ClockCommand::Toggle => { self.toggle(); }
            ClockCommand::SetSpeed { speed } => { self.set_mode(speed); }
            ClockCommand::SkipMinutes { minutes } => { self.skip_minutes(minutes)?; }
        }
        Ok(())
    }

    // ── Frame loop ─────────────────────────────────────────────

    pub fn is_running(&self) -> bool { self.running }
    pub fn has_pending_frame(&self) -> bool { self.in_flight.is_some() }

    /// Begin requesting frames. Calling twice does not double-schedule.
    pub fn start(&mut self, scheduler: &mut dyn FrameScheduler) {
        if self.running {
            return;
        }
        self.running = true;
        log::info!("engine: started");
        self.schedule_next(scheduler);
    }

    /// Stop and cancel the pending frame, if any.
    pub fn stop(&mut self, scheduler: &mut dyn FrameScheduler) {
        self.running = false;
        if let Some(handle) = self.in_flight.take() {
            scheduler.cancel_frame(handle);
        }
        log::info!("engine: stopped");
    }

    /// Frame callback entry point. Stale or unexpected handles are ignored.
    pub fn on_frame(
        &mut self,
        scheduler: &mut dyn FrameScheduler,
        handle: FrameHandle,
        delta_ms: RealMillis,
    ) -> FrameOutcome {
        if !self.running || self.in_flight != Some(handle) {
            log::debug!("engine: ignoring stale frame {handle:?}");
            return FrameOutcome::default();
        }
        self.in_flight = None;

        let outcome = self.frame(delta_ms);

        if self.running {
            self.schedule_next(scheduler);
        }
        outcome
    }

    /// Advance by one frame's worth of real time. Usable without a
    /// scheduler for fixed-step drivers and tests.
    pub fn frame(&mut self, delta_ms: RealMillis) -> FrameOutcome {
        let delta_ms = if delta_ms.is_finite() {
            delta_ms.clamp(0.0, self.config.max_frame_delta_ms)
        } else {
            0.0
        };
        let mut outcome = FrameOutcome { delta_ms, ..FrameOutcome::default() };

        let rate = self.time.speed.rate_multiplier();
        if rate == 0.0 || delta_ms == 0.0 {
            return outcome;
        }

        let whole = self.time.clock.accumulate(delta_ms / 1000.0 * rate);
        if whole == 0 {
            return outcome;
        }

        outcome.minutes = whole;
        match self.advance_and_cascade(whole) {
            Ok(report) => outcome.cascade = Some(report),
            Err(e) => {
                // Hand the minutes back so a later frame applies them.
                self.time.clock.accumulated_fraction += whole as f64;
                outcome.minutes = 0;
                log::error!("engine: frame advance rejected: {e}");
            }
        }
        outcome
    }

    /// Jump ahead by whole minutes, running the cascade once.
    /// At most `MAX_SKIP_MINUTES` per call.
    pub fn skip_minutes(&mut self, minutes: GameMinutes) -> SimResult<CascadeReport> {
        if minutes == 0 {
            return Ok(CascadeReport::default());
        }
        if minutes > MAX_SKIP_MINUTES {
            return Err(SimError::SkipTooLong { minutes, max: MAX_SKIP_MINUTES });
        }
        log::info!("engine: skipping {minutes} minutes");
        self.advance_and_cascade(minutes)
    }

    fn schedule_next(&mut self, scheduler: &mut dyn FrameScheduler) {
        if self.in_flight.is_none() {
            self.in_flight = Some(scheduler.request_frame());
        }
    }

    fn advance_and_cascade(&mut self, minutes: GameMinutes) -> SimResult<CascadeReport> {
        if self.in_cascade {
            return Err(SimError::ReentrantAdvance);
        }

        let advance = self.time.clock.advance(minutes);

        self.in_cascade = true;
        let mut queued = Vec::new();
        let report = self.cascade.run(&self.time.clock, advance, &mut queued);
        self.in_cascade = false;
        self.ticks += 1;

        log::debug!(
            "engine: tick {} at {} (+{minutes}m, {} steps, {} failed)",
            self.ticks,
            format_datetime(&self.time.clock),
            report.steps_run,
            report.steps_failed,
        );

        self.publish_boundaries(advance);
        self.apply_queued(queued);
        Ok(report)
    }

    /// Commands queued by cascade steps. Speed changes apply now; clock
    /// jumps asked for from inside a tick are refused.
    fn apply_queued(&mut self, queued: Vec<ClockCommand>) {
        for command in queued {
            if let ClockCommand::SkipMinutes { minutes } = command {
                log::warn!(
                    "engine: refused skip of {minutes} minutes queued during a tick: {}",
                    SimError::ReentrantAdvance
                );
                continue;
            }
            if let Err(e) = self.apply_command(command) {
                log::warn!("engine: queued command {command:?} failed: {e}");
            }
        }
    }

    fn publish_boundaries(&mut self, advance: Advance) {
        let at = self.time.clock.as_epoch();
        let mut events = vec![TimeEvent::MinuteTick { at, minutes: advance.minutes }];
        if advance.hours_crossed > 0 {
            events.push(TimeEvent::HourChanged { at });
        }
        if advance.days_crossed > 0 {
            events.push(TimeEvent::DayChanged { at, days: advance.days_crossed });
        }
        if advance.months_crossed > 0 {
            events.push(TimeEvent::MonthChanged { at });
        }
        if advance.years_crossed > 0 {
            events.push(TimeEvent::YearChanged { year: at.year });
        }
        for event in &events {
            self.bus.publish(event);
        }
    }

    fn publish_speed_change(&mut self, change: SpeedChange) {
        if !change.changed() {
            return;
        }
        self.bus.publish(&TimeEvent::SpeedChanged { from: change.from, to: change.to });
        if change.paused() {
            self.bus.publish(&TimeEvent::Paused);
        }
        if change.unpaused() {
            self.bus.publish(&TimeEvent::Resumed { mode: change.to });
        }
        if change.travel_resumed {
            self.bus.publish(&TimeEvent::TravelResumed);
        }
    }

    // ── Persistence ────────────────────────────────────────────

    pub fn save_data(&self) -> SaveData {
        SaveData::capture(&self.time.clock, &self.time.speed)
    }

    /// Apply a save. Out-of-range values are clamped, never rejected,
    /// and the travel hook is not fired.
    pub fn load_save_data(&mut self, data: &SaveData) {
        self.time.clock = data.restore_clock();
        self.time.speed.restore(data.mode);
        log::info!(
            "engine: loaded save at {} ({})",
            format_datetime(&self.time.clock),
            data.mode
        );
        let at = self.time.clock.as_epoch();
        self.bus.publish(&TimeEvent::SaveLoaded { at });
    }

    /// Parse and apply a JSON save blob. Only unparseable JSON fails.
    pub fn load_save_blob(&mut self, blob: &str) -> SimResult<()> {
        let data = SaveData::from_blob(blob, &self.config.epoch)?;
        self.load_save_data(&data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_frame_keeps_its_minutes() {
        let mut engine = GameEngine::new(EngineConfig::default()).expect("default config");
        engine.set_mode(SpeedMode::VeryFast);

        engine.in_cascade = true;
        let outcome = engine.frame(100.0);
        assert_eq!(outcome.minutes, 0);
        assert!(outcome.cascade.is_none());
        assert_eq!(engine.clock().minute(), 0);

        engine.in_cascade = false;
        let outcome = engine.frame(100.0);
        assert_eq!(outcome.minutes, 6);
        assert_eq!(engine.clock().minute(), 6);
    }
}
