//! Collaborator traits.
//!
//! RULE: The time core never reaches into a collaborator's state.
//! Dependent systems implement `Tickable` and are registered with the
//! cascade under a fixed slot; travel implements `TravelHook`.
//! Anything not registered simply does not run.

use crate::{
    clock::{Advance, GameClock},
    command::ClockCommand,
    error::SimResult,
    types::GameMinutes,
};

/// What a cascade step sees during one tick.
pub struct TickContext<'a> {
    /// The clock after this tick's advance. Read-only by construction.
    pub clock:   &'a GameClock,
    /// Boundaries crossed by the advance that triggered this tick.
    pub advance: Advance,
    commands:    &'a mut Vec<ClockCommand>,
}

impl<'a> TickContext<'a> {
    pub(crate) fn new(
        clock: &'a GameClock,
        advance: Advance,
        commands: &'a mut Vec<ClockCommand>,
    ) -> Self {
        Self { clock, advance, commands }
    }

    /// Minutes covered by this tick. Usually 1; more when frames lag.
    pub fn minutes(&self) -> GameMinutes {
        self.advance.minutes
    }

    /// Queue a clock command. It is applied after the cascade finishes,
    /// never in the middle of it.
    pub fn request(&mut self, command: ClockCommand) {
        self.commands.push(command);
    }
}

/// The contract every dependent subsystem fulfils.
pub trait Tickable {
    /// Stable name, used in logs and step statistics.
    fn name(&self) -> &'static str;

    /// Called once per tick when registered in a minute slot.
    fn tick(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()>;

    /// Called once per crossed midnight when registered in a midnight slot.
    fn daily_tick(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        self.tick(ctx)
    }
}

/// The travel system, as seen by the speed controller.
pub trait TravelHook {
    fn is_travelling(&self) -> bool;
    fn has_pending_destination(&self) -> bool;
    /// Resume a paused journey or start the pending one.
    fn resume_or_auto_start(&mut self);
}

/// Adapter so plain closures can be registered as cascade steps.
pub struct FnStep<F> {
    name: &'static str,
    f:    F,
}

impl<F> FnStep<F>
where
    F: FnMut(&mut TickContext<'_>) -> SimResult<()>,
{
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<F> Tickable for FnStep<F>
where
    F: FnMut(&mut TickContext<'_>) -> SimResult<()>,
{
    fn name(&self) -> &'static str { self.name }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> SimResult<()> {
        (self.f)(ctx)
    }
}
