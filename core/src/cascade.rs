//! The update cascade — dependent systems run on every tick.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Events and quests
//!   2. Market prices
//!   3. Scheduled events
//!   4. City events
//!   5. Dynamic market
//!   6. Property work queue, construction completion, rent payment
//!   7. Midnight only: property daily income, trade-route daily processing
//!   8. Price alerts
//!
//! RULES:
//!   - Later steps read what earlier steps wrote in the same tick.
//!   - A failing step is logged and counted, never escalated.
//!   - A failing step never stops the steps after it.

use crate::{
    clock::{Advance, GameClock},
    command::ClockCommand,
    subsystem::{TickContext, Tickable},
};
use serde::{Deserialize, Serialize};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

/// Stable cascade positions. Declaration order is execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CascadeSlot {
    EventsAndQuests,
    MarketPrices,
    ScheduledEvents,
    CityEvents,
    DynamicMarket,
    PropertyWorkQueue,
    ConstructionCompletion,
    RentPayment,
    PropertyDailyIncome,
    TradeRouteDaily,
    PriceAlerts,
}

impl CascadeSlot {
    pub const ALL: [CascadeSlot; 11] = [
        Self::EventsAndQuests,
        Self::MarketPrices,
        Self::ScheduledEvents,
        Self::CityEvents,
        Self::DynamicMarket,
        Self::PropertyWorkQueue,
        Self::ConstructionCompletion,
        Self::RentPayment,
        Self::PropertyDailyIncome,
        Self::TradeRouteDaily,
        Self::PriceAlerts,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::EventsAndQuests        => "events_and_quests",
            Self::MarketPrices           => "market_prices",
            Self::ScheduledEvents        => "scheduled_events",
            Self::CityEvents             => "city_events",
            Self::DynamicMarket          => "dynamic_market",
            Self::PropertyWorkQueue      => "property_work_queue",
            Self::ConstructionCompletion => "construction_completion",
            Self::RentPayment            => "rent_payment",
            Self::PropertyDailyIncome    => "property_daily_income",
            Self::TradeRouteDaily        => "trade_route_daily",
            Self::PriceAlerts            => "price_alerts",
        }
    }

    /// Midnight slots run only when the tick crossed a day boundary.
    pub fn is_midnight_only(&self) -> bool {
        matches!(self, Self::PropertyDailyIncome | Self::TradeRouteDaily)
    }
}

/// Cumulative bookkeeping for one registered step.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StepStats {
    pub name:     &'static str,
    pub slot:     CascadeSlot,
    pub runs:     u64,
    pub failures: u64,
}

/// What one cascade run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub steps_run:    u32,
    pub steps_failed: u32,
    pub midnight_ran: bool,
    pub failed:       Vec<&'static str>,
}

impl CascadeReport {
    pub fn all_ok(&self) -> bool {
        self.steps_failed == 0
    }
}

struct RegisteredStep {
    slot:  CascadeSlot,
    step:  Box<dyn Tickable>,
    stats: StepStats,
}

#[derive(Default)]
pub struct UpdateCascade {
    steps: Vec<RegisteredStep>,
}

impl UpdateCascade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step. Position is decided by `slot`; steps sharing a
    /// slot run in registration order.
    pub fn register(&mut self, slot: CascadeSlot, step: Box<dyn Tickable>) {
        let name = step.name();
        let at = self
            .steps
            .iter()
            .position(|s| s.slot > slot)
            .unwrap_or(self.steps.len());
        log::debug!("cascade: registered '{name}' in slot {}", slot.name());
        self.steps.insert(at, RegisteredStep {
            slot,
            step,
            stats: StepStats { name, slot, runs: 0, failures: 0 },
        });
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_registered(&self, slot: CascadeSlot) -> bool {
        self.steps.iter().any(|s| s.slot == slot)
    }

    /// Step names in execution order.
    pub fn order(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.stats.name).collect()
    }

    pub fn step_stats(&self) -> Vec<StepStats> {
        self.steps.iter().map(|s| s.stats.clone()).collect()
    }

    /// Run every registered step once for this tick, in slot order.
    /// Midnight steps run once per day boundary crossed.
    pub fn run(
        &mut self,
        clock: &GameClock,
        advance: Advance,
        commands: &mut Vec<ClockCommand>,
    ) -> CascadeReport {
        let mut report = CascadeReport::default();

        for entry in &mut self.steps {
            let (daily, repeats) = if entry.slot.is_midnight_only() {
                if !advance.crossed_midnight() {
                    continue;
                }
                report.midnight_ran = true;
                (true, advance.days_crossed)
            } else {
                (false, 1)
            };

            for _ in 0..repeats {
                let mut ctx = TickContext::new(clock, advance, commands);
                report.steps_run += 1;
                if !run_isolated(entry, &mut ctx, daily) {
                    report.steps_failed += 1;
                    report.failed.push(entry.stats.name);
                }
            }
        }

        if !report.all_ok() {
            log::warn!(
                "cascade: {}/{} steps failed at {:04}-{:02}-{:02} {:02}:{:02}: {:?}",
                report.steps_failed,
                report.steps_run,
                clock.year(),
                clock.month(),
                clock.day(),
                clock.hour(),
                clock.minute(),
                report.failed,
            );
        }
        report
    }
}

/// Run one step, containing both error returns and panics.
fn run_isolated(entry: &mut RegisteredStep, ctx: &mut TickContext<'_>, daily: bool) -> bool {
    let step = &mut entry.step;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        if daily { step.daily_tick(ctx) } else { step.tick(ctx) }
    }));

    entry.stats.runs += 1;
    match outcome {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            entry.stats.failures += 1;
            log::warn!("cascade: step '{}' failed: {e}", entry.stats.name);
            false
        }
        Err(payload) => {
            entry.stats.failures += 1;
            log::error!(
                "cascade: step '{}' panicked: {}",
                entry.stats.name,
                panic_message(payload.as_ref())
            );
            false
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
