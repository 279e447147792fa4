//! The event bus — typed publish/subscribe for time changes.
//!
//! RULE: Handlers are isolated from each other. A handler that fails
//! or panics is logged; the handlers after it still receive the event.

use crate::{
    cascade::panic_message,
    clock::Epoch,
    error::SimResult,
    speed::SpeedMode,
    types::GameMinutes,
};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};

/// Every event the time core publishes.
/// Variants may be appended — never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimeEvent {
    // ── Clock ──────────────────────────────────────
    MinuteTick {
        at:      Epoch,
        minutes: GameMinutes,
    },
    HourChanged {
        at: Epoch,
    },
    DayChanged {
        at:   Epoch,
        days: u64,
    },
    MonthChanged {
        at: Epoch,
    },
    YearChanged {
        year: u32,
    },

    // ── Speed ──────────────────────────────────────
    SpeedChanged {
        from: SpeedMode,
        to:   SpeedMode,
    },
    Paused,
    Resumed {
        mode: SpeedMode,
    },
    TravelResumed,

    // ── Persistence ────────────────────────────────
    SaveLoaded {
        at: Epoch,
    },
}

impl TimeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MinuteTick { .. }   => EventKind::MinuteTick,
            Self::HourChanged { .. }  => EventKind::HourChanged,
            Self::DayChanged { .. }   => EventKind::DayChanged,
            Self::MonthChanged { .. } => EventKind::MonthChanged,
            Self::YearChanged { .. }  => EventKind::YearChanged,
            Self::SpeedChanged { .. } => EventKind::SpeedChanged,
            Self::Paused              => EventKind::Paused,
            Self::Resumed { .. }      => EventKind::Resumed,
            Self::TravelResumed       => EventKind::TravelResumed,
            Self::SaveLoaded { .. }   => EventKind::SaveLoaded,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MinuteTick,
    HourChanged,
    DayChanged,
    MonthChanged,
    YearChanged,
    SpeedChanged,
    Paused,
    Resumed,
    TravelResumed,
    SaveLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Handler = Box<dyn FnMut(&TimeEvent) -> SimResult<()>>;

struct Subscriber {
    id:      SubscriptionId,
    /// `None` subscribes to every kind.
    kind:    Option<EventKind>,
    handler: Handler,
}

#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_id:     u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: Handler) -> SubscriptionId {
        self.add(Some(kind), handler)
    }

    /// Receive every event regardless of kind.
    pub fn subscribe_all(&mut self, handler: Handler) -> SubscriptionId {
        self.add(None, handler)
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver `event` to matching handlers in subscription order.
    /// Returns how many handlers failed.
    pub fn publish(&mut self, event: &TimeEvent) -> usize {
        let kind = event.kind();
        let mut failures = 0;

        for sub in self.subscribers.iter_mut().filter(|s| s.kind.is_none_or(|k| k == kind)) {
            match panic::catch_unwind(AssertUnwindSafe(|| (sub.handler)(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    log::warn!("event: handler {:?} failed on {kind:?}: {e}", sub.id);
                }
                Err(payload) => {
                    failures += 1;
                    log::error!(
                        "event: handler {:?} panicked on {kind:?}: {}",
                        sub.id,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        failures
    }

    fn add(&mut self, kind: Option<EventKind>, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber { id, kind, handler });
        id
    }
}
