//! Event bus delivery and the events the engine publishes.

mod common;

use common::{engine, FakeTravel};
use std::{cell::RefCell, rc::Rc};
use tradecraft_core::{
    clock::Epoch,
    config::EngineConfig,
    engine::GameEngine,
    error::SimError,
    event::{EventBus, EventKind, TimeEvent},
    speed::SpeedMode,
};

type Seen = Rc<RefCell<Vec<TimeEvent>>>;

fn recorder(seen: &Seen) -> Box<dyn FnMut(&TimeEvent) -> Result<(), SimError>> {
    let seen = Rc::clone(seen);
    Box::new(move |event| {
        seen.borrow_mut().push(event.clone());
        Ok(())
    })
}

#[test]
fn handlers_only_see_their_kind() {
    let mut bus = EventBus::new();
    let paused = Seen::default();
    let everything = Seen::default();
    bus.subscribe(EventKind::Paused, recorder(&paused));
    bus.subscribe_all(recorder(&everything));

    bus.publish(&TimeEvent::YearChanged { year: 1112 });
    bus.publish(&TimeEvent::Paused);

    assert_eq!(*paused.borrow(), vec![TimeEvent::Paused]);
    assert_eq!(everything.borrow().len(), 2);
}

#[test]
fn failing_and_panicking_handlers_do_not_block_siblings() {
    let mut bus = EventBus::new();
    let seen = Seen::default();

    bus.subscribe(EventKind::Paused, Box::new(|_| {
        Err(SimError::StepFailed { step: "ui".into(), reason: "detached".into() })
    }));
    bus.subscribe(EventKind::Paused, Box::new(|_| panic!("handler exploded")));
    bus.subscribe(EventKind::Paused, recorder(&seen));

    let failures = bus.publish(&TimeEvent::Paused);
    assert_eq!(failures, 2);
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn unsubscribe_stops_delivery() {
    let mut bus = EventBus::new();
    let seen = Seen::default();
    let id = bus.subscribe(EventKind::Paused, recorder(&seen));

    assert!(bus.unsubscribe(id));
    assert!(!bus.unsubscribe(id));
    bus.publish(&TimeEvent::Paused);
    assert!(seen.borrow().is_empty());
    assert_eq!(bus.subscriber_count(), 0);
}

#[test]
fn engine_publishes_boundary_events() {
    let config = EngineConfig {
        epoch: Epoch { year: 1111, month: 12, day: 31, hour: 23, minute: 59 },
        ..EngineConfig::default()
    };
    let mut engine = GameEngine::new(config).unwrap();
    let seen = Seen::default();
    engine.subscribe_all(recorder(&seen));

    engine.skip_minutes(1).unwrap();

    let kinds: Vec<EventKind> = seen.borrow().iter().map(TimeEvent::kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::MinuteTick,
            EventKind::HourChanged,
            EventKind::DayChanged,
            EventKind::MonthChanged,
            EventKind::YearChanged,
        ]
    );
    assert_eq!(seen.borrow()[4], TimeEvent::YearChanged { year: 1112 });
}

#[test]
fn speed_changes_are_published() {
    let mut engine = engine();
    let travel = FakeTravel::default();
    travel.destination.set(true);
    let resumes = Rc::clone(&travel.resumes);
    engine.set_travel_hook(Box::new(travel));

    let seen = Seen::default();
    engine.subscribe_all(recorder(&seen));

    engine.set_mode(SpeedMode::Normal);
    engine.set_mode(SpeedMode::Normal);
    engine.pause();

    assert_eq!(
        *seen.borrow(),
        vec![
            TimeEvent::SpeedChanged { from: SpeedMode::Paused, to: SpeedMode::Normal },
            TimeEvent::Resumed { mode: SpeedMode::Normal },
            TimeEvent::TravelResumed,
            TimeEvent::SpeedChanged { from: SpeedMode::Normal, to: SpeedMode::Paused },
            TimeEvent::Paused,
        ]
    );
    assert_eq!(resumes.get(), 1);
}

#[test]
fn a_broken_listener_does_not_stop_the_clock() {
    let mut engine = engine();
    engine.subscribe(EventKind::MinuteTick, Box::new(|_| panic!("ui gone")));
    engine.set_mode(SpeedMode::Fast);

    for _ in 0..10 {
        engine.frame(100.0);
    }
    assert_eq!(engine.clock().minute(), 10);
    assert_eq!(engine.info().formatted, "April 1, 1111 - 8:10 AM");
}
