//! Shared test helpers: call-count spies and a travel double.

#![allow(dead_code)]

use std::{cell::Cell, cell::RefCell, rc::Rc};
use tradecraft_core::{
    config::EngineConfig,
    engine::GameEngine,
    error::{SimError, SimResult},
    subsystem::{TickContext, Tickable, TravelHook},
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn engine() -> GameEngine {
    init_logging();
    GameEngine::new(EngineConfig::default()).expect("default config is valid")
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Behaviour {
    Ok,
    Fail,
    Panic,
}

/// A cascade step that counts its calls and records its name into a
/// shared journal so tests can check ordering.
pub struct Spy {
    pub name:      &'static str,
    pub calls:     Rc<Cell<u32>>,
    pub daily:     Rc<Cell<u32>>,
    pub journal:   Rc<RefCell<Vec<&'static str>>>,
    pub behaviour: Behaviour,
}

impl Spy {
    pub fn new(name: &'static str, journal: &Rc<RefCell<Vec<&'static str>>>) -> Self {
        Self {
            name,
            calls: Rc::new(Cell::new(0)),
            daily: Rc::new(Cell::new(0)),
            journal: Rc::clone(journal),
            behaviour: Behaviour::Ok,
        }
    }

    pub fn behaving(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    fn outcome(&self) -> SimResult<()> {
        match self.behaviour {
            Behaviour::Ok => Ok(()),
            Behaviour::Fail => Err(SimError::StepFailed {
                step:   self.name.to_string(),
                reason: "spy told to fail".to_string(),
            }),
            Behaviour::Panic => panic!("spy '{}' told to panic", self.name),
        }
    }
}

impl Tickable for Spy {
    fn name(&self) -> &'static str { self.name }

    fn tick(&mut self, _ctx: &mut TickContext<'_>) -> SimResult<()> {
        self.calls.set(self.calls.get() + 1);
        self.journal.borrow_mut().push(self.name);
        self.outcome()
    }

    fn daily_tick(&mut self, _ctx: &mut TickContext<'_>) -> SimResult<()> {
        self.daily.set(self.daily.get() + 1);
        self.journal.borrow_mut().push(self.name);
        self.outcome()
    }
}

/// Travel collaborator double with observable state.
#[derive(Clone, Default)]
pub struct FakeTravel {
    pub travelling:  Rc<Cell<bool>>,
    pub destination: Rc<Cell<bool>>,
    pub resumes:     Rc<Cell<u32>>,
}

impl TravelHook for FakeTravel {
    fn is_travelling(&self) -> bool { self.travelling.get() }
    fn has_pending_destination(&self) -> bool { self.destination.get() }

    fn resume_or_auto_start(&mut self) {
        self.resumes.set(self.resumes.get() + 1);
        self.travelling.set(true);
    }
}
