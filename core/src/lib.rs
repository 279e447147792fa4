//! Time and scheduling core for a medieval trading game.
//!
//! A Gregorian game clock driven by real elapsed time, a speed
//! controller, and a fixed-order cascade of dependent-system updates
//! fired on every in-game minute.

pub mod calendar;
pub mod cascade;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod presentation;
pub mod save;
pub mod scheduler;
pub mod speed;
pub mod store;
pub mod subsystem;
pub mod types;
