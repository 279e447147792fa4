//! Frame scheduling seam.
//!
//! The engine does not know where frames come from. A platform
//! implements `FrameScheduler` (animation callback, timer, fixed-step
//! loop) and calls `GameEngine::on_frame` with the real time elapsed.

use crate::{
    engine::{FrameOutcome, GameEngine},
    types::RealMillis,
};

/// Identifies one requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

pub trait FrameScheduler {
    /// Ask for one future frame callback.
    fn request_frame(&mut self) -> FrameHandle;
    /// Cancel a frame that has not fired yet.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// A scheduler driven by hand: frames fire only when `fire` is called.
/// Used by tests and by the headless runner.
#[derive(Debug, Default)]
pub struct ManualFrameScheduler {
    next_id:       u64,
    pending:       Vec<FrameHandle>,
    pub requested: u64,
    pub cancelled: u64,
}

impl ManualFrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Fire the oldest pending frame into `engine`. Returns `None` when
    /// nothing was scheduled (engine stopped).
    pub fn fire(&mut self, engine: &mut GameEngine, delta_ms: RealMillis) -> Option<FrameOutcome> {
        if self.pending.is_empty() {
            return None;
        }
        let handle = self.pending.remove(0);
        Some(engine.on_frame(self, handle, delta_ms))
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_id);
        self.next_id += 1;
        self.requested += 1;
        self.pending.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let before = self.pending.len();
        self.pending.retain(|h| *h != handle);
        if self.pending.len() != before {
            self.cancelled += 1;
        }
    }
}
