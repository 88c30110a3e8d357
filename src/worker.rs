use std::convert::TryFrom;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::countdown_latch::CountdownLatch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    NotStarted,
    Running,
    Finished,
    Failed(String),
}

impl WorkerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Finished | WorkerState::Failed(_))
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::NotStarted => write!(f, "not started"),
            WorkerState::Running => write!(f, "running"),
            WorkerState::Finished => write!(f, "finished"),
            WorkerState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Shared view of one worker's lifecycle.
///
/// Transitions only move forward; once terminal, the state is frozen.
#[derive(Clone)]
pub struct WorkerStatus {
    name: Arc<str>,
    state: Arc<Mutex<WorkerState>>,
}

impl WorkerStatus {
    pub fn new(name: &str) -> Self {
        WorkerStatus {
            name: Arc::from(name),
            state: Arc::new(Mutex::new(WorkerState::NotStarted)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> WorkerState {
        self.state.lock().expect("worker status mutex poisoned").clone()
    }

    fn transition(&self, next: WorkerState) {
        let mut state = self.state.lock().expect("worker status mutex poisoned");
        if !state.is_terminal() {
            *state = next;
        }
    }

    pub(crate) fn start(&self) {
        self.transition(WorkerState::Running);
    }

    pub(crate) fn finish(&self) {
        self.transition(WorkerState::Finished);
    }

    pub(crate) fn fail(&self, reason: impl Into<String>) {
        self.transition(WorkerState::Failed(reason.into()));
    }
}

/// Releases one count of the latch when the worker's thread exits, and marks
/// the worker failed if it unwinds before reaching a terminal state.
///
/// An optional hook runs while unwinding, before the latch is released, so
/// the dying worker can unblock its peer.
pub(crate) struct ExitGuard {
    status: WorkerStatus,
    latch: CountdownLatch,
    on_panic: Option<Box<dyn FnOnce() + Send>>,
}

impl ExitGuard {
    pub(crate) fn new(status: WorkerStatus, latch: CountdownLatch) -> Self {
        ExitGuard {
            status,
            latch,
            on_panic: None,
        }
    }

    pub(crate) fn on_panic<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_panic = Some(Box::new(f));
        self
    }
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            self.status.fail("panicked");
            if let Some(hook) = self.on_panic.take() {
                hook();
            }
        }
        self.latch.countdown();
    }
}

/// Artificial per-item delay: a fixed base plus uniform random jitter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pace {
    pub base: Duration,
    pub jitter: Duration,
}

impl Pace {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Pace { base, jitter }
    }

    pub fn is_zero(&self) -> bool {
        self.base.is_zero() && self.jitter.is_zero()
    }

    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.base;
        }
        let jitter_us = u64::try_from(self.jitter.as_micros()).unwrap_or(u64::MAX);
        self.base
            .saturating_add(Duration::from_micros(rand::thread_rng().gen_range(0..=jitter_us)))
    }

    pub(crate) fn pause(&self) {
        if !self.is_zero() {
            thread::sleep(self.next_delay());
        }
    }
}
