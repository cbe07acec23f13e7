use std::cell::Cell;
use std::rc::Rc;

use web_time::{Duration, Instant};

use crate::timer::Timers;

/// Source of "now" for the timer queue and everything scheduled on it.
pub trait Clock: 'static {
    fn now(&self) -> Instant;
}

pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock you can drive deterministically.
///
/// Clones share the same time, so a test can hand one clone to [`Timers`] and
/// keep another to move time forward.
#[derive(Clone)]
pub struct ManualClock {
    t: Rc<Cell<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(t: Instant) -> Self {
        Self {
            t: Rc::new(Cell::new(t)),
        }
    }

    pub fn set(&self, t: Instant) {
        self.t.set(t);
    }

    pub fn advance(&self, by: Duration) {
        self.t.set(self.t.get() + by);
    }

    /// Moves time forward by `span`, stopping at every timer deadline on the
    /// way so each firing observes its own scheduled instant.
    ///
    /// Returns the number of callbacks fired. Callbacks may advance the clock
    /// themselves (a "slow" step); time never moves backwards.
    pub fn run(&self, timers: &Timers, span: Duration) -> usize {
        let end = self.t.get() + span;
        let mut fired = timers.run_due();
        while let Some(next) = timers.next_deadline()
            && next <= end
        {
            if next > self.t.get() {
                self.t.set(next);
            }
            fired += timers.run_due();
        }
        if end > self.t.get() {
            self.t.set(end);
        }
        fired + timers.run_due()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.t.get()
    }
}
