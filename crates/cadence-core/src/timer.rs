//! Single-threaded timer queue.
//!
//! `Timers` stands in for the host event loop's `setInterval`/`setTimeout`.
//! Nothing fires on its own: the host loop calls [`Timers::run_due`] (or
//! [`Timers::pump_for`]) and every callback runs on that thread.

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use web_time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};

new_key_type! {
    /// Opaque handle to an armed timer.
    pub struct TimerHandle;
}

/// Intervals shorter than this are clamped; a zero period would spin `run_due`.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

enum Task {
    Repeat {
        period: Duration,
        callback: Rc<dyn Fn()>,
    },
    Once(Box<dyn FnOnce()>),
}

struct Timer {
    deadline: Instant,
    seq: u64,
    task: Task,
}

#[derive(Default)]
struct TimerQueue {
    timers: SlotMap<TimerHandle, Timer>,
    next_seq: u64,
}

impl TimerQueue {
    fn insert(&mut self, deadline: Instant, task: Task) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.insert(Timer {
            deadline,
            seq,
            task,
        })
    }
}

enum Ready {
    Repeat(Rc<dyn Fn()>),
    Once(Box<dyn FnOnce()>),
}

#[derive(Clone)]
pub struct Timers {
    queue: Rc<RefCell<TimerQueue>>,
    clock: Rc<dyn Clock>,
}

impl Timers {
    pub fn new<C: Clock>(clock: C) -> Self {
        Self::with_clock(Rc::new(clock))
    }

    pub fn with_clock(clock: Rc<dyn Clock>) -> Self {
        Self {
            queue: Rc::new(RefCell::new(TimerQueue::default())),
            clock,
        }
    }

    /// Timer queue on the wall clock.
    pub fn system() -> Self {
        Self::new(SystemClock)
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Arms a repeating timer; the first firing is one `period` from now.
    pub fn set_interval(&self, period: Duration, callback: impl Fn() + 'static) -> TimerHandle {
        let period = period.max(MIN_INTERVAL);
        let deadline = self.now() + period;
        let handle = self.queue.borrow_mut().insert(
            deadline,
            Task::Repeat {
                period,
                callback: Rc::new(callback),
            },
        );
        log::debug!("timer {handle:?}: interval armed every {period:?}");
        handle
    }

    pub fn set_timeout(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerHandle {
        let deadline = self.now() + delay;
        let handle = self
            .queue
            .borrow_mut()
            .insert(deadline, Task::Once(Box::new(callback)));
        log::debug!("timer {handle:?}: timeout armed in {delay:?}");
        handle
    }

    /// Cancels a timer. Returns `false` if it already fired (timeouts) or was
    /// cleared before.
    pub fn clear(&self, handle: TimerHandle) -> bool {
        let removed = self.queue.borrow_mut().timers.remove(handle).is_some();
        if removed {
            log::debug!("timer {handle:?}: cleared");
        }
        removed
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.queue.borrow().timers.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.borrow().timers.values().map(|t| t.deadline).min()
    }

    /// Fires every timer whose deadline has passed, earliest first.
    ///
    /// Each timer fires at most once per call. Intervals are re-armed before
    /// their callback runs; firings missed while the loop was busy are skipped,
    /// not queued. The queue is not borrowed while a callback runs, so callbacks
    /// may arm, clear or re-enter `run_due`.
    pub fn run_due(&self) -> usize {
        let now = self.now();
        let mut due: Vec<(Instant, u64, TimerHandle)> = self
            .queue
            .borrow()
            .timers
            .iter()
            .filter(|(_, t)| t.deadline <= now)
            .map(|(k, t)| (t.deadline, t.seq, k))
            .collect();
        due.sort_unstable_by_key(|&(deadline, seq, _)| (deadline, seq));

        let mut fired = 0;
        for (deadline, _, handle) in due {
            let ready = {
                let mut q = self.queue.borrow_mut();
                // Cleared, or already re-armed by a nested pass.
                let Some(timer) = q.timers.get_mut(handle) else {
                    continue;
                };
                if timer.deadline != deadline {
                    continue;
                }
                if let Task::Repeat { period, callback } = &timer.task {
                    let period = *period;
                    let callback = callback.clone();
                    let mut next = deadline + period;
                    if next <= now {
                        next = now + period;
                    }
                    timer.deadline = next;
                    Ready::Repeat(callback)
                } else {
                    match q.timers.remove(handle) {
                        Some(Timer {
                            task: Task::Once(f),
                            ..
                        }) => Ready::Once(f),
                        _ => continue,
                    }
                }
            };
            match ready {
                Ready::Repeat(f) => f(),
                Ready::Once(f) => f(),
            }
            fired += 1;
        }
        fired
    }

    /// Drives the queue in real time for `span`, sleeping between deadlines.
    ///
    /// Meant for [`SystemClock`]-backed queues; a clock that does not advance
    /// on its own ends the pump after the first pass.
    pub fn pump_for(&self, span: Duration) -> usize {
        let end = self.now() + span;
        let mut fired = 0;
        loop {
            fired += self.run_due();
            let now = self.now();
            if now >= end {
                break;
            }
            let wake = self.next_deadline().map_or(end, |d| d.min(end));
            if wake > now {
                std::thread::sleep(wake - now);
            }
            if self.now() == now {
                log::warn!("pump_for: clock did not advance; stopping");
                break;
            }
        }
        fired
    }
}
