//! Periodic, time-driven execution for a host.
//!
//! A [`ClockScheduler`] runs the host's step on a repeating timer and
//! publishes a [`Tick`] after each step. Overlapping firings are dropped, not
//! queued: a slow step lowers the effective rate instead of building a
//! backlog.
//!
//! [`stop`](ClockScheduler::stop) only clears the running flag. The next
//! firing sees it, clears the timer, and still finishes its own step and
//! tick. That firing is the last one published.
//!
//! The step is assumed to return. A step that blocks forever holds the guard
//! forever; no timeout is imposed.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use web_time::{Duration, Instant};

use crate::config::ClockConfig;
use crate::error::SchedulerError;
use crate::lifecycle::{Capability, Lifecycle};
use crate::source::Subject;
use crate::timer::{TimerHandle, Timers};

/// One scheduled execution of the step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    /// Time since the previous tick; zero for the tick published by `start`.
    pub diff: Duration,
    pub stamp: Instant,
}

impl Tick {
    pub fn diff_ms(&self) -> u128 {
        self.diff.as_millis()
    }

    pub fn is_start(&self) -> bool {
        self.diff.is_zero()
    }
}

type Step = Box<dyn FnMut() -> anyhow::Result<()>>;
type ErrorBoundary = Box<dyn FnMut(anyhow::Error)>;

/// Cloneable handle; clones drive the same timer and tick channel.
#[derive(Clone)]
pub struct ClockScheduler {
    inner: Rc<SchedulerInner>,
}

struct SchedulerInner {
    timers: Timers,
    start_on_init: Cell<bool>,
    clock_speed: Cell<Duration>,
    running: Cell<bool>,
    processing: Cell<bool>,
    timer: Cell<Option<TimerHandle>>,
    last_stamp: Cell<Option<Instant>>,
    step: RefCell<Option<Step>>,
    boundary: RefCell<Option<ErrorBoundary>>,
    ticks: Subject<Tick>,
}

/// Holds the reentrancy flag for the duration of one tick, releasing it on
/// every exit path including unwinding.
struct Processing<'a>(&'a Cell<bool>);

impl<'a> Processing<'a> {
    fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for Processing<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// A callback moved out of its cell for one call, so the call itself may
/// install a replacement. On drop, including unwinding, the original goes
/// back unless a replacement was installed.
struct Taken<'a, F: ?Sized> {
    cell: &'a RefCell<Option<Box<F>>>,
    f: Option<Box<F>>,
}

impl<'a, F: ?Sized> Taken<'a, F> {
    fn take(cell: &'a RefCell<Option<Box<F>>>) -> Option<Self> {
        let f = cell.borrow_mut().take()?;
        Some(Self { cell, f: Some(f) })
    }

    fn get(&mut self) -> Option<&mut F> {
        self.f.as_deref_mut()
    }
}

impl<F: ?Sized> Drop for Taken<'_, F> {
    fn drop(&mut self) {
        let mut slot = self.cell.borrow_mut();
        if slot.is_none() {
            *slot = self.f.take();
        }
    }
}

impl ClockScheduler {
    pub fn new(timers: &Timers, config: ClockConfig) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                timers: timers.clone(),
                start_on_init: Cell::new(config.start_on_init),
                clock_speed: Cell::new(config.clock_speed),
                running: Cell::new(false),
                processing: Cell::new(false),
                timer: Cell::new(None),
                last_stamp: Cell::new(None),
                step: RefCell::new(Some(Box::new(|| Ok(())))),
                boundary: RefCell::new(Some(Box::new(|err| {
                    log::error!("clock step failed: {err:#}");
                }))),
                ticks: Subject::replaying(),
            }),
        }
    }

    /// Replaces the unit of work run on every tick. May be called from the
    /// step itself; the replacement runs from the next tick on.
    pub fn set_step(&self, step: impl FnMut() -> anyhow::Result<()> + 'static) {
        *self.inner.step.borrow_mut() = Some(Box::new(step));
    }

    /// Where failed steps are reported. Defaults to `log::error!`.
    pub fn set_error_boundary(&self, handler: impl FnMut(anyhow::Error) + 'static) {
        *self.inner.boundary.borrow_mut() = Some(Box::new(handler));
    }

    pub fn set_start_on_init(&self, yes: bool) {
        self.inner.start_on_init.set(yes);
    }

    pub fn set_clock_speed(&self, interval: Duration) -> Result<(), SchedulerError> {
        if self.inner.running.get() {
            return Err(SchedulerError::Running);
        }
        self.inner.clock_speed.set(interval);
        Ok(())
    }

    pub fn clock_speed(&self) -> Duration {
        self.inner.clock_speed.get()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    pub fn is_processing(&self) -> bool {
        self.inner.processing.get()
    }

    /// The tick channel. Late subscribers receive the latest tick first.
    pub fn ticks(&self) -> Subject<Tick> {
        self.inner.ticks.clone()
    }

    pub fn last_tick(&self) -> Option<Tick> {
        self.inner.ticks.latest()
    }

    pub fn start(&self) -> Result<(), SchedulerError> {
        let inner = &self.inner;
        if inner.running.get() {
            return Ok(());
        }
        let speed = inner.clock_speed.get();
        if speed.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }
        // Stopped but not yet drained: that timer must not outlive this start.
        if let Some(stale) = inner.timer.take() {
            inner.timers.clear(stale);
        }

        let now = inner.timers.now();
        inner.publish(Tick {
            diff: Duration::ZERO,
            stamp: now,
        });

        let weak = Rc::downgrade(inner);
        let handle = inner.timers.set_interval(speed, move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_interval();
            }
        });
        inner.timer.set(Some(handle));
        inner.running.set(true);
        log::debug!("clock started every {speed:?}");
        Ok(())
    }

    pub fn stop(&self) {
        if self.inner.running.replace(false) {
            log::debug!("clock stopping at next tick boundary");
        }
    }
}

impl SchedulerInner {
    fn on_interval(&self) {
        let Some(_guard) = Processing::enter(&self.processing) else {
            log::trace!("clock tick dropped: previous tick still processing");
            return;
        };

        if !self.running.get()
            && let Some(handle) = self.timer.take()
        {
            self.timers.clear(handle);
            log::debug!("clock stopped");
        }

        let result = match Taken::take(&self.step) {
            Some(mut taken) => taken.get().map_or(Ok(()), |step| step()),
            None => Ok(()),
        };
        if let Err(err) = result {
            match Taken::take(&self.boundary) {
                Some(mut taken) => {
                    if let Some(boundary) = taken.get() {
                        boundary(err);
                    }
                }
                None => log::error!("clock step failed: {err:#}"),
            }
            return;
        }

        let now = self.timers.now();
        let diff = self
            .last_stamp
            .get()
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.publish(Tick { diff, stamp: now });
    }

    fn publish(&self, tick: Tick) {
        self.last_stamp.set(Some(tick.stamp));
        self.ticks.next(tick);
    }
}

impl Drop for SchedulerInner {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.take() {
            self.timers.clear(handle);
        }
    }
}

impl Capability for ClockScheduler {
    fn attach(&self, lifecycle: &Lifecycle) {
        let this = self.clone();
        lifecycle.on_init(move || {
            if this.inner.start_on_init.get()
                && let Err(err) = this.start()
            {
                log::error!("clock failed to start on init: {err}");
            }
        });
        let this = self.clone();
        lifecycle.on_destroy(move || this.stop());
    }
}
