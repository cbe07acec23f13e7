use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cadence_core::{TimerHandle, Timers};
use web_time::Duration;

/// Trailing-edge throttle: calls inside a `wait` window collapse into one
/// invocation carrying the latest value, made when the window closes.
pub struct Throttle<T: 'static> {
    inner: Rc<ThrottleInner<T>>,
}

impl<T: 'static> Clone for Throttle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct ThrottleInner<T> {
    timers: Timers,
    wait: Duration,
    pending: RefCell<Option<T>>,
    timer: Cell<Option<TimerHandle>>,
    callback: RefCell<Box<dyn FnMut(T)>>,
}

impl<T: 'static> Throttle<T> {
    pub fn new(timers: &Timers, wait: Duration, callback: impl FnMut(T) + 'static) -> Self {
        Self {
            inner: Rc::new(ThrottleInner {
                timers: timers.clone(),
                wait,
                pending: RefCell::new(None),
                timer: Cell::new(None),
                callback: RefCell::new(Box::new(callback)),
            }),
        }
    }

    pub fn call(&self, value: T) {
        let inner = &self.inner;
        *inner.pending.borrow_mut() = Some(value);
        if inner.timer.get().is_some() {
            return;
        }
        let weak = Rc::downgrade(inner);
        let handle = inner.timers.set_timeout(inner.wait, move || {
            if let Some(inner) = weak.upgrade() {
                inner.flush();
            }
        });
        inner.timer.set(Some(handle));
    }

    /// Drops the pending call, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.inner.timer.take() {
            self.inner.timers.clear(handle);
        }
        self.inner.pending.borrow_mut().take();
    }

    pub fn is_pending(&self) -> bool {
        self.inner.timer.get().is_some()
    }
}

impl<T> ThrottleInner<T> {
    fn flush(&self) {
        self.timer.set(None);
        let Some(value) = self.pending.borrow_mut().take() else {
            return;
        };
        (*self.callback.borrow_mut())(value);
    }
}

impl<T> Drop for ThrottleInner<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.take() {
            self.timers.clear(handle);
        }
    }
}
