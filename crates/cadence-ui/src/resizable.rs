//! Resize handling for hosts that lay themselves out from their size.
//!
//! Resize events arrive in bursts while a window is dragged; [`Resizable`]
//! funnels them through a [`Throttle`] so the host's handler runs at most once
//! per window, always with the most recent size.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cadence_core::{Capability, Lifecycle, Source, Subscriptions, TimerHandle, Timers};
use web_time::Duration;

use crate::throttle::Throttle;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub w: f32,
    pub h: f32,
}

impl Default for Size {
    fn default() -> Self {
        Self { w: 100.0, h: 100.0 }
    }
}

impl Size {
    pub fn new(w: f32, h: f32) -> Self {
        Self { w, h }
    }

    /// Size from computed CSS lengths such as `"640px"`, falling back to
    /// `defaults` per axis when a length has no leading integer.
    pub fn from_css(width: &str, height: &str, defaults: Size) -> Size {
        Size {
            w: leading_int(width).map_or(defaults.w, |v| v as f32),
            h: leading_int(height).map_or(defaults.h, |v| v as f32),
        }
    }
}

/// Integer prefix of `s` after leading whitespace: `"12.5px"` is 12, `"auto"` is none.
/// Parsed as a float so arbitrarily long digit runs still yield a value.
fn leading_int(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1.0, &s[1..]),
        Some(b'+') => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<f64>().ok().map(|v| sign * v)
}

#[derive(Clone, Debug)]
pub struct ResizeConfig {
    /// Throttle window for resize events.
    pub wait: Duration,
    /// Delay before the initial resize after init.
    pub initial_delay: Duration,
    /// Size reported when no resize event has arrived yet.
    pub defaults: Size,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            wait: Duration::from_millis(100),
            initial_delay: Duration::from_millis(100),
            defaults: Size::default(),
        }
    }
}

/// Capability that calls a host's resize handler, throttled.
#[derive(Clone)]
pub struct Resizable {
    inner: Rc<ResizableInner>,
}

struct ResizableInner {
    timers: Timers,
    config: ResizeConfig,
    throttle: Throttle<Size>,
    last: Rc<Cell<Option<Size>>>,
    subs: Subscriptions,
    initial: Cell<Option<TimerHandle>>,
}

impl Resizable {
    pub fn new<S>(timers: &Timers, events: &S, do_resize: impl FnMut(Size) + 'static) -> Self
    where
        S: Source<Size> + ?Sized,
    {
        Self::with_config(timers, events, ResizeConfig::default(), do_resize)
    }

    pub fn with_config<S>(
        timers: &Timers,
        events: &S,
        config: ResizeConfig,
        do_resize: impl FnMut(Size) + 'static,
    ) -> Self
    where
        S: Source<Size> + ?Sized,
    {
        let throttle = Throttle::new(timers, config.wait, do_resize);
        let last = Rc::new(Cell::new(None));
        let subs = Subscriptions::new();
        {
            let throttle = throttle.clone();
            let last = last.clone();
            subs.subscribe_to(
                Some(events),
                Some(move |size: Size| {
                    last.set(Some(size));
                    throttle.call(size);
                }),
            );
        }
        Self {
            inner: Rc::new(ResizableInner {
                timers: timers.clone(),
                config,
                throttle,
                last,
                subs,
                initial: Cell::new(None),
            }),
        }
    }

    /// Most recent size seen on the event source.
    pub fn last_size(&self) -> Option<Size> {
        self.inner.last.get()
    }

    /// Requests a resize with the current size, subject to the throttle.
    pub fn request_resize(&self) {
        self.inner.request_resize();
    }
}

impl ResizableInner {
    fn request_resize(&self) {
        let size = self.last.get().unwrap_or(self.config.defaults);
        self.throttle.call(size);
    }

    fn teardown(&self) {
        if let Some(handle) = self.initial.take() {
            self.timers.clear(handle);
        }
        self.subs.release_all();
        self.throttle.cancel();
    }
}

impl Capability for Resizable {
    fn attach(&self, lifecycle: &Lifecycle) {
        let weak = Rc::downgrade(&self.inner);
        lifecycle.on_init(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let again = Rc::downgrade(&inner);
            let handle = inner.timers.set_timeout(inner.config.initial_delay, move || {
                if let Some(inner) = again.upgrade() {
                    inner.initial.set(None);
                    inner.request_resize();
                }
            });
            inner.initial.set(Some(handle));
        });

        let weak = Rc::downgrade(&self.inner);
        lifecycle.on_destroy(move || {
            if let Some(inner) = weak.upgrade() {
                inner.teardown();
            }
        });
    }
}

impl Drop for ResizableInner {
    fn drop(&mut self) {
        self.teardown();
    }
}
