//! # Capabilities for UI hosts
//!
//! Cadence attaches cross-cutting behavior to a host component by
//! composition instead of inheritance. A host owns a [`Lifecycle`] and
//! attaches capabilities to it; each capability registers init/destroy hooks
//! that run in attachment order.
//!
//! - [`ClockScheduler`]: runs a step on a fixed interval and publishes a
//!   [`Tick`] after each one, never overlapping itself.
//! - [`Subscriptions`]: tracks subscriptions to event sources and cancels
//!   them on destroy, plus a one-shot [`when`](Subscriptions::when) wait.
//!
//! Everything is single-threaded. Timers fire when the host loop drives the
//! [`Timers`] queue.
//!
//! ```rust
//! use cadence_core::*;
//! use web_time::Duration;
//!
//! let clock = ManualClock::new();
//! let timers = Timers::new(clock.clone());
//!
//! let lifecycle = Lifecycle::new();
//! let scheduler = ClockScheduler::new(
//!     &timers,
//!     ClockConfig::default().start_on_init(true).clock_speed_ms(100),
//! );
//! let subs = Subscriptions::new();
//! lifecycle.attach(&scheduler).attach(&subs);
//!
//! let ticks = std::rc::Rc::new(std::cell::Cell::new(0));
//! let t = ticks.clone();
//! subs.subscribe_to(Some(&scheduler.ticks()), Some(move |_tick: Tick| t.set(t.get() + 1)));
//!
//! lifecycle.init();
//! clock.run(&timers, Duration::from_millis(300));
//! lifecycle.destroy();
//!
//! assert_eq!(ticks.get(), 4);
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod prelude;
pub mod scheduler;
pub mod source;
pub mod subscription;
pub mod subscriptions;
pub mod timer;


pub use prelude::*;
