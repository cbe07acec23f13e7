//! Managed subscriptions for a host.
//!
//! [`Subscriptions`] keeps every subscription it creates and cancels them all
//! when the host is destroyed. It offers two ways to observe a source with
//! deliberately different failure policies:
//!
//! - [`subscribe_to`](Subscriptions::subscribe_to) is for durable background
//!   observation. A failing source never reaches the host; the callback just
//!   stops firing.
//! - [`when`](Subscriptions::when) waits for exactly one value and reports a
//!   failure to the caller waiting on it.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

use crate::error::WaitError;
use crate::lifecycle::{Capability, Lifecycle};
use crate::source::{Notification, Source};
use crate::subscription::Subscription;

/// Delivery state of a durable subscription. `Suppressed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Delivery {
    Active,
    Suppressed,
}

type Registry = RefCell<Vec<Subscription>>;

#[derive(Clone, Default)]
pub struct Subscriptions {
    registry: Rc<Registry>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `callback` to `source` and tracks the subscription.
    ///
    /// Missing source or callback is a silent no-op. A source failure is
    /// swallowed and permanently silences this subscription only.
    pub fn subscribe_to<T, S, F>(
        &self,
        source: Option<&S>,
        callback: Option<F>,
    ) -> Option<Subscription>
    where
        T: 'static,
        S: Source<T> + ?Sized,
        F: FnMut(T) + 'static,
    {
        let (Some(source), Some(mut callback)) = (source, callback) else {
            log::trace!("subscribe_to: no source or callback; nothing subscribed");
            return None;
        };

        let mut delivery = Delivery::Active;
        let sub = source.subscribe(Box::new(move |n| match n {
            Notification::Next(value) => {
                if delivery == Delivery::Active {
                    callback(value);
                }
            }
            Notification::Error(err) => {
                if delivery == Delivery::Active {
                    log::debug!("subscribe_to: source failed, callback silenced: {err}");
                }
                delivery = Delivery::Suppressed;
            }
            Notification::Complete => {}
        }));
        register(&self.registry, sub.clone());
        Some(sub)
    }

    /// Waits for the first value of `source`, then detaches from it.
    pub fn when<T, S>(&self, source: Option<&S>) -> When<T>
    where
        T: 'static,
        S: Source<T> + ?Sized,
    {
        let Some(source) = source else {
            return When::settled(Err(WaitError::NoSource));
        };

        let slot: Rc<RefCell<WaitSlot<T>>> = Rc::new(RefCell::new(WaitSlot::default()));
        let guard: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let observer = {
            let slot = slot.clone();
            let guard = guard.clone();
            let registry = Rc::downgrade(&self.registry);
            Box::new(move |n: Notification<T>| {
                let outcome = match n {
                    Notification::Next(value) => Ok(value),
                    Notification::Error(err) => Err(WaitError::Failed(err)),
                    Notification::Complete => Err(WaitError::Completed),
                };
                if settle(&slot, outcome) {
                    let own = guard.borrow_mut().take();
                    if let Some(own) = own {
                        release(&registry, &own);
                    }
                }
            })
        };
        let upstream = source.subscribe(observer);

        // Settled while subscribing: never registered.
        if slot.borrow().settled {
            upstream.unsubscribe();
            return When { slot, own: None };
        }

        let own = {
            let slot = Rc::downgrade(&slot);
            Subscription::new(move || {
                upstream.unsubscribe();
                if let Some(slot) = slot.upgrade() {
                    settle(&slot, Err(WaitError::Cancelled));
                }
            })
        };
        *guard.borrow_mut() = Some(own.clone());
        register(&self.registry, own.clone());
        When {
            slot,
            own: Some((Rc::downgrade(&self.registry), own)),
        }
    }

    /// Cancels every tracked subscription. Safe to call repeatedly.
    pub fn release_all(&self) {
        let drained = std::mem::take(&mut *self.registry.borrow_mut());
        if drained.is_empty() {
            return;
        }
        log::debug!("releasing {} subscriptions", drained.len());
        for sub in drained {
            sub.unsubscribe();
        }
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn register(registry: &Registry, sub: Subscription) {
    if sub.is_closed() {
        return;
    }
    let mut r = registry.borrow_mut();
    r.retain(|s| !s.is_closed());
    r.push(sub);
}

fn release(registry: &Weak<Registry>, sub: &Subscription) {
    sub.unsubscribe();
    if let Some(registry) = registry.upgrade() {
        registry.borrow_mut().retain(|s| !s.ptr_eq(sub));
    }
}

impl Capability for Subscriptions {
    fn attach(&self, lifecycle: &Lifecycle) {
        let this = self.clone();
        lifecycle.on_destroy(move || this.release_all());
    }
}

struct WaitSlot<T> {
    settled: bool,
    outcome: Option<Result<T, WaitError>>,
    waker: Option<Waker>,
}

impl<T> Default for WaitSlot<T> {
    fn default() -> Self {
        Self {
            settled: false,
            outcome: None,
            waker: None,
        }
    }
}

/// Records the first outcome only; returns whether this call settled the slot.
fn settle<T>(slot: &RefCell<WaitSlot<T>>, outcome: Result<T, WaitError>) -> bool {
    let waker = {
        let mut s = slot.borrow_mut();
        if s.settled {
            return false;
        }
        s.settled = true;
        s.outcome = Some(outcome);
        s.waker.take()
    };
    if let Some(waker) = waker {
        waker.wake();
    }
    true
}

/// Future returned by [`Subscriptions::when`].
///
/// Resolves exactly once; polling again after it resolved stays pending.
/// Dropping an unsettled wait detaches it from its source.
#[must_use = "a wait does nothing unless polled or checked"]
pub struct When<T> {
    slot: Rc<RefCell<WaitSlot<T>>>,
    own: Option<(Weak<Registry>, Subscription)>,
}

impl<T> Drop for When<T> {
    fn drop(&mut self) {
        if let Some((registry, own)) = self.own.take()
            && !own.is_closed()
        {
            release(&registry, &own);
        }
    }
}

impl<T> When<T> {
    fn settled(outcome: Result<T, WaitError>) -> Self {
        Self {
            slot: Rc::new(RefCell::new(WaitSlot {
                settled: true,
                outcome: Some(outcome),
                waker: None,
            })),
            own: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.slot.borrow().settled
    }
}

impl<T> Future for When<T> {
    type Output = Result<T, WaitError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut s = self.slot.borrow_mut();
        match s.outcome.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                if !s.settled {
                    s.waker = Some(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}
