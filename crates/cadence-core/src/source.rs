//! Push-based event sources.
//!
//! A [`Source`] delivers zero or more values and may end in an error or a
//! completion. [`Subject`] is the multicast source hosts publish through; the
//! scheduler's tick channel is one. [`of`], [`fail`] and [`never`] are small
//! fixed sources, mostly handy in tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};

use crate::error::SourceError;
use crate::subscription::Subscription;

#[derive(Clone, Debug)]
pub enum Notification<T> {
    Next(T),
    Error(SourceError),
    Complete,
}

pub type Observer<T> = Box<dyn FnMut(Notification<T>)>;

/// The capability of being subscribed to.
pub trait Source<T> {
    fn subscribe(&self, observer: Observer<T>) -> Subscription;
}

impl<T, S: Source<T> + ?Sized> Source<T> for Rc<S> {
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        (**self).subscribe(observer)
    }
}

new_key_type! {
    struct ObserverKey;
}

#[derive(Clone)]
enum Terminal {
    Errored(SourceError),
    Completed,
}

impl Terminal {
    fn notification<T>(&self) -> Notification<T> {
        match self {
            Terminal::Errored(e) => Notification::Error(e.clone()),
            Terminal::Completed => Notification::Complete,
        }
    }
}

struct SubjectState<T> {
    observers: SlotMap<ObserverKey, Rc<RefCell<Observer<T>>>>,
    latest: Option<T>,
    replay: bool,
    terminal: Option<Terminal>,
    /// Set while a broadcast runs; emissions made meanwhile wait in `pending`.
    emitting: bool,
    pending: VecDeque<Notification<T>>,
}

/// Releases the emitting flag when the outermost broadcast ends, even by
/// unwinding. Anything still queued at that point is dropped.
struct Emitting<'a, T>(&'a RefCell<SubjectState<T>>);

impl<T> Drop for Emitting<'_, T> {
    fn drop(&mut self) {
        let mut s = self.0.borrow_mut();
        s.emitting = false;
        s.pending.clear();
    }
}

/// Multicast source. Clones share observers.
///
/// Emitting from inside an observer is allowed: the nested value is queued
/// and broadcast once the current one has reached every observer, so all
/// observers see values in emission order.
pub struct Subject<T: 'static>(Rc<RefCell<SubjectState<T>>>);

impl<T: 'static> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Clone + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Subject<T> {
    pub fn new() -> Self {
        Self::build(None, false)
    }

    /// A subject that replays its latest value to every new subscriber.
    pub fn replaying() -> Self {
        Self::build(None, true)
    }

    /// Replaying subject seeded with `value`.
    pub fn with_latest(value: T) -> Self {
        Self::build(Some(value), true)
    }

    fn build(latest: Option<T>, replay: bool) -> Self {
        Self(Rc::new(RefCell::new(SubjectState {
            observers: SlotMap::with_key(),
            latest,
            replay,
            terminal: None,
            emitting: false,
            pending: VecDeque::new(),
        })))
    }

    pub fn latest(&self) -> Option<T> {
        self.0.borrow().latest.clone()
    }

    pub fn observer_count(&self) -> usize {
        self.0.borrow().observers.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.0.borrow().terminal.is_some()
    }

    pub fn next(&self, value: T) {
        {
            let mut s = self.0.borrow_mut();
            if s.terminal.is_some() {
                return;
            }
            s.latest = Some(value.clone());
        }
        self.emit(Notification::Next(value));
    }

    pub fn error(&self, err: SourceError) {
        self.terminate(Terminal::Errored(err));
    }

    pub fn complete(&self) {
        self.terminate(Terminal::Completed);
    }

    fn terminate(&self, terminal: Terminal) {
        {
            let mut s = self.0.borrow_mut();
            if s.terminal.is_some() {
                return;
            }
            s.terminal = Some(terminal.clone());
        }
        self.emit(terminal.notification());
    }

    fn emit(&self, n: Notification<T>) {
        {
            let mut s = self.0.borrow_mut();
            if s.emitting {
                s.pending.push_back(n);
                return;
            }
            s.emitting = true;
        }
        let _emitting = Emitting(&self.0);
        let mut next = Some(n);
        while let Some(n) = next {
            self.broadcast(n);
            next = self.0.borrow_mut().pending.pop_front();
        }
    }

    fn broadcast(&self, n: Notification<T>) {
        let keys: Vec<ObserverKey> = self.0.borrow().observers.keys().collect();
        let terminal = !matches!(n, Notification::Next(_));
        for key in keys {
            self.deliver(key, n.clone());
        }
        if terminal {
            self.0.borrow_mut().observers.clear();
        }
    }

    fn deliver(&self, key: ObserverKey, n: Notification<T>) {
        // Re-checked per key: an observer removed earlier in this broadcast
        // must not see the value.
        let observer = {
            let s = self.0.borrow();
            s.observers.get(key).cloned()
        };
        let Some(observer) = observer else {
            return;
        };
        match observer.try_borrow_mut() {
            Ok(mut f) => (*f)(n),
            // Only reachable when an observer is still running its replay.
            Err(_) => log::trace!("subject: observer {key:?} busy, delivery skipped"),
        }
    }
}

impl<T: Clone + 'static> Source<T> for Subject<T> {
    fn subscribe(&self, mut observer: Observer<T>) -> Subscription {
        let (terminal, replay) = {
            let s = self.0.borrow();
            let replay = if s.replay { s.latest.clone() } else { None };
            (s.terminal.clone(), replay)
        };
        if let Some(terminal) = terminal {
            observer(terminal.notification());
            return Subscription::empty();
        }

        let observer = Rc::new(RefCell::new(observer));
        let key = self.0.borrow_mut().observers.insert(observer.clone());
        let weak = Rc::downgrade(&self.0);
        let sub = Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().observers.remove(key);
            }
        });

        if let Some(value) = replay {
            (*observer.borrow_mut())(Notification::Next(value));
        }
        sub
    }
}

/// Emits every value, then completes, all during `subscribe`.
pub struct Of<T>(Vec<T>);

pub fn of<T: Clone>(values: impl IntoIterator<Item = T>) -> Of<T> {
    Of(values.into_iter().collect())
}

impl<T: Clone> Source<T> for Of<T> {
    fn subscribe(&self, mut observer: Observer<T>) -> Subscription {
        for v in &self.0 {
            observer(Notification::Next(v.clone()));
        }
        observer(Notification::Complete);
        Subscription::empty()
    }
}

/// Fails immediately on subscribe.
pub struct Fail(SourceError);

pub fn fail(err: SourceError) -> Fail {
    Fail(err)
}

impl<T> Source<T> for Fail {
    fn subscribe(&self, mut observer: Observer<T>) -> Subscription {
        observer(Notification::Error(self.0.clone()));
        Subscription::empty()
    }
}

/// Never emits and never terminates.
pub struct Never;

pub fn never() -> Never {
    Never
}

impl<T> Source<T> for Never {
    fn subscribe(&self, _observer: Observer<T>) -> Subscription {
        Subscription::new(|| ())
    }
}
