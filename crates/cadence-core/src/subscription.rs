use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Cancellation token for an observation of an event source.
///
/// Clones refer to the same subscription. The teardown runs at most once no
/// matter how many clones call [`unsubscribe`](Self::unsubscribe).
#[derive(Clone)]
pub struct Subscription(Rc<Inner>);

struct Inner {
    closed: Cell<bool>,
    teardown: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(Inner {
            closed: Cell::new(false),
            teardown: RefCell::new(Some(Box::new(teardown))),
        }))
    }

    /// An already-closed subscription, for sources that finish during `subscribe`.
    pub fn empty() -> Self {
        Self(Rc::new(Inner {
            closed: Cell::new(true),
            teardown: RefCell::new(None),
        }))
    }

    pub fn unsubscribe(&self) {
        if self.0.closed.replace(true) {
            return;
        }
        let teardown = self.0.teardown.borrow_mut().take();
        if let Some(f) = teardown {
            f();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.0.closed.get()
    }

    pub fn ptr_eq(&self, other: &Subscription) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}
