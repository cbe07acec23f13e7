use std::cell::{Cell, RefCell};
use std::rc::Rc;

use smallvec::SmallVec;

type Hook = Box<dyn FnOnce()>;
type Hooks = SmallVec<[Hook; 4]>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Created,
    Initialized,
    Destroyed,
}

/// Init/destroy signals of a host component.
///
/// Capabilities register hooks when attached; each signal runs its hooks in
/// attachment order, so a capability attached later always runs after the
/// ones it was layered on. Clones share the same hooks and phase.
#[derive(Clone, Default)]
pub struct Lifecycle {
    inner: Rc<LifecycleInner>,
}

#[derive(Default)]
struct LifecycleInner {
    phase: Cell<Phase>,
    init_hooks: RefCell<Hooks>,
    destroy_hooks: RefCell<Hooks>,
}

/// A behavior unit that can be composed into a host.
pub trait Capability {
    fn attach(&self, lifecycle: &Lifecycle);
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    pub fn attach(&self, capability: &impl Capability) -> &Self {
        capability.attach(self);
        self
    }

    /// Registers an init hook. Attached after init already ran, it runs now.
    pub fn on_init(&self, hook: impl FnOnce() + 'static) {
        if self.phase() == Phase::Created {
            self.inner.init_hooks.borrow_mut().push(Box::new(hook));
        } else if self.phase() == Phase::Initialized {
            hook();
        } else {
            log::debug!("lifecycle: init hook registered after destroy; ignored");
        }
    }

    /// Registers a destroy hook. Attached after destroy already ran, it runs now.
    pub fn on_destroy(&self, hook: impl FnOnce() + 'static) {
        if self.phase() == Phase::Destroyed {
            hook();
        } else {
            self.inner.destroy_hooks.borrow_mut().push(Box::new(hook));
        }
    }

    pub fn init(&self) {
        match self.phase() {
            Phase::Created => {}
            phase => {
                log::warn!("lifecycle: init signalled in phase {phase:?}; ignored");
                return;
            }
        }
        self.inner.phase.set(Phase::Initialized);
        log::debug!("lifecycle: init");
        Self::run(&self.inner.init_hooks);
    }

    pub fn destroy(&self) {
        if self.phase() == Phase::Destroyed {
            log::warn!("lifecycle: destroy signalled twice; ignored");
            return;
        }
        self.inner.phase.set(Phase::Destroyed);
        log::debug!("lifecycle: destroy");
        // Never initialised: pending init hooks are dropped with the host.
        self.inner.init_hooks.borrow_mut().clear();
        Self::run(&self.inner.destroy_hooks);
    }

    fn run(hooks: &RefCell<Hooks>) {
        // Hooks may register more hooks while running; drain until empty.
        loop {
            let batch = std::mem::take(&mut *hooks.borrow_mut());
            if batch.is_empty() {
                break;
            }
            for hook in batch {
                hook();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Capability for Recorder {
        fn attach(&self, lifecycle: &Lifecycle) {
            let (name, log) = (self.name, self.log.clone());
            lifecycle.on_init(move || log.borrow_mut().push(format!("{name}:init")));
            let (name, log) = (self.name, self.log.clone());
            lifecycle.on_destroy(move || log.borrow_mut().push(format!("{name}:destroy")));
        }
    }

    #[test]
    fn test_hooks_run_in_attachment_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let lifecycle = Lifecycle::new();
        lifecycle
            .attach(&Recorder {
                name: "base",
                log: log.clone(),
            })
            .attach(&Recorder {
                name: "clock",
                log: log.clone(),
            });

        lifecycle.init();
        lifecycle.destroy();
        assert_eq!(
            *log.borrow(),
            vec!["base:init", "clock:init", "base:destroy", "clock:destroy"]
        );
    }

    #[test]
    fn test_signals_run_once() {
        let count = Rc::new(Cell::new(0));
        let lifecycle = Lifecycle::new();
        let c = count.clone();
        lifecycle.on_init(move || c.set(c.get() + 1));

        lifecycle.init();
        lifecycle.init();
        assert_eq!(count.get(), 1);
        assert_eq!(lifecycle.phase(), Phase::Initialized);

        lifecycle.destroy();
        lifecycle.destroy();
        lifecycle.init();
        assert_eq!(lifecycle.phase(), Phase::Destroyed);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_late_attach_runs_immediately() {
        let lifecycle = Lifecycle::new();
        lifecycle.init();
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        lifecycle.on_init(move || r.set(true));
        assert!(ran.get());
    }

    #[test]
    fn test_destroy_without_init_skips_init_hooks() {
        let lifecycle = Lifecycle::new();
        let inits = Rc::new(Cell::new(0));
        let destroys = Rc::new(Cell::new(0));
        let (i, d) = (inits.clone(), destroys.clone());
        lifecycle.on_init(move || i.set(i.get() + 1));
        lifecycle.on_destroy(move || d.set(d.get() + 1));

        lifecycle.destroy();
        assert_eq!((inits.get(), destroys.get()), (0, 1));
    }
}
