//! Cross-fade between a host's main layer and its "processing" overlay.
//!
//! [`ProcessingVisibility`] only keeps style state; the host reads
//! [`processing_layer`](ProcessingVisibility::processing_layer) and
//! [`main_layer`](ProcessingVisibility::main_layer) when it draws.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cadence_core::{Capability, Lifecycle, TimerHandle, Timers};
use web_time::Duration;

/// Delay between the fade transition being installed and the initial reveal
/// of the processing layer.
const REVEAL_DELAY: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerStyle {
    pub opacity: f32,
    /// Whether the layer receives pointer input.
    pub pointer_events: bool,
    /// Opacity transition length, once installed.
    pub transition: Option<Duration>,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            pointer_events: true,
            transition: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProcessingConfig {
    /// Show the processing layer shortly after init instead of the main layer.
    pub init_processing: bool,
    pub fade_speed: Duration,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            init_processing: true,
            fade_speed: Duration::from_millis(360),
        }
    }
}

#[derive(Default)]
struct State {
    processing: bool,
    message: String,
    initiated: bool,
    processing_layer: LayerStyle,
    main_layer: LayerStyle,
}

#[derive(Clone)]
pub struct ProcessingVisibility {
    inner: Rc<ProcessingInner>,
}

struct ProcessingInner {
    timers: Timers,
    config: ProcessingConfig,
    state: RefCell<State>,
    setup: Cell<Option<TimerHandle>>,
    reveal: Cell<Option<TimerHandle>>,
}

impl ProcessingVisibility {
    pub fn new(timers: &Timers, config: ProcessingConfig) -> Self {
        Self {
            inner: Rc::new(ProcessingInner {
                timers: timers.clone(),
                config,
                state: RefCell::new(State::default()),
                setup: Cell::new(None),
                reveal: Cell::new(None),
            }),
        }
    }

    /// Switches between the processing layer and the main layer.
    ///
    /// Once this has been called the initial reveal scheduled by init no
    /// longer changes either layer.
    pub fn set_processing(&self, on: bool, message: impl Into<String>) {
        let mut st = self.inner.state.borrow_mut();
        st.initiated = true;
        st.processing = on;
        st.message = message.into();
        st.processing_layer.opacity = if on { 1.0 } else { 0.0 };
        st.main_layer.opacity = if on { 0.0 } else { 1.0 };
        st.main_layer.pointer_events = !on;
        log::debug!("processing {} {:?}", if on { "on" } else { "off" }, st.message);
    }

    pub fn is_processing(&self) -> bool {
        self.inner.state.borrow().processing
    }

    pub fn message(&self) -> String {
        self.inner.state.borrow().message.clone()
    }

    pub fn processing_layer(&self) -> LayerStyle {
        self.inner.state.borrow().processing_layer
    }

    pub fn main_layer(&self) -> LayerStyle {
        self.inner.state.borrow().main_layer
    }

    pub fn is_initiated(&self) -> bool {
        self.inner.state.borrow().initiated
    }
}

impl ProcessingInner {
    fn begin(self: &Rc<Self>) {
        {
            let mut st = self.state.borrow_mut();
            st.processing_layer.opacity = 0.0;
            st.main_layer.opacity = 0.0;
        }
        let weak = Rc::downgrade(self);
        let handle = self.timers.set_timeout(Duration::ZERO, move || {
            if let Some(inner) = weak.upgrade() {
                inner.setup.set(None);
                inner.install_transitions();
            }
        });
        self.setup.set(Some(handle));
    }

    fn install_transitions(self: &Rc<Self>) {
        let fade = Some(self.config.fade_speed);
        {
            let mut st = self.state.borrow_mut();
            st.processing_layer.transition = fade;
            st.main_layer.transition = fade;
        }
        if !self.config.init_processing {
            let mut st = self.state.borrow_mut();
            if !st.initiated {
                st.main_layer.opacity = 1.0;
            }
            st.initiated = true;
            return;
        }
        let weak = Rc::downgrade(self);
        let handle = self.timers.set_timeout(REVEAL_DELAY, move || {
            if let Some(inner) = weak.upgrade() {
                inner.reveal.set(None);
                let mut st = inner.state.borrow_mut();
                if !st.initiated {
                    st.processing_layer.opacity = 1.0;
                }
                st.initiated = true;
            }
        });
        self.reveal.set(Some(handle));
    }

    fn clear_timers(&self) {
        for slot in [&self.setup, &self.reveal] {
            if let Some(handle) = slot.take() {
                self.timers.clear(handle);
            }
        }
    }
}

impl Capability for ProcessingVisibility {
    fn attach(&self, lifecycle: &Lifecycle) {
        let weak = Rc::downgrade(&self.inner);
        lifecycle.on_init(move || {
            if let Some(inner) = weak.upgrade() {
                inner.begin();
            }
        });

        let weak = Rc::downgrade(&self.inner);
        lifecycle.on_destroy(move || {
            if let Some(inner) = weak.upgrade() {
                inner.clear_timers();
            }
        });
    }
}

impl Drop for ProcessingInner {
    fn drop(&mut self) {
        self.clear_timers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::ManualClock;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup(config: ProcessingConfig) -> (ManualClock, Timers, Lifecycle, ProcessingVisibility) {
        let clock = ManualClock::new();
        let timers = Timers::new(clock.clone());
        let lifecycle = Lifecycle::new();
        let vis = ProcessingVisibility::new(&timers, config);
        lifecycle.attach(&vis);
        (clock, timers, lifecycle, vis)
    }

    #[test]
    fn test_set_processing_swaps_layers() {
        let (_, _, _, vis) = setup(ProcessingConfig::default());
        vis.set_processing(true, "Saving");
        assert!(vis.is_processing());
        assert_eq!(vis.message(), "Saving");
        assert_eq!(vis.processing_layer().opacity, 1.0);
        assert_eq!(vis.main_layer().opacity, 0.0);
        assert!(!vis.main_layer().pointer_events);

        vis.set_processing(false, "");
        assert_eq!(vis.processing_layer().opacity, 0.0);
        assert_eq!(vis.main_layer().opacity, 1.0);
        assert!(vis.main_layer().pointer_events);
        assert!(vis.is_initiated());
    }

    #[test]
    fn test_init_reveals_processing_layer_after_delay() {
        let (clock, timers, lifecycle, vis) = setup(ProcessingConfig::default());
        lifecycle.init();
        assert_eq!(vis.processing_layer().opacity, 0.0);
        assert_eq!(vis.main_layer().opacity, 0.0);
        assert_eq!(vis.main_layer().transition, None);

        timers.run_due();
        assert_eq!(vis.main_layer().transition, Some(ms(360)));
        assert_eq!(vis.processing_layer().transition, Some(ms(360)));
        assert!(!vis.is_initiated());

        clock.run(&timers, ms(99));
        assert_eq!(vis.processing_layer().opacity, 0.0);
        clock.run(&timers, ms(1));
        assert_eq!(vis.processing_layer().opacity, 1.0);
        assert_eq!(vis.main_layer().opacity, 0.0);
        assert!(vis.is_initiated());
        // The reveal only fades the overlay in; the flag is the host's to set.
        assert!(!vis.is_processing());
    }

    #[test]
    fn test_early_set_processing_wins_over_reveal() {
        let (clock, timers, lifecycle, vis) = setup(ProcessingConfig::default());
        lifecycle.init();
        timers.run_due();
        vis.set_processing(false, "");
        clock.run(&timers, ms(200));
        assert_eq!(vis.processing_layer().opacity, 0.0);
        assert_eq!(vis.main_layer().opacity, 1.0);
    }

    #[test]
    fn test_without_init_processing_main_layer_shows() {
        let config = ProcessingConfig {
            init_processing: false,
            ..ProcessingConfig::default()
        };
        let (_, timers, lifecycle, vis) = setup(config);
        lifecycle.init();
        assert_eq!(vis.main_layer().opacity, 0.0);
        timers.run_due();
        assert_eq!(vis.main_layer().opacity, 1.0);
        assert_eq!(vis.processing_layer().opacity, 0.0);
        assert!(vis.is_initiated());
        assert!(timers.is_empty());
    }

    #[test]
    fn test_destroy_clears_pending_timers() {
        let (clock, timers, lifecycle, vis) = setup(ProcessingConfig::default());
        lifecycle.init();
        timers.run_due();
        assert_eq!(timers.len(), 1);
        lifecycle.destroy();
        assert!(timers.is_empty());
        clock.run(&timers, ms(500));
        assert_eq!(vis.processing_layer().opacity, 0.0);
        assert!(!vis.is_initiated());
    }
}
