use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cadence_core::*;
use web_time::Duration;

use crate::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// A chart panel: redraws on a clock, lays out on resize, and shows a
/// processing overlay until its first frame.
struct ChartPanel {
    lifecycle: Lifecycle,
    clock: ClockScheduler,
    resizable: Resizable,
    processing: ProcessingVisibility,
    layouts: Rc<RefCell<Vec<Size>>>,
    frames: Rc<Cell<u32>>,
}

impl ChartPanel {
    fn new(timers: &Timers, resize_events: &Subject<Size>) -> Self {
        let lifecycle = Lifecycle::new();
        let clock = ClockScheduler::new(
            timers,
            ClockConfig::default().start_on_init(true).clock_speed_ms(250),
        );
        let layouts = Rc::new(RefCell::new(Vec::new()));
        let l = layouts.clone();
        let resizable = Resizable::new(timers, resize_events, move |size| {
            l.borrow_mut().push(size)
        });
        let processing = ProcessingVisibility::new(timers, ProcessingConfig::default());
        lifecycle
            .attach(&clock)
            .attach(&resizable)
            .attach(&processing);

        let frames = Rc::new(Cell::new(0));
        let f = frames.clone();
        let overlay = processing.clone();
        clock.set_step(move || {
            f.set(f.get() + 1);
            if f.get() == 1 {
                overlay.set_processing(false, "");
            }
            Ok(())
        });

        Self {
            lifecycle,
            clock,
            resizable,
            processing,
            layouts,
            frames,
        }
    }
}

#[test]
fn test_panel_lifecycle() {
    init_logging();
    let clock = ManualClock::new();
    let timers = Timers::new(clock.clone());
    let events = Subject::new();
    let panel = ChartPanel::new(&timers, &events);

    panel.lifecycle.init();
    assert!(panel.clock.is_running());
    assert_eq!(panel.main_opacity(), 0.0);

    // Initial resize with the default size, and the overlay reveal.
    clock.run(&timers, ms(200));
    assert_eq!(*panel.layouts.borrow(), vec![Size::default()]);
    assert_eq!(panel.processing.processing_layer().opacity, 1.0);
    assert_eq!(panel.frames.get(), 0);

    // First frame hides the overlay.
    clock.run(&timers, ms(50));
    assert_eq!(panel.frames.get(), 1);
    assert_eq!(panel.processing.processing_layer().opacity, 0.0);
    assert_eq!(panel.main_opacity(), 1.0);

    events.next(Size::new(640.0, 480.0));
    events.next(Size::new(800.0, 600.0));
    clock.run(&timers, ms(100));
    assert_eq!(
        *panel.layouts.borrow(),
        vec![Size::default(), Size::new(800.0, 600.0)]
    );
    assert_eq!(panel.resizable.last_size(), Some(Size::new(800.0, 600.0)));

    panel.lifecycle.destroy();
    events.next(Size::new(1.0, 1.0));
    clock.run(&timers, ms(1_000));
    assert_eq!(panel.layouts.borrow().len(), 2);
    assert!(timers.is_empty());
    assert_eq!(events.observer_count(), 0);
}

#[test]
fn test_destroy_before_first_timers_fire() {
    let clock = ManualClock::new();
    let timers = Timers::new(clock.clone());
    let events = Subject::new();
    let panel = ChartPanel::new(&timers, &events);

    panel.lifecycle.init();
    panel.lifecycle.destroy();
    clock.run(&timers, ms(1_000));

    assert!(panel.layouts.borrow().is_empty());
    assert_eq!(panel.processing.processing_layer().opacity, 0.0);
    // The stopped scheduler still drains its one armed firing.
    assert_eq!(panel.frames.get(), 1);
    assert!(timers.is_empty());
}

impl ChartPanel {
    fn main_opacity(&self) -> f32 {
        self.processing.main_layer().opacity
    }
}
