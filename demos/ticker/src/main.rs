use std::cell::Cell;
use std::rc::Rc;

use anyhow::bail;
use cadence_core::prelude::*;
use cadence_ui::{ProcessingConfig, ProcessingVisibility};
use web_time::Duration;

struct Ticker {
    lifecycle: Lifecycle,
    clock: ClockScheduler,
    subs: Subscriptions,
    processing: ProcessingVisibility,
}

fn ticker(timers: &Timers) -> Ticker {
    let lifecycle = Lifecycle::new();
    let clock = ClockScheduler::new(
        timers,
        ClockConfig::default().start_on_init(true).clock_speed_ms(200),
    );
    let subs = Subscriptions::new();
    let processing = ProcessingVisibility::new(timers, ProcessingConfig::default());
    lifecycle.attach(&clock).attach(&subs).attach(&processing);

    let frame = Rc::new(Cell::new(0u32));
    let overlay = processing.clone();
    clock.set_step(move || {
        frame.set(frame.get() + 1);
        match frame.get() {
            1 => overlay.set_processing(false, ""),
            3 => bail!("frame {} dropped", frame.get()),
            _ => {}
        }
        Ok(())
    });
    clock.set_error_boundary(|err| log::warn!("step failed: {err:#}"));

    subs.subscribe_to(
        Some(&clock.ticks()),
        Some(|tick: Tick| log::info!("tick +{}ms", tick.diff_ms())),
    );

    Ticker {
        lifecycle,
        clock,
        subs,
        processing,
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let timers = Timers::system();
    let app = ticker(&timers);
    app.lifecycle.init();

    let first = app.subs.when(Some(&app.clock.ticks()));
    let tick = pollster::block_on(first)?;
    log::info!("first tick at {:?}", tick.stamp);

    timers.pump_for(Duration::from_secs(1));
    log::info!(
        "main layer opacity {}, processing {}",
        app.processing.main_layer().opacity,
        app.processing.is_processing()
    );

    app.lifecycle.destroy();
    timers.pump_for(Duration::from_millis(250));
    if !timers.is_empty() {
        bail!("{} timers still armed after destroy", timers.len());
    }
    Ok(())
}
