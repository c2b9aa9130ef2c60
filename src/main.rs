use std::time::{Duration, Instant};

use calloop::timer::{TimeoutAction, Timer};
use calloop::{Dispatcher, EventLoop};
use clap::{Parser, ValueEnum};

use hptouchpad_drv::config::{Config, Orientation, LIFTOFF_TIMEOUT};
use hptouchpad_drv::device::{priority, serial::SerialDevice, sink};
use hptouchpad_drv::engine::Engine;
use hptouchpad_drv::error::DriverError;
use hptouchpad_drv::event_loop::SerialSource;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOrientation {
    Normal,
    Rotated270,
}

impl From<CliOrientation> for Orientation {
    fn from(value: CliOrientation) -> Self {
        match value {
            CliOrientation::Normal => Orientation::Normal,
            CliOrientation::Rotated270 => Orientation::Rotated270,
        }
    }
}

/// Userspace touchscreen driver for the Cypress CTMA395 panel.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the panel's serial character device.
    #[arg(long, default_value = "/dev/ctp_uart")]
    device: String,

    /// Panel mounting orientation.
    #[arg(long, value_enum, default_value = "normal")]
    orientation: CliOrientation,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), DriverError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config { device_path: cli.device, orientation: cli.orientation.into() };

    priority::request_realtime_priority();

    log::info!("opening serial device {}", config.device_path);
    let serial = SerialDevice::open(&config.device_path)?;

    log::info!("creating uinput touch device");
    let sink = sink::create(&config)?;

    let engine = std::rc::Rc::new(std::cell::RefCell::new(Engine::new(&config)));
    let sink = std::rc::Rc::new(std::cell::RefCell::new(sink));

    let mut event_loop: EventLoop<()> =
        EventLoop::try_new().map_err(|e| DriverError::EventLoop(e.to_string()))?;
    let handle = event_loop.handle();

    // Inserted before the serial source so its registration token exists
    // by the time the serial callback needs to re-arm it: every byte
    // read pushes the deadline back out by LIFTOFF_TIMEOUT, matching the
    // original driver's select() loop re-arming its 25ms window from the
    // last read rather than firing on a fixed, read-independent cadence.
    let timer = Timer::from_duration(LIFTOFF_TIMEOUT);
    let engine_for_timer = engine.clone();
    let sink_for_timer = sink.clone();
    let timer_token = handle
        .insert_source(timer, move |_deadline, _metadata, _data| {
            let events = engine_for_timer.borrow_mut().on_idle_timeout();
            if !events.is_empty() {
                if let Err(e) = sink_for_timer.borrow_mut().emit(&events) {
                    log::warn!("failed to emit liftoff events: {e}");
                }
            }
            TimeoutAction::ToDuration(LIFTOFF_TIMEOUT)
        })
        .map_err(|e| DriverError::EventLoop(e.error.to_string()))?;

    let source = SerialSource::new(serial);
    let engine_for_fd = engine.clone();
    let sink_for_fd = sink.clone();
    let handle_for_fd = handle.clone();
    handle
        .insert_source(source, move |bytes, _metadata, _data| {
            let events = engine_for_fd.borrow_mut().feed(&bytes);
            if !events.is_empty() {
                if let Err(e) = sink_for_fd.borrow_mut().emit(&events) {
                    log::warn!("failed to emit touch events: {e}");
                }
            }
            handle_for_fd.update_timeout(&timer_token, Instant::now() + LIFTOFF_TIMEOUT);
            Ok(())
        })
        .map_err(|e| DriverError::EventLoop(e.error.to_string()))?;

    log::info!("entering event loop");
    event_loop
        .run(Duration::from_secs(1), &mut (), |_| {})
        .map_err(|e| DriverError::EventLoop(e.to_string()))?;

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}
