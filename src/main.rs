use anyhow::Context;
use clap::Parser;
use log::{error, info};
use pantilt::{
    config::{Backend, Settings},
    detector::LineDetector,
    driver::{GpioPwm, Pca9685, PwmDriver, RecordingDriver},
    indicator::{GpioIndicator, Indicator},
    Controller, ServoControl, Tracker,
};
use std::path::PathBuf;
use tokio::io::BufReader;

/// Keeps a target centered with a pan/tilt servo rig. Detections are read
/// from stdin, one frame per line: `x,y,w,h` regions separated by `;`.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// TOML configuration; built-in SG90 rig defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log servo commands instead of driving hardware
    #[arg(long)]
    dry_run: bool,
}

fn open_driver(backend: Backend, dry_run: bool) -> anyhow::Result<Box<dyn PwmDriver>> {
    if dry_run {
        return Ok(Box::new(RecordingDriver::new()));
    }
    Ok(match backend {
        Backend::Gpio => Box::new(GpioPwm::new().context("opening GPIO")?),
        Backend::Pca9685 { bus, address, frequency } => {
            Box::new(Pca9685::new(bus, address, frequency).context("opening PCA9685")?)
        }
    })
}

/// Resolves on SIGINT or SIGTERM, naming the one that arrived.
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        interrupt = tokio::signal::ctrl_c() => interrupt.map(|()| "interrupt"),
        _ = terminate.recv() => Ok("terminate"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "interrupt")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Settings::default(),
    };

    let driver = open_driver(settings.backend, args.dry_run)?;
    let maps = settings.channel_maps()?;
    let controller = Controller::new(driver, maps.models, maps.addresses, Some(maps.initial_angles))?;

    let detector = LineDetector::new(BufReader::new(tokio::io::stdin()));
    let mut tracker = Tracker::new(controller, detector, settings.tracking());
    if let (Some(led), false) = (settings.indicator, args.dry_run) {
        let indicator: Box<dyn Indicator> =
            Box::new(GpioIndicator::new(led.pin, led.active_low).context("opening status LED")?);
        tracker = tracker.with_indicator(indicator);
    }

    let outcome = tokio::select! {
        result = tracker.run() => result.context("tracking stopped"),
        signal = shutdown_signal() => signal
            .map(|name| info!("{} received, shutting down", name))
            .context("waiting for shutdown signal"),
    };

    if let Err(e) = tracker.controller_mut().shutdown() {
        error!("shutdown failed: {}", e);
    }
    outcome
}
