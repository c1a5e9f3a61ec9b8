//! # CRSF RX
//!
//! Receive RC channels from an ExpressLRS receiver over CRSF.
//!
//! Usage: `crsf-rx [config.toml]`

use anyhow::{Context, Result};
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crsf_rx::config::Config;
use crsf_rx::crsf::protocol::{channels, RcChannels, CRSF_NUM_CHANNELS};
use crsf_rx::decoder::RcDecoder;
use crsf_rx::intake::{intake_channel, IntakeProducer};
use crsf_rx::scheduler::{ControlLoop, TickScheduler};
use crsf_rx::serial::sim::SimulatedLink;
use crsf_rx::serial::{run_intake, ReceiverSerial};

/// Main entry point for CRSF RX
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (defaults when no path is given)
///    - Set up logging with tracing subscriber
///    - Open the receiver serial port, or start the link simulator
///
/// 2. **Main Loop**
///    - Intake task appends received bytes to the intake buffer
///    - Control loop drains the buffer every tick and decodes channels
///    - Status task logs the primary sticks periodically
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if the configuration is invalid or no receiver can be opened
#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("loading {}", path))?,
        None => Config::default(),
    };

    let _log_guard = init_logging(&config)?;

    info!("CRSF RX v{} starting...", env!("CARGO_PKG_VERSION"));

    let capacity = config.receiver.intake_capacity;
    if capacity < config.bytes_per_tick() {
        warn!(
            "Intake capacity {} is below the {} bytes the link can deliver per tick",
            capacity,
            config.bytes_per_tick()
        );
    }

    let (producer, consumer) = intake_channel(capacity);
    let intake = spawn_intake(&config, producer)?;

    let (channels_tx, channels_rx) = tokio::sync::watch::channel([0u16; CRSF_NUM_CHANNELS]);
    let status = tokio::spawn(log_status(
        channels_rx,
        Duration::from_millis(config.scheduler.status_interval_ms),
    ));

    let decoder = RcDecoder::new(config.decoder_config());
    let mut control = ControlLoop::new(decoder, consumer, channels_tx);

    info!("Press Ctrl+C to exit");
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Received Ctrl+C, shutting down...");
    };
    control
        .run(TickScheduler::new(config.scheduler.tick_hz), shutdown)
        .await;

    intake.abort();
    status.abort();

    info!(
        "Total: {} ticks, {} frames decoded, {} CRC errors, {} intake overflows",
        control.ticks(),
        control.decoder().frames_accepted(),
        control.decoder().crc_errors(),
        control.intake().overflows()
    );

    Ok(())
}

/// Initialize logging
///
/// `RUST_LOG` overrides the configured level. With `log_dir` set, logs are
/// also written to a daily-rotated file; the returned guard flushes it on drop.
fn init_logging(config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("invalid log filter")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if config.logging.log_dir.is_empty() {
        builder.init();
        return Ok(None);
    }

    let appender = tracing_appender::rolling::daily(&config.logging.log_dir, "crsf-rx.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    builder.with_writer(writer).with_ansi(false).init();

    Ok(Some(guard))
}

/// Start the byte source feeding the intake buffer
fn spawn_intake(
    config: &Config,
    producer: IntakeProducer,
) -> Result<tokio::task::JoinHandle<()>> {
    if config.serial.simulate {
        info!(
            "Simulating receiver link at {}Hz",
            config.serial.sim_frame_rate_hz
        );
        let link = SimulatedLink::new(config.simulated_link_config());
        return Ok(tokio::spawn(report_intake(run_intake(link, producer))));
    }

    let serial = if config.serial.port.is_empty() {
        ReceiverSerial::open(config.serial.baud_rate)?
    } else {
        ReceiverSerial::open_with_paths(&[config.serial.port.as_str()], config.serial.baud_rate)?
    };
    info!("Receiver serial port opened at: {}", serial.device_path());

    Ok(tokio::spawn(report_intake(run_intake(
        serial.into_port(),
        producer,
    ))))
}

async fn report_intake<F>(intake: F)
where
    F: std::future::Future<Output = crsf_rx::error::Result<u64>>,
{
    // The control loop keeps running on the last good channels either way
    match intake.await {
        Ok(total) => warn!("Intake stopped after {} bytes", total),
        Err(e) => error!("Intake failed: {}", e),
    }
}

/// Periodically log the primary sticks and whether they changed
async fn log_status(mut rx: tokio::sync::watch::Receiver<RcChannels>, period: Duration) {
    let mut ticker = interval(period);

    loop {
        ticker.tick().await;

        let fresh = rx.has_changed().unwrap_or(false);
        let ch = *rx.borrow_and_update();
        info!(
            "roll {} pitch {} throttle {} yaw {} ({})",
            ch[channels::ROLL],
            ch[channels::PITCH],
            ch[channels::THROTTLE],
            ch[channels::YAW],
            if fresh { "fresh" } else { "stale" }
        );
    }
}
