//! # Periodic Scheduler
//!
//! Fixed-rate tick source and the control loop body it drives.
//!
//! Each deadline is derived from the previous deadline rather than from the
//! time the tick was handled, so handling latency does not accumulate as
//! drift. When a tick overruns, the missed deadlines fire back-to-back
//! without skipping; the decoder copes with being drained with no new bytes.

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::crsf::protocol::RcChannels;
use crate::decoder::RcDecoder;
use crate::intake::IntakeConsumer;

/// Downstream consumer of validated channel arrays
#[cfg_attr(test, mockall::automock)]
pub trait ChannelSink {
    /// Called once per tick that produced a freshly validated frame
    fn publish(&mut self, channels: &RcChannels);
}

impl ChannelSink for tokio::sync::watch::Sender<RcChannels> {
    fn publish(&mut self, channels: &RcChannels) {
        self.send_replace(*channels);
    }
}

/// Tick period for a frequency in Hz
pub fn tick_period(tick_hz: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / u64::from(tick_hz.max(1)))
}

/// Hardware-timer stand-in firing at a fixed frequency
#[derive(Debug)]
pub struct TickScheduler {
    interval: Interval,
    period: Duration,
}

impl TickScheduler {
    pub fn new(tick_hz: u32) -> Self {
        let period = tick_period(tick_hz);
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

        Self { interval, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next deadline
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// The per-tick body: drain the intake through the decoder, publish results
#[derive(Debug)]
pub struct ControlLoop<S> {
    decoder: RcDecoder,
    intake: IntakeConsumer,
    sink: S,
    ticks: u64,
}

impl<S: ChannelSink> ControlLoop<S> {
    pub fn new(decoder: RcDecoder, intake: IntakeConsumer, sink: S) -> Self {
        Self {
            decoder,
            intake,
            sink,
            ticks: 0,
        }
    }

    /// One tick: decode whatever arrived since the previous one
    pub fn on_tick(&mut self) -> Option<RcChannels> {
        self.ticks += 1;

        let snapshot = self.intake.take();
        if snapshot.dropped > 0 {
            // The bytes that would have finished a partial frame are gone
            self.decoder.resync();
        }
        if !snapshot.bytes.is_empty() {
            trace!("Tick {}: draining {} bytes", self.ticks, snapshot.bytes.len());
        }

        let channels = self.decoder.drain(snapshot.bytes)?;
        self.sink.publish(&channels);
        Some(channels)
    }

    /// Run ticks until `shutdown` resolves
    pub async fn run<F>(&mut self, mut scheduler: TickScheduler, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            "Control loop running every {:?} ({} byte intake)",
            scheduler.period(),
            self.intake.capacity()
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = scheduler.tick() => {
                    self.on_tick();
                }
                _ = &mut shutdown => {
                    debug!(
                        "Control loop stopping after {} ticks, parser {:?}",
                        self.ticks,
                        self.decoder.parser().state()
                    );
                    break;
                }
            }
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn decoder(&self) -> &RcDecoder {
        &self.decoder
    }

    pub fn intake(&self) -> &IntakeConsumer {
        &self.intake
    }
}
