//! Poll Scheduler
//!
//! Three independent periodic tasks share one [`DeviceSession`]:
//!
//! | Task    | Default interval | On failure                         |
//! |---------|------------------|------------------------------------|
//! | clock   | 30 min           | log, retry next tick               |
//! | battery | 60 s             | log, retry next tick               |
//! | count   | 4 s              | frame anomaly: log, continue       |
//! |         |                  | channel or sink error: task stops  |
//!
//! The session serializes their exchanges; the tasks themselves never block
//! each other except by waiting for the channel lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::battery::BatteryCell;
use crate::datalog::{Record, RecordSink, SinkError};
use crate::device::DeviceIdentity;
use crate::protocol::{DeviceChannel, DeviceSession, FrameError, ProtocolError};

/// Why the count task stopped
#[derive(Error, Debug)]
pub enum PollError {
    #[error("channel failure: {0}")]
    Channel(#[from] ProtocolError),

    #[error("record sink failure: {0}")]
    Sink(#[from] SinkError),
}

/// Poll periods for the three tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    /// Clock-sync period
    pub clock: Duration,
    /// Battery-sample period
    pub battery: Duration,
    /// Count-sample period
    pub count: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            clock: Duration::from_secs(30 * 60),
            battery: Duration::from_secs(60),
            count: Duration::from_secs(4),
        }
    }
}

/// Join handles for the spawned poll tasks
pub struct SchedulerHandles {
    /// Clock-sync task; runs until aborted
    pub clock: JoinHandle<()>,
    /// Battery task; runs until aborted
    pub battery: JoinHandle<()>,
    /// Count task; returns the error that stopped it
    pub count: JoinHandle<PollError>,
}

impl SchedulerHandles {
    /// Abort all three tasks
    pub fn abort(&self) {
        self.clock.abort();
        self.battery.abort();
        self.count.abort();
    }
}

/// Spawns the periodic tasks against one session
pub struct PollScheduler<C> {
    session: Arc<DeviceSession<C>>,
    identity: DeviceIdentity,
    location: String,
    battery: BatteryCell,
    intervals: PollIntervals,
}

impl<C: DeviceChannel + 'static> PollScheduler<C> {
    /// `identity` must come from a completed `identify()`; records need it
    pub fn new(
        session: Arc<DeviceSession<C>>,
        identity: DeviceIdentity,
        location: impl Into<String>,
    ) -> Self {
        Self {
            session,
            identity,
            location: location.into(),
            battery: BatteryCell::new(),
            intervals: PollIntervals::default(),
        }
    }

    /// Override the poll periods
    pub fn with_intervals(mut self, intervals: PollIntervals) -> Self {
        self.intervals = intervals;
        self
    }

    /// Handle on the last-known battery value
    pub fn battery_cell(&self) -> BatteryCell {
        self.battery.clone()
    }

    /// Start all three tasks. Must be called inside a tokio runtime.
    pub fn spawn<S: RecordSink + 'static>(self, sink: S) -> SchedulerHandles {
        let clock = tokio::spawn(run_clock_task(self.session.clone(), self.intervals.clock));
        let battery = tokio::spawn(run_battery_task(
            self.session.clone(),
            self.battery.clone(),
            self.intervals.battery,
        ));
        let count = tokio::spawn(run_count_task(
            self.session,
            self.battery,
            self.identity,
            self.location,
            sink,
            self.intervals.count,
        ));
        info!(
            clock = ?self.intervals.clock,
            battery = ?self.intervals.battery,
            count = ?self.intervals.count,
            "poll tasks started"
        );
        SchedulerHandles {
            clock,
            battery,
            count,
        }
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Push wall-clock time to the device; the first tick fires immediately
pub async fn run_clock_task<C: DeviceChannel>(session: Arc<DeviceSession<C>>, period: Duration) {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        if let Err(e) = session.sync_clock(Local::now().naive_local()).await {
            warn!("clock sync failed: {e}");
        }
    }
}

/// Sample the battery and maintain the shared cell.
///
/// A valid sample replaces the cell. An out-of-range sample clears it, since
/// the device did answer and the answer is not trustworthy. A missing reply or
/// channel error leaves the last valid value in place.
pub async fn run_battery_task<C: DeviceChannel>(
    session: Arc<DeviceSession<C>>,
    battery: BatteryCell,
    period: Duration,
) {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        match session.sample_battery().await {
            Ok(sample) => {
                debug!(voltage = sample.voltage, "battery sampled");
                battery.store(sample);
            }
            Err(ProtocolError::Frame(FrameError::OutOfRange(v))) => {
                warn!(voltage = v, "implausible battery voltage; marking unknown");
                battery.clear();
            }
            Err(e) if e.is_frame_anomaly() => {
                warn!("battery reply unusable: {e}");
            }
            Err(e) => {
                warn!("battery sample failed: {e}");
            }
        }
    }
}

/// Poll the count rate and append one record per successful reading.
///
/// Returns only when a channel or sink failure stops the task.
pub async fn run_count_task<C: DeviceChannel, S: RecordSink>(
    session: Arc<DeviceSession<C>>,
    battery: BatteryCell,
    identity: DeviceIdentity,
    location: String,
    mut sink: S,
    period: Duration,
) -> PollError {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        let reading = match session.sample_count().await {
            Ok(reading) => reading,
            Err(ProtocolError::Frame(FrameError::MarkerByte)) => {
                debug!("ignoring marker byte 0xAA");
                continue;
            }
            Err(e) if e.is_frame_anomaly() => {
                warn!("no CPM this cycle: {e}");
                continue;
            }
            Err(e) => {
                error!("count polling stopped: {e}");
                return e.into();
            }
        };

        let record = Record::from_reading(&reading, battery.voltage(), &identity, &location);
        if let Err(e) = sink.append(&record) {
            error!("count polling stopped: {e}");
            return e.into();
        }
        info!(
            cpm = record.counts_per_minute,
            usvh = record.dose_rate_usv_h,
            battery = %record.battery_field(),
            "logged"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intervals() {
        let i = PollIntervals::default();
        assert_eq!(i.clock, Duration::from_secs(1800));
        assert_eq!(i.battery, Duration::from_secs(60));
        assert_eq!(i.count, Duration::from_secs(4));
    }

    #[test]
    fn test_poll_error_display() {
        let err = PollError::from(ProtocolError::SerialError("device unplugged".into()));
        assert_eq!(
            err.to_string(),
            "channel failure: Serial port error: device unplugged"
        );
    }
}
