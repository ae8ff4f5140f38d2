//! Bounded history reads.
//!
//! Every history read is a request write followed by a stream of records
//! with no explicit length. Reads therefore run under two clocks: an
//! overall ceiling for the whole read, and an inactivity window that ends
//! the read once the device stops sending. Whichever ends the stream, the
//! caller gets exactly one resolution.
//!
//! Multi-day sample reads are strictly sequential: one day's stream must
//! finish (or go quiet) before the next day's request is written.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, timeout};
use tracing::{debug, warn};

use vitalband_types::history::{date_string, join_hrv_values};
use vitalband_types::types::HistoryKind;
use vitalband_types::{
    DailySummary, HrvReadOutcome, HrvRecord, SampleRecord, SleepRecord, StepSnapshot,
};

use crate::error::{Error, Result};
use crate::events::{BridgeEvent, EventBroadcaster, StreamKey};
use crate::transport::{HistoryMessage, WearableTransport};
use crate::util::now_ms;

/// History stream channel depth.
const HISTORY_BUFFER: usize = 64;

/// Deadlines for one bounded read.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Hard ceiling for the whole read.
    pub ceiling: Duration,
    /// Quiet time after the last message that ends the read.
    pub inactivity: Duration,
    /// How many days back to request.
    pub days: u32,
}

impl ReadOptions {
    /// Sleep history: long ceiling, the record set is large.
    #[must_use]
    pub fn sleep() -> Self {
        Self {
            ceiling: Duration::from_secs(60),
            inactivity: Duration::from_secs(10),
            days: 7,
        }
    }

    /// Today's step snapshot, derived from today's sample stream.
    #[must_use]
    pub fn steps() -> Self {
        Self {
            ceiling: Duration::from_secs(30),
            inactivity: Duration::from_secs(10),
            days: 1,
        }
    }

    /// HRV history.
    #[must_use]
    pub fn hrv() -> Self {
        Self {
            ceiling: Duration::from_secs(30),
            inactivity: Duration::from_secs(10),
            days: 7,
        }
    }

    /// Multi-day 5-minute samples: the ceiling spans all requested days.
    #[must_use]
    pub fn daily_samples(days: u32) -> Self {
        Self {
            ceiling: Duration::from_secs(90),
            inactivity: Duration::from_secs(10),
            days: days.clamp(1, 3),
        }
    }
}

/// How a bounded collection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadOutcome {
    /// The device signalled the end of the stream.
    Complete,
    /// The device went quiet for the inactivity window.
    Inactivity,
    /// The overall ceiling elapsed.
    Ceiling,
}

/// Drain a history stream until it completes, goes quiet, or hits `deadline`.
async fn collect(
    rx: &mut mpsc::Receiver<HistoryMessage>,
    deadline: Instant,
    inactivity: Duration,
    mut on_message: impl FnMut(HistoryMessage),
) -> ReadOutcome {
    loop {
        let now = Instant::now();
        if now >= deadline {
            return ReadOutcome::Ceiling;
        }
        let remaining = deadline - now;
        let wait = remaining.min(inactivity);
        match timeout(wait, rx.recv()).await {
            Ok(Some(HistoryMessage::Complete)) => return ReadOutcome::Complete,
            Ok(Some(message)) => on_message(message),
            // Sender dropped: the transport finished the stream.
            Ok(None) => return ReadOutcome::Complete,
            Err(_) if wait == remaining => return ReadOutcome::Ceiling,
            Err(_) => return ReadOutcome::Inactivity,
        }
    }
}

/// Executes bounded history reads against the transport.
///
/// Shares the coordinator's write lock so request writes never interleave
/// with detection commands.
pub struct HistoryReader {
    transport: Arc<dyn WearableTransport>,
    broadcaster: EventBroadcaster,
    write_lock: Arc<Mutex<()>>,
}

impl HistoryReader {
    /// Create a reader sharing the coordinator's write lock.
    pub fn new(
        transport: Arc<dyn WearableTransport>,
        broadcaster: EventBroadcaster,
        write_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            transport,
            broadcaster,
            write_lock,
        }
    }

    fn publish_progress(&self, kind: HistoryKind, percent: u8) {
        self.broadcaster.publish(
            StreamKey::SyncProgress,
            BridgeEvent::SyncProgress {
                kind,
                percent: percent.min(100),
            },
        );
    }

    fn map_request_error(kind: HistoryKind, error: Error) -> Error {
        match error {
            Error::OperationFailed { .. } => Error::HistoryRequestFailed { kind },
            other => other,
        }
    }

    /// Read the most recent night of sleep.
    ///
    /// `Ok(None)` means the read finished cleanly but the device had no
    /// sleep data for the window.
    pub async fn read_sleep(&self) -> Result<Option<SleepRecord>> {
        Ok(self.read_sleep_records().await?.pop())
    }

    /// Read every sleep record in the default window, oldest first.
    pub async fn read_sleep_records(&self) -> Result<Vec<SleepRecord>> {
        let kind = HistoryKind::Sleep;
        if !self.transport.supports_history(kind) {
            return Err(Error::HistoryNotSupported { kind });
        }
        let options = ReadOptions::sleep();
        let (tx, mut rx) = mpsc::channel(HISTORY_BUFFER);
        {
            let _write = self.write_lock.lock().await;
            self.transport
                .read_sleep(options.days, tx)
                .await
                .map_err(|e| Self::map_request_error(kind, e))?;
        }

        let deadline = Instant::now() + options.ceiling;
        let mut records: Vec<SleepRecord> = Vec::new();
        let outcome = collect(&mut rx, deadline, options.inactivity, |message| {
            match message {
                HistoryMessage::Sleep(record) => records.push(record),
                HistoryMessage::Progress(p) => self.publish_progress(kind, p),
                other => debug!(?other, "ignoring off-stream sleep message"),
            }
        })
        .await;

        if outcome == ReadOutcome::Ceiling && records.is_empty() {
            return Err(Error::HistoryTimeout {
                kind,
                duration: options.ceiling,
            });
        }
        Ok(records)
    }

    /// Read today's step/activity snapshot from today's sample stream.
    pub async fn read_steps(&self) -> Result<StepSnapshot> {
        self.read_steps_for(0).await
    }

    /// Read the step/activity snapshot for one past day (0 = today).
    pub async fn read_steps_for(&self, day_offset: u32) -> Result<StepSnapshot> {
        let kind = HistoryKind::Steps;
        if !self.transport.supports_history(kind) {
            return Err(Error::HistoryNotSupported { kind });
        }
        let options = ReadOptions::steps();
        let (tx, mut rx) = mpsc::channel(HISTORY_BUFFER);
        {
            let _write = self.write_lock.lock().await;
            self.transport
                .read_daily_samples(day_offset, tx)
                .await
                .map_err(|e| Self::map_request_error(kind, e))?;
        }

        let deadline = Instant::now() + options.ceiling;
        let mut samples: Vec<SampleRecord> = Vec::new();
        let outcome = collect(&mut rx, deadline, options.inactivity, |message| {
            match message {
                HistoryMessage::Sample(record) => samples.push(record),
                HistoryMessage::Progress(p) => self.publish_progress(kind, p),
                other => debug!(?other, "ignoring off-stream step message"),
            }
        })
        .await;

        if outcome == ReadOutcome::Ceiling {
            warn!("step read hit its ceiling, resolving with partial data");
        }
        // Today's totals live on the newest sample that has step data.
        let latest = samples
            .iter()
            .rev()
            .find(|s| s.steps.is_some())
            .or_else(|| samples.last())
            .ok_or_else(|| Error::NoData("no step samples for the requested day".to_string()))?;

        Ok(StepSnapshot {
            steps: latest.steps.unwrap_or(0),
            distance_meters: latest.distance.unwrap_or(0.0),
            calories: latest.calories.unwrap_or(0.0),
            active_minutes: None,
            heart_rate: latest.heart_rate,
            timestamp_ms: now_ms(),
            date: latest.date.clone(),
        })
    }

    /// Read HRV history. `days` overrides the default 7-day window.
    pub async fn read_hrv(&self, days: Option<u32>) -> Result<HrvReadOutcome> {
        let kind = HistoryKind::Hrv;
        if !self.transport.supports_history(kind) {
            return Err(Error::HistoryNotSupported { kind });
        }
        let mut options = ReadOptions::hrv();
        if let Some(days) = days {
            options.days = days.clamp(1, 7);
        }
        let (tx, mut rx) = mpsc::channel(HISTORY_BUFFER);
        {
            let _write = self.write_lock.lock().await;
            self.transport
                .read_hrv(options.days, tx)
                .await
                .map_err(|e| Self::map_request_error(kind, e))?;
        }

        let deadline = Instant::now() + options.ceiling;
        let mut records: Vec<HrvRecord> = Vec::new();
        let mut day_score: u32 = 0;
        let outcome = collect(&mut rx, deadline, options.inactivity, |message| {
            match message {
                HistoryMessage::Hrv(record) => records.push(record),
                HistoryMessage::DayScore(score) => day_score = score,
                HistoryMessage::Progress(p) => self.publish_progress(kind, p),
                other => debug!(?other, "ignoring off-stream HRV message"),
            }
        })
        .await;

        if outcome == ReadOutcome::Ceiling && records.is_empty() {
            return Err(Error::HistoryTimeout {
                kind,
                duration: options.ceiling,
            });
        }
        let total_records = records.len();
        Ok(HrvReadOutcome {
            records,
            day_hrv_score: day_score,
            total_records,
        })
    }

    /// Read and aggregate multi-day 5-minute samples, newest day first.
    ///
    /// Days are read strictly one at a time under a shared ceiling. If the
    /// ceiling elapses mid-read the days finished so far are returned;
    /// only a read that produced nothing at all is a timeout error.
    pub async fn read_daily_samples(&self, days: u32) -> Result<Vec<DailySummary>> {
        let kind = HistoryKind::DailySamples;
        if !self.transport.supports_history(kind) {
            return Err(Error::HistoryNotSupported { kind });
        }
        let options = ReadOptions::daily_samples(days);
        let deadline = Instant::now() + options.ceiling;
        let today = OffsetDateTime::now_utc().date();

        let mut summaries = Vec::new();
        let mut total_records = 0usize;

        for day_offset in 0..options.days {
            if Instant::now() >= deadline {
                warn!(day_offset, "sample read ceiling elapsed, stopping early");
                break;
            }
            let (tx, mut rx) = mpsc::channel(HISTORY_BUFFER);
            {
                let _write = self.write_lock.lock().await;
                self.transport
                    .read_daily_samples(day_offset, tx)
                    .await
                    .map_err(|e| Self::map_request_error(kind, e))?;
            }

            let mut records: Vec<SampleRecord> = Vec::new();
            let mut hrv_by_time: HashMap<String, u32> = HashMap::new();
            let outcome = collect(&mut rx, deadline, options.inactivity, |message| {
                match message {
                    HistoryMessage::Sample(record) => records.push(record),
                    HistoryMessage::HrvSample { time, value } => {
                        hrv_by_time.insert(time, value);
                    }
                    HistoryMessage::Progress(p) => {
                        // Scale per-day progress across the whole read.
                        let overall = (day_offset * 100 + u32::from(p.min(100))) / options.days;
                        self.publish_progress(kind, overall as u8);
                    }
                    other => debug!(?other, "ignoring off-stream sample message"),
                }
            })
            .await;

            total_records += records.len();
            join_hrv_values(&mut records, &hrv_by_time);
            summaries.push(DailySummary::aggregate(
                date_string(today, day_offset),
                day_offset,
                &records,
            ));

            if outcome == ReadOutcome::Ceiling {
                break;
            }
        }

        if total_records == 0 && summaries.len() < options.days as usize {
            return Err(Error::HistoryTimeout {
                kind,
                duration: options.ceiling,
            });
        }
        self.publish_progress(kind, 100);
        Ok(summaries)
    }

    /// Read and aggregate one past day's samples (0 = today).
    pub async fn read_single_day(&self, day_offset: u32) -> Result<DailySummary> {
        let kind = HistoryKind::DailySamples;
        if !self.transport.supports_history(kind) {
            return Err(Error::HistoryNotSupported { kind });
        }
        let options = ReadOptions::daily_samples(1);
        let deadline = Instant::now() + options.ceiling;
        let today = OffsetDateTime::now_utc().date();

        let (tx, mut rx) = mpsc::channel(HISTORY_BUFFER);
        {
            let _write = self.write_lock.lock().await;
            self.transport
                .read_daily_samples(day_offset, tx)
                .await
                .map_err(|e| Self::map_request_error(kind, e))?;
        }

        let mut records: Vec<SampleRecord> = Vec::new();
        let mut hrv_by_time: HashMap<String, u32> = HashMap::new();
        let outcome = collect(&mut rx, deadline, options.inactivity, |message| {
            match message {
                HistoryMessage::Sample(record) => records.push(record),
                HistoryMessage::HrvSample { time, value } => {
                    hrv_by_time.insert(time, value);
                }
                HistoryMessage::Progress(p) => self.publish_progress(kind, p),
                other => debug!(?other, "ignoring off-stream sample message"),
            }
        })
        .await;

        if outcome == ReadOutcome::Ceiling && records.is_empty() {
            return Err(Error::HistoryTimeout {
                kind,
                duration: options.ceiling,
            });
        }
        join_hrv_values(&mut records, &hrv_by_time);
        Ok(DailySummary::aggregate(
            date_string(today, day_offset),
            day_offset,
            &records,
        ))
    }
}
