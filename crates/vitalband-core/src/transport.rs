//! Trait abstraction over the wearable's vendor protocol.
//!
//! This module provides the [`WearableTransport`] trait that abstracts over
//! the real BLE protocol stack and mock transports for testing. The vendor
//! protocol is callback-driven; the trait maps each callback family onto a
//! bounded channel of tagged messages so everything downstream is a single
//! fold over one receiver.

use async_trait::async_trait;
use tokio::sync::mpsc;

use vitalband_types::types::HistoryKind;
use vitalband_types::{
    BatteryStatus, BloodPressureAlarm, DetectionKind, DeviceInfo, DeviceSettings, GlucoseRiskLevel,
    HeartWarning, HrvRecord, SampleRecord, SleepRecord, UserProfile, VendorStatus,
};

use crate::error::Result;

/// One vendor callback, re-tagged for the normalizer fold.
///
/// Field names follow the canonical model, not the vendor's; transports do
/// the renaming at the edge so nothing downstream sees vendor vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub enum VendorTelemetry {
    /// Measurement progress percentage (0-100).
    Progress(u8),
    /// Optical heart rate sample.
    HeartRate(u16),
    /// Blood oxygen saturation sample.
    Oxygen(u8),
    /// Blood pressure reading.
    Pressure {
        systolic: u16,
        diastolic: u16,
        /// Whether the cuff-less measurement is still running.
        checking: bool,
    },
    /// Blood glucose reading, firmware units (mmol/L).
    Glucose {
        progress: u8,
        mmol_per_l: f64,
        risk: GlucoseRiskLevel,
    },
    /// Body and wrist temperature reading.
    Temperature {
        body_celsius: f32,
        wrist_celsius: f32,
        checking: bool,
        progress: u8,
    },
    /// One ECG status frame.
    EcgFrame {
        checking: bool,
        progress: u8,
        heart_rate: u16,
        /// Signal quality 0-100.
        signal_quality: u8,
        /// Firmware diagnostic string, present once analysis completes.
        diagnosis: Option<String>,
    },
    /// Raw ECG waveform chunk, sentinel padding included.
    RawSamples(Vec<i32>),
    /// Blood component (uric acid and lipids) reading.
    Component {
        progress: u8,
        complete: bool,
        uric_acid: f64,
        total_cholesterol: f64,
        triglyceride: f64,
        hdl: f64,
        ldl: f64,
    },
    /// Vendor status or error callback.
    Status {
        /// Vendor error code, when the callback carried one.
        error_code: Option<i32>,
        status: VendorStatus,
    },
    /// The firmware confirmed the detection stopped on its own.
    Stopped,
}

/// One message from a history read stream.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryMessage {
    /// Read progress percentage (0-100).
    Progress(u8),
    /// One night of sleep.
    Sleep(SleepRecord),
    /// One 5-minute multi-metric sample.
    Sample(SampleRecord),
    /// One HRV value keyed by its `HH:MM` sample time.
    HrvSample {
        time: String,
        value: u32,
    },
    /// One full HRV record.
    Hrv(HrvRecord),
    /// Whole-day HRV score.
    DayScore(u32),
    /// The firmware finished streaming this read.
    Complete,
}

/// Trait abstracting the wearable's protocol operations.
///
/// This trait enables writing code that works with both the real BLE
/// protocol stack and mock transports for testing.
///
/// Streaming operations take a bounded [`mpsc::Sender`] sink; `Ok(())`
/// means the device acknowledged the request, after which messages flow
/// into the sink until the stream completes or the receiver is dropped.
/// Request/reply operations return their value directly; callers apply
/// their own deadlines.
#[async_trait]
pub trait WearableTransport: Send + Sync {
    // --- Connection Management ---

    /// Connect to the device at a MAC address.
    async fn connect(&self, address: &str) -> Result<()>;

    /// Authenticate with the device password and clock preference.
    async fn bind(&self, password: &str, is_24h: bool) -> Result<()>;

    /// Disconnect from the device.
    async fn disconnect(&self) -> Result<()>;

    /// Check if the device is connected.
    async fn is_connected(&self) -> bool;

    // --- Capabilities ---

    /// Whether the connected device supports a live detection.
    fn supports_detection(&self, kind: DetectionKind) -> bool;

    /// Whether the connected device supports a history read.
    fn supports_history(&self, kind: HistoryKind) -> bool;

    // --- Live Detections ---

    /// Start a live detection, streaming its callbacks into `sink`.
    async fn start_detection(
        &self,
        kind: DetectionKind,
        sink: mpsc::Sender<VendorTelemetry>,
    ) -> Result<()>;

    /// Stop a live detection.
    async fn stop_detection(&self, kind: DetectionKind) -> Result<()>;

    // --- History Reads ---

    /// Read sleep history for the past `days`, streaming into `sink`.
    async fn read_sleep(&self, days: u32, sink: mpsc::Sender<HistoryMessage>) -> Result<()>;

    /// Read the 5-minute sample stream for one day.
    ///
    /// `day_offset` counts back from today (0 = today). Reads for
    /// different days must be issued one at a time.
    async fn read_daily_samples(
        &self,
        day_offset: u32,
        sink: mpsc::Sender<HistoryMessage>,
    ) -> Result<()>;

    /// Read HRV history for the past `days`, streaming into `sink`.
    async fn read_hrv(&self, days: u32, sink: mpsc::Sender<HistoryMessage>) -> Result<()>;

    // --- Device Reads ---

    /// Read device identity (model, firmware, hardware versions).
    async fn read_device_info(&self) -> Result<DeviceInfo>;

    /// Read the battery state.
    async fn read_battery(&self) -> Result<BatteryStatus>;

    /// Read the stored user profile.
    async fn read_user_profile(&self) -> Result<UserProfile>;

    /// Read the device settings block.
    async fn read_settings(&self) -> Result<DeviceSettings>;

    /// Read the heart-rate warning thresholds.
    async fn read_heart_warning(&self) -> Result<HeartWarning>;

    /// Read the blood-pressure alarm configuration.
    async fn read_blood_pressure_alarm(&self) -> Result<BloodPressureAlarm>;

    // --- Device Writes ---
    //
    // Write methods map a device NAK to `Error::OperationFailed`; `Ok(())`
    // means the device confirmed the write.

    /// Store a user profile on the device.
    async fn write_user_profile(&self, profile: &UserProfile) -> Result<()>;

    /// Write the device settings block.
    async fn write_settings(&self, settings: &DeviceSettings) -> Result<()>;

    /// Write the heart-rate warning thresholds.
    async fn write_heart_warning(&self, warning: &HeartWarning) -> Result<()>;

    /// Write the blood-pressure alarm configuration.
    async fn write_blood_pressure_alarm(&self, alarm: &BloodPressureAlarm) -> Result<()>;

    /// Toggle the glucose sensor's calibration (adjusting) mode.
    async fn set_glucose_calibration(&self, enabled: bool) -> Result<()>;
}
