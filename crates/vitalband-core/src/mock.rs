//! Mock transport implementation for testing.
//!
//! This module provides a mock transport that can be used for unit testing
//! without requiring actual BLE hardware or the vendor protocol stack.
//!
//! The [`MockTransport`] implements the [`WearableTransport`] trait, allowing
//! it to be used interchangeably with the real transport in generic code.
//!
//! # Features
//!
//! - **Scripted telemetry**: Queue vendor callbacks per detection kind and
//!   replay them with configurable pacing
//! - **Scripted history**: Queue history messages per read kind and per day
//! - **Failure injection**: Make specific operations fail
//! - **Capability control**: Mark detections or history kinds unsupported

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};

use vitalband_types::types::HistoryKind;
use vitalband_types::{
    BatteryStatus, BloodPressureAlarm, DetectionKind, DeviceInfo, DeviceSettings, HeartWarning,
    UserProfile,
};

use crate::error::{Error, Result};
use crate::transport::{HistoryMessage, VendorTelemetry, WearableTransport};

/// A mock wearable transport for testing.
///
/// Starts connected by default so tests can go straight to the operation
/// under test; use [`MockTransport::disconnected`] to exercise the
/// connection lifecycle.
pub struct MockTransport {
    connected: AtomicBool,
    bound: AtomicBool,
    // Capability checks are sync, so these use std locks.
    unsupported_detections: Mutex<HashSet<DetectionKind>>,
    unsupported_history: Mutex<HashSet<HistoryKind>>,
    /// Telemetry replayed when a detection starts.
    telemetry_scripts: RwLock<HashMap<DetectionKind, Vec<VendorTelemetry>>>,
    /// Pause between replayed telemetry messages.
    telemetry_pacing: RwLock<Duration>,
    sleep_script: RwLock<Vec<HistoryMessage>>,
    hrv_script: RwLock<Vec<HistoryMessage>>,
    /// Sample scripts keyed by day offset. Days with no script stream
    /// nothing, which is how a silent device looks to the reader.
    sample_scripts: RwLock<HashMap<u32, Vec<HistoryMessage>>>,
    /// Day offsets whose sample stream stays open without sending.
    held_days: RwLock<HashSet<u32>>,
    device_info: RwLock<DeviceInfo>,
    battery: RwLock<BatteryStatus>,
    profile: RwLock<UserProfile>,
    settings: RwLock<DeviceSettings>,
    heart_warning: RwLock<HeartWarning>,
    pressure_alarm: RwLock<BloodPressureAlarm>,
    calibration_enabled: AtomicBool,
    /// Operations that fail with `OperationFailed` when invoked.
    failing_operations: RwLock<HashSet<String>>,
    start_counts: RwLock<HashMap<DetectionKind, u32>>,
    stop_counts: RwLock<HashMap<DetectionKind, u32>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .field("bound", &self.bound.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a connected mock with default device state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            bound: AtomicBool::new(false),
            unsupported_detections: Mutex::new(HashSet::new()),
            unsupported_history: Mutex::new(HashSet::new()),
            telemetry_scripts: RwLock::new(HashMap::new()),
            telemetry_pacing: RwLock::new(Duration::ZERO),
            sleep_script: RwLock::new(Vec::new()),
            hrv_script: RwLock::new(Vec::new()),
            sample_scripts: RwLock::new(HashMap::new()),
            held_days: RwLock::new(HashSet::new()),
            device_info: RwLock::new(Self::default_info()),
            battery: RwLock::new(BatteryStatus {
                level: 85,
                is_charging: false,
            }),
            profile: RwLock::new(UserProfile::new(
                175,
                70.0,
                30,
                vitalband_types::Gender::Male,
            )),
            settings: RwLock::new(DeviceSettings::default()),
            heart_warning: RwLock::new(HeartWarning {
                high: 150,
                low: 50,
                open: false,
            }),
            pressure_alarm: RwLock::new(BloodPressureAlarm {
                systolic_high: 140,
                systolic_low: 90,
                diastolic_high: 90,
                diastolic_low: 60,
                enabled: false,
            }),
            calibration_enabled: AtomicBool::new(false),
            failing_operations: RwLock::new(HashSet::new()),
            start_counts: RwLock::new(HashMap::new()),
            stop_counts: RwLock::new(HashMap::new()),
        }
    }

    /// Create a mock that starts disconnected.
    #[must_use]
    pub fn disconnected() -> Self {
        let mock = Self::new();
        mock.connected.store(false, Ordering::Relaxed);
        mock
    }

    fn default_info() -> DeviceInfo {
        DeviceInfo {
            model_name: "VitalBand Pro".to_string(),
            hardware_version: "2.1".to_string(),
            software_version: "1.4.2".to_string(),
            serial_number: "MOCK-12345".to_string(),
            mac_address: format!("MO:CK:{:02X}:{:02X}:00:01", rand::random::<u8>(), rand::random::<u8>()),
            manufacturer: "VitalBand".to_string(),
            battery_level: 85,
            is_charging: false,
            screen_width: 240,
            screen_height: 280,
            supported_features: vec!["heartRate".to_string(), "spo2".to_string()],
        }
    }

    // --- Test control methods ---

    /// Queue telemetry replayed when a detection of `kind` starts.
    pub async fn script_telemetry(&self, kind: DetectionKind, messages: Vec<VendorTelemetry>) {
        self.telemetry_scripts.write().await.insert(kind, messages);
    }

    /// Set the pause between replayed telemetry messages.
    pub async fn set_telemetry_pacing(&self, pacing: Duration) {
        *self.telemetry_pacing.write().await = pacing;
    }

    /// Queue the sleep history stream.
    pub async fn script_sleep(&self, messages: Vec<HistoryMessage>) {
        *self.sleep_script.write().await = messages;
    }

    /// Queue the HRV history stream.
    pub async fn script_hrv(&self, messages: Vec<HistoryMessage>) {
        *self.hrv_script.write().await = messages;
    }

    /// Queue the 5-minute sample stream for one day offset.
    pub async fn script_samples(&self, day_offset: u32, messages: Vec<HistoryMessage>) {
        self.sample_scripts
            .write()
            .await
            .insert(day_offset, messages);
    }

    /// Keep one day's sample stream open but silent, like firmware that
    /// accepted the request and then stopped answering.
    pub async fn hold_day_open(&self, day_offset: u32) {
        self.held_days.write().await.insert(day_offset);
    }

    /// Mark a detection kind unsupported.
    pub fn set_detection_unsupported(&self, kind: DetectionKind) {
        if let Ok(mut set) = self.unsupported_detections.lock() {
            set.insert(kind);
        }
    }

    /// Mark a history kind unsupported.
    pub fn set_history_unsupported(&self, kind: HistoryKind) {
        if let Ok(mut set) = self.unsupported_history.lock() {
            set.insert(kind);
        }
    }

    /// Make one named operation fail until cleared.
    ///
    /// Names match the trait methods: `connect`, `start_detection`,
    /// `stop_detection`, `read_battery`, `write_settings`, and so on.
    pub async fn fail_operation(&self, operation: &str) {
        self.failing_operations
            .write()
            .await
            .insert(operation.to_string());
    }

    /// Clear a failure set by [`MockTransport::fail_operation`].
    pub async fn clear_failure(&self, operation: &str) {
        self.failing_operations.write().await.remove(operation);
    }

    /// Replace the battery snapshot.
    pub async fn set_battery(&self, battery: BatteryStatus) {
        *self.battery.write().await = battery;
    }

    /// Replace the stored settings block.
    pub async fn set_settings(&self, settings: DeviceSettings) {
        *self.settings.write().await = settings;
    }

    /// How many times a detection was started.
    pub async fn start_count(&self, kind: DetectionKind) -> u32 {
        self.start_counts.read().await.get(&kind).copied().unwrap_or(0)
    }

    /// How many times a detection was stopped.
    pub async fn stop_count(&self, kind: DetectionKind) -> u32 {
        self.stop_counts.read().await.get(&kind).copied().unwrap_or(0)
    }

    /// Whether the glucose calibration mode is currently on.
    pub fn calibration_enabled(&self) -> bool {
        self.calibration_enabled.load(Ordering::Relaxed)
    }

    /// Whether `bind` succeeded.
    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Relaxed)
    }

    async fn check_failure(&self, operation: &str) -> Result<()> {
        if self.failing_operations.read().await.contains(operation) {
            Err(Error::operation_failed(operation, "injected failure"))
        } else {
            Ok(())
        }
    }

    fn check_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    fn replay_history(
        script: Vec<HistoryMessage>,
        sink: mpsc::Sender<HistoryMessage>,
        pacing: Duration,
    ) {
        tokio::spawn(async move {
            for message in script {
                if !pacing.is_zero() {
                    tokio::time::sleep(pacing).await;
                }
                if sink.send(message).await.is_err() {
                    break;
                }
            }
        });
    }
}

#[async_trait]
impl WearableTransport for MockTransport {
    async fn connect(&self, _address: &str) -> Result<()> {
        self.check_failure("connect").await?;
        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn bind(&self, _password: &str, _is_24h: bool) -> Result<()> {
        self.check_connected()?;
        self.check_failure("bind").await?;
        self.bound.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::Relaxed);
        self.bound.store(false, Ordering::Relaxed);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn supports_detection(&self, kind: DetectionKind) -> bool {
        self.unsupported_detections
            .lock()
            .map_or(true, |set| !set.contains(&kind))
    }

    fn supports_history(&self, kind: HistoryKind) -> bool {
        self.unsupported_history
            .lock()
            .map_or(true, |set| !set.contains(&kind))
    }

    async fn start_detection(
        &self,
        kind: DetectionKind,
        sink: mpsc::Sender<VendorTelemetry>,
    ) -> Result<()> {
        self.check_connected()?;
        self.check_failure("start_detection").await?;
        *self.start_counts.write().await.entry(kind).or_insert(0) += 1;

        let script = self
            .telemetry_scripts
            .read()
            .await
            .get(&kind)
            .cloned()
            .unwrap_or_default();
        let pacing = *self.telemetry_pacing.read().await;
        tokio::spawn(async move {
            for message in script {
                if !pacing.is_zero() {
                    tokio::time::sleep(pacing).await;
                }
                if sink.send(message).await.is_err() {
                    break;
                }
            }
            // Sender drops here; the session pump sees the stream end.
        });
        Ok(())
    }

    async fn stop_detection(&self, kind: DetectionKind) -> Result<()> {
        self.check_connected()?;
        self.check_failure("stop_detection").await?;
        *self.stop_counts.write().await.entry(kind).or_insert(0) += 1;
        Ok(())
    }

    async fn read_sleep(&self, _days: u32, sink: mpsc::Sender<HistoryMessage>) -> Result<()> {
        self.check_connected()?;
        self.check_failure("read_sleep").await?;
        let script = self.sleep_script.read().await.clone();
        Self::replay_history(script, sink, Duration::ZERO);
        Ok(())
    }

    async fn read_daily_samples(
        &self,
        day_offset: u32,
        sink: mpsc::Sender<HistoryMessage>,
    ) -> Result<()> {
        self.check_connected()?;
        self.check_failure("read_daily_samples").await?;
        if self.held_days.read().await.contains(&day_offset) {
            tokio::spawn(async move {
                // Hold the sink open well past any reader deadline.
                let _sink = sink;
                tokio::time::sleep(Duration::from_secs(3_600)).await;
            });
            return Ok(());
        }
        let script = self
            .sample_scripts
            .read()
            .await
            .get(&day_offset)
            .cloned()
            .unwrap_or_default();
        Self::replay_history(script, sink, Duration::ZERO);
        Ok(())
    }

    async fn read_hrv(&self, _days: u32, sink: mpsc::Sender<HistoryMessage>) -> Result<()> {
        self.check_connected()?;
        self.check_failure("read_hrv").await?;
        let script = self.hrv_script.read().await.clone();
        Self::replay_history(script, sink, Duration::ZERO);
        Ok(())
    }

    async fn read_device_info(&self) -> Result<DeviceInfo> {
        self.check_connected()?;
        self.check_failure("read_device_info").await?;
        Ok(self.device_info.read().await.clone())
    }

    async fn read_battery(&self) -> Result<BatteryStatus> {
        self.check_connected()?;
        self.check_failure("read_battery").await?;
        Ok(*self.battery.read().await)
    }

    async fn read_user_profile(&self) -> Result<UserProfile> {
        self.check_connected()?;
        self.check_failure("read_user_profile").await?;
        Ok(self.profile.read().await.clone())
    }

    async fn read_settings(&self) -> Result<DeviceSettings> {
        self.check_connected()?;
        self.check_failure("read_settings").await?;
        Ok(self.settings.read().await.clone())
    }

    async fn read_heart_warning(&self) -> Result<HeartWarning> {
        self.check_connected()?;
        self.check_failure("read_heart_warning").await?;
        Ok(*self.heart_warning.read().await)
    }

    async fn read_blood_pressure_alarm(&self) -> Result<BloodPressureAlarm> {
        self.check_connected()?;
        self.check_failure("read_blood_pressure_alarm").await?;
        Ok(*self.pressure_alarm.read().await)
    }

    async fn write_user_profile(&self, profile: &UserProfile) -> Result<()> {
        self.check_connected()?;
        self.check_failure("write_user_profile").await?;
        *self.profile.write().await = profile.clone();
        Ok(())
    }

    async fn write_settings(&self, settings: &DeviceSettings) -> Result<()> {
        self.check_connected()?;
        self.check_failure("write_settings").await?;
        *self.settings.write().await = settings.clone();
        Ok(())
    }

    async fn write_heart_warning(&self, warning: &HeartWarning) -> Result<()> {
        self.check_connected()?;
        self.check_failure("write_heart_warning").await?;
        *self.heart_warning.write().await = *warning;
        Ok(())
    }

    async fn write_blood_pressure_alarm(&self, alarm: &BloodPressureAlarm) -> Result<()> {
        self.check_connected()?;
        self.check_failure("write_blood_pressure_alarm").await?;
        *self.pressure_alarm.write().await = *alarm;
        Ok(())
    }

    async fn set_glucose_calibration(&self, enabled: bool) -> Result<()> {
        self.check_connected()?;
        self.check_failure("set_glucose_calibration").await?;
        self.calibration_enabled.store(enabled, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_lifecycle() {
        let mock = MockTransport::disconnected();
        assert!(!mock.is_connected().await);

        mock.connect("AA:BB:CC:DD:EE:FF").await.unwrap();
        assert!(mock.is_connected().await);

        mock.bind("0000", true).await.unwrap();
        assert!(mock.is_bound());

        mock.disconnect().await.unwrap();
        assert!(!mock.is_connected().await);
        assert!(!mock.is_bound());
    }

    #[tokio::test]
    async fn test_not_connected_reads_fail() {
        let mock = MockTransport::disconnected();
        let result = mock.read_battery().await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_scripted_telemetry_replay() {
        let mock = MockTransport::new();
        mock.script_telemetry(
            DetectionKind::HeartRate,
            vec![
                VendorTelemetry::Progress(50),
                VendorTelemetry::HeartRate(72),
            ],
        )
        .await;

        let (tx, mut rx) = mpsc::channel(8);
        mock.start_detection(DetectionKind::HeartRate, tx)
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(VendorTelemetry::Progress(50)));
        assert_eq!(rx.recv().await, Some(VendorTelemetry::HeartRate(72)));
        assert_eq!(rx.recv().await, None);
        assert_eq!(mock.start_count(DetectionKind::HeartRate).await, 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let mock = MockTransport::new();
        mock.fail_operation("read_battery").await;

        let err = mock.read_battery().await.unwrap_err();
        assert_eq!(err.code(), "OPERATION_FAILED");

        mock.clear_failure("read_battery").await;
        assert!(mock.read_battery().await.is_ok());
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let mock = MockTransport::new();
        let mut settings = DeviceSettings::default();
        settings.screen_brightness = 5;
        mock.write_settings(&settings).await.unwrap();
        assert_eq!(mock.read_settings().await.unwrap().screen_brightness, 5);
    }

    #[tokio::test]
    async fn test_unscripted_day_streams_nothing() {
        let mock = MockTransport::new();
        let (tx, mut rx) = mpsc::channel(8);
        mock.read_daily_samples(2, tx).await.unwrap();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_day_stays_open_and_silent() {
        let mock = MockTransport::new();
        mock.hold_day_open(1).await;
        let (tx, mut rx) = mpsc::channel(8);
        mock.read_daily_samples(1, tx).await.unwrap();
        let recv = tokio::time::timeout(Duration::from_secs(30), rx.recv()).await;
        assert!(recv.is_err(), "held day must not send or close");
    }

    #[tokio::test]
    async fn test_calibration_toggle() {
        let mock = MockTransport::new();
        assert!(!mock.calibration_enabled());
        mock.set_glucose_calibration(true).await.unwrap();
        assert!(mock.calibration_enabled());
        mock.set_glucose_calibration(false).await.unwrap();
        assert!(!mock.calibration_enabled());
    }
}
