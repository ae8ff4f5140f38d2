//! The device session coordinator.
//!
//! One coordinator owns one device session: it tracks the connection
//! lifecycle, serializes every command write through a single lock, routes
//! detections through the [`SessionGuard`] and history reads through the
//! [`HistoryReader`], and publishes everything the host sees through the
//! [`EventBroadcaster`].
//!
//! Every device-facing operation checks the session first and fails fast
//! with `NOT_CONNECTED` rather than letting a write ride on a dead link.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::time::timeout;
use tracing::{info, warn};

use vitalband_types::types::HistoryKind;
use vitalband_types::{
    BatteryStatus, BloodPressureAlarm, DailySummary, DetectionKind, DeviceInfo, DeviceSettings,
    DeviceSettingsPatch, DeviceStatus, HeartWarning, HrvReadOutcome, SleepRecord, StepSnapshot,
    UserProfile,
};

use crate::error::{Error, Result};
use crate::events::{BridgeEvent, EventBroadcaster, StreamKey};
use crate::history::HistoryReader;
use crate::platform::{PermissionOutcome, PlatformServices};
use crate::scan::{ScanOptions, Scanner};
use crate::session::SessionGuard;
use crate::transport::WearableTransport;

/// Configuration for the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Deadline for request/reply device operations.
    pub operation_timeout: Duration,
    /// Deadline for the multi-read device-info operation.
    pub device_info_timeout: Duration,
    /// Scan options for host-initiated scans.
    pub scan_options: ScanOptions,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(10),
            device_info_timeout: Duration::from_secs(5),
            scan_options: ScanOptions::default(),
        }
    }
}

/// The current device session.
#[derive(Debug, Clone)]
pub struct DeviceSession {
    /// MAC address (or platform identifier) of the device.
    pub address: String,
    /// Lifecycle status.
    pub status: DeviceStatus,
}

/// Coordinates one wearable session end to end.
pub struct DeviceSessionCoordinator {
    transport: Arc<dyn WearableTransport>,
    platform: Arc<dyn PlatformServices>,
    broadcaster: EventBroadcaster,
    guard: SessionGuard,
    history: HistoryReader,
    session: RwLock<Option<DeviceSession>>,
    write_lock: Arc<Mutex<()>>,
    scanner: Mutex<Option<Scanner>>,
    config: CoordinatorConfig,
}

impl DeviceSessionCoordinator {
    /// Create a coordinator with default configuration.
    pub fn new(transport: Arc<dyn WearableTransport>, platform: Arc<dyn PlatformServices>) -> Self {
        Self::with_config(transport, platform, CoordinatorConfig::default())
    }

    /// Create a coordinator with explicit configuration.
    pub fn with_config(
        transport: Arc<dyn WearableTransport>,
        platform: Arc<dyn PlatformServices>,
        config: CoordinatorConfig,
    ) -> Self {
        let broadcaster = EventBroadcaster::new();
        let write_lock = Arc::new(Mutex::new(()));
        let guard = SessionGuard::new(
            Arc::clone(&transport),
            broadcaster.clone(),
            Arc::clone(&write_lock),
        );
        let history = HistoryReader::new(
            Arc::clone(&transport),
            broadcaster.clone(),
            Arc::clone(&write_lock),
        );
        Self {
            transport,
            platform,
            broadcaster,
            guard,
            history,
            session: RwLock::new(None),
            write_lock,
            scanner: Mutex::new(None),
            config,
        }
    }

    /// The event broadcaster hosts attach their sinks to.
    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    /// Attach a sink for one event stream.
    pub fn subscribe(&self, key: StreamKey) -> mpsc::Receiver<BridgeEvent> {
        self.broadcaster.register(key)
    }

    // --- Platform Services ---

    /// Prompt for the Bluetooth permissions this platform needs.
    pub async fn request_bluetooth_permissions(&self) -> Result<PermissionOutcome> {
        self.platform.request_bluetooth_permissions().await
    }

    /// Open the OS settings screen for this application.
    pub async fn open_app_settings(&self) -> Result<()> {
        self.platform.open_app_settings().await
    }

    /// Whether the Bluetooth radio is on.
    pub async fn is_bluetooth_enabled(&self) -> Result<bool> {
        self.platform.is_bluetooth_enabled().await
    }

    /// Ask the OS to turn the radio on.
    pub async fn open_bluetooth(&self) -> Result<()> {
        self.platform.open_bluetooth().await
    }

    /// Ask the OS to turn the radio off, where permitted.
    pub async fn close_bluetooth(&self) -> Result<()> {
        self.platform.close_bluetooth().await
    }

    // --- Scanning ---

    /// Start a background scan, streaming results to the scan sink.
    pub async fn start_scan(&self) -> Result<()> {
        let mut scanner = self.scanner.lock().await;
        if scanner.as_ref().is_some_and(Scanner::is_active) {
            warn!("scan already running, restarting");
        }
        if let Some(previous) = scanner.take() {
            previous.stop();
        }

        let broadcaster = self.broadcaster.clone();
        let started = Scanner::start(self.config.scan_options.clone(), move |device| {
            broadcaster.publish(StreamKey::Scan, BridgeEvent::Scan(device));
        })
        .await?;
        *scanner = Some(started);
        Ok(())
    }

    /// Stop the background scan, if any.
    pub async fn stop_scan(&self) -> Result<()> {
        if let Some(scanner) = self.scanner.lock().await.take() {
            scanner.stop();
        }
        Ok(())
    }

    // --- Connection Lifecycle ---

    /// Connect to a device by MAC address.
    #[tracing::instrument(skip(self))]
    pub async fn connect(&self, address: &str) -> Result<()> {
        if address.trim().is_empty() {
            return Err(Error::invalid_argument("MAC address is required"));
        }

        let mut session = self.session.write().await;
        *session = Some(DeviceSession {
            address: address.to_string(),
            status: DeviceStatus::Connecting,
        });
        drop(session);

        match self.transport.connect(address).await {
            Ok(()) => {
                info!(address, "device connected");
                let mut session = self.session.write().await;
                if let Some(session) = session.as_mut() {
                    session.status = DeviceStatus::Connected;
                }
                Ok(())
            }
            Err(e) => {
                *self.session.write().await = None;
                Err(e)
            }
        }
    }

    /// Authenticate with the device password and clock preference.
    #[tracing::instrument(skip(self, password))]
    pub async fn bind(&self, password: &str, is_24h: bool) -> Result<()> {
        if password.trim().is_empty() {
            return Err(Error::invalid_argument(
                "Password and 24-hour mode are required",
            ));
        }
        {
            let session = self.session.read().await;
            if !session
                .as_ref()
                .is_some_and(|s| s.status != DeviceStatus::Disconnected)
            {
                return Err(Error::NotConnected);
            }
        }

        self.transport.bind(password, is_24h).await?;
        let mut session = self.session.write().await;
        if let Some(session) = session.as_mut() {
            session.status = DeviceStatus::Bound;
        }
        Ok(())
    }

    /// Disconnect, stopping every running detection first.
    #[tracing::instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<()> {
        self.guard.stop_all().await;
        if let Some(scanner) = self.scanner.lock().await.take() {
            scanner.stop();
        }
        let result = self.transport.disconnect().await;
        *self.session.write().await = None;
        result
    }

    /// Current session status.
    pub async fn status(&self) -> DeviceStatus {
        self.session
            .read()
            .await
            .as_ref()
            .map_or(DeviceStatus::Disconnected, |s| s.status)
    }

    /// The current session, if any.
    pub async fn session(&self) -> Option<DeviceSession> {
        self.session.read().await.clone()
    }

    async fn ensure_operational(&self) -> Result<()> {
        let session = self.session.read().await;
        if session.as_ref().is_some_and(|s| s.status.is_operational()) {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    // --- Live Detections ---

    /// Start a live detection session for a kind.
    #[tracing::instrument(skip(self))]
    pub async fn start_detection(&self, kind: DetectionKind) -> Result<()> {
        self.ensure_operational().await?;
        self.guard.start(kind).await
    }

    /// Stop the detection session for a kind. Idle kinds are a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn stop_detection(&self, kind: DetectionKind) -> Result<()> {
        self.ensure_operational().await?;
        self.guard.stop(kind).await
    }

    /// Whether a detection session is currently running.
    pub async fn is_detecting(&self, kind: DetectionKind) -> bool {
        self.guard.is_active(kind).await
    }

    // --- History Reads ---

    /// Read the most recent night of sleep.
    pub async fn read_sleep(&self) -> Result<Option<SleepRecord>> {
        self.ensure_operational().await?;
        self.history.read_sleep().await
    }

    /// Read every sleep record in the default window, oldest first.
    pub async fn read_sleep_records(&self) -> Result<Vec<SleepRecord>> {
        self.ensure_operational().await?;
        self.history.read_sleep_records().await
    }

    /// Read today's step/activity snapshot.
    pub async fn read_steps(&self) -> Result<StepSnapshot> {
        self.ensure_operational().await?;
        self.history.read_steps().await
    }

    /// Read the step/activity snapshot for a past day (0 = today).
    pub async fn read_steps_for(&self, day_offset: u32) -> Result<StepSnapshot> {
        self.ensure_operational().await?;
        self.history.read_steps_for(day_offset).await
    }

    /// Read HRV history. `days` overrides the default window.
    pub async fn read_hrv(&self, days: Option<u32>) -> Result<HrvReadOutcome> {
        self.ensure_operational().await?;
        self.history.read_hrv(days).await
    }

    /// Read and aggregate multi-day 5-minute samples.
    #[tracing::instrument(skip(self))]
    pub async fn read_daily_samples(&self, days: u32) -> Result<Vec<DailySummary>> {
        self.ensure_operational().await?;
        self.history.read_daily_samples(days).await
    }

    /// Read and aggregate one past day's samples (0 = today).
    pub async fn read_daily_summary(&self, day_offset: u32) -> Result<DailySummary> {
        self.ensure_operational().await?;
        self.history.read_single_day(day_offset).await
    }

    // --- Device Reads and Writes ---

    async fn with_deadline<T>(
        &self,
        operation: &str,
        deadline: Duration,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match timeout(deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::operation(
                operation,
                format!("timed out after {deadline:?}"),
            )),
        }
    }

    /// Read device identity (model, firmware, hardware versions).
    pub async fn read_device_info(&self) -> Result<DeviceInfo> {
        self.ensure_operational().await?;
        let _write = self.write_lock.lock().await;
        self.with_deadline(
            "readDeviceInfo",
            self.config.device_info_timeout,
            self.transport.read_device_info(),
        )
        .await
    }

    /// Read the battery state.
    pub async fn read_battery(&self) -> Result<BatteryStatus> {
        self.ensure_operational().await?;
        let _write = self.write_lock.lock().await;
        self.with_deadline(
            "readBattery",
            self.config.operation_timeout,
            self.transport.read_battery(),
        )
        .await
    }

    /// Read the stored user profile.
    pub async fn read_user_profile(&self) -> Result<UserProfile> {
        self.ensure_operational().await?;
        let _write = self.write_lock.lock().await;
        self.with_deadline(
            "readUserProfile",
            self.config.operation_timeout,
            self.transport.read_user_profile(),
        )
        .await
    }

    /// Store a user profile on the device.
    pub async fn write_user_profile(&self, profile: &UserProfile) -> Result<()> {
        profile.validate()?;
        self.ensure_operational().await?;
        let _write = self.write_lock.lock().await;
        self.with_deadline(
            "writeUserProfile",
            self.config.operation_timeout,
            self.transport.write_user_profile(profile),
        )
        .await
    }

    /// Read the device settings block.
    pub async fn read_settings(&self) -> Result<DeviceSettings> {
        self.ensure_operational().await?;
        let _write = self.write_lock.lock().await;
        self.with_deadline(
            "readSettings",
            self.config.operation_timeout,
            self.transport.read_settings(),
        )
        .await
    }

    /// Apply a partial settings update.
    ///
    /// Reads the current block, overlays the patch, and writes the merged
    /// block back so untouched fields keep their on-device values.
    pub async fn update_settings(&self, patch: &DeviceSettingsPatch) -> Result<DeviceSettings> {
        if patch.is_empty() {
            return Err(Error::invalid_argument("settings patch is empty"));
        }
        self.ensure_operational().await?;
        let _write = self.write_lock.lock().await;
        let current = self
            .with_deadline(
                "readSettings",
                self.config.operation_timeout,
                self.transport.read_settings(),
            )
            .await?;
        let merged = patch.apply_to(&current);
        self.with_deadline(
            "writeSettings",
            self.config.operation_timeout,
            self.transport.write_settings(&merged),
        )
        .await?;
        Ok(merged)
    }

    /// Read the heart-rate warning thresholds.
    pub async fn read_heart_warning(&self) -> Result<HeartWarning> {
        self.ensure_operational().await?;
        let _write = self.write_lock.lock().await;
        self.with_deadline(
            "readHeartWarning",
            self.config.operation_timeout,
            self.transport.read_heart_warning(),
        )
        .await
    }

    /// Write the heart-rate warning thresholds.
    pub async fn write_heart_warning(&self, warning: &HeartWarning) -> Result<()> {
        if warning.low >= warning.high {
            return Err(Error::invalid_argument(
                "heart warning low bound must be below high bound",
            ));
        }
        self.ensure_operational().await?;
        let _write = self.write_lock.lock().await;
        self.with_deadline(
            "writeHeartWarning",
            self.config.operation_timeout,
            self.transport.write_heart_warning(warning),
        )
        .await
    }

    /// Read the blood-pressure alarm configuration.
    pub async fn read_blood_pressure_alarm(&self) -> Result<BloodPressureAlarm> {
        self.ensure_operational().await?;
        let _write = self.write_lock.lock().await;
        self.with_deadline(
            "readBloodPressureAlarm",
            self.config.operation_timeout,
            self.transport.read_blood_pressure_alarm(),
        )
        .await
    }

    /// Write the blood-pressure alarm configuration.
    pub async fn write_blood_pressure_alarm(&self, alarm: &BloodPressureAlarm) -> Result<()> {
        if alarm.systolic_low >= alarm.systolic_high || alarm.diastolic_low >= alarm.diastolic_high
        {
            return Err(Error::invalid_argument(
                "alarm low bounds must be below high bounds",
            ));
        }
        self.ensure_operational().await?;
        let _write = self.write_lock.lock().await;
        self.with_deadline(
            "writeBloodPressureAlarm",
            self.config.operation_timeout,
            self.transport.write_blood_pressure_alarm(alarm),
        )
        .await
    }

    /// Toggle the glucose sensor's calibration (adjusting) mode.
    pub async fn set_glucose_calibration(&self, enabled: bool) -> Result<()> {
        self.ensure_operational().await?;
        let _write = self.write_lock.lock().await;
        self.with_deadline(
            "setGlucoseCalibration",
            self.config.operation_timeout,
            self.transport.set_glucose_calibration(enabled),
        )
        .await
    }

    /// Toggle do-not-disturb through the settings block.
    pub async fn set_do_not_disturb(
        &self,
        enabled: bool,
        start_minutes: Option<u16>,
        end_minutes: Option<u16>,
    ) -> Result<DeviceSettings> {
        let patch = DeviceSettingsPatch {
            do_not_disturb: Some(enabled),
            do_not_disturb_start: start_minutes,
            do_not_disturb_end: end_minutes,
            ..Default::default()
        };
        self.update_settings(&patch).await
    }

    /// Kinds this device can read as history.
    pub fn supported_history(&self) -> Vec<HistoryKind> {
        [
            HistoryKind::Sleep,
            HistoryKind::Steps,
            HistoryKind::Hrv,
            HistoryKind::DailySamples,
        ]
        .into_iter()
        .filter(|&kind| self.transport.supports_history(kind))
        .collect()
    }

    /// Kinds this device can run as live detections.
    pub fn supported_detections(&self) -> Vec<DetectionKind> {
        DetectionKind::ALL
            .into_iter()
            .filter(|&kind| self.transport.supports_detection(kind))
            .collect()
    }
}
