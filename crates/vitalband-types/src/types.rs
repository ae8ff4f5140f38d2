//! Core types for VitalBand wearable data.

use core::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// One of the live physiological measurements a tracker can run.
///
/// The set is closed: every detection session, event stream and error code
/// in the system is keyed by exactly one of these variants. Historical
/// reads (sleep, steps, HRV, daily samples) are a separate axis, see
/// [`HistoryKind`].
///
/// # Examples
///
/// ```
/// use vitalband_types::DetectionKind;
///
/// assert_eq!(DetectionKind::HeartRate.as_str(), "heartRate");
/// assert_eq!("bloodPressure".parse(), Ok(DetectionKind::BloodPressure));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum DetectionKind {
    /// Optical heart-rate measurement.
    HeartRate,
    /// Blood oxygen saturation (SpO2).
    Spo2,
    /// Blood pressure (systolic/diastolic).
    BloodPressure,
    /// Blood glucose.
    BloodGlucose,
    /// Body and wrist temperature.
    Temperature,
    /// Electrocardiogram with live waveform.
    Ecg,
    /// Blood components (uric acid, lipids).
    BloodComponent,
}

impl DetectionKind {
    /// All detection kinds, in a fixed order.
    pub const ALL: [DetectionKind; 7] = [
        DetectionKind::HeartRate,
        DetectionKind::Spo2,
        DetectionKind::BloodPressure,
        DetectionKind::BloodGlucose,
        DetectionKind::Temperature,
        DetectionKind::Ecg,
        DetectionKind::BloodComponent,
    ];

    /// The camelCase name used in command names and event payloads.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionKind::HeartRate => "heartRate",
            DetectionKind::Spo2 => "spo2",
            DetectionKind::BloodPressure => "bloodPressure",
            DetectionKind::BloodGlucose => "bloodGlucose",
            DetectionKind::Temperature => "temperature",
            DetectionKind::Ecg => "ecg",
            DetectionKind::BloodComponent => "bloodComponent",
        }
    }

    /// The SCREAMING_SNAKE fragment used in machine-readable error codes,
    /// e.g. `START_HEART_ERROR` or `ECG_NOT_SUPPORTED`.
    #[must_use]
    pub fn code_fragment(&self) -> &'static str {
        match self {
            DetectionKind::HeartRate => "HEART",
            DetectionKind::Spo2 => "SPO2",
            DetectionKind::BloodPressure => "BLOOD_PRESSURE",
            DetectionKind::BloodGlucose => "BLOOD_GLUCOSE",
            DetectionKind::Temperature => "TEMPERATURE",
            DetectionKind::Ecg => "ECG",
            DetectionKind::BloodComponent => "BLOOD_COMPONENT",
        }
    }
}

impl FromStr for DetectionKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heartRate" => Ok(DetectionKind::HeartRate),
            "spo2" => Ok(DetectionKind::Spo2),
            "bloodPressure" => Ok(DetectionKind::BloodPressure),
            "bloodGlucose" => Ok(DetectionKind::BloodGlucose),
            "temperature" => Ok(DetectionKind::Temperature),
            "ecg" => Ok(DetectionKind::Ecg),
            "bloodComponent" => Ok(DetectionKind::BloodComponent),
            other => Err(ParseError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the bounded multi-record reads a tracker can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum HistoryKind {
    /// Per-night sleep records.
    Sleep,
    /// Step/activity snapshot derived from today's samples.
    Steps,
    /// Heart-rate-variability records plus a day score.
    Hrv,
    /// Raw 5-minute-interval samples covering multiple metrics per day.
    DailySamples,
}

impl HistoryKind {
    /// The SCREAMING_SNAKE fragment used in machine-readable error codes,
    /// e.g. `SLEEP_TIMEOUT` or `ORIGIN_DATA_REQUEST_FAILED`.
    #[must_use]
    pub fn code_fragment(&self) -> &'static str {
        match self {
            HistoryKind::Sleep => "SLEEP",
            HistoryKind::Steps => "STEP",
            HistoryKind::Hrv => "HRV",
            HistoryKind::DailySamples => "ORIGIN_DATA",
        }
    }
}

impl fmt::Display for HistoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryKind::Sleep => write!(f, "sleep"),
            HistoryKind::Steps => write!(f, "steps"),
            HistoryKind::Hrv => write!(f, "hrv"),
            HistoryKind::DailySamples => write!(f, "dailySamples"),
        }
    }
}

/// Canonical state attached to every emitted telemetry event.
///
/// `NotSupported` comes only from the vendor status table; the progress
/// classifier never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum DetectionState {
    /// No measurement in progress.
    Idle,
    /// Measurement running, partial data may be present.
    Measuring,
    /// Measurement finished with a result.
    Complete,
    /// Measurement aborted by the device (low power, busy, wear error).
    Failed,
    /// Signal too poor to produce a result (ECG).
    PoorSignal,
    /// The device does not support this measurement.
    NotSupported,
    /// The vendor callback carried no usable state.
    Unknown,
}

impl DetectionState {
    /// The camelCase name used in event payloads.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionState::Idle => "idle",
            DetectionState::Measuring => "measuring",
            DetectionState::Complete => "complete",
            DetectionState::Failed => "failed",
            DetectionState::PoorSignal => "poorSignal",
            DetectionState::NotSupported => "notSupported",
            DetectionState::Unknown => "unknown",
        }
    }

    /// Classify a progress percentage.
    ///
    /// Exactly: `0` is idle, anything strictly between 0 and 100 is
    /// measuring, `100` and above is complete.
    ///
    /// # Examples
    ///
    /// ```
    /// use vitalband_types::DetectionState;
    ///
    /// assert_eq!(DetectionState::from_progress(0), DetectionState::Idle);
    /// assert_eq!(DetectionState::from_progress(55), DetectionState::Measuring);
    /// assert_eq!(DetectionState::from_progress(100), DetectionState::Complete);
    /// ```
    #[must_use]
    pub fn from_progress(progress: u8) -> Self {
        match progress {
            0 => DetectionState::Idle,
            1..=99 => DetectionState::Measuring,
            _ => DetectionState::Complete,
        }
    }

    /// Whether this state ends a detection session.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DetectionState::Complete | DetectionState::Failed | DetectionState::NotSupported
        )
    }
}

impl fmt::Display for DetectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw status the device firmware reports alongside a detection error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum VendorStatus {
    /// The firmware does not implement this measurement.
    NotSupported,
    /// The measurement is available (idle).
    Enabled,
    /// A measurement is already running.
    Detecting,
    /// Battery too low to measure.
    LowPower,
    /// The device is busy with another operation.
    Busy,
    /// The device is not worn correctly.
    WearError,
    /// Anything the firmware did not name.
    Unknown,
}

impl VendorStatus {
    /// The fixed mapping from firmware status to canonical state.
    ///
    /// # Examples
    ///
    /// ```
    /// use vitalband_types::{DetectionState, VendorStatus};
    ///
    /// assert_eq!(VendorStatus::Busy.canonical_state(), DetectionState::Failed);
    /// assert_eq!(VendorStatus::Enabled.canonical_state(), DetectionState::Idle);
    /// ```
    #[must_use]
    pub fn canonical_state(&self) -> DetectionState {
        match self {
            VendorStatus::NotSupported => DetectionState::NotSupported,
            VendorStatus::Enabled => DetectionState::Idle,
            VendorStatus::Detecting => DetectionState::Measuring,
            VendorStatus::LowPower | VendorStatus::Busy | VendorStatus::WearError => {
                DetectionState::Failed
            }
            VendorStatus::Unknown => DetectionState::Unknown,
        }
    }
}

/// Risk classification the firmware attaches to a glucose result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum GlucoseRiskLevel {
    /// No elevated risk.
    None,
    /// Slightly elevated.
    Low,
    /// Elevated.
    Middle,
    /// Strongly elevated.
    High,
    /// The firmware did not classify the result.
    Unknown,
}

/// Connection status of the single device session.
///
/// The coordinator walks `Disconnected -> Connecting -> Connected -> Bound`
/// and back to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum DeviceStatus {
    /// No session.
    Disconnected,
    /// Connect issued, not yet acknowledged.
    Connecting,
    /// Link established, not yet authenticated.
    Connected,
    /// Link established and password-bound.
    Bound,
}

impl DeviceStatus {
    /// Whether detection and read operations may be issued.
    #[must_use]
    pub fn is_operational(&self) -> bool {
        matches!(self, DeviceStatus::Connected | DeviceStatus::Bound)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::Disconnected => write!(f, "disconnected"),
            DeviceStatus::Connecting => write!(f, "connecting"),
            DeviceStatus::Connected => write!(f, "connected"),
            DeviceStatus::Bound => write!(f, "bound"),
        }
    }
}

/// User sex as the firmware encodes it (0 = female, 1 = male).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum Gender {
    /// Firmware code 0.
    Female,
    /// Firmware code 1.
    Male,
    /// Any other firmware code.
    Other,
}

impl Gender {
    /// Decode the firmware sex code.
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Gender::Female,
            1 => Gender::Male,
            _ => Gender::Other,
        }
    }

    /// The firmware sex code.
    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            Gender::Female => 0,
            Gender::Male => 1,
            Gender::Other => 2,
        }
    }
}

/// Display language of the tracker firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum DeviceLanguage {
    /// Firmware index 0, ISO "en".
    #[default]
    English,
    /// Firmware index 1, ISO "zh".
    Chinese,
    /// Firmware index 2, ISO "ja".
    Japanese,
    /// Firmware index 3, ISO "ko".
    Korean,
    /// Firmware index 4, ISO "de".
    German,
    /// Firmware index 5, ISO "fr".
    French,
    /// Firmware index 6, ISO "es".
    Spanish,
    /// Firmware index 7, ISO "it".
    Italian,
    /// Firmware index 8, ISO "pt".
    Portuguese,
    /// Firmware index 9, ISO "ru".
    Russian,
}

impl DeviceLanguage {
    /// Decode the firmware language index; unknown indices fall back to
    /// English, matching device behavior.
    #[must_use]
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => DeviceLanguage::Chinese,
            2 => DeviceLanguage::Japanese,
            3 => DeviceLanguage::Korean,
            4 => DeviceLanguage::German,
            5 => DeviceLanguage::French,
            6 => DeviceLanguage::Spanish,
            7 => DeviceLanguage::Italian,
            8 => DeviceLanguage::Portuguese,
            9 => DeviceLanguage::Russian,
            _ => DeviceLanguage::English,
        }
    }

    /// The firmware language index.
    #[must_use]
    pub fn index(&self) -> u8 {
        match self {
            DeviceLanguage::English => 0,
            DeviceLanguage::Chinese => 1,
            DeviceLanguage::Japanese => 2,
            DeviceLanguage::Korean => 3,
            DeviceLanguage::German => 4,
            DeviceLanguage::French => 5,
            DeviceLanguage::Spanish => 6,
            DeviceLanguage::Italian => 7,
            DeviceLanguage::Portuguese => 8,
            DeviceLanguage::Russian => 9,
        }
    }

    /// Look up a language from its two-letter ISO code.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnknownLanguage`] for codes the firmware has
    /// no translation for.
    pub fn from_iso(code: &str) -> Result<Self, ParseError> {
        match code {
            "en" => Ok(DeviceLanguage::English),
            "zh" => Ok(DeviceLanguage::Chinese),
            "ja" => Ok(DeviceLanguage::Japanese),
            "ko" => Ok(DeviceLanguage::Korean),
            "de" => Ok(DeviceLanguage::German),
            "fr" => Ok(DeviceLanguage::French),
            "es" => Ok(DeviceLanguage::Spanish),
            "it" => Ok(DeviceLanguage::Italian),
            "pt" => Ok(DeviceLanguage::Portuguese),
            "ru" => Ok(DeviceLanguage::Russian),
            other => Err(ParseError::UnknownLanguage(other.to_string())),
        }
    }
}

/// Temperature display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum TemperatureUnit {
    /// Firmware mode 0.
    #[default]
    Celsius,
    /// Firmware mode 1.
    Fahrenheit,
}

/// Distance display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum DistanceUnit {
    /// Firmware mode 0.
    #[default]
    Metric,
    /// Firmware mode 1.
    Imperial,
}

/// Static information reported by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DeviceInfo {
    /// Marketing model name.
    pub model_name: String,
    /// Hardware revision.
    pub hardware_version: String,
    /// Firmware revision.
    pub software_version: String,
    /// Vendor serial number.
    pub serial_number: String,
    /// BLE MAC address.
    pub mac_address: String,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Battery level percentage (0-100).
    pub battery_level: u8,
    /// Whether the tracker is charging.
    pub is_charging: bool,
    /// Screen width in pixels.
    pub screen_width: u16,
    /// Screen height in pixels.
    pub screen_height: u16,
    /// Feature names the firmware advertises.
    pub supported_features: Vec<String>,
}

/// Battery snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BatteryStatus {
    /// Battery level percentage (0-100).
    pub level: u8,
    /// Whether the tracker is charging.
    pub is_charging: bool,
}

/// Default daily step goal written when the caller provides none.
pub const DEFAULT_TARGET_STEPS: u32 = 10_000;

/// Default daily sleep goal in minutes (8 hours).
pub const DEFAULT_TARGET_SLEEP_MINUTES: u16 = 480;

#[cfg(feature = "serde")]
fn default_target_steps() -> u32 {
    DEFAULT_TARGET_STEPS
}

#[cfg(feature = "serde")]
fn default_target_sleep_minutes() -> u16 {
    DEFAULT_TARGET_SLEEP_MINUTES
}

/// User profile synced to the tracker for calorie/distance math.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct UserProfile {
    /// Height in centimeters.
    pub height_cm: u16,
    /// Weight in kilograms.
    pub weight_kg: f32,
    /// Age in years.
    pub age: u8,
    /// Sex as the firmware encodes it.
    pub gender: Gender,
    /// Daily step goal. Callers that omit it get the default goal.
    #[cfg_attr(feature = "serde", serde(default = "default_target_steps"))]
    pub target_steps: u32,
    /// Daily sleep goal in minutes. Defaulted like the step goal.
    #[cfg_attr(feature = "serde", serde(default = "default_target_sleep_minutes"))]
    pub target_sleep_minutes: u16,
}

impl UserProfile {
    /// Build a profile with the default goals.
    #[must_use]
    pub fn new(height_cm: u16, weight_kg: f32, age: u8, gender: Gender) -> Self {
        Self {
            height_cm,
            weight_kg,
            age,
            gender,
            target_steps: DEFAULT_TARGET_STEPS,
            target_sleep_minutes: DEFAULT_TARGET_SLEEP_MINUTES,
        }
    }

    /// Set the daily step goal.
    #[must_use]
    pub fn with_target_steps(mut self, steps: u32) -> Self {
        self.target_steps = steps;
        self
    }

    /// Set the daily sleep goal.
    #[must_use]
    pub fn with_target_sleep_minutes(mut self, minutes: u16) -> Self {
        self.target_sleep_minutes = minutes;
        self
    }

    /// Validate the profile the way the firmware does.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidValue`] when height, weight or age is
    /// zero or nonsensical.
    pub fn validate(&self) -> Result<(), ParseError> {
        if self.height_cm == 0 || self.height_cm > 250 {
            return Err(ParseError::InvalidValue(format!(
                "height {} cm is outside valid range (1-250)",
                self.height_cm
            )));
        }
        if !(1.0..=400.0).contains(&self.weight_kg) {
            return Err(ParseError::InvalidValue(format!(
                "weight {} kg is outside valid range (1-400)",
                self.weight_kg
            )));
        }
        if self.age == 0 {
            return Err(ParseError::InvalidValue("age must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// The tracker's custom-settings block, as read from the device.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DeviceSettings {
    /// Screen brightness level (0-5).
    pub screen_brightness: u8,
    /// Screen-on duration in seconds.
    pub screen_duration_seconds: u16,
    /// Whether the clock uses 24-hour format.
    pub is_24_hour_format: bool,
    /// Display language.
    pub language: DeviceLanguage,
    /// Temperature display unit.
    pub temperature_unit: TemperatureUnit,
    /// Distance display unit.
    pub distance_unit: DistanceUnit,
    /// Whether raising the wrist wakes the screen.
    pub wrist_raise_to_wake: bool,
    /// Wrist-raise sensitivity (0-2); the settings block read from the
    /// device does not carry it, so reads report `None`.
    pub wrist_raise_sensitivity: Option<u8>,
    /// Whether do-not-disturb is active.
    pub do_not_disturb: bool,
    /// Do-not-disturb window start, minutes from midnight.
    pub do_not_disturb_start: u16,
    /// Do-not-disturb window end, minutes from midnight.
    pub do_not_disturb_end: u16,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            screen_brightness: 3,
            screen_duration_seconds: 10,
            is_24_hour_format: true,
            language: DeviceLanguage::English,
            temperature_unit: TemperatureUnit::Celsius,
            distance_unit: DistanceUnit::Metric,
            wrist_raise_to_wake: true,
            wrist_raise_sensitivity: Some(1),
            do_not_disturb: false,
            do_not_disturb_start: 0,
            do_not_disturb_end: 0,
        }
    }
}

/// A partial settings update. Only present fields are written; everything
/// else keeps the value currently on the device.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct DeviceSettingsPatch {
    /// New screen brightness (0-5).
    pub screen_brightness: Option<u8>,
    /// New screen-on duration in seconds.
    pub screen_duration_seconds: Option<u16>,
    /// New clock format.
    pub is_24_hour_format: Option<bool>,
    /// New display language.
    pub language: Option<DeviceLanguage>,
    /// New temperature unit.
    pub temperature_unit: Option<TemperatureUnit>,
    /// New distance unit.
    pub distance_unit: Option<DistanceUnit>,
    /// New wrist-raise flag.
    pub wrist_raise_to_wake: Option<bool>,
    /// New wrist-raise sensitivity (0-2).
    pub wrist_raise_sensitivity: Option<u8>,
    /// New do-not-disturb flag.
    pub do_not_disturb: Option<bool>,
    /// New do-not-disturb start, minutes from midnight.
    pub do_not_disturb_start: Option<u16>,
    /// New do-not-disturb end, minutes from midnight.
    pub do_not_disturb_end: Option<u16>,
}

impl DeviceSettingsPatch {
    /// Whether the patch changes anything at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &DeviceSettingsPatch::default()
    }

    /// Overlay this patch onto the settings currently on the device.
    #[must_use]
    pub fn apply_to(&self, current: &DeviceSettings) -> DeviceSettings {
        DeviceSettings {
            screen_brightness: self.screen_brightness.unwrap_or(current.screen_brightness),
            screen_duration_seconds: self
                .screen_duration_seconds
                .unwrap_or(current.screen_duration_seconds),
            is_24_hour_format: self.is_24_hour_format.unwrap_or(current.is_24_hour_format),
            language: self.language.unwrap_or(current.language),
            temperature_unit: self.temperature_unit.unwrap_or(current.temperature_unit),
            distance_unit: self.distance_unit.unwrap_or(current.distance_unit),
            wrist_raise_to_wake: self
                .wrist_raise_to_wake
                .unwrap_or(current.wrist_raise_to_wake),
            wrist_raise_sensitivity: self
                .wrist_raise_sensitivity
                .or(current.wrist_raise_sensitivity),
            do_not_disturb: self.do_not_disturb.unwrap_or(current.do_not_disturb),
            do_not_disturb_start: self
                .do_not_disturb_start
                .unwrap_or(current.do_not_disturb_start),
            do_not_disturb_end: self.do_not_disturb_end.unwrap_or(current.do_not_disturb_end),
        }
    }
}

/// Heart-rate warning thresholds stored on the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct HeartWarning {
    /// Upper bound in BPM.
    pub high: u16,
    /// Lower bound in BPM.
    pub low: u16,
    /// Whether the warning is active.
    pub open: bool,
}

/// Blood-pressure alarm thresholds stored on the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BloodPressureAlarm {
    /// Upper systolic bound in mmHg.
    pub systolic_high: u16,
    /// Lower systolic bound in mmHg.
    pub systolic_low: u16,
    /// Upper diastolic bound in mmHg.
    pub diastolic_high: u16,
    /// Lower diastolic bound in mmHg.
    pub diastolic_low: u16,
    /// Whether the alarm is active.
    pub enabled: bool,
}
