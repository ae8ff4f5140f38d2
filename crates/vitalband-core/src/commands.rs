//! Host command dispatch.
//!
//! Hosts talk to the coordinator through named commands with JSON
//! arguments. This module is the single translation point: argument
//! extraction, name routing, result serialization, and the stable error
//! codes of [`Error::code`]. Nothing below this layer sees JSON.

use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use tracing::warn;

use vitalband_types::{
    BloodPressureAlarm, DetectionKind, DeviceLanguage, DeviceSettingsPatch, HeartWarning,
    UserProfile,
};

use crate::coordinator::DeviceSessionCoordinator;
use crate::error::{Error, Result};
use crate::platform::PermissionOutcome;

/// One named command from the host.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    /// Command name, camelCase.
    pub name: String,
    /// Named arguments.
    pub args: Map<String, Value>,
}

impl CommandRequest {
    /// Build a request from a name and optional JSON argument object.
    #[must_use]
    pub fn new(name: impl Into<String>, args: Option<Value>) -> Self {
        let args = match args {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            args,
        }
    }

    fn str_arg(&self, key: &str) -> Result<&str> {
        self.args
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_argument(format!("'{key}' is required")))
    }

    fn bool_arg(&self, key: &str) -> Result<bool> {
        self.args
            .get(key)
            .and_then(Value::as_bool)
            .ok_or_else(|| Error::invalid_argument(format!("'{key}' is required")))
    }

    fn u64_arg(&self, key: &str) -> Result<u64> {
        self.args
            .get(key)
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::invalid_argument(format!("'{key}' is required")))
    }

    fn opt_u64_arg(&self, key: &str) -> Option<u64> {
        self.args.get(key).and_then(Value::as_u64)
    }

    fn i64_arg(&self, key: &str) -> Result<i64> {
        self.args
            .get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::invalid_argument(format!("'{key}' is required")))
    }
}

/// The reply sent back to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    /// Command succeeded with a JSON result.
    Success(Value),
    /// Command failed with a stable code and a human-readable message.
    Error {
        /// Stable SCREAMING_SNAKE code.
        code: String,
        /// Description for logs and debugging, not for dispatch.
        message: String,
    },
}

impl CommandReply {
    fn ok<T: serde::Serialize>(value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => CommandReply::Success(value),
            Err(e) => CommandReply::Error {
                code: "OPERATION_ERROR".to_string(),
                message: format!("failed to serialize result: {e}"),
            },
        }
    }

    fn err(code: impl Into<String>, message: impl Into<String>) -> Self {
        CommandReply::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    fn from_result<T: serde::Serialize>(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => Self::err(e.code(), e.to_string()),
        }
    }
}

/// How many days back a timestamp lies (0 = today, clamped at 0).
fn day_offset_for_timestamp(timestamp_ms: i64) -> u32 {
    let Ok(then) = OffsetDateTime::from_unix_timestamp(timestamp_ms / 1_000) else {
        return 0;
    };
    let today = OffsetDateTime::now_utc().date();
    let days = (today.to_julian_day() - then.date().to_julian_day()).max(0);
    days as u32
}

/// `yyyy-MM-dd` for a Unix-millisecond timestamp, for range filters.
fn date_key(timestamp_ms: i64) -> String {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    OffsetDateTime::from_unix_timestamp(timestamp_ms / 1_000)
        .map(|dt| dt.date().format(&format).unwrap_or_default())
        .unwrap_or_default()
}

fn permission_outcome_value(outcome: PermissionOutcome) -> Value {
    match outcome {
        PermissionOutcome::Granted => json!("granted"),
        PermissionOutcome::Denied => json!("denied"),
        PermissionOutcome::PermanentlyDenied => json!("permanentlyDenied"),
    }
}

/// Firmware reads the device family has no protocol for.
fn unsupported_read(kind: DetectionKind) -> CommandReply {
    CommandReply::err(
        format!("{}_NOT_SUPPORTED", kind.code_fragment()),
        format!("{kind} reads are not supported by the device firmware"),
    )
}

/// Route one command to the coordinator and shape its reply.
pub async fn dispatch(
    coordinator: &DeviceSessionCoordinator,
    request: CommandRequest,
) -> CommandReply {
    match request.name.as_str() {
        // --- Platform ---
        "requestBluetoothPermissions" => match coordinator.request_bluetooth_permissions().await {
            Ok(outcome) => CommandReply::Success(permission_outcome_value(outcome)),
            Err(e) => CommandReply::err(e.code(), e.to_string()),
        },
        "openAppSettings" => CommandReply::from_result(coordinator.open_app_settings().await),
        "isBluetoothEnabled" => CommandReply::from_result(coordinator.is_bluetooth_enabled().await),
        "openBluetooth" => CommandReply::from_result(coordinator.open_bluetooth().await),
        "closeBluetooth" => CommandReply::from_result(coordinator.close_bluetooth().await),

        // --- Scan and connection ---
        "scanDevices" => CommandReply::from_result(coordinator.start_scan().await),
        "stopScanDevices" => CommandReply::from_result(coordinator.stop_scan().await),
        "connectDevice" => match request.str_arg("address") {
            Ok(address) => CommandReply::from_result(coordinator.connect(address).await),
            Err(e) => CommandReply::err(e.code(), e.to_string()),
        },
        "bindDevice" => {
            let password = match request.str_arg("password") {
                Ok(p) => p,
                Err(e) => return CommandReply::err(e.code(), e.to_string()),
            };
            match request.bool_arg("is24H") {
                Ok(is_24h) => CommandReply::from_result(coordinator.bind(password, is_24h).await),
                Err(e) => CommandReply::err(e.code(), e.to_string()),
            }
        }
        "disconnectDevice" => CommandReply::from_result(coordinator.disconnect().await),
        "getAddress" => match coordinator.session().await {
            Some(session) => CommandReply::Success(json!(session.address)),
            None => CommandReply::err(
                Error::NotConnected.code(),
                Error::NotConnected.to_string(),
            ),
        },
        "getCurrentStatus" => CommandReply::ok(coordinator.status().await),
        "isDeviceConnected" => {
            CommandReply::Success(json!(coordinator.status().await.is_operational()))
        }

        // --- Live detections ---
        "startDetectHeart" => {
            CommandReply::from_result(coordinator.start_detection(DetectionKind::HeartRate).await)
        }
        "stopDetectHeart" => {
            CommandReply::from_result(coordinator.stop_detection(DetectionKind::HeartRate).await)
        }
        "startDetectSpoh" => {
            CommandReply::from_result(coordinator.start_detection(DetectionKind::Spo2).await)
        }
        "stopDetectSpoh" => {
            CommandReply::from_result(coordinator.stop_detection(DetectionKind::Spo2).await)
        }
        "startDetectBloodPressure" => CommandReply::from_result(
            coordinator
                .start_detection(DetectionKind::BloodPressure)
                .await,
        ),
        "stopDetectBloodPressure" => CommandReply::from_result(
            coordinator
                .stop_detection(DetectionKind::BloodPressure)
                .await,
        ),
        "startDetectTemperature" => CommandReply::from_result(
            coordinator
                .start_detection(DetectionKind::Temperature)
                .await,
        ),
        "stopDetectTemperature" => CommandReply::from_result(
            coordinator
                .stop_detection(DetectionKind::Temperature)
                .await,
        ),
        "startDetectBloodGlucose" => CommandReply::from_result(
            coordinator
                .start_detection(DetectionKind::BloodGlucose)
                .await,
        ),
        "stopDetectBloodGlucose" => CommandReply::from_result(
            coordinator
                .stop_detection(DetectionKind::BloodGlucose)
                .await,
        ),
        "startDetectEcg" => {
            CommandReply::from_result(coordinator.start_detection(DetectionKind::Ecg).await)
        }
        "stopDetectEcg" => {
            CommandReply::from_result(coordinator.stop_detection(DetectionKind::Ecg).await)
        }
        "startDetectBloodComponent" => CommandReply::from_result(
            coordinator
                .start_detection(DetectionKind::BloodComponent)
                .await,
        ),
        "stopDetectBloodComponent" => CommandReply::from_result(
            coordinator
                .stop_detection(DetectionKind::BloodComponent)
                .await,
        ),

        // --- Alarms and calibration ---
        "settingHeartWarning" => {
            let high = request.u64_arg("high");
            let low = request.u64_arg("low");
            let open = request.bool_arg("open");
            match (high, low, open) {
                (Ok(high), Ok(low), Ok(open)) => {
                    let warning = HeartWarning {
                        high: high as u16,
                        low: low as u16,
                        open,
                    };
                    CommandReply::from_result(coordinator.write_heart_warning(&warning).await)
                }
                (Err(e), ..) | (_, Err(e), _) | (.., Err(e)) => {
                    CommandReply::err(e.code(), e.to_string())
                }
            }
        }
        "readHeartWarning" => CommandReply::from_result(coordinator.read_heart_warning().await),
        "setBloodPressureAlarm" => {
            let fields = (
                request.u64_arg("systolicHigh"),
                request.u64_arg("systolicLow"),
                request.u64_arg("diastolicHigh"),
                request.u64_arg("diastolicLow"),
                request.bool_arg("enabled"),
            );
            match fields {
                (Ok(sh), Ok(sl), Ok(dh), Ok(dl), Ok(enabled)) => {
                    let alarm = BloodPressureAlarm {
                        systolic_high: sh as u16,
                        systolic_low: sl as u16,
                        diastolic_high: dh as u16,
                        diastolic_low: dl as u16,
                        enabled,
                    };
                    CommandReply::from_result(
                        coordinator.write_blood_pressure_alarm(&alarm).await,
                    )
                }
                (Err(e), ..)
                | (_, Err(e), ..)
                | (_, _, Err(e), ..)
                | (_, _, _, Err(e), _)
                | (.., Err(e)) => CommandReply::err(e.code(), e.to_string()),
            }
        }
        "setBloodGlucoseCalibration" => match request.bool_arg("enabled") {
            Ok(enabled) => {
                CommandReply::from_result(coordinator.set_glucose_calibration(enabled).await)
            }
            Err(e) => CommandReply::err(e.code(), e.to_string()),
        },

        // --- Device reads ---
        "readBattery" => CommandReply::from_result(coordinator.read_battery().await),
        "getDeviceInfo" => CommandReply::from_result(coordinator.read_device_info().await),

        // --- History ---
        "readSleepData" => CommandReply::from_result(coordinator.read_sleep().await),
        "readSleepHistory" => {
            let start = request.i64_arg("startTimestamp");
            let end = request.i64_arg("endTimestamp");
            match (start, end) {
                (Ok(start), Ok(end)) => match coordinator.read_sleep_records().await {
                    Ok(records) => {
                        let (from, to) = (date_key(start), date_key(end));
                        let filtered: Vec<_> = records
                            .into_iter()
                            .filter(|r| {
                                r.date
                                    .as_deref()
                                    .is_some_and(|d| d >= from.as_str() && d <= to.as_str())
                            })
                            .collect();
                        CommandReply::ok(filtered)
                    }
                    Err(e) => CommandReply::err(e.code(), e.to_string()),
                },
                (Err(e), _) | (_, Err(e)) => CommandReply::err(e.code(), e.to_string()),
            }
        }
        "readStepData" => CommandReply::from_result(coordinator.read_steps().await),
        "readStepDataForDate" => match request.i64_arg("timestamp") {
            Ok(timestamp) => {
                let offset = day_offset_for_timestamp(timestamp);
                CommandReply::from_result(coordinator.read_steps_for(offset).await)
            }
            Err(e) => CommandReply::err(e.code(), e.to_string()),
        },
        "readStepHistory" => {
            let start = request.i64_arg("startTimestamp");
            let end = request.i64_arg("endTimestamp");
            match (start, end) {
                (Ok(start), Ok(end)) => {
                    let days = day_offset_for_timestamp(start).saturating_add(1);
                    match coordinator.read_daily_samples(days).await {
                        Ok(summaries) => {
                            let (from, to) = (date_key(start), date_key(end));
                            let entries: Vec<Value> = summaries
                                .iter()
                                .filter(|s| s.date.as_str() >= from.as_str() && s.date.as_str() <= to.as_str())
                                .map(|s| {
                                    json!({
                                        "date": s.date,
                                        "dayLabel": s.day_label,
                                        "totalSteps": s.total_steps,
                                        "totalCalories": s.total_calories,
                                        "totalDistance": s.total_distance,
                                    })
                                })
                                .collect();
                            CommandReply::Success(Value::Array(entries))
                        }
                        Err(e) => CommandReply::err(e.code(), e.to_string()),
                    }
                }
                (Err(e), _) | (_, Err(e)) => CommandReply::err(e.code(), e.to_string()),
            }
        }
        "readHrvData" => {
            let days = request.opt_u64_arg("days").map(|d| d as u32);
            CommandReply::from_result(coordinator.read_hrv(days).await)
        }
        "readDailySummaries" => {
            let days = request.opt_u64_arg("days").map_or(3, |d| d as u32);
            CommandReply::from_result(coordinator.read_daily_samples(days).await)
        }
        "readDailySummary" => match request.u64_arg("day") {
            Ok(day) => CommandReply::from_result(coordinator.read_daily_summary(day as u32).await),
            Err(e) => CommandReply::err(e.code(), e.to_string()),
        },

        // --- Profile and settings ---
        "setUserProfile" => {
            match serde_json::from_value::<UserProfile>(Value::Object(request.args.clone())) {
                Ok(profile) => {
                    CommandReply::from_result(coordinator.write_user_profile(&profile).await)
                }
                Err(e) => CommandReply::err("INVALID_ARGUMENT", format!("invalid profile: {e}")),
            }
        }
        "getUserProfile" => CommandReply::from_result(coordinator.read_user_profile().await),
        "setDeviceSettings" => {
            match serde_json::from_value::<DeviceSettingsPatch>(Value::Object(request.args.clone()))
            {
                Ok(patch) => CommandReply::from_result(coordinator.update_settings(&patch).await),
                Err(e) => CommandReply::err("INVALID_ARGUMENT", format!("invalid settings: {e}")),
            }
        }
        "getDeviceSettings" => CommandReply::from_result(coordinator.read_settings().await),
        "setScreenBrightness" => match request.u64_arg("brightness") {
            Ok(brightness) if brightness <= 5 => {
                let patch = DeviceSettingsPatch {
                    screen_brightness: Some(brightness as u8),
                    ..Default::default()
                };
                CommandReply::from_result(coordinator.update_settings(&patch).await)
            }
            Ok(brightness) => CommandReply::err(
                "INVALID_ARGUMENT",
                format!("brightness {brightness} is outside valid range (0-5)"),
            ),
            Err(e) => CommandReply::err(e.code(), e.to_string()),
        },
        "setScreenDuration" => match request.u64_arg("seconds") {
            Ok(seconds) => {
                let patch = DeviceSettingsPatch {
                    screen_duration_seconds: Some(seconds as u16),
                    ..Default::default()
                };
                CommandReply::from_result(coordinator.update_settings(&patch).await)
            }
            Err(e) => CommandReply::err(e.code(), e.to_string()),
        },
        "setTimeFormat" => match request.bool_arg("is24Hour") {
            Ok(is_24h) => {
                let patch = DeviceSettingsPatch {
                    is_24_hour_format: Some(is_24h),
                    ..Default::default()
                };
                CommandReply::from_result(coordinator.update_settings(&patch).await)
            }
            Err(e) => CommandReply::err(e.code(), e.to_string()),
        },
        "setLanguage" => match request.str_arg("languageCode") {
            Ok(code) => match DeviceLanguage::from_iso(code) {
                Ok(language) => {
                    let patch = DeviceSettingsPatch {
                        language: Some(language),
                        ..Default::default()
                    };
                    CommandReply::from_result(coordinator.update_settings(&patch).await)
                }
                Err(e) => CommandReply::err("INVALID_ARGUMENT", e.to_string()),
            },
            Err(e) => CommandReply::err(e.code(), e.to_string()),
        },
        "setWristRaiseToWake" => match request.bool_arg("enabled") {
            Ok(enabled) => {
                let patch = DeviceSettingsPatch {
                    wrist_raise_to_wake: Some(enabled),
                    wrist_raise_sensitivity: request
                        .opt_u64_arg("sensitivity")
                        .map(|s| s.min(2) as u8),
                    ..Default::default()
                };
                CommandReply::from_result(coordinator.update_settings(&patch).await)
            }
            Err(e) => CommandReply::err(e.code(), e.to_string()),
        },
        "setDoNotDisturb" => match request.bool_arg("enabled") {
            Ok(enabled) => {
                let start = request.opt_u64_arg("startMinutes").map(|m| m as u16);
                let end = request.opt_u64_arg("endMinutes").map(|m| m as u16);
                CommandReply::from_result(
                    coordinator.set_do_not_disturb(enabled, start, end).await,
                )
            }
            Err(e) => CommandReply::err(e.code(), e.to_string()),
        },

        // --- Reads this device family has no protocol for ---
        "readBloodPressure" | "readBloodPressureHistory" => {
            unsupported_read(DetectionKind::BloodPressure)
        }
        "readTemperature" | "readTemperatureHistory" => {
            unsupported_read(DetectionKind::Temperature)
        }
        "readBloodGlucose" => unsupported_read(DetectionKind::BloodGlucose),
        "readEcgData" => unsupported_read(DetectionKind::Ecg),
        "readHeartRateHistory" => unsupported_read(DetectionKind::HeartRate),

        unknown => {
            warn!(command = unknown, "unknown command");
            CommandReply::err("UNKNOWN_COMMAND", format!("unknown command '{unknown}'"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_non_object_args() {
        let request = CommandRequest::new("readBattery", Some(json!([1, 2])));
        assert!(request.args.is_empty());

        let request = CommandRequest::new("readBattery", None);
        assert!(request.args.is_empty());
    }

    #[test]
    fn test_day_offset_for_timestamp() {
        let now = OffsetDateTime::now_utc().unix_timestamp() * 1_000;
        assert_eq!(day_offset_for_timestamp(now), 0);
        assert_eq!(
            day_offset_for_timestamp(now - 2 * 24 * 3_600 * 1_000),
            2
        );
        // Future timestamps clamp to today.
        assert_eq!(
            day_offset_for_timestamp(now + 24 * 3_600 * 1_000),
            0
        );
    }

    #[test]
    fn test_unsupported_read_codes() {
        let reply = unsupported_read(DetectionKind::BloodPressure);
        match reply {
            CommandReply::Error { code, .. } => {
                assert_eq!(code, "BLOOD_PRESSURE_NOT_SUPPORTED");
            }
            CommandReply::Success(_) => panic!("expected error reply"),
        }
    }

    #[test]
    fn test_arg_extraction() {
        let request = CommandRequest::new(
            "bindDevice",
            Some(json!({"password": "0000", "is24H": false})),
        );
        assert_eq!(request.str_arg("password").unwrap(), "0000");
        assert!(!request.bool_arg("is24H").unwrap());
        assert!(request.str_arg("missing").is_err());
        assert_eq!(
            request.str_arg("missing").unwrap_err().code(),
            "INVALID_ARGUMENT"
        );
        // Both bind arguments are required, the flag is never defaulted.
        let partial = CommandRequest::new("bindDevice", Some(json!({"password": "0000"})));
        assert_eq!(
            partial.bool_arg("is24H").unwrap_err().code(),
            "INVALID_ARGUMENT"
        );
    }
}
