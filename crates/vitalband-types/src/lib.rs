//! Platform-agnostic types for the VitalBand wearable bridge.
//!
//! This crate provides the shared vocabulary used by vitalband-core and any
//! host embedding: detection kinds and states, canonical telemetry events,
//! history records and their aggregates, device settings and unit helpers.
//! It has no BLE or async dependencies so it can be reused anywhere the
//! event payloads need to be produced or consumed.
//!
//! # Features
//!
//! - Canonical detection lifecycle types ([`DetectionKind`], [`DetectionState`])
//! - Full-snapshot telemetry events ([`CanonicalEvent`])
//! - History record shapes and daily/hourly aggregation ([`DailySummary`])
//! - Device configuration types ([`UserProfile`], [`DeviceSettings`])
//! - Unit conversions and raw-sample hygiene ([`units`])
//!
//! # Example
//!
//! ```
//! use vitalband_types::{DetectionKind, DetectionState};
//!
//! let kind: DetectionKind = "heartRate".parse().unwrap();
//! assert_eq!(kind, DetectionKind::HeartRate);
//! assert_eq!(DetectionState::from_progress(45), DetectionState::Measuring);
//! ```

pub mod error;
pub mod event;
pub mod history;
pub mod types;
pub mod units;

pub use error::{ParseError, ParseResult};
pub use event::{CanonicalEvent, DetectionPayload};
pub use history::{
    DailySummary, HourlySummary, HrvReadOutcome, HrvRecord, SampleRecord, SleepRecord,
    StepSnapshot,
};
pub use types::{
    BatteryStatus, BloodPressureAlarm, DetectionKind, DetectionState, DeviceInfo, DeviceLanguage,
    DeviceSettings, DeviceSettingsPatch, DeviceStatus, DistanceUnit, Gender, GlucoseRiskLevel,
    HeartWarning, HistoryKind, TemperatureUnit, UserProfile, VendorStatus,
};

#[cfg(test)]
mod tests {
    use super::*;

    // --- Cross-module re-export smoke tests ---

    #[test]
    fn test_kind_round_trip_through_reexports() {
        for kind in DetectionKind::ALL {
            let parsed: DetectionKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_unknown_kind_is_parse_error() {
        let err = "pulseOx".parse::<DetectionKind>().unwrap_err();
        assert!(matches!(err, ParseError::UnknownKind(_)));
    }

    #[test]
    fn test_canonical_event_uses_canonical_glucose_factor() {
        let mmoll = 5.5;
        let mgdl = units::mmoll_to_mgdl(mmoll);
        let event = CanonicalEvent {
            payload: DetectionPayload::BloodGlucose {
                glucose_mmol_l: Some(mmoll),
                glucose_mg_dl: Some(mgdl),
                risk_level: GlucoseRiskLevel::None,
            },
            ..CanonicalEvent::idle(DetectionKind::BloodGlucose, 0)
        };
        match event.payload {
            DetectionPayload::BloodGlucose { glucose_mg_dl, .. } => {
                assert!((glucose_mg_dl.unwrap() - 99.1001).abs() < 0.001);
            }
            _ => panic!("wrong payload variant"),
        }
    }

    #[test]
    fn test_vendor_status_maps_to_canonical_state() {
        assert_eq!(
            VendorStatus::Detecting.canonical_state(),
            DetectionState::Measuring
        );
        assert_eq!(
            VendorStatus::NotSupported.canonical_state(),
            DetectionState::NotSupported
        );
    }

    #[test]
    fn test_daily_summary_from_sample_records() {
        let record = SampleRecord {
            date: "2026-08-20".to_string(),
            time: Some("07:30".to_string()),
            heart_rate: Some(64),
            steps: Some(250),
            ..Default::default()
        };
        let summary = DailySummary::aggregate("2026-08-20".into(), 0, &[record]);
        assert_eq!(summary.day_label, "Today");
        assert_eq!(summary.avg_heart_rate, Some(64));
        assert_eq!(summary.total_steps, 250);
        assert_eq!(summary.hourly.len(), 1);
        assert_eq!(summary.hourly[0].hour, 7);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_settings_serialization_round_trip() {
        let settings = DeviceSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: DeviceSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
