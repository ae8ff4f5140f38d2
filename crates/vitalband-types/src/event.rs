//! The canonical telemetry event emitted to host consumers.
//!
//! Every vendor callback, whatever its shape, is folded into one of these
//! full snapshots before it leaves the coordinator. Consumers never have to
//! reconstruct state from partial updates: each event carries the complete
//! current picture for its detection kind.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::{DetectionKind, DetectionState, GlucoseRiskLevel};

/// A normalized, kind-tagged telemetry snapshot.
///
/// Immutable once constructed. `timestamp_ms` is Unix milliseconds, the
/// shape hosts expect in event payloads.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CanonicalEvent {
    /// Which detection produced this snapshot.
    pub kind: DetectionKind,
    /// Canonical state, see [`DetectionState`].
    pub state: DetectionState,
    /// Progress percentage (0-100).
    pub progress: u8,
    /// Whether a measurement is currently running.
    pub is_measuring: bool,
    /// Set on the single synthesized terminal event after a stop.
    pub stopped: bool,
    /// Whether this snapshot was produced by a vendor error callback.
    pub error: bool,
    /// Vendor error code, when `error` is set.
    pub error_code: Option<i32>,
    /// Human-readable error description, when `error` is set.
    pub error_message: Option<String>,
    /// Event creation time, Unix milliseconds.
    pub timestamp_ms: i64,
    /// Kind-specific measurement values.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub payload: DetectionPayload,
}

impl CanonicalEvent {
    /// An empty idle snapshot for a kind, used as the fold seed.
    #[must_use]
    pub fn idle(kind: DetectionKind, timestamp_ms: i64) -> Self {
        Self {
            kind,
            state: DetectionState::Idle,
            progress: 0,
            is_measuring: false,
            stopped: false,
            error: false,
            error_code: None,
            error_message: None,
            timestamp_ms,
            payload: DetectionPayload::empty(kind),
        }
    }

    /// The synthesized terminal snapshot emitted after a stop.
    #[must_use]
    pub fn stopped(kind: DetectionKind, timestamp_ms: i64) -> Self {
        Self {
            stopped: true,
            ..Self::idle(kind, timestamp_ms)
        }
    }
}

/// Kind-specific measurement values carried by a [`CanonicalEvent`].
///
/// The variant always matches the event's `kind`; fields are `None` until
/// the corresponding vendor callback has delivered a value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum DetectionPayload {
    /// Optical heart rate.
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    HeartRate {
        /// Beats per minute.
        bpm: Option<u16>,
    },
    /// Blood oxygen saturation.
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    Spo2 {
        /// Saturation percentage.
        percent: Option<u8>,
    },
    /// Blood pressure.
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    BloodPressure {
        /// Systolic pressure in mmHg (vendor "high pressure").
        systolic: Option<u16>,
        /// Diastolic pressure in mmHg (vendor "low pressure").
        diastolic: Option<u16>,
    },
    /// Blood glucose with both unit systems.
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    BloodGlucose {
        /// Glucose in mmol/L, as the firmware reports it.
        glucose_mmol_l: Option<f64>,
        /// Glucose in mg/dL, derived via the canonical factor.
        glucose_mg_dl: Option<f64>,
        /// Firmware risk classification.
        risk_level: GlucoseRiskLevel,
    },
    /// Body and wrist temperature.
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    Temperature {
        /// Body temperature in Celsius.
        temperature_celsius: Option<f32>,
        /// Body temperature in Fahrenheit, derived.
        temperature_fahrenheit: Option<f32>,
        /// Wrist (skin) temperature in Celsius.
        wrist_temperature_celsius: Option<f32>,
    },
    /// Electrocardiogram.
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    Ecg {
        /// Latest waveform chunk, sentinel-filtered.
        waveform: Vec<i32>,
        /// Heart rate derived from the ECG signal.
        heart_rate: Option<u16>,
        /// Firmware diagnostic string, when produced.
        diagnostic_result: Option<String>,
        /// Signal quality (0-100).
        signal_quality: Option<u8>,
    },
    /// Blood components (uric acid and lipids).
    #[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
    BloodComponent {
        /// Uric acid in µmol/L.
        uric_acid: Option<f64>,
        /// Total cholesterol in mmol/L.
        total_cholesterol: Option<f64>,
        /// Triglyceride in mmol/L.
        triglyceride: Option<f64>,
        /// High-density lipoprotein in mmol/L.
        hdl: Option<f64>,
        /// Low-density lipoprotein in mmol/L.
        ldl: Option<f64>,
    },
}

impl DetectionPayload {
    /// The empty payload for a kind, every field absent.
    #[must_use]
    pub fn empty(kind: DetectionKind) -> Self {
        match kind {
            DetectionKind::HeartRate => DetectionPayload::HeartRate { bpm: None },
            DetectionKind::Spo2 => DetectionPayload::Spo2 { percent: None },
            DetectionKind::BloodPressure => DetectionPayload::BloodPressure {
                systolic: None,
                diastolic: None,
            },
            DetectionKind::BloodGlucose => DetectionPayload::BloodGlucose {
                glucose_mmol_l: None,
                glucose_mg_dl: None,
                risk_level: GlucoseRiskLevel::Unknown,
            },
            DetectionKind::Temperature => DetectionPayload::Temperature {
                temperature_celsius: None,
                temperature_fahrenheit: None,
                wrist_temperature_celsius: None,
            },
            DetectionKind::Ecg => DetectionPayload::Ecg {
                waveform: Vec::new(),
                heart_rate: None,
                diagnostic_result: None,
                signal_quality: None,
            },
            DetectionKind::BloodComponent => DetectionPayload::BloodComponent {
                uric_acid: None,
                total_cholesterol: None,
                triglyceride: None,
                hdl: None,
                ldl: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_snapshot() {
        let event = CanonicalEvent::idle(DetectionKind::HeartRate, 1_700_000_000_000);
        assert_eq!(event.state, DetectionState::Idle);
        assert_eq!(event.progress, 0);
        assert!(!event.is_measuring);
        assert!(!event.stopped);
        assert_eq!(event.payload, DetectionPayload::HeartRate { bpm: None });
    }

    #[test]
    fn test_stopped_snapshot() {
        let event = CanonicalEvent::stopped(DetectionKind::Ecg, 0);
        assert_eq!(event.state, DetectionState::Idle);
        assert!(event.stopped);
        assert!(!event.is_measuring);
    }

    #[test]
    fn test_empty_payload_matches_kind() {
        for kind in DetectionKind::ALL {
            // Just verify every kind has an empty payload shape.
            let _ = DetectionPayload::empty(kind);
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_event_serializes_flat_camel_case() {
        let event = CanonicalEvent {
            payload: DetectionPayload::BloodGlucose {
                glucose_mmol_l: Some(5.5),
                glucose_mg_dl: Some(99.1),
                risk_level: GlucoseRiskLevel::None,
            },
            ..CanonicalEvent::idle(DetectionKind::BloodGlucose, 42)
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "bloodGlucose");
        assert_eq!(json["isMeasuring"], false);
        // Payload fields are flattened into the event object.
        assert_eq!(json["glucoseMmolL"], 5.5);
        assert_eq!(json["riskLevel"], "NONE");
    }
}
