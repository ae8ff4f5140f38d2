//! Error types for vitalband-core.
//!
//! This module defines all error types that can occur when coordinating a
//! VitalBand wearable session and the stable string codes hosts key on.
//!
//! # Error Codes
//!
//! Every error maps to a stable SCREAMING_SNAKE code via [`Error::code`].
//! Hosts dispatch on the code, never on the message text. Kind-scoped
//! codes embed the kind's code fragment:
//!
//! | Error | Code |
//! |-------|------|
//! | [`Error::InvalidArgument`] | `INVALID_ARGUMENT` |
//! | [`Error::NotConnected`] | `NOT_CONNECTED` |
//! | [`Error::StartDetection`] | `START_<KIND>_ERROR` |
//! | [`Error::StopDetection`] | `STOP_<KIND>_ERROR` |
//! | [`Error::DetectionNotSupported`] | `<KIND>_NOT_SUPPORTED` |
//! | [`Error::HistoryNotSupported`] | `<KIND>_NOT_SUPPORTED` |
//! | [`Error::HistoryRequestFailed`] | `<KIND>_REQUEST_FAILED` |
//! | [`Error::HistoryTimeout`] | `<KIND>_TIMEOUT` |
//! | [`Error::NoData`] | `NO_DATA` |
//! | [`Error::OperationFailed`] | `OPERATION_FAILED` |
//! | [`Error::NativeDependencyMissing`] | `NATIVE_DEPENDENCY_MISSING` |
//!
//! Everything else, including BLE transport failures, reports as
//! `OPERATION_ERROR`.

use std::time::Duration;

use thiserror::Error;

use vitalband_types::types::HistoryKind;
use vitalband_types::{DetectionKind, ParseError};

/// Errors that can occur when coordinating a wearable session.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// A required argument was missing or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation attempted while no operational device session exists.
    #[error("Not connected to device")]
    NotConnected,

    /// The transport rejected a start-detection write.
    #[error("Failed to start {kind} detection: {reason}")]
    StartDetection {
        /// The detection that failed to start.
        kind: DetectionKind,
        /// Transport-level failure description.
        reason: String,
    },

    /// The transport rejected a stop-detection write.
    #[error("Failed to stop {kind} detection: {reason}")]
    StopDetection {
        /// The detection that failed to stop.
        kind: DetectionKind,
        /// Transport-level failure description.
        reason: String,
    },

    /// The connected device does not support this detection.
    #[error("{kind} detection is not supported by this device")]
    DetectionNotSupported {
        /// The unsupported detection.
        kind: DetectionKind,
    },

    /// The connected device does not support this history read.
    #[error("{kind:?} history is not supported by this device")]
    HistoryNotSupported {
        /// The unsupported history read.
        kind: HistoryKind,
    },

    /// The device acknowledged a history read request with a failure.
    #[error("Device rejected {kind:?} history request")]
    HistoryRequestFailed {
        /// The rejected history read.
        kind: HistoryKind,
    },

    /// A history read produced nothing before its deadline.
    #[error("{kind:?} history read timed out after {duration:?}")]
    HistoryTimeout {
        /// The history read that timed out.
        kind: HistoryKind,
        /// How long the read waited.
        duration: Duration,
    },

    /// A read completed but the device had nothing to return.
    #[error("No data available: {0}")]
    NoData(String),

    /// The device acknowledged a write with a failure status.
    #[error("Operation '{operation}' failed: {reason}")]
    OperationFailed {
        /// The operation that was rejected.
        operation: String,
        /// Device-reported failure description.
        reason: String,
    },

    /// A generic operation error (timeouts, dropped replies, transport loss).
    #[error("Operation '{operation}' error: {reason}")]
    Operation {
        /// The operation that failed.
        operation: String,
        /// Failure description.
        reason: String,
    },

    /// The vendor protocol library is unavailable on this platform.
    #[error("Native wearable protocol library is not available")]
    NativeDependencyMissing,

    /// Failed to interpret a value received from the device or host.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl Error {
    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a start-detection failure for a kind.
    pub fn start_detection(kind: DetectionKind, reason: impl Into<String>) -> Self {
        Self::StartDetection {
            kind,
            reason: reason.into(),
        }
    }

    /// Create a stop-detection failure for a kind.
    pub fn stop_detection(kind: DetectionKind, reason: impl Into<String>) -> Self {
        Self::StopDetection {
            kind,
            reason: reason.into(),
        }
    }

    /// Create a device-rejected-write failure.
    pub fn operation_failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a generic operation error.
    pub fn operation(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Operation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// The stable SCREAMING_SNAKE code hosts dispatch on.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Error::InvalidArgument(_) => "INVALID_ARGUMENT".to_string(),
            Error::NotConnected => "NOT_CONNECTED".to_string(),
            Error::StartDetection { kind, .. } => format!("START_{}_ERROR", kind.code_fragment()),
            Error::StopDetection { kind, .. } => format!("STOP_{}_ERROR", kind.code_fragment()),
            Error::DetectionNotSupported { kind } => {
                format!("{}_NOT_SUPPORTED", kind.code_fragment())
            }
            Error::HistoryNotSupported { kind } => {
                format!("{}_NOT_SUPPORTED", kind.code_fragment())
            }
            Error::HistoryRequestFailed { kind } => {
                format!("{}_REQUEST_FAILED", kind.code_fragment())
            }
            Error::HistoryTimeout { kind, .. } => format!("{}_TIMEOUT", kind.code_fragment()),
            Error::NoData(_) => "NO_DATA".to_string(),
            Error::OperationFailed { .. } => "OPERATION_FAILED".to_string(),
            Error::NativeDependencyMissing => "NATIVE_DEPENDENCY_MISSING".to_string(),
            _ => "OPERATION_ERROR".to_string(),
        }
    }
}

/// Result type alias using vitalband-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
