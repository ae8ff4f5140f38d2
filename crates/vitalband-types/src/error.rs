//! Error types for data handling in vitalband-types.

use thiserror::Error;

/// Errors that can occur when interpreting wearable data values.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in vitalband-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// A field value is outside its valid range.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// A detection-kind name did not match any known kind.
    #[error("Unknown detection kind: {0}")]
    UnknownKind(String),

    /// A language code did not match any supported device language.
    #[error("Unknown language code: {0}")]
    UnknownLanguage(String),
}

/// Result type alias using vitalband-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParseError::UnknownKind("pulse".to_string());
        assert!(err.to_string().contains("pulse"));

        let err = ParseError::UnknownLanguage("xx".to_string());
        assert!(err.to_string().contains("xx"));
    }
}
