//! Unit conversions and raw-sample hygiene.
//!
//! The tracker firmware reports glucose in mmol/L and temperature in
//! degrees Celsius; hosts usually want both unit systems, so the
//! conversions live here next to the types that carry the values.

/// mg/dL per mmol/L of glucose (molar mass of glucose / 10).
///
/// Two firmware generations disagree on this constant (the older one
/// rounds to 18.0); this is the canonical value used everywhere in this
/// workspace.
pub const MGDL_PER_MMOLL: f64 = 18.0182;

/// Reserved sample value the firmware uses to mark "no data" inside a
/// waveform packet. Must never appear in an emitted waveform.
pub const WAVEFORM_SENTINEL: i32 = i32::MAX;

/// Convert blood glucose from mmol/L to mg/dL.
///
/// # Examples
///
/// ```
/// use vitalband_types::units::mmoll_to_mgdl;
///
/// let mgdl = mmoll_to_mgdl(5.5);
/// assert!((mgdl - 99.1).abs() < 0.01);
/// ```
#[must_use]
pub fn mmoll_to_mgdl(mmoll: f64) -> f64 {
    mmoll * MGDL_PER_MMOLL
}

/// Convert blood glucose from mg/dL to mmol/L.
#[must_use]
pub fn mgdl_to_mmoll(mgdl: f64) -> f64 {
    mgdl / MGDL_PER_MMOLL
}

/// Convert a temperature from Celsius to Fahrenheit.
#[must_use]
pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Drop the reserved no-data sentinel from a raw waveform chunk.
///
/// The firmware pads partially-filled ECG packets with [`WAVEFORM_SENTINEL`];
/// everything else, including negative samples, is real data and kept.
#[must_use]
pub fn filter_waveform(samples: &[i32]) -> Vec<i32> {
    samples
        .iter()
        .copied()
        .filter(|&s| s != WAVEFORM_SENTINEL)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_glucose_conversion() {
        let mgdl = mmoll_to_mgdl(5.5);
        assert!((mgdl - 99.1001).abs() < 0.001);
        assert!((mgdl_to_mmoll(mgdl) - 5.5).abs() < 1e-9);
    }

    #[test]
    fn test_celsius_to_fahrenheit() {
        assert!((celsius_to_fahrenheit(0.0) - 32.0).abs() < f32::EPSILON);
        assert!((celsius_to_fahrenheit(36.6) - 97.88).abs() < 0.01);
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sentinel_filtering() {
        let raw = vec![12, WAVEFORM_SENTINEL, -4, 0, WAVEFORM_SENTINEL];
        assert_eq!(filter_waveform(&raw), vec![12, -4, 0]);
    }

    #[test]
    fn test_all_sentinel_waveform_is_empty() {
        let raw = vec![WAVEFORM_SENTINEL; 8];
        assert!(filter_waveform(&raw).is_empty());
    }

    proptest! {
        #[test]
        fn prop_glucose_round_trip(mmoll in 0.1f64..60.0) {
            let back = mgdl_to_mmoll(mmoll_to_mgdl(mmoll));
            prop_assert!((back - mmoll).abs() < 1e-9);
        }

        #[test]
        fn prop_no_sentinel_survives(samples in proptest::collection::vec(
            prop_oneof![any::<i32>(), Just(WAVEFORM_SENTINEL)], 0..64,
        )) {
            let filtered = filter_waveform(&samples);
            prop_assert!(filtered.iter().all(|&s| s != WAVEFORM_SENTINEL));
        }
    }
}
