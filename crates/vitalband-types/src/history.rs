//! Historical sample records and their daily/hourly aggregates.
//!
//! The tracker stores one multi-metric sample every five minutes ("daily
//! samples"). A bounded read yields raw [`SampleRecord`]s which are folded
//! once into a [`DailySummary`] with 24 hourly buckets. Sleep, step and HRV
//! reads have their own record shapes.
//!
//! Aggregation rules, reproduced from the device's companion app:
//! - non-positive values count as "no data" and are excluded from averages;
//! - integer-metric averages truncate to whole numbers;
//! - hourly buckets are selected by `time.starts_with("HH:")` and empty
//!   buckets are omitted;
//! - step/calorie/distance values are summed, not averaged.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use time::macros::format_description;
use time::{Date, Duration};

/// One raw 5-minute sample. Every metric is optional; the firmware's
/// zero/negative placeholders are normalized to `None` at decode time.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SampleRecord {
    /// Sample date, `yyyy-MM-dd`.
    pub date: String,
    /// Sample time of day, `HH:MM`.
    pub time: Option<String>,
    /// Heart rate in BPM.
    pub heart_rate: Option<u32>,
    /// Systolic pressure in mmHg.
    pub systolic: Option<u32>,
    /// Diastolic pressure in mmHg.
    pub diastolic: Option<u32>,
    /// Body temperature in Celsius.
    pub temperature: Option<f64>,
    /// Blood oxygen saturation percentage.
    pub blood_oxygen: Option<u32>,
    /// Steps taken during the interval.
    pub steps: Option<u32>,
    /// Calories burned during the interval.
    pub calories: Option<f64>,
    /// Distance covered during the interval, meters.
    pub distance: Option<f64>,
    /// Firmware activity-intensity value.
    pub sport_value: Option<u32>,
    /// Blood glucose, firmware raw units.
    pub blood_glucose: Option<u32>,
    /// Respiration rate, breaths per minute.
    pub respiration_rate: Option<u32>,
    /// Heart rate from the ECG sensor.
    pub ecg_heart_rate: Option<u32>,
    /// Uric acid in µmol/L.
    pub uric_acid: Option<f64>,
    /// Total cholesterol in mmol/L.
    pub total_cholesterol: Option<f64>,
    /// Triglyceride in mmol/L.
    pub triglyceride: Option<f64>,
    /// High-density lipoprotein in mmol/L.
    pub hdl: Option<f64>,
    /// Low-density lipoprotein in mmol/L.
    pub ldl: Option<f64>,
    /// Heart-rate variability, joined from the HRV origin stream by
    /// matching `HH:MM` keys.
    pub hrv_value: Option<u32>,
}

/// Normalize a firmware integer where zero or less means "no data".
#[must_use]
pub fn positive_u32(raw: i64) -> Option<u32> {
    if raw > 0 { Some(raw as u32) } else { None }
}

/// Normalize a firmware float where zero or less means "no data".
#[must_use]
pub fn positive_f64(raw: f64) -> Option<f64> {
    if raw > 0.0 { Some(raw) } else { None }
}

/// Overlay HRV values onto samples by matching their `HH:MM` time key.
pub fn join_hrv_values(records: &mut [SampleRecord], hrv_by_time: &HashMap<String, u32>) {
    for record in records.iter_mut() {
        if let Some(time) = &record.time
            && let Some(&value) = hrv_by_time.get(time)
        {
            record.hrv_value = Some(value);
        }
    }
}

/// Human label for a day offset: `Today`, `Yesterday`, `N Days Ago`.
#[must_use]
pub fn day_label(day_offset: u32) -> String {
    match day_offset {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        n => format!("{n} Days Ago"),
    }
}

/// The `yyyy-MM-dd` string for `today - day_offset`.
#[must_use]
pub fn date_string(today: Date, day_offset: u32) -> String {
    let format = format_description!("[year]-[month]-[day]");
    let date = today - Duration::days(i64::from(day_offset));
    // The format description is static and infallible for a valid Date.
    date.format(&format).unwrap_or_default()
}

/// Read-only per-day aggregate computed once from the raw samples.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DailySummary {
    /// Day date, `yyyy-MM-dd`.
    pub date: String,
    /// Human label: `Today`, `Yesterday`, `N Days Ago`.
    pub day_label: String,
    pub avg_heart_rate: Option<u32>,
    pub max_heart_rate: Option<u32>,
    pub min_heart_rate: Option<u32>,
    pub avg_systolic: Option<u32>,
    pub avg_diastolic: Option<u32>,
    pub max_systolic: Option<u32>,
    pub min_systolic: Option<u32>,
    pub avg_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    pub avg_blood_oxygen: Option<u32>,
    pub min_blood_oxygen: Option<u32>,
    pub total_steps: u64,
    pub total_calories: f64,
    pub total_distance: f64,
    pub avg_sport_value: Option<u32>,
    pub avg_blood_glucose: Option<u32>,
    pub avg_respiration_rate: Option<u32>,
    pub avg_ecg_heart_rate: Option<u32>,
    pub avg_uric_acid: Option<f64>,
    pub avg_total_cholesterol: Option<f64>,
    pub avg_triglyceride: Option<f64>,
    pub avg_hdl: Option<f64>,
    pub avg_ldl: Option<f64>,
    pub avg_hrv_value: Option<u32>,
    pub max_hrv_value: Option<u32>,
    pub min_hrv_value: Option<u32>,
    /// Hourly buckets, empty hours omitted.
    pub hourly: Vec<HourlySummary>,
}

/// One hourly bucket of a [`DailySummary`]. Carries the same aggregate set
/// (minus the systolic extremes) plus the raw records for inspection.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct HourlySummary {
    /// Hour of day (0-23).
    pub hour: u8,
    /// Label, `HH:00`.
    pub hour_label: String,
    pub avg_heart_rate: Option<u32>,
    pub max_heart_rate: Option<u32>,
    pub min_heart_rate: Option<u32>,
    pub avg_systolic: Option<u32>,
    pub avg_diastolic: Option<u32>,
    pub avg_temperature: Option<f64>,
    pub avg_blood_oxygen: Option<u32>,
    pub steps: u64,
    pub calories: f64,
    pub distance: f64,
    pub avg_sport_value: Option<u32>,
    pub avg_blood_glucose: Option<u32>,
    pub avg_respiration_rate: Option<u32>,
    pub avg_uric_acid: Option<f64>,
    pub avg_total_cholesterol: Option<f64>,
    pub avg_triglyceride: Option<f64>,
    pub avg_hdl: Option<f64>,
    pub avg_ldl: Option<f64>,
    pub avg_hrv_value: Option<u32>,
    pub max_hrv_value: Option<u32>,
    pub min_hrv_value: Option<u32>,
    /// The raw samples that fell into this hour.
    pub records: Vec<SampleRecord>,
}

fn avg_u32(values: &[u32]) -> Option<u32> {
    if values.is_empty() {
        return None;
    }
    let sum: u64 = values.iter().map(|&v| u64::from(v)).sum();
    // Truncating division matches the companion app's integer averages.
    Some((sum / values.len() as u64) as u32)
}

fn avg_f64(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn min_max_f64(values: &[f64]) -> (Option<f64>, Option<f64>) {
    let min = values.iter().copied().fold(None, |acc: Option<f64>, v| {
        Some(acc.map_or(v, |a| a.min(v)))
    });
    let max = values.iter().copied().fold(None, |acc: Option<f64>, v| {
        Some(acc.map_or(v, |a| a.max(v)))
    });
    (min, max)
}

fn collect_u32(records: &[SampleRecord], field: impl Fn(&SampleRecord) -> Option<u32>) -> Vec<u32> {
    records.iter().filter_map(field).filter(|&v| v > 0).collect()
}

fn collect_f64(records: &[SampleRecord], field: impl Fn(&SampleRecord) -> Option<f64>) -> Vec<f64> {
    records
        .iter()
        .filter_map(field)
        .filter(|&v| v > 0.0)
        .collect()
}

impl DailySummary {
    /// Fold a day's raw samples into the daily aggregate with hourly buckets.
    ///
    /// An empty `records` slice yields a summary with every average absent
    /// and zero totals; callers keep such days so multi-day results always
    /// contain one entry per requested day.
    #[must_use]
    pub fn aggregate(date: String, day_offset: u32, records: &[SampleRecord]) -> Self {
        let heart_rates = collect_u32(records, |r| r.heart_rate);
        let systolics = collect_u32(records, |r| r.systolic);
        let diastolics = collect_u32(records, |r| r.diastolic);
        let temperatures = collect_f64(records, |r| r.temperature);
        let oxygens = collect_u32(records, |r| r.blood_oxygen);
        let sports = collect_u32(records, |r| r.sport_value);
        let glucoses = collect_u32(records, |r| r.blood_glucose);
        let resp_rates = collect_u32(records, |r| r.respiration_rate);
        let ecg_rates = collect_u32(records, |r| r.ecg_heart_rate);
        let uric_acids = collect_f64(records, |r| r.uric_acid);
        let cholesterols = collect_f64(records, |r| r.total_cholesterol);
        let triglycerides = collect_f64(records, |r| r.triglyceride);
        let hdls = collect_f64(records, |r| r.hdl);
        let ldls = collect_f64(records, |r| r.ldl);
        let hrv_values = collect_u32(records, |r| r.hrv_value);

        let (min_temperature, max_temperature) = min_max_f64(&temperatures);

        let mut hourly = Vec::new();
        for hour in 0u8..24 {
            let prefix = format!("{hour:02}:");
            let bucket: Vec<SampleRecord> = records
                .iter()
                .filter(|r| r.time.as_deref().is_some_and(|t| t.starts_with(&prefix)))
                .cloned()
                .collect();
            if !bucket.is_empty() {
                hourly.push(HourlySummary::aggregate(hour, bucket));
            }
        }

        Self {
            date,
            day_label: day_label(day_offset),
            avg_heart_rate: avg_u32(&heart_rates),
            max_heart_rate: heart_rates.iter().max().copied(),
            min_heart_rate: heart_rates.iter().min().copied(),
            avg_systolic: avg_u32(&systolics),
            avg_diastolic: avg_u32(&diastolics),
            max_systolic: systolics.iter().max().copied(),
            min_systolic: systolics.iter().min().copied(),
            avg_temperature: avg_f64(&temperatures),
            max_temperature,
            min_temperature,
            avg_blood_oxygen: avg_u32(&oxygens),
            min_blood_oxygen: oxygens.iter().min().copied(),
            total_steps: records
                .iter()
                .filter_map(|r| r.steps)
                .map(u64::from)
                .sum(),
            total_calories: records.iter().filter_map(|r| r.calories).sum(),
            total_distance: records.iter().filter_map(|r| r.distance).sum(),
            avg_sport_value: avg_u32(&sports),
            avg_blood_glucose: avg_u32(&glucoses),
            avg_respiration_rate: avg_u32(&resp_rates),
            avg_ecg_heart_rate: avg_u32(&ecg_rates),
            avg_uric_acid: avg_f64(&uric_acids),
            avg_total_cholesterol: avg_f64(&cholesterols),
            avg_triglyceride: avg_f64(&triglycerides),
            avg_hdl: avg_f64(&hdls),
            avg_ldl: avg_f64(&ldls),
            avg_hrv_value: avg_u32(&hrv_values),
            max_hrv_value: hrv_values.iter().max().copied(),
            min_hrv_value: hrv_values.iter().min().copied(),
            hourly,
        }
    }
}

impl HourlySummary {
    fn aggregate(hour: u8, records: Vec<SampleRecord>) -> Self {
        let heart_rates = collect_u32(&records, |r| r.heart_rate);
        let systolics = collect_u32(&records, |r| r.systolic);
        let diastolics = collect_u32(&records, |r| r.diastolic);
        let temperatures = collect_f64(&records, |r| r.temperature);
        let oxygens = collect_u32(&records, |r| r.blood_oxygen);
        let sports = collect_u32(&records, |r| r.sport_value);
        let glucoses = collect_u32(&records, |r| r.blood_glucose);
        let resp_rates = collect_u32(&records, |r| r.respiration_rate);
        let uric_acids = collect_f64(&records, |r| r.uric_acid);
        let cholesterols = collect_f64(&records, |r| r.total_cholesterol);
        let triglycerides = collect_f64(&records, |r| r.triglyceride);
        let hdls = collect_f64(&records, |r| r.hdl);
        let ldls = collect_f64(&records, |r| r.ldl);
        let hrv_values = collect_u32(&records, |r| r.hrv_value);

        Self {
            hour,
            hour_label: format!("{hour:02}:00"),
            avg_heart_rate: avg_u32(&heart_rates),
            max_heart_rate: heart_rates.iter().max().copied(),
            min_heart_rate: heart_rates.iter().min().copied(),
            avg_systolic: avg_u32(&systolics),
            avg_diastolic: avg_u32(&diastolics),
            avg_temperature: avg_f64(&temperatures),
            avg_blood_oxygen: avg_u32(&oxygens),
            steps: records.iter().filter_map(|r| r.steps).map(u64::from).sum(),
            calories: records.iter().filter_map(|r| r.calories).sum(),
            distance: records.iter().filter_map(|r| r.distance).sum(),
            avg_sport_value: avg_u32(&sports),
            avg_blood_glucose: avg_u32(&glucoses),
            avg_respiration_rate: avg_u32(&resp_rates),
            avg_uric_acid: avg_f64(&uric_acids),
            avg_total_cholesterol: avg_f64(&cholesterols),
            avg_triglyceride: avg_f64(&triglycerides),
            avg_hdl: avg_f64(&hdls),
            avg_ldl: avg_f64(&ldls),
            avg_hrv_value: avg_u32(&hrv_values),
            max_hrv_value: hrv_values.iter().max().copied(),
            min_hrv_value: hrv_values.iter().min().copied(),
            records,
        }
    }
}

/// One night of sleep as the firmware reports it.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SleepRecord {
    pub total_sleep_minutes: u32,
    pub deep_sleep_minutes: u32,
    pub light_sleep_minutes: u32,
    /// Always zero; the firmware reports only a wake count, not awake time.
    pub awake_minutes: u32,
    pub wake_count: u32,
    pub sleep_quality: u32,
    /// Fall-asleep time as the firmware formats it.
    pub sleep_start_time: Option<String>,
    /// Wake-up time as the firmware formats it.
    pub sleep_end_time: Option<String>,
    /// Per-interval sleep-stage curve string.
    pub sleep_curve: Option<String>,
    /// Night date, `yyyy-MM-dd`.
    pub date: Option<String>,
}

/// Today's step/activity snapshot derived from the newest daily sample.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct StepSnapshot {
    pub steps: u32,
    pub distance_meters: f64,
    pub calories: f64,
    /// Not reported by the firmware.
    pub active_minutes: Option<u32>,
    pub heart_rate: Option<u32>,
    /// Snapshot creation time, Unix milliseconds.
    pub timestamp_ms: i64,
    /// Sample date, `yyyy-MM-dd`.
    pub date: String,
}

/// One heart-rate-variability record.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct HrvRecord {
    /// Record date, `yyyy-MM-dd`.
    pub date: String,
    pub hrv_value: u32,
    pub heart_rate: Option<u32>,
    /// Raw RR intervals in milliseconds.
    pub rr_values: Vec<u32>,
    /// Firmware HRV algorithm variant.
    pub hrv_type: i32,
    /// `date HH:MM:SS`, when the firmware provides a time.
    pub timestamp: Option<String>,
}

/// The resolved result of an HRV read.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct HrvReadOutcome {
    pub records: Vec<HrvRecord>,
    /// Whole-day HRV score reported alongside the records.
    pub day_hrv_score: u32,
    pub total_records: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn sample(time: &str) -> SampleRecord {
        SampleRecord {
            date: "2026-08-20".to_string(),
            time: Some(time.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_day_label() {
        assert_eq!(day_label(0), "Today");
        assert_eq!(day_label(1), "Yesterday");
        assert_eq!(day_label(2), "2 Days Ago");
        assert_eq!(day_label(5), "5 Days Ago");
    }

    #[test]
    fn test_date_string() {
        let today = date!(2026 - 08 - 23);
        assert_eq!(date_string(today, 0), "2026-08-23");
        assert_eq!(date_string(today, 1), "2026-08-22");
        assert_eq!(date_string(today, 23), "2026-07-31");
    }

    #[test]
    fn test_positive_normalization() {
        assert_eq!(positive_u32(72), Some(72));
        assert_eq!(positive_u32(0), None);
        assert_eq!(positive_u32(-1), None);
        assert_eq!(positive_f64(36.5), Some(36.5));
        assert_eq!(positive_f64(0.0), None);
    }

    #[test]
    fn test_truncating_integer_average() {
        // (70 + 75) / 2 = 72.5, truncated to 72.
        let mut a = sample("08:00");
        a.heart_rate = Some(70);
        let mut b = sample("08:05");
        b.heart_rate = Some(75);

        let summary = DailySummary::aggregate("2026-08-20".into(), 0, &[a, b]);
        assert_eq!(summary.avg_heart_rate, Some(72));
        assert_eq!(summary.max_heart_rate, Some(75));
        assert_eq!(summary.min_heart_rate, Some(70));
    }

    #[test]
    fn test_empty_day_aggregate() {
        let summary = DailySummary::aggregate("2026-08-20".into(), 1, &[]);
        assert_eq!(summary.day_label, "Yesterday");
        assert_eq!(summary.avg_heart_rate, None);
        assert_eq!(summary.total_steps, 0);
        assert!(summary.hourly.is_empty());
    }

    #[test]
    fn test_hourly_bucketing_by_prefix() {
        let mut a = sample("08:05");
        a.steps = Some(100);
        let mut b = sample("08:55");
        b.steps = Some(200);
        let mut c = sample("14:00");
        c.steps = Some(50);

        let summary = DailySummary::aggregate("2026-08-20".into(), 0, &[a, b, c]);
        assert_eq!(summary.total_steps, 350);
        // Only the two non-empty hours appear.
        assert_eq!(summary.hourly.len(), 2);
        assert_eq!(summary.hourly[0].hour, 8);
        assert_eq!(summary.hourly[0].hour_label, "08:00");
        assert_eq!(summary.hourly[0].steps, 300);
        assert_eq!(summary.hourly[0].records.len(), 2);
        assert_eq!(summary.hourly[1].hour, 14);
        assert_eq!(summary.hourly[1].steps, 50);
    }

    #[test]
    fn test_non_positive_values_excluded_from_averages() {
        let mut a = sample("09:00");
        a.blood_oxygen = Some(98);
        let mut b = sample("09:05");
        b.blood_oxygen = Some(0); // firmware placeholder

        let summary = DailySummary::aggregate("2026-08-20".into(), 0, &[a, b]);
        assert_eq!(summary.avg_blood_oxygen, Some(98));
        assert_eq!(summary.min_blood_oxygen, Some(98));
    }

    #[test]
    fn test_hrv_join_by_time_key() {
        let mut records = vec![sample("10:05"), sample("10:10")];
        let mut hrv = HashMap::new();
        hrv.insert("10:10".to_string(), 54u32);

        join_hrv_values(&mut records, &hrv);
        assert_eq!(records[0].hrv_value, None);
        assert_eq!(records[1].hrv_value, Some(54));
    }

    #[test]
    fn test_systolic_extremes_daily_only() {
        let mut a = sample("11:00");
        a.systolic = Some(120);
        a.diastolic = Some(80);
        let mut b = sample("11:05");
        b.systolic = Some(130);
        b.diastolic = Some(85);

        let summary = DailySummary::aggregate("2026-08-20".into(), 0, &[a, b]);
        assert_eq!(summary.max_systolic, Some(130));
        assert_eq!(summary.min_systolic, Some(120));
        assert_eq!(summary.avg_systolic, Some(125));
        assert_eq!(summary.hourly[0].avg_systolic, Some(125));
    }
}
