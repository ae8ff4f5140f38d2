//! End-to-end tests for the coordinator, driven by the mock transport.
//!
//! These run without hardware: the mock replays scripted vendor telemetry
//! and history streams, and the tests observe the host-facing surface
//! (coordinator methods, event streams, command dispatch).

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;

use vitalband_core::coordinator::DeviceSessionCoordinator;
use vitalband_core::mock::MockTransport;
use vitalband_core::platform::AlwaysOnPlatform;
use vitalband_core::transport::{HistoryMessage, VendorTelemetry, WearableTransport};
use vitalband_core::{BridgeEvent, CommandReply, CommandRequest, StreamKey, dispatch};
use vitalband_types::types::HistoryKind;
use vitalband_types::{
    DetectionKind, DetectionPayload, DetectionState, DeviceStatus, GlucoseRiskLevel, HrvRecord,
    SampleRecord, SleepRecord,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn coordinator_with(mock: Arc<MockTransport>) -> DeviceSessionCoordinator {
    DeviceSessionCoordinator::new(mock, Arc::new(AlwaysOnPlatform))
}

async fn connected_coordinator() -> (Arc<MockTransport>, DeviceSessionCoordinator) {
    let mock = Arc::new(MockTransport::new());
    let coordinator = coordinator_with(Arc::clone(&mock));
    coordinator.connect("AA:BB:CC:DD:EE:FF").await.unwrap();
    coordinator.bind("0000", true).await.unwrap();
    (mock, coordinator)
}

async fn next_detection(
    rx: &mut tokio::sync::mpsc::Receiver<BridgeEvent>,
) -> vitalband_types::CanonicalEvent {
    match timeout(RECV_TIMEOUT, rx.recv()).await {
        Ok(Some(BridgeEvent::Detection(event))) => event,
        other => panic!("expected detection event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_lifecycle() {
    let mock = Arc::new(MockTransport::disconnected());
    let coordinator = coordinator_with(Arc::clone(&mock));
    assert_eq!(coordinator.status().await, DeviceStatus::Disconnected);

    coordinator.connect("AA:BB:CC:DD:EE:FF").await.unwrap();
    assert_eq!(coordinator.status().await, DeviceStatus::Connected);

    coordinator.bind("0000", true).await.unwrap();
    assert_eq!(coordinator.status().await, DeviceStatus::Bound);
    assert!(mock.is_bound());

    coordinator.disconnect().await.unwrap();
    assert_eq!(coordinator.status().await, DeviceStatus::Disconnected);
    assert!(!mock.is_connected().await);
}

#[tokio::test]
async fn test_not_connected_fails_fast() {
    let coordinator = coordinator_with(Arc::new(MockTransport::disconnected()));

    let err = coordinator
        .start_detection(DetectionKind::HeartRate)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_CONNECTED");

    assert_eq!(coordinator.read_battery().await.unwrap_err().code(), "NOT_CONNECTED");
    assert_eq!(coordinator.read_sleep().await.unwrap_err().code(), "NOT_CONNECTED");
    assert_eq!(
        coordinator.bind("0000", true).await.unwrap_err().code(),
        "NOT_CONNECTED"
    );
}

#[tokio::test]
async fn test_empty_address_and_password_rejected() {
    let coordinator = coordinator_with(Arc::new(MockTransport::new()));
    assert_eq!(
        coordinator.connect("  ").await.unwrap_err().code(),
        "INVALID_ARGUMENT"
    );
    coordinator.connect("AA:BB:CC:DD:EE:FF").await.unwrap();
    assert_eq!(
        coordinator.bind("", true).await.unwrap_err().code(),
        "INVALID_ARGUMENT"
    );
}

#[tokio::test]
async fn test_heart_detection_event_flow() {
    let (mock, coordinator) = connected_coordinator().await;
    mock.script_telemetry(
        DetectionKind::HeartRate,
        vec![
            VendorTelemetry::Progress(30),
            VendorTelemetry::HeartRate(72),
            VendorTelemetry::Progress(100),
        ],
    )
    .await;

    let mut rx = coordinator.subscribe(StreamKey::Detection(DetectionKind::HeartRate));
    coordinator
        .start_detection(DetectionKind::HeartRate)
        .await
        .unwrap();

    let event = next_detection(&mut rx).await;
    assert_eq!(event.state, DetectionState::Measuring);
    assert!(event.is_measuring);

    let event = next_detection(&mut rx).await;
    assert_eq!(event.payload, DetectionPayload::HeartRate { bpm: Some(72) });

    let event = next_detection(&mut rx).await;
    assert_eq!(event.state, DetectionState::Complete);
    assert_eq!(event.progress, 100);
}

#[tokio::test]
async fn test_stop_before_data_emits_single_stopped_event() {
    let (mock, coordinator) = connected_coordinator().await;
    // Pace the script so the stop lands before any telemetry arrives.
    mock.set_telemetry_pacing(Duration::from_millis(500)).await;
    mock.script_telemetry(DetectionKind::HeartRate, vec![VendorTelemetry::Progress(10)])
        .await;

    let mut rx = coordinator.subscribe(StreamKey::Detection(DetectionKind::HeartRate));
    coordinator
        .start_detection(DetectionKind::HeartRate)
        .await
        .unwrap();
    coordinator
        .stop_detection(DetectionKind::HeartRate)
        .await
        .unwrap();

    let event = next_detection(&mut rx).await;
    assert!(event.stopped);
    assert_eq!(event.state, DetectionState::Idle);

    assert_eq!(mock.stop_count(DetectionKind::HeartRate).await, 1);

    // A second stop with no running session is a no-op and emits nothing.
    coordinator
        .stop_detection(DetectionKind::HeartRate)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_glucose_units_through_live_session() {
    let (mock, coordinator) = connected_coordinator().await;
    mock.script_telemetry(
        DetectionKind::BloodGlucose,
        vec![VendorTelemetry::Glucose {
            progress: 100,
            mmol_per_l: 5.5,
            risk: GlucoseRiskLevel::None,
        }],
    )
    .await;

    let mut rx = coordinator.subscribe(StreamKey::Detection(DetectionKind::BloodGlucose));
    coordinator
        .start_detection(DetectionKind::BloodGlucose)
        .await
        .unwrap();

    let event = next_detection(&mut rx).await;
    assert_eq!(event.state, DetectionState::Complete);
    match event.payload {
        DetectionPayload::BloodGlucose {
            glucose_mmol_l,
            glucose_mg_dl,
            ..
        } => {
            assert_eq!(glucose_mmol_l, Some(5.5));
            assert!((glucose_mg_dl.unwrap() - 99.1001).abs() < 0.001);
        }
        other => panic!("wrong payload variant: {other:?}"),
    }
}

#[tokio::test]
async fn test_restart_stops_previous_session() {
    let (mock, coordinator) = connected_coordinator().await;
    mock.set_telemetry_pacing(Duration::from_millis(500)).await;
    mock.script_telemetry(DetectionKind::Ecg, vec![VendorTelemetry::Progress(5)])
        .await;

    coordinator.start_detection(DetectionKind::Ecg).await.unwrap();
    assert!(coordinator.is_detecting(DetectionKind::Ecg).await);

    // The second start stops the old session and waits out the quiescence.
    coordinator.start_detection(DetectionKind::Ecg).await.unwrap();
    assert_eq!(mock.start_count(DetectionKind::Ecg).await, 2);
    assert_eq!(mock.stop_count(DetectionKind::Ecg).await, 1);

    coordinator.stop_detection(DetectionKind::Ecg).await.unwrap();
    assert_eq!(mock.stop_count(DetectionKind::Ecg).await, 2);
    assert!(!coordinator.is_detecting(DetectionKind::Ecg).await);
}

#[tokio::test]
async fn test_unsupported_detection_is_rejected() {
    let mock = Arc::new(MockTransport::new());
    mock.set_detection_unsupported(DetectionKind::Ecg);
    let coordinator = coordinator_with(Arc::clone(&mock));
    coordinator.connect("AA:BB:CC:DD:EE:FF").await.unwrap();

    let err = coordinator
        .start_detection(DetectionKind::Ecg)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ECG_NOT_SUPPORTED");
    assert_eq!(mock.start_count(DetectionKind::Ecg).await, 0);
}

#[tokio::test]
async fn test_sleep_read_returns_latest_record() {
    let (mock, coordinator) = connected_coordinator().await;
    mock.script_sleep(vec![
        HistoryMessage::Sleep(SleepRecord {
            total_sleep_minutes: 400,
            date: Some("2026-08-21".to_string()),
            ..Default::default()
        }),
        HistoryMessage::Sleep(SleepRecord {
            total_sleep_minutes: 452,
            deep_sleep_minutes: 110,
            date: Some("2026-08-22".to_string()),
            ..Default::default()
        }),
        HistoryMessage::Complete,
    ])
    .await;

    let latest = coordinator.read_sleep().await.unwrap().unwrap();
    assert_eq!(latest.total_sleep_minutes, 452);
    assert_eq!(latest.deep_sleep_minutes, 110);

    let all = coordinator.read_sleep_records().await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_sleep_read_empty_is_none() {
    let (mock, coordinator) = connected_coordinator().await;
    mock.script_sleep(vec![HistoryMessage::Complete]).await;
    assert_eq!(coordinator.read_sleep().await.unwrap(), None);
}

#[tokio::test]
async fn test_step_snapshot_uses_newest_sample_with_steps() {
    let (mock, coordinator) = connected_coordinator().await;
    mock.script_samples(
        0,
        vec![
            HistoryMessage::Sample(SampleRecord {
                date: "2026-08-23".to_string(),
                time: Some("08:00".to_string()),
                steps: Some(120),
                ..Default::default()
            }),
            HistoryMessage::Sample(SampleRecord {
                date: "2026-08-23".to_string(),
                time: Some("18:00".to_string()),
                steps: Some(8412),
                distance: Some(6120.0),
                calories: Some(312.5),
                heart_rate: Some(68),
                ..Default::default()
            }),
            HistoryMessage::Complete,
        ],
    )
    .await;

    let snapshot = coordinator.read_steps().await.unwrap();
    assert_eq!(snapshot.steps, 8412);
    assert_eq!(snapshot.distance_meters, 6120.0);
    assert_eq!(snapshot.heart_rate, Some(68));
    assert_eq!(snapshot.date, "2026-08-23");
}

#[tokio::test]
async fn test_step_read_with_no_samples_is_no_data() {
    let (mock, coordinator) = connected_coordinator().await;
    mock.script_samples(0, vec![HistoryMessage::Complete]).await;
    let err = coordinator.read_steps().await.unwrap_err();
    assert_eq!(err.code(), "NO_DATA");
}

#[tokio::test]
async fn test_hrv_read_collects_records_and_score() {
    let (mock, coordinator) = connected_coordinator().await;
    mock.script_hrv(vec![
        HistoryMessage::Hrv(HrvRecord {
            date: "2026-08-23".to_string(),
            hrv_value: 58,
            heart_rate: Some(62),
            ..Default::default()
        }),
        HistoryMessage::DayScore(62),
        HistoryMessage::Complete,
    ])
    .await;

    let outcome = coordinator.read_hrv(None).await.unwrap();
    assert_eq!(outcome.total_records, 1);
    assert_eq!(outcome.records[0].hrv_value, 58);
    assert_eq!(outcome.day_hrv_score, 62);
}

#[tokio::test]
async fn test_multi_day_samples_aggregate_per_day() {
    let (mock, coordinator) = connected_coordinator().await;
    for day in 0..3u32 {
        mock.script_samples(
            day,
            vec![
                HistoryMessage::Sample(SampleRecord {
                    time: Some("09:00".to_string()),
                    heart_rate: Some(60 + day),
                    steps: Some(1_000 * (day + 1)),
                    ..Default::default()
                }),
                HistoryMessage::Sample(SampleRecord {
                    time: Some("09:05".to_string()),
                    heart_rate: Some(70 + day),
                    ..Default::default()
                }),
                HistoryMessage::HrvSample {
                    time: "09:00".to_string(),
                    value: 50 + day,
                },
                HistoryMessage::Complete,
            ],
        )
        .await;
    }

    let mut progress_rx = coordinator.subscribe(StreamKey::SyncProgress);
    let summaries = coordinator.read_daily_samples(3).await.unwrap();

    assert_eq!(summaries.len(), 3);
    assert_eq!(summaries[0].day_label, "Today");
    assert_eq!(summaries[1].day_label, "Yesterday");
    assert_eq!(summaries[2].day_label, "2 Days Ago");
    // Averages truncate: (60 + 70) / 2 = 65.
    assert_eq!(summaries[0].avg_heart_rate, Some(65));
    assert_eq!(summaries[0].total_steps, 1_000);
    assert_eq!(summaries[2].total_steps, 3_000);
    // The HRV sample joined onto the 09:00 record.
    assert_eq!(summaries[0].avg_hrv_value, Some(50));

    // Let the dispatcher drain before inspecting the progress stream.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut last_percent = 0;
    while let Ok(event) = progress_rx.try_recv() {
        if let BridgeEvent::SyncProgress { kind, percent } = event {
            assert_eq!(kind, HistoryKind::DailySamples);
            last_percent = percent;
        }
    }
    assert_eq!(last_percent, 100);
}

#[tokio::test]
async fn test_history_request_failure_maps_to_stable_code() {
    let (mock, coordinator) = connected_coordinator().await;
    mock.fail_operation("read_sleep").await;
    let err = coordinator.read_sleep().await.unwrap_err();
    assert_eq!(err.code(), "SLEEP_REQUEST_FAILED");
}

#[tokio::test]
async fn test_settings_patch_merges_onto_device_block() {
    let (mock, coordinator) = connected_coordinator().await;

    let merged = coordinator
        .set_do_not_disturb(true, Some(22 * 60), Some(7 * 60))
        .await
        .unwrap();
    assert!(merged.do_not_disturb);
    assert_eq!(merged.do_not_disturb_start, 22 * 60);

    // Untouched fields keep their on-device values.
    let stored = mock.read_settings().await.unwrap();
    assert!(stored.do_not_disturb);
    assert_eq!(stored.screen_brightness, 3);
}

#[tokio::test]
async fn test_command_dispatch_round_trip() {
    let mock = Arc::new(MockTransport::disconnected());
    let coordinator = coordinator_with(Arc::clone(&mock));

    let reply = dispatch(
        &coordinator,
        CommandRequest::new("connectDevice", Some(json!({"address": "AA:BB:CC:DD:EE:FF"}))),
    )
    .await;
    assert!(matches!(reply, CommandReply::Success(_)));

    let reply = dispatch(&coordinator, CommandRequest::new("getCurrentStatus", None)).await;
    assert_eq!(reply, CommandReply::Success(json!("connected")));

    let reply = dispatch(
        &coordinator,
        CommandRequest::new("bindDevice", Some(json!({"password": "0000", "is24H": true}))),
    )
    .await;
    assert!(matches!(reply, CommandReply::Success(_)));

    let reply = dispatch(&coordinator, CommandRequest::new("readBattery", None)).await;
    match reply {
        CommandReply::Success(value) => assert_eq!(value["level"], 85),
        CommandReply::Error { code, message } => panic!("readBattery failed: {code} {message}"),
    }

    let reply = dispatch(
        &coordinator,
        CommandRequest::new("setBloodGlucoseCalibration", Some(json!({"enabled": true}))),
    )
    .await;
    assert!(matches!(reply, CommandReply::Success(_)));
    assert!(mock.calibration_enabled());

    let reply = dispatch(&coordinator, CommandRequest::new("getAddress", None)).await;
    assert_eq!(reply, CommandReply::Success(json!("AA:BB:CC:DD:EE:FF")));
}

#[tokio::test]
async fn test_command_dispatch_error_codes() {
    let coordinator = coordinator_with(Arc::new(MockTransport::disconnected()));

    let reply = dispatch(&coordinator, CommandRequest::new("startDetectHeart", None)).await;
    assert_eq!(
        reply,
        CommandReply::Error {
            code: "NOT_CONNECTED".to_string(),
            message: "Not connected to device".to_string(),
        }
    );

    let reply = dispatch(&coordinator, CommandRequest::new("readEcgData", None)).await;
    match reply {
        CommandReply::Error { code, .. } => assert_eq!(code, "ECG_NOT_SUPPORTED"),
        CommandReply::Success(_) => panic!("expected error"),
    }

    let reply = dispatch(&coordinator, CommandRequest::new("fooBar", None)).await;
    match reply {
        CommandReply::Error { code, .. } => assert_eq!(code, "UNKNOWN_COMMAND"),
        CommandReply::Success(_) => panic!("expected error"),
    }

    // Missing required argument.
    let reply = dispatch(&coordinator, CommandRequest::new("connectDevice", None)).await;
    match reply {
        CommandReply::Error { code, .. } => assert_eq!(code, "INVALID_ARGUMENT"),
        CommandReply::Success(_) => panic!("expected error"),
    }
}

#[tokio::test]
async fn test_bind_requires_both_arguments() {
    let mock = Arc::new(MockTransport::new());
    let coordinator = coordinator_with(Arc::clone(&mock));
    coordinator.connect("AA:BB:CC:DD:EE:FF").await.unwrap();

    let reply = dispatch(
        &coordinator,
        CommandRequest::new("bindDevice", Some(json!({"password": "0000"}))),
    )
    .await;
    match reply {
        CommandReply::Error { code, .. } => assert_eq!(code, "INVALID_ARGUMENT"),
        CommandReply::Success(_) => panic!("expected error"),
    }
    assert!(!mock.is_bound());

    let reply = dispatch(
        &coordinator,
        CommandRequest::new("bindDevice", Some(json!({"password": "0000", "is24H": false}))),
    )
    .await;
    assert!(matches!(reply, CommandReply::Success(_)));
    assert!(mock.is_bound());
}

#[tokio::test]
async fn test_set_user_profile_defaults_goals() {
    let (mock, coordinator) = connected_coordinator().await;

    let reply = dispatch(
        &coordinator,
        CommandRequest::new(
            "setUserProfile",
            Some(json!({"heightCm": 180, "weightKg": 75.0, "age": 30, "gender": "male"})),
        ),
    )
    .await;
    assert!(matches!(reply, CommandReply::Success(_)));

    let stored = mock.read_user_profile().await.unwrap();
    assert_eq!(stored.height_cm, 180);
    assert_eq!(stored.target_steps, 10_000);
    assert_eq!(stored.target_sleep_minutes, 480);

    // Explicit goals still win over the defaults.
    let reply = dispatch(
        &coordinator,
        CommandRequest::new(
            "setUserProfile",
            Some(json!({
                "heightCm": 180, "weightKg": 75.0, "age": 30, "gender": "male",
                "targetSteps": 12_000
            })),
        ),
    )
    .await;
    assert!(matches!(reply, CommandReply::Success(_)));
    assert_eq!(mock.read_user_profile().await.unwrap().target_steps, 12_000);
}

#[tokio::test(start_paused = true)]
async fn test_silent_day_resolves_with_empty_summary() {
    let (mock, coordinator) = connected_coordinator().await;
    for day in [0u32, 2] {
        mock.script_samples(
            day,
            vec![
                HistoryMessage::Sample(SampleRecord {
                    time: Some("09:00".to_string()),
                    heart_rate: Some(60),
                    steps: Some(1_000 * (day + 1)),
                    ..Default::default()
                }),
                HistoryMessage::Complete,
            ],
        )
        .await;
    }
    // The middle day accepts the request and then never answers; the
    // inactivity clock must end it without consuming the whole ceiling.
    mock.hold_day_open(1).await;

    let summaries = coordinator.read_daily_samples(3).await.unwrap();

    assert_eq!(summaries.len(), 3);
    assert_eq!(summaries[0].total_steps, 1_000);
    assert_eq!(summaries[1].day_label, "Yesterday");
    assert_eq!(summaries[1].total_steps, 0);
    assert_eq!(summaries[1].avg_heart_rate, None);
    assert!(summaries[1].hourly.is_empty());
    assert_eq!(summaries[2].total_steps, 3_000);
}

#[tokio::test]
async fn test_disconnect_stops_running_detections() {
    let (mock, coordinator) = connected_coordinator().await;
    mock.set_telemetry_pacing(Duration::from_millis(500)).await;
    mock.script_telemetry(DetectionKind::Spo2, vec![VendorTelemetry::Progress(10)])
        .await;

    coordinator.start_detection(DetectionKind::Spo2).await.unwrap();
    coordinator.disconnect().await.unwrap();

    assert_eq!(mock.stop_count(DetectionKind::Spo2).await, 1);
    assert!(!coordinator.is_detecting(DetectionKind::Spo2).await);
}
