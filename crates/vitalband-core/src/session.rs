//! Live detection sessions and the telemetry normalizer.
//!
//! Each detection kind runs at most one session. A session is a pump task
//! that drains the transport's telemetry channel through an [`EventReducer`]
//! and publishes the resulting snapshots. [`SessionGuard`] owns the session
//! table and serializes starts and stops of the same kind; restarting a kind
//! stops the old session first and waits a short quiescence window so the
//! firmware settles before the next start write.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vitalband_types::units::{celsius_to_fahrenheit, filter_waveform, mmoll_to_mgdl};
use vitalband_types::{CanonicalEvent, DetectionKind, DetectionPayload, DetectionState};

use crate::error::{Error, Result};
use crate::events::EventBroadcaster;
use crate::transport::{VendorTelemetry, WearableTransport};
use crate::util::now_ms;

/// Firmware settle time between stopping a detection and restarting it.
pub const RESTART_QUIESCENCE: Duration = Duration::from_millis(300);

/// Telemetry channel depth per session.
const TELEMETRY_BUFFER: usize = 32;

/// ECG signal quality below this is reported as a poor signal.
const ECG_POOR_SIGNAL_THRESHOLD: u8 = 50;

/// Folds vendor telemetry into full canonical snapshots.
///
/// The reducer is a pure state machine: every applied message yields the
/// complete current picture for the kind, so consumers never reconstruct
/// state from partial updates.
#[derive(Debug, Clone)]
pub struct EventReducer {
    snapshot: CanonicalEvent,
}

impl EventReducer {
    /// Create a reducer seeded with the idle snapshot for a kind.
    #[must_use]
    pub fn new(kind: DetectionKind) -> Self {
        Self {
            snapshot: CanonicalEvent::idle(kind, now_ms()),
        }
    }

    /// The current snapshot without applying anything.
    #[must_use]
    pub fn snapshot(&self) -> &CanonicalEvent {
        &self.snapshot
    }

    /// Apply one telemetry message and return the updated snapshot.
    pub fn apply(&mut self, message: VendorTelemetry) -> CanonicalEvent {
        match message {
            VendorTelemetry::Progress(p) => {
                self.snapshot.progress = p.min(100);
                self.snapshot.state = DetectionState::from_progress(p);
            }
            VendorTelemetry::HeartRate(value) => {
                if let DetectionPayload::HeartRate { bpm } = &mut self.snapshot.payload {
                    *bpm = Some(value);
                }
            }
            VendorTelemetry::Oxygen(value) => {
                if let DetectionPayload::Spo2 { percent } = &mut self.snapshot.payload {
                    *percent = Some(value);
                }
            }
            VendorTelemetry::Pressure {
                systolic,
                diastolic,
                checking,
            } => {
                if let DetectionPayload::BloodPressure {
                    systolic: sys,
                    diastolic: dia,
                } = &mut self.snapshot.payload
                {
                    *sys = Some(systolic);
                    *dia = Some(diastolic);
                }
                self.snapshot.state = if checking {
                    DetectionState::Measuring
                } else if systolic > 0 && diastolic > 0 {
                    DetectionState::Complete
                } else {
                    DetectionState::Idle
                };
            }
            VendorTelemetry::Glucose {
                progress,
                mmol_per_l,
                risk,
            } => {
                if let DetectionPayload::BloodGlucose {
                    glucose_mmol_l,
                    glucose_mg_dl,
                    risk_level,
                } = &mut self.snapshot.payload
                {
                    *glucose_mmol_l = Some(mmol_per_l);
                    *glucose_mg_dl = Some(mmoll_to_mgdl(mmol_per_l));
                    *risk_level = risk;
                }
                self.snapshot.progress = progress.min(100);
                self.snapshot.state = DetectionState::from_progress(progress);
            }
            VendorTelemetry::Temperature {
                body_celsius,
                wrist_celsius,
                checking,
                progress,
            } => {
                if let DetectionPayload::Temperature {
                    temperature_celsius,
                    temperature_fahrenheit,
                    wrist_temperature_celsius,
                } = &mut self.snapshot.payload
                {
                    *temperature_celsius = Some(body_celsius);
                    *temperature_fahrenheit = Some(celsius_to_fahrenheit(body_celsius));
                    *wrist_temperature_celsius = Some(wrist_celsius);
                }
                self.snapshot.progress = progress.min(100);
                self.snapshot.state = if checking {
                    DetectionState::Measuring
                } else if body_celsius > 0.0 {
                    DetectionState::Complete
                } else {
                    DetectionState::Idle
                };
            }
            VendorTelemetry::EcgFrame {
                checking,
                progress,
                heart_rate,
                signal_quality,
                diagnosis,
            } => {
                if let DetectionPayload::Ecg {
                    heart_rate: hr,
                    diagnostic_result,
                    signal_quality: quality,
                    ..
                } = &mut self.snapshot.payload
                {
                    *hr = Some(heart_rate);
                    *quality = Some(signal_quality);
                    if diagnosis.is_some() {
                        *diagnostic_result = diagnosis;
                    }
                }
                self.snapshot.progress = progress.min(100);
                self.snapshot.state = if checking {
                    DetectionState::Measuring
                } else if signal_quality < ECG_POOR_SIGNAL_THRESHOLD {
                    DetectionState::PoorSignal
                } else if heart_rate > 0 {
                    DetectionState::Complete
                } else {
                    DetectionState::Idle
                };
            }
            VendorTelemetry::RawSamples(samples) => {
                if let DetectionPayload::Ecg { waveform, .. } = &mut self.snapshot.payload {
                    *waveform = filter_waveform(&samples);
                }
            }
            VendorTelemetry::Component {
                progress,
                complete,
                uric_acid,
                total_cholesterol,
                triglyceride,
                hdl,
                ldl,
            } => {
                if let DetectionPayload::BloodComponent {
                    uric_acid: ua,
                    total_cholesterol: tc,
                    triglyceride: tg,
                    hdl: h,
                    ldl: l,
                } = &mut self.snapshot.payload
                {
                    *ua = Some(uric_acid);
                    *tc = Some(total_cholesterol);
                    *tg = Some(triglyceride);
                    *h = Some(hdl);
                    *l = Some(ldl);
                }
                self.snapshot.progress = progress.min(100);
                self.snapshot.state = if complete {
                    DetectionState::Complete
                } else {
                    DetectionState::from_progress(progress)
                };
            }
            VendorTelemetry::Status { error_code, status } => {
                self.snapshot.state = status.canonical_state();
                if let Some(code) = error_code {
                    self.snapshot.error = true;
                    self.snapshot.error_code = Some(code);
                    self.snapshot.error_message =
                        Some(format!("Device reported error code {code}"));
                }
            }
            VendorTelemetry::Stopped => {
                self.snapshot.state = DetectionState::Idle;
                self.snapshot.progress = 0;
                self.snapshot.stopped = true;
            }
        }

        self.snapshot.is_measuring = self.snapshot.state == DetectionState::Measuring;
        self.snapshot.timestamp_ms = now_ms();
        self.snapshot.clone()
    }
}

struct ActiveSession {
    cancel: CancellationToken,
    pump: JoinHandle<()>,
}

/// One kind's session, locked independently of every other kind. A restart
/// sleeps the quiescence window while holding only its own slot, so other
/// kinds can start and stop in the meantime.
type SessionSlot = Arc<Mutex<Option<ActiveSession>>>;

/// Owns the per-kind session table.
///
/// At most one session per kind. The write lock serializes start and stop
/// writes against every other transport write so the firmware never sees
/// interleaved command frames.
pub struct SessionGuard {
    transport: Arc<dyn WearableTransport>,
    broadcaster: EventBroadcaster,
    write_lock: Arc<Mutex<()>>,
    slots: Mutex<HashMap<DetectionKind, SessionSlot>>,
    quiescence: Duration,
}

impl SessionGuard {
    /// Create a session guard sharing the coordinator's write lock.
    pub fn new(
        transport: Arc<dyn WearableTransport>,
        broadcaster: EventBroadcaster,
        write_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            transport,
            broadcaster,
            write_lock,
            slots: Mutex::new(HashMap::new()),
            quiescence: RESTART_QUIESCENCE,
        }
    }

    async fn slot(&self, kind: DetectionKind) -> SessionSlot {
        self.slots.lock().await.entry(kind).or_default().clone()
    }

    /// Override the restart quiescence window.
    #[must_use]
    pub fn with_quiescence(mut self, quiescence: Duration) -> Self {
        self.quiescence = quiescence;
        self
    }

    /// Start a detection, replacing any running session for the kind.
    ///
    /// A running session for the same kind is stopped first, then the start
    /// write is delayed by the quiescence window.
    pub async fn start(&self, kind: DetectionKind) -> Result<()> {
        if !self.transport.supports_detection(kind) {
            return Err(Error::DetectionNotSupported { kind });
        }

        let slot = self.slot(kind).await;
        let mut slot = slot.lock().await;
        if let Some(previous) = slot.take() {
            info!(kind = kind.as_str(), "restarting, stopping previous session");
            self.shutdown_session(kind, previous, false).await;
            tokio::time::sleep(self.quiescence).await;
        }

        let (tx, mut rx) = mpsc::channel(TELEMETRY_BUFFER);
        {
            let _write = self.write_lock.lock().await;
            self.transport
                .start_detection(kind, tx)
                .await
                .map_err(|e| match e {
                    // These carry their own stable codes.
                    Error::NativeDependencyMissing | Error::DetectionNotSupported { .. } => e,
                    other => Error::start_detection(kind, other.to_string()),
                })?;
        }

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let broadcaster = self.broadcaster.clone();
        let pump = tokio::spawn(async move {
            let mut reducer = EventReducer::new(kind);
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => {
                        debug!(kind = kind.as_str(), "session pump cancelled");
                        break;
                    }
                    message = rx.recv() => {
                        let Some(message) = message else {
                            debug!(kind = kind.as_str(), "telemetry channel closed");
                            break;
                        };
                        let finished = matches!(message, VendorTelemetry::Stopped);
                        broadcaster.publish_detection(reducer.apply(message));
                        if finished {
                            break;
                        }
                    }
                }
            }
        });

        *slot = Some(ActiveSession { cancel, pump });
        Ok(())
    }

    /// Stop a detection. A stop with no running session is a no-op.
    ///
    /// Emits exactly one terminal `stopped` snapshot for the session.
    pub async fn stop(&self, kind: DetectionKind) -> Result<()> {
        let slot = self.slot(kind).await;
        let mut slot = slot.lock().await;
        let Some(session) = slot.take() else {
            warn!(kind = kind.as_str(), "stop requested with no active session");
            return Ok(());
        };
        self.shutdown_session(kind, session, true).await;
        Ok(())
    }

    /// Stop every running detection, used on disconnect.
    pub async fn stop_all(&self) {
        let slots: Vec<(DetectionKind, SessionSlot)> =
            self.slots.lock().await.drain().collect();
        for (kind, slot) in slots {
            if let Some(session) = slot.lock().await.take() {
                self.shutdown_session(kind, session, true).await;
            }
        }
    }

    /// Whether a session is currently running for a kind.
    pub async fn is_active(&self, kind: DetectionKind) -> bool {
        let slot = self.slot(kind).await;
        let guard = slot.lock().await;
        guard.as_ref().is_some_and(|s| !s.pump.is_finished())
    }

    async fn shutdown_session(&self, kind: DetectionKind, session: ActiveSession, emit: bool) {
        // The firmware already finished if the pump exited on its own; in
        // that case the pump published the terminal snapshot.
        let pump_finished = session.pump.is_finished();

        {
            let _write = self.write_lock.lock().await;
            if let Err(e) = self.transport.stop_detection(kind).await {
                warn!(kind = kind.as_str(), error = %e, "stop-detection write failed");
            }
        }
        session.cancel.cancel();

        if emit && !pump_finished {
            self.broadcaster
                .publish_detection(CanonicalEvent::stopped(kind, now_ms()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitalband_types::types::VendorStatus;
    use vitalband_types::units::WAVEFORM_SENTINEL;
    use vitalband_types::GlucoseRiskLevel;

    #[test]
    fn test_progress_classification() {
        let mut reducer = EventReducer::new(DetectionKind::HeartRate);
        assert_eq!(
            reducer.apply(VendorTelemetry::Progress(0)).state,
            DetectionState::Idle
        );
        let event = reducer.apply(VendorTelemetry::Progress(45));
        assert_eq!(event.state, DetectionState::Measuring);
        assert!(event.is_measuring);
        let event = reducer.apply(VendorTelemetry::Progress(100));
        assert_eq!(event.state, DetectionState::Complete);
        assert!(!event.is_measuring);
    }

    #[test]
    fn test_heart_rate_sample_keeps_state() {
        let mut reducer = EventReducer::new(DetectionKind::HeartRate);
        reducer.apply(VendorTelemetry::Progress(30));
        let event = reducer.apply(VendorTelemetry::HeartRate(72));
        assert_eq!(event.state, DetectionState::Measuring);
        assert_eq!(event.payload, DetectionPayload::HeartRate { bpm: Some(72) });
    }

    #[test]
    fn test_glucose_carries_both_units() {
        let mut reducer = EventReducer::new(DetectionKind::BloodGlucose);
        let event = reducer.apply(VendorTelemetry::Glucose {
            progress: 100,
            mmol_per_l: 5.5,
            risk: GlucoseRiskLevel::None,
        });
        assert_eq!(event.state, DetectionState::Complete);
        match event.payload {
            DetectionPayload::BloodGlucose {
                glucose_mmol_l,
                glucose_mg_dl,
                risk_level,
            } => {
                assert_eq!(glucose_mmol_l, Some(5.5));
                assert!((glucose_mg_dl.unwrap() - 99.1001).abs() < 0.001);
                assert_eq!(risk_level, GlucoseRiskLevel::None);
            }
            _ => panic!("wrong payload variant"),
        }
    }

    #[test]
    fn test_ecg_state_rule() {
        let mut reducer = EventReducer::new(DetectionKind::Ecg);

        let event = reducer.apply(VendorTelemetry::EcgFrame {
            checking: true,
            progress: 10,
            heart_rate: 0,
            signal_quality: 20,
            diagnosis: None,
        });
        assert_eq!(event.state, DetectionState::Measuring);

        let event = reducer.apply(VendorTelemetry::EcgFrame {
            checking: false,
            progress: 100,
            heart_rate: 70,
            signal_quality: 30,
            diagnosis: None,
        });
        assert_eq!(event.state, DetectionState::PoorSignal);

        let event = reducer.apply(VendorTelemetry::EcgFrame {
            checking: false,
            progress: 100,
            heart_rate: 70,
            signal_quality: 90,
            diagnosis: Some("sinus rhythm".to_string()),
        });
        assert_eq!(event.state, DetectionState::Complete);

        let event = reducer.apply(VendorTelemetry::EcgFrame {
            checking: false,
            progress: 100,
            heart_rate: 0,
            signal_quality: 90,
            diagnosis: None,
        });
        assert_eq!(event.state, DetectionState::Idle);
        // A later frame without a diagnosis keeps the earlier one.
        match event.payload {
            DetectionPayload::Ecg {
                diagnostic_result, ..
            } => assert_eq!(diagnostic_result.as_deref(), Some("sinus rhythm")),
            _ => panic!("wrong payload variant"),
        }
    }

    #[test]
    fn test_waveform_sentinel_filtered() {
        let mut reducer = EventReducer::new(DetectionKind::Ecg);
        let event = reducer.apply(VendorTelemetry::RawSamples(vec![
            10,
            WAVEFORM_SENTINEL,
            -3,
            WAVEFORM_SENTINEL,
        ]));
        match event.payload {
            DetectionPayload::Ecg { waveform, .. } => assert_eq!(waveform, vec![10, -3]),
            _ => panic!("wrong payload variant"),
        }
    }

    #[test]
    fn test_blood_pressure_states() {
        let mut reducer = EventReducer::new(DetectionKind::BloodPressure);

        let event = reducer.apply(VendorTelemetry::Pressure {
            systolic: 0,
            diastolic: 0,
            checking: true,
        });
        assert_eq!(event.state, DetectionState::Measuring);

        let event = reducer.apply(VendorTelemetry::Pressure {
            systolic: 120,
            diastolic: 80,
            checking: false,
        });
        assert_eq!(event.state, DetectionState::Complete);

        let event = reducer.apply(VendorTelemetry::Pressure {
            systolic: 0,
            diastolic: 0,
            checking: false,
        });
        assert_eq!(event.state, DetectionState::Idle);
    }

    #[test]
    fn test_vendor_status_and_error_flags() {
        let mut reducer = EventReducer::new(DetectionKind::Spo2);
        let event = reducer.apply(VendorTelemetry::Status {
            error_code: Some(4),
            status: VendorStatus::Busy,
        });
        assert_eq!(event.state, DetectionState::Failed);
        assert!(event.error);
        assert_eq!(event.error_code, Some(4));

        let event = reducer.apply(VendorTelemetry::Status {
            error_code: None,
            status: VendorStatus::NotSupported,
        });
        assert_eq!(event.state, DetectionState::NotSupported);
    }

    #[test]
    fn test_temperature_conversion() {
        let mut reducer = EventReducer::new(DetectionKind::Temperature);
        let event = reducer.apply(VendorTelemetry::Temperature {
            body_celsius: 36.6,
            wrist_celsius: 33.2,
            checking: false,
            progress: 100,
        });
        assert_eq!(event.state, DetectionState::Complete);
        match event.payload {
            DetectionPayload::Temperature {
                temperature_celsius,
                temperature_fahrenheit,
                wrist_temperature_celsius,
            } => {
                assert_eq!(temperature_celsius, Some(36.6));
                assert!((temperature_fahrenheit.unwrap() - 97.88).abs() < 0.01);
                assert_eq!(wrist_temperature_celsius, Some(33.2));
            }
            _ => panic!("wrong payload variant"),
        }
    }

    #[test]
    fn test_stopped_resets_lifecycle() {
        let mut reducer = EventReducer::new(DetectionKind::HeartRate);
        reducer.apply(VendorTelemetry::Progress(60));
        let event = reducer.apply(VendorTelemetry::Stopped);
        assert!(event.stopped);
        assert_eq!(event.state, DetectionState::Idle);
        assert_eq!(event.progress, 0);
        assert!(!event.is_measuring);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_quiescence_does_not_block_other_kinds() {
        let transport = Arc::new(crate::mock::MockTransport::new());
        let guard = Arc::new(
            SessionGuard::new(
                transport.clone() as Arc<dyn WearableTransport>,
                EventBroadcaster::new(),
                Arc::new(Mutex::new(())),
            )
            .with_quiescence(Duration::from_secs(5)),
        );

        guard.start(DetectionKind::HeartRate).await.unwrap();

        // Restart the same kind in the background; it sleeps the quiescence
        // window while holding only its own slot.
        let restart = {
            let guard = Arc::clone(&guard);
            tokio::spawn(async move { guard.start(DetectionKind::HeartRate).await })
        };
        tokio::task::yield_now().await;

        let before = tokio::time::Instant::now();
        guard.start(DetectionKind::Spo2).await.unwrap();
        assert!(
            before.elapsed() < Duration::from_secs(5),
            "starting another kind waited out the quiescence window"
        );

        restart.await.unwrap().unwrap();
        assert_eq!(transport.start_count(DetectionKind::HeartRate).await, 2);
        assert_eq!(transport.start_count(DetectionKind::Spo2).await, 1);
    }
}
