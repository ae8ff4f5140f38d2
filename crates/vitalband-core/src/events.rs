//! Event fan-out to host-facing streams.
//!
//! Hosts attach one sink per stream: one per detection kind, one for scan
//! results, one for sync progress. A single dispatcher task owns the sink
//! table and serializes registration, deregistration and publishing, so no
//! lock is ever held across a send. Publishing never blocks and never
//! errors: events for an absent sink are dropped quietly, events for a
//! full sink are dropped with a warning.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use vitalband_types::types::HistoryKind;
use vitalband_types::{CanonicalEvent, DetectionKind};

use crate::scan::DiscoveredDevice;

/// Identifies one host-facing event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKey {
    /// Live telemetry for one detection kind.
    Detection(DetectionKind),
    /// BLE scan results.
    Scan,
    /// History read progress.
    SyncProgress,
}

/// An event published to a host-facing stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BridgeEvent {
    /// A normalized telemetry snapshot.
    Detection(CanonicalEvent),
    /// A device discovered during scanning.
    Scan(DiscoveredDevice),
    /// Progress of a running history read.
    #[serde(rename_all = "camelCase")]
    SyncProgress {
        kind: HistoryKind,
        /// Percent complete (0-100).
        percent: u8,
    },
}

enum DispatchOp {
    Register {
        key: StreamKey,
        sink: mpsc::Sender<BridgeEvent>,
    },
    Deregister {
        key: StreamKey,
    },
    Publish {
        key: StreamKey,
        event: BridgeEvent,
    },
}

/// Fan-out hub for host-facing event streams.
///
/// Cloning is cheap; all clones feed the same dispatcher task. The task
/// exits when the last clone is dropped.
#[derive(Clone)]
pub struct EventBroadcaster {
    ops: mpsc::UnboundedSender<DispatchOp>,
}

/// Default per-sink buffer size.
pub const DEFAULT_SINK_CAPACITY: usize = 64;

impl EventBroadcaster {
    /// Create a broadcaster and spawn its dispatcher task.
    #[must_use]
    pub fn new() -> Self {
        let (ops, mut rx) = mpsc::unbounded_channel::<DispatchOp>();

        tokio::spawn(async move {
            let mut sinks: HashMap<StreamKey, mpsc::Sender<BridgeEvent>> = HashMap::new();
            while let Some(op) = rx.recv().await {
                match op {
                    DispatchOp::Register { key, sink } => {
                        if sinks.insert(key, sink).is_some() {
                            debug!(?key, "replaced existing event sink");
                        }
                    }
                    DispatchOp::Deregister { key } => {
                        sinks.remove(&key);
                    }
                    DispatchOp::Publish { key, event } => match sinks.get(&key) {
                        None => debug!(?key, "dropping event, no sink attached"),
                        Some(sink) => match sink.try_send(event) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                warn!(?key, "dropping event, sink buffer full");
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => {
                                debug!(?key, "sink closed, removing");
                                sinks.remove(&key);
                            }
                        },
                    },
                }
            }
        });

        Self { ops }
    }

    /// Attach a sink for a stream, replacing any previous one.
    ///
    /// Returns the receiving end with the default buffer size.
    pub fn register(&self, key: StreamKey) -> mpsc::Receiver<BridgeEvent> {
        self.register_with_capacity(key, DEFAULT_SINK_CAPACITY)
    }

    /// Attach a sink with an explicit buffer size.
    pub fn register_with_capacity(
        &self,
        key: StreamKey,
        capacity: usize,
    ) -> mpsc::Receiver<BridgeEvent> {
        let (tx, rx) = mpsc::channel(capacity);
        let _ = self.ops.send(DispatchOp::Register { key, sink: tx });
        rx
    }

    /// Detach the sink for a stream, if any.
    pub fn deregister(&self, key: StreamKey) {
        let _ = self.ops.send(DispatchOp::Deregister { key });
    }

    /// Publish an event to a stream. Never blocks, never errors.
    pub fn publish(&self, key: StreamKey, event: BridgeEvent) {
        let _ = self.ops.send(DispatchOp::Publish { key, event });
    }

    /// Publish a telemetry snapshot to its kind's stream.
    pub fn publish_detection(&self, event: CanonicalEvent) {
        self.publish(StreamKey::Detection(event.kind), BridgeEvent::Detection(event));
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
