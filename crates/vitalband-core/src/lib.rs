//! Session coordination and telemetry normalization for VitalBand wearables.
//!
//! This crate drives one wearable end to end: it discovers devices over
//! Bluetooth Low Energy, owns the connection lifecycle, runs live detection
//! sessions, normalizes the vendor's callback soup into one canonical event
//! shape, and aggregates on-device history into daily summaries.
//!
//! # Features
//!
//! - **Device discovery**: Scan for nearby wearables via BLE
//! - **Session lifecycle**: Connect, bind, and disconnect with fail-fast checks
//! - **Live detections**: Heart rate, SpO2, blood pressure, glucose,
//!   temperature, ECG, and blood component measurements as one event stream
//! - **History reads**: Sleep, steps, HRV, and multi-day 5-minute samples
//!   with deadline-bounded collection
//! - **Command surface**: A named-command dispatch layer for host runtimes
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vitalband_core::coordinator::DeviceSessionCoordinator;
//! use vitalband_core::platform::AlwaysOnPlatform;
//! use vitalband_core::mock::MockTransport;
//! use vitalband_types::DetectionKind;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = DeviceSessionCoordinator::new(
//!         Arc::new(MockTransport::disconnected()),
//!         Arc::new(AlwaysOnPlatform),
//!     );
//!
//!     coordinator.connect("AA:BB:CC:DD:EE:FF").await?;
//!     coordinator.bind("0000", true).await?;
//!     coordinator.start_detection(DetectionKind::HeartRate).await?;
//!
//!     let battery = coordinator.read_battery().await?;
//!     println!("battery: {}%", battery.level);
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod history;
pub mod mock;
pub mod platform;
pub mod scan;
pub mod session;
pub mod transport;
pub mod util;

// Re-export the data model crate so hosts need only one dependency.
pub use vitalband_types as types;

// Core exports
pub use commands::{CommandReply, CommandRequest, dispatch};
pub use coordinator::{CoordinatorConfig, DeviceSession, DeviceSessionCoordinator};
pub use error::{Error, Result};
pub use events::{BridgeEvent, EventBroadcaster, StreamKey};
pub use history::{HistoryReader, ReadOptions};
pub use mock::MockTransport;
pub use platform::{AlwaysOnPlatform, PermissionOutcome, PlatformServices};
pub use scan::{DiscoveredDevice, ScanOptions, scan_for_devices, scan_with_options};
pub use session::SessionGuard;
pub use transport::{HistoryMessage, VendorTelemetry, WearableTransport};
pub use util::{create_identifier, format_peripheral_id};

// Re-export the common data types hosts touch directly.
pub use vitalband_types::{
    CanonicalEvent, DailySummary, DetectionKind, DetectionState, DeviceInfo, DeviceStatus,
    HrvReadOutcome, SleepRecord, StepSnapshot,
};
