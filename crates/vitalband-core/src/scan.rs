//! Device discovery and scanning.
//!
//! This module provides functionality to scan for VitalBand wearables
//! using Bluetooth Low Energy. Results can be collected in one shot or
//! streamed to the broadcaster's scan sink while a scan runs.

use std::collections::HashSet;
use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::util::create_identifier;

/// Name prefixes wearables of this family advertise under.
const WEARABLE_NAME_PREFIXES: [&str; 3] = ["VitalBand", "VB-", "VPB"];

/// Information about a discovered wearable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredDevice {
    /// The advertised device name.
    pub name: Option<String>,
    /// The BLE address as a string (zeros on macOS, use `identifier`).
    pub address: String,
    /// A connection identifier (peripheral ID on macOS, address elsewhere).
    pub identifier: String,
    /// RSSI signal strength in dBm.
    pub rssi: Option<i16>,
    /// Whether the advertisement matches this wearable family.
    pub is_wearable: bool,
}

/// Options for scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to scan for devices.
    pub duration: Duration,
    /// Only report devices that look like wearables of this family.
    pub filter_wearables_only: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
            filter_wearables_only: true,
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Report all BLE devices, not just this wearable family.
    #[must_use]
    pub fn all_devices(mut self) -> Self {
        self.filter_wearables_only = false;
        self
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or_else(|| Error::operation("scan", "no Bluetooth adapter available"))
}

/// Scan once and return every wearable found in range.
///
/// An empty list means no devices were found, which is not an error.
pub async fn scan_for_devices() -> Result<Vec<DiscoveredDevice>> {
    scan_with_options(ScanOptions::default()).await
}

/// Scan once with custom options.
pub async fn scan_with_options(options: ScanOptions) -> Result<Vec<DiscoveredDevice>> {
    let adapter = get_adapter().await?;

    info!(duration = ?options.duration, "starting BLE scan");
    adapter.start_scan(ScanFilter::default()).await?;
    sleep(options.duration).await;
    adapter.stop_scan().await?;

    let mut discovered = Vec::new();
    for peripheral in adapter.peripherals().await? {
        match process_peripheral(&peripheral, options.filter_wearables_only).await {
            Ok(Some(device)) => discovered.push(device),
            Ok(None) => {}
            Err(e) => debug!("error processing peripheral: {e}"),
        }
    }

    info!(count = discovered.len(), "scan complete");
    Ok(discovered)
}

/// A background scan streaming results until stopped.
///
/// Each newly seen device is delivered once through the `on_device`
/// callback; the coordinator forwards these to the scan event sink.
pub struct Scanner {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Scanner {
    /// Start scanning, invoking `on_device` for every new device.
    pub async fn start(
        options: ScanOptions,
        on_device: impl Fn(DiscoveredDevice) + Send + Sync + 'static,
    ) -> Result<Self> {
        let adapter = get_adapter().await?;
        adapter.start_scan(ScanFilter::default()).await?;

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut seen: HashSet<String> = HashSet::new();
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = sleep(Duration::from_secs(1)) => {
                        let peripherals = match adapter.peripherals().await {
                            Ok(p) => p,
                            Err(e) => {
                                warn!("scan poll failed: {e}");
                                continue;
                            }
                        };
                        for peripheral in peripherals {
                            if let Ok(Some(device)) =
                                process_peripheral(&peripheral, options.filter_wearables_only).await
                                && seen.insert(device.identifier.clone())
                            {
                                debug!(name = ?device.name, "discovered wearable");
                                on_device(device);
                            }
                        }
                    }
                }
            }
            if let Err(e) = adapter.stop_scan().await {
                warn!("failed to stop scan: {e}");
            }
        });

        Ok(Self { cancel, handle })
    }

    /// Stop the scan and its polling task.
    pub fn stop(self) {
        self.cancel.cancel();
    }

    /// Whether the scan task is still running.
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn process_peripheral(
    peripheral: &Peripheral,
    filter_wearables_only: bool,
) -> Result<Option<DiscoveredDevice>> {
    let Some(properties) = peripheral.properties().await? else {
        return Ok(None);
    };

    let id = peripheral.id();
    let address = properties.address.to_string();
    let name = properties.local_name.clone();
    let rssi = properties.rssi;

    let is_wearable = is_wearable_device(&properties);
    if filter_wearables_only && !is_wearable {
        return Ok(None);
    }

    let identifier = create_identifier(&address, &id);
    Ok(Some(DiscoveredDevice {
        name,
        address,
        identifier,
        rssi,
        is_wearable,
    }))
}

fn is_wearable_device(properties: &PeripheralProperties) -> bool {
    properties
        .local_name
        .as_deref()
        .is_some_and(|name| WEARABLE_NAME_PREFIXES.iter().any(|p| name.starts_with(p)))
}
