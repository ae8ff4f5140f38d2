//! Host platform services.
//!
//! Bluetooth radio state and permission prompts belong to the host OS, not
//! the wearable protocol. The coordinator reaches them through this trait
//! so the protocol layer stays testable and platform-free.

use async_trait::async_trait;

use crate::error::Result;

/// Outcome of a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    /// All requested permissions granted.
    Granted,
    /// At least one permission denied; the user may be asked again.
    Denied,
    /// Denied permanently; only the OS settings screen can change it.
    PermanentlyDenied,
}

/// Trait abstracting OS-level Bluetooth and permission operations.
///
/// Implementations live in host embeddings; tests use a stub.
#[async_trait]
pub trait PlatformServices: Send + Sync {
    /// Prompt the user for the Bluetooth permissions this platform needs.
    async fn request_bluetooth_permissions(&self) -> Result<PermissionOutcome>;

    /// Open the OS settings screen for this application.
    async fn open_app_settings(&self) -> Result<()>;

    /// Whether the Bluetooth radio is currently on.
    async fn is_bluetooth_enabled(&self) -> Result<bool>;

    /// Ask the OS to turn the Bluetooth radio on.
    ///
    /// On platforms where applications may not toggle the radio this
    /// opens the OS Bluetooth settings instead.
    async fn open_bluetooth(&self) -> Result<()>;

    /// Ask the OS to turn the Bluetooth radio off, where permitted.
    async fn close_bluetooth(&self) -> Result<()>;
}

/// A platform with the radio always on and permissions always granted.
///
/// Useful for tests and headless embeddings.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOnPlatform;

#[async_trait]
impl PlatformServices for AlwaysOnPlatform {
    async fn request_bluetooth_permissions(&self) -> Result<PermissionOutcome> {
        Ok(PermissionOutcome::Granted)
    }

    async fn open_app_settings(&self) -> Result<()> {
        Ok(())
    }

    async fn is_bluetooth_enabled(&self) -> Result<bool> {
        Ok(true)
    }

    async fn open_bluetooth(&self) -> Result<()> {
        Ok(())
    }

    async fn close_bluetooth(&self) -> Result<()> {
        Ok(())
    }
}
