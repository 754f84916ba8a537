//! Scan Session Protocol
//!
//! Constants and user-facing texts shared by the scan session and its
//! observers.

use crate::error::RadioError;
use std::time::Duration;

/// Auto-stop delay used when no timeout is configured
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default BLE ATT MTU, used until a larger size is negotiated
pub const DEFAULT_TRANSFER_SIZE: u16 = 23;

/// Published once permission is granted and the radio is open
pub const SCANNING_MESSAGE: &str = "Scanning for devices...";

/// Published whenever a session is stopped
pub const STOPPED_MESSAGE: &str = "Scanning stopped";

/// Title of the alert raised when an authorization is refused
pub const PERMISSION_DENIED_TITLE: &str = "Permission Denied";

pub const UNNAMED_DEVICE_LABEL: &str = "Unnamed Device";

/// Status text for a session terminated by the radio.
pub fn failure_message(error: &RadioError) -> String {
    format!("Scanning failed: {}", error)
}
