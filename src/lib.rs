//! Bounded BLE discovery sessions: permission gating, deduplicated device
//! tracking, timeout-driven auto-stop and observable status.

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use domain::models::{DeviceEvent, Peripheral, ScanSnapshot, ScanStatus};
pub use error::{PermissionDenied, RadioError, ScanError};
pub use infrastructure::bluetooth::{
    DiscoveryEventSource, RadioEvent, ReplayRadio, ScanSessionController, ScanStart,
};
pub use infrastructure::permissions::{
    AuthorizationOutcome, PermissionGate, PermissionPolicy, PlatformAuthorizer, StaticAuthorizer,
};
