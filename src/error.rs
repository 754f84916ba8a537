use thiserror::Error;

use crate::domain::models::AuthorizationKind;

/// Failures reported by the radio stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RadioError {
    #[error("Bluetooth adapter unavailable")]
    AdapterUnavailable,
    #[error("Bluetooth radio is disabled")]
    RadioDisabled,
    #[error("Discovery is already open on this radio")]
    AlreadyOpen,
    #[error("Scan error: {0}")]
    Scan(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct PermissionDenied {
    pub kind: AuthorizationKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("Permission denied: {0}")]
    PermissionDenied(#[from] PermissionDenied),
    #[error(transparent)]
    Radio(#[from] RadioError),
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid advertisement script: {0}")]
    Parse(#[from] serde_json::Error),
}
