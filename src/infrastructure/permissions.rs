//! Permission Gate
//!
//! Decides which platform authorizations a scan needs and requests them
//! before the radio may be opened.

use crate::domain::models::AuthorizationKind;
use crate::domain::settings::{PermissionSettings, Platform};
use crate::error::PermissionDenied;
use crate::infrastructure::bluetooth::protocol;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Granted,
    Denied,
    /// The platform has no such authorization; treated as granted.
    Unavailable,
}

/// The platform's authorization API.
#[async_trait]
pub trait PlatformAuthorizer: Send + Sync {
    /// May show platform UI and suspend until the user answers.
    async fn request_authorization(&self, kind: AuthorizationKind) -> AuthorizationOutcome;

    /// Surface an explanatory alert to the user.
    fn show_alert(&self, _title: &str, _message: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequirement {
    pub kind: AuthorizationKind,
    /// Only required at or above this platform version; `None` means every version.
    pub min_platform_version: Option<u32>,
    pub denial_reason: String,
}

impl PermissionRequirement {
    pub fn new(kind: AuthorizationKind, denial_reason: impl Into<String>) -> Self {
        Self {
            kind,
            min_platform_version: None,
            denial_reason: denial_reason.into(),
        }
    }

    pub fn since_version(mut self, version: u32) -> Self {
        self.min_platform_version = Some(version);
        self
    }

    fn applies_to(&self, platform_version: u32) -> bool {
        self.min_platform_version
            .map_or(true, |min| platform_version >= min)
    }
}

/// Requirement table for one target platform, evaluated in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionPolicy {
    platform_version: u32,
    requirements: Vec<PermissionRequirement>,
}

/// Android version that split Bluetooth access into scan and connect permissions.
const ANDROID_RUNTIME_BLUETOOTH_VERSION: u32 = 31;

impl PermissionPolicy {
    pub fn new(platform_version: u32, requirements: Vec<PermissionRequirement>) -> Self {
        Self {
            platform_version,
            requirements,
        }
    }

    /// Policy for platforms that impose no requirement.
    pub fn unrestricted() -> Self {
        Self::new(0, Vec::new())
    }

    pub fn for_platform(platform: Platform, platform_version: u32) -> Self {
        match platform {
            Platform::Android => Self::new(
                platform_version,
                vec![
                    PermissionRequirement::new(
                        AuthorizationKind::FineLocation,
                        "Location permission is required to scan for BLE devices.",
                    ),
                    PermissionRequirement::new(
                        AuthorizationKind::BluetoothScan,
                        "Bluetooth scan permission is required to scan for BLE devices.",
                    )
                    .since_version(ANDROID_RUNTIME_BLUETOOTH_VERSION),
                    PermissionRequirement::new(
                        AuthorizationKind::BluetoothConnect,
                        "Bluetooth connect permission is required to scan for BLE devices.",
                    )
                    .since_version(ANDROID_RUNTIME_BLUETOOTH_VERSION),
                ],
            ),
            Platform::Ios | Platform::Desktop => Self::unrestricted(),
        }
    }

    pub fn required(&self) -> impl Iterator<Item = &PermissionRequirement> {
        self.requirements
            .iter()
            .filter(move |r| r.applies_to(self.platform_version))
    }
}

pub struct PermissionGate {
    policy: PermissionPolicy,
    authorizer: Arc<dyn PlatformAuthorizer>,
}

impl PermissionGate {
    pub fn new(policy: PermissionPolicy, authorizer: Arc<dyn PlatformAuthorizer>) -> Self {
        Self { policy, authorizer }
    }

    /// Request every applicable authorization in table order.
    ///
    /// Stops at the first refusal; there is no retry; a later call asks again.
    pub async fn check_and_request(&self) -> Result<(), PermissionDenied> {
        for requirement in self.policy.required() {
            let outcome = self
                .authorizer
                .request_authorization(requirement.kind)
                .await;
            debug!("Authorization {} -> {:?}", requirement.kind, outcome);

            if outcome == AuthorizationOutcome::Denied {
                warn!("Authorization {} denied", requirement.kind);
                self.authorizer
                    .show_alert(protocol::PERMISSION_DENIED_TITLE, &requirement.denial_reason);
                return Err(PermissionDenied {
                    kind: requirement.kind,
                    reason: requirement.denial_reason.clone(),
                });
            }
        }
        info!("All required authorizations granted");
        Ok(())
    }
}

/// Answers from a fixed set of granted kinds. Used where no interactive
/// platform prompt exists.
pub struct StaticAuthorizer {
    granted: HashSet<AuthorizationKind>,
}

impl StaticAuthorizer {
    pub fn new(granted: impl IntoIterator<Item = AuthorizationKind>) -> Self {
        Self {
            granted: granted.into_iter().collect(),
        }
    }

    pub fn from_settings(settings: &PermissionSettings) -> Self {
        Self::new(settings.granted.iter().copied())
    }
}

#[async_trait]
impl PlatformAuthorizer for StaticAuthorizer {
    async fn request_authorization(&self, kind: AuthorizationKind) -> AuthorizationOutcome {
        if self.granted.contains(&kind) {
            AuthorizationOutcome::Granted
        } else {
            AuthorizationOutcome::Denied
        }
    }

    fn show_alert(&self, title: &str, message: &str) {
        warn!("{}: {}", title, message);
    }
}
