use crate::infrastructure::bluetooth::protocol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A single advertisement as reported by the radio stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rssi: Option<i16>,
    #[serde(default)]
    pub service_uuids: Option<Vec<String>>,
    #[serde(default)]
    pub manufacturer_data: Option<String>,
    /// Transfer unit hint; absent until negotiated.
    #[serde(default)]
    pub mtu: Option<u16>,
    #[serde(default)]
    pub raw_scan_record: String,
}

impl DeviceEvent {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            rssi: None,
            service_uuids: None,
            manufacturer_data: None,
            mtu: None,
            raw_scan_record: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }
}

/// Discovered device snapshot. `id` never changes after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peripheral {
    id: String,
    pub name: Option<String>,
    pub signal_strength: Option<i16>,
    pub service_identifiers: Option<BTreeSet<String>>,
    pub manufacturer_data: Option<String>,
    pub negotiated_transfer_size: u16,
    pub raw_advertisement: String,
}

impl Peripheral {
    pub fn from_event(event: DeviceEvent, default_transfer_size: u16) -> Self {
        Self {
            id: event.id,
            name: event.name.filter(|n| !n.is_empty()),
            signal_strength: event.rssi,
            service_identifiers: event
                .service_uuids
                .map(|uuids| uuids.into_iter().collect()),
            manufacturer_data: event.manufacturer_data,
            negotiated_transfer_size: event.mtu.unwrap_or(default_transfer_size),
            raw_advertisement: event.raw_scan_record,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Label used by list renderers
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(protocol::UNNAMED_DEVICE_LABEL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationKind {
    BluetoothScan,
    BluetoothConnect,
    FineLocation,
}

impl fmt::Display for AuthorizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuthorizationKind::BluetoothScan => "bluetooth_scan",
            AuthorizationKind::BluetoothConnect => "bluetooth_connect",
            AuthorizationKind::FineLocation => "fine_location",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for AuthorizationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "bluetooth_scan" => Ok(AuthorizationKind::BluetoothScan),
            "bluetooth_connect" => Ok(AuthorizationKind::BluetoothConnect),
            "fine_location" | "location" => Ok(AuthorizationKind::FineLocation),
            other => Err(format!("unknown authorization kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ScanStatus {
    Idle,
    AwaitingPermission,
    Scanning,
    Stopped,
    Failed(String),
}

impl ScanStatus {
    /// States that own an in-flight side effect (a permission prompt or an open radio).
    pub fn is_active(&self) -> bool {
        matches!(self, ScanStatus::AwaitingPermission | ScanStatus::Scanning)
    }
}

/// Read-only view handed to observers. `version` increases with every publication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanSnapshot {
    pub version: u64,
    pub status: ScanStatus,
    pub status_message: Option<String>,
    pub peripherals: Vec<Peripheral>,
}

impl ScanSnapshot {
    pub fn is_scanning(&self) -> bool {
        self.status == ScanStatus::Scanning
    }
}

impl Default for ScanSnapshot {
    fn default() -> Self {
        Self {
            version: 0,
            status: ScanStatus::Idle,
            status_message: None,
            peripherals: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peripheral_from_event_defaults_transfer_size() {
        let event = DeviceEvent::new("AA:BB").with_rssi(-60);
        let p = Peripheral::from_event(event, protocol::DEFAULT_TRANSFER_SIZE);
        assert_eq!(p.id(), "AA:BB");
        assert_eq!(p.signal_strength, Some(-60));
        assert_eq!(p.negotiated_transfer_size, 23);
        assert_eq!(p.display_name(), "Unnamed Device");
    }

    #[test]
    fn test_peripheral_keeps_hint_and_services() {
        let mut event = DeviceEvent::new("id-1").with_name("Sensor");
        event.mtu = Some(185);
        event.service_uuids = Some(vec!["180d".into(), "180f".into(), "180d".into()]);
        let p = Peripheral::from_event(event, 23);
        assert_eq!(p.negotiated_transfer_size, 185);
        assert_eq!(p.display_name(), "Sensor");
        assert_eq!(p.service_identifiers.map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_empty_name_is_absent() {
        let p = Peripheral::from_event(DeviceEvent::new("x").with_name(""), 23);
        assert_eq!(p.name, None);
    }

    #[test]
    fn test_device_event_parses_sparse_json() {
        let event: DeviceEvent = serde_json::from_str(r#"{"id":"A","rssi":-40}"#).unwrap();
        assert_eq!(event, DeviceEvent::new("A").with_rssi(-40));
    }

    #[test]
    fn test_authorization_kind_round_trips_display() {
        for kind in [
            AuthorizationKind::BluetoothScan,
            AuthorizationKind::BluetoothConnect,
            AuthorizationKind::FineLocation,
        ] {
            assert_eq!(kind.to_string().parse::<AuthorizationKind>(), Ok(kind));
        }
        assert_eq!(
            "location".parse::<AuthorizationKind>(),
            Ok(AuthorizationKind::FineLocation)
        );
    }

    #[test]
    fn test_active_states() {
        assert!(ScanStatus::Scanning.is_active());
        assert!(ScanStatus::AwaitingPermission.is_active());
        assert!(!ScanStatus::Failed("x".into()).is_active());
        assert!(!ScanStatus::Stopped.is_active());
    }
}
