//! Bluetooth Module
//!
//! Runs bounded BLE discovery sessions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 ScanSessionController                    │
//! │   (session lifecycle - public API for observers)         │
//! └───────┬──────────────────┬──────────────────┬───────────┘
//!         │                  │                  │
//!         ▼                  ▼                  ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │PermissionGate│   │   Scanner    │   │DeviceRegistry│
//! │              │   │              │   │              │
//! │ - platform   │   │ - radio      │   │ - dedup by id│
//! │   table      │   │   handle     │   │ - first-seen │
//! │ - prompts    │   │ - event chan │   │   order      │
//! └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Timeouts, transfer-size default and status texts
//! - [`scanner`] - Radio event source seam and exclusive radio handle
//! - [`replay`] - Event source that plays back a recorded advertisement script
//! - [`service`] - Scan session controller

pub mod protocol;
pub mod replay;
pub mod scanner;
pub mod service;

pub use replay::ReplayRadio;
pub use scanner::{DiscoveryEventSource, RadioEvent};
pub use service::{ScanSessionController, ScanStart};
