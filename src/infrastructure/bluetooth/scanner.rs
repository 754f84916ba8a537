//! BLE Scanner Module
//!
//! The radio stack is an external collaborator: it is handed a channel on
//! `open` and pushes one [`RadioEvent`] per advertisement until `close`.
//! [`RadioHandle`] is the session's exclusive ownership of that radio.

use crate::domain::models::DeviceEvent;
use crate::error::RadioError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub type RadioEvent = Result<DeviceEvent, RadioError>;

/// Source of discovery events.
///
/// `close` must be safe to call repeatedly and when `open` never succeeded.
pub trait DiscoveryEventSource: Send + Sync {
    fn open(&self, events: mpsc::UnboundedSender<RadioEvent>) -> Result<(), RadioError>;

    fn close(&self);
}

/// Exclusive handle on the radio, owned by the scan session.
pub struct RadioHandle {
    source: Arc<dyn DiscoveryEventSource>,
    open: bool,
}

impl RadioHandle {
    pub fn new(source: Arc<dyn DiscoveryEventSource>) -> Self {
        Self {
            source,
            open: false,
        }
    }

    /// Start discovery and return the receiving end of the event channel.
    pub fn open(&mut self) -> Result<mpsc::UnboundedReceiver<RadioEvent>, RadioError> {
        if self.open {
            return Err(RadioError::AlreadyOpen);
        }
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.source.open(events_tx)?;
        self.open = true;
        info!("BLE discovery opened");
        Ok(events_rx)
    }

    /// Stop discovery. Always forwarded to the source.
    pub fn close(&mut self) {
        if self.open {
            info!("Stopping BLE scan...");
        } else {
            debug!("Closing idle radio");
        }
        self.source.close();
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}
