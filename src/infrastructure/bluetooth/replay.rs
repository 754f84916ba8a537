//! Replay Radio
//!
//! A [`DiscoveryEventSource`] that plays back a recorded advertisement script.
//! Each step waits `delay_ms` after the previous one, then emits either a
//! device or a radio error:
//!
//! ```json
//! [
//!   { "delay_ms": 200, "device": { "id": "C4:7C:8D:6A:11:02", "name": "Flower care", "rssi": -61 } },
//!   { "delay_ms": 50, "error": "adapter reset" }
//! ]
//! ```

use crate::domain::models::DeviceEvent;
use crate::error::{RadioError, ReplayError};
use crate::infrastructure::bluetooth::scanner::{DiscoveryEventSource, RadioEvent};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayStep {
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(flatten)]
    pub action: ReplayAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayAction {
    Device(DeviceEvent),
    Error(String),
}

impl ReplayAction {
    fn to_event(&self) -> RadioEvent {
        match self {
            ReplayAction::Device(device) => Ok(device.clone()),
            ReplayAction::Error(message) => Err(RadioError::Scan(message.clone())),
        }
    }
}

pub struct ReplayRadio {
    steps: Arc<Vec<ReplayStep>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReplayRadio {
    pub fn new(steps: Vec<ReplayStep>) -> Self {
        Self {
            steps: Arc::new(steps),
            task: Mutex::new(None),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        let steps: Vec<ReplayStep> = serde_json::from_str(json)?;
        Ok(Self::new(steps))
    }

    pub fn from_file(path: &Path) -> Result<Self, ReplayError> {
        let contents = fs::read_to_string(path)?;
        let radio = Self::from_json(&contents)?;
        info!(
            "Loaded {} advertisement steps from {}",
            radio.steps.len(),
            path.display()
        );
        Ok(radio)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl DiscoveryEventSource for ReplayRadio {
    fn open(&self, events: mpsc::UnboundedSender<RadioEvent>) -> Result<(), RadioError> {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Err(RadioError::AlreadyOpen);
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| RadioError::AdapterUnavailable)?;

        let steps = self.steps.clone();
        *task = Some(runtime.spawn(async move {
            for step in steps.iter() {
                tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
                if events.send(step.action.to_event()).is_err() {
                    break;
                }
            }
            debug!("Advertisement script exhausted");
        }));
        Ok(())
    }

    fn close(&self) {
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}
