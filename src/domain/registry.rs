//! Deduplicating store of discovered peripherals.
//!
//! Entries are kept in first-seen order and keyed by device id. The registry
//! has a single writer (the session's event pump); readers only ever get
//! copies through [`DeviceRegistry::snapshot`].

use crate::domain::models::Peripheral;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Peripheral>,
    index: HashMap<String, usize>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the peripheral unless its id is already known. Returns true if inserted.
    pub fn insert_if_absent(&mut self, peripheral: Peripheral) -> bool {
        if self.index.contains_key(peripheral.id()) {
            return false;
        }
        self.index
            .insert(peripheral.id().to_string(), self.devices.len());
        self.devices.push(peripheral);
        true
    }

    /// Update signal strength and manufacturer data of a known device in place.
    /// Returns true if anything changed.
    pub fn refresh(&mut self, peripheral: &Peripheral) -> bool {
        let Some(&slot) = self.index.get(peripheral.id()) else {
            return false;
        };
        let existing = &mut self.devices[slot];
        let mut changed = false;
        if peripheral.signal_strength.is_some()
            && existing.signal_strength != peripheral.signal_strength
        {
            existing.signal_strength = peripheral.signal_strength;
            changed = true;
        }
        if peripheral.manufacturer_data.is_some()
            && existing.manufacturer_data != peripheral.manufacturer_data
        {
            existing.manufacturer_data = peripheral.manufacturer_data.clone();
            changed = true;
        }
        changed
    }

    pub fn clear(&mut self) {
        self.devices.clear();
        self.index.clear();
    }

    pub fn snapshot(&self) -> Vec<Peripheral> {
        self.devices.clone()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
