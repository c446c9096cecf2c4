//! Last known battery voltage
//!
//! A single-slot cell shared between the battery task (writer) and the count
//! task (reader). Values are replaced whole, so a reader sees either the old
//! sample or the new one.

use std::sync::{Arc, RwLock};

use crate::device::BatterySample;

/// Shared, synchronized slot for the most recent valid battery sample
#[derive(Debug, Clone, Default)]
pub struct BatteryCell {
    slot: Arc<RwLock<Option<BatterySample>>>,
}

impl BatteryCell {
    /// Create an empty cell ("unknown")
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored sample
    pub fn store(&self, sample: BatterySample) {
        let mut guard = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(sample);
    }

    /// Forget the stored sample
    pub fn clear(&self) {
        let mut guard = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    /// Current sample, if any
    pub fn load(&self) -> Option<BatterySample> {
        *self.slot.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Current voltage, if any
    pub fn voltage(&self) -> Option<f64> {
        self.load().map(|s| s.voltage)
    }
}
