//! Maintenance log.
//!
//! Every actuator fault flags the bin for maintenance.  The most recent 4
//! faults are kept in a ring buffer under the "maint" storage namespace,
//! postcard-encoded, together with a running fault counter that survives
//! restarts.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::ports::StoragePort;

const MAINT_RING_SLOTS: usize = 4;
const MAINT_NAMESPACE: &str = "maint";
const MAINT_INDEX_KEY: &str = "maint_idx";
const MAINT_COUNT_KEY: &str = "maint_count";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceEntry {
    /// Controller clock at the time of the fault.
    pub at_ms: u64,
    pub reason: heapless::String<64>,
    /// Sort cycles completed before the fault.
    pub cycle: u64,
}

impl MaintenanceEntry {
    pub fn new(at_ms: u64, reason: &str, cycle: u64) -> Self {
        let mut r = heapless::String::new();
        for ch in reason.chars() {
            if r.push(ch).is_err() {
                break;
            }
        }
        Self {
            at_ms,
            reason: r,
            cycle,
        }
    }
}

/// Storage-backed ring buffer of maintenance entries.
#[derive(Default)]
pub struct MaintenanceLog {
    write_index: usize,
    total: u32,
}

impl MaintenanceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the write index and counter from storage.
    pub fn init(&mut self, storage: &dyn StoragePort) {
        let mut buf = [0u8; 4];
        if let Ok(4) = storage.read(MAINT_NAMESPACE, MAINT_INDEX_KEY, &mut buf) {
            self.write_index = u32::from_le_bytes(buf) as usize % MAINT_RING_SLOTS;
        }
        if let Ok(4) = storage.read(MAINT_NAMESPACE, MAINT_COUNT_KEY, &mut buf) {
            self.total = u32::from_le_bytes(buf);
        }
    }

    /// Append `entry`, overwriting the oldest slot when full.
    ///
    /// Storage failures are logged; the in-memory counter still advances.
    pub fn record(&mut self, storage: &mut dyn StoragePort, entry: &MaintenanceEntry) {
        self.total = self.total.saturating_add(1);

        let slot_key = Self::slot_key(self.write_index);
        match postcard::to_allocvec(entry) {
            Ok(bytes) => {
                if let Err(e) = storage.write(MAINT_NAMESPACE, &slot_key, &bytes) {
                    warn!("Maintenance entry not persisted: {}", e);
                }
            }
            Err(e) => warn!("Maintenance entry not encoded: {}", e),
        }

        self.write_index = (self.write_index + 1) % MAINT_RING_SLOTS;
        let idx_bytes = (self.write_index as u32).to_le_bytes();
        if let Err(e) = storage.write(MAINT_NAMESPACE, MAINT_INDEX_KEY, &idx_bytes) {
            warn!("Maintenance index not persisted: {}", e);
        }
        if let Err(e) = storage.write(MAINT_NAMESPACE, MAINT_COUNT_KEY, &self.total.to_le_bytes()) {
            warn!("Maintenance counter not persisted: {}", e);
        }
    }

    /// Read all stored entries (up to 4), oldest slot first.
    pub fn read_all(&self, storage: &dyn StoragePort) -> heapless::Vec<MaintenanceEntry, 4> {
        let mut entries = heapless::Vec::new();
        for i in 0..MAINT_RING_SLOTS {
            let slot = (self.write_index + i) % MAINT_RING_SLOTS;
            let mut buf = [0u8; 128];
            if let Ok(len) = storage.read(MAINT_NAMESPACE, &Self::slot_key(slot), &mut buf) {
                if let Ok(entry) = postcard::from_bytes::<MaintenanceEntry>(&buf[..len]) {
                    let _ = entries.push(entry);
                }
            }
        }
        entries
    }

    /// Erase all entries and reset the counter (after a service visit).
    pub fn clear(&mut self, storage: &mut dyn StoragePort) {
        for i in 0..MAINT_RING_SLOTS {
            let _ = storage.delete(MAINT_NAMESPACE, &Self::slot_key(i));
        }
        let _ = storage.delete(MAINT_NAMESPACE, MAINT_INDEX_KEY);
        let _ = storage.delete(MAINT_NAMESPACE, MAINT_COUNT_KEY);
        self.write_index = 0;
        self.total = 0;
    }

    /// Faults recorded since the log was last cleared.
    pub fn count(&self) -> u32 {
        self.total
    }

    fn slot_key(index: usize) -> heapless::String<16> {
        let mut s = heapless::String::new();
        let _ = core::fmt::Write::write_fmt(&mut s, format_args!("m{}", index));
        s
    }
}
