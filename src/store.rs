//! ==============================================================================
//! store.rs - latest-value telemetry store
//! ==============================================================================
//!
//! purpose:
//!     holds the three independent facets (message, coordinates, bin fill)
//!     that sensor nodes push and the mobile app polls.
//!
//! concurrency:
//!     each facet sits behind its own parking_lot RwLock, so a write to the
//!     coordinates never waits on a write to the bin levels. a replace swaps
//!     the whole value inside one critical section; readers see the old
//!     value or the new one, never a mix.
//!
//!     every facet also carries a revision counter bumped under the same
//!     write lock. the highest revision is the write that survives.
//!
//! relationships:
//!     - used by: handlers.rs (ingestion writes, query reads)
//!     - created by: main.rs, one per process (tests build their own)
//!
//! ==============================================================================

use crate::domain::{BinFill, Coordinates, Snapshot};
use parking_lot::RwLock;

struct Facet<T> {
    value: T,
    revision: u64,
}

impl<T: Clone> Facet<T> {
    fn new(value: T) -> Self {
        Self { value, revision: 0 }
    }

    fn replace(&mut self, value: T) -> u64 {
        self.value = value;
        self.revision += 1;
        self.revision
    }
}

/// revision counters for each facet, 0 means never written
#[cfg(test)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Revisions {
    pub message: u64,
    pub coordinates: u64,
    pub bin_fill: u64,
}

pub struct TelemetryStore {
    message: RwLock<Facet<String>>,
    coordinates: RwLock<Facet<Coordinates>>,
    bin_fill: RwLock<Facet<BinFill>>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self {
            message: RwLock::new(Facet::new(String::new())),
            coordinates: RwLock::new(Facet::new(Coordinates::default())),
            bin_fill: RwLock::new(Facet::new(BinFill::default())),
        }
    }

    /// replace the classification message, returns its new revision
    pub fn set_message(&self, message: String) -> u64 {
        self.message.write().replace(message)
    }

    pub fn set_coordinates(&self, coordinates: Coordinates) -> u64 {
        self.coordinates.write().replace(coordinates)
    }

    pub fn set_bin_fill(&self, bin_fill: BinFill) -> u64 {
        self.bin_fill.write().replace(bin_fill)
    }

    /// copy of every facet as currently held
    ///
    /// facets are read one after another, so two facets may come from
    /// different moments; each one on its own is never torn.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            message: self.message.read().value.clone(),
            coordinates: self.coordinates.read().value.clone(),
            bin_fill: self.bin_fill.read().value.clone(),
        }
    }

    #[cfg(test)]
    pub fn revisions(&self) -> Revisions {
        Revisions {
            message: self.message.read().revision,
            coordinates: self.coordinates.read().revision,
            bin_fill: self.bin_fill.read().revision,
        }
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}
