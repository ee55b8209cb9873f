//! Bounded containment list carried by every macrophage.

use lungsim_core::FungusId;
use serde::{Deserialize, Serialize};

/// Ordered, fixed-capacity collection of engulfed fungi.
///
/// Entries stay dense from the front: removal shifts the remainder down and
/// keeps its relative order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phagosome {
    capacity: usize,
    entries: Vec<FungusId>,
}

impl Phagosome {
    /// Creates an empty phagosome able to hold `capacity` fungi.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Maximum number of fungi the phagosome can hold.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no fungus is contained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reports whether the fungus is contained.
    #[must_use]
    pub fn contains(&self, fungus: FungusId) -> bool {
        self.entries.contains(&fungus)
    }

    /// Contained fungi in engulfment order.
    pub fn iter(&self) -> impl Iterator<Item = FungusId> + '_ {
        self.entries.iter().copied()
    }

    /// Adds a fungus behind the current entries.
    ///
    /// Fails when the phagosome is at capacity, when occupancy already reached
    /// `ceiling`, or when the fungus is already present.
    pub fn add(&mut self, fungus: FungusId, ceiling: usize) -> bool {
        let occupied = self.entries.len();
        if occupied >= self.capacity || occupied >= ceiling || self.contains(fungus) {
            return false;
        }
        self.entries.push(fungus);
        true
    }

    /// Removes a fungus, compacting the remaining entries.
    pub fn remove(&mut self, fungus: FungusId) -> bool {
        let Some(position) = self.entries.iter().position(|entry| *entry == fungus) else {
            return false;
        };
        let _ = self.entries.remove(position);
        true
    }
}
