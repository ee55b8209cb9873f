//! Append-only agent storage with a voxel index kept in step with positions.

use std::collections::{BTreeMap, BTreeSet};

use lungsim_core::{Point, Voxel};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stored agent record together with its placement and liveness.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellEntry<R> {
    point: Point,
    voxel: Voxel,
    alive: bool,
    record: R,
}

impl<R> CellEntry<R> {
    /// Position of the agent.
    #[must_use]
    pub const fn point(&self) -> Point {
        self.point
    }

    /// Voxel containing the agent.
    #[must_use]
    pub const fn voxel(&self) -> Voxel {
        self.voxel
    }

    /// Whether the agent is still alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Kind-specific attributes of the agent.
    #[must_use]
    pub const fn record(&self) -> &R {
        &self.record
    }
}

/// Growable store of agent records of a single kind.
///
/// Indices are stable for the lifetime of the store: dead agents stay in place
/// so that anything referring to them by index keeps resolving. The only way
/// to change an agent's placement is [`SpatialCellList::relocate`], which
/// re-indexes the agent as part of the same call. The voxel index holds living
/// agents only.
#[derive(Clone, Debug)]
pub struct SpatialCellList<R> {
    entries: Vec<CellEntry<R>>,
    voxel_index: BTreeMap<Voxel, BTreeSet<usize>>,
    indexed_at: Vec<Option<Voxel>>,
    living: usize,
}

impl<R> Default for SpatialCellList<R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            voxel_index: BTreeMap::new(),
            indexed_at: Vec::new(),
            living: 0,
        }
    }
}

impl<R> SpatialCellList<R> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a living agent and returns its stable index.
    pub fn append(&mut self, point: Point, voxel: Voxel, record: R) -> usize {
        let index = self.entries.len();
        self.entries.push(CellEntry {
            point,
            voxel,
            alive: true,
            record,
        });
        self.indexed_at.push(None);
        self.living += 1;
        self.update_voxel_index(&[index]);
        index
    }

    /// Number of agents ever appended.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether no agent was ever appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of agents currently alive.
    #[must_use]
    pub const fn living_count(&self) -> usize {
        self.living
    }

    /// Indices of living agents in insertion order.
    pub fn alive(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.alive)
            .map(|(index, _)| index)
    }

    /// Every stored entry in insertion order, dead ones included.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &CellEntry<R>)> {
        self.entries.iter().enumerate()
    }

    /// Entry stored at `index`.
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&CellEntry<R>> {
        self.entries.get(index)
    }

    /// Reports whether the agent at `index` exists and is alive.
    #[must_use]
    pub fn is_alive(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|entry| entry.alive)
    }

    /// Kind-specific attributes of the agent at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&R> {
        self.entries.get(index).map(|entry| &entry.record)
    }

    /// Mutable kind-specific attributes of the agent at `index`.
    ///
    /// Placement is not reachable through the returned reference.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut R> {
        self.entries.get_mut(index).map(|entry| &mut entry.record)
    }

    /// Moves the agent at `index` and refreshes its voxel index entry.
    ///
    /// Returns the voxel occupied before the move, or `None` for an unknown
    /// index.
    pub fn relocate(&mut self, index: usize, point: Point, voxel: Voxel) -> Option<Voxel> {
        let entry = self.entries.get_mut(index)?;
        let previous = entry.voxel;
        entry.point = point;
        entry.voxel = voxel;
        self.update_voxel_index(&[index]);
        Some(previous)
    }

    /// Recomputes the voxel index for exactly the provided indices.
    ///
    /// Unknown indices are skipped.
    pub fn update_voxel_index(&mut self, indices: &[usize]) {
        for &index in indices {
            let Some(entry) = self.entries.get(index) else {
                continue;
            };
            let target = entry.alive.then_some(entry.voxel);
            let Some(slot) = self.indexed_at.get_mut(index) else {
                continue;
            };
            if *slot == target {
                continue;
            }

            if let Some(previous) = slot.take() {
                if let Some(members) = self.voxel_index.get_mut(&previous) {
                    let _ = members.remove(&index);
                    if members.is_empty() {
                        let _ = self.voxel_index.remove(&previous);
                    }
                }
            }

            if let Some(voxel) = target {
                let _ = self.voxel_index.entry(voxel).or_default().insert(index);
                *slot = Some(voxel);
            }
        }
    }

    /// Flags the agent at `index` as dead, leaving its record intact.
    ///
    /// Returns `true` when the agent was alive before the call.
    pub fn mark_dead(&mut self, index: usize) -> bool {
        let Some(entry) = self.entries.get_mut(index) else {
            return false;
        };
        if !entry.alive {
            return false;
        }
        entry.alive = false;
        self.living = self.living.saturating_sub(1);
        self.update_voxel_index(&[index]);
        true
    }

    /// Indices of living agents inside `voxel`, ascending.
    pub fn cells_in_voxel(&self, voxel: Voxel) -> impl Iterator<Item = usize> + '_ {
        self.voxel_index
            .get(&voxel)
            .into_iter()
            .flat_map(|members| members.iter().copied())
    }

    fn from_entries(entries: Vec<CellEntry<R>>) -> Self {
        let living = entries.iter().filter(|entry| entry.alive).count();
        let mut list = Self {
            indexed_at: vec![None; entries.len()],
            entries,
            voxel_index: BTreeMap::new(),
            living,
        };
        let indices: Vec<usize> = (0..list.entries.len()).collect();
        list.update_voxel_index(&indices);
        list
    }
}

impl<R: Serialize> Serialize for SpatialCellList<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de, R: Deserialize<'de>> Deserialize<'de> for SpatialCellList<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<CellEntry<R>>::deserialize(deserializer)?;
        Ok(Self::from_entries(entries))
    }
}
