#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the lung infection simulation.
//!
//! The world owns the molecule fields and both agent stores. It is mutated
//! exclusively through [`apply`]; everything else reads it through [`query`].

mod agents;
mod cells;
mod molecules;
mod phagosome;

pub use cells::{CellEntry, SpatialCellList};
pub use molecules::MoleculeFields;
pub use phagosome::Phagosome;

use agents::{Fungus, Macrophage};
use lungsim_core::{
    Command, Event, FungalStatus, FungusId, GeometryError, GridShape, MacrophageId, MoleculeKind,
    PhagocyteStatus, Point, TissueGrid, VoxelGrid,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a world cannot be assembled.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WorldError {
    /// The tissue grid does not cover the simulation grid exactly.
    #[error("tissue grid shape {tissue:?} does not match simulation grid shape {grid:?}")]
    ShapeMismatch {
        /// Shape of the simulation grid.
        grid: GridShape,
        /// Shape of the supplied tissue grid.
        tissue: GridShape,
    },
    /// The molecule fields were laid out for a different grid.
    #[error("molecule field shape {molecules:?} does not match simulation grid shape {grid:?}")]
    FieldShapeMismatch {
        /// Shape of the simulation grid.
        grid: GridShape,
        /// Shape recorded by the molecule fields.
        molecules: GridShape,
    },
    /// A molecule field does not hold one value per voxel.
    #[error("{molecule:?} field holds {actual} values but the grid has {expected} voxels")]
    FieldLength {
        /// Species of the offending field.
        molecule: MoleculeKind,
        /// Voxel count of the grid.
        expected: usize,
        /// Values stored in the field.
        actual: usize,
    },
    /// The grid holds more voxels than can be addressed.
    #[error("grid shape {shape:?} holds more voxels than can be addressed")]
    GridTooLarge {
        /// Offending extents.
        shape: GridShape,
    },
    /// The tissue grid is internally inconsistent.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Iron released by each unit of hemoglobin a fungus absorbs.
const IRON_PER_HEMOGLOBIN: f64 = 4.0;

/// Represents the authoritative simulation state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct World {
    grid: VoxelGrid,
    tissue: TissueGrid,
    molecules: MoleculeFields,
    macrophages: SpatialCellList<Macrophage>,
    fungi: SpatialCellList<Fungus>,
    phagosome_capacity: usize,
    tick_index: u64,
    time: f64,
}

impl World {
    /// Creates an empty world over the provided grid and tissue.
    ///
    /// `initial_concentrations` is indexed by [`MoleculeKind::index`].
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ShapeMismatch`] when the tissue grid and the
    /// simulation grid disagree on their extents, and
    /// [`WorldError::GridTooLarge`] when the grid cannot be allocated.
    pub fn new(
        grid: VoxelGrid,
        tissue: TissueGrid,
        initial_concentrations: [f64; MoleculeKind::COUNT],
        phagosome_capacity: usize,
    ) -> Result<Self, WorldError> {
        if grid.shape() != tissue.shape() {
            return Err(WorldError::ShapeMismatch {
                grid: grid.shape(),
                tissue: tissue.shape(),
            });
        }

        Ok(Self {
            molecules: MoleculeFields::new(grid.shape(), initial_concentrations)?,
            grid,
            tissue,
            macrophages: SpatialCellList::new(),
            fungi: SpatialCellList::new(),
            phagosome_capacity,
            tick_index: 0,
            time: 0.0,
        })
    }

    /// Checks that the tissue grid and every molecule field cover the grid.
    ///
    /// Worlds built with [`World::new`] always pass; decoded worlds may not.
    ///
    /// # Errors
    ///
    /// Returns the first [`WorldError`] describing a disagreement.
    pub fn validate(&self) -> Result<(), WorldError> {
        let shape = self.grid.shape();
        if self.tissue.shape() != shape {
            return Err(WorldError::ShapeMismatch {
                grid: shape,
                tissue: self.tissue.shape(),
            });
        }
        self.tissue.validate()?;
        if self.molecules.shape() != shape {
            return Err(WorldError::FieldShapeMismatch {
                grid: shape,
                molecules: self.molecules.shape(),
            });
        }
        self.molecules.validate()
    }

    fn transfer_iron(&mut self, macrophage: MacrophageId, amount: f64) {
        let index = macrophage.get();
        let Some(entry) = self.macrophages.entry(index) else {
            return;
        };
        if !entry.is_alive() {
            return;
        }
        let taken = self.molecules.take(MoleculeKind::Iron, entry.voxel(), amount);
        if let Some(record) = self.macrophages.get_mut(index) {
            record.iron_pool += taken;
        }
    }

    fn transfer_hemoglobin(&mut self, fungus: FungusId, fraction: f64) {
        if !(fraction > 0.0) {
            return;
        }
        let index = fungus.get();
        let Some(entry) = self.fungi.entry(index) else {
            return;
        };
        if !entry.is_alive() {
            return;
        }
        let voxel = entry.voxel();
        let available = self
            .molecules
            .view(MoleculeKind::Hemoglobin)
            .concentration(voxel);
        let taken = self.molecules.take(
            MoleculeKind::Hemoglobin,
            voxel,
            fraction.min(1.0) * available,
        );
        if let Some(record) = self.fungi.get_mut(index) {
            record.iron_pool += IRON_PER_HEMOGLOBIN * taken;
        }
    }

    fn set_ferroportin(&mut self, macrophage: MacrophageId, expressed: bool, iteration: u32) {
        if !self.macrophages.is_alive(macrophage.get()) {
            return;
        }
        if let Some(record) = self.macrophages.get_mut(macrophage.get()) {
            record.ferroportin = expressed;
            record.ferroportin_iteration = iteration;
        }
    }

    fn set_tnfa(&mut self, macrophage: MacrophageId, secreting: bool) {
        if !self.macrophages.is_alive(macrophage.get()) {
            return;
        }
        if let Some(record) = self.macrophages.get_mut(macrophage.get()) {
            record.tnfa = secreting;
        }
    }

    fn move_macrophage(&mut self, macrophage: MacrophageId, point: Point, out: &mut Vec<Event>) {
        let index = macrophage.get();
        if !self.macrophages.is_alive(index) {
            return;
        }

        let voxel = self.grid.point_to_voxel(point);
        let Some(from) = self.macrophages.relocate(index, point, voxel) else {
            return;
        };

        let contained: Vec<FungusId> = self
            .macrophages
            .get(index)
            .map(|record| record.phagosome.iter().collect())
            .unwrap_or_default();
        for fungus in contained {
            let _ = self.fungi.relocate(fungus.get(), point, voxel);
        }

        if from != voxel {
            out.push(Event::MacrophageMoved {
                macrophage,
                from,
                to: voxel,
            });
        }
    }

    fn engulf(
        &mut self,
        macrophage: MacrophageId,
        fungus: FungusId,
        ceiling: usize,
        out: &mut Vec<Event>,
    ) {
        if !self.fungi.is_alive(fungus.get()) {
            return;
        }
        let Some(entry) = self.macrophages.entry(macrophage.get()) else {
            return;
        };
        if !entry.is_alive() {
            return;
        }
        let (point, voxel) = (entry.point(), entry.voxel());

        let Some(record) = self.fungi.get_mut(fungus.get()) else {
            return;
        };
        if record.engulfed_by.is_some() {
            return;
        }
        let Some(container) = self.macrophages.get_mut(macrophage.get()) else {
            return;
        };
        if !container.phagosome.add(fungus, ceiling) {
            return;
        }

        record.engulfed_by = Some(macrophage);
        let _ = self.fungi.relocate(fungus.get(), point, voxel);
        out.push(Event::FungusEngulfed { macrophage, fungus });
    }

    fn damage_fungus(&mut self, fungus: FungusId, amount: f64) {
        if !(amount > 0.0) || !self.fungi.is_alive(fungus.get()) {
            return;
        }
        if let Some(record) = self.fungi.get_mut(fungus.get()) {
            record.health -= amount;
        }
    }

    fn release_fungus(&mut self, macrophage: MacrophageId, fungus: FungusId, out: &mut Vec<Event>) {
        let Some(container) = self.macrophages.get_mut(macrophage.get()) else {
            return;
        };
        if !container.phagosome.remove(fungus) {
            return;
        }

        let alive = self.fungi.is_alive(fungus.get());
        let Some(record) = self.fungi.get_mut(fungus.get()) else {
            return;
        };
        record.engulfed_by = None;
        out.push(Event::FungusReleased { macrophage, fungus });

        if alive && record.status != FungalStatus::Releasing {
            let from = record.status;
            record.status = FungalStatus::Releasing;
            record.status_iteration = 0;
            out.push(Event::FungalStatusChanged {
                fungus,
                from,
                to: FungalStatus::Releasing,
            });
        }
    }

    fn kill_fungus(&mut self, fungus: FungusId, out: &mut Vec<Event>) {
        if !self.fungi.mark_dead(fungus.get()) {
            return;
        }
        let Some(record) = self.fungi.get_mut(fungus.get()) else {
            return;
        };
        let from = record.status;
        record.status = FungalStatus::Dead;
        record.status_iteration = 0;
        if let Some(owner) = record.engulfed_by.take() {
            if let Some(container) = self.macrophages.get_mut(owner.get()) {
                let _ = container.phagosome.remove(fungus);
            }
        }

        if from != FungalStatus::Dead {
            out.push(Event::FungalStatusChanged {
                fungus,
                from,
                to: FungalStatus::Dead,
            });
        }
        out.push(Event::FungusKilled { fungus });
    }

    fn set_fungal_status(
        &mut self,
        fungus: FungusId,
        status: FungalStatus,
        status_iteration: u32,
        out: &mut Vec<Event>,
    ) {
        if status == FungalStatus::Dead {
            self.kill_fungus(fungus, out);
            return;
        }
        if !self.fungi.is_alive(fungus.get()) {
            return;
        }
        let Some(record) = self.fungi.get_mut(fungus.get()) else {
            return;
        };
        let from = record.status;
        record.status = status;
        record.status_iteration = status_iteration;
        if from != status {
            out.push(Event::FungalStatusChanged {
                fungus,
                from,
                to: status,
            });
        }
    }

    fn set_phagocyte_status(
        &mut self,
        macrophage: MacrophageId,
        status: PhagocyteStatus,
        status_iteration: u32,
        out: &mut Vec<Event>,
    ) {
        if status == PhagocyteStatus::Dead {
            self.kill_macrophage(macrophage, out);
            return;
        }
        if !self.macrophages.is_alive(macrophage.get()) {
            return;
        }
        let Some(record) = self.macrophages.get_mut(macrophage.get()) else {
            return;
        };
        let from = record.status;
        record.status = status;
        record.status_iteration = status_iteration;
        if from != status {
            out.push(Event::PhagocyteStatusChanged {
                macrophage,
                from,
                to: status,
            });
        }
    }

    fn kill_macrophage(&mut self, macrophage: MacrophageId, out: &mut Vec<Event>) {
        if !self.macrophages.mark_dead(macrophage.get()) {
            return;
        }
        let Some(record) = self.macrophages.get_mut(macrophage.get()) else {
            return;
        };
        let from = record.status;
        record.status = PhagocyteStatus::Dead;
        record.status_iteration = 0;
        let contained: Vec<FungusId> = record.phagosome.iter().collect();

        if from != PhagocyteStatus::Dead {
            out.push(Event::PhagocyteStatusChanged {
                macrophage,
                from,
                to: PhagocyteStatus::Dead,
            });
        }
        for fungus in contained {
            self.release_fungus(macrophage, fungus, out);
        }
        out.push(Event::MacrophageDied { macrophage });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Commands naming unknown or dead agents are ignored without emitting events.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            world.time += dt;
            out_events.push(Event::TimeAdvanced {
                tick: world.tick_index,
                dt,
            });
        }
        Command::SpawnMacrophage { point } => {
            let voxel = world.grid.point_to_voxel(point);
            let index = world.macrophages.append(
                point,
                voxel,
                Macrophage::resting(world.phagosome_capacity),
            );
            out_events.push(Event::MacrophageSpawned {
                macrophage: MacrophageId::new(index),
                voxel,
            });
        }
        Command::SpawnFungus { point, health } => {
            let voxel = world.grid.point_to_voxel(point);
            let index = world.fungi.append(point, voxel, Fungus::conidium(health));
            out_events.push(Event::FungusSpawned {
                fungus: FungusId::new(index),
                voxel,
            });
        }
        Command::SecreteMolecule {
            molecule,
            voxel,
            amount,
        } => world.molecules.secrete(molecule, voxel, amount),
        Command::ScaleMolecule {
            molecule,
            voxel,
            factor,
        } => world.molecules.scale(molecule, voxel, factor),
        Command::TurnOverMolecule {
            molecule,
            decay_exponent,
            system_concentration,
        } => world
            .molecules
            .turnover(molecule, decay_exponent, system_concentration),
        Command::DiffuseMolecule { molecule, rates } => world.molecules.diffuse(molecule, rates),
        Command::TransferIron { macrophage, amount } => world.transfer_iron(macrophage, amount),
        Command::TransferHemoglobin { fungus, fraction } => {
            world.transfer_hemoglobin(fungus, fraction);
        }
        Command::MoveMacrophage { macrophage, point } => {
            world.move_macrophage(macrophage, point, out_events);
        }
        Command::Engulf {
            macrophage,
            fungus,
            ceiling,
        } => world.engulf(macrophage, fungus, ceiling, out_events),
        Command::DamageFungus { fungus, amount } => world.damage_fungus(fungus, amount),
        Command::ReleaseFungus { macrophage, fungus } => {
            world.release_fungus(macrophage, fungus, out_events);
        }
        Command::KillFungus { fungus } => world.kill_fungus(fungus, out_events),
        Command::SetFungalStatus {
            fungus,
            status,
            status_iteration,
        } => world.set_fungal_status(fungus, status, status_iteration, out_events),
        Command::SetPhagocyteStatus {
            macrophage,
            status,
            status_iteration,
        } => world.set_phagocyte_status(macrophage, status, status_iteration, out_events),
        Command::SetFerroportin {
            macrophage,
            expressed,
            iteration,
        } => world.set_ferroportin(macrophage, expressed, iteration),
        Command::SetTnfa {
            macrophage,
            secreting,
        } => world.set_tnfa(macrophage, secreting),
        Command::KillMacrophage { macrophage } => world.kill_macrophage(macrophage, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use lungsim_core::{
        FungusId, FungusSnapshot, FungusView, MacrophageId, MacrophageSnapshot, MacrophageView,
        MoleculeKind, MoleculeView, TissueGrid, Voxel, VoxelGrid,
    };

    /// Coordinate system of the world.
    #[must_use]
    pub fn voxel_grid(world: &World) -> &VoxelGrid {
        &world.grid
    }

    /// Tissue classification of every voxel.
    #[must_use]
    pub fn tissue(world: &World) -> &TissueGrid {
        &world.tissue
    }

    /// Read-only view of one molecule field.
    #[must_use]
    pub fn molecule_view(world: &World, molecule: MoleculeKind) -> MoleculeView<'_> {
        world.molecules.view(molecule)
    }

    /// Captures every macrophage, dead ones included, ordered by id.
    #[must_use]
    pub fn macrophage_view(world: &World) -> MacrophageView {
        let snapshots = world
            .macrophages
            .iter()
            .map(|(index, entry)| {
                let record = entry.record();
                MacrophageSnapshot {
                    id: MacrophageId::new(index),
                    point: entry.point(),
                    voxel: entry.voxel(),
                    alive: entry.is_alive(),
                    status: record.status,
                    status_iteration: record.status_iteration,
                    iron_pool: record.iron_pool,
                    ferroportin: record.ferroportin,
                    ferroportin_iteration: record.ferroportin_iteration,
                    tnfa: record.tnfa,
                    phagosome: record.phagosome.iter().collect(),
                }
            })
            .collect();
        MacrophageView::from_snapshots(snapshots)
    }

    /// Captures every fungal cell, dead ones included, ordered by id.
    #[must_use]
    pub fn fungus_view(world: &World) -> FungusView {
        let snapshots = world
            .fungi
            .iter()
            .map(|(index, entry)| {
                let record = entry.record();
                FungusSnapshot {
                    id: FungusId::new(index),
                    point: entry.point(),
                    voxel: entry.voxel(),
                    alive: entry.is_alive(),
                    status: record.status,
                    status_iteration: record.status_iteration,
                    health: record.health,
                    iron_pool: record.iron_pool,
                    engulfed_by: record.engulfed_by,
                }
            })
            .collect();
        FungusView::from_snapshots(snapshots)
    }

    /// Living fungi inside the voxel, in insertion order.
    pub fn fungi_in_voxel(world: &World, voxel: Voxel) -> impl Iterator<Item = FungusId> + '_ {
        world.fungi.cells_in_voxel(voxel).map(FungusId::new)
    }

    /// Living macrophages inside the voxel, in insertion order.
    pub fn macrophages_in_voxel(
        world: &World,
        voxel: Voxel,
    ) -> impl Iterator<Item = MacrophageId> + '_ {
        world.macrophages.cells_in_voxel(voxel).map(MacrophageId::new)
    }

    /// Number of living macrophages.
    #[must_use]
    pub fn living_macrophages(world: &World) -> usize {
        world.macrophages.living_count()
    }

    /// Number of living fungal cells.
    #[must_use]
    pub fn living_fungi(world: &World) -> usize {
        world.fungi.living_count()
    }

    /// Capacity given to every newly spawned phagosome.
    #[must_use]
    pub fn phagosome_capacity(world: &World) -> usize {
        world.phagosome_capacity
    }

    /// Number of ticks applied so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Simulated minutes elapsed.
    #[must_use]
    pub fn time(world: &World) -> f64 {
        world.time
    }
}
