#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the lung infection simulation.
//!
//! This crate defines the message surface that connects the orchestrator, the
//! authoritative world, and pure systems. Systems read immutable views of the
//! world, draw from a random source handed to them, and respond exclusively
//! with [`Command`] values. The world executes those commands via its `apply`
//! entry point and broadcasts [`Event`] values describing what changed.

mod grid;
mod kinetics;
mod tissue;

pub use grid::{Connectivity, GridShape, Point, Spacing, Voxel, VoxelGrid};
pub use kinetics::{activation_function, turnover_factor};
pub use tissue::{GeometryError, TissueGrid, TissueType};

use serde::{Deserialize, Serialize};

/// Stable identifier of a macrophage; the index of its record in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MacrophageId(usize);

impl MacrophageId {
    /// Creates an identifier from a store index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Store index wrapped by the identifier.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }
}

/// Stable identifier of a fungal cell; the index of its record in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FungusId(usize);

impl FungusId {
    /// Creates an identifier from a store index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Store index wrapped by the identifier.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }
}

/// Diffusible molecule species tracked on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MoleculeKind {
    /// Chemokine that recruits and attracts macrophages.
    MacrophageChemokine,
    /// Chemokine released by macrophages that sense hyphae.
    NeutrophilChemokine,
    /// Free iron available for uptake.
    Iron,
    /// Toxin secreted by hyphae.
    Hemolysin,
    /// Hemoglobin released by lysed erythrocytes; hyphae mine it for iron.
    Hemoglobin,
}

impl MoleculeKind {
    /// Number of tracked species.
    pub const COUNT: usize = 5;

    /// Every species, in storage order.
    pub const ALL: [MoleculeKind; Self::COUNT] = [
        MoleculeKind::MacrophageChemokine,
        MoleculeKind::NeutrophilChemokine,
        MoleculeKind::Iron,
        MoleculeKind::Hemolysin,
        MoleculeKind::Hemoglobin,
    ];

    /// Position of the species within [`MoleculeKind::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::MacrophageChemokine => 0,
            Self::NeutrophilChemokine => 1,
            Self::Iron => 2,
            Self::Hemolysin => 3,
            Self::Hemoglobin => 4,
        }
    }
}

/// Activation state of a phagocyte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhagocyteStatus {
    /// Quiescent; no timer runs.
    Resting,
    /// Transitioning toward [`PhagocyteStatus::Active`].
    Activating,
    /// Fully activated.
    Active,
    /// Transitioning toward [`PhagocyteStatus::Inactive`].
    Inactivating,
    /// Deactivated, recovering toward rest.
    Inactive,
    /// Unresponsive after iron overload, recovering toward rest.
    Anergic,
    /// Overloaded; releases its contents and never recovers.
    Necrotic,
    /// Programmed death; never recovers.
    Apoptotic,
    /// Dead and flagged as such in the store.
    Dead,
}

impl PhagocyteStatus {
    /// Reports whether the status can never be left again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Necrotic | Self::Apoptotic | Self::Dead)
    }

    /// Status entered when this status's iteration timer expires.
    ///
    /// Returns `None` for statuses without a timer.
    #[must_use]
    pub const fn next_in_cycle(self) -> Option<Self> {
        match self {
            Self::Activating => Some(Self::Active),
            Self::Active => Some(Self::Resting),
            Self::Inactivating => Some(Self::Inactive),
            Self::Inactive | Self::Anergic => Some(Self::Resting),
            Self::Resting | Self::Necrotic | Self::Apoptotic | Self::Dead => None,
        }
    }
}

/// Growth state of a fungal cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FungalStatus {
    /// Resting, ungerminated spore.
    Conidia,
    /// Swelling spore preparing to germinate.
    Swelling,
    /// Filamentous growth; secretes toxin and cannot be engulfed.
    Hyphae,
    /// Ejected from a dead phagocyte and re-entering the free population.
    Releasing,
    /// Killed; flagged as dead in the store.
    Dead,
}

impl FungalStatus {
    /// Reports whether a phagocyte may engulf a fungus in this state.
    #[must_use]
    pub const fn is_engulfable(self) -> bool {
        matches!(self, Self::Conidia | Self::Swelling)
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by one tick.
    Tick {
        /// Simulated minutes covered by the tick.
        dt: f64,
    },
    /// Appends a resting macrophage at the provided point.
    SpawnMacrophage {
        /// Position of the new macrophage.
        point: Point,
    },
    /// Appends a conidium at the provided point.
    SpawnFungus {
        /// Position of the new fungal cell.
        point: Point,
        /// Starting health of the cell.
        health: f64,
    },
    /// Adds a quantity of a molecule at a voxel.
    SecreteMolecule {
        /// Species being secreted.
        molecule: MoleculeKind,
        /// Voxel receiving the molecule.
        voxel: Voxel,
        /// Non-negative quantity added.
        amount: f64,
    },
    /// Multiplies the concentration at a voxel by a factor in `[0, 1]`.
    ScaleMolecule {
        /// Species being scaled.
        molecule: MoleculeKind,
        /// Voxel being scaled.
        voxel: Voxel,
        /// Factor applied to the concentration.
        factor: f64,
    },
    /// Applies binding-aware turnover to every cell of a field.
    TurnOverMolecule {
        /// Species being degraded.
        molecule: MoleculeKind,
        /// Exponent of the decay applied to concentration above the system level.
        decay_exponent: f64,
        /// Concentration the system buffers and never degrades below.
        system_concentration: f64,
    },
    /// Applies one explicit diffusion step to a field.
    DiffuseMolecule {
        /// Species being diffused.
        molecule: MoleculeKind,
        /// Dimensionless `D * dt / dx^2` for the x, y and z axes.
        rates: [f64; 3],
    },
    /// Moves iron from the field at a macrophage's voxel into its iron pool.
    TransferIron {
        /// Macrophage taking up iron.
        macrophage: MacrophageId,
        /// Quantity requested; capped by what the voxel holds.
        amount: f64,
    },
    /// Moves a fraction of the hemoglobin at a fungus' voxel into the fungus.
    ///
    /// Every unit of hemoglobin absorbed yields four units of iron.
    TransferHemoglobin {
        /// Fungus absorbing hemoglobin.
        fungus: FungusId,
        /// Fraction in `[0, 1]` of the voxel's current hemoglobin taken up.
        fraction: f64,
    },
    /// Relocates a macrophage together with everything it contains.
    MoveMacrophage {
        /// Macrophage being moved.
        macrophage: MacrophageId,
        /// Destination point.
        point: Point,
    },
    /// Places a fungus inside a macrophage's phagosome if it has room.
    Engulf {
        /// Containing macrophage.
        macrophage: MacrophageId,
        /// Fungus being engulfed.
        fungus: FungusId,
        /// Occupancy ceiling imposed by the caller in addition to capacity.
        ceiling: usize,
    },
    /// Reduces the health of a fungus.
    DamageFungus {
        /// Fungus being damaged.
        fungus: FungusId,
        /// Health removed.
        amount: f64,
    },
    /// Ejects a fungus from a phagosome in the releasing state.
    ReleaseFungus {
        /// Macrophage holding the fungus.
        macrophage: MacrophageId,
        /// Fungus being released.
        fungus: FungusId,
    },
    /// Marks a fungus dead and removes it from any phagosome.
    KillFungus {
        /// Fungus being killed.
        fungus: FungusId,
    },
    /// Overwrites the growth state of a fungus.
    SetFungalStatus {
        /// Fungus being updated.
        fungus: FungusId,
        /// New growth state.
        status: FungalStatus,
        /// New value of the state's iteration counter.
        status_iteration: u32,
    },
    /// Overwrites the activation state of a macrophage.
    SetPhagocyteStatus {
        /// Macrophage being updated.
        macrophage: MacrophageId,
        /// New activation state.
        status: PhagocyteStatus,
        /// New value of the state's iteration counter.
        status_iteration: u32,
    },
    /// Overwrites the ferroportin state of a macrophage.
    SetFerroportin {
        /// Macrophage being updated.
        macrophage: MacrophageId,
        /// Whether ferroportin is expressed.
        expressed: bool,
        /// Ticks spent recovering expression.
        iteration: u32,
    },
    /// Overwrites whether a macrophage secretes TNF-alpha.
    SetTnfa {
        /// Macrophage being updated.
        macrophage: MacrophageId,
        /// Whether TNF-alpha is secreted.
        secreting: bool,
    },
    /// Marks a macrophage dead.
    KillMacrophage {
        /// Macrophage being killed.
        macrophage: MacrophageId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Index of the tick that just started.
        tick: u64,
        /// Simulated minutes covered by the tick.
        dt: f64,
    },
    /// Confirms that a macrophage was appended.
    MacrophageSpawned {
        /// Identifier assigned to the macrophage.
        macrophage: MacrophageId,
        /// Voxel the macrophage occupies.
        voxel: Voxel,
    },
    /// Confirms that a fungal cell was appended.
    FungusSpawned {
        /// Identifier assigned to the fungus.
        fungus: FungusId,
        /// Voxel the fungus occupies.
        voxel: Voxel,
    },
    /// Confirms that a macrophage changed voxel.
    MacrophageMoved {
        /// Macrophage that moved.
        macrophage: MacrophageId,
        /// Voxel occupied before the move.
        from: Voxel,
        /// Voxel occupied after the move.
        to: Voxel,
    },
    /// Confirms that a fungus entered a phagosome.
    FungusEngulfed {
        /// Containing macrophage.
        macrophage: MacrophageId,
        /// Engulfed fungus.
        fungus: FungusId,
    },
    /// Confirms that a fungus left a phagosome in the releasing state.
    FungusReleased {
        /// Macrophage that held the fungus.
        macrophage: MacrophageId,
        /// Released fungus.
        fungus: FungusId,
    },
    /// Confirms that a fungus died.
    FungusKilled {
        /// Fungus that died.
        fungus: FungusId,
    },
    /// Reports a change of macrophage activation state.
    PhagocyteStatusChanged {
        /// Macrophage that changed state.
        macrophage: MacrophageId,
        /// Previous state.
        from: PhagocyteStatus,
        /// New state.
        to: PhagocyteStatus,
    },
    /// Reports a change of fungal growth state.
    FungalStatusChanged {
        /// Fungus that changed state.
        fungus: FungusId,
        /// Previous state.
        from: FungalStatus,
        /// New state.
        to: FungalStatus,
    },
    /// Confirms that a macrophage died.
    MacrophageDied {
        /// Macrophage that died.
        macrophage: MacrophageId,
    },
}

/// Read-only view of one molecule field.
#[derive(Clone, Copy, Debug)]
pub struct MoleculeView<'a> {
    shape: GridShape,
    values: &'a [f64],
}

impl<'a> MoleculeView<'a> {
    /// Captures a view over concentrations laid out x-fastest.
    #[must_use]
    pub const fn new(shape: GridShape, values: &'a [f64]) -> Self {
        Self { shape, values }
    }

    /// Concentration at the voxel; zero outside the grid.
    #[must_use]
    pub fn concentration(&self, voxel: Voxel) -> f64 {
        self.shape
            .index(voxel)
            .and_then(|index| self.values.get(index).copied())
            .unwrap_or(0.0)
    }

    /// Raw concentrations in storage order.
    #[must_use]
    pub const fn values(&self) -> &'a [f64] {
        self.values
    }

    /// Extents of the field.
    #[must_use]
    pub const fn shape(&self) -> GridShape {
        self.shape
    }

    /// Sum of every cell of the field.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Immutable representation of a single macrophage used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct MacrophageSnapshot {
    /// Identifier of the macrophage.
    pub id: MacrophageId,
    /// Current position.
    pub point: Point,
    /// Voxel containing `point`.
    pub voxel: Voxel,
    /// Whether the record is still alive.
    pub alive: bool,
    /// Activation state.
    pub status: PhagocyteStatus,
    /// Ticks spent in the current timed state.
    pub status_iteration: u32,
    /// Internal iron quantity.
    pub iron_pool: f64,
    /// Whether ferroportin is expressed.
    pub ferroportin: bool,
    /// Ticks spent recovering ferroportin expression.
    pub ferroportin_iteration: u32,
    /// Whether TNF-alpha is secreted.
    pub tnfa: bool,
    /// Contained fungi in engulfment order.
    pub phagosome: Vec<FungusId>,
}

/// Read-only snapshot describing every macrophage ever appended.
#[derive(Clone, Debug, Default)]
pub struct MacrophageView {
    snapshots: Vec<MacrophageSnapshot>,
}

impl MacrophageView {
    /// Creates a view from snapshots, ordering them by identifier.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<MacrophageSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over every snapshot in insertion order, dead ones included.
    pub fn iter(&self) -> impl Iterator<Item = &MacrophageSnapshot> {
        self.snapshots.iter()
    }

    /// Iterator over living macrophages in insertion order.
    pub fn alive(&self) -> impl Iterator<Item = &MacrophageSnapshot> {
        self.snapshots.iter().filter(|snapshot| snapshot.alive)
    }

    /// Snapshot of a specific macrophage.
    #[must_use]
    pub fn get(&self, id: MacrophageId) -> Option<&MacrophageSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Number of living macrophages.
    #[must_use]
    pub fn living_count(&self) -> usize {
        self.alive().count()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<MacrophageSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single fungal cell used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct FungusSnapshot {
    /// Identifier of the fungus.
    pub id: FungusId,
    /// Current position.
    pub point: Point,
    /// Voxel containing `point`.
    pub voxel: Voxel,
    /// Whether the record is still alive.
    pub alive: bool,
    /// Growth state.
    pub status: FungalStatus,
    /// Ticks spent in the current growth state.
    pub status_iteration: u32,
    /// Remaining health.
    pub health: f64,
    /// Iron acquired from hemoglobin.
    pub iron_pool: f64,
    /// Macrophage currently containing the fungus, if any.
    pub engulfed_by: Option<MacrophageId>,
}

/// Read-only snapshot describing every fungal cell ever appended.
#[derive(Clone, Debug, Default)]
pub struct FungusView {
    snapshots: Vec<FungusSnapshot>,
}

impl FungusView {
    /// Creates a view from snapshots, ordering them by identifier.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<FungusSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over every snapshot in insertion order, dead ones included.
    pub fn iter(&self) -> impl Iterator<Item = &FungusSnapshot> {
        self.snapshots.iter()
    }

    /// Iterator over living fungal cells in insertion order.
    pub fn alive(&self) -> impl Iterator<Item = &FungusSnapshot> {
        self.snapshots.iter().filter(|snapshot| snapshot.alive)
    }

    /// Snapshot of a specific fungus.
    #[must_use]
    pub fn get(&self, id: FungusId) -> Option<&FungusSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<FungusSnapshot> {
        self.snapshots
    }
}
