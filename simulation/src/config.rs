//! TOML configuration of a simulation run.

use lungsim_core::{GridShape, MoleculeKind, Spacing, VoxelGrid};
use lungsim_system_molecules::diffusion_rates;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const STABILITY_LIMIT: f64 = 0.5;

/// Reasons a configuration is rejected before any tick runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid TOML, misses a parameter or names an unknown one.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A parameter lies outside its permitted range.
    #[error("invalid parameter `{name}`: {reason}")]
    Invalid {
        /// Dotted path of the offending parameter.
        name: &'static str,
        /// Human readable constraint that was violated.
        reason: String,
    },
    /// Explicit diffusion of a species would oscillate or turn negative.
    #[error("diffusion of {species:?} is unstable: D*dt/dx^2 summed over axes is {sum}, limit is 0.5")]
    UnstableDiffusion {
        /// Species whose parameters are unstable.
        species: MoleculeKind,
        /// Sum of the per-axis rates.
        sum: f64,
    },
}

/// Complete, validated parameter set of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Clock and random source.
    pub simulation: SimulationSection,
    /// Grid extents and spacing.
    pub grid: GridSection,
    /// Molecule transport and degradation.
    pub molecules: MoleculesSection,
    /// Macrophage behaviour.
    pub macrophage: MacrophageSection,
    /// Fungal behaviour.
    pub fungus: FungusSection,
}

/// `[simulation]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSection {
    /// Seed of the shared random source.
    pub seed: u64,
    /// Simulated minutes per tick.
    pub time_step: f64,
}

/// `[grid]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridSection {
    /// Voxel count along x, y and z.
    pub shape: [u32; 3],
    /// Voxel edge length along x, y and z.
    pub spacing: [f64; 3],
}

/// `[molecules]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MoleculesSection {
    /// Binding time constant dividing every turnover rate.
    pub cyt_bind_t: f64,
    /// Macrophage chemokine parameters.
    pub macrophage_chemokine: SpeciesSection,
    /// Neutrophil chemokine parameters.
    pub neutrophil_chemokine: SpeciesSection,
    /// Iron parameters.
    pub iron: SpeciesSection,
    /// Hemolysin parameters.
    pub hemolysin: SpeciesSection,
    /// Hemoglobin parameters.
    pub hemoglobin: SpeciesSection,
}

impl MoleculesSection {
    /// Parameters of one species.
    #[must_use]
    pub const fn species(&self, kind: MoleculeKind) -> &SpeciesSection {
        match kind {
            MoleculeKind::MacrophageChemokine => &self.macrophage_chemokine,
            MoleculeKind::NeutrophilChemokine => &self.neutrophil_chemokine,
            MoleculeKind::Iron => &self.iron,
            MoleculeKind::Hemolysin => &self.hemolysin,
            MoleculeKind::Hemoglobin => &self.hemoglobin,
        }
    }
}

/// Per-species table under `[molecules]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeciesSection {
    /// Diffusion constant in squared world units per minute.
    pub diffusion_constant: f64,
    /// Turnover rate per binding time unit.
    pub turnover_rate: f64,
    /// Concentration buffered by the system and never degraded.
    pub system_concentration: f64,
    /// Concentration of every voxel at initialization.
    pub initial_concentration: f64,
}

/// `[macrophage]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MacrophageSection {
    /// Macrophages placed at initialization.
    pub init_count: usize,
    /// Slots of every phagosome.
    pub phagosome_capacity: usize,
    /// Engulfment ceiling; exceeding it turns a macrophage necrotic.
    pub max_conidia: usize,
    /// Recruitment attempts per tick.
    pub recruitment_rate: usize,
    /// Acceptance probability of one recruitment attempt.
    pub recruitment_probability: f64,
    /// Chemokine concentration that qualifies a blood voxel and attracts movement.
    pub recruitment_threshold: f64,
    /// Per-tick move probability when not active.
    pub move_rate_rest: f64,
    /// Per-tick move probability when active.
    pub move_rate_act: f64,
    /// Ticks from active to resting.
    pub iter_to_rest: u32,
    /// Ticks spent in the other timed states.
    pub iter_to_change_state: u32,
    /// Iron pool setpoint.
    pub internal_iron: f64,
    /// Half-saturation constant of the anergy response.
    pub kd_iron: f64,
    /// Macrophage volume.
    pub volume: f64,
    /// Per-tick death probability of an empty macrophage.
    pub half_life: f64,
    /// Population floor protecting macrophages from death.
    pub min_population: usize,
    /// Fraction of local chemokine absorbed per tick.
    pub chemokine_absorption: f64,
    /// Fraction of local iron taken up per tick.
    pub iron_uptake_rate: f64,
    /// Neutrophil chemokine produced per detected hyphae.
    pub chemokine_per_hyphae: f64,
    /// Edge of the hyphae detection cube in voxels.
    pub detection_range: u32,
    /// Per-fungus engulfment probability.
    pub phagocytosis_probability: f64,
    /// Minutes of containment that exhaust one unit of health.
    pub kill_rate: f64,
}

/// `[fungus]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FungusSection {
    /// Conidia placed at initialization.
    pub init_count: usize,
    /// Health of every new fungal cell.
    pub init_health: f64,
    /// Ticks before a free conidium swells.
    pub iter_to_swell: u32,
    /// Ticks before a free swelling cell germinates.
    pub iter_to_germinate: u32,
    /// Hemolysin secreted per hyphae and tick.
    pub hemolysin_per_hyphae: f64,
    /// Fraction of local hemoglobin each living hyphae absorbs per tick.
    pub hemoglobin_uptake_rate: f64,
}

impl SimulationConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the document is malformed, incomplete or
    /// violates a parameter constraint.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every parameter constraint.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("simulation.time_step", self.simulation.time_step)?;

        for (axis, extent) in self.grid.shape.iter().enumerate() {
            if *extent == 0 {
                return Err(invalid(
                    ["grid.shape[0]", "grid.shape[1]", "grid.shape[2]"][axis],
                    "extent must be at least one voxel",
                ));
            }
        }
        let [x, y, z] = self.grid.shape;
        if GridShape::new(x, y, z).voxel_count().is_none() {
            return Err(invalid(
                "grid.shape",
                "voxel count exceeds the addressable range",
            ));
        }
        for (axis, spacing) in self.grid.spacing.iter().enumerate() {
            positive(
                ["grid.spacing[0]", "grid.spacing[1]", "grid.spacing[2]"][axis],
                *spacing,
            )?;
        }

        positive("molecules.cyt_bind_t", self.molecules.cyt_bind_t)?;
        for kind in MoleculeKind::ALL {
            let species = self.molecules.species(kind);
            non_negative("molecules.*.diffusion_constant", species.diffusion_constant)?;
            non_negative("molecules.*.turnover_rate", species.turnover_rate)?;
            non_negative("molecules.*.system_concentration", species.system_concentration)?;
            non_negative("molecules.*.initial_concentration", species.initial_concentration)?;

            let sum: f64 = diffusion_rates(
                species.diffusion_constant,
                self.simulation.time_step,
                self.spacing(),
            )
            .iter()
            .sum();
            if sum > STABILITY_LIMIT {
                return Err(ConfigError::UnstableDiffusion { species: kind, sum });
            }
        }

        let macrophage = &self.macrophage;
        if macrophage.max_conidia > macrophage.phagosome_capacity {
            return Err(invalid(
                "macrophage.max_conidia",
                "must not exceed macrophage.phagosome_capacity",
            ));
        }
        probability("macrophage.recruitment_probability", macrophage.recruitment_probability)?;
        non_negative("macrophage.recruitment_threshold", macrophage.recruitment_threshold)?;
        probability("macrophage.move_rate_rest", macrophage.move_rate_rest)?;
        probability("macrophage.move_rate_act", macrophage.move_rate_act)?;
        non_negative("macrophage.internal_iron", macrophage.internal_iron)?;
        positive("macrophage.kd_iron", macrophage.kd_iron)?;
        positive("macrophage.volume", macrophage.volume)?;
        probability("macrophage.half_life", macrophage.half_life)?;
        probability("macrophage.chemokine_absorption", macrophage.chemokine_absorption)?;
        probability("macrophage.iron_uptake_rate", macrophage.iron_uptake_rate)?;
        non_negative("macrophage.chemokine_per_hyphae", macrophage.chemokine_per_hyphae)?;
        probability(
            "macrophage.phagocytosis_probability",
            macrophage.phagocytosis_probability,
        )?;
        positive("macrophage.kill_rate", macrophage.kill_rate)?;

        positive("fungus.init_health", self.fungus.init_health)?;
        non_negative("fungus.hemolysin_per_hyphae", self.fungus.hemolysin_per_hyphae)?;
        probability("fungus.hemoglobin_uptake_rate", self.fungus.hemoglobin_uptake_rate)?;

        Ok(())
    }

    /// Coordinate system described by `[grid]`.
    #[must_use]
    pub fn voxel_grid(&self) -> VoxelGrid {
        let [x, y, z] = self.grid.shape;
        VoxelGrid::new(GridShape::new(x, y, z), self.spacing())
    }

    /// Initial concentration of every species, indexed by [`MoleculeKind::index`].
    #[must_use]
    pub fn initial_concentrations(&self) -> [f64; MoleculeKind::COUNT] {
        MoleculeKind::ALL.map(|kind| self.molecules.species(kind).initial_concentration)
    }

    fn spacing(&self) -> Spacing {
        let [dx, dy, dz] = self.grid.spacing;
        Spacing::new(dx, dy, dz)
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_owned(),
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(name, &format!("{value} must be positive and finite")))
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(name, &format!("{value} must be non-negative and finite")))
    }
}

fn probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(name, &format!("{value} must lie in [0, 1]")))
    }
}
