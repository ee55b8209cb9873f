#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that emits secretion, turnover and diffusion commands for the
//! molecule fields.

use lungsim_core::{Command, FungalStatus, FungusView, MoleculeKind, Spacing};

/// Transport and degradation parameters of one molecule species.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeciesParameters {
    diffusion_constant: f64,
    turnover_rate: f64,
    system_concentration: f64,
}

impl SpeciesParameters {
    /// Creates species parameters.
    #[must_use]
    pub const fn new(diffusion_constant: f64, turnover_rate: f64, system_concentration: f64) -> Self {
        Self {
            diffusion_constant,
            turnover_rate,
            system_concentration,
        }
    }

    /// Diffusion constant in squared world units per minute.
    #[must_use]
    pub const fn diffusion_constant(&self) -> f64 {
        self.diffusion_constant
    }
}

/// Configuration parameters required to construct the molecule system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    time_step: f64,
    spacing: Spacing,
    cyt_bind_t: f64,
    species: [SpeciesParameters; MoleculeKind::COUNT],
    hemolysin_per_hyphae: f64,
}

impl Config {
    /// Creates a configuration; `species` is indexed by [`MoleculeKind::index`].
    #[must_use]
    pub const fn new(
        time_step: f64,
        spacing: Spacing,
        cyt_bind_t: f64,
        species: [SpeciesParameters; MoleculeKind::COUNT],
        hemolysin_per_hyphae: f64,
    ) -> Self {
        Self {
            time_step,
            spacing,
            cyt_bind_t,
            species,
            hemolysin_per_hyphae,
        }
    }
}

/// Dimensionless explicit diffusion rates `D * dt / dx^2` for each axis.
#[must_use]
pub fn diffusion_rates(diffusion_constant: f64, time_step: f64, spacing: Spacing) -> [f64; 3] {
    spacing
        .as_array()
        .map(|length| diffusion_constant * time_step / (length * length))
}

/// Molecule system that feeds the field kernels owned by the world.
#[derive(Debug)]
pub struct Molecules {
    config: Config,
}

impl Molecules {
    /// Creates a new molecule system using the supplied configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Emits hemolysin secretion for every living fungus in the hyphae state.
    pub fn secrete(&mut self, fungi: &FungusView, out: &mut Vec<Command>) {
        if !(self.config.hemolysin_per_hyphae > 0.0) {
            return;
        }

        for fungus in fungi.alive() {
            if fungus.status == FungalStatus::Hyphae {
                out.push(Command::SecreteMolecule {
                    molecule: MoleculeKind::Hemolysin,
                    voxel: fungus.voxel,
                    amount: self.config.hemolysin_per_hyphae,
                });
            }
        }
    }

    /// Emits turnover followed by diffusion for every species, in species order.
    ///
    /// Steps that would leave a field unchanged are not emitted.
    pub fn degrade_and_diffuse(&mut self, out: &mut Vec<Command>) {
        let config = &self.config;
        for molecule in MoleculeKind::ALL {
            let species = config.species[molecule.index()];

            let decay_exponent = species.turnover_rate * config.time_step / config.cyt_bind_t;
            if decay_exponent > 0.0 {
                out.push(Command::TurnOverMolecule {
                    molecule,
                    decay_exponent,
                    system_concentration: species.system_concentration,
                });
            }

            let rates = diffusion_rates(species.diffusion_constant, config.time_step, config.spacing);
            if rates.iter().any(|rate| *rate > 0.0) {
                out.push(Command::DiffuseMolecule { molecule, rates });
            }
        }
    }
}
