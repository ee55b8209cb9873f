#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system describing how macrophages consume and produce molecules.

use lungsim_core::{
    Command, FungalStatus, FungusView, MacrophageView, MoleculeKind, MoleculeView, Voxel,
    VoxelGrid,
};

/// Configuration parameters required to construct the exchange system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    chemokine_absorption: f64,
    iron_uptake_rate: f64,
    chemokine_per_hyphae: f64,
    detection_radius: u32,
    hemoglobin_uptake_rate: f64,
}

impl Config {
    /// Creates a new configuration.
    ///
    /// `chemokine_absorption` is the fraction of local macrophage chemokine
    /// absorbed per tick, `iron_uptake_rate` the fraction of local iron taken
    /// up, and `chemokine_per_hyphae` the neutrophil chemokine produced for
    /// every hyphae within `detection_radius` voxels.
    #[must_use]
    pub const fn new(
        chemokine_absorption: f64,
        iron_uptake_rate: f64,
        chemokine_per_hyphae: f64,
        detection_radius: u32,
    ) -> Self {
        Self {
            chemokine_absorption,
            iron_uptake_rate,
            chemokine_per_hyphae,
            detection_radius,
            hemoglobin_uptake_rate: 0.0,
        }
    }

    /// Sets the fraction of local hemoglobin each living hyphae absorbs per
    /// tick. Zero, the default, disables uptake.
    #[must_use]
    pub const fn with_hemoglobin_uptake(self, hemoglobin_uptake_rate: f64) -> Self {
        Self {
            hemoglobin_uptake_rate,
            ..self
        }
    }
}

/// Exchange system emitting absorption, uptake and production commands.
#[derive(Debug)]
pub struct Exchange {
    config: Config,
}

impl Exchange {
    /// Creates a new exchange system using the supplied configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Emits molecule exchange commands for every living macrophage.
    ///
    /// `hyphae_in_voxel` reports the number of living hyphae inside a voxel.
    pub fn handle<F>(
        &mut self,
        macrophages: &MacrophageView,
        grid: &VoxelGrid,
        iron: MoleculeView<'_>,
        hyphae_in_voxel: F,
        out: &mut Vec<Command>,
    ) where
        F: Fn(Voxel) -> usize,
    {
        let config = self.config;
        for macrophage in macrophages.alive() {
            let voxel = macrophage.voxel;

            if config.chemokine_absorption > 0.0 {
                out.push(Command::ScaleMolecule {
                    molecule: MoleculeKind::MacrophageChemokine,
                    voxel,
                    factor: 1.0 - config.chemokine_absorption,
                });
            }

            let uptake = config.iron_uptake_rate * iron.concentration(voxel);
            if uptake > 0.0 {
                out.push(Command::TransferIron {
                    macrophage: macrophage.id,
                    amount: uptake,
                });
            }

            if config.chemokine_per_hyphae > 0.0 {
                let detected: usize = grid
                    .cube(voxel, config.detection_radius)
                    .map(&hyphae_in_voxel)
                    .sum();
                if detected > 0 {
                    out.push(Command::SecreteMolecule {
                        molecule: MoleculeKind::NeutrophilChemokine,
                        voxel,
                        amount: config.chemokine_per_hyphae * detected as f64,
                    });
                }
            }
        }
    }

    /// Emits hemoglobin uptake for every living hyphae, in insertion order.
    ///
    /// Each command takes its fraction of whatever the previous ones left.
    pub fn absorb_hemoglobin(&mut self, fungi: &FungusView, out: &mut Vec<Command>) {
        let rate = self.config.hemoglobin_uptake_rate;
        if !(rate > 0.0) {
            return;
        }
        out.extend(
            fungi
                .alive()
                .filter(|fungus| fungus.status == FungalStatus::Hyphae)
                .map(|fungus| Command::TransferHemoglobin {
                    fungus: fungus.id,
                    fraction: rate,
                }),
        );
    }
}
