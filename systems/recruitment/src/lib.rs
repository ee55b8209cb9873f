#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that recruits macrophages from the blood supply.

use lungsim_core::{Command, MoleculeView, TissueGrid, TissueType, Voxel, VoxelGrid};
use rand::Rng;

/// Configuration parameters required to construct the recruitment system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    rate: usize,
    probability: f64,
    threshold: f64,
}

impl Config {
    /// Creates a new configuration.
    ///
    /// `rate` bounds the recruitment attempts per tick, `probability` is the
    /// chance an attempt succeeds and `threshold` the chemokine concentration a
    /// blood voxel needs to qualify.
    #[must_use]
    pub const fn new(rate: usize, probability: f64, threshold: f64) -> Self {
        Self {
            rate,
            probability,
            threshold,
        }
    }
}

/// Recruitment system that spawns macrophages at chemokine-rich blood voxels.
#[derive(Debug)]
pub struct Recruitment {
    config: Config,
    candidates: Vec<Voxel>,
}

impl Recruitment {
    /// Creates a new recruitment system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            candidates: Vec::new(),
        }
    }

    /// Emits at most `rate` spawn commands at qualifying voxels.
    ///
    /// Each attempt draws a candidate voxel uniformly and then accepts it with
    /// the configured probability. No random values are drawn when no voxel
    /// qualifies.
    pub fn handle<R>(
        &mut self,
        tissue: &TissueGrid,
        grid: &VoxelGrid,
        chemokine: MoleculeView<'_>,
        rng: &mut R,
        out: &mut Vec<Command>,
    ) where
        R: Rng + ?Sized,
    {
        if self.config.rate == 0 {
            return;
        }

        self.candidates.clear();
        let threshold = self.config.threshold;
        self.candidates.extend(
            tissue
                .voxels_of(TissueType::Blood)
                .filter(|voxel| chemokine.concentration(*voxel) >= threshold),
        );
        if self.candidates.is_empty() {
            return;
        }

        for _ in 0..self.config.rate {
            let voxel = self.candidates[rng.gen_range(0..self.candidates.len())];
            if self.config.probability > rng.gen::<f64>() {
                out.push(Command::SpawnMacrophage {
                    point: grid.voxel_to_point(voxel),
                });
            }
        }
    }
}
