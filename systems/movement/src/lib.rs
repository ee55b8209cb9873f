#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Stochastic movement system that steers macrophages up the chemokine field.

use lungsim_core::{
    Command, Connectivity, MacrophageSnapshot, MacrophageView, MoleculeView, PhagocyteStatus,
    Voxel, VoxelGrid,
};
use rand::{seq::SliceRandom, Rng};

/// Configuration parameters required to construct the movement system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    move_rate_rest: f64,
    move_rate_act: f64,
    attraction_threshold: f64,
}

impl Config {
    /// Creates a new configuration.
    ///
    /// The rates are per-tick move probabilities for non-active and active
    /// macrophages; voxels whose chemokine concentration exceeds
    /// `attraction_threshold` attract movement.
    #[must_use]
    pub const fn new(move_rate_rest: f64, move_rate_act: f64, attraction_threshold: f64) -> Self {
        Self {
            move_rate_rest,
            move_rate_act,
            attraction_threshold,
        }
    }
}

/// Pure system that proposes one-voxel moves for living macrophages.
#[derive(Debug)]
pub struct Movement {
    config: Config,
    candidates: Vec<Voxel>,
    attractive: Vec<Voxel>,
}

impl Movement {
    /// Creates a new movement system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            candidates: Vec::with_capacity(27),
            attractive: Vec::with_capacity(27),
        }
    }

    /// Emits `Command::MoveMacrophage` for macrophages that change voxel.
    ///
    /// Every living, non-terminal macrophage draws once to decide whether it
    /// moves. A mover considers its own voxel and its 26 neighbours: the most
    /// attractive voxel wins with ties broken by a shuffle, and without any
    /// attractive voxel a candidate is picked uniformly.
    pub fn handle<R>(
        &mut self,
        macrophages: &MacrophageView,
        grid: &VoxelGrid,
        chemokine: MoleculeView<'_>,
        rng: &mut R,
        out: &mut Vec<Command>,
    ) where
        R: Rng + ?Sized,
    {
        for macrophage in macrophages.alive() {
            if macrophage.status.is_terminal() {
                continue;
            }
            if !(self.move_rate(macrophage) > rng.gen::<f64>()) {
                continue;
            }

            let destination = self.select_destination(macrophage.voxel, grid, chemokine, rng);
            if destination != macrophage.voxel {
                out.push(Command::MoveMacrophage {
                    macrophage: macrophage.id,
                    point: grid.voxel_to_point(destination),
                });
            }
        }
    }

    fn move_rate(&self, macrophage: &MacrophageSnapshot) -> f64 {
        if macrophage.status == PhagocyteStatus::Active {
            self.config.move_rate_act
        } else {
            self.config.move_rate_rest
        }
    }

    fn select_destination<R>(
        &mut self,
        origin: Voxel,
        grid: &VoxelGrid,
        chemokine: MoleculeView<'_>,
        rng: &mut R,
    ) -> Voxel
    where
        R: Rng + ?Sized,
    {
        self.candidates.clear();
        self.candidates.push(origin);
        self.candidates.extend(grid.neighbors(origin, Connectivity::Vertex));

        let threshold = self.config.attraction_threshold;
        self.attractive.clear();
        self.attractive.extend(
            self.candidates
                .iter()
                .copied()
                .filter(|voxel| chemokine.concentration(*voxel) > threshold),
        );

        if self.attractive.is_empty() {
            return self.candidates[rng.gen_range(0..self.candidates.len())];
        }

        self.attractive.shuffle(rng);
        let mut best = self.attractive[0];
        let mut best_concentration = chemokine.concentration(best);
        for voxel in self.attractive.iter().copied().skip(1) {
            let concentration = chemokine.concentration(voxel);
            if concentration > best_concentration {
                best = voxel;
                best_concentration = concentration;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lungsim_core::{GridShape, MacrophageId, Point, Spacing};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn macrophage(voxel: Voxel, status: PhagocyteStatus) -> MacrophageSnapshot {
        MacrophageSnapshot {
            id: MacrophageId::new(0),
            point: Point::new(0.0, 0.0, 0.0),
            voxel,
            alive: true,
            status,
            status_iteration: 0,
            iron_pool: 0.0,
            ferroportin: true,
            ferroportin_iteration: 0,
            tnfa: false,
            phagosome: Vec::new(),
        }
    }

    fn grid() -> VoxelGrid {
        VoxelGrid::new(GridShape::new(3, 3, 3), Spacing::uniform(1.0))
    }

    #[test]
    fn climbs_to_strongest_neighbour() {
        let grid = grid();
        let shape = grid.shape();
        let mut values = vec![2.0; shape.voxel_count().expect("small grid")];
        let peak = Voxel::new(2, 0, 1);
        values[shape.index(peak).expect("peak inside grid")] = 9.0;
        let view = MacrophageView::from_snapshots(vec![macrophage(
            Voxel::new(1, 1, 1),
            PhagocyteStatus::Resting,
        )]);
        let mut system = Movement::new(Config::new(1.0, 1.0, 1.0));
        let mut out = Vec::new();

        for seed in 0..8 {
            out.clear();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            system.handle(&view, &grid, MoleculeView::new(shape, &values), &mut rng, &mut out);
            assert_eq!(
                out,
                vec![Command::MoveMacrophage {
                    macrophage: MacrophageId::new(0),
                    point: grid.voxel_to_point(peak),
                }]
            );
        }
    }

    #[test]
    fn staying_put_emits_nothing() {
        let grid = grid();
        let shape = grid.shape();
        let mut values = vec![0.0; shape.voxel_count().expect("small grid")];
        let home = Voxel::new(1, 1, 1);
        values[shape.index(home).expect("home inside grid")] = 5.0;
        let view = MacrophageView::from_snapshots(vec![macrophage(home, PhagocyteStatus::Active)]);
        let mut system = Movement::new(Config::new(0.0, 1.0, 1.0));
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut out = Vec::new();

        system.handle(&view, &grid, MoleculeView::new(shape, &values), &mut rng, &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn terminal_and_idle_macrophages_do_not_move() {
        let grid = grid();
        let shape = grid.shape();
        let values = vec![0.0; shape.voxel_count().expect("small grid")];
        let mut necrotic = macrophage(Voxel::new(0, 0, 0), PhagocyteStatus::Necrotic);
        necrotic.id = MacrophageId::new(1);
        let view = MacrophageView::from_snapshots(vec![
            macrophage(Voxel::new(1, 1, 1), PhagocyteStatus::Resting),
            necrotic,
        ]);
        let mut system = Movement::new(Config::new(0.0, 1.0, 1.0));
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut out = Vec::new();

        system.handle(&view, &grid, MoleculeView::new(shape, &values), &mut rng, &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn random_walk_stays_within_one_voxel() {
        let grid = grid();
        let shape = grid.shape();
        let values = vec![0.0; shape.voxel_count().expect("small grid")];
        let origin = Voxel::new(0, 0, 0);
        let view = MacrophageView::from_snapshots(vec![macrophage(origin, PhagocyteStatus::Active)]);
        let mut system = Movement::new(Config::new(0.0, 1.0, 1.0));
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut out = Vec::new();

        for _ in 0..32 {
            system.handle(&view, &grid, MoleculeView::new(shape, &values), &mut rng, &mut out);
        }

        for command in &out {
            let Command::MoveMacrophage { point, .. } = command else {
                panic!("unexpected command {command:?}");
            };
            let voxel = grid.point_to_voxel(*point);
            assert!(voxel.x() <= 1 && voxel.y() <= 1 && voxel.z() <= 1);
            assert_ne!(voxel, origin);
        }
    }
}
