use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use lungsim_core::{
    Command, GridShape, MacrophageId, MoleculeKind, Spacing, TissueGrid, TissueType, Voxel,
    VoxelGrid,
};
use lungsim_system_movement::{Config, Movement};
use lungsim_world::{self as world, query, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn deterministic_replay_produces_identical_trajectories() {
    let first = replay(17);
    let second = replay(17);

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
}

#[test]
fn voxel_index_tracks_every_move() {
    let outcome = replay(23);
    let world = outcome.world;
    for macrophage in query::macrophage_view(&world).alive() {
        let occupants: Vec<MacrophageId> =
            query::macrophages_in_voxel(&world, macrophage.voxel).collect();
        assert!(occupants.contains(&macrophage.id));
    }
    let indexed: usize = query::voxel_grid(&world)
        .shape()
        .voxels()
        .map(|voxel| query::macrophages_in_voxel(&world, voxel).count())
        .sum();
    assert_eq!(indexed, query::living_macrophages(&world));
}

struct ReplayOutcome {
    world: World,
    trajectory: Vec<(usize, Voxel)>,
}

impl PartialEq for ReplayOutcome {
    fn eq(&self, other: &Self) -> bool {
        self.trajectory == other.trajectory
    }
}

impl std::fmt::Debug for ReplayOutcome {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ReplayOutcome")
            .field("trajectory", &self.trajectory)
            .finish()
    }
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.trajectory.hash(&mut hasher);
        hasher.finish()
    }
}

fn replay(seed: u64) -> ReplayOutcome {
    let shape = GridShape::new(6, 6, 3);
    let grid = VoxelGrid::new(shape, Spacing::uniform(4.0));
    let mut world = World::new(
        grid,
        TissueGrid::uniform(shape, TissueType::Air).expect("small grid"),
        [0.0; MoleculeKind::COUNT],
        1,
    )
    .expect("matching shapes");

    let mut events = Vec::new();
    for x in 0..4 {
        world::apply(
            &mut world,
            Command::SpawnMacrophage {
                point: grid.voxel_to_point(Voxel::new(x, x, 1)),
            },
            &mut events,
        );
    }
    world::apply(
        &mut world,
        Command::SecreteMolecule {
            molecule: MoleculeKind::MacrophageChemokine,
            voxel: Voxel::new(5, 0, 2),
            amount: 10.0,
        },
        &mut events,
    );

    let mut movement = Movement::new(Config::new(0.6, 0.9, 1.0));
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut trajectory = Vec::new();

    for _ in 0..40 {
        let mut commands = Vec::new();
        movement.handle(
            &query::macrophage_view(&world),
            query::voxel_grid(&world),
            query::molecule_view(&world, MoleculeKind::MacrophageChemokine),
            &mut rng,
            &mut commands,
        );
        for command in commands {
            world::apply(&mut world, command, &mut events);
        }
        trajectory.extend(
            query::macrophage_view(&world)
                .iter()
                .map(|macrophage| (macrophage.id.get(), macrophage.voxel)),
        );
    }

    ReplayOutcome { world, trajectory }
}
