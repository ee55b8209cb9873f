use lungsim_core::{
    Command, GridShape, MoleculeView, Spacing, TissueGrid, TissueType, Voxel, VoxelGrid,
};
use lungsim_system_recruitment::{Config, Recruitment};
use lungsim_world::{self as world, query, World};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn spawned_voxels(grid: &VoxelGrid, commands: &[Command]) -> Vec<Voxel> {
    commands
        .iter()
        .map(|command| match command {
            Command::SpawnMacrophage { point } => grid.point_to_voxel(*point),
            other => panic!("unexpected command {other:?}"),
        })
        .collect()
}

#[test]
fn saturated_blood_recruits_exactly_rate_macrophages() {
    let shape = GridShape::new(3, 3, 3);
    let grid = VoxelGrid::new(shape, Spacing::uniform(2.0));
    let tissue = TissueGrid::uniform(shape, TissueType::Blood).expect("small grid");
    let mut world = World::new(grid, tissue.clone(), [5.0, 0.0, 0.0, 0.0, 0.0], 2)
        .expect("matching shapes");
    let mut system = Recruitment::new(Config::new(3, 1.0, 1.0));
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut commands = Vec::new();

    system.handle(
        &tissue,
        &grid,
        query::molecule_view(&world, lungsim_core::MoleculeKind::MacrophageChemokine),
        &mut rng,
        &mut commands,
    );
    let mut events = Vec::new();
    for command in commands {
        world::apply(&mut world, command, &mut events);
    }

    assert_eq!(query::living_macrophages(&world), 3);
    assert_eq!(events.len(), 3);
}

#[test]
fn only_qualifying_blood_voxels_receive_recruits() {
    let shape = GridShape::new(4, 1, 1);
    let grid = VoxelGrid::new(shape, Spacing::uniform(1.0));
    let tissue =
        TissueGrid::from_codes(shape, &[1, 1, 0, 1]).expect("valid tissue codes");
    let values = [0.5, 2.0, 9.0, 3.0];
    let mut system = Recruitment::new(Config::new(20, 1.0, 1.0));
    let mut rng = ChaCha8Rng::seed_from_u64(19);
    let mut commands = Vec::new();

    system.handle(
        &tissue,
        &grid,
        MoleculeView::new(shape, &values),
        &mut rng,
        &mut commands,
    );

    let voxels = spawned_voxels(&grid, &commands);
    assert_eq!(voxels.len(), 20);
    assert!(voxels
        .iter()
        .all(|voxel| *voxel == Voxel::new(1, 0, 0) || *voxel == Voxel::new(3, 0, 0)));
}

proptest! {
    #[test]
    fn recruitment_never_exceeds_rate(
        rate in 0_usize..12,
        probability in 0.0_f64..=1.0,
        threshold in 0.0_f64..10.0,
        codes in proptest::collection::vec(0_i32..6, 8),
        values in proptest::collection::vec(0.0_f64..10.0, 8),
        seed in any::<u64>(),
    ) {
        let shape = GridShape::new(2, 2, 2);
        let grid = VoxelGrid::new(shape, Spacing::uniform(1.0));
        let tissue = TissueGrid::from_codes(shape, &codes).expect("codes are in range");
        let chemokine = MoleculeView::new(shape, &values);
        let mut system = Recruitment::new(Config::new(rate, probability, threshold));
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut commands = Vec::new();

        system.handle(&tissue, &grid, chemokine, &mut rng, &mut commands);

        prop_assert!(commands.len() <= rate);
        for voxel in spawned_voxels(&grid, &commands) {
            prop_assert_eq!(tissue.get(voxel), Some(TissueType::Blood));
            prop_assert!(chemokine.concentration(voxel) >= threshold);
        }
    }
}
