use lungsim_core::{
    Command, FungalStatus, FungusId, GridShape, MacrophageId, MoleculeKind, Spacing, TissueGrid,
    TissueType, Voxel, VoxelGrid,
};
use lungsim_system_fungus::{Config, FungalGrowth};
use lungsim_world::{self as world, query, World};

fn apply_all(world: &mut World, commands: Vec<Command>) {
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }
}

fn seeded_world() -> World {
    let shape = GridShape::new(1, 1, 1);
    let grid = VoxelGrid::new(shape, Spacing::uniform(1.0));
    let mut world = World::new(
        grid,
        TissueGrid::uniform(shape, TissueType::Air).expect("small grid"),
        [0.0; MoleculeKind::COUNT],
        2,
    )
    .expect("matching shapes");
    let point = grid.voxel_to_point(Voxel::new(0, 0, 0));
    apply_all(
        &mut world,
        vec![
            Command::SpawnMacrophage { point },
            Command::SpawnFungus { point, health: 1.0 },
            Command::SpawnFungus { point, health: 1.0 },
        ],
    );
    world
}

fn tick(world: &mut World, system: &mut FungalGrowth) {
    let mut commands = Vec::new();
    system.handle(&query::fungus_view(world), &mut commands);
    apply_all(world, commands);
}

#[test]
fn free_conidium_germinates_after_both_timers() {
    let mut world = seeded_world();
    let mut system = FungalGrowth::new(Config::new(1, 2));

    let mut history = Vec::new();
    for _ in 0..6 {
        tick(&mut world, &mut system);
        let fungi = query::fungus_view(&world);
        let fungus = fungi.get(FungusId::new(0)).expect("fungus");
        history.push(fungus.status);
    }

    assert_eq!(
        history,
        vec![
            FungalStatus::Conidia,
            FungalStatus::Swelling,
            FungalStatus::Swelling,
            FungalStatus::Swelling,
            FungalStatus::Hyphae,
            FungalStatus::Hyphae,
        ]
    );
}

#[test]
fn killed_fungus_leaves_its_phagosome() {
    let mut world = seeded_world();
    apply_all(
        &mut world,
        vec![
            Command::Engulf {
                macrophage: MacrophageId::new(0),
                fungus: FungusId::new(1),
                ceiling: 2,
            },
            Command::DamageFungus {
                fungus: FungusId::new(1),
                amount: 1.0,
            },
        ],
    );
    let mut system = FungalGrowth::new(Config::new(5, 5));

    tick(&mut world, &mut system);

    let fungi = query::fungus_view(&world);
    let dead = fungi.get(FungusId::new(1)).expect("fungus");
    assert!(!dead.alive);
    assert_eq!(dead.status, FungalStatus::Dead);
    let macrophages = query::macrophage_view(&world);
    let host = macrophages.get(MacrophageId::new(0)).expect("macrophage");
    assert!(host.phagosome.is_empty());
    assert_eq!(query::living_fungi(&world), 1);
}
