use lungsim_core::{
    Command, FungalStatus, FungusId, GridShape, MoleculeKind, Spacing, TissueGrid, TissueType,
    Voxel, VoxelGrid,
};
use lungsim_system_molecules::{Config, Molecules, SpeciesParameters};
use lungsim_world::{self as world, query, World};

fn world_with_hyphae(voxel: Voxel) -> World {
    let shape = GridShape::new(3, 3, 3);
    let grid = VoxelGrid::new(shape, Spacing::uniform(1.0));
    let tissue = TissueGrid::uniform(shape, TissueType::Air).expect("small grid");
    let mut world = World::new(grid, tissue, [0.0; MoleculeKind::COUNT], 1)
        .expect("matching shapes");
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SpawnFungus {
            point: grid.voxel_to_point(voxel),
            health: 1.0,
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::SetFungalStatus {
            fungus: FungusId::new(0),
            status: FungalStatus::Hyphae,
            status_iteration: 0,
        },
        &mut events,
    );
    world
}

fn step(world: &mut World, system: &mut Molecules) {
    let mut commands = Vec::new();
    system.secrete(&query::fungus_view(world), &mut commands);
    system.degrade_and_diffuse(&mut commands);
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }
}

#[test]
fn hyphae_secretion_accumulates_without_transport() {
    let origin = Voxel::new(0, 0, 0);
    let mut world = world_with_hyphae(origin);
    let still = SpeciesParameters::new(0.0, 0.0, 0.0);
    let mut system = Molecules::new(Config::new(
        1.0,
        Spacing::uniform(1.0),
        1.0,
        [still; MoleculeKind::COUNT],
        5.0,
    ));

    step(&mut world, &mut system);

    let hemolysin = query::molecule_view(&world, MoleculeKind::Hemolysin);
    assert_eq!(hemolysin.concentration(origin), 5.0);
    assert_eq!(hemolysin.total(), 5.0);
}

#[test]
fn secreted_toxin_spreads_and_decays() {
    let centre = Voxel::new(1, 1, 1);
    let mut world = world_with_hyphae(centre);
    let mut species = [SpeciesParameters::new(0.0, 0.0, 0.0); MoleculeKind::COUNT];
    species[MoleculeKind::Hemolysin.index()] = SpeciesParameters::new(0.1, 0.5, 0.0);
    let mut system = Molecules::new(Config::new(
        1.0,
        Spacing::uniform(1.0),
        1.0,
        species,
        5.0,
    ));

    step(&mut world, &mut system);
    step(&mut world, &mut system);

    let hemolysin = query::molecule_view(&world, MoleculeKind::Hemolysin);
    assert!(hemolysin.concentration(Voxel::new(0, 1, 1)) > 0.0);
    assert!(hemolysin.concentration(centre) > hemolysin.concentration(Voxel::new(0, 1, 1)));
    assert!(hemolysin.total() < 10.0);
    assert!(hemolysin.values().iter().all(|value| *value >= 0.0));
}

#[test]
fn hemoglobin_decays_towards_zero_while_spreading() {
    let centre = Voxel::new(1, 1, 1);
    let mut world = world_with_hyphae(centre);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SecreteMolecule {
            molecule: MoleculeKind::Hemoglobin,
            voxel: centre,
            amount: 8.0,
        },
        &mut events,
    );
    let mut species = [SpeciesParameters::new(0.0, 0.0, 0.0); MoleculeKind::COUNT];
    species[MoleculeKind::Hemoglobin.index()] = SpeciesParameters::new(0.1, 0.5, 0.0);
    let mut system = Molecules::new(Config::new(
        1.0,
        Spacing::uniform(1.0),
        1.0,
        species,
        0.0,
    ));

    step(&mut world, &mut system);

    let hemoglobin = query::molecule_view(&world, MoleculeKind::Hemoglobin);
    assert!(hemoglobin.concentration(Voxel::new(1, 1, 0)) > 0.0);
    assert!(hemoglobin.total() < 8.0);
    assert!(hemoglobin.values().iter().all(|value| *value >= 0.0));
    assert_eq!(query::molecule_view(&world, MoleculeKind::Hemolysin).total(), 0.0);
}
