#![allow(dead_code)]

use lungsim_core::{GridShape, TissueGrid, TissueType};
use lungsim_simulation::{
    FungusSection, GridSection, MacrophageSection, MoleculesSection, Simulation,
    SimulationConfig, SimulationSection, SpeciesSection,
};

pub const SHAPE: [u32; 3] = [4, 4, 3];

pub fn inert_species(initial_concentration: f64) -> SpeciesSection {
    SpeciesSection {
        diffusion_constant: 0.0,
        turnover_rate: 0.0,
        system_concentration: 0.0,
        initial_concentration,
    }
}

/// Parameters under which nothing happens unless a test switches it on.
pub fn quiet_config() -> SimulationConfig {
    SimulationConfig {
        simulation: SimulationSection {
            seed: 7,
            time_step: 2.0,
        },
        grid: GridSection {
            shape: SHAPE,
            spacing: [10.0, 10.0, 10.0],
        },
        molecules: MoleculesSection {
            cyt_bind_t: 35.0,
            macrophage_chemokine: inert_species(0.0),
            neutrophil_chemokine: inert_species(0.0),
            iron: inert_species(0.0),
            hemolysin: inert_species(0.0),
            hemoglobin: inert_species(0.0),
        },
        macrophage: MacrophageSection {
            init_count: 0,
            phagosome_capacity: 3,
            max_conidia: 3,
            recruitment_rate: 0,
            recruitment_probability: 0.0,
            recruitment_threshold: 1.0,
            move_rate_rest: 0.0,
            move_rate_act: 0.0,
            iter_to_rest: 4,
            iter_to_change_state: 2,
            internal_iron: 0.0,
            kd_iron: 1.0,
            volume: 1.0,
            half_life: 0.0,
            min_population: 0,
            chemokine_absorption: 0.0,
            iron_uptake_rate: 0.0,
            chemokine_per_hyphae: 0.0,
            detection_range: 2,
            phagocytosis_probability: 0.0,
            kill_rate: 1000.0,
        },
        fungus: FungusSection {
            init_count: 0,
            init_health: 1.0,
            iter_to_swell: 3,
            iter_to_germinate: 3,
            hemolysin_per_hyphae: 0.0,
            hemoglobin_uptake_rate: 0.0,
        },
    }
}

/// Parameters exercising every stage of the pipeline.
pub fn busy_config(seed: u64) -> SimulationConfig {
    let mut config = quiet_config();
    config.simulation.seed = seed;
    config.molecules.macrophage_chemokine = SpeciesSection {
        diffusion_constant: 3.0,
        turnover_rate: 1.0,
        system_concentration: 0.0,
        initial_concentration: 1.5,
    };
    config.molecules.neutrophil_chemokine = SpeciesSection {
        diffusion_constant: 3.0,
        turnover_rate: 1.0,
        system_concentration: 0.0,
        initial_concentration: 0.0,
    };
    config.molecules.iron = SpeciesSection {
        diffusion_constant: 1.0,
        turnover_rate: 0.5,
        system_concentration: 0.2,
        initial_concentration: 1.0,
    };
    config.molecules.hemolysin = SpeciesSection {
        diffusion_constant: 2.0,
        turnover_rate: 1.0,
        system_concentration: 0.0,
        initial_concentration: 0.0,
    };
    config.molecules.hemoglobin = SpeciesSection {
        diffusion_constant: 2.0,
        turnover_rate: 1.0,
        system_concentration: 0.0,
        initial_concentration: 2.0,
    };

    let macrophage = &mut config.macrophage;
    macrophage.init_count = 5;
    macrophage.recruitment_rate = 2;
    macrophage.recruitment_probability = 0.5;
    macrophage.move_rate_rest = 0.4;
    macrophage.move_rate_act = 0.9;
    macrophage.internal_iron = 0.1;
    macrophage.kd_iron = 2.0;
    macrophage.half_life = 0.05;
    macrophage.min_population = 2;
    macrophage.chemokine_absorption = 0.1;
    macrophage.iron_uptake_rate = 0.05;
    macrophage.chemokine_per_hyphae = 0.5;
    macrophage.phagocytosis_probability = 0.7;
    macrophage.kill_rate = 10.0;

    config.fungus.init_count = 12;
    config.fungus.iter_to_swell = 1;
    config.fungus.iter_to_germinate = 2;
    config.fungus.hemolysin_per_hyphae = 1.5;
    config.fungus.hemoglobin_uptake_rate = 0.2;
    config
}

/// Blood along the bottom layer, epithelium elsewhere.
pub fn layered_tissue() -> TissueGrid {
    let [x, y, z] = SHAPE;
    let shape = GridShape::new(x, y, z);
    let mut tissue = TissueGrid::uniform(shape, TissueType::Epithelium).expect("small grid");
    for voxel in shape.voxels().filter(|voxel| voxel.z() == 0) {
        let _ = tissue.set(voxel, TissueType::Blood);
    }
    tissue
}

pub fn uniform_tissue(tissue: TissueType) -> TissueGrid {
    let [x, y, z] = SHAPE;
    TissueGrid::uniform(GridShape::new(x, y, z), tissue).expect("small grid")
}

pub fn start(config: SimulationConfig, tissue: TissueGrid) -> Simulation {
    Simulation::initialize(config, tissue).expect("simulation starts")
}
