#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tick orchestration for the lung infection simulation.
//!
//! [`Simulation`] owns the world, the shared random source and every system.
//! Each call to [`Simulation::advance`] runs the stages in a fixed order and
//! applies the commands of a stage before the next stage reads the world.

mod config;
mod persist;

use std::io::{Read, Write};

pub use config::{
    ConfigError, FungusSection, GridSection, MacrophageSection, MoleculesSection,
    SimulationConfig, SimulationSection, SpeciesSection,
};
pub use persist::PersistError;

use lungsim_core::{Command, Event, FungalStatus, MoleculeKind, TissueGrid, Voxel};
use lungsim_system_containment::{self as containment, Containment};
use lungsim_system_exchange::{self as exchange, Exchange};
use lungsim_system_fungus::{self as fungus, FungalGrowth};
use lungsim_system_molecules::{self as molecules, Molecules, SpeciesParameters};
use lungsim_system_movement::{self as movement, Movement};
use lungsim_system_phagocyte::{self as phagocyte, PhagocyteCycle};
use lungsim_system_recruitment::{self as recruitment, Recruitment};
use lungsim_world::{self as world, query, World, WorldError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info};

/// Reasons a simulation cannot be started.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The world could not be assembled from the configuration and tissue.
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Counts of notable events produced by a single tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Index of the completed tick.
    pub tick: u64,
    /// Macrophages recruited.
    pub spawned: usize,
    /// Macrophages that changed voxel.
    pub moved: usize,
    /// Fungi engulfed.
    pub engulfed: usize,
    /// Fungi released from a phagosome.
    pub released: usize,
    /// Fungi killed.
    pub fungi_killed: usize,
    /// Macrophages that died.
    pub macrophage_deaths: usize,
}

impl TickReport {
    fn record(&mut self, event: &Event) {
        match event {
            Event::TimeAdvanced { tick, .. } => self.tick = *tick,
            Event::MacrophageSpawned { .. } => self.spawned += 1,
            Event::MacrophageMoved { .. } => self.moved += 1,
            Event::FungusEngulfed { .. } => self.engulfed += 1,
            Event::FungusReleased { .. } => self.released += 1,
            Event::FungusKilled { .. } => self.fungi_killed += 1,
            Event::MacrophageDied { .. } => self.macrophage_deaths += 1,
            Event::FungusSpawned { .. }
            | Event::PhagocyteStatusChanged { .. }
            | Event::FungalStatusChanged { .. } => {}
        }
    }
}

#[derive(Debug)]
struct Systems {
    molecules: Molecules,
    recruitment: Recruitment,
    exchange: Exchange,
    movement: Movement,
    containment: Containment,
    fungus: FungalGrowth,
    phagocyte: PhagocyteCycle,
}

impl Systems {
    fn from_config(config: &SimulationConfig) -> Self {
        let time_step = config.simulation.time_step;
        let macrophage = &config.macrophage;
        let species = MoleculeKind::ALL.map(|kind| {
            let section = config.molecules.species(kind);
            SpeciesParameters::new(
                section.diffusion_constant,
                section.turnover_rate,
                section.system_concentration,
            )
        });

        Self {
            molecules: Molecules::new(molecules::Config::new(
                time_step,
                config.voxel_grid().spacing(),
                config.molecules.cyt_bind_t,
                species,
                config.fungus.hemolysin_per_hyphae,
            )),
            recruitment: Recruitment::new(recruitment::Config::new(
                macrophage.recruitment_rate,
                macrophage.recruitment_probability,
                macrophage.recruitment_threshold,
            )),
            exchange: Exchange::new(
                exchange::Config::new(
                    macrophage.chemokine_absorption,
                    macrophage.iron_uptake_rate,
                    macrophage.chemokine_per_hyphae,
                    macrophage.detection_range / 2,
                )
                .with_hemoglobin_uptake(config.fungus.hemoglobin_uptake_rate),
            ),
            movement: Movement::new(movement::Config::new(
                macrophage.move_rate_rest,
                macrophage.move_rate_act,
                macrophage.recruitment_threshold,
            )),
            containment: Containment::new(containment::Config::new(
                macrophage.phagocytosis_probability,
                macrophage.max_conidia,
                macrophage.kill_rate,
                time_step,
            )),
            fungus: FungalGrowth::new(fungus::Config::new(
                config.fungus.iter_to_swell,
                config.fungus.iter_to_germinate,
            )),
            phagocyte: PhagocyteCycle::new(phagocyte::Config {
                iter_to_rest: macrophage.iter_to_rest,
                iter_to_change_state: macrophage.iter_to_change_state,
                max_conidia: macrophage.max_conidia,
                internal_iron: macrophage.internal_iron,
                kd_iron: macrophage.kd_iron,
                volume: macrophage.volume,
                time_step,
                half_life: macrophage.half_life,
                min_population: macrophage.min_population,
            }),
        }
    }
}

/// A single simulation run: world, random source and the ordered systems.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    world: World,
    rng: ChaCha8Rng,
    systems: Systems,
    commands: Vec<Command>,
    events: Vec<Event>,
}

impl Simulation {
    /// Validates the configuration, allocates the world and places the
    /// initial macrophages and conidia at random voxel centres.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError`] when the configuration is invalid or the
    /// tissue grid does not match the configured grid.
    pub fn initialize(
        config: SimulationConfig,
        tissue: TissueGrid,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        let grid = config.voxel_grid();
        let world = World::new(
            grid,
            tissue,
            config.initial_concentrations(),
            config.macrophage.phagosome_capacity,
        )?;

        let mut simulation = Self {
            systems: Systems::from_config(&config),
            rng: ChaCha8Rng::seed_from_u64(config.simulation.seed),
            config,
            world,
            commands: Vec::new(),
            events: Vec::new(),
        };
        simulation.populate();

        info!(
            shape = ?simulation.config.grid.shape,
            seed = simulation.config.simulation.seed,
            macrophages = query::living_macrophages(&simulation.world),
            fungi = query::living_fungi(&simulation.world),
            "simulation initialized"
        );
        Ok(simulation)
    }

    fn populate(&mut self) {
        let grid = *query::voxel_grid(&self.world);
        let shape = grid.shape();
        let Some(voxel_count) = shape.voxel_count().filter(|count| *count > 0) else {
            return;
        };

        for _ in 0..self.config.macrophage.init_count {
            if let Some(voxel) = shape.voxel_at(self.rng.gen_range(0..voxel_count)) {
                self.commands.push(Command::SpawnMacrophage {
                    point: grid.voxel_to_point(voxel),
                });
            }
        }
        for _ in 0..self.config.fungus.init_count {
            if let Some(voxel) = shape.voxel_at(self.rng.gen_range(0..voxel_count)) {
                self.commands.push(Command::SpawnFungus {
                    point: grid.voxel_to_point(voxel),
                    health: self.config.fungus.init_health,
                });
            }
        }
        flush(&mut self.world, &mut self.commands, &mut self.events);
        self.events.clear();
    }

    /// Restores a run written by [`Simulation::save`].
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the input is not a readable snapshot of
    /// the current layout revision.
    pub fn load<R>(reader: R) -> Result<Self, PersistError>
    where
        R: Read,
    {
        let snapshot = persist::read_snapshot(reader)?;
        let simulation = Self {
            systems: Systems::from_config(&snapshot.config),
            config: snapshot.config,
            world: snapshot.world,
            rng: snapshot.rng,
            commands: Vec::new(),
            events: Vec::new(),
        };

        info!(
            tick = simulation.tick_index(),
            time = simulation.time(),
            macrophages = query::living_macrophages(&simulation.world),
            fungi = query::living_fungi(&simulation.world),
            "simulation restored"
        );
        Ok(simulation)
    }

    /// Writes the complete run state, random source included.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Encode`] when the writer fails.
    pub fn save<W>(&self, writer: W) -> Result<(), PersistError>
    where
        W: Write,
    {
        persist::write_snapshot(writer, &self.config, &self.world, &self.rng)
    }

    /// Applies a command outside the tick pipeline, for scenario setup.
    pub fn apply_command(&mut self, command: Command, out_events: &mut Vec<Event>) {
        world::apply(&mut self.world, command, out_events);
    }

    /// Runs one tick through every stage and summarizes what happened.
    pub fn advance(&mut self) -> TickReport {
        let Self {
            config,
            world,
            rng,
            systems,
            commands,
            events,
        } = self;
        events.clear();

        commands.push(Command::Tick {
            dt: config.simulation.time_step,
        });
        flush(world, commands, events);

        {
            let fungi = query::fungus_view(world);
            systems.molecules.secrete(&fungi, commands);
        }
        flush(world, commands, events);

        systems.molecules.degrade_and_diffuse(commands);
        flush(world, commands, events);

        systems.recruitment.handle(
            query::tissue(world),
            query::voxel_grid(world),
            query::molecule_view(world, MoleculeKind::MacrophageChemokine),
            rng,
            commands,
        );
        flush(world, commands, events);

        {
            let snapshot: &World = world;
            let macrophages = query::macrophage_view(snapshot);
            let fungi = query::fungus_view(snapshot);
            let hyphae_in_voxel = |voxel: Voxel| {
                query::fungi_in_voxel(snapshot, voxel)
                    .filter(|id| {
                        fungi
                            .get(*id)
                            .is_some_and(|fungus| fungus.status == FungalStatus::Hyphae)
                    })
                    .count()
            };
            systems.exchange.handle(
                &macrophages,
                query::voxel_grid(snapshot),
                query::molecule_view(snapshot, MoleculeKind::Iron),
                hyphae_in_voxel,
                commands,
            );
            systems.exchange.absorb_hemoglobin(&fungi, commands);
        }
        flush(world, commands, events);

        {
            let macrophages = query::macrophage_view(world);
            systems.movement.handle(
                &macrophages,
                query::voxel_grid(world),
                query::molecule_view(world, MoleculeKind::MacrophageChemokine),
                rng,
                commands,
            );
        }
        flush(world, commands, events);

        {
            let snapshot: &World = world;
            let macrophages = query::macrophage_view(snapshot);
            let fungi = query::fungus_view(snapshot);
            systems.containment.handle(
                &macrophages,
                &fungi,
                |voxel| query::fungi_in_voxel(snapshot, voxel),
                rng,
                commands,
            );
        }
        flush(world, commands, events);

        {
            let fungi = query::fungus_view(world);
            systems.fungus.handle(&fungi, commands);
        }
        flush(world, commands, events);

        {
            let macrophages = query::macrophage_view(world);
            systems.phagocyte.handle(&macrophages, rng, commands);
        }
        flush(world, commands, events);

        let mut report = TickReport::default();
        for event in events.iter() {
            report.record(event);
        }
        debug!(
            tick = report.tick,
            spawned = report.spawned,
            moved = report.moved,
            engulfed = report.engulfed,
            released = report.released,
            fungi_killed = report.fungi_killed,
            macrophage_deaths = report.macrophage_deaths,
            "tick complete"
        );
        report
    }

    /// Events produced by the most recent tick, in application order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Read-only access to the world for queries.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Validated configuration of the run.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Number of completed ticks.
    #[must_use]
    pub fn tick_index(&self) -> u64 {
        query::tick_index(&self.world)
    }

    /// Simulated minutes elapsed.
    #[must_use]
    pub fn time(&self) -> f64 {
        query::time(&self.world)
    }
}

fn flush(world: &mut World, commands: &mut Vec<Command>, events: &mut Vec<Event>) {
    for command in commands.drain(..) {
        world::apply(world, command, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::REFERENCE;
    use lungsim_core::{GridShape, TissueType};

    fn simulation() -> Simulation {
        let config = SimulationConfig::from_toml_str(REFERENCE).expect("valid configuration");
        let tissue = TissueGrid::uniform(GridShape::new(6, 5, 4), TissueType::Epithelium)
            .expect("small grid");
        Simulation::initialize(config, tissue).expect("simulation starts")
    }

    #[test]
    fn initialization_places_configured_agents() {
        let simulation = simulation();
        assert_eq!(query::living_macrophages(simulation.world()), 6);
        assert_eq!(query::living_fungi(simulation.world()), 10);
        assert_eq!(simulation.tick_index(), 0);
        assert!(simulation.events().is_empty());

        let grid = query::voxel_grid(simulation.world());
        for macrophage in query::macrophage_view(simulation.world()).iter() {
            assert_eq!(macrophage.point, grid.voxel_to_point(macrophage.voxel));
        }
    }

    #[test]
    fn tissue_shape_mismatch_is_rejected() {
        let config = SimulationConfig::from_toml_str(REFERENCE).expect("valid configuration");
        let tissue =
            TissueGrid::uniform(GridShape::new(2, 2, 2), TissueType::Air).expect("small grid");
        assert!(matches!(
            Simulation::initialize(config, tissue),
            Err(SimulationError::World(WorldError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn advance_reports_tick_and_clock() {
        let mut simulation = simulation();
        let first = simulation.advance();
        let second = simulation.advance();

        assert_eq!(first.tick, 1);
        assert_eq!(second.tick, 2);
        assert_eq!(simulation.tick_index(), 2);
        assert!((simulation.time() - 4.0).abs() < 1e-12);
        assert!(matches!(
            simulation.events().first(),
            Some(Event::TimeAdvanced { tick: 2, .. })
        ));
    }

    #[test]
    fn report_counts_match_events() {
        let mut simulation = simulation();
        for _ in 0..10 {
            let report = simulation.advance();
            let moved = simulation
                .events()
                .iter()
                .filter(|event| matches!(event, Event::MacrophageMoved { .. }))
                .count();
            assert_eq!(report.moved, moved);
        }
    }
}
