#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system advancing the macrophage activation cycle.
//!
//! Each living macrophage is visited in id order and may receive, in this
//! order: releases of its contents when necrotic, one cycle transition or
//! timer update with its TNF-alpha flag, a stochastic switch to anergy, a
//! stochastic death, and a ferroportin recovery step.

use lungsim_core::{
    activation_function, Command, MacrophageSnapshot, MacrophageView, PhagocyteStatus,
};
use rand::Rng;

const MINUTES_PER_HOUR: f64 = 60.0;

/// Configuration parameters required to construct the phagocyte system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Ticks an active macrophage stays active before resting.
    pub iter_to_rest: u32,
    /// Ticks spent in every other timed state, and ticks needed to
    /// re-express ferroportin.
    pub iter_to_change_state: u32,
    /// Phagosome occupancy above which a macrophage turns necrotic.
    pub max_conidia: usize,
    /// Iron pool setpoint; only the excess drives anergy.
    pub internal_iron: f64,
    /// Half-saturation constant of the anergy response to iron.
    pub kd_iron: f64,
    /// Volume converting iron quantity into concentration.
    pub volume: f64,
    /// Simulated minutes per tick.
    pub time_step: f64,
    /// Per-tick death probability of an empty macrophage.
    pub half_life: f64,
    /// Living population below which no macrophage dies.
    pub min_population: usize,
}

/// State machine emitting status transitions for macrophages.
#[derive(Debug)]
pub struct PhagocyteCycle {
    config: Config,
}

impl PhagocyteCycle {
    /// Creates a new phagocyte system using the supplied configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Emits release, status, flag and death commands for living macrophages.
    pub fn handle<R>(&mut self, macrophages: &MacrophageView, rng: &mut R, out: &mut Vec<Command>)
    where
        R: Rng + ?Sized,
    {
        let mut living = macrophages.living_count();

        for macrophage in macrophages.alive() {
            let status = self.advance_cycle(macrophage, out);

            if !status.is_terminal() {
                let excess_iron = macrophage.iron_pool - self.config.internal_iron;
                let probability = activation_function(
                    excess_iron,
                    self.config.kd_iron,
                    self.config.time_step / MINUTES_PER_HOUR,
                    self.config.volume,
                );
                if probability > rng.gen::<f64>() {
                    out.push(Command::SetPhagocyteStatus {
                        macrophage: macrophage.id,
                        status: PhagocyteStatus::Anergic,
                        status_iteration: 0,
                    });
                }
            }

            if macrophage.phagosome.is_empty()
                && self.config.half_life > rng.gen::<f64>()
                && living > self.config.min_population
            {
                out.push(Command::KillMacrophage {
                    macrophage: macrophage.id,
                });
                living -= 1;
                continue;
            }

            if !macrophage.ferroportin {
                out.push(self.recover_ferroportin(macrophage));
            }
        }
    }

    fn recover_ferroportin(&self, macrophage: &MacrophageSnapshot) -> Command {
        if macrophage.ferroportin_iteration >= self.config.iter_to_change_state {
            Command::SetFerroportin {
                macrophage: macrophage.id,
                expressed: true,
                iteration: 0,
            }
        } else {
            Command::SetFerroportin {
                macrophage: macrophage.id,
                expressed: false,
                iteration: macrophage.ferroportin_iteration.saturating_add(1),
            }
        }
    }

    /// Emits the deterministic part of the cycle and returns the resulting status.
    fn advance_cycle(
        &self,
        macrophage: &MacrophageSnapshot,
        out: &mut Vec<Command>,
    ) -> PhagocyteStatus {
        let contained = macrophage.phagosome.len();

        if macrophage.status == PhagocyteStatus::Necrotic {
            for fungus in &macrophage.phagosome {
                out.push(Command::ReleaseFungus {
                    macrophage: macrophage.id,
                    fungus: *fungus,
                });
            }
            return PhagocyteStatus::Necrotic;
        }

        if macrophage.status.is_terminal() {
            return macrophage.status;
        }

        if contained > self.config.max_conidia {
            return self.transition(macrophage, PhagocyteStatus::Necrotic, out);
        }

        if macrophage.status == PhagocyteStatus::Resting && contained > 0 {
            return self.transition(macrophage, PhagocyteStatus::Activating, out);
        }

        let Some(next) = macrophage.status.next_in_cycle() else {
            return macrophage.status;
        };
        let threshold = if macrophage.status == PhagocyteStatus::Active {
            self.config.iter_to_rest
        } else {
            self.config.iter_to_change_state
        };

        if macrophage.status_iteration >= threshold {
            return self.transition(macrophage, next, out);
        }

        out.push(Command::SetPhagocyteStatus {
            macrophage: macrophage.id,
            status: macrophage.status,
            status_iteration: macrophage.status_iteration.saturating_add(1),
        });
        macrophage.status
    }

    fn transition(
        &self,
        macrophage: &MacrophageSnapshot,
        status: PhagocyteStatus,
        out: &mut Vec<Command>,
    ) -> PhagocyteStatus {
        out.push(Command::SetPhagocyteStatus {
            macrophage: macrophage.id,
            status,
            status_iteration: 0,
        });

        // TNF-alpha starts with activation and stops on the return to rest.
        let secreting = match (macrophage.status, status) {
            (PhagocyteStatus::Activating, PhagocyteStatus::Active) => Some(true),
            (PhagocyteStatus::Active, PhagocyteStatus::Resting) => Some(false),
            _ => None,
        };
        if let Some(secreting) = secreting.filter(|secreting| *secreting != macrophage.tnfa) {
            out.push(Command::SetTnfa {
                macrophage: macrophage.id,
                secreting,
            });
        }
        status
    }
}
