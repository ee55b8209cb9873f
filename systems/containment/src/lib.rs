#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that resolves phagocytosis and damages engulfed fungi.

use lungsim_core::{
    Command, FungusId, FungusView, MacrophageSnapshot, MacrophageView, PhagocyteStatus, Voxel,
};
use rand::Rng;

/// Configuration parameters required to construct the containment system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    phagocytosis_probability: f64,
    max_conidia: usize,
    kill_rate: f64,
    time_step: f64,
}

impl Config {
    /// Creates a new configuration.
    ///
    /// Engulfed fungi lose `time_step / kill_rate` health per tick; a
    /// macrophage never engulfs beyond `max_conidia` fungi.
    #[must_use]
    pub const fn new(
        phagocytosis_probability: f64,
        max_conidia: usize,
        kill_rate: f64,
        time_step: f64,
    ) -> Self {
        Self {
            phagocytosis_probability,
            max_conidia,
            kill_rate,
            time_step,
        }
    }

    fn damage_per_tick(&self) -> f64 {
        self.time_step / self.kill_rate
    }
}

/// Containment system that queues engulfment and damage commands.
#[derive(Debug)]
pub struct Containment {
    config: Config,
    claimed: Vec<bool>,
    scratch: Vec<Command>,
}

impl Containment {
    /// Creates a new containment system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            claimed: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Emits damage for contained fungi and engulfment attempts for free ones.
    ///
    /// Macrophages are visited in id order. Each first damages what it already
    /// holds, then draws once per free, living, engulfable fungus in its voxel
    /// while it still has room under the ceiling. `fungi_in_voxel` lists the
    /// living fungi of a voxel in id order.
    pub fn handle<R, F, I>(
        &mut self,
        macrophages: &MacrophageView,
        fungi: &FungusView,
        fungi_in_voxel: F,
        rng: &mut R,
        out: &mut Vec<Command>,
    ) where
        R: Rng + ?Sized,
        F: Fn(Voxel) -> I,
        I: IntoIterator<Item = FungusId>,
    {
        self.scratch.clear();
        self.claimed.clear();
        self.claimed.resize(fungi.iter().count(), false);

        for macrophage in macrophages.alive() {
            self.damage_contents(macrophage, fungi);

            if !can_engulf(macrophage.status) {
                continue;
            }

            let mut occupied = macrophage.phagosome.len();
            for fungus in fungi_in_voxel(macrophage.voxel) {
                if occupied >= self.config.max_conidia {
                    break;
                }
                if !self.is_engulfable(fungus, fungi) {
                    continue;
                }
                if self.config.phagocytosis_probability > rng.gen::<f64>() {
                    self.claimed[fungus.get()] = true;
                    occupied += 1;
                    self.scratch.push(Command::Engulf {
                        macrophage: macrophage.id,
                        fungus,
                        ceiling: self.config.max_conidia,
                    });
                }
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }

    fn damage_contents(&mut self, macrophage: &MacrophageSnapshot, fungi: &FungusView) {
        let amount = self.config.damage_per_tick();
        for fungus in &macrophage.phagosome {
            if fungi.get(*fungus).is_some_and(|snapshot| snapshot.alive) {
                self.scratch.push(Command::DamageFungus {
                    fungus: *fungus,
                    amount,
                });
            }
        }
    }

    fn is_engulfable(&self, fungus: FungusId, fungi: &FungusView) -> bool {
        if self.claimed.get(fungus.get()).copied().unwrap_or(true) {
            return false;
        }
        fungi.get(fungus).is_some_and(|snapshot| {
            snapshot.alive && snapshot.engulfed_by.is_none() && snapshot.status.is_engulfable()
        })
    }
}

fn can_engulf(status: PhagocyteStatus) -> bool {
    !status.is_terminal() && status != PhagocyteStatus::Anergic
}
