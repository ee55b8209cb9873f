#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system advancing fungal growth and death.

use lungsim_core::{Command, FungalStatus, FungusSnapshot, FungusView};

/// Configuration parameters required to construct the fungal growth system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    iter_to_swell: u32,
    iter_to_germinate: u32,
}

impl Config {
    /// Creates a new configuration from the per-stage tick thresholds.
    #[must_use]
    pub const fn new(iter_to_swell: u32, iter_to_germinate: u32) -> Self {
        Self {
            iter_to_swell,
            iter_to_germinate,
        }
    }
}

/// Finite state machine driving every living fungal cell.
#[derive(Debug)]
pub struct FungalGrowth {
    config: Config,
}

impl FungalGrowth {
    /// Creates a new growth system using the supplied configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Emits death and status commands for living fungi in id order.
    ///
    /// Exhausted fungi die. Released fungi become conidia again. Free conidia
    /// swell and free swelling cells germinate once their timer reaches the
    /// threshold; contained fungi do not grow.
    pub fn handle(&mut self, fungi: &FungusView, out: &mut Vec<Command>) {
        for fungus in fungi.alive() {
            if fungus.health <= 0.0 {
                out.push(Command::KillFungus { fungus: fungus.id });
                continue;
            }

            match fungus.status {
                FungalStatus::Releasing => out.push(Command::SetFungalStatus {
                    fungus: fungus.id,
                    status: FungalStatus::Conidia,
                    status_iteration: 0,
                }),
                FungalStatus::Conidia if fungus.engulfed_by.is_none() => {
                    out.push(advance(fungus, self.config.iter_to_swell, FungalStatus::Swelling));
                }
                FungalStatus::Swelling if fungus.engulfed_by.is_none() => {
                    out.push(advance(
                        fungus,
                        self.config.iter_to_germinate,
                        FungalStatus::Hyphae,
                    ));
                }
                FungalStatus::Conidia
                | FungalStatus::Swelling
                | FungalStatus::Hyphae
                | FungalStatus::Dead => {}
            }
        }
    }
}

fn advance(fungus: &FungusSnapshot, threshold: u32, next: FungalStatus) -> Command {
    if fungus.status_iteration >= threshold {
        Command::SetFungalStatus {
            fungus: fungus.id,
            status: next,
            status_iteration: 0,
        }
    } else {
        Command::SetFungalStatus {
            fungus: fungus.id,
            status: fungus.status,
            status_iteration: fungus.status_iteration.saturating_add(1),
        }
    }
}
