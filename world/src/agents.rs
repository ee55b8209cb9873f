//! Kind-specific agent attributes stored inside the cell lists.

use lungsim_core::{FungalStatus, MacrophageId, PhagocyteStatus};
use serde::{Deserialize, Serialize};

use crate::Phagosome;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Macrophage {
    pub(crate) status: PhagocyteStatus,
    pub(crate) status_iteration: u32,
    pub(crate) iron_pool: f64,
    pub(crate) ferroportin: bool,
    pub(crate) ferroportin_iteration: u32,
    pub(crate) tnfa: bool,
    pub(crate) phagosome: Phagosome,
}

impl Macrophage {
    pub(crate) fn resting(capacity: usize) -> Self {
        Self {
            status: PhagocyteStatus::Resting,
            status_iteration: 0,
            iron_pool: 0.0,
            ferroportin: true,
            ferroportin_iteration: 0,
            tnfa: false,
            phagosome: Phagosome::new(capacity),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Fungus {
    pub(crate) status: FungalStatus,
    pub(crate) status_iteration: u32,
    pub(crate) health: f64,
    pub(crate) iron_pool: f64,
    pub(crate) engulfed_by: Option<MacrophageId>,
}

impl Fungus {
    pub(crate) const fn conidium(health: f64) -> Self {
        Self {
            status: FungalStatus::Conidia,
            status_iteration: 0,
            health,
            iron_pool: 0.0,
            engulfed_by: None,
        }
    }
}
