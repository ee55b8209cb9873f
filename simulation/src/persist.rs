//! Versioned binary snapshots of a complete run.

use std::io::{Read, Write};

use lungsim_core::GridShape;
use lungsim_world::{query, World, WorldError};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, SimulationConfig};

/// Marker written before every snapshot.
const SNAPSHOT_DOMAIN: [u8; 4] = *b"lung";
/// Layout revision of the snapshot body.
pub(crate) const SNAPSHOT_VERSION: u32 = 1;

/// Errors raised while writing or reading a snapshot.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The snapshot could not be written.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] bincode::Error),
    /// The snapshot is truncated or corrupt.
    #[error("failed to decode snapshot: {0}")]
    Decode(#[source] bincode::Error),
    /// The input does not start with the snapshot marker.
    #[error("input is not a simulation snapshot")]
    InvalidPrefix,
    /// The snapshot was written by an incompatible layout revision.
    #[error("unsupported snapshot version {found}, expected {expected}")]
    UnsupportedVersion {
        /// Version found in the input.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },
    /// The stored configuration no longer validates.
    #[error("stored configuration is invalid: {0}")]
    Config(#[from] ConfigError),
    /// The stored world was built for a different grid than its configuration.
    #[error("stored world grid {world:?} does not match configured grid {config:?}")]
    GridMismatch {
        /// Shape named by the stored configuration.
        config: GridShape,
        /// Shape of the stored world.
        world: GridShape,
    },
    /// The stored world is internally inconsistent.
    #[error("stored world is inconsistent: {0}")]
    World(#[from] WorldError),
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    config: &'a SimulationConfig,
    world: &'a World,
    rng: &'a ChaCha8Rng,
}

#[derive(Deserialize)]
pub(crate) struct Snapshot {
    pub(crate) config: SimulationConfig,
    pub(crate) world: World,
    pub(crate) rng: ChaCha8Rng,
}

pub(crate) fn write_snapshot<W>(
    writer: W,
    config: &SimulationConfig,
    world: &World,
    rng: &ChaCha8Rng,
) -> Result<(), PersistError>
where
    W: Write,
{
    let mut writer = writer;
    writer
        .write_all(&SNAPSHOT_DOMAIN)
        .map_err(|error| PersistError::Encode(Box::new(bincode::ErrorKind::Io(error))))?;
    bincode::serialize_into(&mut writer, &SNAPSHOT_VERSION).map_err(PersistError::Encode)?;
    bincode::serialize_into(&mut writer, &SnapshotRef { config, world, rng })
        .map_err(PersistError::Encode)
}

pub(crate) fn read_snapshot<R>(reader: R) -> Result<Snapshot, PersistError>
where
    R: Read,
{
    let mut reader = reader;
    let mut domain = [0_u8; 4];
    reader
        .read_exact(&mut domain)
        .map_err(|error| PersistError::Decode(Box::new(bincode::ErrorKind::Io(error))))?;
    if domain != SNAPSHOT_DOMAIN {
        return Err(PersistError::InvalidPrefix);
    }

    let version: u32 = bincode::deserialize_from(&mut reader).map_err(PersistError::Decode)?;
    if version != SNAPSHOT_VERSION {
        return Err(PersistError::UnsupportedVersion {
            found: version,
            expected: SNAPSHOT_VERSION,
        });
    }

    let snapshot: Snapshot = bincode::deserialize_from(&mut reader).map_err(PersistError::Decode)?;
    snapshot.config.validate()?;

    let configured = snapshot.config.voxel_grid();
    let stored = *query::voxel_grid(&snapshot.world);
    if stored != configured {
        return Err(PersistError::GridMismatch {
            config: configured.shape(),
            world: stored.shape(),
        });
    }
    snapshot.world.validate()?;
    Ok(snapshot)
}
