//! Project snapshot: the whole facility aggregate in one opaque file.
//!
//! # Responsibility
//! - Define the aggregate written on export and read on import.
//! - Encode/decode it as a single binary blob and move it through the
//!   filesystem atomically.
//!
//! # Invariants
//! - A file starts with `SNAPSHOT_MAGIC`, followed by a `bincode` dump of
//!   `ProjectSnapshot`. There is no independent schema; files are only
//!   readable by a build with the same tree shape.
//! - Decoding never touches the store.

use crate::model::Building;
use crate::repo::side_table_repo::{NoiseSelectionMap, NoiseThresholdMap, StreetLightingMap};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

mod codec;
mod naming;

pub use codec::{decode, encode, read_file, write_file, MAX_SNAPSHOT_BYTES, SNAPSHOT_MAGIC};
pub use naming::{default_file_name, SNAPSHOT_EXTENSION};

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Exported facility aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Identity of this export, for log correlation only.
    pub export_id: Uuid,
    /// Unix epoch milliseconds when the snapshot was built.
    pub exported_at_ms: i64,
    /// `None` only in damaged or hand-built files; import rejects it.
    pub tree: Option<Building>,
    pub street_lighting: StreetLightingMap,
    pub noise_selections: NoiseSelectionMap,
    pub noise_thresholds: NoiseThresholdMap,
}

impl ProjectSnapshot {
    /// Creates a snapshot around `tree` with empty auxiliary maps.
    pub fn new(tree: Building) -> Self {
        Self {
            export_id: Uuid::new_v4(),
            exported_at_ms: now_epoch_ms(),
            tree: Some(tree),
            street_lighting: StreetLightingMap::new(),
            noise_selections: NoiseSelectionMap::new(),
            noise_thresholds: NoiseThresholdMap::new(),
        }
    }
}

/// Errors from snapshot encoding, decoding and file access.
#[derive(Debug)]
pub enum SnapshotError {
    Io(std::io::Error),
    /// The file does not start with the snapshot magic.
    UnrecognizedFormat,
    Encode(bincode::Error),
    Decode(bincode::Error),
    /// The snapshot carries no building tree.
    MissingTree,
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "snapshot file error: {err}"),
            Self::UnrecognizedFormat => write!(f, "file is not a project snapshot"),
            Self::Encode(err) => write!(f, "snapshot encoding failed: {err}"),
            Self::Decode(err) => write!(f, "snapshot is corrupt or from another version: {err}"),
            Self::MissingTree => write!(f, "snapshot does not contain a building tree"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Encode(err) | Self::Decode(err) => Some(err.as_ref()),
            Self::UnrecognizedFormat | Self::MissingTree => None,
        }
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
