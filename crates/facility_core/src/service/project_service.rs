//! Project export/import use-case service.
//!
//! # Responsibility
//! - Export: load a durable tree plus its side tables into one snapshot file.
//! - Import: decode, normalize, reinsert and reattach side tables, then return
//!   the freshly loaded durable tree.
//!
//! # Invariants
//! - Export never writes to the store.
//! - Import failures in the codec stage abort before any store write.
//! - Reinsertion and side-table application share one transaction; a failure
//!   at any step leaves no rows behind.

use crate::model::{Building, EntityId};
use crate::repo::building_repo::{
    ensure_connection_ready, BuildingRepository, RepoError, SqliteBuildingRepository,
};
use crate::repo::side_table_repo::{SideTableRepository, SqliteSideTableRepository};
use crate::repo::with_write_scope;
use crate::service::normalizer::normalize_for_import;
use crate::snapshot::{self, ProjectSnapshot, SnapshotError};
use log::{error, info};
use rusqlite::{Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;

pub type ProjectResult<T> = Result<T, ProjectError>;

/// Errors from project export/import.
#[derive(Debug)]
pub enum ProjectError {
    /// Snapshot file could not be read, written or decoded.
    Snapshot(SnapshotError),
    /// Store read/write failed.
    Repo(RepoError),
    /// Requested building does not exist.
    NotFound(EntityId),
}

impl Display for ProjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snapshot(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "building not found: {id}"),
        }
    }
}

impl Error for ProjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Snapshot(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<SnapshotError> for ProjectError {
    fn from(value: SnapshotError) -> Self {
        Self::Snapshot(value)
    }
}

impl From<RepoError> for ProjectError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for ProjectError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Snapshot export/import facade over one connection.
///
/// The connection is checked once on construction; both repositories share
/// it, so writes issued by either inside one write scope join the same
/// transaction.
pub struct ProjectService<'conn> {
    conn: &'conn Connection,
    buildings: SqliteBuildingRepository<'conn>,
    side_tables: SqliteSideTableRepository<'conn>,
}

impl<'conn> ProjectService<'conn> {
    /// Creates service from a connection that went through the schema manager.
    pub fn try_new(conn: &'conn Connection) -> ProjectResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self {
            conn,
            buildings: SqliteBuildingRepository::from_ready(conn),
            side_tables: SqliteSideTableRepository::from_ready(conn),
        })
    }

    /// Builds the exported aggregate for one building.
    pub fn build_snapshot(&self, building_id: EntityId) -> ProjectResult<ProjectSnapshot> {
        let tree = self
            .buildings
            .find(building_id)?
            .ok_or(ProjectError::NotFound(building_id))?;

        let mut snapshot = ProjectSnapshot::new(tree);
        snapshot.street_lighting = self.side_tables.load_street_lighting(building_id)?;
        snapshot.noise_selections = self.side_tables.load_noise_selections(building_id)?;
        snapshot.noise_thresholds = self.side_tables.load_noise_thresholds(building_id)?;
        Ok(snapshot)
    }

    /// Suggested file name: sanitized building name plus snapshot extension.
    pub fn default_export_file_name(&self, building_id: EntityId) -> ProjectResult<String> {
        let name: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM building WHERE id = ?1;",
                [building_id],
                |row| row.get(0),
            )
            .optional()?;
        let name = name.ok_or(ProjectError::NotFound(building_id))?;
        Ok(snapshot::default_file_name(&name))
    }

    /// Encodes one building's aggregate without touching the filesystem.
    pub fn export_bytes(&self, building_id: EntityId) -> ProjectResult<Vec<u8>> {
        let snapshot = self.build_snapshot(building_id)?;
        Ok(snapshot::encode(&snapshot)?)
    }

    /// Writes one building's aggregate to `path`.
    pub fn export_to(&self, building_id: EntityId, path: &Path) -> ProjectResult<ProjectSnapshot> {
        let started_at = Instant::now();
        let result = self.build_snapshot(building_id).and_then(|snapshot| {
            snapshot::write_file(path, &snapshot)?;
            Ok(snapshot)
        });

        match &result {
            Ok(snapshot) => info!(
                "event=snapshot_export module=service status=ok building_id={} export_id={} rooms={} lighting_keys={} duration_ms={}",
                building_id,
                snapshot.export_id,
                snapshot.tree.as_ref().map_or(0, Building::room_count),
                snapshot.street_lighting.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=snapshot_export module=service status=error building_id={} duration_ms={} error={}",
                building_id,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Imports a snapshot file and returns the new durable tree.
    pub fn import_from(&self, path: &Path) -> ProjectResult<Building> {
        let snapshot = match snapshot::read_file(path) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(
                    "event=snapshot_import module=service status=error stage=decode error={}",
                    err
                );
                return Err(err.into());
            }
        };
        self.import_snapshot(snapshot)
    }

    /// Imports snapshot bytes and returns the new durable tree.
    pub fn import_bytes(&self, bytes: &[u8]) -> ProjectResult<Building> {
        let snapshot = match snapshot::decode(bytes) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(
                    "event=snapshot_import module=service status=error stage=decode error={}",
                    err
                );
                return Err(err.into());
            }
        };
        self.import_snapshot(snapshot)
    }

    /// Normalizes, persists and reattaches a decoded snapshot.
    pub fn import_snapshot(&self, snapshot: ProjectSnapshot) -> ProjectResult<Building> {
        let started_at = Instant::now();
        let export_id = snapshot.export_id;

        let result = self.persist_snapshot(snapshot);
        match &result {
            Ok(building) => info!(
                "event=snapshot_import module=service status=ok export_id={} building_id={} rooms={} duration_ms={}",
                export_id,
                building.id,
                building.room_count(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=snapshot_import module=service status=error stage=persist export_id={} duration_ms={} error={}",
                export_id,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn persist_snapshot(&self, snapshot: ProjectSnapshot) -> ProjectResult<Building> {
        let mut tree = snapshot.tree.ok_or(SnapshotError::MissingTree)?;
        normalize_for_import(&mut tree);

        let building_id = with_write_scope(self.conn, |_| {
            let building_id = self.buildings.save(&mut tree)?;
            self.side_tables
                .update_street_lighting(&tree, &snapshot.street_lighting)?;
            self.side_tables
                .update_noise_selections(&tree, &snapshot.noise_selections)?;
            self.side_tables
                .update_noise_thresholds(&tree, &snapshot.noise_thresholds)?;
            Ok(building_id)
        })?;

        self.buildings
            .find(building_id)?
            .ok_or(ProjectError::NotFound(building_id))
    }
}
