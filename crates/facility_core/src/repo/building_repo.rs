//! Building tree repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Cascade an in-memory building tree into `building`, `section`, `floor`,
//!   `space` and `room` rows, parent before child.
//! - Rebuild a tree from the store by cascading filtered reads.
//!
//! # Invariants
//! - A save is all-or-nothing; store ids are written back into the caller's
//!   tree only after the cascade succeeded.
//! - `position`/`section_index` are clamped to `>= 0` on write.
//! - `room.volume = NULL` round-trips to `None`, never to `0.0`.
//! - Child listing is deterministic: `position ASC, id ASC` (rooms: `id ASC`).
//! - Unknown stored enum values fail with `RepoError::CorruptEnum`.

use crate::db::migrations::{latest_version, required_columns, table_exists, table_has_column};
use crate::db::DbError;
use crate::model::{
    Building, BuildingSummary, EntityId, Floor, FloorType, Room, Section, Space, SpaceType,
};
use crate::repo::with_write_scope;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from facility repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target building does not exist.
    NotFound(EntityId),
    /// A stored enumeration value is not recognized; the row is corrupt.
    CorruptEnum {
        table: &'static str,
        column: &'static str,
        value: String,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "building not found: {id}"),
            Self::CorruptEnum {
                table,
                column,
                value,
            } => write!(f, "corrupt value `{value}` in {table}.{column}"),
            Self::InvalidData(message) => write!(f, "invalid facility data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "facility repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "facility repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "facility repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for whole-tree persistence.
pub trait BuildingRepository {
    /// Inserts the full tree and writes the assigned ids back into it.
    fn save(&self, building: &mut Building) -> RepoResult<EntityId>;
    /// Loads one tree; `None` when no building row matches.
    fn find(&self, building_id: EntityId) -> RepoResult<Option<Building>>;
    /// Loads one tree; an empty `Building::default()` when no row matches.
    fn load(&self, building_id: EntityId) -> RepoResult<Building>;
    /// Lists stored buildings ordered by id.
    fn list_buildings(&self) -> RepoResult<Vec<BuildingSummary>>;
    /// Deletes one building with all of its rows.
    fn delete(&self, building_id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed building tree repository.
pub struct SqliteBuildingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBuildingRepository<'conn> {
    /// Creates repository from a connection that went through the schema manager.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self::from_ready(conn))
    }

    /// Wraps a connection the caller already passed through
    /// `ensure_connection_ready`.
    pub(crate) fn from_ready(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl BuildingRepository for SqliteBuildingRepository<'_> {
    fn save(&self, building: &mut Building) -> RepoResult<EntityId> {
        let started_at = Instant::now();
        let mut staged = building.clone();

        match with_write_scope(self.conn, |conn| insert_tree(conn, &mut staged)) {
            Ok(building_id) => {
                info!(
                    "event=building_save module=repo status=ok building_id={} floors={} spaces={} rooms={} duration_ms={}",
                    building_id,
                    staged.floors.len(),
                    staged.space_count(),
                    staged.room_count(),
                    started_at.elapsed().as_millis()
                );
                *building = staged;
                Ok(building_id)
            }
            Err(err) => {
                error!(
                    "event=building_save module=repo status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn find(&self, building_id: EntityId) -> RepoResult<Option<Building>> {
        let started_at = Instant::now();
        let result = load_tree(self.conn, building_id);
        match &result {
            Ok(Some(building)) => info!(
                "event=building_load module=repo status=ok building_id={} floors={} rooms={} duration_ms={}",
                building_id,
                building.floors.len(),
                building.room_count(),
                started_at.elapsed().as_millis()
            ),
            Ok(None) => info!(
                "event=building_load module=repo status=not_found building_id={}",
                building_id
            ),
            Err(err) => error!(
                "event=building_load module=repo status=error building_id={} error={}",
                building_id, err
            ),
        }
        result
    }

    fn load(&self, building_id: EntityId) -> RepoResult<Building> {
        Ok(self.find(building_id)?.unwrap_or_default())
    }

    fn list_buildings(&self) -> RepoResult<Vec<BuildingSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.name, COUNT(f.id)
             FROM building b
             LEFT JOIN floor f ON f.building_id = b.id
             GROUP BY b.id, b.name
             ORDER BY b.id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(BuildingSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                floor_count: row.get(2)?,
            });
        }
        Ok(items)
    }

    fn delete(&self, building_id: EntityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM building WHERE id = ?1;", [building_id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(building_id));
        }
        info!(
            "event=building_delete module=repo status=ok building_id={}",
            building_id
        );
        Ok(())
    }
}

fn insert_tree(conn: &Connection, building: &mut Building) -> RepoResult<EntityId> {
    let building_id = conn
        .prepare_cached(
            "INSERT INTO building (name, planned_floors_count)
             VALUES (?1, ?2);",
        )?
        .insert(params![building.name.as_str(), building.planned_floors_count])?;
    building.id = building_id;

    for section in &mut building.sections {
        insert_section(conn, building_id, section)?;
    }
    for floor in &mut building.floors {
        insert_floor(conn, building_id, floor)?;
    }

    Ok(building_id)
}

fn insert_section(conn: &Connection, building_id: EntityId, section: &mut Section) -> RepoResult<()> {
    section.position = section.position.max(0);
    section.id = conn
        .prepare_cached(
            "INSERT INTO section (building_id, name, position)
             VALUES (?1, ?2, ?3);",
        )?
        .insert(params![building_id, section.name.as_str(), section.position])?;
    Ok(())
}

fn insert_floor(conn: &Connection, building_id: EntityId, floor: &mut Floor) -> RepoResult<()> {
    floor.section_index = floor.section_index.max(0);
    floor.position = floor.position.max(0);
    let floor_id = conn
        .prepare_cached(
            "INSERT INTO floor (
                building_id,
                number,
                name,
                type,
                section_index,
                position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        )?
        .insert(params![
            building_id,
            floor.number.as_str(),
            floor.name.as_str(),
            floor.floor_type.as_db_str(),
            floor.section_index,
            floor.position,
        ])?;
    floor.id = floor_id;

    for space in &mut floor.spaces {
        insert_space(conn, floor_id, space)?;
    }
    Ok(())
}

fn insert_space(conn: &Connection, floor_id: EntityId, space: &mut Space) -> RepoResult<()> {
    space.position = space.position.max(0);
    let space_id = conn
        .prepare_cached(
            "INSERT INTO space (floor_id, identifier, type, position)
             VALUES (?1, ?2, ?3, ?4);",
        )?
        .insert(params![
            floor_id,
            space.identifier.as_str(),
            space.space_type.as_db_str(),
            space.position,
        ])?;
    space.id = space_id;

    for room in &mut space.rooms {
        insert_room(conn, space_id, room)?;
    }
    Ok(())
}

fn insert_room(conn: &Connection, space_id: EntityId, room: &mut Room) -> RepoResult<()> {
    room.id = conn
        .prepare_cached(
            "INSERT INTO room (
                space_id,
                name,
                volume,
                ventilation_channels,
                ventilation_section_area,
                original_room_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        )?
        .insert(params![
            space_id,
            room.name.as_str(),
            room.volume,
            room.ventilation_channels,
            room.ventilation_section_area,
            room.original_room_id,
        ])?;
    Ok(())
}

fn load_tree(conn: &Connection, building_id: EntityId) -> RepoResult<Option<Building>> {
    let header = conn
        .query_row(
            "SELECT id, name, planned_floors_count
             FROM building
             WHERE id = ?1;",
            [building_id],
            |row| {
                Ok(Building {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    planned_floors_count: row.get(2)?,
                    sections: Vec::new(),
                    floors: Vec::new(),
                })
            },
        )
        .optional()?;

    let Some(mut building) = header else {
        return Ok(None);
    };

    building.sections = load_sections(conn, building.id)?;
    building.floors = load_floors(conn, building.id)?;
    for floor in &mut building.floors {
        floor.spaces = load_spaces(conn, floor.id)?;
        for space in &mut floor.spaces {
            space.rooms = load_rooms(conn, space.id)?;
        }
    }

    Ok(Some(building))
}

fn load_sections(conn: &Connection, building_id: EntityId) -> RepoResult<Vec<Section>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, name, position
         FROM section
         WHERE building_id = ?1
         ORDER BY position ASC, id ASC;",
    )?;
    let mut rows = stmt.query([building_id])?;
    let mut sections = Vec::new();
    while let Some(row) = rows.next()? {
        sections.push(Section {
            id: row.get(0)?,
            name: row.get(1)?,
            position: row.get(2)?,
        });
    }
    Ok(sections)
}

fn load_floors(conn: &Connection, building_id: EntityId) -> RepoResult<Vec<Floor>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, number, name, type, section_index, position
         FROM floor
         WHERE building_id = ?1
         ORDER BY position ASC, id ASC;",
    )?;
    let mut rows = stmt.query([building_id])?;
    let mut floors = Vec::new();
    while let Some(row) = rows.next()? {
        let type_text: String = row.get(3)?;
        let floor_type = FloorType::parse_db_str(&type_text).ok_or(RepoError::CorruptEnum {
            table: "floor",
            column: "type",
            value: type_text,
        })?;
        floors.push(Floor {
            id: row.get(0)?,
            number: row.get(1)?,
            name: row.get(2)?,
            floor_type,
            section_index: row.get(4)?,
            position: row.get(5)?,
            spaces: Vec::new(),
        });
    }
    Ok(floors)
}

fn load_spaces(conn: &Connection, floor_id: EntityId) -> RepoResult<Vec<Space>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, identifier, type, position
         FROM space
         WHERE floor_id = ?1
         ORDER BY position ASC, id ASC;",
    )?;
    let mut rows = stmt.query([floor_id])?;
    let mut spaces = Vec::new();
    while let Some(row) = rows.next()? {
        let type_text: String = row.get(2)?;
        let space_type = SpaceType::parse_db_str(&type_text).ok_or(RepoError::CorruptEnum {
            table: "space",
            column: "type",
            value: type_text,
        })?;
        spaces.push(Space {
            id: row.get(0)?,
            identifier: row.get(1)?,
            space_type,
            position: row.get(3)?,
            rooms: Vec::new(),
        });
    }
    Ok(spaces)
}

fn load_rooms(conn: &Connection, space_id: EntityId) -> RepoResult<Vec<Room>> {
    let mut stmt = conn.prepare_cached(
        "SELECT
            id,
            name,
            volume,
            ventilation_channels,
            ventilation_section_area,
            original_room_id
         FROM room
         WHERE space_id = ?1
         ORDER BY id ASC;",
    )?;
    let mut rows = stmt.query([space_id])?;
    let mut rooms = Vec::new();
    while let Some(row) = rows.next()? {
        rooms.push(Room {
            id: row.get(0)?,
            name: row.get(1)?,
            volume: row.get::<_, Option<f64>>(2)?,
            ventilation_channels: row.get(3)?,
            ventilation_section_area: row.get(4)?,
            original_room_id: row.get::<_, Option<EntityId>>(5)?,
        });
    }
    Ok(rooms)
}

/// Verifies that `conn` went through the schema manager of this binary.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let mut checked_table = "";
    for (table, column) in required_columns() {
        if table != checked_table {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
            checked_table = table;
        }
        if !table_has_column(conn, table, column)? {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}
