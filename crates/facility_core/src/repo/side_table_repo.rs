//! Side-table repository: street lighting readings, noise selections and
//! noise thresholds attached to rooms.
//!
//! # Responsibility
//! - Store auxiliary rows by durable `room_id`.
//! - Expose them to callers as maps keyed by the stable room key, so they
//!   survive id regeneration across export/import.
//!
//! # Invariants
//! - Map entries whose key matches no room of the target tree are dropped.
//! - Every room matching a key receives the value on update; on load, the
//!   last room in tree order wins for duplicate keys.
//! - An update for a room replaces all of its previous rows of that table.
//! - Street lighting stores no placeholder for a room: an empty reading list
//!   clears the room's readings, is not counted as written, and loads never
//!   yield an empty list.

use crate::model::{
    is_durable, room_key, rooms_with_keys, Building, EntityId, NoiseMeasurementKind,
    NoiseSelection, NoiseThreshold,
};
use crate::repo::building_repo::{ensure_connection_ready, RepoError, RepoResult};
use crate::repo::with_write_scope;
use log::info;
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;

/// Readings per room key, in measurement order.
pub type StreetLightingMap = BTreeMap<String, Vec<f64>>;
pub type NoiseSelectionMap = BTreeMap<String, NoiseSelection>;
pub type NoiseThresholdMap = BTreeMap<String, NoiseThreshold>;

/// Joins side-table rows back to the labels that form the room key. Order
/// mirrors the tree loader so duplicate keys resolve to the last room.
const KEYED_ROOM_FROM_SQL: &str = "FROM room r
    INNER JOIN space s ON s.id = r.space_id
    INNER JOIN floor f ON f.id = s.floor_id";
const KEYED_ROOM_ORDER_SQL: &str = "f.position ASC, f.id ASC, s.position ASC, s.id ASC, r.id ASC";

/// Repository interface for the three auxiliary keyed datasets.
pub trait SideTableRepository {
    fn load_street_lighting(&self, building_id: EntityId) -> RepoResult<StreetLightingMap>;
    /// Returns the number of rooms whose readings were written.
    fn update_street_lighting(
        &self,
        building: &Building,
        readings: &StreetLightingMap,
    ) -> RepoResult<usize>;
    fn load_noise_selections(&self, building_id: EntityId) -> RepoResult<NoiseSelectionMap>;
    fn update_noise_selections(
        &self,
        building: &Building,
        selections: &NoiseSelectionMap,
    ) -> RepoResult<usize>;
    fn load_noise_thresholds(&self, building_id: EntityId) -> RepoResult<NoiseThresholdMap>;
    fn update_noise_thresholds(
        &self,
        building: &Building,
        thresholds: &NoiseThresholdMap,
    ) -> RepoResult<usize>;
}

/// SQLite-backed side-table repository.
pub struct SqliteSideTableRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSideTableRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self::from_ready(conn))
    }

    pub(crate) fn from_ready(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SideTableRepository for SqliteSideTableRepository<'_> {
    fn load_street_lighting(&self, building_id: EntityId) -> RepoResult<StreetLightingMap> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT f.number, s.identifier, r.name, l.value, r.id
             {KEYED_ROOM_FROM_SQL}
             INNER JOIN street_lighting_reading l ON l.room_id = r.id
             WHERE f.building_id = ?1
             ORDER BY {KEYED_ROOM_ORDER_SQL}, l.seq ASC;"
        ))?;
        let mut rows = stmt.query([building_id])?;

        // Readings of one room arrive contiguously; a later room with the
        // same key replaces the earlier one.
        let mut map = StreetLightingMap::new();
        let mut current_room_id: Option<EntityId> = None;
        while let Some(row) = rows.next()? {
            let key = key_from_row(row)?;
            let value: f64 = row.get(3)?;
            let room_id: EntityId = row.get(4)?;
            if current_room_id != Some(room_id) {
                current_room_id = Some(room_id);
                map.insert(key.clone(), Vec::new());
            }
            map.entry(key).or_default().push(value);
        }
        Ok(map)
    }

    fn update_street_lighting(
        &self,
        building: &Building,
        readings: &StreetLightingMap,
    ) -> RepoResult<usize> {
        let written = with_write_scope(self.conn, |conn| {
            for_each_matching_room(building, readings, |room_id, values| {
                conn.prepare_cached("DELETE FROM street_lighting_reading WHERE room_id = ?1;")?
                    .execute([room_id])?;
                let mut insert = conn.prepare_cached(
                    "INSERT INTO street_lighting_reading (room_id, seq, value)
                     VALUES (?1, ?2, ?3);",
                )?;
                for (seq, value) in values.iter().enumerate() {
                    insert.execute(params![room_id, seq as i64, value])?;
                }
                Ok(!values.is_empty())
            })
        })?;
        log_side_table_update("street_lighting", readings.len(), written);
        Ok(written)
    }

    fn load_noise_selections(&self, building_id: EntityId) -> RepoResult<NoiseSelectionMap> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT f.number, s.identifier, r.name, n.selected, n.measurement_kind
             {KEYED_ROOM_FROM_SQL}
             INNER JOIN noise_selection n ON n.room_id = r.id
             WHERE f.building_id = ?1
             ORDER BY {KEYED_ROOM_ORDER_SQL};"
        ))?;
        let mut rows = stmt.query([building_id])?;
        let mut map = NoiseSelectionMap::new();
        while let Some(row) = rows.next()? {
            let selected = match row.get::<_, i64>(3)? {
                0 => false,
                1 => true,
                other => {
                    return Err(RepoError::InvalidData(format!(
                        "invalid selected value `{other}` in noise_selection.selected"
                    )));
                }
            };
            let kind_text: String = row.get(4)?;
            let measurement_kind =
                NoiseMeasurementKind::parse_db_str(&kind_text).ok_or(RepoError::CorruptEnum {
                    table: "noise_selection",
                    column: "measurement_kind",
                    value: kind_text,
                })?;
            map.insert(
                key_from_row(row)?,
                NoiseSelection {
                    selected,
                    measurement_kind,
                },
            );
        }
        Ok(map)
    }

    fn update_noise_selections(
        &self,
        building: &Building,
        selections: &NoiseSelectionMap,
    ) -> RepoResult<usize> {
        let written = with_write_scope(self.conn, |conn| {
            for_each_matching_room(building, selections, |room_id, selection| {
                conn.prepare_cached(
                    "INSERT OR REPLACE INTO noise_selection (room_id, selected, measurement_kind)
                     VALUES (?1, ?2, ?3);",
                )?
                .execute(params![
                    room_id,
                    bool_to_int(selection.selected),
                    selection.measurement_kind.as_db_str(),
                ])?;
                Ok(true)
            })
        })?;
        log_side_table_update("noise_selection", selections.len(), written);
        Ok(written)
    }

    fn load_noise_thresholds(&self, building_id: EntityId) -> RepoResult<NoiseThresholdMap> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT f.number, s.identifier, r.name, t.day_db, t.night_db
             {KEYED_ROOM_FROM_SQL}
             INNER JOIN noise_threshold t ON t.room_id = r.id
             WHERE f.building_id = ?1
             ORDER BY {KEYED_ROOM_ORDER_SQL};"
        ))?;
        let mut rows = stmt.query([building_id])?;
        let mut map = NoiseThresholdMap::new();
        while let Some(row) = rows.next()? {
            map.insert(
                key_from_row(row)?,
                NoiseThreshold {
                    day_db: row.get(3)?,
                    night_db: row.get(4)?,
                },
            );
        }
        Ok(map)
    }

    fn update_noise_thresholds(
        &self,
        building: &Building,
        thresholds: &NoiseThresholdMap,
    ) -> RepoResult<usize> {
        let written = with_write_scope(self.conn, |conn| {
            for_each_matching_room(building, thresholds, |room_id, threshold| {
                conn.prepare_cached(
                    "INSERT OR REPLACE INTO noise_threshold (room_id, day_db, night_db)
                     VALUES (?1, ?2, ?3);",
                )?
                .execute(params![room_id, threshold.day_db, threshold.night_db])?;
                Ok(true)
            })
        })?;
        log_side_table_update("noise_threshold", thresholds.len(), written);
        Ok(written)
    }
}

/// Calls `write` for every durable room of `building` whose key is in `map`
/// and counts the rooms for which `write` reports stored rows.
fn for_each_matching_room<V>(
    building: &Building,
    map: &BTreeMap<String, V>,
    mut write: impl FnMut(EntityId, &V) -> RepoResult<bool>,
) -> RepoResult<usize> {
    if map.is_empty() {
        return Ok(0);
    }

    let mut written = 0;
    for keyed in rooms_with_keys(building) {
        if !is_durable(keyed.room.id) {
            continue;
        }
        if let Some(value) = map.get(&keyed.key()) {
            if write(keyed.room.id, value)? {
                written += 1;
            }
        }
    }
    Ok(written)
}

fn key_from_row(row: &Row<'_>) -> RepoResult<String> {
    let floor_number: String = row.get(0)?;
    let space_identifier: String = row.get(1)?;
    let room_name: String = row.get(2)?;
    Ok(room_key(&floor_number, &space_identifier, &room_name))
}

fn log_side_table_update(table: &str, entries: usize, written: usize) {
    info!(
        "event=side_table_update module=repo status=ok table={} entries={} rooms_written={} dropped={}",
        table,
        entries,
        written,
        entries.saturating_sub(written)
    );
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
