//! Schema manager: base migration registry plus additive column checks.
//!
//! # Responsibility
//! - Register base schema migrations in strictly increasing order.
//! - Add columns introduced after the initial release, only when absent.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied base version is mirrored to `PRAGMA user_version`.
//! - Additive columns are detected via `PRAGMA table_info`; a second run on
//!   the same database issues zero `ALTER TABLE` statements.
//! - Nothing is ever dropped or renamed.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_init.sql"),
}];

/// Column added after the initial release of its table.
#[derive(Debug, Clone, Copy)]
struct AdditiveColumn {
    table: &'static str,
    column: &'static str,
    definition: &'static str,
}

const ADDITIVE_COLUMNS: &[AdditiveColumn] = &[
    AdditiveColumn {
        table: "building",
        column: "planned_floors_count",
        definition: "INTEGER NOT NULL DEFAULT 0",
    },
    AdditiveColumn {
        table: "floor",
        column: "name",
        definition: "TEXT NOT NULL DEFAULT ''",
    },
    AdditiveColumn {
        table: "floor",
        column: "section_index",
        definition: "INTEGER NOT NULL DEFAULT 0",
    },
    AdditiveColumn {
        table: "floor",
        column: "position",
        definition: "INTEGER NOT NULL DEFAULT 0",
    },
    AdditiveColumn {
        table: "space",
        column: "position",
        definition: "INTEGER NOT NULL DEFAULT 0",
    },
    AdditiveColumn {
        table: "room",
        column: "ventilation_channels",
        definition: "INTEGER NOT NULL DEFAULT 1",
    },
    AdditiveColumn {
        table: "room",
        column: "ventilation_section_area",
        definition: "REAL NOT NULL DEFAULT 0.008",
    },
    AdditiveColumn {
        table: "room",
        column: "original_room_id",
        definition: "INTEGER NULL",
    },
];

/// Outcome of one schema manager run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    /// Base migration version before this run.
    pub previous_version: u32,
    /// Base migration version after this run.
    pub current_version: u32,
    /// `table.column` entries added by `ALTER TABLE` during this run.
    pub columns_added: Vec<String>,
}

impl SchemaReport {
    /// Number of `ALTER TABLE` statements executed.
    pub fn alter_count(&self) -> usize {
        self.columns_added.len()
    }

    /// Whether this run left the database unchanged.
    pub fn is_noop(&self) -> bool {
        self.previous_version == self.current_version && self.columns_added.is_empty()
    }
}

/// Returns the latest base migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Returns every `(table, column)` pair the current binary requires.
///
/// Repositories use this list to verify that a connection went through the
/// schema manager.
pub fn required_columns() -> Vec<(&'static str, &'static str)> {
    let mut columns = vec![
        ("building", "id"),
        ("building", "name"),
        ("section", "id"),
        ("section", "building_id"),
        ("section", "name"),
        ("section", "position"),
        ("floor", "id"),
        ("floor", "building_id"),
        ("floor", "number"),
        ("floor", "type"),
        ("space", "id"),
        ("space", "floor_id"),
        ("space", "identifier"),
        ("space", "type"),
        ("room", "id"),
        ("room", "space_id"),
        ("room", "name"),
        ("room", "volume"),
    ];
    columns.extend(
        ADDITIVE_COLUMNS
            .iter()
            .map(|additive| (additive.table, additive.column)),
    );
    columns
}

/// Ensures all tables and additive columns exist on the provided connection.
///
/// Idempotent: running it again on an up-to-date database changes nothing.
pub fn ensure_schema(conn: &mut Connection) -> DbResult<SchemaReport> {
    let started_at = Instant::now();
    match ensure_schema_inner(conn) {
        Ok(report) => {
            info!(
                "event=schema_ensure module=db status=ok previous_version={} current_version={} columns_added={} duration_ms={}",
                report.previous_version,
                report.current_version,
                report.alter_count(),
                started_at.elapsed().as_millis()
            );
            Ok(report)
        }
        Err(err) => {
            error!(
                "event=schema_ensure module=db status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn ensure_schema_inner(conn: &mut Connection) -> DbResult<SchemaReport> {
    let previous_version = current_user_version(conn)?;
    apply_migrations(conn, previous_version)?;
    let columns_added = apply_additive_columns(conn)?;

    Ok(SchemaReport {
        previous_version,
        current_version: current_user_version(conn)?,
        columns_added,
    })
}

fn apply_migrations(conn: &mut Connection, current_version: u32) -> DbResult<()> {
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)
            .and_then(|()| {
                tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
            })
            .map_err(|source| DbError::SchemaChange {
                step: format!("migration v{}", migration.version),
                source,
            })?;
    }
    tx.commit()?;

    Ok(())
}

fn apply_additive_columns(conn: &mut Connection) -> DbResult<Vec<String>> {
    let mut pending = Vec::new();
    for additive in ADDITIVE_COLUMNS {
        if !table_has_column(conn, additive.table, additive.column)? {
            pending.push(*additive);
        }
    }

    if pending.is_empty() {
        return Ok(Vec::new());
    }

    let tx = conn.transaction()?;
    let mut added = Vec::with_capacity(pending.len());
    for additive in pending {
        let step = format!("{}.{}", additive.table, additive.column);
        if let Err(source) = tx.execute_batch(&format!(
            "ALTER TABLE {} ADD COLUMN {} {};",
            additive.table, additive.column, additive.definition
        )) {
            return Err(DbError::SchemaChange { step, source });
        }
        added.push(step);
    }
    tx.commit()?;

    Ok(added)
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Returns whether `table` currently has `column`.
pub fn table_has_column(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Returns whether `table` exists in the main schema.
pub fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
