//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define persistence contracts for the facility tree and its side tables.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Every multi-statement write runs inside one transaction. When the caller
//!   already holds a transaction, writes join it instead of opening another.
//! - Read paths reject invalid persisted state instead of masking it.

use rusqlite::{Connection, Transaction, TransactionBehavior};

pub mod building_repo;
pub mod side_table_repo;

use building_repo::RepoResult;

/// Runs `write` atomically on `conn`.
///
/// On autocommit connections an `IMMEDIATE` transaction is opened and
/// committed only when `write` succeeds; dropping it on error rolls back.
/// Inside an existing transaction `write` runs directly and the outer scope
/// decides commit or rollback.
pub(crate) fn with_write_scope<T>(
    conn: &Connection,
    write: impl FnOnce(&Connection) -> RepoResult<T>,
) -> RepoResult<T> {
    if !conn.is_autocommit() {
        return write(conn);
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let value = write(&tx)?;
    tx.commit()?;
    Ok(value)
}
