//! Runtime configuration shared by the CLI and embedding applications.
//!
//! # Invariants
//! - Every field has a usable default; resolution never fails.
//! - Environment variable names are fixed here; front ends bind them to
//!   their own flag parsing.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "FACILITY_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "FACILITY_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "FACILITY_LOG_DIR";
pub const EXPORT_DIR_ENV: &str = "FACILITY_EXPORT_DIR";

const DEFAULT_DB_FILE_NAME: &str = "facility.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "facility-logs";

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
    /// Directory used when an export has no explicit output path.
    pub export_dir: PathBuf,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level().to_string(),
            log_dir: default_log_dir(),
            export_dir: default_export_dir(),
        }
    }
}

/// `facility.sqlite3` in the system temp directory.
pub fn default_db_path() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)
}

/// `facility-logs` in the system temp directory; always absolute.
pub fn default_log_dir() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME)
}

pub fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}
