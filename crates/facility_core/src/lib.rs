//! Core persistence engine for facility inspection projects.
//! This crate owns the building tree model, its SQLite store and the
//! project snapshot format.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod snapshot;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::{
    Building, BuildingSummary, EntityId, Floor, FloorType, NoiseMeasurementKind, NoiseSelection,
    NoiseThreshold, ProvisionalIds, Room, Section, Space, SpaceType,
};
pub use repo::building_repo::{
    BuildingRepository, RepoError, RepoResult, SqliteBuildingRepository,
};
pub use repo::side_table_repo::{
    NoiseSelectionMap, NoiseThresholdMap, SideTableRepository, SqliteSideTableRepository,
    StreetLightingMap,
};
pub use service::normalizer::normalize_for_import;
pub use service::project_service::{ProjectError, ProjectResult, ProjectService};
pub use snapshot::{ProjectSnapshot, SnapshotError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
