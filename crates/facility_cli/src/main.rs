//! `facility` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration (flag, then `FACILITY_*` environment variable,
//!   then core default), start logging and open the store.
//! - Expose core persistence and snapshot operations as subcommands.
//!
//! # Invariants
//! - Any schema failure ends the process with a non-zero exit code before a
//!   subcommand runs.

use clap::{Parser, Subcommand};
use facility_core::db::{close_db, open_db_with_report, SchemaReport};
use facility_core::config::{
    default_db_path, default_export_dir, default_log_dir, DB_PATH_ENV, EXPORT_DIR_ENV,
    LOG_DIR_ENV, LOG_LEVEL_ENV,
};
use facility_core::{
    default_log_level, init_logging, Building, BuildingRepository, CoreConfig, EntityId,
    ProjectResult, ProjectService, SqliteBuildingRepository,
};
use log::{error, info};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "facility")]
#[command(version)]
#[command(about = "Facility inspection store: buildings, floors, spaces and rooms")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = DB_PATH_ENV, default_value_os_t = default_db_path())]
    db: PathBuf,

    /// trace|debug|info|warn|error
    #[arg(long, global = true, env = LOG_LEVEL_ENV, default_value = default_log_level())]
    log_level: String,

    /// Absolute directory for log files
    #[arg(long, global = true, env = LOG_DIR_ENV, default_value_os_t = default_log_dir())]
    log_dir: PathBuf,

    /// Directory for exports written without --out
    #[arg(long, global = true, env = EXPORT_DIR_ENV, default_value_os_t = default_export_dir())]
    export_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn into_parts(self) -> (CoreConfig, Commands) {
        let config = CoreConfig {
            db_path: self.db,
            log_level: self.log_level,
            log_dir: self.log_dir,
            export_dir: self.export_dir,
        };
        (config, self.command)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the store and print what changed
    Init,

    /// List stored buildings
    List,

    /// Print one building tree
    Show {
        /// Building id
        id: EntityId,
    },

    /// Export one building with its measurements into a snapshot file
    Export {
        /// Building id
        id: EntityId,

        /// Output file (defaults to <export dir>/<building name>.fsnap)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Import a snapshot file as a new building
    Import {
        /// Snapshot file
        path: PathBuf,
    },

    /// Delete one building with all of its rows
    Delete {
        /// Building id
        id: EntityId,
    },
}

fn main() -> ExitCode {
    let (config, command) = Cli::parse().into_parts();

    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match run(command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={}", err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: &CoreConfig) -> Result<(), Box<dyn Error>> {
    let (conn, report) = open_db_with_report(&config.db_path)?;

    match command {
        Commands::Init => print_schema_report(config, &report),
        Commands::List => {
            let buildings = SqliteBuildingRepository::try_new(&conn)?.list_buildings()?;
            if buildings.is_empty() {
                println!("no buildings");
            }
            for summary in buildings {
                println!(
                    "{:>6}  {}  ({} floors)",
                    summary.id, summary.name, summary.floor_count
                );
            }
        }
        Commands::Show { id } => {
            let building = SqliteBuildingRepository::try_new(&conn)?
                .find(id)?
                .ok_or_else(|| format!("building not found: {id}"))?;
            print_tree(&building);
        }
        Commands::Export { id, out } => {
            let service = ProjectService::try_new(&conn)?;
            let path = export_path(out, &config.export_dir, || {
                service.default_export_file_name(id)
            })?;
            let snapshot = service.export_to(id, &path)?;
            println!("exported {} -> {}", id, path.display());
            info!(
                "event=cli_export module=cli status=ok building_id={} export_id={}",
                id, snapshot.export_id
            );
        }
        Commands::Import { path } => {
            let building = ProjectService::try_new(&conn)?.import_from(&path)?;
            println!(
                "imported building {} ({} rooms)",
                building.id,
                building.room_count()
            );
        }
        Commands::Delete { id } => {
            SqliteBuildingRepository::try_new(&conn)?.delete(id)?;
            println!("deleted building {id}");
        }
    }

    close_db(conn)?;
    Ok(())
}

/// `--out` when given, otherwise the building's default file name inside
/// `export_dir`.
fn export_path(
    out: Option<PathBuf>,
    export_dir: &Path,
    default_file_name: impl FnOnce() -> ProjectResult<String>,
) -> ProjectResult<PathBuf> {
    match out {
        Some(path) => Ok(path),
        None => Ok(export_dir.join(default_file_name()?)),
    }
}

fn print_schema_report(config: &CoreConfig, report: &SchemaReport) {
    println!("store: {}", config.db_path.display());
    if report.is_noop() {
        println!("schema v{} is up to date", report.current_version);
        return;
    }
    println!(
        "schema v{} -> v{}",
        report.previous_version, report.current_version
    );
    for column in &report.columns_added {
        println!("  added column {column}");
    }
}

fn print_tree(building: &Building) {
    println!(
        "[{}] {} (planned floors: {})",
        building.id, building.name, building.planned_floors_count
    );
    for section in &building.sections {
        println!("  section {}: {}", section.position, section.name);
    }
    for floor in &building.floors {
        println!(
            "  floor [{}] {} {} {} section={}",
            floor.id,
            floor.number,
            floor.floor_type.as_db_str(),
            floor.name,
            floor.section_index
        );
        for space in &floor.spaces {
            println!(
                "    space [{}] {} {}",
                space.id,
                space.identifier,
                space.space_type.as_db_str()
            );
            for room in &space.rooms {
                let volume = room
                    .volume
                    .map_or_else(|| "-".to_string(), |volume| format!("{volume}"));
                println!(
                    "      room [{}] {} volume={} channels={} area={}",
                    room.id,
                    room.name,
                    volume,
                    room.ventilation_channels,
                    room.ventilation_section_area
                );
            }
        }
    }
}
