mod common;

use common::{assert_same_shape, row_count, sample_building};
use facility_core::db::open_db_in_memory;
use facility_core::snapshot::{self, SNAPSHOT_MAGIC};
use facility_core::{
    BuildingRepository, NoiseThreshold, NoiseThresholdMap, ProjectError, ProjectService,
    ProjectSnapshot, RepoError, Section, SideTableRepository, SnapshotError,
    SqliteBuildingRepository, SqliteSideTableRepository, StreetLightingMap,
};
use rusqlite::Connection;

const TABLES: [&str; 8] = [
    "building",
    "section",
    "floor",
    "space",
    "room",
    "street_lighting_reading",
    "noise_selection",
    "noise_threshold",
];

fn table_counts(conn: &Connection) -> Vec<i64> {
    TABLES.iter().map(|table| row_count(conn, table)).collect()
}

fn seeded_store() -> (Connection, i64) {
    let conn = open_db_in_memory().unwrap();
    let building_id = {
        let buildings = SqliteBuildingRepository::try_new(&conn).unwrap();
        let side_tables = SqliteSideTableRepository::try_new(&conn).unwrap();
        let mut building = sample_building();
        let building_id = buildings.save(&mut building).unwrap();
        side_tables
            .update_street_lighting(
                &building,
                &StreetLightingMap::from([("1|A1|Кухня".to_string(), vec![100.0, 200.0])]),
            )
            .unwrap();
        side_tables
            .update_noise_thresholds(
                &building,
                &NoiseThresholdMap::from([(
                    "1|L|Холл".to_string(),
                    NoiseThreshold {
                        day_db: 55.0,
                        night_db: 45.0,
                    },
                )]),
            )
            .unwrap();
        building_id
    };
    (conn, building_id)
}

#[test]
fn export_then_import_creates_equivalent_building() {
    let (conn, building_id) = seeded_store();
    let service = ProjectService::try_new(&conn).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.fsnap");

    service.export_to(building_id, &path).unwrap();
    let imported = service.import_from(&path).unwrap();

    assert_ne!(imported.id, building_id);
    assert!(imported.id > 0);
    let original = SqliteBuildingRepository::try_new(&conn)
        .unwrap()
        .find(building_id)
        .unwrap()
        .unwrap();
    assert_same_shape(&original, &imported);
    assert_eq!(row_count(&conn, "building"), 2);
}

#[test]
fn side_tables_follow_the_imported_tree() {
    let (conn, building_id) = seeded_store();
    let service = ProjectService::try_new(&conn).unwrap();

    let bytes = service.export_bytes(building_id).unwrap();
    let imported = service.import_bytes(&bytes).unwrap();

    let side_tables = SqliteSideTableRepository::try_new(&conn).unwrap();
    let lighting = side_tables.load_street_lighting(imported.id).unwrap();
    assert_eq!(lighting.get("1|A1|Кухня"), Some(&vec![100.0, 200.0]));
    let thresholds = side_tables.load_noise_thresholds(imported.id).unwrap();
    assert_eq!(
        thresholds.get("1|L|Холл"),
        Some(&NoiseThreshold {
            day_db: 55.0,
            night_db: 45.0
        })
    );
    assert!(side_tables
        .load_noise_selections(imported.id)
        .unwrap()
        .is_empty());
}

#[test]
fn original_room_ids_point_to_the_first_source() {
    let (conn, building_id) = seeded_store();
    let service = ProjectService::try_new(&conn).unwrap();
    let source = SqliteBuildingRepository::try_new(&conn)
        .unwrap()
        .find(building_id)
        .unwrap()
        .unwrap();
    let source_room_ids: Vec<_> = source.rooms().map(|room| Some(room.id)).collect();

    let first = service
        .import_bytes(&service.export_bytes(building_id).unwrap())
        .unwrap();
    let first_origins: Vec<_> = first.rooms().map(|room| room.original_room_id).collect();
    assert_eq!(first_origins, source_room_ids);

    let second = service
        .import_bytes(&service.export_bytes(first.id).unwrap())
        .unwrap();
    let second_origins: Vec<_> = second.rooms().map(|room| room.original_room_id).collect();
    assert_eq!(second_origins, source_room_ids);
}

#[test]
fn import_renumbers_sections_densely() {
    let conn = open_db_in_memory().unwrap();
    let service = ProjectService::try_new(&conn).unwrap();

    let mut building = sample_building();
    let mut east = Section::new("Секция 3");
    east.position = 7;
    building.sections.push(east);
    building.sections[0].position = 4;

    let imported = service
        .import_snapshot(ProjectSnapshot::new(building))
        .unwrap();
    let positions: Vec<_> = imported
        .sections
        .iter()
        .map(|section| section.position)
        .collect();
    assert_eq!(positions, vec![0, 1, 2]);
    let names: Vec<_> = imported
        .sections
        .iter()
        .map(|section| section.name.as_str())
        .collect();
    assert_eq!(names, vec!["Секция 1", "Секция 2", "Секция 3"]);
}

#[test]
fn snapshot_without_tree_is_rejected_before_any_write() {
    let (conn, _) = seeded_store();
    let service = ProjectService::try_new(&conn).unwrap();
    let before = table_counts(&conn);

    let mut empty = ProjectSnapshot::new(sample_building());
    empty.tree = None;
    let bytes = snapshot::encode(&empty).unwrap();

    let err = service.import_bytes(&bytes).unwrap_err();
    assert!(matches!(
        err,
        ProjectError::Snapshot(SnapshotError::MissingTree)
    ));
    assert_eq!(table_counts(&conn), before);
}

#[test]
fn foreign_and_truncated_files_leave_store_untouched() {
    let (conn, building_id) = seeded_store();
    let service = ProjectService::try_new(&conn).unwrap();
    let before = table_counts(&conn);
    let dir = tempfile::tempdir().unwrap();

    let foreign = dir.path().join("notes.txt");
    std::fs::write(&foreign, b"just some text").unwrap();
    let err = service.import_from(&foreign).unwrap_err();
    assert!(matches!(
        err,
        ProjectError::Snapshot(SnapshotError::UnrecognizedFormat)
    ));

    let bytes = service.export_bytes(building_id).unwrap();
    let truncated = &bytes[..SNAPSHOT_MAGIC.len() + 3];
    let err = service.import_bytes(truncated).unwrap_err();
    assert!(matches!(
        err,
        ProjectError::Snapshot(SnapshotError::Decode(_))
    ));

    let missing = dir.path().join("missing.fsnap");
    let err = service.import_from(&missing).unwrap_err();
    assert!(matches!(err, ProjectError::Snapshot(SnapshotError::Io(_))));

    assert_eq!(table_counts(&conn), before);
}

#[test]
fn failed_side_table_write_rolls_back_the_whole_import() {
    let (conn, building_id) = seeded_store();
    let service = ProjectService::try_new(&conn).unwrap();
    let bytes = service.export_bytes(building_id).unwrap();
    let before = table_counts(&conn);

    conn.execute_batch(
        "CREATE TRIGGER block_thresholds BEFORE INSERT ON noise_threshold
         BEGIN SELECT RAISE(ABORT, 'blocked'); END;",
    )
    .unwrap();

    let err = service.import_bytes(&bytes).unwrap_err();
    assert!(matches!(err, ProjectError::Repo(_)));
    assert_eq!(table_counts(&conn), before);
    assert!(conn.is_autocommit());
}

#[test]
fn export_does_not_write_to_store() {
    let (conn, building_id) = seeded_store();
    let service = ProjectService::try_new(&conn).unwrap();
    let before = table_counts(&conn);
    let dir = tempfile::tempdir().unwrap();

    let exported = service
        .export_to(building_id, &dir.path().join("copy.fsnap"))
        .unwrap();
    assert_eq!(exported.tree.as_ref().map(|tree| tree.id), Some(building_id));
    assert_eq!(table_counts(&conn), before);
}

#[test]
fn export_of_missing_building_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = ProjectService::try_new(&conn).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nothing.fsnap");

    let err = service.export_to(404, &path).unwrap_err();
    assert!(matches!(err, ProjectError::NotFound(404)));
    assert!(!path.exists());
    assert!(matches!(
        service.default_export_file_name(404),
        Err(ProjectError::NotFound(404))
    ));
}

#[test]
fn default_export_file_name_uses_sanitized_building_name() {
    let (conn, building_id) = seeded_store();
    let service = ProjectService::try_new(&conn).unwrap();

    assert_eq!(
        service.default_export_file_name(building_id).unwrap(),
        "Жилой дом _5.fsnap"
    );
}

#[test]
fn exported_file_starts_with_magic() {
    let (conn, building_id) = seeded_store();
    let service = ProjectService::try_new(&conn).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("magic.fsnap");

    service.export_to(building_id, &path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..SNAPSHOT_MAGIC.len()], SNAPSHOT_MAGIC);
}

#[test]
fn service_rejects_connection_without_schema() {
    let conn = Connection::open_in_memory().unwrap();

    let err = ProjectService::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        ProjectError::Repo(RepoError::UninitializedConnection { .. })
    ));
}

#[test]
fn one_service_handles_repeated_export_import_cycles() {
    let (conn, building_id) = seeded_store();
    let service = ProjectService::try_new(&conn).unwrap();

    let mut current = building_id;
    for _ in 0..3 {
        current = service
            .import_bytes(&service.export_bytes(current).unwrap())
            .unwrap()
            .id;
    }

    assert_eq!(row_count(&conn, "building"), 4);
    let lighting = SqliteSideTableRepository::try_new(&conn)
        .unwrap()
        .load_street_lighting(current)
        .unwrap();
    assert_eq!(lighting.get("1|A1|Кухня"), Some(&vec![100.0, 200.0]));
    assert!(conn.is_autocommit());
}
