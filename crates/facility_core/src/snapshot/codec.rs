//! Binary encoding and atomic file io for project snapshots.

use super::{ProjectSnapshot, SnapshotError, SnapshotResult};
use bincode::Options;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Leading bytes of every snapshot file.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"FSNP";

/// Upper bound for the encoded payload; guards allocation on corrupt input.
pub const MAX_SNAPSHOT_BYTES: u64 = 256 * 1024 * 1024;

fn codec_options() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_SNAPSHOT_BYTES)
}

/// Encodes a snapshot into file bytes.
pub fn encode(snapshot: &ProjectSnapshot) -> SnapshotResult<Vec<u8>> {
    let payload = codec_options()
        .serialize(snapshot)
        .map_err(SnapshotError::Encode)?;
    let mut bytes = Vec::with_capacity(SNAPSHOT_MAGIC.len() + payload.len());
    bytes.extend_from_slice(SNAPSHOT_MAGIC);
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decodes file bytes into a snapshot.
///
/// A snapshot without a tree decodes successfully; rejecting it is the
/// importer's decision.
pub fn decode(bytes: &[u8]) -> SnapshotResult<ProjectSnapshot> {
    let payload = bytes
        .strip_prefix(SNAPSHOT_MAGIC.as_slice())
        .ok_or(SnapshotError::UnrecognizedFormat)?;
    codec_options()
        .deserialize(payload)
        .map_err(SnapshotError::Decode)
}

/// Writes a snapshot through a sibling temp file and an atomic rename.
pub fn write_file(path: &Path, snapshot: &ProjectSnapshot) -> SnapshotResult<()> {
    let bytes = encode(snapshot)?;
    let temp_path = temp_sibling(path);

    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result.map_err(SnapshotError::from)
}

/// Reads and decodes a snapshot file.
pub fn read_file(path: &Path) -> SnapshotResult<ProjectSnapshot> {
    let bytes = fs::read(path)?;
    decode(&bytes)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    path.with_file_name(format!(".{file_name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::{decode, encode, read_file, write_file, SNAPSHOT_MAGIC};
    use crate::model::{Building, Floor, FloorType, Room, Space, SpaceType};
    use crate::snapshot::{ProjectSnapshot, SnapshotError};

    fn sample_snapshot() -> ProjectSnapshot {
        let mut building = Building::new("Block A");
        let mut floor = Floor::new("1", FloorType::Residential);
        let mut space = Space::new("A1", SpaceType::Apartment);
        space.rooms.push(Room::new("Кухня"));
        space.rooms.push(Room::new("Hall").with_volume(12.5));
        floor.spaces.push(space);
        building.floors.push(floor);

        let mut snapshot = ProjectSnapshot::new(building);
        snapshot
            .street_lighting
            .insert("1|A1|Кухня".to_string(), vec![100.0, 200.0]);
        snapshot
    }

    #[test]
    fn encoded_bytes_start_with_magic_and_decode_back() {
        let snapshot = sample_snapshot();
        let bytes = encode(&snapshot).unwrap();
        assert!(bytes.starts_with(SNAPSHOT_MAGIC));
        assert_eq!(decode(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn decode_rejects_foreign_and_truncated_input() {
        assert!(matches!(
            decode(b"PK\x03\x04rest"),
            Err(SnapshotError::UnrecognizedFormat)
        ));

        let bytes = encode(&sample_snapshot()).unwrap();
        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(decode(truncated), Err(SnapshotError::Decode(_))));
    }

    #[test]
    fn write_file_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("block.fsnap");
        let snapshot = sample_snapshot();

        write_file(&path, &snapshot).unwrap();

        assert_eq!(read_file(&path).unwrap(), snapshot);
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn read_file_reports_missing_file_as_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_file(&dir.path().join("absent.fsnap")).unwrap_err();
        assert!(matches!(err, SnapshotError::Io(_)));
    }
}
