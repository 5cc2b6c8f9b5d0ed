#![allow(dead_code)]

use facility_core::{Building, Floor, FloorType, Room, Section, Space, SpaceType};

/// Two floors, three spaces, five rooms; one room without volume.
pub fn sample_building() -> Building {
    let mut building = Building::new("Жилой дом №5");
    building.planned_floors_count = 9;
    building.sections = vec![Section::new("Секция 1"), Section::new("Секция 2")];

    let mut first = Floor::new("1", FloorType::Residential);
    first.name = "Первый этаж".to_string();
    first.position = 0;

    let mut apartment = Space::new("A1", SpaceType::Apartment);
    apartment.rooms.push(Room::new("Кухня").with_volume(24.3));
    apartment.rooms.push(Room::new("Спальня"));
    let mut bath = Room::new("Ванная").with_volume(12.5);
    bath.ventilation_channels = 2;
    bath.ventilation_section_area = 0.02;
    apartment.rooms.push(bath);
    first.spaces.push(apartment);

    let mut lobby = Space::new("L", SpaceType::PublicSpace);
    lobby.position = 1;
    lobby.rooms.push(Room::new("Холл").with_volume(40.0));
    first.spaces.push(lobby);

    let mut street = Floor::new("0", FloorType::Street);
    street.position = 1;
    street.section_index = 1;
    let mut yard = Space::new("Двор", SpaceType::PublicSpace);
    yard.rooms.push(Room::new("Вход"));
    street.spaces.push(yard);

    building.floors = vec![first, street];
    building
}

/// Compares two trees ignoring store-assigned ids.
pub fn assert_same_shape(left: &Building, right: &Building) {
    assert_eq!(left.name, right.name);
    assert_eq!(left.planned_floors_count, right.planned_floors_count);
    assert_eq!(left.sections.len(), right.sections.len());
    for (l, r) in left.sections.iter().zip(&right.sections) {
        assert_eq!(l.name, r.name);
    }
    assert_eq!(left.floors.len(), right.floors.len());
    for (lf, rf) in left.floors.iter().zip(&right.floors) {
        assert_eq!(lf.number, rf.number);
        assert_eq!(lf.name, rf.name);
        assert_eq!(lf.floor_type, rf.floor_type);
        assert_eq!(lf.section_index, rf.section_index);
        assert_eq!(lf.position, rf.position);
        assert_eq!(lf.spaces.len(), rf.spaces.len());
        for (ls, rs) in lf.spaces.iter().zip(&rf.spaces) {
            assert_eq!(ls.identifier, rs.identifier);
            assert_eq!(ls.space_type, rs.space_type);
            assert_eq!(ls.position, rs.position);
            assert_eq!(ls.rooms.len(), rs.rooms.len());
            for (lr, rr) in ls.rooms.iter().zip(&rs.rooms) {
                assert_eq!(lr.name, rr.name);
                assert_eq!(lr.volume, rr.volume);
                assert_eq!(lr.ventilation_channels, rr.ventilation_channels);
                assert_eq!(lr.ventilation_section_area, rr.ventilation_section_area);
            }
        }
    }
}

pub fn row_count(conn: &rusqlite::Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
