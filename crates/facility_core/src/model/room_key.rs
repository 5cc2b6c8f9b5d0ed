//! Stable room keys for auxiliary tables.
//!
//! Numeric ids are regenerated on every import, so auxiliary data is keyed by
//! the room's labels: `"{floor number}|{space identifier}|{room name}"`.
//! Renaming any of the three labels between export and import breaks the
//! association. Separator and escape characters inside labels are escaped.

use super::building::{Building, Floor, Room, Space};

const KEY_SEPARATOR: char = '|';
const KEY_ESCAPE: char = '\\';

/// Builds the stable key for one room.
///
/// `\` and `|` inside a label are prefixed with `\`, so distinct label
/// triples never share a key. Labels without either character appear as-is.
pub fn room_key(floor_number: &str, space_identifier: &str, room_name: &str) -> String {
    let mut key =
        String::with_capacity(floor_number.len() + space_identifier.len() + room_name.len() + 2);
    push_escaped(&mut key, floor_number);
    key.push(KEY_SEPARATOR);
    push_escaped(&mut key, space_identifier);
    key.push(KEY_SEPARATOR);
    push_escaped(&mut key, room_name);
    key
}

fn push_escaped(key: &mut String, label: &str) {
    for c in label.chars() {
        if c == KEY_SEPARATOR || c == KEY_ESCAPE {
            key.push(KEY_ESCAPE);
        }
        key.push(c);
    }
}

/// One room together with its derived stable key.
#[derive(Debug, Clone, Copy)]
pub struct KeyedRoom<'a> {
    pub floor: &'a Floor,
    pub space: &'a Space,
    pub room: &'a Room,
}

impl KeyedRoom<'_> {
    pub fn key(&self) -> String {
        room_key(&self.floor.number, &self.space.identifier, &self.room.name)
    }
}

/// Walks every room of `building` in tree order with its key context.
pub fn rooms_with_keys(building: &Building) -> Vec<KeyedRoom<'_>> {
    let mut result = Vec::with_capacity(building.room_count());
    for floor in &building.floors {
        for space in &floor.spaces {
            for room in &space.rooms {
                result.push(KeyedRoom { floor, space, room });
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::{room_key, rooms_with_keys};
    use crate::model::{Building, Floor, FloorType, Room, Space, SpaceType};

    #[test]
    fn key_joins_labels_with_pipes() {
        assert_eq!(room_key("1", "A1", "Кухня"), "1|A1|Кухня");
        assert_eq!(room_key("", "", ""), "||");
    }

    #[test]
    fn separators_inside_labels_do_not_collide() {
        let split_space = room_key("1", "A|B", "C");
        let split_floor = room_key("1|A", "B", "C");
        assert_ne!(split_space, split_floor);
        assert_eq!(split_space, r"1|A\|B|C");
        assert_eq!(split_floor, r"1\|A|B|C");
        assert_ne!(room_key(r"1\", "A", "C"), room_key("1", r"\A", "C"));
        assert_eq!(room_key(r"a\b", "c", "d"), r"a\\b|c|d");
    }

    #[test]
    fn walk_follows_tree_order() {
        let mut building = Building::new("B");
        let mut floor = Floor::new("1", FloorType::Residential);
        let mut space = Space::new("A1", SpaceType::Apartment);
        space.rooms.push(Room::new("Кухня"));
        space.rooms.push(Room::new("Спальня"));
        floor.spaces.push(space);
        building.floors.push(floor);
        let mut street = Floor::new("0", FloorType::Street);
        let mut yard = Space::new("Yard", SpaceType::PublicSpace);
        yard.rooms.push(Room::new("Entrance"));
        street.spaces.push(yard);
        building.floors.push(street);

        let keys = rooms_with_keys(&building)
            .iter()
            .map(|keyed| keyed.key())
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["1|A1|Кухня", "1|A1|Спальня", "0|Yard|Entrance"]);
    }
}
