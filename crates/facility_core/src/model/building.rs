//! Building tree model.
//!
//! # Invariants
//! - Child vectors are owned by exactly one parent; list order is display
//!   order until the tree is reloaded, after which it follows `position`.
//! - `volume` is the only nullable numeric field; `None` means "not
//!   measured", which is distinct from `Some(0.0)`.
//! - `position` and `section_index` are opaque sort keys, clamped to `>= 0`
//!   whenever they are written to the store.

use serde::{Deserialize, Serialize};

/// Store-assigned row identifier.
pub type EntityId = i64;

/// Id carried by nodes that were never persisted.
pub const TRANSIENT_ID: EntityId = 0;

pub const DEFAULT_VENTILATION_CHANNELS: i32 = 1;
pub const DEFAULT_VENTILATION_SECTION_AREA: f64 = 0.008;

/// Returns whether `id` refers to a row in the store.
pub fn is_durable(id: EntityId) -> bool {
    id > TRANSIENT_ID
}

/// Purpose of a floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FloorType {
    #[default]
    Residential,
    Office,
    Public,
    Mixed,
    /// Outdoor area around the building; hosts street lighting readings.
    Street,
}

impl FloorType {
    pub const ALL: [FloorType; 5] = [
        FloorType::Residential,
        FloorType::Office,
        FloorType::Public,
        FloorType::Mixed,
        FloorType::Street,
    ];

    /// Stored representation in `floor.type`.
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Residential => "RESIDENTIAL",
            Self::Office => "OFFICE",
            Self::Public => "PUBLIC",
            Self::Mixed => "MIXED",
            Self::Street => "STREET",
        }
    }

    pub fn parse_db_str(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_db_str() == value)
    }
}

/// Kind of a space on a floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpaceType {
    #[default]
    Apartment,
    Office,
    PublicSpace,
}

impl SpaceType {
    pub const ALL: [SpaceType; 3] = [
        SpaceType::Apartment,
        SpaceType::Office,
        SpaceType::PublicSpace,
    ];

    /// Stored representation in `space.type`.
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Apartment => "APARTMENT",
            Self::Office => "OFFICE",
            Self::PublicSpace => "PUBLIC_SPACE",
        }
    }

    pub fn parse_db_str(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_db_str() == value)
    }
}

/// Root of the facility tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Building {
    pub id: EntityId,
    pub name: String,
    pub planned_floors_count: i32,
    /// Ordering entities referenced by `Floor::section_index`.
    pub sections: Vec<Section>,
    pub floors: Vec<Floor>,
}

impl Building {
    /// Creates a transient building without sections or floors.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether this value is the empty building returned for a missing id.
    pub fn is_empty(&self) -> bool {
        self.id == TRANSIENT_ID
            && self.name.is_empty()
            && self.sections.is_empty()
            && self.floors.is_empty()
    }

    pub fn space_count(&self) -> usize {
        self.floors.iter().map(|floor| floor.spaces.len()).sum()
    }

    pub fn room_count(&self) -> usize {
        self.floors
            .iter()
            .flat_map(|floor| floor.spaces.iter())
            .map(|space| space.rooms.len())
            .sum()
    }

    /// Iterates every room in tree order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.floors
            .iter()
            .flat_map(|floor| floor.spaces.iter())
            .flat_map(|space| space.rooms.iter())
    }

    /// Returns floors ordered by `position`, keeping list order for ties.
    pub fn floors_sorted(&self) -> Vec<&Floor> {
        let mut floors = self.floors.iter().collect::<Vec<_>>();
        floors.sort_by_key(|floor| floor.position);
        floors
    }
}

/// Ordering entity grouping floors; referenced by index, not by foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Section {
    pub id: EntityId,
    pub name: String,
    pub position: i32,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Floor {
    pub id: EntityId,
    /// Display label such as `1`, `-1` or `Roof`; not necessarily numeric.
    pub number: String,
    pub name: String,
    pub floor_type: FloorType,
    pub section_index: i32,
    pub position: i32,
    pub spaces: Vec<Space>,
}

impl Floor {
    pub fn new(number: impl Into<String>, floor_type: FloorType) -> Self {
        Self {
            number: number.into(),
            floor_type,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Space {
    pub id: EntityId,
    pub identifier: String,
    pub space_type: SpaceType,
    pub position: i32,
    pub rooms: Vec<Room>,
}

impl Space {
    pub fn new(identifier: impl Into<String>, space_type: SpaceType) -> Self {
        Self {
            identifier: identifier.into(),
            space_type,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: EntityId,
    pub name: String,
    pub volume: Option<f64>,
    pub ventilation_channels: i32,
    pub ventilation_section_area: f64,
    /// Id this room held when its lineage was first exported. Set once.
    pub original_room_id: Option<EntityId>,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }
}

impl Default for Room {
    fn default() -> Self {
        Self {
            id: TRANSIENT_ID,
            name: String::new(),
            volume: None,
            ventilation_channels: DEFAULT_VENTILATION_CHANNELS,
            ventilation_section_area: DEFAULT_VENTILATION_SECTION_AREA,
            original_room_id: None,
        }
    }
}

/// Lightweight listing row for stored buildings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingSummary {
    pub id: EntityId,
    pub name: String,
    pub floor_count: u32,
}
