//! Facility domain model.
//!
//! # Responsibility
//! - Define the Building → Floor → Space → Room tree and building sections.
//! - Define the auxiliary measurement values attached to rooms.
//! - Derive the stable room keys used to re-associate auxiliary data.
//!
//! # Invariants
//! - Id `0` (or any non-positive provisional id) marks a transient node.
//! - Durable ids are assigned only by the store.

pub mod building;
pub mod measurements;
pub mod provisional;
pub mod room_key;

pub use building::{
    is_durable, Building, BuildingSummary, EntityId, Floor, FloorType, Room, Section, Space,
    SpaceType, DEFAULT_VENTILATION_CHANNELS, DEFAULT_VENTILATION_SECTION_AREA, TRANSIENT_ID,
};
pub use measurements::{NoiseMeasurementKind, NoiseSelection, NoiseThreshold};
pub use provisional::ProvisionalIds;
pub use room_key::{room_key, rooms_with_keys, KeyedRoom};
