//! Id normalization for imported trees.
//!
//! # Invariants
//! - Every id of the tree is reset to the transient marker.
//! - `original_room_id` is stamped once, from the room's durable id, and is
//!   never overwritten afterwards.
//! - Floor/space positions and `section_index` are clamped to `>= 0` but keep
//!   their gaps; sections are renumbered densely `0..n-1` in list order.
//! - Applying the normalizer twice equals applying it once.

use crate::model::{is_durable, Building, TRANSIENT_ID};

/// Prepares an imported tree for fresh insertion.
pub fn normalize_for_import(building: &mut Building) {
    building.id = TRANSIENT_ID;

    for (index, section) in building.sections.iter_mut().enumerate() {
        section.id = TRANSIENT_ID;
        section.position = i32::try_from(index).unwrap_or(i32::MAX);
    }

    for floor in &mut building.floors {
        floor.id = TRANSIENT_ID;
        floor.position = floor.position.max(0);
        floor.section_index = floor.section_index.max(0);

        for space in &mut floor.spaces {
            space.id = TRANSIENT_ID;
            space.position = space.position.max(0);

            for room in &mut space.rooms {
                if room.original_room_id.is_none() && is_durable(room.id) {
                    room.original_room_id = Some(room.id);
                }
                room.id = TRANSIENT_ID;
            }
        }
    }
}
