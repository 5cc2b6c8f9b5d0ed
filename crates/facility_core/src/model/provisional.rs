//! Session-scoped provisional ids for nodes that are not yet persisted.
//!
//! # Invariants
//! - Issued ids are strictly negative and strictly decreasing.
//! - Each generator owns its own counter; two editing sessions never
//!   observe each other's ids.

use super::building::EntityId;

/// Hands out provisional identities within one tree-construction session.
#[derive(Debug, Clone)]
pub struct ProvisionalIds {
    next: EntityId,
}

impl ProvisionalIds {
    pub fn new() -> Self {
        Self { next: -1 }
    }

    /// Returns the next unused provisional id.
    pub fn next_id(&mut self) -> EntityId {
        let id = self.next;
        self.next = self.next.saturating_sub(1);
        id
    }

    /// Whether an id was produced by a provisional generator.
    pub fn is_provisional(id: EntityId) -> bool {
        id < 0
    }
}

impl Default for ProvisionalIds {
    fn default() -> Self {
        Self::new()
    }
}
