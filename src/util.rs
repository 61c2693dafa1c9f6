//! Small helpers shared across the crate.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::Id;

/// Allocates element identifiers.
///
/// Generated ids are strictly increasing integers starting at 1. User
/// supplied ids can be reserved, which bumps the high-water mark so that
/// generated ids never collide with them.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Yields the next unused id.
    pub fn next_id(&mut self) -> Id {
        let id = Id(self.next);
        self.next += 1;
        id
    }

    /// Marks a user-supplied id as taken.
    pub fn reserve(&mut self, id: Id) {
        if id.0 >= self.next {
            self.next = id.0 + 1;
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Milliseconds since the unix epoch; used to stamp codec headers.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
