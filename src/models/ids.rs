use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An element identifier.
///
/// Ids are plain integers: generated ones are strictly increasing starting
/// at 1, user-supplied ones are accepted as long as they are free. Vertices,
/// edges and vertex properties each draw from their own allocator.
#[derive(Eq, PartialEq, Clone, Copy, Debug, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Id(pub u64);

impl Id {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Id {
    fn from(id: u64) -> Self {
        Id(id)
    }
}

impl FromStr for Id {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Id(s.parse()?))
    }
}
