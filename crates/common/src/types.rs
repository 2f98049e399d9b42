use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell in the unbounded tile grid (ignoring the Y axis).
///
/// Ordering is by `x`, then `z`, which gives every tile list produced by the
/// streamer a stable iteration order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileCoord {
    pub x: i32,
    pub z: i32,
}

impl TileCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The coordinate `dx` tiles along X and `dz` tiles along Z from this one.
    ///
    /// Saturates at the edges of the `i32` range.
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            z: self.z.saturating_add(dz),
        }
    }
}

impl From<(i32, i32)> for TileCoord {
    fn from((x, z): (i32, i32)) -> Self {
        Self { x, z }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Reference to one authored content unit, as understood by the loader service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(pub String);

impl ContentRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
