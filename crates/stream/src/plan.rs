use std::collections::BTreeSet;

use tilestream_common::TileCoord;

use crate::authored::AuthoredGrid;

/// All tiles within a square radius of a center tile, `(2r + 1)²` of them.
///
/// A `BTreeSet` keeps iteration sorted by coordinate so passes are
/// reproducible.
pub fn desired_set(center: TileCoord, radius: u32) -> BTreeSet<TileCoord> {
    let r = radius.min(i32::MAX as u32) as i32;
    let mut result = BTreeSet::new();
    for dx in -r..=r {
        for dz in -r..=r {
            result.insert(center.offset(dx, dz));
        }
    }
    result
}

/// Work derived from comparing the desired set against what is resident.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResidencyDiff {
    /// Desired, not resident, with authored content. Sorted.
    pub to_load: Vec<TileCoord>,
    /// Resident, no longer desired. Sorted.
    pub to_unload: Vec<TileCoord>,
    /// Desired, not resident, but past the end of the authored table.
    pub out_of_range: usize,
}

impl ResidencyDiff {
    pub fn is_empty(&self) -> bool {
        self.to_load.is_empty() && self.to_unload.is_empty()
    }
}

/// Diff the desired set against the resident set.
pub fn diff(
    desired: &BTreeSet<TileCoord>,
    resident: &BTreeSet<TileCoord>,
    grid: &AuthoredGrid,
) -> ResidencyDiff {
    let to_unload = resident.difference(desired).copied().collect();

    let mut to_load = Vec::new();
    let mut out_of_range = 0;
    for coord in desired.difference(resident) {
        if grid.has_content(*coord) {
            to_load.push(*coord);
        } else {
            out_of_range += 1;
        }
    }

    ResidencyDiff {
        to_load,
        to_unload,
        out_of_range,
    }
}
