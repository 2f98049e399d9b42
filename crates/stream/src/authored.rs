use tilestream_common::{ContentRef, TileCoord};

use crate::grid::{GridCell, clamp_to_grid};

/// Row-major references `Terrain_Tile_{z}_{x}` for a `dimension²` grid.
pub fn naming_table(dimension: u32) -> Vec<ContentRef> {
    (0..dimension)
        .flat_map(|z| (0..dimension).map(move |x| ContentRef(format!("Terrain_Tile_{z}_{x}"))))
        .collect()
}

/// The fixed table of authored content references, row-major.
///
/// A table may hold fewer than `dimension²` entries. Tiles whose clamped
/// index falls past the end simply have no content.
#[derive(Debug, Clone)]
pub struct AuthoredGrid {
    dimension: u32,
    references: Vec<ContentRef>,
}

impl AuthoredGrid {
    pub fn new(dimension: u32, references: Vec<ContentRef>) -> Self {
        Self {
            dimension,
            references,
        }
    }

    /// A full table named the way the offline generator names its scenes.
    pub fn from_naming(dimension: u32) -> Self {
        Self::new(dimension, naming_table(dimension))
    }

    /// Keep only the first `len` references.
    pub fn truncated(mut self, len: usize) -> Self {
        self.references.truncate(len);
        self
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// The clamped cell a tile coordinate addresses.
    pub fn cell_for(&self, coord: TileCoord) -> GridCell {
        clamp_to_grid(coord, self.dimension)
    }

    pub fn index_for(&self, coord: TileCoord) -> usize {
        self.cell_for(coord).linear_index(self.dimension)
    }

    /// Content authored for a tile, or `None` when the clamped index is past
    /// the end of the table.
    pub fn reference_for(&self, coord: TileCoord) -> Option<&ContentRef> {
        self.references.get(self.index_for(coord))
    }

    pub fn has_content(&self, coord: TileCoord) -> bool {
        self.index_for(coord) < self.references.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_is_row_major() {
        let grid = AuthoredGrid::from_naming(10);
        assert_eq!(grid.len(), 100);
        assert_eq!(
            grid.reference_for(TileCoord::new(0, 0)),
            Some(&ContentRef::new("Terrain_Tile_0_0"))
        );
        assert_eq!(
            grid.reference_for(TileCoord::new(4, 7)),
            Some(&ContentRef::new("Terrain_Tile_7_4"))
        );
    }

    #[test]
    fn out_of_range_tiles_alias_to_edge_content() {
        let grid = AuthoredGrid::from_naming(10);
        assert_eq!(grid.index_for(TileCoord::new(12, 3)), 39);
        assert_eq!(
            grid.reference_for(TileCoord::new(12, 3)),
            grid.reference_for(TileCoord::new(9, 3))
        );
        assert_eq!(
            grid.reference_for(TileCoord::new(-1, -1)),
            Some(&ContentRef::new("Terrain_Tile_0_0"))
        );
    }

    #[test]
    fn short_table_has_no_content_past_its_end() {
        let grid = AuthoredGrid::from_naming(10).truncated(95);
        assert!(grid.has_content(TileCoord::new(4, 9)));
        assert!(!grid.has_content(TileCoord::new(5, 9)));
        assert!(grid.reference_for(TileCoord::new(40, 40)).is_none());
    }
}
