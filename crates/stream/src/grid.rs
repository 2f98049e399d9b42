use glam::Vec3;
use tilestream_common::TileCoord;

/// Convert a world position to the tile containing it.
///
/// Uses floor division on X and Z so negative positions land in negative
/// tiles (`-0.5` is tile `-1`, not `0`). Y is ignored. `tile_size` must be
/// positive; the streamer validates this at construction.
///
/// A NaN component maps to `0` on that axis; infinite ones saturate to the
/// `i32` range.
pub fn tile_at(position: Vec3, tile_size: f32) -> TileCoord {
    TileCoord {
        x: (position.x / tile_size).floor() as i32,
        z: (position.z / tile_size).floor() as i32,
    }
}

/// A cell of the authored grid, each axis clamped into `[0, dimension - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    /// Clamped Z.
    pub row: u32,
    /// Clamped X.
    pub col: u32,
}

impl GridCell {
    /// Row-major index into a table of `dimension × dimension` references.
    pub fn linear_index(self, dimension: u32) -> usize {
        self.col as usize + self.row as usize * dimension as usize
    }
}

/// Clamp a tile coordinate into the authored grid.
///
/// Coordinates past an edge alias to the edge cell. This is intended: tiles
/// beyond the authored world reuse the outermost content.
pub fn clamp_to_grid(coord: TileCoord, dimension: u32) -> GridCell {
    let max = dimension.saturating_sub(1).min(i32::MAX as u32) as i32;
    GridCell {
        row: coord.z.clamp(0, max) as u32,
        col: coord.x.clamp(0, max) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_at_basic() {
        let coord = tile_at(Vec3::new(10.0, 0.0, 10.0), 16.0);
        assert_eq!(coord, TileCoord::new(0, 0));

        let coord = tile_at(Vec3::new(20.0, 0.0, -5.0), 16.0);
        assert_eq!(coord, TileCoord::new(1, -1));
    }

    #[test]
    fn tile_at_floors_negative_positions() {
        assert_eq!(tile_at(Vec3::new(-0.5, 0.0, 0.0), 500.0), TileCoord::new(-1, 0));
        assert_eq!(tile_at(Vec3::new(-500.0, 0.0, -500.1), 500.0), TileCoord::new(-1, -2));
        assert_eq!(tile_at(Vec3::new(499.9, 0.0, 500.0), 500.0), TileCoord::new(0, 1));
    }

    #[test]
    fn tile_at_ignores_height() {
        let low = tile_at(Vec3::new(501.0, -1000.0, 0.0), 500.0);
        let high = tile_at(Vec3::new(501.0, 1000.0, 0.0), 500.0);
        assert_eq!(low, high);
        assert_eq!(low, TileCoord::new(1, 0));
    }

    #[test]
    fn tile_at_is_monotonic_per_axis() {
        let mut last = i32::MIN;
        for step in -40..40 {
            let x = step as f32 * 37.5;
            let tile = tile_at(Vec3::new(x, 0.0, 0.0), 100.0);
            assert!(tile.x >= last);
            last = tile.x;
        }
    }

    #[test]
    fn tile_at_non_finite_positions() {
        assert_eq!(tile_at(Vec3::new(f32::NAN, 0.0, 750.0), 500.0), TileCoord::new(0, 1));
        assert_eq!(
            tile_at(Vec3::new(f32::INFINITY, 0.0, f32::NEG_INFINITY), 500.0),
            TileCoord::new(i32::MAX, i32::MIN)
        );
    }

    #[test]
    fn clamp_far_coordinates_to_edges() {
        let cell = clamp_to_grid(TileCoord::new(-5, 20), 10);
        assert_eq!(cell, GridCell { row: 9, col: 0 });
        assert_eq!(cell.linear_index(10), 90);
    }

    #[test]
    fn clamp_keeps_inside_coordinates() {
        let cell = clamp_to_grid(TileCoord::new(12, 3), 10);
        assert_eq!(cell, GridCell { row: 3, col: 9 });
        assert_eq!(cell.linear_index(10), 39);

        let cell = clamp_to_grid(TileCoord::new(4, 7), 10);
        assert_eq!(cell.linear_index(10), 74);
    }
}
