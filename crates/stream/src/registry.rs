use std::collections::{BTreeMap, BTreeSet};

use tilestream_common::TileCoord;

/// Which tiles are resident, and the loader handle for each.
///
/// Only the streamer's pass and teardown write to it.
#[derive(Debug)]
pub struct ResidencyRegistry<H> {
    tiles: BTreeMap<TileCoord, H>,
}

impl<H> Default for ResidencyRegistry<H> {
    fn default() -> Self {
        Self {
            tiles: BTreeMap::new(),
        }
    }
}

impl<H> ResidencyRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, coord: TileCoord) -> Option<&H> {
        self.tiles.get(&coord)
    }

    /// Record a freshly loaded tile. Returns the handle it displaced, if any.
    pub fn put(&mut self, coord: TileCoord, handle: H) -> Option<H> {
        self.tiles.insert(coord, handle)
    }

    pub fn remove(&mut self, coord: TileCoord) -> Option<H> {
        self.tiles.remove(&coord)
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        self.tiles.contains_key(&coord)
    }

    pub fn keys(&self) -> BTreeSet<TileCoord> {
        self.tiles.keys().copied().collect()
    }

    /// Remove every entry, returning them in coordinate order.
    pub fn clear(&mut self) -> Vec<(TileCoord, H)> {
        std::mem::take(&mut self.tiles).into_iter().collect()
    }

    pub fn count(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove() {
        let mut registry = ResidencyRegistry::new();
        assert!(registry.put(TileCoord::new(1, 2), "a").is_none());
        assert_eq!(registry.get(TileCoord::new(1, 2)), Some(&"a"));
        assert!(registry.contains(TileCoord::new(1, 2)));
        assert_eq!(registry.count(), 1);

        assert_eq!(registry.remove(TileCoord::new(1, 2)), Some("a"));
        assert!(registry.remove(TileCoord::new(1, 2)).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn coordinate_appears_once() {
        let mut registry = ResidencyRegistry::new();
        registry.put(TileCoord::new(0, 0), 1);
        assert_eq!(registry.put(TileCoord::new(0, 0), 2), Some(1));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn clear_drains_in_order() {
        let mut registry = ResidencyRegistry::new();
        registry.put(TileCoord::new(1, 0), 'b');
        registry.put(TileCoord::new(0, 3), 'a');
        let drained = registry.clear();
        assert_eq!(
            drained,
            vec![(TileCoord::new(0, 3), 'a'), (TileCoord::new(1, 0), 'b')]
        );
        assert!(registry.keys().is_empty());
    }
}
