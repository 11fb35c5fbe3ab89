//! Per-player memo of tile yield computations.
//!
//! Weighting a tile means asking the world model for three outputs under a
//! hypothetical city, which is the hot path of site scoring. Entries are
//! value types stored directly in a tile-keyed map and are valid only for
//! the turn they were computed on; a read from another turn is a miss.
//! Stale entries are never eagerly pruned -- they self-heal on the next
//! `put` for the same tile.

use crate::tile::Tile;
use fnv::FnvHashMap;
use log::*;

/// Cached weighting of a single tile.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TileValueEntry {
    pub food: u16,
    pub shield: u16,
    pub trade: u16,
    /// Weighted sum of the three outputs, crowding discount applied.
    pub weighted: f32,
    /// Reservation crowding on the tile when the entry was computed. A
    /// mismatch against the current ledger makes the entry unusable even
    /// within its turn.
    pub reserved: u32,
    /// Turn the entry was computed on.
    pub turn: u32,
}

/// Turn-stamped memo of tile weightings for one player.
///
/// City-center tiles are never stored here: city identity and radius can
/// change their outputs, so callers recompute them every time.
#[derive(Default)]
pub struct TileValueCache {
    entries: FnvHashMap<Tile, TileValueEntry>,
    hits: u64,
    stale: u64,
    misses: u64,
}

impl TileValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the entry for `tile`, treating entries from any other turn
    /// as absent.
    pub fn get(&mut self, tile: Tile, turn: u32) -> Option<&TileValueEntry> {
        match self.entries.get(&tile) {
            Some(entry) if entry.turn == turn => {
                self.hits += 1;
                Some(entry)
            }
            Some(_) => {
                self.stale += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store an entry, replacing any prior one for the tile.
    pub fn put(&mut self, tile: Tile, entry: TileValueEntry) {
        self.entries.insert(tile, entry);
    }

    /// Drop every entry. Called once per turn before a scan and whenever
    /// the player's known continent/ocean counts change; there is no
    /// per-key invalidation because global events (terrain, government)
    /// are not individually tracked.
    pub fn clear(&mut self) {
        if self.hits + self.stale + self.misses > 0 {
            debug!(
                "tile value cache cleared: entries={}, hits={}, stale={}, misses={}",
                self.entries.len(),
                self.hits,
                self.stale,
                self.misses
            );
        }
        self.entries.clear();
        self.hits = 0;
        self.stale = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(turn: u32) -> TileValueEntry {
        TileValueEntry {
            food: 2,
            shield: 1,
            trade: 1,
            weighted: 36.0,
            reserved: 0,
            turn,
        }
    }

    #[test]
    fn get_after_put_same_turn_returns_stored_entry() {
        let mut cache = TileValueCache::new();
        let tile = Tile::from_coords(4, 7);
        cache.put(tile, entry(10));
        assert_eq!(cache.get(tile, 10), Some(&entry(10)));
    }

    #[test]
    fn get_after_turn_advance_is_a_miss() {
        let mut cache = TileValueCache::new();
        let tile = Tile::from_coords(4, 7);
        cache.put(tile, entry(10));
        assert_eq!(cache.get(tile, 11), None);
        // the stale entry is still resident until overwritten
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn stale_entry_heals_on_put() {
        let mut cache = TileValueCache::new();
        let tile = Tile::from_coords(4, 7);
        cache.put(tile, entry(10));
        cache.put(tile, entry(11));
        assert_eq!(cache.get(tile, 11), Some(&entry(11)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let mut cache = TileValueCache::new();
        cache.put(Tile::from_coords(1, 1), entry(3));
        cache.put(Tile::from_coords(2, 2), entry(3));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(Tile::from_coords(1, 1), 3), None);
    }
}
