//! Shared reservation ledger coordinating settlers of one player.
//!
//! Two claim kinds live here. A founding claim pins an anchor tile
//! exclusively and raises a soft crowding count on every tile of the
//! prospective work area, so parallel site searches drift apart instead of
//! stacking. A working claim pins a single tile for an improvement task.
//! The ledger never decides who wins a contested tile; agents do, through
//! `displace_work`, and the ledger just records the outcome.

use crate::tile::Tile;
use crate::world::UnitId;
use fnv::FnvHashMap;
use log::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FoundingClaim {
    unit: UnitId,
    /// Tiles whose crowding count this claim raised; replayed on release.
    area: Vec<Tile>,
}

/// Per-player tile reservations, persisted across turns with the tasks
/// they back.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct TileReservationLedger {
    founding: FnvHashMap<Tile, FoundingClaim>,
    working: FnvHashMap<Tile, UnitId>,
    crowd: FnvHashMap<Tile, u32>,
}

impl TileReservationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `anchor` for founding and raise crowding over `area` (the
    /// would-be work radius, anchor included). Any prior claim held by the
    /// same unit, of either kind, is released first: a unit backs at most
    /// one commitment.
    pub fn reserve_founding_spot(&mut self, anchor: Tile, unit: UnitId, area: &[Tile]) {
        self.release_all(unit);
        for &tile in area {
            *self.crowd.entry(tile).or_insert(0) += 1;
        }
        trace!(
            "unit {:?} reserves founding anchor ({}, {}) over {} tiles",
            unit,
            anchor.x(),
            anchor.y(),
            area.len()
        );
        self.founding.insert(
            anchor,
            FoundingClaim {
                unit,
                area: area.to_vec(),
            },
        );
    }

    /// Drop the founding claim anchored at `anchor`, unwinding its crowding
    /// contribution. No-op when the anchor is unclaimed.
    pub fn free_founding_spot(&mut self, anchor: Tile) {
        if let Some(claim) = self.founding.remove(&anchor) {
            self.lower_crowd(&claim.area);
        }
    }

    /// Unit holding the founding claim on `tile`, if any.
    pub fn founding_claim(&self, tile: Tile) -> Option<UnitId> {
        self.founding.get(&tile).map(|claim| claim.unit)
    }

    /// Claim `tile` for an improvement task. Releases the unit's prior
    /// claims first.
    pub fn reserve_work_tile(&mut self, tile: Tile, unit: UnitId) {
        self.release_all(unit);
        self.working.insert(tile, unit);
    }

    /// Drop the working claim on `tile`. No-op when unclaimed.
    pub fn free_work_tile(&mut self, tile: Tile) {
        self.working.remove(&tile);
    }

    /// Unit holding the working claim on `tile`, if any.
    pub fn work_claim(&self, tile: Tile) -> Option<UnitId> {
        self.working.get(&tile).copied()
    }

    /// Transfer the working claim on `tile` to `unit`, returning the unit
    /// that just lost it. The caller owes the loser a re-plan.
    pub fn displace_work(&mut self, tile: Tile, unit: UnitId) -> Option<UnitId> {
        let previous = self.working.insert(tile, unit);
        if let Some(loser) = previous {
            debug!("unit {:?} displaced {:?} from ({}, {})", unit, loser, tile.x(), tile.y());
        }
        previous
    }

    /// True when `tile` carries a hard claim: a founding anchor or a
    /// working claim. Soft crowding does not count.
    pub fn is_reserved(&self, tile: Tile) -> bool {
        self.founding.contains_key(&tile) || self.working.contains_key(&tile)
    }

    /// Soft crowding count on `tile` from surrounding founding areas.
    pub fn reservation_count(&self, tile: Tile) -> u32 {
        self.crowd.get(&tile).copied().unwrap_or(0)
    }

    /// Release every claim `unit` holds, of both kinds. Called when a unit
    /// dies, finishes its task, or re-plans from scratch.
    pub fn release_all(&mut self, unit: UnitId) {
        let anchors: Vec<Tile> = self
            .founding
            .iter()
            .filter(|(_, claim)| claim.unit == unit)
            .map(|(&anchor, _)| anchor)
            .collect();
        for anchor in anchors {
            self.free_founding_spot(anchor);
        }
        self.working.retain(|_, claimant| *claimant != unit);
    }

    fn lower_crowd(&mut self, area: &[Tile]) {
        for tile in area {
            if let Some(count) = self.crowd.get_mut(tile) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.crowd.remove(tile);
                }
            }
        }
    }
}
