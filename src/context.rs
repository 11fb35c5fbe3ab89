//! Per-pass planning state, threaded explicitly through every call.
//!
//! One context is built at the top of a player's settler pass and dropped
//! when the pass ends. Nothing in here is reachable through globals; the
//! scorer, frontier, and evaluators see exactly what the pass hands them.

use crate::cache::TileValueCache;
use crate::ledger::TileReservationLedger;
use crate::tile::Tile;
use crate::world::{GovernmentId, Handicaps, PlayerId, UnitId, WorldModel};
use fnv::FnvHashMap;

/// A tile claim held by a unit still traveling to it, recorded for one
/// pass so later agents can challenge it.
#[derive(Copy, Clone, Debug)]
pub struct EnRouteClaim {
    pub unit: UnitId,
    /// Turns until the claimant arrives.
    pub eta: u32,
    /// Straight-line distance from the claimant to the tile.
    pub dist: u32,
}

impl EnRouteClaim {
    /// True when this claim survives a challenger arriving after `eta`
    /// turns from `dist` tiles away. Ties keep the holder; only a strictly
    /// better-positioned challenger displaces, so the outcome does not
    /// depend on agent processing order.
    pub fn holds_against(&self, eta: u32, dist: u32) -> bool {
        (self.eta, self.dist) <= (eta, dist)
    }
}

/// Everything the planning layer reads while evaluating options for one
/// player. The ledger is read-only here; claims are committed by the
/// agent after a decision is final.
pub struct PlanningContext<'a> {
    pub player: PlayerId,
    pub turn: u32,
    /// Government the player is steering toward, fixed for the pass.
    pub gov: GovernmentId,
    pub handicaps: Handicaps,
    pub cache: &'a mut TileValueCache,
    pub ledger: &'a TileReservationLedger,
    /// Work tiles claimed by units still en route, rebuilt each pass.
    pub enroute: &'a FnvHashMap<Tile, EnRouteClaim>,
}

impl<'a> PlanningContext<'a> {
    pub fn for_player<W: WorldModel + ?Sized>(
        world: &W,
        player: PlayerId,
        turn: u32,
        cache: &'a mut TileValueCache,
        ledger: &'a TileReservationLedger,
        enroute: &'a FnvHashMap<Tile, EnRouteClaim>,
    ) -> Self {
        PlanningContext {
            player,
            turn,
            gov: world.target_government(player),
            handicaps: world.handicaps(player),
            cache,
            ledger,
            enroute,
        }
    }

    /// Whether the player's handicaps allow planning around `tile` at all.
    /// Fogged players only use tiles they have seen; peaceful players may
    /// be barred from land owned by someone they are not at war with.
    pub fn tile_usable<W: WorldModel + ?Sized>(&self, world: &W, tile: Tile) -> bool {
        if self.handicaps.contains(Handicaps::FOG) && !world.is_tile_known(self.player, tile) {
            return false;
        }
        if self.handicaps.contains(Handicaps::NO_LAND_GRAB) {
            if let Some(owner) = world.tile_owner(tile) {
                if owner != self.player && !world.at_war(self.player, owner) {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holder_keeps_tile_on_ties() {
        let claim = EnRouteClaim {
            unit: UnitId(1),
            eta: 3,
            dist: 5,
        };
        assert!(claim.holds_against(3, 5));
        assert!(claim.holds_against(3, 6));
        assert!(claim.holds_against(4, 1));
        assert!(!claim.holds_against(2, 9));
        assert!(!claim.holds_against(3, 4));
    }
}
