//! Frontier walk over reachable tiles, scoring each as a city site.
//!
//! The frontier comes from the path provider as a lazy, finite,
//! non-decreasing-cost sequence and is consumed at most once. Scoring
//! stops early once a site clears the good-enough bar and the walk has
//! moved past the turn radius where that site was found; tiles at the
//! same radius may still beat it, so the walk finishes the radius first.

use crate::constants::*;
use crate::context::PlanningContext;
use crate::score::{amortize, evaluate_site, PlacementCandidate};
use crate::tile::Tile;
use crate::world::{MovementMode, PathProvider, UnitSpec, WorldModel};
use log::*;

/// One scoring sweep over a unit's reachable frontier.
pub struct FrontierSearch {
    pub mode: MovementMode,
    /// Build cost of the boat assumed for the crossing, zero for ground
    /// movement or a boat that already exists.
    pub boat_cost: u32,
    /// The crossing assumes a boat that has not been built.
    pub virtual_ferry: bool,
}

impl FrontierSearch {
    pub fn ground() -> Self {
        FrontierSearch {
            mode: MovementMode::Ground,
            boat_cost: 0,
            virtual_ferry: false,
        }
    }

    pub fn amphibious(ferry_moves: u32, boat_cost: u32, virtual_ferry: bool) -> Self {
        FrontierSearch {
            mode: MovementMode::Amphibious { ferry_moves },
            boat_cost,
            virtual_ferry,
        }
    }

    /// Walk the frontier for `mover` and return the best-scoring site, or
    /// `None` when no reachable tile can host a city.
    pub fn run<G: WorldModel + PathProvider + ?Sized>(
        &self,
        game: &G,
        ctx: &mut PlanningContext<'_>,
        mover: &UnitSpec,
    ) -> Option<PlacementCandidate> {
        let home = game.continent(mover.pos);
        let ground = matches!(self.mode, MovementMode::Ground);
        let mut best: Option<PlacementCandidate> = None;
        let mut best_turns = 0u32;
        let mut scanned = 0u32;
        let mut rejected = 0u32;

        for step in game.frontier(mover, self.mode) {
            if let Some(candidate) = &best {
                if candidate.score >= GOOD_ENOUGH_SCORE && step.turns > best_turns {
                    trace!(
                        "frontier stop: score {:.1} at turn radius {}, frontier at {}",
                        candidate.score,
                        best_turns,
                        step.turns
                    );
                    break;
                }
            }
            scanned += 1;

            if !self.accepts(game, ctx, mover, home, ground, step.tile) {
                rejected += 1;
                continue;
            }

            let mut candidate = evaluate_site(game, ctx, step.tile);
            candidate.turns = step.turns;
            candidate.overseas = game.continent(step.tile) != home;
            candidate.virtual_ferry = self.virtual_ferry;
            candidate.score = amortize(candidate.total, PERFECTION * step.turns)
                - mover.build_cost as f32
                - self.boat_cost as f32 * FERRY_COST_SHARE;

            match &best {
                Some(current) if current.score >= candidate.score => {}
                _ => {
                    best = Some(candidate);
                    best_turns = step.turns;
                }
            }
        }

        debug!(
            "frontier sweep for {:?}: scanned={}, rejected={}, best={:?}",
            mover.id,
            scanned,
            rejected,
            best.map(|c| (c.anchor.x(), c.anchor.y(), c.score))
        );
        best
    }

    fn accepts<G: WorldModel + ?Sized>(
        &self,
        game: &G,
        ctx: &PlanningContext<'_>,
        mover: &UnitSpec,
        home: crate::world::ContinentId,
        ground: bool,
        tile: Tile,
    ) -> bool {
        if ground && game.continent(tile) != home {
            return false;
        }
        if !ctx.tile_usable(game, tile) {
            return false;
        }
        if ctx.ledger.founding_claim(tile).is_some() {
            return false;
        }
        game.can_found_city_here(tile, mover)
    }
}
