//! Two-phase site selection: same-landmass first, overseas if it pays.
//!
//! Phase one walks the ground frontier. Only when its best falls short of
//! the good-enough bar does the planner price a crossing: a real ferry
//! standing by costs nothing extra, a hypothetical one charges a share of
//! its build cost and is open only to virtual units contemplated inside a
//! coastal city. A missing boat role turns into research pressure instead
//! of a plan.

use crate::constants::{FERRY_RESEARCH_WANT, GOOD_ENOUGH_SCORE};
use crate::context::PlanningContext;
use crate::frontier::FrontierSearch;
use crate::score::PlacementCandidate;
use crate::world::{PathProvider, UnitSpec, WorldModel};
use log::*;

/// Outcome of a placement pass for one unit.
#[derive(Copy, Clone, Debug, Default)]
pub struct PlacementPlan {
    pub candidate: Option<PlacementCandidate>,
    /// Raised when an overseas phase looked worth trying but no boat role
    /// is available to research-priority consumers.
    pub ferry_want: f32,
}

pub struct PlacementPlanner;

impl PlacementPlanner {
    /// Pick the best founding site reachable by `mover`, by ground or by
    /// water. Ties between the phases keep the ground result.
    pub fn plan<G: WorldModel + PathProvider + ?Sized>(
        game: &G,
        ctx: &mut PlanningContext<'_>,
        mover: &UnitSpec,
    ) -> PlacementPlan {
        let ground = FrontierSearch::ground().run(game, ctx, mover);
        if let Some(candidate) = &ground {
            if candidate.score >= GOOD_ENOUGH_SCORE {
                return PlacementPlan {
                    candidate: ground,
                    ferry_want: 0.0,
                };
            }
        }

        let mut ferry_want = 0.0;
        let crossing = if let Some(boat) = game.available_ferry(ctx.player, mover.pos) {
            FrontierSearch::amphibious(boat.moves_per_turn, 0, false).run(game, ctx, mover)
        } else if Self::may_plan_virtual_boat(game, mover) {
            match game.buildable_boat(ctx.player) {
                Some(boat) => FrontierSearch::amphibious(boat.moves_per_turn, boat.build_cost, true)
                    .run(game, ctx, mover),
                None => {
                    debug!(
                        "{:?} wants to cross but no boat role is buildable yet",
                        mover.id
                    );
                    ferry_want = FERRY_RESEARCH_WANT;
                    None
                }
            }
        } else {
            None
        };

        let candidate = match (ground, crossing) {
            (Some(g), Some(c)) if c.score > g.score => Some(c),
            (None, Some(c)) => Some(c),
            (g, _) => g,
        };
        PlacementPlan {
            candidate,
            ferry_want,
        }
    }

    /// A boat that does not exist may only be assumed by a unit that does
    /// not exist either, and only while it is imagined inside a coastal
    /// city that could build both.
    fn may_plan_virtual_boat<W: WorldModel + ?Sized>(world: &W, mover: &UnitSpec) -> bool {
        mover.is_virtual && world.city_at(mover.pos).is_some() && world.is_coastal(mover.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TileValueCache;
    use crate::ledger::TileReservationLedger;
    use crate::grid::GridWorld;
    use crate::tile::Tile;
    use crate::world::{BoatSpec, PlayerId};
    use fnv::FnvHashMap;

    /// Land strip on the left, a channel, and a rich island on the right.
    fn split_world() -> GridWorld {
        let mut world = GridWorld::all_land(13, 4);
        for x in 4..9 {
            for y in 0..4 {
                world.set_ocean(Tile::from_coords(x, y));
            }
        }
        world.fill_land_output(0, 1, 0);
        for x in 9..13 {
            for y in 0..4 {
                world.set_output(Tile::from_coords(x, y), 3, 3, 3);
            }
        }
        world
    }

    fn ctx_parts() -> (TileValueCache, TileReservationLedger, FnvHashMap<Tile, crate::context::EnRouteClaim>) {
        (
            TileValueCache::new(),
            TileReservationLedger::new(),
            FnvHashMap::default(),
        )
    }

    #[test]
    fn good_ground_site_skips_the_crossing() {
        let mut world = GridWorld::all_land(12, 12);
        let unit = world.add_founder(PlayerId(0), Tile::from_coords(5, 5));
        world.set_available_ferry(PlayerId(0), BoatSpec { build_cost: 12, moves_per_turn: 4 });
        let (mut cache, ledger, enroute) = ctx_parts();
        let mut ctx =
            PlanningContext::for_player(&world, PlayerId(0), 1, &mut cache, &ledger, &enroute);

        let plan = PlacementPlanner::plan(&world, &mut ctx, &unit);
        let candidate = plan.candidate.unwrap();
        assert!(!candidate.overseas);
        assert!(candidate.score >= GOOD_ENOUGH_SCORE);
        assert_eq!(plan.ferry_want, 0.0);
    }

    #[test]
    fn real_ferry_reaches_the_island_without_virtual_flag() {
        let mut world = split_world();
        let unit = world.add_founder(PlayerId(0), Tile::from_coords(1, 1));
        world.set_available_ferry(PlayerId(0), BoatSpec { build_cost: 12, moves_per_turn: 4 });
        let (mut cache, ledger, enroute) = ctx_parts();
        let mut ctx =
            PlanningContext::for_player(&world, PlayerId(0), 1, &mut cache, &ledger, &enroute);

        let plan = PlacementPlanner::plan(&world, &mut ctx, &unit);
        let candidate = plan.candidate.unwrap();
        assert!(candidate.overseas);
        assert!(!candidate.virtual_ferry);
    }

    #[test]
    fn real_units_never_plan_around_unbuilt_boats() {
        let mut world = split_world();
        world.add_city(PlayerId(0), Tile::from_coords(3, 1));
        let unit = world.add_founder(PlayerId(0), Tile::from_coords(3, 1));
        world.set_buildable_boat(PlayerId(0), Some(BoatSpec { build_cost: 12, moves_per_turn: 4 }));
        let (mut cache, ledger, enroute) = ctx_parts();
        let mut ctx =
            PlanningContext::for_player(&world, PlayerId(0), 1, &mut cache, &ledger, &enroute);

        let plan = PlacementPlanner::plan(&world, &mut ctx, &unit);
        if let Some(candidate) = plan.candidate {
            assert!(!candidate.virtual_ferry);
            assert!(!candidate.overseas);
        }
    }

    #[test]
    fn virtual_unit_in_coastal_city_may_assume_a_boat() {
        let mut world = split_world();
        world.add_city(PlayerId(0), Tile::from_coords(3, 1));
        let mut unit = world.add_founder(PlayerId(0), Tile::from_coords(3, 1));
        unit.is_virtual = true;
        world.set_buildable_boat(PlayerId(0), Some(BoatSpec { build_cost: 12, moves_per_turn: 4 }));
        let (mut cache, ledger, enroute) = ctx_parts();
        let mut ctx =
            PlanningContext::for_player(&world, PlayerId(0), 1, &mut cache, &ledger, &enroute);

        let plan = PlacementPlanner::plan(&world, &mut ctx, &unit);
        let candidate = plan.candidate.unwrap();
        assert!(candidate.overseas);
        assert!(candidate.virtual_ferry);
    }

    #[test]
    fn missing_boat_role_raises_research_want() {
        let mut world = split_world();
        world.add_city(PlayerId(0), Tile::from_coords(3, 1));
        let mut unit = world.add_founder(PlayerId(0), Tile::from_coords(3, 1));
        unit.is_virtual = true;
        world.set_buildable_boat(PlayerId(0), None);
        let (mut cache, ledger, enroute) = ctx_parts();
        let mut ctx =
            PlanningContext::for_player(&world, PlayerId(0), 1, &mut cache, &ledger, &enroute);

        let plan = PlacementPlanner::plan(&world, &mut ctx, &unit);
        assert_eq!(plan.ferry_want, FERRY_RESEARCH_WANT);
        if let Some(candidate) = plan.candidate {
            assert!(!candidate.overseas);
        }
    }
}
