//! Ranking of terrain-improvement work for worker-capable units.
//!
//! Every owned city's work radius is scanned for legal activities. A
//! city's own outstanding request beats any ad-hoc find, and a tile
//! already claimed by a better-positioned unit is left alone. Wants are
//! amortized over travel plus build time before comparison.

use crate::constants::{ADJACENT_OFFSETS, ROAD_LINK_BONUS, UNWORKED_WEIGHT};
use crate::context::PlanningContext;
use crate::score::amortize;
use crate::tile::Tile;
use crate::world::{
    radius_tiles, Activity, CityProbe, PathProvider, UnitSpec, WorkOption, WorldModel,
};
use itertools::Itertools;
use log::*;

/// The chosen improvement, with the positioning data displacement checks
/// compare against.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ImprovementTarget {
    pub tile: Tile,
    pub option: WorkOption,
    pub want: f32,
    pub eta: u32,
    pub dist: u32,
}

pub struct ImprovementEvaluator;

impl ImprovementEvaluator {
    /// Best improvement `mover` could take on, or `None` when nothing
    /// yields positive want.
    pub fn best_for<G: WorldModel + PathProvider + ?Sized>(
        game: &G,
        ctx: &PlanningContext<'_>,
        mover: &UnitSpec,
    ) -> Option<ImprovementTarget> {
        let mut best_request: Option<ImprovementTarget> = None;
        let mut best_adhoc: Option<ImprovementTarget> = None;

        for city in game.player_cities(ctx.player) {
            if let Some(request) = game.worker_request(city) {
                if let Some(target) = Self::consider_value(
                    game,
                    ctx,
                    mover,
                    request.tile,
                    request.option,
                    request.want,
                ) {
                    replace_if_better(&mut best_request, target);
                }
            }

            let center = game.city_center(city);
            let radius = radius_tiles(game, center, game.radius_sq(CityProbe::Existing(city)));
            for tile in radius {
                if game.city_at(tile).is_some() || game.is_ocean(tile) {
                    continue;
                }
                if !ctx.tile_usable(game, tile) {
                    continue;
                }
                for option in game.work_options(city, tile) {
                    let base = if game.is_tile_worked(city, tile) {
                        game.worked_tile_value_after(city, tile, option)
                            - game.worked_tile_value(city, tile)
                    } else {
                        game.worked_tile_value_after(city, tile, option) * UNWORKED_WEIGHT
                    };
                    let value = base + road_bonus(game, tile, option);
                    if let Some(target) = Self::consider_value(game, ctx, mover, tile, option, value)
                    {
                        replace_if_better(&mut best_adhoc, target);
                    }
                }
            }
        }

        let best = best_request.or(best_adhoc);
        if let Some(target) = &best {
            trace!(
                "{:?} best improvement: {:?} at ({}, {}) want {:.1}",
                mover.id,
                target.option.activity,
                target.tile.x(),
                target.tile.y(),
                target.want
            );
        }
        best
    }

    fn consider_value<G: WorldModel + PathProvider + ?Sized>(
        game: &G,
        ctx: &PlanningContext<'_>,
        mover: &UnitSpec,
        tile: Tile,
        option: WorkOption,
        value: f32,
    ) -> Option<ImprovementTarget> {
        if value <= 0.0 {
            return None;
        }
        if ctx.ledger.founding_claim(tile).is_some() {
            return None;
        }
        let eta = game.path_turns(mover, tile)?;
        let dist = mover.pos.distance_to(tile) as u32;
        if !claim_contestable(ctx, mover, tile, eta, dist) {
            return None;
        }
        let delay = eta + game.activity_turns(mover, tile, option);
        let want = amortize(value, delay);
        if want <= 0.0 {
            return None;
        }
        Some(ImprovementTarget {
            tile,
            option,
            want,
            eta,
            dist,
        })
    }
}

fn replace_if_better(slot: &mut Option<ImprovementTarget>, target: ImprovementTarget) {
    match slot {
        Some(current) if current.want >= target.want => {}
        _ => *slot = Some(target),
    }
}

/// Whether `mover` may take `tile`: free tiles always, claimed tiles only
/// when the holder is strictly worse positioned. A claimed tile with no
/// en-route record is treated as held.
fn claim_contestable(
    ctx: &PlanningContext<'_>,
    mover: &UnitSpec,
    tile: Tile,
    eta: u32,
    dist: u32,
) -> bool {
    match ctx.enroute.get(&tile) {
        Some(claim) if claim.unit == mover.id => true,
        Some(claim) => !claim.holds_against(eta, dist),
        None => match ctx.ledger.work_claim(tile) {
            Some(holder) => holder == mover.id,
            None => true,
        },
    }
}

/// Extra worth of a new road segment: each pair of adjacent road ends it
/// would link, that are not already touching each other, counts once.
fn road_bonus<W: WorldModel + ?Sized>(world: &W, tile: Tile, option: WorkOption) -> f32 {
    if option.activity != Activity::Road || world.has_road(tile) {
        return 0.0;
    }
    let ends: Vec<Tile> = ADJACENT_OFFSETS
        .iter()
        .filter_map(|&(dx, dy)| tile.offset(dx, dy))
        .filter(|&t| world.in_bounds(t) && world.has_road(t))
        .collect();
    let links = ends
        .iter()
        .copied()
        .tuple_combinations()
        .filter(|&(a, b): &(Tile, Tile)| a.distance_to(b) > 1)
        .count();
    links as f32 * ROAD_LINK_BONUS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TileValueCache;
    use crate::context::EnRouteClaim;
    use crate::grid::GridWorld;
    use crate::ledger::TileReservationLedger;
    use crate::world::{PlayerId, UnitId, WorkerRequest};
    use fnv::FnvHashMap;

    fn setup(world: &mut GridWorld) -> (crate::world::CityId, UnitSpec) {
        let city = world.add_city(PlayerId(0), Tile::from_coords(5, 5));
        let unit = world.add_worker(PlayerId(0), Tile::from_coords(5, 6));
        (city, unit)
    }

    #[test]
    fn something_to_do_on_open_land() {
        let mut world = GridWorld::all_land(12, 12);
        let (_, unit) = setup(&mut world);
        let mut cache = TileValueCache::new();
        let ledger = TileReservationLedger::new();
        let enroute = FnvHashMap::default();
        let ctx = PlanningContext::for_player(&world, PlayerId(0), 1, &mut cache, &ledger, &enroute);

        let target = ImprovementEvaluator::best_for(&world, &ctx, &unit).unwrap();
        assert!(target.want > 0.0);
    }

    #[test]
    fn city_request_beats_ad_hoc_work() {
        let mut world = GridWorld::all_land(12, 12);
        let (city, unit) = setup(&mut world);
        let requested = Tile::from_coords(4, 4);
        world.set_worker_request(
            city,
            WorkerRequest {
                tile: requested,
                option: WorkOption {
                    activity: Activity::Mine,
                    extra: None,
                },
                want: 1.0,
            },
        );
        let mut cache = TileValueCache::new();
        let ledger = TileReservationLedger::new();
        let enroute = FnvHashMap::default();
        let ctx = PlanningContext::for_player(&world, PlayerId(0), 1, &mut cache, &ledger, &enroute);

        let target = ImprovementEvaluator::best_for(&world, &ctx, &unit).unwrap();
        assert_eq!(target.tile, requested);
        assert_eq!(target.option.activity, Activity::Mine);
    }

    #[test]
    fn gap_between_two_roads_prefers_a_road() {
        let mut world = GridWorld::all_land(12, 12);
        let (_, unit) = setup(&mut world);
        world.set_road(Tile::from_coords(4, 4));
        world.set_road(Tile::from_coords(6, 4));
        let mut cache = TileValueCache::new();
        let ledger = TileReservationLedger::new();
        let enroute = FnvHashMap::default();
        let ctx = PlanningContext::for_player(&world, PlayerId(0), 1, &mut cache, &ledger, &enroute);

        let target = ImprovementEvaluator::best_for(&world, &ctx, &unit).unwrap();
        assert_eq!(target.tile, Tile::from_coords(5, 4));
        assert_eq!(target.option.activity, Activity::Road);
    }

    #[test]
    fn held_claims_are_respected_and_worse_holders_displaced() {
        let mut world = GridWorld::all_land(12, 12);
        let (_, unit) = setup(&mut world);
        let mut cache = TileValueCache::new();
        let ledger = TileReservationLedger::new();
        let mut enroute = FnvHashMap::default();

        let free_pick = {
            let empty = FnvHashMap::default();
            let ctx =
                PlanningContext::for_player(&world, PlayerId(0), 1, &mut cache, &ledger, &empty);
            ImprovementEvaluator::best_for(&world, &ctx, &unit).unwrap()
        };

        // a holder already standing on the best tile keeps it
        enroute.insert(
            free_pick.tile,
            EnRouteClaim {
                unit: UnitId(99),
                eta: 0,
                dist: 0,
            },
        );
        cache.clear();
        let second_pick = {
            let ctx =
                PlanningContext::for_player(&world, PlayerId(0), 1, &mut cache, &ledger, &enroute);
            ImprovementEvaluator::best_for(&world, &ctx, &unit)
        };
        if let Some(target) = second_pick {
            assert_ne!(target.tile, free_pick.tile);
        }

        // a distant holder is outclassed and the tile stays contestable
        enroute.insert(
            free_pick.tile,
            EnRouteClaim {
                unit: UnitId(99),
                eta: 40,
                dist: 40,
            },
        );
        cache.clear();
        let contested = {
            let ctx =
                PlanningContext::for_player(&world, PlayerId(0), 1, &mut cache, &ledger, &enroute);
            ImprovementEvaluator::best_for(&world, &ctx, &unit).unwrap()
        };
        assert_eq!(contested.tile, free_pick.tile);
    }
}
