//! Economic scoring of prospective city sites.
//!
//! A candidate anchor is expanded into a `PlacementCandidate` by weighting
//! every tile the settlement could work. The cache in the planning context
//! memoizes per-tile weightings; the city center is always recomputed
//! because its outputs depend on the city standing on it.

use crate::cache::TileValueEntry;
use crate::constants::*;
use crate::context::PlanningContext;
use crate::tile::Tile;
use crate::world::{radius_tiles, CityProbe, OutputKind, WorldModel};

/// Discount a future value by the compounding per-turn factor. A value
/// `delay` turns away is worth `DELAY_DISCOUNT^delay` of itself today.
pub fn amortize(value: f32, delay: u32) -> f32 {
    value * DELAY_DISCOUNT.powi(delay as i32)
}

/// Weighted worth of one tile's outputs. High-food tiles count double
/// since they feed a citizen beyond the one working them, and the result
/// shrinks with the number of overlapping reservations on the tile.
pub fn weight_outputs(food: u16, shield: u16, trade: u16, crowd: u32) -> f32 {
    let mut weighted =
        food as f32 * FOOD_WEIGHT + shield as f32 * SHIELD_WEIGHT + trade as f32 * TRADE_WEIGHT;
    if food >= FOOD_DOUBLING_MIN {
        weighted *= 2.0;
    }
    weighted / (1.0 + crowd as f32)
}

/// The best non-center tile found in a candidate's work radius.
#[derive(Copy, Clone, Debug)]
pub struct BestTile {
    pub tile: Tile,
    /// Position of the tile in the candidate's radius scan order.
    pub index: usize,
    pub entry: TileValueEntry,
}

/// A scored prospective city site. Created fresh per evaluated tile; only
/// the best of a search pass survives, and it is consumed immediately.
#[derive(Copy, Clone, Debug)]
pub struct PlacementCandidate {
    pub anchor: Tile,
    pub radius_sq: u32,
    pub center: TileValueEntry,
    pub best_other: Option<BestTile>,
    /// De-emphasized worth of every radius tile beyond center and best.
    pub remaining: f32,
    /// Weighted corruption/waste deduction already subtracted from `total`.
    pub waste: f32,
    /// Radius tiles skipped because of a hard claim or a handicap.
    pub excluded: u32,
    /// Set by the search when the candidate sits on a foreign landmass.
    pub overseas: bool,
    /// Set by the search when the crossing assumed a boat not yet built.
    pub virtual_ferry: bool,
    /// Undiscounted site value, clamped to zero.
    pub total: f32,
    /// Travel turns to the anchor, filled in by the search.
    pub turns: u32,
    /// Final want after travel discount and production costs, filled in by
    /// the search.
    pub score: f32,
}

/// Score `anchor` as a city site for the context's player.
///
/// Deterministic for a fixed cache and ledger: the probe is evaluated
/// against the world without mutating anything shared. When a city already
/// stands on the anchor the candidate values joining it, so the center's
/// own output is not counted again.
pub fn evaluate_site<W: WorldModel + ?Sized>(
    world: &W,
    ctx: &mut PlanningContext<'_>,
    anchor: Tile,
) -> PlacementCandidate {
    let (probe, joining) = match world.city_at(anchor) {
        Some(city) => (CityProbe::Existing(city), true),
        None => (CityProbe::Virtual(anchor), false),
    };
    let radius_sq = world.radius_sq(probe);
    let tiles = radius_tiles(world, anchor, radius_sq);

    let center = compute_entry(world, ctx, probe, anchor);
    let mut best_other: Option<BestTile> = None;
    let mut remaining = 0.0f32;
    let mut excluded = 0u32;

    for (index, &tile) in tiles.iter().enumerate() {
        if tile == anchor {
            continue;
        }
        if ctx.ledger.is_reserved(tile) || !ctx.tile_usable(world, tile) {
            excluded += 1;
            continue;
        }
        let entry = cached_entry(world, ctx, probe, tile);
        match best_other {
            Some(best) if best.entry.weighted >= entry.weighted => {
                remaining += entry.weighted * OUTLYING_SHARE;
            }
            Some(best) => {
                remaining += best.entry.weighted * OUTLYING_SHARE;
                best_other = Some(BestTile { tile, index, entry });
            }
            None => {
                best_other = Some(BestTile { tile, index, entry });
            }
        }
    }

    let best_entry = best_other.map(|best| best.entry);
    let baseline = match (joining, best_entry) {
        (false, Some(best)) => center.weighted + best.weighted,
        (false, None) => center.weighted,
        (true, Some(best)) => best.weighted,
        (true, None) => 0.0,
    };

    // Waste is simulated on the outputs the first citizen would bring in.
    let (shield_base, trade_base) = match (joining, best_entry) {
        (false, Some(best)) => (
            (center.shield + best.shield) as u32,
            (center.trade + best.trade) as u32,
        ),
        (false, None) => (center.shield as u32, center.trade as u32),
        (true, Some(best)) => (best.shield as u32, best.trade as u32),
        (true, None) => (0, 0),
    };
    let waste = world.waste_for(ctx.player, ctx.gov, probe, OutputKind::Shield, shield_base) as f32
        * SHIELD_WEIGHT
        + world.waste_for(ctx.player, ctx.gov, probe, OutputKind::Trade, trade_base) as f32
            * TRADE_WEIGHT;

    let total = (baseline + remaining - waste).max(0.0);

    PlacementCandidate {
        anchor,
        radius_sq,
        center,
        best_other,
        remaining,
        waste,
        excluded,
        overseas: false,
        virtual_ferry: false,
        total,
        turns: 0,
        score: total,
    }
}

/// Fetch the memoized weighting for a non-center tile, recomputing when
/// the entry is from another turn or the tile's crowding has changed
/// since it was stored.
fn cached_entry<W: WorldModel + ?Sized>(
    world: &W,
    ctx: &mut PlanningContext<'_>,
    probe: CityProbe,
    tile: Tile,
) -> TileValueEntry {
    let crowd = ctx.ledger.reservation_count(tile);
    if let Some(entry) = ctx.cache.get(tile, ctx.turn) {
        if entry.reserved == crowd {
            return *entry;
        }
    }
    let entry = compute_entry(world, ctx, probe, tile);
    ctx.cache.put(tile, entry);
    entry
}

fn compute_entry<W: WorldModel + ?Sized>(
    world: &W,
    ctx: &PlanningContext<'_>,
    probe: CityProbe,
    tile: Tile,
) -> TileValueEntry {
    let food = world.tile_output(ctx.player, ctx.gov, probe, tile, OutputKind::Food);
    let shield = world.tile_output(ctx.player, ctx.gov, probe, tile, OutputKind::Shield);
    let trade = world.tile_output(ctx.player, ctx.gov, probe, tile, OutputKind::Trade);
    let reserved = ctx.ledger.reservation_count(tile);
    TileValueEntry {
        food,
        shield,
        trade,
        weighted: weight_outputs(food, shield, trade, reserved),
        reserved,
        turn: ctx.turn,
    }
}
