/// Relative priority of food output when weighting a tile. Food dominates
/// because early settlements live or die by growth.
pub const FOOD_WEIGHT: f32 = 12.0;

/// Relative priority of shield output when weighting a tile.
pub const SHIELD_WEIGHT: f32 = 8.0;

/// Relative priority of trade output when weighting a tile.
pub const TRADE_WEIGHT: f32 = 4.0;

/// A tile producing at least this much food counts double: it can feed a
/// citizen beyond the one working it.
pub const FOOD_DOUBLING_MIN: u16 = 2;

/// Per-turn compounding discount applied by `amortize`. A value one turn
/// away is worth this fraction of its undelayed value.
pub const DELAY_DISCOUNT: f32 = 0.95;

/// Multiplier on travel turns when discounting a prospective city site.
/// Higher values favor closer sites over marginally richer distant ones.
pub const PERFECTION: u32 = 3;

/// A discounted site score at or above this is good enough to found without
/// scanning the rest of the frontier.
pub const GOOD_ENOUGH_SCORE: f32 = 180.0;

/// Share of a ferry's build cost charged against an overseas candidate.
/// The boat is reusable, so one site only carries part of the price.
pub const FERRY_COST_SHARE: f32 = 1.0 / 3.0;

/// De-emphasis applied to radius tiles other than the center and the single
/// best tile. They only start mattering once the settlement has grown.
pub const OUTLYING_SHARE: f32 = 0.25;

/// Weight applied to an unworked tile's absolute value when ranking
/// improvement targets. Worked tiles score on their delta at full weight.
pub const UNWORKED_WEIGHT: f32 = 0.5;

/// Want granted per pair of road ends a new road segment would connect.
pub const ROAD_LINK_BONUS: f32 = 8.0;

/// Ferry-research want raised when an overseas phase looked worthwhile but
/// no boat role is available yet.
pub const FERRY_RESEARCH_WANT: f32 = 20.0;

/// The eight immediately adjacent offsets.
pub const ADJACENT_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];
