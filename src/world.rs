//! Collaborator seams between the planner and the host game.
//!
//! The planner consumes the world exclusively through these traits.
//! Implementations exist for both an in-game adapter and the offline
//! `grid` world used for native testing / benchmarking.

use crate::tile::Tile;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct PlayerId(pub u16);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct UnitId(pub u32);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct CityId(pub u32);

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct ContinentId(pub u16);

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct GovernmentId(pub u16);

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct ExtraId(pub u16);

bitflags! {
    /// Knowledge and behavior restrictions applied to an AI player by the
    /// difficulty layer.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Handicaps: u8 {
        const NONE = 0;
        /// Plan only with tiles the player has actually seen.
        const FOG = 1;
        /// Refuse to settle land owned by players the AI is at peace with.
        const NO_LAND_GRAB = 2;
    }
}

/// The three tile outputs the scoring model weighs.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum OutputKind {
    Food,
    Shield,
    Trade,
}

/// Terrain work a worker-capable unit can perform on a tile.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Activity {
    Irrigate,
    Mine,
    Road,
}

/// An activity plus the extra it targets (road-like activities name the
/// extra they build; pure terrain changes carry none).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct WorkOption {
    pub activity: Activity,
    pub extra: Option<ExtraId>,
}

/// City identity used when querying outputs and waste: an existing city, or
/// a hypothetical one-citizen city centered on a tile. Hypothetical queries
/// must not mutate any shared state.
#[derive(Copy, Clone, Debug)]
pub enum CityProbe {
    Existing(CityId),
    Virtual(Tile),
}

/// Snapshot of the unit properties the planner cares about.
#[derive(Copy, Clone, Debug)]
pub struct UnitSpec {
    pub id: UnitId,
    pub owner: PlayerId,
    pub pos: Tile,
    pub moves_per_turn: u32,
    /// Shield cost to produce this unit, charged against site scores.
    pub build_cost: u32,
    pub can_found: bool,
    pub can_work: bool,
    /// Hypothetical unit used when contemplating production. Only virtual
    /// units may plan around a ferry that has not been built yet.
    pub is_virtual: bool,
}

/// Properties of a ferry-role unit: a real one standing by, or the cheapest
/// buildable type when probing a hypothetical crossing.
#[derive(Copy, Clone, Debug)]
pub struct BoatSpec {
    pub build_cost: u32,
    pub moves_per_turn: u32,
}

/// An improvement a city has asked the worker pool for.
#[derive(Copy, Clone, Debug)]
pub struct WorkerRequest {
    pub tile: Tile,
    pub option: WorkOption,
    pub want: f32,
}

/// Tile, city, player, and unit queries answered by the host game.
pub trait WorldModel {
    fn map_width(&self) -> u16;
    fn map_height(&self) -> u16;

    fn in_bounds(&self, tile: Tile) -> bool {
        tile.x() < self.map_width() && tile.y() < self.map_height()
    }

    /// Landmass (or ocean body) the tile belongs to.
    fn continent(&self, tile: Tile) -> ContinentId;
    fn is_ocean(&self, tile: Tile) -> bool;
    /// True for a land tile with at least one adjacent ocean tile.
    fn is_coastal(&self, tile: Tile) -> bool;
    fn has_road(&self, tile: Tile) -> bool;
    fn tile_owner(&self, tile: Tile) -> Option<PlayerId>;

    fn at_war(&self, a: PlayerId, b: PlayerId) -> bool;
    fn is_tile_known(&self, player: PlayerId, tile: Tile) -> bool;
    fn handicaps(&self, player: PlayerId) -> Handicaps;
    /// Government the player is steering toward; scoring uses it instead of
    /// the current one so plans don't flip-flop during a revolution.
    fn target_government(&self, player: PlayerId) -> GovernmentId;
    /// (continents, oceans) the player knows of. A change invalidates every
    /// cached tile value.
    fn known_landmasses(&self, player: PlayerId) -> (u32, u32);

    fn player_cities(&self, player: PlayerId) -> Vec<CityId>;
    fn city_center(&self, city: CityId) -> Tile;
    fn city_at(&self, tile: Tile) -> Option<CityId>;
    /// Squared work radius of the probed city.
    fn radius_sq(&self, probe: CityProbe) -> u32;
    /// Output of `tile` when worked by the probed city under the given
    /// government.
    fn tile_output(
        &self,
        player: PlayerId,
        gov: GovernmentId,
        probe: CityProbe,
        tile: Tile,
        kind: OutputKind,
    ) -> u16;
    /// Corruption/waste the probed city would suffer on `amount` of the
    /// given output kind.
    fn waste_for(
        &self,
        player: PlayerId,
        gov: GovernmentId,
        probe: CityProbe,
        kind: OutputKind,
        amount: u32,
    ) -> u32;
    fn is_tile_worked(&self, city: CityId, tile: Tile) -> bool;
    /// Outstanding improvement request from the city's own planning, if any.
    fn worker_request(&self, city: CityId) -> Option<WorkerRequest>;

    fn unit(&self, unit: UnitId) -> Option<UnitSpec>;
    fn player_units(&self, player: PlayerId) -> Vec<UnitId>;
    fn can_found_city_here(&self, tile: Tile, unit: &UnitSpec) -> bool;

    /// A real ferry this unit could board near `near`, if one is standing by.
    fn available_ferry(&self, player: PlayerId, near: Tile) -> Option<BoatSpec>;
    /// Cheapest boat-role unit type the player could build right now.
    /// `None` means the role is not yet available in the tech tree.
    fn buildable_boat(&self, player: PlayerId) -> Option<BoatSpec>;

    /// Work options currently legal on `tile` for the given city.
    fn work_options(&self, city: CityId, tile: Tile) -> Vec<WorkOption>;
    /// Valuation of the tile as currently worked by the city.
    fn worked_tile_value(&self, city: CityId, tile: Tile) -> f32;
    /// Valuation of the tile once the given option completes.
    fn worked_tile_value_after(&self, city: CityId, tile: Tile, option: WorkOption) -> f32;
    /// Turns the unit needs to complete the option on the tile.
    fn activity_turns(&self, unit: &UnitSpec, tile: Tile, option: WorkOption) -> u32;
}

/// One step of a reachable-tile frontier: the tile, the cumulative movement
/// cost to enter it, and the whole turns elapsed on arrival.
#[derive(Copy, Clone, Debug)]
pub struct FrontierStep {
    pub tile: Tile,
    pub move_cost: u32,
    pub turns: u32,
}

/// Movement parameters for a frontier expansion.
#[derive(Copy, Clone, Debug)]
pub enum MovementMode {
    Ground,
    /// Land movement overlapped with a ferry crossing ocean at the given
    /// speed.
    Amphibious { ferry_moves: u32 },
}

/// Pathfinding, consumed as a lazy, finite, non-decreasing-cost sequence.
pub trait PathProvider {
    /// Frontier of tiles reachable by `mover` from its position. The
    /// iterator is finite, yields each tile at most once, and is never
    /// restarted once partially consumed.
    fn frontier<'a>(
        &'a self,
        mover: &UnitSpec,
        mode: MovementMode,
    ) -> Box<dyn Iterator<Item = FrontierStep> + 'a>;

    /// Turns for `mover` to reach `to`, or `None` if unreachable.
    fn path_turns(&self, mover: &UnitSpec, to: Tile) -> Option<u32>;
}

/// Result of a movement command.
#[derive(Copy, Clone, Debug)]
pub struct MoveOutcome {
    pub alive: bool,
    /// Position after the move; meaningless when `alive` is false.
    pub position: Tile,
}

/// Unit-movement and action execution, the only mutating surface the
/// planner drives.
pub trait UnitCommands {
    fn move_unit_toward(&mut self, unit: UnitId, to: Tile) -> MoveOutcome;
    fn found_city_at(&mut self, unit: UnitId, tile: Tile) -> bool;
    fn begin_activity(&mut self, unit: UnitId, tile: Tile, option: WorkOption);
}

/// Everything the per-turn pass needs from the host game in one object.
pub trait GameAdapter: WorldModel + PathProvider + UnitCommands {}

impl<T: WorldModel + PathProvider + UnitCommands> GameAdapter for T {}

/// Tiles within a squared radius of `center`, clipped to the map, in row
/// scan order. The center tile is included. The position of a tile in this
/// sequence is its city-relative index.
pub fn radius_tiles<W: WorldModel + ?Sized>(world: &W, center: Tile, radius_sq: u32) -> Vec<Tile> {
    let r = (radius_sq as f64).sqrt() as i32;
    let mut tiles = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if (dx * dx + dy * dy) as u32 > radius_sq {
                continue;
            }
            if let Some(tile) = center.offset(dx, dy) {
                if world.in_bounds(tile) {
                    tiles.push(tile);
                }
            }
        }
    }
    tiles
}
