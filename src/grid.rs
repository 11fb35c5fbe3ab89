//! Offline world fixture for native tests and benchmarks.
//!
//! A rectangular map with per-tile terrain flags and outputs, flood-filled
//! continent ids, and a scaled-cost movement model. Implements every
//! collaborator seam, so a `GridWorld` stands in for the host game when
//! exercising the planner outside of one.

use crate::constants::ADJACENT_OFFSETS;
use crate::tile::Tile;
use crate::world::{
    Activity, BoatSpec, CityId, CityProbe, ContinentId, ExtraId, FrontierStep, GovernmentId,
    Handicaps, MoveOutcome, MovementMode, OutputKind, PathProvider, PlayerId, UnitCommands,
    UnitId, UnitSpec, WorkOption, WorkerRequest, WorldModel,
};
use bitflags::bitflags;
use fnv::{FnvHashMap, FnvHashSet};
use pathfinding::prelude::{dijkstra, dijkstra_all};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct TerrainFlags: u8 {
        const OCEAN = 1;
        const ROAD = 2;
    }
}

/// Movement costs are expressed in twelfths of a turn so land and ferry
/// speeds can mix in one search.
const MOVE_SCALE: u32 = 12;

const RADIUS_SQ: u32 = 5;

#[derive(Copy, Clone, Debug)]
struct CityRecord {
    owner: PlayerId,
    center: Tile,
}

pub struct GridWorld {
    width: u16,
    height: u16,
    terrain: Vec<TerrainFlags>,
    outputs: Vec<(u16, u16, u16)>,
    continents: Vec<ContinentId>,
    landmass_counts: (u32, u32),
    owners: FnvHashMap<Tile, PlayerId>,
    units: FnvHashMap<UnitId, UnitSpec>,
    cities: FnvHashMap<CityId, CityRecord>,
    city_tiles: FnvHashMap<Tile, CityId>,
    worked: FnvHashSet<(CityId, Tile)>,
    requests: FnvHashMap<CityId, WorkerRequest>,
    ferries: FnvHashMap<PlayerId, BoatSpec>,
    boats: FnvHashMap<PlayerId, Option<BoatSpec>>,
    handicaps: FnvHashMap<PlayerId, Handicaps>,
    hidden: FnvHashSet<(PlayerId, Tile)>,
    wars: FnvHashSet<(PlayerId, PlayerId)>,
    activities: FnvHashMap<UnitId, (Tile, WorkOption)>,
    waste_percent: u32,
    next_unit: u32,
    next_city: u32,
}

impl GridWorld {
    /// A map of nothing but grassland-like tiles producing (2, 1, 1).
    pub fn all_land(width: u16, height: u16) -> Self {
        let tiles = width as usize * height as usize;
        let mut world = GridWorld {
            width,
            height,
            terrain: vec![TerrainFlags::empty(); tiles],
            outputs: vec![(2, 1, 1); tiles],
            continents: vec![ContinentId(0); tiles],
            landmass_counts: (0, 0),
            owners: FnvHashMap::default(),
            units: FnvHashMap::default(),
            cities: FnvHashMap::default(),
            city_tiles: FnvHashMap::default(),
            worked: FnvHashSet::default(),
            requests: FnvHashMap::default(),
            ferries: FnvHashMap::default(),
            boats: FnvHashMap::default(),
            handicaps: FnvHashMap::default(),
            hidden: FnvHashSet::default(),
            wars: FnvHashSet::default(),
            activities: FnvHashMap::default(),
            waste_percent: 0,
            next_unit: 0,
            next_city: 0,
        };
        world.rebuild_continents();
        world
    }

    fn index(&self, tile: Tile) -> usize {
        tile.y() as usize * self.width as usize + tile.x() as usize
    }

    pub fn set_ocean(&mut self, tile: Tile) {
        let index = self.index(tile);
        self.terrain[index] |= TerrainFlags::OCEAN;
        self.rebuild_continents();
    }

    pub fn set_road(&mut self, tile: Tile) {
        let index = self.index(tile);
        self.terrain[index] |= TerrainFlags::ROAD;
    }

    pub fn set_output(&mut self, tile: Tile, food: u16, shield: u16, trade: u16) {
        let index = self.index(tile);
        self.outputs[index] = (food, shield, trade);
    }

    /// Overwrite the outputs of every land tile at once.
    pub fn fill_land_output(&mut self, food: u16, shield: u16, trade: u16) {
        for index in 0..self.outputs.len() {
            if !self.terrain[index].contains(TerrainFlags::OCEAN) {
                self.outputs[index] = (food, shield, trade);
            }
        }
    }

    pub fn set_owner(&mut self, tile: Tile, player: PlayerId) {
        self.owners.insert(tile, player);
    }

    pub fn set_waste_percent(&mut self, percent: u32) {
        self.waste_percent = percent;
    }

    pub fn set_available_ferry(&mut self, player: PlayerId, boat: BoatSpec) {
        self.ferries.insert(player, boat);
    }

    pub fn set_buildable_boat(&mut self, player: PlayerId, boat: Option<BoatSpec>) {
        self.boats.insert(player, boat);
    }

    pub fn set_handicaps(&mut self, player: PlayerId, handicaps: Handicaps) {
        self.handicaps.insert(player, handicaps);
    }

    pub fn hide_tile(&mut self, player: PlayerId, tile: Tile) {
        self.hidden.insert((player, tile));
    }

    pub fn set_at_war(&mut self, a: PlayerId, b: PlayerId) {
        self.wars.insert((a, b));
    }

    pub fn set_worker_request(&mut self, city: CityId, request: WorkerRequest) {
        self.requests.insert(city, request);
    }

    pub fn set_worked(&mut self, city: CityId, tile: Tile) {
        self.worked.insert((city, tile));
    }

    pub fn add_founder(&mut self, owner: PlayerId, pos: Tile) -> UnitSpec {
        self.add_unit(owner, pos, true, true, 30)
    }

    pub fn add_worker(&mut self, owner: PlayerId, pos: Tile) -> UnitSpec {
        self.add_unit(owner, pos, false, true, 20)
    }

    fn add_unit(
        &mut self,
        owner: PlayerId,
        pos: Tile,
        can_found: bool,
        can_work: bool,
        build_cost: u32,
    ) -> UnitSpec {
        let id = UnitId(self.next_unit);
        self.next_unit += 1;
        let spec = UnitSpec {
            id,
            owner,
            pos,
            moves_per_turn: 1,
            build_cost,
            can_found,
            can_work,
            is_virtual: false,
        };
        self.units.insert(id, spec);
        spec
    }

    pub fn add_city(&mut self, owner: PlayerId, center: Tile) -> CityId {
        let id = CityId(self.next_city);
        self.next_city += 1;
        self.cities.insert(id, CityRecord { owner, center });
        self.city_tiles.insert(center, id);
        id
    }

    pub fn city_count(&self) -> usize {
        self.cities.len()
    }

    /// The activity last issued to a unit, for assertions.
    pub fn activity_of(&self, unit: UnitId) -> Option<(Tile, WorkOption)> {
        self.activities.get(&unit).copied()
    }

    pub fn unit_position(&self, unit: UnitId) -> Option<Tile> {
        self.units.get(&unit).map(|spec| spec.pos)
    }

    fn rebuild_continents(&mut self) {
        self.continents = vec![ContinentId(u16::MAX); self.terrain.len()];
        let mut next = 0u16;
        let mut land = 0u32;
        let mut ocean = 0u32;
        for y in 0..self.height {
            for x in 0..self.width {
                let seed = Tile::from_coords(x, y);
                if self.continents[self.index(seed)] != ContinentId(u16::MAX) {
                    continue;
                }
                let id = ContinentId(next);
                next += 1;
                if self.terrain[self.index(seed)].contains(TerrainFlags::OCEAN) {
                    ocean += 1;
                } else {
                    land += 1;
                }
                let seed_ocean = self.terrain[self.index(seed)].contains(TerrainFlags::OCEAN);
                let mut frontier = vec![seed];
                while let Some(tile) = frontier.pop() {
                    let index = self.index(tile);
                    if self.continents[index] != ContinentId(u16::MAX) {
                        continue;
                    }
                    self.continents[index] = id;
                    for &(dx, dy) in &ADJACENT_OFFSETS {
                        if let Some(next_tile) = tile.offset(dx, dy) {
                            if self.in_bounds(next_tile)
                                && self.continents[self.index(next_tile)]
                                    == ContinentId(u16::MAX)
                                && self.terrain[self.index(next_tile)]
                                    .contains(TerrainFlags::OCEAN)
                                    == seed_ocean
                            {
                                frontier.push(next_tile);
                            }
                        }
                    }
                }
            }
        }
        self.landmass_counts = (land, ocean);
    }

    fn land_step(&self, moves_per_turn: u32) -> u32 {
        MOVE_SCALE / moves_per_turn.clamp(1, MOVE_SCALE)
    }

    fn ground_successors(&self, moves_per_turn: u32, tile: Tile) -> Vec<(Tile, u32)> {
        let step = self.land_step(moves_per_turn);
        ADJACENT_OFFSETS
            .iter()
            .filter_map(|&(dx, dy)| tile.offset(dx, dy))
            .filter(|&next| self.in_bounds(next) && !self.is_ocean(next))
            .map(|next| (next, step))
            .collect()
    }

    fn amphibious_successors(
        &self,
        moves_per_turn: u32,
        ferry_moves: u32,
        tile: Tile,
    ) -> Vec<(Tile, u32)> {
        let land = self.land_step(moves_per_turn);
        let water = self.land_step(ferry_moves);
        ADJACENT_OFFSETS
            .iter()
            .filter_map(|&(dx, dy)| tile.offset(dx, dy))
            .filter(|&next| self.in_bounds(next))
            .map(|next| {
                let step = if self.is_ocean(next) { water } else { land };
                (next, step)
            })
            .collect()
    }

    fn turns_for(cost: u32) -> u32 {
        (cost + MOVE_SCALE - 1) / MOVE_SCALE
    }
}

impl WorldModel for GridWorld {
    fn map_width(&self) -> u16 {
        self.width
    }

    fn map_height(&self) -> u16 {
        self.height
    }

    fn continent(&self, tile: Tile) -> ContinentId {
        self.continents[self.index(tile)]
    }

    fn is_ocean(&self, tile: Tile) -> bool {
        self.terrain[self.index(tile)].contains(TerrainFlags::OCEAN)
    }

    fn is_coastal(&self, tile: Tile) -> bool {
        !self.is_ocean(tile)
            && ADJACENT_OFFSETS.iter().any(|&(dx, dy)| {
                tile.offset(dx, dy)
                    .map(|next| self.in_bounds(next) && self.is_ocean(next))
                    .unwrap_or(false)
            })
    }

    fn has_road(&self, tile: Tile) -> bool {
        self.terrain[self.index(tile)].contains(TerrainFlags::ROAD)
    }

    fn tile_owner(&self, tile: Tile) -> Option<PlayerId> {
        self.owners.get(&tile).copied()
    }

    fn at_war(&self, a: PlayerId, b: PlayerId) -> bool {
        self.wars.contains(&(a, b)) || self.wars.contains(&(b, a))
    }

    fn is_tile_known(&self, player: PlayerId, tile: Tile) -> bool {
        !self.hidden.contains(&(player, tile))
    }

    fn handicaps(&self, player: PlayerId) -> Handicaps {
        self.handicaps
            .get(&player)
            .copied()
            .unwrap_or(Handicaps::NONE)
    }

    fn target_government(&self, _player: PlayerId) -> GovernmentId {
        GovernmentId(0)
    }

    fn known_landmasses(&self, _player: PlayerId) -> (u32, u32) {
        self.landmass_counts
    }

    fn player_cities(&self, player: PlayerId) -> Vec<CityId> {
        let mut cities: Vec<CityId> = self
            .cities
            .iter()
            .filter(|(_, record)| record.owner == player)
            .map(|(&id, _)| id)
            .collect();
        cities.sort();
        cities
    }

    fn city_center(&self, city: CityId) -> Tile {
        self.cities[&city].center
    }

    fn city_at(&self, tile: Tile) -> Option<CityId> {
        self.city_tiles.get(&tile).copied()
    }

    fn radius_sq(&self, _probe: CityProbe) -> u32 {
        RADIUS_SQ
    }

    fn tile_output(
        &self,
        _player: PlayerId,
        _gov: GovernmentId,
        _probe: CityProbe,
        tile: Tile,
        kind: OutputKind,
    ) -> u16 {
        let (food, shield, trade) = self.outputs[self.index(tile)];
        match kind {
            OutputKind::Food => food,
            OutputKind::Shield => shield,
            OutputKind::Trade => trade,
        }
    }

    fn waste_for(
        &self,
        _player: PlayerId,
        _gov: GovernmentId,
        _probe: CityProbe,
        _kind: OutputKind,
        amount: u32,
    ) -> u32 {
        amount * self.waste_percent / 100
    }

    fn is_tile_worked(&self, city: CityId, tile: Tile) -> bool {
        self.worked.contains(&(city, tile))
    }

    fn worker_request(&self, city: CityId) -> Option<WorkerRequest> {
        self.requests.get(&city).copied()
    }

    fn unit(&self, unit: UnitId) -> Option<UnitSpec> {
        self.units.get(&unit).copied()
    }

    fn player_units(&self, player: PlayerId) -> Vec<UnitId> {
        let mut units: Vec<UnitId> = self
            .units
            .values()
            .filter(|spec| spec.owner == player)
            .map(|spec| spec.id)
            .collect();
        units.sort();
        units
    }

    fn can_found_city_here(&self, tile: Tile, unit: &UnitSpec) -> bool {
        unit.can_found
            && self.in_bounds(tile)
            && !self.is_ocean(tile)
            && self.city_at(tile).is_none()
            && self
                .cities
                .values()
                .all(|record| record.center.distance_to(tile) >= 2)
    }

    fn available_ferry(&self, player: PlayerId, _near: Tile) -> Option<BoatSpec> {
        self.ferries.get(&player).copied()
    }

    fn buildable_boat(&self, player: PlayerId) -> Option<BoatSpec> {
        self.boats.get(&player).copied().flatten()
    }

    fn work_options(&self, _city: CityId, tile: Tile) -> Vec<WorkOption> {
        if self.is_ocean(tile) || self.city_at(tile).is_some() {
            return Vec::new();
        }
        let mut options = vec![
            WorkOption {
                activity: Activity::Irrigate,
                extra: None,
            },
            WorkOption {
                activity: Activity::Mine,
                extra: None,
            },
        ];
        if !self.has_road(tile) {
            options.push(WorkOption {
                activity: Activity::Road,
                extra: Some(ExtraId(0)),
            });
        }
        options
    }

    fn worked_tile_value(&self, _city: CityId, tile: Tile) -> f32 {
        let (food, shield, trade) = self.outputs[self.index(tile)];
        (2 * food + shield + trade) as f32
    }

    fn worked_tile_value_after(&self, city: CityId, tile: Tile, option: WorkOption) -> f32 {
        let gain = match option.activity {
            Activity::Irrigate => 3.0,
            Activity::Mine => 2.0,
            Activity::Road => 1.0,
        };
        self.worked_tile_value(city, tile) + gain
    }

    fn activity_turns(&self, _unit: &UnitSpec, _tile: Tile, _option: WorkOption) -> u32 {
        3
    }
}

impl PathProvider for GridWorld {
    fn frontier<'a>(
        &'a self,
        mover: &UnitSpec,
        mode: MovementMode,
    ) -> Box<dyn Iterator<Item = FrontierStep> + 'a> {
        let moves = mover.moves_per_turn;
        let reached = match mode {
            MovementMode::Ground => dijkstra_all(&mover.pos, |&tile: &Tile| {
                self.ground_successors(moves, tile)
            }),
            MovementMode::Amphibious { ferry_moves } => dijkstra_all(&mover.pos, |&tile: &Tile| {
                self.amphibious_successors(moves, ferry_moves, tile)
            }),
        };
        let mut steps: Vec<FrontierStep> = reached
            .into_iter()
            .map(|(tile, (_, cost))| FrontierStep {
                tile,
                move_cost: cost,
                turns: Self::turns_for(cost),
            })
            .collect();
        steps.sort_by_key(|step| (step.move_cost, step.tile.packed_repr()));
        steps.insert(
            0,
            FrontierStep {
                tile: mover.pos,
                move_cost: 0,
                turns: 0,
            },
        );
        Box::new(steps.into_iter())
    }

    fn path_turns(&self, mover: &UnitSpec, to: Tile) -> Option<u32> {
        if mover.pos == to {
            return Some(0);
        }
        let moves = mover.moves_per_turn;
        let (_, cost) = dijkstra(
            &mover.pos,
            |&tile: &Tile| self.ground_successors(moves, tile),
            |&tile| tile == to,
        )?;
        Some(Self::turns_for(cost))
    }
}

impl UnitCommands for GridWorld {
    fn move_unit_toward(&mut self, unit: UnitId, to: Tile) -> MoveOutcome {
        let Some(spec) = self.units.get(&unit).copied() else {
            return MoveOutcome {
                alive: false,
                position: to,
            };
        };
        let path = dijkstra(
            &spec.pos,
            |&tile: &Tile| self.ground_successors(spec.moves_per_turn, tile),
            |&tile| tile == to,
        );
        let position = match path {
            Some((nodes, _)) => {
                let reach = (spec.moves_per_turn as usize).min(nodes.len() - 1);
                nodes[reach]
            }
            None => spec.pos,
        };
        if let Some(stored) = self.units.get_mut(&unit) {
            stored.pos = position;
        }
        MoveOutcome {
            alive: true,
            position,
        }
    }

    fn found_city_at(&mut self, unit: UnitId, tile: Tile) -> bool {
        let Some(spec) = self.units.get(&unit).copied() else {
            return false;
        };
        if spec.pos != tile || !self.can_found_city_here(tile, &spec) {
            return false;
        }
        self.add_city(spec.owner, tile);
        self.units.remove(&unit);
        true
    }

    fn begin_activity(&mut self, unit: UnitId, tile: Tile, option: WorkOption) {
        self.activities.insert(unit, (tile, option));
    }
}
