//! End-to-end passes over the offline grid world.

use settler_foreman::grid::GridWorld;
use settler_foreman::{
    Handicaps, PlacementPlanner, PlanningContext, PlayerId, SettlerAdvisor, SettlerTask, Tile,
    TileReservationLedger, TileValueCache, UnitId, UnitSpec,
};
use fnv::FnvHashMap;

const ME: PlayerId = PlayerId(0);

/// A barren map with a single fertile spot worth settling.
fn oasis_world() -> GridWorld {
    let mut world = GridWorld::all_land(12, 12);
    world.fill_land_output(0, 0, 0);
    world.set_output(Tile::from_coords(5, 5), 3, 2, 2);
    world
}

fn plan_for(world: &GridWorld, unit: &UnitSpec) -> Option<settler_foreman::PlacementCandidate> {
    let mut cache = TileValueCache::new();
    let ledger = TileReservationLedger::new();
    let enroute = FnvHashMap::default();
    let mut ctx = PlanningContext::for_player(world, ME, 1, &mut cache, &ledger, &enroute);
    PlacementPlanner::plan(world, &mut ctx, unit).candidate
}

#[test]
fn lone_founder_settles_the_only_good_spot_on_its_continent() {
    let mut world = oasis_world();
    let unit = world.add_founder(ME, Tile::from_coords(2, 2));

    let candidate = plan_for(&world, &unit).expect("the oasis should be worth settling");
    assert!(!candidate.overseas);
    assert!(!candidate.virtual_ferry);
    assert!(candidate.anchor.sq_distance_to(Tile::from_coords(5, 5)) <= 5);

    let mut advisor = SettlerAdvisor::new(ME);
    let mut ledger = TileReservationLedger::new();
    let mut founded = 0;
    for turn in 1..12 {
        founded += advisor.run_turn(&mut world, &mut ledger, turn).founded;
    }
    assert_eq!(founded, 1);
    assert_eq!(world.city_count(), 1);
}

#[test]
fn two_founders_on_one_spot_leave_exactly_one_claim() {
    let mut world = oasis_world();
    let first = world.add_founder(ME, Tile::from_coords(2, 2));
    let second = world.add_founder(ME, Tile::from_coords(11, 11));

    let mut advisor = SettlerAdvisor::new(ME);
    let mut ledger = TileReservationLedger::new();
    advisor.run_turn(&mut world, &mut ledger, 1);

    let founding_tasks: Vec<UnitId> = [first.id, second.id]
        .into_iter()
        .filter(|&id| matches!(advisor.task(id), Some(SettlerTask::FoundCity { .. })))
        .collect();
    assert_eq!(founding_tasks.len(), 1, "exactly one founder may commit");

    let mut claims = 0;
    for x in 0..12 {
        for y in 0..12 {
            if ledger.founding_claim(Tile::from_coords(x, y)).is_some() {
                claims += 1;
            }
        }
    }
    assert_eq!(claims, 1);
}

#[test]
fn nearer_worker_wins_the_tile_regardless_of_processing_order() {
    let contested = Tile::from_coords(5, 7);

    let run = |near_first: bool| {
        let mut world = GridWorld::all_land(12, 12);
        world.add_city(ME, Tile::from_coords(5, 5));
        // make the contested tile the clear prize for both workers
        world.set_output(contested, 4, 2, 2);
        let (near, far) = if near_first {
            let near = world.add_worker(ME, contested);
            let far = world.add_worker(ME, Tile::from_coords(5, 9));
            (near, far)
        } else {
            let far = world.add_worker(ME, Tile::from_coords(5, 9));
            let near = world.add_worker(ME, contested);
            (near, far)
        };
        let mut advisor = SettlerAdvisor::new(ME);
        let mut ledger = TileReservationLedger::new();
        advisor.run_turn(&mut world, &mut ledger, 1);
        (ledger.work_claim(contested), near.id, far.id)
    };

    let (claim_a, near_a, _) = run(true);
    let (claim_b, near_b, _) = run(false);
    assert_eq!(claim_a, Some(near_a));
    assert_eq!(claim_b, Some(near_b));
}

#[test]
fn crowded_pass_terminates_with_bounded_displacement() {
    let mut world = GridWorld::all_land(12, 12);
    world.add_city(ME, Tile::from_coords(5, 5));
    let mut ids = Vec::new();
    for i in 0..5u16 {
        ids.push(world.add_worker(ME, Tile::from_coords(4 + i, 7)).id);
    }

    let mut advisor = SettlerAdvisor::new(ME);
    let mut ledger = TileReservationLedger::new();
    let report = advisor.run_turn(&mut world, &mut ledger, 1);

    assert!(report.displacements <= ids.len() as u32);
    // every worker ended the pass in a consistent state: either no task or
    // a task whose tile it actually holds
    for id in ids {
        match advisor.task(id) {
            None => {}
            Some(SettlerTask::ImproveTile { target, .. }) => {
                assert_eq!(ledger.work_claim(target), Some(id));
            }
            Some(other) => panic!("worker holds a founding task: {other:?}"),
        }
    }
}

#[test]
fn fogged_player_ignores_sites_it_has_not_seen() {
    let mut world = oasis_world();
    world.set_handicaps(ME, Handicaps::FOG);
    for x in 4..8 {
        for y in 4..8 {
            world.hide_tile(ME, Tile::from_coords(x, y));
        }
    }
    let unit = world.add_founder(ME, Tile::from_coords(2, 2));

    if let Some(candidate) = plan_for(&world, &unit) {
        assert!(candidate.score <= 0.0, "the hidden oasis must not be scored");
    }
}

#[test]
fn founding_mission_aborts_when_the_site_goes_bad() {
    let mut world = oasis_world();
    let unit = world.add_founder(ME, Tile::from_coords(1, 1));
    let mut advisor = SettlerAdvisor::new(ME);
    let mut ledger = TileReservationLedger::new();

    advisor.run_turn(&mut world, &mut ledger, 1);
    let Some(SettlerTask::FoundCity { target }) = advisor.task(unit.id) else {
        panic!("founder should be en route");
    };

    // a rival city appears next door, making the target unfoundable
    world.add_city(PlayerId(1), target);
    advisor.run_turn(&mut world, &mut ledger, 2);

    assert_ne!(
        advisor.task(unit.id),
        Some(SettlerTask::FoundCity { target }),
        "the stale mission must not survive"
    );
    assert_eq!(ledger.founding_claim(target), None);
}

#[test]
fn coastal_city_feels_founder_pressure_from_an_island() {
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
    let city = world.add_city(ME, Tile::from_coords(3, 1));
    let template = UnitSpec {
        id: UnitId(u32::MAX),
        owner: ME,
        pos: Tile::from_coords(3, 1),
        moves_per_turn: 1,
        build_cost: 30,
        can_found: true,
        can_work: false,
        is_virtual: true,
    };

    let mut advisor = SettlerAdvisor::new(ME);
    let ledger = TileReservationLedger::new();

    // no boat role yet: the city should want the research instead
    world.set_buildable_boat(ME, None);
    let want = advisor.contemplate_founder_want(&world, &ledger, city, &template, 1);
    assert!(want.ferry_want > 0.0);

    world.set_buildable_boat(
        ME,
        Some(settler_foreman::BoatSpec {
            build_cost: 12,
            moves_per_turn: 4,
        }),
    );
    let want = advisor.contemplate_founder_want(&world, &ledger, city, &template, 1);
    assert_eq!(want.ferry_want, 0.0);
    assert!(want.want > 0.0);
}
