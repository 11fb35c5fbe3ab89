//! Per-player settler pass: task state, displacement, and command issue.
//!
//! The advisor owns the long-lived per-unit tasks and the tile value
//! cache. Each turn it re-plans every settler through an explicit work
//! stack: a unit that displaces another pushes the victim's re-plan ahead
//! of its own finalization, so the victim always gets a chance to reclaim
//! the tile before the displacer commits. The stack is bounded by the
//! player's unit count, which keeps pathological claim cycles finite.

use crate::cache::TileValueCache;
use crate::context::{EnRouteClaim, PlanningContext};
use crate::improve::{ImprovementEvaluator, ImprovementTarget};
use crate::ledger::TileReservationLedger;
use crate::planner::PlacementPlanner;
use crate::score::PlacementCandidate;
use crate::tile::Tile;
use crate::world::{radius_tiles, CityId, GameAdapter, PathProvider, PlayerId, UnitId, UnitSpec, WorkOption, WorldModel};
use fnv::FnvHashMap;
use log::*;
use serde::{Deserialize, Serialize};

/// Long-lived commitment of one unit, persisted across turns.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SettlerTask {
    FoundCity { target: Tile },
    ImproveTile { target: Tile, option: WorkOption },
}

/// What happened during one settler pass.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PassReport {
    pub founded: u32,
    pub improvements_started: u32,
    pub moved: u32,
    pub idle: u32,
    pub lost: u32,
    pub displacements: u32,
    /// Highest ferry-research want raised by any unit this pass.
    pub ferry_want: f32,
}

/// Founding want computed for a city contemplating settler production.
#[derive(Copy, Clone, Debug, Default)]
pub struct FounderWant {
    pub want: f32,
    pub ferry_want: f32,
}

enum WorkItem {
    Plan(UnitId),
    Finalize(UnitId, ImprovementTarget),
}

enum Decision {
    Found(PlacementCandidate),
    Improve(ImprovementTarget),
    Idle,
}

/// Settler and worker automation for one player.
#[derive(Serialize, Deserialize)]
pub struct SettlerAdvisor {
    player: PlayerId,
    tasks: FnvHashMap<UnitId, SettlerTask>,
    /// (continents, oceans) seen at the last pass; a change voids the cache.
    known_landmasses: (u32, u32),
    #[serde(skip)]
    cache: TileValueCache,
}

impl SettlerAdvisor {
    pub fn new(player: PlayerId) -> Self {
        SettlerAdvisor {
            player,
            tasks: FnvHashMap::default(),
            known_landmasses: (0, 0),
            cache: TileValueCache::new(),
        }
    }

    pub fn task(&self, unit: UnitId) -> Option<SettlerTask> {
        self.tasks.get(&unit).copied()
    }

    /// Plan and drive every settler-capable unit for one turn.
    pub fn run_turn<G: GameAdapter + ?Sized>(
        &mut self,
        game: &mut G,
        ledger: &mut TileReservationLedger,
        turn: u32,
    ) -> PassReport {
        self.cache.clear();
        self.note_landmasses(game);
        self.prune_dead_units(game, ledger);

        let units: Vec<UnitId> = game
            .player_units(self.player)
            .into_iter()
            .filter(|&id| {
                game.unit(id)
                    .map(|spec| spec.can_found || spec.can_work)
                    .unwrap_or(false)
            })
            .collect();
        self.run_stack(game, ledger, &units, turn)
    }

    /// Re-plan a single unit outside the batch pass, after an external
    /// event invalidated its task.
    pub fn resume_unit<G: GameAdapter + ?Sized>(
        &mut self,
        game: &mut G,
        ledger: &mut TileReservationLedger,
        unit: UnitId,
        turn: u32,
    ) -> PassReport {
        self.note_landmasses(game);
        self.run_stack(game, ledger, &[unit], turn)
    }

    /// Founding want for a settler the city could produce, evaluated with
    /// a virtual unit standing at the city center. Nothing is committed.
    pub fn contemplate_founder_want<G: WorldModel + PathProvider + ?Sized>(
        &mut self,
        game: &G,
        ledger: &TileReservationLedger,
        city: CityId,
        template: &UnitSpec,
        turn: u32,
    ) -> FounderWant {
        self.note_landmasses(game);
        let probe = UnitSpec {
            owner: self.player,
            pos: game.city_center(city),
            is_virtual: true,
            ..*template
        };
        let enroute = FnvHashMap::default();
        let mut ctx =
            PlanningContext::for_player(game, self.player, turn, &mut self.cache, ledger, &enroute);
        let plan = PlacementPlanner::plan(game, &mut ctx, &probe);
        FounderWant {
            want: plan
                .candidate
                .map(|candidate| candidate.score.max(0.0))
                .unwrap_or(0.0),
            ferry_want: plan.ferry_want,
        }
    }

    /// Drop all state held for a unit that no longer exists.
    pub fn forget_unit(&mut self, ledger: &mut TileReservationLedger, unit: UnitId) {
        self.tasks.remove(&unit);
        ledger.release_all(unit);
    }

    fn note_landmasses<W: WorldModel + ?Sized>(&mut self, world: &W) {
        let landmasses = world.known_landmasses(self.player);
        if landmasses != self.known_landmasses {
            self.known_landmasses = landmasses;
            self.cache.clear();
        }
    }

    fn prune_dead_units<W: WorldModel + ?Sized>(
        &mut self,
        world: &W,
        ledger: &mut TileReservationLedger,
    ) {
        let alive = world.player_units(self.player);
        let dead: Vec<UnitId> = self
            .tasks
            .keys()
            .filter(|unit| !alive.contains(unit))
            .copied()
            .collect();
        for unit in dead {
            self.forget_unit(ledger, unit);
        }
    }

    fn run_stack<G: GameAdapter + ?Sized>(
        &mut self,
        game: &mut G,
        ledger: &mut TileReservationLedger,
        units: &[UnitId],
        turn: u32,
    ) -> PassReport {
        let mut report = PassReport::default();
        let mut enroute = self.enroute_claims(game);
        let mut stack: Vec<WorkItem> = units.iter().rev().map(|&id| WorkItem::Plan(id)).collect();
        let budget = game.player_units(self.player).len() as u32;
        let mut displacements = 0u32;

        while let Some(item) = stack.pop() {
            match item {
                WorkItem::Plan(unit) => self.plan_unit(
                    game,
                    ledger,
                    &mut enroute,
                    &mut stack,
                    &mut report,
                    &mut displacements,
                    budget,
                    unit,
                    turn,
                ),
                WorkItem::Finalize(unit, target) => {
                    self.finalize_improvement(game, ledger, &mut enroute, &mut report, unit, target)
                }
            }
        }
        debug!(
            "settler pass for {:?} turn {}: {:?}",
            self.player, turn, report
        );
        report
    }

    #[allow(clippy::too_many_arguments)]
    fn plan_unit<G: GameAdapter + ?Sized>(
        &mut self,
        game: &mut G,
        ledger: &mut TileReservationLedger,
        enroute: &mut FnvHashMap<Tile, EnRouteClaim>,
        stack: &mut Vec<WorkItem>,
        report: &mut PassReport,
        displacements: &mut u32,
        budget: u32,
        unit: UnitId,
        turn: u32,
    ) {
        let Some(spec) = game.unit(unit) else {
            self.forget_unit(ledger, unit);
            return;
        };

        if let Some(SettlerTask::FoundCity { target }) = self.tasks.get(&unit).copied() {
            if game.can_found_city_here(target, &spec) {
                self.advance_founder(game, ledger, report, spec, target);
                return;
            }
            // the site went bad while we were walking; re-plan from scratch
            debug!(
                "{:?} abandons founding at ({}, {})",
                unit,
                target.x(),
                target.y()
            );
        }

        self.tasks.remove(&unit);
        ledger.release_all(unit);
        enroute.retain(|_, claim| claim.unit != unit);

        let (decision, ferry_want) = {
            let mut ctx = PlanningContext::for_player(
                &*game,
                self.player,
                turn,
                &mut self.cache,
                &*ledger,
                &*enroute,
            );
            let improvement = if spec.can_work {
                ImprovementEvaluator::best_for(&*game, &ctx, &spec)
            } else {
                None
            };
            let (founding, ferry_want) = if spec.can_found {
                let plan = PlacementPlanner::plan(&*game, &mut ctx, &spec);
                (plan.candidate, plan.ferry_want)
            } else {
                (None, 0.0)
            };
            let decision = match (founding, improvement) {
                (Some(site), Some(work)) if site.score > 0.0 && site.score >= work.want => {
                    Decision::Found(site)
                }
                (Some(site), None) if site.score > 0.0 => Decision::Found(site),
                (_, Some(work)) => Decision::Improve(work),
                _ => Decision::Idle,
            };
            (decision, ferry_want)
        };
        report.ferry_want = report.ferry_want.max(ferry_want);

        match decision {
            Decision::Found(site) => {
                let area = radius_tiles(&*game, site.anchor, site.radius_sq);
                ledger.reserve_founding_spot(site.anchor, unit, &area);
                self.tasks
                    .insert(unit, SettlerTask::FoundCity { target: site.anchor });
                self.advance_founder(game, ledger, report, spec, site.anchor);
            }
            Decision::Improve(target) => match enroute.get(&target.tile).copied() {
                Some(claim) if claim.unit != unit => {
                    if claim.holds_against(target.eta, target.dist) {
                        // the claim got better between evaluation and commit
                        report.idle += 1;
                    } else if *displacements >= budget {
                        warn!(
                            "displacement budget exhausted, {:?} stands down at ({}, {})",
                            unit,
                            target.tile.x(),
                            target.tile.y()
                        );
                        report.idle += 1;
                    } else {
                        *displacements += 1;
                        report.displacements += 1;
                        self.displace(ledger, enroute, stack, unit, claim.unit, target);
                    }
                }
                _ => self.commit_improvement(game, ledger, enroute, report, unit, target),
            },
            Decision::Idle => {
                report.idle += 1;
            }
        }
    }

    /// Take the contested tile, queue the loser's re-plan ahead of our own
    /// finalization, and only commit if the claim survives that re-plan.
    fn displace(
        &mut self,
        ledger: &mut TileReservationLedger,
        enroute: &mut FnvHashMap<Tile, EnRouteClaim>,
        stack: &mut Vec<WorkItem>,
        unit: UnitId,
        loser: UnitId,
        target: ImprovementTarget,
    ) {
        ledger.displace_work(target.tile, unit);
        enroute.insert(
            target.tile,
            EnRouteClaim {
                unit,
                eta: target.eta,
                dist: target.dist,
            },
        );
        self.tasks.remove(&loser);
        stack.push(WorkItem::Finalize(unit, target));
        stack.push(WorkItem::Plan(loser));
    }

    fn finalize_improvement<G: GameAdapter + ?Sized>(
        &mut self,
        game: &mut G,
        ledger: &mut TileReservationLedger,
        enroute: &mut FnvHashMap<Tile, EnRouteClaim>,
        report: &mut PassReport,
        unit: UnitId,
        target: ImprovementTarget,
    ) {
        if ledger.work_claim(target.tile) != Some(unit) {
            debug!(
                "{:?} lost ({}, {}) during a re-plan, standing down",
                unit,
                target.tile.x(),
                target.tile.y()
            );
            report.idle += 1;
            return;
        }
        self.commit_improvement(game, ledger, enroute, report, unit, target);
    }

    fn commit_improvement<G: GameAdapter + ?Sized>(
        &mut self,
        game: &mut G,
        ledger: &mut TileReservationLedger,
        enroute: &mut FnvHashMap<Tile, EnRouteClaim>,
        report: &mut PassReport,
        unit: UnitId,
        target: ImprovementTarget,
    ) {
        let Some(spec) = game.unit(unit) else {
            warn!("{:?} vanished before its improvement was committed", unit);
            self.forget_unit(ledger, unit);
            return;
        };
        if ledger.work_claim(target.tile) != Some(unit) {
            ledger.reserve_work_tile(target.tile, unit);
        }
        enroute.insert(
            target.tile,
            EnRouteClaim {
                unit,
                eta: target.eta,
                dist: target.dist,
            },
        );
        self.tasks.insert(
            unit,
            SettlerTask::ImproveTile {
                target: target.tile,
                option: target.option,
            },
        );

        if spec.pos == target.tile {
            game.begin_activity(unit, target.tile, target.option);
            report.improvements_started += 1;
            return;
        }
        let outcome = game.move_unit_toward(unit, target.tile);
        if !outcome.alive {
            report.lost += 1;
            enroute.remove(&target.tile);
            self.forget_unit(ledger, unit);
            return;
        }
        report.moved += 1;
        if outcome.position == target.tile {
            game.begin_activity(unit, target.tile, target.option);
            report.improvements_started += 1;
        }
    }

    fn advance_founder<G: GameAdapter + ?Sized>(
        &mut self,
        game: &mut G,
        ledger: &mut TileReservationLedger,
        report: &mut PassReport,
        spec: UnitSpec,
        target: Tile,
    ) {
        let unit = spec.id;
        if spec.pos == target {
            self.found_now(game, ledger, report, spec, target);
            return;
        }
        let outcome = game.move_unit_toward(unit, target);
        if !outcome.alive {
            report.lost += 1;
            self.forget_unit(ledger, unit);
            return;
        }
        report.moved += 1;
        if outcome.position == target {
            match game.unit(unit) {
                Some(arrived) if game.can_found_city_here(target, &arrived) => {
                    self.found_now(game, ledger, report, arrived, target);
                }
                // founding conditions changed underfoot; next pass re-plans
                _ => {}
            }
        }
    }

    fn found_now<G: GameAdapter + ?Sized>(
        &mut self,
        game: &mut G,
        ledger: &mut TileReservationLedger,
        report: &mut PassReport,
        spec: UnitSpec,
        target: Tile,
    ) {
        if game.found_city_at(spec.id, target) {
            info!(
                "{:?} founded a city at ({}, {})",
                spec.id,
                target.x(),
                target.y()
            );
            report.founded += 1;
            self.forget_unit(ledger, spec.id);
        } else {
            // precondition held a moment ago, so the ruleset refused us
            warn!(
                "founding refused at ({}, {}) for {:?}",
                target.x(),
                target.y(),
                spec.id
            );
            self.forget_unit(ledger, spec.id);
        }
    }

    fn enroute_claims<G: WorldModel + PathProvider + ?Sized>(
        &self,
        game: &G,
    ) -> FnvHashMap<Tile, EnRouteClaim> {
        let mut claims = FnvHashMap::default();
        for (&unit, task) in &self.tasks {
            let SettlerTask::ImproveTile { target, .. } = task else {
                continue;
            };
            let Some(spec) = game.unit(unit) else {
                continue;
            };
            let eta = game.path_turns(&spec, *target).unwrap_or(u32::MAX);
            claims.insert(
                *target,
                EnRouteClaim {
                    unit,
                    eta,
                    dist: spec.pos.distance_to(*target) as u32,
                },
            );
        }
        claims
    }
}
