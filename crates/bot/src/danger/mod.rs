//! Grid danger evaluation.
//!
//! `evaluate_danger` answers the one question every tactical decision
//! reduces to: how much harm can the roster do to a given cell over the
//! next `turns` agent-turns? The answer aggregates, per live actor, the
//! worse of its melee and ranged threat, adjusted for relative speed,
//! reachability, and observed status, on top of the ambient fear the
//! sensing layer remembers for the area.
//!
//! Everything here is pure integer arithmetic over the snapshot and the
//! evaluation context. Two calls with the same inputs return the same
//! value; nothing is mutated.

mod melee;
mod ranged;

pub(crate) use melee::melee_threat;
pub(crate) use ranged::ranged_threat;

use gloom_core::{
    ActorId, Position, ProjectionOracle, RaceFlags, StatusFlags, WorldSnapshot,
    energy_per_game_turn, game_turns_per_move,
};

use crate::context::{EvalContext, Flag};

/// Upper bound on any danger value. Stacked multipliers saturate here
/// instead of blowing up comparisons downstream.
pub const DANGER_CEILING: i32 = 2000;

/// Character level at which sleeping actors stop being terrifying.
pub(crate) const EXPERIENCED_LEVEL: i32 = 25;

/// Below this character level, breeders and escorted actors get threat
/// multipliers: crowds are disproportionately lethal to a weak agent.
pub(crate) const WEAK_LEVEL: i32 = 20;

/// Regional fear is ignored below this depth; the map there is too hot for
/// remembered threat to mean anything.
const REGIONAL_FEAR_DEPTH_LIMIT: i32 = 80;

/// The final dungeon level, where ambient fear saturates.
const BOTTOM_DEPTH: i32 = 100;

/// Ambient fear ceiling on the final level.
const BOTTOM_FEAR_CAP: i32 = 300;

/// Effective agent speed is clamped when very fast; an extremely fast
/// agent otherwise divides away the danger of slow heavy hitters that will
/// still, eventually, land one catastrophic turn.
const SPEEDY_AGENT_CLAMP: i32 = 135;

/// Danger of the given cell, aggregated over the whole roster.
///
/// # Arguments
///
/// * `cell` - grid cell being evaluated
/// * `turns` - how many agent-turns of exposure to price in
/// * `averaged` - average an actor's repertoire instead of taking the
///   worst ability (see [`ranged_threat`] for the peak override)
/// * `full_damage` - skip hit/cast probability discounts and price worst
///   case damage
///
/// Out-of-map cells are maximally dangerous, never safe.
pub fn evaluate_danger(
    world: &WorldSnapshot,
    proj: &dyn ProjectionOracle,
    ctx: &EvalContext,
    cell: Position,
    turns: i32,
    averaged: bool,
    full_damage: bool,
) -> i32 {
    if !world.map.in_bounds(cell) {
        return DANGER_CEILING;
    }

    let mut total = 0;

    // Ambient fear, scaled by exposure. Vaults are excluded by policy:
    // their fear readings are stale echoes of the treasure guardians.
    if !world.in_vault(cell) {
        let mut regional = world.fear.region_fear(cell) * turns;
        if world.depth > REGIONAL_FEAR_DEPTH_LIMIT {
            // Deep levels are all remembered dread; it carries no signal
            // there, except a capped echo on the final floor.
            regional = if world.depth >= BOTTOM_DEPTH {
                regional.min(BOTTOM_FEAR_CAP)
            } else {
                0
            };
        }
        total += regional;
        total += world.fear.monster_fear(cell) * turns;
    }

    for (id, _) in world.live_actors() {
        total += actor_danger(world, proj, ctx, cell, turns, id, averaged, full_damage);
    }

    total.clamp(0, DANGER_CEILING)
}

/// Danger contributed by a single actor to `cell` over `turns`.
///
/// Exposed separately because the offense catalog prices individual
/// targets (danger relief, sleeping-target caution) with it.
///
/// Sentinels: an id outside the roster or an unresolvable race template is
/// worth the full ceiling (treat unknown as worst case); a tombstoned slot
/// and an excluded actor are worth zero.
#[allow(clippy::too_many_arguments)]
pub fn actor_danger(
    world: &WorldSnapshot,
    proj: &dyn ProjectionOracle,
    ctx: &EvalContext,
    cell: Position,
    turns: i32,
    id: ActorId,
    averaged: bool,
    full_damage: bool,
) -> i32 {
    let Some(actor) = world.actor(id) else {
        return DANGER_CEILING;
    };
    if actor.is_dead() {
        return 0;
    }
    // Teleport-other pricing removes these from every sum.
    if ctx.is_excluded(id) {
        return 0;
    }
    let Some(race) = world.race_of(actor) else {
        // Corrupt record: maximal danger, and no reachability reasoning
        // that could talk us out of it.
        return DANGER_CEILING;
    };

    let agent = &world.agent;
    let dist = cell.distance(actor.pos).max(1);
    if dist > world.config.sense_radius {
        return 0;
    }

    // ------------------------------------------------------------------
    // Turn economy: actor actions available per agent action.
    // ------------------------------------------------------------------
    let mut agent_speed = agent.speed;
    if agent_speed >= SPEEDY_AGENT_CLAMP {
        agent_speed = if world.posture.fighting_unique > 0 {
            120
        } else {
            125
        };
    }
    if ctx.get(Flag::Fast) {
        agent_speed += 10;
    }

    let mut actor_speed = race.speed;
    if ctx.get(Flag::SlowPending) {
        actor_speed -= 10;
    }
    // A fragile agent assumes everything is a little faster than it looks.
    if agent.max_hp < 20 && world.depth > 0 {
        actor_speed += 3;
    }

    let agent_turn_span = game_turns_per_move(agent_speed);
    let actor_energy = energy_per_game_turn(actor_speed);

    // Tenths of an actor action per agent action, times exposure.
    let mut q = turns * (agent_turn_span * actor_energy) / 10;
    if full_damage {
        // Worst case rounds partial actions up to whole ones.
        q = ((q + 9) / 10) * 10;
    }
    // Never price an actor below one action per agent action: a slow
    // monster's big turn still arrives eventually.
    if q <= 10 {
        q = 10;
    }

    // ------------------------------------------------------------------
    // Melee component.
    // ------------------------------------------------------------------
    let mut v1 = melee_threat(world, ctx, race, full_damage);

    if race.has(RaceFlags::NEVER_BLOWS) {
        v1 = 0;
    }
    if race.has(RaceFlags::NEVER_MOVES) && dist > 1 {
        v1 = 0;
    }
    v1 = crowd_multipliers(v1, race, agent.level, 15, 18, 13);
    v1 = status_discounts(v1, ctx, actor, race, agent, dist, true);

    // Reachability: can it actually stand next to `cell` in time?
    if q > 10 && dist != 1 && !race.has(RaceFlags::NEVER_MOVES) {
        let mut reachable = 0;
        for step in actor.pos.neighbours() {
            let Some(tile) = world.map.tile(step) else {
                continue;
            };
            if world.occupant(step).is_some() {
                continue;
            }
            match tile.terrain {
                t if t == gloom_core::TerrainKind::ClosedDoor
                    || t == gloom_core::TerrainKind::PermWall =>
                {
                    continue;
                }
                t if t.is_wall() => {
                    // Wall cells only help wall-walkers.
                    if race.has(RaceFlags::PASS_WALL | RaceFlags::KILL_WALL)
                        && step.distance(cell) == 1
                    {
                        reachable = v1;
                    }
                }
                t if t.is_floor() => {
                    if step.distance(cell) <= 1 {
                        // A fast actor may close and still have actions
                        // left over; integer division zeroes actors that
                        // cannot arrive inside the window.
                        reachable = v1 * (q / (dist * 10));
                    }
                }
                _ => {}
            }
        }
        v1 = reachable;
    }
    if q > 10 && dist == 1 {
        // Adjacent and fast: several full rounds of blows.
        v1 = v1 * q / 10;
    }
    if q == 10 && dist > 1 {
        // Normal speed and not adjacent: cannot move and strike in one
        // exchange.
        v1 = 0;
    }

    // ------------------------------------------------------------------
    // Ranged component.
    // ------------------------------------------------------------------
    let mut v2 = ranged_threat(world, proj, ctx, actor, race, cell, averaged, full_damage);

    if race.cast_freq <= 0 {
        v2 = 0;
    }

    // Slow casters need line of effect right now (either direction: a
    // cell that can see the caster can be seen from it).
    if q <= 10
        && v2 > 0
        && !proj.projectable(actor.pos, cell)
        && !proj.projectable(cell, actor.pos)
    {
        v2 = 0;
    }

    // Fast casters can step one cell and still fire: threat exists if any
    // legal neighbouring cell has line of effect to `cell`.
    if q >= 20 && v2 > 0 {
        let full_q = q;
        q = 20;
        let mut best = 0;
        for step in actor.pos.neighbours() {
            let Some(tile) = world.map.tile(step) else {
                continue;
            };
            if world.occupant(step).is_some() {
                continue;
            }
            match tile.terrain {
                t if t == gloom_core::TerrainKind::ClosedDoor
                    || t == gloom_core::TerrainKind::PermWall =>
                {
                    continue;
                }
                t if t.is_wall() => {
                    if race.has(RaceFlags::PASS_WALL | RaceFlags::KILL_WALL)
                        && proj.projectable(step, cell)
                    {
                        best = v2 * full_q / 10;
                    }
                }
                _ => {
                    if proj.projectable(step, cell) {
                        best = v2 * full_q / 10;
                    }
                }
            }
        }
        v2 = best;
    }

    v2 = crowd_multipliers(v2, race, agent.level, 12, 12, 12);
    v2 = status_discounts(v2, ctx, actor, race, agent, dist, false);

    if !full_damage {
        // Scale by how often the race actually uses its repertoire.
        let freq = race.cast_freq;
        if freq < 11 {
            v2 = v2 * 4 / 10;
        } else if freq < 26 {
            v2 = v2 * 6 / 10;
        } else if freq < 51 {
            v2 = v2 * 8 / 10;
        }
    }

    if v2 > 0 {
        v2 = v2 * q / 10;
    }

    v1.max(v2).min(DANGER_CEILING)
}

/// Breeders and escorted races get crowd multipliers while the agent is
/// still weak; the first one seen is never the problem.
fn crowd_multipliers(
    value: i32,
    race: &gloom_core::RaceTemplate,
    level: i32,
    breeder_tenths: i32,
    escort_weak_tenths: i32,
    escort_tenths: i32,
) -> i32 {
    let mut v = value;
    if level >= WEAK_LEVEL {
        return v;
    }
    if race.has(RaceFlags::BREEDER) {
        v += v * breeder_tenths / 10;
    }
    if race.has(RaceFlags::HAS_ESCORTS) {
        if level < 15 {
            v += v * escort_weak_tenths / 10;
        } else {
            v += v * escort_tenths / 10;
        }
    }
    v
}

/// Observed and hypothetical status discounts, in fixed order: sleep,
/// pending sleep casts, confusion, stun, pending confusion cast, fear.
fn status_discounts(
    value: i32,
    ctx: &EvalContext,
    actor: &gloom_core::Actor,
    race: &gloom_core::RaceTemplate,
    agent: &gloom_core::AgentState,
    dist: i32,
    is_melee: bool,
) -> i32 {
    let mut v = value;
    let weak_and_hurt = agent.level < WEAK_LEVEL && agent.hp < agent.max_hp / 2;

    if !actor.is_awake() {
        if agent.level >= EXPERIENCED_LEVEL {
            v /= 2;
        }
        // Light sleepers carry a surcharge proportional to how easily
        // they wake.
        v += v * (race.alertness + 5) / 100;
    }

    let sleepable = actor.is_awake()
        && !race.has(RaceFlags::NO_SLEEP)
        && !race.has(RaceFlags::UNIQUE)
        && race.level <= agent.level - 15;

    if ctx.get(Flag::SleepTouchPending) && dist == 1 && sleepable {
        if is_melee && weak_and_hurt {
            v = 0;
        } else {
            v /= 3;
        }
    }
    if ctx.get(Flag::SleepPending) {
        if is_melee {
            if sleepable {
                if weak_and_hurt {
                    v = 0;
                } else {
                    v /= dist + 2;
                }
            }
        } else {
            v /= dist + 2;
        }
    }

    if actor.status.contains(StatusFlags::CONFUSED) {
        v /= 2;
    }
    if actor.status.contains(StatusFlags::STUNNED) {
        v = v * 10 / 13;
    }

    if ctx.get(Flag::ConfusePending) {
        if is_melee {
            let confusable = actor.is_awake()
                && !actor.status.contains(StatusFlags::CONFUSED)
                && !race.has(RaceFlags::NO_CONF)
                && !race.has(RaceFlags::UNIQUE)
                && race.level <= agent.level - 15;
            if confusable {
                if weak_and_hurt {
                    v = 0;
                } else {
                    v /= dist + 2;
                }
            }
        } else {
            v /= 6;
        }
    }

    // A frightened actor will not close to melee; it still casts.
    if is_melee && (ctx.get(Flag::FearPending) || actor.status.contains(StatusFlags::AFRAID)) {
        v = 0;
    }

    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloom_core::{Actor, AgentState, Blow, BlowEffect, RaceTemplate, TileMap};

    struct OpenProjection;
    impl ProjectionOracle for OpenProjection {
        fn projectable(&self, _from: Position, _to: Position) -> bool {
            true
        }
        fn projectable_pure(&self, _from: Position, _to: Position) -> bool {
            true
        }
    }

    fn world_with_actor(blow_damage: i32, dist: i32) -> (WorldSnapshot, ActorId) {
        let mut agent = AgentState::default();
        agent.pos = Position::new(10, 10);
        agent.hp = 50;
        agent.max_hp = 50;
        let mut world = WorldSnapshot::new(TileMap::open_floor(40, 40), agent);
        let race = world.add_race(
            RaceTemplate::builder("test brute")
                .blow(Blow::new(BlowEffect::Hurt, 1, blow_damage))
                .build(),
        );
        let id = world
            .add_actor(Actor::new(race, Position::new(10 + dist, 10), 40))
            .unwrap();
        (world, id)
    }

    #[test]
    fn out_of_bounds_cell_is_ceiling() {
        let (world, _) = world_with_actor(6, 1);
        let ctx = EvalContext::new();
        let danger = evaluate_danger(
            &world,
            &OpenProjection,
            &ctx,
            Position::new(-3, 2),
            1,
            true,
            true,
        );
        assert_eq!(danger, DANGER_CEILING);
    }

    #[test]
    fn unknown_actor_id_is_ceiling() {
        let (world, _) = world_with_actor(6, 1);
        let ctx = EvalContext::new();
        let danger = actor_danger(
            &world,
            &OpenProjection,
            &ctx,
            world.agent.pos,
            1,
            ActorId(99),
            true,
            true,
        );
        assert_eq!(danger, DANGER_CEILING);
    }

    #[test]
    fn adjacent_brute_deals_its_blow() {
        // Scenario: one actor at distance 1, equal speed, single 1dN blow,
        // no resistances, full damage => exactly the blow's max roll.
        let (world, id) = world_with_actor(7, 1);
        let ctx = EvalContext::new();
        let danger = actor_danger(
            &world,
            &OpenProjection,
            &ctx,
            world.agent.pos,
            1,
            id,
            true,
            true,
        );
        assert_eq!(danger, 7);
    }

    #[test]
    fn normal_speed_cannot_move_and_strike() {
        let (world, id) = world_with_actor(7, 2);
        let ctx = EvalContext::new();
        let danger = actor_danger(
            &world,
            &OpenProjection,
            &ctx,
            world.agent.pos,
            1,
            id,
            true,
            true,
        );
        assert_eq!(danger, 0);
    }

    #[test]
    fn excluded_actor_contributes_zero() {
        let (world, id) = world_with_actor(7, 1);
        let mut ctx = EvalContext::new();
        let inside = ctx.with_excluded(&[id], |ctx| {
            actor_danger(
                &world,
                &OpenProjection,
                ctx,
                world.agent.pos,
                1,
                id,
                true,
                true,
            )
        });
        assert_eq!(inside, 0);
    }

    #[test]
    fn beyond_sense_radius_contributes_zero() {
        let (mut world, _) = world_with_actor(7, 1);
        let far_race = world.add_race(
            RaceTemplate::builder("distant titan")
                .blow(Blow::new(BlowEffect::Hurt, 20, 20))
                .build(),
        );
        let far = world
            .add_actor(Actor::new(far_race, Position::new(35, 35), 999))
            .unwrap();
        let ctx = EvalContext::new();
        let danger = actor_danger(
            &world,
            &OpenProjection,
            &ctx,
            world.agent.pos,
            1,
            far,
            true,
            true,
        );
        assert_eq!(danger, 0);
    }

    #[test]
    fn determinism_two_calls_agree() {
        let (world, _) = world_with_actor(9, 1);
        let ctx = EvalContext::new();
        let a = evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 2, true, false);
        let b = evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 2, true, false);
        assert_eq!(a, b);
    }
}
