//! Projectile and blast simulation for the offense catalog.
//!
//! Every aimed attack funnels through [`launch_best`]: it walks the
//! candidate targets, considers landing the effect on the target's cell or
//! any adjacent cell (terrain sometimes makes the offset shot the only one
//! that connects), simulates the flight path over remembered terrain, and
//! accumulates per-victim value over the blast area. The same per-victim
//! pricing serves damage spells, status spells (as counterfactual danger
//! deltas), and missiles.

use gloom_core::{ActorId, Element, Position, RaceFlags, StatusFlags, TerrainKind};

use crate::attack::bias;
use crate::catalog::{TacticalView, Target};
use crate::context::{EvalContext, Flag};
use crate::danger::actor_danger;

/// Delivery geometry of an aimed attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Shape {
    /// Straight line, stops at the first body or wall.
    Bolt,
    /// Straight line through every body, stops at walls.
    Beam,
    /// Flies to the target cell, then bursts with this radius; damage
    /// falls off with distance from the burst.
    Ball(i32),
    /// No aiming: hits every visible target at full effect.
    Dispel,
}

/// What the attack does to whatever it reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AttackType {
    /// Unresistable magic.
    Pure,
    /// Physical missile from the launcher; slays, range decay, ammo gates.
    MissileShot,
    /// Elemental damage gated by race immunities and vulnerabilities.
    Element(Element),
    /// Double damage against evil races.
    HolyOrb,
    /// Only evil races are affected.
    DispelEvil,
    /// Only undead races are affected.
    DispelUndead,
    /// Life drain; the unliving are immune.
    DrainLife,
    /// Only light-hating races are affected.
    LightWeak,
    // ---- status attacks: value is a counterfactual danger delta ----
    Confuse,
    Scare,
    Slow,
    Sleep,
    Polymorph,
}

/// A fully resolved aim point with its expected value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LaunchPlan {
    pub target: Position,
    pub value: i32,
}

/// Finds the best aim point for the given shape/type over all candidate
/// targets. Returns `None` when nothing is worth the shot.
pub(crate) fn launch_best(
    view: &TacticalView<'_>,
    ctx: &mut EvalContext,
    shape: Shape,
    dam: i32,
    typ: AttackType,
) -> Option<LaunchPlan> {
    let world = view.world;
    let agent_pos = world.agent.pos;
    let range = world.config.sense_radius;

    if matches!(shape, Shape::Dispel) {
        // Dispels need no aim point: price every visible victim at full
        // effect and anchor the plan on the agent.
        let mut total = 0;
        for target in view.targets {
            if agent_pos.distance(target.pos) > range {
                continue;
            }
            if !view.proj.projectable(agent_pos, target.pos) {
                continue;
            }
            total += victim_value(view, ctx, target.id, dam, typ);
        }
        if total <= 0 {
            return None;
        }
        return Some(LaunchPlan { target: agent_pos, value: total });
    }

    let mut best: Option<(LaunchPlan, i32)> = None;

    for target in view.targets {
        let target_dist = agent_pos.distance(target.pos);
        if target_dist > range {
            continue;
        }

        // Offset search: a ball dropped next to the target still covers
        // it, and sometimes only the offset cell has a clear path.
        for &(dx, dy) in offset_cells(shape) {
            let aim = target.pos.offset(dx, dy);
            let Some(aim_tile) = world.map.tile(aim) else {
                continue;
            };
            let is_direct = aim == target.pos;
            if !is_direct {
                // Only balls profit from offset aiming, and only onto
                // terrain we have actually seen.
                if !matches!(shape, Shape::Ball(_)) || aim_tile.terrain == TerrainKind::Unknown {
                    continue;
                }
            }
            if agent_pos.distance(aim) > range {
                continue;
            }

            let value = path_value(view, ctx, aim, shape, dam, typ);
            if value <= 0 {
                continue;
            }

            // Prefer higher value; on equal value prefer the closer
            // victim, and otherwise the earliest candidate seen.
            let better = match best {
                None => true,
                Some((plan, dist)) => {
                    value > plan.value || (value == plan.value && target_dist < dist)
                }
            };
            if better {
                best = Some((LaunchPlan { target: aim, value }, target_dist));
            }
        }
    }

    best.map(|(plan, _)| plan)
}

fn offset_cells(shape: Shape) -> &'static [(i32, i32)] {
    match shape {
        Shape::Ball(_) => &[
            (0, 0),
            (-1, -1),
            (0, -1),
            (1, -1),
            (-1, 0),
            (1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
        ],
        _ => &[(0, 0)],
    }
}

/// Simulates one flight path and returns the accumulated value.
fn path_value(
    view: &TacticalView<'_>,
    ctx: &mut EvalContext,
    aim: Position,
    shape: Shape,
    dam: i32,
    typ: AttackType,
) -> i32 {
    let world = view.world;
    let agent = &world.agent;
    let mut n = 0;
    let mut pos = agent.pos;

    // A battered agent stops trusting unknown cells on the flight path;
    // a healthy one will gamble a couple of cells past its knowledge.
    let unknown_trust = if agent.hp_pct() >= 50 { 2 } else { 0 };
    let mut unknown_crossed = 0;

    for _ in 0..world.config.sense_radius {
        pos = pos.step_toward(aim);
        let Some(tile) = world.map.tile(pos) else {
            return stopped_value(shape, n);
        };

        if tile.terrain == TerrainKind::Unknown {
            unknown_crossed += 1;
            if unknown_crossed > unknown_trust {
                return stopped_value(shape, n);
            }
        } else if !tile.terrain.is_floor() {
            // Walls end the flight. Only shapes that damage along the
            // path keep what they earned.
            return stopped_value(shape, n);
        }

        // Path hits collect for line shapes.
        if matches!(shape, Shape::Bolt | Shape::Beam) {
            if let Some(id) = world.occupant(pos) {
                n += victim_value(view, ctx, id, dam, typ);
                if matches!(shape, Shape::Bolt) {
                    // Bolts stop in the first body they meet.
                    return n;
                }
            }
        }

        if pos == aim {
            if matches!(shape, Shape::Beam) {
                // Beams continue to the wall behind the target.
                continue;
            }
            break;
        }
    }

    if pos != aim && !matches!(shape, Shape::Beam) {
        // Never arrived.
        return stopped_value(shape, n);
    }

    // Burst coverage for balls.
    if let Shape::Ball(rad) = shape {
        for dy in -rad..=rad {
            for dx in -rad..=rad {
                let cell = aim.offset(dx, dy);
                let r = aim.distance(cell);
                if r > rad {
                    continue;
                }
                if !world.map.in_bounds(cell) {
                    continue;
                }
                // Bursts do not curl around corners.
                if !view.proj.projectable(aim, cell) {
                    continue;
                }
                if let Some(id) = world.occupant(cell) {
                    n += victim_value(view, ctx, id, dam / (r + 1), typ);
                }
            }
        }
    }

    n
}

/// Value salvaged when a flight stops early: beams keep their path hits,
/// everything else whiffs.
fn stopped_value(shape: Shape, collected: i32) -> i32 {
    match shape {
        Shape::Beam => collected,
        _ => 0,
    }
}

/// Value of landing the effect on one victim.
///
/// For damage types this is expected damage with target-priority biases;
/// for status types it is the counterfactual danger delta, with hard
/// eligibility gates returning zero.
pub(crate) fn victim_value(
    view: &TacticalView<'_>,
    ctx: &mut EvalContext,
    id: ActorId,
    dam: i32,
    typ: AttackType,
) -> i32 {
    let world = view.world;
    let agent = &world.agent;
    let Some(actor) = world.actor(id) else {
        return 0;
    };
    if actor.is_dead() {
        return 0;
    }
    // Stale sightings are not targets.
    if actor.last_seen + 2 < world.tick {
        return 0;
    }
    let Some(race) = world.race_of(actor) else {
        return 0;
    };
    let dist = agent.pos.distance(actor.pos);

    let mut dam = dam;

    match typ {
        AttackType::Pure => {}

        AttackType::MissileShot => {
            let (Some(launcher), Some(ammo)) = (&agent.launcher, &agent.ammo) else {
                return 0;
            };
            let mult = slay_multiplier(launcher.slays | ammo.slays, race);
            dam *= mult;
            // Point-blank archery wastes the volley on anything mundane.
            if dist == 1 && !race.has(RaceFlags::UNIQUE) {
                dam /= 5;
            }
            // Hit gate: distance stacks with the victim's armor.
            let bonus = agent.to_hit + launcher.to_hit + ammo.to_hit;
            let chance = agent.skill_ranged + bonus * 3;
            if chance < (race.armor + dist) * 8 / 10 {
                return 0;
            }
            if !missile_worthwhile(view, ctx, id) {
                return 0;
            }
        }

        AttackType::Element(element) => {
            dam = elemental_vs_race(dam, element, race);
            if dam == 0 {
                return 0;
            }
        }

        AttackType::HolyOrb => {
            if race.has(RaceFlags::EVIL) {
                dam *= 2;
            }
        }
        AttackType::DispelEvil => {
            if !race.has(RaceFlags::EVIL) {
                return 0;
            }
        }
        AttackType::DispelUndead => {
            if !race.has(RaceFlags::UNDEAD) {
                return 0;
            }
        }
        AttackType::DrainLife => {
            if race.has(RaceFlags::UNDEAD)
                || race.has(RaceFlags::DEMON)
                || race.has(RaceFlags::NONLIVING)
            {
                return 0;
            }
        }
        AttackType::LightWeak => {
            if !race.has(RaceFlags::HURT_LIGHT) {
                return 0;
            }
        }

        AttackType::Confuse => {
            if race.has(RaceFlags::NO_CONF)
                || race.has(RaceFlags::BREEDER)
                || race.has(RaceFlags::UNIQUE)
            {
                return 0;
            }
            return status_delta(view, ctx, id, Flag::ConfusePending, |a| {
                a.status.contains(StatusFlags::CONFUSED)
            });
        }
        AttackType::Scare => {
            if race.has(RaceFlags::NO_FEAR) || race.has(RaceFlags::UNIQUE) {
                return 0;
            }
            return status_delta(view, ctx, id, Flag::FearPending, |a| {
                a.status.contains(StatusFlags::AFRAID)
            });
        }
        AttackType::Slow => {
            if race.has(RaceFlags::FREE_ACTION) || race.has(RaceFlags::UNIQUE) {
                return 0;
            }
            return status_delta(view, ctx, id, Flag::SlowPending, |_| false);
        }
        AttackType::Sleep => {
            if race.has(RaceFlags::NO_SLEEP) || race.has(RaceFlags::UNIQUE) {
                return 0;
            }
            return status_delta(view, ctx, id, Flag::SleepPending, |a| !a.is_awake());
        }
        AttackType::Polymorph => {
            if race.has(RaceFlags::UNIQUE) || !level_overpowered(agent.level, race.level) {
                return 0;
            }
            // Rolling new dice on a scary monster is worth exactly the
            // danger it currently projects; on a tame one, nothing.
            let danger = actor_danger(
                world, view.proj, ctx, agent.pos, 2, id, true, true,
            );
            if danger < agent.avoidance() * 2 && !actor.status.contains(StatusFlags::AFRAID) {
                return 0;
            }
            return danger;
        }
    }

    // ------------------------------------------------------------------
    // Shared target-priority shaping for damage attacks.
    // ------------------------------------------------------------------

    // Overkill is not value.
    if dam > actor.power * 2 && !race.has(RaceFlags::UNIQUE) {
        dam = actor.power * 2;
    }

    if race.has(RaceFlags::UNIQUE) {
        if world.depth >= 1 {
            dam *= bias::UNIQUE_RANGED_MULT;
        } else {
            // Town uniques wake the whole market; leave them for later.
            dam = dam * 2 / 3;
            if agent.level < 5 {
                dam = 0;
            }
        }
    }
    if race.has(RaceFlags::BREEDER) {
        dam = dam * bias::BREEDER_MULT_TENTHS / 10;
    }
    if race.is_summoner() {
        dam += dam * bias::SUMMONER_BONUS_TENTHS / 10;
    }

    if dam <= 0 {
        return 0;
    }

    // Waking a dangerous sleeper with a shot that will not finish it is a
    // plan with exactly one flaw.
    let wake_danger = actor_danger(world, view.proj, ctx, actor.pos, 1, id, true, false);
    if !actor.is_awake() && wake_danger > agent.avoidance() / 2 && dam < actor.power {
        return 0;
    }
    // Sleeping town monsters are scenery.
    if world.depth == 0 && !actor.is_awake() {
        return 0;
    }

    // Prefer the victim whose survival costs us the most.
    let relief = actor_danger(world, view.proj, ctx, agent.pos, 1, id, true, false);

    // Finishing blows clear the board now, not eventually.
    if dam >= actor.power {
        dam *= 2;
    }

    dam + relief
}

/// Counterfactual pricing of a status attack: danger now minus danger
/// with the status pending, with the shared eligibility gates.
fn status_delta(
    view: &TacticalView<'_>,
    ctx: &mut EvalContext,
    id: ActorId,
    flag: Flag,
    already: impl Fn(&gloom_core::Actor) -> bool,
) -> i32 {
    let world = view.world;
    let agent = &world.agent;
    let Some(actor) = world.actor(id) else {
        return 0;
    };
    let Some(race) = world.race_of(actor) else {
        return 0;
    };

    // No point disabling the already-disabled or the never-was-enabled.
    if already(actor) || !actor.is_awake() || actor.status.contains(StatusFlags::CONFUSED) {
        return 0;
    }
    if !level_overpowered(agent.level, race.level) {
        return 0;
    }

    let mut before = actor_danger(world, view.proj, ctx, agent.pos, 1, id, true, true);
    // A cornered-looking early game gets a nudge toward crowd control.
    if actor.status.contains(StatusFlags::AFRAID) && agent.level <= 10 {
        before += 20;
    }
    let after = ctx.with_flag(flag, true, |ctx| {
        actor_danger(world, view.proj, ctx, agent.pos, 1, id, true, true)
    });
    before - after
}

/// Level gate for status spells: the victim must be comfortably below the
/// agent's weight class before a save-or-nothing spell is worth a turn.
fn level_overpowered(agent_level: i32, race_level: i32) -> bool {
    let ceiling = if agent_level < 13 {
        10
    } else {
        ((agent_level - 10) / 4) * 3 + 10
    };
    race_level <= ceiling
}

/// Weapon slay/brand multiplier against a race, strongest tier wins.
pub(crate) fn slay_multiplier(slays: gloom_core::SlayFlags, race: &gloom_core::RaceTemplate) -> i32 {
    use gloom_core::SlayFlags as S;

    let mut mult = 1;
    if (slays.contains(S::SLAY_ANIMAL) && race.has(RaceFlags::ANIMAL))
        || (slays.contains(S::SLAY_EVIL) && race.has(RaceFlags::EVIL))
    {
        mult = 2;
    }
    if (slays.contains(S::SLAY_UNDEAD) && race.has(RaceFlags::UNDEAD))
        || (slays.contains(S::SLAY_DEMON) && race.has(RaceFlags::DEMON))
        || (slays.contains(S::SLAY_ORC) && race.has(RaceFlags::ORC))
        || (slays.contains(S::SLAY_TROLL) && race.has(RaceFlags::TROLL))
        || (slays.contains(S::SLAY_GIANT) && race.has(RaceFlags::GIANT))
        || (slays.contains(S::SLAY_DRAGON) && race.has(RaceFlags::DRAGON))
        || (slays.contains(S::BRAND_ACID) && !race.has(RaceFlags::IMMUNE_ACID))
        || (slays.contains(S::BRAND_ELEC) && !race.has(RaceFlags::IMMUNE_ELEC))
        || (slays.contains(S::BRAND_FIRE) && !race.has(RaceFlags::IMMUNE_FIRE))
        || (slays.contains(S::BRAND_COLD) && !race.has(RaceFlags::IMMUNE_COLD))
        || (slays.contains(S::BRAND_POIS) && !race.has(RaceFlags::IMMUNE_POISON))
    {
        mult = 3;
    }
    if (slays.contains(S::KILL_UNDEAD) && race.has(RaceFlags::UNDEAD))
        || (slays.contains(S::KILL_DEMON) && race.has(RaceFlags::DEMON))
        || (slays.contains(S::KILL_DRAGON) && race.has(RaceFlags::DRAGON))
    {
        mult = 5;
    }
    mult
}

/// Elemental damage against a race: immunity voids, vulnerability
/// doubles.
fn elemental_vs_race(dam: i32, element: Element, race: &gloom_core::RaceTemplate) -> i32 {
    match element {
        Element::Acid if race.has(RaceFlags::IMMUNE_ACID) => 0,
        Element::Elec if race.has(RaceFlags::IMMUNE_ELEC) => 0,
        Element::Fire if race.has(RaceFlags::IMMUNE_FIRE) => 0,
        Element::Fire if race.has(RaceFlags::HURT_FIRE) => dam * 2,
        Element::Cold | Element::Ice if race.has(RaceFlags::IMMUNE_COLD) => 0,
        Element::Cold if race.has(RaceFlags::HURT_COLD) => dam * 2,
        Element::Poison if race.has(RaceFlags::IMMUNE_POISON) => 0,
        Element::Nether if race.has(RaceFlags::UNDEAD) => 0,
        Element::Nether if race.has(RaceFlags::EVIL) => dam / 2,
        _ => dam,
    }
}

/// Ammunition conservation: volleys are reserved for victims that matter.
fn missile_worthwhile(view: &TacticalView<'_>, ctx: &mut EvalContext, id: ActorId) -> bool {
    let world = view.world;
    let agent = &world.agent;
    if world.depth == 0 {
        return false;
    }
    let Some(actor) = world.actor(id) else {
        return false;
    };
    let Some(race) = world.race_of(actor) else {
        return false;
    };

    let danger_there =
        actor_danger(world, view.proj, ctx, actor.pos, 1, id, true, true);
    danger_there > agent.avoidance() * 2 / 10
        || (race.has(RaceFlags::HAS_ESCORTS) && race.level >= agent.level - 5)
        || !race.abilities.is_empty()
        || race.has(RaceFlags::UNIQUE)
        || race.has(RaceFlags::BREEDER)
        || race.has(RaceFlags::NEVER_MOVES)
        || race
            .blows
            .iter()
            .any(|b| b.effect == gloom_core::BlowEffect::StealGold)
        || agent.level <= 20
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloom_core::{Actor, AgentState, Blow, BlowEffect, RaceTemplate, Tile, TileMap, WorldSnapshot};
    use gloom_core::ProjectionOracle;

    struct OpenProjection;
    impl ProjectionOracle for OpenProjection {
        fn projectable(&self, _from: Position, _to: Position) -> bool {
            true
        }
        fn projectable_pure(&self, _from: Position, _to: Position) -> bool {
            true
        }
    }

    fn setup() -> (WorldSnapshot, Vec<Target>) {
        let mut agent = AgentState::default();
        agent.pos = Position::new(5, 5);
        agent.hp = 60;
        agent.max_hp = 60;
        agent.level = 20;
        let mut world = WorldSnapshot::new(TileMap::open_floor(30, 30), agent);
        world.depth = 5;
        let race = world.add_race(
            RaceTemplate::builder("orc archer")
                .level(5)
                .blow(Blow::new(BlowEffect::Hurt, 1, 6))
                .build(),
        );
        let actor = Actor::new(race, Position::new(10, 5), 30);
        let id = world.add_actor(actor).unwrap();
        let targets = vec![Target { id, pos: Position::new(10, 5) }];
        (world, targets)
    }

    #[test]
    fn bolt_reaches_open_target() {
        let (world, targets) = setup();
        let view = TacticalView { world: &world, proj: &OpenProjection, targets: &targets };
        let mut ctx = EvalContext::new();
        let plan = launch_best(&view, &mut ctx, Shape::Bolt, 20, AttackType::Pure);
        let plan = plan.expect("open bolt should land");
        assert_eq!(plan.target, Position::new(10, 5));
        assert!(plan.value >= 20);
    }

    #[test]
    fn wall_blocks_bolt() {
        let (mut world, targets) = setup();
        world.map.set(Position::new(8, 5), Tile::wall());
        let view = TacticalView { world: &world, proj: &OpenProjection, targets: &targets };
        let mut ctx = EvalContext::new();
        let plan = launch_best(&view, &mut ctx, Shape::Bolt, 20, AttackType::Pure);
        assert!(plan.is_none());
    }

    #[test]
    fn slay_tiers() {
        use gloom_core::SlayFlags as S;
        let undead = RaceTemplate::builder("wight")
            .flags(RaceFlags::UNDEAD | RaceFlags::EVIL)
            .build();
        assert_eq!(slay_multiplier(S::empty(), &undead), 1);
        assert_eq!(slay_multiplier(S::SLAY_EVIL, &undead), 2);
        assert_eq!(slay_multiplier(S::SLAY_UNDEAD | S::SLAY_EVIL, &undead), 3);
        assert_eq!(slay_multiplier(S::KILL_UNDEAD, &undead), 5);
    }

    #[test]
    fn nether_spares_undead() {
        let undead = RaceTemplate::builder("wraith").flags(RaceFlags::UNDEAD).build();
        assert_eq!(elemental_vs_race(100, Element::Nether, &undead), 0);
        let evil = RaceTemplate::builder("orc").flags(RaceFlags::EVIL).build();
        assert_eq!(elemental_vs_race(100, Element::Nether, &evil), 50);
        let beast = RaceTemplate::builder("bear").flags(RaceFlags::ANIMAL).build();
        assert_eq!(elemental_vs_race(100, Element::Nether, &beast), 100);
    }
}
