//! Danger model properties and scenario checks.
//!
//! These pin the contract of `evaluate_danger`: bounds, determinism,
//! counterfactual hygiene, and the arithmetic of the canonical scenarios.

use gloom_bot::{DANGER_CEILING, EvalContext, Flag, actor_danger, evaluate_danger};
use gloom_core::{
    Actor, ActorId, AgentState, Blow, BlowEffect, Position, ProjectionOracle, RaceTemplate,
    TileMap, WorldSnapshot,
};

struct OpenProjection;

impl ProjectionOracle for OpenProjection {
    fn projectable(&self, _from: Position, _to: Position) -> bool {
        true
    }
    fn projectable_pure(&self, _from: Position, _to: Position) -> bool {
        true
    }
}

fn arena(level: i32) -> WorldSnapshot {
    let mut agent = AgentState::default();
    agent.pos = Position::new(20, 20);
    agent.hp = 100;
    agent.max_hp = 100;
    agent.level = level;
    WorldSnapshot::new(TileMap::open_floor(40, 40), agent)
}

fn single_brute(world: &mut WorldSnapshot, blow: Blow, alertness: i32, dist: i32) -> ActorId {
    let race = world.add_race(
        RaceTemplate::builder("brute")
            .alertness(alertness)
            .blow(blow)
            .build(),
    );
    let pos = world.agent.pos.offset(dist, 0);
    world.add_actor(Actor::new(race, pos, 50)).unwrap()
}

#[test]
fn adjacent_brute_full_damage_is_its_blow() {
    // One actor at distance 1, equal speed, a single 1d7 blow, no
    // resistances, full damage: the danger is exactly the blow.
    let mut world = arena(10);
    single_brute(&mut world, Blow::new(BlowEffect::Hurt, 1, 7), 10, 1);
    let ctx = EvalContext::new();
    let danger = evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 1, true, true);
    assert_eq!(danger, 7);
}

#[test]
fn sleeping_halves_for_the_experienced() {
    let mut world = arena(25);
    let id = single_brute(&mut world, Blow::new(BlowEffect::Hurt, 1, 8), 10, 1);
    let ctx = EvalContext::new();

    let awake = evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 1, true, true);
    assert_eq!(awake, 8);

    world.actor_mut(id).unwrap().status |= gloom_core::StatusFlags::ASLEEP;
    let asleep = evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 1, true, true);
    assert_eq!(asleep, awake / 2);
}

#[test]
fn light_sleepers_carry_a_surcharge() {
    // Alertness 95 puts the full surcharge back on the halved danger.
    let mut world = arena(25);
    let id = single_brute(&mut world, Blow::new(BlowEffect::Hurt, 1, 8), 95, 1);
    world.actor_mut(id).unwrap().status |= gloom_core::StatusFlags::ASLEEP;
    let ctx = EvalContext::new();
    let asleep = evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 1, true, true);
    assert_eq!(asleep, 8);
}

#[test]
fn resistance_counterfactual_scales_to_a_third_and_restores() {
    // Fire is the actor's only threat: the toggled resistance cuts the
    // danger to a third (of the gear-burn-doubled base), and the value
    // is untouched once the toggle is released.
    let mut world = arena(10);
    single_brute(&mut world, Blow::new(BlowEffect::Fire, 3, 10), 10, 1);
    let mut ctx = EvalContext::new();

    let before = evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 1, true, true);
    assert_eq!(before, 60);

    let during = ctx.with_flag(Flag::TempResFire, true, |ctx| {
        evaluate_danger(&world, &OpenProjection, ctx, world.agent.pos, 1, true, true)
    });
    assert_eq!(during, 20);

    let after = evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 1, true, true);
    assert_eq!(after, before);
}

#[test]
fn beyond_sense_range_contributes_nothing() {
    let mut world = arena(10);
    let race = world.add_race(
        RaceTemplate::builder("distant titan")
            .blow(Blow::new(BlowEffect::Hurt, 30, 30))
            .build(),
    );
    // Chebyshev distance 25 from the agent: past the sensing radius.
    let far = world
        .add_actor(Actor::new(race, Position::new(20 + 25, 20), 9999))
        .unwrap();
    let ctx = EvalContext::new();
    assert_eq!(
        actor_danger(&world, &OpenProjection, &ctx, world.agent.pos, 1, far, true, true),
        0
    );
    assert_eq!(
        evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 1, true, true),
        0
    );
}

#[test]
fn danger_is_bounded() {
    let mut world = arena(10);
    // An absurd stack of damage saturates at the ceiling.
    for _ in 0..4 {
        single_brute(&mut world, Blow::new(BlowEffect::Hurt, 40, 100), 10, 1);
    }
    let ctx = EvalContext::new();
    let danger = evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 1, true, true);
    assert!(danger >= 0);
    assert_eq!(danger, DANGER_CEILING);
}

#[test]
fn out_of_map_cells_are_maximally_dangerous() {
    let world = arena(10);
    let ctx = EvalContext::new();
    for cell in [Position::new(-1, 5), Position::new(5, -1), Position::new(400, 5)] {
        assert_eq!(
            evaluate_danger(&world, &OpenProjection, &ctx, cell, 1, true, true),
            DANGER_CEILING
        );
    }
}

#[test]
fn adding_an_actor_never_reduces_danger() {
    let mut world = arena(10);
    single_brute(&mut world, Blow::new(BlowEffect::Hurt, 1, 6), 10, 1);
    let ctx = EvalContext::new();
    let one = evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 1, true, true);

    single_brute(&mut world, Blow::new(BlowEffect::Hurt, 1, 9), 10, -1);
    let two = evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 1, true, true);
    assert!(two >= one, "{two} >= {one}");
}

#[test]
fn evaluation_is_deterministic() {
    let mut world = arena(18);
    single_brute(&mut world, Blow::new(BlowEffect::Hurt, 2, 9), 40, 1);
    single_brute(&mut world, Blow::new(BlowEffect::Confuse, 1, 4), 10, 3);
    let ctx = EvalContext::new();
    for turns in 1..=3 {
        let a = evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, turns, true, false);
        let b = evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, turns, true, false);
        assert_eq!(a, b);
    }
}

#[test]
fn toggles_never_leak_through_nested_evaluation() {
    let mut world = arena(10);
    single_brute(&mut world, Blow::new(BlowEffect::Fire, 2, 12), 10, 1);
    single_brute(&mut world, Blow::new(BlowEffect::Cold, 2, 12), 10, -1);
    let mut ctx = EvalContext::new();

    let baseline = evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 1, true, true);

    // Nested what-ifs in both orders.
    ctx.with_flag(Flag::TempResFire, true, |ctx| {
        ctx.with_flag(Flag::TempResCold, true, |ctx| {
            let _ = evaluate_danger(&world, &OpenProjection, ctx, world.agent.pos, 1, true, true);
        });
    });
    ctx.with_flag(Flag::TempResCold, true, |ctx| {
        let _ = evaluate_danger(&world, &OpenProjection, ctx, world.agent.pos, 1, true, true);
    });

    let after = evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 1, true, true);
    assert_eq!(after, baseline);
    assert!(!ctx.get(Flag::TempResFire));
    assert!(!ctx.get(Flag::TempResCold));
}

#[test]
fn dead_actors_contribute_nothing() {
    let mut world = arena(10);
    let id = single_brute(&mut world, Blow::new(BlowEffect::Hurt, 2, 10), 10, 1);
    let ctx = EvalContext::new();
    assert!(evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 1, true, true) > 0);

    world.remove_actor(id);
    assert_eq!(
        evaluate_danger(&world, &OpenProjection, &ctx, world.agent.pos, 1, true, true),
        0
    );
}
