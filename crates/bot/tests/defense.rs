//! Defense catalog tests: counterfactual utilities, the avoidance floor
//! policy, and terminal area-clearing entries.

use gloom_bot::{DefenseController, EvalContext, defend};
use gloom_core::{
    Actor, AgentState, Blow, BlowEffect, Command, ConsumableKind, Position, ProjectionOracle,
    RaceTemplate, RecordingSink, SpellAbility, SpellKind, TileMap, WorldSnapshot,
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

fn arena(hp: i32) -> WorldSnapshot {
    let mut agent = AgentState::default();
    agent.pos = Position::new(15, 15);
    agent.hp = hp;
    agent.max_hp = hp;
    agent.level = 20;
    WorldSnapshot::new(TileMap::open_floor(30, 30), agent)
}

fn add_brute(world: &mut WorldSnapshot, blow: Blow, speed: i32, dist: i32) {
    let race = world.add_race(
        RaceTemplate::builder("bruiser")
            .speed(speed)
            .blow(blow)
            .build(),
    );
    let pos = world.agent.pos.offset(dist, 0);
    world.add_actor(Actor::new(race, pos, 60)).unwrap();
}

#[test]
fn haste_prices_the_speed_counterfactual() {
    // A fast bruiser two cells out can close and strike today; hasted,
    // it cannot. The haste entry must see that whole difference.
    let mut world = arena(40);
    add_brute(&mut world, Blow::new(BlowEffect::Hurt, 3, 10), 120, 2);
    world
        .agent
        .consumables
        .push((ConsumableKind::PotionSpeed, 2));

    let catalog = defend::standard_catalog();
    let mut ctx = EvalContext::new();
    let mut sink = RecordingSink::default();

    let acted = DefenseController::decide_and_act(
        &mut world,
        &OpenProjection,
        &mut ctx,
        &catalog,
        &mut sink,
    );

    assert!(acted);
    assert_eq!(sink.issued, vec![Command::Quaff { kind: ConsumableKind::PotionSpeed }]);
}

#[test]
fn floor_policy_refuses_marginal_buffs() {
    // A lone slow kobold at arm's length is not worth a buff slot even
    // with every resource available.
    let mut world = arena(200);
    add_brute(&mut world, Blow::new(BlowEffect::Hurt, 1, 4), 110, 1);
    world.agent.mana = 50;
    world.agent.max_mana = 50;
    for kind in [
        SpellKind::HasteSelf,
        SpellKind::StoneSkin,
        SpellKind::ResistAll,
        SpellKind::ProtectionFromEvil,
    ] {
        world
            .agent
            .spells
            .push(SpellAbility { kind, mana_cost: 5, fail_pct: 5 });
    }

    let catalog = defend::standard_catalog();
    let mut ctx = EvalContext::new();
    let mut sink = RecordingSink::default();

    let acted = DefenseController::decide_and_act(
        &mut world,
        &OpenProjection,
        &mut ctx,
        &catalog,
        &mut sink,
    );

    assert!(!acted, "a marginal improvement must not burn a turn");
    assert!(sink.issued.is_empty());
}

#[test]
fn mass_banishment_prunes_the_roster_and_ends_the_tick() {
    let mut world = arena(20);
    for dist in [1, -1, 2] {
        add_brute(&mut world, Blow::new(BlowEffect::Hurt, 4, 10), 110, dist);
    }
    world
        .agent
        .consumables
        .push((ConsumableKind::ScrollMassBanishment, 1));

    let catalog = defend::standard_catalog();
    let mut ctx = EvalContext::new();
    let mut sink = RecordingSink::default();

    let acted = DefenseController::decide_and_act(
        &mut world,
        &OpenProjection,
        &mut ctx,
        &catalog,
        &mut sink,
    );

    assert!(acted);
    assert_eq!(
        sink.issued,
        vec![Command::ReadScroll { kind: ConsumableKind::ScrollMassBanishment }]
    );
    assert_eq!(world.live_actor_count(), 0, "banished actors leave the roster");
}

#[test]
fn teleport_level_is_the_desperate_exit() {
    let mut world = arena(20);
    add_brute(&mut world, Blow::new(BlowEffect::Hurt, 3, 10), 110, 1);
    add_brute(&mut world, Blow::new(BlowEffect::Hurt, 3, 10), 110, -1);
    world
        .agent
        .consumables
        .push((ConsumableKind::ScrollTeleportLevel, 1));

    let catalog = defend::standard_catalog();
    let mut ctx = EvalContext::new();
    let mut sink = RecordingSink::default();

    let acted = DefenseController::decide_and_act(
        &mut world,
        &OpenProjection,
        &mut ctx,
        &catalog,
        &mut sink,
    );

    assert!(acted);
    assert_eq!(
        sink.issued,
        vec![Command::ReadScroll { kind: ConsumableKind::ScrollTeleportLevel }]
    );
    // The actors stay; we are the ones leaving.
    assert_eq!(world.live_actor_count(), 2);
}

#[test]
fn defense_simulation_leaves_no_context_residue() {
    let mut world = arena(40);
    add_brute(&mut world, Blow::new(BlowEffect::Fire, 3, 10), 120, 2);
    world.agent.mana = 30;
    world.agent.max_mana = 30;
    world
        .agent
        .spells
        .push(SpellAbility { kind: SpellKind::ResistAll, mana_cost: 10, fail_pct: 5 });

    let catalog = defend::standard_catalog();
    let mut ctx = EvalContext::new();
    let mut sink = RecordingSink::default();

    DefenseController::decide_and_act(&mut world, &OpenProjection, &mut ctx, &catalog, &mut sink);

    for flag in [
        gloom_bot::Flag::TempResFire,
        gloom_bot::Flag::TempResCold,
        gloom_bot::Flag::Fast,
        gloom_bot::Flag::Shield,
        gloom_bot::Flag::OnGlyph,
    ] {
        assert!(!ctx.get(flag), "{flag:?} leaked out of defense scoring");
    }
    assert!(!ctx.simulating());
}
