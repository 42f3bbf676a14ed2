//! Attack controller protocol tests: simulate-then-commit, tie-breaks,
//! and soundness (a non-positive score is never executed).

use gloom_bot::{
    AttackAction, AttackController, Effect, EvalContext, TacticalView, Utility, attack,
};
use gloom_core::{
    Actor, AgentState, Blow, BlowEffect, Command, CommandSink, Position, ProjectionOracle,
    RaceTemplate, RecordingSink, TileMap, WeaponProfile, WorldSnapshot,
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

/// A catalog double: fixed score, identifiable command on apply.
struct FixedEntry {
    name: &'static str,
    utility: Utility,
    marker: i32,
}

impl AttackAction for FixedEntry {
    fn name(&self) -> &'static str {
        self.name
    }

    fn score(&self, _view: &TacticalView<'_>, _ctx: &mut EvalContext) -> Utility {
        self.utility
    }

    fn apply(
        &self,
        _view: &TacticalView<'_>,
        _ctx: &mut EvalContext,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        sink.issue(Command::Throw { target: Position::new(self.marker, 0) });
        Effect::None
    }
}

/// A catalog double whose apply must never run.
struct NeverApply {
    utility: Utility,
}

impl AttackAction for NeverApply {
    fn name(&self) -> &'static str {
        "never_apply"
    }

    fn score(&self, _view: &TacticalView<'_>, _ctx: &mut EvalContext) -> Utility {
        self.utility
    }

    fn apply(
        &self,
        _view: &TacticalView<'_>,
        _ctx: &mut EvalContext,
        _sink: &mut dyn CommandSink,
    ) -> Effect {
        panic!("apply ran for an entry that never scored positive");
    }
}

fn world_with_visible_brute() -> WorldSnapshot {
    let mut agent = AgentState::default();
    agent.pos = Position::new(5, 5);
    agent.hp = 60;
    agent.max_hp = 60;
    agent.level = 8;
    agent.weapon = WeaponProfile { dice: 2, sides: 5, ..WeaponProfile::default() };
    let mut world = WorldSnapshot::new(TileMap::open_floor(20, 20), agent);
    world.depth = 3;
    let race = world.add_race(
        RaceTemplate::builder("kobold")
            .blow(Blow::new(BlowEffect::Hurt, 1, 6))
            .build(),
    );
    let pos = Position::new(6, 5);
    let mut tile = world.map.tile(pos).unwrap();
    tile.in_view = true;
    tile.lit = true;
    world.map.set(pos, tile);
    world.add_actor(Actor::new(race, pos, 16)).unwrap();
    world
}

#[test]
fn commits_the_highest_scoring_entry() {
    let mut world = world_with_visible_brute();
    let catalog: Vec<Box<dyn AttackAction>> = vec![
        Box::new(FixedEntry { name: "low", utility: Utility::Scored(10), marker: 10 }),
        Box::new(FixedEntry { name: "high", utility: Utility::Scored(15), marker: 15 }),
    ];
    let mut ctx = EvalContext::new();
    let mut sink = RecordingSink::default();

    let acted =
        AttackController::decide_and_act(&mut world, &OpenProjection, &mut ctx, &catalog, &mut sink);

    assert!(acted);
    assert_eq!(sink.issued, vec![Command::Throw { target: Position::new(15, 0) }]);
}

#[test]
fn ties_resolve_to_the_first_declared_entry() {
    let mut world = world_with_visible_brute();
    let catalog: Vec<Box<dyn AttackAction>> = vec![
        Box::new(FixedEntry { name: "first", utility: Utility::Scored(15), marker: 1 }),
        Box::new(FixedEntry { name: "second", utility: Utility::Scored(15), marker: 2 }),
    ];
    let mut ctx = EvalContext::new();
    let mut sink = RecordingSink::default();

    assert!(AttackController::decide_and_act(
        &mut world,
        &OpenProjection,
        &mut ctx,
        &catalog,
        &mut sink
    ));
    assert_eq!(sink.issued, vec![Command::Throw { target: Position::new(1, 0) }]);
}

#[test]
fn non_positive_scores_are_never_executed() {
    let mut world = world_with_visible_brute();
    let catalog: Vec<Box<dyn AttackAction>> = vec![
        Box::new(NeverApply { utility: Utility::Rejected }),
        Box::new(NeverApply { utility: Utility::Scored(0) }),
        Box::new(NeverApply { utility: Utility::Scored(-40) }),
    ];
    let mut ctx = EvalContext::new();
    let mut sink = RecordingSink::default();

    let acted =
        AttackController::decide_and_act(&mut world, &OpenProjection, &mut ctx, &catalog, &mut sink);

    assert!(!acted);
    assert!(sink.issued.is_empty());
}

#[test]
fn no_candidates_means_no_action() {
    // No actors at all: the catalog is never even consulted.
    let agent = AgentState::default();
    let mut world = WorldSnapshot::new(TileMap::open_floor(10, 10), agent);
    let catalog: Vec<Box<dyn AttackAction>> = vec![Box::new(FixedEntry {
        name: "eager",
        utility: Utility::Scored(100),
        marker: 9,
    })];
    let mut ctx = EvalContext::new();
    let mut sink = RecordingSink::default();

    assert!(!AttackController::decide_and_act(
        &mut world,
        &OpenProjection,
        &mut ctx,
        &catalog,
        &mut sink
    ));
    assert!(sink.issued.is_empty());
}

#[test]
fn standard_catalog_melees_an_adjacent_brute() {
    let mut world = world_with_visible_brute();
    let catalog = attack::standard_catalog();
    let mut ctx = EvalContext::new();
    let mut sink = RecordingSink::default();

    let acted =
        AttackController::decide_and_act(&mut world, &OpenProjection, &mut ctx, &catalog, &mut sink);

    assert!(acted);
    assert_eq!(sink.issued.len(), 1);
    assert!(
        matches!(sink.issued[0], Command::Melee { .. }),
        "expected a melee strike, got {:?}",
        sink.issued[0]
    );
}

#[test]
fn simulation_leaves_no_context_residue() {
    let mut world = world_with_visible_brute();
    let catalog = attack::standard_catalog();
    let mut ctx = EvalContext::new();
    let mut sink = RecordingSink::default();

    AttackController::decide_and_act(&mut world, &OpenProjection, &mut ctx, &catalog, &mut sink);

    assert!(!ctx.simulating());
    for flag in [
        gloom_bot::Flag::Attacking,
        gloom_bot::Flag::SleepPending,
        gloom_bot::Flag::SlowPending,
        gloom_bot::Flag::ConfusePending,
        gloom_bot::Flag::FearPending,
    ] {
        assert!(!ctx.get(flag), "{flag:?} leaked out of the simulate pass");
    }
}
