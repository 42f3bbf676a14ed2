//! Offense: candidate collection, the standard catalog, and the
//! simulate-then-commit controller.

mod bias;
mod entries;
mod launch;

pub(crate) use launch::{AttackType, Shape};

use gloom_core::{
    CommandSink, DeviceKind, Element, ProjectionOracle, RaceFlags, SpellKind, WorldSnapshot,
};

use crate::catalog::{AttackAction, Effect, TacticalView, Target, best_entry};
use crate::context::{EvalContext, Flag};

use entries::{
    CastAttack, DeviceAttack, LaunchMissile, MeleeThrust, TeleportOtherAttack, UnknownWandZap,
};

/// Builds the standard offense catalog, in priority declaration order:
/// weaponwork first, then the spellbook, then charged devices. Ties in
/// the simulate pass resolve to the earliest entry.
pub fn standard_catalog() -> Vec<Box<dyn AttackAction>> {
    vec![
        Box::new(MeleeThrust),
        Box::new(LaunchMissile),
        // ---- spellbook: direct damage ----
        Box::new(CastAttack {
            name: "spell_magic_missile",
            spell: SpellKind::MagicMissile,
            shape: Shape::Bolt,
            typ: AttackType::Pure,
            dam: |a| 8 + a.level,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_magic_missile_reserve",
            spell: SpellKind::MagicMissile,
            shape: Shape::Bolt,
            typ: AttackType::Pure,
            dam: |a| 8 + a.level,
            reserve: true,
        }),
        Box::new(CastAttack {
            name: "spell_stinking_cloud",
            spell: SpellKind::StinkingCloud,
            shape: Shape::Ball(2),
            typ: AttackType::Element(Element::Poison),
            dam: |a| 10 + a.level / 2,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_light_beam",
            spell: SpellKind::LightBeam,
            shape: Shape::Beam,
            typ: AttackType::LightWeak,
            dam: |a| 16 + a.level,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_lightning_bolt",
            spell: SpellKind::LightningBolt,
            shape: Shape::Bolt,
            typ: AttackType::Element(Element::Elec),
            dam: |a| 20 + 2 * a.level,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_frost_bolt",
            spell: SpellKind::FrostBolt,
            shape: Shape::Bolt,
            typ: AttackType::Element(Element::Cold),
            dam: |a| 25 + 2 * a.level,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_fire_bolt",
            spell: SpellKind::FireBolt,
            shape: Shape::Bolt,
            typ: AttackType::Element(Element::Fire),
            dam: |a| 30 + 2 * a.level,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_acid_spray",
            spell: SpellKind::AcidSpray,
            shape: Shape::Ball(2),
            typ: AttackType::Element(Element::Acid),
            dam: |a| 20 + 2 * a.level,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_fire_ball",
            spell: SpellKind::FireBall,
            shape: Shape::Ball(2),
            typ: AttackType::Element(Element::Fire),
            dam: |a| 40 + 3 * a.level,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_ice_storm",
            spell: SpellKind::IceStorm,
            shape: Shape::Ball(3),
            typ: AttackType::Element(Element::Cold),
            dam: |a| 50 + 3 * a.level,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_mana_storm",
            spell: SpellKind::ManaStorm,
            shape: Shape::Ball(3),
            typ: AttackType::Pure,
            dam: |a| 300 + 4 * a.level,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_dispel_undead",
            spell: SpellKind::DispelUndead,
            shape: Shape::Dispel,
            typ: AttackType::DispelUndead,
            dam: |a| 3 * a.level,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_dispel_evil",
            spell: SpellKind::DispelEvil,
            shape: Shape::Dispel,
            typ: AttackType::DispelEvil,
            dam: |a| 3 * a.level,
            reserve: false,
        }),
        // ---- spellbook: crowd control ----
        Box::new(CastAttack {
            name: "spell_slow_monster",
            spell: SpellKind::SlowMonster,
            shape: Shape::Bolt,
            typ: AttackType::Slow,
            dam: |_| 0,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_confuse_monster",
            spell: SpellKind::ConfuseMonster,
            shape: Shape::Bolt,
            typ: AttackType::Confuse,
            dam: |_| 0,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_sleep_monsters",
            spell: SpellKind::SleepMonsters,
            shape: Shape::Dispel,
            typ: AttackType::Sleep,
            dam: |_| 0,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_hold_monster",
            spell: SpellKind::HoldMonster,
            shape: Shape::Bolt,
            typ: AttackType::Sleep,
            dam: |_| 0,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_scare_monster",
            spell: SpellKind::ScareMonster,
            shape: Shape::Bolt,
            typ: AttackType::Scare,
            dam: |_| 0,
            reserve: false,
        }),
        Box::new(CastAttack {
            name: "spell_polymorph_other",
            spell: SpellKind::PolymorphOther,
            shape: Shape::Bolt,
            typ: AttackType::Polymorph,
            dam: |_| 0,
            reserve: false,
        }),
        Box::new(TeleportOtherAttack),
        // ---- rods ----
        Box::new(DeviceAttack {
            name: "rod_elec_bolt",
            device: DeviceKind::RodElecBolt,
            shape: Shape::Bolt,
            typ: AttackType::Element(Element::Elec),
            dam: |_| 30,
        }),
        Box::new(DeviceAttack {
            name: "rod_cold_bolt",
            device: DeviceKind::RodColdBolt,
            shape: Shape::Bolt,
            typ: AttackType::Element(Element::Cold),
            dam: |_| 38,
        }),
        Box::new(DeviceAttack {
            name: "rod_acid_bolt",
            device: DeviceKind::RodAcidBolt,
            shape: Shape::Bolt,
            typ: AttackType::Element(Element::Acid),
            dam: |_| 36,
        }),
        Box::new(DeviceAttack {
            name: "rod_fire_bolt",
            device: DeviceKind::RodFireBolt,
            shape: Shape::Bolt,
            typ: AttackType::Element(Element::Fire),
            dam: |_| 45,
        }),
        Box::new(DeviceAttack {
            name: "rod_light_beam",
            device: DeviceKind::RodLightBeam,
            shape: Shape::Beam,
            typ: AttackType::LightWeak,
            dam: |_| 27,
        }),
        Box::new(DeviceAttack {
            name: "rod_drain_life",
            device: DeviceKind::RodDrainLife,
            shape: Shape::Bolt,
            typ: AttackType::DrainLife,
            dam: |_| 75,
        }),
        Box::new(DeviceAttack {
            name: "rod_slow_monster",
            device: DeviceKind::RodSlowMonster,
            shape: Shape::Bolt,
            typ: AttackType::Slow,
            dam: |_| 0,
        }),
        Box::new(DeviceAttack {
            name: "rod_sleep_monster",
            device: DeviceKind::RodSleepMonster,
            shape: Shape::Bolt,
            typ: AttackType::Sleep,
            dam: |_| 0,
        }),
        // ---- wands ----
        Box::new(DeviceAttack {
            name: "wand_magic_missile",
            device: DeviceKind::WandMagicMissile,
            shape: Shape::Bolt,
            typ: AttackType::Pure,
            dam: |_| 12,
        }),
        Box::new(DeviceAttack {
            name: "wand_elec_bolt",
            device: DeviceKind::WandElecBolt,
            shape: Shape::Bolt,
            typ: AttackType::Element(Element::Elec),
            dam: |_| 30,
        }),
        Box::new(DeviceAttack {
            name: "wand_cold_bolt",
            device: DeviceKind::WandColdBolt,
            shape: Shape::Bolt,
            typ: AttackType::Element(Element::Cold),
            dam: |_| 38,
        }),
        Box::new(DeviceAttack {
            name: "wand_acid_bolt",
            device: DeviceKind::WandAcidBolt,
            shape: Shape::Bolt,
            typ: AttackType::Element(Element::Acid),
            dam: |_| 36,
        }),
        Box::new(DeviceAttack {
            name: "wand_fire_bolt",
            device: DeviceKind::WandFireBolt,
            shape: Shape::Bolt,
            typ: AttackType::Element(Element::Fire),
            dam: |_| 45,
        }),
        Box::new(DeviceAttack {
            name: "wand_stinking_cloud",
            device: DeviceKind::WandStinkingCloud,
            shape: Shape::Ball(2),
            typ: AttackType::Element(Element::Poison),
            dam: |_| 12,
        }),
        Box::new(DeviceAttack {
            name: "wand_drain_life",
            device: DeviceKind::WandDrainLife,
            shape: Shape::Bolt,
            typ: AttackType::DrainLife,
            dam: |_| 75,
        }),
        Box::new(DeviceAttack {
            name: "wand_slow_monster",
            device: DeviceKind::WandSlowMonster,
            shape: Shape::Bolt,
            typ: AttackType::Slow,
            dam: |_| 0,
        }),
        Box::new(DeviceAttack {
            name: "wand_hold_monster",
            device: DeviceKind::WandHoldMonster,
            shape: Shape::Bolt,
            typ: AttackType::Sleep,
            dam: |_| 0,
        }),
        Box::new(DeviceAttack {
            name: "wand_confuse_monster",
            device: DeviceKind::WandConfuseMonster,
            shape: Shape::Bolt,
            typ: AttackType::Confuse,
            dam: |_| 0,
        }),
        Box::new(UnknownWandZap),
        // ---- staves ----
        Box::new(DeviceAttack {
            name: "staff_sleep_monsters",
            device: DeviceKind::StaffSleepMonsters,
            shape: Shape::Dispel,
            typ: AttackType::Sleep,
            dam: |_| 0,
        }),
        Box::new(DeviceAttack {
            name: "staff_slow_monsters",
            device: DeviceKind::StaffSlowMonsters,
            shape: Shape::Dispel,
            typ: AttackType::Slow,
            dam: |_| 0,
        }),
        Box::new(DeviceAttack {
            name: "staff_dispel_evil",
            device: DeviceKind::StaffDispelEvil,
            shape: Shape::Dispel,
            typ: AttackType::DispelEvil,
            dam: |_| 60,
        }),
        Box::new(DeviceAttack {
            name: "staff_power",
            device: DeviceKind::StaffPower,
            shape: Shape::Dispel,
            typ: AttackType::Pure,
            dam: |_| 120,
        }),
        Box::new(DeviceAttack {
            name: "staff_holiness",
            device: DeviceKind::StaffHoliness,
            shape: Shape::Dispel,
            typ: AttackType::DispelEvil,
            dam: |_| 120,
        }),
    ]
}

/// Candidate targets for this tick: recently seen, in view, in range,
/// filtered by engagement policy.
fn collect_targets(world: &WorldSnapshot) -> Vec<Target> {
    let agent = &world.agent;

    // First pass: is anything already on top of us? Several disengage
    // policies give way when the fight has found us regardless.
    let mut adjacent_monster = false;
    for (_, actor) in world.live_actors() {
        let dist = agent.pos.distance(actor.pos);
        let fast = world
            .race_of(actor)
            .map(|r| r.speed > agent.speed)
            .unwrap_or(false);
        if dist <= 1 || (fast && dist <= 2) {
            adjacent_monster = true;
        }
    }

    let mut targets = Vec::new();
    for (id, actor) in world.live_actors() {
        // Require current knowledge.
        if actor.last_seen + 2 < world.tick {
            continue;
        }
        let Some(race) = world.race_of(actor) else {
            continue;
        };

        // Fleeing policy: no side quests against breeders.
        if world.posture.ignoring_targets && !agent.afraid && race.has(RaceFlags::BREEDER) {
            continue;
        }

        // A notorious-killer level is for leaving, not clearing; fight
        // only what is already in our face or what we wildly outclass.
        if world.posture.scary_level {
            let outclassed = world.depth * 4 <= agent.level && agent.level > 10;
            if !adjacent_monster && !outclassed {
                continue;
            }
        }

        let Some(tile) = world.map.tile(actor.pos) else {
            continue;
        };
        // Never shoot at guesses: the cell must be seen, now.
        if !tile.known || !tile.in_view {
            continue;
        }
        if agent.pos.distance(actor.pos) > world.config.sense_radius {
            continue;
        }

        targets.push(Target { id, pos: actor.pos });
    }
    targets
}

/// The offense controller: simulate every entry, commit the winner.
pub struct AttackController;

impl AttackController {
    /// Runs one offense decision. Returns true when an action was
    /// committed.
    pub fn decide_and_act(
        world: &mut WorldSnapshot,
        proj: &dyn ProjectionOracle,
        ctx: &mut EvalContext,
        catalog: &[Box<dyn AttackAction>],
        sink: &mut dyn CommandSink,
    ) -> bool {
        if world.live_actor_count() == 0 {
            return false;
        }

        let targets = collect_targets(world);
        if targets.is_empty() {
            return false;
        }

        // Danger is priced as if we hold our ground and swing.
        let effect = ctx.with_flag(Flag::Attacking, true, |ctx| {
            let view = TacticalView { world: &*world, proj, targets: &targets };

            ctx.begin_simulation();
            let best = best_entry(catalog, |entry| {
                let utility = entry.score(&view, ctx);
                tracing::debug!(entry = entry.name(), value = utility.value(), "attack score");
                utility
            });
            ctx.end_simulation();

            let Some((index, value)) = best else {
                return None;
            };
            let entry = &catalog[index];
            tracing::info!(entry = entry.name(), value, "committing attack");
            Some(entry.apply(&view, ctx, sink))
        });

        match effect {
            None | Some(Effect::Aborted) => false,
            Some(Effect::None) | Some(Effect::Relocated) => true,
            Some(Effect::RemoveActors(ids)) => {
                for id in ids {
                    world.remove_actor(id);
                }
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloom_core::{Actor, AgentState, Blow, BlowEffect, Position, RaceTemplate, TileMap};

    struct OpenProjection;
    impl ProjectionOracle for OpenProjection {
        fn projectable(&self, _from: Position, _to: Position) -> bool {
            true
        }
        fn projectable_pure(&self, _from: Position, _to: Position) -> bool {
            true
        }
    }

    fn world_with_visible_actor() -> WorldSnapshot {
        let mut agent = AgentState::default();
        agent.pos = Position::new(5, 5);
        agent.hp = 50;
        agent.max_hp = 50;
        let mut world = WorldSnapshot::new(TileMap::open_floor(20, 20), agent);
        world.depth = 3;
        let race = world.add_race(
            RaceTemplate::builder("kobold")
                .blow(Blow::new(BlowEffect::Hurt, 1, 6))
                .build(),
        );
        let pos = Position::new(6, 5);
        for tile in [pos] {
            let mut t = world.map.tile(tile).unwrap();
            t.in_view = true;
            t.lit = true;
            world.map.set(tile, t);
        }
        world.add_actor(Actor::new(race, pos, 15)).unwrap();
        world
    }

    #[test]
    fn targets_require_view() {
        let mut world = world_with_visible_actor();
        assert_eq!(collect_targets(&world).len(), 1);
        let pos = Position::new(6, 5);
        let mut t = world.map.tile(pos).unwrap();
        t.in_view = false;
        world.map.set(pos, t);
        assert!(collect_targets(&world).is_empty());
    }

    #[test]
    fn stale_sightings_are_not_targets() {
        let mut world = world_with_visible_actor();
        world.tick = 10;
        assert!(collect_targets(&world).is_empty());
    }
}
