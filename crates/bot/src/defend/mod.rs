//! Defense: the self-preservation catalog and its controller.
//!
//! Defense utilities are almost always counterfactual deltas at the
//! agent's own cell: danger now minus danger with the buff active. A
//! floor policy keeps the catalog from flapping on marginal improvements;
//! the bar for spending a turn (and the fail rate tolerated on the cast)
//! scales with how much trouble the agent is actually in.

mod buffs;
mod escape;

use gloom_core::{CommandSink, ProjectionOracle, WorldSnapshot};

use crate::catalog::{DefenseAction, Effect, TacticalView, Target, best_entry};
use crate::context::EvalContext;
use crate::danger::evaluate_danger;

use buffs::{
    Bless, BerserkRage, CreateDoors, ElementalResist, Glyph, Haste, Heroism, MysticShield,
    ProtEvil, ResistAll, TeleportOtherDefense,
};
use escape::{BanishRace, Destruction, Earthquake, MassBanishment, TeleportLevel};

/// Builds the standard defense catalog in declaration order: cheap
/// posture buffs first, then resists and field control, then the
/// board-clearing escapes.
pub fn standard_catalog() -> Vec<Box<dyn DefenseAction>> {
    use gloom_core::{ConsumableKind, Element, SpellKind};

    use crate::context::Flag;

    vec![
        Box::new(Bless),
        Box::new(Haste),
        Box::new(ResistAll),
        Box::new(ElementalResist {
            name: "resist_fire",
            element: Element::Fire,
            flag: Flag::TempResFire,
            spell: SpellKind::ResistFire,
            potion: Some(ConsumableKind::PotionResistHeat),
        }),
        Box::new(ElementalResist {
            name: "resist_cold",
            element: Element::Cold,
            flag: Flag::TempResCold,
            spell: SpellKind::ResistCold,
            potion: None,
        }),
        Box::new(ElementalResist {
            name: "resist_acid",
            element: Element::Acid,
            flag: Flag::TempResAcid,
            spell: SpellKind::ResistAcid,
            potion: None,
        }),
        Box::new(ElementalResist {
            name: "resist_poison",
            element: Element::Poison,
            flag: Flag::TempResPoison,
            spell: SpellKind::ResistPoison,
            potion: Some(ConsumableKind::PotionResistPoison),
        }),
        Box::new(ProtEvil),
        Box::new(MysticShield),
        Box::new(TeleportOtherDefense),
        Box::new(Heroism),
        Box::new(BerserkRage),
        Box::new(Glyph),
        Box::new(CreateDoors),
        Box::new(MassBanishment),
        Box::new(BanishRace),
        Box::new(Earthquake),
        Box::new(Destruction),
        Box::new(TeleportLevel),
    ]
}

/// Fail rate tolerated on a defensive cast: the scarier the situation,
/// the less gambling is acceptable.
pub(crate) fn fail_allowance(p1: i32, avoidance: i32) -> i32 {
    let mut allowed = 25;
    if p1 > avoidance {
        allowed -= 19;
    } else if p1 > avoidance * 2 / 3 {
        allowed -= 10;
    } else if p1 < avoidance / 3 {
        allowed += 10;
    }
    allowed
}

/// The floor policy: a buff is worth a turn only if it is an actual
/// improvement, leaves the post-buff danger under the acceptable
/// ceiling, and the pre-buff danger was worth reacting to at all.
pub(crate) fn improvement_worthwhile(
    p1: i32,
    p2: i32,
    avoidance: i32,
    fighting_unique: bool,
) -> bool {
    let ceiling = if fighting_unique {
        avoidance * 2 / 3
    } else {
        avoidance / 2
    };
    p1 > p2 && p2 <= ceiling && p1 > avoidance / 7
}

/// Caster affliction gate shared by every spell-backed entry.
pub(crate) fn cannot_cast(agent: &gloom_core::AgentState) -> bool {
    agent.blind || agent.confused || agent.amnesia
}

/// Danger at the agent's cell under the current context.
pub(crate) fn danger_at_agent(
    view: &TacticalView<'_>,
    ctx: &EvalContext,
    averaged: bool,
) -> i32 {
    evaluate_danger(
        view.world,
        view.proj,
        ctx,
        view.world.agent.pos,
        1,
        averaged,
        false,
    )
}

/// Recent-knowledge roster view used by the defense catalog.
fn defense_targets(world: &WorldSnapshot) -> Vec<Target> {
    world
        .live_actors()
        .filter(|(_, actor)| actor.last_seen + 5 >= world.tick)
        .map(|(id, actor)| Target { id, pos: actor.pos })
        .collect()
}

/// The defense controller: compute the current danger once, simulate the
/// catalog against it, commit the winner.
pub struct DefenseController;

impl DefenseController {
    /// Runs one defense decision. Returns true when an action was
    /// committed; area clears and level escapes end the tick.
    pub fn decide_and_act(
        world: &mut WorldSnapshot,
        proj: &dyn ProjectionOracle,
        ctx: &mut EvalContext,
        catalog: &[Box<dyn DefenseAction>],
        sink: &mut dyn CommandSink,
    ) -> bool {
        let targets = defense_targets(world);

        let effect = {
            let view = TacticalView { world: &*world, proj, targets: &targets };
            let p1 = danger_at_agent(&view, ctx, true);

            ctx.begin_simulation();
            let best = best_entry(catalog, |entry| {
                let utility = entry.score(&view, ctx, p1);
                tracing::debug!(entry = entry.name(), value = utility.value(), "defense score");
                utility
            });
            ctx.end_simulation();

            match best {
                None => None,
                Some((index, value)) => {
                    let entry = &catalog[index];
                    tracing::info!(entry = entry.name(), value, p1, "committing defense");
                    Some(entry.apply(&view, ctx, p1, sink))
                }
            }
        };

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

    #[test]
    fn fail_allowance_tightens_with_danger() {
        let avoidance = 100;
        assert_eq!(fail_allowance(10, avoidance), 35);
        assert_eq!(fail_allowance(50, avoidance), 25);
        assert_eq!(fail_allowance(80, avoidance), 15);
        assert_eq!(fail_allowance(150, avoidance), 6);
    }

    #[test]
    fn floor_policy_rejects_marginal_buffs() {
        let avoidance = 70;
        // real improvement from real danger
        assert!(improvement_worthwhile(40, 10, avoidance, false));
        // danger too small to care
        assert!(!improvement_worthwhile(9, 1, avoidance, false));
        // improvement leaves us still in too much trouble
        assert!(!improvement_worthwhile(90, 60, avoidance, false));
        // boss fights tolerate a higher post-buff ceiling
        assert!(improvement_worthwhile(90, 45, avoidance, true));
        // no improvement, no action
        assert!(!improvement_worthwhile(30, 30, avoidance, false));
    }
}
