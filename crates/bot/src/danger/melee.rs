//! Melee threat: pricing a race's blow repertoire against the agent.
//!
//! Each blow slot maps its effect tag to expected damage plus a fear
//! addend for the side effect (stat drain hurts more than its hit points
//! of damage ever will). Addends are gated by whichever protection
//! neutralizes them; resisted elements are scaled, immune elements are
//! dropped outright.

use gloom_core::{BlowEffect, Element, RaceFlags, RaceTemplate, ResistFlags, SustainFlags, WorldSnapshot};

use crate::context::{EvalContext, Flag};

/// Extra armor granted by the (possibly hypothetical) mystic shield.
const SHIELD_ARMOR_BONUS: i32 = 50;

/// Outcome of pricing a single blow.
struct BlowThreat {
    /// Damage plus fear addends.
    value: i32,
    /// Accuracy weight of the blow method, fed to the hit-chance model.
    accuracy: i32,
    /// Protection-from-evil halves this blow when it applies.
    pfe_applies: bool,
}

impl BlowThreat {
    fn none() -> Self {
        Self { value: 0, accuracy: 0, pfe_applies: false }
    }
}

/// Total melee danger of one race, before turn-economy gating.
pub(crate) fn melee_threat(
    world: &WorldSnapshot,
    ctx: &EvalContext,
    race: &RaceTemplate,
    full_damage: bool,
) -> i32 {
    let agent = &world.agent;

    let mut armor = agent.armor;
    if ctx.get(Flag::Shield) {
        armor += SHIELD_ARMOR_BONUS;
    }

    // Protection from evil holds the line only against evil races the
    // agent outranks, and only while standing ground.
    let pfe = ctx.get(Flag::ProtEvil)
        && race.has(RaceFlags::EVIL)
        && agent.level >= race.level
        && !ctx.get(Flag::Attacking);

    let mut total = 0;
    for blow in &race.blows {
        let mut threat = blow_threat(world, ctx, blow.effect, blow.max_roll());
        if blow.stunning {
            // Knockout delivery: being stun-locked adjacent is how
            // characters die. Large flat surcharge.
            threat.value += 400;
        }
        if pfe && threat.pfe_applies {
            threat.value /= 2;
        }

        let mut z = threat.value - agent.damage_reduction;
        if z < 0 {
            z = 0;
        }

        if !full_damage {
            // Probability this blow lands, from armor against the race's
            // level and the blow's accuracy weight, with a 5% fluke
            // floor.
            let mut chance = 45 + (race.level + threat.accuracy) * 3 - (armor * 3) / 4;
            chance = chance.clamp(5, 100);
            z = z * chance / 100;
        }

        total += z;
    }

    total
}

/// Prices one blow effect. `roll` is the worst-case damage roll.
fn blow_threat(
    world: &WorldSnapshot,
    ctx: &EvalContext,
    effect: BlowEffect,
    roll: i32,
) -> BlowThreat {
    let agent = &world.agent;
    let mut z = roll;
    let mut accuracy = 0;
    let mut pfe_applies = true;

    match effect {
        BlowEffect::Hurt => {
            accuracy = 60;
        }
        BlowEffect::Shatter => {
            // Armor soaks a slice of the concussion.
            z -= z * agent.armor.min(150) / 250;
            z += 150;
            accuracy = 60;
        }

        // ---- elemental touches ----
        BlowEffect::Acid => {
            if agent.immune(Element::Acid) {
                return BlowThreat::none();
            }
            z = resist_scaled(z, agent.resists(Element::Acid), ctx.get(Flag::TempResAcid));
            // Corroded armor outlives the wound.
            z += 200;
        }
        BlowEffect::Elec => {
            if agent.immune(Element::Elec) {
                return BlowThreat::none();
            }
            z = resist_scaled(z, agent.resists(Element::Elec), ctx.get(Flag::TempResElec));
            z *= 2;
            accuracy = 10;
        }
        BlowEffect::Fire => {
            if agent.immune(Element::Fire) {
                return BlowThreat::none();
            }
            z = resist_scaled(z, agent.resists(Element::Fire), ctx.get(Flag::TempResFire));
            z *= 2;
            accuracy = 10;
        }
        BlowEffect::Cold => {
            if agent.immune(Element::Cold) {
                return BlowThreat::none();
            }
            z = resist_scaled(z, agent.resists(Element::Cold), ctx.get(Flag::TempResCold));
            z *= 2;
            accuracy = 10;
        }
        BlowEffect::Poison => {
            accuracy = 5;
            if !agent.resists(Element::Poison) && !ctx.get(Flag::TempResPoison) {
                z += 10;
            }
        }

        // ---- afflictions ----
        BlowEffect::Blind => {
            accuracy = 2;
            if !agent.resists.contains(ResistFlags::BLINDNESS) {
                z += 10;
                if agent.caster {
                    // A blind caster is out of the fight entirely.
                    z += 75;
                }
            }
        }
        BlowEffect::Confuse => {
            accuracy = 10;
            if !agent.resists.contains(ResistFlags::CONFUSION) {
                z += 200;
                if agent.caster {
                    z += 200;
                }
            }
        }
        BlowEffect::Terrify => {
            accuracy = 10;
            if !agent.resists.contains(ResistFlags::FEAR) {
                z *= 2;
            }
        }
        BlowEffect::Paralyze => {
            accuracy = 2;
            if !agent.resists.contains(ResistFlags::FREE_ACTION) {
                z += 200;
            }
        }
        BlowEffect::Hallucinate => {
            z += 250;
        }

        // ---- theft and depletion ----
        BlowEffect::Disenchant => {
            accuracy = 20;
            if !agent.resists.contains(ResistFlags::DISENCHANT) {
                z += 500;
            }
        }
        BlowEffect::DrainCharges => {
            accuracy = 15;
            z += 20;
        }
        BlowEffect::StealGold | BlowEffect::StealItem => {
            accuracy = 5;
            if agent.theft_protection < 100 {
                z += 5;
            }
        }
        BlowEffect::EatFood => {
            accuracy = 5;
            if agent.provisions_low {
                z += 5;
            }
        }

        // ---- stat drains ----
        BlowEffect::DrainStr => z += stat_drain_fear(agent, SustainFlags::STR),
        BlowEffect::DrainDex => z += stat_drain_fear(agent, SustainFlags::DEX),
        BlowEffect::DrainCon => z += stat_drain_fear(agent, SustainFlags::CON),
        BlowEffect::DrainInt => z += stat_drain_fear(agent, SustainFlags::INT),
        BlowEffect::DrainWis => z += stat_drain_fear(agent, SustainFlags::WIS),
        BlowEffect::DrainAll => {
            // Endgame boss signature; already priced by its raw roll.
            accuracy = 2;
            pfe_applies = false;
        }

        // ---- experience drains ----
        BlowEffect::DrainXpLight => z += xp_drain_fear(world, 100),
        BlowEffect::DrainXpModerate => z += xp_drain_fear(world, 150),
        BlowEffect::DrainXpHeavy => z += xp_drain_fear(world, 200),
        BlowEffect::DrainXpSevere => z += xp_drain_fear(world, 250),
    }

    BlowThreat { value: z, accuracy, pfe_applies }
}

/// Two-stage elemental scaling: each applicable resistance cuts the
/// damage to roughly a third.
pub(crate) fn resist_scaled(z: i32, permanent: bool, temporary: bool) -> i32 {
    let mut z = z;
    if permanent {
        z = (z + 2) / 3;
    }
    if temporary {
        z = (z + 2) / 3;
    }
    z
}

fn stat_drain_fear(agent: &gloom_core::AgentState, stat: SustainFlags) -> i32 {
    if agent.sustains.contains(stat) {
        return 0;
    }
    let mut fear = 150;
    if agent.low_stats.contains(stat) {
        // Draining an already-wrecked stat is an emergency.
        fear += 100;
    }
    fear
}

fn xp_drain_fear(world: &WorldSnapshot, fear: i32) -> i32 {
    let agent = &world.agent;
    if agent.resists.contains(ResistFlags::HOLD_LIFE) {
        return 0;
    }
    // Nothing left to drain at the level cap.
    if agent.level >= 50 {
        return 0;
    }
    fear
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloom_core::{AgentState, Blow, TileMap};

    fn world() -> WorldSnapshot {
        let mut agent = AgentState::default();
        agent.hp = 100;
        agent.max_hp = 100;
        WorldSnapshot::new(TileMap::open_floor(20, 20), agent)
    }

    fn race_with(blow: Blow) -> RaceTemplate {
        RaceTemplate::builder("tester").blow(blow).build()
    }

    #[test]
    fn plain_hurt_is_max_roll() {
        let world = world();
        let ctx = EvalContext::new();
        let race = race_with(Blow::new(BlowEffect::Hurt, 2, 6));
        assert_eq!(melee_threat(&world, &ctx, &race, true), 12);
    }

    #[test]
    fn fire_resistance_counterfactual_scales_to_a_third() {
        let mut world = world();
        let mut ctx = EvalContext::new();
        let race = race_with(Blow::new(BlowEffect::Fire, 3, 10));
        // unresisted: 30 scaled by nothing, then doubled for gear burn
        let bare = melee_threat(&world, &ctx, &race, true);
        assert_eq!(bare, 60);

        let with_temp =
            ctx.with_flag(Flag::TempResFire, true, |ctx| melee_threat(&world, ctx, &race, true));
        // (30 + 2) / 3 = 10, doubled = 20
        assert_eq!(with_temp, 20);
        // toggle must not leak
        assert_eq!(melee_threat(&world, &ctx, &race, true), 60);

        world.agent.resists |= ResistFlags::IMM_FIRE;
        assert_eq!(melee_threat(&world, &ctx, &race, true), 0);
    }

    #[test]
    fn paralysis_fear_gated_by_free_action() {
        let mut world = world();
        let ctx = EvalContext::new();
        let race = race_with(Blow::new(BlowEffect::Paralyze, 1, 4));
        assert_eq!(melee_threat(&world, &ctx, &race, true), 204);
        world.agent.resists |= ResistFlags::FREE_ACTION;
        assert_eq!(melee_threat(&world, &ctx, &race, true), 4);
    }

    #[test]
    fn damage_reduction_applies_per_blow() {
        let mut world = world();
        world.agent.damage_reduction = 3;
        let ctx = EvalContext::new();
        let race = RaceTemplate::builder("two blows")
            .blow(Blow::new(BlowEffect::Hurt, 1, 5))
            .blow(Blow::new(BlowEffect::Hurt, 1, 5))
            .build();
        assert_eq!(melee_threat(&world, &ctx, &race, true), 4);
    }

    #[test]
    fn partial_damage_never_drops_below_fluke_floor() {
        let mut world = world();
        world.agent.armor = 400;
        let ctx = EvalContext::new();
        let race = race_with(Blow::new(BlowEffect::Hurt, 10, 10));
        // floor is 5% of the roll
        assert_eq!(melee_threat(&world, &ctx, &race, false), 5);
    }
}
