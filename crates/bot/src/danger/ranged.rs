//! Ranged threat: pricing a race's spell and missile repertoire.
//!
//! Breath damage scales with the actor's remaining power, ball/bolt/beam
//! damage with the race's spell power. Status casts contribute fear
//! rather than damage, gated by the agent's saving throw; summons scale
//! inversely with how boxed-in the summoner's surroundings already are.
//!
//! The repertoire collapses to a single number in one of two ways: the
//! average over all abilities, or the single worst ability. Averaging is
//! the default for movement decisions; the peak overrides it when one
//! ability towers over the rest or would take off most of the agent's
//! remaining health, because "on average survivable" is cold comfort
//! against a breath that one-shots.

use gloom_core::{
    Actor, Element, Position, ProjectionOracle, RaceFlags, RaceTemplate, RangedAbility,
    ResistFlags, TerrainKind, WorldSnapshot,
};

use crate::context::{EvalContext, Flag};
use crate::danger::melee::resist_scaled;

/// Depth past which pure annoyance fear (shrieks, teleports, darkness) is
/// ignored; the endgame roster is all substance.
const ANNOYANCE_DEPTH_CUTOFF: i32 = 75;

/// Peak override: report the worst single ability instead of the average
/// when it exceeds the average by half again.
const PEAK_RATIO_TENTHS: i32 = 15;

/// Peak override: or when it threatens this fraction of current health.
const PEAK_HP_FRACTION_TENTHS: i32 = 8;

struct AbilityThreat {
    damage: i32,
    fear: i32,
    /// Bolt deliveries need an unobstructed straight line.
    bolt: bool,
}

impl AbilityThreat {
    fn none() -> Self {
        Self { damage: 0, fear: 0, bolt: false }
    }

    fn damage(z: i32) -> Self {
        Self { damage: z, fear: 0, bolt: false }
    }

    fn fear(p: i32) -> Self {
        Self { damage: 0, fear: p, bolt: false }
    }
}

/// Protections that blunt summons and evil casters, resolved once per
/// actor rather than per ability.
struct Wards {
    pfe: bool,
    /// Glyph under the evaluated cell, conjured doors, or a boss fight in
    /// progress: all reduce the marginal value of a summon.
    fortified: bool,
}

/// Ranged danger of one actor against `cell`, before turn-economy
/// scaling.
#[allow(clippy::too_many_arguments)]
pub(crate) fn ranged_threat(
    world: &WorldSnapshot,
    proj: &dyn ProjectionOracle,
    ctx: &EvalContext,
    actor: &Actor,
    race: &RaceTemplate,
    cell: Position,
    averaged: bool,
    full_damage: bool,
) -> i32 {
    if race.abilities.is_empty() {
        return 0;
    }

    let agent = &world.agent;

    let wards = Wards {
        pfe: ctx.get(Flag::ProtEvil)
            && race.has(RaceFlags::EVIL)
            && agent.level >= race.level,
        fortified: ctx.get(Flag::OnGlyph)
            || ctx.get(Flag::DoorsAhead)
            || world.posture.fighting_unique > 0
            || world
                .map
                .tile(cell)
                .map(|t| t.terrain == TerrainKind::Glyph)
                .unwrap_or(false),
    };

    let annoyance_muted = agent.max_depth >= ANNOYANCE_DEPTH_CUTOFF;

    let mut peak = 0;
    let mut total = 0;

    for &ability in &race.abilities {
        let mut threat = ability_threat(world, ctx, actor, race, ability, &wards);

        // A bolt cannot jump intervening bodies or walls to reach us; a
        // blocked bolt is no threat at all.
        if threat.bolt && !proj.projectable_pure(actor.pos, cell) {
            threat.damage = 0;
            threat.fear = 0;
        }
        if annoyance_muted {
            threat.fear = 0;
        }

        let value = threat.damage + threat.fear;
        if value > peak {
            peak = value;
        }
        total += value;
    }

    total -= agent.damage_reduction;
    if total < 0 {
        total = 0;
    }

    let average = total / race.abilities.len() as i32;

    if !averaged {
        return average;
    }
    // The full-damage path prices the certainty of the worst turn a bit
    // sooner than the expected path does; both share the override rule.
    let _ = full_damage;
    if peak >= average * PEAK_RATIO_TENTHS / 10 || peak > agent.hp * PEAK_HP_FRACTION_TENTHS / 10 {
        peak
    } else {
        average
    }
}

/// Prices one ability against the agent's current protections.
fn ability_threat(
    world: &WorldSnapshot,
    ctx: &EvalContext,
    actor: &Actor,
    race: &RaceTemplate,
    ability: RangedAbility,
    wards: &Wards,
) -> AbilityThreat {
    use RangedAbility::*;

    let agent = &world.agent;
    let hp = actor.power;
    let sp = race.spell_power;
    let save = agent.saving_throw;

    // Already-stunned agents dread anything that stuns again.
    let stun_bonus = if agent.heavy_stunned {
        1000
    } else if agent.stunned {
        500
    } else {
        0
    };

    match ability {
        // ================================================================
        // Innate missiles
        // ================================================================
        Shriek => AbilityThreat::fear(5),
        LightShot => AbilityThreat { damage: (sp / 8 + 1) * 5, fear: 0, bolt: true },
        Arrow => AbilityThreat { damage: (sp / 8 + 1) * 6, fear: 0, bolt: true },
        HeavyBolt => AbilityThreat { damage: (sp / 8 + 1) * 7, fear: 0, bolt: true },
        Boulder => AbilityThreat { damage: (1 + sp / 7) * 12, fear: 0, bolt: true },

        // ================================================================
        // Breaths: power-fraction damage, element caps, resist scaling
        // ================================================================
        BreathAcid => elemental_breath(world, ctx, hp / 3, 1600, Element::Acid, 40),
        BreathElec => elemental_breath(world, ctx, hp / 3, 1600, Element::Elec, 20),
        BreathFire => elemental_breath(world, ctx, hp / 3, 1600, Element::Fire, 40),
        BreathCold => elemental_breath(world, ctx, hp / 3, 1600, Element::Cold, 20),
        BreathPoison => {
            let mut z = (hp / 3).min(800);
            let resisted = agent.resists(Element::Poison) || ctx.get(Flag::TempResPoison);
            z = resist_scaled(
                z,
                agent.resists(Element::Poison),
                ctx.get(Flag::TempResPoison),
            );
            let fear = if resisted { 0 } else { 20 };
            AbilityThreat { damage: z, fear, bolt: false }
        }
        BreathNether => {
            let mut z = (hp / 6).min(600);
            if agent.resists.contains(ResistFlags::NETHER) {
                z = z * 6 / 8;
                AbilityThreat::damage(z)
            } else {
                AbilityThreat { damage: z, fear: 125, bolt: false }
            }
        }
        BreathLight => {
            let mut z = (hp / 6).min(500);
            if agent.resists.contains(ResistFlags::LIGHT) {
                z = z * 2 / 3;
                return AbilityThreat::damage(z);
            }
            if agent.resists.contains(ResistFlags::BLINDNESS) {
                return AbilityThreat::damage(z);
            }
            let mut fear = 20;
            if agent.caster {
                fear += 20;
            }
            AbilityThreat { damage: z, fear, bolt: false }
        }
        BreathDark => {
            let mut z = (hp / 6).min(500);
            if agent.resists.contains(ResistFlags::DARK) {
                z = z * 2 / 3;
                return AbilityThreat::damage(z);
            }
            if agent.resists.contains(ResistFlags::BLINDNESS) {
                return AbilityThreat::damage(z);
            }
            let mut fear = 20;
            if agent.caster {
                fear += 20;
            }
            AbilityThreat { damage: z, fear, bolt: false }
        }
        BreathSound => {
            let mut z = (hp / 6).min(500);
            if agent.resists.contains(ResistFlags::SOUND) {
                z = z * 5 / 9;
                return AbilityThreat::damage(z);
            }
            z += stun_bonus;
            AbilityThreat { damage: z, fear: 50, bolt: false }
        }
        BreathChaos => {
            let mut z = (hp / 6).min(600);
            if agent.resists.contains(ResistFlags::CHAOS) {
                z = z * 6 / 9;
                return AbilityThreat { damage: z, fear: 100, bolt: false };
            }
            AbilityThreat { damage: z, fear: 300, bolt: false }
        }
        BreathDisenchant => {
            let mut z = (hp / 6).min(500);
            if agent.resists.contains(ResistFlags::DISENCHANT) {
                z = z * 6 / 10;
                return AbilityThreat::damage(z);
            }
            AbilityThreat { damage: z, fear: 500, bolt: false }
        }
        BreathNexus => {
            let mut z = (hp / 6).min(400);
            if agent.resists.contains(ResistFlags::NEXUS) {
                z = z * 6 / 10;
                return AbilityThreat::damage(z);
            }
            AbilityThreat { damage: z, fear: 100, bolt: false }
        }
        BreathTime => AbilityThreat { damage: (hp / 3).min(150), fear: 250, bolt: false },
        BreathInertia => AbilityThreat { damage: (hp / 6).min(200), fear: 100, bolt: false },
        BreathGravity => {
            let mut z = (hp / 3).min(200);
            if !agent.resists.contains(ResistFlags::SOUND) {
                z += stun_bonus;
            }
            AbilityThreat { damage: z, fear: 100, bolt: false }
        }
        BreathShards => {
            let mut z = (hp / 6).min(500);
            if agent.resists.contains(ResistFlags::SHARDS) {
                z = z * 6 / 9;
                return AbilityThreat::damage(z);
            }
            AbilityThreat { damage: z, fear: 50, bolt: false }
        }
        BreathPlasma => {
            let mut z = (hp / 6).min(150);
            if agent.resists.contains(ResistFlags::SOUND) {
                return AbilityThreat::damage(z);
            }
            z += stun_bonus;
            AbilityThreat { damage: z, fear: 100, bolt: false }
        }
        BreathForce => {
            let mut z = (hp / 6).min(200);
            if agent.resists.contains(ResistFlags::SOUND) {
                return AbilityThreat::damage(z);
            }
            z += stun_bonus / 2;
            AbilityThreat { damage: z, fear: 50, bolt: false }
        }
        BreathMana => AbilityThreat::damage((hp / 3).min(1600)),

        // ================================================================
        // Balls: spell-power-scaled area bursts
        // ================================================================
        BallAcid => elemental_ball(world, ctx, sp * 3 + 15, Element::Acid, 40),
        BallElec => elemental_ball(world, ctx, sp * 3 / 2 + 8, Element::Elec, 20),
        BallFire => elemental_ball(world, ctx, sp * 7 / 2 + 10, Element::Fire, 40),
        BallCold => elemental_ball(world, ctx, sp * 3 / 2 + 10, Element::Cold, 20),
        BallPoison => {
            let mut z = (sp / 2 + 3) * 4;
            let resisted = agent.resists(Element::Poison) || ctx.get(Flag::TempResPoison);
            z = resist_scaled(
                z,
                agent.resists(Element::Poison),
                ctx.get(Flag::TempResPoison),
            );
            AbilityThreat { damage: z, fear: if resisted { 0 } else { 20 }, bolt: false }
        }
        BallShards => {
            let mut z = sp * 3 / 2 + 10;
            if agent.resists.contains(ResistFlags::SHARDS) {
                z = z * 6 / 9;
                return AbilityThreat::damage(z);
            }
            AbilityThreat { damage: z, fear: 20, bolt: false }
        }
        BallNether => {
            let mut z = sp * 4 + 100;
            if agent.resists.contains(ResistFlags::NETHER) {
                z = z * 6 / 8;
                return AbilityThreat::damage(z);
            }
            AbilityThreat { damage: z, fear: 250, bolt: false }
        }
        BallWater => {
            let mut z = sp * 5 / 2 + 50;
            if agent.resists.contains(ResistFlags::SOUND) {
                return AbilityThreat::damage(z);
            }
            z += stun_bonus;
            let mut fear = 0;
            if !agent.resists.contains(ResistFlags::CONFUSION) {
                fear += 50;
                if agent.caster {
                    fear += 20;
                }
            }
            AbilityThreat { damage: z, fear, bolt: false }
        }
        BallMana => AbilityThreat { damage: sp * 5 + 100, fear: 50, bolt: false },
        BallDark => {
            let mut z = sp * 4 + 100;
            if agent.resists.contains(ResistFlags::DARK) {
                z = z * 6 / 9;
                return AbilityThreat::damage(z);
            }
            if agent.resists.contains(ResistFlags::BLINDNESS) {
                return AbilityThreat::damage(z);
            }
            let mut fear = 20;
            if agent.caster {
                fear += 20;
            }
            AbilityThreat { damage: z, fear, bolt: false }
        }
        BallLight => {
            let mut z = 10 + sp * 3 / 2;
            if agent.resists.contains(ResistFlags::LIGHT) {
                z = z * 6 / 9;
                return AbilityThreat::damage(z);
            }
            if agent.resists.contains(ResistFlags::BLINDNESS) {
                return AbilityThreat::damage(z);
            }
            let mut fear = 20;
            if agent.caster {
                fear += 20;
            }
            AbilityThreat { damage: z, fear, bolt: false }
        }
        BallHoly => AbilityThreat { damage: 10 + (sp * 3 / 2 + 1) / 2, fear: 50, bolt: false },
        Storm => {
            let mut z = 70 + sp * 5;
            if agent.resists.contains(ResistFlags::SOUND) {
                return AbilityThreat::damage(z);
            }
            z += stun_bonus;
            AbilityThreat::damage(z)
        }

        // ================================================================
        // Bolts and beams: straight-line deliveries
        // ================================================================
        BoltAcid => elemental_bolt(world, ctx, 56 + sp / 3, Element::Acid, 40),
        BoltElec => elemental_bolt(world, ctx, 32 + sp / 3, Element::Elec, 20),
        BoltFire => elemental_bolt(world, ctx, 72 + sp / 3, Element::Fire, 40),
        BoltCold => elemental_bolt(world, ctx, 48 + sp / 3, Element::Cold, 20),
        BoltPoison => {
            let mut z = 72 + sp / 3;
            z = resist_scaled(
                z,
                agent.resists(Element::Poison),
                ctx.get(Flag::TempResPoison),
            );
            AbilityThreat { damage: z, fear: 0, bolt: true }
        }
        BoltNether => {
            let mut z = 75 + sp * 3 / 2;
            if agent.resists.contains(ResistFlags::NETHER) {
                z = z * 6 / 8;
                return AbilityThreat { damage: z, fear: 0, bolt: true };
            }
            AbilityThreat { damage: z, fear: 200, bolt: true }
        }
        BoltWater => {
            let mut z = 100 + sp;
            if !agent.resists.contains(ResistFlags::SOUND) {
                z += stun_bonus;
            }
            let mut fear = 0;
            if !agent.resists.contains(ResistFlags::CONFUSION) {
                fear = 20;
                if agent.caster {
                    fear += 20;
                }
            }
            AbilityThreat { damage: z, fear, bolt: true }
        }
        BoltMana => AbilityThreat { damage: sp * 5 / 2 + 50, fear: 50, bolt: true },
        BoltPlasma => {
            let mut z = 66 + sp;
            if !agent.resists.contains(ResistFlags::SOUND) {
                z += stun_bonus;
            }
            AbilityThreat { damage: z, fear: 0, bolt: true }
        }
        BoltIce => {
            let mut z = 36 + sp;
            z = resist_scaled(z, agent.resists(Element::Ice), ctx.get(Flag::TempResCold));
            if !agent.resists.contains(ResistFlags::SOUND) {
                z += stun_bonus / 10;
            }
            AbilityThreat { damage: z, fear: 20, bolt: true }
        }
        MagicMissile => AbilityThreat { damage: 12 + sp / 3, fear: 0, bolt: true },
        BeamElec => {
            let mut z = 55 + sp * 2;
            z = resist_scaled(z, agent.resists(Element::Elec), ctx.get(Flag::TempResElec));
            AbilityThreat { damage: z, fear: 0, bolt: true }
        }
        BeamNether => {
            let mut z = 55 + sp * 2;
            if agent.resists.contains(ResistFlags::NETHER) {
                z = z * 6 / 8;
            }
            AbilityThreat { damage: z, fear: 0, bolt: true }
        }

        // ================================================================
        // Mind attacks: gated by the saving throw
        // ================================================================
        DrainMana => {
            if agent.max_mana > 0 {
                AbilityThreat::fear(100)
            } else {
                AbilityThreat::none()
            }
        }
        MindBlast => {
            if save >= 100 {
                AbilityThreat::none()
            } else {
                AbilityThreat::damage(sp / 2 + 1)
            }
        }
        BrainSmash => {
            let fear = (200 - 2 * save).max(0);
            AbilityThreat { damage: 96, fear, bolt: false }
        }
        CauseWounds => {
            if save >= 100 {
                return AbilityThreat::none();
            }
            // Discounted by the save, padded 20% for bad luck.
            let z = (sp / 3 * 2) * 5 * (120 - save) / 100;
            AbilityThreat::damage(z)
        }

        // ================================================================
        // Annoyances: fear only, mostly save-gated
        // ================================================================
        Scare => {
            if save >= 100 || agent.resists.contains(ResistFlags::FEAR) {
                AbilityThreat::none()
            } else {
                AbilityThreat::fear(10)
            }
        }
        Blind => {
            if save >= 100 || agent.resists.contains(ResistFlags::BLINDNESS) {
                AbilityThreat::none()
            } else {
                AbilityThreat::fear(10)
            }
        }
        Confuse => {
            if save >= 100 || agent.resists.contains(ResistFlags::CONFUSION) {
                AbilityThreat::none()
            } else {
                AbilityThreat::fear(10)
            }
        }
        Slow => {
            if save >= 100 || agent.resists.contains(ResistFlags::FREE_ACTION) {
                AbilityThreat::none()
            } else {
                AbilityThreat::fear(5)
            }
        }
        Hold => {
            if save >= 100 || agent.resists.contains(ResistFlags::FREE_ACTION) {
                AbilityThreat::none()
            } else {
                AbilityThreat::fear(150)
            }
        }
        Haste => AbilityThreat::fear(10),
        Heal => AbilityThreat::fear(10),
        Blink => AbilityThreat::none(),
        Teleport => AbilityThreat::fear(10),
        TeleportTo => AbilityThreat::fear(20),
        TeleportAway => AbilityThreat::fear(10),
        TeleportLevel => {
            if save >= 100 {
                AbilityThreat::none()
            } else {
                AbilityThreat::fear(50)
            }
        }
        Darkness => AbilityThreat::fear(5),
        CreateTraps => AbilityThreat::fear(50),
        Forget => {
            if save >= 100 {
                AbilityThreat::none()
            } else if agent.caster && agent.mana < 15 {
                // Spell memory is the caster's whole kit.
                AbilityThreat::fear(500)
            } else {
                AbilityThreat::fear(30)
            }
        }

        // ================================================================
        // Summons: marginal danger shrinks as the ground fills up
        // ================================================================
        SummonKin => summon_threat(world, race, actor, wards, (1, 3, 7)),
        SummonMonster => summon_threat(world, race, actor, wards, (0, 0, 5)),
        SummonMonsters => summon_threat(world, race, actor, wards, (0, 0, 7)),
        SummonAnimals => summon_threat(world, race, actor, wards, (0, 0, 5)),
        SummonSpiders => summon_threat(world, race, actor, wards, (0, 0, 5)),
        SummonHounds => summon_threat(world, race, actor, wards, (0, 0, 5)),
        SummonHydras => summon_threat(world, race, actor, wards, (1, 2, 5)),
        SummonAinu => summon_threat(world, race, actor, wards, (1, 3, 7)),
        SummonDemon => summon_threat(world, race, actor, wards, (1, 3, 7)),
        SummonHiDemons => summon_threat(world, race, actor, wards, (1, 6, 12)),
        SummonUndead => summon_threat(world, race, actor, wards, (1, 3, 7)),
        SummonHiUndead => summon_threat(world, race, actor, wards, (1, 6, 12)),
        SummonDragon => summon_threat(world, race, actor, wards, (1, 3, 7)),
        SummonHiDragons => summon_threat(world, race, actor, wards, (0, 6, 12)),
        SummonWraiths => summon_threat(world, race, actor, wards, (1, 6, 12)),
        SummonUniques => summon_threat(world, race, actor, wards, (1, 3, 6)),
    }
}

/// Breath of a fully resistible element: immunity voids it, each layer of
/// resistance cuts it to a third, fear stays (scorched gear is scorched
/// gear).
fn elemental_breath(
    world: &WorldSnapshot,
    ctx: &EvalContext,
    raw: i32,
    cap: i32,
    element: Element,
    fear: i32,
) -> AbilityThreat {
    let agent = &world.agent;
    if agent.immune(element) {
        return AbilityThreat::none();
    }
    let z = resist_scaled(
        raw.min(cap),
        agent.resists(element),
        temp_flag_set(ctx, element),
    );
    AbilityThreat { damage: z, fear, bolt: false }
}

fn elemental_ball(
    world: &WorldSnapshot,
    ctx: &EvalContext,
    raw: i32,
    element: Element,
    fear: i32,
) -> AbilityThreat {
    let agent = &world.agent;
    if agent.immune(element) {
        return AbilityThreat::none();
    }
    let z = resist_scaled(raw, agent.resists(element), temp_flag_set(ctx, element));
    AbilityThreat { damage: z, fear, bolt: false }
}

fn elemental_bolt(
    world: &WorldSnapshot,
    ctx: &EvalContext,
    raw: i32,
    element: Element,
    fear: i32,
) -> AbilityThreat {
    let agent = &world.agent;
    if agent.immune(element) {
        return AbilityThreat::none();
    }
    let z = resist_scaled(raw, agent.resists(element), temp_flag_set(ctx, element));
    AbilityThreat { damage: z, fear, bolt: true }
}

fn temp_flag_set(ctx: &EvalContext, element: Element) -> bool {
    let flag = match element {
        Element::Acid => Flag::TempResAcid,
        Element::Elec => Flag::TempResElec,
        Element::Fire => Flag::TempResFire,
        Element::Cold | Element::Ice => Flag::TempResCold,
        Element::Poison => Flag::TempResPoison,
        _ => return false,
    };
    ctx.get(flag)
}

/// Summon fear: `weights` are the spell-power multipliers under
/// (protection-from-evil, fortification, open ground) respectively.
///
/// The more of the summoner's surroundings are already protected cells,
/// the fewer arrivals fit; eight protected neighbours effectively mutes
/// the summon.
fn summon_threat(
    world: &WorldSnapshot,
    race: &RaceTemplate,
    actor: &Actor,
    wards: &Wards,
    weights: (i32, i32, i32),
) -> AbilityThreat {
    let protected = world.protected_neighbours(actor.pos);
    let spot_safe = if protected >= 8 { 100 } else { 1 + protected };

    let weight = if wards.pfe {
        weights.0
    } else if wards.fortified {
        weights.1
    } else {
        weights.2
    };
    if weight == 0 {
        return AbilityThreat::none();
    }

    let mut p = race.spell_power * weight / spot_safe;
    // A unique summoner is the fight itself; its reinforcements matter
    // less than finishing it.
    if race.has(RaceFlags::UNIQUE) {
        p = p * 75 / 100;
    }
    AbilityThreat::fear(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloom_core::{Actor, AgentState, RaceId, TileMap};

    struct OpenProjection;
    impl ProjectionOracle for OpenProjection {
        fn projectable(&self, _from: Position, _to: Position) -> bool {
            true
        }
        fn projectable_pure(&self, _from: Position, _to: Position) -> bool {
            true
        }
    }

    struct BlockedProjection;
    impl ProjectionOracle for BlockedProjection {
        fn projectable(&self, _from: Position, _to: Position) -> bool {
            true
        }
        fn projectable_pure(&self, _from: Position, _to: Position) -> bool {
            false
        }
    }

    fn world() -> WorldSnapshot {
        let mut agent = AgentState::default();
        agent.pos = Position::new(5, 5);
        agent.hp = 200;
        agent.max_hp = 200;
        WorldSnapshot::new(TileMap::open_floor(20, 20), agent)
    }

    fn breather(hp: i32, ability: RangedAbility) -> (RaceTemplate, Actor) {
        let race = RaceTemplate::builder("breather")
            .cast_freq(25)
            .ability(ability)
            .build();
        let actor = Actor::new(RaceId(1), Position::new(8, 5), hp);
        (race, actor)
    }

    #[test]
    fn fire_breath_is_a_third_of_power() {
        let world = world();
        let ctx = EvalContext::new();
        let (race, actor) = breather(300, RangedAbility::BreathFire);
        let threat = ranged_threat(
            &world,
            &OpenProjection,
            &ctx,
            &actor,
            &race,
            world.agent.pos,
            true,
            true,
        );
        // 300/3 = 100 damage + 40 fear, single ability: peak == average
        assert_eq!(threat, 140);
    }

    #[test]
    fn fire_resistance_scales_breath() {
        let mut world = world();
        world.agent.resists |= ResistFlags::FIRE;
        let ctx = EvalContext::new();
        let (race, actor) = breather(300, RangedAbility::BreathFire);
        let threat = ranged_threat(
            &world,
            &OpenProjection,
            &ctx,
            &actor,
            &race,
            world.agent.pos,
            true,
            true,
        );
        // (100 + 2) / 3 = 34, plus fear
        assert_eq!(threat, 74);
    }

    #[test]
    fn bolt_needs_clear_line() {
        let world = world();
        let ctx = EvalContext::new();
        let (race, actor) = breather(100, RangedAbility::BoltFire);
        let open = ranged_threat(
            &world,
            &OpenProjection,
            &ctx,
            &actor,
            &race,
            world.agent.pos,
            true,
            true,
        );
        assert!(open > 0);
        let blocked = ranged_threat(
            &world,
            &BlockedProjection,
            &ctx,
            &actor,
            &race,
            world.agent.pos,
            true,
            true,
        );
        assert_eq!(blocked, 0);
    }

    #[test]
    fn peak_overrides_average_when_one_ability_towers() {
        let world = world();
        let ctx = EvalContext::new();
        let race = RaceTemplate::builder("mixed caster")
            .cast_freq(50)
            .spell_power(20)
            .ability(RangedAbility::Shriek)
            .ability(RangedAbility::BreathMana)
            .build();
        let actor = Actor::new(RaceId(1), Position::new(8, 5), 900);
        let averaged = ranged_threat(
            &world,
            &OpenProjection,
            &ctx,
            &actor,
            &race,
            world.agent.pos,
            true,
            true,
        );
        // breath mana: 300; shriek: 5; average 152; peak 300 >= 152*1.5
        assert_eq!(averaged, 300);
        let plain_average = ranged_threat(
            &world,
            &OpenProjection,
            &ctx,
            &actor,
            &race,
            world.agent.pos,
            false,
            true,
        );
        assert_eq!(plain_average, 152);
    }

    #[test]
    fn summons_discounted_by_protected_ground() {
        let mut world = world();
        let race = RaceTemplate::builder("summoner")
            .cast_freq(50)
            .spell_power(30)
            .ability(RangedAbility::SummonHiUndead)
            .build();
        let actor = Actor::new(RaceId(1), Position::new(8, 5), 100);
        let ctx = EvalContext::new();
        let open = ranged_threat(
            &world,
            &OpenProjection,
            &ctx,
            &actor,
            &race,
            world.agent.pos,
            true,
            true,
        );
        // wall in three of the summoner's neighbours
        for dy in -1..=1 {
            world
                .map
                .set(actor.pos.offset(1, dy), gloom_core::Tile::wall());
        }
        let fortified = ranged_threat(
            &world,
            &OpenProjection,
            &ctx,
            &actor,
            &race,
            world.agent.pos,
            true,
            true,
        );
        assert!(fortified < open, "{fortified} < {open}");
    }
}
