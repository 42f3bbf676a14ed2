//! Attack effect vocabulary.
//!
//! Race templates describe what an actor can do with two small tag
//! alphabets: melee [`BlowEffect`]s and [`RangedAbility`]s. The tags carry
//! no formulas themselves; the threat model maps each tag to a damage
//! profile. Keeping the tags dumb keeps the templates serializable and the
//! formulas testable in one place.

/// Damage elements, used both for incoming threat mitigation (agent
/// resistances) and outgoing attack gating (race immunities).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Element {
    Acid,
    Elec,
    Fire,
    Cold,
    Poison,
    Nether,
    Light,
    Dark,
    Sound,
    Shards,
    Chaos,
    Disenchant,
    Nexus,
    Time,
    Inertia,
    Gravity,
    Plasma,
    Force,
    Water,
    Ice,
    Mana,
    Holy,
    /// Plain unresistable magic (missiles, meteors).
    Missile,
}

/// Melee blow effect tags.
///
/// One blow is an effect tag plus damage dice; see [`crate::race::Blow`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlowEffect {
    /// Plain physical damage.
    Hurt,
    /// Physical damage partially soaked by armor.
    Shatter,
    Acid,
    Elec,
    Fire,
    Cold,
    Poison,
    Blind,
    Confuse,
    Terrify,
    Paralyze,
    Disenchant,
    DrainCharges,
    StealGold,
    StealItem,
    EatFood,
    DrainStr,
    DrainDex,
    DrainCon,
    DrainInt,
    DrainWis,
    /// Drains every stat at once.
    DrainAll,
    DrainXpLight,
    DrainXpModerate,
    DrainXpHeavy,
    DrainXpSevere,
    Hallucinate,
}

/// Ranged and spell ability tags on a race template.
///
/// Grouped by delivery: innate missiles, breaths (damage scales with the
/// actor's remaining power), balls/bolts/beams (damage scales with the
/// race's spell power), mind attacks, annoyance casts, and summons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RangedAbility {
    // ---- innate missiles ----
    Shriek,
    LightShot,
    Arrow,
    HeavyBolt,
    Boulder,

    // ---- breaths ----
    BreathAcid,
    BreathElec,
    BreathFire,
    BreathCold,
    BreathPoison,
    BreathNether,
    BreathLight,
    BreathDark,
    BreathSound,
    BreathChaos,
    BreathDisenchant,
    BreathNexus,
    BreathTime,
    BreathInertia,
    BreathGravity,
    BreathShards,
    BreathPlasma,
    BreathForce,
    BreathMana,

    // ---- balls ----
    BallAcid,
    BallElec,
    BallFire,
    BallCold,
    BallPoison,
    BallShards,
    BallNether,
    BallWater,
    BallMana,
    BallDark,
    BallLight,
    BallHoly,
    Storm,

    // ---- bolts and beams ----
    BoltAcid,
    BoltElec,
    BoltFire,
    BoltCold,
    BoltPoison,
    BoltNether,
    BoltWater,
    BoltMana,
    BoltPlasma,
    BoltIce,
    MagicMissile,
    BeamElec,
    BeamNether,

    // ---- mind attacks ----
    DrainMana,
    MindBlast,
    BrainSmash,
    CauseWounds,

    // ---- annoyance casts ----
    Scare,
    Blind,
    Confuse,
    Slow,
    Hold,
    Haste,
    Heal,
    Blink,
    Teleport,
    TeleportTo,
    TeleportAway,
    TeleportLevel,
    Darkness,
    CreateTraps,
    Forget,

    // ---- summons ----
    SummonKin,
    SummonMonster,
    SummonMonsters,
    SummonAnimals,
    SummonSpiders,
    SummonHounds,
    SummonHydras,
    SummonAinu,
    SummonDemon,
    SummonHiDemons,
    SummonUndead,
    SummonHiUndead,
    SummonDragon,
    SummonHiDragons,
    SummonWraiths,
    SummonUniques,
}

impl RangedAbility {
    /// True for bolt-delivery abilities: they travel in a straight line and
    /// cannot jump over intervening monsters or walls.
    pub fn is_bolt(self) -> bool {
        matches!(
            self,
            RangedAbility::Boulder
                | RangedAbility::BoltAcid
                | RangedAbility::BoltElec
                | RangedAbility::BoltFire
                | RangedAbility::BoltCold
                | RangedAbility::BoltPoison
                | RangedAbility::BoltNether
                | RangedAbility::BoltWater
                | RangedAbility::BoltMana
                | RangedAbility::BoltPlasma
                | RangedAbility::BoltIce
                | RangedAbility::MagicMissile
                | RangedAbility::BeamElec
                | RangedAbility::BeamNether
        )
    }

    /// True for the summon family.
    pub fn is_summon(self) -> bool {
        matches!(
            self,
            RangedAbility::SummonKin
                | RangedAbility::SummonMonster
                | RangedAbility::SummonMonsters
                | RangedAbility::SummonAnimals
                | RangedAbility::SummonSpiders
                | RangedAbility::SummonHounds
                | RangedAbility::SummonHydras
                | RangedAbility::SummonAinu
                | RangedAbility::SummonDemon
                | RangedAbility::SummonHiDemons
                | RangedAbility::SummonUndead
                | RangedAbility::SummonHiUndead
                | RangedAbility::SummonDragon
                | RangedAbility::SummonHiDragons
                | RangedAbility::SummonWraiths
                | RangedAbility::SummonUniques
        )
    }
}
