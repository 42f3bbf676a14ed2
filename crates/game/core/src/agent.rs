//! The controlled character as the decision layers see it.
//!
//! `AgentState` is a flat, integer-only readout: derived stats are computed
//! upstream (equipment and class logic are not this crate's concern) and
//! re-published into the snapshot every tick. The engine only reads it.

use arrayvec::ArrayVec;
use bitflags::bitflags;

use crate::config::GameConfig;
use crate::effects::Element;
use crate::position::Position;
use crate::speed::NORMAL_SPEED;

bitflags! {
    /// Permanent resistances and protections from equipment and class.
    ///
    /// Temporary (spell-granted) versions of the elemental entries live in
    /// the bot's evaluation context, not here: the snapshot records what is
    /// durable, the context records what is being considered.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ResistFlags: u32 {
        const ACID       = 1 << 0;
        const ELEC       = 1 << 1;
        const FIRE       = 1 << 2;
        const COLD       = 1 << 3;
        const POISON     = 1 << 4;
        const NETHER     = 1 << 5;
        const LIGHT      = 1 << 6;
        const DARK       = 1 << 7;
        const SOUND      = 1 << 8;
        const SHARDS     = 1 << 9;
        const CHAOS      = 1 << 10;
        const DISENCHANT = 1 << 11;
        const NEXUS      = 1 << 12;
        const CONFUSION  = 1 << 13;
        const BLINDNESS  = 1 << 14;
        const FEAR       = 1 << 15;
        /// Paralysis and magical slowing protection.
        const FREE_ACTION = 1 << 16;
        /// Experience drain protection.
        const HOLD_LIFE  = 1 << 17;
        // ---- full immunities ----
        const IMM_ACID   = 1 << 18;
        const IMM_ELEC   = 1 << 19;
        const IMM_FIRE   = 1 << 20;
        const IMM_COLD   = 1 << 21;
    }
}

impl ResistFlags {
    /// Permanent resistance flag for an element, if one exists.
    pub fn for_element(element: Element) -> Option<ResistFlags> {
        Some(match element {
            Element::Acid => ResistFlags::ACID,
            Element::Elec => ResistFlags::ELEC,
            Element::Fire => ResistFlags::FIRE,
            Element::Cold | Element::Ice => ResistFlags::COLD,
            Element::Poison => ResistFlags::POISON,
            Element::Nether => ResistFlags::NETHER,
            Element::Light => ResistFlags::LIGHT,
            Element::Dark => ResistFlags::DARK,
            Element::Sound => ResistFlags::SOUND,
            Element::Shards => ResistFlags::SHARDS,
            Element::Chaos => ResistFlags::CHAOS,
            Element::Disenchant => ResistFlags::DISENCHANT,
            Element::Nexus => ResistFlags::NEXUS,
            _ => return None,
        })
    }

    /// Immunity flag for an element, if one exists.
    pub fn immunity_for(element: Element) -> Option<ResistFlags> {
        Some(match element {
            Element::Acid => ResistFlags::IMM_ACID,
            Element::Elec => ResistFlags::IMM_ELEC,
            Element::Fire => ResistFlags::IMM_FIRE,
            Element::Cold | Element::Ice => ResistFlags::IMM_COLD,
            _ => return None,
        })
    }
}

bitflags! {
    /// Stat sustain flags; a sustained stat cannot be drained.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct SustainFlags: u8 {
        const STR = 1 << 0;
        const DEX = 1 << 1;
        const CON = 1 << 2;
        const INT = 1 << 3;
        const WIS = 1 << 4;
    }
}

bitflags! {
    /// Weapon slay and brand flags, used to project melee/missile damage
    /// against specific race families.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct SlayFlags: u16 {
        const SLAY_ANIMAL = 1 << 0;
        const SLAY_EVIL   = 1 << 1;
        const SLAY_UNDEAD = 1 << 2;
        const SLAY_DEMON  = 1 << 3;
        const SLAY_ORC    = 1 << 4;
        const SLAY_TROLL  = 1 << 5;
        const SLAY_GIANT  = 1 << 6;
        const SLAY_DRAGON = 1 << 7;
        const KILL_UNDEAD = 1 << 8;
        const KILL_DEMON  = 1 << 9;
        const KILL_DRAGON = 1 << 10;
        const BRAND_ACID  = 1 << 11;
        const BRAND_ELEC  = 1 << 12;
        const BRAND_FIRE  = 1 << 13;
        const BRAND_COLD  = 1 << 14;
        const BRAND_POIS  = 1 << 15;
    }
}

/// Wielded melee weapon, reduced to what damage projection needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeaponProfile {
    pub dice: i32,
    pub sides: i32,
    pub to_hit: i32,
    pub to_dam: i32,
    pub slays: SlayFlags,
}

impl WeaponProfile {
    /// Average roll of one swing before multipliers.
    pub fn average_roll(&self) -> i32 {
        self.dice * (self.sides + 1) / 2
    }
}

/// Missile launcher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LauncherProfile {
    /// Damage multiplier (x2 sling .. x5 heavy crossbow).
    pub multiplier: i32,
    pub to_hit: i32,
    pub slays: SlayFlags,
}

/// Loaded ammunition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AmmoProfile {
    pub dice: i32,
    pub sides: i32,
    pub to_hit: i32,
    pub to_dam: i32,
    pub slays: SlayFlags,
    pub count: i32,
}

/// Spells the agent's class can know. The engine only cares about the
/// subset with tactical relevance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpellKind {
    // ---- offense ----
    MagicMissile,
    StinkingCloud,
    LightningBolt,
    FrostBolt,
    FireBolt,
    AcidSpray,
    LightBeam,
    FireBall,
    IceStorm,
    ManaStorm,
    DispelEvil,
    DispelUndead,
    // ---- crowd control ----
    SlowMonster,
    ConfuseMonster,
    SleepMonsters,
    HoldMonster,
    ScareMonster,
    PolymorphOther,
    TeleportOther,
    // ---- self buffs ----
    Bless,
    Heroism,
    Berserk,
    HasteSelf,
    StoneSkin,
    ResistFire,
    ResistCold,
    ResistAcid,
    ResistPoison,
    ResistAll,
    ProtectionFromEvil,
    // ---- field control and escapes ----
    GlyphOfWarding,
    CreateDoors,
    Earthquake,
    WordOfDestruction,
    Banishment,
    MassBanishment,
    TeleportLevel,
    TeleportSelf,
}

/// One known spell: kind plus casting economics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpellAbility {
    pub kind: SpellKind,
    pub mana_cost: i32,
    /// Failure chance in percent, already adjusted for stats and armor.
    pub fail_pct: i32,
}

/// Charged devices (wands, rods, staves) with tactical uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceKind {
    WandMagicMissile,
    WandElecBolt,
    WandColdBolt,
    WandAcidBolt,
    WandFireBolt,
    WandStinkingCloud,
    WandDrainLife,
    WandSlowMonster,
    WandHoldMonster,
    WandConfuseMonster,
    /// Unidentified wand; worth a test shot at a target.
    WandUnknown,
    RodElecBolt,
    RodColdBolt,
    RodAcidBolt,
    RodFireBolt,
    RodLightBeam,
    RodDrainLife,
    RodSlowMonster,
    RodSleepMonster,
    RodSpeed,
    RodUnknown,
    StaffSleepMonsters,
    StaffSlowMonsters,
    StaffDispelEvil,
    StaffPower,
    StaffHoliness,
    StaffSpeed,
    StaffBanishment,
    StaffDestruction,
    StaffTeleport,
}

/// One carried device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChargedItem {
    pub kind: DeviceKind,
    /// Remaining charges; rods use 0/1 for charging/ready.
    pub charges: i32,
    /// Activation failure chance in percent.
    pub fail_pct: i32,
}

/// Single-use consumables the defense catalog may reach for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConsumableKind {
    PotionSpeed,
    PotionHeroism,
    PotionBerserk,
    PotionResistHeat,
    PotionResistPoison,
    ScrollBlessing,
    ScrollProtectionFromEvil,
    ScrollGlyphOfWarding,
    ScrollBanishment,
    ScrollMassBanishment,
    ScrollTeleportLevel,
    ScrollTeleport,
    ScrollDeepDescent,
}

/// Complete tactical readout of the controlled character.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentState {
    pub pos: Position,
    pub hp: i32,
    pub max_hp: i32,
    pub mana: i32,
    pub max_mana: i32,
    /// Character level, 1..=50.
    pub level: i32,
    /// Deepest dungeon level reached, in feet/50.
    pub max_depth: i32,
    pub speed: i32,
    /// Total armor class.
    pub armor: i32,
    /// Flat incoming damage reduction.
    pub damage_reduction: i32,
    /// Saving throw in percent; 100 means mental attacks always fail.
    pub saving_throw: i32,
    /// Melee blows per round.
    pub blows: i32,
    /// Missile shots per round.
    pub shots: i32,
    /// Melee skill.
    pub skill_melee: i32,
    /// Missile skill.
    pub skill_ranged: i32,
    pub to_hit: i32,
    pub to_dam: i32,
    /// Chance in percent that pickpockets fail against us.
    pub theft_protection: i32,
    pub resists: ResistFlags,
    pub sustains: SustainFlags,
    /// Stats currently low enough that further drain is alarming.
    pub low_stats: SustainFlags,
    /// The agent casts from a spell stat and fears losing it more.
    pub caster: bool,
    /// Food or light reserves are low enough to fear theft of them.
    pub provisions_low: bool,
    // ---- current afflictions ----
    pub blind: bool,
    pub confused: bool,
    pub afraid: bool,
    pub poisoned: bool,
    /// Spell memory currently scrambled.
    pub amnesia: bool,
    pub stunned: bool,
    pub heavy_stunned: bool,
    // ---- equipment and repertoire ----
    pub weapon: WeaponProfile,
    pub launcher: Option<LauncherProfile>,
    pub ammo: Option<AmmoProfile>,
    pub spells: ArrayVec<SpellAbility, { GameConfig::MAX_SPELLS }>,
    pub devices: ArrayVec<ChargedItem, { GameConfig::MAX_DEVICES }>,
    pub consumables: Vec<(ConsumableKind, i32)>,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            pos: Position::default(),
            hp: 10,
            max_hp: 10,
            mana: 0,
            max_mana: 0,
            level: 1,
            max_depth: 0,
            speed: NORMAL_SPEED,
            armor: 0,
            damage_reduction: 0,
            saving_throw: 10,
            blows: 1,
            shots: 1,
            skill_melee: 20,
            skill_ranged: 20,
            to_hit: 0,
            to_dam: 0,
            theft_protection: 20,
            resists: ResistFlags::empty(),
            sustains: SustainFlags::empty(),
            low_stats: SustainFlags::empty(),
            caster: false,
            provisions_low: false,
            blind: false,
            confused: false,
            afraid: false,
            poisoned: false,
            amnesia: false,
            stunned: false,
            heavy_stunned: false,
            weapon: WeaponProfile::default(),
            launcher: None,
            ammo: None,
            spells: ArrayVec::new(),
            devices: ArrayVec::new(),
            consumables: Vec::new(),
        }
    }
}

impl AgentState {
    /// True when the agent permanently resists `element`.
    pub fn resists(&self, element: Element) -> bool {
        ResistFlags::for_element(element)
            .map(|f| self.resists.contains(f))
            .unwrap_or(false)
    }

    /// True when the agent is fully immune to `element`.
    pub fn immune(&self, element: Element) -> bool {
        ResistFlags::immunity_for(element)
            .map(|f| self.resists.contains(f))
            .unwrap_or(false)
    }

    /// Looks up a known spell.
    pub fn spell(&self, kind: SpellKind) -> Option<SpellAbility> {
        self.spells.iter().copied().find(|s| s.kind == kind)
    }

    /// True when `kind` is known, affordable, and within the failure
    /// ceiling. Blind, confused, or amnesiac casters cannot cast at all.
    pub fn spell_ok(&self, kind: SpellKind, max_fail_pct: i32) -> bool {
        if self.blind || self.confused || self.amnesia {
            return false;
        }
        match self.spell(kind) {
            Some(s) => s.mana_cost <= self.mana && s.fail_pct <= max_fail_pct,
            None => false,
        }
    }

    /// Looks up a carried device with charges remaining.
    pub fn device(&self, kind: DeviceKind) -> Option<ChargedItem> {
        self.devices
            .iter()
            .copied()
            .find(|d| d.kind == kind && d.charges > 0)
    }

    /// True when `kind` is carried, charged, and reliable enough.
    pub fn device_ok(&self, kind: DeviceKind, max_fail_pct: i32) -> bool {
        self.device(kind)
            .map(|d| d.fail_pct <= max_fail_pct)
            .unwrap_or(false)
    }

    pub fn consumable_count(&self, kind: ConsumableKind) -> i32 {
        self.consumables
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn has_consumable(&self, kind: ConsumableKind) -> bool {
        self.consumable_count(kind) > 0
    }

    /// The global avoidance threshold: how much expected damage the agent
    /// is willing to stand in. Tied to current hit points, so a wounded
    /// agent grows cautious without any extra machinery.
    pub fn avoidance(&self) -> i32 {
        self.hp.max(1)
    }

    /// Current hp as a percentage of maximum.
    pub fn hp_pct(&self) -> i32 {
        if self.max_hp <= 0 {
            return 0;
        }
        (self.hp * 100) / self.max_hp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_resist_lookup() {
        let mut agent = AgentState::default();
        assert!(!agent.resists(Element::Fire));
        agent.resists |= ResistFlags::FIRE;
        assert!(agent.resists(Element::Fire));
        assert!(!agent.immune(Element::Fire));
        agent.resists |= ResistFlags::IMM_FIRE;
        assert!(agent.immune(Element::Fire));
        // ice rides the cold resistance
        agent.resists |= ResistFlags::COLD;
        assert!(agent.resists(Element::Ice));
    }

    #[test]
    fn spell_gating() {
        let mut agent = AgentState::default();
        agent.mana = 5;
        agent
            .spells
            .push(SpellAbility { kind: SpellKind::MagicMissile, mana_cost: 1, fail_pct: 12 });
        assert!(agent.spell_ok(SpellKind::MagicMissile, 25));
        assert!(!agent.spell_ok(SpellKind::MagicMissile, 5));
        agent.blind = true;
        assert!(!agent.spell_ok(SpellKind::MagicMissile, 25));
    }
}
