//! Race templates: the static description of a kind of hostile actor.
//!
//! Templates are data-driven and shared between all live actors of the same
//! race; an [`crate::actor::Actor`] holds only per-instance state. The
//! builder mirrors how templates are loaded from content files.

use arrayvec::ArrayVec;
use bitflags::bitflags;

use crate::config::GameConfig;
use crate::effects::{BlowEffect, RangedAbility};
use crate::speed::NORMAL_SPEED;

/// Index into the race template table. `RaceId(0)` is reserved and never a
/// valid race; a live actor with an unresolvable race id is treated as
/// maximally dangerous, never ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RaceId(pub u16);

impl RaceId {
    pub const NONE: RaceId = RaceId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

bitflags! {
    /// Race behaviour and immunity flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct RaceFlags: u32 {
        /// One-of-a-kind boss actor.
        const UNIQUE        = 1 << 0;
        /// Stationary: never leaves its cell.
        const NEVER_MOVES   = 1 << 1;
        /// Has no melee attacks at all.
        const NEVER_BLOWS   = 1 << 2;
        /// Moves through walls.
        const PASS_WALL     = 1 << 3;
        /// Tunnels through walls, leaving open floor.
        const KILL_WALL     = 1 << 4;
        /// Breeds explosively.
        const BREEDER       = 1 << 5;
        /// Arrives with escort groups.
        const HAS_ESCORTS   = 1 << 6;
        const EVIL          = 1 << 7;
        const ANIMAL        = 1 << 8;
        const UNDEAD        = 1 << 9;
        const DEMON         = 1 << 10;
        const DRAGON        = 1 << 11;
        const GIANT         = 1 << 12;
        const TROLL         = 1 << 13;
        const ORC           = 1 << 14;
        /// Has no mind a mental attack could reach.
        const MINDLESS      = 1 << 15;
        const NONLIVING     = 1 << 16;
        /// Cannot be magically slept.
        const NO_SLEEP      = 1 << 17;
        /// Cannot be confused.
        const NO_CONF       = 1 << 18;
        /// Cannot be magically feared.
        const NO_FEAR       = 1 << 19;
        /// Cannot be slowed or held.
        const FREE_ACTION   = 1 << 20;
        // ---- elemental interaction ----
        const IMMUNE_ACID   = 1 << 21;
        const IMMUNE_ELEC   = 1 << 22;
        const IMMUNE_FIRE   = 1 << 23;
        const IMMUNE_COLD   = 1 << 24;
        const IMMUNE_POISON = 1 << 25;
        const HURT_FIRE     = 1 << 26;
        const HURT_COLD     = 1 << 27;
        const HURT_LIGHT    = 1 << 28;
        const HURT_ROCK     = 1 << 29;
    }
}

/// One melee blow slot: an effect tag plus damage dice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Blow {
    pub effect: BlowEffect,
    /// Number of dice.
    pub dice: i32,
    /// Sides per die.
    pub sides: i32,
    /// Delivery method tends to knock out (kicks, crushing blows).
    pub stunning: bool,
}

impl Blow {
    pub const fn new(effect: BlowEffect, dice: i32, sides: i32) -> Self {
        Self {
            effect,
            dice,
            sides,
            stunning: false,
        }
    }

    pub const fn stunning(effect: BlowEffect, dice: i32, sides: i32) -> Self {
        Self {
            effect,
            dice,
            sides,
            stunning: true,
        }
    }

    /// Worst-case roll. Threat evaluation is pessimistic by design.
    pub fn max_roll(&self) -> i32 {
        self.dice * self.sides
    }
}

/// Static description of one race of hostile actor.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RaceTemplate {
    pub name: String,
    pub level: i32,
    pub speed: i32,
    /// Scales ball/bolt/beam spell damage.
    pub spell_power: i32,
    /// Base armor class, resisted by the agent's to-hit skill.
    pub armor: i32,
    /// Sleep depth: higher means the race sleeps more soundly. Light
    /// sleepers (low values still nonzero) add a threat surcharge.
    pub alertness: i32,
    /// Percent chance per game turn of using a ranged ability.
    pub cast_freq: i32,
    pub flags: RaceFlags,
    pub blows: ArrayVec<Blow, { GameConfig::MAX_BLOWS }>,
    pub abilities: ArrayVec<RangedAbility, { GameConfig::MAX_ABILITIES }>,
}

impl RaceTemplate {
    pub fn builder(name: impl Into<String>) -> RaceTemplateBuilder {
        RaceTemplateBuilder::new(name)
    }

    pub fn has(&self, flags: RaceFlags) -> bool {
        self.flags.intersects(flags)
    }

    /// True when the race has any summon ability. Summoners are priority
    /// targets for the bot.
    pub fn is_summoner(&self) -> bool {
        self.abilities.iter().any(|a| a.is_summon())
    }
}

/// Builder for race templates, mirroring content-file loading.
pub struct RaceTemplateBuilder {
    name: String,
    level: i32,
    speed: i32,
    spell_power: i32,
    armor: i32,
    alertness: i32,
    cast_freq: i32,
    flags: RaceFlags,
    blows: ArrayVec<Blow, { GameConfig::MAX_BLOWS }>,
    abilities: ArrayVec<RangedAbility, { GameConfig::MAX_ABILITIES }>,
}

impl RaceTemplateBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: 1,
            speed: NORMAL_SPEED,
            spell_power: 0,
            armor: 10,
            alertness: 10,
            cast_freq: 0,
            flags: RaceFlags::empty(),
            blows: ArrayVec::new(),
            abilities: ArrayVec::new(),
        }
    }

    pub fn level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn speed(mut self, speed: i32) -> Self {
        self.speed = speed;
        self
    }

    pub fn spell_power(mut self, spell_power: i32) -> Self {
        self.spell_power = spell_power;
        self
    }

    pub fn armor(mut self, armor: i32) -> Self {
        self.armor = armor;
        self
    }

    pub fn alertness(mut self, alertness: i32) -> Self {
        self.alertness = alertness;
        self
    }

    pub fn cast_freq(mut self, cast_freq: i32) -> Self {
        self.cast_freq = cast_freq;
        self
    }

    pub fn flags(mut self, flags: RaceFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Appends a blow slot. Slots past the capacity are silently dropped,
    /// matching content-loader behaviour for malformed templates.
    pub fn blow(mut self, blow: Blow) -> Self {
        let _ = self.blows.try_push(blow);
        self
    }

    pub fn ability(mut self, ability: RangedAbility) -> Self {
        let _ = self.abilities.try_push(ability);
        self
    }

    pub fn build(self) -> RaceTemplate {
        RaceTemplate {
            name: self.name,
            level: self.level,
            speed: self.speed,
            spell_power: self.spell_power,
            armor: self.armor,
            alertness: self.alertness,
            cast_freq: self.cast_freq,
            flags: self.flags,
            blows: self.blows,
            abilities: self.abilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let race = RaceTemplate::builder("snaga").build();
        assert_eq!(race.speed, NORMAL_SPEED);
        assert!(race.blows.is_empty());
        assert!(!race.is_summoner());
    }

    #[test]
    fn summoner_detection() {
        let race = RaceTemplate::builder("demon lord")
            .ability(RangedAbility::BallFire)
            .ability(RangedAbility::SummonHiDemons)
            .build();
        assert!(race.is_summoner());
    }
}
