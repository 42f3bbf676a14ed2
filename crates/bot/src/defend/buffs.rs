//! Defensive buffs, resists, and field control.

use gloom_core::{
    ActorId, Command, CommandSink, ConsumableKind, DeviceKind, Element, RaceFlags, SpellKind,
};

use crate::catalog::{DefenseAction, Effect, TacticalView, Utility};
use crate::context::{EvalContext, Flag};
use crate::danger::actor_danger;
use crate::defend::{cannot_cast, danger_at_agent, fail_allowance, improvement_worthwhile};

// ============================================================================
// Small posture buffs
// ============================================================================

/// A quick blessing when a scrap is about to start but the danger is
/// still shy of serious. Deliberately low priority.
pub(crate) struct Bless;

impl Bless {
    fn ready(view: &TacticalView<'_>, ctx: &EvalContext, p1: i32) -> bool {
        let world = view.world;
        let agent = &world.agent;
        if ctx.get(Flag::Blessed) {
            return false;
        }
        if cannot_cast(agent) && !agent.has_consumable(ConsumableKind::ScrollBlessing) {
            return false;
        }
        let allowed = fail_allowance(p1, agent.avoidance());
        if !agent.spell_ok(SpellKind::Bless, allowed)
            && !agent.has_consumable(ConsumableKind::ScrollBlessing)
        {
            return false;
        }
        // Only with something actually closing in.
        let near_kill = view
            .targets
            .iter()
            .any(|t| agent.pos.distance(t.pos) <= 3);
        let avoidance = agent.avoidance();
        near_kill
            && p1 > 0
            && (p1 > avoidance / 12 || agent.level <= 15)
            && p1 < avoidance / 2
    }
}

impl DefenseAction for Bless {
    fn name(&self) -> &'static str {
        "bless"
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> Utility {
        if Self::ready(view, ctx, p1) {
            Utility::Scored(1)
        } else {
            Utility::Rejected
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        p1: i32,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        if !Self::ready(view, ctx, p1) {
            return Effect::Aborted;
        }
        let agent = &view.world.agent;
        let allowed = fail_allowance(p1, agent.avoidance());
        if agent.spell_ok(SpellKind::Bless, allowed) {
            sink.issue(Command::Cast { spell: SpellKind::Bless, target: None });
        } else {
            sink.issue(Command::ReadScroll { kind: ConsumableKind::ScrollBlessing });
        }
        Effect::None
    }
}

/// Heroism: to-hit, a few temporary hit points, and a fear cure.
pub(crate) struct Heroism;

impl Heroism {
    fn value(view: &TacticalView<'_>, ctx: &EvalContext, p1: i32) -> i32 {
        let agent = &view.world.agent;
        if ctx.get(Flag::Hero) {
            return 0;
        }
        let allowed = fail_allowance(p1, agent.avoidance());
        let has_spell = agent.spell_ok(SpellKind::Heroism, allowed);
        let has_potion = agent.has_consumable(ConsumableKind::PotionHeroism);
        if !has_spell && !has_potion {
            return 0;
        }
        let avoidance = agent.avoidance();
        if p1 > avoidance / 12 && p1 < avoidance / 2 {
            // Curing fear unlocks melee again; that is worth more.
            if agent.afraid { 3 } else { 1 }
        } else {
            0
        }
    }
}

impl DefenseAction for Heroism {
    fn name(&self) -> &'static str {
        "heroism"
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> Utility {
        match Self::value(view, ctx, p1) {
            0 => Utility::Rejected,
            v => Utility::Scored(v),
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        p1: i32,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        if Self::value(view, ctx, p1) == 0 {
            return Effect::Aborted;
        }
        let agent = &view.world.agent;
        let allowed = fail_allowance(p1, agent.avoidance());
        if agent.spell_ok(SpellKind::Heroism, allowed) {
            sink.issue(Command::Cast { spell: SpellKind::Heroism, target: None });
        } else {
            sink.issue(Command::Quaff { kind: ConsumableKind::PotionHeroism });
        }
        Effect::None
    }
}

/// Berserk rage: heroism's angrier cousin, worth slightly more when the
/// fight is already joined.
pub(crate) struct BerserkRage;

impl BerserkRage {
    fn value(view: &TacticalView<'_>, ctx: &EvalContext, p1: i32) -> i32 {
        let agent = &view.world.agent;
        if ctx.get(Flag::Berserk) {
            return 0;
        }
        let allowed = fail_allowance(p1, agent.avoidance());
        let has_spell = agent.spell_ok(SpellKind::Berserk, allowed);
        let has_potion = agent.has_consumable(ConsumableKind::PotionBerserk);
        if !has_spell && !has_potion {
            return 0;
        }
        let avoidance = agent.avoidance();
        if p1 > avoidance / 10 && p1 < avoidance * 2 / 3 {
            2
        } else {
            0
        }
    }
}

impl DefenseAction for BerserkRage {
    fn name(&self) -> &'static str {
        "berserk"
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> Utility {
        match Self::value(view, ctx, p1) {
            0 => Utility::Rejected,
            v => Utility::Scored(v),
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        p1: i32,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        if Self::value(view, ctx, p1) == 0 {
            return Effect::Aborted;
        }
        let agent = &view.world.agent;
        let allowed = fail_allowance(p1, agent.avoidance());
        if agent.spell_ok(SpellKind::Berserk, allowed) {
            sink.issue(Command::Cast { spell: SpellKind::Berserk, target: None });
        } else {
            sink.issue(Command::Quaff { kind: ConsumableKind::PotionBerserk });
        }
        Effect::None
    }
}

// ============================================================================
// Haste
// ============================================================================

/// Speed before battle. The single most valuable buff in the game, and
/// priced accordingly: the counterfactual rolls the doubled action rate
/// through the whole danger model.
pub(crate) struct Haste;

impl Haste {
    fn renewable(agent: &gloom_core::AgentState, allowed: i32) -> bool {
        agent.spell_ok(SpellKind::HasteSelf, allowed)
            || agent.device_ok(DeviceKind::RodSpeed, allowed)
            || agent.device_ok(DeviceKind::StaffSpeed, allowed)
    }

    fn value(view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> i32 {
        let world = view.world;
        let agent = &world.agent;
        if ctx.get(Flag::Fast) {
            return 0;
        }
        if cannot_cast(agent) && !agent.has_consumable(ConsumableKind::PotionSpeed) {
            // Devices still work while blind, but aiming a rod mid-panic
            // is not the plan this entry prices.
            return 0;
        }

        let avoidance = agent.avoidance();
        let allowed = fail_allowance(p1, avoidance);
        let good_speed = Self::renewable(agent, allowed);
        if !good_speed && !agent.has_consumable(ConsumableKind::PotionSpeed) {
            return 0;
        }

        // Conserve haste sources on the approach to the bottom; the boss
        // fight needs them more than a corridor scuffle does.
        if world.depth >= 97 && world.posture.fighting_unique == 0 && !good_speed {
            return 0;
        }

        let mut p2 = ctx.with_flag(Flag::Fast, true, |ctx| danger_at_agent(view, ctx, true));

        if world.posture.scary_level {
            p2 = p2 * 3 / 10;
        }
        if good_speed && world.posture.fighting_unique > 0 {
            p2 = p2 * 7 / 10;
        }
        if world.posture.fighting_summoner && world.posture.fighting_unique > 0 {
            p2 = p2 * 7 / 10;
        }
        if world.depth == 100 && world.posture.fighting_unique >= 10 {
            p2 = p2 * 5 / 10;
        }

        let unique = world.posture.fighting_unique > 0;
        let ceiling = if unique { avoidance * 2 / 3 } else { avoidance / 2 };
        let tight_ceiling = if unique { avoidance * 2 / 3 } else { avoidance / 3 };

        let worthwhile = (p1 > p2 && p2 <= ceiling && p1 > avoidance / 5 && good_speed)
            || (p1 > p2 && p2 <= tight_ceiling && p1 > avoidance / 7);
        if worthwhile { p1 - p2 } else { 0 }
    }
}

impl DefenseAction for Haste {
    fn name(&self) -> &'static str {
        "haste"
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> Utility {
        match Self::value(view, ctx, p1) {
            0 => Utility::Rejected,
            v => Utility::Scored(v),
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        p1: i32,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        if Self::value(view, ctx, p1) == 0 {
            return Effect::Aborted;
        }
        let agent = &view.world.agent;
        let allowed = fail_allowance(p1, agent.avoidance());
        let command = if agent.device_ok(DeviceKind::RodSpeed, allowed) {
            Command::UseDevice { device: DeviceKind::RodSpeed, target: None }
        } else if agent.device_ok(DeviceKind::StaffSpeed, allowed) {
            Command::UseDevice { device: DeviceKind::StaffSpeed, target: None }
        } else if agent.has_consumable(ConsumableKind::PotionSpeed) {
            Command::Quaff { kind: ConsumableKind::PotionSpeed }
        } else {
            Command::Cast { spell: SpellKind::HasteSelf, target: None }
        };
        sink.issue(command);
        Effect::None
    }
}

// ============================================================================
// Resistances
// ============================================================================

/// A single temporary elemental resistance.
///
/// Uses averaged danger: the point of a resistance is to blunt the
/// repertoire as a whole, and the peak-override would otherwise hide the
/// improvement behind whatever unresistable attack the actor also has.
pub(crate) struct ElementalResist {
    pub name: &'static str,
    pub element: Element,
    pub flag: Flag,
    pub spell: SpellKind,
    pub potion: Option<ConsumableKind>,
}

impl ElementalResist {
    fn value(&self, view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> i32 {
        let agent = &view.world.agent;
        if agent.immune(self.element) || ctx.get(self.flag) {
            return 0;
        }
        let allowed = fail_allowance(p1, agent.avoidance());
        let has_spell = !cannot_cast(agent) && agent.spell_ok(self.spell, allowed);
        let has_potion = self
            .potion
            .map(|kind| agent.has_consumable(kind))
            .unwrap_or(false);
        if !has_spell && !has_potion {
            return 0;
        }

        let before = danger_at_agent(view, ctx, false);
        let after = ctx.with_flag(self.flag, true, |ctx| danger_at_agent(view, ctx, false));
        let unique = view.world.posture.fighting_unique > 0;
        if improvement_worthwhile(before, after, agent.avoidance(), unique) {
            before - after
        } else {
            0
        }
    }
}

impl DefenseAction for ElementalResist {
    fn name(&self) -> &'static str {
        self.name
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> Utility {
        match self.value(view, ctx, p1) {
            0 => Utility::Rejected,
            v => Utility::Scored(v),
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        p1: i32,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        if self.value(view, ctx, p1) == 0 {
            return Effect::Aborted;
        }
        let agent = &view.world.agent;
        let allowed = fail_allowance(p1, agent.avoidance());
        if !cannot_cast(agent) && agent.spell_ok(self.spell, allowed) {
            sink.issue(Command::Cast { spell: self.spell, target: None });
        } else if let Some(kind) = self.potion {
            sink.issue(Command::Quaff { kind });
        } else {
            return Effect::Aborted;
        }
        Effect::None
    }
}

/// All five temporary resistances at once.
pub(crate) struct ResistAll;

impl ResistAll {
    const FLAGS: [Flag; 5] = [
        Flag::TempResAcid,
        Flag::TempResElec,
        Flag::TempResFire,
        Flag::TempResCold,
        Flag::TempResPoison,
    ];

    fn value(view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> i32 {
        let agent = &view.world.agent;
        // Nothing left to add.
        if Self::FLAGS.iter().all(|&f| ctx.get(f)) {
            return 0;
        }
        if cannot_cast(agent) {
            return 0;
        }
        let allowed = fail_allowance(p1, agent.avoidance());
        if !agent.spell_ok(SpellKind::ResistAll, allowed) {
            return 0;
        }

        let before = danger_at_agent(view, ctx, false);
        let after = ctx.with_flags(&Self::FLAGS, |ctx| danger_at_agent(view, ctx, false));
        let unique = view.world.posture.fighting_unique > 0;
        if improvement_worthwhile(before, after, agent.avoidance(), unique) {
            before - after
        } else {
            0
        }
    }
}

impl DefenseAction for ResistAll {
    fn name(&self) -> &'static str {
        "resist_all"
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> Utility {
        match Self::value(view, ctx, p1) {
            0 => Utility::Rejected,
            v => Utility::Scored(v),
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        p1: i32,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        if Self::value(view, ctx, p1) == 0 {
            return Effect::Aborted;
        }
        sink.issue(Command::Cast { spell: SpellKind::ResistAll, target: None });
        Effect::None
    }
}

/// Protection from evil: a standing rampart against the evil majority,
/// priced with averaged danger like the resistances.
pub(crate) struct ProtEvil;

impl ProtEvil {
    fn value(view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> i32 {
        let agent = &view.world.agent;
        if ctx.get(Flag::ProtEvil) {
            return 0;
        }
        let allowed = fail_allowance(p1, agent.avoidance());
        let has_spell = !cannot_cast(agent) && agent.spell_ok(SpellKind::ProtectionFromEvil, allowed);
        let has_scroll = agent.has_consumable(ConsumableKind::ScrollProtectionFromEvil);
        if !has_spell && !has_scroll {
            return 0;
        }

        let before = danger_at_agent(view, ctx, false);
        let after = ctx.with_flag(Flag::ProtEvil, true, |ctx| danger_at_agent(view, ctx, false));
        let unique = view.world.posture.fighting_unique > 0;
        if improvement_worthwhile(before, after, agent.avoidance(), unique) {
            before - after
        } else {
            0
        }
    }
}

impl DefenseAction for ProtEvil {
    fn name(&self) -> &'static str {
        "prot_evil"
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> Utility {
        match Self::value(view, ctx, p1) {
            0 => Utility::Rejected,
            v => Utility::Scored(v),
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        p1: i32,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        if Self::value(view, ctx, p1) == 0 {
            return Effect::Aborted;
        }
        let agent = &view.world.agent;
        let allowed = fail_allowance(p1, agent.avoidance());
        if !cannot_cast(agent) && agent.spell_ok(SpellKind::ProtectionFromEvil, allowed) {
            sink.issue(Command::Cast { spell: SpellKind::ProtectionFromEvil, target: None });
        } else {
            sink.issue(Command::ReadScroll { kind: ConsumableKind::ScrollProtectionFromEvil });
        }
        Effect::None
    }
}

/// Mystic shield: +50 effective armor against the melee math.
pub(crate) struct MysticShield;

impl MysticShield {
    fn value(view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> i32 {
        let agent = &view.world.agent;
        if ctx.get(Flag::Shield) {
            return 0;
        }
        if cannot_cast(agent) {
            return 0;
        }
        let allowed = fail_allowance(p1, agent.avoidance());
        if !agent.spell_ok(SpellKind::StoneSkin, allowed) {
            return 0;
        }
        let p2 = ctx.with_flag(Flag::Shield, true, |ctx| danger_at_agent(view, ctx, true));
        let unique = view.world.posture.fighting_unique > 0;
        if improvement_worthwhile(p1, p2, agent.avoidance(), unique) {
            p1 - p2
        } else {
            0
        }
    }
}

impl DefenseAction for MysticShield {
    fn name(&self) -> &'static str {
        "mystic_shield"
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> Utility {
        match Self::value(view, ctx, p1) {
            0 => Utility::Rejected,
            v => Utility::Scored(v),
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        p1: i32,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        if Self::value(view, ctx, p1) == 0 {
            return Effect::Aborted;
        }
        sink.issue(Command::Cast { spell: SpellKind::StoneSkin, target: None });
        Effect::None
    }
}

// ============================================================================
// Field control
// ============================================================================

/// Scribe a glyph of warding underfoot. Strongest when summoners are
/// working: the glyph counts as protected ground in their pricing.
pub(crate) struct Glyph;

impl Glyph {
    fn value(view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> i32 {
        let world = view.world;
        let agent = &world.agent;
        if world.agent_on_glyph() || ctx.get(Flag::OnGlyph) {
            return 0;
        }
        let allowed = fail_allowance(p1, agent.avoidance());
        let has_spell = !cannot_cast(agent) && agent.spell_ok(SpellKind::GlyphOfWarding, allowed);
        let has_scroll = agent.has_consumable(ConsumableKind::ScrollGlyphOfWarding);
        if !has_spell && !has_scroll {
            return 0;
        }
        let p2 = ctx.with_flag(Flag::OnGlyph, true, |ctx| danger_at_agent(view, ctx, true));
        let unique = world.posture.fighting_unique > 0;
        if improvement_worthwhile(p1, p2, agent.avoidance(), unique) {
            p1 - p2
        } else {
            0
        }
    }
}

impl DefenseAction for Glyph {
    fn name(&self) -> &'static str {
        "glyph_of_warding"
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> Utility {
        match Self::value(view, ctx, p1) {
            0 => Utility::Rejected,
            v => Utility::Scored(v),
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        p1: i32,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        if Self::value(view, ctx, p1) == 0 {
            return Effect::Aborted;
        }
        let agent = &view.world.agent;
        let allowed = fail_allowance(p1, agent.avoidance());
        if !cannot_cast(agent) && agent.spell_ok(SpellKind::GlyphOfWarding, allowed) {
            sink.issue(Command::Cast { spell: SpellKind::GlyphOfWarding, target: None });
        } else {
            sink.issue(Command::ReadScroll { kind: ConsumableKind::ScrollGlyphOfWarding });
        }
        Effect::None
    }
}

/// Conjure doors around the agent to box summons out.
pub(crate) struct CreateDoors;

impl CreateDoors {
    fn value(view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> i32 {
        let agent = &view.world.agent;
        if ctx.get(Flag::DoorsAhead) {
            return 0;
        }
        if cannot_cast(agent) {
            return 0;
        }
        let allowed = fail_allowance(p1, agent.avoidance());
        if !agent.spell_ok(SpellKind::CreateDoors, allowed) {
            return 0;
        }
        let p2 = ctx.with_flag(Flag::DoorsAhead, true, |ctx| danger_at_agent(view, ctx, true));
        let unique = view.world.posture.fighting_unique > 0;
        if improvement_worthwhile(p1, p2, agent.avoidance(), unique) {
            p1 - p2
        } else {
            0
        }
    }
}

impl DefenseAction for CreateDoors {
    fn name(&self) -> &'static str {
        "create_doors"
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> Utility {
        match Self::value(view, ctx, p1) {
            0 => Utility::Rejected,
            v => Utility::Scored(v),
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        p1: i32,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        if Self::value(view, ctx, p1) == 0 {
            return Effect::Aborted;
        }
        sink.issue(Command::Cast { spell: SpellKind::CreateDoors, target: None });
        Effect::None
    }
}

// ============================================================================
// Teleport other, defensively
// ============================================================================

/// Bounce whatever is projecting the danger. Unlike the offensive twin,
/// this one is pure relief: it prices only the drop in danger at our own
/// cell.
pub(crate) struct TeleportOtherDefense;

impl TeleportOtherDefense {
    fn candidates(view: &TacticalView<'_>, ctx: &mut EvalContext) -> Vec<ActorId> {
        let world = view.world;
        let agent = &world.agent;
        let mut ids = Vec::new();
        for target in view.targets {
            if !view.proj.projectable_pure(agent.pos, target.pos) {
                continue;
            }
            let Some(actor) = world.actor(target.id) else {
                continue;
            };
            let Some(race) = world.race_of(actor) else {
                continue;
            };
            if race.has(RaceFlags::UNIQUE) && actor.injury_pct() >= 60 {
                // Finish the wounded boss instead of mailing it away.
                continue;
            }
            let danger = actor_danger(world, view.proj, ctx, agent.pos, 1, target.id, true, true);
            if danger > 0 {
                ids.push(target.id);
            }
        }
        ids
    }

    fn value(view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> i32 {
        let agent = &view.world.agent;
        let allowed = fail_allowance(p1, agent.avoidance());
        if cannot_cast(agent) || !agent.spell_ok(SpellKind::TeleportOther, allowed) {
            return 0;
        }
        let ids = Self::candidates(view, ctx);
        if ids.is_empty() {
            return 0;
        }
        let p2 = ctx.with_excluded(&ids, |ctx| danger_at_agent(view, ctx, true));
        let unique = view.world.posture.fighting_unique > 0;
        if improvement_worthwhile(p1, p2, agent.avoidance(), unique) {
            p1 - p2
        } else {
            0
        }
    }
}

impl DefenseAction for TeleportOtherDefense {
    fn name(&self) -> &'static str {
        "teleport_other_defense"
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> Utility {
        match Self::value(view, ctx, p1) {
            0 => Utility::Rejected,
            v => Utility::Scored(v),
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        p1: i32,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        if Self::value(view, ctx, p1) == 0 {
            return Effect::Aborted;
        }
        // Aim down the line that carries the most danger.
        let ids = Self::candidates(view, ctx);
        let world = view.world;
        let worst = ids
            .iter()
            .max_by_key(|&&id| {
                actor_danger(world, view.proj, ctx, world.agent.pos, 1, id, true, true)
            })
            .copied();
        let Some(worst) = worst else {
            return Effect::Aborted;
        };
        let Some(actor) = world.actor(worst) else {
            return Effect::Aborted;
        };
        sink.issue(Command::Cast { spell: SpellKind::TeleportOther, target: Some(actor.pos) });
        Effect::None
    }
}
