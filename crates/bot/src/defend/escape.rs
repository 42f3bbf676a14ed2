//! Board-clearing defenses and level escapes.
//!
//! These entries carry large utilities behind strict preconditions so
//! they fire only when the situation genuinely calls for scorched earth.
//! On success they prune the roster (or relocate the agent) and end the
//! tick; nothing else runs after them.

use gloom_core::{
    ActorId, Command, CommandSink, ConsumableKind, DeviceKind, RaceFlags, RaceId, SpellKind,
};

use crate::catalog::{DefenseAction, Effect, TacticalView, Utility};
use crate::context::EvalContext;
use crate::danger::actor_danger;
use crate::defend::{cannot_cast, fail_allowance};

/// Range of the mass banishment burst.
const MASS_BANISH_RADIUS: i32 = 20;

/// Radius levelled by a word of destruction.
const DESTRUCTION_RADIUS: i32 = 15;

/// Life strain per victim of mass banishment.
const MASS_BANISH_STRAIN: i32 = 3;

/// Life strain per victim of targeted banishment.
const BANISH_STRAIN: i32 = 4;

// ============================================================================
// Mass banishment
// ============================================================================

/// Wipe every ordinary monster within range. Priced as the danger that
/// disappears with them, minus the life strain the casting costs.
pub(crate) struct MassBanishment;

impl MassBanishment {
    fn victims(view: &TacticalView<'_>) -> Vec<ActorId> {
        let world = view.world;
        view.targets
            .iter()
            .filter(|t| world.agent.pos.distance(t.pos) <= MASS_BANISH_RADIUS)
            .filter(|t| {
                world
                    .actor(t.id)
                    .and_then(|a| world.race_of(a))
                    .map(|r| !r.has(RaceFlags::UNIQUE))
                    .unwrap_or(false)
            })
            .map(|t| t.id)
            .collect()
    }

    fn value(view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> i32 {
        let world = view.world;
        let agent = &world.agent;
        if cannot_cast(agent) && !agent.has_consumable(ConsumableKind::ScrollMassBanishment) {
            return 0;
        }
        let has_spell = !cannot_cast(agent) && agent.spell_ok(SpellKind::MassBanishment, 40);
        if !has_spell && !agent.has_consumable(ConsumableKind::ScrollMassBanishment) {
            return 0;
        }
        // Only under real pressure.
        if p1 < agent.avoidance() * 12 / 10 {
            return 0;
        }

        let victims = Self::victims(view);
        let mut relieved = 0;
        let mut strain = 0;
        for &id in &victims {
            relieved += actor_danger(world, view.proj, ctx, agent.pos, 1, id, true, true);
            strain += MASS_BANISH_STRAIN;
        }
        // The casting bleeds us per victim; a wipe we cannot survive is
        // not an escape.
        if strain * 12 / 10 >= agent.hp {
            return 0;
        }

        let mut p2 = (p1 - relieved).max(0) + strain;
        if world.posture.fighting_unique >= 10 && victims.len() > 8 {
            p2 = p2 * 6 / 10;
        }

        let avoidance = agent.avoidance();
        let ceiling = if world.posture.fighting_unique > 0 {
            avoidance * 2 / 3
        } else {
            avoidance / 2
        };
        if p1 > p2 && p2 <= ceiling { p1 - p2 } else { 0 }
    }
}

impl DefenseAction for MassBanishment {
    fn name(&self) -> &'static str {
        "mass_banishment"
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
        if agent.has_consumable(ConsumableKind::ScrollMassBanishment) {
            sink.issue(Command::ReadScroll { kind: ConsumableKind::ScrollMassBanishment });
        } else {
            sink.issue(Command::Cast { spell: SpellKind::MassBanishment, target: None });
        }
        Effect::RemoveActors(Self::victims(view))
    }
}

// ============================================================================
// Targeted banishment
// ============================================================================

/// Erase one race from the level: whichever race is collectively
/// projecting the most danger.
pub(crate) struct BanishRace;

impl BanishRace {
    /// Groups the roster by race and returns the worst
    /// (race, victims, summed danger) triple.
    fn worst_race(
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
    ) -> Option<(RaceId, Vec<ActorId>, i32)> {
        let world = view.world;
        let mut groups: Vec<(RaceId, Vec<ActorId>, i32)> = Vec::new();

        for target in view.targets {
            let Some(actor) = world.actor(target.id) else {
                continue;
            };
            let Some(race) = world.race_of(actor) else {
                continue;
            };
            // Uniques are exempt from banishment by the rules.
            if race.has(RaceFlags::UNIQUE) {
                continue;
            }
            let danger =
                actor_danger(world, view.proj, ctx, world.agent.pos, 1, target.id, true, true);
            match groups.iter_mut().find(|(id, _, _)| *id == actor.race) {
                Some((_, ids, sum)) => {
                    ids.push(target.id);
                    *sum += danger;
                }
                None => groups.push((actor.race, vec![target.id], danger)),
            }
        }

        groups.into_iter().max_by_key(|&(_, _, sum)| sum)
    }

    fn value(view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> i32 {
        let agent = &view.world.agent;
        let allowed = fail_allowance(p1, agent.avoidance());
        let has_spell = !cannot_cast(agent) && agent.spell_ok(SpellKind::Banishment, allowed);
        let has_other = agent.has_consumable(ConsumableKind::ScrollBanishment)
            || agent.device_ok(DeviceKind::StaffBanishment, allowed);
        if !has_spell && !has_other {
            return 0;
        }
        // The casting costs life per victim; never attempt it frail.
        if agent.hp <= 75 {
            return 0;
        }
        // Worth a turn only when the crowd, not one brawler, is the
        // problem.
        if p1 < agent.avoidance() * 6 / 10 {
            return 0;
        }

        let Some((_, victims, sum)) = Self::worst_race(view, ctx) else {
            return 0;
        };
        let strain = victims.len() as i32 * BANISH_STRAIN;
        if strain * 12 / 10 >= agent.hp {
            return 0;
        }
        let value = sum - strain;
        value.max(0)
    }
}

impl DefenseAction for BanishRace {
    fn name(&self) -> &'static str {
        "banish_race"
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
        let Some((_, victims, _)) = Self::worst_race(view, ctx) else {
            return Effect::Aborted;
        };
        let agent = &view.world.agent;
        let allowed = fail_allowance(p1, agent.avoidance());
        if !cannot_cast(agent) && agent.spell_ok(SpellKind::Banishment, allowed) {
            sink.issue(Command::Cast { spell: SpellKind::Banishment, target: None });
        } else if agent.has_consumable(ConsumableKind::ScrollBanishment) {
            sink.issue(Command::ReadScroll { kind: ConsumableKind::ScrollBanishment });
        } else {
            sink.issue(Command::UseDevice { device: DeviceKind::StaffBanishment, target: None });
        }
        Effect::RemoveActors(victims)
    }
}

// ============================================================================
// Earthquake
// ============================================================================

/// Shake the room down on whatever is crowding us. Buries ordinary
/// walkers; wall-walkers shrug it off.
pub(crate) struct Earthquake;

impl Earthquake {
    fn buried(view: &TacticalView<'_>) -> Vec<ActorId> {
        let world = view.world;
        view.targets
            .iter()
            .filter(|t| world.agent.pos.distance(t.pos) <= 3)
            .filter(|t| {
                world
                    .actor(t.id)
                    .and_then(|a| world.race_of(a))
                    .map(|r| {
                        !r.has(RaceFlags::PASS_WALL | RaceFlags::KILL_WALL)
                            && !r.has(RaceFlags::UNIQUE)
                    })
                    .unwrap_or(false)
            })
            .map(|t| t.id)
            .collect()
    }

    fn value(view: &TacticalView<'_>, ctx: &mut EvalContext, p1: i32) -> i32 {
        let agent = &view.world.agent;
        if cannot_cast(agent) {
            return 0;
        }
        let allowed = fail_allowance(p1, agent.avoidance());
        if !agent.spell_ok(SpellKind::Earthquake, allowed) {
            return 0;
        }
        let buried = Self::buried(view);
        if buried.is_empty() {
            return 0;
        }
        let p2 = ctx.with_excluded(&buried, |ctx| super::danger_at_agent(view, ctx, true));
        let unique = view.world.posture.fighting_unique > 0;
        if super::improvement_worthwhile(p1, p2, agent.avoidance(), unique) {
            p1 - p2
        } else {
            0
        }
    }
}

impl DefenseAction for Earthquake {
    fn name(&self) -> &'static str {
        "earthquake"
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
        sink.issue(Command::Cast { spell: SpellKind::Earthquake, target: None });
        // The rubble does the rest; the roster learns the outcome next
        // tick.
        Effect::None
    }
}

// ============================================================================
// Word of destruction
// ============================================================================

/// Level the neighbourhood. Everything nearby is destroyed or displaced,
/// including the floor.
pub(crate) struct Destruction;

impl Destruction {
    fn value(view: &TacticalView<'_>, p1: i32) -> i32 {
        let world = view.world;
        let agent = &world.agent;
        let allowed = fail_allowance(p1, agent.avoidance());
        let has_spell = !cannot_cast(agent) && agent.spell_ok(SpellKind::WordOfDestruction, allowed);
        let has_staff = agent.device_ok(DeviceKind::StaffDestruction, allowed);
        if !has_spell && !has_staff {
            return 0;
        }
        // Not while a prize unique is in the blast: the drop goes with
        // the floor.
        if world.posture.fighting_unique >= 10 {
            return 0;
        }
        // A teleport scroll is the cheaper exit from moderate trouble.
        if agent.has_consumable(ConsumableKind::ScrollTeleport)
            && p1 < agent.avoidance() * 2
        {
            return 0;
        }
        // Scorched earth needs real danger.
        if p1 <= agent.avoidance() {
            return 0;
        }
        p1
    }

    fn victims(view: &TacticalView<'_>) -> Vec<ActorId> {
        let world = view.world;
        view.targets
            .iter()
            .filter(|t| world.agent.pos.distance(t.pos) <= DESTRUCTION_RADIUS)
            .map(|t| t.id)
            .collect()
    }
}

impl DefenseAction for Destruction {
    fn name(&self) -> &'static str {
        "word_of_destruction"
    }

    fn score(&self, view: &TacticalView<'_>, _ctx: &mut EvalContext, p1: i32) -> Utility {
        match Self::value(view, p1) {
            0 => Utility::Rejected,
            v => Utility::Scored(v),
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        _ctx: &mut EvalContext,
        p1: i32,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        if Self::value(view, p1) == 0 {
            return Effect::Aborted;
        }
        let agent = &view.world.agent;
        let allowed = fail_allowance(p1, agent.avoidance());
        if !cannot_cast(agent) && agent.spell_ok(SpellKind::WordOfDestruction, allowed) {
            sink.issue(Command::Cast { spell: SpellKind::WordOfDestruction, target: None });
        } else {
            sink.issue(Command::UseDevice { device: DeviceKind::StaffDestruction, target: None });
        }
        Effect::RemoveActors(Self::victims(view))
    }
}

// ============================================================================
// Teleport level
// ============================================================================

/// Leave the level entirely. The last resort before dying with options
/// unspent.
pub(crate) struct TeleportLevel;

impl TeleportLevel {
    fn value(view: &TacticalView<'_>, p1: i32) -> i32 {
        let world = view.world;
        let agent = &world.agent;
        let allowed = fail_allowance(p1, agent.avoidance());
        let has_spell = !cannot_cast(agent) && agent.spell_ok(SpellKind::TeleportLevel, allowed);
        let has_scroll = agent.has_consumable(ConsumableKind::ScrollTeleportLevel);
        if !has_spell && !has_scroll {
            return 0;
        }
        // An in-level teleport is a cheaper escape when available.
        if !cannot_cast(agent) && agent.spell_ok(SpellKind::TeleportSelf, allowed) {
            return 0;
        }
        // Abandoning a boss fight forfeits the whole investment.
        if world.posture.fighting_unique >= 10 {
            return 0;
        }
        // Only out of genuinely unwinnable positions.
        if p1 < agent.avoidance() * 15 / 10 {
            return 0;
        }
        p1
    }
}

impl DefenseAction for TeleportLevel {
    fn name(&self) -> &'static str {
        "teleport_level"
    }

    fn score(&self, view: &TacticalView<'_>, _ctx: &mut EvalContext, p1: i32) -> Utility {
        match Self::value(view, p1) {
            0 => Utility::Rejected,
            v => Utility::Scored(v),
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        _ctx: &mut EvalContext,
        p1: i32,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        if Self::value(view, p1) == 0 {
            return Effect::Aborted;
        }
        let agent = &view.world.agent;
        let allowed = fail_allowance(p1, agent.avoidance());
        if !cannot_cast(agent) && agent.spell_ok(SpellKind::TeleportLevel, allowed) {
            sink.issue(Command::Cast { spell: SpellKind::TeleportLevel, target: None });
        } else {
            sink.issue(Command::ReadScroll { kind: ConsumableKind::ScrollTeleportLevel });
        }
        Effect::Relocated
    }
}
