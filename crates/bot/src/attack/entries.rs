//! Offense catalog entries.
//!
//! Each entry prices one way of hurting something this tick. Direct
//! damage entries add a danger-relief bonus so the most threatening
//! victim wins target selection; status entries price the counterfactual
//! danger delta; every entry rejects itself when its resources or
//! preconditions are missing.

use gloom_core::{
    ActorId, AgentState, Command, CommandSink, DeviceKind, Direction, RaceFlags, SpellKind,
};

use crate::attack::bias;
use crate::attack::launch::{AttackType, LaunchPlan, Shape, launch_best, slay_multiplier};
use crate::catalog::{AttackAction, Effect, TacticalView, Utility};
use crate::context::EvalContext;
use crate::danger::actor_danger;

/// Spell/device failure chance above which an attack is not worth the
/// turn.
pub(crate) const ATTACK_FAIL_CEILING: i32 = 25;

fn adjacent_target(view: &TacticalView<'_>) -> bool {
    let agent_pos = view.world.agent.pos;
    view.targets.iter().any(|t| agent_pos.touches(t.pos))
}

// ============================================================================
// Melee
// ============================================================================

/// Strike an adjacent victim with the wielded weapon.
pub(crate) struct MeleeThrust;

impl MeleeThrust {
    /// Expected weapon damage against one victim, biased toward priority
    /// targets.
    fn thrust_damage(view: &TacticalView<'_>, id: ActorId) -> i32 {
        let world = view.world;
        let agent = &world.agent;
        let Some(actor) = world.actor(id) else {
            return 0;
        };
        let Some(race) = world.race_of(actor) else {
            return 0;
        };

        let weapon = &agent.weapon;
        let mut dam = weapon.average_roll();
        dam *= slay_multiplier(weapon.slays, race);
        dam += weapon.to_dam + agent.to_dam;
        dam *= agent.blows;

        // Hit gate against the victim's armor.
        let mut chance = agent.skill_melee + (agent.to_hit + weapon.to_hit) * 3;
        if chance < (race.armor * 3 / 4) * 8 / 10 {
            return 0;
        }
        chance = chance.clamp(5, 95);
        if agent.level > 15 {
            chance += 10;
        }
        dam = dam * chance / 100;
        if dam <= 0 {
            dam = 1;
        }

        // Overkill is not value.
        if dam > actor.power * 2 && !race.has(RaceFlags::UNIQUE) {
            dam = actor.power * 2;
        }

        if race.has(RaceFlags::UNIQUE) {
            if world.depth >= 1 {
                dam += dam * bias::UNIQUE_MELEE_BONUS;
            } else {
                // Chasing a town unique wakes the whole market square.
                dam = dam * 2 / 3;
                if agent.level < 5 {
                    dam = 0;
                }
            }
        }
        if race.has(RaceFlags::BREEDER) {
            dam = dam * bias::BREEDER_MULT_TENTHS / 10;
        }
        if race.is_summoner() {
            dam += dam * bias::SUMMONER_BONUS_TENTHS / 10;
        }

        dam
    }

    /// Picks the best adjacent victim, shared by both phases.
    fn best(view: &TacticalView<'_>, ctx: &mut EvalContext) -> Option<(ActorId, i32)> {
        let world = view.world;
        let agent = &world.agent;
        let mut best: Option<(ActorId, i32)> = None;

        for target in view.targets {
            if agent.pos.distance(target.pos) > 1 {
                continue;
            }
            let Some(actor) = world.actor(target.id) else {
                continue;
            };
            let mut d = Self::thrust_damage(view, target.id);
            if d <= 0 {
                continue;
            }

            // Waking something that can kill us, with a swing that will
            // not finish it, is worse than standing still.
            if !actor.is_awake() && d <= actor.power {
                let p = actor_danger(
                    world, view.proj, ctx, target.pos, 1, target.id, true, true,
                );
                if p > agent.avoidance() * 2 {
                    continue;
                }
            }
            if world.depth == 0 && !actor.is_awake() {
                continue;
            }

            // Danger relief: prefer the victim that threatens us most.
            let mut p = actor_danger(world, view.proj, ctx, agent.pos, 2, target.id, true, true);
            if d <= actor.power && agent.level > 15 {
                // Partial kills relieve little for a seasoned fighter.
                p /= 10;
            }
            d += p;

            if best.map(|(_, v)| d > v).unwrap_or(true) {
                best = Some((target.id, d));
            }
        }
        best
    }
}

impl AttackAction for MeleeThrust {
    fn name(&self) -> &'static str {
        "melee_thrust"
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext) -> Utility {
        // Too afraid to swing.
        if view.world.agent.afraid {
            return Utility::Rejected;
        }
        match Self::best(view, ctx) {
            Some((_, value)) => Utility::Scored(value),
            None => Utility::Rejected,
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        let Some((id, value)) = Self::best(view, ctx) else {
            return Effect::Aborted;
        };
        let Some(actor) = view.world.actor(id) else {
            return Effect::Aborted;
        };
        let Some(dir) = Direction::toward(view.world.agent.pos, actor.pos) else {
            return Effect::Aborted;
        };
        tracing::info!(value, pos = ?actor.pos, "melee thrust");
        sink.issue(Command::Melee { dir });
        Effect::None
    }
}

// ============================================================================
// Missiles
// ============================================================================

/// Fire the loaded launcher.
pub(crate) struct LaunchMissile;

impl LaunchMissile {
    fn volley_damage(agent: &AgentState) -> i32 {
        let (Some(launcher), Some(ammo)) = (&agent.launcher, &agent.ammo) else {
            return 0;
        };
        if ammo.count <= 0 {
            return 0;
        }
        let per_shot = ammo.dice * (ammo.sides + 1) / 2 * launcher.multiplier + ammo.to_dam;
        per_shot * agent.shots.max(1)
    }

    fn plan(view: &TacticalView<'_>, ctx: &mut EvalContext) -> Option<LaunchPlan> {
        let dam = Self::volley_damage(&view.world.agent);
        if dam <= 0 {
            return None;
        }
        launch_best(view, ctx, Shape::Bolt, dam, AttackType::MissileShot)
    }
}

impl AttackAction for LaunchMissile {
    fn name(&self) -> &'static str {
        "launch_missile"
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext) -> Utility {
        match Self::plan(view, ctx) {
            Some(plan) => Utility::Scored(plan.value),
            None => Utility::Rejected,
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        let Some(plan) = Self::plan(view, ctx) else {
            return Effect::Aborted;
        };
        tracing::info!(value = plan.value, target = ?plan.target, "firing volley");
        sink.issue(Command::FireMissile { target: plan.target });
        Effect::None
    }
}

// ============================================================================
// Attack spells
// ============================================================================

/// One aimed attack spell: geometry, payload, and a damage formula over
/// the agent's stats.
pub(crate) struct CastAttack {
    pub name: &'static str,
    pub spell: SpellKind,
    pub shape: Shape,
    pub typ: AttackType,
    pub dam: fn(&AgentState) -> i32,
    /// Reserve-mana variant: allowed to dip into the emergency escape
    /// reserve, but only with an enemy in arm's reach.
    pub reserve: bool,
}

impl CastAttack {
    /// Mana the agent keeps in reserve for an emergency escape.
    fn escape_reserve(agent: &AgentState) -> i32 {
        agent
            .spell(SpellKind::TeleportSelf)
            .map(|s| s.mana_cost)
            .unwrap_or(0)
    }

    fn eligible(&self, view: &TacticalView<'_>) -> bool {
        let agent = &view.world.agent;
        if !agent.spell_ok(self.spell, ATTACK_FAIL_CEILING) {
            return false;
        }
        let Some(spell) = agent.spell(self.spell) else {
            return false;
        };
        if self.reserve {
            // The reserve variant exists for knife-range emergencies.
            adjacent_target(view)
        } else {
            // Keep the escape reserve intact unless already cornered.
            agent.mana >= spell.mana_cost + Self::escape_reserve(agent) || adjacent_target(view)
        }
    }

    fn plan(&self, view: &TacticalView<'_>, ctx: &mut EvalContext) -> Option<LaunchPlan> {
        if !self.eligible(view) {
            return None;
        }
        launch_best(view, ctx, self.shape, (self.dam)(&view.world.agent), self.typ)
    }
}

impl AttackAction for CastAttack {
    fn name(&self) -> &'static str {
        self.name
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext) -> Utility {
        match self.plan(view, ctx) {
            Some(plan) => Utility::Scored(plan.value),
            None => Utility::Rejected,
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        let Some(plan) = self.plan(view, ctx) else {
            return Effect::Aborted;
        };
        let target = match self.shape {
            Shape::Dispel => None,
            _ => Some(plan.target),
        };
        tracing::info!(spell = %self.spell, value = plan.value, "casting attack spell");
        sink.issue(Command::Cast { spell: self.spell, target });
        Effect::None
    }
}

// ============================================================================
// Charged devices
// ============================================================================

/// An aimed wand/rod/staff attack mirroring the analogous spell.
pub(crate) struct DeviceAttack {
    pub name: &'static str,
    pub device: DeviceKind,
    pub shape: Shape,
    pub typ: AttackType,
    pub dam: fn(&AgentState) -> i32,
}

impl DeviceAttack {
    fn plan(&self, view: &TacticalView<'_>, ctx: &mut EvalContext) -> Option<LaunchPlan> {
        let agent = &view.world.agent;
        if agent.blind || agent.confused {
            return None;
        }
        if !agent.device_ok(self.device, ATTACK_FAIL_CEILING) {
            return None;
        }
        launch_best(view, ctx, self.shape, (self.dam)(agent), self.typ)
    }
}

impl AttackAction for DeviceAttack {
    fn name(&self) -> &'static str {
        self.name
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext) -> Utility {
        match self.plan(view, ctx) {
            Some(plan) => Utility::Scored(plan.value),
            None => Utility::Rejected,
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        let Some(plan) = self.plan(view, ctx) else {
            return Effect::Aborted;
        };
        let target = match self.shape {
            Shape::Dispel => None,
            _ => Some(plan.target),
        };
        tracing::info!(device = %self.device, value = plan.value, "using attack device");
        sink.issue(Command::UseDevice { device: self.device, target });
        Effect::None
    }
}

/// Test-firing an unidentified wand at a live target: a little expected
/// damage, and the identification is the real prize.
pub(crate) struct UnknownWandZap;

impl UnknownWandZap {
    const PROBE_DAMAGE: i32 = 35;

    fn plan(view: &TacticalView<'_>, ctx: &mut EvalContext) -> Option<LaunchPlan> {
        let agent = &view.world.agent;
        if agent.blind || agent.confused {
            return None;
        }
        agent.device(DeviceKind::WandUnknown)?;
        launch_best(view, ctx, Shape::Bolt, Self::PROBE_DAMAGE, AttackType::Pure)
    }
}

impl AttackAction for UnknownWandZap {
    fn name(&self) -> &'static str {
        "unknown_wand_zap"
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext) -> Utility {
        match Self::plan(view, ctx) {
            Some(plan) => Utility::Scored(plan.value.min(Self::PROBE_DAMAGE)),
            None => Utility::Rejected,
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        let Some(plan) = Self::plan(view, ctx) else {
            return Effect::Aborted;
        };
        tracing::info!(target = ?plan.target, "test-firing unknown wand");
        sink.issue(Command::UseDevice { device: DeviceKind::WandUnknown, target: Some(plan.target) });
        Effect::None
    }
}

// ============================================================================
// Teleport other
// ============================================================================

/// Bounce the worst of the reachable threats across the level. Scored as
/// the danger that leaves with them.
pub(crate) struct TeleportOtherAttack;

impl TeleportOtherAttack {
    fn candidates(view: &TacticalView<'_>, ctx: &mut EvalContext) -> Vec<(ActorId, i32)> {
        let world = view.world;
        let agent = &world.agent;
        let mut picked = Vec::new();

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
            let danger =
                actor_danger(world, view.proj, ctx, agent.pos, 1, target.id, true, true);
            if race.has(RaceFlags::UNIQUE) {
                // A wounded unique stays: we are here to finish it. Only
                // bounce one that is fresh and carrying the fight.
                if actor.injury_pct() >= 60 {
                    continue;
                }
                if danger <= agent.avoidance() * 13 / 10 {
                    continue;
                }
            }
            if danger <= 0 {
                continue;
            }
            picked.push((target.id, danger));
        }
        // Strongest threats first; the beam catches what it catches.
        picked.sort_by_key(|&(_, danger)| std::cmp::Reverse(danger));
        picked
    }

    fn value(view: &TacticalView<'_>, ctx: &mut EvalContext) -> Option<(Vec<ActorId>, i32)> {
        let candidates = Self::candidates(view, ctx);
        if candidates.is_empty() {
            return None;
        }
        let ids: Vec<ActorId> = candidates.iter().map(|&(id, _)| id).collect();
        let world = view.world;
        let before = crate::danger::evaluate_danger(
            world, view.proj, ctx, world.agent.pos, 1, true, false,
        );
        let after = ctx.with_excluded(&ids, |ctx| {
            crate::danger::evaluate_danger(world, view.proj, ctx, world.agent.pos, 1, true, false)
        });
        let delta = before - after;
        (delta > 0).then_some((ids, delta))
    }
}

impl AttackAction for TeleportOtherAttack {
    fn name(&self) -> &'static str {
        "teleport_other"
    }

    fn score(&self, view: &TacticalView<'_>, ctx: &mut EvalContext) -> Utility {
        if !view.world.agent.spell_ok(SpellKind::TeleportOther, ATTACK_FAIL_CEILING) {
            return Utility::Rejected;
        }
        match Self::value(view, ctx) {
            Some((_, delta)) => Utility::Scored(delta),
            None => Utility::Rejected,
        }
    }

    fn apply(
        &self,
        view: &TacticalView<'_>,
        ctx: &mut EvalContext,
        sink: &mut dyn CommandSink,
    ) -> Effect {
        let Some((ids, delta)) = Self::value(view, ctx) else {
            return Effect::Aborted;
        };
        let Some(actor) = view.world.actor(ids[0]) else {
            return Effect::Aborted;
        };
        tracing::info!(value = delta, target = ?actor.pos, "teleporting threat away");
        sink.issue(Command::Cast { spell: SpellKind::TeleportOther, target: Some(actor.pos) });
        Effect::None
    }
}
