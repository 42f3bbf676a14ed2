//! The autoplay bot's tactical decision engine.
//!
//! Once the goal planner has decided a fight is happening, this crate
//! answers the only two questions that remain each tick: how dangerous is
//! every cell that matters, and which single action is worth committing.
//!
//! The engine is built around two pieces:
//!
//! - [`danger::evaluate_danger`] aggregates threat from the whole roster
//!   onto any grid cell, with turn-economy, reachability, and status
//!   adjustments per actor.
//! - The catalogs ([`attack`], [`defend`]) run a two-phase
//!   simulate-then-commit protocol: every entry is scored side-effect
//!   free, the first maximum wins, and exactly that entry executes.
//!
//! Counterfactual questions ("what if I had fire resistance?") run
//! through [`context::EvalContext`], whose scoped toggles cannot leak
//! past their evaluation.
//!
//! Everything is synchronous and deterministic: same snapshot, same
//! context, same answer.
pub mod attack;
pub mod catalog;
pub mod context;
pub mod danger;
pub mod defend;

pub use attack::AttackController;
pub use catalog::{AttackAction, DefenseAction, Effect, TacticalView, Target, Utility};
pub use context::{EvalContext, Flag};
pub use danger::{DANGER_CEILING, actor_danger, evaluate_danger};
pub use defend::DefenseController;
