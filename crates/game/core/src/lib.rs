//! Deterministic game data shared between the runtime and the autoplay bot.
//!
//! `gloom-core` defines the canonical world-snapshot types (actors, race
//! templates, agent state, terrain knowledge) and the narrow oracle traits
//! through which decision layers consume external collaborators. Everything
//! here is pure data plus integer arithmetic; no I/O, no randomness.
pub mod actor;
pub mod agent;
pub mod config;
pub mod effects;
pub mod error;
pub mod oracle;
pub mod position;
pub mod race;
pub mod snapshot;
pub mod speed;
pub mod terrain;

pub use actor::{Actor, ActorId, StatusFlags};
pub use agent::{
    AgentState, AmmoProfile, ChargedItem, ConsumableKind, DeviceKind, LauncherProfile, ResistFlags,
    SlayFlags, SpellAbility, SpellKind, SustainFlags, WeaponProfile,
};
pub use config::GameConfig;
pub use effects::{BlowEffect, Element, RangedAbility};
pub use error::SnapshotError;
pub use oracle::{Command, CommandSink, Direction, ProjectionOracle, RecordingSink, TerrainOracle};
pub use position::Position;
pub use race::{Blow, RaceFlags, RaceId, RaceTemplate, RaceTemplateBuilder};
pub use snapshot::{FearGrids, Posture, WorldSnapshot};
pub use speed::{NORMAL_SPEED, energy_per_game_turn, game_turns_per_move};
pub use terrain::{TerrainKind, Tile, TileMap};
