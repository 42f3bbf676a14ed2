/// Game configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameConfig {
    /// Maximum distance at which a hostile actor is tracked at all.
    /// Actors beyond this radius contribute nothing to threat evaluation.
    pub sense_radius: i32,
}

impl GameConfig {
    // ===== compile-time constants used as type parameters =====
    /// Maximum number of hostile actors tracked in one level's roster.
    pub const MAX_ACTORS: usize = 256;
    /// Maximum melee blow slots on a race template.
    pub const MAX_BLOWS: usize = 4;
    /// Maximum ranged/spell ability slots on a race template.
    pub const MAX_ABILITIES: usize = 24;
    /// Maximum known agent spells.
    pub const MAX_SPELLS: usize = 32;
    /// Maximum charged devices carried at once.
    pub const MAX_DEVICES: usize = 16;

    /// Side length of one fear region (the coarse remembered-threat grid).
    pub const REGION_SIZE: i32 = 11;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_SENSE_RADIUS: i32 = 20;

    pub fn new() -> Self {
        Self {
            sense_radius: Self::DEFAULT_SENSE_RADIUS,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}
