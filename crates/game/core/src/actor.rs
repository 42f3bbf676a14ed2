//! Live hostile actors as the bot knows them.

use bitflags::bitflags;

use crate::position::Position;
use crate::race::RaceId;

/// Index into the snapshot's actor roster.
///
/// Ids are stable within a tick; tombstoned slots keep their index so that
/// grid occupancy references never dangle mid-evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorId(pub u16);

bitflags! {
    /// Transient status conditions observed on an actor.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct StatusFlags: u8 {
        const ASLEEP   = 1 << 0;
        const CONFUSED = 1 << 1;
        const STUNNED  = 1 << 2;
        const AFRAID   = 1 << 3;
    }
}

/// One tracked hostile actor.
///
/// Created when first sensed, refreshed every tick the world snapshot sees
/// it, and tombstoned (race id cleared) when it dies or leaves knowledge.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Actor {
    pub race: RaceId,
    pub pos: Position,
    /// Remaining power (hitpoint-equivalent).
    pub power: i32,
    pub max_power: i32,
    pub status: StatusFlags,
    /// Tick at which this actor was last directly observed.
    pub last_seen: u32,
}

impl Actor {
    pub fn new(race: RaceId, pos: Position, power: i32) -> Self {
        Self {
            race,
            pos,
            power,
            max_power: power,
            status: StatusFlags::empty(),
            last_seen: 0,
        }
    }

    /// Tombstoned slots stay in the roster but contribute nothing.
    pub fn is_dead(&self) -> bool {
        self.race.is_none()
    }

    pub fn is_awake(&self) -> bool {
        !self.status.contains(StatusFlags::ASLEEP)
    }

    /// Percent of power already lost, 0..=100.
    pub fn injury_pct(&self) -> i32 {
        if self.max_power <= 0 {
            return 100;
        }
        ((self.max_power - self.power).max(0) * 100) / self.max_power
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injury_percentage() {
        let mut a = Actor::new(RaceId(3), Position::new(1, 1), 80);
        assert_eq!(a.injury_pct(), 0);
        a.power = 20;
        assert_eq!(a.injury_pct(), 75);
        a.power = 0;
        assert_eq!(a.injury_pct(), 100);
    }
}
