//! Narrow interfaces to external collaborators.
//!
//! The tactical engine consumes the rest of the program through three
//! traits: terrain lookup, projection queries answered by the flow /
//! pathfinding layer, and a command sink that turns decisions into
//! keypress-equivalent commands. Everything behind these traits is out of
//! scope for the engine and replaced by doubles in tests.

use crate::agent::{ConsumableKind, DeviceKind, SpellKind};
use crate::position::Position;
use crate::terrain::Tile;

/// Read access to the remembered map.
pub trait TerrainOracle {
    /// Returns the tile at `pos`, or `None` outside the known map.
    fn tile(&self, pos: Position) -> Option<Tile>;
}

/// Projection and reachability queries, answered by the flow layer.
///
/// Both queries are over *remembered* terrain: they answer what the agent
/// believes, not ground truth.
pub trait ProjectionOracle {
    /// True when an effect could travel from `from` to `to`, allowing the
    /// usual leniency at the endpoints (a target standing in a wall cell
    /// such as a wall-passing ghost still counts).
    fn projectable(&self, from: Position, to: Position) -> bool;

    /// Strict variant: every cell of the path must be passable. Bolt
    /// spells need this; they cannot skip over intervening obstacles.
    fn projectable_pure(&self, from: Position, to: Position) -> bool;
}

/// Eight movement directions, numbered as on the numeric keypad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    SouthWest,
    South,
    SouthEast,
    West,
    East,
    NorthWest,
    North,
    NorthEast,
}

impl Direction {
    /// Direction from one cell toward an adjacent cell.
    ///
    /// Returns `None` for the zero offset. Non-adjacent targets resolve to
    /// the dominant axis, which is what a keypress would do.
    pub fn toward(from: Position, to: Position) -> Option<Direction> {
        let dx = (to.x - from.x).signum();
        let dy = (to.y - from.y).signum();
        Some(match (dx, dy) {
            (0, 0) => return None,
            (-1, -1) => Direction::NorthWest,
            (0, -1) => Direction::North,
            (1, -1) => Direction::NorthEast,
            (-1, 0) => Direction::West,
            (1, 0) => Direction::East,
            (-1, 1) => Direction::SouthWest,
            (0, 1) => Direction::South,
            (1, 1) => Direction::SouthEast,
            _ => unreachable!(),
        })
    }
}

/// One committed tactical action, expressed as the keypress-equivalent
/// command the dispatch layer will issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// Strike an adjacent cell with the wielded weapon.
    Melee { dir: Direction },
    /// Fire the loaded launcher at a targeted cell.
    FireMissile { target: Position },
    /// Throw a carried object at a targeted cell.
    Throw { target: Position },
    /// Cast a spell, optionally at a targeted cell.
    Cast {
        spell: SpellKind,
        target: Option<Position>,
    },
    /// Aim or activate a charged device.
    UseDevice {
        device: DeviceKind,
        target: Option<Position>,
    },
    /// Read a scroll.
    ReadScroll { kind: ConsumableKind },
    /// Quaff a potion.
    Quaff { kind: ConsumableKind },
}

/// Receives exactly one command per committed decision.
pub trait CommandSink {
    fn issue(&mut self, command: Command);
}

/// Recording sink for tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub issued: Vec<Command>,
}

impl CommandSink for RecordingSink {
    fn issue(&mut self, command: Command) {
        self.issued.push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_toward_adjacent() {
        let c = Position::new(5, 5);
        assert_eq!(
            Direction::toward(c, Position::new(5, 4)),
            Some(Direction::North)
        );
        assert_eq!(
            Direction::toward(c, Position::new(6, 6)),
            Some(Direction::SouthEast)
        );
        assert_eq!(Direction::toward(c, c), None);
    }
}
