//! The per-tick world snapshot.
//!
//! `WorldSnapshot` is the read side of the engine's contract with the rest
//! of the program: the roster of known hostile actors, the agent readout,
//! the remembered map, and the pre-aggregated ambient fear grids. The
//! runtime refreshes it each tick; decision layers read it and, on commit
//! of an area-clearing action, prune its roster.

use bounded_vector::BoundedVec;

use crate::actor::{Actor, ActorId};
use crate::agent::AgentState;
use crate::config::GameConfig;
use crate::error::SnapshotError;
use crate::oracle::TerrainOracle;
use crate::position::Position;
use crate::race::{RaceId, RaceTemplate};
use crate::terrain::{Tile, TileMap};

/// Pre-aggregated ambient fear, maintained by the sensing layer.
///
/// `region` is a coarse grid (one cell per [`GameConfig::REGION_SIZE`]
/// square) remembering threat that is no longer directly observed;
/// `monsters` is a per-cell surcharge under visible crowds. Both are plain
/// inputs here: the engine reads them, the sensing layer owns them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FearGrids {
    region_width: i32,
    region: Vec<i32>,
    width: i32,
    monsters: Vec<i32>,
}

impl FearGrids {
    pub fn new(map_width: i32, map_height: i32) -> Self {
        let rw = map_width / GameConfig::REGION_SIZE + 1;
        let rh = map_height / GameConfig::REGION_SIZE + 1;
        Self {
            region_width: rw,
            region: vec![0; (rw * rh).max(0) as usize],
            width: map_width,
            monsters: vec![0; (map_width * map_height).max(0) as usize],
        }
    }

    fn region_index(&self, pos: Position) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 {
            return None;
        }
        let rx = pos.x / GameConfig::REGION_SIZE;
        let ry = pos.y / GameConfig::REGION_SIZE;
        let idx = (ry * self.region_width + rx) as usize;
        (idx < self.region.len()).then_some(idx)
    }

    fn cell_index(&self, pos: Position) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width {
            return None;
        }
        let idx = (pos.y * self.width + pos.x) as usize;
        (idx < self.monsters.len()).then_some(idx)
    }

    /// Remembered-threat fear for the region containing `pos`.
    pub fn region_fear(&self, pos: Position) -> i32 {
        self.region_index(pos).map(|i| self.region[i]).unwrap_or(0)
    }

    /// Crowding fear at `pos`.
    pub fn monster_fear(&self, pos: Position) -> i32 {
        self.cell_index(pos).map(|i| self.monsters[i]).unwrap_or(0)
    }

    pub fn set_region_fear(&mut self, pos: Position, fear: i32) {
        if let Some(i) = self.region_index(pos) {
            self.region[i] = fear;
        }
    }

    pub fn set_monster_fear(&mut self, pos: Position, fear: i32) {
        if let Some(i) = self.cell_index(pos) {
            self.monsters[i] = fear;
        }
    }
}

/// Fight-posture flags published by the goal planner.
///
/// The planner decides *whether* to fight; these flags let the tactical
/// layer know what kind of fight it is in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Posture {
    /// Nonzero while engaging a unique; higher values mark endgame bosses.
    pub fighting_unique: i32,
    pub fighting_summoner: bool,
    /// A notorious early-game killer is on the level; disengage policy.
    pub scary_level: bool,
    /// Currently fleeing and ignoring targets.
    pub ignoring_targets: bool,
}

/// Read-only per-tick view of everything the tactical engine consumes.
#[derive(Clone, Debug)]
pub struct WorldSnapshot {
    pub tick: u32,
    /// Current dungeon depth in levels; 0 is the town.
    pub depth: i32,
    pub agent: AgentState,
    pub map: TileMap,
    pub fear: FearGrids,
    pub posture: Posture,
    pub config: GameConfig,
    races: Vec<RaceTemplate>,
    actors: BoundedVec<Actor, 0, { GameConfig::MAX_ACTORS }>,
}

impl WorldSnapshot {
    pub fn new(map: TileMap, agent: AgentState) -> Self {
        let fear = FearGrids::new(map.width(), map.height());
        Self {
            tick: 0,
            depth: 0,
            agent,
            map,
            fear,
            posture: Posture::default(),
            config: GameConfig::default(),
            races: Vec::new(),
            actors: BoundedVec::new(),
        }
    }

    // ========================================================================
    // Race templates
    // ========================================================================

    /// Registers a race template and returns its id.
    pub fn add_race(&mut self, template: RaceTemplate) -> RaceId {
        self.races.push(template);
        RaceId(self.races.len() as u16)
    }

    /// Resolves a race id. `None` for the reserved id and out-of-table ids;
    /// callers treat that as maximal danger, not as absence of threat.
    pub fn race(&self, id: RaceId) -> Option<&RaceTemplate> {
        if id.is_none() {
            return None;
        }
        self.races.get(id.0 as usize - 1)
    }

    /// Race template of a live actor.
    pub fn race_of(&self, actor: &Actor) -> Option<&RaceTemplate> {
        self.race(actor.race)
    }

    // ========================================================================
    // Actor roster
    // ========================================================================

    /// Adds a sensed actor to the roster and marks its cell occupied.
    pub fn add_actor(&mut self, actor: Actor) -> Result<ActorId, SnapshotError> {
        let pos = actor.pos;
        self.actors.push(actor).map_err(|_| SnapshotError::RosterFull {
            capacity: GameConfig::MAX_ACTORS,
        })?;
        let id = ActorId((self.actors.len() - 1) as u16);
        if let Some(tile) = self.map.tile_mut(pos) {
            tile.occupant = Some(id.0);
        }
        Ok(id)
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id.0 as usize)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(id.0 as usize)
    }

    /// Iterates live (non-tombstoned) actors with their ids.
    pub fn live_actors(&self) -> impl Iterator<Item = (ActorId, &Actor)> {
        self.actors
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.is_dead())
            .map(|(i, a)| (ActorId(i as u16), a))
    }

    pub fn live_actor_count(&self) -> usize {
        self.live_actors().count()
    }

    /// Tombstones an actor: clears its race id and its cell occupancy.
    /// The slot itself is retained; ids stay stable within a tick.
    pub fn remove_actor(&mut self, id: ActorId) {
        let Some(actor) = self.actors.get_mut(id.0 as usize) else {
            return;
        };
        let pos = actor.pos;
        actor.race = RaceId::NONE;
        if let Some(tile) = self.map.tile_mut(pos) {
            if tile.occupant == Some(id.0) {
                tile.occupant = None;
            }
        }
    }

    /// The actor occupying `pos`, if any.
    pub fn occupant(&self, pos: Position) -> Option<ActorId> {
        let id = self.map.tile(pos)?.occupant?;
        let actor = self.actors.get(id as usize)?;
        (!actor.is_dead()).then_some(ActorId(id))
    }

    // ========================================================================
    // Convenience
    // ========================================================================

    /// Count of protective cells (glyphs, walls that box a summon out)
    /// adjacent to `pos`. Used to discount summon threat.
    pub fn protected_neighbours(&self, pos: Position) -> i32 {
        pos.neighbours()
            .filter(|&n| {
                self.map
                    .tile(n)
                    .map(|t| t.terrain == crate::terrain::TerrainKind::Glyph || t.terrain.is_wall())
                    .unwrap_or(false)
            })
            .count() as i32
    }

    /// True when the agent currently stands on a protective glyph.
    pub fn agent_on_glyph(&self) -> bool {
        self.map
            .tile(self.agent.pos)
            .map(|t| t.terrain == crate::terrain::TerrainKind::Glyph)
            .unwrap_or(false)
    }

    /// Vault cells suppress ambient fear.
    pub fn in_vault(&self, pos: Position) -> bool {
        self.map.tile(pos).map(|t| t.in_vault).unwrap_or(false)
    }
}

impl TerrainOracle for WorldSnapshot {
    fn tile(&self, pos: Position) -> Option<Tile> {
        self.map.tile(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::RaceTemplate;

    fn snapshot() -> WorldSnapshot {
        WorldSnapshot::new(TileMap::open_floor(30, 30), AgentState::default())
    }

    #[test]
    fn roster_roundtrip() {
        let mut world = snapshot();
        let race = world.add_race(RaceTemplate::builder("rat").build());
        let id = world
            .add_actor(Actor::new(race, Position::new(4, 5), 12))
            .unwrap();
        assert_eq!(world.live_actor_count(), 1);
        assert_eq!(world.occupant(Position::new(4, 5)), Some(id));

        world.remove_actor(id);
        assert_eq!(world.live_actor_count(), 0);
        assert_eq!(world.occupant(Position::new(4, 5)), None);
    }

    #[test]
    fn reserved_race_id_resolves_to_none() {
        let world = snapshot();
        assert!(world.race(RaceId::NONE).is_none());
        assert!(world.race(RaceId(40)).is_none());
    }

    #[test]
    fn protected_neighbours_counts_glyphs_and_walls() {
        let mut world = snapshot();
        let p = Position::new(10, 10);
        world.map.set(p.offset(1, 0), Tile::wall());
        let mut glyph = Tile::floor();
        glyph.terrain = crate::terrain::TerrainKind::Glyph;
        world.map.set(p.offset(-1, 0), glyph);
        assert_eq!(world.protected_neighbours(p), 2);
    }
}
