//! Terrain and per-cell knowledge.
//!
//! The bot never sees the true map; it sees what it has learned. A [`Tile`]
//! therefore records both the terrain kind (as last observed) and knowledge
//! flags. Unknown cells are explicit: they carry `TerrainKind::Unknown` and
//! threat evaluation treats them conservatively.

use crate::position::Position;

/// Terrain categories relevant to tactical evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerrainKind {
    /// Never observed.
    #[default]
    Unknown,
    /// Open passable floor.
    Floor,
    /// Floor inscribed with a protective glyph.
    Glyph,
    /// Passable rubble pile.
    PassRubble,
    /// Impassable rubble.
    Rubble,
    /// Mineral vein (diggable wall).
    Vein,
    /// Plain granite wall.
    Granite,
    /// Permanent dungeon wall. Nothing passes or digs it.
    PermWall,
    ClosedDoor,
    OpenDoor,
    StairsUp,
    StairsDown,
}

impl TerrainKind {
    /// True for cells an ordinary walker can occupy.
    pub fn is_floor(self) -> bool {
        matches!(
            self,
            TerrainKind::Floor
                | TerrainKind::Glyph
                | TerrainKind::PassRubble
                | TerrainKind::OpenDoor
                | TerrainKind::StairsUp
                | TerrainKind::StairsDown
        )
    }

    /// True for wall-family cells that wall-passing actors may occupy.
    pub fn is_wall(self) -> bool {
        matches!(
            self,
            TerrainKind::Rubble | TerrainKind::Vein | TerrainKind::Granite
        )
    }

    /// True when projectiles stop here.
    pub fn blocks_projection(self) -> bool {
        !self.is_floor() && self != TerrainKind::Unknown
    }
}

/// One cell of remembered map state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tile {
    pub terrain: TerrainKind,
    /// Cell has been observed at some point.
    pub known: bool,
    /// Cell is currently lit.
    pub lit: bool,
    /// Cell is in the agent's current field of view.
    pub in_view: bool,
    /// Cell belongs to a vault. Vaults suppress ambient fear.
    pub in_vault: bool,
    /// Index of the actor occupying this cell, if any.
    pub occupant: Option<u16>,
}

impl Tile {
    pub fn floor() -> Self {
        Tile {
            terrain: TerrainKind::Floor,
            known: true,
            ..Tile::default()
        }
    }

    pub fn wall() -> Self {
        Tile {
            terrain: TerrainKind::Granite,
            known: true,
            ..Tile::default()
        }
    }
}

/// Row-major remembered map.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileMap {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl TileMap {
    /// Creates a map of unknown tiles.
    pub fn new(width: i32, height: i32) -> Self {
        let count = (width.max(0) as usize) * (height.max(0) as usize);
        Self {
            width,
            height,
            tiles: vec![Tile::default(); count],
        }
    }

    /// Creates a map of known open floor. Test and scenario convenience.
    pub fn open_floor(width: i32, height: i32) -> Self {
        let mut map = Self::new(width, height);
        for tile in &mut map.tiles {
            *tile = Tile::floor();
        }
        map
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some((pos.y as usize) * (self.width as usize) + pos.x as usize)
    }

    /// Returns the tile at `pos`, or `None` outside the map.
    pub fn tile(&self, pos: Position) -> Option<Tile> {
        self.index(pos).map(|i| self.tiles[i])
    }

    pub fn tile_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        self.index(pos).map(move |i| &mut self.tiles[i])
    }

    pub fn set(&mut self, pos: Position, tile: Tile) {
        if let Some(slot) = self.tile_mut(pos) {
            *slot = tile;
        }
    }

    /// True when an ordinary walker could stand on `pos` as far as we know.
    pub fn is_floor(&self, pos: Position) -> bool {
        self.tile(pos)
            .map(|t| t.terrain.is_floor())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_lookup_is_none() {
        let map = TileMap::open_floor(4, 4);
        assert!(map.tile(Position::new(-1, 0)).is_none());
        assert!(map.tile(Position::new(4, 0)).is_none());
        assert!(map.tile(Position::new(0, 4)).is_none());
        assert!(map.tile(Position::new(3, 3)).is_some());
    }

    #[test]
    fn unknown_tiles_block_projection() {
        assert!(TerrainKind::Unknown != TerrainKind::Floor);
        assert!(!TerrainKind::Unknown.blocks_projection());
        assert!(TerrainKind::Granite.blocks_projection());
        assert!(!TerrainKind::Glyph.blocks_projection());
    }
}
