/// Tile types and their properties.
/// Collision semantics are centralized here; the loader and renderer
/// only map characters to and from `Tile`.

/// How a tile interacts with moving entities.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TileCollision {
    /// Entities move freely through this tile.
    #[default]
    Passable,
    /// Blocks movement from every side.
    Impassable,
    /// Only blocks an entity landing on it from above.
    Platform,
}

/// What the renderer draws for a tile. Purely cosmetic.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TileVisual {
    Exit,
    Platform,
    PlatformBlock,
    BlockA,
    BlockB,
    GroundTopLeft,
    GroundTop,
    GroundTopRight,
    GroundLeft,
    GroundFill,
    GroundRight,
    Checkpoint,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Tile {
    pub collision: TileCollision,
    pub visual: Option<TileVisual>,
}

impl Tile {
    pub const EMPTY: Tile = Tile { collision: TileCollision::Passable, visual: None };

    pub const fn new(collision: TileCollision, visual: Option<TileVisual>) -> Self {
        Tile { collision, visual }
    }

    pub const fn solid(visual: TileVisual) -> Self {
        Tile::new(TileCollision::Impassable, Some(visual))
    }

    pub const fn platform(visual: TileVisual) -> Self {
        Tile::new(TileCollision::Platform, Some(visual))
    }

    pub const fn decoration(visual: TileVisual) -> Self {
        Tile::new(TileCollision::Passable, Some(visual))
    }
}
