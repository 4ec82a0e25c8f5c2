/// The static tile grid of a level.
///
/// Out-of-range lookups follow platformer conventions: the left and right
/// edges are walls, while above the top and below the bottom is open air
/// so the player can jump past the top row and fall out of the level.

use super::geometry::{Rect, TILE_H, TILE_W};
use super::tile::{Tile, TileCollision};

#[derive(Clone, Debug, Default)]
pub struct TileGrid {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn new(width: usize, height: usize) -> Self {
        TileGrid { width, height, tiles: vec![Tile::EMPTY; width * height] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_height(&self) -> f32 {
        self.height as f32 * TILE_H
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Tile> {
        if x < self.width && y < self.height {
            Some(self.tiles[y * self.width + x])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: usize, y: usize, tile: Tile) {
        if x < self.width && y < self.height {
            self.tiles[y * self.width + x] = tile;
        }
    }

    /// Collision kind at a signed tile index.
    pub fn collision_at(&self, x: i32, y: i32) -> TileCollision {
        if x < 0 || x >= self.width as i32 {
            return TileCollision::Impassable;
        }
        if y < 0 || y >= self.height as i32 {
            return TileCollision::Passable;
        }
        self.tiles[y as usize * self.width + x as usize].collision
    }

    /// Pixel rectangle covered by tile `(x, y)`.
    pub fn tile_bounds(x: i32, y: i32) -> Rect {
        Rect::new(x as f32 * TILE_W, y as f32 * TILE_H, TILE_W, TILE_H)
    }
}

/// Tile column containing pixel `x`.
#[inline]
pub fn tile_col(x: f32) -> i32 {
    (x / TILE_W).floor() as i32
}

/// Tile row containing pixel `y`.
#[inline]
pub fn tile_row(y: f32) -> i32 {
    (y / TILE_H).floor() as i32
}
