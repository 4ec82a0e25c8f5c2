/// Entities: Player, Enemy, Gem, Bullet.
///
/// Positions are in pixels. Player and Enemy positions are the
/// bottom-centre of their sprite; each entity derives its own bounds.

use super::geometry::{Rect, Vec2, TILE_H, TILE_W};

pub const ACTOR_W: f32 = 64.0;
pub const ACTOR_H: f32 = 96.0;

pub const GEM_SIZE: f32 = 24.0;
pub const GEM_VALUE: u32 = 30;

/// Player skins: 0 and 1 fire pellets, the last one fires bolts.
pub const SKIN_COUNT: u8 = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub fn flipped(self) -> Facing {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }
}

/// Frame input: continuous movement and jump, plus edge-triggered actions.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub movement: Option<Facing>,
    pub jump: bool,
    pub fire: bool,
    pub change_skin: bool,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub position: Vec2,
    pub velocity: Vec2,
    pub alive: bool,
    pub on_ground: bool,
    pub reached_exit: bool,
    /// Horizontal input this tick: -1, 0 or 1.
    pub direction: f32,
    /// Last non-zero movement direction; bullets travel this way.
    pub facing: Facing,
    pub is_jumping: bool,
    pub was_jumping: bool,
    pub jump_time: f32,
    pub previous_bottom: f32,
    pub skin: u8,
}

impl Player {
    pub fn new(position: Vec2) -> Self {
        Player {
            position,
            velocity: Vec2::ZERO,
            alive: true,
            on_ground: false,
            reached_exit: false,
            direction: 0.0,
            facing: Facing::Right,
            is_jumping: false,
            was_jumping: false,
            jump_time: 0.0,
            previous_bottom: position.y,
            skin: 0,
        }
    }

    /// Put the player back at `position` with fresh motion state. Skin is kept.
    pub fn reset(&mut self, position: Vec2) {
        let skin = self.skin;
        *self = Player::new(position);
        self.skin = skin;
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_bottom_center(self.position, ACTOR_W, ACTOR_H)
    }
}

/// Enemy patrol state.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Patrol {
    Walking,
    /// Seconds left before turning around.
    Waiting(f32),
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub position: Vec2,
    pub facing: Facing,
    pub patrol: Patrol,
    /// Spawn marker letter, selects the sprite.
    pub kind: char,
}

impl Enemy {
    /// New enemies start walking right.
    pub fn new(position: Vec2, kind: char) -> Self {
        Enemy { position, facing: Facing::Right, patrol: Patrol::Walking, kind }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_bottom_center(self.position, ACTOR_W, ACTOR_H)
    }
}

#[derive(Clone, Debug)]
pub struct Gem {
    /// Centre of the gem at rest.
    pub base: Vec2,
    /// Current centre, offset vertically by the bounce.
    pub position: Vec2,
    pub value: u32,
}

impl Gem {
    /// Gem resting in the centre of tile `(tx, ty)`.
    pub fn at_tile(tx: usize, ty: usize) -> Self {
        let base = Vec2::new(
            tx as f32 * TILE_W + TILE_W / 2.0,
            ty as f32 * TILE_H + TILE_H / 2.0,
        );
        Gem { base, position: base, value: GEM_VALUE }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.position.x - GEM_SIZE / 2.0,
            self.position.y - GEM_SIZE / 2.0,
            GEM_SIZE,
            GEM_SIZE,
        )
    }
}

/// Projectile shape, chosen by the player's skin when fired.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BulletKind {
    Pellet,
    Bolt,
}

impl BulletKind {
    pub fn for_skin(skin: u8) -> Self {
        if skin + 1 >= SKIN_COUNT { BulletKind::Bolt } else { BulletKind::Pellet }
    }

    pub fn width(self) -> f32 {
        match self {
            BulletKind::Pellet => 16.0,
            BulletKind::Bolt => 32.0,
        }
    }

    /// Pixels travelled per tick.
    pub fn speed(self) -> f32 {
        match self {
            BulletKind::Pellet => 8.0,
            BulletKind::Bolt => 16.0,
        }
    }
}

pub const BULLET_H: f32 = 16.0;

#[derive(Clone, Debug)]
pub struct Bullet {
    /// Bottom-centre of the bullet.
    pub position: Vec2,
    pub facing: Facing,
    pub kind: BulletKind,
}

impl Bullet {
    /// Spawn a bullet just ahead of a player standing at `origin`.
    pub fn fired_from(origin: Vec2, facing: Facing, kind: BulletKind) -> Self {
        Bullet {
            position: Vec2::new(origin.x + facing.sign() * TILE_W, origin.y - 42.0),
            facing,
            kind,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_bottom_center(self.position, self.kind.width(), BULLET_H)
    }
}
