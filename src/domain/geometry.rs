/// Pixel-space geometry: points and axis-aligned rectangles.
///
/// All world positions are in pixels. Tiles are `TILE_W` x `TILE_H`.

pub const TILE_W: f32 = 32.0;
pub const TILE_H: f32 = 32.0;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }
}

/// Axis-aligned rectangle. `(left, top)` is the upper-left corner.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Rect { left, top, width, height }
    }

    /// Rectangle of the given size whose bottom-centre sits at `anchor`.
    pub fn from_bottom_center(anchor: Vec2, width: f32, height: f32) -> Self {
        Rect::new(anchor.x - width / 2.0, anchor.y - height, width, height)
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    #[inline]
    pub fn bottom_center(&self) -> Vec2 {
        Vec2::new(self.left + self.width / 2.0, self.bottom())
    }

    /// Strict overlap; touching edges do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right()
            && other.left < self.right()
            && self.top < other.bottom()
            && other.top < self.bottom()
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.left && p.x < self.right() && p.y >= self.top && p.y < self.bottom()
    }

    /// Signed penetration of `self` into `other`.
    ///
    /// Adding the result to `self`'s position separates the two rectangles.
    /// Returns zero when they do not overlap.
    pub fn intersection_depth(&self, other: &Rect) -> Vec2 {
        let half_w_a = self.width / 2.0;
        let half_h_a = self.height / 2.0;
        let half_w_b = other.width / 2.0;
        let half_h_b = other.height / 2.0;

        let ca = self.center();
        let cb = other.center();

        let dist_x = ca.x - cb.x;
        let dist_y = ca.y - cb.y;
        let min_x = half_w_a + half_w_b;
        let min_y = half_h_a + half_h_b;

        if dist_x.abs() >= min_x || dist_y.abs() >= min_y {
            return Vec2::ZERO;
        }

        let depth_x = if dist_x > 0.0 { min_x - dist_x } else { -min_x - dist_x };
        let depth_y = if dist_y > 0.0 { min_y - dist_y } else { -min_y - dist_y };
        Vec2::new(depth_x, depth_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_edges() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.right(), 40.0);
        assert_eq!(r.bottom(), 60.0);
        assert_eq!(r.center(), Vec2::new(25.0, 40.0));
        assert_eq!(r.bottom_center(), Vec2::new(25.0, 60.0));
    }

    #[test]
    fn bottom_center_anchor_roundtrip() {
        let r = Rect::from_bottom_center(Vec2::new(100.0, 200.0), 64.0, 96.0);
        assert_eq!(r.left, 68.0);
        assert_eq!(r.top, 104.0);
        assert_eq!(r.bottom_center(), Vec2::new(100.0, 200.0));
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 32.0, 32.0);
        let b = Rect::new(32.0, 0.0, 32.0, 32.0);
        assert!(!a.intersects(&b));
        assert_eq!(a.intersection_depth(&b), Vec2::ZERO);
    }

    #[test]
    fn depth_pushes_out_of_tile_below() {
        // Player sinks 4px into a floor tile
        let player = Rect::new(0.0, 4.0, 32.0, 32.0);
        let floor = Rect::new(0.0, 32.0, 32.0, 32.0);
        let d = player.intersection_depth(&floor);
        assert_eq!(d.y, -4.0);
        assert_eq!(d.x, -32.0);
    }

    #[test]
    fn depth_pushes_right_out_of_wall() {
        let player = Rect::new(30.0, 0.0, 32.0, 32.0);
        let wall = Rect::new(0.0, 0.0, 32.0, 32.0);
        let d = player.intersection_depth(&wall);
        assert_eq!(d.x, 2.0);
    }

    #[test]
    fn contains_point_is_half_open() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains_point(Vec2::new(0.0, 0.0)));
        assert!(!r.contains_point(Vec2::new(10.0, 5.0)));
    }
}
