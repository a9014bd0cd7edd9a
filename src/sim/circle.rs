//! Circle primitive and grid-cell keys
//!
//! Every collidable thing in a level (boundaries, creatures, items, props) is a
//! circle. A circle caches the grid cells its bounding box covers; the cache is
//! refreshed whenever the circle moves or changes size so grid rebuilds never
//! recompute it.

use glam::Vec2;

use crate::consts::GRID_SIZE;

/// Integer grid coordinate: (floor(x / GRID_SIZE), floor(y / GRID_SIZE))
pub type CellKey = (i32, i32);

/// Cell containing a point
#[inline]
pub fn cell_key(p: Vec2) -> CellKey {
    (
        (p.x / GRID_SIZE).floor() as i32,
        (p.y / GRID_SIZE).floor() as i32,
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pos: Vec2,
    radius: f32,
    cells: Vec<CellKey>,
}

impl Circle {
    pub fn new(pos: Vec2, radius: f32) -> Self {
        let mut circle = Self {
            pos,
            radius,
            cells: Vec::new(),
        };
        circle.refresh_cells();
        circle
    }

    #[inline]
    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Grid cells covered by the bounding box, row by row
    #[inline]
    pub fn cells(&self) -> &[CellKey] {
        &self.cells
    }

    pub fn set_pos(&mut self, pos: Vec2) {
        self.pos = pos;
        self.refresh_cells();
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.set_pos(self.pos + delta);
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
        self.refresh_cells();
    }

    fn refresh_cells(&mut self) {
        self.cells.clear();
        let min = self.pos - Vec2::splat(self.radius);
        let max = self.pos + Vec2::splat(self.radius);
        let (x0, y0) = (
            (min.x / GRID_SIZE).floor() as i32,
            (min.y / GRID_SIZE).floor() as i32,
        );
        let (x1, y1) = (
            (max.x / GRID_SIZE).ceil() as i32,
            (max.y / GRID_SIZE).ceil() as i32,
        );
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.cells.push((x, y));
            }
        }
    }

    /// Vector by which `other` would have to move to stop overlapping this circle.
    ///
    /// Zero when the circles do not overlap or share a centre.
    pub fn overlap_vector(&self, other: &Circle) -> Vec2 {
        let displacement = other.pos - self.pos;
        let distance = displacement.length();
        if distance == 0.0 || distance >= self.radius + other.radius {
            return Vec2::ZERO;
        }
        displacement / distance * (self.radius + other.radius) - displacement
    }

    /// Circles touch (strictly overlapping)
    #[inline]
    pub fn is_colliding(&self, other: &Circle) -> bool {
        self.pos.distance(other.pos) < self.radius + other.radius
    }

    /// `other` lies entirely inside this circle
    #[inline]
    pub fn contains(&self, other: &Circle) -> bool {
        self.pos.distance(other.pos) < self.radius - other.radius
    }
}

/// Anything backed by a circle
pub trait Positioned {
    fn circle(&self) -> &Circle;

    fn pos(&self) -> Vec2 {
        self.circle().pos()
    }

    fn radius(&self) -> f32 {
        self.circle().radius()
    }
}

impl Positioned for Circle {
    fn circle(&self) -> &Circle {
        self
    }
}
