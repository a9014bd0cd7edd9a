//! Cave boundaries
//!
//! A level's walkable space is the union of overlapping boundary circles.
//! Moving objects are softly pushed back inside after every integration step,
//! and the overlap structure doubles as the navigation graph.

use glam::Vec2;
use rand::Rng;

use super::circle::{Circle, Positioned};
use super::grid::PositionGrid;
use super::verlet::VerletBody;
use crate::consts::SNAP_SOFTENING;
use crate::{from_degrees, rotate_degrees, uniform};

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

/// One walkable circle
#[derive(Debug, Clone)]
pub struct Boundary {
    pub circle: Circle,
    /// Graph node assigned when the navigation graph is built
    pub node_index: Option<usize>,
    /// Jagged outline for rendering, relative to the centre
    pub outline: Vec<Vec2>,
}

impl Boundary {
    pub fn new<R: Rng + ?Sized>(pos: Vec2, radius: f32, jaggedness: f32, rng: &mut R) -> Self {
        let points = (radius / 3.0).ceil().max(3.0) as usize;
        let step = 360.0 / points as f32;
        let start = uniform(rng, 0.0, 360.0);
        let outline = (0..points)
            .map(|i| {
                let inset = 6.0 + uniform(rng, 0.0, jaggedness);
                from_degrees(radius - inset, start + step * i as f32)
            })
            .collect();

        Self {
            circle: Circle::new(pos, radius),
            node_index: None,
            outline,
        }
    }

    /// Shortest vector that brings `circle` fully inside this boundary.
    ///
    /// Zero when the circle is already inside or sits exactly on the centre.
    pub fn snap_inside_vector(&self, circle: &Circle) -> Vec2 {
        let displacement = circle.pos() - self.circle.pos();
        let distance = displacement.length();
        if distance == 0.0 {
            return Vec2::ZERO;
        }
        let magnitude = self.circle.radius() - circle.radius() - distance;
        if magnitude >= 0.0 {
            return Vec2::ZERO;
        }
        displacement / distance * magnitude
    }
}

impl Positioned for Boundary {
    fn circle(&self) -> &Circle {
        &self.circle
    }
}

/// Owns a level's boundaries and their grid
#[derive(Debug, Clone, Default)]
pub struct BoundaryHandler {
    boundaries: Vec<Boundary>,
    grid: PositionGrid,
}

impl BoundaryHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    pub fn get(&self, index: usize) -> Option<&Boundary> {
        self.boundaries.get(index)
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    pub fn add_boundary(&mut self, boundary: Boundary) {
        self.boundaries.push(boundary);
        self.rebuild_grid();
    }

    /// Add many boundaries with a single grid rebuild
    pub fn extend<I: IntoIterator<Item = Boundary>>(&mut self, boundaries: I) {
        self.boundaries.extend(boundaries);
        self.rebuild_grid();
    }

    fn rebuild_grid(&mut self) {
        self.grid
            .rebuild(self.boundaries.iter().map(|b| &b.circle).enumerate());
    }

    /// Indices of boundaries sharing a grid cell with `circle`
    pub fn nearby(&self, circle: &Circle) -> Vec<usize> {
        self.grid.query_nearby(circle, None)
    }

    /// Index of the boundary whose centre is closest to `pos` (first wins ties)
    pub fn closest(&self, pos: Vec2) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, boundary) in self.boundaries.iter().enumerate() {
            let d = boundary.pos().distance_squared(pos);
            if best.is_none_or(|(_, best_d)| d < best_d) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Push a moving object back towards the walkable area
    pub fn snap_inside<R: Rng + ?Sized>(
        &self,
        circle: &mut Circle,
        body: &mut VerletBody,
        rng: &mut R,
    ) {
        let mut nearby = self.nearby(circle);
        if nearby.is_empty() {
            // Moving too fast or spawned outside: fall back on memory, then on the closest
            body.previous_nearby_boundaries
                .retain(|&i| i < self.boundaries.len());
            if body.previous_nearby_boundaries.is_empty() {
                if let Some(closest) = self.closest(circle.pos()) {
                    body.previous_nearby_boundaries.push(closest);
                }
            }
            nearby = body.previous_nearby_boundaries.clone();
        } else {
            body.previous_nearby_boundaries = nearby.clone();
        }

        if nearby.is_empty() || self.is_within(circle, body.velocity, &nearby, rng) {
            return;
        }

        let snap = nearby
            .iter()
            .map(|&i| self.boundaries[i].snap_inside_vector(circle))
            .min_by(|a, b| a.length_squared().total_cmp(&b.length_squared()));
        if let Some(snap) = snap {
            circle.translate(snap * SNAP_SOFTENING);
        }
    }

    /// Probe points on the leading half of the object against the nearby set.
    ///
    /// Probes are unit offsets from the centre fanned ±90° around the heading,
    /// with a small random phase so thin wall slivers cannot hide between them.
    /// Every probe must lie within `boundary radius - object radius` of at
    /// least one nearby boundary centre.
    pub fn is_within<R: Rng + ?Sized>(
        &self,
        circle: &Circle,
        velocity: Vec2,
        nearby: &[usize],
        rng: &mut R,
    ) -> bool {
        let heading = velocity.normalize_or(Vec2::X);
        let probes = ((circle.radius() / 2.0) as usize).max(3);
        let step = 180.0 / (probes - 1) as f32;
        let start = rotate_degrees(heading, -90.0 + uniform(rng, -0.5, 0.5) * step);

        (0..probes).all(|i| {
            let point = circle.pos() + rotate_degrees(start, i as f32 * step);
            nearby.iter().filter_map(|&b| self.boundaries.get(b)).any(|boundary| {
                boundary.pos().distance(point) < boundary.radius() - circle.radius()
            })
        })
    }

    /// Circle touches at least one nearby boundary
    pub fn circle_touching(&self, circle: &Circle) -> bool {
        self.nearby(circle)
            .into_iter()
            .any(|i| self.boundaries[i].circle.is_colliding(circle))
    }

    /// Circle lies fully inside at least one nearby boundary
    pub fn circle_inside(&self, circle: &Circle) -> bool {
        self.nearby(circle)
            .into_iter()
            .any(|i| self.boundaries[i].circle.contains(circle))
    }

    /// Box covering every boundary
    pub fn bounding_box(&self) -> Option<Rect> {
        let first = self.boundaries.first()?;
        let mut rect = Rect {
            min: first.pos() - Vec2::splat(first.radius()),
            max: first.pos() + Vec2::splat(first.radius()),
        };
        for boundary in &self.boundaries[1..] {
            rect.min = rect.min.min(boundary.pos() - Vec2::splat(boundary.radius()));
            rect.max = rect.max.max(boundary.pos() + Vec2::splat(boundary.radius()));
        }
        Some(rect)
    }

    /// One node per boundary (insertion order) and an edge per overlapping pair
    pub fn generate_nodes_and_edges(&mut self) -> (Vec<Vec2>, Vec<(usize, usize)>) {
        let mut nodes = Vec::with_capacity(self.boundaries.len());
        for (i, boundary) in self.boundaries.iter_mut().enumerate() {
            boundary.node_index = Some(i);
            nodes.push(boundary.pos());
        }

        let edges = self
            .grid
            .iterate_pairs()
            .filter(|&(a, b)| {
                self.boundaries[a]
                    .circle
                    .is_colliding(&self.boundaries[b].circle)
            })
            .collect();

        (nodes, edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(42)
    }

    fn handler(circles: &[(Vec2, f32)]) -> BoundaryHandler {
        let mut rng = rng();
        let mut handler = BoundaryHandler::new();
        handler.extend(
            circles
                .iter()
                .map(|&(pos, r)| Boundary::new(pos, r, 6.0, &mut rng)),
        );
        handler
    }

    #[test]
    fn test_snap_vector_zero_when_contained() {
        let mut rng = rng();
        let boundary = Boundary::new(Vec2::ZERO, 50.0, 6.0, &mut rng);
        assert_eq!(
            boundary.snap_inside_vector(&Circle::new(Vec2::new(10.0, 0.0), 8.0)),
            Vec2::ZERO
        );
    }

    #[test]
    fn test_snap_vector_at_edge_is_own_radius() {
        let mut rng = rng();
        let boundary = Boundary::new(Vec2::ZERO, 50.0, 6.0, &mut rng);
        let v = boundary.snap_inside_vector(&Circle::new(Vec2::new(0.0, 50.0), 8.0));
        assert!((v.length() - 8.0).abs() < 1e-4);
        assert!(v.y < 0.0);
    }

    #[test]
    fn test_outline_stays_inside_radius() {
        let mut rng = rng();
        let boundary = Boundary::new(Vec2::new(5.0, 5.0), 90.0, 6.0, &mut rng);
        assert_eq!(boundary.outline.len(), 30);
        assert!(boundary.outline.iter().all(|p| p.length() <= 84.0 + 1e-3));
    }

    #[test]
    fn test_snap_pulls_escaping_object_back() {
        let handler = handler(&[(Vec2::ZERO, 50.0)]);
        let mut rng = rng();
        let mut circle = Circle::new(Vec2::new(55.0, 0.0), 8.0);
        let mut body = VerletBody::at(Vec2::new(50.0, 0.0));
        body.velocity = Vec2::new(5.0, 0.0);
        handler.snap_inside(&mut circle, &mut body, &mut rng);
        // snap vector is (-13, 0), softened by 0.3
        assert!((circle.pos().x - (55.0 - 13.0 * SNAP_SOFTENING)).abs() < 1e-4);
        assert_eq!(body.previous_nearby_boundaries, vec![0]);
    }

    #[test]
    fn test_snap_leaves_contained_object_alone() {
        let handler = handler(&[(Vec2::ZERO, 50.0)]);
        let mut rng = rng();
        let mut circle = Circle::new(Vec2::new(10.0, 3.0), 8.0);
        let mut body = VerletBody::at(circle.pos());
        handler.snap_inside(&mut circle, &mut body, &mut rng);
        assert_eq!(circle.pos(), Vec2::new(10.0, 3.0));
    }

    #[test]
    fn test_far_object_falls_back_to_closest() {
        let handler = handler(&[(Vec2::ZERO, 20.0), (Vec2::new(1000.0, 0.0), 20.0)]);
        let mut rng = rng();
        let mut circle = Circle::new(Vec2::new(700.0, 0.0), 4.0);
        let mut body = VerletBody::at(circle.pos());
        handler.snap_inside(&mut circle, &mut body, &mut rng);
        assert_eq!(body.previous_nearby_boundaries, vec![1]);
        assert!(circle.pos().x > 700.0);
    }

    #[test]
    fn test_far_object_prefers_remembered_boundaries() {
        let handler = handler(&[(Vec2::ZERO, 20.0), (Vec2::new(1000.0, 0.0), 20.0)]);
        let mut rng = rng();
        let mut circle = Circle::new(Vec2::new(700.0, 0.0), 4.0);
        let mut body = VerletBody::at(circle.pos());
        body.previous_nearby_boundaries = vec![0];
        handler.snap_inside(&mut circle, &mut body, &mut rng);
        assert_eq!(body.previous_nearby_boundaries, vec![0]);
        assert!(circle.pos().x < 700.0);
    }

    #[test]
    fn test_within_union_of_boundaries() {
        let handler = handler(&[(Vec2::ZERO, 30.0), (Vec2::new(40.0, 0.0), 30.0)]);
        let mut rng = rng();
        let inside = Circle::new(Vec2::new(20.0, 0.0), 5.0);
        let nearby = handler.nearby(&inside);
        assert_eq!(nearby.len(), 2);
        assert!(handler.is_within(&inside, Vec2::new(0.0, 1.0), &nearby, &mut rng));

        let escaping = Circle::new(Vec2::new(20.0, 28.0), 5.0);
        let nearby = handler.nearby(&escaping);
        assert!(!handler.is_within(&escaping, Vec2::new(0.0, 1.0), &nearby, &mut rng));
    }

    #[test]
    fn test_bounding_box_covers_all() {
        let handler = handler(&[(Vec2::ZERO, 10.0), (Vec2::new(100.0, -50.0), 20.0)]);
        let rect = handler.bounding_box().unwrap();
        assert_eq!(rect.min, Vec2::new(-10.0, -70.0));
        assert_eq!(rect.max, Vec2::new(120.0, 10.0));
        assert!(BoundaryHandler::new().bounding_box().is_none());
    }

    #[test]
    fn test_nodes_and_edges_follow_overlap() {
        let mut handler = handler(&[
            (Vec2::ZERO, 30.0),
            (Vec2::new(50.0, 0.0), 30.0),
            (Vec2::new(100.0, 0.0), 30.0),
            (Vec2::new(400.0, 0.0), 30.0),
        ]);
        let (nodes, edges) = handler.generate_nodes_and_edges();
        assert_eq!(nodes.len(), 4);
        assert_eq!(handler.boundaries()[3].node_index, Some(3));
        let mut canonical: Vec<_> = edges.iter().map(|&(a, b)| (a.min(b), a.max(b))).collect();
        canonical.sort();
        assert_eq!(canonical, vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_touching_and_inside() {
        let handler = handler(&[(Vec2::ZERO, 40.0)]);
        assert!(handler.circle_touching(&Circle::new(Vec2::new(45.0, 0.0), 8.0)));
        assert!(!handler.circle_inside(&Circle::new(Vec2::new(45.0, 0.0), 8.0)));
        assert!(handler.circle_inside(&Circle::new(Vec2::new(10.0, 0.0), 8.0)));
    }
}
