//! A* pathfinding over the boundary graph
//!
//! Movers steer towards the first hop of the shortest path between the
//! boundary they stand on and the boundary the target stands on.
//! - g: summed Euclidean edge lengths
//! - h: straight-line distance to the goal node
//! - Open list ordered by f; equal f keeps insertion order
//! - Exhaustion or missing boundaries steer with a zero vector

use glam::Vec2;

use super::boundary::BoundaryHandler;
use super::circle::Circle;
use super::graph::Graph;

#[derive(Debug, Clone, Default)]
pub struct AStarPathfinder {
    pub graph: Graph,
}

impl AStarPathfinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the graph with freshly generated nodes and edges
    pub fn setup_graph(&mut self, nodes: &[Vec2], edges: &[(usize, usize)]) {
        self.graph = Graph::from_nodes_and_edges(nodes, edges);
        log::debug!(
            "Navigation graph: {} nodes, {} edges",
            self.graph.len(),
            self.graph.nodes.iter().map(|n| n.neighbours.len()).sum::<usize>() / 2
        );
    }

    /// Unit steering vector from `mover` towards `target_pos`
    pub fn pathfind(
        &mut self,
        boundaries: &BoundaryHandler,
        mover: &Circle,
        target_pos: Vec2,
        target_radius: f32,
    ) -> Vec2 {
        let target = Circle::new(target_pos, target_radius);
        let (Some(start), Some(goal)) = (
            current_node(boundaries, mover),
            current_node(boundaries, &target),
        ) else {
            return Vec2::ZERO;
        };

        if start == goal {
            return (target_pos - mover.pos()).normalize_or_zero();
        }

        let Some(path) = self.find_path(start, goal) else {
            return Vec2::ZERO;
        };
        path.get(1)
            .and_then(|&hop| self.graph.nodes.get(hop))
            .map(|node| (node.pos - mover.pos()).normalize_or_zero())
            .unwrap_or(Vec2::ZERO)
    }

    /// Node indices from `start` to `goal` inclusive
    pub fn find_path(&mut self, start: usize, goal: usize) -> Option<Vec<usize>> {
        let node_count = self.graph.len();
        if start >= node_count || goal >= node_count {
            return None;
        }
        if start == goal {
            return Some(vec![start]);
        }

        self.graph.reset_costs();
        let goal_pos = self.graph.nodes[goal].pos;
        let mut open: Vec<usize> = Vec::new();
        let mut in_open = vec![false; node_count];
        let mut closed = vec![false; node_count];

        self.graph.nodes[start].h = self.graph.nodes[start].pos.distance(goal_pos);
        open.push(start);
        in_open[start] = true;

        while !open.is_empty() {
            let current = open.remove(0);
            in_open[current] = false;
            if current == goal {
                return Some(self.retrace(start, goal));
            }
            closed[current] = true;

            let current_pos = self.graph.nodes[current].pos;
            let current_g = self.graph.nodes[current].g;
            let neighbours = self.graph.nodes[current].neighbours.clone();
            for neighbour in neighbours {
                if closed[neighbour] {
                    continue;
                }
                let node = &self.graph.nodes[neighbour];
                let g = current_g + current_pos.distance(node.pos);
                if in_open[neighbour] {
                    if g >= node.g {
                        continue;
                    }
                    // Found a cheaper route: drop the stale entry and reinsert
                    open.retain(|&n| n != neighbour);
                }

                let node = &mut self.graph.nodes[neighbour];
                node.g = g;
                node.h = node.pos.distance(goal_pos);
                node.parent = Some(current);
                let f = node.f();
                let at = open.partition_point(|&n| self.graph.nodes[n].f() <= f);
                open.insert(at, neighbour);
                in_open[neighbour] = true;
            }
        }

        None
    }

    fn retrace(&self, start: usize, goal: usize) -> Vec<usize> {
        let mut path = vec![goal];
        let mut cursor = goal;
        while cursor != start {
            match self.graph.nodes[cursor].parent {
                Some(parent) => {
                    path.push(parent);
                    cursor = parent;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }
}

/// Graph node of the boundary a circle stands on.
///
/// The closest colliding nearby boundary wins; a circle touching none uses the
/// globally closest boundary.
pub fn current_node(boundaries: &BoundaryHandler, circle: &Circle) -> Option<usize> {
    let touching = boundaries
        .nearby(circle)
        .into_iter()
        .filter_map(|i| boundaries.get(i).map(|b| (i, b)))
        .filter(|(_, b)| b.circle.is_colliding(circle))
        .min_by(|(_, a), (_, b)| {
            a.circle
                .pos()
                .distance_squared(circle.pos())
                .total_cmp(&b.circle.pos().distance_squared(circle.pos()))
        })
        .map(|(i, _)| i);

    let index = touching.or_else(|| boundaries.closest(circle.pos()))?;
    boundaries.get(index)?.node_index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::boundary::Boundary;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    /// Boundaries along a corridor: 0 - 1 - 2 - 3
    fn corridor() -> (BoundaryHandler, AStarPathfinder) {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut handler = BoundaryHandler::new();
        handler.extend((0..4).map(|i| {
            Boundary::new(Vec2::new(i as f32 * 60.0, 0.0), 40.0, 6.0, &mut rng)
        }));
        let (nodes, edges) = handler.generate_nodes_and_edges();
        let mut pathfinder = AStarPathfinder::new();
        pathfinder.setup_graph(&nodes, &edges);
        (handler, pathfinder)
    }

    #[test]
    fn test_same_node_steers_at_literal_target() {
        let (handler, mut pathfinder) = corridor();
        let mover = Circle::new(Vec2::new(-5.0, 0.0), 8.0);
        let v = pathfinder.pathfind(&handler, &mover, Vec2::new(-5.0, 10.0), 8.0);
        assert!((v - Vec2::new(0.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_coincident_target_gives_zero() {
        let (handler, mut pathfinder) = corridor();
        let mover = Circle::new(Vec2::new(3.0, 3.0), 8.0);
        assert_eq!(pathfinder.pathfind(&handler, &mover, Vec2::new(3.0, 3.0), 8.0), Vec2::ZERO);
    }

    #[test]
    fn test_steers_to_first_hop() {
        let (handler, mut pathfinder) = corridor();
        let mover = Circle::new(Vec2::new(0.0, 10.0), 8.0);
        let v = pathfinder.pathfind(&handler, &mover, Vec2::new(180.0, 0.0), 8.0);
        let expected = (Vec2::new(60.0, 0.0) - Vec2::new(0.0, 10.0)).normalize();
        assert!((v - expected).length() < 1e-5);
    }

    #[test]
    fn test_find_path_is_shortest() {
        let mut pathfinder = AStarPathfinder::new();
        // Square with a long detour: 0 -> 1 -> 3 is shorter than 0 -> 2 -> 3
        pathfinder.setup_graph(
            &[
                Vec2::ZERO,
                Vec2::new(10.0, 10.0),
                Vec2::new(0.0, 100.0),
                Vec2::new(20.0, 20.0),
            ],
            &[(0, 1), (1, 3), (0, 2), (2, 3)],
        );
        assert_eq!(pathfinder.find_path(0, 3), Some(vec![0, 1, 3]));
    }

    #[test]
    fn test_ties_resolve_by_insertion_order() {
        // Diamond: both routes to 3 cost the same
        let nodes = [
            Vec2::ZERO,
            Vec2::new(10.0, 10.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(20.0, 0.0),
        ];
        let mut first = AStarPathfinder::new();
        first.setup_graph(&nodes, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let mut swapped = AStarPathfinder::new();
        swapped.setup_graph(&nodes, &[(0, 2), (0, 1), (2, 3), (1, 3)]);

        for _ in 0..3 {
            assert_eq!(first.find_path(0, 3), Some(vec![0, 1, 3]));
            assert_eq!(swapped.find_path(0, 3), Some(vec![0, 2, 3]));
        }
    }

    #[test]
    fn test_disconnected_graph_holds_position() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut handler = BoundaryHandler::new();
        handler.extend([
            Boundary::new(Vec2::ZERO, 30.0, 6.0, &mut rng),
            Boundary::new(Vec2::new(500.0, 0.0), 30.0, 6.0, &mut rng),
        ]);
        let (nodes, edges) = handler.generate_nodes_and_edges();
        let mut pathfinder = AStarPathfinder::new();
        pathfinder.setup_graph(&nodes, &edges);

        let mover = Circle::new(Vec2::ZERO, 8.0);
        assert_eq!(pathfinder.find_path(0, 1), None);
        assert_eq!(pathfinder.pathfind(&handler, &mover, Vec2::new(500.0, 0.0), 8.0), Vec2::ZERO);
    }

    #[test]
    fn test_no_boundaries_holds_position() {
        let mut pathfinder = AStarPathfinder::new();
        let mover = Circle::new(Vec2::ZERO, 8.0);
        let v = pathfinder.pathfind(&BoundaryHandler::new(), &mover, Vec2::X, 8.0);
        assert_eq!(v, Vec2::ZERO);
    }
}
