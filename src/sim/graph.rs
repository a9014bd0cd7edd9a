//! Navigation graph
//!
//! Undirected graph with A* bookkeeping stored on the nodes. Nodes are
//! addressed by index; neighbour lists never contain duplicates or self-loops.

use glam::Vec2;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub pos: Vec2,
    pub neighbours: Vec<usize>,
    /// Cost from the search start
    pub g: f32,
    /// Heuristic cost to the search goal
    pub h: f32,
    pub parent: Option<usize>,
}

impl GraphNode {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            neighbours: Vec::new(),
            g: 0.0,
            h: 0.0,
            parent: None,
        }
    }

    #[inline]
    pub fn f(&self) -> f32 {
        self.g + self.h
    }

    fn add_neighbour(&mut self, index: usize) {
        if !self.neighbours.contains(&index) {
            self.neighbours.push(index);
        }
    }

    fn reset_costs(&mut self) {
        self.g = 0.0;
        self.h = 0.0;
        self.parent = None;
    }
}

/// Default link range for [`Graph::add_node_with_edge_close_enough`]
pub const DEFAULT_LINK_RANGE: f32 = 100.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes at `positions` joined by `edges` (index pairs); bad indices are skipped
    pub fn from_nodes_and_edges(positions: &[Vec2], edges: &[(usize, usize)]) -> Self {
        let mut graph = Self {
            nodes: positions.iter().copied().map(GraphNode::new).collect(),
        };
        for &(a, b) in edges {
            if !graph.add_edge(a, b) {
                log::warn!("Skipping edge ({a}, {b}) in a graph of {} nodes", positions.len());
            }
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_node(&mut self, pos: Vec2) -> usize {
        self.nodes.push(GraphNode::new(pos));
        self.nodes.len() - 1
    }

    /// Link two nodes both ways. False when either index is out of range or a == b.
    pub fn add_edge(&mut self, a: usize, b: usize) -> bool {
        if a == b || a >= self.nodes.len() || b >= self.nodes.len() {
            return false;
        }
        self.nodes[a].add_neighbour(b);
        self.nodes[b].add_neighbour(a);
        true
    }

    /// Append a node linked to the previously added one
    pub fn add_node_with_edge_to_last(&mut self, pos: Vec2) -> usize {
        let index = self.add_node(pos);
        if index > 0 {
            self.add_edge(index - 1, index);
        }
        index
    }

    /// Append a node linked to every node within `range` (default 100)
    pub fn add_node_with_edge_close_enough(&mut self, pos: Vec2, range: Option<f32>) -> usize {
        let range = range.unwrap_or(DEFAULT_LINK_RANGE);
        let close: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.pos.distance(pos) <= range)
            .map(|(i, _)| i)
            .collect();
        let index = self.add_node(pos);
        for other in close {
            self.add_edge(other, index);
        }
        index
    }

    /// Remove a node and shift every later index down by one
    pub fn remove_node(&mut self, index: usize) -> Option<GraphNode> {
        if index >= self.nodes.len() {
            return None;
        }
        let removed = self.nodes.remove(index);
        for node in &mut self.nodes {
            node.neighbours.retain(|&n| n != index);
            for n in &mut node.neighbours {
                if *n > index {
                    *n -= 1;
                }
            }
            if let Some(parent) = node.parent {
                node.parent = match parent.cmp(&index) {
                    std::cmp::Ordering::Less => Some(parent),
                    std::cmp::Ordering::Equal => None,
                    std::cmp::Ordering::Greater => Some(parent - 1),
                };
            }
        }
        Some(removed)
    }

    pub fn reset_costs(&mut self) {
        for node in &mut self.nodes {
            node.reset_costs();
        }
    }

    pub fn are_linked(&self, a: usize, b: usize) -> bool {
        self.nodes
            .get(a)
            .is_some_and(|node| node.neighbours.contains(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Graph {
        let mut graph = Graph::new();
        for i in 0..n {
            graph.add_node_with_edge_to_last(Vec2::new(i as f32 * 10.0, 0.0));
        }
        graph
    }

    #[test]
    fn test_edges_are_symmetric_and_unique() {
        let mut graph = line(2);
        assert!(graph.add_edge(0, 1));
        assert!(graph.add_edge(1, 0));
        assert_eq!(graph.nodes[0].neighbours, vec![1]);
        assert_eq!(graph.nodes[1].neighbours, vec![0]);
    }

    #[test]
    fn test_rejects_self_loops_and_bad_indices() {
        let mut graph = line(2);
        assert!(!graph.add_edge(1, 1));
        assert!(!graph.add_edge(0, 7));
        assert!(graph.nodes.iter().all(|n| n.neighbours.len() == 1));
    }

    #[test]
    fn test_from_nodes_and_edges_skips_dangling() {
        let graph = Graph::from_nodes_and_edges(
            &[Vec2::ZERO, Vec2::X, Vec2::Y],
            &[(0, 1), (1, 2), (2, 9)],
        );
        assert!(graph.are_linked(0, 1));
        assert!(graph.are_linked(2, 1));
        assert!(!graph.are_linked(0, 2));
    }

    #[test]
    fn test_close_enough_uses_default_range() {
        let mut graph = Graph::new();
        graph.add_node(Vec2::ZERO);
        graph.add_node(Vec2::new(150.0, 0.0));
        let index = graph.add_node_with_edge_close_enough(Vec2::new(90.0, 0.0), None);
        assert!(graph.are_linked(index, 0));
        assert!(graph.are_linked(index, 1));

        let far = graph.add_node_with_edge_close_enough(Vec2::new(1000.0, 0.0), Some(5.0));
        assert!(graph.nodes[far].neighbours.is_empty());
    }

    #[test]
    fn test_remove_node_reindexes() {
        let mut graph = line(4);
        let removed = graph.remove_node(1).unwrap();
        assert_eq!(removed.pos, Vec2::new(10.0, 0.0));
        assert_eq!(graph.len(), 3);
        assert!(graph.nodes[0].neighbours.is_empty());
        // old 2 - old 3 is now 1 - 2
        assert!(graph.are_linked(1, 2));
        assert!(graph.remove_node(10).is_none());
    }

    #[test]
    fn test_reset_costs_clears_parent() {
        let mut graph = line(2);
        graph.nodes[1].g = 4.0;
        graph.nodes[1].h = 2.0;
        graph.nodes[1].parent = Some(0);
        graph.reset_costs();
        assert_eq!(graph.nodes[1].f(), 0.0);
        assert_eq!(graph.nodes[1].parent, None);
    }
}
