use std::collections::{HashMap, HashSet};

use crate::union_find::UnionFind;

/// A node of the [`LineGraph`]: one 2D line of one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineNode {
    /// Index of the view.
    pub view_id: usize,
    /// Index of the line within the view.
    pub line_id: usize,
}

/// Arena graph over line observations.
///
/// Nodes are addressed by dense integer ids in creation order, edges are undirected
/// "same 3D line" hypotheses.
#[derive(Debug, Clone, Default)]
pub struct LineGraph {
    nodes: Vec<LineNode>,
    index: HashMap<LineNode, usize>,
    edges: Vec<(usize, usize)>,
    edge_set: HashSet<(usize, usize)>,
}

impl LineGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the node for `(view_id, line_id)`, if it exists.
    pub fn find_node(&self, view_id: usize, line_id: usize) -> Option<usize> {
        self.index.get(&LineNode { view_id, line_id }).copied()
    }

    /// Id of the node for `(view_id, line_id)`, creating it if needed.
    pub fn find_or_create_node(&mut self, view_id: usize, line_id: usize) -> usize {
        let node = LineNode { view_id, line_id };
        if let Some(&id) = self.index.get(&node) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(node);
        self.index.insert(node, id);
        id
    }

    /// Add an undirected edge. Self loops and duplicates are ignored.
    ///
    /// # Panics
    ///
    /// Panics if `a` or `b` is not a node id of this graph.
    pub fn add_edge(&mut self, a: usize, b: usize) {
        assert!(
            a < self.nodes.len() && b < self.nodes.len(),
            "edge ({a}, {b}) references a node outside a graph of {} nodes",
            self.nodes.len()
        );
        if a == b {
            return;
        }
        let key = (a.min(b), a.max(b));
        if self.edge_set.insert(key) {
            self.edges.push(key);
        }
    }

    /// The node with id `id`.
    pub fn node(&self, id: usize) -> LineNode {
        self.nodes[id]
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> &[LineNode] {
        &self.nodes
    }

    /// All edges in insertion order, each as `(smaller id, larger id)`.
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Connected components as lists of nodes.
    ///
    /// Each component is sorted by `(view_id, line_id)` and components are ordered by their
    /// first node, so the output is independent of node creation and edge order.
    pub fn components(&self) -> Vec<Vec<LineNode>> {
        let mut uf = UnionFind::new(self.nodes.len());
        for &(a, b) in &self.edges {
            uf.union(a, b);
        }

        let mut components: Vec<Vec<LineNode>> = uf
            .groups()
            .into_iter()
            .map(|group| {
                let mut nodes: Vec<LineNode> = group.into_iter().map(|id| self.nodes[id]).collect();
                nodes.sort();
                nodes
            })
            .collect();
        components.sort_by_key(|c| c[0]);
        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_or_create() {
        let mut g = LineGraph::new();
        let a = g.find_or_create_node(0, 3);
        let b = g.find_or_create_node(1, 2);
        assert_ne!(a, b);
        assert_eq!(g.find_or_create_node(0, 3), a);
        assert_eq!(g.find_node(1, 2), Some(b));
        assert_eq!(g.find_node(2, 2), None);
        assert_eq!(g.num_nodes(), 2);
    }

    #[test]
    fn test_edges_deduplicated() {
        let mut g = LineGraph::new();
        let a = g.find_or_create_node(0, 0);
        let b = g.find_or_create_node(1, 0);
        g.add_edge(a, b);
        g.add_edge(b, a);
        g.add_edge(a, a);
        assert_eq!(g.num_edges(), 1);
    }

    #[test]
    #[should_panic]
    fn test_edge_to_unknown_node_panics() {
        let mut g = LineGraph::new();
        let a = g.find_or_create_node(0, 0);
        g.add_edge(a, 7);
    }

    #[test]
    fn test_components_sorted() {
        let mut g = LineGraph::new();
        let n3 = g.find_or_create_node(2, 0);
        let n1 = g.find_or_create_node(0, 1);
        let n2 = g.find_or_create_node(1, 5);
        g.find_or_create_node(0, 0);
        g.add_edge(n3, n1);
        g.add_edge(n2, n3);

        let comps = g.components();
        assert_eq!(comps.len(), 2);
        assert_eq!(
            comps[0],
            vec![LineNode {
                view_id: 0,
                line_id: 0
            }]
        );
        assert_eq!(
            comps[1],
            vec![
                LineNode {
                    view_id: 0,
                    line_id: 1
                },
                LineNode {
                    view_id: 1,
                    line_id: 5
                },
                LineNode {
                    view_id: 2,
                    line_id: 0
                },
            ]
        );
    }
}
