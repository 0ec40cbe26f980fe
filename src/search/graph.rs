//! Weighted, direction-aware view of a graph as seen by the engines

use crate::geo::Coord;
use crate::graph::{EdgeId, EdgeRef, Graph, NodeId};
use crate::weighting::Weighting;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    #[inline]
    pub fn is_backward(self) -> bool {
        self == Direction::Backward
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// An edge as seen from `base` during a search in a given direction.
///
/// In a backward search the real travel direction is `adj -> base` and
/// `weight` is the cost of that real traversal. `orig_base` / `orig_adj` are
/// the stored edges touching `base` / `adj`; they differ from `edge` only
/// for shortcuts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchEdge {
    pub edge: EdgeId,
    pub base: NodeId,
    pub adj: NodeId,
    pub weight: f64,
    pub orig_base: EdgeId,
    pub orig_adj: EdgeId,
    /// Orientation-aware key, unique per traversal direction
    pub key: u64,
    pub shortcut: bool,
}

impl SearchEdge {
    pub fn from_ref(e: &EdgeRef, weight: f64) -> Self {
        Self {
            edge: e.edge,
            base: e.base,
            adj: e.adj,
            weight,
            orig_base: e.edge,
            orig_adj: e.edge,
            key: e.key(),
            shortcut: false,
        }
    }
}

pub trait SearchGraph {
    fn node_count(&self) -> usize;

    fn coordinate(&self, node: NodeId) -> Coord;

    fn is_virtual_node(&self, node: NodeId) -> bool;

    /// Edges leaving `node` (forward) or arriving at it (backward).
    fn edges(&self, node: NodeId, dir: Direction) -> impl Iterator<Item = SearchEdge> + '_;

    /// Turn cost between two stored (or virtual) edges at `via`.
    fn turn_weight(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> f64;

    fn turn_millis(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> u64;

    fn has_turn_costs(&self) -> bool;

    fn weighting_name(&self) -> &str;

    fn min_weight_per_distance(&self) -> f64;

    /// Append the stored edges `edge` stands for, in travel order, ending at `end_node`.
    fn expand_edge(&self, edge: EdgeId, end_node: NodeId, out: &mut Vec<EdgeRef>);

    /// Travel time of an edge state traversed `base -> adj`
    fn edge_millis(&self, edge: &EdgeRef) -> u64;
}

/// A [`Graph`] combined with a [`Weighting`].
pub struct WeightedGraph<'a, G, W: ?Sized> {
    graph: &'a G,
    weighting: &'a W,
}

impl<'a, G: Graph, W: Weighting + ?Sized> WeightedGraph<'a, G, W> {
    pub fn new(graph: &'a G, weighting: &'a W) -> Self {
        Self { graph, weighting }
    }

    pub fn graph(&self) -> &'a G {
        self.graph
    }

    pub fn weighting(&self) -> &'a W {
        self.weighting
    }
}

impl<G: Graph, W: Weighting + ?Sized> SearchGraph for WeightedGraph<'_, G, W> {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn coordinate(&self, node: NodeId) -> Coord {
        self.graph.coordinate(node)
    }

    fn is_virtual_node(&self, node: NodeId) -> bool {
        self.graph.is_virtual_node(node)
    }

    fn edges(&self, node: NodeId, dir: Direction) -> impl Iterator<Item = SearchEdge> + '_ {
        let reverse = dir.is_backward();
        self.graph
            .edges_from(node)
            .map(move |e| SearchEdge::from_ref(&e, self.weighting.edge_weight(&e, reverse)))
    }

    fn turn_weight(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> f64 {
        self.graph.turn_weight(self.weighting, in_edge, via, out_edge)
    }

    fn turn_millis(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> u64 {
        self.graph.turn_millis(self.weighting, in_edge, via, out_edge)
    }

    fn has_turn_costs(&self) -> bool {
        self.weighting.has_turn_costs()
    }

    fn weighting_name(&self) -> &str {
        self.weighting.name()
    }

    fn min_weight_per_distance(&self) -> f64 {
        self.weighting.min_weight_per_distance()
    }

    fn expand_edge(&self, edge: EdgeId, end_node: NodeId, out: &mut Vec<EdgeRef>) {
        match self.graph.edge_state(edge, end_node) {
            Some(e) => out.push(e),
            None => panic!("edge {edge} does not end at node {end_node}"),
        }
    }

    fn edge_millis(&self, edge: &EdgeRef) -> u64 {
        self.weighting.edge_millis(edge, false)
    }
}
