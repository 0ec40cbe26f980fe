//! Search result path

use serde::{Deserialize, Serialize};

use super::graph::SearchGraph;
use crate::geo::Coord;
use crate::graph::{EdgeId, EdgeRef, Graph, NodeId, NO_EDGE, NO_NODE};

/// Ordered list of stored edges from `from_node` to `end_node`.
///
/// `weight` is the search objective; `distance` and `time_millis` are
/// summed over the unpacked stored edges, turn times included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub found: bool,
    pub from_node: NodeId,
    pub end_node: NodeId,
    pub edges: Vec<EdgeId>,
    pub weight: f64,
    pub distance: f64,
    pub time_millis: u64,
}

impl Path {
    pub fn not_found(from: NodeId, to: NodeId) -> Self {
        Self {
            found: false,
            from_node: from,
            end_node: to,
            edges: Vec::new(),
            weight: f64::INFINITY,
            distance: 0.0,
            time_millis: 0,
        }
    }

    /// Source equals target
    pub fn zero_length(node: NodeId) -> Self {
        Self {
            found: true,
            from_node: node,
            end_node: node,
            edges: Vec::new(),
            weight: 0.0,
            distance: 0.0,
            time_millis: 0,
        }
    }

    /// Sum distance and time over `refs`, which must be in travel order.
    pub(crate) fn from_edge_refs<S: SearchGraph>(
        graph: &S,
        from: NodeId,
        to: NodeId,
        refs: &[EdgeRef],
        weight: f64,
    ) -> Self {
        let mut distance = 0.0;
        let mut time_millis = 0;
        let mut prev = NO_EDGE;
        for e in refs {
            distance += e.distance;
            time_millis += graph.edge_millis(e);
            if prev != NO_EDGE {
                time_millis += graph.turn_millis(prev, e.base, e.edge);
            }
            prev = e.edge;
        }

        Self {
            found: true,
            from_node: from,
            end_node: to,
            edges: refs.iter().map(|e| e.edge).collect(),
            weight,
            distance,
            time_millis,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Node sequence. `graph` must be the graph that was searched.
    pub fn calc_nodes<G: Graph>(&self, graph: &G) -> Vec<NodeId> {
        if !self.found {
            return Vec::new();
        }
        let mut nodes = Vec::with_capacity(self.edges.len() + 1);
        let mut current = self.from_node;
        nodes.push(current);
        for &edge in &self.edges {
            let Some(state) = graph.edge_state(edge, NO_NODE) else {
                panic!("path edge {edge} missing from graph");
            };
            current = if state.base == current {
                state.adj
            } else {
                state.base
            };
            nodes.push(current);
        }
        nodes
    }

    /// Full geometry with consecutive duplicates removed.
    pub fn calc_points<G: Graph>(&self, graph: &G) -> Vec<Coord> {
        if !self.found {
            return Vec::new();
        }
        let nodes = self.calc_nodes(graph);
        let mut points = vec![graph.coordinate(self.from_node)];
        for (i, &edge) in self.edges.iter().enumerate() {
            if let Some(state) = graph.edge_state(edge, nodes[i + 1]) {
                points.extend(graph.geometry(&state).into_iter().skip(1));
            }
        }
        points.dedup_by(|a, b| (a.lon - b.lon).abs() < 1e-9 && (a.lat - b.lat).abs() < 1e-9);
        points
    }
}
