//! Immutable CSR road graph
//!
//! Every stored edge appears in the adjacency of both endpoints (loops once),
//! oriented away from the node whose list it is in.

use tracing::debug;

use super::{EdgeAttrs, EdgeId, EdgeRef, Graph, NodeId, NO_NODE};
use crate::error::GraphError;
use crate::geo::{Coord, DistanceCalc};

#[derive(Debug, Clone)]
struct StoredEdge {
    base: NodeId,
    adj: NodeId,
    distance: f64,
    attrs: EdgeAttrs,
    /// Interior geometry points, base -> adj order
    pillars: Vec<Coord>,
}

/// Edge description passed to [`BaseGraphBuilder::add_edge`].
#[derive(Debug, Clone)]
pub struct EdgeSpec {
    pub from: NodeId,
    pub to: NodeId,
    pub attrs: EdgeAttrs,
    /// Length in meters; measured from the geometry when absent
    pub distance: Option<f64>,
    pub pillars: Vec<Coord>,
}

impl EdgeSpec {
    pub fn new(from: NodeId, to: NodeId, attrs: EdgeAttrs) -> Self {
        Self {
            from,
            to,
            attrs,
            distance: None,
            pillars: Vec::new(),
        }
    }

    pub fn distance(mut self, meters: f64) -> Self {
        self.distance = Some(meters);
        self
    }

    pub fn pillars(mut self, pillars: Vec<Coord>) -> Self {
        self.pillars = pillars;
        self
    }
}

#[derive(Debug, Default)]
pub struct BaseGraphBuilder {
    coords: Vec<Coord>,
    edges: Vec<StoredEdge>,
}

impl BaseGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            coords: Vec::with_capacity(nodes),
            edges: Vec::with_capacity(edges),
        }
    }

    pub fn add_node(&mut self, coord: Coord) -> Result<NodeId, GraphError> {
        if !coord.is_valid() {
            return Err(GraphError::InvalidCoordinate {
                lat: coord.lat,
                lon: coord.lon,
            });
        }
        self.coords.push(coord);
        Ok((self.coords.len() - 1) as NodeId)
    }

    /// Add an edge and return its id.
    ///
    /// A loop is listed once at its node and only traversed in storage
    /// orientation. A loop open only against that orientation is stored
    /// reversed.
    pub fn add_edge(&mut self, mut spec: EdgeSpec) -> Result<EdgeId, GraphError> {
        for node in [spec.from, spec.to] {
            if node as usize >= self.coords.len() {
                return Err(GraphError::NodeOutOfBounds {
                    node,
                    count: self.coords.len(),
                });
            }
        }

        if spec.from == spec.to && !spec.attrs.fwd_access && spec.attrs.bwd_access {
            spec.attrs = spec.attrs.reversed();
            spec.pillars.reverse();
        }

        let distance = match spec.distance {
            Some(d) => d,
            None => {
                let mut points = Vec::with_capacity(spec.pillars.len() + 2);
                points.push(self.coords[spec.from as usize]);
                points.extend_from_slice(&spec.pillars);
                points.push(self.coords[spec.to as usize]);
                DistanceCalc::Earth.polyline_length(&points)
            }
        };
        if !distance.is_finite() || distance < 0.0 {
            return Err(GraphError::InvalidDistance {
                from: spec.from,
                to: spec.to,
                distance,
            });
        }

        self.edges.push(StoredEdge {
            base: spec.from,
            adj: spec.to,
            distance,
            attrs: spec.attrs,
            pillars: spec.pillars,
        });
        Ok((self.edges.len() - 1) as EdgeId)
    }

    pub fn build(self) -> BaseGraph {
        let n_nodes = self.coords.len();

        let mut degree = vec![0u32; n_nodes + 1];
        for e in &self.edges {
            degree[e.base as usize] += 1;
            if e.base != e.adj {
                degree[e.adj as usize] += 1;
            }
        }

        let mut first_out = Vec::with_capacity(n_nodes + 1);
        let mut acc = 0u32;
        for d in degree.iter().take(n_nodes) {
            first_out.push(acc);
            acc += d;
        }
        first_out.push(acc);

        let mut fill = first_out.clone();
        let mut adjacency = vec![(0 as EdgeId, false); acc as usize];
        for (id, e) in self.edges.iter().enumerate() {
            let slot = &mut fill[e.base as usize];
            adjacency[*slot as usize] = (id as EdgeId, false);
            *slot += 1;
            if e.base != e.adj {
                let slot = &mut fill[e.adj as usize];
                adjacency[*slot as usize] = (id as EdgeId, true);
                *slot += 1;
            }
        }

        debug!(
            nodes = n_nodes,
            edges = self.edges.len(),
            "built base graph"
        );

        BaseGraph {
            coords: self.coords,
            edges: self.edges,
            first_out,
            adjacency,
        }
    }
}

/// Static road graph in CSR layout.
#[derive(Debug, Clone)]
pub struct BaseGraph {
    coords: Vec<Coord>,
    edges: Vec<StoredEdge>,
    first_out: Vec<u32>,
    adjacency: Vec<(EdgeId, bool)>,
}

impl BaseGraph {
    #[inline]
    fn edge_ref(&self, edge: EdgeId, reversed: bool) -> EdgeRef {
        let s = &self.edges[edge as usize];
        let r = EdgeRef {
            edge,
            base: s.base,
            adj: s.adj,
            distance: s.distance,
            attrs: s.attrs,
            reversed: false,
        };
        if reversed {
            r.detach()
        } else {
            r
        }
    }

    /// Highest speed found on any edge, in km/h
    pub fn max_speed_kmh(&self) -> f64 {
        self.edges
            .iter()
            .map(|e| e.attrs.max_speed_kmh())
            .fold(0.0, f64::max)
    }
}

impl Graph for BaseGraph {
    fn node_count(&self) -> usize {
        self.coords.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn edges_from(&self, node: NodeId) -> impl Iterator<Item = EdgeRef> + '_ {
        let start = self.first_out[node as usize] as usize;
        let end = self.first_out[node as usize + 1] as usize;
        self.adjacency[start..end]
            .iter()
            .map(move |&(edge, reversed)| self.edge_ref(edge, reversed))
    }

    fn edge_state(&self, edge: EdgeId, adj: NodeId) -> Option<EdgeRef> {
        let s = self.edges.get(edge as usize)?;
        if adj == NO_NODE || s.adj == adj {
            Some(self.edge_ref(edge, false))
        } else if s.base == adj {
            Some(self.edge_ref(edge, true))
        } else {
            None
        }
    }

    fn coordinate(&self, node: NodeId) -> Coord {
        self.coords[node as usize]
    }

    fn geometry(&self, edge: &EdgeRef) -> Vec<Coord> {
        let s = &self.edges[edge.edge as usize];
        let mut points = Vec::with_capacity(s.pillars.len() + 2);
        points.push(self.coords[s.base as usize]);
        points.extend_from_slice(&s.pillars);
        points.push(self.coords[s.adj as usize]);
        if edge.reversed {
            points.reverse();
        }
        points
    }
}
