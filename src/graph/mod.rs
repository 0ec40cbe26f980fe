//! Read-only graph access used by every search engine
//!
//! Node and edge ids are dense `u32`s. An edge is stored once and can be
//! traversed in either direction; an [`EdgeRef`] is a view of one stored edge
//! oriented from `base` to `adj`.

mod base;
pub mod ch;

pub use base::{BaseGraph, BaseGraphBuilder, EdgeSpec};

use serde::{Deserialize, Serialize};

use crate::geo::Coord;
use crate::weighting::Weighting;

pub type NodeId = u32;
pub type EdgeId = u32;

pub const NO_NODE: NodeId = NodeId::MAX;
pub const NO_EDGE: EdgeId = EdgeId::MAX;

/// Direction-dependent edge attributes, stored in base->adj orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeAttrs {
    pub fwd_access: bool,
    pub bwd_access: bool,
    pub fwd_speed_kmh: f64,
    pub bwd_speed_kmh: f64,
}

impl EdgeAttrs {
    pub fn both_ways(speed_kmh: f64) -> Self {
        Self {
            fwd_access: true,
            bwd_access: true,
            fwd_speed_kmh: speed_kmh,
            bwd_speed_kmh: speed_kmh,
        }
    }

    pub fn oneway(speed_kmh: f64) -> Self {
        Self {
            fwd_access: true,
            bwd_access: false,
            fwd_speed_kmh: speed_kmh,
            bwd_speed_kmh: 0.0,
        }
    }

    /// Same attributes seen from the other end
    pub fn reversed(self) -> Self {
        Self {
            fwd_access: self.bwd_access,
            bwd_access: self.fwd_access,
            fwd_speed_kmh: self.bwd_speed_kmh,
            bwd_speed_kmh: self.fwd_speed_kmh,
        }
    }

    #[inline]
    pub fn access(&self, reverse: bool) -> bool {
        if reverse {
            self.bwd_access
        } else {
            self.fwd_access
        }
    }

    #[inline]
    pub fn speed_kmh(&self, reverse: bool) -> f64 {
        if reverse {
            self.bwd_speed_kmh
        } else {
            self.fwd_speed_kmh
        }
    }

    pub fn max_speed_kmh(&self) -> f64 {
        self.fwd_speed_kmh.max(self.bwd_speed_kmh)
    }
}

/// One stored edge, oriented `base -> adj`.
///
/// `reversed` is set when this orientation is the opposite of the storage
/// orientation; `attrs` are always given in the `base -> adj` orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeRef {
    pub edge: EdgeId,
    pub base: NodeId,
    pub adj: NodeId,
    pub distance: f64,
    pub attrs: EdgeAttrs,
    pub reversed: bool,
}

impl EdgeRef {
    /// Orientation-aware key: `edge * 2 + reversed`
    #[inline]
    pub fn key(&self) -> u64 {
        edge_key(self.edge, self.reversed)
    }

    /// Same edge, traversed the other way
    pub fn detach(self) -> Self {
        Self {
            edge: self.edge,
            base: self.adj,
            adj: self.base,
            distance: self.distance,
            attrs: self.attrs.reversed(),
            reversed: !self.reversed,
        }
    }
}

#[inline]
pub fn edge_key(edge: EdgeId, reversed: bool) -> u64 {
    ((edge as u64) << 1) | reversed as u64
}

/// Read access to a routable graph.
pub trait Graph {
    fn node_count(&self) -> usize;

    fn edge_count(&self) -> usize;

    /// Nodes of the underlying stored graph (excludes query-time nodes)
    fn base_node_count(&self) -> usize {
        self.node_count()
    }

    /// Edges of the underlying stored graph (excludes query-time edges)
    fn base_edge_count(&self) -> usize {
        self.edge_count()
    }

    /// First id handed out to query-time edges
    fn first_virtual_edge(&self) -> usize {
        self.edge_count()
    }

    /// All edges touching `node`, oriented away from it.
    fn edges_from(&self, node: NodeId) -> impl Iterator<Item = EdgeRef> + '_;

    /// Edge `edge` oriented so that it ends at `adj`.
    ///
    /// `NO_NODE` requests the storage orientation. Returns `None` if the
    /// edge does not exist or does not touch `adj`.
    fn edge_state(&self, edge: EdgeId, adj: NodeId) -> Option<EdgeRef>;

    fn coordinate(&self, node: NodeId) -> Coord;

    /// Full geometry of an edge state, tower nodes included, in `base -> adj` order.
    fn geometry(&self, edge: &EdgeRef) -> Vec<Coord>;

    /// Stored edge a (possibly query-time) edge was derived from
    fn original_edge(&self, edge: EdgeId) -> EdgeId {
        edge
    }

    fn is_virtual_node(&self, _node: NodeId) -> bool {
        false
    }

    fn is_virtual_edge(&self, _edge: EdgeId) -> bool {
        false
    }

    /// Turn cost from `in_edge` to `out_edge` at `via` under `weighting`.
    fn turn_weight<W: Weighting + ?Sized>(
        &self,
        weighting: &W,
        in_edge: EdgeId,
        via: NodeId,
        out_edge: EdgeId,
    ) -> f64 {
        weighting.turn_weight(in_edge, via, out_edge)
    }

    fn turn_millis<W: Weighting + ?Sized>(
        &self,
        weighting: &W,
        in_edge: EdgeId,
        via: NodeId,
        out_edge: EdgeId,
    ) -> u64 {
        weighting.turn_millis(in_edge, via, out_edge)
    }
}
