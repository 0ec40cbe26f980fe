//! Read-only view of a graph with query-time nodes and edges on top
//!
//! Every snapped point that is not on a tower gets a virtual node. The edge
//! it lies on is cut into consecutive segments between its towers and the
//! virtual nodes, and each segment becomes one virtual edge that can be
//! traversed both ways. At the two towers of a cut edge the original edge is
//! hidden and replaced by the first and last segment. The base graph is
//! never modified.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tracing::debug;

use super::snap::{Snap, SnappedPosition};
use crate::geo::{plane_distance, Coord, DistanceCalc};
use crate::graph::{EdgeAttrs, EdgeId, EdgeRef, Graph, NodeId, NO_EDGE, NO_NODE};
use crate::weighting::Weighting;

#[derive(Debug, Clone)]
struct VirtualNode {
    coord: Coord,
    /// Segment towards the edge's base side, then towards its adj side
    segments: [usize; 2],
}

#[derive(Debug, Clone)]
struct VirtualEdge {
    original: EdgeId,
    base: NodeId,
    adj: NodeId,
    distance: f64,
    attrs: EdgeAttrs,
    geometry: Vec<Coord>,
}

/// Adjacency changes at a tower touching a cut edge
#[derive(Debug, Default, Clone)]
struct TowerChanges {
    added: Vec<usize>,
    removed: Vec<EdgeId>,
}

/// What a node id of a [`QueryGraph`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOrigin {
    Base(NodeId),
    /// Index of the virtual node, in creation order
    Virtual(usize),
}

/// What an edge id of a [`QueryGraph`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOrigin {
    /// Edge of the underlying graph (or a shortcut id, for hierarchies)
    Base(EdgeId),
    /// Index of the segment and the stored edge it was cut from
    Virtual { index: usize, original: EdgeId },
}

pub struct QueryGraph<'a, G> {
    base: &'a G,
    first_virtual_edge: usize,
    nodes: Vec<VirtualNode>,
    edges: Vec<VirtualEdge>,
    changes: FxHashMap<NodeId, TowerChanges>,
    snaps: Vec<Snap>,
}

impl<'a, G: Graph> QueryGraph<'a, G> {
    /// Build the overlay for `snaps`.
    ///
    /// Virtual edge ids start at `first_virtual_edge`, which must not
    /// collide with any id the base graph or its hierarchy uses.
    pub fn create(base: &'a G, mut snaps: Vec<Snap>, first_virtual_edge: usize) -> Self {
        let mut qg = Self {
            base,
            first_virtual_edge,
            nodes: Vec::new(),
            edges: Vec::new(),
            changes: FxHashMap::default(),
            snaps: Vec::new(),
        };

        let mut by_edge: BTreeMap<EdgeId, Vec<usize>> = BTreeMap::new();
        for (i, snap) in snaps.iter_mut().enumerate() {
            if snap.position == SnappedPosition::Tower {
                continue;
            }
            normalize_direction(base, snap);
            by_edge.entry(snap.closest_edge.edge).or_default().push(i);
        }

        for mut group in by_edge.into_values() {
            let edge = snaps[group[0]].closest_edge;
            let full = base.geometry(&edge);
            group.sort_by(|&a, &b| {
                let (sa, sb) = (&snaps[a], &snaps[b]);
                sa.way_index.cmp(&sb.way_index).then_with(|| {
                    plane_distance(sa.snapped_point, full[sa.way_index])
                        .total_cmp(&plane_distance(sb.snapped_point, full[sb.way_index]))
                })
            });
            qg.split_edge(&edge, &full, &group, &mut snaps);
        }

        debug!(
            snaps = snaps.len(),
            virtual_nodes = qg.nodes.len(),
            virtual_edges = qg.edges.len(),
            "created query graph"
        );
        qg.snaps = snaps;
        qg
    }

    /// Cut `edge` at the (sorted) snaps in `group`.
    fn split_edge(&mut self, edge: &EdgeRef, full: &[Coord], group: &[usize], snaps: &mut [Snap]) {
        let mut prev_point = full[0];
        let mut prev_way_index = 1;
        let mut prev_node = edge.base;
        let mut prev_virtual: Option<usize> = None;
        let mut first_segment = None;

        for &i in group {
            let snap = &snaps[i];
            if snap.snapped_point == prev_point {
                snaps[i].closest_node = prev_node;
                continue;
            }

            let mut points = vec![prev_point];
            points.extend_from_slice(&full[prev_way_index..=snap.way_index]);
            if snap.position != SnappedPosition::Pillar {
                points.push(snap.snapped_point);
            }

            let node = (self.base.node_count() + self.nodes.len()) as NodeId;
            let segment = self.add_segment(edge, prev_node, node, points);
            match prev_virtual {
                Some(v) => self.nodes[v].segments[1] = segment,
                None => first_segment = Some(segment),
            }

            prev_point = snap.snapped_point;
            prev_way_index = snap.way_index + 1;
            prev_node = node;
            prev_virtual = Some(self.nodes.len());
            self.nodes.push(VirtualNode {
                coord: snap.snapped_point,
                segments: [segment, usize::MAX],
            });
            snaps[i].closest_node = node;
        }

        let (Some(last_virtual), Some(first_segment)) = (prev_virtual, first_segment) else {
            return;
        };
        let mut points = vec![prev_point];
        points.extend_from_slice(&full[prev_way_index..]);
        let last_segment = self.add_segment(edge, prev_node, edge.adj, points);
        self.nodes[last_virtual].segments[1] = last_segment;

        for (tower, segment) in [(edge.base, first_segment), (edge.adj, last_segment)] {
            let changes = self.changes.entry(tower).or_default();
            changes.added.push(segment);
            if !changes.removed.contains(&edge.edge) {
                changes.removed.push(edge.edge);
            }
        }
    }

    fn add_segment(&mut self, edge: &EdgeRef, from: NodeId, to: NodeId, points: Vec<Coord>) -> usize {
        self.edges.push(VirtualEdge {
            original: edge.edge,
            base: from,
            adj: to,
            distance: DistanceCalc::Plane.polyline_length(&points),
            attrs: edge.attrs,
            geometry: points,
        });
        self.edges.len() - 1
    }

    pub fn base(&self) -> &'a G {
        self.base
    }

    /// Snaps in request order, with `closest_node` pointing at the node to
    /// route from or to.
    pub fn snaps(&self) -> &[Snap] {
        &self.snaps
    }

    /// Routing node of the `index`th query point
    pub fn closest_node(&self, index: usize) -> Option<NodeId> {
        self.snaps.get(index).map(|s| s.closest_node)
    }

    pub fn virtual_node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn virtual_edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn resolve_node(&self, node: NodeId) -> NodeOrigin {
        match self.virtual_node_index(node) {
            Some(v) => NodeOrigin::Virtual(v),
            None => NodeOrigin::Base(node),
        }
    }

    pub fn resolve_edge(&self, edge: EdgeId) -> EdgeOrigin {
        match self.virtual_edge_index(edge) {
            Some(index) => EdgeOrigin::Virtual {
                index,
                original: self.edges[index].original,
            },
            None => EdgeOrigin::Base(edge),
        }
    }

    #[inline]
    fn virtual_node_index(&self, node: NodeId) -> Option<usize> {
        let first = self.base.node_count();
        let n = node as usize;
        (node != NO_NODE && n >= first && n < first + self.nodes.len()).then(|| n - first)
    }

    #[inline]
    fn virtual_edge_index(&self, edge: EdgeId) -> Option<usize> {
        let e = edge as usize;
        (edge != NO_EDGE && e >= self.first_virtual_edge && e < self.first_virtual_edge + self.edges.len())
            .then(|| e - self.first_virtual_edge)
    }

    /// Segment `index` oriented away from `from`
    fn segment_from(&self, index: usize, from: NodeId) -> EdgeRef {
        let ve = &self.edges[index];
        let stored = EdgeRef {
            edge: (self.first_virtual_edge + index) as EdgeId,
            base: ve.base,
            adj: ve.adj,
            distance: ve.distance,
            attrs: ve.attrs,
            reversed: false,
        };
        if from == ve.base {
            stored
        } else {
            stored.detach()
        }
    }
}

/// Flip a snap's edge into canonical direction: lower tower id first, or for
/// a loop, the end with the lower pillar latitude first.
fn normalize_direction<G: Graph>(graph: &G, snap: &mut Snap) {
    let edge = snap.closest_edge;
    let full = graph.geometry(&edge);
    let n = full.len();
    let flip = if edge.base == edge.adj {
        n > 3 && full[1].lat > full[n - 2].lat
    } else {
        edge.base > edge.adj
    };
    if !flip {
        return;
    }
    snap.closest_edge = edge.detach();
    snap.way_index = match snap.position {
        SnappedPosition::Pillar => n - snap.way_index - 1,
        SnappedPosition::Edge => n - snap.way_index - 2,
        SnappedPosition::Tower => snap.way_index,
    };
}

impl<'a, G: Graph> Graph for QueryGraph<'a, G> {
    fn node_count(&self) -> usize {
        self.base.node_count() + self.nodes.len()
    }

    /// One past the highest edge id, virtual edges included
    fn edge_count(&self) -> usize {
        self.first_virtual_edge + self.edges.len()
    }

    fn base_node_count(&self) -> usize {
        self.base.base_node_count()
    }

    fn base_edge_count(&self) -> usize {
        self.base.base_edge_count()
    }

    fn first_virtual_edge(&self) -> usize {
        self.first_virtual_edge
    }

    fn edges_from(&self, node: NodeId) -> impl Iterator<Item = EdgeRef> + '_ {
        let edges: Box<dyn Iterator<Item = EdgeRef> + '_> = if let Some(v) = self.virtual_node_index(node) {
            Box::new(
                self.nodes[v]
                    .segments
                    .iter()
                    .map(move |&s| self.segment_from(s, node)),
            )
        } else if let Some(changes) = self.changes.get(&node) {
            Box::new(
                self.base
                    .edges_from(node)
                    .filter(move |e| !changes.removed.contains(&e.edge))
                    .chain(changes.added.iter().map(move |&s| self.segment_from(s, node))),
            )
        } else {
            Box::new(self.base.edges_from(node))
        };
        edges
    }

    fn edge_state(&self, edge: EdgeId, adj: NodeId) -> Option<EdgeRef> {
        let Some(index) = self.virtual_edge_index(edge) else {
            return self.base.edge_state(edge, adj);
        };
        let ve = &self.edges[index];
        if adj == NO_NODE || adj == ve.adj {
            Some(self.segment_from(index, ve.base))
        } else if adj == ve.base {
            Some(self.segment_from(index, ve.adj))
        } else {
            None
        }
    }

    fn coordinate(&self, node: NodeId) -> Coord {
        match self.virtual_node_index(node) {
            Some(v) => self.nodes[v].coord,
            None => self.base.coordinate(node),
        }
    }

    fn geometry(&self, edge: &EdgeRef) -> Vec<Coord> {
        let Some(index) = self.virtual_edge_index(edge.edge) else {
            return self.base.geometry(edge);
        };
        let mut points = self.edges[index].geometry.clone();
        if edge.reversed {
            points.reverse();
        }
        points
    }

    fn original_edge(&self, edge: EdgeId) -> EdgeId {
        match self.virtual_edge_index(edge) {
            Some(index) => self.edges[index].original,
            None => self.base.original_edge(edge),
        }
    }

    fn is_virtual_node(&self, node: NodeId) -> bool {
        self.virtual_node_index(node).is_some()
    }

    fn is_virtual_edge(&self, edge: EdgeId) -> bool {
        self.virtual_edge_index(edge).is_some()
    }

    fn turn_weight<W: Weighting + ?Sized>(
        &self,
        weighting: &W,
        in_edge: EdgeId,
        via: NodeId,
        out_edge: EdgeId,
    ) -> f64 {
        if self.is_virtual_node(via) {
            return if in_edge != NO_EDGE && in_edge == out_edge {
                f64::INFINITY
            } else {
                0.0
            };
        }
        self.base.turn_weight(
            weighting,
            self.original_edge(in_edge),
            via,
            self.original_edge(out_edge),
        )
    }

    fn turn_millis<W: Weighting + ?Sized>(
        &self,
        weighting: &W,
        in_edge: EdgeId,
        via: NodeId,
        out_edge: EdgeId,
    ) -> u64 {
        if self.is_virtual_node(via) {
            return 0;
        }
        self.base.turn_millis(
            weighting,
            self.original_edge(in_edge),
            via,
            self.original_edge(out_edge),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{BaseGraph, BaseGraphBuilder, EdgeSpec};

    /// 0 --- 1 with one pillar at lon 0.002, plus 1 --- 2
    fn graph() -> BaseGraph {
        let mut b = BaseGraphBuilder::new();
        b.add_node(Coord::new(0.0, 0.0)).unwrap();
        b.add_node(Coord::new(0.0, 0.004)).unwrap();
        b.add_node(Coord::new(0.0, 0.008)).unwrap();
        b.add_edge(
            EdgeSpec::new(0, 1, EdgeAttrs::oneway(50.0)).pillars(vec![Coord::new(0.0, 0.002)]),
        )
        .unwrap();
        b.add_edge(EdgeSpec::new(1, 2, EdgeAttrs::both_ways(50.0)))
            .unwrap();
        b.build()
    }

    fn edge_snap(g: &BaseGraph, edge: EdgeId, adj: NodeId, way_index: usize, lon: f64) -> Snap {
        Snap {
            query_point: Coord::new(0.0001, lon),
            closest_edge: g.edge_state(edge, adj).unwrap(),
            closest_node: NO_NODE,
            way_index,
            position: SnappedPosition::Edge,
            snapped_point: Coord::new(0.0, lon),
            query_distance: 11.0,
        }
    }

    #[test]
    fn test_single_snap_splits_edge() {
        let g = graph();
        let qg = QueryGraph::create(&g, vec![edge_snap(&g, 0, 1, 1, 0.003)], g.edge_count());

        assert_eq!(qg.virtual_node_count(), 1);
        assert_eq!(qg.virtual_edge_count(), 2);
        assert_eq!(qg.node_count(), 4);
        assert_eq!(qg.closest_node(0), Some(3));
        assert_eq!(qg.resolve_node(3), NodeOrigin::Virtual(0));
        assert_eq!(qg.resolve_edge(2), EdgeOrigin::Virtual { index: 0, original: 0 });
        assert_eq!(qg.resolve_edge(1), EdgeOrigin::Base(1));

        // towers see the segments instead of the original edge
        let from0: Vec<_> = qg.edges_from(0).map(|e| (e.edge, e.adj)).collect();
        assert_eq!(from0, vec![(2, 3)]);
        let mut from1: Vec<_> = qg.edges_from(1).map(|e| (e.edge, e.adj)).collect();
        from1.sort();
        assert_eq!(from1, vec![(1, 2), (3, 3)]);

        // first segment carries the pillar, the second ends at the tower
        let first = qg.edge_state(2, 3).unwrap();
        assert_eq!(qg.geometry(&first).len(), 3);
        let second = qg.edge_state(3, 1).unwrap();
        assert_eq!(qg.geometry(&second).len(), 2);
        let total = first.distance + second.distance;
        assert!((total - g.edge_state(0, 1).unwrap().distance).abs() < 1.0);

        // one-way access survives the cut
        let back = qg.edge_state(2, 0).unwrap();
        assert!(back.reversed);
        assert!(!back.attrs.access(false));
        assert_eq!(qg.original_edge(3), 0);
        assert_eq!(qg.original_edge(NO_EDGE), NO_EDGE);
    }

    #[test]
    fn test_reversed_snap_is_normalized() {
        let g = graph();
        // snapped on edge 0 seen from 1 towards 0: segment 0 of [1, pillar, 0]
        let snap = edge_snap(&g, 0, 0, 0, 0.003);
        assert_eq!(snap.closest_edge.base, 1);
        let qg = QueryGraph::create(&g, vec![snap], g.edge_count());

        assert_eq!(qg.snaps()[0].way_index, 1);
        assert!(!qg.snaps()[0].closest_edge.reversed);
        let first = qg.edge_state(2, 3).unwrap();
        assert_eq!(first.base, 0);
        assert_eq!(qg.geometry(&first).len(), 3);
    }

    #[test]
    fn test_multiple_snaps_are_ordered() {
        let g = graph();
        let snaps = vec![
            edge_snap(&g, 1, 2, 0, 0.007),
            edge_snap(&g, 1, 2, 0, 0.005),
            edge_snap(&g, 1, 2, 0, 0.005),
        ];
        let qg = QueryGraph::create(&g, snaps, g.edge_count());

        // identical points share one node
        assert_eq!(qg.virtual_node_count(), 2);
        assert_eq!(qg.closest_node(1), qg.closest_node(2));
        let near = qg.closest_node(1).unwrap();
        let far = qg.closest_node(0).unwrap();

        let from1: Vec<_> = qg.edges_from(1).filter(|e| qg.is_virtual_edge(e.edge)).map(|e| e.adj).collect();
        assert_eq!(from1, vec![near]);
        let mut from_near: Vec<_> = qg.edges_from(near).map(|e| e.adj).collect();
        from_near.sort();
        assert_eq!(from_near, vec![1, far]);
        let from2: Vec<_> = qg.edges_from(2).map(|e| e.adj).collect();
        assert_eq!(from2, vec![far]);
    }

    #[test]
    fn test_tower_snap_adds_nothing() {
        let g = graph();
        let snap = Snap {
            query_point: Coord::new(0.0, 0.004),
            closest_edge: g.edge_state(1, 2).unwrap(),
            closest_node: 1,
            way_index: 0,
            position: SnappedPosition::Tower,
            snapped_point: Coord::new(0.0, 0.004),
            query_distance: 0.0,
        };
        let qg = QueryGraph::create(&g, vec![snap], g.edge_count());
        assert_eq!(qg.virtual_node_count(), 0);
        assert_eq!(qg.node_count(), g.node_count());
        assert_eq!(qg.closest_node(0), Some(1));
        assert_eq!(qg.edges_from(1).count(), g.edges_from(1).count());
    }

    #[test]
    fn test_u_turn_at_virtual_node_is_forbidden() {
        let g = graph();
        let qg = QueryGraph::create(&g, vec![edge_snap(&g, 1, 2, 0, 0.006)], g.edge_count());
        let w = crate::weighting::ShortestWeighting::new();
        assert_eq!(qg.turn_weight(&w, 2, 3, 2), f64::INFINITY);
        assert_eq!(qg.turn_weight(&w, 2, 3, 3), 0.0);
        assert_eq!(qg.turn_weight(&w, NO_EDGE, 3, 2), 0.0);
    }
}
