//! Contraction hierarchy storage (query side)
//!
//! Holds node levels and directed shortcuts produced by an external
//! contraction step. Shortcut ids continue after the base edge ids, so a CH
//! edge id below `base_edge_count` is a stored edge and anything in
//! `base_edge_count..edge_id_end()` is a shortcut. Query-time edges are
//! numbered from `edge_id_end()` on.
//!
//! Every shortcut is indexed at its lower endpoint:
//! - `from` lower: found by the forward search leaving `from`
//! - `to` lower: found by the backward search arriving at `to`
//! Loop shortcuts (`from == to`, edge-based hierarchies only) are in both.

use tracing::debug;

use super::{edge_key, EdgeId, EdgeRef, Graph, NodeId};
use crate::error::GraphError;
use crate::geo::Coord;
use crate::search::graph::{Direction, SearchEdge, SearchGraph};
use crate::weighting::Weighting;

/// Directed shortcut `from -> middle -> to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shortcut {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f64,
    pub middle: NodeId,
    /// CH edge `from -> middle`
    pub skip_first: EdgeId,
    /// CH edge `middle -> to`
    pub skip_second: EdgeId,
    /// First stored edge of the unpacked path (leaves `from`)
    pub orig_first: EdgeId,
    /// Last stored edge of the unpacked path (arrives at `to`)
    pub orig_last: EdgeId,
}

#[derive(Debug, Clone)]
pub struct ChStorage {
    levels: Vec<u32>,
    base_edge_count: usize,
    shortcuts: Vec<Shortcut>,
    out_offsets: Vec<u32>,
    out_up: Vec<u32>,
    in_offsets: Vec<u32>,
    in_up: Vec<u32>,
}

impl ChStorage {
    pub fn new(
        levels: Vec<u32>,
        base_edge_count: usize,
        shortcuts: Vec<Shortcut>,
    ) -> Result<Self, GraphError> {
        let n_nodes = levels.len();
        let edge_end = base_edge_count + shortcuts.len();

        for (index, sc) in shortcuts.iter().enumerate() {
            for node in [sc.from, sc.to, sc.middle] {
                if node as usize >= n_nodes {
                    return Err(GraphError::NodeOutOfBounds {
                        node,
                        count: n_nodes,
                    });
                }
            }
            for edge in [sc.skip_first, sc.skip_second] {
                if edge as usize >= edge_end {
                    return Err(GraphError::UnknownSkippedEdge { index, edge });
                }
            }
            if sc.from != sc.to && levels[sc.from as usize] == levels[sc.to as usize] {
                return Err(GraphError::ShortcutNotUpward {
                    index,
                    from: sc.from,
                    to: sc.to,
                });
            }
        }

        let mut out_lists: Vec<Vec<u32>> = vec![Vec::new(); n_nodes];
        let mut in_lists: Vec<Vec<u32>> = vec![Vec::new(); n_nodes];
        for (i, sc) in shortcuts.iter().enumerate() {
            let (lf, lt) = (levels[sc.from as usize], levels[sc.to as usize]);
            if lt >= lf {
                out_lists[sc.from as usize].push(i as u32);
            }
            if lf >= lt {
                in_lists[sc.to as usize].push(i as u32);
            }
        }
        let (out_offsets, out_up) = flatten(out_lists);
        let (in_offsets, in_up) = flatten(in_lists);

        debug!(
            nodes = n_nodes,
            shortcuts = shortcuts.len(),
            "loaded hierarchy"
        );

        Ok(Self {
            levels,
            base_edge_count,
            shortcuts,
            out_offsets,
            out_up,
            in_offsets,
            in_up,
        })
    }

    #[inline]
    pub fn level(&self, node: NodeId) -> u32 {
        self.levels[node as usize]
    }

    pub fn node_count(&self) -> usize {
        self.levels.len()
    }

    pub fn base_edge_count(&self) -> usize {
        self.base_edge_count
    }

    pub fn shortcut_count(&self) -> usize {
        self.shortcuts.len()
    }

    /// One past the highest CH edge id
    pub fn edge_id_end(&self) -> usize {
        self.base_edge_count + self.shortcuts.len()
    }

    #[inline]
    pub fn is_shortcut(&self, edge: EdgeId) -> bool {
        let e = edge as usize;
        e >= self.base_edge_count && e < self.edge_id_end()
    }

    pub fn shortcut(&self, edge: EdgeId) -> Option<&Shortcut> {
        if self.is_shortcut(edge) {
            Some(&self.shortcuts[edge as usize - self.base_edge_count])
        } else {
            None
        }
    }

    fn shortcut_id(&self, index: u32) -> EdgeId {
        (self.base_edge_count + index as usize) as EdgeId
    }

    /// Shortcuts leaving `node` towards higher levels (empty for query-time nodes)
    fn out_shortcuts(&self, node: NodeId) -> &[u32] {
        slice_at(&self.out_offsets, &self.out_up, node)
    }

    /// Shortcuts arriving at `node` from higher levels
    fn in_shortcuts(&self, node: NodeId) -> &[u32] {
        slice_at(&self.in_offsets, &self.in_up, node)
    }
}

fn flatten(lists: Vec<Vec<u32>>) -> (Vec<u32>, Vec<u32>) {
    let mut offsets = Vec::with_capacity(lists.len() + 1);
    let mut flat = Vec::new();
    offsets.push(0);
    for list in lists {
        flat.extend(list);
        offsets.push(flat.len() as u32);
    }
    (offsets, flat)
}

fn slice_at<'a>(offsets: &[u32], flat: &'a [u32], node: NodeId) -> &'a [u32] {
    let n = node as usize;
    if n + 1 >= offsets.len() {
        return &[];
    }
    &flat[offsets[n] as usize..offsets[n + 1] as usize]
}

/// Graph + weighting + hierarchy, searchable with the CH engines.
pub struct ChGraph<'a, G, W: ?Sized> {
    graph: &'a G,
    weighting: &'a W,
    storage: &'a ChStorage,
}

impl<'a, G: Graph, W: Weighting + ?Sized> ChGraph<'a, G, W> {
    /// `graph` may be a query overlay on top of the graph the hierarchy was built for.
    pub fn new(graph: &'a G, weighting: &'a W, storage: &'a ChStorage) -> Result<Self, GraphError> {
        if storage.node_count() != graph.base_node_count() {
            return Err(GraphError::LevelCountMismatch {
                expected: graph.base_node_count(),
                got: storage.node_count(),
            });
        }
        if storage.base_edge_count() != graph.base_edge_count() {
            return Err(GraphError::EdgeCountMismatch {
                expected: storage.base_edge_count(),
                got: graph.base_edge_count(),
            });
        }
        let has_virtual = graph.edge_count() > graph.base_edge_count();
        if has_virtual && graph.first_virtual_edge() < storage.edge_id_end() {
            return Err(GraphError::VirtualEdgeIdCollision {
                first_virtual: graph.first_virtual_edge(),
                shortcut_end: storage.edge_id_end(),
            });
        }
        Ok(Self {
            graph,
            weighting,
            storage,
        })
    }

    pub fn storage(&self) -> &'a ChStorage {
        self.storage
    }

    /// Level filter: only climb, except along shortcuts and query-time edges.
    #[inline]
    pub fn accepts(&self, e: &SearchEdge) -> bool {
        e.shortcut
            || self.graph.is_virtual_node(e.base)
            || self.graph.is_virtual_node(e.adj)
            || self.storage.level(e.base) <= self.storage.level(e.adj)
    }

    fn shortcut_edge(&self, node: NodeId, index: u32, dir: Direction) -> SearchEdge {
        let sc = &self.storage.shortcuts[index as usize];
        let id = self.storage.shortcut_id(index);
        let (adj, orig_base, orig_adj) = match dir {
            Direction::Forward => (sc.to, sc.orig_first, sc.orig_last),
            Direction::Backward => (sc.from, sc.orig_last, sc.orig_first),
        };
        SearchEdge {
            edge: id,
            base: node,
            adj,
            weight: sc.weight,
            orig_base,
            orig_adj,
            key: edge_key(id, false),
            shortcut: true,
        }
    }
}

impl<G: Graph, W: Weighting + ?Sized> SearchGraph for ChGraph<'_, G, W> {
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
        let shortcuts = match dir {
            Direction::Forward => self.storage.out_shortcuts(node),
            Direction::Backward => self.storage.in_shortcuts(node),
        };
        self.graph
            .edges_from(node)
            .map(move |e| SearchEdge::from_ref(&e, self.weighting.edge_weight(&e, reverse)))
            .chain(
                shortcuts
                    .iter()
                    .map(move |&i| self.shortcut_edge(node, i, dir)),
            )
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
        if let Some(sc) = self.storage.shortcut(edge) {
            debug_assert_eq!(sc.to, end_node);
            self.expand_edge(sc.skip_first, sc.middle, out);
            self.expand_edge(sc.skip_second, sc.to, out);
            return;
        }
        match self.graph.edge_state(edge, end_node) {
            Some(e) => out.push(e),
            None => {
                tracing::error!(edge, end_node, "unpack: edge does not touch node");
                panic!("edge {edge} does not end at node {end_node}");
            }
        }
    }

    fn edge_millis(&self, edge: &EdgeRef) -> u64 {
        self.weighting.edge_millis(edge, false)
    }
}
