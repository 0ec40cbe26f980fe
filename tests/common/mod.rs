//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::collections::HashMap;

use butterfly_search::geo::Coord;
use butterfly_search::graph::ch::{ChStorage, Shortcut};
use butterfly_search::graph::{BaseGraph, BaseGraphBuilder, EdgeAttrs, EdgeId, EdgeSpec, Graph, NodeId, NO_NODE};
use butterfly_search::weighting::Weighting;
use rand::prelude::*;
use rand::rngs::StdRng;

pub const A: NodeId = 0;
pub const B: NodeId = 1;
pub const C: NodeId = 2;
pub const D: NodeId = 3;

/// Edges of the square, in insertion order
pub const AB: EdgeId = 0;
pub const BC: EdgeId = 1;
pub const AD: EdgeId = 2;
pub const DC: EdgeId = 3;

/// How the square's streets may be travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Square {
    /// Every street both ways
    Open,
    /// A-B only from B to A
    BToAOnly,
    /// A-B only from B to A and D-C only from C to D
    BothClosed,
}

/// A -1- B -1- C plus A -5- D -1- C, coordinates tiny enough that beeline
/// estimates stay below the configured distances.
pub fn square(kind: Square) -> BaseGraph {
    let mut b = BaseGraphBuilder::new();
    b.add_node(Coord::new(0.0, 0.0)).expect("A");
    b.add_node(Coord::new(0.0, 0.000001)).expect("B");
    b.add_node(Coord::new(-0.000001, 0.000001)).expect("C");
    b.add_node(Coord::new(-0.000001, 0.0)).expect("D");

    let open = EdgeAttrs::both_ways(50.0);
    let ab = match kind {
        Square::Open => EdgeSpec::new(A, B, open),
        _ => EdgeSpec::new(B, A, EdgeAttrs::oneway(50.0)),
    };
    let dc = match kind {
        Square::BothClosed => EdgeSpec::new(C, D, EdgeAttrs::oneway(50.0)),
        _ => EdgeSpec::new(D, C, open),
    };
    b.add_edge(ab.distance(1.0)).expect("AB");
    b.add_edge(EdgeSpec::new(B, C, open).distance(1.0)).expect("BC");
    b.add_edge(EdgeSpec::new(A, D, open).distance(5.0)).expect("AD");
    b.add_edge(dc.distance(1.0)).expect("DC");
    b.build()
}

/// Seeded random permutation of all nodes, used as contraction order.
pub fn random_order(n_nodes: usize, seed: u64) -> Vec<NodeId> {
    let mut order: Vec<NodeId> = (0..n_nodes as NodeId).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    order
}

#[derive(Debug, Clone, Copy)]
struct Arc {
    from: NodeId,
    to: NodeId,
    weight: f64,
    id: EdgeId,
    orig_first: EdgeId,
    orig_last: EdgeId,
}

/// Contract `graph` in `order` without witness searches.
///
/// Every path through a contracted node gets a shortcut unless an arc with
/// the same key is already at least as cheap. The key is (from, to) for
/// node-based hierarchies and (from, to, first edge, last edge) for
/// edge-based ones, where turn costs are folded into the shortcut weight
/// and loops at the contracted node are followed first.
pub fn contract<W: Weighting>(graph: &BaseGraph, weighting: &W, order: &[NodeId], edge_based: bool) -> ChStorage {
    let n = graph.node_count();
    let base_edges = graph.edge_count();
    let mut levels = vec![0u32; n];
    for (level, &node) in order.iter().enumerate() {
        levels[node as usize] = level as u32;
    }

    let mut arcs: Vec<Arc> = Vec::new();
    let mut out_arcs: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_arcs: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut best: HashMap<(NodeId, NodeId, EdgeId, EdgeId), f64> = HashMap::new();
    let mut shortcuts: Vec<Shortcut> = Vec::new();

    let key = |a: &Arc| {
        if edge_based {
            (a.from, a.to, a.orig_first, a.orig_last)
        } else {
            (a.from, a.to, 0, 0)
        }
    };

    let push_arc = |arc: Arc,
                        arcs: &mut Vec<Arc>,
                        out_arcs: &mut Vec<Vec<usize>>,
                        in_arcs: &mut Vec<Vec<usize>>,
                        best: &mut HashMap<(NodeId, NodeId, EdgeId, EdgeId), f64>|
     -> bool {
        let k = key(&arc);
        if best.get(&k).is_some_and(|&w| w <= arc.weight) {
            return false;
        }
        best.insert(k, arc.weight);
        let idx = arcs.len();
        arcs.push(arc);
        out_arcs[arc.from as usize].push(idx);
        in_arcs[arc.to as usize].push(idx);
        true
    };

    for edge in 0..base_edges as EdgeId {
        let state = graph.edge_state(edge, NO_NODE).expect("stored edge");
        if state.base == state.adj && !edge_based {
            continue;
        }
        for (reverse, from, to) in [(false, state.base, state.adj), (true, state.adj, state.base)] {
            let weight = weighting.edge_weight(&state, reverse);
            if !weight.is_finite() {
                continue;
            }
            let arc = Arc {
                from,
                to,
                weight,
                id: edge,
                orig_first: edge,
                orig_last: edge,
            };
            // parallel base edges are kept, the search sees all of them anyway
            let k = key(&arc);
            if best.get(&k).map_or(true, |&w| arc.weight < w) {
                best.insert(k, arc.weight);
            }
            let idx = arcs.len();
            arcs.push(arc);
            out_arcs[from as usize].push(idx);
            in_arcs[to as usize].push(idx);
        }
    }

    let mut contracted = vec![false; n];
    let mut add_shortcut = |first: Arc,
                            second: Arc,
                            middle: NodeId,
                            weight: f64,
                            arcs: &mut Vec<Arc>,
                            out_arcs: &mut Vec<Vec<usize>>,
                            in_arcs: &mut Vec<Vec<usize>>,
                            best: &mut HashMap<(NodeId, NodeId, EdgeId, EdgeId), f64>|
     -> Option<Arc> {
        let arc = Arc {
            from: first.from,
            to: second.to,
            weight,
            id: (base_edges + shortcuts.len()) as EdgeId,
            orig_first: first.orig_first,
            orig_last: second.orig_last,
        };
        if !push_arc(arc, arcs, out_arcs, in_arcs, best) {
            return None;
        }
        shortcuts.push(Shortcut {
            from: arc.from,
            to: arc.to,
            weight,
            middle,
            skip_first: first.id,
            skip_second: second.id,
            orig_first: arc.orig_first,
            orig_last: arc.orig_last,
        });
        Some(arc)
    };

    // u-turns are forbidden, matching the default edge-based traversal
    let turn = |in_edge: EdgeId, via: NodeId, out_edge: EdgeId| {
        if edge_based && in_edge == out_edge {
            f64::INFINITY
        } else if edge_based {
            graph.turn_weight(weighting, in_edge, via, out_edge)
        } else {
            0.0
        }
    };

    for &v in order {
        let ins: Vec<Arc> = in_arcs[v as usize]
            .iter()
            .map(|&i| arcs[i])
            .filter(|a| a.from != v && !contracted[a.from as usize])
            .collect();
        let outs: Vec<Arc> = out_arcs[v as usize]
            .iter()
            .map(|&i| arcs[i])
            .filter(|a| a.to != v && !contracted[a.to as usize])
            .collect();
        let loops: Vec<Arc> = if edge_based {
            out_arcs[v as usize]
                .iter()
                .map(|&i| arcs[i])
                .filter(|a| a.to == v)
                .collect()
        } else {
            Vec::new()
        };

        // arrivals at v, extended around v's loops until nothing improves
        let mut arrivals = ins.clone();
        let mut queue = ins;
        while let Some(arrival) = queue.pop() {
            for l in &loops {
                let t = turn(arrival.orig_last, v, l.orig_first);
                if !t.is_finite() {
                    continue;
                }
                let weight = arrival.weight + t + l.weight;
                if let Some(extended) = add_shortcut(
                    arrival,
                    *l,
                    v,
                    weight,
                    &mut arcs,
                    &mut out_arcs,
                    &mut in_arcs,
                    &mut best,
                ) {
                    arrivals.push(extended);
                    queue.push(extended);
                }
            }
        }

        for arrival in &arrivals {
            for out in &outs {
                if !edge_based && arrival.from == out.to {
                    continue;
                }
                let t = turn(arrival.orig_last, v, out.orig_first);
                if !t.is_finite() {
                    continue;
                }
                let weight = arrival.weight + t + out.weight;
                add_shortcut(
                    *arrival,
                    *out,
                    v,
                    weight,
                    &mut arcs,
                    &mut out_arcs,
                    &mut in_arcs,
                    &mut best,
                );
            }
        }
        contracted[v as usize] = true;
    }

    drop(add_shortcut);
    ChStorage::new(levels, base_edges, shortcuts).expect("valid hierarchy")
}
