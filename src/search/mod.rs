//! Shortest-path search engines
//!
//! All engines share one best-first loop shape: poll the cheapest live
//! entry, stop if done, relax its edges. They differ in the cost function
//! (turn costs, heuristic potentials), the edge acceptance filter (CH level
//! filter) and the stop rule.
//!
//! Engines are single-use: `run` consumes the engine and returns a
//! [`CompletedSearch`] from which the path can be extracted.

pub mod bidirectional;
pub mod ch;
pub mod frontier;
pub mod graph;
pub mod heuristic;
mod limits;
pub mod path;
pub mod result;
pub mod spt;
pub mod traversal;
pub mod unidirectional;

pub use bidirectional::{AStarBidirection, DijkstraBidirection};
pub use ch::ChBidirection;
pub use graph::{Direction, SearchEdge, SearchGraph, WeightedGraph};
pub use path::Path;
pub use result::{CompletedSearch, SearchState, VisitedCounts};
pub use traversal::{TraversalId, TraversalMode};
pub use unidirectional::{AStar, Dijkstra};

use crate::config::{AlgorithmKind, SearchOptions};
use crate::error::{ConfigError, SearchError};
use crate::graph::{Graph, NodeId};
use crate::weighting::Weighting;

use spt::SptEntry;

pub(crate) fn check_node<S: SearchGraph>(graph: &S, node: NodeId) -> Result<(), SearchError> {
    let count = graph.node_count();
    if node as usize >= count {
        return Err(SearchError::NodeOutOfBounds { node, count });
    }
    Ok(())
}

/// Path weight after following `e` from `entry`, turn cost included.
#[inline]
pub(crate) fn expansion_cost<S: SearchGraph>(
    graph: &S,
    mode: TraversalMode,
    dir: Direction,
    entry: &SptEntry,
    e: &SearchEdge,
) -> f64 {
    if !e.weight.is_finite() {
        return f64::INFINITY;
    }
    let turn = if mode.is_edge_based() {
        match dir {
            Direction::Forward => graph.turn_weight(entry.orig_edge, entry.adj_node, e.orig_base),
            Direction::Backward => graph.turn_weight(e.orig_base, entry.adj_node, entry.orig_edge),
        }
    } else {
        0.0
    };
    entry.weight_of_visited_path + turn + e.weight
}

/// Run the algorithm named in `options` on a plain (non-CH) graph.
pub fn run<'a, 'g, G: Graph, W: Weighting + ?Sized>(
    graph: &'a WeightedGraph<'g, G, W>,
    options: &SearchOptions,
    from: NodeId,
    to: NodeId,
) -> Result<CompletedSearch<'a, WeightedGraph<'g, G, W>>, SearchError> {
    match options.algorithm {
        AlgorithmKind::Dijkstra => Dijkstra::new(graph, options)?.run(from, to),
        AlgorithmKind::AStar => AStar::new(graph, options)?.run(from, to),
        AlgorithmKind::DijkstraBi => DijkstraBidirection::new(graph, options)?.run(from, to),
        AlgorithmKind::AStarBi => AStarBidirection::new(graph, options)?.run(from, to),
        AlgorithmKind::Ch => Err(ConfigError::AlgorithmRequiresHierarchy(
            options.algorithm.to_string(),
        )
        .into()),
    }
}

/// [`run`] followed by path extraction.
pub fn calc_path<G: Graph, W: Weighting + ?Sized>(
    graph: &WeightedGraph<'_, G, W>,
    options: &SearchOptions,
    from: NodeId,
    to: NodeId,
) -> Result<Path, SearchError> {
    Ok(run(graph, options, from, to)?.extract_path())
}
