//! Bidirectional search over a contraction hierarchy
//!
//! Both sides only climb in level (shortcuts and query-time edges are
//! exempt from the filter). Each side stops once its smallest key exceeds
//! the best connection found so far; the search ends when both have stopped.
//!
//! Node-based searches use stall-on-demand: before expanding an entry, its
//! incoming edges are checked (at any level) for a cheaper way in through an
//! already reached neighbour, and if one exists the entry is not expanded.

use tracing::trace;

use super::bidirectional::{prepare, BidirCore};
use super::frontier::Frontier;
use super::graph::{Direction, SearchGraph};
use super::limits::SearchLimits;
use super::path::Path;
use super::result::CompletedSearch;
use super::spt::SptEntry;
use crate::config::SearchOptions;
use crate::error::{ConfigError, SearchError};
use crate::graph::ch::ChGraph;
use crate::graph::{EdgeId, Graph, NodeId, NO_EDGE};
use crate::weighting::Weighting;

/// Tolerance for rounded shortcut weights when stalling
const STALL_PRECISION: f64 = 0.001;

pub struct ChBidirection<'a, G, W: ?Sized> {
    graph: &'a ChGraph<'a, G, W>,
    options: SearchOptions,
}

impl<'a, G: Graph, W: Weighting + ?Sized> ChBidirection<'a, G, W> {
    pub fn new(graph: &'a ChGraph<'a, G, W>, options: &SearchOptions) -> Result<Self, ConfigError> {
        options.validate(graph.has_turn_costs(), graph.weighting_name())?;
        Ok(Self {
            graph,
            options: options.clone(),
        })
    }

    fn algorithm_name(&self) -> &'static str {
        if self.options.traversal_mode.is_edge_based() {
            "ch-edge"
        } else if self.options.stall_on_demand {
            "ch-sod"
        } else {
            "ch"
        }
    }

    pub fn run(
        self,
        from: NodeId,
        to: NodeId,
    ) -> Result<CompletedSearch<'a, ChGraph<'a, G, W>>, SearchError> {
        self.run_restricted(from, to, NO_EDGE, NO_EDGE)
    }

    pub fn run_restricted(
        self,
        from: NodeId,
        to: NodeId,
        from_out_edge: EdgeId,
        to_in_edge: EdgeId,
    ) -> Result<CompletedSearch<'a, ChGraph<'a, G, W>>, SearchError> {
        let graph = self.graph;
        let algorithm = self.algorithm_name();
        if let Some(trivial) = prepare(
            graph,
            &self.options,
            from,
            to,
            from_out_edge,
            to_in_edge,
            algorithm,
        )? {
            return Ok(trivial);
        }

        let limits = SearchLimits::start(&self.options);
        let mode = self.options.traversal_mode;
        let stall = self.options.stall_on_demand && !mode.is_edge_based();

        let mut core = BidirCore::new(graph, mode, from, to, from_out_edge, to_in_edge);
        core.init(0.0, 0.0);

        loop {
            if (core.finished_fwd && core.finished_bwd)
                || (core.curr_fwd_key >= core.best_weight && core.curr_bwd_key >= core.best_weight)
            {
                break;
            }
            limits.check(core.visited.total())?;

            for dir in [Direction::Forward, Direction::Backward] {
                if !core.is_finished(dir) {
                    let more = fill_edges(graph, &mut core, dir, stall);
                    core.set_finished(dir, !more);
                }
            }
        }

        Ok(core.finish(algorithm, &limits))
    }

    pub fn calc_path(self, from: NodeId, to: NodeId) -> Result<Path, SearchError> {
        Ok(self.run(from, to)?.extract_path())
    }

    pub fn calc_path_restricted(
        self,
        from: NodeId,
        to: NodeId,
        from_out_edge: EdgeId,
        to_in_edge: EdgeId,
    ) -> Result<Path, SearchError> {
        Ok(self
            .run_restricted(from, to, from_out_edge, to_in_edge)?
            .extract_path())
    }
}

/// Settle one entry on `dir`. Returns false once this side is done.
fn fill_edges<G: Graph, W: Weighting + ?Sized>(
    graph: &ChGraph<'_, G, W>,
    core: &mut BidirCore<'_, ChGraph<'_, G, W>>,
    dir: Direction,
    stall: bool,
) -> bool {
    let Some(idx) = core.poll(dir) else {
        return false;
    };
    let entry = *core.frontier(dir).entry(idx);
    if entry.weight > core.best_weight {
        return false;
    }
    if stall && is_stallable(graph, core.frontier(dir), &entry, dir) {
        trace!(node = entry.adj_node, weight = entry.weight, ?dir, "stalled");
        return true;
    }
    core.expand(dir, idx, |e| graph.accepts(e), |_| 0.0);
    true
}

/// True if a neighbour already reached on this side offers a cheaper way in.
///
/// Every incoming neighbour is checked, not only lower-level ones. Entries
/// in the frontier are weights of real paths, so any of them may stall.
fn is_stallable<G: Graph, W: Weighting + ?Sized>(
    graph: &ChGraph<'_, G, W>,
    frontier: &Frontier,
    entry: &SptEntry,
    dir: Direction,
) -> bool {
    if entry.is_root() {
        return false;
    }
    graph.edges(entry.adj_node, dir.opposite()).any(|e| {
        if e.edge == entry.edge || !e.weight.is_finite() {
            return false;
        }
        frontier.entries_at(e.adj).any(|adj_idx| {
            let adj = frontier.entry(adj_idx);
            adj.weight + e.weight - entry.weight < -STALL_PRECISION
        })
    })
}
