//! Bidirectional Dijkstra and A*
//!
//! Two frontiers grow from source and target. Whenever either side creates
//! or improves an entry, the other side's entries at the same node are
//! checked for a cheaper connection. In edge-based mode the connection
//! pays the turn between the two arrival edges, and turning straight back
//! is only allowed with u-turns enabled.
//!
//! Restricted source/target edges pin the first edge leaving the source and
//! the last edge entering the target.

use tracing::trace;

use super::frontier::{Candidate, Frontier};
use super::graph::{Direction, SearchEdge, SearchGraph};
use super::heuristic::{BalancedPotential, Potential, ZeroPotential};
use super::limits::SearchLimits;
use super::path::Path;
use super::result::{CompletedSearch, Outcome, VisitedCounts};
use super::spt::{EntryIdx, SptEntry};
use super::traversal::TraversalMode;
use super::{check_node, expansion_cost};
use crate::config::SearchOptions;
use crate::error::{ConfigError, SearchError};
use crate::graph::{EdgeId, NodeId, NO_EDGE};

/// State shared by every bidirectional engine, CH included.
pub(crate) struct BidirCore<'a, S> {
    pub graph: &'a S,
    pub mode: TraversalMode,
    pub from: NodeId,
    pub to: NodeId,
    from_out_edge: EdgeId,
    to_in_edge: EdgeId,
    fwd: Frontier,
    bwd: Frontier,
    best: Option<(EntryIdx, EntryIdx)>,
    pub best_weight: f64,
    pub visited: VisitedCounts,
    pub finished_fwd: bool,
    pub finished_bwd: bool,
    /// Key of the last entry polled on each side
    pub curr_fwd_key: f64,
    pub curr_bwd_key: f64,
}

impl<'a, S: SearchGraph> BidirCore<'a, S> {
    pub fn new(
        graph: &'a S,
        mode: TraversalMode,
        from: NodeId,
        to: NodeId,
        from_out_edge: EdgeId,
        to_in_edge: EdgeId,
    ) -> Self {
        Self {
            graph,
            mode,
            from,
            to,
            from_out_edge,
            to_in_edge,
            fwd: Frontier::new(mode),
            bwd: Frontier::new(mode),
            best: None,
            best_weight: f64::INFINITY,
            visited: VisitedCounts::default(),
            finished_fwd: false,
            finished_bwd: false,
            curr_fwd_key: 0.0,
            curr_bwd_key: 0.0,
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.from_out_edge != NO_EDGE || self.to_in_edge != NO_EDGE
    }

    pub fn init(&mut self, fwd_key: f64, bwd_key: f64) {
        let root = self.fwd.add_root(self.mode.root_id(self.from), self.from, fwd_key);
        self.bwd.add_root(self.mode.root_id(self.to), self.to, bwd_key);
        self.curr_fwd_key = fwd_key;
        self.curr_bwd_key = bwd_key;
        self.update_best_path(Direction::Forward, root);
    }

    #[inline]
    pub fn frontier(&self, dir: Direction) -> &Frontier {
        match dir {
            Direction::Forward => &self.fwd,
            Direction::Backward => &self.bwd,
        }
    }

    #[inline]
    fn frontier_mut(&mut self, dir: Direction) -> &mut Frontier {
        match dir {
            Direction::Forward => &mut self.fwd,
            Direction::Backward => &mut self.bwd,
        }
    }

    pub fn is_finished(&self, dir: Direction) -> bool {
        match dir {
            Direction::Forward => self.finished_fwd,
            Direction::Backward => self.finished_bwd,
        }
    }

    pub fn set_finished(&mut self, dir: Direction, finished: bool) {
        match dir {
            Direction::Forward => self.finished_fwd = finished,
            Direction::Backward => self.finished_bwd = finished,
        }
    }

    /// Poll the next live entry on one side and count it as visited.
    pub fn poll(&mut self, dir: Direction) -> Option<EntryIdx> {
        let idx = self.frontier_mut(dir).poll()?;
        let key = self.frontier(dir).entry(idx).weight;
        match dir {
            Direction::Forward => {
                self.visited.forward += 1;
                self.curr_fwd_key = key;
            }
            Direction::Backward => {
                self.visited.backward += 1;
                self.curr_bwd_key = key;
            }
        }
        Some(idx)
    }

    /// Relax every accepted edge of entry `idx`.
    ///
    /// `potential` maps a node to its heuristic potential for this direction.
    pub fn expand(
        &mut self,
        dir: Direction,
        idx: EntryIdx,
        accept: impl Fn(&SearchEdge) -> bool,
        potential: impl Fn(NodeId) -> f64,
    ) {
        let entry = *self.frontier(dir).entry(idx);
        let restriction = if entry.is_root() {
            match dir {
                Direction::Forward => self.from_out_edge,
                Direction::Backward => self.to_in_edge,
            }
        } else {
            NO_EDGE
        };
        let graph = self.graph;
        let mode = self.mode;

        for e in graph.edges(entry.adj_node, dir) {
            if !mode.accepts(&entry, &e) || !accept(&e) {
                continue;
            }
            if restriction != NO_EDGE && e.orig_base != restriction {
                continue;
            }
            let wvp = expansion_cost(graph, mode, dir, &entry, &e);
            if !wvp.is_finite() {
                continue;
            }
            let relaxed = self.frontier_mut(dir).relax(Candidate {
                id: mode.traversal_id(&e),
                parent: idx,
                edge: e.edge,
                orig_edge: e.orig_adj,
                adj_node: e.adj,
                weight_of_visited_path: wvp,
                key: wvp + potential(e.adj),
            });
            if let Some(new_idx) = relaxed.entry() {
                self.update_best_path(dir, new_idx);
            }
        }
    }

    /// Check entry `idx` against the other frontier's entries at the same node.
    fn update_best_path(&mut self, dir: Direction, idx: EntryIdx) {
        let entry = *self.frontier(dir).entry(idx);
        let node = entry.adj_node;
        let other = self.frontier(dir.opposite());

        let mut improved: Option<(f64, EntryIdx)> = None;
        for other_idx in other.entries_at(node) {
            let other_entry = other.entry(other_idx);
            let (fe, be) = match dir {
                Direction::Forward => (&entry, other_entry),
                Direction::Backward => (other_entry, &entry),
            };
            if !self.meeting_allowed(fe, be) {
                continue;
            }

            let mut weight = fe.weight_of_visited_path + be.weight_of_visited_path;
            if self.mode.is_edge_based() && fe.orig_edge != NO_EDGE && be.orig_edge != NO_EDGE {
                if fe.orig_edge == be.orig_edge && !self.mode.allows_u_turns() {
                    continue;
                }
                weight += self.graph.turn_weight(fe.orig_edge, node, be.orig_edge);
            }

            let current = improved.map_or(self.best_weight, |(w, _)| w);
            if weight < current {
                improved = Some((weight, other_idx));
            }
        }

        if let Some((weight, other_idx)) = improved {
            trace!(node, weight, ?dir, "better meeting point");
            self.best_weight = weight;
            self.best = Some(match dir {
                Direction::Forward => (idx, other_idx),
                Direction::Backward => (other_idx, idx),
            });
        }
    }

    fn meeting_allowed(&self, fe: &SptEntry, be: &SptEntry) -> bool {
        if fe.is_root() && be.is_root() {
            return !self.is_restricted();
        }
        if fe.is_root() && self.from_out_edge != NO_EDGE && be.orig_edge != self.from_out_edge {
            return false;
        }
        if be.is_root() && self.to_in_edge != NO_EDGE && fe.orig_edge != self.to_in_edge {
            return false;
        }
        true
    }

    pub fn finish(self, algorithm: &'static str, limits: &SearchLimits) -> CompletedSearch<'a, S> {
        let outcome = match self.best {
            Some((fwd, bwd)) => Outcome::Meeting { fwd, bwd },
            None => Outcome::Exhausted,
        };
        CompletedSearch::new(
            self.graph,
            algorithm,
            self.from,
            self.to,
            self.fwd,
            Some(self.bwd),
            outcome,
            self.best_weight,
            self.visited,
            limits.elapsed(),
        )
    }
}

/// Validate endpoints and restrictions; `Some` for the trivial source == target case.
pub(crate) fn prepare<'a, S: SearchGraph>(
    graph: &'a S,
    options: &SearchOptions,
    from: NodeId,
    to: NodeId,
    from_out_edge: EdgeId,
    to_in_edge: EdgeId,
    algorithm: &'static str,
) -> Result<Option<CompletedSearch<'a, S>>, SearchError> {
    check_node(graph, from)?;
    check_node(graph, to)?;
    let restricted = from_out_edge != NO_EDGE || to_in_edge != NO_EDGE;
    if restricted && !options.traversal_mode.is_edge_based() {
        return Err(ConfigError::RestrictedEdgesRequireEdgeBased.into());
    }
    if from == to && !restricted {
        return Ok(Some(CompletedSearch::new(
            graph,
            algorithm,
            from,
            to,
            Frontier::new(options.traversal_mode),
            None,
            Outcome::SameNode,
            0.0,
            VisitedCounts::default(),
            std::time::Duration::ZERO,
        )));
    }
    Ok(None)
}

#[allow(clippy::too_many_arguments)]
fn run_bidirectional<'a, S: SearchGraph, P: Potential>(
    graph: &'a S,
    options: &SearchOptions,
    from: NodeId,
    to: NodeId,
    from_out_edge: EdgeId,
    to_in_edge: EdgeId,
    potential: P,
    algorithm: &'static str,
) -> Result<CompletedSearch<'a, S>, SearchError> {
    if let Some(trivial) = prepare(graph, options, from, to, from_out_edge, to_in_edge, algorithm)? {
        return Ok(trivial);
    }

    let limits = SearchLimits::start(options);
    let informed = potential.is_informed();
    let fwd_potential = |n: NodeId| {
        if informed {
            potential.forward(graph.coordinate(n))
        } else {
            0.0
        }
    };
    let bwd_potential = |n: NodeId| {
        if informed {
            potential.backward(graph.coordinate(n))
        } else {
            0.0
        }
    };

    let mut core = BidirCore::new(
        graph,
        options.traversal_mode,
        from,
        to,
        from_out_edge,
        to_in_edge,
    );
    core.init(fwd_potential(from), bwd_potential(to));

    let factor = options.approximation_factor;
    loop {
        if core.finished_fwd
            || core.finished_bwd
            || core.curr_fwd_key + core.curr_bwd_key >= core.best_weight * factor
        {
            break;
        }
        limits.check(core.visited.total())?;

        if !core.finished_fwd {
            match core.poll(Direction::Forward) {
                Some(idx) => core.expand(Direction::Forward, idx, |_| true, fwd_potential),
                None => core.finished_fwd = true,
            }
        }
        if !core.finished_bwd {
            match core.poll(Direction::Backward) {
                Some(idx) => core.expand(Direction::Backward, idx, |_| true, bwd_potential),
                None => core.finished_bwd = true,
            }
        }
    }

    Ok(core.finish(algorithm, &limits))
}

pub struct DijkstraBidirection<'a, S> {
    graph: &'a S,
    options: SearchOptions,
}

impl<'a, S: SearchGraph> DijkstraBidirection<'a, S> {
    pub fn new(graph: &'a S, options: &SearchOptions) -> Result<Self, ConfigError> {
        options.validate(graph.has_turn_costs(), graph.weighting_name())?;
        Ok(Self {
            graph,
            options: options.clone(),
        })
    }

    pub fn run(self, from: NodeId, to: NodeId) -> Result<CompletedSearch<'a, S>, SearchError> {
        self.run_restricted(from, to, NO_EDGE, NO_EDGE)
    }

    /// Like [`run`](Self::run) but the path must leave `from` over
    /// `from_out_edge` and enter `to` over `to_in_edge` (`NO_EDGE` = any).
    pub fn run_restricted(
        self,
        from: NodeId,
        to: NodeId,
        from_out_edge: EdgeId,
        to_in_edge: EdgeId,
    ) -> Result<CompletedSearch<'a, S>, SearchError> {
        run_bidirectional(
            self.graph,
            &self.options,
            from,
            to,
            from_out_edge,
            to_in_edge,
            ZeroPotential,
            "dijkstrabi",
        )
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

/// Bidirectional A* with balanced potentials.
///
/// Exact with `approximation_factor == 1` and `epsilon <= 1`.
pub struct AStarBidirection<'a, S> {
    graph: &'a S,
    options: SearchOptions,
}

impl<'a, S: SearchGraph> AStarBidirection<'a, S> {
    pub fn new(graph: &'a S, options: &SearchOptions) -> Result<Self, ConfigError> {
        options.validate(graph.has_turn_costs(), graph.weighting_name())?;
        Ok(Self {
            graph,
            options: options.clone(),
        })
    }

    pub fn run(self, from: NodeId, to: NodeId) -> Result<CompletedSearch<'a, S>, SearchError> {
        self.run_restricted(from, to, NO_EDGE, NO_EDGE)
    }

    pub fn run_restricted(
        self,
        from: NodeId,
        to: NodeId,
        from_out_edge: EdgeId,
        to_in_edge: EdgeId,
    ) -> Result<CompletedSearch<'a, S>, SearchError> {
        check_node(self.graph, from)?;
        check_node(self.graph, to)?;
        let potential = BalancedPotential::new(
            self.graph.coordinate(from),
            self.graph.coordinate(to),
            self.options.distance_calc,
            self.graph.min_weight_per_distance(),
            self.options.epsilon,
        );
        run_bidirectional(
            self.graph,
            &self.options,
            from,
            to,
            from_out_edge,
            to_in_edge,
            potential,
            "astarbi",
        )
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
