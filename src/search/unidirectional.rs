//! One-to-one Dijkstra and A*

use super::frontier::{Candidate, Frontier};
use super::graph::{Direction, SearchGraph};
use super::heuristic::{BeelineHeuristic, Heuristic, NoHeuristic};
use super::limits::SearchLimits;
use super::path::Path;
use super::result::{CompletedSearch, Outcome, VisitedCounts};
use super::{check_node, expansion_cost};
use crate::config::SearchOptions;
use crate::error::{ConfigError, SearchError};
use crate::graph::NodeId;

pub struct Dijkstra<'a, S> {
    graph: &'a S,
    options: SearchOptions,
}

impl<'a, S: SearchGraph> Dijkstra<'a, S> {
    pub fn new(graph: &'a S, options: &SearchOptions) -> Result<Self, ConfigError> {
        options.validate(graph.has_turn_costs(), graph.weighting_name())?;
        Ok(Self {
            graph,
            options: options.clone(),
        })
    }

    pub fn run(self, from: NodeId, to: NodeId) -> Result<CompletedSearch<'a, S>, SearchError> {
        best_first(self.graph, &self.options, from, to, NoHeuristic, "dijkstra")
    }

    pub fn calc_path(self, from: NodeId, to: NodeId) -> Result<Path, SearchError> {
        Ok(self.run(from, to)?.extract_path())
    }
}

/// Dijkstra guided by a beeline estimate to the target.
pub struct AStar<'a, S> {
    graph: &'a S,
    options: SearchOptions,
}

impl<'a, S: SearchGraph> AStar<'a, S> {
    pub fn new(graph: &'a S, options: &SearchOptions) -> Result<Self, ConfigError> {
        options.validate(graph.has_turn_costs(), graph.weighting_name())?;
        Ok(Self {
            graph,
            options: options.clone(),
        })
    }

    pub fn run(self, from: NodeId, to: NodeId) -> Result<CompletedSearch<'a, S>, SearchError> {
        check_node(self.graph, to)?;
        let heuristic = BeelineHeuristic::new(
            self.graph.coordinate(to),
            self.options.distance_calc,
            self.graph.min_weight_per_distance(),
            self.options.epsilon,
        );
        best_first(self.graph, &self.options, from, to, heuristic, "astar")
    }

    pub fn calc_path(self, from: NodeId, to: NodeId) -> Result<Path, SearchError> {
        Ok(self.run(from, to)?.extract_path())
    }
}

fn best_first<'a, S: SearchGraph, H: Heuristic>(
    graph: &'a S,
    options: &SearchOptions,
    from: NodeId,
    to: NodeId,
    heuristic: H,
    algorithm: &'static str,
) -> Result<CompletedSearch<'a, S>, SearchError> {
    check_node(graph, from)?;
    check_node(graph, to)?;

    let limits = SearchLimits::start(options);
    let mode = options.traversal_mode;
    let mut frontier = Frontier::new(mode);
    let mut visited = VisitedCounts::default();

    let key_of = |node: NodeId, wvp: f64| {
        if heuristic.is_informed() {
            wvp + heuristic.estimate(graph.coordinate(node))
        } else {
            wvp
        }
    };

    if from == to {
        return Ok(CompletedSearch::new(
            graph,
            algorithm,
            from,
            to,
            frontier,
            None,
            Outcome::SameNode,
            0.0,
            visited,
            limits.elapsed(),
        ));
    }

    frontier.add_root(mode.root_id(from), from, key_of(from, 0.0));

    let (outcome, weight) = loop {
        limits.check(visited.forward)?;

        let Some(idx) = frontier.poll() else {
            break (Outcome::Exhausted, f64::INFINITY);
        };
        visited.forward += 1;

        let entry = *frontier.entry(idx);
        if entry.adj_node == to {
            break (Outcome::Target(idx), entry.weight_of_visited_path);
        }

        for e in graph.edges(entry.adj_node, Direction::Forward) {
            if !mode.accepts(&entry, &e) {
                continue;
            }
            let wvp = expansion_cost(graph, mode, Direction::Forward, &entry, &e);
            if !wvp.is_finite() {
                continue;
            }
            frontier.relax(Candidate {
                id: mode.traversal_id(&e),
                parent: idx,
                edge: e.edge,
                orig_edge: e.orig_adj,
                adj_node: e.adj,
                weight_of_visited_path: wvp,
                key: key_of(e.adj, wvp),
            });
        }
    };

    Ok(CompletedSearch::new(
        graph,
        algorithm,
        from,
        to,
        frontier,
        None,
        outcome,
        weight,
        visited,
        limits.elapsed(),
    ))
}
