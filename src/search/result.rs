//! Outcome of a finished search and path extraction

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::frontier::Frontier;
use super::graph::SearchGraph;
use super::path::Path;
use super::spt::EntryIdx;
use crate::graph::{EdgeRef, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    /// A path was found
    Found,
    /// The frontier ran dry without reaching the target
    Exhausted,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Outcome {
    SameNode,
    Target(EntryIdx),
    Meeting { fwd: EntryIdx, bwd: EntryIdx },
    Exhausted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitedCounts {
    pub forward: usize,
    pub backward: usize,
}

impl VisitedCounts {
    pub fn total(&self) -> usize {
        self.forward + self.backward
    }
}

/// A search that ran to completion. Path extraction is repeatable.
pub struct CompletedSearch<'a, S> {
    graph: &'a S,
    algorithm: &'static str,
    from: NodeId,
    to: NodeId,
    forward: Frontier,
    backward: Option<Frontier>,
    outcome: Outcome,
    weight: f64,
    visited: VisitedCounts,
    elapsed: Duration,
}

impl<'a, S: SearchGraph> CompletedSearch<'a, S> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        graph: &'a S,
        algorithm: &'static str,
        from: NodeId,
        to: NodeId,
        forward: Frontier,
        backward: Option<Frontier>,
        outcome: Outcome,
        weight: f64,
        visited: VisitedCounts,
        elapsed: Duration,
    ) -> Self {
        let search = Self {
            graph,
            algorithm,
            from,
            to,
            forward,
            backward,
            outcome,
            weight,
            visited,
            elapsed,
        };
        tracing::debug!(
            algorithm,
            from,
            to,
            state = ?search.state(),
            weight,
            visited = visited.total(),
            elapsed_us = elapsed.as_micros() as u64,
            "search finished"
        );
        search
    }

    pub fn state(&self) -> SearchState {
        match self.outcome {
            Outcome::Exhausted => SearchState::Exhausted,
            _ => SearchState::Found,
        }
    }

    pub fn found(&self) -> bool {
        self.state() == SearchState::Found
    }

    /// Weight of the best path, `INFINITY` if none was found
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn visited_nodes(&self) -> usize {
        self.visited.total()
    }

    pub fn visited(&self) -> VisitedCounts {
        self.visited
    }

    pub fn algorithm(&self) -> &'static str {
        self.algorithm
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn debug_info(&self) -> String {
        format!(
            "{}-routing:{}, visited nodes: {} (fwd {}, bwd {}), {:.3} ms",
            self.algorithm,
            self.graph.weighting_name(),
            self.visited.total(),
            self.visited.forward,
            self.visited.backward,
            self.elapsed.as_secs_f64() * 1000.0
        )
    }

    pub fn extract_path(&self) -> Path {
        let mut refs: Vec<EdgeRef> = Vec::new();
        match self.outcome {
            Outcome::SameNode => return Path::zero_length(self.from),
            Outcome::Exhausted => return Path::not_found(self.from, self.to),
            Outcome::Target(idx) => self.forward_edges(idx, &mut refs),
            Outcome::Meeting { fwd, bwd } => {
                self.forward_edges(fwd, &mut refs);
                self.backward_edges(bwd, &mut refs);
            }
        }
        Path::from_edge_refs(self.graph, self.from, self.to, &refs, self.weight)
    }

    /// Root to `idx`, in travel order
    fn forward_edges(&self, idx: EntryIdx, out: &mut Vec<EdgeRef>) {
        let chain: Vec<_> = self.forward.arena().chain(idx).collect();
        for entry in chain.iter().rev().filter(|e| !e.is_root()) {
            self.graph.expand_edge(entry.edge, entry.adj_node, out);
        }
    }

    /// `idx` to the backward root (the target), already in travel order
    fn backward_edges(&self, idx: EntryIdx, out: &mut Vec<EdgeRef>) {
        let Some(backward) = self.backward.as_ref() else {
            panic!("meeting outcome without a backward frontier");
        };
        let mut current = backward.entry(idx);
        while let Some(parent_idx) = current.parent {
            let parent = backward.entry(parent_idx);
            self.graph
                .expand_edge(current.edge, parent.adj_node, out);
            current = parent;
        }
    }
}
