//! Per-query search options
//!
//! Options are plain data with serde defaults so they can be read from a
//! JSON request body or file. Consistency checks run when an engine is
//! created, because some of them depend on the weighting.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geo::DistanceCalc;
use crate::search::TraversalMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlgorithmKind {
    #[default]
    #[serde(rename = "dijkstra")]
    Dijkstra,
    #[serde(rename = "astar")]
    AStar,
    #[serde(rename = "dijkstrabi")]
    DijkstraBi,
    #[serde(rename = "astarbi")]
    AStarBi,
    /// Bidirectional search over a contraction hierarchy
    #[serde(rename = "ch")]
    Ch,
}

impl AlgorithmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmKind::Dijkstra => "dijkstra",
            AlgorithmKind::AStar => "astar",
            AlgorithmKind::DijkstraBi => "dijkstrabi",
            AlgorithmKind::AStarBi => "astarbi",
            AlgorithmKind::Ch => "ch",
        }
    }
}

impl std::fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlgorithmKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dijkstra" => Ok(AlgorithmKind::Dijkstra),
            "astar" => Ok(AlgorithmKind::AStar),
            "dijkstrabi" => Ok(AlgorithmKind::DijkstraBi),
            "astarbi" => Ok(AlgorithmKind::AStarBi),
            "ch" => Ok(AlgorithmKind::Ch),
            other => Err(format!("unknown algorithm '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub algorithm: AlgorithmKind,
    pub traversal_mode: TraversalMode,
    /// Give up after this many settled entries (both directions together)
    pub max_visited_nodes: Option<usize>,
    pub timeout_ms: Option<u64>,
    /// Distance model for A* heuristics
    pub distance_calc: DistanceCalc,
    /// A* heuristic scale; values above 1 trade optimality for speed
    pub epsilon: f64,
    /// Bidirectional A* stops once `top_f + top_b >= best * approximation_factor`
    pub approximation_factor: f64,
    pub stall_on_demand: bool,
    /// R-tree candidates examined per query point when snapping
    pub snap_max_candidates: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmKind::Dijkstra,
            traversal_mode: TraversalMode::NodeBased,
            max_visited_nodes: None,
            timeout_ms: None,
            distance_calc: DistanceCalc::Earth,
            epsilon: 1.0,
            approximation_factor: 1.0,
            stall_on_demand: true,
            snap_max_candidates: 16,
        }
    }
}

impl SearchOptions {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_json::from_str(s)?;
        options.check_values()?;
        Ok(options)
    }

    pub fn with_algorithm(mut self, algorithm: AlgorithmKind) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_traversal_mode(mut self, mode: TraversalMode) -> Self {
        self.traversal_mode = mode;
        self
    }

    pub fn with_max_visited_nodes(mut self, limit: usize) -> Self {
        self.max_visited_nodes = Some(limit);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_approximation_factor(mut self, factor: f64) -> Self {
        self.approximation_factor = factor;
        self
    }

    pub fn with_stall_on_demand(mut self, enabled: bool) -> Self {
        self.stall_on_demand = enabled;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Range checks that do not depend on the graph
    pub fn check_values(&self) -> Result<(), ConfigError> {
        if !(self.epsilon > 0.0) {
            return Err(ConfigError::InvalidEpsilon(self.epsilon));
        }
        if !(self.approximation_factor >= 1.0) {
            return Err(ConfigError::InvalidApproximationFactor(
                self.approximation_factor,
            ));
        }
        Ok(())
    }

    /// Full check against the weighting the search will run with
    pub fn validate(&self, has_turn_costs: bool, weighting: &str) -> Result<(), ConfigError> {
        self.check_values()?;
        if has_turn_costs && !self.traversal_mode.is_edge_based() {
            return Err(ConfigError::TurnCostsRequireEdgeBased {
                weighting: weighting.to_string(),
            });
        }
        Ok(())
    }
}
