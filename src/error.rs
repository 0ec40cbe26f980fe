//! Error types for graph construction, configuration, search and snapping
//!
//! Library code returns these typed errors; the bench binary wraps them in
//! `anyhow` at the application boundary.

use thiserror::Error;

use crate::graph::{EdgeId, NodeId};

/// Errors raised while building or validating graph storage.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("node {node} out of bounds (graph has {count} nodes)")]
    NodeOutOfBounds { node: NodeId, count: usize },

    #[error("invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("edge {from}->{to} has invalid distance {distance}")]
    InvalidDistance { from: NodeId, to: NodeId, distance: f64 },

    #[error("level table has {got} entries but the graph has {expected} nodes")]
    LevelCountMismatch { expected: usize, got: usize },

    #[error("hierarchy was built for {expected} base edges, graph has {got}")]
    EdgeCountMismatch { expected: usize, got: usize },

    #[error("shortcut {index} references unknown edge {edge}")]
    UnknownSkippedEdge { index: usize, edge: EdgeId },

    #[error("shortcut {index} ({from}->{to}) does not lead to a higher level node")]
    ShortcutNotUpward { index: usize, from: NodeId, to: NodeId },

    #[error("virtual edge ids start at {first_virtual} and collide with shortcut ids below {shortcut_end}")]
    VirtualEdgeIdCollision { first_virtual: usize, shortcut_end: usize },
}

/// Invalid search options, reported when an engine is constructed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("weighting '{weighting}' has turn costs, which requires edge-based traversal")]
    TurnCostsRequireEdgeBased { weighting: String },

    #[error("approximation factor must be >= 1, got {0}")]
    InvalidApproximationFactor(f64),

    #[error("A* epsilon must be > 0, got {0}")]
    InvalidEpsilon(f64),

    #[error("restricted source/target edges require edge-based traversal")]
    RestrictedEdgesRequireEdgeBased,

    #[error("algorithm '{0}' needs a contraction hierarchy, use the CH entry point")]
    AlgorithmRequiresHierarchy(String),

    #[error("failed to parse search options: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures of a single search run.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("node {node} out of bounds (graph has {count} nodes)")]
    NodeOutOfBounds { node: NodeId, count: usize },

    #[error("maximum visited nodes exceeded: visited {visited}, limit {limit}")]
    MaxVisitedNodesExceeded { limit: usize, visited: usize },

    #[error("search timed out after {elapsed_ms} ms (limit {limit_ms} ms) with {visited} nodes visited")]
    TimeoutExceeded {
        limit_ms: u64,
        elapsed_ms: u64,
        visited: usize,
    },
}

impl SearchError {
    /// True for the resource-limit failures (visited budget, timeout).
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(
            self,
            SearchError::MaxVisitedNodesExceeded { .. } | SearchError::TimeoutExceeded { .. }
        )
    }
}

/// Why a single query point could not be snapped.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SnapError {
    #[error("point {index} ({lat}, {lon}) is not a valid coordinate")]
    InvalidCoordinate { index: usize, lat: f64, lon: f64 },

    #[error("point {index} ({lat}, {lon}): no eligible edge nearby")]
    NoEdgeNearby { index: usize, lat: f64, lon: f64 },
}

/// Overlay construction failure. Carries every point that failed, not just the first.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OverlayError {
    #[error("{} query point(s) could not be snapped: {}", .0.len(), join_snap_errors(.0))]
    Snap(Vec<SnapError>),
}

fn join_snap_errors(errors: &[SnapError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_errors_are_flagged() {
        let e = SearchError::MaxVisitedNodesExceeded {
            limit: 10,
            visited: 10,
        };
        assert!(e.is_limit_exceeded());
        assert!(!SearchError::NodeOutOfBounds { node: 3, count: 2 }.is_limit_exceeded());
    }

    #[test]
    fn test_overlay_error_lists_every_point() {
        let e = OverlayError::Snap(vec![
            SnapError::NoEdgeNearby {
                index: 0,
                lat: 1.0,
                lon: 2.0,
            },
            SnapError::InvalidCoordinate {
                index: 2,
                lat: 91.0,
                lon: 0.0,
            },
        ]);
        let msg = e.to_string();
        assert!(msg.starts_with("2 query point(s)"));
        assert!(msg.contains("point 0"));
        assert!(msg.contains("point 2"));
    }
}
