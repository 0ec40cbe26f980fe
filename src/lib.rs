//! Shortest-path search core for static road graphs
//!
//! Dijkstra, A*, their bidirectional variants and a contraction-hierarchy
//! search, all running over a read-only [`graph::Graph`]. Query coordinates
//! are snapped through an [`overlay::QueryGraph`] so concurrent queries can
//! share one graph without mutating it.

pub mod config;
pub mod error;
pub mod geo;
pub mod graph;
pub mod logging;
pub mod overlay;
pub mod search;
pub mod synthetic;
pub mod validate;
pub mod weighting;

pub use config::{AlgorithmKind, SearchOptions};
pub use error::{ConfigError, GraphError, OverlayError, SearchError, SnapError};
pub use graph::{BaseGraph, BaseGraphBuilder, Graph, NodeId, EdgeId};
pub use overlay::{LocationIndex, QueryGraph, QueryOverlayBuilder};
pub use search::{calc_path, CompletedSearch, Path, TraversalMode};
