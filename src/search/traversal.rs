//! Node-based vs edge-based traversal
//!
//! In node-based mode a node is settled once and its frontier key is the
//! node id. In edge-based mode the key is the oriented edge the entry
//! arrived on, so the same node can be reached once per incoming edge and
//! turn costs apply between consecutive edges.

use serde::{Deserialize, Serialize};

use super::graph::SearchEdge;
use super::spt::SptEntry;
use crate::graph::NodeId;

pub type TraversalId = u64;

/// Keys of root entries, disjoint from every edge key
const ROOT_FLAG: u64 = 1 << 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraversalMode {
    #[default]
    NodeBased,
    EdgeBased {
        /// Allow turning back onto the arrival edge (at the weighting's u-turn cost)
        u_turns: bool,
    },
}

impl TraversalMode {
    #[inline]
    pub fn is_edge_based(&self) -> bool {
        matches!(self, TraversalMode::EdgeBased { .. })
    }

    #[inline]
    pub fn allows_u_turns(&self) -> bool {
        matches!(self, TraversalMode::EdgeBased { u_turns: true })
    }

    #[inline]
    pub fn traversal_id(&self, edge: &SearchEdge) -> TraversalId {
        match self {
            TraversalMode::NodeBased => edge.adj as TraversalId,
            TraversalMode::EdgeBased { .. } => edge.key,
        }
    }

    /// Whether `e` may be taken after `entry`. Going straight back over the
    /// arrival edge is never allowed node-based, and edge-based only with u-turns.
    #[inline]
    pub fn accepts(&self, entry: &SptEntry, e: &SearchEdge) -> bool {
        match self {
            TraversalMode::NodeBased => e.edge != entry.edge,
            TraversalMode::EdgeBased { u_turns } => *u_turns || e.orig_base != entry.orig_edge,
        }
    }

    #[inline]
    pub fn root_id(&self, node: NodeId) -> TraversalId {
        match self {
            TraversalMode::NodeBased => node as TraversalId,
            TraversalMode::EdgeBased { .. } => ROOT_FLAG | node as TraversalId,
        }
    }
}
