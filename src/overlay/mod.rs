//! Query-time overlay: snapping coordinates onto the graph and exposing
//! them as virtual nodes without touching the stored graph

mod builder;
mod location_index;
mod query_graph;
mod snap;

pub use builder::{QueryOverlayBuilder, DEFAULT_MAX_CANDIDATES};
pub use location_index::{IndexedSegment, LocationIndex};
pub use query_graph::{EdgeOrigin, NodeOrigin, QueryGraph};
pub use snap::{Snap, SnappedPosition};
