//! Per-request overlay construction: snap every query point, then build the query graph

use tracing::debug;

use super::location_index::LocationIndex;
use super::query_graph::QueryGraph;
use super::snap::Snap;
use crate::error::{OverlayError, SnapError};
use crate::geo::Coord;
use crate::graph::ch::ChStorage;
use crate::graph::{EdgeRef, Graph};

/// Default number of index candidates refined per query point
pub const DEFAULT_MAX_CANDIDATES: usize = 16;

/// Snaps query coordinates and builds a [`QueryGraph`] for one request.
pub struct QueryOverlayBuilder<'a, G> {
    graph: &'a G,
    index: &'a LocationIndex,
    first_virtual_edge: usize,
    max_candidates: usize,
}

impl<'a, G: Graph> QueryOverlayBuilder<'a, G> {
    pub fn new(graph: &'a G, index: &'a LocationIndex) -> Self {
        Self {
            graph,
            index,
            first_virtual_edge: graph.edge_count(),
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    /// Allocate virtual edge ids after the hierarchy's shortcut ids.
    pub fn for_hierarchy(mut self, storage: &ChStorage) -> Self {
        self.first_virtual_edge = self.first_virtual_edge.max(storage.edge_id_end());
        self
    }

    pub fn max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates.max(1);
        self
    }

    /// Snap every point onto an edge accepted by `filter`.
    ///
    /// Fails with every point that could not be snapped.
    pub fn snap_all(
        &self,
        points: &[Coord],
        filter: impl Fn(&EdgeRef) -> bool,
    ) -> Result<Vec<Snap>, OverlayError> {
        let mut snaps = Vec::with_capacity(points.len());
        let mut errors: Vec<SnapError> = Vec::new();
        for (i, &point) in points.iter().enumerate() {
            match self
                .index
                .find_closest(self.graph, i, point, self.max_candidates, &filter)
            {
                Ok(snap) => snaps.push(snap),
                Err(e) => errors.push(e),
            }
        }
        if !errors.is_empty() {
            debug!(failed = errors.len(), total = points.len(), "snapping failed");
            return Err(OverlayError::Snap(errors));
        }
        Ok(snaps)
    }

    /// Snap onto edges usable in at least one direction.
    pub fn build(&self, points: &[Coord]) -> Result<QueryGraph<'a, G>, OverlayError> {
        self.build_with_filter(points, |e| e.attrs.fwd_access || e.attrs.bwd_access)
    }

    pub fn build_with_filter(
        &self,
        points: &[Coord],
        filter: impl Fn(&EdgeRef) -> bool,
    ) -> Result<QueryGraph<'a, G>, OverlayError> {
        let snaps = self.snap_all(points, filter)?;
        Ok(QueryGraph::create(self.graph, snaps, self.first_virtual_edge))
    }
}
