//! Result of snapping a query coordinate onto the graph

use serde::{Deserialize, Serialize};

use crate::geo::Coord;
use crate::graph::{EdgeRef, NodeId, NO_NODE};

/// Where on the closest edge the snapped point lies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnappedPosition {
    /// On a tower (junction) node; no query-time node is needed
    Tower,
    /// On an interior geometry point
    Pillar,
    /// Between two geometry points
    Edge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snap {
    pub query_point: Coord,
    pub closest_edge: EdgeRef,
    /// Tower node, or the query-time node once an overlay was created
    pub closest_node: NodeId,
    /// Index into the edge's full geometry (towers included): the point for
    /// `Pillar`, the segment start for `Edge`
    pub way_index: usize,
    pub position: SnappedPosition,
    pub snapped_point: Coord,
    /// Meters between the query point and the snapped point
    pub query_distance: f64,
}

impl Snap {
    /// Classify a projection onto segment `segment` of `edge`'s geometry.
    pub fn from_projection(
        query_point: Coord,
        edge: EdgeRef,
        geometry: &[Coord],
        segment: usize,
        t: f64,
        snapped_point: Coord,
        query_distance: f64,
    ) -> Self {
        let last = geometry.len() - 1;
        let (position, way_index, snapped_point, closest_node) = if t <= 0.0 {
            if segment == 0 {
                (SnappedPosition::Tower, 0, geometry[0], edge.base)
            } else {
                (SnappedPosition::Pillar, segment, geometry[segment], NO_NODE)
            }
        } else if t >= 1.0 {
            if segment + 1 == last {
                (SnappedPosition::Tower, last, geometry[last], edge.adj)
            } else {
                (SnappedPosition::Pillar, segment + 1, geometry[segment + 1], NO_NODE)
            }
        } else {
            (SnappedPosition::Edge, segment, snapped_point, NO_NODE)
        };

        Self {
            query_point,
            closest_edge: edge,
            closest_node,
            way_index,
            position,
            snapped_point,
            query_distance,
        }
    }

    pub fn is_tower(&self) -> bool {
        self.position == SnappedPosition::Tower
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeAttrs;

    fn edge() -> EdgeRef {
        EdgeRef {
            edge: 0,
            base: 10,
            adj: 11,
            distance: 1.0,
            attrs: EdgeAttrs::both_ways(10.0),
            reversed: false,
        }
    }

    #[test]
    fn test_classification() {
        let geom = [
            Coord::new(0.0, 0.0),
            Coord::new(0.0, 1.0),
            Coord::new(0.0, 2.0),
        ];
        let q = Coord::new(0.1, 0.5);

        let s = Snap::from_projection(q, edge(), &geom, 0, 0.0, geom[0], 1.0);
        assert!(s.is_tower());
        assert_eq!(s.closest_node, 10);

        let s = Snap::from_projection(q, edge(), &geom, 0, 1.0, geom[1], 1.0);
        assert_eq!((s.position, s.way_index), (SnappedPosition::Pillar, 1));

        let s = Snap::from_projection(q, edge(), &geom, 1, 1.0, geom[2], 1.0);
        assert_eq!((s.position, s.closest_node), (SnappedPosition::Tower, 11));

        let mid = Coord::new(0.0, 0.5);
        let s = Snap::from_projection(q, edge(), &geom, 0, 0.5, mid, 1.0);
        assert_eq!((s.position, s.way_index), (SnappedPosition::Edge, 0));
        assert_eq!(s.snapped_point, mid);
    }
}
