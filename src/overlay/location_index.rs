//! Spatial index for snapping coordinates onto edge geometry

use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::debug;

use super::snap::Snap;
use crate::error::SnapError;
use crate::geo::{haversine_distance, project_onto_segment, Coord};
use crate::graph::{EdgeId, EdgeRef, Graph, NO_NODE};

/// One straight piece of an edge's geometry, in `[lon, lat]` degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndexedSegment {
    pub a: [f64; 2],
    pub b: [f64; 2],
    pub edge: EdgeId,
    pub segment: u32,
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.a, self.b)
    }
}

impl PointDistance for IndexedSegment {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.b[0] - self.a[0];
        let dy = self.b[1] - self.a[1];
        let len_sq = dx * dx + dy * dy;
        let t = if len_sq > 0.0 {
            (((point[0] - self.a[0]) * dx + (point[1] - self.a[1]) * dy) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let px = self.a[0] + t * dx - point[0];
        let py = self.a[1] + t * dy - point[1];
        px * px + py * py
    }
}

/// R-tree over the segments of every stored edge.
///
/// Queries must be made against the same graph the index was built from.
pub struct LocationIndex {
    tree: RTree<IndexedSegment>,
}

impl LocationIndex {
    pub fn build<G: Graph>(graph: &G) -> Self {
        let mut segments = Vec::with_capacity(graph.base_edge_count() * 2);
        for edge in 0..graph.base_edge_count() as EdgeId {
            let Some(state) = graph.edge_state(edge, NO_NODE) else {
                continue;
            };
            let points = graph.geometry(&state);
            for (i, w) in points.windows(2).enumerate() {
                segments.push(IndexedSegment {
                    a: w[0].to_lon_lat(),
                    b: w[1].to_lon_lat(),
                    edge,
                    segment: i as u32,
                });
            }
        }
        debug!(segments = segments.len(), "built location index");
        Self {
            tree: RTree::bulk_load(segments),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Snap `point` onto the closest edge accepted by `filter`.
    ///
    /// Rejected edges are skipped without counting against `max_candidates`.
    /// Up to that many accepted segments are examined in degree-space order
    /// and the one whose projection is closest in meters wins. `index` is the
    /// position of the point in the caller's request, used in errors.
    pub fn find_closest<G: Graph>(
        &self,
        graph: &G,
        index: usize,
        point: Coord,
        max_candidates: usize,
        filter: impl Fn(&EdgeRef) -> bool,
    ) -> Result<Snap, SnapError> {
        if !point.is_valid() {
            return Err(SnapError::InvalidCoordinate {
                index,
                lat: point.lat,
                lon: point.lon,
            });
        }

        let mut best: Option<(f64, &IndexedSegment, Coord, f64)> = None;
        let eligible = self
            .tree
            .nearest_neighbor_iter(&point.to_lon_lat())
            .filter(|c| {
                graph
                    .edge_state(c.edge, NO_NODE)
                    .is_some_and(|state| filter(&state))
            })
            .take(max_candidates);
        for candidate in eligible {
            let a = Coord::new(candidate.a[1], candidate.a[0]);
            let b = Coord::new(candidate.b[1], candidate.b[0]);
            let (projected, t) = project_onto_segment(point, a, b);
            let meters = haversine_distance(point, projected);
            if best.as_ref().map_or(true, |(d, ..)| meters < *d) {
                best = Some((meters, candidate, projected, t));
            }
        }

        let Some((meters, segment, projected, t)) = best else {
            return Err(SnapError::NoEdgeNearby {
                index,
                lat: point.lat,
                lon: point.lon,
            });
        };
        let Some(state) = graph.edge_state(segment.edge, NO_NODE) else {
            return Err(SnapError::NoEdgeNearby {
                index,
                lat: point.lat,
                lon: point.lon,
            });
        };
        let geometry = graph.geometry(&state);
        Ok(Snap::from_projection(
            point,
            state,
            &geometry,
            segment.segment as usize,
            t,
            projected,
            meters,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{BaseGraphBuilder, EdgeAttrs, EdgeSpec};
    use crate::overlay::SnappedPosition;

    #[test]
    fn test_segment_distance() {
        let s = IndexedSegment {
            a: [0.0, 0.0],
            b: [2.0, 0.0],
            edge: 0,
            segment: 0,
        };
        assert_eq!(s.distance_2(&[1.0, 1.0]), 1.0);
        assert_eq!(s.distance_2(&[3.0, 0.0]), 1.0);
        assert_eq!(s.distance_2(&[-1.0, -1.0]), 2.0);
    }

    #[test]
    fn test_snap_mid_edge_and_tower() {
        let mut b = BaseGraphBuilder::new();
        b.add_node(Coord::new(50.0, 4.0)).unwrap();
        b.add_node(Coord::new(50.0, 4.01)).unwrap();
        b.add_node(Coord::new(50.01, 4.01)).unwrap();
        b.add_edge(EdgeSpec::new(0, 1, EdgeAttrs::both_ways(50.0)))
            .unwrap();
        b.add_edge(EdgeSpec::new(1, 2, EdgeAttrs::oneway(50.0)))
            .unwrap();
        let g = b.build();
        let index = LocationIndex::build(&g);
        assert_eq!(index.len(), 2);

        let snap = index
            .find_closest(&g, 0, Coord::new(50.0005, 4.005), 8, |_| true)
            .unwrap();
        assert_eq!(snap.closest_edge.edge, 0);
        assert_eq!(snap.position, SnappedPosition::Edge);
        assert!((snap.snapped_point.lat - 50.0).abs() < 1e-9);
        assert!(snap.query_distance > 50.0 && snap.query_distance < 60.0);

        let tower = index
            .find_closest(&g, 1, Coord::new(50.0, 4.01), 8, |_| true)
            .unwrap();
        assert!(tower.is_tower());
        assert_eq!(tower.closest_node, 1);
    }

    #[test]
    fn test_filter_and_errors() {
        let mut b = BaseGraphBuilder::new();
        b.add_node(Coord::new(50.0, 4.0)).unwrap();
        b.add_node(Coord::new(50.0, 4.01)).unwrap();
        b.add_edge(EdgeSpec::new(0, 1, EdgeAttrs::both_ways(50.0)))
            .unwrap();
        let g = b.build();
        let index = LocationIndex::build(&g);

        assert_eq!(
            index.find_closest(&g, 3, Coord::new(50.0, 4.005), 8, |_| false),
            Err(SnapError::NoEdgeNearby {
                index: 3,
                lat: 50.0,
                lon: 4.005
            })
        );
        assert!(matches!(
            index.find_closest(&g, 0, Coord::new(f64::NAN, 0.0), 8, |_| true),
            Err(SnapError::InvalidCoordinate { index: 0, .. })
        ));
    }
}
