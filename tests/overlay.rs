//! Routing between snapped coordinates.

mod common;

use butterfly_search::error::GraphError;
use butterfly_search::geo::Coord;
use butterfly_search::graph::ch::ChGraph;
use butterfly_search::graph::{BaseGraph, BaseGraphBuilder, EdgeAttrs, EdgeSpec};
use butterfly_search::overlay::{
    EdgeOrigin, LocationIndex, NodeOrigin, QueryOverlayBuilder, SnappedPosition, DEFAULT_MAX_CANDIDATES,
};
use butterfly_search::search::{self, ChBidirection, Dijkstra, WeightedGraph};
use butterfly_search::synthetic::GridSpec;
use butterfly_search::weighting::{FastestWeighting, ShortestWeighting};
use butterfly_search::{Graph, SearchOptions};

use common::{contract, random_order};

/// 0 --- 1 --- 2 along the equator, 0.001 degrees apart
fn line() -> BaseGraph {
    let mut b = BaseGraphBuilder::new();
    for i in 0..3 {
        b.add_node(Coord::new(0.0, 0.001 * i as f64)).expect("node");
    }
    b.add_edge(EdgeSpec::new(0, 1, EdgeAttrs::both_ways(50.0)))
        .expect("edge");
    b.add_edge(EdgeSpec::new(1, 2, EdgeAttrs::both_ways(50.0)))
        .expect("edge");
    b.build()
}

#[test]
fn test_mid_edge_snap_adds_one_node() {
    let g = line();
    let index = LocationIndex::build(&g);
    let overlay = QueryOverlayBuilder::new(&g, &index)
        .build(&[Coord::new(0.0001, 0.0005)])
        .expect("snaps");

    assert_eq!(overlay.snaps()[0].position, SnappedPosition::Edge);
    assert_eq!(overlay.virtual_node_count(), 1);
    assert_eq!(overlay.virtual_edge_count(), 2);
    assert_eq!(overlay.base_node_count(), 3);
    assert_eq!(overlay.base_edge_count(), 2);
    assert_eq!(overlay.node_count(), 4);
    assert_eq!(overlay.edge_count(), 4);

    let v = overlay.closest_node(0).expect("one snap");
    assert_eq!(overlay.resolve_node(v), NodeOrigin::Virtual(0));
    assert!(overlay.is_virtual_node(v));
    // the split edge is hidden, both pieces show up instead
    let at_zero: Vec<_> = overlay.edges_from(0).map(|e| e.adj).collect();
    assert_eq!(at_zero, vec![v]);
}

#[test]
fn test_tower_snap_adds_nothing() {
    let g = line();
    let index = LocationIndex::build(&g);
    let overlay = QueryOverlayBuilder::new(&g, &index)
        .build(&[Coord::new(0.00001, 0.0025)])
        .expect("snaps");

    assert!(overlay.snaps()[0].is_tower());
    assert_eq!(overlay.closest_node(0), Some(2));
    assert_eq!(overlay.virtual_node_count(), 0);
    assert_eq!(overlay.node_count(), g.node_count());
    assert_eq!(overlay.edge_count(), g.edge_count());
}

#[test]
fn test_route_from_snapped_point() {
    let g = line();
    let index = LocationIndex::build(&g);
    let overlay = QueryOverlayBuilder::new(&g, &index)
        .build(&[Coord::new(0.0001, 0.0005), Coord::new(0.0, 0.002)])
        .expect("snaps");
    let (from, to) = (
        overlay.closest_node(0).expect("from"),
        overlay.closest_node(1).expect("to"),
    );
    assert_eq!(to, 2);

    let w = ShortestWeighting::new();
    let wg = WeightedGraph::new(&overlay, &w);
    let path = search::calc_path(&wg, &SearchOptions::default(), from, to).expect("search runs");

    assert!(path.found);
    assert_eq!(path.calc_nodes(&overlay), vec![from, 1, 2]);
    assert!(matches!(
        overlay.resolve_edge(path.edges[0]),
        EdgeOrigin::Virtual { original: 0, .. }
    ));
    assert_eq!(overlay.resolve_edge(path.edges[1]), EdgeOrigin::Base(1));
    // half a hop plus a full hop of roughly 111 m
    assert!((path.distance - 166.8).abs() < 0.5, "{}", path.distance);
}

#[test]
fn test_two_snaps_on_one_edge() {
    let g = line();
    let index = LocationIndex::build(&g);
    let overlay = QueryOverlayBuilder::new(&g, &index)
        .build(&[Coord::new(0.0001, 0.0008), Coord::new(-0.0001, 0.0002)])
        .expect("snaps");
    assert_eq!(overlay.virtual_node_count(), 2);
    assert_eq!(overlay.virtual_edge_count(), 3);

    let w = ShortestWeighting::new();
    let wg = WeightedGraph::new(&overlay, &w);
    let from = overlay.closest_node(0).expect("from");
    let to = overlay.closest_node(1).expect("to");
    let path = Dijkstra::new(&wg, &SearchOptions::default())
        .expect("options")
        .calc_path(from, to)
        .expect("search runs");

    // straight along the middle piece, never touching a tower
    assert_eq!(path.calc_nodes(&overlay), vec![from, to]);
    assert_eq!(path.edges.len(), 1);
    assert!((path.distance - 66.7).abs() < 0.5, "{}", path.distance);
}

#[test]
fn test_ch_over_overlay_matches_dijkstra() {
    let spec = GridSpec::new(6, 6, 3);
    let g = spec.build().expect("grid");
    let w = FastestWeighting::new(g.max_speed_kmh());
    let storage = contract(&g, &w, &random_order(g.node_count(), 17), false);
    let index = LocationIndex::build(&g);

    // virtual ids must not land on shortcut ids
    let plain = QueryOverlayBuilder::new(&g, &index)
        .build(&spec.random_points(2, 1))
        .expect("snaps");
    if plain.virtual_edge_count() > 0 && storage.shortcut_count() > 0 {
        assert!(matches!(
            ChGraph::new(&plain, &w, &storage),
            Err(GraphError::VirtualEdgeIdCollision { .. })
        ));
    }

    let builder = QueryOverlayBuilder::new(&g, &index).for_hierarchy(&storage);
    let points = spec.random_points(40, 9);
    for pair in points.chunks_exact(2) {
        let overlay = builder.build(pair).expect("snaps");
        let from = overlay.closest_node(0).expect("from");
        let to = overlay.closest_node(1).expect("to");

        let wg = WeightedGraph::new(&overlay, &w);
        let reference = search::calc_path(&wg, &SearchOptions::default(), from, to).expect("dijkstra");

        let ch = ChGraph::new(&overlay, &w, &storage).expect("hierarchy");
        for stall in [true, false] {
            let options = SearchOptions::default().with_stall_on_demand(stall);
            let path = ChBidirection::new(&ch, &options)
                .expect("options")
                .calc_path(from, to)
                .expect("ch");
            assert_eq!(path.found, reference.found, "{from}->{to}");
            if path.found {
                // pieces of a split edge are measured slightly differently
                let tolerance = 1e-4 * reference.weight.max(1.0);
                assert!(
                    (path.weight - reference.weight).abs() <= tolerance,
                    "{from}->{to}: {} vs {}",
                    path.weight,
                    reference.weight
                );
                let nodes = path.calc_nodes(&overlay);
                assert_eq!(nodes.first(), Some(&from));
                assert_eq!(nodes.last(), Some(&to));
            }
        }
    }
}

#[test]
fn test_rejected_edges_do_not_use_up_candidates() {
    // twenty rejected edges hug the point, the accepted one is far off
    let mut b = BaseGraphBuilder::new();
    for k in 0..=DEFAULT_MAX_CANDIDATES as u32 + 4 {
        let lat = if k as usize > DEFAULT_MAX_CANDIDATES + 3 {
            0.01
        } else {
            0.0001 * (k + 1) as f64
        };
        let a = b.add_node(Coord::new(lat, 0.0)).expect("node");
        let c = b.add_node(Coord::new(lat, 0.001)).expect("node");
        b.add_edge(EdgeSpec::new(a, c, EdgeAttrs::both_ways(50.0)))
            .expect("edge");
    }
    let g = b.build();
    let accepted = (g.edge_count() - 1) as u32;
    let index = LocationIndex::build(&g);

    let overlay = QueryOverlayBuilder::new(&g, &index)
        .build_with_filter(&[Coord::new(0.0, 0.0005)], |e| e.edge == accepted)
        .expect("the far edge is still eligible");
    let snap = &overlay.snaps()[0];
    assert_eq!(snap.closest_edge.edge, accepted);
    assert_eq!(snap.position, SnappedPosition::Edge);
    assert!((snap.snapped_point.lat - 0.01).abs() < 1e-12);
}

/// Node 0 with one loop through (0, 0.001), (0.001, 0.001) and (0.001, 0),
/// stored in that order or the opposite one.
fn loop_graph(clockwise: bool) -> BaseGraph {
    let mut pillars = vec![
        Coord::new(0.0, 0.001),
        Coord::new(0.001, 0.001),
        Coord::new(0.001, 0.0),
    ];
    if clockwise {
        pillars.reverse();
    }
    let mut b = BaseGraphBuilder::new();
    b.add_node(Coord::new(0.0, 0.0)).expect("node");
    b.add_edge(EdgeSpec::new(0, 0, EdgeAttrs::both_ways(50.0)).pillars(pillars))
        .expect("loop");
    b.build()
}

#[test]
fn test_loop_is_cut_the_same_way_in_both_orientations() {
    // one point beside the east side, one beside the north side
    let east = Coord::new(0.0005, 0.0011);
    let north = Coord::new(0.0011, 0.0005);
    let w = ShortestWeighting::new();
    let mut weights = Vec::new();

    for clockwise in [false, true] {
        let g = loop_graph(clockwise);
        let index = LocationIndex::build(&g);
        let overlay = QueryOverlayBuilder::new(&g, &index)
            .build(&[north, east])
            .expect("snaps");
        assert_eq!(overlay.virtual_node_count(), 2);
        assert_eq!(overlay.virtual_edge_count(), 3);

        // cuts follow the loop from the pillar with the lower latitude
        let (n, e) = (
            overlay.closest_node(0).expect("north"),
            overlay.closest_node(1).expect("east"),
        );
        assert_eq!(overlay.resolve_node(e), NodeOrigin::Virtual(0), "clockwise={clockwise}");
        assert_eq!(overlay.resolve_node(n), NodeOrigin::Virtual(1), "clockwise={clockwise}");
        assert_eq!(overlay.edges_from(0).count(), 2);

        let wg = WeightedGraph::new(&overlay, &w);
        let between = search::calc_path(&wg, &SearchOptions::default(), e, n).expect("runs");
        assert_eq!(between.calc_nodes(&overlay), vec![e, n]);
        let from_tower = search::calc_path(&wg, &SearchOptions::default(), 0, n).expect("runs");
        assert_eq!(from_tower.calc_nodes(&overlay), vec![0, n]);
        assert!(matches!(
            overlay.resolve_edge(from_tower.edges[0]),
            EdgeOrigin::Virtual { index: 2, original: 0 }
        ));
        weights.push((between.weight, from_tower.weight));
    }

    // half a side plus half a side, and half a side plus a full side
    let (between, from_tower) = weights[0];
    assert!((between - 111.2).abs() < 0.5, "{between}");
    assert!((from_tower - 166.8).abs() < 0.5, "{from_tower}");
    assert!((weights[1].0 - between).abs() < 1e-6);
    assert!((weights[1].1 - from_tower).abs() < 1e-6);
}
