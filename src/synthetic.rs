//! Seeded synthetic road networks for benchmarks and cross-checks
//!
//! A `rows x cols` grid of junctions with random speeds, some one-way
//! streets and some bent streets (one pillar off the straight line).

use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GraphError;
use crate::geo::Coord;
use crate::graph::{BaseGraph, BaseGraphBuilder, EdgeAttrs, EdgeSpec, Graph, NodeId};
use crate::weighting::TurnCostTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    /// South-west corner
    pub origin: Coord,
    /// Distance between neighbouring junctions, in degrees
    pub spacing_deg: f64,
    /// Share of streets that are one-way
    pub oneway_ratio: f64,
    /// Share of streets with a pillar
    pub bend_ratio: f64,
    pub min_speed_kmh: f64,
    pub max_speed_kmh: f64,
    pub seed: u64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            rows: 20,
            cols: 20,
            origin: Coord::new(50.80, 4.30),
            spacing_deg: 0.002,
            oneway_ratio: 0.1,
            bend_ratio: 0.2,
            min_speed_kmh: 30.0,
            max_speed_kmh: 90.0,
            seed: 42,
        }
    }
}

impl GridSpec {
    pub fn new(rows: usize, cols: usize, seed: u64) -> Self {
        Self {
            rows,
            cols,
            seed,
            ..Self::default()
        }
    }

    pub fn node_id(&self, row: usize, col: usize) -> NodeId {
        (row * self.cols + col) as NodeId
    }

    /// South-west and north-east corners of the grid
    pub fn bounds(&self) -> (Coord, Coord) {
        let max = Coord::new(
            self.origin.lat + (self.rows.saturating_sub(1)) as f64 * self.spacing_deg,
            self.origin.lon + (self.cols.saturating_sub(1)) as f64 * self.spacing_deg,
        );
        (self.origin, max)
    }

    pub fn build(&self) -> Result<BaseGraph, GraphError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let n_nodes = self.rows * self.cols;
        let mut builder = BaseGraphBuilder::with_capacity(n_nodes, 2 * n_nodes);

        for row in 0..self.rows {
            for col in 0..self.cols {
                builder.add_node(Coord::new(
                    self.origin.lat + row as f64 * self.spacing_deg,
                    self.origin.lon + col as f64 * self.spacing_deg,
                ))?;
            }
        }

        for row in 0..self.rows {
            for col in 0..self.cols {
                let here = self.node_id(row, col);
                if col + 1 < self.cols {
                    let spec = self.street(&mut rng, here, self.node_id(row, col + 1), row, col, false);
                    builder.add_edge(spec)?;
                }
                if row + 1 < self.rows {
                    let spec = self.street(&mut rng, here, self.node_id(row + 1, col), row, col, true);
                    builder.add_edge(spec)?;
                }
            }
        }

        let graph = builder.build();
        debug!(
            rows = self.rows,
            cols = self.cols,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "generated grid network"
        );
        Ok(graph)
    }

    fn street(
        &self,
        rng: &mut StdRng,
        from: NodeId,
        to: NodeId,
        row: usize,
        col: usize,
        north: bool,
    ) -> EdgeSpec {
        let speed = rng.random_range(self.min_speed_kmh..=self.max_speed_kmh);
        let oneway = rng.random_bool(self.oneway_ratio.clamp(0.0, 1.0));
        let (from, to) = if oneway && rng.random_bool(0.5) {
            (to, from)
        } else {
            (from, to)
        };
        let attrs = if oneway {
            EdgeAttrs::oneway(speed)
        } else {
            EdgeAttrs::both_ways(speed)
        };

        let mut spec = EdgeSpec::new(from, to, attrs);
        if rng.random_bool(self.bend_ratio.clamp(0.0, 1.0)) {
            let lat = self.origin.lat + row as f64 * self.spacing_deg;
            let lon = self.origin.lon + col as f64 * self.spacing_deg;
            let offset = rng.random_range(0.1..0.3) * self.spacing_deg;
            let half = 0.5 * self.spacing_deg;
            let pillar = if north {
                Coord::new(lat + half, lon + offset)
            } else {
                Coord::new(lat + offset, lon + half)
            };
            spec = spec.pillars(vec![pillar]);
        }
        spec
    }

    /// `n` uniformly random points inside the grid's bounds.
    pub fn random_points(&self, n: usize, seed: u64) -> Vec<Coord> {
        let mut rng = StdRng::seed_from_u64(seed);
        let (min, max) = self.bounds();
        (0..n)
            .map(|_| {
                Coord::new(
                    min.lat + rng.random::<f64>() * (max.lat - min.lat),
                    min.lon + rng.random::<f64>() * (max.lon - min.lon),
                )
            })
            .collect()
    }
}

/// Random bans and penalties at junctions with at least three streets.
pub fn random_turn_costs<G: Graph>(graph: &G, n_rules: usize, seed: u64) -> TurnCostTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut table = TurnCostTable::new();
    if graph.node_count() == 0 {
        return table;
    }

    for _ in 0..n_rules {
        let via = rng.random_range(0..graph.node_count()) as NodeId;
        let edges: Vec<_> = graph.edges_from(via).map(|e| e.edge).collect();
        if edges.len() < 3 {
            continue;
        }
        let from = edges[rng.random_range(0..edges.len())];
        let to = edges[rng.random_range(0..edges.len())];
        if from == to {
            continue;
        }
        if rng.random_bool(0.5) {
            table.add_ban(via, from, to);
        } else {
            table.add_penalty(via, from, to, rng.random_range(1.0..30.0));
        }
    }
    table
}
