//! Edge and turn weightings
//!
//! A weighting turns an oriented edge into a non-negative cost. `INFINITY`
//! means "not traversable" and every engine treats it as a pruned edge.

mod turn_costs;

pub use turn_costs::{TurnCostTable, TurnRuleKind};

use crate::graph::{EdgeId, EdgeRef, NodeId};

pub trait Weighting {
    fn name(&self) -> &str;

    /// Cost of traversing `edge`; `reverse` means adj -> base.
    fn edge_weight(&self, edge: &EdgeRef, reverse: bool) -> f64;

    fn edge_millis(&self, edge: &EdgeRef, reverse: bool) -> u64;

    /// Lower bound of weight per meter, used to scale beeline heuristics
    fn min_weight_per_distance(&self) -> f64;

    fn turn_weight(&self, _in_edge: EdgeId, _via: NodeId, _out_edge: EdgeId) -> f64 {
        0.0
    }

    fn turn_millis(&self, _in_edge: EdgeId, _via: NodeId, _out_edge: EdgeId) -> u64 {
        0
    }

    fn has_turn_costs(&self) -> bool {
        false
    }
}

#[inline]
fn travel_millis(distance_m: f64, speed_kmh: f64) -> u64 {
    if speed_kmh <= 0.0 {
        return 0;
    }
    (distance_m / (speed_kmh / 3.6) * 1000.0).round() as u64
}

/// Weight = meters. Turn penalties are read as meters too.
#[derive(Debug, Clone, Default)]
pub struct ShortestWeighting {
    turn_costs: Option<TurnCostTable>,
}

impl ShortestWeighting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_turn_costs(turn_costs: TurnCostTable) -> Self {
        Self {
            turn_costs: Some(turn_costs),
        }
    }
}

impl Weighting for ShortestWeighting {
    fn name(&self) -> &str {
        "shortest"
    }

    fn edge_weight(&self, edge: &EdgeRef, reverse: bool) -> f64 {
        if !edge.attrs.access(reverse) {
            return f64::INFINITY;
        }
        edge.distance
    }

    fn edge_millis(&self, edge: &EdgeRef, reverse: bool) -> u64 {
        travel_millis(edge.distance, edge.attrs.speed_kmh(reverse))
    }

    fn min_weight_per_distance(&self) -> f64 {
        1.0
    }

    fn turn_weight(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> f64 {
        self.turn_costs
            .as_ref()
            .map_or(0.0, |t| t.turn_cost(in_edge, via, out_edge))
    }

    fn has_turn_costs(&self) -> bool {
        self.turn_costs.is_some()
    }
}

/// Weight = seconds of travel time. Turn penalties are seconds.
#[derive(Debug, Clone)]
pub struct FastestWeighting {
    max_speed_kmh: f64,
    turn_costs: Option<TurnCostTable>,
}

impl FastestWeighting {
    /// `max_speed_kmh` must bound every edge speed, or A* stops being exact.
    pub fn new(max_speed_kmh: f64) -> Self {
        Self {
            max_speed_kmh,
            turn_costs: None,
        }
    }

    pub fn with_turn_costs(mut self, turn_costs: TurnCostTable) -> Self {
        self.turn_costs = Some(turn_costs);
        self
    }
}

impl Weighting for FastestWeighting {
    fn name(&self) -> &str {
        "fastest"
    }

    fn edge_weight(&self, edge: &EdgeRef, reverse: bool) -> f64 {
        let speed = edge.attrs.speed_kmh(reverse);
        if !edge.attrs.access(reverse) || speed <= 0.0 {
            return f64::INFINITY;
        }
        edge.distance / (speed / 3.6)
    }

    fn edge_millis(&self, edge: &EdgeRef, reverse: bool) -> u64 {
        travel_millis(edge.distance, edge.attrs.speed_kmh(reverse))
    }

    fn min_weight_per_distance(&self) -> f64 {
        3.6 / self.max_speed_kmh
    }

    fn turn_weight(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> f64 {
        self.turn_costs
            .as_ref()
            .map_or(0.0, |t| t.turn_cost(in_edge, via, out_edge))
    }

    fn turn_millis(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> u64 {
        let w = self.turn_weight(in_edge, via, out_edge);
        if w.is_finite() {
            (w * 1000.0).round() as u64
        } else {
            0
        }
    }

    fn has_turn_costs(&self) -> bool {
        self.turn_costs.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeAttrs;

    fn edge(attrs: EdgeAttrs) -> EdgeRef {
        EdgeRef {
            edge: 0,
            base: 0,
            adj: 1,
            distance: 1000.0,
            attrs,
            reversed: false,
        }
    }

    #[test]
    fn test_shortest_respects_access() {
        let w = ShortestWeighting::new();
        let e = edge(EdgeAttrs::oneway(36.0));
        assert_eq!(w.edge_weight(&e, false), 1000.0);
        assert_eq!(w.edge_weight(&e, true), f64::INFINITY);
        assert_eq!(w.edge_millis(&e, false), 100_000);
        assert!(!w.has_turn_costs());
    }

    #[test]
    fn test_fastest_seconds() {
        let w = FastestWeighting::new(72.0);
        let e = edge(EdgeAttrs::both_ways(36.0));
        assert!((w.edge_weight(&e, false) - 100.0).abs() < 1e-9);
        assert!((w.min_weight_per_distance() - 0.05).abs() < 1e-12);
        // beeline bound never exceeds the real cost
        assert!(w.min_weight_per_distance() * e.distance <= w.edge_weight(&e, true));
    }

    #[test]
    fn test_turn_costs_flow_through() {
        let mut table = TurnCostTable::new();
        table.add_penalty(1, 0, 2, 7.0);
        let w = FastestWeighting::new(50.0).with_turn_costs(table);
        assert!(w.has_turn_costs());
        assert_eq!(w.turn_weight(0, 1, 2), 7.0);
        assert_eq!(w.turn_millis(0, 1, 2), 7000);
        assert_eq!(w.turn_millis(0, 1, 0), 0);
    }
}
