//! A* heuristics
//!
//! The beeline estimate is `distance(node, goal) * min_weight_per_distance`,
//! which never overestimates as long as the weighting's lower bound holds.
//! `epsilon > 1` inflates it and gives up exactness for fewer settled nodes.

use crate::geo::{Coord, DistanceCalc};

/// Estimate of the remaining weight from a coordinate to the goal.
pub trait Heuristic {
    fn estimate(&self, at: Coord) -> f64;

    /// False for the zero heuristic, so engines can skip coordinate lookups.
    fn is_informed(&self) -> bool {
        true
    }
}

/// Plain Dijkstra
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHeuristic;

impl Heuristic for NoHeuristic {
    #[inline]
    fn estimate(&self, _at: Coord) -> f64 {
        0.0
    }

    fn is_informed(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BeelineHeuristic {
    goal: Coord,
    calc: DistanceCalc,
    factor: f64,
}

impl BeelineHeuristic {
    pub fn new(goal: Coord, calc: DistanceCalc, min_weight_per_distance: f64, epsilon: f64) -> Self {
        Self {
            goal,
            calc,
            factor: min_weight_per_distance * epsilon,
        }
    }
}

impl Heuristic for BeelineHeuristic {
    #[inline]
    fn estimate(&self, at: Coord) -> f64 {
        self.calc.distance(at, self.goal) * self.factor
    }
}

/// Potential pair for bidirectional search.
///
/// Forward and backward keys must be consistent with each other; the
/// balanced form `p_f = (h_t - h_s) / 2`, `p_b = -p_f` guarantees that.
pub trait Potential {
    fn forward(&self, at: Coord) -> f64;

    fn backward(&self, at: Coord) -> f64;

    fn is_informed(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroPotential;

impl Potential for ZeroPotential {
    #[inline]
    fn forward(&self, _at: Coord) -> f64 {
        0.0
    }

    #[inline]
    fn backward(&self, _at: Coord) -> f64 {
        0.0
    }

    fn is_informed(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BalancedPotential {
    to_target: BeelineHeuristic,
    to_source: BeelineHeuristic,
}

impl BalancedPotential {
    pub fn new(
        source: Coord,
        target: Coord,
        calc: DistanceCalc,
        min_weight_per_distance: f64,
        epsilon: f64,
    ) -> Self {
        Self {
            to_target: BeelineHeuristic::new(target, calc, min_weight_per_distance, epsilon),
            to_source: BeelineHeuristic::new(source, calc, min_weight_per_distance, epsilon),
        }
    }
}

impl Potential for BalancedPotential {
    #[inline]
    fn forward(&self, at: Coord) -> f64 {
        0.5 * (self.to_target.estimate(at) - self.to_source.estimate(at))
    }

    #[inline]
    fn backward(&self, at: Coord) -> f64 {
        -self.forward(at)
    }
}
