//! Randomized cross-checking of search engines
//!
//! Runs the same random (source, target) pairs through a reference engine
//! (normally unidirectional Dijkstra) and a candidate, and compares weights.

use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::error::SearchError;
use crate::graph::NodeId;
use crate::search::Path;

/// Relative tolerance for comparing path weights
const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Compare `candidate` against `reference` on `n_tests` random pairs drawn from `0..n_nodes`.
pub fn cross_check<R, C>(
    n_nodes: usize,
    n_tests: usize,
    seed: u64,
    mut reference: R,
    mut candidate: C,
) -> ValidationResult
where
    R: FnMut(NodeId, NodeId) -> Result<Path, SearchError>,
    C: FnMut(NodeId, NodeId) -> Result<Path, SearchError>,
{
    let mut rng = StdRng::seed_from_u64(seed);

    let mut correct = 0;
    let mut incorrect = 0;
    let mut unreachable_both = 0;
    let mut errors: Vec<ValidationError> = Vec::new();

    if n_nodes == 0 {
        return ValidationResult::default();
    }

    for i in 0..n_tests {
        let source = rng.random_range(0..n_nodes) as NodeId;
        let target = rng.random_range(0..n_nodes) as NodeId;

        let expected = path_weight(reference(source, target), source, target);
        let actual = path_weight(candidate(source, target), source, target);

        if expected.is_infinite() && actual.is_infinite() {
            unreachable_both += 1;
            correct += 1;
        } else if weights_match(expected, actual) {
            correct += 1;
        } else {
            incorrect += 1;
            if errors.len() < 10 {
                errors.push(ValidationError {
                    source,
                    target,
                    reference_weight: expected,
                    candidate_weight: actual,
                });
            }
        }

        if (i + 1) % 100 == 0 {
            debug!(done = i + 1, n_tests, correct, incorrect, "cross-check progress");
        }
    }

    ValidationResult {
        n_tests,
        correct,
        incorrect,
        unreachable_both,
        errors,
    }
}

/// Weight of a found path, infinity when not found, NaN on error
fn path_weight(result: Result<Path, SearchError>, source: NodeId, target: NodeId) -> f64 {
    match result {
        Ok(path) if path.found => path.weight,
        Ok(_) => f64::INFINITY,
        Err(e) => {
            warn!(source, target, error = %e, "search failed during cross-check");
            f64::NAN
        }
    }
}

fn weights_match(a: f64, b: f64) -> bool {
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    (a - b).abs() <= WEIGHT_TOLERANCE * a.abs().max(1.0)
}

#[derive(Debug, Default)]
pub struct ValidationResult {
    pub n_tests: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unreachable_both: usize,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Summary of one engine pair, named as given.
    pub fn print(&self, reference: &str, candidate: &str) {
        let pct = |n: usize| n as f64 * 100.0 / self.n_tests.max(1) as f64;
        println!(
            "  {candidate} vs {reference}: {} pairs, relative tolerance {:e}",
            self.n_tests, WEIGHT_TOLERANCE
        );
        println!("    agree        {:>8} ({:.2}%)", self.correct, pct(self.correct));
        println!("    disagree     {:>8} ({:.2}%)", self.incorrect, pct(self.incorrect));
        println!("    unreachable  {:>8}", self.unreachable_both);
        for err in &self.errors {
            println!(
                "    {} -> {}: {reference}={:.3} {candidate}={:.3}",
                err.source, err.target, err.reference_weight, err.candidate_weight
            );
        }
        println!("    {}", if self.is_valid() { "ok" } else { "MISMATCH" });
    }

    pub fn is_valid(&self) -> bool {
        self.incorrect == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub source: NodeId,
    pub target: NodeId,
    pub reference_weight: f64,
    pub candidate_weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(weight: f64) -> Path {
        Path {
            found: true,
            weight,
            ..Path::not_found(0, 1)
        }
    }

    #[test]
    fn test_agreeing_engines() {
        let result = cross_check(10, 50, 1, |_, _| Ok(path(3.0)), |_, _| Ok(path(3.0 + 1e-9)));
        assert!(result.is_valid());
        assert_eq!(result.correct, 50);
    }

    #[test]
    fn test_mismatch_is_recorded() {
        let result = cross_check(
            10,
            20,
            1,
            |_, _| Ok(path(3.0)),
            |s, _| Ok(if s % 2 == 0 { path(3.0) } else { path(4.0) }),
        );
        assert!(!result.is_valid());
        assert_eq!(result.correct + result.incorrect, 20);
        assert!(result.errors.len() <= 10);
        assert!(result.errors.iter().all(|e| e.source % 2 == 1));
    }

    #[test]
    fn test_both_unreachable_counts_as_correct() {
        let result = cross_check(
            5,
            10,
            2,
            |s, t| Ok(Path::not_found(s, t)),
            |s, t| Ok(Path::not_found(s, t)),
        );
        assert_eq!(result.unreachable_both, 10);
        assert!(result.is_valid());
    }

    #[test]
    fn test_errors_never_match() {
        let result = cross_check(
            5,
            3,
            2,
            |_, _| Ok(path(1.0)),
            |_, _| {
                Err(SearchError::MaxVisitedNodesExceeded {
                    limit: 0,
                    visited: 0,
                })
            },
        );
        assert_eq!(result.incorrect, 3);
    }
}
