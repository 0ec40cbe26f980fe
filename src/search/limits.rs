//! Per-query resource limits, checked once per loop iteration

use std::time::{Duration, Instant};

use crate::config::SearchOptions;
use crate::error::SearchError;

#[derive(Debug, Clone, Copy)]
pub(crate) struct SearchLimits {
    max_visited_nodes: Option<usize>,
    timeout: Option<Duration>,
    started: Instant,
}

impl SearchLimits {
    pub fn start(options: &SearchOptions) -> Self {
        Self {
            max_visited_nodes: options.max_visited_nodes,
            timeout: options.timeout(),
            started: Instant::now(),
        }
    }

    /// At most `max_visited_nodes` entries are settled; a budget of 0 fails at once.
    pub fn check(&self, visited: usize) -> Result<(), SearchError> {
        if let Some(limit) = self.max_visited_nodes {
            if visited >= limit {
                return Err(SearchError::MaxVisitedNodesExceeded { limit, visited });
            }
        }
        if let Some(timeout) = self.timeout {
            let elapsed = self.started.elapsed();
            if elapsed > timeout {
                return Err(SearchError::TimeoutExceeded {
                    limit_ms: timeout.as_millis() as u64,
                    elapsed_ms: elapsed.as_millis() as u64,
                    visited,
                });
            }
        }
        Ok(())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
