//! Turn cost table keyed by via node
//!
//! Only a small share of junctions carry explicit rules, so lookups first
//! check a set of restricted nodes and fall through to "free turn".
//!
//! ## Rule kinds
//!
//! - **Ban**: cannot turn from `from_edge` to `to_edge` at `via`
//! - **Only**: from `from_edge` at `via`, the listed `to_edge`s are the only legal exits
//! - **Penalty**: the turn is legal but costs extra weight
//!
//! Turning back onto the edge you arrived on is a u-turn. U-turns are
//! forbidden unless a finite u-turn cost is configured.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::graph::{EdgeId, NodeId, NO_EDGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRuleKind {
    Ban,
    Only,
    Penalty,
}

#[derive(Debug, Clone)]
struct NodeRule {
    from_edge: EdgeId,
    to_edge: EdgeId,
    kind: TurnRuleKind,
    /// Extra weight, only meaningful for `Penalty`
    cost: f64,
}

#[derive(Debug, Clone)]
pub struct TurnCostTable {
    restricted_nodes: FxHashSet<NodeId>,
    rules: FxHashMap<NodeId, Vec<NodeRule>>,
    /// (via, from_edge) -> allowed to_edges
    only_allowed: FxHashMap<(NodeId, EdgeId), FxHashSet<EdgeId>>,
    u_turn_cost: f64,
}

impl Default for TurnCostTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnCostTable {
    pub fn new() -> Self {
        Self {
            restricted_nodes: FxHashSet::default(),
            rules: FxHashMap::default(),
            only_allowed: FxHashMap::default(),
            u_turn_cost: f64::INFINITY,
        }
    }

    /// Cost of turning back onto the arrival edge; `INFINITY` forbids u-turns.
    pub fn with_u_turn_cost(mut self, cost: f64) -> Self {
        self.u_turn_cost = cost;
        self
    }

    pub fn u_turn_cost(&self) -> f64 {
        self.u_turn_cost
    }

    pub fn add_ban(&mut self, via: NodeId, from_edge: EdgeId, to_edge: EdgeId) {
        self.push_rule(via, from_edge, to_edge, TurnRuleKind::Ban, f64::INFINITY);
    }

    pub fn add_only(&mut self, via: NodeId, from_edge: EdgeId, to_edge: EdgeId) {
        self.push_rule(via, from_edge, to_edge, TurnRuleKind::Only, 0.0);
        self.only_allowed
            .entry((via, from_edge))
            .or_default()
            .insert(to_edge);
    }

    pub fn add_penalty(&mut self, via: NodeId, from_edge: EdgeId, to_edge: EdgeId, cost: f64) {
        self.push_rule(via, from_edge, to_edge, TurnRuleKind::Penalty, cost);
    }

    fn push_rule(
        &mut self,
        via: NodeId,
        from_edge: EdgeId,
        to_edge: EdgeId,
        kind: TurnRuleKind,
        cost: f64,
    ) {
        self.restricted_nodes.insert(via);
        self.rules.entry(via).or_default().push(NodeRule {
            from_edge,
            to_edge,
            kind,
            cost,
        });
    }

    #[inline]
    pub fn is_restricted(&self, node: NodeId) -> bool {
        self.restricted_nodes.contains(&node)
    }

    /// Check if a turn is legal, ignoring penalties and u-turn handling
    pub fn is_turn_allowed(&self, via: NodeId, from_edge: EdgeId, to_edge: EdgeId) -> bool {
        if !self.restricted_nodes.contains(&via) {
            return true;
        }

        if let Some(allowed) = self.only_allowed.get(&(via, from_edge)) {
            if !allowed.contains(&to_edge) {
                return false;
            }
        }

        match self.rules.get(&via) {
            Some(rules) => !rules.iter().any(|r| {
                r.kind == TurnRuleKind::Ban && r.from_edge == from_edge && r.to_edge == to_edge
            }),
            None => true,
        }
    }

    /// Weight of turning from `in_edge` to `out_edge` at `via`.
    ///
    /// Zero when either side is `NO_EDGE` (start or end of a path).
    pub fn turn_cost(&self, in_edge: EdgeId, via: NodeId, out_edge: EdgeId) -> f64 {
        if in_edge == NO_EDGE || out_edge == NO_EDGE {
            return 0.0;
        }
        if in_edge == out_edge {
            return self.u_turn_cost;
        }
        if !self.restricted_nodes.contains(&via) {
            return 0.0;
        }
        if !self.is_turn_allowed(via, in_edge, out_edge) {
            return f64::INFINITY;
        }

        self.rules
            .get(&via)
            .map(|rules| {
                rules
                    .iter()
                    .filter(|r| {
                        r.kind == TurnRuleKind::Penalty
                            && r.from_edge == in_edge
                            && r.to_edge == out_edge
                    })
                    .map(|r| r.cost)
                    .sum()
            })
            .unwrap_or(0.0)
    }

    pub fn n_restricted_nodes(&self) -> usize {
        self.restricted_nodes.len()
    }

    pub fn n_rules(&self) -> usize {
        self.rules.values().map(|v| v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table() -> TurnCostTable {
        let mut table = TurnCostTable::new();

        // Node 100: ban turn from edge 1 to edge 2
        table.add_ban(100, 1, 2);

        // Node 200: only turn from edge 3 to edge 4
        table.add_only(200, 3, 4);

        // Node 300: penalise 5 -> 6
        table.add_penalty(300, 5, 6, 12.5);

        table
    }

    #[test]
    fn test_unrestricted_node() {
        let table = make_table();
        assert!(table.is_turn_allowed(999, 1, 2));
        assert_eq!(table.turn_cost(1, 999, 2), 0.0);
    }

    #[test]
    fn test_ban_restriction() {
        let table = make_table();

        // Banned turn
        assert!(!table.is_turn_allowed(100, 1, 2));
        assert_eq!(table.turn_cost(1, 100, 2), f64::INFINITY);

        // Other turns at same node are allowed
        assert!(table.is_turn_allowed(100, 1, 3));
        assert!(table.is_turn_allowed(100, 2, 1));
    }

    #[test]
    fn test_only_restriction() {
        let table = make_table();

        assert!(table.is_turn_allowed(200, 3, 4));
        assert!(!table.is_turn_allowed(200, 3, 5));

        // Different from_edge is not affected
        assert!(table.is_turn_allowed(200, 7, 5));
    }

    #[test]
    fn test_penalty() {
        let table = make_table();
        assert!(table.is_turn_allowed(300, 5, 6));
        assert_eq!(table.turn_cost(5, 300, 6), 12.5);
        assert_eq!(table.turn_cost(6, 300, 5), 0.0);
    }

    #[test]
    fn test_u_turn_and_path_ends() {
        let table = make_table();
        assert_eq!(table.turn_cost(8, 42, 8), f64::INFINITY);
        assert_eq!(table.turn_cost(NO_EDGE, 100, 2), 0.0);
        assert_eq!(table.turn_cost(1, 100, NO_EDGE), 0.0);

        let lenient = TurnCostTable::new().with_u_turn_cost(40.0);
        assert_eq!(lenient.turn_cost(8, 42, 8), 40.0);
    }

    #[test]
    fn test_counts() {
        let table = make_table();
        assert_eq!(table.n_restricted_nodes(), 3);
        assert_eq!(table.n_rules(), 3);
        assert!(table.is_restricted(100));
        assert!(!table.is_restricted(101));
    }
}
