//! Search frontier: lazy-deletion priority queue over SPT entries
//!
//! The heap may hold stale items for entries that were superseded; they are
//! skipped on poll. `best` maps a traversal id to its current entry.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use super::spt::{EntryIdx, SptArena, SptEntry};
use super::traversal::{TraversalId, TraversalMode};
use crate::graph::{EdgeId, NodeId};

#[derive(Debug, Clone, Copy)]
struct HeapItem {
    key: f64,
    idx: EntryIdx,
}

// Min-heap on key, ties broken by insertion order
impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .total_cmp(&self.key)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapItem {}

/// A proposed entry, produced by expanding a settled entry over one edge.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub id: TraversalId,
    pub parent: EntryIdx,
    pub edge: EdgeId,
    pub orig_edge: EdgeId,
    pub adj_node: NodeId,
    pub weight_of_visited_path: f64,
    pub key: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relaxation {
    Created(EntryIdx),
    Improved(EntryIdx),
    Rejected,
}

impl Relaxation {
    pub fn entry(self) -> Option<EntryIdx> {
        match self {
            Relaxation::Created(idx) | Relaxation::Improved(idx) => Some(idx),
            Relaxation::Rejected => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Frontier {
    arena: SptArena,
    heap: BinaryHeap<HeapItem>,
    best: FxHashMap<TraversalId, EntryIdx>,
    /// Live entries per node, only kept for edge-based traversal
    by_node: Option<FxHashMap<NodeId, Vec<EntryIdx>>>,
}

impl Frontier {
    pub fn new(mode: TraversalMode) -> Self {
        Self {
            arena: SptArena::default(),
            heap: BinaryHeap::new(),
            best: FxHashMap::default(),
            by_node: mode.is_edge_based().then(FxHashMap::default),
        }
    }

    pub fn add_root(&mut self, id: TraversalId, node: NodeId, key: f64) -> EntryIdx {
        let idx = self.arena.push(SptEntry::root(node, key));
        self.index(id, node, idx, key);
        idx
    }

    /// Insert or improve the entry for `c.id`.
    ///
    /// Infinite weights are rejected, as is anything not strictly cheaper
    /// than the current entry.
    pub fn relax(&mut self, c: Candidate) -> Relaxation {
        if !c.weight_of_visited_path.is_finite() || !c.key.is_finite() {
            return Relaxation::Rejected;
        }

        let previous = self.best.get(&c.id).copied();
        if let Some(old) = previous {
            if c.weight_of_visited_path >= self.arena.get(old).weight_of_visited_path {
                return Relaxation::Rejected;
            }
            self.arena.get_mut(old).deleted = true;
        }

        let idx = self.arena.push(SptEntry {
            edge: c.edge,
            orig_edge: c.orig_edge,
            adj_node: c.adj_node,
            weight: c.key,
            weight_of_visited_path: c.weight_of_visited_path,
            parent: Some(c.parent),
            deleted: false,
        });
        self.index(c.id, c.adj_node, idx, c.key);

        match previous {
            Some(_) => Relaxation::Improved(idx),
            None => Relaxation::Created(idx),
        }
    }

    fn index(&mut self, id: TraversalId, node: NodeId, idx: EntryIdx, key: f64) {
        self.best.insert(id, idx);
        if let Some(by_node) = self.by_node.as_mut() {
            by_node.entry(node).or_default().push(idx);
        }
        self.heap.push(HeapItem { key, idx });
    }

    /// Pop the live entry with the smallest key.
    pub fn poll(&mut self) -> Option<EntryIdx> {
        while let Some(item) = self.heap.pop() {
            if !self.arena.get(item.idx).deleted {
                return Some(item.idx);
            }
        }
        None
    }

    /// Smallest live key, discarding stale items on the way.
    pub fn peek_key(&mut self) -> Option<f64> {
        while let Some(top) = self.heap.peek() {
            if self.arena.get(top.idx).deleted {
                self.heap.pop();
            } else {
                return Some(top.key);
            }
        }
        None
    }

    #[inline]
    pub fn entry(&self, idx: EntryIdx) -> &SptEntry {
        self.arena.get(idx)
    }

    #[inline]
    pub fn get(&self, id: TraversalId) -> Option<EntryIdx> {
        self.best.get(&id).copied()
    }

    /// Live entries whose `adj_node` is `node`.
    pub fn entries_at(&self, node: NodeId) -> impl Iterator<Item = EntryIdx> + '_ {
        let (single, many): (Option<EntryIdx>, &[EntryIdx]) = match &self.by_node {
            None => (self.best.get(&(node as TraversalId)).copied(), &[]),
            Some(by_node) => (None, by_node.get(&node).map_or(&[][..], |v| v.as_slice())),
        };
        single.into_iter().chain(
            many.iter()
                .copied()
                .filter(move |&i| !self.arena.get(i).deleted),
        )
    }

    pub fn arena(&self) -> &SptArena {
        &self.arena
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of entries ever created, stale ones included
    pub fn entry_count(&self) -> usize {
        self.arena.len()
    }
}
