//! Shortest-path-tree entries
//!
//! Entries live in an arena and point to their parent by index. An entry
//! that was superseded by a cheaper one is tombstoned (`deleted`) instead
//! of removed, so parent links held by other entries stay valid.

use crate::graph::{EdgeId, NodeId, NO_EDGE};

pub type EntryIdx = u32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SptEntry {
    /// Edge used to reach `adj_node` in search direction; `NO_EDGE` at the root
    pub edge: EdgeId,
    /// Stored edge touching `adj_node` on the way in (differs from `edge` for shortcuts)
    pub orig_edge: EdgeId,
    pub adj_node: NodeId,
    /// Priority key: path weight plus heuristic
    pub weight: f64,
    pub weight_of_visited_path: f64,
    pub parent: Option<EntryIdx>,
    pub deleted: bool,
}

impl SptEntry {
    pub fn root(node: NodeId, key: f64) -> Self {
        Self {
            edge: NO_EDGE,
            orig_edge: NO_EDGE,
            adj_node: node,
            weight: key,
            weight_of_visited_path: 0.0,
            parent: None,
            deleted: false,
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SptArena {
    entries: Vec<SptEntry>,
}

impl SptArena {
    pub fn push(&mut self, entry: SptEntry) -> EntryIdx {
        self.entries.push(entry);
        (self.entries.len() - 1) as EntryIdx
    }

    #[inline]
    pub fn get(&self, idx: EntryIdx) -> &SptEntry {
        &self.entries[idx as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, idx: EntryIdx) -> &mut SptEntry {
        &mut self.entries[idx as usize]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Walk from `idx` up to the root, `idx` first.
    pub fn chain(&self, idx: EntryIdx) -> impl Iterator<Item = &SptEntry> + '_ {
        std::iter::successors(Some(self.get(idx)), move |e| e.parent.map(|p| self.get(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_walks_to_root() {
        let mut arena = SptArena::default();
        let root = arena.push(SptEntry::root(5, 0.0));
        let child = arena.push(SptEntry {
            edge: 1,
            orig_edge: 1,
            adj_node: 6,
            weight: 2.0,
            weight_of_visited_path: 2.0,
            parent: Some(root),
            deleted: false,
        });
        let grandchild = arena.push(SptEntry {
            edge: 2,
            orig_edge: 2,
            adj_node: 7,
            weight: 3.0,
            weight_of_visited_path: 3.0,
            parent: Some(child),
            deleted: false,
        });

        let nodes: Vec<_> = arena.chain(grandchild).map(|e| e.adj_node).collect();
        assert_eq!(nodes, vec![7, 6, 5]);
        assert!(arena.get(root).is_root());
        assert_eq!(arena.len(), 3);
    }
}
