//! Disjoint-set forest over article hashes.
//!
//! Keys are interned into dense slots on first touch; `parent` and `rank`
//! are plain vectors indexed by slot.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DisjointSet {
    slots: HashMap<String, usize>,
    keys: Vec<String>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Slot for `key`, creating a singleton set if unseen.
    fn slot(&mut self, key: &str) -> usize {
        if let Some(&slot) = self.slots.get(key) {
            return slot;
        }
        let slot = self.keys.len();
        self.slots.insert(key.to_string(), slot);
        self.keys.push(key.to_string());
        self.parent.push(slot);
        self.rank.push(0);
        slot
    }

    fn find_slot(&mut self, slot: usize) -> usize {
        let mut root = slot;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut current = slot;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    /// Representative key of the set containing `key`.
    pub fn find(&mut self, key: &str) -> &str {
        let slot = self.slot(key);
        let root = self.find_slot(slot);
        &self.keys[root]
    }

    /// Merge the sets containing `a` and `b`. Returns false if they were
    /// already joined.
    pub fn union(&mut self, a: &str, b: &str) -> bool {
        let slot_a = self.slot(a);
        let slot_b = self.slot(b);
        let root_a = self.find_slot(slot_a);
        let root_b = self.find_slot(slot_b);
        if root_a == root_b {
            return false;
        }

        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
        true
    }

    /// All sets as lists of keys, members in first-touch order.
    pub fn sets(&mut self) -> Vec<Vec<String>> {
        let mut by_root: HashMap<usize, Vec<String>> = HashMap::new();
        let mut order = Vec::new();
        for slot in 0..self.keys.len() {
            let root = self.find_slot(slot);
            by_root
                .entry(root)
                .or_insert_with(|| {
                    order.push(root);
                    Vec::new()
                })
                .push(self.keys[slot].clone());
        }
        order
            .into_iter()
            .filter_map(|root| by_root.remove(&root))
            .collect()
    }
}
