//! B+-tree index
//!
//! Balanced ordered index mapping keys to lists of record positions.
//!
//! ## Shape
//!
//! Parameterized by a minimum branching factor `t`: every node holds at most
//! `2t-1` keys, every non-root node at least `t-1`. Internal nodes hold keys
//! and children; leaves hold keys with parallel position lists and are singly
//! linked in key order, so range scans walk the leaf chain instead of
//! re-descending.
//!
//! Duplicate column values are supported by the position lists: inserting an
//! existing key appends to its list, and the key itself only leaves the tree
//! when its list empties.
//!
//! ## Ownership
//!
//! Nodes live in an arena (`Vec<Node>`) addressed by index. Parent→child
//! edges and the leaf `next` links are arena indices, never shared pointers;
//! every tree owns its arena outright. Freed slots are recycled through a
//! free list.

use serde::{Deserialize, Serialize};

/// Byte offset of one record in its table's storage stream
pub type Position = u64;

/// Arena index of a node
type NodeId = usize;

/// One node of the tree
///
/// `values` is parallel to `keys` and populated only in leaves; `children`
/// is populated only in internal nodes. `next` links leaves in key order.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node<K> {
    keys: Vec<K>,
    values: Vec<Vec<Position>>,
    children: Vec<NodeId>,
    next: Option<NodeId>,
}

impl<K> Default for Node<K> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
            next: None,
        }
    }
}

impl<K> Node<K> {
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A B+-tree index with per-key position lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BPlusTree<K> {
    degree: usize,
    root: NodeId,
    nodes: Vec<Node<K>>,
    free: Vec<NodeId>,
}

impl<K: Ord + Clone> BPlusTree<K> {
    /// Create an empty tree with minimum branching factor `degree`
    ///
    /// Panics if `degree < 2` (a 1-ary B-tree cannot balance).
    pub fn new(degree: usize) -> Self {
        assert!(degree >= 2, "B+-tree degree must be at least 2");
        Self {
            degree,
            root: 0,
            nodes: vec![Node::default()],
            free: Vec::new(),
        }
    }

    fn min_keys(&self) -> usize {
        self.degree - 1
    }

    fn max_keys(&self) -> usize {
        2 * self.degree - 1
    }

    // =========================================================================
    // Arena Management
    // =========================================================================

    fn alloc(&mut self, node: Node<K>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id] = Node::default();
        self.free.push(id);
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Leaf slot holding `key`, if present
    fn find(&self, key: &K) -> Option<(NodeId, usize)> {
        let mut id = self.root;
        loop {
            let node = &self.nodes[id];
            let i = node.keys.partition_point(|k| k < key);
            if i < node.keys.len() && node.keys[i] == *key {
                if node.is_leaf() {
                    return Some((id, i));
                }
                // separator keys are copies of leaf keys; the real entry
                // lives in the right subtree
                id = node.children[i + 1];
            } else if node.is_leaf() {
                return None;
            } else {
                id = node.children[i];
            }
        }
    }

    /// Positions stored under `key`
    pub fn search(&self, key: &K) -> Option<&[Position]> {
        self.find(key)
            .map(|(id, i)| self.nodes[id].values[i].as_slice())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Least existing key `>= key`
    ///
    /// Resolved by descending to the bounding leaf and stepping along the
    /// leaf chain when `key` falls past the end of that leaf's range.
    pub fn ceiling(&self, key: &K) -> Option<&K> {
        let mut id = self.leaf_for(Some(key));
        loop {
            let node = &self.nodes[id];
            let i = node.keys.partition_point(|k| k < key);
            if i < node.keys.len() {
                return Some(&node.keys[i]);
            }
            id = node.next?;
        }
    }

    /// Smallest key in the tree
    pub fn min(&self) -> Option<&K> {
        self.nodes[self.leaf_for(None)].keys.first()
    }

    /// Largest key in the tree
    pub fn max(&self) -> Option<&K> {
        let mut id = self.root;
        while !self.nodes[id].is_leaf() {
            id = *self.nodes[id].children.last()?;
        }
        self.nodes[id].keys.last()
    }

    pub fn is_empty(&self) -> bool {
        let root = &self.nodes[self.root];
        root.is_leaf() && root.keys.is_empty()
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        let mut count = 0;
        let mut id = Some(self.leaf_for(None));
        while let Some(leaf) = id {
            count += self.nodes[leaf].keys.len();
            id = self.nodes[leaf].next;
        }
        count
    }

    /// Leaf where `key` belongs (leftmost leaf when `key` is None)
    fn leaf_for(&self, key: Option<&K>) -> NodeId {
        let mut id = self.root;
        while !self.nodes[id].is_leaf() {
            let node = &self.nodes[id];
            let i = match key {
                None => 0,
                Some(k) => {
                    let i = node.keys.partition_point(|x| x < k);
                    if i < node.keys.len() && node.keys[i] == *k {
                        i + 1
                    } else {
                        i
                    }
                }
            };
            id = node.children[i];
        }
        id
    }

    // =========================================================================
    // Range Queries
    // =========================================================================

    /// Keys in `[min, max]`, ascending; `None` leaves a bound open
    pub fn keys(&self, min: Option<&K>, max: Option<&K>) -> Vec<K> {
        self.scan(min, max, |k, _, out: &mut Vec<K>| out.push(k.clone()))
    }

    /// Positions under keys in `[min, max]`, in key order then insertion order
    pub fn positions(&self, min: Option<&K>, max: Option<&K>) -> Vec<Position> {
        self.scan(min, max, |_, v, out: &mut Vec<Position>| {
            out.extend_from_slice(v)
        })
    }

    /// `(key, positions)` pairs for keys in `[min, max]`, ascending
    pub fn items(&self, min: Option<&K>, max: Option<&K>) -> Vec<(K, Vec<Position>)> {
        self.scan(min, max, |k, v, out: &mut Vec<(K, Vec<Position>)>| {
            out.push((k.clone(), v.to_vec()))
        })
    }

    /// Walk the leaf chain from the lower bound, collecting until `max`
    fn scan<T>(
        &self,
        min: Option<&K>,
        max: Option<&K>,
        mut collect: impl FnMut(&K, &[Position], &mut Vec<T>),
    ) -> Vec<T> {
        let mut out = Vec::new();
        if self.is_empty() {
            return out;
        }
        let mut id = Some(self.leaf_for(min));
        while let Some(leaf) = id {
            let node = &self.nodes[leaf];
            for (key, values) in node.keys.iter().zip(&node.values) {
                if let Some(lo) = min {
                    if key < lo {
                        continue;
                    }
                }
                if let Some(hi) = max {
                    if key > hi {
                        return out;
                    }
                }
                collect(key, values, &mut out);
            }
            id = node.next;
        }
        out
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Insert `position` under `key`
    ///
    /// An existing key gets the position appended to its list; a new key
    /// gets a fresh singleton list. Splitting is preemptive: a full child
    /// is split before the descent enters it.
    pub fn insert(&mut self, key: K, position: Position) {
        if let Some((leaf, i)) = self.find(&key) {
            self.nodes[leaf].values[i].push(position);
            return;
        }

        if self.nodes[self.root].keys.len() == self.max_keys() {
            let old_root = self.root;
            let new_root = self.alloc(Node::default());
            self.nodes[new_root].children.push(old_root);
            self.root = new_root;
            self.split_child(new_root, 0);
        }
        self.insert_nonfull(self.root, key, position);
    }

    fn insert_nonfull(&mut self, id: NodeId, key: K, position: Position) {
        let mut i = self.nodes[id].keys.partition_point(|k| k < &key);
        if self.nodes[id].is_leaf() {
            let node = &mut self.nodes[id];
            node.keys.insert(i, key);
            node.values.insert(i, vec![position]);
        } else {
            let child = self.nodes[id].children[i];
            if self.nodes[child].keys.len() == self.max_keys() {
                self.split_child(id, i);
                if key > self.nodes[id].keys[i] {
                    i += 1;
                }
            }
            let child = self.nodes[id].children[i];
            self.insert_nonfull(child, key, position);
        }
    }

    /// Split the full child at `child_index` of `parent`
    ///
    /// Internal splits push the median key up; leaf splits copy it up, so
    /// every separator key equals the first key of its right subtree's
    /// leftmost leaf. Leaf splits also relink the `next` chain.
    fn split_child(&mut self, parent: NodeId, child_index: usize) {
        let t = self.degree;
        let left = self.nodes[parent].children[child_index];

        let mut right = Node::default();
        let median;
        let left_is_leaf = self.nodes[left].is_leaf();
        if left_is_leaf {
            let node = &mut self.nodes[left];
            right.keys = node.keys.split_off(t - 1);
            right.values = node.values.split_off(t - 1);
            right.next = node.next;
            median = right.keys[0].clone();
        } else {
            let node = &mut self.nodes[left];
            right.keys = node.keys.split_off(t);
            right.children = node.children.split_off(t);
            median = node.keys.pop().expect("full node has a median key");
        }

        let right_id = self.alloc(right);
        if left_is_leaf {
            self.nodes[left].next = Some(right_id);
        }
        let parent_node = &mut self.nodes[parent];
        parent_node.children.insert(child_index + 1, right_id);
        parent_node.keys.insert(child_index, median);
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Remove `position` from `key`'s list
    ///
    /// The key leaves the tree only when its list empties, via the classical
    /// B-tree deletion (predecessor/successor borrow, sibling merge, root
    /// collapse). Removing an unknown `(key, position)` pair is a no-op.
    pub fn remove(&mut self, key: &K, position: Position) {
        let Some((leaf, i)) = self.find(key) else {
            return;
        };
        let list = &mut self.nodes[leaf].values[i];
        let Some(at) = list.iter().position(|&p| p == position) else {
            return;
        };
        list.remove(at);
        if self.nodes[leaf].values[i].is_empty() {
            self.delete_key(self.root, key);
        }
    }

    /// Classical recursive deletion; every non-root node entered is
    /// guaranteed at least `t` keys by the descent
    fn delete_key(&mut self, id: NodeId, key: &K) {
        let ki = self.nodes[id].keys.partition_point(|k| k < key);
        let found = ki < self.nodes[id].keys.len() && self.nodes[id].keys[ki] == *key;

        if self.nodes[id].is_leaf() {
            if found {
                let node = &mut self.nodes[id];
                node.keys.remove(ki);
                node.values.remove(ki);
            }
            return;
        }

        if found {
            let left = self.nodes[id].children[ki];
            let right = self.nodes[id].children[ki + 1];
            if self.nodes[left].keys.len() >= self.degree {
                // predecessor takes the deleted key's slot in the right
                // subtree's min leaf, which holds the leaf copy of the key
                let pred_leaf = self.max_leaf(left);
                let pred_node = &self.nodes[pred_leaf];
                let pred_key = pred_node
                    .keys
                    .last()
                    .cloned()
                    .expect("predecessor leaf is non-empty");
                let pred_values = pred_node
                    .values
                    .last()
                    .cloned()
                    .expect("predecessor leaf is non-empty");
                self.delete_key(left, &pred_key);
                self.nodes[id].keys[ki] = pred_key.clone();
                let succ_leaf = self.min_leaf(right);
                let leaf = &mut self.nodes[succ_leaf];
                leaf.keys[0] = pred_key;
                leaf.values[0] = pred_values;
            } else if self.nodes[right].keys.len() >= self.degree {
                // the leaf copy of the key is the right subtree's minimum;
                // delete it there, then refresh the separator
                self.delete_key(right, key);
                let succ_leaf = self.min_leaf(right);
                if let Some(new_min) = self.nodes[succ_leaf].keys.first().cloned() {
                    self.nodes[id].keys[ki] = new_min;
                }
            } else {
                let merged = self.merge_children(id, ki);
                self.delete_key(merged, key);
            }
            return;
        }

        // key lives deeper; refill the child before entering it
        let ci = ki;
        let mut child = self.nodes[id].children[ci];
        if self.nodes[child].keys.len() == self.min_keys() {
            child = self.fill_child(id, ci);
        }
        self.delete_key(child, key);
    }

    /// Ensure the child at `ci` has at least `t` keys before descent,
    /// borrowing from a sibling or merging; returns the node to descend into
    fn fill_child(&mut self, id: NodeId, ci: usize) -> NodeId {
        let child = self.nodes[id].children[ci];
        let left_sibling = (ci >= 1).then(|| self.nodes[id].children[ci - 1]);
        let right_sibling =
            (ci < self.nodes[id].keys.len()).then(|| self.nodes[id].children[ci + 1]);

        if let Some(left) = left_sibling {
            if self.nodes[left].keys.len() > self.min_keys() {
                self.borrow_from_left(id, ci, left, child);
                return child;
            }
        }
        if let Some(right) = right_sibling {
            if self.nodes[right].keys.len() > self.min_keys() {
                self.borrow_from_right(id, ci, child, right);
                return child;
            }
        }
        if left_sibling.is_some() {
            self.merge_children(id, ci - 1)
        } else {
            self.merge_children(id, ci)
        }
    }

    fn borrow_from_left(&mut self, id: NodeId, ci: usize, left: NodeId, child: NodeId) {
        if self.nodes[child].is_leaf() {
            let node = &mut self.nodes[left];
            let key = node.keys.pop().expect("donor sibling has spare keys");
            let values = node.values.pop().expect("donor sibling has spare keys");
            self.nodes[id].keys[ci - 1] = key.clone();
            let node = &mut self.nodes[child];
            node.keys.insert(0, key);
            node.values.insert(0, values);
        } else {
            let separator = self.nodes[id].keys[ci - 1].clone();
            let node = &mut self.nodes[left];
            let key = node.keys.pop().expect("donor sibling has spare keys");
            let grandchild = node.children.pop().expect("donor sibling has children");
            self.nodes[id].keys[ci - 1] = key;
            let node = &mut self.nodes[child];
            node.keys.insert(0, separator);
            node.children.insert(0, grandchild);
        }
    }

    fn borrow_from_right(&mut self, id: NodeId, ci: usize, child: NodeId, right: NodeId) {
        if self.nodes[child].is_leaf() {
            let node = &mut self.nodes[right];
            let key = node.keys.remove(0);
            let values = node.values.remove(0);
            let new_separator = node
                .keys
                .first()
                .cloned()
                .expect("donor sibling keeps at least one key");
            let node = &mut self.nodes[child];
            node.keys.push(key);
            node.values.push(values);
            self.nodes[id].keys[ci] = new_separator;
        } else {
            let separator = self.nodes[id].keys[ci].clone();
            let node = &mut self.nodes[right];
            let key = node.keys.remove(0);
            let grandchild = node.children.remove(0);
            self.nodes[id].keys[ci] = key;
            let node = &mut self.nodes[child];
            node.keys.push(separator);
            node.children.push(grandchild);
        }
    }

    /// Merge the children flanking the separator at `si` into the left one;
    /// collapses the root when its last separator disappears
    fn merge_children(&mut self, id: NodeId, si: usize) -> NodeId {
        let left = self.nodes[id].children[si];
        let right = self.nodes[id].children.remove(si + 1);
        let separator = self.nodes[id].keys.remove(si);
        let mut right_node = std::mem::take(&mut self.nodes[right]);

        let left_node = &mut self.nodes[left];
        if left_node.is_leaf() {
            // the separator is a copy of the right leaf's first key, so it
            // comes along inside right_node.keys already
            left_node.keys.append(&mut right_node.keys);
            left_node.values.append(&mut right_node.values);
            left_node.next = right_node.next;
        } else {
            left_node.keys.push(separator);
            left_node.keys.append(&mut right_node.keys);
            left_node.children.append(&mut right_node.children);
        }
        self.release(right);

        if id == self.root && self.nodes[id].keys.is_empty() {
            self.release(id);
            self.root = left;
        }
        left
    }

    fn min_leaf(&self, mut id: NodeId) -> NodeId {
        while !self.nodes[id].is_leaf() {
            id = self.nodes[id].children[0];
        }
        id
    }

    fn max_leaf(&self, mut id: NodeId) -> NodeId {
        while !self.nodes[id].is_leaf() {
            id = *self.nodes[id]
                .children
                .last()
                .expect("internal node has children");
        }
        id
    }

    // =========================================================================
    // Invariant Validation
    // =========================================================================

    /// Check the B+-tree shape invariants, returning a description of the
    /// first violation found. Used by tests after mutation sequences.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        self.check_node(self.root, true, None, None)?;

        // leaf chain must visit every key exactly once, ascending
        let chained = self.keys(None, None);
        for pair in chained.windows(2) {
            if pair[0] >= pair[1] {
                return Err("leaf chain keys out of order".to_string());
            }
        }
        Ok(())
    }

    fn check_node(
        &self,
        id: NodeId,
        is_root: bool,
        lo: Option<&K>,
        hi: Option<&K>,
    ) -> std::result::Result<(), String> {
        let node = &self.nodes[id];
        if !is_root && (node.keys.len() < self.min_keys() || node.keys.len() > self.max_keys()) {
            return Err(format!(
                "node has {} keys, outside [{}, {}]",
                node.keys.len(),
                self.min_keys(),
                self.max_keys()
            ));
        }
        for pair in node.keys.windows(2) {
            if pair[0] >= pair[1] {
                return Err("node keys not strictly sorted".to_string());
            }
        }
        for key in &node.keys {
            if lo.is_some_and(|lo| key < lo) || hi.is_some_and(|hi| key >= hi) {
                return Err("key outside subtree bounds".to_string());
            }
        }
        if node.is_leaf() {
            if node.keys.len() != node.values.len() {
                return Err("leaf keys and value lists out of step".to_string());
            }
            if node.values.iter().any(|v| v.is_empty()) {
                return Err("empty position list in leaf".to_string());
            }
        } else {
            if node.children.len() != node.keys.len() + 1 {
                return Err("internal node child count mismatch".to_string());
            }
            for (i, &child) in node.children.iter().enumerate() {
                let child_lo = if i == 0 { lo } else { Some(&node.keys[i - 1]) };
                let child_hi = if i == node.keys.len() {
                    hi
                } else {
                    Some(&node.keys[i])
                };
                self.check_node(child, false, child_lo, child_hi)?;
            }
        }
        Ok(())
    }
}
