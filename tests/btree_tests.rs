//! Tests for the B+-tree index
//!
//! These tests verify:
//! - Shape invariants after insert/delete sequences
//! - Duplicate-key position lists
//! - Classical deletion (borrow, merge, root collapse)
//! - Ceiling and inclusive range queries over the leaf chain

use minisql::btree::BPlusTree;

// =============================================================================
// Helper Functions
// =============================================================================

/// Deterministic xorshift generator for shuffles and churn sequences
struct XorShift(u64);

impl XorShift {
    fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

fn shuffled(n: i32, seed: u64) -> Vec<i32> {
    let mut keys: Vec<i32> = (0..n).collect();
    let mut rng = XorShift::new(seed);
    for i in (1..keys.len()).rev() {
        let j = (rng.next() % (i as u64 + 1)) as usize;
        keys.swap(i, j);
    }
    keys
}

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_insert_and_search() {
    let mut tree = BPlusTree::new(3);
    tree.insert(42, 100);
    tree.insert(7, 200);

    assert_eq!(tree.search(&42), Some(&[100][..]));
    assert_eq!(tree.search(&7), Some(&[200][..]));
    assert_eq!(tree.search(&1), None);
    assert!(tree.contains(&42));
    assert!(!tree.is_empty());
}

#[test]
fn test_empty_tree() {
    let tree: BPlusTree<i32> = BPlusTree::new(2);
    assert!(tree.is_empty());
    assert_eq!(tree.search(&1), None);
    assert_eq!(tree.min(), None);
    assert_eq!(tree.max(), None);
    assert_eq!(tree.ceiling(&0), None);
    assert!(tree.keys(None, None).is_empty());
}

#[test]
fn test_min_max() {
    let mut tree = BPlusTree::new(2);
    for key in shuffled(100, 7) {
        tree.insert(key, key as u64);
    }
    assert_eq!(tree.min(), Some(&0));
    assert_eq!(tree.max(), Some(&99));
}

// =============================================================================
// Duplicate Keys
// =============================================================================

#[test]
fn test_duplicate_key_appends_to_list() {
    let mut tree = BPlusTree::new(2);
    tree.insert(5, 10);
    tree.insert(5, 20);
    tree.insert(5, 30);

    // insertion order, not sorted
    assert_eq!(tree.search(&5), Some(&[10, 20, 30][..]));
    assert_eq!(tree.key_count(), 1);
}

#[test]
fn test_remove_one_value_keeps_key() {
    let mut tree = BPlusTree::new(2);
    tree.insert(5, 10);
    tree.insert(5, 20);

    tree.remove(&5, 10);
    assert_eq!(tree.search(&5), Some(&[20][..]));

    tree.remove(&5, 20);
    assert_eq!(tree.search(&5), None);
    assert!(tree.is_empty());
}

#[test]
fn test_remove_unknown_pair_is_noop() {
    let mut tree = BPlusTree::new(2);
    tree.insert(5, 10);

    tree.remove(&99, 10);
    tree.remove(&5, 99);
    assert_eq!(tree.search(&5), Some(&[10][..]));
    tree.check_invariants().expect("tree stays valid");
}

// =============================================================================
// Shape Invariants
// =============================================================================

#[test]
fn test_sequential_inserts_keep_invariants() {
    for degree in [2, 3, 4] {
        let mut tree = BPlusTree::new(degree);
        for key in 0..200 {
            tree.insert(key, key as u64);
        }
        tree.check_invariants().expect("tree is valid");
        assert_eq!(tree.keys(None, None), (0..200).collect::<Vec<_>>());
    }
}

#[test]
fn test_shuffled_inserts_keep_invariants() {
    for seed in [1, 42, 12345] {
        let mut tree = BPlusTree::new(2);
        for key in shuffled(300, seed) {
            tree.insert(key, key as u64);
        }
        tree.check_invariants().expect("tree is valid");
        assert_eq!(tree.keys(None, None), (0..300).collect::<Vec<_>>());
    }
}

#[test]
fn test_delete_all_collapses_to_empty() {
    let mut tree = BPlusTree::new(2);
    for key in 0..100 {
        tree.insert(key, key as u64);
    }
    for key in shuffled(100, 99) {
        tree.remove(&key, key as u64);
        tree.check_invariants().expect("tree stays valid mid-deletion");
    }
    assert!(tree.is_empty());
}

#[test]
fn test_delete_sole_root_key() {
    let mut tree = BPlusTree::new(3);
    tree.insert(1, 1);
    tree.remove(&1, 1);
    assert!(tree.is_empty());
    assert_eq!(tree.search(&1), None);
}

#[test]
fn test_random_churn_matches_model() {
    use std::collections::BTreeMap;

    let mut tree = BPlusTree::new(2);
    let mut model: BTreeMap<i32, Vec<u64>> = BTreeMap::new();
    let mut rng = XorShift::new(2024);

    for step in 0..2000 {
        let key = (rng.next() % 64) as i32;
        let position = rng.next() % 8;
        if rng.next() % 3 == 0 {
            tree.remove(&key, position);
            if let Some(list) = model.get_mut(&key) {
                if let Some(at) = list.iter().position(|&p| p == position) {
                    list.remove(at);
                }
                if list.is_empty() {
                    model.remove(&key);
                }
            }
        } else {
            // mirror the tree's duplicate handling: one list per key
            tree.insert(key, position);
            model.entry(key).or_default().push(position);
        }

        if step % 100 == 0 {
            tree.check_invariants().expect("tree stays valid under churn");
        }
    }

    tree.check_invariants().expect("tree is valid");
    let expected_keys: Vec<i32> = model.keys().copied().collect();
    assert_eq!(tree.keys(None, None), expected_keys);
    for (key, list) in &model {
        assert_eq!(tree.search(key), Some(list.as_slice()));
    }
}

// =============================================================================
// Ceiling
// =============================================================================

#[test]
fn test_ceiling() {
    let mut tree = BPlusTree::new(2);
    for key in [0, 2, 4, 6, 8, 10] {
        tree.insert(key, key as u64);
    }

    assert_eq!(tree.ceiling(&4), Some(&4));
    assert_eq!(tree.ceiling(&5), Some(&6));
    assert_eq!(tree.ceiling(&-3), Some(&0));
    assert_eq!(tree.ceiling(&10), Some(&10));
    assert_eq!(tree.ceiling(&11), None);
}

// =============================================================================
// Range Queries
// =============================================================================

#[test]
fn test_range_bounds_inclusive() {
    let mut tree = BPlusTree::new(2);
    for key in 0..50 {
        tree.insert(key, (key * 10) as u64);
    }

    assert_eq!(tree.keys(Some(&10), Some(&20)), (10..=20).collect::<Vec<_>>());
    assert_eq!(tree.keys(None, Some(&3)), vec![0, 1, 2, 3]);
    assert_eq!(tree.keys(Some(&47), None), vec![47, 48, 49]);

    let positions = tree.positions(Some(&10), Some(&12));
    assert_eq!(positions, vec![100, 110, 120]);
}

#[test]
fn test_range_between_keys() {
    let mut tree = BPlusTree::new(3);
    for key in [10, 20, 30, 40] {
        tree.insert(key, key as u64);
    }
    // bounds that fall between existing keys
    assert_eq!(tree.keys(Some(&11), Some(&39)), vec![20, 30]);
    assert_eq!(tree.keys(Some(&41), None), Vec::<i32>::new());
}

#[test]
fn test_items_carry_full_position_lists() {
    let mut tree = BPlusTree::new(2);
    tree.insert(1, 100);
    tree.insert(1, 101);
    tree.insert(2, 200);

    let items = tree.items(None, None);
    assert_eq!(items, vec![(1, vec![100, 101]), (2, vec![200])]);
}

#[test]
fn test_positions_follow_key_order() {
    let mut tree = BPlusTree::new(2);
    // positions deliberately unrelated to key order
    tree.insert(3, 0);
    tree.insert(1, 500);
    tree.insert(2, 250);

    assert_eq!(tree.positions(None, None), vec![500, 250, 0]);
}
