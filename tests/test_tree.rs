use std::cmp::Ordering;

use coppice::{
    ArenaTree, Augment, AvlTree, FnOrder, HeapStore, HeapTree, Height, Natural, NodeStore,
};
use itertools::Itertools;

/// Order-statistic tag: composes a subtree size on top of the AVL height.
#[derive(Debug, Clone, Copy, Default)]
struct Ranked {
    base: Height,
    size: usize,
}

impl Augment for Ranked {
    fn height(&self) -> u8 {
        self.base.height()
    }

    fn set_height(&mut self, height: u8) {
        self.base.set_height(height);
    }

    fn refresh(&mut self, left: Option<&Self>, right: Option<&Self>) {
        self.size = 1 + left.map_or(0, |tag| tag.size) + right.map_or(0, |tag| tag.size);
    }
}

#[test_log::test]
fn arena_tree_survives_mixed_workload() {
    let mut tree = ArenaTree::<u32>::with_chunk_bits(5).unwrap();
    let mut cursor = tree.cursor();

    // interleave two ascending runs so both rotation directions trigger
    for value in (0..200).step_by(2).chain((1..200).step_by(2)) {
        assert!(tree.insert(&mut cursor, value, Height::new()).unwrap());
    }
    assert_eq!(tree.len(), 200);

    // drop a band out of the middle by lookup + delete
    for value in 80..120 {
        let (found, mut position) = tree.find(&value).unwrap();
        assert!(found);
        assert_eq!(tree.delete(&mut position).unwrap(), value);
    }
    assert_eq!(tree.len(), 160);
    assert_eq!(tree.store().live(), 160);

    let expected = (0..80).chain(120..200).collect_vec();
    assert_eq!(tree.iter().copied().collect_vec(), expected);

    // freed arena slots are recycled rather than growing the arena
    let capacity = tree.store().capacity();
    for value in 80..120 {
        assert!(tree.insert(&mut cursor, value, Height::new()).unwrap());
    }
    assert_eq!(tree.store().capacity(), capacity);
    assert_eq!(tree.iter().copied().collect_vec(), (0..200).collect_vec());
}

#[test]
fn cursor_walks_both_directions() {
    let mut tree = HeapTree::<u32>::new();
    let mut cursor = tree.cursor();
    for value in [50u32, 20, 80, 10, 30, 70, 90] {
        tree.insert(&mut cursor, value, Height::new()).unwrap();
    }

    assert_eq!(tree.first(&mut cursor).unwrap(), Some(&10));
    let mut forward = vec![10u32];
    while let Some(value) = tree.succ(&mut cursor).unwrap() {
        forward.push(*value);
    }
    assert_eq!(forward, vec![10, 20, 30, 50, 70, 80, 90]);

    assert_eq!(tree.last(&mut cursor).unwrap(), Some(&90));
    let mut backward = vec![90u32];
    while let Some(value) = tree.pred(&mut cursor).unwrap() {
        backward.push(*value);
    }
    backward.reverse();
    assert_eq!(backward, forward);
}

#[test]
fn cloned_cursor_refreshes_after_foreign_mutation() {
    let mut tree = HeapTree::<u32>::new();
    let mut cursor = tree.cursor();
    for value in 0..32 {
        tree.insert(&mut cursor, value, Height::new()).unwrap();
    }

    // park a clone on 16, mutate through the original cursor, then
    // refresh the clone before trusting it again
    tree.seek(&16, &mut cursor).unwrap();
    let mut parked = cursor.clone();
    tree.insert(&mut cursor, 100, Height::new()).unwrap();

    assert_eq!(tree.seek(&16, &mut parked).unwrap(), Ordering::Equal);
    assert_eq!(tree.get(&parked).unwrap(), Some(&16));
}

#[test]
fn ranked_tag_tracks_subtree_sizes() {
    let mut tree: AvlTree<u32, HeapStore<u32, Ranked>, Natural, Ranked> =
        AvlTree::with_store(Natural, HeapStore::new());
    let mut cursor = tree.cursor();

    for value in 0..100 {
        tree.insert(&mut cursor, value, Ranked::default()).unwrap();
    }
    for value in (0..100).step_by(3) {
        let (found, mut position) = tree.find(&value).unwrap();
        assert!(found);
        tree.delete(&mut position).unwrap();
    }

    // the root's composed tag must agree with the element count after
    // every rotation the churn above caused
    let root = tree.store().node(tree.root()).unwrap();
    assert_eq!(root.tag.size, tree.len());
}

#[test]
fn runtime_comparator_orders_descending() {
    let order = FnOrder(Box::new(|a: &u32, b: &u32| b.cmp(a)) as Box<dyn Fn(&u32, &u32) -> Ordering>);
    let mut tree = AvlTree::with_store(order, HeapStore::<u32, Height>::new());
    let mut cursor = tree.cursor();
    for value in [3u32, 1, 4, 1, 5, 9, 2, 6] {
        tree.insert(&mut cursor, value, Height::new()).unwrap();
    }
    // the duplicate 1 was rejected softly
    assert_eq!(tree.len(), 7);
    assert_eq!(
        tree.iter().copied().collect_vec(),
        vec![9, 6, 5, 4, 3, 2, 1]
    );
}
