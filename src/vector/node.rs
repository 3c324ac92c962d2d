//! Trie nodes: a transient ticket plus a single data array, interpreted
//! as child links for internal nodes and as values for leaves.
//!
//! Node data sits behind interior mutability so that a node stamped with
//! a transient's ticket can be written through shared handles. This is
//! the advisory single-writer model: the ticket says who may write, and
//! nothing enforces that only one live handle exercises that right.
//! Aliased transient handles therefore share storage and observe each
//! other's writes; that hazard is part of the contract (and is why a
//! vector is neither `Send` nor `Sync`). The slot accessors below never
//! hand out a mutable borrow, so crate-internal use stays one writer,
//! one slot, one moment at a time.

use std::cell::UnsafeCell;
use std::rc::Rc;

/// A node of the bit-partitioned trie. Nodes compare equal by identity
/// of the underlying allocation (`Rc::ptr_eq`), never by content.
#[derive(Debug)]
pub(crate) struct TrieNode<T> {
    ticket: u64,
    data: NodeData<T>,
}

#[derive(Debug)]
enum NodeData<T> {
    Branch(UnsafeCell<Box<[Option<Rc<TrieNode<T>>>]>>),
    Leaf(UnsafeCell<Box<[Option<T>]>>),
}

impl<T: Clone> TrieNode<T> {
    pub(crate) fn new_branch(width: usize, ticket: u64) -> Self {
        TrieNode {
            ticket,
            data: NodeData::Branch(UnsafeCell::new(vec![None; width].into_boxed_slice())),
        }
    }

    pub(crate) fn new_leaf(width: usize, ticket: u64) -> Self {
        TrieNode {
            ticket,
            data: NodeData::Leaf(UnsafeCell::new(vec![None; width].into_boxed_slice())),
        }
    }

    pub(crate) fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Shared view of the link array.
    pub(crate) fn links(&self) -> &[Option<Rc<TrieNode<T>>>] {
        match &self.data {
            // Safety: single-threaded use; no mutable access is live while
            // this borrow is (mutation goes through the slot writers below,
            // which never overlap a read in crate code).
            NodeData::Branch(cell) => unsafe { &*cell.get() },
            NodeData::Leaf(_) => unreachable!("leaf reached at branch depth"),
        }
    }

    /// Shared view of the value array.
    pub(crate) fn values(&self) -> &[Option<T>] {
        match &self.data {
            // Safety: as for `links`.
            NodeData::Leaf(cell) => unsafe { &*cell.get() },
            NodeData::Branch(_) => unreachable!("branch reached at leaf depth"),
        }
    }

    /// Copy the link out of a slot.
    pub(crate) fn link(&self, slot: usize) -> Option<Rc<TrieNode<T>>> {
        self.links()[slot].clone()
    }

    pub(crate) fn set_link(&self, slot: usize, link: Option<Rc<TrieNode<T>>>) {
        match &self.data {
            // Safety: single writer per the ticket discipline; the write
            // is complete before any borrow of the array is handed out.
            NodeData::Branch(cell) => unsafe { (*cell.get())[slot] = link },
            NodeData::Leaf(_) => unreachable!("leaf reached at branch depth"),
        }
    }

    pub(crate) fn take_link(&self, slot: usize) -> Option<Rc<TrieNode<T>>> {
        match &self.data {
            // Safety: as for `set_link`.
            NodeData::Branch(cell) => unsafe { (*cell.get())[slot].take() },
            NodeData::Leaf(_) => unreachable!("leaf reached at branch depth"),
        }
    }

    pub(crate) fn set_value(&self, slot: usize, value: Option<T>) {
        match &self.data {
            // Safety: as for `set_link`.
            NodeData::Leaf(cell) => unsafe { (*cell.get())[slot] = value },
            NodeData::Branch(_) => unreachable!("branch reached at leaf depth"),
        }
    }

    pub(crate) fn take_value(&self, slot: usize) -> Option<T> {
        match &self.data {
            // Safety: as for `set_link`.
            NodeData::Leaf(cell) => unsafe { (*cell.get())[slot].take() },
            NodeData::Branch(_) => unreachable!("branch reached at leaf depth"),
        }
    }

    fn fork(&self, ticket: u64) -> Self {
        let data = match &self.data {
            // Safety: shared read of the source array for the copy.
            NodeData::Branch(cell) => {
                NodeData::Branch(UnsafeCell::new(unsafe { (*cell.get()).clone() }))
            }
            NodeData::Leaf(cell) => NodeData::Leaf(UnsafeCell::new(unsafe { (*cell.get()).clone() })),
        };
        TrieNode { ticket, data }
    }

    /// The single mechanism through which structural sharing is broken.
    ///
    /// A node created under the same nonzero ticket is left in place and
    /// may be written through any handle that shares it; any other node
    /// is forked (same-size array, contents copied, restamped with
    /// `ticket`) before the caller writes. Ticket 0 never owns anything,
    /// so persistent operations always copy their path.
    pub(crate) fn edit(node: &mut Rc<TrieNode<T>>, ticket: u64) {
        if ticket == 0 || node.ticket != ticket {
            *node = Rc::new(node.fork(ticket));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_forks_foreign_nodes() {
        let mut node = Rc::new(TrieNode::<u32>::new_leaf(4, 7));
        let before = Rc::clone(&node);
        TrieNode::edit(&mut node, 9);
        node.set_value(0, Some(1));
        assert!(!Rc::ptr_eq(&node, &before));
        assert_eq!(node.ticket(), 9);
        assert_eq!(before.values()[0], None);
    }

    #[test]
    fn edit_reuses_owned_nodes() {
        let mut node = Rc::new(TrieNode::<u32>::new_leaf(4, 7));
        let original = Rc::as_ptr(&node);
        TrieNode::edit(&mut node, 7);
        node.set_value(0, Some(1));
        assert_eq!(Rc::as_ptr(&node), original);
    }

    #[test]
    fn edit_never_reuses_persistent_nodes() {
        let mut node = Rc::new(TrieNode::<u32>::new_leaf(4, 0));
        let original = Rc::as_ptr(&node);
        TrieNode::edit(&mut node, 0);
        node.set_value(0, Some(1));
        assert_ne!(Rc::as_ptr(&node), original);
    }

    #[test]
    fn matching_ticket_writes_are_seen_through_aliases() {
        let shared = Rc::new(TrieNode::<u32>::new_leaf(4, 7));
        let mut writer = Rc::clone(&shared);
        TrieNode::edit(&mut writer, 7);
        writer.set_value(2, Some(42));
        // no fork happened: the alias reads the write
        assert!(Rc::ptr_eq(&writer, &shared));
        assert_eq!(shared.values()[2], Some(42));
    }
}
