//! Height-balanced search tree engine over pluggable node stores.
//!
//! The tree never recurses: every operation walks an explicit
//! [`Path`](crate::tree::Path) held inside a [`Cursor`]. Callers obtain a
//! cursor from the tree, position it with [`AvlTree::seek`],
//! [`AvlTree::first`] or [`AvlTree::last`], and then read or mutate
//! through it. Mutating through one cursor leaves any other cursor on the
//! same tree stale; stale cursors must be repositioned before reuse.
//!
//! Two bindings are provided as type aliases: [`HeapTree`] over
//! individually heap-owned nodes and [`ArenaTree`] over the chunked
//! 16-bit-handle arena.

use std::cmp::Ordering;
use std::marker::PhantomData;

use crate::errors::CoppiceError;
use crate::tree::arena::ChunkArena;
use crate::tree::node::TreeHandle;
use crate::tree::order::{Natural, Order};
use crate::tree::path::{Cursor, Path};
use crate::tree::store::{HeapStore, NodeStore};
use crate::tree::tag::{Augment, Height};
use crate::ticket;

/// Height-balanced binary search tree, generic over the node store `S`,
/// the comparator `O` and the tag augmentation `A`.
///
/// Duplicate values (under the comparator) are rejected softly:
/// [`AvlTree::insert`] returns `Ok(false)`.
pub struct AvlTree<V, S, O = Natural, A = Height>
where
    S: NodeStore<V, A>,
    O: Order<V>,
    A: Augment,
{
    store: S,
    order: O,
    root: S::Handle,
    count: usize,
    ticket: u64,
    _marker: PhantomData<(V, A)>,
}

/// The heap-owned binding.
pub type HeapTree<V, O = Natural, A = Height> = AvlTree<V, HeapStore<V, A>, O, A>;

/// The arena-backed binding with compact 16-bit handles.
pub type ArenaTree<V, O = Natural, A = Height> = AvlTree<V, ChunkArena<V, A>, O, A>;

impl<V: Ord, A: Augment> AvlTree<V, HeapStore<V, A>, Natural, A> {
    /// Naturally ordered tree over heap-owned nodes.
    pub fn new() -> Self {
        Self::with_store(Natural, HeapStore::new())
    }
}

impl<V: Ord, A: Augment> Default for AvlTree<V, HeapStore<V, A>, Natural, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Ord, A: Augment> AvlTree<V, ChunkArena<V, A>, Natural, A> {
    /// Naturally ordered tree over an arena with `1 << chunk_bits` slots
    /// per chunk.
    pub fn with_chunk_bits(chunk_bits: u8) -> Result<Self, CoppiceError> {
        Ok(Self::with_store(Natural, ChunkArena::new(chunk_bits)?))
    }
}

impl<V, S, O, A> AvlTree<V, S, O, A>
where
    S: NodeStore<V, A>,
    O: Order<V>,
    A: Augment,
{
    /// Assemble a tree from an explicit comparator and store.
    pub fn with_store(order: O, store: S) -> Self {
        AvlTree {
            store,
            order,
            root: S::Handle::NIL,
            count: 0,
            ticket: ticket::next(),
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Handle of the root node; nil when the tree is empty.
    pub fn root(&self) -> S::Handle {
        self.root
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// A fresh, unpositioned cursor bound to this tree.
    pub fn cursor(&self) -> Cursor<S::Handle> {
        Cursor::for_tree(self.ticket)
    }

    fn guard(&self, cursor: &Cursor<S::Handle>) -> Result<(), CoppiceError> {
        if cursor.tree != self.ticket {
            return Err(CoppiceError::InvalidArgument(
                "cursor does not belong to this tree",
            ));
        }
        Ok(())
    }

    /// Descend from the root by the comparator, recording every visited
    /// node on the cursor (the match included, when there is one).
    /// Returns the last comparison made, `Ordering::Less` on an empty
    /// tree.
    pub fn seek(
        &self,
        value: &V,
        cursor: &mut Cursor<S::Handle>,
    ) -> Result<Ordering, CoppiceError> {
        self.guard(cursor)?;
        cursor.path.clear();
        let mut handle = self.root;
        let mut last = Ordering::Less;
        while !handle.is_nil() {
            cursor.path.push(handle)?;
            let node = self.store.node(handle)?;
            last = self.order.order(value, &node.value);
            handle = match last {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => break,
            };
        }
        Ok(last)
    }

    /// Look a value up, returning whether it is present together with a
    /// cursor positioned on the match (or on the leaf where the search
    /// ended).
    pub fn find(&self, value: &V) -> Result<(bool, Cursor<S::Handle>), CoppiceError> {
        let mut cursor = self.cursor();
        let outcome = self.seek(value, &mut cursor)?;
        Ok((!cursor.is_empty() && outcome == Ordering::Equal, cursor))
    }

    pub fn contains(&self, value: &V) -> bool {
        self.find(value).map(|(found, _)| found).unwrap_or(false)
    }

    /// Reposition the cursor on the smallest element. Returns its value,
    /// or `None` on an empty tree.
    pub fn first(&self, cursor: &mut Cursor<S::Handle>) -> Result<Option<&V>, CoppiceError> {
        self.descend_extreme(cursor, true)
    }

    /// Reposition the cursor on the largest element.
    pub fn last(&self, cursor: &mut Cursor<S::Handle>) -> Result<Option<&V>, CoppiceError> {
        self.descend_extreme(cursor, false)
    }

    fn descend_extreme(
        &self,
        cursor: &mut Cursor<S::Handle>,
        leftwards: bool,
    ) -> Result<Option<&V>, CoppiceError> {
        self.guard(cursor)?;
        cursor.path.clear();
        let mut handle = self.root;
        while !handle.is_nil() {
            cursor.path.push(handle)?;
            let node = self.store.node(handle)?;
            handle = if leftwards { node.left } else { node.right };
        }
        self.peek(cursor)
    }

    /// Value at the cursor's current position, if it is positioned.
    pub fn get(&self, cursor: &Cursor<S::Handle>) -> Result<Option<&V>, CoppiceError> {
        self.guard(cursor)?;
        self.peek(cursor)
    }

    fn peek(&self, cursor: &Cursor<S::Handle>) -> Result<Option<&V>, CoppiceError> {
        match cursor.path.top() {
            Some(handle) => Ok(Some(&self.store.node(handle)?.value)),
            None => Ok(None),
        }
    }

    /// Advance the cursor to the in-order successor. Returns `None` (and
    /// empties the cursor) when the cursor was on the last element or was
    /// not positioned.
    pub fn succ(&self, cursor: &mut Cursor<S::Handle>) -> Result<Option<&V>, CoppiceError> {
        self.guard(cursor)?;
        let Some(mut current) = cursor.path.pop() else {
            return Ok(None);
        };
        let right = self.store.node(current)?.right;
        if !right.is_nil() {
            // leftmost node of the right subtree
            cursor.path.push(current)?;
            let mut handle = right;
            while !handle.is_nil() {
                cursor.path.push(handle)?;
                handle = self.store.node(handle)?.left;
            }
        } else {
            // climb while we keep arriving from the right
            while let Some(ancestor) = cursor.path.top() {
                if self.store.node(ancestor)?.right != current {
                    break;
                }
                current = ancestor;
                cursor.path.pop();
            }
        }
        self.peek(cursor)
    }

    /// Move the cursor to the in-order predecessor; mirror of
    /// [`AvlTree::succ`].
    pub fn pred(&self, cursor: &mut Cursor<S::Handle>) -> Result<Option<&V>, CoppiceError> {
        self.guard(cursor)?;
        let Some(mut current) = cursor.path.pop() else {
            return Ok(None);
        };
        let left = self.store.node(current)?.left;
        if !left.is_nil() {
            cursor.path.push(current)?;
            let mut handle = left;
            while !handle.is_nil() {
                cursor.path.push(handle)?;
                handle = self.store.node(handle)?.right;
            }
        } else {
            while let Some(ancestor) = cursor.path.top() {
                if self.store.node(ancestor)?.left != current {
                    break;
                }
                current = ancestor;
                cursor.path.pop();
            }
        }
        self.peek(cursor)
    }

    /// Insert `value` with the given tag payload. Returns `Ok(false)`
    /// without touching the tree when an equal value is already present.
    /// On success the cursor is left positioned on the inserted node.
    pub fn insert(
        &mut self,
        cursor: &mut Cursor<S::Handle>,
        value: V,
        tag: A,
    ) -> Result<bool, CoppiceError> {
        self.guard(cursor)?;
        let outcome = self.seek(&value, cursor)?;
        if outcome == Ordering::Equal && !cursor.path.is_empty() {
            return Ok(false);
        }

        let mut tag = tag;
        tag.set_height(1);
        tag.refresh(None, None);
        let handle = self.store.allocate(value, tag)?;

        if let Some(parent) = cursor.path.top() {
            let node = self.store.node_mut(parent)?;
            if outcome == Ordering::Less {
                node.left = handle;
            } else {
                node.right = handle;
            }
            self.rebalance(&mut cursor.path)?;
        } else {
            self.root = handle;
        }
        self.count += 1;

        // Rotations may have moved the new node relative to the recorded
        // path; leave the cursor on a canonical root-to-node path.
        self.reseek(handle, cursor)?;
        Ok(true)
    }

    /// Remove the node the cursor is positioned on and return its value.
    ///
    /// Afterwards the cursor sits on the node that took over the vacated
    /// position (the in-order successor for a two-child delete, the
    /// promoted child or the parent otherwise), or is empty when the tree
    /// emptied.
    pub fn delete(&mut self, cursor: &mut Cursor<S::Handle>) -> Result<V, CoppiceError> {
        self.guard(cursor)?;
        let Some(target) = cursor.path.top() else {
            return Err(CoppiceError::InvalidArgument(
                "cursor is not positioned on a node",
            ));
        };
        let depth = cursor.path.len() - 1;
        let (left, right) = {
            let node = self.store.node(target)?;
            (node.left, node.right)
        };

        let replacement = if right.is_nil() {
            // no right child: the left child (possibly nil) moves up
            left
        } else {
            let right_left = self.store.node(right)?.left;
            if right_left.is_nil() {
                // right child has no left child: splice the left subtree
                // under it
                self.store.node_mut(right)?.left = left;
                right
            } else {
                // general case: the leftmost descendant of the right
                // subtree replaces the target. Record the right spine on
                // the path so rebalancing can walk it afterwards.
                cursor.path.push(right)?;
                let mut leftmost = right_left;
                loop {
                    let next = self.store.node(leftmost)?.left;
                    if next.is_nil() {
                        break;
                    }
                    cursor.path.push(leftmost)?;
                    leftmost = next;
                }
                let parent = cursor
                    .path
                    .top()
                    .ok_or(CoppiceError::InvalidArgument("corrupt cursor path"))?;
                let leftmost_right = self.store.node(leftmost)?.right;
                self.store.node_mut(parent)?.left = leftmost_right;
                self.store.node_mut(leftmost)?.left = left;
                self.store.node_mut(leftmost)?.right = right;
                leftmost
            }
        };

        // Swap the replacement into the vacated position and repair the
        // parent's child link.
        if replacement.is_nil() {
            cursor.path.pop();
        } else {
            cursor.path.set(depth, replacement);
        }
        if depth == 0 {
            self.root = replacement;
        } else {
            let parent = cursor.path.as_slice()[depth - 1];
            let node = self.store.node_mut(parent)?;
            if node.left == target {
                node.left = replacement;
            } else {
                node.right = replacement;
            }
        }

        let anchor = if !replacement.is_nil() {
            replacement
        } else if depth > 0 {
            cursor.path.as_slice()[depth - 1]
        } else {
            S::Handle::NIL
        };

        if !cursor.path.is_empty() {
            self.rebalance(&mut cursor.path)?;
        }

        let node = self.store.release(target)?;
        self.count -= 1;

        if anchor.is_nil() {
            cursor.path.clear();
        } else {
            self.reseek(anchor, cursor)?;
        }
        Ok(node.value)
    }

    /// Release every node and reset to the empty tree.
    pub fn clear(&mut self) -> Result<(), CoppiceError> {
        let mut pending = Vec::new();
        if !self.root.is_nil() {
            pending.push(self.root);
        }
        while let Some(handle) = pending.pop() {
            let node = self.store.release(handle)?;
            if !node.left.is_nil() {
                pending.push(node.left);
            }
            if !node.right.is_nil() {
                pending.push(node.right);
            }
        }
        self.root = S::Handle::NIL;
        self.count = 0;
        Ok(())
    }

    /// In-order iterator over the stored values.
    pub fn iter(&self) -> Iter<'_, V, S, O, A> {
        Iter {
            tree: self,
            cursor: self.cursor(),
            started: false,
        }
    }

    fn reseek(
        &self,
        handle: S::Handle,
        cursor: &mut Cursor<S::Handle>,
    ) -> Result<(), CoppiceError> {
        let value = &self.store.node(handle)?.value;
        self.seek(value, cursor)?;
        Ok(())
    }

    fn height_of(&self, handle: S::Handle) -> Result<u8, CoppiceError> {
        if handle.is_nil() {
            Ok(0)
        } else {
            Ok(self.store.node(handle)?.tag.height())
        }
    }

    /// `height(right) - height(left)`; positive means right-heavy.
    fn balance_of(&self, handle: S::Handle) -> Result<i16, CoppiceError> {
        let node = self.store.node(handle)?;
        Ok(self.height_of(node.right)? as i16 - self.height_of(node.left)? as i16)
    }

    /// Recompute the tag of `handle` from its children: base height
    /// first, then the user part of the augmentation.
    fn refresh_tag(&mut self, handle: S::Handle) -> Result<(), CoppiceError> {
        let (left, right) = {
            let node = self.store.node(handle)?;
            (node.left, node.right)
        };
        let left_tag = if left.is_nil() {
            None
        } else {
            Some(self.store.node(left)?.tag.clone())
        };
        let right_tag = if right.is_nil() {
            None
        } else {
            Some(self.store.node(right)?.tag.clone())
        };
        let height = 1 + left_tag
            .as_ref()
            .map_or(0, |tag| tag.height())
            .max(right_tag.as_ref().map_or(0, |tag| tag.height()));

        let node = self.store.node_mut(handle)?;
        node.tag.set_height(height);
        node.tag.refresh(left_tag.as_ref(), right_tag.as_ref());
        Ok(())
    }

    /// Walk the recorded path from its deepest node to the root,
    /// refreshing tags and rotating wherever the balance invariant broke.
    /// Each level writes the (possibly new) subtree root back into the
    /// path and repairs the parent's child link.
    fn rebalance(&mut self, path: &mut Path<S::Handle>) -> Result<(), CoppiceError> {
        for depth in (0..path.len()).rev() {
            let handle = path.as_slice()[depth];
            self.refresh_tag(handle)?;
            let balance = self.balance_of(handle)?;

            let subtree = if balance > 1 {
                let right = self.store.node(handle)?.right;
                let right_node = self.store.node(right)?;
                let (inner, outer) = (right_node.left, right_node.right);
                if self.height_of(inner)? > self.height_of(outer)? {
                    self.rotate_right_left(handle)?
                } else {
                    self.rotate_left(handle)?
                }
            } else if balance < -1 {
                let left = self.store.node(handle)?.left;
                let left_node = self.store.node(left)?;
                let (inner, outer) = (left_node.right, left_node.left);
                if self.height_of(inner)? > self.height_of(outer)? {
                    self.rotate_left_right(handle)?
                } else {
                    self.rotate_right(handle)?
                }
            } else {
                handle
            };

            path.set(depth, subtree);
            if depth == 0 {
                self.root = subtree;
            } else if subtree != handle {
                let parent = path.as_slice()[depth - 1];
                let node = self.store.node_mut(parent)?;
                if node.left == handle {
                    node.left = subtree;
                } else {
                    node.right = subtree;
                }
            }
        }
        Ok(())
    }

    /// Single left rotation; returns the new subtree root. Tags are
    /// refreshed children-before-parent. Grandparents are untouched; the
    /// caller re-links the result.
    fn rotate_left(&mut self, handle: S::Handle) -> Result<S::Handle, CoppiceError> {
        let right = self.store.node(handle)?.right;
        let right_left = self.store.node(right)?.left;
        self.store.node_mut(handle)?.right = right_left;
        self.store.node_mut(right)?.left = handle;
        self.refresh_tag(handle)?;
        self.refresh_tag(right)?;
        Ok(right)
    }

    /// Single right rotation; mirror of [`Self::rotate_left`].
    fn rotate_right(&mut self, handle: S::Handle) -> Result<S::Handle, CoppiceError> {
        let left = self.store.node(handle)?.left;
        let left_right = self.store.node(left)?.right;
        self.store.node_mut(handle)?.left = left_right;
        self.store.node_mut(left)?.right = handle;
        self.refresh_tag(handle)?;
        self.refresh_tag(left)?;
        Ok(left)
    }

    /// Double rotation for a right-heavy node whose right child leans
    /// left: rotate the right child right, then this node left.
    fn rotate_right_left(&mut self, handle: S::Handle) -> Result<S::Handle, CoppiceError> {
        let right = self.store.node(handle)?.right;
        let pivot = self.rotate_right(right)?;
        self.store.node_mut(handle)?.right = pivot;
        self.rotate_left(handle)
    }

    /// Double rotation for a left-heavy node whose left child leans
    /// right.
    fn rotate_left_right(&mut self, handle: S::Handle) -> Result<S::Handle, CoppiceError> {
        let left = self.store.node(handle)?.left;
        let pivot = self.rotate_left(left)?;
        self.store.node_mut(handle)?.left = pivot;
        self.rotate_right(handle)
    }
}

/// In-order iterator driven by an internal cursor.
pub struct Iter<'a, V, S, O, A>
where
    S: NodeStore<V, A>,
    O: Order<V>,
    A: Augment,
{
    tree: &'a AvlTree<V, S, O, A>,
    cursor: Cursor<S::Handle>,
    started: bool,
}

impl<'a, V, S, O, A> Iterator for Iter<'a, V, S, O, A>
where
    S: NodeStore<V, A>,
    O: Order<V>,
    A: Augment,
{
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        let step = if self.started {
            self.tree.succ(&mut self.cursor)
        } else {
            self.started = true;
            self.tree.first(&mut self.cursor)
        };
        step.ok().flatten()
    }
}
