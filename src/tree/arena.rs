//! Chunked arena storage for tree nodes with compact 16-bit handles.
//!
//! The arena owns a growable sequence of fixed-size chunks. A handle
//! packs the chunk index in its high bits and the slot offset in its low
//! bits; handle 0 is reserved as nil, so slot 0 of chunk 0 is a permanent
//! sentinel and the first allocation hands out handle 1. Vacant slots are
//! threaded into a singly-linked free list that reuses the node's own
//! storage for the link; allocation pops from the head, and whenever the
//! list runs dry a fresh chunk is appended with its interior pre-linked.
//!
//! Capacity is `2^16 - 1` nodes per arena. Compaction is an advertised
//! capability but is not implemented; [`ChunkArena::compact`] always
//! fails with `Unsupported`.

use tracing::debug;

use crate::errors::CoppiceError;
use crate::tree::node::{Node, TreeHandle};
use crate::tree::store::NodeStore;

/// Compact index into a [`ChunkArena`]. 0 is nil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaHandle(u16);

impl ArenaHandle {
    pub fn raw(self) -> u16 {
        self.0
    }
}

impl TreeHandle for ArenaHandle {
    const NIL: Self = ArenaHandle(0);
}

/// One slot of a chunk: either a live node or a link in the free list.
/// The `Vacant` variant reuses the storage a freed node's child handles
/// occupied.
#[derive(Debug)]
enum ArenaSlot<V, A> {
    Vacant { next: ArenaHandle },
    Occupied(Node<V, A, ArenaHandle>),
}

/// Chunked node arena with an intrusive free list.
#[derive(Debug)]
pub struct ChunkArena<V, A> {
    chunks: Vec<Box<[ArenaSlot<V, A>]>>,
    chunk_bits: u8,
    free_head: ArenaHandle,
    live: usize,
}

impl<V, A> ChunkArena<V, A> {
    /// Create an arena whose chunks hold `1 << chunk_bits` slots.
    /// `chunk_bits` must lie in `2..=8`.
    pub fn new(chunk_bits: u8) -> Result<Self, CoppiceError> {
        if !(2..=8).contains(&chunk_bits) {
            return Err(CoppiceError::InvalidArgument("chunk_bits must be in 2..=8"));
        }
        Ok(ChunkArena {
            chunks: Vec::new(),
            chunk_bits,
            free_head: ArenaHandle::NIL,
            live: 0,
        })
    }

    /// Total slots currently backed by chunks, including the nil sentinel.
    pub fn capacity(&self) -> usize {
        self.chunks.len() << self.chunk_bits
    }

    /// Compact the arena towards `threshold` occupancy.
    ///
    /// Declared but unimplemented; always fails with `Unsupported`.
    pub fn compact(&mut self, _threshold: usize) -> Result<(), CoppiceError> {
        Err(CoppiceError::Unsupported("arena compaction"))
    }

    /// Walk the free list. Used by diagnostics and tests.
    pub fn free_handles(&self) -> Vec<ArenaHandle> {
        let mut handles = Vec::new();
        let mut cursor = self.free_head;
        while !cursor.is_nil() {
            handles.push(cursor);
            cursor = match self.slot(cursor) {
                Some(ArenaSlot::Vacant { next }) => *next,
                _ => break,
            };
        }
        handles
    }

    fn offset_mask(&self) -> u16 {
        (1u16 << self.chunk_bits) - 1
    }

    fn slot(&self, handle: ArenaHandle) -> Option<&ArenaSlot<V, A>> {
        let chunk = (handle.0 >> self.chunk_bits) as usize;
        let offset = (handle.0 & self.offset_mask()) as usize;
        self.chunks.get(chunk)?.get(offset)
    }

    fn slot_mut(&mut self, handle: ArenaHandle) -> Option<&mut ArenaSlot<V, A>> {
        let chunk = (handle.0 >> self.chunk_bits) as usize;
        let offset = (handle.0 & self.offset_mask()) as usize;
        self.chunks.get_mut(chunk)?.get_mut(offset)
    }

    /// Append a fresh chunk and thread its interior into the free list so
    /// that allocation hands out ascending offsets. Slot 0 of chunk 0 is
    /// skipped: it is the nil sentinel and never joins the list.
    fn grow(&mut self) -> Result<(), CoppiceError> {
        let chunk_len = 1usize << self.chunk_bits;
        let base = self.capacity();
        if base + chunk_len > 1 << 16 {
            return Err(CoppiceError::ArenaExhausted);
        }

        let tail = self.free_head;
        let first = usize::from(base == 0);
        let mut chunk = Vec::with_capacity(chunk_len);
        for offset in 0..chunk_len {
            let next = if base + offset == 0 {
                ArenaHandle::NIL
            } else if offset + 1 < chunk_len {
                ArenaHandle((base + offset + 1) as u16)
            } else {
                tail
            };
            chunk.push(ArenaSlot::Vacant { next });
        }
        self.chunks.push(chunk.into_boxed_slice());
        self.free_head = ArenaHandle((base + first) as u16);
        debug!(
            chunks = self.chunks.len(),
            capacity = self.capacity(),
            "arena grew by one chunk"
        );
        Ok(())
    }
}

impl<V, A> NodeStore<V, A> for ChunkArena<V, A> {
    type Handle = ArenaHandle;

    fn allocate(&mut self, value: V, tag: A) -> Result<ArenaHandle, CoppiceError> {
        if self.free_head.is_nil() {
            self.grow()?;
        }
        let handle = self.free_head;
        let slot = self
            .slot_mut(handle)
            .ok_or(CoppiceError::InvalidHandle)?;
        let next = match slot {
            ArenaSlot::Vacant { next } => *next,
            // the free list only ever threads vacant slots
            ArenaSlot::Occupied(_) => return Err(CoppiceError::InvalidHandle),
        };
        *slot = ArenaSlot::Occupied(Node::leaf(value, tag));
        self.free_head = next;
        self.live += 1;
        Ok(handle)
    }

    fn release(&mut self, handle: ArenaHandle) -> Result<Node<V, A, ArenaHandle>, CoppiceError> {
        if handle.is_nil() {
            return Err(CoppiceError::InvalidHandle);
        }
        let head = self.free_head;
        let slot = self
            .slot_mut(handle)
            .ok_or(CoppiceError::InvalidHandle)?;
        match std::mem::replace(slot, ArenaSlot::Vacant { next: head }) {
            ArenaSlot::Occupied(node) => {
                self.free_head = handle;
                self.live -= 1;
                Ok(node)
            }
            vacant @ ArenaSlot::Vacant { .. } => {
                // double free; restore the slot untouched
                *slot = vacant;
                Err(CoppiceError::InvalidHandle)
            }
        }
    }

    fn node(&self, handle: ArenaHandle) -> Result<&Node<V, A, ArenaHandle>, CoppiceError> {
        match self.slot(handle) {
            Some(ArenaSlot::Occupied(node)) => Ok(node),
            _ => Err(CoppiceError::InvalidHandle),
        }
    }

    fn node_mut(
        &mut self,
        handle: ArenaHandle,
    ) -> Result<&mut Node<V, A, ArenaHandle>, CoppiceError> {
        match self.slot_mut(handle) {
            Some(ArenaSlot::Occupied(node)) => Ok(node),
            _ => Err(CoppiceError::InvalidHandle),
        }
    }

    fn live(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tag::Height;

    fn arena(chunk_bits: u8) -> ChunkArena<u32, Height> {
        ChunkArena::new(chunk_bits).unwrap()
    }

    #[test]
    fn chunk_bits_is_validated() {
        assert!(ChunkArena::<u32, Height>::new(1).is_err());
        assert!(ChunkArena::<u32, Height>::new(9).is_err());
        assert!(ChunkArena::<u32, Height>::new(2).is_ok());
        assert!(ChunkArena::<u32, Height>::new(8).is_ok());
    }

    #[test]
    fn first_allocation_skips_the_sentinel() {
        let mut arena = arena(2);
        let first = arena.allocate(10, Height::new()).unwrap();
        assert_eq!(first.raw(), 1);
        let second = arena.allocate(11, Height::new()).unwrap();
        assert_eq!(second.raw(), 2);
    }

    #[test]
    fn freed_handles_are_reused_lifo() {
        // Scenario: allocate 10 handles, free the 3rd and 7th; the next
        // two allocations must return exactly those, most recent first.
        let mut arena = arena(3);
        let handles: Vec<_> = (0..10)
            .map(|i| arena.allocate(i, Height::new()).unwrap())
            .collect();

        arena.release(handles[2]).unwrap();
        arena.release(handles[6]).unwrap();
        assert_eq!(arena.free_handles()[..2], [handles[6], handles[2]]);

        assert_eq!(arena.allocate(96, Height::new()).unwrap(), handles[6]);
        assert_eq!(arena.allocate(92, Height::new()).unwrap(), handles[2]);
    }

    #[test]
    fn capacity_does_not_leak() {
        let mut arena = arena(4);
        let handles: Vec<_> = (0..40)
            .map(|i| arena.allocate(i, Height::new()).unwrap())
            .collect();
        let capacity = arena.capacity();

        for handle in handles {
            arena.release(handle).unwrap();
        }
        assert_eq!(arena.live(), 0);

        for i in 0..40 {
            arena.allocate(i, Height::new()).unwrap();
        }
        assert_eq!(arena.capacity(), capacity);
    }

    #[test]
    fn nil_and_vacant_do_not_dereference() {
        let mut arena = arena(2);
        assert_eq!(
            arena.node(ArenaHandle::NIL).unwrap_err(),
            CoppiceError::InvalidHandle
        );
        let handle = arena.allocate(1, Height::new()).unwrap();
        arena.release(handle).unwrap();
        assert_eq!(arena.node(handle).unwrap_err(), CoppiceError::InvalidHandle);
        assert_eq!(
            arena.release(handle).unwrap_err(),
            CoppiceError::InvalidHandle
        );
    }

    #[test]
    fn handle_space_is_sixteen_bits() {
        let mut arena = arena(8);
        for i in 0..u16::MAX as u32 {
            arena.allocate(i, Height::new()).unwrap();
        }
        assert_eq!(arena.live(), u16::MAX as usize);
        assert_eq!(
            arena.allocate(0, Height::new()).unwrap_err(),
            CoppiceError::ArenaExhausted
        );
    }

    #[test]
    fn compact_is_unsupported() {
        let mut arena = arena(2);
        assert!(matches!(
            arena.compact(0),
            Err(CoppiceError::Unsupported(_))
        ));
    }
}
