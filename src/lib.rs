//! ## About
//!
//! This crate contains ordered and indexed collections that occupy
//! different points in the design space of owned vs. arena-backed node
//! storage, mutable vs. structurally shared updates, and node layout:
//!
//! * a height-balanced binary search tree engine ([`tree`]) that
//!   traverses through explicit cursor paths, supports user-defined tag
//!   augmentations, and binds to either heap-owned nodes or a chunked
//!   arena with compact 16-bit handles
//! * a persistent indexed vector ([`vector`]) over a bit-partitioned
//!   trie with a mutable tail and a transient mode that reuses owned
//!   nodes in place
//!
//! Collections are single-owner objects: nothing here synchronizes
//! concurrent mutation of one instance. The only process-wide state is
//! the transient ticket counter in [`ticket`].
//!
//! ## Naming conventions
//! * Traits – adjectives or capabilities the engines consume from callers
//! * Structs – substantives that indicate entities implementing a behavior
//! * Methods – imperative forms with the exception of getters and factories,
//!             which use substantives (i.e., omit a `get_` prefix) much like
//!             the standard library

pub mod errors;
pub mod ticket;
pub mod tree;
pub mod vector;

pub use errors::CoppiceError;
pub use tree::{
    ArenaHandle, ArenaTree, Augment, AvlTree, ChunkArena, Cursor, FnOrder, HeapHandle, HeapStore,
    HeapTree, Height, Natural, Node, NodeStore, Order, Path, TreeHandle, MAX_DEPTH,
};
pub use vector::{TrieParams, TrieVec};
