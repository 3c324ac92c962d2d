//! Balanced binary search tree engine.
//!
//! # Nomenclature
//!
//! * Traits are capability seams the engine consumes from callers
//!   ([`Order`], [`Augment`], [`NodeStore`])
//! * Structs are nouns; the two store bindings are [`HeapStore`] and
//!   [`ChunkArena`], surfaced through the [`HeapTree`] and [`ArenaTree`]
//!   aliases
//!
//! Trees are never traversed recursively: a [`Cursor`] carries an
//! explicit path of handles, and successor/predecessor movement is pure
//! stack manipulation.

pub mod arena;
pub mod avl;
pub mod node;
pub mod order;
pub mod path;
pub mod store;
pub mod tag;

pub use arena::{ArenaHandle, ChunkArena};
pub use avl::{ArenaTree, AvlTree, HeapTree, Iter};
pub use node::{Node, TreeHandle};
pub use order::{FnOrder, Natural, Order};
pub use path::{Cursor, Path, MAX_DEPTH};
pub use store::{HeapHandle, HeapStore, NodeStore};
pub use tag::{Augment, Height};
