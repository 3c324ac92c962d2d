//! Tag augmentations: monoidal per-node annotations recomputed on every
//! structural change.
//!
//! A tag is a function of the subtree below its node. The engine owns the
//! base subset (the AVL height byte, reached through
//! [`Augment::height`]/[`Augment::set_height`]); anything else a caller
//! wants to maintain (subtree sizes, sums, interval bounds) composes on
//! top via [`Augment::refresh`]. Extension is by composition, never by
//! inheritance: a custom tag embeds a [`Height`] and forwards to it.

/// Capability trait for tag types carried in tree nodes.
///
/// `refresh` receives the children's tags (`None` for a nil child) and
/// must recompute the user part of the augmentation; the default is a
/// no-op for tags that carry nothing beyond the height. The engine calls
/// `set_height` before `refresh`, in children-before-parent order, on
/// every node whose children changed.
pub trait Augment: Clone {
    /// Height of the subtree rooted at the tagged node (0 for nil).
    fn height(&self) -> u8;

    fn set_height(&mut self, height: u8);

    /// Recompute the user augmentation from the children's tags.
    #[allow(unused_variables)]
    fn refresh(&mut self, left: Option<&Self>, right: Option<&Self>) {}
}

/// The plain AVL tag: a single height byte, identity 0, combiner
/// `1 + max(left, right)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Height(u8);

impl Height {
    pub fn new() -> Self {
        Height(0)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Augment for Height {
    fn height(&self) -> u8 {
        self.0
    }

    fn set_height(&mut self, height: u8) {
        self.0 = height;
    }
}
