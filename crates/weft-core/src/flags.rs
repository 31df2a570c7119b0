//! Side-effect flags accumulated during the render phase and consumed
//! during commit.

use bitflags::bitflags;

bitflags! {
    /// What the commit phase has to do for a node.
    ///
    /// `subtree_flags` on a node is the union of flags below it, letting
    /// the commit walk skip entire branches whose subtree mask is clean.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub(crate) struct EffectFlags: u8 {
        /// Node must be (re)inserted into the host tree.
        const PLACEMENT = 1 << 0;
        /// Host props or text content changed in place.
        const UPDATE = 1 << 1;
        /// One or more children recorded in `deletions` must be unmounted.
        const CHILD_DELETION = 1 << 2;
        /// Node has effects to run after mutation, in a deferred task.
        const PASSIVE = 1 << 3;
    }
}

impl EffectFlags {
    /// Everything the commit walk cares about.
    pub(crate) const MUTATION: EffectFlags = EffectFlags::PLACEMENT
        .union(EffectFlags::UPDATE)
        .union(EffectFlags::CHILD_DELETION)
        .union(EffectFlags::PASSIVE);
}
