//! Hasher selection for keys and dependency snapshots.

#[cfg(feature = "std-hash")]
pub(crate) mod default {
    pub use std::collections::hash_map::DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::new()
    }
}

#[cfg(not(feature = "std-hash"))]
pub(crate) mod default {
    // fast branch
    pub use rustc_hash::FxHasher as DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::default()
    }
}

use std::hash::{Hash, Hasher};

/// Hash an arbitrary value down to the `u64` used for keys and
/// dependency snapshots.
pub(crate) fn hash_key<K: Hash>(key: &K) -> u64 {
    let mut hasher = default::new();
    key.hash(&mut hasher);
    hasher.finish()
}
