//! Id-keyed lookup tables used by the differ.
//!
//! With the `gxhash` feature the maps hash with gxhash; without it they fall
//! back to std so the crate still builds on CPUs lacking AES-NI/SSE2.

#[cfg(feature = "gxhash")]
pub use gxhash::{HashMap, HashMapExt, HashSet, HashSetExt};

#[cfg(not(feature = "gxhash"))]
pub use std::collections::{HashMap, HashSet};

/// Constructors shared by gxhash and std maps
#[cfg(not(feature = "gxhash"))]
pub trait HashMapExt {
    /// Creates a new map with specified capacity
    fn with_capacity(capacity: usize) -> Self;
}

#[cfg(not(feature = "gxhash"))]
impl<K, V> HashMapExt for HashMap<K, V> {
    fn with_capacity(capacity: usize) -> Self {
        HashMap::with_capacity(capacity)
    }
}

/// Constructors shared by gxhash and std sets
#[cfg(not(feature = "gxhash"))]
pub trait HashSetExt {
    /// Creates a new set with specified capacity
    fn with_capacity(capacity: usize) -> Self;
}

#[cfg(not(feature = "gxhash"))]
impl<T> HashSetExt for HashSet<T> {
    fn with_capacity(capacity: usize) -> Self {
        HashSet::with_capacity(capacity)
    }
}

/// Borrowed id → item table built from an ordered slice
pub type IdMap<'a, T> = HashMap<&'a str, &'a T>;

/// Index `items` by the id returned from `id_of`
///
/// Later duplicates overwrite earlier ones; snapshots are validated for
/// unique ids before they reach this point.
pub fn index_by_id<'a, T>(items: &'a [T], id_of: impl Fn(&'a T) -> &'a str) -> IdMap<'a, T> {
    let mut map: IdMap<'a, T> = HashMapExt::with_capacity(items.len());
    for item in items {
        map.insert(id_of(item), item);
    }
    map
}
