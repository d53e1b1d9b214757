//! Map for keeping track of which [`HashMap`] key corresponds to which index in
//! an underlying [`Vec`].

use anyhow::{Result, bail};
use hashbrown::{HashMap, hash_map::Entry};
use rustc_hash::FxBuildHasher;
use std::{
    fmt::{self, Debug},
    hash::Hash,
};

/// Map for keeping track of which [`HashMap`] key corresponds to which index in
/// an underlying [`Vec`].
///
/// Items are only ever appended, so the index of a key stays valid for as
/// long as the mapper lives (or until [`Self::clear`] is called). This lets
/// owners store their items compactly in a `Vec` while handing out stable keys.
#[derive(Clone)]
pub struct KeyIndexMapper<K> {
    indices_for_keys: HashMap<K, usize, FxBuildHasher>,
    keys_at_indices: Vec<K>,
}

impl<K> KeyIndexMapper<K>
where
    K: Copy + Hash + Eq + Debug,
{
    /// Creates a new mapper with no keys.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a new mapper with at least the specified capacity and no keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices_for_keys: HashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
            keys_at_indices: Vec::with_capacity(capacity),
        }
    }

    /// Creates a new mapper with the given set of keys. The index of each key
    /// will correspond to the position of the key in the provided iterator.
    ///
    /// # Errors
    /// Returns an error if the iterator has multiple occurrences of the same
    /// key.
    pub fn new_with_keys(key_iter: impl IntoIterator<Item = K>) -> Result<Self> {
        let key_iter = key_iter.into_iter();
        let mut mapper = Self::with_capacity(key_iter.size_hint().0);
        for key in key_iter {
            mapper.push_key(key)?;
        }
        Ok(mapper)
    }

    /// Returns an iterator over all keys in the order in which their entries in
    /// the underlying [`Vec`] are stored.
    pub fn key_at_each_idx(&self) -> impl Iterator<Item = K> + '_ {
        self.keys_at_indices.iter().copied()
    }

    /// Returns a slice with all keys in the order in which their entries in the
    /// underlying [`Vec`] are stored.
    pub fn keys_at_indices(&self) -> &[K] {
        &self.keys_at_indices
    }

    /// Whether the mapper has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys_at_indices.is_empty()
    }

    /// Whether an index exists for the given key.
    pub fn contains_key(&self, key: K) -> bool {
        self.indices_for_keys.contains_key(&key)
    }

    /// The number of keys/indices in the mapper.
    pub fn len(&self) -> usize {
        self.keys_at_indices.len()
    }

    /// Returns the index corresponding to the given key if the key exists,
    /// otherwise returns [`None`].
    pub fn get(&self, key: K) -> Option<usize> {
        self.indices_for_keys.get(&key).copied()
    }

    /// Returns the key corresponding to the given index, or [`None`] if the
    /// index is out of bounds.
    pub fn key_at_idx(&self, idx: usize) -> Option<K> {
        self.keys_at_indices.get(idx).copied()
    }

    /// Adds the given key and maps it to the next index.
    ///
    /// # Returns
    /// The index assigned to the key.
    ///
    /// # Errors
    /// Returns an error if the key already exists.
    pub fn push_key(&mut self, key: K) -> Result<usize> {
        match self.indices_for_keys.entry(key) {
            Entry::Vacant(entry) => {
                let idx_of_new_key = self.keys_at_indices.len();
                entry.insert(idx_of_new_key);
                self.keys_at_indices.push(key);
                Ok(idx_of_new_key)
            }
            Entry::Occupied(entry) => {
                bail!("Key {key:?} is already mapped to index {}", entry.get())
            }
        }
    }

    /// Removes the key at the given index by moving the last key into its
    /// place, mirroring [`Vec::swap_remove`] on the underlying [`Vec`].
    ///
    /// # Errors
    /// Returns an error if the index is out of bounds.
    pub fn swap_remove_key_at_idx(&mut self, idx: usize) -> Result<K> {
        if idx >= self.keys_at_indices.len() {
            bail!(
                "Index {idx} is out of bounds for mapper with {} keys",
                self.keys_at_indices.len()
            );
        }
        let removed_key = self.keys_at_indices.swap_remove(idx);
        self.indices_for_keys.remove(&removed_key);
        if let Some(&moved_key) = self.keys_at_indices.get(idx) {
            self.indices_for_keys.insert(moved_key, idx);
        }
        Ok(removed_key)
    }

    /// Clears all stored indices and keys.
    pub fn clear(&mut self) {
        self.indices_for_keys.clear();
        self.keys_at_indices.clear();
    }
}

impl<K> Default for KeyIndexMapper<K>
where
    K: Copy + Hash + Eq + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Debug> Debug for KeyIndexMapper<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyIndexMapper")
            .field("indices_for_keys", &self.indices_for_keys)
            .field("keys_at_indices", &self.keys_at_indices)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_index_mapper_initialization_works() {
        let mapper = KeyIndexMapper::<i32>::new();
        assert!(mapper.is_empty());

        let mapper = KeyIndexMapper::new_with_keys([4, 2]).unwrap();
        assert_eq!(mapper.len(), 2);
        assert_eq!(mapper.get(4), Some(0));
        assert_eq!(mapper.get(2), Some(1));
        assert_eq!(mapper.key_at_idx(0), Some(4));
        assert_eq!(mapper.key_at_idx(1), Some(2));
    }

    #[test]
    fn key_index_mapper_initializing_with_duplicate_keys_fails() {
        assert!(KeyIndexMapper::new_with_keys([2, 4, 2]).is_err());
    }

    #[test]
    fn key_index_mapper_key_at_each_idx_gives_keys_in_insertion_order() {
        let mapper = KeyIndexMapper::new_with_keys([4, 2, 100]).unwrap();
        let keys: Vec<_> = mapper.key_at_each_idx().collect();
        assert_eq!(keys, vec![4, 2, 100]);
        assert_eq!(mapper.keys_at_indices(), &[4, 2, 100]);
    }

    #[test]
    fn key_index_mapper_get_gives_none_for_missing_key() {
        let mapper = KeyIndexMapper::new_with_keys([4, 2, 100]).unwrap();
        assert_eq!(mapper.get(0), None);
        assert!(!mapper.contains_key(0));
        assert!(mapper.contains_key(100));
        assert_eq!(mapper.key_at_idx(3), None);
    }

    #[test]
    fn key_index_mapper_push_key_returns_next_index() {
        let mut mapper = KeyIndexMapper::new();
        assert_eq!(mapper.push_key(7).unwrap(), 0);
        assert_eq!(mapper.push_key(3).unwrap(), 1);
        assert!(mapper.push_key(7).is_err());
        assert_eq!(mapper.len(), 2);
    }

    #[test]
    fn key_index_mapper_swap_remove_moves_last_key_into_gap() {
        let mut mapper = KeyIndexMapper::new_with_keys([4, 2, 100]).unwrap();
        assert_eq!(mapper.swap_remove_key_at_idx(0).unwrap(), 4);
        assert_eq!(mapper.keys_at_indices(), &[100, 2]);
        assert_eq!(mapper.get(100), Some(0));
        assert_eq!(mapper.get(2), Some(1));
        assert!(!mapper.contains_key(4));
    }

    #[test]
    fn key_index_mapper_swap_remove_of_last_key_works() {
        let mut mapper = KeyIndexMapper::new_with_keys([4, 2]).unwrap();
        assert_eq!(mapper.swap_remove_key_at_idx(1).unwrap(), 2);
        assert_eq!(mapper.keys_at_indices(), &[4]);
        assert!(mapper.swap_remove_key_at_idx(1).is_err());
    }

    #[test]
    fn key_index_mapper_clear_removes_all_keys() {
        let mut mapper = KeyIndexMapper::new_with_keys([1, 2, 3]).unwrap();
        mapper.clear();
        assert!(mapper.is_empty());
        assert_eq!(mapper.get(1), None);
        assert_eq!(mapper.push_key(2).unwrap(), 0);
    }
}
