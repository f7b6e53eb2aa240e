//! Sparse table of containers keyed by the high 16 bits of each value.

use std::iter::Zip;
use std::ops::Range;
use std::vec;

use crate::container::Container;
use crate::util;

/// Parallel arrays of strictly increasing keys and their non-empty
/// containers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct RoaringArray {
    keys: Vec<u16>,
    containers: Vec<Container>,
}

impl RoaringArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            containers: Vec::with_capacity(capacity),
        }
    }

    /// Number of containers.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn keys(&self) -> &[u16] {
        &self.keys
    }

    #[inline]
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    /// Position of `key`, or where it would be inserted.
    ///
    /// Checks the last key first so that ascending inserts stay O(1).
    pub fn get_index(&self, key: u16) -> Result<usize, usize> {
        match self.keys.last() {
            None => Err(0),
            Some(&last) if last == key => Ok(self.keys.len() - 1),
            Some(&last) if last < key => Err(self.keys.len()),
            Some(_) => self.keys.binary_search(&key),
        }
    }

    /// First position `>= from` whose key is `>= key`.
    #[inline]
    pub fn advance_until(&self, key: u16, from: usize) -> usize {
        util::advance_until(&self.keys, from, key)
    }

    #[inline]
    pub fn key_at(&self, i: usize) -> u16 {
        self.keys[i]
    }

    #[inline]
    pub fn container_at(&self, i: usize) -> &Container {
        &self.containers[i]
    }

    #[inline]
    pub fn container_at_mut(&mut self, i: usize) -> &mut Container {
        &mut self.containers[i]
    }

    pub fn get(&self, key: u16) -> Option<&Container> {
        self.get_index(key).ok().map(|i| &self.containers[i])
    }

    /// The container for `key`, inserting an empty one if absent.
    ///
    /// Callers must not leave the inserted container empty.
    pub fn get_or_insert(&mut self, key: u16) -> &mut Container {
        let i = match self.get_index(key) {
            Ok(i) => i,
            Err(i) => {
                self.insert_new_key_value_at(i, key, Container::default());
                i
            }
        };
        &mut self.containers[i]
    }

    pub fn insert_new_key_value_at(&mut self, i: usize, key: u16, container: Container) {
        debug_assert!(i == 0 || self.keys[i - 1] < key);
        debug_assert!(i == self.keys.len() || key < self.keys[i]);
        self.keys.insert(i, key);
        self.containers.insert(i, container);
    }

    pub fn remove_at(&mut self, i: usize) -> (u16, Container) {
        (self.keys.remove(i), self.containers.remove(i))
    }

    /// Removes the container at `i` if it has become empty.
    pub fn prune_at(&mut self, i: usize) {
        if self.containers[i].is_empty() {
            self.remove_at(i);
        }
    }

    /// Appends past the last key, dropping empty containers.
    pub fn append(&mut self, key: u16, container: Container) {
        debug_assert!(self.keys.last().map_or(true, |&last| last < key));
        if !container.is_empty() {
            self.keys.push(key);
            self.containers.push(container);
        }
    }

    /// Appends clones of `other`'s entries in `range`.
    pub fn append_copies(&mut self, other: &RoaringArray, range: Range<usize>) {
        debug_assert!(range.is_empty()
            || self.keys.last().map_or(true, |&last| last < other.keys[range.start]));
        self.keys.extend_from_slice(&other.keys[range.clone()]);
        self.containers.extend_from_slice(&other.containers[range]);
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.containers.clear();
    }

    pub fn shrink_to_fit(&mut self) {
        self.keys.shrink_to_fit();
        self.containers.shrink_to_fit();
        for c in &mut self.containers {
            c.shrink_to_fit();
        }
    }

    /// Sum of container cardinalities.
    pub fn cardinality(&self) -> u64 {
        self.containers.iter().map(|c| u64::from(c.len())).sum()
    }

    pub fn has_run_containers(&self) -> bool {
        self.containers.iter().any(Container::is_run)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (u16, &Container)> + '_ {
        self.keys.iter().copied().zip(self.containers.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u16, &mut Container)> + '_ {
        self.keys.iter().copied().zip(self.containers.iter_mut())
    }
}

impl IntoIterator for RoaringArray {
    type Item = (u16, Container);
    type IntoIter = Zip<vec::IntoIter<u16>, vec::IntoIter<Container>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter().zip(self.containers)
    }
}
