//! Blocking map facade over the functional surfaces
//!
//! [`ConcurrentMapAdapter`] offers the familiar concurrent-map vocabulary
//! (`get`, `put`, `put_if_absent`, `replace`...) for callers that do not
//! want to write entry functions. Every method is one named-function
//! invocation on the underlying map, joined before returning, so each is
//! atomic per key under the same locking rules as direct calls.

use cachet_core::{CacheKey, CacheValue, Result};

use crate::functions::{
    RemoveIfValueEquals, RemoveReturnPrevious, ReturnFind, ReturnIsPresent, SetValue,
    SetValueIfAbsent, SetValueIfEquals, SetValueIfPresent, SetValueReturnPrevious,
};
use crate::map::{FunctionalMap, ReadOnlyMap, ReadWriteMap, WriteOnlyMap};
use crate::view::ReadOnlyView;

/// Concurrent-map operations expressed through a [`FunctionalMap`]
pub struct ConcurrentMapAdapter<K: CacheKey, V: CacheValue> {
    read_only: ReadOnlyMap<K, V>,
    write_only: WriteOnlyMap<K, V>,
    read_write: ReadWriteMap<K, V>,
}

impl<K: CacheKey, V: CacheValue> ConcurrentMapAdapter<K, V> {
    /// Adapter sharing `map` and its params
    pub fn new(map: &FunctionalMap<K, V>) -> Self {
        ConcurrentMapAdapter {
            read_only: map.read_only(),
            write_only: map.write_only(),
            read_write: map.read_write(),
        }
    }

    /// The value for `key`
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        self.read_only.eval_named(key.clone(), ReturnFind).join()
    }

    /// Whether `key` has a value
    pub fn contains_key(&self, key: &K) -> Result<bool> {
        self.read_only.eval_named(key.clone(), ReturnIsPresent).join()
    }

    /// Store `value`, returning the previous value
    pub fn put(&self, key: K, value: V) -> Result<Option<V>> {
        self.read_write
            .eval_named_with(key, value, SetValueReturnPrevious::new())
            .join()
    }

    /// Store `value` unless present; returns the existing value when one was
    pub fn put_if_absent(&self, key: K, value: V) -> Result<Option<V>> {
        self.read_write
            .eval_named_with(key, value, SetValueIfAbsent::new())
            .join()
    }

    /// Replace a present value, returning it
    pub fn replace(&self, key: K, value: V) -> Result<Option<V>> {
        self.read_write
            .eval_named_with(key, value, SetValueIfPresent::new())
            .join()
    }

    /// Replace the value when it equals `expected`
    pub fn replace_if_equals(&self, key: K, expected: V, value: V) -> Result<bool>
    where
        V: PartialEq,
    {
        self.read_write
            .eval_named_with(key, value, SetValueIfEquals::new(expected))
            .join()
    }

    /// Remove `key`, returning its value
    pub fn remove(&self, key: &K) -> Result<Option<V>> {
        self.read_write
            .eval_named(key.clone(), RemoveReturnPrevious)
            .join()
    }

    /// Remove `key` when its value equals `expected`
    pub fn remove_if_equals(&self, key: &K, expected: V) -> Result<bool>
    where
        V: PartialEq,
    {
        self.read_write
            .eval_named_with(key.clone(), expected, RemoveIfValueEquals)
            .join()
    }

    /// Store every pair
    ///
    /// # Errors
    ///
    /// Every pair is attempted; the first failure is returned.
    pub fn put_all<I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.write_only
            .eval_many_named_with(entries, SetValue::new())
            .join()
    }

    /// Number of live in-memory entries
    pub fn len(&self) -> Result<usize> {
        Ok(self.read_only.keys()?.count())
    }

    /// Whether no live in-memory entry exists
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every entry
    pub fn clear(&self) -> Result<()> {
        self.write_only.truncate().join()
    }

    /// Keys of live in-memory entries
    pub fn keys(&self) -> Result<Vec<K>> {
        Ok(self.read_only.keys()?.collect())
    }

    /// Values of live in-memory entries
    pub fn values(&self) -> Result<Vec<V>> {
        Ok(self
            .read_only
            .entries()?
            .into_iter()
            .filter_map(ReadOnlyView::into_value)
            .collect())
    }
}

impl<K: CacheKey, V: CacheValue> Clone for ConcurrentMapAdapter<K, V> {
    fn clone(&self) -> Self {
        ConcurrentMapAdapter {
            read_only: self.read_only.clone(),
            write_only: self.write_only.clone(),
            read_write: self.read_write.clone(),
        }
    }
}
