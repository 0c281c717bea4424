//! Capability-scoped entry views
//!
//! A user function never touches the store directly. It receives a view of
//! one entry whose type decides what the function may do:
//!
//! | View            | read | write | combinators |
//! |-----------------|------|-------|-------------|
//! | [`ReadOnlyView`]  | yes  | no    | no          |
//! | [`WriteOnlyView`] | no   | yes   | no          |
//! | [`ReadWriteView`] | yes  | yes   | yes         |
//!
//! Writes made through a view are intents: nothing reaches the store until
//! the function returns and the engine commits the final intent. The last
//! `set` or `remove` call wins.

use cachet_core::{
    CacheEntry, Error, Lookup, MetaParamKind, MetaParams, Result, WritableMeta,
};

// =============================================================================
// Capability traits
// =============================================================================

/// Read access to one entry
pub trait ReadEntryView<K, V>: Lookup {
    /// The entry's key
    fn key(&self) -> &K;

    /// The value, `None` when absent
    fn find(&self) -> Option<&V>;

    /// The value
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchElement`] when the entry is absent.
    fn get(&self) -> Result<&V> {
        self.find().ok_or(Error::NoSuchElement)
    }
}

/// Write access to one entry
pub trait WriteEntryView<V> {
    /// Store `value` with metadata
    fn set_with(&mut self, value: V, metas: &[WritableMeta]);

    /// Remove the entry
    fn remove(&mut self);

    /// Store `value` without metadata
    fn set(&mut self, value: V) {
        self.set_with(value, &[])
    }
}

/// Read and write access to one entry, plus combinators built from
/// `find`, `set` and `remove`
pub trait ReadWriteEntryView<K, V>: ReadEntryView<K, V> + WriteEntryView<V> {
    /// Store `f(find())`, or remove when it returns `None`
    fn update<F>(&mut self, f: F)
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        match f(self.find()) {
            Some(v) => self.set(v),
            None => self.remove(),
        }
    }

    /// Like [`update`](Self::update), returning the new value
    fn compute<F>(&mut self, f: F) -> Option<V>
    where
        F: FnOnce(Option<&V>) -> Option<V>,
        V: Clone,
    {
        let computed = f(self.find());
        match &computed {
            Some(v) => self.set(v.clone()),
            None => self.remove(),
        }
        computed
    }

    /// Store `supplier()` only when absent; returns whether it wrote
    fn set_if_absent<F>(&mut self, supplier: F) -> bool
    where
        F: FnOnce() -> V,
    {
        if self.find().is_some() {
            return false;
        }
        self.set(supplier());
        true
    }

    /// Apply `f` to a present value; returns whether it ran
    fn update_if_present<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&V) -> Option<V>,
    {
        let next = match self.find() {
            Some(current) => f(current),
            None => return false,
        };
        match next {
            Some(v) => self.set(v),
            None => self.remove(),
        }
        true
    }

    /// Apply `f` to a present value and return its result; `None` and no
    /// write when absent
    fn compute_if_present<F>(&mut self, f: F) -> Option<V>
    where
        F: FnOnce(&V) -> Option<V>,
        V: Clone,
    {
        let computed = f(self.find()?);
        match &computed {
            Some(v) => self.set(v.clone()),
            None => self.remove(),
        }
        computed
    }
}

// =============================================================================
// Write intent
// =============================================================================

/// What a function asked the engine to do with its entry
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WriteIntent<V> {
    /// No write
    Unchanged,
    /// Store a value with caller metadata
    Set { value: V, metas: MetaParams },
    /// Remove the entry
    Remove,
}

// =============================================================================
// ReadOnlyView
// =============================================================================

/// Snapshot of one entry, readable only
///
/// Also handed to listeners and yielded by `ReadOnlyMap::entries`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOnlyView<K, V> {
    key: K,
    entry: Option<CacheEntry<V>>,
}

impl<K, V> ReadOnlyView<K, V> {
    pub(crate) fn new(key: K, entry: Option<CacheEntry<V>>) -> Self {
        ReadOnlyView { key, entry }
    }

    /// Value and metadata, `None` when absent
    pub fn entry(&self) -> Option<&CacheEntry<V>> {
        self.entry.as_ref()
    }

    /// Take the value out of the snapshot
    pub fn into_value(self) -> Option<V> {
        self.entry.map(|e| e.value)
    }
}

impl<K, V> Lookup for ReadOnlyView<K, V> {
    fn find_meta_param<M: MetaParamKind>(&self) -> Option<&M> {
        self.entry.as_ref().and_then(|e| e.metas.find::<M>())
    }
}

impl<K, V> ReadEntryView<K, V> for ReadOnlyView<K, V> {
    fn key(&self) -> &K {
        &self.key
    }

    fn find(&self) -> Option<&V> {
        self.entry.as_ref().map(|e| &e.value)
    }
}

// =============================================================================
// WriteOnlyView
// =============================================================================

/// Write access to one entry without visibility of its current value
#[derive(Debug)]
pub struct WriteOnlyView<K, V> {
    key: K,
    intent: WriteIntent<V>,
}

impl<K, V> WriteOnlyView<K, V> {
    pub(crate) fn new(key: K) -> Self {
        WriteOnlyView {
            key,
            intent: WriteIntent::Unchanged,
        }
    }

    /// The entry's key
    pub fn key(&self) -> &K {
        &self.key
    }

    pub(crate) fn into_intent(self) -> WriteIntent<V> {
        self.intent
    }
}

impl<K, V> WriteEntryView<V> for WriteOnlyView<K, V> {
    fn set_with(&mut self, value: V, metas: &[WritableMeta]) {
        self.intent = WriteIntent::Set {
            value,
            metas: MetaParams::from_writable(metas),
        };
    }

    fn remove(&mut self) {
        self.intent = WriteIntent::Remove;
    }
}

// =============================================================================
// ReadWriteView
// =============================================================================

/// Read and write access to one entry
///
/// Reads observe the function's own writes: `find` after `set` returns the
/// new value, after `remove` it returns `None`.
#[derive(Debug)]
pub struct ReadWriteView<K, V> {
    key: K,
    current: Option<CacheEntry<V>>,
    dirty: bool,
}

impl<K, V> ReadWriteView<K, V> {
    pub(crate) fn new(key: K, current: Option<CacheEntry<V>>) -> Self {
        ReadWriteView {
            key,
            current,
            dirty: false,
        }
    }

    /// Read-only copy of what the view currently holds
    pub fn snapshot(&self) -> ReadOnlyView<K, V>
    where
        K: Clone,
        V: Clone,
    {
        ReadOnlyView::new(self.key.clone(), self.current.clone())
    }

    pub(crate) fn into_intent(self) -> WriteIntent<V> {
        match (self.dirty, self.current) {
            (false, _) => WriteIntent::Unchanged,
            (true, Some(entry)) => WriteIntent::Set {
                value: entry.value,
                metas: entry.metas,
            },
            (true, None) => WriteIntent::Remove,
        }
    }
}

impl<K, V> Lookup for ReadWriteView<K, V> {
    fn find_meta_param<M: MetaParamKind>(&self) -> Option<&M> {
        self.current.as_ref().and_then(|e| e.metas.find::<M>())
    }
}

impl<K, V> ReadEntryView<K, V> for ReadWriteView<K, V> {
    fn key(&self) -> &K {
        &self.key
    }

    fn find(&self) -> Option<&V> {
        self.current.as_ref().map(|e| &e.value)
    }
}

impl<K, V> WriteEntryView<V> for ReadWriteView<K, V> {
    fn set_with(&mut self, value: V, metas: &[WritableMeta]) {
        self.current = Some(CacheEntry::new(value, MetaParams::from_writable(metas)));
        self.dirty = true;
    }

    fn remove(&mut self) {
        self.current = None;
        self.dirty = true;
    }
}

impl<K, V> ReadWriteEntryView<K, V> for ReadWriteView<K, V> {}
