//! Entry change listeners
//!
//! The engine reports every committed write as a [`Change`]. From it the
//! registry derives the events each listener family sees:
//!
//! | change                  | write listeners | read-write listeners |
//! |-------------------------|-----------------|----------------------|
//! | set, previously absent  | `on_write`      | `on_create`          |
//! | set, previously present | `on_write`      | `on_modify`          |
//! | removed                 | `on_write`      | `on_remove`          |
//!
//! A removal whose previous value was never read (a write-only remove of
//! an entry held only by the persistence tier) still reaches `on_write`,
//! but `on_remove` needs the previous value and is skipped.
//!
//! Read-write listeners only hear about writes made through a read-write
//! map, because only those writes know the previous value. A listener that
//! panics is logged and skipped; it never fails the write that fired it.

use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::warn;

use cachet_core::CacheEntry;

use crate::view::ReadOnlyView;

/// One committed write as seen by the listener registry
#[derive(Debug)]
pub(crate) enum Change<'a, V> {
    /// A value was stored
    Set {
        before: Option<&'a CacheEntry<V>>,
        after: &'a CacheEntry<V>,
    },
    /// An existing entry was removed
    Removed { before: Option<&'a CacheEntry<V>> },
}

/// Listener for every write, regardless of the map that made it
pub trait WriteListener<K, V>: Send + Sync {
    /// Called after a write; `view.find()` is `None` for a removal
    fn on_write(&self, view: &ReadOnlyView<K, V>);
}

/// Listener for create / modify / remove transitions
///
/// Every method defaults to a no-op so implementors override only what
/// they need.
pub trait ReadWriteListener<K, V>: Send + Sync {
    /// An absent entry became present
    fn on_create(&self, _created: &ReadOnlyView<K, V>) {}

    /// A present entry got a new value
    fn on_modify(&self, _before: &ReadOnlyView<K, V>, _after: &ReadOnlyView<K, V>) {}

    /// A present entry was removed; `removed` holds the last value
    fn on_remove(&self, _removed: &ReadOnlyView<K, V>) {}
}

/// Which map surface made the write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteSource {
    WriteOnly,
    ReadWrite,
}

// =============================================================================
// Closure adapters
// =============================================================================

struct OnWrite<F>(F);

impl<K, V, F> WriteListener<K, V> for OnWrite<F>
where
    F: Fn(&ReadOnlyView<K, V>) + Send + Sync,
{
    fn on_write(&self, view: &ReadOnlyView<K, V>) {
        (self.0)(view)
    }
}

struct OnCreate<F>(F);

impl<K, V, F> ReadWriteListener<K, V> for OnCreate<F>
where
    F: Fn(&ReadOnlyView<K, V>) + Send + Sync,
{
    fn on_create(&self, created: &ReadOnlyView<K, V>) {
        (self.0)(created)
    }
}

struct OnModify<F>(F);

impl<K, V, F> ReadWriteListener<K, V> for OnModify<F>
where
    F: Fn(&ReadOnlyView<K, V>, &ReadOnlyView<K, V>) + Send + Sync,
{
    fn on_modify(&self, before: &ReadOnlyView<K, V>, after: &ReadOnlyView<K, V>) {
        (self.0)(before, after)
    }
}

struct OnRemove<F>(F);

impl<K, V, F> ReadWriteListener<K, V> for OnRemove<F>
where
    F: Fn(&ReadOnlyView<K, V>) + Send + Sync,
{
    fn on_remove(&self, removed: &ReadOnlyView<K, V>) {
        (self.0)(removed)
    }
}

// =============================================================================
// Registry
// =============================================================================

type Registered<L> = RwLock<Vec<(u64, Arc<L>)>>;

/// Listeners registered on one map
pub(crate) struct ListenerRegistry<K, V> {
    next_id: AtomicU64,
    write: Registered<dyn WriteListener<K, V>>,
    read_write: Registered<dyn ReadWriteListener<K, V>>,
}

impl<K, V> ListenerRegistry<K, V>
where
    K: Clone + 'static,
    V: Clone + 'static,
{
    pub(crate) fn new() -> Self {
        ListenerRegistry {
            next_id: AtomicU64::new(1),
            write: RwLock::new(Vec::new()),
            read_write: RwLock::new(Vec::new()),
        }
    }

    fn add_write(self: &Arc<Self>, listener: Arc<dyn WriteListener<K, V>>) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.write.write().push((id, listener));
        self.handle(id)
    }

    fn add_read_write(
        self: &Arc<Self>,
        listener: Arc<dyn ReadWriteListener<K, V>>,
    ) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.read_write.write().push((id, listener));
        self.handle(id)
    }

    fn handle(self: &Arc<Self>, id: u64) -> ListenerHandle {
        let weak: Weak<Self> = Arc::downgrade(self);
        ListenerHandle {
            deregister: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    registry.remove(id);
                }
            })),
        }
    }

    fn remove(&self, id: u64) {
        self.write.write().retain(|(i, _)| *i != id);
        self.read_write.write().retain(|(i, _)| *i != id);
    }

    /// Number of registered listeners of both families
    pub(crate) fn len(&self) -> usize {
        self.write.read().len() + self.read_write.read().len()
    }

    /// Whether a write from `source` would reach any listener
    pub(crate) fn has_listeners(&self, source: WriteSource) -> bool {
        !self.write.read().is_empty()
            || (source == WriteSource::ReadWrite && !self.read_write.read().is_empty())
    }

    /// Dispatch the events derived from one committed write
    pub(crate) fn fire(&self, source: WriteSource, key: &K, change: Change<'_, V>) {
        if !self.has_listeners(source) {
            return;
        }
        let (before, after) = match change {
            Change::Set { before, after } => (before, Some(after)),
            Change::Removed { before } => (before, None),
        };

        // Snapshot so callbacks may register or close handles
        let write: Vec<_> = self.write.read().iter().map(|(_, l)| Arc::clone(l)).collect();
        let after_view = ReadOnlyView::new(key.clone(), after.cloned());
        for listener in &write {
            guarded("on_write", || listener.on_write(&after_view));
        }

        if source != WriteSource::ReadWrite {
            return;
        }
        let read_write: Vec<_> = self
            .read_write
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        if read_write.is_empty() {
            return;
        }
        match (before, after) {
            (None, Some(_)) => {
                for listener in &read_write {
                    guarded("on_create", || listener.on_create(&after_view));
                }
            }
            (Some(prev), Some(_)) => {
                let before_view = ReadOnlyView::new(key.clone(), Some(prev.clone()));
                for listener in &read_write {
                    guarded("on_modify", || listener.on_modify(&before_view, &after_view));
                }
            }
            (Some(prev), None) => {
                let before_view = ReadOnlyView::new(key.clone(), Some(prev.clone()));
                for listener in &read_write {
                    guarded("on_remove", || listener.on_remove(&before_view));
                }
            }
            (None, None) => {}
        }
    }
}

fn guarded(event: &'static str, f: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        warn!(event, %message, "Listener panicked; event skipped");
    }
}

// =============================================================================
// Public surfaces
// =============================================================================

/// Registration handle; the listener stays registered until the handle is
/// closed or dropped
#[must_use = "dropping the handle deregisters the listener"]
pub struct ListenerHandle {
    deregister: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ListenerHandle {
    /// Deregister the listener
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(deregister) = self.deregister.take() {
            deregister();
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("registered", &self.deregister.is_some())
            .finish()
    }
}

/// Listener registration available on a write-only map
pub struct WriteListeners<K, V> {
    registry: Arc<ListenerRegistry<K, V>>,
}

impl<K, V> WriteListeners<K, V>
where
    K: Clone + 'static,
    V: Clone + 'static,
{
    pub(crate) fn new(registry: Arc<ListenerRegistry<K, V>>) -> Self {
        WriteListeners { registry }
    }

    /// Call `f` after every write
    pub fn on_write<F>(&self, f: F) -> ListenerHandle
    where
        F: Fn(&ReadOnlyView<K, V>) + Send + Sync + 'static,
    {
        self.registry.add_write(Arc::new(OnWrite(f)))
    }

    /// Register a [`WriteListener`]
    pub fn add<L: WriteListener<K, V> + 'static>(&self, listener: L) -> ListenerHandle {
        self.registry.add_write(Arc::new(listener))
    }
}

/// Listener registration available on a read-write map
pub struct ReadWriteListeners<K, V> {
    registry: Arc<ListenerRegistry<K, V>>,
}

impl<K, V> ReadWriteListeners<K, V>
where
    K: Clone + 'static,
    V: Clone + 'static,
{
    pub(crate) fn new(registry: Arc<ListenerRegistry<K, V>>) -> Self {
        ReadWriteListeners { registry }
    }

    /// Call `f` after every write
    pub fn on_write<F>(&self, f: F) -> ListenerHandle
    where
        F: Fn(&ReadOnlyView<K, V>) + Send + Sync + 'static,
    {
        self.registry.add_write(Arc::new(OnWrite(f)))
    }

    /// Call `f` when an absent entry becomes present
    pub fn on_create<F>(&self, f: F) -> ListenerHandle
    where
        F: Fn(&ReadOnlyView<K, V>) + Send + Sync + 'static,
    {
        self.registry.add_read_write(Arc::new(OnCreate(f)))
    }

    /// Call `f(before, after)` when a present entry changes value
    pub fn on_modify<F>(&self, f: F) -> ListenerHandle
    where
        F: Fn(&ReadOnlyView<K, V>, &ReadOnlyView<K, V>) + Send + Sync + 'static,
    {
        self.registry.add_read_write(Arc::new(OnModify(f)))
    }

    /// Call `f` with the last value when a present entry is removed
    pub fn on_remove<F>(&self, f: F) -> ListenerHandle
    where
        F: Fn(&ReadOnlyView<K, V>) + Send + Sync + 'static,
    {
        self.registry.add_read_write(Arc::new(OnRemove(f)))
    }

    /// Register a [`ReadWriteListener`]
    pub fn add<L: ReadWriteListener<K, V> + 'static>(&self, listener: L) -> ListenerHandle {
        self.registry.add_read_write(Arc::new(listener))
    }

    /// Register a [`WriteListener`]
    pub fn add_write<L: WriteListener<K, V> + 'static>(&self, listener: L) -> ListenerHandle {
        self.registry.add_write(Arc::new(listener))
    }
}
