//! Invocation pipeline shared by every map surface
//!
//! The engine owns the collaborators of one map (store, persistence tier,
//! ownership, replication, authorization) together with the machinery that
//! runs user functions: the worker pool, the per-key lock table and the
//! version generator.
//!
//! A single-key invocation runs entirely on one worker thread:
//!
//! 1. authorize
//! 2. acquire the key lock (writers only, per `LockingMode`)
//! 3. read the current entry (readers only; store, then persistence)
//! 4. run the user function against a view
//! 5. commit the view's intent: persistence, synchronous replication,
//!    then memory, statistics and listeners
//!
//! Every failure along the way, including a panic in the user function,
//! completes the caller's future with an error.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use cachet_concurrency::{Executor, LockTable};
use cachet_core::{
    Authorizer, CacheEntry, CacheKey, CacheValue, DerivedMeta, EntryStore, Error, ExecutionMode,
    MetaKind, MetaLoadedFromPersistence, MetaParam, MetaParams, Ownership, Params, Permission,
    PersistenceStore, ReplicationMode, ReplicationScope, Replicator, Result, StatisticsMode,
    WritableMeta, WriteOp,
};
use cachet_storage::VersionGenerator;

use crate::config::FunctionalConfig;
use crate::future::{Completer, EvalFuture};
use crate::listeners::{Change, ListenerRegistry, WriteSource};
use crate::stats::{MapStats, StatsCounters};
use crate::view::{ReadOnlyView, ReadWriteView, WriteIntent, WriteOnlyView};

// =============================================================================
// Status
// =============================================================================

/// Lifecycle state of a functional map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapStatus {
    /// Accepting operations
    Running,
    /// `close` in progress; new operations are refused
    Stopping,
    /// Closed
    Terminated,
}

const RUNNING: u8 = 0;
const STOPPING: u8 = 1;
const TERMINATED: u8 = 2;

impl MapStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            RUNNING => MapStatus::Running,
            STOPPING => MapStatus::Stopping,
            _ => MapStatus::Terminated,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Collaborators a map is built from
pub(crate) struct Collaborators<K, V> {
    pub(crate) store: Arc<dyn EntryStore<K, V>>,
    pub(crate) persistence: Option<Arc<dyn PersistenceStore<K, V>>>,
    pub(crate) ownership: Arc<dyn Ownership<K>>,
    pub(crate) replicator: Arc<dyn Replicator<K, V>>,
    pub(crate) authorizer: Arc<dyn Authorizer>,
}

pub(crate) struct Engine<K: CacheKey, V: CacheValue> {
    name: String,
    config: FunctionalConfig,
    default_params: Params,
    store: Arc<dyn EntryStore<K, V>>,
    persistence: Option<Arc<dyn PersistenceStore<K, V>>>,
    ownership: Arc<dyn Ownership<K>>,
    replicator: Arc<dyn Replicator<K, V>>,
    authorizer: Arc<dyn Authorizer>,
    locks: LockTable<K>,
    executor: Executor,
    versions: VersionGenerator,
    listeners: Arc<ListenerRegistry<K, V>>,
    stats: StatsCounters,
    status: AtomicU8,
}

impl<K: CacheKey, V: CacheValue> Engine<K, V> {
    /// Validate `config` and start the worker pool
    pub(crate) fn start(config: FunctionalConfig, parts: Collaborators<K, V>) -> Result<Arc<Self>> {
        config.validate()?;
        let default_params = config.default_params()?;
        let executor = Executor::new(
            &format!("cachet-{}", config.name),
            config.worker_threads,
            config.max_queue_depth,
        )?;
        info!(
            map = %config.name,
            workers = config.worker_threads,
            persistence = parts.persistence.is_some(),
            "Functional map started"
        );
        Ok(Arc::new(Engine {
            name: config.name.clone(),
            locks: LockTable::new(Duration::from_millis(config.lock_timeout_ms)),
            default_params,
            config,
            store: parts.store,
            persistence: parts.persistence,
            ownership: parts.ownership,
            replicator: parts.replicator,
            authorizer: parts.authorizer,
            executor,
            versions: VersionGenerator::default(),
            listeners: Arc::new(ListenerRegistry::new()),
            stats: StatsCounters::default(),
            status: AtomicU8::new(RUNNING),
        }))
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn default_params(&self) -> Params {
        self.default_params
    }

    pub(crate) fn listeners(&self) -> &Arc<ListenerRegistry<K, V>> {
        &self.listeners
    }

    pub(crate) fn status(&self) -> MapStatus {
        MapStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub(crate) fn ensure_running(&self) -> Result<()> {
        match self.status() {
            MapStatus::Running => Ok(()),
            _ => Err(Error::MapClosed(self.name.clone())),
        }
    }

    pub(crate) fn authorize(&self, permission: Permission) -> Result<()> {
        self.authorizer.authorize(&self.name, permission)
    }

    pub(crate) fn stats(&self) -> MapStats {
        self.stats.snapshot(self.store.expired_count())
    }

    /// Refuse new work, wait for queued functions, then stop the workers.
    /// Idempotent.
    pub(crate) fn close(&self) {
        if self
            .status
            .compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        info!(
            map = %self.name,
            listeners = self.listeners.len(),
            "Closing functional map"
        );
        // A worker cannot wait for itself to finish
        if !self.executor.is_worker_thread() {
            self.executor.drain();
        }
        self.executor.shutdown();
        self.status.store(TERMINATED, Ordering::Release);
        info!(map = %self.name, "Functional map closed");
    }

    fn gathers(&self, params: &Params) -> bool {
        self.config.statistics && params.statistics() == StatisticsMode::Gather
    }

    fn owns(&self, key: &K, params: &Params) -> bool {
        params.execution() != ExecutionMode::Local || self.ownership.is_local(key)
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Run `work` on a worker thread
    pub(crate) fn submit<R, W>(self: &Arc<Self>, work: W) -> EvalFuture<R>
    where
        R: Send + 'static,
        W: FnOnce(&Self) -> Result<R> + Send + 'static,
    {
        if let Err(e) = self.ensure_running() {
            return EvalFuture::ready(Err(e));
        }
        let (completer, future) = EvalFuture::pending();
        let engine = Arc::clone(self);
        let submitted = self.executor.submit(move || {
            completer.complete(run_guarded(|| work(&engine)));
        });
        match submitted {
            Ok(()) => future,
            Err(e) => EvalFuture::ready(Err(e)),
        }
    }

    /// Run every job on the worker pool; the future completes once all of
    /// them ran, with the first error recorded
    pub(crate) fn submit_each<W>(self: &Arc<Self>, jobs: Vec<W>) -> EvalFuture<()>
    where
        W: FnOnce(&Self) -> Result<()> + Send + 'static,
    {
        if let Err(e) = self.ensure_running() {
            return EvalFuture::ready(Err(e));
        }
        if jobs.is_empty() {
            return EvalFuture::ready(Ok(()));
        }
        let (completer, future) = EvalFuture::pending();
        let bulk = Arc::new(BulkCompletion::new(jobs.len(), completer));
        for job in jobs {
            let engine = Arc::clone(self);
            let tracker = Arc::clone(&bulk);
            let submitted = self.executor.submit(move || {
                tracker.finish_one(run_guarded(|| job(&engine)));
            });
            if let Err(e) = submitted {
                bulk.finish_one(Err(e));
            }
        }
        future
    }

    // =========================================================================
    // Invocation bodies (run on worker threads, or inline for lazy reads)
    // =========================================================================

    pub(crate) fn read_only<R>(
        &self,
        key: &K,
        params: &Params,
        permission: Permission,
        f: impl FnOnce(&ReadOnlyView<K, V>) -> R,
    ) -> Result<R> {
        self.authorize(permission)?;
        let entry = self.read(key, params, false)?;
        let view = ReadOnlyView::new(key.clone(), entry);
        Ok(f(&view))
    }

    pub(crate) fn write_only(
        &self,
        key: K,
        params: &Params,
        permission: Permission,
        f: impl FnOnce(&mut WriteOnlyView<K, V>),
    ) -> Result<()> {
        self.authorize(permission)?;
        let _guard = self.locks.acquire(&key, params.locking())?;
        let mut view = WriteOnlyView::new(key.clone());
        f(&mut view);
        self.commit(key, None, view.into_intent(), params, WriteSource::WriteOnly)
    }

    pub(crate) fn read_write<R>(
        &self,
        key: K,
        params: &Params,
        permission: Permission,
        f: impl FnOnce(&mut ReadWriteView<K, V>) -> R,
    ) -> Result<R> {
        self.authorize(permission)?;
        let _guard = self.locks.acquire(&key, params.locking())?;
        let before = self.read(&key, params, true)?;
        let mut view = ReadWriteView::new(key.clone(), before.clone());
        let result = f(&mut view);
        self.commit(key, before, view.into_intent(), params, WriteSource::ReadWrite)?;
        Ok(result)
    }

    /// Drop every entry without per-entry events
    pub(crate) fn truncate(&self, params: &Params) -> Result<()> {
        self.authorize(Permission::BulkWrite)?;
        self.store.clear();
        if params.persistence().persists() {
            if let Some(persistence) = &self.persistence {
                persistence.clear()?;
            }
        }
        info!(map = %self.name, "Truncated");
        self.replicate(WriteOp::Clear, params)
    }

    /// Keys of live in-memory entries
    pub(crate) fn keys(&self) -> Vec<K> {
        self.store.keys()
    }

    /// Snapshot of a live entry without recording a use
    pub(crate) fn peek_view(&self, key: K) -> Option<ReadOnlyView<K, V>> {
        let entry = self.store.peek(&key)?;
        Some(ReadOnlyView::new(key, Some(entry)))
    }

    // =========================================================================
    // Read path
    // =========================================================================

    /// Current entry from memory, falling back to the persistence tier.
    ///
    /// `activate` stores a loaded entry in memory; only callers holding the
    /// key lock may do so.
    fn read(&self, key: &K, params: &Params, activate: bool) -> Result<Option<CacheEntry<V>>> {
        let found = match self.store.get(key) {
            Some(entry) => Some(entry),
            None => self.load(key, params, activate)?,
        };
        if self.gathers(params) {
            self.stats.record_read(found.is_some());
        }
        Ok(found)
    }

    fn load(&self, key: &K, params: &Params, activate: bool) -> Result<Option<CacheEntry<V>>> {
        let persistence = match &self.persistence {
            Some(p) if params.persistence().loads() => p,
            _ => return Ok(None),
        };
        if !self.owns(key, params) {
            return Ok(None);
        }
        let loaded = match persistence.load(key)? {
            Some(entry) => entry,
            None => return Ok(None),
        };
        debug!(map = %self.name, ?key, "Loaded entry from persistence");

        let mut metas: MetaParams = loaded
            .metas
            .writable()
            .cloned()
            .map(MetaParam::from)
            .collect();
        metas.add(DerivedMeta::LoadedFromPersistence(
            MetaLoadedFromPersistence::LOADED,
        ));
        if activate {
            Ok(Some(self.store.put(key.clone(), loaded.value, metas)))
        } else {
            Ok(Some(CacheEntry::new(loaded.value, metas)))
        }
    }

    // =========================================================================
    // Write path
    // =========================================================================

    fn commit(
        &self,
        key: K,
        before: Option<CacheEntry<V>>,
        intent: WriteIntent<V>,
        params: &Params,
        source: WriteSource,
    ) -> Result<()> {
        if matches!(intent, WriteIntent::Unchanged) {
            return Ok(());
        }
        if !self.owns(&key, params) {
            debug!(map = %self.name, ?key, "Dropping write to key owned elsewhere");
            return Ok(());
        }
        match intent {
            WriteIntent::Set { value, metas } => {
                self.commit_set(key, before, value, metas, params, source)
            }
            WriteIntent::Remove => self.commit_remove(key, before, params, source),
            WriteIntent::Unchanged => Ok(()),
        }
    }

    /// Apply a set in dependency order.
    ///
    /// Persistence and synchronous replication run before memory changes,
    /// so a failure in either leaves the previous value visible.
    fn commit_set(
        &self,
        key: K,
        before: Option<CacheEntry<V>>,
        value: V,
        mut metas: MetaParams,
        params: &Params,
        source: WriteSource,
    ) -> Result<()> {
        if !metas.contains(MetaKind::EntryVersion) {
            metas.add(WritableMeta::version(self.versions.next()));
        }
        let pending = CacheEntry::new(value, metas);
        if let Some(persistence) = self.persistence_for(params) {
            persistence.write(&key, &pending)?;
        }
        let op = WriteOp::Put {
            key: key.clone(),
            entry: pending.clone(),
        };
        if let Err(e) = self.replicate(op, params) {
            self.restore_persisted(&key, before.as_ref(), params);
            return Err(e);
        }

        let after = self.store.put(key.clone(), pending.value, pending.metas);
        if self.gathers(params) {
            self.stats.record_store();
        }
        self.listeners.fire(
            source,
            &key,
            Change::Set {
                before: before.as_ref(),
                after: &after,
            },
        );
        Ok(())
    }

    fn commit_remove(
        &self,
        key: K,
        before: Option<CacheEntry<V>>,
        params: &Params,
        source: WriteSource,
    ) -> Result<()> {
        let current = before.or_else(|| self.store.peek(&key));
        let mut existed = current.is_some();
        if let Some(persistence) = self.persistence_for(params) {
            existed |= persistence.delete(&key)?;
        }
        if !existed {
            return Ok(());
        }
        if let Err(e) = self.replicate(WriteOp::Remove { key: key.clone() }, params) {
            self.restore_persisted(&key, current.as_ref(), params);
            return Err(e);
        }

        let removed = self.store.remove(&key);
        if self.gathers(params) {
            self.stats.record_remove();
        }
        let before = current.or(removed);
        self.listeners.fire(
            source,
            &key,
            Change::Removed {
                before: before.as_ref(),
            },
        );
        Ok(())
    }

    /// Persistence tier to write through, if `params` allow writes
    fn persistence_for(&self, params: &Params) -> Option<&Arc<dyn PersistenceStore<K, V>>> {
        self.persistence
            .as_ref()
            .filter(|_| params.persistence().persists())
    }

    /// Put the persisted state of `key` back to `previous` after a failed
    /// commit. Best effort: a failure here is logged, and the caller still
    /// sees the original error.
    fn restore_persisted(&self, key: &K, previous: Option<&CacheEntry<V>>, params: &Params) {
        let Some(persistence) = self.persistence_for(params) else {
            return;
        };
        let restored = match previous {
            Some(entry) => persistence.write(key, entry),
            None => persistence.delete(key).map(|_| ()),
        };
        if let Err(e) = restored {
            warn!(map = %self.name, ?key, error = %e, "Could not restore persisted entry");
        }
    }

    fn replicate(&self, op: WriteOp<K, V>, params: &Params) -> Result<()> {
        let scope = match params.execution() {
            ExecutionMode::Local => return Ok(()),
            ExecutionMode::LocalSite => ReplicationScope::Site,
            ExecutionMode::All => ReplicationScope::CrossSite,
        };
        match params.replication() {
            ReplicationMode::Sync => self.replicator.replicate(&op, scope),
            ReplicationMode::Async => {
                let replicator = Arc::clone(&self.replicator);
                let name = self.name.clone();
                let submitted = self.executor.submit(move || {
                    if let Err(e) = replicator.replicate(&op, scope) {
                        warn!(map = %name, error = %e, "Asynchronous replication failed");
                    }
                });
                if let Err(e) = submitted {
                    warn!(map = %self.name, error = %e, "Asynchronous replication not scheduled");
                }
                Ok(())
            }
        }
    }
}

impl<K: CacheKey, V: CacheValue> Drop for Engine<K, V> {
    fn drop(&mut self) {
        if self.status() == MapStatus::Running {
            debug!(map = %self.name, "Functional map dropped without close");
        }
    }
}

/// Run `work`, turning a panic into `Error::FunctionPanicked`
pub(crate) fn run_guarded<R>(work: impl FnOnce() -> Result<R>) -> Result<R> {
    catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        let err = Error::from_panic(payload);
        debug!(error = %err, "Function panicked");
        Err(err)
    })
}

/// Countdown shared by the jobs of one bulk write
struct BulkCompletion {
    remaining: AtomicUsize,
    first_error: Mutex<Option<Error>>,
    completer: Mutex<Option<Completer<()>>>,
}

impl BulkCompletion {
    fn new(jobs: usize, completer: Completer<()>) -> Self {
        BulkCompletion {
            remaining: AtomicUsize::new(jobs),
            first_error: Mutex::new(None),
            completer: Mutex::new(Some(completer)),
        }
    }

    fn finish_one(&self, outcome: Result<()>) {
        if let Err(e) = outcome {
            let mut slot = self.first_error.lock();
            if slot.is_none() {
                *slot = Some(e);
            }
        }
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let outcome = match self.first_error.lock().take() {
                Some(e) => Err(e),
                None => Ok(()),
            };
            if let Some(completer) = self.completer.lock().take() {
                completer.complete(outcome);
            }
        }
    }
}
