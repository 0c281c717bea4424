//! Read-only surface

use std::sync::Arc;

use cachet_core::{CacheKey, CacheValue, Param, Params, Permission, Result};

use crate::engine::{run_guarded, MapStatus};
use crate::functions::ReadOnlyFunction;
use crate::future::EvalFuture;
use crate::traversable::Traversable;
use crate::view::ReadOnlyView;

use super::FunctionalMap;

/// Evaluates functions against read-only entry views
///
/// Read-only operations never take a key lock.
pub struct ReadOnlyMap<K: CacheKey, V: CacheValue> {
    map: FunctionalMap<K, V>,
}

impl<K: CacheKey, V: CacheValue> ReadOnlyMap<K, V> {
    pub(crate) fn new(map: FunctionalMap<K, V>) -> Self {
        ReadOnlyMap { map }
    }

    /// Map name
    pub fn name(&self) -> &str {
        self.map.name()
    }

    /// Lifecycle state
    pub fn status(&self) -> MapStatus {
        self.map.status()
    }

    /// Params applied to operations made through this handle
    pub fn params(&self) -> &Params {
        self.map.params()
    }

    /// Same surface with `params` overridden
    pub fn with_params(&self, params: &[Param]) -> Self {
        ReadOnlyMap::new(self.map.with_params(params))
    }

    /// Evaluate `f` against the entry for `key`
    pub fn eval<R, F>(&self, key: K, f: F) -> EvalFuture<R>
    where
        R: Send + 'static,
        F: FnOnce(&ReadOnlyView<K, V>) -> R + Send + 'static,
    {
        let params = *self.map.params();
        self.map
            .engine()
            .submit(move |engine| engine.read_only(&key, &params, Permission::Read, f))
    }

    /// Evaluate a named function against the entry for `key`
    pub fn eval_named<F>(&self, key: K, function: F) -> EvalFuture<F::Output>
    where
        F: ReadOnlyFunction<K, V>,
    {
        self.eval(key, move |view| function.apply(view))
    }

    /// Evaluate `f` against every key, lazily
    ///
    /// Nothing runs until the traversable is pulled; each pull evaluates
    /// one key on the pulling thread. Each element carries its own outcome.
    pub fn eval_many<R, F, I>(&self, keys: I, f: F) -> Traversable<Result<R>>
    where
        R: Send + 'static,
        F: Fn(&ReadOnlyView<K, V>) -> R + Send + Sync + 'static,
        I: IntoIterator<Item = K>,
    {
        let engine = Arc::clone(self.map.engine());
        let params = *self.map.params();
        let keys: Vec<K> = keys.into_iter().collect();
        Traversable::new(keys.into_iter().map(move |key| {
            engine.ensure_running()?;
            run_guarded(|| engine.read_only(&key, &params, Permission::BulkRead, &f))
        }))
    }

    /// Keys of the entries currently held in memory
    ///
    /// # Errors
    ///
    /// Returns an error if the map is closed or bulk reads are not
    /// authorized.
    pub fn keys(&self) -> Result<Traversable<K>> {
        let engine = self.map.engine();
        engine.ensure_running()?;
        engine.authorize(Permission::BulkRead)?;
        Ok(Traversable::new(engine.keys()))
    }

    /// Snapshots of the entries currently held in memory, taken lazily
    ///
    /// Entries removed between the call and the pull are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the map is closed or bulk reads are not
    /// authorized.
    pub fn entries(&self) -> Result<Traversable<ReadOnlyView<K, V>>> {
        let engine = Arc::clone(self.map.engine());
        engine.ensure_running()?;
        engine.authorize(Permission::BulkRead)?;
        let keys = engine.keys();
        Ok(Traversable::new(
            keys.into_iter().filter_map(move |key| engine.peek_view(key)),
        ))
    }
}

impl<K: CacheKey, V: CacheValue> Clone for ReadOnlyMap<K, V> {
    fn clone(&self) -> Self {
        ReadOnlyMap::new(self.map.clone())
    }
}
