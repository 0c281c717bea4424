//! Write-only surface

use std::sync::Arc;

use cachet_core::{CacheKey, CacheValue, Param, Params, Permission};

use crate::engine::{Engine, MapStatus};
use crate::functions::{WriteOnlyArgFunction, WriteOnlyFunction};
use crate::future::EvalFuture;
use crate::listeners::WriteListeners;
use crate::view::WriteOnlyView;

use super::FunctionalMap;

/// Evaluates functions against write-only entry views
///
/// The previous value is never fetched, neither from memory nor from the
/// persistence tier. Writes hold the key lock unless `LockingMode::Skip`
/// is in effect. Bulk operations complete once every key ran, with the
/// first failure if any.
pub struct WriteOnlyMap<K: CacheKey, V: CacheValue> {
    map: FunctionalMap<K, V>,
}

impl<K: CacheKey, V: CacheValue> WriteOnlyMap<K, V> {
    pub(crate) fn new(map: FunctionalMap<K, V>) -> Self {
        WriteOnlyMap { map }
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
        WriteOnlyMap::new(self.map.with_params(params))
    }

    /// Evaluate `f` against the entry for `key`
    pub fn eval<F>(&self, key: K, f: F) -> EvalFuture<()>
    where
        F: FnOnce(&mut WriteOnlyView<K, V>) + Send + 'static,
    {
        let params = *self.map.params();
        self.map
            .engine()
            .submit(move |engine| engine.write_only(key, &params, Permission::Write, f))
    }

    /// Evaluate `f(arg, view)` against the entry for `key`
    pub fn eval_with<T, F>(&self, key: K, arg: T, f: F) -> EvalFuture<()>
    where
        T: Send + 'static,
        F: FnOnce(T, &mut WriteOnlyView<K, V>) + Send + 'static,
    {
        self.eval(key, move |view| f(arg, view))
    }

    /// Evaluate `f` against every key
    pub fn eval_many<F, I>(&self, keys: I, f: F) -> EvalFuture<()>
    where
        F: Fn(&mut WriteOnlyView<K, V>) + Send + Sync + 'static,
        I: IntoIterator<Item = K>,
    {
        let f = Arc::new(f);
        let params = *self.map.params();
        let jobs: Vec<_> = keys
            .into_iter()
            .map(|key| {
                let f = Arc::clone(&f);
                move |engine: &Engine<K, V>| {
                    engine.write_only(key, &params, Permission::BulkWrite, &*f)
                }
            })
            .collect();
        self.map.engine().submit_each(jobs)
    }

    /// Evaluate `f(arg, view)` for every `(key, arg)` pair
    pub fn eval_many_with<T, F, I>(&self, entries: I, f: F) -> EvalFuture<()>
    where
        T: Send + 'static,
        F: Fn(T, &mut WriteOnlyView<K, V>) + Send + Sync + 'static,
        I: IntoIterator<Item = (K, T)>,
    {
        let f = Arc::new(f);
        let params = *self.map.params();
        let jobs: Vec<_> = entries
            .into_iter()
            .map(|(key, arg)| {
                let f = Arc::clone(&f);
                move |engine: &Engine<K, V>| {
                    engine.write_only(key, &params, Permission::BulkWrite, move |view| {
                        (*f)(arg, view)
                    })
                }
            })
            .collect();
        self.map.engine().submit_each(jobs)
    }

    /// Evaluate `f` against every entry currently held in memory
    pub fn eval_all<F>(&self, f: F) -> EvalFuture<()>
    where
        F: Fn(&mut WriteOnlyView<K, V>) + Send + Sync + 'static,
    {
        let keys = self.map.engine().keys();
        self.eval_many(keys, f)
    }

    /// Remove every entry
    ///
    /// Listeners are not notified per entry.
    pub fn truncate(&self) -> EvalFuture<()> {
        let params = *self.map.params();
        self.map.engine().submit(move |engine| engine.truncate(&params))
    }

    /// Evaluate a named function against the entry for `key`
    pub fn eval_named<F>(&self, key: K, function: F) -> EvalFuture<()>
    where
        F: WriteOnlyFunction<K, V>,
    {
        self.eval(key, move |view| function.apply(view))
    }

    /// Evaluate a named function with an argument against the entry for `key`
    pub fn eval_named_with<T, F>(&self, key: K, arg: T, function: F) -> EvalFuture<()>
    where
        T: Send + 'static,
        F: WriteOnlyArgFunction<K, V, T>,
    {
        self.eval(key, move |view| function.apply(arg, view))
    }

    /// Evaluate a named function for every `(key, arg)` pair
    pub fn eval_many_named_with<T, F, I>(&self, entries: I, function: F) -> EvalFuture<()>
    where
        T: Send + 'static,
        F: WriteOnlyArgFunction<K, V, T>,
        I: IntoIterator<Item = (K, T)>,
    {
        self.eval_many_with(entries, move |arg, view| function.apply(arg, view))
    }

    /// Listener registration
    pub fn listeners(&self) -> WriteListeners<K, V> {
        WriteListeners::new(Arc::clone(self.map.engine().listeners()))
    }
}

impl<K: CacheKey, V: CacheValue> Clone for WriteOnlyMap<K, V> {
    fn clone(&self) -> Self {
        WriteOnlyMap::new(self.map.clone())
    }
}
