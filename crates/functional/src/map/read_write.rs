//! Read-write surface

use std::sync::Arc;

use cachet_core::{CacheKey, CacheValue, Param, Params, Permission, Result};

use crate::engine::MapStatus;
use crate::functions::{ReadWriteArgFunction, ReadWriteFunction};
use crate::future::EvalFuture;
use crate::listeners::ReadWriteListeners;
use crate::traversable::Traversable;
use crate::view::ReadWriteView;

use super::FunctionalMap;

/// Evaluates functions against read-write entry views
///
/// Each invocation reads the current entry and commits the view's final
/// intent while holding the key lock (unless `LockingMode::Skip`), so
/// invocations on the same key are serialized.
///
/// Bulk operations are fanned out to the worker pool immediately; the
/// returned traversable yields one outcome per key in submission order.
pub struct ReadWriteMap<K: CacheKey, V: CacheValue> {
    map: FunctionalMap<K, V>,
}

impl<K: CacheKey, V: CacheValue> ReadWriteMap<K, V> {
    pub(crate) fn new(map: FunctionalMap<K, V>) -> Self {
        ReadWriteMap { map }
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
        ReadWriteMap::new(self.map.with_params(params))
    }

    /// Evaluate `f` against the entry for `key`
    pub fn eval<R, F>(&self, key: K, f: F) -> EvalFuture<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut ReadWriteView<K, V>) -> R + Send + 'static,
    {
        let params = *self.map.params();
        self.map
            .engine()
            .submit(move |engine| engine.read_write(key, &params, Permission::Write, f))
    }

    /// Evaluate `f(arg, view)` against the entry for `key`
    pub fn eval_with<T, R, F>(&self, key: K, arg: T, f: F) -> EvalFuture<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: FnOnce(T, &mut ReadWriteView<K, V>) -> R + Send + 'static,
    {
        self.eval(key, move |view| f(arg, view))
    }

    /// Evaluate `f` against every key
    pub fn eval_many<R, F, I>(&self, keys: I, f: F) -> Traversable<Result<R>>
    where
        R: Send + 'static,
        F: Fn(&mut ReadWriteView<K, V>) -> R + Send + Sync + 'static,
        I: IntoIterator<Item = K>,
    {
        let f = Arc::new(f);
        self.fan_out(keys.into_iter().map(|key| {
            let f = Arc::clone(&f);
            (key, move |view: &mut ReadWriteView<K, V>| (*f)(view))
        }))
    }

    /// Evaluate `f(arg, view)` for every `(key, arg)` pair
    pub fn eval_many_with<T, R, F, I>(&self, entries: I, f: F) -> Traversable<Result<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T, &mut ReadWriteView<K, V>) -> R + Send + Sync + 'static,
        I: IntoIterator<Item = (K, T)>,
    {
        let f = Arc::new(f);
        self.fan_out(entries.into_iter().map(|(key, arg)| {
            let f = Arc::clone(&f);
            (key, move |view: &mut ReadWriteView<K, V>| (*f)(arg, view))
        }))
    }

    /// Evaluate `f` against every entry currently held in memory
    pub fn eval_all<R, F>(&self, f: F) -> Traversable<Result<R>>
    where
        R: Send + 'static,
        F: Fn(&mut ReadWriteView<K, V>) -> R + Send + Sync + 'static,
    {
        let keys = self.map.engine().keys();
        self.eval_many(keys, f)
    }

    /// Evaluate a named function against the entry for `key`
    pub fn eval_named<F>(&self, key: K, function: F) -> EvalFuture<F::Output>
    where
        F: ReadWriteFunction<K, V>,
    {
        self.eval(key, move |view| function.apply(view))
    }

    /// Evaluate a named function with an argument against the entry for `key`
    pub fn eval_named_with<T, F>(&self, key: K, arg: T, function: F) -> EvalFuture<F::Output>
    where
        T: Send + 'static,
        F: ReadWriteArgFunction<K, V, T>,
    {
        self.eval(key, move |view| function.apply(arg, view))
    }

    /// Evaluate a named function for every `(key, arg)` pair
    pub fn eval_many_named_with<T, F, I>(
        &self,
        entries: I,
        function: F,
    ) -> Traversable<Result<F::Output>>
    where
        T: Send + 'static,
        F: ReadWriteArgFunction<K, V, T>,
        I: IntoIterator<Item = (K, T)>,
    {
        self.eval_many_with(entries, move |arg, view| function.apply(arg, view))
    }

    /// Listener registration
    pub fn listeners(&self) -> ReadWriteListeners<K, V> {
        ReadWriteListeners::new(Arc::clone(self.map.engine().listeners()))
    }

    fn fan_out<R, G>(&self, jobs: impl Iterator<Item = (K, G)>) -> Traversable<Result<R>>
    where
        R: Send + 'static,
        G: FnOnce(&mut ReadWriteView<K, V>) -> R + Send + 'static,
    {
        let futures: Vec<EvalFuture<R>> = jobs
            .map(|(key, g)| {
                let params = *self.map.params();
                self.map.engine().submit(move |engine| {
                    engine.read_write(key, &params, Permission::BulkWrite, g)
                })
            })
            .collect();
        Traversable::new(futures.into_iter().map(EvalFuture::join))
    }
}

impl<K: CacheKey, V: CacheValue> Clone for ReadWriteMap<K, V> {
    fn clone(&self) -> Self {
        ReadWriteMap::new(self.map.clone())
    }
}
