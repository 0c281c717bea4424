//! Lazy, single-use sequence of bulk results
//!
//! A [`Traversable`] is pull-based: nothing upstream runs until a terminal
//! operation (or the iterator returned by `into_iter`) asks for the next
//! element. Intermediate operations (`filter`, `map`, `flat_map`) wrap the
//! pipeline without evaluating it. Terminal operations consume `self`, so a
//! traversable can be traversed at most once.
//!
//! Resources tied to the traversal are released through close hooks that
//! run exactly once when the traversable, or its iterator, is dropped.
//!
//! # Example
//!
//! ```
//! use cachet_functional::Traversable;
//!
//! let evens = Traversable::new(1..=10).filter(|n| n % 2 == 0).count();
//! assert_eq!(evens, 5);
//! ```

use std::cmp::Ordering;

type Hook = Box<dyn FnOnce() + Send>;

/// Release hooks run when the owning traversal is dropped
#[derive(Default)]
struct CloseHooks(Vec<Hook>);

impl Drop for CloseHooks {
    fn drop(&mut self) {
        for hook in self.0.drain(..) {
            hook();
        }
    }
}

/// Lazy, sequential, single-use container of results
pub struct Traversable<T> {
    iter: Box<dyn Iterator<Item = T> + Send>,
    hooks: CloseHooks,
}

impl<T: Send + 'static> Traversable<T> {
    /// Wrap any sendable iterator
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Traversable {
            iter: Box::new(items.into_iter()),
            hooks: CloseHooks::default(),
        }
    }

    /// A traversable with no elements
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// Register a hook run once when this traversal is released
    pub fn on_close(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.hooks.0.push(Box::new(hook));
        self
    }

    // =========================================================================
    // Intermediate operations
    // =========================================================================

    /// Keep only elements matching `predicate`
    pub fn filter<P>(self, predicate: P) -> Traversable<T>
    where
        P: FnMut(&T) -> bool + Send + 'static,
    {
        Traversable {
            iter: Box::new(self.iter.filter(predicate)),
            hooks: self.hooks,
        }
    }

    /// Transform each element
    pub fn map<U, F>(self, f: F) -> Traversable<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        Traversable {
            iter: Box::new(self.iter.map(f)),
            hooks: self.hooks,
        }
    }

    /// Replace each element with the elements `f` produces for it
    pub fn flat_map<U, I, F>(self, f: F) -> Traversable<U>
    where
        U: Send + 'static,
        I: IntoIterator<Item = U> + 'static,
        I::IntoIter: Send + 'static,
        F: FnMut(T) -> I + Send + 'static,
    {
        Traversable {
            iter: Box::new(self.iter.flat_map(f)),
            hooks: self.hooks,
        }
    }

    // =========================================================================
    // Terminal operations
    // =========================================================================

    /// Run `f` on every element
    pub fn for_each<F: FnMut(T)>(self, f: F) {
        self.into_iter().for_each(f)
    }

    /// Fold every element into `identity` with `f`
    pub fn reduce<F: FnMut(T, T) -> T>(self, identity: T, f: F) -> T {
        self.into_iter().fold(identity, f)
    }

    /// Fold the elements with `f`, `None` when there are none
    pub fn reduce_opt<F: FnMut(T, T) -> T>(self, f: F) -> Option<T> {
        self.into_iter().reduce(f)
    }

    /// Gather every element into a collection
    pub fn collect<C: FromIterator<T>>(self) -> C {
        self.into_iter().collect()
    }

    /// Number of elements
    pub fn count(self) -> usize {
        self.into_iter().count()
    }

    /// Whether any element matches; stops at the first match
    pub fn any_match<P: FnMut(&T) -> bool>(self, mut predicate: P) -> bool {
        self.into_iter().any(|t| predicate(&t))
    }

    /// Whether every element matches; stops at the first mismatch
    pub fn all_match<P: FnMut(&T) -> bool>(self, mut predicate: P) -> bool {
        self.into_iter().all(|t| predicate(&t))
    }

    /// Whether no element matches; stops at the first match
    pub fn none_match<P: FnMut(&T) -> bool>(self, predicate: P) -> bool {
        !self.any_match(predicate)
    }

    /// Some element, if any; pulls at most one
    pub fn find_any(self) -> Option<T> {
        self.into_iter().next()
    }

    /// Smallest element under `compare`
    pub fn min_by<F: FnMut(&T, &T) -> Ordering>(self, compare: F) -> Option<T> {
        self.into_iter().min_by(compare)
    }

    /// Largest element under `compare`
    pub fn max_by<F: FnMut(&T, &T) -> Ordering>(self, compare: F) -> Option<T> {
        self.into_iter().max_by(compare)
    }
}

impl<T> IntoIterator for Traversable<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter {
            iter: self.iter,
            _hooks: self.hooks,
        }
    }
}

impl<T> std::fmt::Debug for Traversable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Traversable")
            .field("close_hooks", &self.hooks.0.len())
            .finish_non_exhaustive()
    }
}

/// Pull iterator over a [`Traversable`]; runs its close hooks on drop
pub struct IntoIter<T> {
    iter: Box<dyn Iterator<Item = T> + Send>,
    _hooks: CloseHooks,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.iter.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}
