//! Named function library
//!
//! Plain-data functions with a stable [`NamedFunction::NAME`]. Unlike
//! closures they can be serialized with `serde`, so a peer that knows the
//! name can rebuild and run them. Functions that write carry optional
//! writable metadata applied on `set`.
//!
//! Value-carrying functions take the value as the invocation argument,
//! which lets one function instance serve a whole bulk write:
//!
//! ```
//! use cachet_functional::{FunctionalConfig, FunctionalMap, SetValue, ReturnFind};
//!
//! let map: FunctionalMap<u32, String> = FunctionalMap::new(FunctionalConfig::named("fns")).unwrap();
//! map.write_only()
//!     .eval_many_named_with(vec![(1, "a".to_string()), (2, "b".to_string())], SetValue::new())
//!     .join()
//!     .unwrap();
//! let found = map.read_only().eval_named(2, ReturnFind).join().unwrap();
//! assert_eq!(found.as_deref(), Some("b"));
//! map.close();
//! ```

use serde::{Deserialize, Serialize};

use cachet_core::{
    CacheKey, CacheValue, CompareResult, Lookup, MetaEntryVersion, Version, WritableMeta,
};

use crate::view::{ReadEntryView, ReadOnlyView, ReadWriteView, WriteEntryView, WriteOnlyView};

// =============================================================================
// Function traits
// =============================================================================

/// A function identified by a stable name
pub trait NamedFunction {
    /// Stable identifier
    const NAME: &'static str;
}

/// Named function over a read-only view
pub trait ReadOnlyFunction<K, V>: NamedFunction + Send + 'static {
    /// Result type
    type Output: Send + 'static;

    /// Run against `view`
    fn apply(&self, view: &ReadOnlyView<K, V>) -> Self::Output;
}

/// Named function over a write-only view
pub trait WriteOnlyFunction<K, V>: NamedFunction + Send + 'static {
    /// Run against `view`
    fn apply(&self, view: &mut WriteOnlyView<K, V>);
}

/// Named function over a write-only view taking an argument
pub trait WriteOnlyArgFunction<K, V, T>: NamedFunction + Send + Sync + 'static {
    /// Run against `view` with `arg`
    fn apply(&self, arg: T, view: &mut WriteOnlyView<K, V>);
}

/// Named function over a read-write view
pub trait ReadWriteFunction<K, V>: NamedFunction + Send + 'static {
    /// Result type
    type Output: Send + 'static;

    /// Run against `view`
    fn apply(&self, view: &mut ReadWriteView<K, V>) -> Self::Output;
}

/// Named function over a read-write view taking an argument
pub trait ReadWriteArgFunction<K, V, T>: NamedFunction + Send + Sync + 'static {
    /// Result type
    type Output: Send + 'static;

    /// Run against `view` with `arg`
    fn apply(&self, arg: T, view: &mut ReadWriteView<K, V>) -> Self::Output;
}

// =============================================================================
// Definitions
// =============================================================================

macro_rules! metas_function {
    ($(#[$doc:meta])* $name:ident, $id:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(default, skip_serializing_if = "Vec::is_empty")]
            metas: Vec<WritableMeta>,
        }

        impl $name {
            /// Without metadata
            pub fn new() -> Self {
                Self::default()
            }

            /// Applying `metas` on write
            pub fn with_metas(metas: impl Into<Vec<WritableMeta>>) -> Self {
                $name {
                    metas: metas.into(),
                }
            }

            /// Metadata applied on write
            pub fn metas(&self) -> &[WritableMeta] {
                &self.metas
            }
        }

        impl NamedFunction for $name {
            const NAME: &'static str = $id;
        }
    };
}

metas_function!(
    /// Store the argument
    SetValue,
    "cachet.SetValue"
);
metas_function!(
    /// Store the argument, returning the previous value
    SetValueReturnPrevious,
    "cachet.SetValueReturnPrevious"
);
metas_function!(
    /// Store the argument, returning a snapshot of the new entry
    ///
    /// The snapshot is taken inside the function, before the write commits.
    /// It holds the value and the caller's metadata only: the version and
    /// the created and last-used clocks are assigned at commit and are not
    /// part of it.
    SetValueReturnView,
    "cachet.SetValueReturnView"
);
metas_function!(
    /// Store the argument when absent, returning the existing value
    /// otherwise
    SetValueIfAbsent,
    "cachet.SetValueIfAbsent"
);
metas_function!(
    /// Store the argument when absent, returning whether it did
    SetValueIfAbsentReturnBoolean,
    "cachet.SetValueIfAbsentReturnBoolean"
);
metas_function!(
    /// Replace a present value, returning it
    SetValueIfPresent,
    "cachet.SetValueIfPresent"
);
metas_function!(
    /// Replace a present value, returning whether it did
    SetValueIfPresentReturnBoolean,
    "cachet.SetValueIfPresentReturnBoolean"
);

/// Remove the entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remove;

/// Remove the entry, returning the previous value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveReturnPrevious;

/// Remove the entry, returning whether it was present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveReturnBoolean;

/// Remove the entry when its value equals the argument
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveIfValueEquals;

/// The current value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnFind;

/// Whether a value is present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnIsPresent;

impl NamedFunction for Remove {
    const NAME: &'static str = "cachet.Remove";
}

impl NamedFunction for RemoveReturnPrevious {
    const NAME: &'static str = "cachet.RemoveReturnPrevious";
}

impl NamedFunction for RemoveReturnBoolean {
    const NAME: &'static str = "cachet.RemoveReturnBoolean";
}

impl NamedFunction for RemoveIfValueEquals {
    const NAME: &'static str = "cachet.RemoveIfValueEquals";
}

impl NamedFunction for ReturnFind {
    const NAME: &'static str = "cachet.ReturnFind";
}

impl NamedFunction for ReturnIsPresent {
    const NAME: &'static str = "cachet.ReturnIsPresent";
}

/// Replace the value with the argument when it currently equals `expected`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetValueIfEquals<V> {
    expected: V,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    metas: Vec<WritableMeta>,
}

impl<V> SetValueIfEquals<V> {
    /// Expecting `expected`
    pub fn new(expected: V) -> Self {
        SetValueIfEquals {
            expected,
            metas: Vec::new(),
        }
    }

    /// Applying `metas` on write
    pub fn with_metas(mut self, metas: impl Into<Vec<WritableMeta>>) -> Self {
        self.metas = metas.into();
        self
    }
}

impl<V> NamedFunction for SetValueIfEquals<V> {
    const NAME: &'static str = "cachet.SetValueIfEquals";
}

/// Store the argument when the entry's version equals `version`
///
/// An absent entry, an unversioned entry, or any comparison other than
/// `Equal` (including `Conflicting`) is a failed precondition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetValueIfVersion {
    version: Version,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    metas: Vec<WritableMeta>,
}

impl SetValueIfVersion {
    /// Expecting `version`
    pub fn new(version: impl Into<Version>) -> Self {
        SetValueIfVersion {
            version: version.into(),
            metas: Vec::new(),
        }
    }

    /// Applying `metas` on write
    pub fn with_metas(mut self, metas: impl Into<Vec<WritableMeta>>) -> Self {
        self.metas = metas.into();
        self
    }
}

impl NamedFunction for SetValueIfVersion {
    const NAME: &'static str = "cachet.SetValueIfVersion";
}

// =============================================================================
// Implementations
// =============================================================================

impl<K: CacheKey, V: CacheValue> WriteOnlyArgFunction<K, V, V> for SetValue {
    fn apply(&self, value: V, view: &mut WriteOnlyView<K, V>) {
        view.set_with(value, &self.metas);
    }
}

impl<K: CacheKey, V: CacheValue> ReadWriteArgFunction<K, V, V> for SetValue {
    type Output = ();

    fn apply(&self, value: V, view: &mut ReadWriteView<K, V>) {
        view.set_with(value, &self.metas);
    }
}

impl<K: CacheKey, V: CacheValue> ReadWriteArgFunction<K, V, V> for SetValueReturnPrevious {
    type Output = Option<V>;

    fn apply(&self, value: V, view: &mut ReadWriteView<K, V>) -> Option<V> {
        let previous = view.find().cloned();
        view.set_with(value, &self.metas);
        previous
    }
}

impl<K: CacheKey, V: CacheValue> ReadWriteArgFunction<K, V, V> for SetValueReturnView {
    type Output = ReadOnlyView<K, V>;

    fn apply(&self, value: V, view: &mut ReadWriteView<K, V>) -> ReadOnlyView<K, V> {
        view.set_with(value, &self.metas);
        view.snapshot()
    }
}

impl<K: CacheKey, V: CacheValue> ReadWriteArgFunction<K, V, V> for SetValueIfAbsent {
    type Output = Option<V>;

    fn apply(&self, value: V, view: &mut ReadWriteView<K, V>) -> Option<V> {
        if let Some(existing) = view.find() {
            return Some(existing.clone());
        }
        view.set_with(value, &self.metas);
        None
    }
}

impl<K: CacheKey, V: CacheValue> ReadWriteArgFunction<K, V, V> for SetValueIfAbsentReturnBoolean {
    type Output = bool;

    fn apply(&self, value: V, view: &mut ReadWriteView<K, V>) -> bool {
        if view.find().is_some() {
            return false;
        }
        view.set_with(value, &self.metas);
        true
    }
}

impl<K: CacheKey, V: CacheValue> ReadWriteArgFunction<K, V, V> for SetValueIfPresent {
    type Output = Option<V>;

    fn apply(&self, value: V, view: &mut ReadWriteView<K, V>) -> Option<V> {
        let previous = view.find().cloned()?;
        view.set_with(value, &self.metas);
        Some(previous)
    }
}

impl<K: CacheKey, V: CacheValue> ReadWriteArgFunction<K, V, V>
    for SetValueIfPresentReturnBoolean
{
    type Output = bool;

    fn apply(&self, value: V, view: &mut ReadWriteView<K, V>) -> bool {
        if view.find().is_none() {
            return false;
        }
        view.set_with(value, &self.metas);
        true
    }
}

impl<K, V> ReadWriteArgFunction<K, V, V> for SetValueIfEquals<V>
where
    K: CacheKey,
    V: CacheValue + PartialEq,
{
    type Output = bool;

    fn apply(&self, value: V, view: &mut ReadWriteView<K, V>) -> bool {
        if view.find() != Some(&self.expected) {
            return false;
        }
        view.set_with(value, &self.metas);
        true
    }
}

impl<K: CacheKey, V: CacheValue> ReadWriteArgFunction<K, V, V> for SetValueIfVersion {
    type Output = bool;

    fn apply(&self, value: V, view: &mut ReadWriteView<K, V>) -> bool {
        let matches = view
            .find_meta_param::<MetaEntryVersion>()
            .map(|current| current.get().compare_to(&self.version) == CompareResult::Equal)
            .unwrap_or(false);
        if matches {
            view.set_with(value, &self.metas);
        }
        matches
    }
}

impl<K: CacheKey, V: CacheValue> WriteOnlyFunction<K, V> for Remove {
    fn apply(&self, view: &mut WriteOnlyView<K, V>) {
        view.remove();
    }
}

impl<K: CacheKey, V: CacheValue> ReadWriteFunction<K, V> for Remove {
    type Output = ();

    fn apply(&self, view: &mut ReadWriteView<K, V>) {
        view.remove();
    }
}

impl<K: CacheKey, V: CacheValue> ReadWriteFunction<K, V> for RemoveReturnPrevious {
    type Output = Option<V>;

    fn apply(&self, view: &mut ReadWriteView<K, V>) -> Option<V> {
        let previous = view.find().cloned();
        view.remove();
        previous
    }
}

impl<K: CacheKey, V: CacheValue> ReadWriteFunction<K, V> for RemoveReturnBoolean {
    type Output = bool;

    fn apply(&self, view: &mut ReadWriteView<K, V>) -> bool {
        let present = view.find().is_some();
        view.remove();
        present
    }
}

impl<K, V> ReadWriteArgFunction<K, V, V> for RemoveIfValueEquals
where
    K: CacheKey,
    V: CacheValue + PartialEq,
{
    type Output = bool;

    fn apply(&self, expected: V, view: &mut ReadWriteView<K, V>) -> bool {
        let equal = view.find() == Some(&expected);
        if equal {
            view.remove();
        }
        equal
    }
}

impl<K: CacheKey, V: CacheValue> ReadOnlyFunction<K, V> for ReturnFind {
    type Output = Option<V>;

    fn apply(&self, view: &ReadOnlyView<K, V>) -> Option<V> {
        view.find().cloned()
    }
}

impl<K: CacheKey, V: CacheValue> ReadWriteFunction<K, V> for ReturnFind {
    type Output = Option<V>;

    fn apply(&self, view: &mut ReadWriteView<K, V>) -> Option<V> {
        view.find().cloned()
    }
}

impl<K: CacheKey, V: CacheValue> ReadOnlyFunction<K, V> for ReturnIsPresent {
    type Output = bool;

    fn apply(&self, view: &ReadOnlyView<K, V>) -> bool {
        view.find().is_some()
    }
}

impl<K: CacheKey, V: CacheValue> ReadWriteFunction<K, V> for ReturnIsPresent {
    type Output = bool;

    fn apply(&self, view: &mut ReadWriteView<K, V>) -> bool {
        view.find().is_some()
    }
}
