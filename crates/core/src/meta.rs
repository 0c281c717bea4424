//! Per-entry metadata parameters
//!
//! Metadata is a closed family of immutable value objects split into two
//! disjoint groups:
//!
//! - [`WritableMeta`]: supplied by callers on `set` (lifespan, max idle,
//!   entry version)
//! - [`DerivedMeta`]: maintained by the engine and read-only to callers
//!   (creation time, last use, loaded-from-persistence flag)
//!
//! Both groups are wrapped by [`MetaParam`]. Lookups go through the
//! [`Lookup`] trait with a type token, e.g.
//! `view.find_meta_param::<MetaLifespan>()`. No kind is guaranteed to be
//! present on every entry.

use crate::timestamp::Timestamp;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::time::Duration;

/// Discriminant of a metadata kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKind {
    /// [`MetaLifespan`]
    Lifespan,
    /// [`MetaMaxIdle`]
    MaxIdle,
    /// [`MetaEntryVersion`]
    EntryVersion,
    /// [`MetaCreated`]
    Created,
    /// [`MetaLastUsed`]
    LastUsed,
    /// [`MetaLoadedFromPersistence`]
    LoadedFromPersistence,
}

// =============================================================================
// Writable kinds
// =============================================================================

/// Maximum time an entry lives after creation, in milliseconds
///
/// `-1` means unlimited and is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetaLifespan(i64);

impl MetaLifespan {
    /// Sentinel for "no lifespan"
    pub const UNLIMITED: MetaLifespan = MetaLifespan(-1);

    /// Lifespan in milliseconds
    pub const fn new(millis: i64) -> Self {
        MetaLifespan(millis)
    }

    /// The default (unlimited) lifespan
    pub const fn default_value() -> Self {
        Self::UNLIMITED
    }

    /// Raw milliseconds, `-1` when unlimited
    pub const fn get(&self) -> i64 {
        self.0
    }

    /// `None` when unlimited
    pub fn as_duration(&self) -> Option<Duration> {
        (self.0 >= 0).then(|| Duration::from_millis(self.0 as u64))
    }
}

/// Maximum time an entry may stay unused, in milliseconds
///
/// `-1` means unlimited and is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetaMaxIdle(i64);

impl MetaMaxIdle {
    /// Sentinel for "no idle limit"
    pub const UNLIMITED: MetaMaxIdle = MetaMaxIdle(-1);

    /// Max idle in milliseconds
    pub const fn new(millis: i64) -> Self {
        MetaMaxIdle(millis)
    }

    /// The default (unlimited) max idle
    pub const fn default_value() -> Self {
        Self::UNLIMITED
    }

    /// Raw milliseconds, `-1` when unlimited
    pub const fn get(&self) -> i64 {
        self.0
    }

    /// `None` when unlimited
    pub fn as_duration(&self) -> Option<Duration> {
        (self.0 >= 0).then(|| Duration::from_millis(self.0 as u64))
    }
}

/// Version attached to an entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetaEntryVersion(Version);

impl MetaEntryVersion {
    /// Wrap a version
    pub fn new(version: impl Into<Version>) -> Self {
        MetaEntryVersion(version.into())
    }

    /// The wrapped version
    pub fn get(&self) -> &Version {
        &self.0
    }
}

// =============================================================================
// Derived kinds
// =============================================================================

/// When the entry was first created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetaCreated(Timestamp);

impl MetaCreated {
    /// Creation time
    pub const fn new(at: Timestamp) -> Self {
        MetaCreated(at)
    }

    /// Creation time
    pub const fn get(&self) -> Timestamp {
        self.0
    }
}

/// When the entry was last read or written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetaLastUsed(Timestamp);

impl MetaLastUsed {
    /// Last use time
    pub const fn new(at: Timestamp) -> Self {
        MetaLastUsed(at)
    }

    /// Last use time
    pub const fn get(&self) -> Timestamp {
        self.0
    }
}

/// Whether the entry was loaded from the persistence store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetaLoadedFromPersistence(bool);

impl MetaLoadedFromPersistence {
    /// Entry came from the persistence store
    pub const LOADED: MetaLoadedFromPersistence = MetaLoadedFromPersistence(true);
    /// Entry was written in memory
    pub const NOT_LOADED: MetaLoadedFromPersistence = MetaLoadedFromPersistence(false);

    /// One of the two cached instances
    pub const fn of(loaded: bool) -> Self {
        if loaded {
            Self::LOADED
        } else {
            Self::NOT_LOADED
        }
    }

    /// The flag
    pub const fn get(&self) -> bool {
        self.0
    }
}

// =============================================================================
// Families
// =============================================================================

/// Metadata a caller may supply on `set`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WritableMeta {
    /// Lifespan
    Lifespan(MetaLifespan),
    /// Max idle
    MaxIdle(MetaMaxIdle),
    /// Entry version
    EntryVersion(MetaEntryVersion),
}

impl WritableMeta {
    /// Lifespan in milliseconds
    pub const fn lifespan(millis: i64) -> Self {
        WritableMeta::Lifespan(MetaLifespan::new(millis))
    }

    /// Max idle in milliseconds
    pub const fn max_idle(millis: i64) -> Self {
        WritableMeta::MaxIdle(MetaMaxIdle::new(millis))
    }

    /// Entry version
    pub fn version(version: impl Into<Version>) -> Self {
        WritableMeta::EntryVersion(MetaEntryVersion::new(version))
    }

    /// Kind discriminant
    pub fn kind(&self) -> MetaKind {
        match self {
            WritableMeta::Lifespan(_) => MetaKind::Lifespan,
            WritableMeta::MaxIdle(_) => MetaKind::MaxIdle,
            WritableMeta::EntryVersion(_) => MetaKind::EntryVersion,
        }
    }
}

/// Metadata maintained by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedMeta {
    /// Creation time
    Created(MetaCreated),
    /// Last use time
    LastUsed(MetaLastUsed),
    /// Loaded-from-persistence flag
    LoadedFromPersistence(MetaLoadedFromPersistence),
}

impl DerivedMeta {
    /// Kind discriminant
    pub fn kind(&self) -> MetaKind {
        match self {
            DerivedMeta::Created(_) => MetaKind::Created,
            DerivedMeta::LastUsed(_) => MetaKind::LastUsed,
            DerivedMeta::LoadedFromPersistence(_) => MetaKind::LoadedFromPersistence,
        }
    }
}

/// A metadata value attached to an entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetaParam {
    /// Caller-supplied
    Writable(WritableMeta),
    /// Engine-maintained
    Derived(DerivedMeta),
}

impl MetaParam {
    /// Kind discriminant
    pub fn kind(&self) -> MetaKind {
        match self {
            MetaParam::Writable(w) => w.kind(),
            MetaParam::Derived(d) => d.kind(),
        }
    }

    /// Whether a caller may supply this value
    pub fn is_writable(&self) -> bool {
        matches!(self, MetaParam::Writable(_))
    }
}

impl From<WritableMeta> for MetaParam {
    fn from(w: WritableMeta) -> Self {
        MetaParam::Writable(w)
    }
}

impl From<DerivedMeta> for MetaParam {
    fn from(d: DerivedMeta) -> Self {
        MetaParam::Derived(d)
    }
}

/// A concrete metadata kind usable as a lookup type token
pub trait MetaParamKind: Sized {
    /// Discriminant of this kind
    const KIND: MetaKind;

    /// Borrow `Self` out of `meta` if it is of this kind
    fn from_meta(meta: &MetaParam) -> Option<&Self>;
}

macro_rules! meta_kind {
    ($ty:ty, $kind:ident, $outer:ident($family:ident :: $variant:ident)) => {
        impl MetaParamKind for $ty {
            const KIND: MetaKind = MetaKind::$kind;

            fn from_meta(meta: &MetaParam) -> Option<&Self> {
                match meta {
                    MetaParam::$outer($family::$variant(m)) => Some(m),
                    _ => None,
                }
            }
        }
    };
}

meta_kind!(MetaLifespan, Lifespan, Writable(WritableMeta::Lifespan));
meta_kind!(MetaMaxIdle, MaxIdle, Writable(WritableMeta::MaxIdle));
meta_kind!(MetaEntryVersion, EntryVersion, Writable(WritableMeta::EntryVersion));
meta_kind!(MetaCreated, Created, Derived(DerivedMeta::Created));
meta_kind!(MetaLastUsed, LastUsed, Derived(DerivedMeta::LastUsed));
meta_kind!(
    MetaLoadedFromPersistence,
    LoadedFromPersistence,
    Derived(DerivedMeta::LoadedFromPersistence)
);

/// Typed metadata lookup
pub trait Lookup {
    /// The metadata value of kind `M`, if present
    fn find_meta_param<M: MetaParamKind>(&self) -> Option<&M>;
}

// =============================================================================
// MetaParams
// =============================================================================

/// The metadata set attached to one entry
///
/// Holds at most one value per kind: `add` replaces an existing value of
/// the same kind (last one wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaParams {
    params: SmallVec<[MetaParam; 4]>,
}

impl MetaParams {
    /// Empty metadata set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from caller-supplied metadata
    pub fn from_writable<'a>(metas: impl IntoIterator<Item = &'a WritableMeta>) -> Self {
        let mut params = Self::new();
        for m in metas {
            params.add(MetaParam::Writable(m.clone()));
        }
        params
    }

    /// Insert `meta`, replacing any value of the same kind
    pub fn add(&mut self, meta: impl Into<MetaParam>) {
        let meta = meta.into();
        let kind = meta.kind();
        match self.params.iter_mut().find(|p| p.kind() == kind) {
            Some(slot) => *slot = meta,
            None => self.params.push(meta),
        }
    }

    /// Insert every value of `other`, replacing same-kind values
    pub fn add_all(&mut self, other: &MetaParams) {
        for p in other.iter() {
            self.add(p.clone());
        }
    }

    /// Remove the value of `kind`, returning it
    pub fn remove(&mut self, kind: MetaKind) -> Option<MetaParam> {
        let idx = self.params.iter().position(|p| p.kind() == kind)?;
        Some(self.params.remove(idx))
    }

    /// Value of kind `M`
    pub fn find<M: MetaParamKind>(&self) -> Option<&M> {
        self.params.iter().find_map(M::from_meta)
    }

    /// Whether a value of `kind` is present
    pub fn contains(&self, kind: MetaKind) -> bool {
        self.params.iter().any(|p| p.kind() == kind)
    }

    /// All values in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &MetaParam> {
        self.params.iter()
    }

    /// Caller-supplied values only
    pub fn writable(&self) -> impl Iterator<Item = &WritableMeta> {
        self.params.iter().filter_map(|p| match p {
            MetaParam::Writable(w) => Some(w),
            MetaParam::Derived(_) => None,
        })
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether no metadata is attached
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl Lookup for MetaParams {
    fn find_meta_param<M: MetaParamKind>(&self) -> Option<&M> {
        self.find::<M>()
    }
}

impl FromIterator<MetaParam> for MetaParams {
    fn from_iter<I: IntoIterator<Item = MetaParam>>(iter: I) -> Self {
        let mut params = MetaParams::new();
        for p in iter {
            params.add(p);
        }
        params
    }
}
