//! Per-invocation tunables
//!
//! A [`Param`] is a non-persisted knob that changes how the engine executes
//! one operation. Every kind has a small, fixed, dense id (0..=4) and a fixed
//! default. A [`Params`] value is a table indexed by that id, so overriding a
//! kind is a single slot write and reading it never dispatches on runtime
//! type.
//!
//! | id | kind              | default        |
//! |----|-------------------|----------------|
//! | 0  | [`PersistenceMode`] | `LoadPersist` |
//! | 1  | [`LockingMode`]     | `Lock`        |
//! | 2  | [`ExecutionMode`]   | `All`         |
//! | 3  | [`StatisticsMode`]  | `Gather`      |
//! | 4  | [`ReplicationMode`] | `Sync`        |
//!
//! Ids are never reused.

use serde::{Deserialize, Serialize};

/// Interaction with the persistence store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceMode {
    /// Load absent values from the store and write changes through to it
    #[default]
    LoadPersist,
    /// Keep the write in memory only
    SkipPersist,
    /// Do not consult the store when the prior value is not in memory
    SkipLoad,
    /// Both `SkipPersist` and `SkipLoad`
    Skip,
}

impl PersistenceMode {
    /// Whether absent values may be loaded from the store
    pub const fn loads(&self) -> bool {
        matches!(self, PersistenceMode::LoadPersist | PersistenceMode::SkipPersist)
    }

    /// Whether writes reach the store
    pub const fn persists(&self) -> bool {
        matches!(self, PersistenceMode::LoadPersist | PersistenceMode::SkipLoad)
    }
}

/// Per-key serialization of writers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockingMode {
    /// Wait for the key's lock
    #[default]
    Lock,
    /// No serialization; concurrent writers give an undefined result
    Skip,
    /// Fail immediately if the key is locked
    TryLock,
}

/// Where an operation executes and how far it replicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Replicate to every configured backup, including other sites
    #[default]
    All,
    /// Local node only; writes to non-owned keys are dropped and reads of
    /// non-owned absent keys are not fetched
    Local,
    /// Replicate within the local site only
    LocalSite,
}

/// Whether the operation updates statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsMode {
    /// Record hits, misses, stores and removes
    #[default]
    Gather,
    /// Leave statistics untouched
    Skip,
}

/// Whether the caller waits for replication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationMode {
    /// Complete after owners applied the write
    #[default]
    Sync,
    /// Fire and forget
    Async,
}

/// A tunable, tagged by its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Param {
    /// id 0
    Persistence(PersistenceMode),
    /// id 1
    Locking(LockingMode),
    /// id 2
    Execution(ExecutionMode),
    /// id 3
    Statistics(StatisticsMode),
    /// id 4
    Replication(ReplicationMode),
}

impl Param {
    /// Id of [`PersistenceMode`]
    pub const PERSISTENCE_ID: usize = 0;
    /// Id of [`LockingMode`]
    pub const LOCKING_ID: usize = 1;
    /// Id of [`ExecutionMode`]
    pub const EXECUTION_ID: usize = 2;
    /// Id of [`StatisticsMode`]
    pub const STATISTICS_ID: usize = 3;
    /// Id of [`ReplicationMode`]
    pub const REPLICATION_ID: usize = 4;
    /// Number of kinds
    pub const COUNT: usize = 5;

    /// Dense id of this kind
    pub const fn id(&self) -> usize {
        match self {
            Param::Persistence(_) => Self::PERSISTENCE_ID,
            Param::Locking(_) => Self::LOCKING_ID,
            Param::Execution(_) => Self::EXECUTION_ID,
            Param::Statistics(_) => Self::STATISTICS_ID,
            Param::Replication(_) => Self::REPLICATION_ID,
        }
    }

    /// Default value for the kind with `id`
    pub const fn default_for(id: usize) -> Option<Param> {
        match id {
            Self::PERSISTENCE_ID => Some(Param::Persistence(PersistenceMode::LoadPersist)),
            Self::LOCKING_ID => Some(Param::Locking(LockingMode::Lock)),
            Self::EXECUTION_ID => Some(Param::Execution(ExecutionMode::All)),
            Self::STATISTICS_ID => Some(Param::Statistics(StatisticsMode::Gather)),
            Self::REPLICATION_ID => Some(Param::Replication(ReplicationMode::Sync)),
            _ => None,
        }
    }
}

impl From<PersistenceMode> for Param {
    fn from(m: PersistenceMode) -> Self {
        Param::Persistence(m)
    }
}

impl From<LockingMode> for Param {
    fn from(m: LockingMode) -> Self {
        Param::Locking(m)
    }
}

impl From<ExecutionMode> for Param {
    fn from(m: ExecutionMode) -> Self {
        Param::Execution(m)
    }
}

impl From<StatisticsMode> for Param {
    fn from(m: StatisticsMode) -> Self {
        Param::Statistics(m)
    }
}

impl From<ReplicationMode> for Param {
    fn from(m: ReplicationMode) -> Self {
        Param::Replication(m)
    }
}

/// Discriminant-indexed table holding one value per param kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Params {
    table: [Param; Param::COUNT],
}

impl Default for Params {
    fn default() -> Self {
        Self::DEFAULTS
    }
}

impl Params {
    /// Every kind at its default
    pub const DEFAULTS: Params = Params {
        table: [
            Param::Persistence(PersistenceMode::LoadPersist),
            Param::Locking(LockingMode::Lock),
            Param::Execution(ExecutionMode::All),
            Param::Statistics(StatisticsMode::Gather),
            Param::Replication(ReplicationMode::Sync),
        ],
    };

    /// Defaults overridden by `ps`
    pub fn from_params(ps: &[Param]) -> Self {
        Self::DEFAULTS.add_all(ps)
    }

    /// Copy of `self` with `ps` overriding their kinds; later entries win
    pub fn add_all(&self, ps: &[Param]) -> Self {
        let mut table = self.table;
        for p in ps {
            table[p.id()] = *p;
        }
        Params { table }
    }

    /// Value stored for `id`
    pub fn get(&self, id: usize) -> Option<Param> {
        self.table.get(id).copied()
    }

    /// Persistence mode
    pub fn persistence(&self) -> PersistenceMode {
        match self.table[Param::PERSISTENCE_ID] {
            Param::Persistence(m) => m,
            _ => PersistenceMode::default(),
        }
    }

    /// Locking mode
    pub fn locking(&self) -> LockingMode {
        match self.table[Param::LOCKING_ID] {
            Param::Locking(m) => m,
            _ => LockingMode::default(),
        }
    }

    /// Execution mode
    pub fn execution(&self) -> ExecutionMode {
        match self.table[Param::EXECUTION_ID] {
            Param::Execution(m) => m,
            _ => ExecutionMode::default(),
        }
    }

    /// Statistics mode
    pub fn statistics(&self) -> StatisticsMode {
        match self.table[Param::STATISTICS_ID] {
            Param::Statistics(m) => m,
            _ => StatisticsMode::default(),
        }
    }

    /// Replication mode
    pub fn replication(&self) -> ReplicationMode {
        match self.table[Param::REPLICATION_ID] {
            Param::Replication(m) => m,
            _ => ReplicationMode::default(),
        }
    }

    /// All values in id order
    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.table.iter()
    }
}
