//! Inverted index over criteria.
//!
//! Each [`IndexGroup`] owns a DNF and a CNF sub-index. A sub-index files
//! every physical instance (one per DNF conjunction, one per CNF formula)
//! under rows keyed by slot count, and answers a search with a skip-merge
//! over the posting lists the document addresses. Groups are kept in a
//! [`Registry`].

mod builder;
mod group;
mod key;
mod matcher;
mod registry;
mod sub_index;
mod table;

use serde::Serialize;

pub use group::IndexGroup;
pub use registry::Registry;

/// Default stale-instance count that triggers compaction of a sub-index.
pub const DEFAULT_COMPACTION_THRESHOLD: usize = 4096;

/// Tuning knobs for an [`IndexGroup`].
///
/// # Example
///
/// ```
/// use boolmatch::{GroupConfig, Registry};
///
/// let registry = Registry::with_config(
///     GroupConfig::default()
///         .with_compaction_threshold(128)
///         .with_parallel_search(true),
/// );
/// let group = registry.create_or_get_group("ads");
/// assert_eq!(group.config().compaction_threshold(), 128);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct GroupConfig {
    compaction_threshold: usize,
    parallel_search: bool,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
            parallel_search: false,
        }
    }
}

impl GroupConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compact a sub-index once this many instances went stale. `0` disables
    /// automatic compaction; [`IndexGroup::compact`] still works.
    pub fn with_compaction_threshold(mut self, threshold: usize) -> Self {
        self.compaction_threshold = threshold;
        self
    }

    /// Run the DNF and CNF searches of a query on the rayon pool.
    pub fn with_parallel_search(mut self, parallel: bool) -> Self {
        self.parallel_search = parallel;
        self
    }

    #[must_use]
    pub fn compaction_threshold(&self) -> usize {
        self.compaction_threshold
    }

    #[must_use]
    pub fn parallel_search(&self) -> bool {
        self.parallel_search
    }
}

/// What [`IndexGroup::index`] does with a criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Update,
    Delete,
}

/// Point-in-time counters for an [`IndexGroup`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Registered criteria, indexed or not.
    pub criteria: usize,
    /// Criteria evaluated by tree walk because a predicate overrides its default.
    pub residual: usize,
    pub live_instances: usize,
    /// Instances out of liveness still awaiting compaction.
    pub stale_instances: usize,
    pub posting_entries: usize,
    pub rows: usize,
}
