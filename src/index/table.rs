use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

use crate::types::Caveat;

use super::key::{Key, KeyToken, PostingEntry};

// ============================================================================
// PostingList
// ============================================================================

/// Entries sorted by `(internal_id, kind, slot)`.
#[derive(Debug, Clone, Default)]
pub(crate) struct PostingList {
    entries: Vec<PostingEntry>,
}

impl PostingList {
    pub(crate) fn entries(&self) -> &[PostingEntry] {
        &self.entries
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert in order; an entry with the same `(internal_id, kind, slot)` is replaced.
    pub(crate) fn merge(&mut self, entry: PostingEntry) {
        // New ids are allocated monotonically, so appending is the common case.
        if self
            .entries
            .last()
            .map_or(true, |last| last.order_key() < entry.order_key())
        {
            self.entries.push(entry);
            return;
        }
        match self
            .entries
            .binary_search_by_key(&entry.order_key(), PostingEntry::order_key)
        {
            Ok(i) => self.entries[i] = entry,
            Err(i) => self.entries.insert(i, entry),
        }
    }

    /// Keep entries whose internal id passes `keep`; returns how many were dropped.
    pub(crate) fn retain(&mut self, keep: impl Fn(u64) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| keep(e.internal_id));
        before - self.entries.len()
    }

    /// First position at or after `from` whose internal id is `>= target`.
    ///
    /// Gallops forward in doubling steps, then binary searches the bracket,
    /// so long runs of skipped ids cost a logarithmic number of probes.
    pub(crate) fn seek(&self, from: usize, target: u64) -> usize {
        let entries = &self.entries;
        if from >= entries.len() || entries[from].internal_id >= target {
            return from;
        }
        let mut lo = from;
        let mut step = 1;
        let mut hi = lo + step;
        while hi < entries.len() && entries[hi].internal_id < target {
            lo = hi;
            step *= 2;
            hi = lo + step;
        }
        let hi = hi.min(entries.len());
        lo + 1 + entries[lo + 1..hi].partition_point(|e| e.internal_id < target)
    }
}

// ============================================================================
// Rows
// ============================================================================

/// Posting lists for one document path within a row.
#[derive(Debug, Default)]
pub(crate) struct PathRow {
    /// Lists per token, indexed by occurrence.
    pub(crate) lists: HashMap<KeyToken, Vec<PostingList>>,
    /// Non-equality caveats filed under this path, tested per query.
    pub(crate) caveats: Vec<(KeyToken, Caveat)>,
}

/// Every instance sharing one slot count.
#[derive(Debug, Default)]
pub(crate) struct Row {
    pub(crate) paths: HashMap<Arc<str>, PathRow>,
    /// Zero-slot instances; every query carries this key.
    pub(crate) sentinel: PostingList,
}

impl Row {
    fn lists(&self) -> impl Iterator<Item = &PostingList> {
        self.paths
            .values()
            .flat_map(|p| p.lists.values().flatten())
            .chain(std::iter::once(&self.sentinel))
    }

    fn retain(&mut self, keep: &impl Fn(u64) -> bool) -> usize {
        let mut dropped = self.sentinel.retain(keep);
        self.paths.retain(|_, path_row| {
            path_row.lists.retain(|_, lists| {
                for list in lists.iter_mut() {
                    dropped += list.retain(keep);
                }
                // Occurrence n of a live instance implies occurrences 0..n.
                while lists.last().is_some_and(PostingList::is_empty) {
                    lists.pop();
                }
                !lists.is_empty()
            });
            let PathRow { lists, caveats } = path_row;
            caveats.retain(|(token, _)| lists.contains_key(token));
            !lists.is_empty()
        });
        dropped
    }

    fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.sentinel.is_empty()
    }
}

/// Slot count to row.
#[derive(Debug, Default)]
pub(crate) struct Table {
    pub(crate) rows: BTreeMap<usize, Row>,
}

impl Table {
    /// File `entry` under `key` in the row for `slot_count`.
    pub(crate) fn insert(
        &mut self,
        slot_count: usize,
        key: Key,
        caveat: Option<Caveat>,
        entry: PostingEntry,
    ) {
        let row = self.rows.entry(slot_count).or_default();
        if key.is_sentinel() {
            row.sentinel.merge(entry);
            return;
        }
        let path_row = row.paths.entry(key.path).or_default();
        if let Some(caveat) = caveat {
            if !path_row.caveats.iter().any(|(t, _)| *t == key.token) {
                path_row.caveats.push((key.token.clone(), caveat));
            }
        }
        let lists = path_row.lists.entry(key.token).or_default();
        let occurrence = key.occurrence as usize;
        if lists.len() <= occurrence {
            lists.resize_with(occurrence + 1, PostingList::default);
        }
        lists[occurrence].merge(entry);
    }

    pub(crate) fn retain(&mut self, keep: impl Fn(u64) -> bool) -> usize {
        let mut dropped = 0;
        self.rows.retain(|_, row| {
            dropped += row.retain(&keep);
            !row.is_empty()
        });
        dropped
    }

    pub(crate) fn posting_entries(&self) -> usize {
        self.rows
            .values()
            .flat_map(Row::lists)
            .map(PostingList::len)
            .sum()
    }
}

// ============================================================================
// Versioning
// ============================================================================

/// Internal ids ever allocated to one external id, and which are live.
#[derive(Debug, Default)]
pub(crate) struct Versions {
    /// Max-heap: the top is the current version.
    pub(crate) history: BinaryHeap<u64>,
    /// Every instance id of the current version; empty once deleted.
    pub(crate) live: Vec<u64>,
}

/// Per-instance metadata needed at match time.
#[derive(Debug, Clone)]
pub(crate) struct Instance {
    pub(crate) external_id: Arc<str>,
    pub(crate) slot_count: usize,
    /// CNF only: per-disjunction counter seeds, `-(excluded predicates)`.
    pub(crate) negatives: Box<[i32]>,
}

/// Everything a sub-index guards with its lock.
#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) table: Table,
    pub(crate) versions: HashMap<Arc<str>, Versions>,
    pub(crate) instances: HashMap<u64, Instance>,
    /// Internal ids that went out of liveness since the last compaction.
    pub(crate) stale: usize,
}

impl State {
    pub(crate) fn is_live(&self, external_id: &str, internal_id: u64) -> bool {
        self.versions
            .get(external_id)
            .is_some_and(|v| v.live.contains(&internal_id))
    }

    /// The newest internal id ever allocated to `external_id`.
    pub(crate) fn newest(&self, external_id: &str) -> Option<u64> {
        self.versions
            .get(external_id)
            .and_then(|v| v.history.peek().copied())
    }

    /// Make `ids` the live set of `external_id`, retiring the previous version.
    pub(crate) fn flip(&mut self, external_id: &Arc<str>, ids: Vec<u64>) {
        let versions = self.versions.entry(Arc::clone(external_id)).or_default();
        versions.history.extend(ids.iter().copied());
        self.stale += versions.live.len();
        versions.live = ids;
    }

    /// Clear liveness; returns the number of instances retired.
    pub(crate) fn retire(&mut self, external_id: &str) -> usize {
        let Some(versions) = self.versions.get_mut(external_id) else {
            return 0;
        };
        let retired = versions.live.len();
        versions.live.clear();
        self.stale += retired;
        retired
    }

    pub(crate) fn live_ids(&self) -> HashSet<u64> {
        self.versions
            .values()
            .flat_map(|v| v.live.iter().copied())
            .collect()
    }

    /// Drop every trace of non-live ids; returns the posting entries removed.
    pub(crate) fn compact(&mut self) -> usize {
        let live = self.live_ids();
        let dropped = self.table.retain(|id| live.contains(&id));
        self.instances.retain(|id, _| live.contains(id));
        self.versions.retain(|_, v| !v.live.is_empty());
        for versions in self.versions.values_mut() {
            if let Some(&newest) = versions.history.peek() {
                versions.history.clear();
                versions.history.push(newest);
            }
        }
        self.stale = 0;
        dropped
    }
}
