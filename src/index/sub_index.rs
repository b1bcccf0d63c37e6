use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::types::{Criteria, Document, Form, FormKind, IndexError, MatchSet};

use super::builder::{self, StagedInstance};
use super::matcher;
use super::table::State;

/// Point-in-time counters for one sub-index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SubStats {
    pub(crate) live_instances: usize,
    pub(crate) stale_instances: usize,
    pub(crate) posting_entries: usize,
    pub(crate) rows: usize,
}

/// The DNF or CNF half of an index group.
#[derive(Debug)]
pub(crate) struct SubIndex {
    group: Arc<str>,
    form: FormKind,
    compaction_threshold: usize,
    next_id: AtomicU64,
    state: RwLock<State>,
}

impl SubIndex {
    pub(crate) fn new(group: Arc<str>, form: FormKind, compaction_threshold: usize) -> Self {
        Self {
            group,
            form,
            compaction_threshold,
            next_id: AtomicU64::new(0),
            state: RwLock::new(State::default()),
        }
    }

    fn allocate(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Stage `criteria` under fresh internal ids, then file the rows and flip
    /// liveness in one write section. Returns the number of instances published.
    pub(crate) fn publish(&self, criteria: &Criteria) -> usize {
        let external: Arc<str> = Arc::from(criteria.id());
        let staged: Vec<StagedInstance> = match criteria.form() {
            Form::Dnf(conjunctions) => conjunctions
                .iter()
                .map(|c| builder::stage_conjunction(self.allocate(), &external, c))
                .collect(),
            Form::Cnf(disjunctions) => {
                vec![builder::stage_cnf(self.allocate(), &external, disjunctions)]
            }
        };
        let ids: Vec<u64> = staged.iter().map(|s| s.internal_id).collect();
        let newest = ids.iter().copied().max();

        let mut state = self.state.write();
        if state.newest(&external) > newest {
            debug!(
                target: "boolmatch::index",
                group = %self.group,
                id = %external,
                "newer version already published; staged version dropped"
            );
            return 0;
        }
        for instance in staged {
            let internal_id = instance.internal_id;
            let meta = builder::merge_row(&mut state.table, instance);
            state.instances.insert(internal_id, meta);
        }
        let published = ids.len();
        state.flip(&external, ids);
        debug!(
            target: "boolmatch::index",
            group = %self.group,
            form = ?self.form,
            id = %external,
            instances = published,
            "criteria published"
        );
        self.maybe_compact(&mut state);
        published
    }

    /// Clear liveness of `id`; returns the number of instances retired.
    pub(crate) fn retire(&self, id: &str) -> usize {
        let mut state = self.state.write();
        let retired = state.retire(id);
        if retired > 0 {
            debug!(
                target: "boolmatch::index",
                group = %self.group,
                form = ?self.form,
                id,
                instances = retired,
                "criteria retired"
            );
        }
        self.maybe_compact(&mut state);
        retired
    }

    pub(crate) fn search(&self, doc: &Document) -> Result<MatchSet, IndexError> {
        let mut out = MatchSet::new();
        let state = self.state.read();
        matcher::search(self.form, &state, &self.group, doc, &mut out)?;
        Ok(out)
    }

    /// Drop every posting entry of non-live ids; returns the number removed.
    pub(crate) fn compact(&self) -> usize {
        let mut state = self.state.write();
        self.compact_locked(&mut state)
    }

    fn maybe_compact(&self, state: &mut State) {
        if self.compaction_threshold > 0 && state.stale >= self.compaction_threshold {
            self.compact_locked(state);
        }
    }

    fn compact_locked(&self, state: &mut State) -> usize {
        let stale = state.stale;
        let removed = state.compact();
        info!(
            target: "boolmatch::index",
            group = %self.group,
            form = ?self.form,
            stale,
            removed,
            "sub-index compacted"
        );
        removed
    }

    pub(crate) fn stats(&self) -> SubStats {
        let state = self.state.read();
        let live_instances: usize = state.versions.values().map(|v| v.live.len()).sum();
        SubStats {
            live_instances,
            stale_instances: state.instances.len().saturating_sub(live_instances),
            posting_entries: state.table.posting_entries(),
            rows: state.table.rows.len(),
        }
    }
}
