use std::collections::BTreeSet;

use tracing::{error, trace};

use crate::types::{Document, FormKind, IndexError, KeyValue, MatchSet, PredicateKind};

use super::key::{KeyToken, PostingEntry, SENTINEL_SLOT};
use super::table::{Instance, PostingList, Row, State};

/// Read position in one posting list.
struct Cursor<'a> {
    list: &'a PostingList,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn head(&self) -> Option<&'a PostingEntry> {
        self.list.entries().get(self.pos)
    }

    fn sort_key(&self) -> (u64, PredicateKind, u32) {
        self.head()
            .map_or((u64::MAX, PredicateKind::Included, u32::MAX), PostingEntry::order_key)
    }

    fn seek(&mut self, target: u64) {
        self.pos = self.list.seek(self.pos, target);
    }
}

/// One cursor per posting list of `row` that the document addresses.
///
/// Equality keys are probed by the document's canonical values; caveat keys
/// are kept only when some document value passes the caveat.
fn cursors<'a>(row: &'a Row, doc: &Document) -> Vec<Cursor<'a>> {
    let mut out = Vec::new();
    let mut open = |lists: &'a [PostingList]| {
        out.extend(
            lists
                .iter()
                .filter(|l| !l.is_empty())
                .map(|list| Cursor { list, pos: 0 }),
        );
    };
    for (path, values) in doc.iter() {
        let Some(path_row) = row.paths.get(path) else {
            continue;
        };
        let tokens: BTreeSet<KeyValue> = values.iter().map(|v| v.key_value()).collect();
        for token in tokens {
            if let Some(lists) = path_row.lists.get(&KeyToken::Value(token)) {
                open(lists.as_slice());
            }
        }
        for (token, caveat) in &path_row.caveats {
            if values.iter().any(|v| caveat.test(v)) {
                if let Some(lists) = path_row.lists.get(token) {
                    open(lists.as_slice());
                }
            }
        }
    }
    open(std::slice::from_ref(&row.sentinel));
    out
}

/// Skip-merge over one row, handing every candidate id with all of its
/// entries to `accept`. Returns the number of candidates examined.
///
/// A candidate needs at least `max(k, 1)` cursors on it; zero-slot rows
/// reach that through the sentinel list.
fn merge_row<'a>(
    row: &'a Row,
    k: usize,
    doc: &Document,
    mut accept: impl FnMut(u64, &[&'a PostingEntry]) -> Result<(), IndexError>,
) -> Result<usize, IndexError> {
    let need = k.max(1);
    let mut cursors = cursors(row, doc);
    let mut gathered: Vec<&'a PostingEntry> = Vec::new();
    let mut candidates = 0;
    loop {
        cursors.retain(|c| c.head().is_some());
        if cursors.len() < need {
            break;
        }
        cursors.sort_unstable_by_key(Cursor::sort_key);
        let first = cursors[0].sort_key().0;
        let kth = cursors[need - 1].sort_key().0;
        if first != kth {
            for cursor in &mut cursors[..need - 1] {
                cursor.seek(kth);
            }
            continue;
        }
        candidates += 1;
        gathered.clear();
        for cursor in &mut cursors {
            let mut advanced = false;
            while let Some(entry) = cursor.head().filter(|e| e.internal_id == first) {
                gathered.push(entry);
                cursor.pos += 1;
                advanced = true;
            }
            if !advanced {
                // Cursors are sorted: the rest sit on later ids.
                break;
            }
        }
        accept(first, &gathered)?;
    }
    Ok(candidates)
}

fn instance<'s>(state: &'s State, group: &str, internal_id: u64) -> Result<&'s Instance, IndexError> {
    state.instances.get(&internal_id).ok_or_else(|| {
        let reason = "live instance has no metadata".to_owned();
        error!(target: "boolmatch::index", group, internal_id, %reason, "index inconsistency");
        IndexError::Inconsistent {
            group: group.to_owned(),
            internal_id,
            reason,
        }
    })
}

/// DNF acceptance: no exclusion hit, the id is live, and the distinct
/// included slots cover the conjunction.
fn accept_dnf(
    state: &State,
    group: &str,
    internal_id: u64,
    entries: &[&PostingEntry],
    out: &mut MatchSet,
) -> Result<(), IndexError> {
    let Some(first) = entries.first() else {
        return Ok(());
    };
    if entries.iter().any(|e| e.kind == PredicateKind::Excluded) {
        return Ok(());
    }
    if !state.is_live(&first.external_id, internal_id) {
        return Ok(());
    }
    let instance = instance(state, group, internal_id)?;
    let mut slots: Vec<(u32, f64)> = entries.iter().map(|e| (e.slot, e.weight)).collect();
    slots.sort_unstable_by_key(|(slot, _)| *slot);
    slots.dedup_by_key(|(slot, _)| *slot);
    if slots.len() < instance.slot_count.max(1) {
        return Ok(());
    }
    let score: f64 = slots
        .iter()
        .filter(|(slot, _)| *slot != SENTINEL_SLOT)
        .map(|(_, weight)| weight)
        .sum();
    out.insert_max(&instance.external_id, score);
    Ok(())
}

/// CNF acceptance: every disjunction counter ends non-zero.
///
/// Counters start at `-(excluded predicates)`; an exclusion hit moves its
/// counter up once per predicate and an inclusion hit pins it to 1.
fn accept_cnf(
    state: &State,
    group: &str,
    internal_id: u64,
    entries: &[&PostingEntry],
    out: &mut MatchSet,
) -> Result<(), IndexError> {
    let Some(first) = entries.first() else {
        return Ok(());
    };
    if !state.is_live(&first.external_id, internal_id) {
        return Ok(());
    }
    let instance = instance(state, group, internal_id)?;
    let mut counters = instance.negatives.to_vec();
    let mut best: Vec<Option<f64>> = vec![None; counters.len()];
    let mut excluded_seen: Vec<u32> = Vec::new();
    for entry in entries {
        if entry.slot == SENTINEL_SLOT {
            continue;
        }
        let d = entry.slot as usize;
        if d >= counters.len() {
            return Err(IndexError::Inconsistent {
                group: group.to_owned(),
                internal_id,
                reason: format!("disjunction {d} out of range"),
            });
        }
        match entry.kind {
            PredicateKind::Excluded => {
                if !excluded_seen.contains(&entry.ordinal) {
                    excluded_seen.push(entry.ordinal);
                    counters[d] += 1;
                }
            }
            PredicateKind::Included => {
                counters[d] = 1;
                best[d] = Some(best[d].map_or(entry.weight, |b| b.max(entry.weight)));
            }
        }
    }
    if counters.iter().all(|c| *c != 0) {
        let score: f64 = best.iter().map(|b| b.unwrap_or(0.0)).sum();
        out.insert_max(&instance.external_id, score);
    }
    Ok(())
}

/// Match `doc` against every row of one sub-index.
pub(crate) fn search(
    form: FormKind,
    state: &State,
    group: &str,
    doc: &Document,
    out: &mut MatchSet,
) -> Result<(), IndexError> {
    for (&k, row) in &state.table.rows {
        let candidates = merge_row(row, k, doc, |internal_id, entries| match form {
            FormKind::Dnf => accept_dnf(state, group, internal_id, entries, out),
            FormKind::Cnf => accept_cnf(state, group, internal_id, entries, out),
        })?;
        trace!(target: "boolmatch::index", group, ?form, k, candidates, "row merged");
    }
    Ok(())
}
