//! Pure functions turning formulas into staged posting entries.
//!
//! Staging needs no lock: a sub-index allocates ids, stages every instance of
//! a criteria, then hands the result to [`merge_row`] inside one write
//! critical section.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{Caveat, Conjunction, Disjunction, Predicate};

use super::key::{Key, KeyToken, PostingEntry};
use super::table::{Instance, Table};

/// One posting entry waiting to be filed.
#[derive(Debug, Clone)]
pub(crate) struct StagedPosting {
    pub(crate) key: Key,
    /// Set for non-equality keys so the matcher can re-test document values.
    pub(crate) caveat: Option<Caveat>,
    pub(crate) entry: PostingEntry,
}

/// Every posting entry of one physical instance, plus its match-time metadata.
#[derive(Debug, Clone)]
pub(crate) struct StagedInstance {
    pub(crate) internal_id: u64,
    pub(crate) external_id: Arc<str>,
    pub(crate) slot_count: usize,
    pub(crate) negatives: Box<[i32]>,
    pub(crate) postings: Vec<StagedPosting>,
}

/// Normalized key tokens for a predicate: one per equality value, otherwise
/// a single caveat token.
pub(crate) fn derive_keys(predicate: &Predicate) -> Vec<KeyToken> {
    match predicate.caveat() {
        Caveat::Equality(values) => values.iter().cloned().map(KeyToken::Value).collect(),
        caveat => caveat
            .token()
            .map(|text| KeyToken::Caveat {
                kind: caveat.kind(),
                text,
            })
            .into_iter()
            .collect(),
    }
}

#[derive(Default)]
struct Occurrences(HashMap<(Arc<str>, KeyToken), u32>);

impl Occurrences {
    fn next(&mut self, path: &Arc<str>, token: &KeyToken) -> u32 {
        let count = self
            .0
            .entry((Arc::clone(path), token.clone()))
            .or_insert(0);
        let occurrence = *count;
        *count += 1;
        occurrence
    }
}

struct Stager {
    internal_id: u64,
    external_id: Arc<str>,
    occurrences: Occurrences,
    postings: Vec<StagedPosting>,
}

impl Stager {
    fn new(internal_id: u64, external_id: &Arc<str>) -> Self {
        Self {
            internal_id,
            external_id: Arc::clone(external_id),
            occurrences: Occurrences::default(),
            postings: Vec::new(),
        }
    }

    fn predicate(&mut self, predicate: &Predicate, slot: u32, ordinal: u32) {
        let path: Arc<str> = Arc::from(predicate.path());
        let caveat = match predicate.caveat() {
            Caveat::Equality(_) => None,
            other => Some(other.clone()),
        };
        for token in derive_keys(predicate) {
            let occurrence = self.occurrences.next(&path, &token);
            self.postings.push(StagedPosting {
                key: Key::new(Arc::clone(&path), token, occurrence),
                caveat: caveat.clone(),
                entry: PostingEntry {
                    internal_id: self.internal_id,
                    external_id: Arc::clone(&self.external_id),
                    kind: predicate.kind(),
                    slot,
                    ordinal,
                    weight: predicate.weight(),
                },
            });
        }
    }

    fn finish(mut self, slot_count: usize, negatives: Box<[i32]>) -> StagedInstance {
        if slot_count == 0 {
            self.postings.push(StagedPosting {
                key: Key::sentinel(),
                caveat: None,
                entry: PostingEntry::sentinel(self.internal_id, Arc::clone(&self.external_id)),
            });
        }
        StagedInstance {
            internal_id: self.internal_id,
            external_id: self.external_id,
            slot_count,
            negatives,
            postings: self.postings,
        }
    }
}

/// Stage one DNF conjunction: slots are predicate ordinals.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn stage_conjunction(
    internal_id: u64,
    external_id: &Arc<str>,
    conjunction: &Conjunction,
) -> StagedInstance {
    let mut stager = Stager::new(internal_id, external_id);
    for (ordinal, predicate) in conjunction.predicates().iter().enumerate() {
        stager.predicate(predicate, ordinal as u32, ordinal as u32);
    }
    stager.finish(conjunction.slot_count(), Box::default())
}

/// Stage a whole CNF formula as one instance: slots are disjunction ordinals.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub(crate) fn stage_cnf(
    internal_id: u64,
    external_id: &Arc<str>,
    disjunctions: &[Disjunction],
) -> StagedInstance {
    let mut stager = Stager::new(internal_id, external_id);
    let mut ordinal = 0_u32;
    for (slot, disjunction) in disjunctions.iter().enumerate() {
        for predicate in disjunction.predicates() {
            stager.predicate(predicate, slot as u32, ordinal);
            ordinal += 1;
        }
    }
    let slot_count = disjunctions
        .iter()
        .filter(|d| d.excluded_count() == 0)
        .count();
    let negatives = disjunctions
        .iter()
        .map(|d| -(d.excluded_count() as i32))
        .collect();
    stager.finish(slot_count, negatives)
}

/// File a staged instance into `table`; returns its match-time metadata.
pub(crate) fn merge_row(table: &mut Table, staged: StagedInstance) -> Instance {
    for posting in staged.postings {
        table.insert(staged.slot_count, posting.key, posting.caveat, posting.entry);
    }
    Instance {
        external_id: staged.external_id,
        slot_count: staged.slot_count,
        negatives: staged.negatives,
    }
}
