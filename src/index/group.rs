use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::types::{Criteria, Document, Form, FormKind, IndexError, Match, MatchSet};
use crate::BoolmatchError;

use super::sub_index::SubIndex;
use super::{GroupConfig, IndexStats, Operation};

/// Where a criteria lives inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Dnf,
    Cnf,
    /// Evaluated by tree walk on every search.
    Residual,
}

impl Target {
    fn of(criteria: &Criteria) -> Self {
        if !criteria.is_indexable() {
            return Target::Residual;
        }
        match criteria.form() {
            Form::Dnf(_) => Target::Dnf,
            Form::Cnf(_) => Target::Cnf,
        }
    }
}

#[derive(Debug, Clone)]
struct Placement {
    target: Target,
    criteria: Arc<Criteria>,
}

/// A named, independently searchable collection of criteria.
///
/// Mutations of one criteria id are serialized; searches never block on the
/// staging work of a mutation, only on the short critical section that files
/// its posting entries.
///
/// # Example
///
/// ```
/// use boolmatch::{field, Criteria, Document, IndexGroup};
///
/// let group = IndexGroup::new("ads");
/// group
///     .add_criteria(
///         Criteria::dnf("C1")
///             .clause(|c| c.with(field("a").is_in(["A1"])).with(field("b").not_in(["B1"])))
///             .build()
///             .unwrap(),
///     )
///     .unwrap();
///
/// let hits = group.search(&Document::new().set("a", "A1")).unwrap();
/// assert!(hits.contains("C1"));
/// ```
pub struct IndexGroup {
    name: Arc<str>,
    config: GroupConfig,
    dnf: SubIndex,
    cnf: SubIndex,
    residual: RwLock<HashMap<Arc<str>, Arc<Criteria>>>,
    placements: DashMap<Arc<str>, Placement>,
}

impl fmt::Debug for IndexGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexGroup")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("criteria", &self.placements.len())
            .finish_non_exhaustive()
    }
}

impl IndexGroup {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::with_config(name, GroupConfig::default())
    }

    #[must_use]
    pub fn with_config(name: &str, config: GroupConfig) -> Self {
        let name: Arc<str> = Arc::from(name);
        let threshold = config.compaction_threshold();
        Self {
            dnf: SubIndex::new(Arc::clone(&name), FormKind::Dnf, threshold),
            cnf: SubIndex::new(Arc::clone(&name), FormKind::Cnf, threshold),
            name,
            config,
            residual: RwLock::new(HashMap::new()),
            placements: DashMap::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Apply `op` to `criteria`.
    ///
    /// Add and Update both publish a new version: adding an id whose stored
    /// criteria is identical is a no-op, adding one with different content
    /// replaces it, and updating an unknown id adds it. Delete uses only the id.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Validation`] for a malformed criteria; the index
    /// is left untouched.
    pub fn index(&self, criteria: Criteria, op: Operation) -> Result<(), IndexError> {
        if op == Operation::Delete {
            self.delete_criteria(criteria.id());
            return Ok(());
        }
        criteria.validate()?;
        let id: Arc<str> = Arc::from(criteria.id());
        let target = Target::of(&criteria);
        let criteria = Arc::new(criteria);

        // The entry guard serializes mutations of this id until the placement is written.
        let entry = self.placements.entry(Arc::clone(&id));
        let previous = match &entry {
            Entry::Occupied(o) if o.get().criteria == criteria => {
                debug!(target: "boolmatch::index", group = %self.name, id = %id, ?op, "criteria unchanged");
                return Ok(());
            }
            Entry::Occupied(o) => Some(o.get().target),
            Entry::Vacant(_) => None,
        };

        self.publish(target, &id, &criteria);
        if let Some(previous) = previous.filter(|p| *p != target) {
            self.retire(previous, &id);
        }
        debug!(
            target: "boolmatch::index",
            group = %self.name,
            id = %id,
            ?op,
            placement = ?target,
            replaced = previous.is_some(),
            "criteria indexed"
        );

        let placement = Placement { target, criteria };
        match entry {
            Entry::Occupied(mut o) => {
                o.insert(placement);
            }
            Entry::Vacant(v) => {
                v.insert(placement);
            }
        }
        Ok(())
    }

    /// Add a criteria. See [`index`](Self::index).
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Validation`] for a malformed criteria.
    pub fn add_criteria(&self, criteria: Criteria) -> Result<(), IndexError> {
        self.index(criteria, Operation::Add)
    }

    /// Replace the criteria stored under `criteria.id()`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Validation`] for a malformed criteria.
    pub fn update_criteria(&self, criteria: Criteria) -> Result<(), IndexError> {
        self.index(criteria, Operation::Update)
    }

    /// Remove a criteria. Returns `false` when the id was not registered.
    pub fn delete_criteria(&self, id: &str) -> bool {
        match self.placements.entry(Arc::from(id)) {
            Entry::Occupied(o) => {
                self.retire(o.get().target, id);
                o.remove();
                debug!(target: "boolmatch::index", group = %self.name, id, "criteria deleted");
                true
            }
            Entry::Vacant(_) => {
                debug!(target: "boolmatch::index", group = %self.name, id, "delete of unknown criteria ignored");
                false
            }
        }
    }

    fn publish(&self, target: Target, id: &Arc<str>, criteria: &Arc<Criteria>) {
        match target {
            Target::Dnf => {
                self.dnf.publish(criteria);
            }
            Target::Cnf => {
                self.cnf.publish(criteria);
            }
            Target::Residual => {
                self.residual
                    .write()
                    .insert(Arc::clone(id), Arc::clone(criteria));
            }
        }
    }

    fn retire(&self, target: Target, id: &str) {
        match target {
            Target::Dnf => {
                self.dnf.retire(id);
            }
            Target::Cnf => {
                self.cnf.retire(id);
            }
            Target::Residual => {
                self.residual.write().remove(id);
            }
        }
    }

    /// Every criteria `doc` satisfies, with its score.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Inconsistent`] if a live internal id has lost its
    /// instance metadata.
    pub fn search(&self, doc: &Document) -> Result<MatchSet, IndexError> {
        let (dnf, cnf) = if self.config.parallel_search() {
            rayon::join(|| self.dnf.search(doc), || self.cnf.search(doc))
        } else {
            (self.dnf.search(doc), self.cnf.search(doc))
        };
        let mut matches = dnf?;
        matches.merge(cnf?);

        let residual = self.residual.read();
        for (id, criteria) in residual.iter() {
            if let Some(score) = crate::evaluate::criteria_score(criteria, doc) {
                matches.insert_max(id, score);
            }
        }
        Ok(matches)
    }

    /// The `n` best-scoring matches, ties broken by ascending id.
    ///
    /// # Errors
    ///
    /// Same as [`search`](Self::search).
    pub fn search_top(&self, doc: &Document, n: usize) -> Result<Vec<Match>, IndexError> {
        Ok(self.search(doc)?.top(n))
    }

    /// The criteria currently stored under `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<Criteria>> {
        self.placements.get(id).map(|p| Arc::clone(&p.criteria))
    }

    /// Every stored criteria, by ascending id.
    #[must_use]
    pub fn criteria(&self) -> Vec<Arc<Criteria>> {
        let mut all: Vec<Arc<Criteria>> = self
            .placements
            .iter()
            .map(|p| Arc::clone(&p.criteria))
            .collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Drop posting entries of ids that are no longer live. Returns the
    /// number of entries removed.
    pub fn compact(&self) -> usize {
        self.dnf.compact() + self.cnf.compact()
    }

    pub fn stats(&self) -> IndexStats {
        let dnf = self.dnf.stats();
        let cnf = self.cnf.stats();
        IndexStats {
            criteria: self.placements.len(),
            residual: self.residual.read().len(),
            live_instances: dnf.live_instances + cnf.live_instances,
            stale_instances: dnf.stale_instances + cnf.stale_instances,
            posting_entries: dnf.posting_entries + cnf.posting_entries,
            rows: dnf.rows + cnf.rows,
        }
    }

    /// Parse criteria DSL and add every criteria it defines. Returns how
    /// many were loaded.
    ///
    /// # Errors
    ///
    /// Returns [`BoolmatchError`] on a parse or validation failure. Criteria
    /// are added only once the whole input is valid.
    pub fn load_dsl(&self, input: &str) -> Result<usize, BoolmatchError> {
        let all = Criteria::from_dsl(input)?;
        let count = all.len();
        for criteria in all {
            self.add_criteria(criteria)?;
        }
        Ok(count)
    }

    /// Read a criteria DSL file and add its criteria.
    ///
    /// # Errors
    ///
    /// Returns [`BoolmatchError`] on I/O, parse, or validation failure.
    pub fn load_file(&self, path: impl AsRef<std::path::Path>) -> Result<usize, BoolmatchError> {
        let input = std::fs::read_to_string(path)?;
        self.load_dsl(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;

    fn simple(id: &str, value: &str) -> Criteria {
        Criteria::dnf(id)
            .clause(|c| c.with(field("a").eq(value)))
            .build()
            .unwrap()
    }

    #[test]
    fn identical_add_is_noop() {
        let group = IndexGroup::new("g");
        group.add_criteria(simple("C", "x")).unwrap();
        group.add_criteria(simple("C", "x")).unwrap();
        assert_eq!(group.stats().live_instances, 1);
        assert_eq!(group.stats().stale_instances, 0);
    }

    #[test]
    fn add_with_new_content_replaces() {
        let group = IndexGroup::new("g");
        group.add_criteria(simple("C", "x")).unwrap();
        group.add_criteria(simple("C", "y")).unwrap();
        assert!(group.search(&Document::new().set("a", "x")).unwrap().is_empty());
        assert!(group.search(&Document::new().set("a", "y")).unwrap().contains("C"));
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn form_change_moves_between_sub_indexes() {
        let group = IndexGroup::new("g");
        group.add_criteria(simple("C", "x")).unwrap();
        let cnf = Criteria::cnf("C")
            .clause(|c| c.with(field("b").eq("z")))
            .build()
            .unwrap();
        group.update_criteria(cnf).unwrap();
        assert!(group.search(&Document::new().set("a", "x")).unwrap().is_empty());
        assert!(group.search(&Document::new().set("b", "z")).unwrap().contains("C"));
    }

    #[test]
    fn overridden_default_goes_residual() {
        let group = IndexGroup::new("g");
        let c = Criteria::dnf("R")
            .clause(|c| c.with(field("a").is_in(["x"]).with_default(true)))
            .build()
            .unwrap();
        group.add_criteria(c).unwrap();
        assert_eq!(group.stats().residual, 1);
        assert!(group.search(&Document::new()).unwrap().contains("R"));
        assert!(!group.search(&Document::new().set("a", "y")).unwrap().contains("R"));
        assert!(group.delete_criteria("R"));
        assert_eq!(group.stats().residual, 0);
    }

    #[test]
    fn delete_unknown_is_false() {
        let group = IndexGroup::new("g");
        assert!(!group.delete_criteria("missing"));
        group
            .index(simple("missing", "x"), Operation::Delete)
            .unwrap();
        assert!(group.is_empty());
    }

    #[test]
    fn parallel_search_matches_sequential() {
        let group = IndexGroup::with_config("g", GroupConfig::default().with_parallel_search(true));
        group.add_criteria(simple("D", "x")).unwrap();
        group
            .add_criteria(
                Criteria::cnf("C")
                    .clause(|c| c.with(field("a").eq("x")))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let hits = group.search(&Document::new().set("a", "x")).unwrap();
        assert_eq!(hits.ids(), ["C", "D"]);
    }

    #[test]
    fn get_and_listing() {
        let group = IndexGroup::new("g");
        group.add_criteria(simple("b", "x")).unwrap();
        group.add_criteria(simple("a", "x")).unwrap();
        assert_eq!(group.get("a").map(|c| c.id().to_owned()), Some("a".to_owned()));
        let ids: Vec<String> = group.criteria().iter().map(|c| c.id().to_owned()).collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
