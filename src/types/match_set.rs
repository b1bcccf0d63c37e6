use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// A matched criteria id with its score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[must_use]
pub struct Match {
    id: Arc<str>,
    score: f64,
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.score)
    }
}

impl Match {
    pub fn new(id: impl Into<Arc<str>>, score: f64) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }
}

/// The criteria a document satisfies, keyed by external id.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct MatchSet {
    scores: HashMap<Arc<str>, f64>,
}

impl MatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.scores.contains_key(id)
    }

    #[must_use]
    pub fn score(&self, id: &str) -> Option<f64> {
        self.scores.get(id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Matched ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.scores.keys().map(AsRef::as_ref).collect();
        ids.sort_unstable();
        ids
    }

    /// Record a match, keeping the higher score when the id is already present.
    /// Several conjunctions of one DNF criteria score as their maximum.
    pub(crate) fn insert_max(&mut self, id: &Arc<str>, score: f64) {
        self.scores
            .entry(Arc::clone(id))
            .and_modify(|s| {
                if score > *s {
                    *s = score;
                }
            })
            .or_insert(score);
    }

    /// Merge another set in; ids already present keep their score.
    pub(crate) fn merge(&mut self, other: MatchSet) {
        for (id, score) in other.scores {
            self.scores.entry(id).or_insert(score);
        }
    }

    /// All matches by descending score, ties broken by ascending id.
    #[must_use]
    pub fn ranked(&self) -> Vec<Match> {
        let mut ranked: Vec<Match> = self
            .scores
            .iter()
            .map(|(id, &score)| Match {
                id: Arc::clone(id),
                score,
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        ranked
    }

    /// The `n` best matches.
    #[must_use]
    pub fn top(&self, n: usize) -> Vec<Match> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }
}

impl fmt::Display for MatchSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.ids().join(", "))
    }
}
