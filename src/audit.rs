//! Cross-checks between the index and direct evaluation.
//!
//! [`scan`] evaluates every stored criteria of a group against a document and
//! needs no posting lists. [`ratify`] runs both paths over a batch of documents
//! and reports every disagreement; [`sample_documents`] builds such a batch
//! from the literals the group's criteria mention.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::types::{Caveat, Document, IndexError, KeyValue, MatchSet, Value};
use crate::IndexGroup;

const SCORE_TOLERANCE: f64 = 1e-9;

/// Brute-force search: evaluate every criteria in `group` against `doc`.
pub fn scan(group: &IndexGroup, doc: &Document) -> MatchSet {
    let mut matches = MatchSet::new();
    for criteria in group.criteria() {
        if let Some(score) = crate::evaluate::criteria_score(&criteria, doc) {
            matches.insert_max(&Arc::from(criteria.id()), score);
        }
    }
    matches
}

/// How the index disagreed with a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MismatchKind {
    /// The scan matched a criteria the index missed.
    MissingFromIndex,
    /// The index returned a criteria the scan rejected.
    UnexpectedInIndex,
    ScoreDiffers { index: f64, scan: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    /// Position of the document in the ratified batch.
    pub document: usize,
    pub criteria_id: String,
    pub kind: MismatchKind,
}

/// Outcome of [`ratify`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RatificationReport {
    pub documents: usize,
    pub mismatches: Vec<Mismatch>,
}

impl RatificationReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Search every document through the index and through [`scan`], recording
/// each id on which they disagree.
///
/// Run it while the group is quiescent; a concurrent update can be observed
/// by one path and not the other.
///
/// # Errors
///
/// Returns [`IndexError::Inconsistent`] if an index search fails.
pub fn ratify(group: &IndexGroup, docs: &[Document]) -> Result<RatificationReport, IndexError> {
    let mut report = RatificationReport {
        documents: docs.len(),
        mismatches: Vec::new(),
    };
    for (position, doc) in docs.iter().enumerate() {
        let indexed = group.search(doc)?;
        let scanned = scan(group, doc);
        let ids: BTreeSet<&str> = indexed.ids().into_iter().chain(scanned.ids()).collect();
        for id in ids {
            let kind = match (indexed.score(id), scanned.score(id)) {
                (None, Some(_)) => MismatchKind::MissingFromIndex,
                (Some(_), None) => MismatchKind::UnexpectedInIndex,
                (Some(index), Some(scan)) if (index - scan).abs() > SCORE_TOLERANCE => {
                    MismatchKind::ScoreDiffers { index, scan }
                }
                _ => continue,
            };
            warn!(
                target: "boolmatch::audit",
                group = group.name(),
                document = position,
                criteria = id,
                ?kind,
                "index disagrees with scan"
            );
            report.mismatches.push(Mismatch {
                document: position,
                criteria_id: id.to_owned(),
                kind,
            });
        }
    }
    info!(
        target: "boolmatch::audit",
        group = group.name(),
        documents = report.documents,
        mismatches = report.mismatches.len(),
        "ratification finished"
    );
    Ok(report)
}

/// Up to `limit` documents built from the literals in `group`'s criteria.
///
/// The batch starts with the empty document, then one document per
/// (path, value) pair, then documents combining one value per path with some
/// paths left out. Values include equality literals, range bounds with their
/// neighbours and midpoints, version bases with a lower and a higher version,
/// and regex sources. Output is deterministic for a given group state.
#[must_use]
pub fn sample_documents(group: &IndexGroup, limit: usize) -> Vec<Document> {
    let mut literals: BTreeMap<String, BTreeSet<KeyValue>> = BTreeMap::new();
    for criteria in group.criteria() {
        for predicate in criteria.predicates() {
            let values = literals.entry(predicate.path().to_owned()).or_default();
            collect_literals(predicate.caveat(), values);
        }
    }
    let columns: Vec<(&str, Vec<Value>)> = literals
        .iter()
        .map(|(path, values)| (path.as_str(), values.iter().map(Value::from).collect()))
        .collect();

    let mut docs = vec![Document::new()];
    for (path, values) in &columns {
        for value in values {
            docs.push(Document::new().set(path, value.clone()));
        }
    }
    let widest = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
    for round in 0..widest {
        for skip in 0..=columns.len() {
            let mut doc = Document::new();
            for (column, (path, values)) in columns.iter().enumerate() {
                if column == skip || values.is_empty() {
                    continue;
                }
                doc.insert(path, values[(round + column) % values.len()].clone());
            }
            docs.push(doc);
        }
    }
    docs.truncate(limit);
    docs
}

fn collect_literals(caveat: &Caveat, out: &mut BTreeSet<KeyValue>) {
    match caveat {
        Caveat::Equality(values) => out.extend(values.iter().cloned()),
        Caveat::Regex(re) => {
            out.insert(KeyValue::Text(re.pattern().to_owned()));
        }
        Caveat::Range(range) => {
            let bounds: Vec<f64> = range.lo().into_iter().chain(range.hi()).collect();
            for &b in &bounds {
                for n in [b - 1.0, b, b + 1.0] {
                    out.insert(Value::Float(n).key_value());
                }
            }
            if let (Some(lo), Some(hi)) = (range.lo(), range.hi()) {
                out.insert(Value::Float(lo + (hi - lo) / 2.0).key_value());
            }
        }
        Caveat::Version(version) => {
            let base = version.base();
            out.insert(KeyValue::Text(base.to_owned()));
            out.insert(KeyValue::Text(format!("{base}.1")));
            out.insert(KeyValue::Text("0".to_owned()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field, Criteria, GroupConfig, Range};

    fn group() -> IndexGroup {
        let group = IndexGroup::with_config("audit", GroupConfig::default().with_compaction_threshold(0));
        group
            .add_criteria(
                Criteria::dnf("C1")
                    .clause(|c| {
                        c.with(field("country").is_in(["US", "CA"]).with_weight(2.0))
                            .with(field("age").in_range(Range::closed(18.0, 30.0)))
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();
        group
            .add_criteria(
                Criteria::cnf("C2")
                    .clause(|c| c.with(field("os").version_at_least("2.1")))
                    .clause(|c| c.with(field("country").not_in(["FR"])))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        group
            .add_criteria(
                Criteria::dnf("R")
                    .clause(|c| c.with(field("flag").eq(true).with_default(true)))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        group
    }

    #[test]
    fn scan_agrees_with_evaluate() {
        let group = group();
        let doc = Document::new().set("country", "US").set("age", 20_i64);
        let matches = scan(&group, &doc);
        assert_eq!(matches.score("C1"), Some(2.0));
        assert!(matches.contains("R"));
        assert!(!matches.contains("C2"));
    }

    #[test]
    fn samples_start_with_empty_document_and_respect_limit() {
        let group = group();
        let docs = sample_documents(&group, 5);
        assert_eq!(docs.len(), 5);
        assert!(docs[0].is_empty());
        assert!(sample_documents(&group, 0).is_empty());
    }

    #[test]
    fn samples_cover_range_neighbours_and_versions() {
        let group = group();
        let docs = sample_documents(&group, usize::MAX);
        let seen = |path: &str, v: Value| {
            docs.iter()
                .any(|d| d.get(path).is_some_and(|vals| vals.contains(&v)))
        };
        assert!(seen("age", Value::Int(17)));
        assert!(seen("age", Value::Int(31)));
        assert!(seen("age", Value::Int(24)));
        assert!(seen("os", Value::from("2.1.1")));
        assert!(seen("country", Value::from("FR")));
    }

    #[test]
    fn sampled_documents_ratify_cleanly() {
        let group = group();
        let docs = sample_documents(&group, 500);
        let report = ratify(&group, &docs).unwrap();
        assert_eq!(report.documents, docs.len());
        assert!(report.is_clean(), "{:?}", report.mismatches);
    }

    #[test]
    fn report_serializes() {
        let report = RatificationReport {
            documents: 1,
            mismatches: vec![Mismatch {
                document: 0,
                criteria_id: "C".to_owned(),
                kind: MismatchKind::ScoreDiffers { index: 1.0, scan: 2.0 },
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mismatches"][0]["criteria_id"], "C");
        assert_eq!(json["mismatches"][0]["kind"]["ScoreDiffers"]["scan"], 2.0);
        assert!(!report.is_clean());
    }
}
