use std::time::Instant;

use crate::types::{
    ClauseTrace, Conjunction, Criteria, CriteriaTrace, Disjunction, Document, Form, Predicate,
    PredicateKind, PredicateTrace,
};

/// Score reported for a criteria (or clause) that does not hold.
pub const NO_MATCH: f64 = -1.0;

pub(crate) fn evaluate(criteria: &Criteria, doc: &Document) -> bool {
    match criteria.form() {
        Form::Dnf(conjunctions) => conjunctions.iter().any(|c| conjunction_holds(c, doc)),
        Form::Cnf(disjunctions) => disjunctions.iter().all(|d| disjunction_holds(d, doc)),
    }
}

pub(crate) fn score(criteria: &Criteria, doc: &Document) -> f64 {
    criteria_score(criteria, doc).unwrap_or(NO_MATCH)
}

/// `None` is the no-match sentinel; it short-circuits CNF summation.
pub(crate) fn criteria_score(criteria: &Criteria, doc: &Document) -> Option<f64> {
    match criteria.form() {
        Form::Dnf(conjunctions) => conjunctions
            .iter()
            .filter_map(|c| conjunction_score_opt(c, doc))
            .reduce(f64::max),
        Form::Cnf(disjunctions) => disjunctions
            .iter()
            .map(|d| disjunction_score_opt(d, doc))
            .sum(),
    }
}

pub(crate) fn conjunction_holds(conjunction: &Conjunction, doc: &Document) -> bool {
    conjunction.predicates().iter().all(|p| p.evaluate(doc))
}

pub(crate) fn disjunction_holds(disjunction: &Disjunction, doc: &Document) -> bool {
    disjunction.predicates().iter().any(|p| p.evaluate(doc))
}

pub(crate) fn conjunction_score(conjunction: &Conjunction, doc: &Document) -> f64 {
    conjunction_score_opt(conjunction, doc).unwrap_or(NO_MATCH)
}

pub(crate) fn disjunction_score(disjunction: &Disjunction, doc: &Document) -> f64 {
    disjunction_score_opt(disjunction, doc).unwrap_or(NO_MATCH)
}

/// Sum of included weights; every included predicate holds when the conjunction does.
fn conjunction_score_opt(conjunction: &Conjunction, doc: &Document) -> Option<f64> {
    if !conjunction_holds(conjunction, doc) {
        return None;
    }
    Some(
        conjunction
            .predicates()
            .iter()
            .filter(|p| p.kind() == PredicateKind::Included)
            .map(Predicate::weight)
            .sum(),
    )
}

/// Max weight among included predicates that hold; 0 when only an exclusion holds.
fn disjunction_score_opt(disjunction: &Disjunction, doc: &Document) -> Option<f64> {
    let mut holds = false;
    let mut best: Option<f64> = None;
    for p in disjunction.predicates() {
        if !p.evaluate(doc) {
            continue;
        }
        holds = true;
        if p.kind() == PredicateKind::Included {
            best = Some(best.map_or(p.weight(), |b| b.max(p.weight())));
        }
    }
    holds.then(|| best.unwrap_or(0.0))
}

pub(crate) fn trace(criteria: &Criteria, doc: &Document) -> CriteriaTrace {
    let start = Instant::now();
    let clauses: Vec<ClauseTrace> = match criteria.form() {
        Form::Dnf(conjunctions) => conjunctions
            .iter()
            .map(|c| ClauseTrace {
                result: conjunction_holds(c, doc),
                score: conjunction_score(c, doc),
                predicates: c.predicates().iter().map(|p| trace_predicate(p, doc)).collect(),
            })
            .collect(),
        Form::Cnf(disjunctions) => disjunctions
            .iter()
            .map(|d| ClauseTrace {
                result: disjunction_holds(d, doc),
                score: disjunction_score(d, doc),
                predicates: d.predicates().iter().map(|p| trace_predicate(p, doc)).collect(),
            })
            .collect(),
    };
    let result = evaluate(criteria, doc);
    let score = score(criteria, doc);
    CriteriaTrace::new(
        criteria.id().to_owned(),
        criteria.form_kind(),
        result,
        score,
        clauses,
        start.elapsed(),
    )
}

fn trace_predicate(predicate: &Predicate, doc: &Document) -> PredicateTrace {
    let actual = doc.get(predicate.path()).map(<[_]>::to_vec).unwrap_or_default();
    PredicateTrace {
        path: predicate.path().to_owned(),
        kind: predicate.kind(),
        caveat: predicate.caveat().kind(),
        description: predicate.to_string(),
        defaulted: actual.is_empty(),
        actual,
        result: predicate.evaluate(doc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field, Range};

    fn weighted(id: &str, n: usize) -> Criteria {
        Criteria::dnf(id)
            .clause_of(
                (0..n)
                    .map(|i| field(&format!("f{i}")).eq(1_i64).with_weight(10.0))
                    .collect(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn dnf_any_conjunction() {
        let c = Criteria::dnf("C")
            .clause(|c| c.with(field("a").eq("x")))
            .clause(|c| c.with(field("b").eq("y")))
            .build()
            .unwrap();
        assert!(c.evaluate(&Document::new().set("b", "y")));
        assert!(!c.evaluate(&Document::new().set("b", "z")));
    }

    #[test]
    fn cnf_negated_disjunct_rescues() {
        let c = Criteria::cnf("C1")
            .clause(|c| c.with(field("a").is_in(["A1", "A2"])).with(field("b").not_in(["B1", "B2"])))
            .build()
            .unwrap();
        assert!(!c.evaluate(&Document::new().set("a", "A4").set("b", "B1")));
        assert!(c.evaluate(&Document::new().set("a", "A4").set("b", "B3")));
    }

    #[test]
    fn fully_matched_weighted_conjunction_scores_sum() {
        let doc = Document::new()
            .set("f0", 1_i64)
            .set("f1", 1_i64)
            .set("f2", 1_i64);
        assert_eq!(weighted("C", 3).score(&doc), 30.0);
        assert_eq!(weighted("C", 4).score(&doc), NO_MATCH);
    }

    #[test]
    fn dnf_score_is_max_of_conjunctions() {
        let c = Criteria::dnf("C")
            .clause(|c| c.with(field("a").eq(1_i64).with_weight(3.0)))
            .clause(|c| {
                c.with(field("a").eq(1_i64).with_weight(4.0))
                    .with(field("b").eq(1_i64).with_weight(4.0))
            })
            .build()
            .unwrap();
        let doc = Document::new().set("a", 1_i64).set("b", 1_i64);
        assert_eq!(c.score(&doc), 8.0);
        assert_eq!(c.score(&Document::new().set("a", 1_i64)), 3.0);
    }

    #[test]
    fn cnf_score_sums_disjunction_maxima_and_propagates_no_match() {
        let c = Criteria::cnf("C")
            .clause(|c| {
                c.with(field("a").eq(1_i64).with_weight(2.0))
                    .with(field("b").eq(1_i64).with_weight(5.0))
            })
            .clause(|c| c.with(field("x").not_in(["bad"]).with_weight(100.0)))
            .build()
            .unwrap();
        let doc = Document::new().set("a", 1_i64).set("b", 1_i64);
        assert_eq!(c.score(&doc), 5.0);
        assert_eq!(c.score(&doc.clone().set("x", "bad")), NO_MATCH);
    }

    #[test]
    fn range_boundary_through_criteria() {
        let c = Criteria::dnf("R")
            .clause(|c| c.with(field("n").in_range(Range::half_open(10.0, 20.0))))
            .build()
            .unwrap();
        assert!(c.evaluate(&Document::new().set("n", 10_i64)));
        assert!(!c.evaluate(&Document::new().set("n", 20_i64)));
        assert!(!c.evaluate(&Document::new().set("n", "15")));
    }

    #[test]
    fn trace_reports_actual_values_and_defaults() {
        let c = Criteria::dnf("C")
            .clause(|c| c.with(field("a").eq("x")).with(field("b").not_in(["y"])))
            .build()
            .unwrap();
        let trace = c.debug(&Document::new().set("a", "x"));
        assert!(trace.result());
        let preds = &trace.clauses()[0].predicates;
        assert_eq!(preds[0].actual, vec![crate::Value::from("x")]);
        assert!(!preds[0].defaulted);
        assert!(preds[1].defaulted);
        assert!(preds[1].result);
    }
}
