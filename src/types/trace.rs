use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::caveat::CaveatKind;
use super::criteria::FormKind;
use super::predicate::PredicateKind;
use super::value::Value;

/// Outcome of one predicate during a traced evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredicateTrace {
    pub path: String,
    pub kind: PredicateKind,
    pub caveat: CaveatKind,
    /// Human-readable predicate, in DSL syntax.
    pub description: String,
    /// Document values found at `path`; empty when the field is absent.
    pub actual: Vec<Value>,
    /// Whether the predicate fell back to its default result.
    pub defaulted: bool,
    pub result: bool,
}

/// Outcome of one conjunction or disjunction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClauseTrace {
    pub result: bool,
    pub score: f64,
    pub predicates: Vec<PredicateTrace>,
}

/// Detailed evaluation trace returned by [`Criteria::debug()`](super::Criteria::debug).
///
/// Contains the overall result and score, every clause and predicate
/// outcome, and the wall-clock duration of the evaluation.
#[derive(Debug, Clone, Serialize)]
#[must_use]
pub struct CriteriaTrace {
    id: String,
    form: FormKind,
    result: bool,
    score: f64,
    clauses: Vec<ClauseTrace>,
    duration: Duration,
}

impl CriteriaTrace {
    pub(crate) fn new(
        id: String,
        form: FormKind,
        result: bool,
        score: f64,
        clauses: Vec<ClauseTrace>,
        duration: Duration,
    ) -> Self {
        Self {
            id,
            form,
            result,
            score,
            clauses,
            duration,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn form(&self) -> FormKind {
        self.form
    }

    /// Same as [`Criteria::evaluate()`](super::Criteria::evaluate).
    #[must_use]
    pub fn result(&self) -> bool {
        self.result
    }

    /// Same as [`Criteria::score()`](super::Criteria::score).
    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    #[must_use]
    pub fn clauses(&self) -> &[ClauseTrace] {
        &self.clauses
    }

    /// Wall-clock duration of the evaluation.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for CriteriaTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {} (score {})", self.id, self.result, self.score)?;
        for (i, clause) in self.clauses.iter().enumerate() {
            write!(f, "\n  clause {i}: {} (score {})", clause.result, clause.score)?;
            for p in &clause.predicates {
                let actual: Vec<String> = p.actual.iter().map(ToString::to_string).collect();
                write!(f, "\n    {} -> {} [{}]", p.description, p.result, actual.join(", "))?;
                if p.defaulted {
                    write!(f, " (default)")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CriteriaTrace {
        CriteriaTrace::new(
            "C1".into(),
            FormKind::Dnf,
            true,
            10.0,
            vec![ClauseTrace {
                result: true,
                score: 10.0,
                predicates: vec![PredicateTrace {
                    path: "a".into(),
                    kind: PredicateKind::Included,
                    caveat: CaveatKind::Equality,
                    description: "a in [\"A\"] weight 10".into(),
                    actual: vec![Value::from("A")],
                    defaulted: false,
                    result: true,
                }],
            }],
            Duration::from_nanos(500),
        )
    }

    #[test]
    fn trace_accessors() {
        let trace = sample();
        assert_eq!(trace.id(), "C1");
        assert_eq!(trace.form(), FormKind::Dnf);
        assert!(trace.result());
        assert_eq!(trace.score(), 10.0);
        assert_eq!(trace.clauses().len(), 1);
        assert_eq!(trace.duration(), Duration::from_nanos(500));
    }

    #[test]
    fn trace_display() {
        let s = sample().to_string();
        assert!(s.contains("C1 = true (score 10)"));
        assert!(s.contains("a in [\"A\"] weight 10 -> true [\"A\"]"));
    }

    #[test]
    fn trace_serializes_to_json() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["id"], "C1");
        assert_eq!(json["clauses"][0]["predicates"][0]["actual"][0], "A");
        assert_eq!(json["form"], "Dnf");
    }
}
