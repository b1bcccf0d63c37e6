use std::collections::BTreeSet;
use std::fmt;
use std::ops::Not;

use super::caveat::{Caveat, Range, RegexCaveat, VersionCaveat, VersionCheck};
use super::document::Document;
use super::error::ValidationError;
use super::value::{KeyValue, Value};

/// Whether a predicate asserts its caveat or its negation.
///
/// `Excluded` orders before `Included`: posting entries for the same instance
/// surface exclusions first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum PredicateKind {
    Excluded,
    Included,
}

/// Atomic test of one document field.
///
/// Built with [`field()`], e.g. `field("user.region").is_in(["eu", "us"])`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    kind: PredicateKind,
    path: String,
    caveat: Caveat,
    weight: f64,
    default_result: Option<bool>,
}

impl Predicate {
    #[must_use]
    pub fn new(kind: PredicateKind, path: &str, caveat: Caveat) -> Self {
        Self {
            kind,
            path: path.to_owned(),
            caveat,
            weight: 0.0,
            default_result: None,
        }
    }

    /// Weight contributed to the score when this (included) predicate holds.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Result used when the field is absent from the document.
    #[must_use]
    pub fn with_default(mut self, result: bool) -> Self {
        self.default_result = Some(result);
        self
    }

    #[must_use]
    pub fn kind(&self) -> PredicateKind {
        self.kind
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn caveat(&self) -> &Caveat {
        &self.caveat
    }

    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Result for an absent field: `false` for included predicates and `true`
    /// for excluded ones unless overridden.
    #[must_use]
    pub fn default_result(&self) -> bool {
        self.default_result.unwrap_or(self.natural_default())
    }

    fn natural_default(&self) -> bool {
        self.kind == PredicateKind::Excluded
    }

    /// Whether the absent-field result is the one posting lists can express.
    pub(crate) fn has_natural_default(&self) -> bool {
        self.default_result() == self.natural_default()
    }

    #[must_use]
    pub fn evaluate(&self, doc: &Document) -> bool {
        match doc.get(&self.path) {
            None => self.default_result(),
            Some(values) => {
                let hit = values.iter().any(|v| self.caveat.test(v));
                match self.kind {
                    PredicateKind::Included => hit,
                    PredicateKind::Excluded => !hit,
                }
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if self.path.is_empty() {
            return Err(ValidationError::EmptyPath);
        }
        if !self.weight.is_finite() {
            return Err(ValidationError::InvalidWeight {
                path: self.path.clone(),
            });
        }
        self.caveat.validate(&self.path)
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        let kind = match self.kind {
            PredicateKind::Included => PredicateKind::Excluded,
            PredicateKind::Excluded => PredicateKind::Included,
        };
        Predicate {
            kind,
            default_result: self.default_result.map(|d| !d),
            ..self
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PredicateKind::Included => write!(f, "{} {}", self.path, self.caveat)?,
            PredicateKind::Excluded => write!(f, "{} not {}", self.path, self.caveat)?,
        }
        if self.weight != 0.0 {
            write!(f, " weight {}", self.weight)?;
        }
        if let Some(d) = self.default_result {
            write!(f, " default {d}")?;
        }
        Ok(())
    }
}

/// Intermediate builder for predicates on one field.
/// Created by [`field()`]; requires a caveat method to produce a [`Predicate`].
#[derive(Debug, Clone)]
pub struct FieldPredicate {
    path: String,
}

impl FieldPredicate {
    /// Field value is one of `values`.
    #[must_use]
    pub fn is_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::new(PredicateKind::Included, &self.path, equality(values))
    }

    /// Field value is none of `values`.
    #[must_use]
    pub fn not_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Predicate {
        Predicate::new(PredicateKind::Excluded, &self.path, equality(values))
    }

    /// Field value equals `value`.
    #[must_use]
    pub fn eq(self, value: impl Into<Value>) -> Predicate {
        self.is_in([value])
    }

    /// Textual field value fully matches `pattern`.
    #[must_use]
    pub fn matches(self, pattern: &str) -> Predicate {
        Predicate::new(
            PredicateKind::Included,
            &self.path,
            Caveat::Regex(RegexCaveat::new(pattern)),
        )
    }

    /// Textual field value does not fully match `pattern`.
    #[must_use]
    pub fn not_matches(self, pattern: &str) -> Predicate {
        !self.matches(pattern)
    }

    /// Numeric field value lies within `range`.
    #[must_use]
    pub fn in_range(self, range: Range) -> Predicate {
        Predicate::new(PredicateKind::Included, &self.path, Caveat::Range(range))
    }

    /// Numeric field value lies outside `range`.
    #[must_use]
    pub fn not_in_range(self, range: Range) -> Predicate {
        !self.in_range(range)
    }

    /// Version is at or above `base`.
    #[must_use]
    pub fn version_at_least(self, base: &str) -> Predicate {
        self.version(VersionCheck::AtLeast, base, false)
    }

    /// Version is strictly above `base`.
    #[must_use]
    pub fn version_above(self, base: &str) -> Predicate {
        self.version(VersionCheck::AtLeast, base, true)
    }

    /// Version is at or below `base`.
    #[must_use]
    pub fn version_at_most(self, base: &str) -> Predicate {
        self.version(VersionCheck::AtMost, base, false)
    }

    /// Version is strictly below `base`.
    #[must_use]
    pub fn version_below(self, base: &str) -> Predicate {
        self.version(VersionCheck::AtMost, base, true)
    }

    #[must_use]
    pub fn version(self, check: VersionCheck, base: &str, exclude_base: bool) -> Predicate {
        Predicate::new(
            PredicateKind::Included,
            &self.path,
            Caveat::Version(VersionCaveat::new(check, base, exclude_base)),
        )
    }
}

fn equality<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Caveat {
    let set: BTreeSet<KeyValue> = values
        .into_iter()
        .map(|v| {
            let value: Value = v.into();
            KeyValue::from(value)
        })
        .collect();
    Caveat::Equality(set)
}

#[must_use]
pub fn field(path: &str) -> FieldPredicate {
    FieldPredicate {
        path: path.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_in_builds_included_equality() {
        let p = field("a").is_in(["A1", "A2"]);
        assert_eq!(p.kind(), PredicateKind::Included);
        assert_eq!(p.path(), "a");
        match p.caveat() {
            Caveat::Equality(values) => assert_eq!(values.len(), 2),
            other => panic!("expected Equality, got {other:?}"),
        }
    }

    #[test]
    fn absent_field_uses_default() {
        let doc = Document::new();
        assert!(!field("a").is_in(["A"]).evaluate(&doc));
        assert!(field("a").not_in(["A"]).evaluate(&doc));
        assert!(field("a").is_in(["A"]).with_default(true).evaluate(&doc));
    }

    #[test]
    fn excluded_fails_when_any_value_hits() {
        let doc = Document::new().push("b", "B3").push("b", "B1");
        assert!(!field("b").not_in(["B1", "B2"]).evaluate(&doc));
        assert!(field("b").is_in(["B1"]).evaluate(&doc));
    }

    #[test]
    fn negation_flips_kind_and_default() {
        let p = !field("a").is_in(["A"]).with_default(true);
        assert_eq!(p.kind(), PredicateKind::Excluded);
        assert!(!p.default_result());
        assert!(!p.has_natural_default());
        assert!(field("a").not_in(["A"]).has_natural_default());
    }

    #[test]
    fn type_mismatch_is_false_not_error() {
        let doc = Document::new().set("n", "7");
        assert!(!field("n").is_in([1_i64, 2, 3]).evaluate(&doc));
        assert!(!field("n").in_range(Range::closed(0.0, 10.0)).evaluate(&doc));
    }

    #[test]
    fn validation() {
        assert!(field("a").is_in(["x"]).validate().is_ok());
        assert!(matches!(
            field("").is_in(["x"]).validate(),
            Err(ValidationError::EmptyPath)
        ));
        assert!(matches!(
            field("a").is_in(Vec::<Value>::new()).validate(),
            Err(ValidationError::EmptyValueSet { .. })
        ));
        assert!(matches!(
            field("a").is_in(["x"]).with_weight(f64::INFINITY).validate(),
            Err(ValidationError::InvalidWeight { .. })
        ));
        assert!(matches!(
            field("a").version_at_least("").validate(),
            Err(ValidationError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn display_round_trips_dsl_shape() {
        let p = field("b").not_in(["B1"]).with_weight(2.0);
        assert_eq!(p.to_string(), "b not in [\"B1\"] weight 2");
        let p = field("v").version_at_least("1.2");
        assert_eq!(p.to_string(), "v version >= \"1.2\"");
    }
}
