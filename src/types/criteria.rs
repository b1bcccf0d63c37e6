use std::fmt;

use super::document::Document;
use super::error::ValidationError;
use super::predicate::{Predicate, PredicateKind};
use super::trace::CriteriaTrace;

/// Shape of a criteria's boolean formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum FormKind {
    /// OR of conjunctions.
    Dnf,
    /// AND of disjunctions.
    Cnf,
}

/// All predicates must hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Conjunction {
    predicates: Vec<Predicate>,
}

/// At least one predicate must hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Disjunction {
    predicates: Vec<Predicate>,
}

impl Conjunction {
    /// # Errors
    ///
    /// Returns [`ValidationError`] when `predicates` is empty or one is malformed.
    pub fn new(predicates: Vec<Predicate>) -> Result<Self, ValidationError> {
        validate_clause(&predicates, "", 0)?;
        Ok(Self { predicates })
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Number of included predicates: the slots an index instance must fill.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.predicates
            .iter()
            .filter(|p| p.kind() == PredicateKind::Included)
            .count()
    }

    #[must_use]
    pub fn evaluate(&self, doc: &Document) -> bool {
        crate::evaluate::conjunction_holds(self, doc)
    }

    #[must_use]
    pub fn score(&self, doc: &Document) -> f64 {
        crate::evaluate::conjunction_score(self, doc)
    }
}

impl Disjunction {
    /// # Errors
    ///
    /// Returns [`ValidationError`] when `predicates` is empty or one is malformed.
    pub fn new(predicates: Vec<Predicate>) -> Result<Self, ValidationError> {
        validate_clause(&predicates, "", 0)?;
        Ok(Self { predicates })
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Number of excluded predicates in this disjunction.
    #[must_use]
    pub fn excluded_count(&self) -> usize {
        self.predicates
            .iter()
            .filter(|p| p.kind() == PredicateKind::Excluded)
            .count()
    }

    #[must_use]
    pub fn evaluate(&self, doc: &Document) -> bool {
        crate::evaluate::disjunction_holds(self, doc)
    }

    #[must_use]
    pub fn score(&self, doc: &Document) -> f64 {
        crate::evaluate::disjunction_score(self, doc)
    }
}

/// The formula body of a [`Criteria`].
#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    Dnf(Vec<Conjunction>),
    Cnf(Vec<Disjunction>),
}

/// A boolean formula over field predicates, identified by a client-facing id that stays
/// stable across updates.
///
/// # Example
///
/// ```
/// use boolmatch::{field, Criteria, Document};
///
/// let criteria = Criteria::dnf("C1")
///     .clause(|c| c.with(field("a").is_in(["A1", "A2"])).with(field("b").not_in(["B1"])))
///     .build()
///     .unwrap();
///
/// let doc = Document::new().set("a", "A1").set("b", "B3");
/// assert!(criteria.evaluate(&doc));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    id: String,
    form: Form,
}

impl Criteria {
    /// Start building a DNF criteria: each clause is a conjunction.
    #[must_use]
    pub fn dnf(id: &str) -> CriteriaBuilder {
        CriteriaBuilder::new(id, FormKind::Dnf)
    }

    /// Start building a CNF criteria: each clause is a disjunction.
    #[must_use]
    pub fn cnf(id: &str) -> CriteriaBuilder {
        CriteriaBuilder::new(id, FormKind::Cnf)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn form(&self) -> &Form {
        &self.form
    }

    #[must_use]
    pub fn form_kind(&self) -> FormKind {
        match self.form {
            Form::Dnf(_) => FormKind::Dnf,
            Form::Cnf(_) => FormKind::Cnf,
        }
    }

    /// Every predicate, clause by clause.
    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        let clauses: Vec<&[Predicate]> = match &self.form {
            Form::Dnf(conjunctions) => conjunctions.iter().map(Conjunction::predicates).collect(),
            Form::Cnf(disjunctions) => disjunctions.iter().map(Disjunction::predicates).collect(),
        };
        clauses.into_iter().flatten()
    }

    /// Whether posting lists can represent every predicate's absent-field result.
    #[must_use]
    pub fn is_indexable(&self) -> bool {
        self.predicates().all(Predicate::has_natural_default)
    }

    /// Re-check every clause and predicate.
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyId);
        }
        let clauses: Vec<&[Predicate]> = match &self.form {
            Form::Dnf(c) => c.iter().map(Conjunction::predicates).collect(),
            Form::Cnf(d) => d.iter().map(Disjunction::predicates).collect(),
        };
        if clauses.is_empty() {
            return Err(ValidationError::EmptyCriteria {
                id: self.id.clone(),
            });
        }
        clauses
            .into_iter()
            .enumerate()
            .try_for_each(|(i, clause)| validate_clause(clause, &self.id, i))
    }

    /// Evaluate this criteria against a document by walking the formula.
    #[must_use]
    pub fn evaluate(&self, doc: &Document) -> bool {
        crate::evaluate::evaluate(self, doc)
    }

    /// Weighted score, or [`NO_MATCH`](crate::NO_MATCH) when the criteria is false.
    #[must_use]
    pub fn score(&self, doc: &Document) -> f64 {
        crate::evaluate::score(self, doc)
    }

    /// Per-predicate trace of an evaluation, for troubleshooting.
    pub fn debug(&self, doc: &Document) -> CriteriaTrace {
        crate::evaluate::trace(self, doc)
    }

    /// Parse DSL text and validate every criteria it defines.
    ///
    /// This is a convenience method combining [`parse`](crate::parse::parse)
    /// and [`ParsedCriteria::build()`](crate::parse::ParsedCriteria::build).
    ///
    /// # Errors
    ///
    /// Returns [`BoolmatchError`](crate::BoolmatchError) on parse or validation failure.
    pub fn from_dsl(input: &str) -> Result<Vec<Self>, crate::BoolmatchError> {
        crate::parse::parse(input)?
            .into_iter()
            .map(|parsed| parsed.build().map_err(crate::BoolmatchError::from))
            .collect()
    }

    /// Read a DSL file and validate every criteria it defines.
    ///
    /// # Errors
    ///
    /// Returns [`BoolmatchError`](crate::BoolmatchError) on I/O, parse, or validation failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Vec<Self>, crate::BoolmatchError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_dsl(&input)
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (keyword, inner, outer, clauses): (&str, &str, &str, Vec<&[Predicate]>) =
            match &self.form {
                Form::Dnf(c) => ("dnf", " and ", " or ", c.iter().map(|c| c.predicates()).collect()),
                Form::Cnf(d) => ("cnf", " or ", " and ", d.iter().map(|d| d.predicates()).collect()),
            };
        write!(f, "{keyword} \"{}\" {{ ", self.id)?;
        for (i, clause) in clauses.iter().enumerate() {
            if i > 0 {
                write!(f, "{outer}")?;
            }
            write!(f, "(")?;
            for (j, p) in clause.iter().enumerate() {
                if j > 0 {
                    write!(f, "{inner}")?;
                }
                write!(f, "{p}")?;
            }
            write!(f, ")")?;
        }
        write!(f, " }}")
    }
}

/// Builder for a [`Criteria`]. Each clause is defined by a closure.
#[derive(Debug)]
pub struct CriteriaBuilder {
    id: String,
    kind: FormKind,
    clauses: Vec<Vec<Predicate>>,
}

/// Intermediate builder passed to the clause definition closure.
#[derive(Debug, Default)]
pub struct ClauseBuilder {
    predicates: Vec<Predicate>,
}

impl ClauseBuilder {
    /// Add a predicate to this clause.
    #[must_use]
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }
}

impl CriteriaBuilder {
    fn new(id: &str, kind: FormKind) -> Self {
        Self {
            id: id.to_owned(),
            kind,
            clauses: Vec::new(),
        }
    }

    /// Define a clause: a conjunction for DNF criteria, a disjunction for CNF.
    #[must_use]
    pub fn clause(mut self, f: impl FnOnce(ClauseBuilder) -> ClauseBuilder) -> Self {
        let builder = f(ClauseBuilder::default());
        self.clauses.push(builder.predicates);
        self
    }

    /// Add an already assembled clause.
    #[must_use]
    pub fn clause_of(mut self, predicates: Vec<Predicate>) -> Self {
        self.clauses.push(predicates);
        self
    }

    /// Validate and produce the criteria.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for an empty id, no clauses, an empty
    /// clause, or a malformed predicate.
    pub fn build(self) -> Result<Criteria, ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.clauses.is_empty() {
            return Err(ValidationError::EmptyCriteria { id: self.id });
        }
        for (i, clause) in self.clauses.iter().enumerate() {
            validate_clause(clause, &self.id, i)?;
        }
        let form = match self.kind {
            FormKind::Dnf => Form::Dnf(
                self.clauses
                    .into_iter()
                    .map(|predicates| Conjunction { predicates })
                    .collect(),
            ),
            FormKind::Cnf => Form::Cnf(
                self.clauses
                    .into_iter()
                    .map(|predicates| Disjunction { predicates })
                    .collect(),
            ),
        };
        Ok(Criteria { id: self.id, form })
    }
}

fn validate_clause(predicates: &[Predicate], id: &str, clause: usize) -> Result<(), ValidationError> {
    if predicates.is_empty() {
        return Err(ValidationError::EmptyClause {
            id: id.to_owned(),
            clause,
        });
    }
    predicates.iter().try_for_each(Predicate::validate)
}
