use crate::{Criteria, FormKind, Predicate, ValidationError};

/// One criteria definition as written in DSL input, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCriteria {
    pub id: String,
    pub form: FormKind,
    /// Conjunctions for DNF, disjunctions for CNF.
    pub clauses: Vec<Vec<Predicate>>,
}

impl ParsedCriteria {
    /// Validate into a [`Criteria`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for an empty id or a malformed predicate,
    /// such as an invalid pattern or an inverted range.
    pub fn build(self) -> Result<Criteria, ValidationError> {
        let builder = match self.form {
            FormKind::Dnf => Criteria::dnf(&self.id),
            FormKind::Cnf => Criteria::cnf(&self.id),
        };
        self.clauses
            .into_iter()
            .fold(builder, |b, clause| b.clause_of(clause))
            .build()
    }
}
