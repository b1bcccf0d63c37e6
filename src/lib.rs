//! Match documents against large collections of boolean criteria.
//!
//! Criteria are DNF or CNF formulas over field predicates. An [`IndexGroup`]
//! compiles them into posting lists and answers [`IndexGroup::search`] with a
//! skip-merge over the lists a document touches, instead of evaluating every
//! criteria in turn.

pub mod audit;
mod error;
mod evaluate;
pub mod index;
pub mod parse;
mod types;

pub use error::BoolmatchError;
pub use evaluate::NO_MATCH;
pub use index::{GroupConfig, IndexGroup, IndexStats, Operation, Registry};
pub use types::{
    field, Caveat, CaveatKind, ClauseBuilder, ClauseTrace, ComparableVersion, Conjunction,
    Criteria, CriteriaBuilder, CriteriaTrace, Disjunction, Document, DocumentError, FieldPredicate,
    Form, FormKind, IndexError, KeyValue, Match, MatchSet, Predicate, PredicateKind,
    PredicateTrace, Range, RegexCaveat, ValidationError, Value, VersionCaveat, VersionCheck,
};
