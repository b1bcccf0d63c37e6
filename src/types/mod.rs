mod caveat;
mod criteria;
mod document;
mod error;
mod match_set;
mod predicate;
mod trace;
mod value;

pub use caveat::{Caveat, CaveatKind, ComparableVersion, Range, RegexCaveat, VersionCaveat, VersionCheck};
pub use criteria::{
    ClauseBuilder, Conjunction, Criteria, CriteriaBuilder, Disjunction, Form, FormKind,
};
pub use document::Document;
pub use error::{DocumentError, IndexError, ValidationError};
pub use match_set::{Match, MatchSet};
pub use predicate::{field, FieldPredicate, Predicate, PredicateKind};
pub use trace::{ClauseTrace, CriteriaTrace, PredicateTrace};
pub use value::{KeyValue, Value};
