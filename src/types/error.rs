use thiserror::Error;

/// A criteria that cannot be built: it never reaches an index.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("criteria id must not be empty")]
    EmptyId,

    #[error("criteria '{id}' has no clauses")]
    EmptyCriteria { id: String },

    #[error("clause {clause} of criteria '{id}' has no predicates")]
    EmptyClause { id: String, clause: usize },

    #[error("predicate path must not be empty")]
    EmptyPath,

    #[error("predicate on '{path}' has an empty value set")]
    EmptyValueSet { path: String },

    #[error("invalid pattern '{pattern}' on '{path}': {reason}")]
    InvalidPattern {
        path: String,
        pattern: String,
        reason: String,
    },

    #[error("invalid range on '{path}': {reason}")]
    InvalidRange { path: String, reason: String },

    #[error("invalid version base '{base}' on '{path}'")]
    InvalidVersion { path: String, base: String },

    #[error("weight on '{path}' must be finite")]
    InvalidWeight { path: String },
}

/// Failures raised by index groups and the registry.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index group '{name}' not found")]
    GroupNotFound { name: String },

    #[error("index group '{group}' is inconsistent at internal id {internal_id}: {reason}")]
    Inconsistent {
        group: String,
        internal_id: u64,
        reason: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Failures while turning JSON text into a [`Document`](super::Document).
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document root must be a JSON object")]
    NotAnObject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_clause_message() {
        let err = ValidationError::EmptyClause {
            id: "C1".into(),
            clause: 2,
        };
        assert_eq!(err.to_string(), "clause 2 of criteria 'C1' has no predicates");
    }

    #[test]
    fn empty_value_set_message() {
        let err = ValidationError::EmptyValueSet {
            path: "user.region".into(),
        };
        assert_eq!(
            err.to_string(),
            "predicate on 'user.region' has an empty value set"
        );
    }

    #[test]
    fn invalid_range_message() {
        let err = ValidationError::InvalidRange {
            path: "n".into(),
            reason: "lower bound 5 exceeds upper bound 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid range on 'n': lower bound 5 exceeds upper bound 1"
        );
    }

    #[test]
    fn group_not_found_message() {
        let err = IndexError::GroupNotFound {
            name: "ads".into(),
        };
        assert_eq!(err.to_string(), "index group 'ads' not found");
    }

    #[test]
    fn inconsistent_message() {
        let err = IndexError::Inconsistent {
            group: "ads".into(),
            internal_id: 7,
            reason: "live instance has no metadata".into(),
        };
        assert_eq!(
            err.to_string(),
            "index group 'ads' is inconsistent at internal id 7: live instance has no metadata"
        );
    }

    #[test]
    fn not_an_object_message() {
        assert_eq!(
            DocumentError::NotAnObject.to_string(),
            "document root must be a JSON object"
        );
    }
}
