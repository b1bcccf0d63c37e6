use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::types::{CaveatKind, KeyValue, PredicateKind};

/// Slot carried by sentinel entries; never a real predicate or disjunction ordinal.
pub(crate) const SENTINEL_SLOT: u32 = u32::MAX;

/// Normalized value half of a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum KeyToken {
    /// One member of an equality set.
    Value(KeyValue),
    /// A regex, range or version caveat, re-tested against document values.
    Caveat { kind: CaveatKind, text: String },
    /// Reserved key present in every query.
    Sentinel,
}

/// Address of one posting list.
///
/// Identity is `(path, token, occurrence)`. The occurrence separates repeated
/// `(path, token)` literals inside one instance so that each gets its own
/// stream during the merge.
#[derive(Debug, Clone)]
pub(crate) struct Key {
    pub(crate) path: Arc<str>,
    pub(crate) token: KeyToken,
    pub(crate) occurrence: u32,
}

impl Key {
    pub(crate) fn new(path: Arc<str>, token: KeyToken, occurrence: u32) -> Self {
        Self {
            path,
            token,
            occurrence,
        }
    }

    pub(crate) fn sentinel() -> Self {
        Self::new(Arc::from(""), KeyToken::Sentinel, 0)
    }

    pub(crate) fn is_sentinel(&self) -> bool {
        self.token == KeyToken::Sentinel
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.token == other.token && self.occurrence == other.occurrence
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
        self.token.hash(state);
        self.occurrence.hash(state);
    }
}

/// One predicate of one instance, filed under a key.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PostingEntry {
    pub(crate) internal_id: u64,
    pub(crate) external_id: Arc<str>,
    pub(crate) kind: PredicateKind,
    /// Predicate ordinal for DNF, disjunction ordinal for CNF.
    pub(crate) slot: u32,
    /// Predicate ordinal within the instance.
    pub(crate) ordinal: u32,
    pub(crate) weight: f64,
}

impl PostingEntry {
    /// Posting lists are sorted on this: exclusions surface first for an id.
    pub(crate) fn order_key(&self) -> (u64, PredicateKind, u32) {
        (self.internal_id, self.kind, self.slot)
    }

    pub(crate) fn sentinel(internal_id: u64, external_id: Arc<str>) -> Self {
        Self {
            internal_id,
            external_id,
            kind: PredicateKind::Included,
            slot: SENTINEL_SLOT,
            ordinal: SENTINEL_SLOT,
            weight: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn entry(id: u64, kind: PredicateKind, slot: u32) -> PostingEntry {
        PostingEntry {
            internal_id: id,
            external_id: Arc::from("C"),
            kind,
            slot,
            ordinal: slot,
            weight: 0.0,
        }
    }

    #[test]
    fn excluded_sorts_before_included_for_same_id() {
        let ex = entry(4, PredicateKind::Excluded, 9);
        let inc = entry(4, PredicateKind::Included, 0);
        assert!(ex.order_key() < inc.order_key());
        assert!(inc.order_key() < entry(5, PredicateKind::Excluded, 0).order_key());
    }

    #[test]
    fn key_identity_includes_occurrence() {
        let token = KeyToken::Value(KeyValue::Text("A".into()));
        let a = Key::new(Arc::from("a"), token.clone(), 0);
        let b = Key::new(Arc::from("a"), token.clone(), 1);
        let c = Key::new(Arc::from("a"), token, 0);
        let set: HashSet<Key> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn caveat_tokens_of_different_kinds_differ() {
        let re = KeyToken::Caveat {
            kind: CaveatKind::Regex,
            text: "1#2#true#false".into(),
        };
        let range = KeyToken::Caveat {
            kind: CaveatKind::Range,
            text: "1#2#true#false".into(),
        };
        assert_ne!(re, range);
        assert!(Key::sentinel().is_sentinel());
        assert!(!Key::new(Arc::from("n"), range, 0).is_sentinel());
    }
}
