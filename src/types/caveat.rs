use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use regex::Regex;

use super::error::ValidationError;
use super::value::{KeyValue, Value};

/// The kind of test a predicate applies to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum CaveatKind {
    Equality,
    Regex,
    Range,
    Version,
}

/// The test a predicate applies to each value of its field.
#[derive(Debug, Clone, PartialEq)]
pub enum Caveat {
    /// Membership in a set of canonical values.
    Equality(BTreeSet<KeyValue>),
    /// Full match of a textual value against a pattern.
    Regex(RegexCaveat),
    /// Numeric bounds.
    Range(Range),
    /// Dotted-version comparison against a base version.
    Version(VersionCaveat),
}

impl Caveat {
    #[must_use]
    pub fn kind(&self) -> CaveatKind {
        match self {
            Caveat::Equality(_) => CaveatKind::Equality,
            Caveat::Regex(_) => CaveatKind::Regex,
            Caveat::Range(_) => CaveatKind::Range,
            Caveat::Version(_) => CaveatKind::Version,
        }
    }

    /// Whether a single document value satisfies this caveat.
    /// Type mismatches are `false`, never errors.
    #[must_use]
    pub fn test(&self, value: &Value) -> bool {
        match self {
            Caveat::Equality(values) => values.contains(&value.key_value()),
            Caveat::Regex(re) => re.test(value),
            Caveat::Range(range) => range.test(value),
            Caveat::Version(version) => version.test(value),
        }
    }

    /// Normalized single token for caveats that are not value sets.
    pub(crate) fn token(&self) -> Option<String> {
        match self {
            Caveat::Equality(_) => None,
            Caveat::Regex(re) => Some(re.source.clone()),
            Caveat::Range(range) => Some(range.token()),
            Caveat::Version(version) => Some(version.token()),
        }
    }

    pub(crate) fn validate(&self, path: &str) -> Result<(), ValidationError> {
        match self {
            Caveat::Equality(values) if values.is_empty() => Err(ValidationError::EmptyValueSet {
                path: path.to_owned(),
            }),
            Caveat::Equality(_) => Ok(()),
            Caveat::Regex(re) => match &re.compiled {
                Ok(_) => Ok(()),
                Err(e) => Err(ValidationError::InvalidPattern {
                    path: path.to_owned(),
                    pattern: re.source.clone(),
                    reason: e.to_string(),
                }),
            },
            Caveat::Range(range) => range.validate(path),
            Caveat::Version(version) => match version.parsed {
                Some(_) => Ok(()),
                None => Err(ValidationError::InvalidVersion {
                    path: path.to_owned(),
                    base: version.base.clone(),
                }),
            },
        }
    }
}

impl fmt::Display for Caveat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caveat::Equality(values) => {
                write!(f, "in [")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Caveat::Regex(re) => write!(f, "matches \"{}\"", re.source),
            Caveat::Range(range) => write!(f, "in range {range}"),
            Caveat::Version(version) => write!(f, "{version}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Regex
// ---------------------------------------------------------------------------

/// A pattern anchored at both ends. Invalid patterns are kept so that
/// validation can report them with the offending path.
#[derive(Debug, Clone)]
pub struct RegexCaveat {
    source: String,
    compiled: Result<Regex, regex::Error>,
}

impl RegexCaveat {
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        Self {
            source: pattern.to_owned(),
            compiled: Regex::new(&format!("^(?:{pattern})$")),
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.source
    }

    fn test(&self, value: &Value) -> bool {
        match (&self.compiled, value) {
            (Ok(re), Value::String(s)) => re.is_match(s),
            _ => false,
        }
    }
}

impl PartialEq for RegexCaveat {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

/// Numeric interval; `None` bounds are unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    lo: Option<f64>,
    hi: Option<f64>,
    lo_inclusive: bool,
    hi_inclusive: bool,
}

impl Range {
    #[must_use]
    pub fn new(lo: Option<f64>, hi: Option<f64>, lo_inclusive: bool, hi_inclusive: bool) -> Self {
        Self {
            lo,
            hi,
            lo_inclusive,
            hi_inclusive,
        }
    }

    /// `[lo, hi]`
    #[must_use]
    pub fn closed(lo: f64, hi: f64) -> Self {
        Self::new(Some(lo), Some(hi), true, true)
    }

    /// `[lo, hi)`
    #[must_use]
    pub fn half_open(lo: f64, hi: f64) -> Self {
        Self::new(Some(lo), Some(hi), true, false)
    }

    /// `[lo, +inf)`
    #[must_use]
    pub fn at_least(lo: f64) -> Self {
        Self::new(Some(lo), None, true, false)
    }

    /// `(-inf, hi)`
    #[must_use]
    pub fn below(hi: f64) -> Self {
        Self::new(None, Some(hi), false, false)
    }

    #[must_use]
    pub fn lo(&self) -> Option<f64> {
        self.lo
    }

    #[must_use]
    pub fn hi(&self) -> Option<f64> {
        self.hi
    }

    #[must_use]
    pub fn contains(&self, n: f64) -> bool {
        if n.is_nan() {
            return false;
        }
        let above_lo = match self.lo {
            None => true,
            Some(lo) if self.lo_inclusive => n >= lo,
            Some(lo) => n > lo,
        };
        let below_hi = match self.hi {
            None => true,
            Some(hi) if self.hi_inclusive => n <= hi,
            Some(hi) => n < hi,
        };
        above_lo && below_hi
    }

    fn test(&self, value: &Value) -> bool {
        value.as_f64().is_some_and(|n| self.contains(n))
    }

    /// `lo#hi#inclLo#inclHi`, with empty fields for unbounded ends.
    fn token(&self) -> String {
        let bound = |b: Option<f64>| b.map(|v| v.to_string()).unwrap_or_default();
        format!(
            "{}#{}#{}#{}",
            bound(self.lo),
            bound(self.hi),
            self.lo_inclusive,
            self.hi_inclusive
        )
    }

    fn validate(&self, path: &str) -> Result<(), ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidRange {
            path: path.to_owned(),
            reason,
        };
        if self.lo.is_some_and(f64::is_nan) || self.hi.is_some_and(f64::is_nan) {
            return Err(invalid("bounds must be numbers".to_owned()));
        }
        if let (Some(lo), Some(hi)) = (self.lo, self.hi) {
            if lo > hi {
                return Err(invalid(format!("lower bound {lo} exceeds upper bound {hi}")));
            }
            if lo == hi && !(self.lo_inclusive && self.hi_inclusive) {
                return Err(invalid(format!("range around {lo} is empty")));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.lo_inclusive { '[' } else { '(' };
        let close = if self.hi_inclusive { ']' } else { ')' };
        let bound = |b: Option<f64>| b.map_or_else(|| "*".to_owned(), |v| v.to_string());
        write!(f, "{open}{}, {}{close}", bound(self.lo), bound(self.hi))
    }
}

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// Direction of a version comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionCheck {
    /// Actual version is above the base.
    AtLeast,
    /// Actual version is below the base.
    AtMost,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VersionCaveat {
    check: VersionCheck,
    base: String,
    exclude_base: bool,
    parsed: Option<ComparableVersion>,
}

impl VersionCaveat {
    #[must_use]
    pub fn new(check: VersionCheck, base: &str, exclude_base: bool) -> Self {
        Self {
            check,
            base: base.to_owned(),
            exclude_base,
            parsed: ComparableVersion::parse(base),
        }
    }

    #[must_use]
    pub fn check(&self) -> VersionCheck {
        self.check
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    #[must_use]
    pub fn exclude_base(&self) -> bool {
        self.exclude_base
    }

    fn test(&self, value: &Value) -> bool {
        let Some(base) = &self.parsed else {
            return false;
        };
        let actual = match value {
            Value::String(s) => ComparableVersion::parse(s),
            Value::Int(_) | Value::Float(_) => ComparableVersion::parse(&value.to_string()),
            Value::Bool(_) => None,
        };
        let Some(actual) = actual else {
            return false;
        };
        match (actual.cmp(base), self.check) {
            (Ordering::Equal, _) => !self.exclude_base,
            (Ordering::Greater, VersionCheck::AtLeast) | (Ordering::Less, VersionCheck::AtMost) => {
                true
            }
            _ => false,
        }
    }

    fn token(&self) -> String {
        let check = match self.check {
            VersionCheck::AtLeast => "ge",
            VersionCheck::AtMost => "le",
        };
        format!("{check}#{}#{}", self.base, self.exclude_base)
    }
}

impl fmt::Display for VersionCaveat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match (self.check, self.exclude_base) {
            (VersionCheck::AtLeast, false) => ">=",
            (VersionCheck::AtLeast, true) => ">",
            (VersionCheck::AtMost, false) => "<=",
            (VersionCheck::AtMost, true) => "<",
        };
        write!(f, "version {op} \"{}\"", self.base)
    }
}

/// A dotted version such as `1.10.2-beta`.
///
/// Release segments compare numerically when both are numbers, textual
/// segments sort before numeric ones, and trailing zeros are ignored
/// (`1.2 == 1.2.0`). A qualifier after the first `-` makes a version sort
/// before the same release without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparableVersion {
    release: Vec<Segment>,
    qualifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    Text(String),
    Num(u64),
}

impl ComparableVersion {
    /// Parse a version string. Returns `None` for blank input.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let input = input.strip_prefix(['v', 'V']).unwrap_or(input);
        if input.is_empty() {
            return None;
        }
        let (release, qualifier) = match input.split_once('-') {
            Some((r, q)) if !q.is_empty() => (r, Some(q.to_ascii_lowercase())),
            Some((r, _)) => (r, None),
            None => (input, None),
        };
        let mut segments: Vec<Segment> = release
            .split('.')
            .map(|s| match s.parse::<u64>() {
                Ok(n) => Segment::Num(n),
                Err(_) if s.is_empty() => Segment::Num(0),
                Err(_) => Segment::Text(s.to_ascii_lowercase()),
            })
            .collect();
        while segments.last() == Some(&Segment::Num(0)) {
            segments.pop();
        }
        Some(Self {
            release: segments,
            qualifier,
        })
    }
}

impl Ord for ComparableVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release
            .cmp(&other.release)
            .then_with(|| match (&self.qualifier, &other.qualifier) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for ComparableVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ComparableVersion {
        ComparableVersion::parse(s).unwrap()
    }

    #[test]
    fn equality_membership_is_type_strict() {
        let caveat = Caveat::Equality([1_i64, 2, 3].map(|n| Value::Int(n).key_value()).into());
        assert!(caveat.test(&Value::Int(2)));
        assert!(caveat.test(&Value::Float(2.0)));
        assert!(!caveat.test(&Value::from("2")));
    }

    #[test]
    fn regex_requires_full_match_on_text() {
        let caveat = Caveat::Regex(RegexCaveat::new("ab+"));
        assert!(caveat.test(&Value::from("abbb")));
        assert!(!caveat.test(&Value::from("xabb")));
        assert!(!caveat.test(&Value::Int(1)));
    }

    #[test]
    fn half_open_range_boundaries() {
        let caveat = Caveat::Range(Range::half_open(10.0, 20.0));
        assert!(caveat.test(&Value::Int(10)));
        assert!(caveat.test(&Value::Float(19.999)));
        assert!(!caveat.test(&Value::Int(20)));
        assert!(!caveat.test(&Value::from("15")));
    }

    #[test]
    fn unbounded_range() {
        assert!(Range::at_least(5.0).contains(1e12));
        assert!(!Range::at_least(5.0).contains(4.0));
        assert!(Range::below(0.0).contains(-3.0));
        assert!(!Range::below(0.0).contains(0.0));
        assert!(!Range::at_least(0.0).contains(f64::NAN));
    }

    #[test]
    fn range_token_format() {
        assert_eq!(Range::half_open(10.0, 20.5).token(), "10#20.5#true#false");
        assert_eq!(Range::at_least(1.0).token(), "1##true#false");
    }

    #[test]
    fn range_validation() {
        assert!(Range::closed(1.0, 1.0).validate("n").is_ok());
        assert!(Range::half_open(1.0, 1.0).validate("n").is_err());
        assert!(Range::closed(2.0, 1.0).validate("n").is_err());
        assert!(Range::closed(f64::NAN, 1.0).validate("n").is_err());
    }

    #[test]
    fn version_ordering() {
        assert!(v("1.10") > v("1.9"));
        assert_eq!(v("1.2"), v("1.2.0"));
        assert!(v("1.2.1") > v("1.2"));
        assert!(v("1.2-beta") < v("1.2"));
        assert!(v("1.2-alpha") < v("1.2-beta"));
        assert!(v("1.rc") < v("1.0.1"));
        assert_eq!(v("v2.0"), v("2"));
        assert!(ComparableVersion::parse("  ").is_none());
    }

    #[test]
    fn version_caveat_checks() {
        let at_least = Caveat::Version(VersionCaveat::new(VersionCheck::AtLeast, "1.2", false));
        assert!(at_least.test(&Value::from("1.2")));
        assert!(at_least.test(&Value::from("1.3.0")));
        assert!(!at_least.test(&Value::from("1.1.9")));
        assert!(at_least.test(&Value::Float(1.5)));
        assert!(!at_least.test(&Value::Bool(true)));

        let below = Caveat::Version(VersionCaveat::new(VersionCheck::AtMost, "2.0", true));
        assert!(below.test(&Value::from("1.9.9")));
        assert!(!below.test(&Value::from("2.0.0")));
        assert!(!below.test(&Value::from("2.1")));
    }

    #[test]
    fn invalid_regex_fails_validation() {
        let caveat = Caveat::Regex(RegexCaveat::new("(unclosed"));
        assert!(matches!(
            caveat.validate("name"),
            Err(ValidationError::InvalidPattern { .. })
        ));
        assert!(!caveat.test(&Value::from("(unclosed")));
    }

    #[test]
    fn display_forms() {
        assert_eq!(Range::half_open(10.0, 20.0).to_string(), "[10, 20)");
        assert_eq!(
            Caveat::Version(VersionCaveat::new(VersionCheck::AtMost, "3", true)).to_string(),
            "version < \"3\""
        );
        let eq = Caveat::Equality([Value::from("a").key_value()].into());
        assert_eq!(eq.to_string(), "in [\"a\"]");
    }
}
