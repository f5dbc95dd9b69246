//! Range validation for raw operand argument values.

use std::fmt;

use itertools::Itertools;

/// One entry of a `validRange` list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEntry {
    /// Exact value, written `[v]`
    Exact(u16),
    /// Inclusive interval, written `[lo, hi]`
    Interval(u16, u16),
}

impl RangeEntry {
    pub fn contains(&self, value: i64) -> bool {
        match *self {
            RangeEntry::Exact(v) => value == v as i64,
            RangeEntry::Interval(lo, hi) => (lo as i64..=hi as i64).contains(&value),
        }
    }
}

impl fmt::Display for RangeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeEntry::Exact(v) => write!(f, "[{}]", v),
            RangeEntry::Interval(lo, hi) => write!(f, "[{}, {}]", lo, hi),
        }
    }
}

/// Declared set of permitted raw values for an operand argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRange {
    entries: Vec<RangeEntry>,
}

impl ValidRange {
    pub fn new(entries: Vec<RangeEntry>) -> Self {
        ValidRange { entries }
    }

    pub fn entries(&self) -> &[RangeEntry] {
        &self.entries
    }

    /// True when any entry matches
    pub fn contains(&self, value: i64) -> bool {
        self.entries.iter().any(|entry| entry.contains(value))
    }
}

impl fmt::Display for ValidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.entries.iter().join(", "))
    }
}

/// Check a raw value against an optional `validRange`.
///
/// An absent range accepts every value; the bit-width check happens at pack time.
pub fn validate(raw: i64, valid_range: Option<&ValidRange>) -> bool {
    valid_range.map_or(true, |range| range.contains(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_range_accepts_everything() {
        assert!(validate(0, None));
        assert!(validate(65535, None));
    }

    #[test]
    fn test_interval_is_inclusive() {
        let range = ValidRange::new(vec![RangeEntry::Interval(1, 10)]);
        assert!(!validate(0, Some(&range)));
        assert!(validate(1, Some(&range)));
        assert!(validate(10, Some(&range)));
        assert!(!validate(11, Some(&range)));
    }

    #[test]
    fn test_exact_values_are_or_combined() {
        let range = ValidRange::new(vec![
            RangeEntry::Exact(2),
            RangeEntry::Exact(3),
            RangeEntry::Exact(9),
        ]);
        assert!(validate(2, Some(&range)));
        assert!(validate(9, Some(&range)));
        assert!(!validate(4, Some(&range)));
    }

    #[test]
    fn test_mixed_entries() {
        let range = ValidRange::new(vec![RangeEntry::Interval(0, 3), RangeEntry::Exact(8)]);
        assert!(validate(3, Some(&range)));
        assert!(validate(8, Some(&range)));
        assert!(!validate(5, Some(&range)));
        assert!(!validate(-1, Some(&range)));
    }

    #[test]
    fn test_empty_range_rejects_everything() {
        let range = ValidRange::new(vec![]);
        assert!(!validate(0, Some(&range)));
    }

    #[test]
    fn test_display() {
        let range = ValidRange::new(vec![RangeEntry::Interval(1, 10), RangeEntry::Exact(12)]);
        assert_eq!(range.to_string(), "[[1, 10], [12]]");
    }
}
