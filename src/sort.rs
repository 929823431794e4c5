//! Sort keys and the record comparator.
//!
//! Values are coerced once per record into a [`SortKey`], then records are
//! ordered by index so the input slice is never touched.
//!
//! ## Ordering rules
//!
//! - Missing values (absent, blank or `"N/A"`) sort after every defined
//!   value, in both directions, and compare equal among themselves.
//! - Numbers compare numerically, text compares on its lower-cased form.
//! - The sort is stable: equal keys keep their original relative order.
//!
//! A `<x` bound on MFE or Kd is weighed as `x` itself. This understates the
//! true magnitude, so `"<5"` ties with `"5"` and only stability keeps them
//! apart.

use std::cmp::Ordering;
use std::fmt;

use crate::model::{Field, FieldKind, FieldRef, Record};

/// Key used for `>x` bounds whose number cannot be read.
pub const UPPER_BOUND_FALLBACK: f64 = 1e9;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub fn toggled(self) -> Direction {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ascending => write!(f, "asc"),
            Direction::Descending => write!(f, "desc"),
        }
    }
}

/// A comparable value extracted from one field.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Undefined,
    Number(f64),
    Text(String),
}

impl SortKey {
    pub fn is_undefined(&self) -> bool {
        matches!(self, SortKey::Undefined)
    }

    fn number(n: f64) -> SortKey {
        if n.is_nan() {
            SortKey::Undefined
        } else {
            SortKey::Number(n)
        }
    }
}

/// Parses the longest leading decimal number of `s`, after leading spaces.
///
/// Accepts an optional sign, digits, a fractional part and an exponent, so
/// `"-12.3 kcal/mol"` reads as -12.3. Returns `None` when no digit is found.
pub fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    // Exponent only counts when followed by at least one digit.
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse().ok()
}

/// Coerces a field value into a sort key according to its kind.
pub fn coerce(value: FieldRef<'_>, kind: FieldKind) -> SortKey {
    match (value, kind) {
        (FieldRef::Missing, _) => SortKey::Undefined,
        (FieldRef::Number(n), FieldKind::Text) => SortKey::Text(n.to_string()),
        (FieldRef::Number(n), _) => SortKey::number(n),
        (FieldRef::Text(t), FieldKind::Text) => SortKey::Text(t.to_lowercase()),
        (FieldRef::Text(t), FieldKind::PlainNumber) => match t.trim().parse::<f64>() {
            Ok(n) => SortKey::number(n),
            Err(_) => SortKey::Undefined,
        },
        (FieldRef::Text(t), FieldKind::BoundedNumber) => coerce_bounded(t),
    }
}

fn coerce_bounded(text: &str) -> SortKey {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix('<') {
        SortKey::number(parse_leading_float(rest).unwrap_or(0.0))
    } else if let Some(rest) = text.strip_prefix('>') {
        SortKey::number(parse_leading_float(rest).unwrap_or(UPPER_BOUND_FALLBACK))
    } else {
        parse_leading_float(text).map_or(SortKey::Undefined, SortKey::number)
    }
}

/// The sort key of one record for one field.
pub fn sort_key(record: &Record, field: Field) -> SortKey {
    coerce(record.get(field), field.kind())
}

/// Compares two keys. Undefined keys go last whatever the direction.
pub fn compare_keys(a: &SortKey, b: &SortKey, direction: Direction) -> Ordering {
    let ordering = match (a, b) {
        (SortKey::Undefined, SortKey::Undefined) => return Ordering::Equal,
        (SortKey::Undefined, _) => return Ordering::Greater,
        (_, SortKey::Undefined) => return Ordering::Less,
        (SortKey::Number(x), SortKey::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
        // A field has a single kind, so this only happens on malformed input.
        _ => Ordering::Equal,
    };
    match direction {
        Direction::Ascending => ordering,
        Direction::Descending => ordering.reverse(),
    }
}

/// Returns the record indices in sorted order.
///
/// With no field the natural (insertion) order is returned.
pub fn sorted_indices(records: &[Record], field: Option<Field>, direction: Direction) -> Vec<usize> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    let Some(field) = field else {
        return order;
    };
    let keys: Vec<SortKey> = records.iter().map(|r| sort_key(r, field)).collect();
    order.sort_by(|&a, &b| compare_keys(&keys[a], &keys[b], direction));
    order
}

/// Returns a sorted copy of `records`.
pub fn sort_records(records: &[Record], field: Option<Field>, direction: Direction) -> Vec<Record> {
    sorted_indices(records, field, direction)
        .into_iter()
        .map(|i| records[i].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kd(value: &str) -> Record {
        Record::new(format!("SEQ{}", value)).with(Field::Kd, value)
    }

    fn kds(records: &[Record]) -> Vec<String> {
        records.iter().map(|r| r.export_text(Field::Kd)).collect()
    }

    fn mixed() -> Vec<Record> {
        vec![
            Record::new("GGGA").with(Field::Tm, 61.0).with(Field::Mfe, "-3.1"),
            Record::new("aaac").with(Field::Tm, "N/A"),
            Record::new("CCUU").with(Field::Tm, "55.5").with(Field::Mfe, "-8 kcal/mol"),
            Record::new("Uuga"),
            Record::new("ACGU").with(Field::Tm, 70.0).with(Field::Mfe, ">0"),
        ]
    }

    #[test]
    fn test_parse_leading_float() {
        assert_eq!(parse_leading_float("-12.3 kcal/mol"), Some(-12.3));
        assert_eq!(parse_leading_float("  5"), Some(5.0));
        assert_eq!(parse_leading_float(".5x"), Some(0.5));
        assert_eq!(parse_leading_float("3."), Some(3.0));
        assert_eq!(parse_leading_float("1e3nM"), Some(1000.0));
        assert_eq!(parse_leading_float("2e"), Some(2.0));
        assert_eq!(parse_leading_float("abc"), None);
        assert_eq!(parse_leading_float("-"), None);
        assert_eq!(parse_leading_float(""), None);
    }

    #[test]
    fn test_coerce_bounded() {
        let kind = FieldKind::BoundedNumber;
        assert_eq!(coerce(FieldRef::Text("<5"), kind), SortKey::Number(5.0));
        assert_eq!(coerce(FieldRef::Text(">5"), kind), SortKey::Number(5.0));
        assert_eq!(coerce(FieldRef::Text(">abc"), kind), SortKey::Number(UPPER_BOUND_FALLBACK));
        assert_eq!(coerce(FieldRef::Text("<abc"), kind), SortKey::Number(0.0));
        assert_eq!(coerce(FieldRef::Text("garbage"), kind), SortKey::Undefined);
        assert_eq!(coerce(FieldRef::Missing, kind), SortKey::Undefined);
        assert_eq!(coerce(FieldRef::Number(-4.2), kind), SortKey::Number(-4.2));
    }

    #[test]
    fn test_coerce_plain_and_text() {
        assert_eq!(coerce(FieldRef::Text("42"), FieldKind::PlainNumber), SortKey::Number(42.0));
        assert_eq!(coerce(FieldRef::Text("42%"), FieldKind::PlainNumber), SortKey::Undefined);
        assert_eq!(coerce(FieldRef::Text("NaN"), FieldKind::PlainNumber), SortKey::Undefined);
        assert_eq!(coerce(FieldRef::Text("AuGc"), FieldKind::Text), SortKey::Text("augc".to_string()));
        assert_eq!(coerce(FieldRef::Number(3.0), FieldKind::Text), SortKey::Text("3".to_string()));
    }

    #[test]
    fn test_unsorted_keeps_insertion_order() {
        let records = mixed();
        assert_eq!(sort_records(&records, None, Direction::Descending), records);
    }

    #[test]
    fn test_kd_bounds_order() {
        // All three weigh 5, so the order is the stable input order.
        let records = vec![kd("<5"), kd("5"), kd(">5"), kd("2")];
        let sorted = sort_records(&records, Some(Field::Kd), Direction::Ascending);
        assert_eq!(kds(&sorted), vec!["2", "<5", "5", ">5"]);
        let sorted = sort_records(&records, Some(Field::Kd), Direction::Descending);
        assert_eq!(kds(&sorted), vec!["<5", "5", ">5", "2"]);
    }

    #[test]
    fn test_upper_bound_fallback_sorts_after_values() {
        let records = vec![kd(">?"), kd("1000"), kd("N/A"), kd("3")];
        let sorted = sort_records(&records, Some(Field::Kd), Direction::Ascending);
        assert_eq!(kds(&sorted), vec!["3", "1000", ">?", ""]);
    }

    #[test]
    fn test_undefined_last_in_both_directions() {
        let records = mixed();
        for field in Field::ALL {
            for direction in [Direction::Ascending, Direction::Descending] {
                let sorted = sort_records(&records, Some(field), direction);
                let first_undefined = sorted
                    .iter()
                    .position(|r| sort_key(r, field).is_undefined())
                    .unwrap_or(sorted.len());
                assert!(
                    sorted[first_undefined..]
                        .iter()
                        .all(|r| sort_key(r, field).is_undefined()),
                    "defined value after undefined for {} {}",
                    field,
                    direction
                );
            }
        }
    }

    #[test]
    fn test_descending_reverses_defined_values() {
        let records = mixed();
        for field in [Field::Tm, Field::Mfe, Field::Sequence] {
            let asc = sort_records(&records, Some(field), Direction::Ascending);
            let desc = sort_records(&records, Some(field), Direction::Descending);
            let defined = |rs: &[Record]| -> Vec<String> {
                rs.iter()
                    .filter(|r| !sort_key(r, field).is_undefined())
                    .map(|r| r.sequence.clone())
                    .collect()
            };
            let mut reversed = defined(&asc);
            reversed.reverse();
            assert_eq!(defined(&desc), reversed, "field {}", field);

            let undefined = |rs: &[Record]| -> Vec<String> {
                rs.iter()
                    .filter(|r| sort_key(r, field).is_undefined())
                    .map(|r| r.sequence.clone())
                    .collect()
            };
            assert_eq!(undefined(&asc), undefined(&desc));
        }
    }

    #[test]
    fn test_sort_is_idempotent() {
        let records = mixed();
        for direction in [Direction::Ascending, Direction::Descending] {
            let once = sort_records(&records, Some(Field::Tm), direction);
            let twice = sort_records(&once, Some(Field::Tm), direction);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_sequence_sort_is_case_insensitive() {
        let records = mixed();
        let sorted = sort_records(&records, Some(Field::Sequence), Direction::Ascending);
        let seqs: Vec<&str> = sorted.iter().map(|r| r.sequence.as_str()).collect();
        assert_eq!(seqs, vec!["aaac", "ACGU", "CCUU", "GGGA", "Uuga"]);
    }

    #[test]
    fn test_mfe_parses_units() {
        let records = mixed();
        let sorted = sort_records(&records, Some(Field::Mfe), Direction::Ascending);
        let seqs: Vec<&str> = sorted.iter().map(|r| r.sequence.as_str()).collect();
        assert_eq!(seqs, vec!["CCUU", "GGGA", "ACGU", "aaac", "Uuga"]);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let records = mixed();
        let before = records.clone();
        let _ = sort_records(&records, Some(Field::Tm), Direction::Descending);
        assert_eq!(records, before);
    }
}
