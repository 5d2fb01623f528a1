use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::trace;

use crate::document::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Duration,
    Text,
}

/// Maps column names to the kind of value they hold. Unknown columns are text.
#[derive(Debug, Clone)]
pub struct ColumnKinds {
    kinds: HashMap<String, ColumnKind>,
}

impl Default for ColumnKinds {
    fn default() -> Self {
        ColumnKinds::empty()
            .with("Year Released", ColumnKind::Numeric)
            .with("BPM", ColumnKind::Numeric)
            .with("Count", ColumnKind::Numeric)
            .with("Duration", ColumnKind::Duration)
    }
}

impl ColumnKinds {
    pub fn empty() -> Self {
        ColumnKinds {
            kinds: HashMap::new(),
        }
    }

    pub fn with(mut self, column: impl Into<String>, kind: ColumnKind) -> Self {
        self.kinds.insert(column.into(), kind);
        self
    }

    pub fn kind_of(&self, column: &str) -> ColumnKind {
        self.kinds.get(column).copied().unwrap_or(ColumnKind::Text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Sort state of one sortable header.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderState {
    pub title: String,
    pub column: String,
    pub direction: Option<SortDirection>,
    pub active: bool,
}

impl HeaderState {
    pub fn new(title: impl Into<String>, column: impl Into<String>) -> Self {
        HeaderState {
            title: title.into(),
            column: column.into(),
            direction: None,
            active: false,
        }
    }
}

/// Makes `headers[idx]` the only active header and returns the direction to
/// sort with. The new direction flips the header's own last direction, which
/// counts as ascending when it has none.
pub fn activate_header(headers: &mut [HeaderState], idx: usize) -> SortDirection {
    let direction = headers[idx]
        .direction
        .unwrap_or(SortDirection::Ascending)
        .flipped();
    for (i, header) in headers.iter_mut().enumerate() {
        if i == idx {
            header.direction = Some(direction);
            header.active = true;
        } else {
            header.direction = None;
            header.active = false;
        }
    }
    direction
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Number(f64),
    Text(String),
}

impl SortValue {
    fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            // A column has one kind, so mixed values only show up if a caller mixes columns.
            (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
            (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
        }
    }
}

/// Extracts the comparable value of `column` from `row`.
pub fn sort_value(row: &Row, column: &str, kind: ColumnKind) -> SortValue {
    let text = row.cell(column).map(str::trim).unwrap_or("");
    match kind {
        ColumnKind::Duration => SortValue::Number(parse_duration(text) as f64),
        ColumnKind::Numeric => SortValue::Number(parse_float_prefix(text).unwrap_or(0.0)),
        ColumnKind::Text => SortValue::Text(text.to_lowercase()),
    }
}

/// Parses "minutes:seconds" into total seconds. Anything else is 0, and so
/// is a duration too long to count in seconds.
pub fn parse_duration(text: &str) -> i64 {
    let parts: Vec<&str> = text.split(':').collect();
    if let [minutes, seconds] = parts.as_slice()
        && let (Some(m), Some(s)) = (parse_int_prefix(minutes), parse_int_prefix(seconds))
    {
        return m.checked_mul(60).and_then(|v| v.checked_add(s)).unwrap_or(0);
    }
    0
}

// Leading integer of the text, ignoring surrounding garbage ("07 " -> 7, "3x" -> 3).
fn parse_int_prefix(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|v| sign * v)
}

/// Parses the longest leading decimal number of the text ("120bpm" -> 120).
/// Returns `None` when the text does not start with a number. NaN is `None`.
pub fn parse_float_prefix(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return None;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }
    text[..end].parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Sorts all rows by a single column. Equal values keep their relative order.
pub fn sort_by_column(rows: &mut [Row], column: &str, kind: ColumnKind, direction: SortDirection) {
    trace!("Sorting {} rows by {column:?} ({kind:?}, {direction:?})", rows.len());
    let mut keyed: Vec<(SortValue, Row)> = rows
        .iter_mut()
        .map(|row| (sort_value(row, column, kind), std::mem::take(row)))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| direction.apply(a.compare(b)));
    for (slot, (_, row)) in rows.iter_mut().zip(keyed) {
        *slot = row;
    }
}

/// Sorts ascending by the first column, falling back to the next column
/// whenever two rows compare equal.
pub fn sort_by_columns(rows: &mut [Row], columns: &[&str], kinds: &ColumnKinds) {
    trace!("Sorting {} rows by {columns:?}", rows.len());
    let mut keyed: Vec<(Vec<SortValue>, Row)> = rows
        .iter_mut()
        .map(|row| {
            let values = columns
                .iter()
                .map(|column| sort_value(row, column, kinds.kind_of(column)))
                .collect();
            (values, std::mem::take(row))
        })
        .collect();
    keyed.sort_by(|(a, _), (b, _)| {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| x.compare(y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    for (slot, (_, row)) in rows.iter_mut().zip(keyed) {
        *slot = row;
    }
}
