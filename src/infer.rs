use std::fmt;

use log::debug;

use crate::assembler::Record;
use crate::tokenizer::{QuoteEscape, Token, Tokenizer};

/// Separators tried by [`DefaultSniffer`], in tie-break order.
pub const SEPARATOR_CANDIDATES: [char; 4] = [',', '\t', ';', '|'];

/// Inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ColumnType {
    Int,
    String,
}

impl ColumnType {
    /// Whether `value` is acceptable for this type.
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            ColumnType::Int => is_integer(value),
            ColumnType::String => true,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Int => f.write_str("int"),
            ColumnType::String => f.write_str("string"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

/// Schema inferred once per input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub separator: char,
    pub has_header_row: bool,
    pub columns: Vec<Column>,
}

impl Metadata {
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Whether a quoted value may still count as an integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypeStrictness {
    /// Quoting is ignored: `"2"` is an integer.
    #[default]
    Lenient,
    /// Any non-empty quoted value makes its column a string.
    QuotedIsString,
}

/// Optional `-` followed by one or more ASCII digits.
pub fn is_integer(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Infers a column type from `(value, quoted)` pairs. Empty values are skipped;
/// a column with no values at all is `Int`.
pub fn infer_column_type<'a>(
    values: impl IntoIterator<Item = (&'a str, bool)>,
    strictness: TypeStrictness,
) -> ColumnType {
    let all_int = values
        .into_iter()
        .filter(|(value, _)| !value.is_empty())
        .all(|(value, quoted)| {
            !(quoted && strictness == TypeStrictness::QuotedIsString) && is_integer(value)
        });
    if all_int {
        ColumnType::Int
    } else {
        ColumnType::String
    }
}

fn column_values(
    records: &[Record],
    idx: usize,
) -> impl Iterator<Item = (&str, bool)> + '_ {
    records
        .iter()
        .map(move |r| (r.get(idx).unwrap_or(""), r.is_quoted(idx)))
}

/// Replaceable separator and header heuristics.
pub trait Sniffer: Send + Sync + fmt::Debug {
    /// Picks a separator from a text sample. `complete` is false when the
    /// sample was cut from a longer stream and may end mid-row.
    fn detect_separator(&self, sample: &str, complete: bool, escape: QuoteEscape) -> char;

    /// Decides whether the first record names the columns.
    fn detect_header(&self, records: &[Record], strictness: TypeStrictness) -> bool;
}

/// Most-consistent-field-count separator detection and type-mismatch header detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSniffer;

#[derive(Debug)]
struct FieldCounts {
    separator: char,
    widest: usize,
    variance: f64,
}

impl DefaultSniffer {
    fn field_counts(
        sample: &str,
        complete: bool,
        separator: char,
        escape: QuoteEscape,
    ) -> Option<FieldCounts> {
        let mut tokenizer = Tokenizer::new(separator, escape);
        let mut tokens: Vec<Token> = Vec::new();
        tokenizer.feed(sample, &mut tokens).ok()?;
        if complete {
            tokenizer.finish(&mut tokens).ok()?;
        }

        let mut counts = Vec::new();
        let mut fields = 0usize;
        for token in &tokens {
            fields += 1;
            if token.row_end {
                counts.push(fields as f64);
                fields = 0;
            }
        }
        if counts.is_empty() {
            return None;
        }

        let n = counts.len() as f64;
        let mean = counts.iter().sum::<f64>() / n;
        let variance = counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
        let widest = counts.iter().fold(0.0f64, |acc, &c| acc.max(c)) as usize;
        Some(FieldCounts {
            separator,
            widest,
            variance,
        })
    }
}

impl Sniffer for DefaultSniffer {
    fn detect_separator(&self, sample: &str, complete: bool, escape: QuoteEscape) -> char {
        let mut best: Option<FieldCounts> = None;
        for candidate in SEPARATOR_CANDIDATES {
            let Some(counts) = Self::field_counts(sample, complete, candidate, escape) else {
                continue;
            };
            debug!(
                "separator {candidate:?}: widest row {}, variance {:.3}",
                counts.widest, counts.variance
            );
            // A separator that never splits a row carries no signal.
            if counts.widest < 2 {
                continue;
            }
            // Candidates are visited in preference order, so ties keep the earlier one.
            if best
                .as_ref()
                .map_or(true, |b| counts.variance < b.variance - f64::EPSILON)
            {
                best = Some(counts);
            }
        }
        best.map_or(SEPARATOR_CANDIDATES[0], |b| b.separator)
    }

    fn detect_header(&self, records: &[Record], strictness: TypeStrictness) -> bool {
        let Some((first, data)) = records.split_first() else {
            return false;
        };
        if data.is_empty() {
            return true;
        }

        let mut mismatches = 0usize;
        for (idx, cell) in first.cells.iter().enumerate() {
            let has_values = column_values(data, idx).any(|(v, _)| !v.is_empty());
            if !has_values || cell.is_empty() {
                continue;
            }
            let column_type = infer_column_type(column_values(data, idx), strictness);
            if column_type == ColumnType::String {
                continue;
            }
            if column_type.accepts(cell) {
                // One typed column agreeing with the first row makes it data.
                debug!("column {idx} accepts first-row value {cell:?}, no header");
                return false;
            }
            mismatches += 1;
        }

        // Without any typed column the first row is taken as a header.
        debug!("first row mismatches {mismatches} typed columns, header");
        true
    }
}

/// Positional name for a column without a usable header cell.
pub(crate) fn placeholder_name(idx: usize) -> String {
    format!("column_{idx}")
}

/// Builds metadata from sampled records. The column count is the widest sampled row.
pub(crate) fn build_metadata(
    sample: &[Record],
    separator: char,
    has_header_row: bool,
    strictness: TypeStrictness,
) -> Metadata {
    let width = sample.iter().map(Record::len).max().unwrap_or(0);
    let (header, data) = match sample.split_first() {
        Some((first, rest)) if has_header_row => (Some(first), rest),
        _ => (None, sample),
    };

    let columns = (0..width)
        .map(|idx| {
            let name = header
                .and_then(|h| h.get(idx))
                .filter(|name| !name.is_empty())
                .map_or_else(|| placeholder_name(idx), str::to_string);
            Column {
                name,
                column_type: infer_column_type(column_values(data, idx), strictness),
            }
        })
        .collect();

    Metadata {
        separator,
        has_header_row,
        columns,
    }
}
