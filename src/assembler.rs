use log::warn;

use crate::tokenizer::Token;
use crate::Row;

/// An assembled row before normalization, remembering which cells were quoted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub cells: Vec<String>,
    pub quoted: Vec<bool>,
}

impl Record {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).map(String::as_str)
    }

    pub fn is_quoted(&self, idx: usize) -> bool {
        self.quoted.get(idx).copied().unwrap_or(false)
    }
}

/// Recoverable anomalies found while normalizing rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A row had more fields than the established column count; extras were dropped.
    TruncatedRow {
        row: usize,
        fields: usize,
        columns: usize,
    },
}

/// Groups tokens into records and keeps track of the widest one.
#[derive(Debug, Default)]
pub struct RowAssembler {
    records: Vec<Record>,
    current: Record,
    max_fields: usize,
}

impl RowAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: Token) {
        self.current.cells.push(token.text);
        self.current.quoted.push(token.quoted);
        if token.row_end {
            let record = std::mem::take(&mut self.current);
            self.max_fields = self.max_fields.max(record.len());
            self.records.push(record);
        }
    }

    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) {
        for token in tokens {
            self.push(token);
        }
    }

    /// Widest row seen so far.
    pub fn max_fields(&self) -> usize {
        self.max_fields
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

/// Pads short records with empty cells and truncates long ones to `width`.
///
/// `skip` leading records (the header) are dropped. Row numbers in warnings are
/// zero-based positions in the input, header included.
pub fn normalize(records: Vec<Record>, skip: usize, width: usize) -> (Vec<Row>, Vec<Warning>) {
    let mut warnings = Vec::new();
    let rows = records
        .into_iter()
        .enumerate()
        .skip(skip)
        .map(|(row, record)| {
            let mut cells = record.cells;
            if cells.len() > width {
                warn!(
                    "row {row} has {} fields, truncating to {width} columns",
                    cells.len()
                );
                warnings.push(Warning::TruncatedRow {
                    row,
                    fields: cells.len(),
                    columns: width,
                });
                cells.truncate(width);
            } else {
                cells.resize(width, String::new());
            }
            cells
        })
        .collect();
    (rows, warnings)
}
