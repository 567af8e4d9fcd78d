//! Streaming CSV tokenizing with schema inference.
//!
//! - Byte sources: in-memory slices, `std::io::Read`, any Tokio `AsyncRead`
//!   (local files, gzip/zstd), and memory-mapped files with feature `fast_local`.
//! - Output: `Metadata { separator, has_header_row, columns }` plus rows of
//!   string cells, every row padded to `columns.len()`.
//!
//! ```
//! use csv_infer::{ColumnType, CsvProcessor};
//!
//! let processor = CsvProcessor::new("a,b\n1,x\n2,y").unwrap();
//! let meta = processor.metadata();
//! assert_eq!(meta.separator, ',');
//! assert!(meta.has_header_row);
//! assert_eq!(meta.columns[0].column_type, ColumnType::Int);
//! assert_eq!(meta.columns[1].column_type, ColumnType::String);
//! assert_eq!(processor.read_all(), vec![vec!["1", "x"], vec!["2", "y"]]);
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
//
mod assembler;
mod codec;
mod infer;
mod io;
#[cfg(feature = "fast_local")]
mod mmap;
mod processor;
mod tokenizer;

pub use crate::assembler::{Record, RowAssembler, Warning};
pub use crate::codec::ScalarDecoder;
pub use crate::infer::{
    infer_column_type, is_integer, Column, ColumnType, DefaultSniffer, Metadata, Sniffer,
    TypeStrictness, SEPARATOR_CANDIDATES,
};
pub use crate::io::{build_csv_reader, reader_from_path, SourceMeta};
pub use crate::processor::{CsvProcessor, ProcessorOptions, DEFAULT_BUFFER_SIZE};
pub use crate::tokenizer::{ParseState, QuoteEscape, Token, Tokenizer};

use std::fmt;
use thiserror::Error;

/// A row of cells, in column order.
pub type Row = Vec<String>;

/// Why a quoted field could not be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteErrorKind {
    /// End of input inside a quoted field.
    Unterminated,
    /// A closing quote followed by something other than a separator or newline.
    UnexpectedChar(char),
}

impl fmt::Display for QuoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteErrorKind::Unterminated => f.write_str("quoted field never closes"),
            QuoteErrorKind::UnexpectedChar(c) => {
                write!(f, "unexpected {c:?} after closing quote")
            }
        }
    }
}

/// Error type returned by this crate when not using `anyhow`.
#[derive(Debug, Error)]
pub enum CsvInferError {
    #[error("invalid {encoding} byte sequence at offset {offset}")]
    Encoding {
        encoding: &'static str,
        offset: u64,
    },
    #[error("malformed quote on line {line} (record {record}): {kind}")]
    MalformedQuote {
        line: u64,
        record: u64,
        kind: QuoteErrorKind,
    },
    #[error("input contains no rows")]
    EmptyInput,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CsvResult<T> = std::result::Result<T, CsvInferError>;
