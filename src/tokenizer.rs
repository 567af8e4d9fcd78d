use memchr::{memchr2, memchr3};

use crate::{CsvInferError, CsvResult, QuoteErrorKind};

/// How a literal `"` is written inside a quoted field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuoteEscape {
    /// `\"` is a literal quote. A backslash before anything else is kept as is.
    #[default]
    Backslash,
    /// `""` is a literal quote (RFC 4180 style). Backslashes are plain text.
    Doubled,
}

/// Tokenizer state carried between chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    FieldStart,
    InUnquotedField,
    InQuotedField,
    /// A backslash was read inside a quoted field; the next scalar decides.
    EscapeInQuotedField,
    QuoteSeenInQuotedField,
    /// A `\r` ended a row; a following `\n` belongs to the same terminator.
    RowBoundary,
    EndOfInput,
}

/// One field, and whether it ends its row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub quoted: bool,
    pub row_end: bool,
}

/// Incremental CSV tokenizer.
///
/// Text is fed in chunks of any size; the only state kept between calls is the
/// [`ParseState`], the partial field and the count of fields already emitted
/// for the current row. Token boundaries never depend on chunk boundaries.
///
/// Quote escaping follows [`QuoteEscape`]. A newline at the start of a row is
/// a blank line and produces no tokens, so an empty line in a single-column
/// file is skipped rather than read as one empty cell; write `""` to keep it.
#[derive(Debug)]
pub struct Tokenizer {
    separator: char,
    escape: QuoteEscape,
    state: ParseState,
    field: String,
    quoted: bool,
    fields_in_row: usize,
    line: u64,
    record: u64,
}

impl Tokenizer {
    pub fn new(separator: char, escape: QuoteEscape) -> Self {
        Self {
            separator,
            escape,
            state: ParseState::FieldStart,
            field: String::new(),
            quoted: false,
            fields_in_row: 0,
            line: 1,
            record: 0,
        }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Rows completed so far.
    pub fn records(&self) -> u64 {
        self.record
    }

    /// Consumes one chunk, appending every completed field to `out`.
    pub fn feed(&mut self, chunk: &str, out: &mut Vec<Token>) -> CsvResult<()> {
        let mut rest = chunk;
        while let Some(c) = rest.chars().next() {
            match self.state {
                ParseState::FieldStart => {
                    if c == '"' {
                        self.state = ParseState::InQuotedField;
                        self.quoted = true;
                    } else if c == self.separator {
                        self.emit(false, out);
                    } else if c == '\n' || c == '\r' {
                        // A newline before any field is a blank line.
                        if self.fields_in_row > 0 {
                            self.emit(true, out);
                        }
                        self.end_line(c);
                    } else {
                        self.state = ParseState::InUnquotedField;
                        continue;
                    }
                    rest = &rest[c.len_utf8()..];
                }
                ParseState::InUnquotedField => {
                    let end = self.find_unquoted_stop(rest);
                    self.field.push_str(&rest[..end]);
                    rest = &rest[end..];
                    let Some(stop) = rest.chars().next() else {
                        break;
                    };
                    if stop == self.separator {
                        self.emit(false, out);
                        self.state = ParseState::FieldStart;
                    } else {
                        self.emit(true, out);
                        self.end_line(stop);
                    }
                    rest = &rest[stop.len_utf8()..];
                }
                ParseState::InQuotedField => {
                    let end = self.find_quoted_stop(rest);
                    let literal = &rest[..end];
                    self.line += memchr::memchr_iter(b'\n', literal.as_bytes()).count() as u64;
                    self.field.push_str(literal);
                    rest = &rest[end..];
                    let Some(stop) = rest.chars().next() else {
                        break;
                    };
                    self.state = if stop == '"' {
                        ParseState::QuoteSeenInQuotedField
                    } else {
                        ParseState::EscapeInQuotedField
                    };
                    rest = &rest[stop.len_utf8()..];
                }
                ParseState::EscapeInQuotedField => {
                    self.state = ParseState::InQuotedField;
                    if c == '"' {
                        self.field.push('"');
                        rest = &rest[1..];
                    } else {
                        // Not an escape; the next scalar is read as ordinary quoted text.
                        self.field.push('\\');
                    }
                }
                ParseState::QuoteSeenInQuotedField => {
                    if c == self.separator {
                        self.emit(false, out);
                        self.state = ParseState::FieldStart;
                    } else if c == '\n' || c == '\r' {
                        self.emit(true, out);
                        self.end_line(c);
                    } else if c == '"' && self.escape == QuoteEscape::Doubled {
                        self.field.push('"');
                        self.state = ParseState::InQuotedField;
                    } else {
                        return Err(self.quote_error(QuoteErrorKind::UnexpectedChar(c)));
                    }
                    rest = &rest[c.len_utf8()..];
                }
                ParseState::RowBoundary => {
                    self.state = ParseState::FieldStart;
                    if c == '\n' {
                        rest = &rest[1..];
                    }
                }
                ParseState::EndOfInput => break,
            }
        }
        Ok(())
    }

    /// Signals end of input, flushing a final field or row that lacks a newline.
    pub fn finish(&mut self, out: &mut Vec<Token>) -> CsvResult<()> {
        match self.state {
            ParseState::InQuotedField | ParseState::EscapeInQuotedField => {
                return Err(self.quote_error(QuoteErrorKind::Unterminated));
            }
            ParseState::InUnquotedField | ParseState::QuoteSeenInQuotedField => {
                self.emit(true, out);
            }
            ParseState::FieldStart if self.fields_in_row > 0 => {
                self.emit(true, out);
            }
            ParseState::FieldStart | ParseState::RowBoundary | ParseState::EndOfInput => {}
        }
        self.state = ParseState::EndOfInput;
        Ok(())
    }

    /// Returns to the start-of-stream state, keeping the configuration.
    pub fn reset(&mut self) {
        *self = Self::new(self.separator, self.escape);
    }

    fn emit(&mut self, row_end: bool, out: &mut Vec<Token>) {
        out.push(Token {
            text: std::mem::take(&mut self.field),
            quoted: std::mem::replace(&mut self.quoted, false),
            row_end,
        });
        if row_end {
            self.fields_in_row = 0;
            self.record += 1;
        } else {
            self.fields_in_row += 1;
        }
    }

    fn end_line(&mut self, terminator: char) {
        self.line += 1;
        self.state = if terminator == '\r' {
            ParseState::RowBoundary
        } else {
            ParseState::FieldStart
        };
    }

    fn find_unquoted_stop(&self, text: &str) -> usize {
        if self.separator.is_ascii() {
            memchr3(self.separator as u8, b'\n', b'\r', text.as_bytes()).unwrap_or(text.len())
        } else {
            text.find(|c: char| c == self.separator || c == '\n' || c == '\r')
                .unwrap_or(text.len())
        }
    }

    fn find_quoted_stop(&self, text: &str) -> usize {
        let bytes = text.as_bytes();
        let found = match self.escape {
            QuoteEscape::Backslash => memchr2(b'"', b'\\', bytes),
            QuoteEscape::Doubled => memchr::memchr(b'"', bytes),
        };
        found.unwrap_or(text.len())
    }

    fn quote_error(&self, kind: QuoteErrorKind) -> CsvInferError {
        CsvInferError::MalformedQuote {
            line: self.line,
            record: self.record,
            kind,
        }
    }
}
