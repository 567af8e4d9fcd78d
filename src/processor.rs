use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;

use bytes::BytesMut;
use futures::TryStreamExt;
use log::debug;
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, FramedRead};

use crate::assembler::{normalize, Record, RowAssembler, Warning};
use crate::codec::ScalarDecoder;
use crate::infer::{build_metadata, DefaultSniffer, Metadata, Sniffer, TypeStrictness};
use crate::io::reader_from_path;
use crate::tokenizer::{QuoteEscape, Token, Tokenizer};
use crate::{CsvInferError, CsvResult, Row};

/// Bytes read from the source per refill.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Tuning and overrides for [`CsvProcessor`].
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Refill granularity in bytes. Never changes the parsed result.
    pub buffer_size: usize,
    pub charset: &'static encoding_rs::Encoding,
    /// Skip separator sniffing.
    pub separator: Option<char>,
    /// Skip header detection.
    pub has_header: Option<bool>,
    pub quote_escape: QuoteEscape,
    pub strictness: TypeStrictness,
    /// Complete lines collected before sniffing the separator.
    pub sniff_lines: usize,
    /// Rows (header included) used for header and type inference; `None` means all.
    pub infer_rows: Option<usize>,
    pub sniffer: Arc<dyn Sniffer>,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            charset: encoding_rs::UTF_8,
            separator: None,
            has_header: None,
            quote_escape: QuoteEscape::default(),
            strictness: TypeStrictness::default(),
            sniff_lines: 32,
            infer_rows: None,
            sniffer: Arc::new(DefaultSniffer),
        }
    }
}

impl ProcessorOptions {
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn with_charset(mut self, charset: &'static encoding_rs::Encoding) -> Self {
        self.charset = charset;
        self
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = Some(separator);
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    pub fn with_quote_escape(mut self, quote_escape: QuoteEscape) -> Self {
        self.quote_escape = quote_escape;
        self
    }

    pub fn with_strictness(mut self, strictness: TypeStrictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn with_sniff_lines(mut self, sniff_lines: usize) -> Self {
        self.sniff_lines = sniff_lines.max(1);
        self
    }

    pub fn with_infer_rows(mut self, infer_rows: usize) -> Self {
        self.infer_rows = Some(infer_rows.max(1));
        self
    }

    pub fn with_sniffer(mut self, sniffer: impl Sniffer + 'static) -> Self {
        self.sniffer = Arc::new(sniffer);
        self
    }
}

/// Feeds decoded text into the tokenizer, holding back a sample until the
/// separator is known.
struct Ingest<'a> {
    options: &'a ProcessorOptions,
    sample: String,
    sample_lines: usize,
    tokenizer: Option<Tokenizer>,
    tokens: Vec<Token>,
    assembler: RowAssembler,
}

impl<'a> Ingest<'a> {
    fn new(options: &'a ProcessorOptions) -> Self {
        let tokenizer = options
            .separator
            .map(|separator| Tokenizer::new(separator, options.quote_escape));
        Self {
            options,
            sample: String::new(),
            sample_lines: 0,
            tokenizer,
            tokens: Vec::new(),
            assembler: RowAssembler::new(),
        }
    }

    fn push(&mut self, text: &str) -> CsvResult<()> {
        if let Some(tokenizer) = self.tokenizer.as_mut() {
            tokenizer.feed(text, &mut self.tokens)?;
            self.assembler.extend(self.tokens.drain(..));
            return Ok(());
        }

        self.sample.push_str(text);
        self.sample_lines += memchr::memchr_iter(b'\n', text.as_bytes()).count();
        if self.sample_lines >= self.options.sniff_lines {
            let tokenizer = self.sniff(false)?;
            self.tokenizer = Some(tokenizer);
        }
        Ok(())
    }

    /// Sniffs the separator from the held-back sample and replays the sample
    /// through a fresh tokenizer.
    fn sniff(&mut self, complete: bool) -> CsvResult<Tokenizer> {
        let separator = self.options.sniffer.detect_separator(
            &self.sample,
            complete,
            self.options.quote_escape,
        );
        debug!(
            "sniffed separator {separator:?} from {} lines",
            self.sample_lines
        );
        let sample = std::mem::take(&mut self.sample);
        let mut tokenizer = Tokenizer::new(separator, self.options.quote_escape);
        tokenizer.feed(&sample, &mut self.tokens)?;
        self.assembler.extend(self.tokens.drain(..));
        Ok(tokenizer)
    }

    fn finish(mut self) -> CsvResult<(char, Vec<Record>)> {
        let mut tokenizer = match self.tokenizer.take() {
            Some(tokenizer) => tokenizer,
            None => self.sniff(true)?,
        };
        tokenizer.finish(&mut self.tokens)?;
        self.assembler.extend(self.tokens.drain(..));
        debug!(
            "tokenized {} rows, widest has {} fields",
            tokenizer.records(),
            self.assembler.max_fields()
        );
        Ok((tokenizer.separator(), self.assembler.into_records()))
    }
}

/// Parses a whole input once, infers its [`Metadata`] and caches its rows.
///
/// Rows are held in memory after construction, so reading them never needs
/// to rewind the byte source.
#[derive(Debug)]
pub struct CsvProcessor {
    metadata: Metadata,
    rows: Vec<Row>,
    warnings: Vec<Warning>,
}

impl CsvProcessor {
    pub fn new(contents: impl AsRef<[u8]>) -> CsvResult<Self> {
        Self::with_options(contents, ProcessorOptions::default())
    }

    pub fn with_options(contents: impl AsRef<[u8]>, options: ProcessorOptions) -> CsvResult<Self> {
        Self::from_reader(contents.as_ref(), options)
    }

    /// Reads a blocking source `buffer_size` bytes at a time.
    pub fn from_reader<R: Read>(mut reader: R, options: ProcessorOptions) -> CsvResult<Self> {
        let mut decoder = ScalarDecoder::new(options.charset);
        let mut ingest = Ingest::new(&options);
        let mut chunk = vec![0u8; options.buffer_size.max(1)];
        let mut buf = BytesMut::with_capacity(chunk.len());

        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            buf.extend_from_slice(&chunk[..n]);
            while let Some(text) = decoder.decode(&mut buf)? {
                ingest.push(&text)?;
            }
        }
        while let Some(text) = decoder.decode_eof(&mut buf)? {
            ingest.push(&text)?;
        }

        let (separator, records) = ingest.finish()?;
        Self::from_records(separator, records, &options)
    }

    /// Reads any Tokio source, e.g. one returned by [`crate::build_csv_reader`].
    pub async fn from_async_reader<R>(reader: R, options: ProcessorOptions) -> CsvResult<Self>
    where
        R: AsyncRead + Unpin,
    {
        let decoder = ScalarDecoder::new(options.charset);
        let mut frames = FramedRead::with_capacity(reader, decoder, options.buffer_size.max(1));
        let mut ingest = Ingest::new(&options);
        while let Some(text) = frames.try_next().await? {
            ingest.push(&text)?;
        }

        let (separator, records) = ingest.finish()?;
        Self::from_records(separator, records, &options)
    }

    /// Opens a local file, decompressing `.gz` and `.zst` by extension.
    pub async fn open(path: impl AsRef<Path>, options: ProcessorOptions) -> CsvResult<Self> {
        let (reader, meta) = reader_from_path(path.as_ref()).await?;
        debug!(
            "opened {} ({}, encoding {:?})",
            meta.name_hint, meta.content_type, meta.content_encoding
        );
        Self::from_async_reader(reader, options).await
    }

    fn from_records(
        separator: char,
        records: Vec<Record>,
        options: &ProcessorOptions,
    ) -> CsvResult<Self> {
        if records.is_empty() {
            return Err(CsvInferError::EmptyInput);
        }

        let sample_len = options
            .infer_rows
            .map_or(records.len(), |n| n.clamp(1, records.len()));
        let sample = &records[..sample_len];
        let has_header = options
            .has_header
            .unwrap_or_else(|| options.sniffer.detect_header(sample, options.strictness));
        let metadata = build_metadata(sample, separator, has_header, options.strictness);
        debug!(
            "inferred {} columns from {} rows, header: {}",
            metadata.columns.len(),
            sample_len,
            has_header
        );

        let (rows, warnings) = normalize(records, usize::from(has_header), metadata.columns.len());
        Ok(Self {
            metadata,
            rows,
            warnings,
        })
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// All data rows, header excluded, each exactly `columns.len()` cells wide.
    pub fn read_all(&self) -> Vec<Row> {
        self.rows.clone()
    }

    /// Pulls data rows one at a time.
    pub fn rows(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Hands the cached rows to the caller.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}
