use bytes::{Buf, BytesMut};
use encoding_rs::{DecoderResult, Encoding};
use tokio_util::codec::Decoder;

use crate::{CsvInferError, CsvResult};

/// Turns raw bytes into validated UTF-8 text chunks.
///
/// Unlike a lossy transcoder this fails on the first malformed sequence,
/// reporting its absolute byte offset. Multi-byte sequences split across
/// refills are held inside the `encoding_rs` decoder until completed.
/// A leading BOM is stripped. Create a new instance to restart from the
/// beginning of a stream.
pub struct ScalarDecoder {
    encoding: &'static Encoding,
    decoder: encoding_rs::Decoder,
    consumed: u64,
    finished: bool,
}

impl ScalarDecoder {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            encoding,
            decoder: encoding.new_decoder(),
            consumed: 0,
            finished: false,
        }
    }

    /// Bytes consumed from the source so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    fn decode_chunk(&mut self, src: &[u8], last: bool) -> CsvResult<(String, usize)> {
        let capacity = self
            .decoder
            .max_utf8_buffer_length_without_replacement(src.len())
            .unwrap_or_else(|| src.len() * 3 + 16);
        let mut out = String::with_capacity(capacity);
        let mut read_total = 0usize;

        loop {
            let (result, read) = self.decoder.decode_to_string_without_replacement(
                &src[read_total..],
                &mut out,
                last,
            );
            read_total += read;
            match result {
                DecoderResult::InputEmpty => return Ok((out, read_total)),
                DecoderResult::OutputFull => {
                    let more = self
                        .decoder
                        .max_utf8_buffer_length_without_replacement(src.len() - read_total)
                        .unwrap_or(64);
                    out.reserve(more.max(4));
                }
                DecoderResult::Malformed(bad, extra) => {
                    let offset = (self.consumed + read_total as u64)
                        .saturating_sub(u64::from(bad) + u64::from(extra));
                    return Err(CsvInferError::Encoding {
                        encoding: self.encoding.name(),
                        offset,
                    });
                }
            }
        }
    }
}

impl Decoder for ScalarDecoder {
    type Item = String;
    type Error = CsvInferError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() || self.finished {
            return Ok(None);
        }

        let (text, read) = self.decode_chunk(src, false)?;
        src.advance(read);
        self.consumed += read as u64;

        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.finished {
            buf.clear();
            return Ok(None);
        }

        // Flushes any incomplete sequence held by the decoder, even when `buf` is empty.
        let (text, read) = self.decode_chunk(buf, true)?;
        self.consumed += read as u64;
        buf.clear();
        self.finished = true;

        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }
}
