use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};

use crate::CsvResult;

/// Describes where a byte source came from, used to pick decompression.
#[derive(Debug, Clone, Default)]
pub struct SourceMeta {
    /// e.g. "application/gzip" or "text/csv"
    pub content_type: String,
    /// e.g. "gzip", "zstd", or empty
    pub content_encoding: String,
    /// just the key/filename (used for extension fallback)
    pub name_hint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    None,
    Gzip,
    Zstd,
}

impl SourceMeta {
    /// Content type and encoding guessed from the extension (`.gz`, `.zst`, else CSV).
    pub fn from_path(path: &Path) -> Self {
        let name_hint = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let (content_type, content_encoding) =
            match path.extension().and_then(|s| s.to_str()).unwrap_or_default() {
                "gz" => ("application/gzip", "gzip"),
                "zst" => ("application/zstd", "zstd"),
                _ => ("text/csv", ""),
            };
        Self {
            content_type: content_type.to_string(),
            content_encoding: content_encoding.to_string(),
            name_hint,
        }
    }

    fn compression(&self) -> Compression {
        let ce = self.content_encoding.to_ascii_lowercase();
        let ct = self.content_type.to_ascii_lowercase();

        let is_gzip = ce.split(',').any(|s| s.trim() == "gzip")
            || matches!(ct.as_str(), "application/gzip" | "application/x-gzip")
            || self.name_hint.ends_with(".gz");
        let is_zstd = ce.split(',').any(|s| s.trim() == "zstd")
            || ct == "application/zstd"
            || self.name_hint.ends_with(".zst");

        if is_gzip {
            Compression::Gzip
        } else if is_zstd {
            Compression::Zstd
        } else {
            Compression::None
        }
    }
}

/// From a generic AsyncRead, wrap with optional decompression.
/// Character decoding happens later, inside the processor.
pub fn build_csv_reader<R>(raw: R, meta: SourceMeta) -> (impl AsyncRead + Unpin + Send, SourceMeta)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    // decompression choice: encoding -> type -> extension
    let buf = BufReader::with_capacity(1 << 16, raw);
    let decompressed: Box<dyn AsyncRead + Unpin + Send> = match meta.compression() {
        Compression::Gzip => Box::new(GzipDecoder::new(buf)),
        Compression::Zstd => Box::new(ZstdDecoder::new(buf)),
        Compression::None => Box::new(buf),
    };
    (decompressed, meta)
}

/// Opens a local file, deriving its [`SourceMeta`] from the file name.
pub async fn reader_from_path(path: &Path) -> CsvResult<(impl AsyncRead + Unpin + Send, SourceMeta)> {
    let file = File::open(path).await?;
    Ok(build_csv_reader(file, SourceMeta::from_path(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_from_headers_then_extension() {
        let meta = SourceMeta {
            content_encoding: "identity, GZIP".into(),
            ..Default::default()
        };
        assert_eq!(meta.compression(), Compression::Gzip);

        let meta = SourceMeta {
            content_type: "application/zstd".into(),
            ..Default::default()
        };
        assert_eq!(meta.compression(), Compression::Zstd);

        let meta = SourceMeta {
            name_hint: "data.csv.zst".into(),
            ..Default::default()
        };
        assert_eq!(meta.compression(), Compression::Zstd);

        let meta = SourceMeta {
            content_type: "text/csv".into(),
            name_hint: "data.csv".into(),
            ..Default::default()
        };
        assert_eq!(meta.compression(), Compression::None);
    }

    #[test]
    fn meta_from_file_extension() {
        let meta = SourceMeta::from_path(Path::new("/data/orders.csv.gz"));
        assert_eq!(meta.name_hint, "orders.csv.gz");
        assert_eq!(meta.content_type, "application/gzip");
        assert_eq!(meta.content_encoding, "gzip");
        assert_eq!(meta.compression(), Compression::Gzip);

        let meta = SourceMeta::from_path(Path::new("orders.zst"));
        assert_eq!(meta.compression(), Compression::Zstd);

        let meta = SourceMeta::from_path(Path::new("orders.tsv"));
        assert_eq!(meta.content_type, "text/csv");
        assert!(meta.content_encoding.is_empty());
        assert_eq!(meta.compression(), Compression::None);
    }
}
