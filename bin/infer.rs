use clap::{Arg, ArgAction, Command};
use crc32fast::Hasher as Crc32;
use csv_infer::{CsvProcessor, ProcessorOptions, QuoteEscape, TypeStrictness};
use std::path::PathBuf;
use std::time::Instant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = Command::new("infer")
        .about("Infer separator, header and column types of a CSV file")
        .arg(Arg::new("path").long("path").required(true).value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("buffer-size").long("buffer-size").help("Bytes read per refill").value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("separator").long("separator").help("Skip separator sniffing").value_parser(clap::value_parser!(char)))
        .arg(Arg::new("header").long("header").help("Force a header row (true/false)").value_parser(clap::value_parser!(bool)))
        .arg(Arg::new("charset").long("charset").help("Source character encoding label, e.g. windows-1252").default_value("utf-8"))
        .arg(Arg::new("doubled-quotes").long("doubled-quotes").help("Escape quotes as \"\" instead of \\\"").action(ArgAction::SetTrue))
        .arg(Arg::new("quoted-is-string").long("quoted-is-string").help("Quoted values never count as integers").action(ArgAction::SetTrue))
        .arg(Arg::new("infer-rows").long("infer-rows").help("Rows sampled for inference").value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("mmap").long("mmap").help("Map the file instead of streaming it (feature: fast_local)").action(ArgAction::SetTrue))
        .arg(Arg::new("rows").long("rows").help("Print the first N data rows").value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("checksum").long("checksum").help("CRC32 over all cells, for comparing runs").action(ArgAction::SetTrue))
        .get_matches();

    let path = matches
        .get_one::<PathBuf>("path")
        .ok_or_else(|| anyhow::anyhow!("Provide --path <file>"))?;

    let label = matches
        .get_one::<String>("charset")
        .map(String::as_str)
        .unwrap_or("utf-8");
    let charset = encoding_rs::Encoding::for_label(label.as_bytes())
        .ok_or_else(|| anyhow::anyhow!("unknown charset: {label}"))?;

    let mut options = ProcessorOptions::default().with_charset(charset);
    if let Some(&size) = matches.get_one::<usize>("buffer-size") {
        options = options.with_buffer_size(size);
    }
    if let Some(&sep) = matches.get_one::<char>("separator") {
        options = options.with_separator(sep);
    }
    if let Some(&header) = matches.get_one::<bool>("header") {
        options = options.with_header(header);
    }
    if matches.get_flag("doubled-quotes") {
        options = options.with_quote_escape(QuoteEscape::Doubled);
    }
    if matches.get_flag("quoted-is-string") {
        options = options.with_strictness(TypeStrictness::QuotedIsString);
    }
    if let Some(&n) = matches.get_one::<usize>("infer-rows") {
        options = options.with_infer_rows(n);
    }

    let start = Instant::now();
    let processor = if matches.get_flag("mmap") {
        open_mapped(path, options)?
    } else {
        CsvProcessor::open(path, options).await?
    };
    let elapsed = start.elapsed().as_secs_f64();

    let meta = processor.metadata();
    println!(
        "source={} separator={:?} header={} rows={}\nelapsed={:.3}s",
        path.display(),
        meta.separator,
        meta.has_header_row,
        processor.row_count(),
        elapsed
    );
    for (i, column) in meta.columns.iter().enumerate() {
        println!("  {i:>3}  {:<24} {}", column.name, column.column_type);
    }
    for warning in processor.warnings() {
        println!("warning: {warning:?}");
    }

    if let Some(&n) = matches.get_one::<usize>("rows") {
        for row in processor.rows().take(n) {
            println!("{row:?}");
        }
    }

    if matches.get_flag("checksum") {
        // cells separated by '\x1f' (unit separator), rows by '\x1e' (record separator)
        let mut crc = Crc32::new();
        for row in processor.rows() {
            for (fi, cell) in row.iter().enumerate() {
                if fi > 0 {
                    crc.update(&[0x1f]);
                }
                crc.update(cell.as_bytes());
            }
            crc.update(&[0x1e]);
        }
        println!("crc=0x{:08x}", crc.finalize());
    }
    Ok(())
}

#[cfg(feature = "fast_local")]
fn open_mapped(path: &std::path::Path, options: ProcessorOptions) -> anyhow::Result<CsvProcessor> {
    Ok(CsvProcessor::from_mmap_path(path, options)?)
}

#[cfg(not(feature = "fast_local"))]
fn open_mapped(_path: &std::path::Path, _options: ProcessorOptions) -> anyhow::Result<CsvProcessor> {
    Err(anyhow::anyhow!("--mmap requires the fast_local feature"))
}
