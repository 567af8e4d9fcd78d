use csv_infer::{
    ColumnType, CsvInferError, CsvProcessor, ProcessorOptions, QuoteErrorKind, TypeStrictness,
};

fn types(processor: &CsvProcessor) -> Vec<ColumnType> {
    processor
        .metadata()
        .columns
        .iter()
        .map(|c| c.column_type)
        .collect()
}

#[test]
fn rectangular_integers() -> anyhow::Result<()> {
    let processor = CsvProcessor::new("a,b,c,d\n1,2,3,4\n5,6,7,8")?;
    let meta = processor.metadata();
    assert_eq!(meta.separator, ',');
    assert!(meta.has_header_row);
    assert_eq!(meta.column_names().collect::<Vec<_>>(), ["a", "b", "c", "d"]);
    assert_eq!(types(&processor), [ColumnType::Int; 4]);
    assert_eq!(
        processor.read_all(),
        vec![vec!["1", "2", "3", "4"], vec!["5", "6", "7", "8"]]
    );
    Ok(())
}

#[test]
fn quoted_text_makes_column_string() -> anyhow::Result<()> {
    let processor = CsvProcessor::new("a,b,c,d\n1,2,\"three of c's\",4")?;
    assert_eq!(processor.read_all(), vec![vec!["1", "2", "three of c's", "4"]]);
    assert_eq!(
        types(&processor),
        [
            ColumnType::Int,
            ColumnType::Int,
            ColumnType::String,
            ColumnType::Int
        ]
    );
    Ok(())
}

#[test]
fn trailing_empty_cell_keeps_int() -> anyhow::Result<()> {
    let processor = CsvProcessor::new("a,b,c\n1,2,\n")?;
    assert_eq!(processor.read_all(), vec![vec!["1", "2", ""]]);
    assert_eq!(types(&processor), [ColumnType::Int; 3]);
    Ok(())
}

#[test]
fn ragged_row_is_padded() -> anyhow::Result<()> {
    let processor = CsvProcessor::new("a,b,c,d\n1,2,\n5,6,7,8")?;
    assert_eq!(
        processor.read_all(),
        vec![vec!["1", "2", "", ""], vec!["5", "6", "7", "8"]]
    );
    assert_eq!(types(&processor), [ColumnType::Int; 4]);
    assert!(processor.warnings().is_empty());
    Ok(())
}

#[test]
fn embedded_newline_stays_in_cell() -> anyhow::Result<()> {
    let processor = CsvProcessor::new("a,b,c\n1,\"two\nwith a newline\",3")?;
    assert_eq!(
        processor.read_all(),
        vec![vec!["1", "two\nwith a newline", "3"]]
    );
    Ok(())
}

#[test]
fn escaped_quotes_round_trip() -> anyhow::Result<()> {
    let processor = CsvProcessor::new("a,b\n1,\"two, aka \\\"super cool\\\"\"\n")?;
    assert_eq!(
        processor.read_all(),
        vec![vec!["1", "two, aka \"super cool\""]]
    );
    Ok(())
}

#[test]
fn one_label_downgrades_whole_column() -> anyhow::Result<()> {
    let mut input = String::from("n\n");
    for i in 0..50 {
        input.push_str(&format!("{i}\n"));
    }
    assert_eq!(types(&CsvProcessor::new(&input)?), [ColumnType::Int]);

    input.push_str("n/a\n");
    assert_eq!(types(&CsvProcessor::new(&input)?), [ColumnType::String]);
    Ok(())
}

#[test]
fn quoted_numbers_follow_strictness() -> anyhow::Result<()> {
    let input = "a,b\n1,\"2\"\n";
    let lenient = CsvProcessor::new(input)?;
    assert_eq!(types(&lenient), [ColumnType::Int, ColumnType::Int]);

    let options = ProcessorOptions::default().with_strictness(TypeStrictness::QuotedIsString);
    let strict = CsvProcessor::with_options(input, options)?;
    assert_eq!(types(&strict), [ColumnType::Int, ColumnType::String]);
    assert_eq!(strict.read_all(), lenient.read_all());
    Ok(())
}

#[test]
fn buffer_size_never_changes_results() -> anyhow::Result<()> {
    let input = "id,name,note\r\n1,\"x, \\\"y\\\"\",\"multi\nline\"\n2,é,\n\n3,\"\",tail";
    let expected = CsvProcessor::new(input)?;
    for size in 1..=input.len() + 1 {
        let options = ProcessorOptions::default().with_buffer_size(size);
        let processor = CsvProcessor::with_options(input, options)?;
        assert_eq!(processor.metadata(), expected.metadata(), "buffer size {size}");
        assert_eq!(processor.read_all(), expected.read_all(), "buffer size {size}");
    }
    assert_eq!(
        expected.read_all(),
        vec![
            vec!["1", "x, \"y\"", "multi\nline"],
            vec!["2", "é", ""],
            vec!["3", "", "tail"],
        ]
    );
    Ok(())
}

#[test]
fn unterminated_quote_fails_construction() {
    let err = CsvProcessor::new("a,b\n1,\"never closed\n2,3\n").unwrap_err();
    assert!(matches!(
        err,
        CsvInferError::MalformedQuote {
            kind: QuoteErrorKind::Unterminated,
            ..
        }
    ));
}

#[test]
fn text_after_closing_quote_fails_construction() {
    let err = CsvProcessor::new("a,b\n\"1\"x,2\n").unwrap_err();
    assert!(matches!(
        err,
        CsvInferError::MalformedQuote {
            line: 2,
            record: 1,
            kind: QuoteErrorKind::UnexpectedChar('x'),
        }
    ));
}

#[test]
fn invalid_utf8_reports_offset() {
    let err = CsvProcessor::new(b"a,b\n1,\xff\n".as_slice()).unwrap_err();
    assert!(matches!(err, CsvInferError::Encoding { offset: 6, .. }));
}

#[test]
fn legacy_charset_is_decoded() -> anyhow::Result<()> {
    let options = ProcessorOptions::default().with_charset(encoding_rs::WINDOWS_1252);
    let processor = CsvProcessor::with_options(b"name;qty\ncaf\xe9;3\n".as_slice(), options)?;
    assert_eq!(processor.metadata().separator, ';');
    assert_eq!(processor.read_all(), vec![vec!["café", "3"]]);
    Ok(())
}

#[test]
fn tab_separated_without_header() -> anyhow::Result<()> {
    let processor = CsvProcessor::new("1\tx\n2\ty\n3\tz\n")?;
    let meta = processor.metadata();
    assert_eq!(meta.separator, '\t');
    assert!(!meta.has_header_row);
    assert_eq!(meta.column_names().collect::<Vec<_>>(), ["column_0", "column_1"]);
    assert_eq!(processor.row_count(), 3);
    Ok(())
}

#[test]
fn numeric_first_row_in_int_column_is_kept_as_data() -> anyhow::Result<()> {
    let processor = CsvProcessor::new("10,x\n1,5\n2,6\n")?;
    let meta = processor.metadata();
    assert!(!meta.has_header_row);
    assert_eq!(meta.column_names().collect::<Vec<_>>(), ["column_0", "column_1"]);
    assert_eq!(types(&processor), [ColumnType::Int, ColumnType::String]);
    assert_eq!(
        processor.read_all(),
        vec![vec!["10", "x"], vec!["1", "5"], vec!["2", "6"]]
    );

    // No typed column at all: the first row still names the columns.
    let processor = CsvProcessor::new("ann,oslo\nbob,bergen\n")?;
    assert!(processor.metadata().has_header_row);
    assert_eq!(processor.read_all(), vec![vec!["bob", "bergen"]]);
    Ok(())
}

#[test]
fn overrides_skip_detection() -> anyhow::Result<()> {
    let options = ProcessorOptions::default()
        .with_separator(',')
        .with_header(false);
    let processor = CsvProcessor::with_options("a;b,c\n1;2,3\n", options)?;
    assert_eq!(processor.metadata().separator, ',');
    assert!(!processor.metadata().has_header_row);
    assert_eq!(processor.into_rows(), vec![vec!["a;b", "c"], vec!["1;2", "3"]]);
    Ok(())
}

#[test]
fn rows_pull_one_at_a_time() -> anyhow::Result<()> {
    let processor = CsvProcessor::new("a\n1\n2\n3\n")?;
    let mut rows = processor.rows();
    assert_eq!(rows.next(), Some(&vec!["1".to_string()]));
    assert_eq!(rows.next(), Some(&vec!["2".to_string()]));
    assert_eq!(rows.count(), 1);
    Ok(())
}
