//! Tests for the formatted (text) keyword codec
//!
//! These tests verify:
//! - Header lines and values-per-line layout
//! - Reading hand-written formatted text, including D exponents
//! - Binary and formatted codecs agreeing on the same keywords
//! - Parse errors carry the offending offset
//! - Damaged counts fail without reading or allocating
//! - Latin-1 CHAR values keep one byte per character

use std::io::Cursor;

use eclkw::keyword::{
    BlockLayout, FormattedKeywordReader, FormattedKeywordWriter, KeywordSink, KeywordSource,
};
use eclkw::index::{IndexBuilder, IndexStatus};
use eclkw::{ArrayData, EclError, ElementType, FileFormat, IndexMode, Keyword, KeywordIndex, Tolerance};

// =============================================================================
// Helper Functions
// =============================================================================

fn write_text(keywords: &[Keyword], layout: BlockLayout) -> String {
    let mut writer = FormattedKeywordWriter::new(Vec::new(), layout);
    for keyword in keywords {
        writer.write_keyword(keyword).unwrap();
    }
    String::from_utf8(writer.into_inner()).unwrap()
}

fn read_text(text: &str) -> eclkw::Result<Vec<Keyword>> {
    let mut reader = FormattedKeywordReader::new(Cursor::new(text.as_bytes().to_vec()))?;
    let mut keywords = Vec::new();
    while let Some(keyword) = reader.read_keyword()? {
        keywords.push(keyword);
    }
    Ok(keywords)
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_header_and_integer_lines() {
    let keyword = Keyword::new("INTEHEAD", ArrayData::Int32((1..=8).collect())).unwrap();
    let text = write_text(&[keyword], BlockLayout::default());
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], " 'INTEHEAD'           8 'INTE'");
    assert_eq!(lines.len(), 3);
    // six integers per line
    assert_eq!(lines[1].split_whitespace().count(), 6);
    assert_eq!(lines[2].split_whitespace().count(), 2);
}

#[test]
fn test_values_per_line_by_type() {
    let cases = [
        (ArrayData::Float32(vec![1.0; 9]), 4),
        (ArrayData::Float64(vec![1.0; 9]), 3),
        (ArrayData::Char(vec!["AB".to_string(); 9]), 7),
        (ArrayData::Bool(vec![true; 30]), 25),
    ];
    for (data, columns) in cases {
        let keyword = Keyword::new("VALUES", data).unwrap();
        let text = write_text(&[keyword], BlockLayout::default());
        let first_data_line = text.lines().nth(1).unwrap();
        let values = match first_data_line.contains('\'') {
            true => first_data_line.matches('\'').count() / 2,
            false => first_data_line.split_whitespace().count(),
        };
        assert_eq!(values, columns, "line {:?}", first_data_line);
    }
}

#[test]
fn test_block_boundary_starts_new_line() {
    let layout = BlockLayout::default().with_cap(ElementType::Int32, 4);
    let keyword = Keyword::new("ACTNUM", ArrayData::Int32(vec![1; 10])).unwrap();
    let text = write_text(&[keyword], layout);
    let counts: Vec<usize> = text.lines().skip(1).map(|l| l.split_whitespace().count()).collect();
    assert_eq!(counts, vec![4, 4, 2]);
}

#[test]
fn test_message_keyword_is_header_only() {
    let text = write_text(&[Keyword::message("ENDSOL").unwrap()], BlockLayout::default());
    assert_eq!(text, " 'ENDSOL  '           0 'MESS'\n");
}

#[test]
fn test_writer_position_counts_bytes() {
    let mut writer = FormattedKeywordWriter::with_offset(Vec::new(), BlockLayout::default(), 100);
    writer.write_keyword(&Keyword::message("ENDSOL").unwrap()).unwrap();
    assert_eq!(writer.position(), 100 + 31);
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_read_hand_written_text() {
    let text = "\
 'SEQNUM  '           1 'INTE'
           3
 'DOUBHEAD'           2 'DOUB'
   0.15000000000000D+01  -0.25000000000000D-02
 'NAMES   '           2 'CHAR'
 'OP_1    ' 'INJ     '
 'FLAGS   '           3 'LOGI'
  T  F  T
";
    let keywords = read_text(text).unwrap();
    assert_eq!(keywords.len(), 4);
    assert_eq!(keywords[0].as_i32().unwrap(), &[3]);
    assert_eq!(keywords[1].as_f64().unwrap(), &[1.5, -0.0025]);
    assert_eq!(keywords[2].as_strings().unwrap(), &["OP_1".to_string(), "INJ".to_string()]);
    assert_eq!(keywords[3].as_bools().unwrap(), &[true, false, true]);
}

#[test]
fn test_bad_number_reports_offset() {
    let text = " 'SEQNUM  '           1 'INTE'\n        abc\n";
    match read_text(text) {
        Err(EclError::Format { offset, message }) => {
            assert_eq!(offset, 31);
            assert!(message.contains("abc"));
        }
        other => panic!("expected Format error, got {:?}", other),
    }
}

#[test]
fn test_unknown_tag_in_text() {
    let text = " 'SEQNUM  '           1 'ABCD'\n 1\n";
    assert!(matches!(read_text(text), Err(EclError::InvalidTypeTag { .. })));
}

#[test]
fn test_missing_values_are_an_error() {
    let text = " 'PORO    '           3 'REAL'\n   0.10000000E+00\n";
    let err = read_text(text).unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_huge_count_is_rejected_before_reading() {
    let text = " 'FLAGS   '    1000000000000000 'LOGI'\n  T\n";
    match read_text(text) {
        Err(EclError::InvalidHeader { reason, .. }) => assert!(reason.contains("FLAGS")),
        other => panic!("expected InvalidHeader, got {:?}", other),
    }

    let text = " 'FLAGS   '  2000000000 'LOGI'\n  T  F\n";
    let err = read_text(text).unwrap_err();
    assert!(err.is_truncated(), "unexpected error {:?}", err);
}

#[test]
fn test_partial_index_stops_at_huge_count() {
    let text = " 'SEQNUM  '           1 'INTE'\n           1\n 'FLAGS   '  2000000000 'LOGI'\n  T\n";
    let mut source = FormattedKeywordReader::new(Cursor::new(text.as_bytes().to_vec())).unwrap();
    let report = IndexBuilder::new().mode(IndexMode::Partial).build(&mut source).unwrap();

    assert_eq!(report.index.len(), 1);
    assert!(matches!(report.status, IndexStatus::Truncated { .. }));
}

#[test]
fn test_latin1_char_values_round_trip() {
    let keyword = Keyword::new("WGNAMES", ArrayData::Char(vec!["BRØNN-1".into(), "ÅSGARD".into()])).unwrap();
    let mut writer = FormattedKeywordWriter::new(Vec::new(), BlockLayout::default());
    writer.write_keyword(&keyword).unwrap();
    let bytes = writer.into_inner();
    // one byte per character on disk
    assert!(bytes.contains(&0xD8));
    assert_eq!(bytes.len(), 31 + 2 * 11 + 1);

    let mut reader = FormattedKeywordReader::new(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.read_keyword().unwrap(), Some(keyword));
}

// =============================================================================
// Codec Agreement Tests
// =============================================================================

#[test]
fn test_text_round_trip_within_tolerance() {
    let keywords = vec![
        Keyword::new("INTEHEAD", ArrayData::Int32(vec![-1, 0, 2_000_000_000])).unwrap(),
        Keyword::new("PRESSURE", ArrayData::Float32(vec![1.0, 250.125, -3.5e-7, 0.0])).unwrap(),
        Keyword::new("DOUBHEAD", ArrayData::Float64(vec![std::f64::consts::PI, -1e250])).unwrap(),
        Keyword::new("ZWEL", ArrayData::Char(vec!["OP_1".into(), "".into()])).unwrap(),
        Keyword::new("LOGIHEAD", ArrayData::Bool(vec![false, true])).unwrap(),
        Keyword::message("ENDSOL").unwrap(),
    ];
    let text = write_text(&keywords, BlockLayout::default());
    let decoded = read_text(&text).unwrap();

    assert_eq!(decoded.len(), keywords.len());
    for (original, decoded) in keywords.iter().zip(&decoded) {
        assert!(
            original.approx_eq(decoded, Tolerance::default()),
            "{:?} != {:?}",
            original,
            decoded
        );
    }
}

#[test]
fn test_index_over_formatted_text() {
    let keywords = vec![
        Keyword::new("SEQNUM", ArrayData::Int32(vec![0])).unwrap(),
        Keyword::new("PRESSURE", ArrayData::Float32(vec![1.0, 2.0, 3.0])).unwrap(),
        Keyword::new("SEQNUM", ArrayData::Int32(vec![1])).unwrap(),
        Keyword::new("PRESSURE", ArrayData::Float32(vec![4.0, 5.0, 6.0])).unwrap(),
    ];
    let text = write_text(&keywords, BlockLayout::default());
    let mut source = FormattedKeywordReader::new(Cursor::new(text.into_bytes())).unwrap();

    let index = KeywordIndex::build(&mut source).unwrap();
    assert_eq!(index.format(), FileFormat::Formatted);
    assert_eq!(index.len(), 4);
    assert_eq!(index.count("PRESSURE"), 2);

    let entry = &index.entries()[3];
    source.seek(entry.data_offset).unwrap();
    let data = source.read_data(&entry.header()).unwrap();
    assert_eq!(data, ArrayData::Float32(vec![4.0, 5.0, 6.0]));

    let picked = source.read_elements(&entry.header(), entry.data_offset, &[2]).unwrap();
    assert_eq!(picked, ArrayData::Float32(vec![6.0]));
}
