//! Tests for keywords and the binary keyword codec
//!
//! These tests verify:
//! - Keyword construction rules (names, CHAR widths, MESS)
//! - Damaged counts and non-ASCII CHAR bytes
//! - Typed accessors and their mismatch errors
//! - Binary write/read of every element type
//! - Large arrays split over several physical records
//! - Element reads that seek straight to one record
//! - Tolerance based comparison

use std::io::Cursor;

use eclkw::config::DEFAULT_MAX_RECORD_SIZE;
use eclkw::keyword::{
    BinaryKeywordReader, BinaryKeywordWriter, BlockLayout, KeywordHeader, KeywordSink, KeywordSource,
    HEADER_SIZE, LOGI_TRUE,
};
use eclkw::record::{Endian, RecordReader, RecordWriter, RECORD_OVERHEAD};
use eclkw::{ArrayData, Config, EclError, ElementType, Keyword, Tolerance};

// =============================================================================
// Helper Functions
// =============================================================================

fn encode(keywords: &[Keyword], endian: Endian, layout: BlockLayout) -> Vec<u8> {
    let records = RecordWriter::new(Vec::new(), endian, DEFAULT_MAX_RECORD_SIZE);
    let mut writer = BinaryKeywordWriter::new(records, layout);
    for keyword in keywords {
        writer.write_keyword(keyword).unwrap();
    }
    writer.into_inner()
}

fn reader(bytes: Vec<u8>, endian: Endian, layout: BlockLayout) -> BinaryKeywordReader<Cursor<Vec<u8>>> {
    let records = RecordReader::new(Cursor::new(bytes), endian, DEFAULT_MAX_RECORD_SIZE).unwrap();
    BinaryKeywordReader::new(records, layout)
}

fn read_all(bytes: Vec<u8>, endian: Endian, layout: BlockLayout) -> Vec<Keyword> {
    let mut reader = reader(bytes, endian, layout);
    let mut keywords = Vec::new();
    while let Some(keyword) = reader.read_keyword().unwrap() {
        keywords.push(keyword);
    }
    keywords
}

fn sample_keywords() -> Vec<Keyword> {
    vec![
        Keyword::new("INTEHEAD", ArrayData::Int32(vec![1, -2, i32::MAX])).unwrap(),
        Keyword::new("PORO", ArrayData::Float32(vec![0.25, 0.3])).unwrap(),
        Keyword::new("DOUBHEAD", ArrayData::Float64(vec![1e-300, -7.5])).unwrap(),
        Keyword::new("ZWEL", ArrayData::Char(vec!["OP_1".into(), "".into(), "INJECTOR".into()])).unwrap(),
        Keyword::new("LOGIHEAD", ArrayData::Bool(vec![true, false])).unwrap(),
        Keyword::message("STARTSOL").unwrap(),
    ]
}

// =============================================================================
// Construction Tests
// =============================================================================

#[test]
fn test_name_rules() {
    assert!(Keyword::new("", ArrayData::Int32(vec![])).is_err());
    assert!(Keyword::new("TOOLONGNAME", ArrayData::Int32(vec![])).is_err());
    assert!(Keyword::new("BAD\tNAME", ArrayData::Int32(vec![])).is_err());

    let padded = Keyword::new("SWAT    ", ArrayData::Float32(vec![])).unwrap();
    assert_eq!(padded.name(), "SWAT");
}

#[test]
fn test_char_values_limited_to_eight_bytes() {
    let err = Keyword::new("NAMES", ArrayData::Char(vec!["NINECHARS".into()])).unwrap_err();
    assert!(matches!(err, EclError::InvalidHeader { .. }));
}

#[test]
fn test_char_values_accept_latin1() {
    let names = Keyword::new("WNAMES", ArrayData::Char(vec!["BRØNN-1".into(), "ÆÅ".into()])).unwrap();
    assert_eq!(names.count(), 2);
    assert!(Keyword::new("WNAMES", ArrayData::Char(vec!["€".into()])).is_err());
}

#[test]
fn test_message_keyword_has_no_data() {
    let keyword = Keyword::message("ENDSOL").unwrap();
    assert_eq!(keyword.element_type(), ElementType::Message);
    assert_eq!(keyword.count(), 0);
    assert!(matches!(keyword.as_i32(), Err(EclError::EmptyType { .. })));
}

#[test]
fn test_typed_accessors() {
    let keyword = Keyword::new("SEQNUM", ArrayData::Int32(vec![7])).unwrap();
    assert_eq!(keyword.as_i32().unwrap(), &[7]);
    assert_eq!(keyword.to_i64_vec().unwrap(), vec![7]);
    assert_eq!(keyword.to_f64_vec().unwrap(), vec![7.0]);
    assert_eq!(keyword.get_f64(0).unwrap(), 7.0);

    match keyword.as_f32() {
        Err(EclError::TypeMismatch { stored, requested, .. }) => {
            assert_eq!(stored, ElementType::Int32);
            assert_eq!(requested, "REAL");
        }
        other => panic!("expected TypeMismatch, got {:?}", other),
    }
    assert!(matches!(
        keyword.get_f64(1),
        Err(EclError::ElementOutOfRange { index: 1, count: 1, .. })
    ));
}

#[test]
fn test_scale_and_shift() {
    let mut keyword = Keyword::new("PRESSURE", ArrayData::Float64(vec![1.0, 2.0])).unwrap();
    keyword.scale(10.0).unwrap();
    keyword.shift(-1.0).unwrap();
    assert_eq!(keyword.as_f64().unwrap(), &[9.0, 19.0]);

    let mut names = Keyword::new("NAMES", ArrayData::Char(vec!["A".into()])).unwrap();
    assert!(names.scale(2.0).is_err());
}

// =============================================================================
// Binary Codec Tests
// =============================================================================

#[test]
fn test_every_type_survives_both_byte_orders() {
    for endian in [Endian::Big, Endian::Little] {
        let keywords = sample_keywords();
        let bytes = encode(&keywords, endian, BlockLayout::default());
        assert_eq!(read_all(bytes, endian, BlockLayout::default()), keywords);
    }
}

#[test]
fn test_header_record_layout() {
    let keyword = Keyword::new("SEQNUM", ArrayData::Int32(vec![3])).unwrap();
    let bytes = encode(&[keyword], Endian::Big, BlockLayout::default());

    assert_eq!(&bytes[0..4], &(HEADER_SIZE as u32).to_be_bytes());
    assert_eq!(&bytes[4..12], b"SEQNUM  ");
    assert_eq!(&bytes[12..16], b"INTE");
    assert_eq!(&bytes[16..20], &1i32.to_be_bytes());
    // one data record holding the value 3
    assert_eq!(&bytes[24..28], &4u32.to_be_bytes());
    assert_eq!(&bytes[28..32], &3i32.to_be_bytes());
}

#[test]
fn test_logical_true_is_minus_one_on_disk() {
    let keyword = Keyword::new("LOGIHEAD", ArrayData::Bool(vec![true])).unwrap();
    let bytes = encode(&[keyword], Endian::Little, BlockLayout::default());
    let data_start = HEADER_SIZE + RECORD_OVERHEAD as usize + 4;
    assert_eq!(&bytes[data_start..data_start + 4], &LOGI_TRUE.to_le_bytes());
}

#[test]
fn test_message_keyword_writes_only_a_header() {
    let bytes = encode(&[Keyword::message("ENDSOL").unwrap()], Endian::Big, BlockLayout::default());
    assert_eq!(bytes.len(), HEADER_SIZE + RECORD_OVERHEAD as usize);
}

#[test]
fn test_large_double_array_splits_into_records() {
    let layout = BlockLayout::default().with_cap(ElementType::Float64, 8000);
    let values: Vec<f64> = (0..12_000).map(|i| i as f64 * 0.5).collect();
    let keyword = Keyword::new("COORD", ArrayData::Float64(values)).unwrap();
    let bytes = encode(&[keyword.clone()], Endian::Big, layout);

    let framed_header = HEADER_SIZE + RECORD_OVERHEAD as usize;
    assert_eq!(bytes.len(), framed_header + 12_000 * 8 + 2 * RECORD_OVERHEAD as usize);
    let first = u32::from_be_bytes(bytes[framed_header..framed_header + 4].try_into().unwrap());
    assert_eq!(first, 8000 * 8);
    let second_at = framed_header + 8000 * 8 + RECORD_OVERHEAD as usize;
    let second = u32::from_be_bytes(bytes[second_at..second_at + 4].try_into().unwrap());
    assert_eq!(second, 4000 * 8);

    let decoded = read_all(bytes, Endian::Big, layout);
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].count(), 12_000);
    assert_eq!(decoded[0], keyword);
}

#[test]
fn test_char_array_uses_char_cap() {
    let values: Vec<String> = (0..250).map(|i| format!("W{}", i)).collect();
    let keyword = Keyword::new("ZWEL", ArrayData::Char(values)).unwrap();
    let bytes = encode(&[keyword.clone()], Endian::Big, BlockLayout::default());

    // 105 + 105 + 40 elements
    let framed_header = HEADER_SIZE + RECORD_OVERHEAD as usize;
    assert_eq!(bytes.len(), framed_header + 250 * 8 + 3 * RECORD_OVERHEAD as usize);
    assert_eq!(read_all(bytes, Endian::Big, BlockLayout::default()), vec![keyword]);
}

#[test]
fn test_open_detects_byte_order() {
    let bytes = encode(&sample_keywords(), Endian::Little, BlockLayout::default());
    let config = Config::builder().endian_flip(None).build();
    let mut reader = BinaryKeywordReader::open(Cursor::new(bytes), &config).unwrap();
    assert_eq!(reader.endian(), Endian::Little);
    assert_eq!(reader.read_keyword().unwrap().unwrap().name(), "INTEHEAD");
}

#[test]
fn test_unknown_type_tag() {
    let mut bytes = encode(&sample_keywords()[..1], Endian::Big, BlockLayout::default());
    bytes[12..16].copy_from_slice(b"XXXX");
    let mut reader = reader(bytes, Endian::Big, BlockLayout::default());
    match reader.read_keyword() {
        Err(EclError::InvalidTypeTag { tag, offset }) => {
            assert_eq!(tag, "XXXX");
            assert_eq!(offset, 0);
        }
        other => panic!("expected InvalidTypeTag, got {:?}", other),
    }
}

#[test]
fn test_damaged_count_is_truncation_not_allocation() {
    let keyword = Keyword::new("BIG", ArrayData::Char(vec!["A".into()])).unwrap();
    let mut bytes = encode(&[keyword], Endian::Big, BlockLayout::default());
    bytes[16..20].copy_from_slice(&i32::MAX.to_be_bytes());

    let mut reader = reader(bytes, Endian::Big, BlockLayout::default());
    match reader.read_keyword() {
        Err(EclError::Truncated { offset, available, .. }) => {
            assert_eq!(offset, 24);
            assert_eq!(available, 16);
        }
        other => panic!("expected Truncated, got {:?}", other),
    }
}

#[test]
fn test_non_ascii_char_bytes_survive() {
    let keyword = Keyword::new("WNAMES", ArrayData::Char(vec!["BRXXXX-1".into()])).unwrap();
    let mut bytes = encode(&[keyword], Endian::Big, BlockLayout::default());
    // payload of the data record starts after the header record and a head marker
    bytes[30..34].copy_from_slice(&[0xD8, 0x80, 0xFF, 0xE6]);

    let keywords = read_all(bytes.clone(), Endian::Big, BlockLayout::default());
    assert_eq!(keywords[0].as_strings().unwrap(), &["BR\u{D8}\u{80}\u{FF}\u{E6}-1".to_string()]);

    let rewritten = encode(&keywords, Endian::Big, BlockLayout::default());
    assert_eq!(rewritten, bytes);
}

#[test]
fn test_mess_count_forced_to_zero() {
    let mut bytes = encode(&[Keyword::message("ENDSOL").unwrap()], Endian::Big, BlockLayout::default());
    bytes[16..20].copy_from_slice(&5i32.to_be_bytes());
    let keywords = read_all(bytes, Endian::Big, BlockLayout::default());
    assert_eq!(keywords[0].count(), 0);
}

// =============================================================================
// Source Tests
// =============================================================================

#[test]
fn test_read_elements_across_records() {
    let layout = BlockLayout::default().with_cap(ElementType::Int32, 10);
    let keyword = Keyword::new("ACTNUM", ArrayData::Int32((0..35).collect())).unwrap();
    let bytes = encode(&[keyword], Endian::Big, layout);

    let mut source = reader(bytes, Endian::Big, layout);
    let header = source.next_header().unwrap().unwrap();
    let data_offset = source.position();

    let picked = source.read_elements(&header, data_offset, &[34, 0, 19, 20]).unwrap();
    assert_eq!(picked, ArrayData::Int32(vec![34, 0, 19, 20]));

    let err = source.read_elements(&header, data_offset, &[35]).unwrap_err();
    assert!(matches!(err, EclError::ElementOutOfRange { index: 35, count: 35, .. }));
}

#[test]
fn test_skip_data_lands_on_next_header() {
    let bytes = encode(&sample_keywords(), Endian::Big, BlockLayout::default());
    let mut source = reader(bytes, Endian::Big, BlockLayout::default());

    let mut names = Vec::new();
    while let Some(header) = source.next_header().unwrap() {
        source.skip_data(&header).unwrap();
        names.push(header.name);
    }
    assert_eq!(names, vec!["INTEHEAD", "PORO", "DOUBHEAD", "ZWEL", "LOGIHEAD", "STARTSOL"]);
}

#[test]
fn test_resync_finds_next_header() {
    let keywords = sample_keywords();
    let first_len = encode(&keywords[..1], Endian::Big, BlockLayout::default()).len() as u64;
    let bytes = encode(&keywords, Endian::Big, BlockLayout::default());

    let mut source = reader(bytes, Endian::Big, BlockLayout::default());
    let found = source.resync(1).unwrap();
    assert_eq!(found, Some(first_len));
    assert_eq!(source.next_header().unwrap().unwrap(), KeywordHeader::new("PORO", ElementType::Float32, 2));
}

// =============================================================================
// Comparison Tests
// =============================================================================

#[test]
fn test_approx_eq_uses_tolerance_for_floats() {
    let a = Keyword::new("PRESSURE", ArrayData::Float64(vec![100.0, 200.0])).unwrap();
    let b = Keyword::new("PRESSURE", ArrayData::Float64(vec![100.00001, 200.0])).unwrap();

    assert!(a.approx_eq(&b, Tolerance::default()));
    assert!(!a.approx_eq(&b, Tolerance::exact()));
    assert!(!a.approx_eq(&b, Tolerance::new(1e-9, 0.0)));
}

#[test]
fn test_approx_eq_requires_same_header() {
    let a = Keyword::new("SWAT", ArrayData::Float32(vec![0.1])).unwrap();
    let b = Keyword::new("SGAS", ArrayData::Float32(vec![0.1])).unwrap();
    let c = Keyword::new("SWAT", ArrayData::Float64(vec![0.1])).unwrap();
    assert!(!a.approx_eq(&b, Tolerance::default()));
    assert!(!a.approx_eq(&c, Tolerance::default()));
    assert!(a.header_eq(&a.clone()));
}
