//! Tests for FileView
//!
//! These tests verify:
//! - Occurrence lookup within a view's scope
//! - Lazy materialization and the per-view cache
//! - Block restriction by marker keyword
//! - Report step lookup, exact and previous-available
//! - Concurrent access through SharedFileView

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use eclkw::keyword::{BinaryKeywordWriter, KeywordSink};
use eclkw::record::Endian;
use eclkw::{
    ArrayData, Block, Config, EclError, EclFile, FileView, Keyword, OpenMode, ReportLookup,
    SharedFileView,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_path_buf();
    (temp_dir, path)
}

fn kw_i(name: &str, values: &[i32]) -> Keyword {
    Keyword::new(name, ArrayData::Int32(values.to_vec())).unwrap()
}

fn kw_d(name: &str, values: &[f64]) -> Keyword {
    Keyword::new(name, ArrayData::Float64(values.to_vec())).unwrap()
}

fn write_file(path: &Path, keywords: &[Keyword]) {
    let file = BufWriter::new(File::create(path).unwrap());
    let mut writer = BinaryKeywordWriter::with_config(file, &Config::default(), Endian::Big, 0);
    for keyword in keywords {
        writer.write_keyword(keyword).unwrap();
    }
    writer.flush().unwrap();
}

/// Two report steps of PRESSURE, as in a small restart file
fn two_step_file(dir: &Path) -> PathBuf {
    let path = dir.join("CASE.UNRST");
    write_file(
        &path,
        &[
            kw_i("SEQNUM", &[0]),
            kw_d("PRESSURE", &[1.0, 2.0, 3.0]),
            kw_i("SEQNUM", &[1]),
            kw_d("PRESSURE", &[4.0, 5.0, 6.0]),
        ],
    );
    path
}

/// Report steps 0, 2 and 5 after a leading header keyword
fn sparse_step_file(dir: &Path) -> PathBuf {
    let path = dir.join("SPARSE.UNRST");
    let mut keywords = vec![kw_i("INTEHEAD", &[1, 2, 3])];
    for step in [0, 2, 5] {
        keywords.push(kw_i("SEQNUM", &[step]));
        keywords.push(kw_d("PRESSURE", &[step as f64 * 10.0]));
        keywords.push(kw_d("PRESSURE", &[step as f64 * 10.0 + 1.0]));
    }
    write_file(&path, &keywords);
    path
}

fn open_view(path: &Path) -> (EclFile, FileView) {
    let file = EclFile::open_with(path, OpenMode::Read, Config::default()).unwrap();
    let view = file.view(None).unwrap();
    (file, view)
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_block_restricted_get() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, view) = open_view(&two_step_file(&dir));

    let mut block = view.restrict_to_block(1).unwrap();
    let pressure = block.get("PRESSURE").unwrap();
    assert_eq!(pressure.as_f64().unwrap(), &[4.0, 5.0, 6.0]);
    assert_eq!(block.count("PRESSURE"), 1);
}

#[test]
fn test_get_returns_last_occurrence() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, mut view) = open_view(&two_step_file(&dir));

    assert_eq!(view.count("PRESSURE"), 2);
    assert_eq!(view.get("PRESSURE").unwrap().as_f64().unwrap(), &[4.0, 5.0, 6.0]);
    assert_eq!(
        view.get_occurrence("PRESSURE", 0).unwrap().as_f64().unwrap(),
        &[1.0, 2.0, 3.0]
    );
}

#[test]
fn test_missing_name_and_missing_occurrence() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, mut view) = open_view(&two_step_file(&dir));

    assert!(matches!(view.get("SWAT"), Err(EclError::UnknownKeyword { .. })));
    assert!(matches!(
        view.get_occurrence("SWAT", 0),
        Err(EclError::UnknownKeyword { .. })
    ));
    match view.get_occurrence("PRESSURE", 2) {
        Err(EclError::NotFound { occurrence, count, .. }) => {
            assert_eq!(occurrence, 2);
            assert_eq!(count, 2);
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_occurrences_counted_within_scope() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, view) = open_view(&sparse_step_file(&dir));

    let mut last_block = view.restrict_to_block(3).unwrap();
    assert_eq!(last_block.count("PRESSURE"), 2);
    assert!(!last_block.has("INTEHEAD"));
    assert_eq!(
        last_block.get_occurrence("PRESSURE", 0).unwrap().as_f64().unwrap(),
        &[50.0]
    );
    assert_eq!(last_block.entry("PRESSURE", 1).unwrap().occurrence, 5);
}

#[test]
fn test_block_counts_add_up_to_file_counts() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, view) = open_view(&sparse_step_file(&dir));

    let blocks: Vec<FileView> = (0..view.block_count().unwrap())
        .map(|id| view.restrict_to_block(id).unwrap())
        .collect();
    for name in ["INTEHEAD", "SEQNUM", "PRESSURE", "SWAT"] {
        let total: usize = blocks.iter().map(|block| block.count(name)).sum();
        assert_eq!(total, view.count(name), "{}", name);
    }
    assert_eq!(blocks[2].count("PRESSURE"), 2);
    assert!(blocks[2].has("SEQNUM"));
    assert!(!blocks[2].has("INTEHEAD"));
}

#[test]
fn test_names_in_scope() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, view) = open_view(&sparse_step_file(&dir));

    assert_eq!(view.names(), vec!["INTEHEAD", "SEQNUM", "PRESSURE"]);
    let leading = view.restrict_to_block(0).unwrap();
    assert_eq!(leading.names(), vec!["INTEHEAD"]);
    assert_eq!(leading.entries().len(), 1);
}

#[test]
fn test_get_reads_non_ascii_char_bytes() {
    let (_temp, dir) = setup_temp_dir();
    let path = dir.join("CASE.SMSPEC");
    let names = Keyword::new("WNAMES", ArrayData::Char(vec!["BRXXXX-1".into()])).unwrap();
    write_file(&path, &[names]);

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[30..34].copy_from_slice(&[0xD8; 4]);
    std::fs::write(&path, &bytes).unwrap();

    let (_file, mut view) = open_view(&path);
    let names = view.get("WNAMES").unwrap();
    assert_eq!(names.as_strings().unwrap(), &["BRØØØØ-1".to_string()]);
}

// =============================================================================
// Materialization Tests
// =============================================================================

#[test]
fn test_cache_returns_same_array() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, mut view) = open_view(&two_step_file(&dir));

    assert_eq!(view.cached_count(), 0);
    let first = view.get_occurrence("PRESSURE", 1).unwrap();
    let again = view.get("PRESSURE").unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(view.cached_count(), 1);

    view.drop_cache();
    assert_eq!(view.cached_count(), 0);
    let reread = view.get("PRESSURE").unwrap();
    assert!(!Arc::ptr_eq(&first, &reread));
    assert_eq!(first, reread);
}

#[test]
fn test_read_elements_skips_cache() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, view) = open_view(&two_step_file(&dir));

    let picked = view.read_elements("PRESSURE", 1, &[2, 0]).unwrap();
    assert_eq!(picked, ArrayData::Float64(vec![6.0, 4.0]));
    assert_eq!(view.cached_count(), 0);

    assert!(matches!(
        view.read_elements("PRESSURE", 1, &[3]),
        Err(EclError::ElementOutOfRange { .. })
    ));
}

#[test]
fn test_lazy_array_outlives_view() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, view) = open_view(&two_step_file(&dir));

    let lazy = view.lazy("PRESSURE", 0).unwrap();
    drop(view);
    assert_eq!(lazy.len(), 3);
    assert_eq!(lazy.read_f64(1).unwrap(), 2.0);
    assert_eq!(lazy.load().unwrap().as_f64().unwrap(), &[1.0, 2.0, 3.0]);
    assert!(lazy.same_as(&lazy.clone()));
}

// =============================================================================
// Block Tests
// =============================================================================

#[test]
fn test_blocks_with_leading_block() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, view) = open_view(&sparse_step_file(&dir));

    let blocks = view.blocks().unwrap();
    assert_eq!(blocks.len(), 4);
    assert_eq!(blocks[0].marker, None);
    assert_eq!(blocks[0].range, 0..1);
    assert!(blocks[1..].iter().all(|b| b.marker.is_some() && b.len() == 3));
}

#[test]
fn test_block_out_of_range() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, view) = open_view(&two_step_file(&dir));

    match view.restrict_to_block(2) {
        Err(EclError::BlockOutOfRange { block, count }) => {
            assert_eq!(block, 2);
            assert_eq!(count, 2);
        }
        Err(other) => panic!("expected BlockOutOfRange, got {:?}", other),
        Ok(_) => panic!("expected BlockOutOfRange"),
    }
}

#[test]
fn test_blocks_need_a_marker() {
    let (_temp, dir) = setup_temp_dir();
    let path = two_step_file(&dir);
    let config = Config::builder().no_block_marker().build();
    let file = EclFile::open_with(&path, OpenMode::Read, config).unwrap();
    let view = file.view(None).unwrap();

    assert!(matches!(view.blocks(), Err(EclError::Config(_))));
    let by_pressure = view.with_marker("PRESSURE");
    assert_eq!(by_pressure.block_count().unwrap(), 3);
}

#[test]
fn test_nested_restriction_partitions_current_scope() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, view) = open_view(&sparse_step_file(&dir));

    let step = view.restrict_to_block(2).unwrap();
    let by_pressure = step.with_marker("PRESSURE");
    let second = by_pressure.restrict_to_block(2).unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second.entries()[0].occurrence, 3);
}

#[test]
fn test_restrict_to_clips_to_scope() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, view) = open_view(&sparse_step_file(&dir));

    let step = view.restrict_to_block(1).unwrap();
    let wide = Block {
        id: 0,
        marker: None,
        range: 0..view.len(),
    };
    let clipped = step.restrict_to(&wide);
    assert_eq!(clipped.scope(), step.scope());
}

// =============================================================================
// Report Step Tests
// =============================================================================

#[test]
fn test_report_steps_from_marker_values() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, mut view) = open_view(&sparse_step_file(&dir));

    let steps: Vec<(usize, i64)> = view
        .report_steps()
        .unwrap()
        .iter()
        .map(|s| (s.block, s.step))
        .collect();
    assert_eq!(steps, vec![(1, 0), (2, 2), (3, 5)]);
}

#[test]
fn test_exact_report_lookup() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, mut view) = open_view(&sparse_step_file(&dir));

    assert_eq!(view.find_report_block(2, ReportLookup::Exact).unwrap(), 2);
    assert!(matches!(
        view.find_report_block(3, ReportLookup::Exact),
        Err(EclError::StepNotFound { step: 3 })
    ));
}

#[test]
fn test_previous_available_report_lookup() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, mut view) = open_view(&sparse_step_file(&dir));

    assert_eq!(view.find_report_block(4, ReportLookup::PreviousAvailable).unwrap(), 2);
    assert_eq!(view.find_report_block(99, ReportLookup::PreviousAvailable).unwrap(), 3);
    assert!(matches!(
        view.find_report_block(-1, ReportLookup::PreviousAvailable),
        Err(EclError::StepNotFound { step: -1 })
    ));

    let mut step = view.report_view(4, ReportLookup::PreviousAvailable).unwrap();
    assert_eq!(step.get_occurrence("PRESSURE", 0).unwrap().as_f64().unwrap(), &[20.0]);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_shared_view_across_threads() {
    let (_temp, dir) = setup_temp_dir();
    let (_file, view) = open_view(&sparse_step_file(&dir));
    let shared = Arc::new(SharedFileView::new(view));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                let occurrence = i % 2;
                let keyword = shared.get_occurrence("PRESSURE", occurrence).unwrap();
                keyword.as_f64().unwrap()[0]
            })
        })
        .collect();

    let values: Vec<f64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(values, vec![0.0, 1.0, 0.0, 1.0]);
    assert_eq!(shared.cached_count(), 2);
    assert_eq!(shared.count("PRESSURE"), 6);
}
