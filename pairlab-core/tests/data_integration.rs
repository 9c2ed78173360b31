//! Integration tests for the CSV cache, conversion and alignment.

use chrono::NaiveDate;
use pairlab_core::data::{
    align_common_dates, convert_csv, CsvStore, DataError, DataProvider, DataSource,
    SyntheticProvider,
};
use pairlab_core::domain::SeriesError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_cache_dir(tag: &str) -> PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "pairlab_{tag}_test_{}_{id}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn synthetic_series_survive_a_cache_round_trip() {
    let dir = temp_cache_dir("roundtrip");
    let store = CsvStore::new(&dir);
    let series = SyntheticProvider::default()
        .generate("BTC/USDT", d(2023, 1, 1), 120)
        .unwrap();

    let path = store.write(&series).unwrap();
    assert!(path.ends_with("BTC_USDT_1d.csv"));
    assert!(store.exists("BTC/USDT"));

    let loaded = store.load("BTC/USDT").unwrap();
    assert_eq!(loaded.len(), 120);
    assert_eq!(loaded.points(), series.points());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn fetch_clips_to_range() {
    let dir = temp_cache_dir("clip");
    let store = CsvStore::new(&dir);
    let series = SyntheticProvider::default()
        .generate("ETH/USDT", d(2023, 1, 1), 90)
        .unwrap();
    store.write(&series).unwrap();

    let r = store.fetch("ETH/USDT", d(2023, 2, 1), d(2023, 2, 28)).unwrap();
    assert_eq!(r.source, DataSource::CsvCache);
    assert_eq!(r.series.len(), 28);
    assert_eq!(r.series.first_date(), Some(d(2023, 2, 1)));

    let err = store.fetch("ETH/USDT", d(2025, 1, 1), d(2025, 2, 1)).unwrap_err();
    assert!(matches!(err, DataError::NoDataInRange { .. }));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_file_is_not_found() {
    let dir = temp_cache_dir("missing");
    let err = CsvStore::new(&dir).load("SOL/USDT").unwrap_err();
    assert!(matches!(err, DataError::NotFound { .. }), "{err}");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn inconsistent_rows_fail_validation() {
    let dir = temp_cache_dir("invalid");
    std::fs::write(
        dir.join("BAD_1d.csv"),
        "timestamp,open,high,low,close,volume\n\
         2024-01-01,10,12,9,11,100\n\
         2024-01-02,10,9,8,11,100\n",
    )
    .unwrap();
    let err = CsvStore::new(&dir).load("BAD").unwrap_err();
    match err {
        DataError::Validation { symbol, source } => {
            assert_eq!(symbol, "BAD");
            assert_eq!(source, SeriesError::InconsistentOhlc { date: d(2024, 1, 2) });
        }
        other => panic!("unexpected error: {other}"),
    }
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn convert_normalizes_foreign_layout() {
    let dir = temp_cache_dir("convert");
    let input = dir.join("export.csv");
    std::fs::write(
        &input,
        "Date,Open,High,Low,Close\n\
         2024-01-03,11,13,10,12\n\
         2024-01-02,10,12,9,11\n\
         2024-01-03,11,14,10,13\n",
    )
    .unwrap();
    let output = dir.join("out").join("X_1d.csv");

    let summary = convert_csv(&input, &output).unwrap();
    assert_eq!(summary.rows_read, 3);
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.duplicates_dropped, 1);

    let text = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        text,
        "timestamp,open,high,low,close,volume\n\
         2024-01-02,10,12,9,11,0\n\
         2024-01-03,11,14,10,13,0\n"
    );

    let loaded = CsvStore::new(dir.join("out")).load("X").unwrap();
    assert_eq!(loaded.closes(), vec![11.0, 13.0]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn cached_series_align_on_shared_dates() {
    let dir = temp_cache_dir("align");
    let store = CsvStore::new(&dir);
    let provider = SyntheticProvider::default();
    store
        .write(&provider.generate("A", d(2023, 1, 1), 60).unwrap())
        .unwrap();
    store
        .write(&provider.generate("B", d(2023, 1, 11), 60).unwrap())
        .unwrap();

    let a = store.load("A").unwrap();
    let b = store.load("B").unwrap();
    let aligned = align_common_dates(&[a, b]);
    assert_eq!(aligned.len(), 50);
    assert_eq!(aligned.dates.first(), Some(&d(2023, 1, 11)));
    assert_eq!(aligned.dates.last(), Some(&d(2023, 3, 1)));

    let _ = std::fs::remove_dir_all(&dir);
}
