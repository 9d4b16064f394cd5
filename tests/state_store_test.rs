//! File-backed analysis slot

use quantdash::services::{AnalysisStateStore, FileSlotStorage, SlotStorage, StoredAnalysis};
use quantdash::{AnalysisParams, AnalysisResult, AnalyzeResponse, AppError, RawChartData};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("quantdash_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&path);
        Self(path)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn sample_result() -> AnalysisResult {
    let response = AnalyzeResponse {
        ticker: "ITUB4".to_string(),
        signal: "VENDA".to_string(),
        confidence: 0.71,
        current_price: 32.10,
        predicted_price: 30.90,
        variation_pct: -3.74,
        chart_data: RawChartData::default(),
    };
    AnalysisResult::from_response(response, &AnalysisParams::default())
}

#[test]
fn test_slot_survives_new_store_instance() {
    let dir = TempDir::new("survive");

    let writer = AnalysisStateStore::new(
        Arc::new(FileSlotStorage::new(&dir.0).unwrap()),
        "chartData",
    );
    assert_ok!(writer.save(&sample_result()));

    // A second process opens the same directory.
    let reader = AnalysisStateStore::new(
        Arc::new(FileSlotStorage::new(&dir.0).unwrap()),
        "chartData",
    );
    let loaded = reader.load().and_then(StoredAnalysis::into_result).unwrap();
    assert_eq!(loaded, sample_result());
    assert!(dir.0.join("chartData.json").exists());
}

#[test]
fn test_absent_corrupt_and_invalid_are_distinguished() {
    let dir = TempDir::new("outcomes");
    let storage = Arc::new(FileSlotStorage::new(&dir.0).unwrap());
    let store = AnalysisStateStore::new(storage.clone(), "chartData");

    assert!(matches!(store.load(), Err(AppError::StateAbsent)));

    assert_ok!(storage.write("chartData", "{\"ticker\": \"ITUB4\""));
    assert!(matches!(store.load(), Err(AppError::StateCorrupt(_))));

    storage.write("chartData", "{\"ticker\": \"ITUB4\"}").unwrap();
    let stored = store.load().unwrap();
    assert_eq!(stored.as_value()["ticker"], "ITUB4");
    let err = assert_err!(stored.into_result());
    assert!(matches!(err, AppError::StateInvalid(_)));

    assert_ok!(store.clear());
    assert!(matches!(store.load(), Err(AppError::StateAbsent)));
}

#[test]
fn test_save_overwrites_previous_analysis() {
    let dir = TempDir::new("overwrite");
    let store = AnalysisStateStore::new(
        Arc::new(FileSlotStorage::new(&dir.0).unwrap()),
        "chartData",
    );

    store.save(&sample_result()).unwrap();
    let mut newer = sample_result();
    newer.ticker = "BBAS3".to_string();
    store.save(&newer).unwrap();

    let loaded = store.load().and_then(StoredAnalysis::into_result).unwrap();
    assert_eq!(loaded.ticker, "BBAS3");
}
