//! Persisted analysis handoff.
//!
//! A single slot, keyed by a fixed name, carries the most recent analysis
//! from the process that ran it to a separately started display process.

use crate::error::{AppError, Result};
use crate::types::AnalysisResult;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Raw text storage addressed by key.
pub trait SlotStorage: Send + Sync {
    /// Read a slot. `Ok(None)` when the slot was never written.
    fn read(&self, key: &str) -> io::Result<Option<String>>;

    /// Replace the slot contents.
    fn write(&self, key: &str, value: &str) -> io::Result<()>;

    /// Remove the slot. Removing a missing slot is not an error.
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Slot storage backed by one JSON file per key.
pub struct FileSlotStorage {
    dir: PathBuf,
}

impl FileSlotStorage {
    /// Create a file slot storage rooted at `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Get the slot file path for a key.
    fn get_path(&self, key: &str) -> PathBuf {
        // Sanitize key for filesystem
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        self.dir.join(format!("{}.json", safe_key))
    }
}

impl SlotStorage for FileSlotStorage {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.get_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        let path = self.get_path(key);
        let tmp = path.with_extension("json.tmp");
        // Rename is atomic, so readers see either the old or the new value.
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!("Wrote slot {} to {:?}", key, path);
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.get_path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-memory slot storage.
#[derive(Default)]
pub struct MemorySlotStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySlotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.slots
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "slot storage lock poisoned"))
    }
}

impl SlotStorage for MemorySlotStorage {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Syntactically valid slot contents whose shape has not been checked yet.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAnalysis(serde_json::Value);

impl StoredAnalysis {
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Validate the stored shape and convert it into an analysis result.
    pub fn into_result(self) -> Result<AnalysisResult> {
        serde_json::from_value(self.0).map_err(|e| AppError::StateInvalid(e.to_string()))
    }
}

/// Single-slot store for the most recent analysis.
pub struct AnalysisStateStore {
    storage: Arc<dyn SlotStorage>,
    key: String,
}

impl AnalysisStateStore {
    pub fn new(storage: Arc<dyn SlotStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Serialize `result` into the slot, replacing whatever was there.
    pub fn save(&self, result: &AnalysisResult) -> Result<()> {
        let text = serde_json::to_string(result)?;
        self.storage.write(&self.key, &text)?;
        info!("Saved analysis for {} to slot {}", result.ticker, self.key);
        Ok(())
    }

    /// Read and parse the slot.
    ///
    /// Returns [`AppError::StateAbsent`] when nothing was saved and
    /// [`AppError::StateCorrupt`] when the contents are not valid JSON.
    pub fn load(&self) -> Result<StoredAnalysis> {
        let text = match self.storage.read(&self.key) {
            Ok(Some(text)) => text,
            Ok(None) => return Err(AppError::StateAbsent),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!("Slot {} is not valid UTF-8", self.key);
                return Err(AppError::StateCorrupt(e.to_string()));
            }
            Err(e) => return Err(AppError::Storage(e)),
        };

        serde_json::from_str(&text)
            .map(StoredAnalysis)
            .map_err(|e| AppError::StateCorrupt(e.to_string()))
    }

    /// Remove the slot.
    pub fn clear(&self) -> Result<()> {
        self.storage.remove(&self.key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Horizon, HorizonUnit, RawChartData, RawPoint, RiskProfile};
    use serde_json::json;

    fn create_test_dir(name: &str) -> PathBuf {
        let dir = PathBuf::from(format!(".test_slots_{}", name));
        if dir.exists() {
            let _ = fs::remove_dir_all(&dir);
        }
        dir
    }

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            ticker: "PETR4".to_string(),
            signal: "COMPRA 🚀".to_string(),
            confidence: 0.82,
            current_price: 38.5,
            predicted_price: 41.2,
            variation_pct: 7.01,
            horizon: Horizon {
                count: 30,
                unit: HorizonUnit::Days,
            },
            profile: Some(RiskProfile::Moderate),
            chart_data: RawChartData {
                candles: vec![RawPoint {
                    x: json!(1700000000000i64),
                    y: json!([38.0, 38.9, 37.8, 38.5]),
                }],
                vwap: Some(vec![RawPoint {
                    x: json!(1700000000000i64),
                    y: json!(null),
                }]),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = AnalysisStateStore::new(Arc::new(MemorySlotStorage::new()), "chartData");
        let result = sample_result();

        store.save(&result).unwrap();
        let loaded = store.load().unwrap().into_result().unwrap();

        assert_eq!(loaded, result);
    }

    #[test]
    fn test_load_absent() {
        let store = AnalysisStateStore::new(Arc::new(MemorySlotStorage::new()), "chartData");
        assert!(matches!(store.load(), Err(AppError::StateAbsent)));
    }

    #[test]
    fn test_load_corrupt() {
        let storage = Arc::new(MemorySlotStorage::new());
        storage.write("chartData", "{not json").unwrap();
        let store = AnalysisStateStore::new(storage, "chartData");

        assert!(matches!(store.load(), Err(AppError::StateCorrupt(_))));
    }

    #[test]
    fn test_valid_json_with_wrong_shape_is_invalid_not_corrupt() {
        let storage = Arc::new(MemorySlotStorage::new());
        storage.write("chartData", r#"{"ticker": 5}"#).unwrap();
        let store = AnalysisStateStore::new(storage, "chartData");

        let stored = store.load().unwrap();
        assert_eq!(stored.as_value()["ticker"], 5);
        assert!(matches!(stored.into_result(), Err(AppError::StateInvalid(_))));
    }

    #[test]
    fn test_save_overwrites_single_slot() {
        let store = AnalysisStateStore::new(Arc::new(MemorySlotStorage::new()), "chartData");
        let first = sample_result();
        let mut second = sample_result();
        second.ticker = "VALE3".to_string();

        store.save(&first).unwrap();
        store.save(&second).unwrap();

        let loaded = store.load().unwrap().into_result().unwrap();
        assert_eq!(loaded.ticker, "VALE3");
    }

    #[test]
    fn test_file_store_round_trip_and_clear() {
        let dir = create_test_dir("round_trip");
        let storage = Arc::new(FileSlotStorage::new(&dir).unwrap());
        let store = AnalysisStateStore::new(storage, "chartData");
        let result = sample_result();

        store.save(&result).unwrap();
        assert!(dir.join("chartData.json").exists());
        assert!(!dir.join("chartData.json.tmp").exists());
        assert_eq!(store.load().unwrap().into_result().unwrap(), result);

        store.clear().unwrap();
        assert!(matches!(store.load(), Err(AppError::StateAbsent)));
        // Clearing twice is fine.
        store.clear().unwrap();

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_store_invalid_utf8_is_corrupt() {
        let dir = create_test_dir("utf8");
        let storage = Arc::new(FileSlotStorage::new(&dir).unwrap());
        fs::write(dir.join("chartData.json"), [0xff, 0xfe, 0x00]).unwrap();
        let store = AnalysisStateStore::new(storage, "chartData");

        assert!(matches!(store.load(), Err(AppError::StateCorrupt(_))));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_slot_key_sanitization() {
        let dir = create_test_dir("sanitize");
        let storage = FileSlotStorage::new(&dir).unwrap();

        storage.write("chart/data:latest", "{}").unwrap();
        assert_eq!(storage.read("chart/data:latest").unwrap(), Some("{}".to_string()));
        assert!(dir.join("chart_data_latest.json").exists());

        let _ = fs::remove_dir_all(&dir);
    }
}
