//! JSON-file backed statistics store
//!
//! The file holds a single object mapping ISO dates to counts:
//! `{"2025-01-01": 500, "2025-01-02": 1200}`. A missing file is an empty
//! store. Writes go to a sibling temporary file under a lock, which is then
//! renamed over the target so a crash never leaves a half-written history.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use tokio::sync::Mutex;
use tracing::debug;

use super::{CountFn, StatisticsStore, StoreError};
use crate::clock::{Clock, LocalClock};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
    live_count: CountFn,
    clock: Arc<dyn Clock>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, live_count: CountFn) -> Self {
        Self::with_clock(path, live_count, Arc::new(LocalClock))
    }

    pub fn with_clock(path: impl Into<PathBuf>, live_count: CountFn, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            live_count,
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record in the file
    pub async fn load_all(&self) -> Result<BTreeMap<NaiveDate, u64>, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "statistics file not found, starting empty");
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let raw: BTreeMap<String, u64> = serde_json::from_str(&text)?;
        raw.into_iter()
            .map(|(key, count)| {
                NaiveDate::parse_from_str(&key, DATE_FORMAT)
                    .map(|date| (date, count))
                    .map_err(|e| StoreError::Corrupt(format!("{}: {}", key, e)))
            })
            .collect()
    }

    async fn write_all(&self, records: &BTreeMap<NaiveDate, u64>) -> Result<(), StoreError> {
        let raw: BTreeMap<String, u64> = records
            .iter()
            .map(|(date, count)| (date.format(DATE_FORMAT).to_string(), *count))
            .collect();
        let json = serde_json::to_string_pretty(&raw)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let staging = self.staging_path();
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "statistics.json".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }
}

#[async_trait]
impl StatisticsStore for JsonFileStore {
    async fn get_statistics(&self, date: NaiveDate) -> Result<Option<u64>, StoreError> {
        Ok(self.load_all().await?.get(&date).copied())
    }

    async fn get_year_statistics(&self, year: i32) -> Result<Vec<(NaiveDate, u64)>, StoreError> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|(date, _)| date.year() == year)
            .collect())
    }

    async fn update_statistics(&self, date: NaiveDate, count: u64) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load_all().await?;
        records.insert(date, count);
        self.write_all(&records).await
    }

    async fn save_current_count(&self) -> Result<(), StoreError> {
        let today = self.clock.today();
        let count = (self.live_count)();
        self.update_statistics(today, count).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn temp_path(test_name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("platter-test-{}-{}", test_name, uuid::Uuid::new_v4()))
            .join("statistics.json")
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let path = temp_path("missing");
        let store = JsonFileStore::new(&path, Arc::new(|| 0));

        assert_eq!(store.get_statistics(date(2025, 1, 1)).await.unwrap(), None);
        assert!(store.get_year_statistics(2025).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_creates_file_and_upserts() {
        let path = temp_path("upsert");
        let store = JsonFileStore::new(&path, Arc::new(|| 0));

        store.update_statistics(date(2025, 1, 1), 100).await.unwrap();
        store.update_statistics(date(2025, 1, 2), 300).await.unwrap();
        store.update_statistics(date(2025, 1, 1), 200).await.unwrap();

        assert!(path.exists());
        assert_eq!(store.get_statistics(date(2025, 1, 1)).await.unwrap(), Some(200));
        assert_eq!(
            store.get_year_statistics(2025).await.unwrap(),
            vec![(date(2025, 1, 1), 200), (date(2025, 1, 2), 300)]
        );

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"2025-01-02\": 300"));
        cleanup(&path);
    }

    #[tokio::test]
    async fn test_write_replaces_file_without_leaving_staging_copy() {
        let path = temp_path("staging");
        let store = JsonFileStore::new(&path, Arc::new(|| 0));
        store.update_statistics(date(2025, 4, 1), 10).await.unwrap();

        // a leftover from an interrupted write is overwritten, not read
        let staging = store.staging_path();
        assert_eq!(staging.parent(), path.parent());
        std::fs::write(&staging, "{ truncated").unwrap();

        store.update_statistics(date(2025, 4, 2), 20).await.unwrap();

        assert!(!staging.exists());
        assert_eq!(
            store.get_year_statistics(2025).await.unwrap(),
            vec![(date(2025, 4, 1), 10), (date(2025, 4, 2), 20)]
        );
        cleanup(&path);
    }

    #[tokio::test]
    async fn test_save_current_count() {
        let path = temp_path("save");
        let store = JsonFileStore::with_clock(
            &path,
            Arc::new(|| 77),
            Arc::new(FixedClock(date(2024, 2, 29))),
        );

        store.save_current_count().await.unwrap();
        assert_eq!(store.get_year_statistics(2024).await.unwrap(), vec![(date(2024, 2, 29), 77)]);
        cleanup(&path);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_reported() {
        let path = temp_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"2025-13-01": 5}"#).unwrap();

        let store = JsonFileStore::new(&path, Arc::new(|| 0));
        assert!(matches!(
            store.get_year_statistics(2025).await,
            Err(StoreError::Corrupt(_))
        ));
        cleanup(&path);
    }
}
