//! In-process statistics store

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};

use super::{CountFn, StatisticsStore, StoreError};
use crate::clock::{Clock, LocalClock};

pub struct MemoryStore {
    records: Mutex<BTreeMap<NaiveDate, u64>>,
    live_count: CountFn,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(live_count: CountFn) -> Self {
        Self::with_clock(live_count, Arc::new(LocalClock))
    }

    pub fn with_clock(live_count: CountFn, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            live_count,
            clock,
        }
    }

    /// Seed records, replacing any existing entry for the same day
    pub fn with_records(self, records: impl IntoIterator<Item = (NaiveDate, u64)>) -> Self {
        if let Ok(mut map) = self.records.lock() {
            map.extend(records);
        }
        self
    }

    fn records(&self) -> Result<MutexGuard<'_, BTreeMap<NaiveDate, u64>>, StoreError> {
        self.records
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Failed to lock records: {}", e)))
    }
}

#[async_trait]
impl StatisticsStore for MemoryStore {
    async fn get_statistics(&self, date: NaiveDate) -> Result<Option<u64>, StoreError> {
        Ok(self.records()?.get(&date).copied())
    }

    async fn get_year_statistics(&self, year: i32) -> Result<Vec<(NaiveDate, u64)>, StoreError> {
        Ok(self
            .records()?
            .iter()
            .filter(|(date, _)| date.year() == year)
            .map(|(date, count)| (*date, *count))
            .collect())
    }

    async fn update_statistics(&self, date: NaiveDate, count: u64) -> Result<(), StoreError> {
        self.records()?.insert(date, count);
        Ok(())
    }

    async fn save_current_count(&self) -> Result<(), StoreError> {
        let today = self.clock.today();
        let count = (self.live_count)();
        self.update_statistics(today, count).await
    }
}
