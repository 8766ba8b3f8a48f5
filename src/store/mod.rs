//! Statistics store interface
//!
//! The store keeps one note count per calendar day. It is an external
//! collaborator: the core only talks to it through [`StatisticsStore`], and
//! every call may suspend or fail.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// Reads the live session note count
pub type CountFn = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Errors reported by a statistics store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt store entry: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait StatisticsStore: Send + Sync {
    /// Count recorded for one day, if any
    async fn get_statistics(&self, date: NaiveDate) -> Result<Option<u64>, StoreError>;

    /// All records of a year, ordered by date
    async fn get_year_statistics(&self, year: i32) -> Result<Vec<(NaiveDate, u64)>, StoreError>;

    /// Insert or overwrite the count for a day
    async fn update_statistics(&self, date: NaiveDate, count: u64) -> Result<(), StoreError>;

    /// Persist the live session count under today's date
    async fn save_current_count(&self) -> Result<(), StoreError>;
}
