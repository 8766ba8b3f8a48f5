//! Statistics view controller
//!
//! Owns the published [`StatsView`]: the selected year, its sparse daily
//! counts and the aggregated month blocks. Store calls may suspend; the last
//! good view stays readable the whole time and is only replaced once a fetch
//! succeeds.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::calendar::CalendarAggregator;
use crate::clock::Clock;
use crate::error::PlatterError;
use crate::store::StatisticsStore;
use crate::types::{MonthBlock, WeekStart};

/// Everything the statistics view renders, published as one value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsView {
    pub year: i32,
    pub stats: BTreeMap<NaiveDate, u64>,
    pub months: Vec<MonthBlock>,
    /// True while a refresh is in flight
    pub busy: bool,
}

pub struct StatsController<S: StatisticsStore + ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    week_start: WeekStart,
    view_tx: watch::Sender<StatsView>,
    busy: AtomicBool,
}

impl<S: StatisticsStore + ?Sized> StatsController<S> {
    /// Create a controller showing an empty current year.
    ///
    /// Nothing is fetched until [`select_year`](Self::select_year) or
    /// [`refresh`](Self::refresh) is called.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, week_start: WeekStart) -> Self {
        let today = clock.today();
        let year = today.year();
        let stats = BTreeMap::new();
        let months = CalendarAggregator::aggregate(year, &stats, today, week_start).unwrap_or_default();

        let (view_tx, _) = watch::channel(StatsView {
            year,
            stats,
            months,
            busy: false,
        });

        Self {
            store,
            clock,
            week_start,
            view_tx,
            busy: AtomicBool::new(false),
        }
    }

    pub fn view(&self) -> StatsView {
        self.view_tx.borrow().clone()
    }

    /// Receiver that is notified on every published view
    pub fn subscribe_view(&self) -> watch::Receiver<StatsView> {
        self.view_tx.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    /// Load `year` and publish it.
    ///
    /// The year, the counts and the month blocks are swapped in together. On
    /// failure the previous view stays published.
    pub async fn select_year(&self, year: i32) -> Result<(), PlatterError> {
        let records = self.store.get_year_statistics(year).await.map_err(|e| {
            warn!(operation = "get_year_statistics", year, error = %e, "failed to load statistics");
            PlatterError::store("get_year_statistics", year, e)
        })?;

        let stats: BTreeMap<NaiveDate, u64> = records.into_iter().collect();
        let months = CalendarAggregator::aggregate(year, &stats, self.clock.today(), self.week_start)?;
        debug!(year, days = stats.len(), "statistics loaded");

        self.view_tx.send_modify(|view| {
            view.year = year;
            view.stats = stats;
            view.months = months;
        });
        Ok(())
    }

    /// Persist the live count for today, then reload the selected year.
    ///
    /// Only one refresh runs at a time; a second call while one is in flight
    /// returns [`PlatterError::RefreshInProgress`]. If persisting fails the
    /// reload is skipped.
    pub async fn refresh(&self) -> Result<(), PlatterError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("refresh already in progress");
            return Err(PlatterError::RefreshInProgress);
        }
        let _busy = BusyGuard::engage(&self.busy, &self.view_tx);

        let today = self.clock.today();
        self.store.save_current_count().await.map_err(|e| {
            error!(operation = "save_current_count", date = %today, error = %e, "failed to persist current count");
            PlatterError::store("save_current_count", today, e)
        })?;

        let year = self.view_tx.borrow().year;
        self.select_year(year).await?;
        info!(year, "statistics refreshed");
        Ok(())
    }
}

/// Clears the busy latch and the published flag on every exit path
struct BusyGuard<'a> {
    busy: &'a AtomicBool,
    view_tx: &'a watch::Sender<StatsView>,
}

impl<'a> BusyGuard<'a> {
    fn engage(busy: &'a AtomicBool, view_tx: &'a watch::Sender<StatsView>) -> Self {
        view_tx.send_modify(|view| view.busy = true);
        Self { busy, view_tx }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.view_tx.send_modify(|view| view.busy = false);
        self.busy.store(false, Ordering::Release);
    }
}
