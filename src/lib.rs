//! Platter - state core for a 7-key turntable controller visualizer
//!
//! Platter turns the controller's `gamepad-input` event stream into snapshots
//! a view can render, and turns stored daily note counts into a year heatmap:
//! payload → decode → key/wheel state machine (with spin debounce) →
//! published snapshot, and store → calendar aggregation → published stats view.
//!
//! ## Modules
//!
//! - **Controller**: [`decoder`], [`tracker`] and [`session`] drive the live
//!   controller view
//! - **Statistics**: [`store`], [`calendar`] and [`stats`] drive the heatmap

pub mod calendar;
pub mod clock;
pub mod config;
pub mod decoder;
pub mod error;
pub mod schema;
pub mod session;
pub mod stats;
pub mod store;
pub mod tracker;
pub mod types;

pub use calendar::CalendarAggregator;
pub use clock::{Clock, FixedClock, LocalClock};
pub use config::PlatterConfig;
pub use decoder::{EventDecoder, Instruction};
pub use error::PlatterError;
pub use session::{event_channel, ControllerSession, EventReceiver, EventSender};
pub use stats::{StatsController, StatsView};
pub use store::{CountFn, JsonFileStore, MemoryStore, StatisticsStore, StoreError};

// Schema exports
pub use schema::{GamepadPayload, PayloadReader, GAMEPAD_CHANNEL};

/// Platter version reported by the CLI
pub const PLATTER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "platter";
