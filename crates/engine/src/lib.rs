//! State engine for infinitely scrolling month calendars.
//!
//! The engine keeps a contiguous [`MonthWindow`] of materialized months, loads
//! their events through an injected [`EventSource`] into a bounded
//! [`EventCache`], and elects the active month from viewport visibility.
//! Rendering is left to the host: it reads [`MonthGrid`]s and
//! [`EngineSnapshot`]s and feeds back scroll and visibility input.
//!
//! # Data flow
//!
//! ```text
//! ScrollGate ─▶ MonthWindow::extend_* ─▶ PreloadPlanner ─▶ Loader::request_range
//!                                                             │
//!                     EventSource::fetch ◀── retry ◀──────────┘
//!                             │
//!                     EventMapper::map_batch ─▶ EventCache ─▶ compose_month
//! ```
//!
//! [`CalendarEngine`] wires the pieces together; each one is also usable on
//! its own.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod layout;
pub mod loader;
pub mod mapper;
pub mod scroll;
pub mod source;
pub mod viewport;
pub mod window;

pub use almanac_primitives::{Month, MonthRange, NaiveDate};
pub use cache::{CacheDiagnostics, EventCache, MonthEvents};
pub use config::{ConfigError, EngineConfig, LayoutConfig, RetryPolicy, ScrollConfig, ViewportConfig};
pub use engine::{CalendarEngine, EngineBuilder, EngineSnapshot};
pub use error::{FetchError, LoadError, TransformError};
pub use event::{EventRecord, EventWhen};
pub use layout::{AutoHeight, MonthGrid, compose_month, initial_scroll_offset};
pub use loader::{LoadStatus, Loader, MonthOutcome, PreloadPlan, PreloadPlanner, RangeLoadedFn, RangeRequest};
pub use mapper::{EventMapper, FieldMapping};
pub use scroll::{Edge, ScrollGate, ScrollMetrics};
pub use source::{EventSource, FnSource, JsonFileSource};
pub use viewport::{Election, ViewportSample, ViewportTracker};
pub use window::MonthWindow;
