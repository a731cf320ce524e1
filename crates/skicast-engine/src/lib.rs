//! Forecast load-and-rank engine for SkiCast
//!
//! Cancellable concurrent batch loads with one foreground retry, low-priority
//! background prefetch, and resort ranking over cached forecasts.

pub mod background;
pub mod engine;
pub mod loader;
pub mod ranking;
pub mod retry;
pub mod selection;
pub mod token;

pub use background::BackgroundQueue;
pub use engine::{DayOption, ForecastEngine, LoadState};
pub use loader::{BatchReport, LoadController, LoaderConfig, ResortOutcome};
pub use ranking::{rank, AggregationWindow, DaySelector, Direction, RankingRequest, SortCriterion};
pub use retry::RetryPolicy;
pub use selection::Selection;
pub use token::{BatchToken, GenerationCounter};
