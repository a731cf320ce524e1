//! Forecast data for SkiCast
//!
//! Resort forecast model, the (resort, elevation) cache, the fetcher seam
//! with an HTTP implementation, and the resort catalog.

pub mod cache;
pub mod error;
pub mod provider;
pub mod resorts;
pub mod types;

pub use cache::ForecastCache;
pub use error::{FetchError, ParseSelectorError};
pub use provider::{ForecastFetcher, HttpFetcher};
pub use resorts::ResortCatalog;
pub use types::*;
