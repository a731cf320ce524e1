//! Forecast acquisition.
//!
//! [`ForecastFetcher`] is the seam the load engine calls through. Fetchers
//! own no caching and no retry logic; [`HttpFetcher`] reads structured JSON
//! forecasts from an HTTP source and bounds each request with a timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::error::FetchError;
use crate::types::{ElevationBand, ForecastDay, ResortForecast, ResortId};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const USER_AGENT: &str = "SkiCast/0.1.0";

/// Produces a parsed forecast for one resort at one elevation band.
pub trait ForecastFetcher: Send + Sync {
    fn fetch(
        &self,
        resort: &ResortId,
        elevation: ElevationBand,
    ) -> impl Future<Output = Result<ResortForecast, FetchError>> + Send;
}

impl<T: ForecastFetcher> ForecastFetcher for Arc<T> {
    fn fetch(
        &self,
        resort: &ResortId,
        elevation: ElevationBand,
    ) -> impl Future<Output = Result<ResortForecast, FetchError>> + Send {
        (**self).fetch(resort, elevation)
    }
}

/// Source payload. Name and elevation label are optional; missing ones are
/// filled from the request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastPayload {
    #[serde(default, alias = "name")]
    display_name: Option<String>,
    #[serde(default, alias = "elevation")]
    elevation_label: Option<String>,
    days: Vec<ForecastDay>,
}

impl ForecastPayload {
    fn into_forecast(self, resort: &ResortId, elevation: ElevationBand) -> ResortForecast {
        ResortForecast {
            display_name: self
                .display_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| resort.display_name()),
            elevation_label: self
                .elevation_label
                .unwrap_or_else(|| elevation.label().to_string()),
            resort_id: resort.clone(),
            days: self.days,
            fetched_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Arc<Client>,
    base_url: Url,
}

impl HttpFetcher {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let base_url =
            Url::parse(base_url).map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
        })
    }

    /// `{base}/resorts/{resort}/6day/{bot|mid|top}`
    pub fn forecast_url(&self, resort: &ResortId, elevation: ElevationBand) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["resorts", resort.as_str(), "6day", elevation.path_segment()]);
        Ok(url)
    }

    async fn fetch_forecast(
        &self,
        resort: &ResortId,
        elevation: ElevationBand,
    ) -> Result<ResortForecast, FetchError> {
        let url = self.forecast_url(resort, elevation)?;
        tracing::debug!("Fetching {} ({}) from {}", resort, elevation, url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::UnknownResort(resort.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                resort: resort.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let payload: ForecastPayload =
            serde_json::from_str(&body).map_err(|e| FetchError::Parse(format!("{resort}: {e}")))?;
        if payload.days.is_empty() {
            return Err(FetchError::Parse(format!("{resort}: forecast has no days")));
        }

        Ok(payload.into_forecast(resort, elevation))
    }
}

impl ForecastFetcher for HttpFetcher {
    fn fetch(
        &self,
        resort: &ResortId,
        elevation: ElevationBand,
    ) -> impl Future<Output = Result<ResortForecast, FetchError>> + Send {
        let resort = resort.clone();
        async move { self.fetch_forecast(&resort, elevation).await }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(base: &str) -> HttpFetcher {
        HttpFetcher::new(base, Duration::from_secs(DEFAULT_TIMEOUT_SECS), USER_AGENT).unwrap()
    }

    fn payload() -> serde_json::Value {
        serde_json::json!({
            "name": "Big White",
            "days": [
                {
                    "name": "Monday 12",
                    "periods": [
                        {"time": "AM", "temp": "-4", "snow": "3", "wind": "10"},
                        {"time": "PM", "temp": "-1", "snow": "1", "wind": "25"},
                        {"time": "Night", "temp": "-7", "snow": "—", "wind": "15"}
                    ],
                    "freezingLevel": "900m",
                    "snowConditionSummary": {"text": "Powder day", "highlight": true}
                }
            ]
        })
    }

    #[test]
    fn test_forecast_url_segments() {
        let f = fetcher("https://forecast.example.com/api");
        let url = f.forecast_url(&"Big-White".into(), ElevationBand::Peak).unwrap();
        assert_eq!(url.as_str(), "https://forecast.example.com/api/resorts/Big-White/6day/top");

        let f = fetcher("https://forecast.example.com/");
        let url = f.forecast_url(&"Apex".into(), ElevationBand::Base).unwrap();
        assert_eq!(url.as_str(), "https://forecast.example.com/resorts/Apex/6day/bot");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let err = HttpFetcher::new("not a url", Duration::from_secs(1), USER_AGENT).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/resorts/Big-White/6day/mid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload()))
            .mount(&mock_server)
            .await;

        let forecast = fetcher(&mock_server.uri())
            .fetch(&"Big-White".into(), ElevationBand::Mid)
            .await
            .unwrap();

        assert_eq!(forecast.resort_id.as_str(), "Big-White");
        assert_eq!(forecast.display_name, "Big White");
        assert_eq!(forecast.elevation_label, "Mid Forecast");
        assert_eq!(forecast.days.len(), 1);
        assert_eq!(forecast.days[0].periods.len(), 3);
        assert!(forecast.days[0].snow_conditions.highlight);
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_unknown_resort() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let err = fetcher(&mock_server.uri())
            .fetch(&"Nowhere".into(), ElevationBand::Base)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::UnknownResort(ref id) if id == "Nowhere"));
    }

    #[tokio::test]
    async fn test_fetch_server_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let err = fetcher(&mock_server.uri())
            .fetch(&"Apex".into(), ElevationBand::Base)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_fetch_malformed_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&mock_server)
            .await;

        let err = fetcher(&mock_server.uri())
            .fetch(&"Apex".into(), ElevationBand::Base)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_fetch_empty_days_is_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"days": []})))
            .mount(&mock_server)
            .await;

        let err = fetcher(&mock_server.uri())
            .fetch(&"Apex".into(), ElevationBand::Base)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
