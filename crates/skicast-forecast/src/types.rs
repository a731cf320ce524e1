use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseSelectorError;

/// Resort identifier as used by the forecast source (e.g. `"Big-White"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResortId(String);

impl ResortId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable name: hyphens become spaces.
    pub fn display_name(&self) -> String {
        self.0.replace('-', " ")
    }
}

impl fmt::Display for ResortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResortId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ResortId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ResortId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Forecast altitude variant for a resort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ElevationBand {
    #[default]
    #[serde(alias = "bot")]
    Base,
    Mid,
    #[serde(alias = "top")]
    Peak,
}

impl ElevationBand {
    pub const ALL: [ElevationBand; 3] = [Self::Base, Self::Mid, Self::Peak];

    /// Path segment used by the forecast source.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Base => "bot",
            Self::Mid => "mid",
            Self::Peak => "top",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Base => "Base Forecast",
            Self::Mid => "Mid Forecast",
            Self::Peak => "Peak Forecast",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Mid => "mid",
            Self::Peak => "peak",
        }
    }
}

impl fmt::Display for ElevationBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElevationBand {
    type Err = ParseSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base" | "bot" => Ok(Self::Base),
            "mid" => Ok(Self::Mid),
            "peak" | "top" => Ok(Self::Peak),
            _ => Err(ParseSelectorError::new("elevation band", s)),
        }
    }
}

/// Part of the day a forecast period covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodTime {
    #[serde(rename = "AM")]
    Am,
    #[serde(rename = "PM")]
    Pm,
    Night,
    #[serde(other)]
    Other,
}

/// A raw numeric reading as published by the source (`"-3"`, `"1.5cm"`, `"—"`).
///
/// The text is kept verbatim; [`Reading::value`] reads the leading number,
/// so unit suffixes are ignored and placeholders yield `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawReading", into = "String")]
pub struct Reading(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawReading {
    Number(f64),
    Text(String),
    Missing(()),
}

impl From<RawReading> for Reading {
    fn from(raw: RawReading) -> Self {
        match raw {
            RawReading::Number(n) => Self(n.to_string()),
            RawReading::Text(s) => Self(s),
            RawReading::Missing(()) => Self::default(),
        }
    }
}

impl From<Reading> for String {
    fn from(reading: Reading) -> Self {
        reading.0
    }
}

impl From<&str> for Reading {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Self(value.to_string())
    }
}

impl Reading {
    pub fn raw(&self) -> &str {
        &self.0
    }

    pub fn value(&self) -> Option<f64> {
        leading_number(&self.0)
    }
}

/// Parse the longest numeric prefix of `raw`, skipping leading whitespace.
fn leading_number(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();

    let sign = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let count_digits = |from: usize| {
        bytes
            .get(from..)
            .map(|rest| rest.iter().take_while(|b| b.is_ascii_digit()).count())
            .unwrap_or(0)
    };

    let int_digits = count_digits(sign);
    let mut end = sign + int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(end + 1);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits + frac_digits == 0 {
        return None;
    }
    s[..end].parse().ok()
}

/// One AM/PM/Night slice of a forecast day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    pub time: PeriodTime,
    #[serde(default, alias = "temp")]
    pub temperature: Reading,
    #[serde(default, alias = "snow")]
    pub snowfall: Reading,
    #[serde(default, alias = "rain")]
    pub rainfall: Reading,
    #[serde(default, alias = "wind")]
    pub wind_speed: Reading,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub freezing_level: String,
}

/// Snow conditions headline shown on a day card.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnowConditions {
    pub text: String,
    #[serde(default)]
    pub highlight: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub name: String,
    pub periods: Vec<ForecastPeriod>,
    #[serde(default)]
    pub freezing_level: String,
    #[serde(default, rename = "snowConditionSummary")]
    pub snow_conditions: SnowConditions,
}

impl ForecastDay {
    /// First period covering `time`, if the day has one.
    pub fn period(&self, time: PeriodTime) -> Option<&ForecastPeriod> {
        self.periods.iter().find(|p| p.time == time)
    }
}

/// Full multi-day forecast for one resort at one elevation band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResortForecast {
    pub resort_id: ResortId,
    pub display_name: String,
    pub elevation_label: String,
    /// Chronological, day 0 is today.
    pub days: Vec<ForecastDay>,
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

impl ResortForecast {
    pub fn day(&self, index: usize) -> Option<&ForecastDay> {
        self.days.get(index)
    }

    /// The first `days` days, clamped to what the forecast actually has.
    pub fn window(&self, days: usize) -> &[ForecastDay] {
        &self.days[..days.min(self.days.len())]
    }

    pub fn day_names(&self) -> Vec<String> {
        self.days.iter().map(|d| d.name.clone()).collect()
    }
}

/// Cache key: one entry per resort per elevation band.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub resort: ResortId,
    pub elevation: ElevationBand,
}

impl CacheKey {
    pub fn new(resort: ResortId, elevation: ElevationBand) -> Self {
        Self { resort, elevation }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.resort, self.elevation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_leading_number() {
        assert_eq!(Reading::from("-3").value(), Some(-3.0));
        assert_eq!(Reading::from("1.5cm").value(), Some(1.5));
        assert_eq!(Reading::from("  12 km/h").value(), Some(12.0));
        assert_eq!(Reading::from(".5").value(), Some(0.5));
        assert_eq!(Reading::from("7.").value(), Some(7.0));
        assert_eq!(Reading::from("+2").value(), Some(2.0));
    }

    #[test]
    fn test_reading_unparseable() {
        assert_eq!(Reading::from("—").value(), None);
        assert_eq!(Reading::from("-").value(), None);
        assert_eq!(Reading::from("").value(), None);
        assert_eq!(Reading::from("n/a").value(), None);
        assert_eq!(Reading::from(".").value(), None);
    }

    #[test]
    fn test_reading_accepts_numbers_and_null() {
        let readings: Vec<Reading> = serde_json::from_str(r#"[4, "2cm", null]"#).unwrap();
        assert_eq!(readings[0].value(), Some(4.0));
        assert_eq!(readings[1].value(), Some(2.0));
        assert_eq!(readings[2].value(), None);
    }

    #[test]
    fn test_elevation_band_parse() {
        assert_eq!("bot".parse::<ElevationBand>().unwrap(), ElevationBand::Base);
        assert_eq!("Mid".parse::<ElevationBand>().unwrap(), ElevationBand::Mid);
        assert_eq!("top".parse::<ElevationBand>().unwrap(), ElevationBand::Peak);
        assert_eq!("peak".parse::<ElevationBand>().unwrap(), ElevationBand::Peak);
        assert!("summit".parse::<ElevationBand>().is_err());
    }

    #[test]
    fn test_elevation_band_serde_aliases() {
        let band: ElevationBand = serde_json::from_str(r#""top""#).unwrap();
        assert_eq!(band, ElevationBand::Peak);
        assert_eq!(serde_json::to_string(&ElevationBand::Base).unwrap(), r#""base""#);
        assert_eq!(ElevationBand::Base.path_segment(), "bot");
    }

    #[test]
    fn test_resort_display_name() {
        assert_eq!(ResortId::from("Mt-Baldy-Ski-Area").display_name(), "Mt Baldy Ski Area");
        assert_eq!(ResortId::from("Fernie").display_name(), "Fernie");
    }

    #[test]
    fn test_period_from_source_keys() {
        let json = r#"{"time": "PM", "temp": "-2", "snow": "5", "wind": "20", "condition": "snow"}"#;
        let period: ForecastPeriod = serde_json::from_str(json).unwrap();
        assert_eq!(period.time, PeriodTime::Pm);
        assert_eq!(period.temperature.value(), Some(-2.0));
        assert_eq!(period.snowfall.value(), Some(5.0));
        assert_eq!(period.wind_speed.value(), Some(20.0));
        assert_eq!(period.rainfall.value(), None);
    }

    #[test]
    fn test_unknown_period_time() {
        let period: ForecastPeriod = serde_json::from_str(r#"{"time": "Evening"}"#).unwrap();
        assert_eq!(period.time, PeriodTime::Other);
    }

    #[test]
    fn test_window_is_clamped() {
        let day = ForecastDay {
            name: "Mon".into(),
            periods: vec![],
            freezing_level: String::new(),
            snow_conditions: SnowConditions::default(),
        };
        let forecast = ResortForecast {
            resort_id: "Apex".into(),
            display_name: "Apex".into(),
            elevation_label: ElevationBand::Base.label().into(),
            days: vec![day; 4],
            fetched_at: Utc::now(),
        };
        assert_eq!(forecast.window(7).len(), 4);
        assert_eq!(forecast.window(3).len(), 3);
        assert!(forecast.day(4).is_none());
    }

    #[test]
    fn test_cache_key_display() {
        let key = CacheKey::new("Sun-Peaks".into(), ElevationBand::Mid);
        assert_eq!(key.to_string(), "Sun-Peaks@mid");
    }
}
