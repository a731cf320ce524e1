//! Resort ranking by temperature, snowfall or wind.
//!
//! Rankings are computed on one forecast day or aggregated over the next
//! 3 or 7 days. The sort is stable, so equal resorts keep their input order
//! and repeated calls with the same inputs give the same ordering. The
//! reverse flag inverts the finished ordering as a last step.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use skicast_forecast::{ForecastDay, ParseSelectorError, PeriodTime, ResortForecast, ResortId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortCriterion {
    #[default]
    Temperature,
    Snowfall,
    Wind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl SortCriterion {
    pub const ALL: [SortCriterion; 3] = [Self::Temperature, Self::Snowfall, Self::Wind];

    /// Coldest first for temperature, most first for snowfall and wind.
    pub fn direction(&self) -> Direction {
        match self {
            Self::Temperature => Direction::Ascending,
            Self::Snowfall | Self::Wind => Direction::Descending,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Temperature => "Sort by Temperature",
            Self::Snowfall => "Sort by Snowfall",
            Self::Wind => "Sort by Wind",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Snowfall => "snowfall",
            Self::Wind => "wind",
        }
    }
}

impl fmt::Display for SortCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortCriterion {
    type Err = ParseSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" => Ok(Self::Temperature),
            "snowfall" => Ok(Self::Snowfall),
            "wind" => Ok(Self::Wind),
            _ => Err(ParseSelectorError::new("sort criterion", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregationWindow {
    #[serde(rename = "next3days")]
    Next3Days,
    #[serde(rename = "next7days")]
    Next7Days,
}

impl AggregationWindow {
    pub const ALL: [AggregationWindow; 2] = [Self::Next3Days, Self::Next7Days];

    pub fn days(&self) -> usize {
        match self {
            Self::Next3Days => 3,
            Self::Next7Days => 7,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Next3Days => "Next 3 Days",
            Self::Next7Days => "Next 7 Days",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Next3Days => "next3days",
            Self::Next7Days => "next7days",
        }
    }
}

/// Which day(s) a ranking looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DaySelector {
    Day(usize),
    Window(AggregationWindow),
}

impl Default for DaySelector {
    fn default() -> Self {
        Self::Day(0)
    }
}

impl fmt::Display for DaySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(index) => write!(f, "{index}"),
            Self::Window(window) => f.write_str(window.as_str()),
        }
    }
}

impl FromStr for DaySelector {
    type Err = ParseSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "next3days" => Ok(Self::Window(AggregationWindow::Next3Days)),
            "next7days" => Ok(Self::Window(AggregationWindow::Next7Days)),
            other => other
                .parse()
                .map(Self::Day)
                .map_err(|_| ParseSelectorError::new("sort day", s)),
        }
    }
}

/// Everything that decides the display order, besides the resorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RankingRequest {
    pub criterion: SortCriterion,
    pub day: DaySelector,
    pub reverse: bool,
}

/// Highest parseable period temperature; `None` when no period parses.
pub fn max_temperature(day: &ForecastDay) -> Option<f64> {
    day.periods
        .iter()
        .filter_map(|p| p.temperature.value())
        .fold(None, |max, t| Some(max.map_or(t, |m: f64| m.max(t))))
}

/// Sum of period snowfall, unparseable periods counting as zero.
pub fn total_snowfall(day: &ForecastDay) -> f64 {
    day.periods
        .iter()
        .map(|p| p.snowfall.value().unwrap_or(0.0))
        .sum()
}

/// PM wind, else Night wind, else zero.
pub fn representative_wind(day: &ForecastDay) -> f64 {
    day.period(PeriodTime::Pm)
        .or_else(|| day.period(PeriodTime::Night))
        .and_then(|p| p.wind_speed.value())
        .unwrap_or(0.0)
}

pub fn day_metric(day: &ForecastDay, criterion: SortCriterion) -> Option<f64> {
    match criterion {
        SortCriterion::Temperature => max_temperature(day),
        SortCriterion::Snowfall => Some(total_snowfall(day)),
        SortCriterion::Wind => Some(representative_wind(day)),
    }
}

/// Average max temperature, or summed snowfall / wind, over `days`.
/// A day with no parseable temperature contributes zero to the average.
pub fn window_metric(days: &[ForecastDay], criterion: SortCriterion) -> Option<f64> {
    if days.is_empty() {
        return None;
    }
    let value = match criterion {
        SortCriterion::Temperature => {
            let total: f64 = days.iter().map(|d| max_temperature(d).unwrap_or(0.0)).sum();
            total / days.len() as f64
        }
        SortCriterion::Snowfall => days.iter().map(total_snowfall).sum(),
        SortCriterion::Wind => days.iter().map(representative_wind).sum(),
    };
    Some(value)
}

/// Ranking key for one resort; `None` when the forecast lacks the data.
pub fn metric(forecast: &ResortForecast, criterion: SortCriterion, day: DaySelector) -> Option<f64> {
    let value = match day {
        DaySelector::Day(index) => forecast.day(index).and_then(|d| day_metric(d, criterion)),
        DaySelector::Window(window) => window_metric(forecast.window(window.days()), criterion),
    };
    value.filter(|v| !v.is_nan())
}

fn compare_keys(a: Option<f64>, b: Option<f64>, direction: Direction) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            match direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Order `resorts` for display.
///
/// `lookup` supplies each resort's forecast for the current elevation.
/// Resorts without data for the requested day keep their relative order
/// after those with data; `reverse` then flips the whole list.
pub fn rank<L, B>(resorts: &[ResortId], mut lookup: L, request: &RankingRequest) -> Vec<ResortId>
where
    L: FnMut(&ResortId) -> Option<B>,
    B: Borrow<ResortForecast>,
{
    let direction = request.criterion.direction();
    let mut keyed: Vec<(&ResortId, Option<f64>)> = resorts
        .iter()
        .map(|id| {
            let key = lookup(id).and_then(|f| metric(f.borrow(), request.criterion, request.day));
            (id, key)
        })
        .collect();

    keyed.sort_by(|(_, a), (_, b)| compare_keys(*a, *b, direction));

    let mut ordered: Vec<ResortId> = keyed.into_iter().map(|(id, _)| id.clone()).collect();
    if request.reverse {
        ordered.reverse();
    }
    ordered
}
