use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::FeatureError;
use crate::weather::WeatherObservation;

pub const N_FEATURES: usize = 11;

/// Model input columns, in the order the model is trained on.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "weather_code",
    "temperature_2m_max",
    "temperature_2m_min",
    "rain_sum",
    "snowfall_sum",
    "precipitation_hours",
    "wind_speed_10m_max",
    "day",
    "month",
    "dayofweek",
    "season_number",
];

/// 1 = winter, 2 = spring, 3 = summer, 4 = autumn.
pub fn season_number(month: u32) -> u8 {
    match month {
        12 | 1 | 2 => 1,
        3..=5 => 2,
        6..=8 => 3,
        _ => 4,
    }
}

/// One model input row.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub weather_code: i32,
    pub temperature_2m_max: f64,
    pub temperature_2m_min: f64,
    pub rain_sum: f64,
    pub snowfall_sum: f64,
    pub precipitation_hours: f64,
    pub wind_speed_10m_max: f64,
    pub day: u32,
    pub month: u32,
    /// 0 = Monday
    pub dayofweek: u32,
    pub season_number: u8,
}

impl FeatureVector {
    /// Values laid out as `FEATURE_NAMES`.
    pub fn values(&self) -> [f64; N_FEATURES] {
        [
            self.weather_code as f64,
            self.temperature_2m_max,
            self.temperature_2m_min,
            self.rain_sum,
            self.snowfall_sum,
            self.precipitation_hours,
            self.wind_speed_10m_max,
            self.day as f64,
            self.month as f64,
            self.dayofweek as f64,
            self.season_number as f64,
        ]
    }
}

pub fn build_features(
    date: NaiveDate,
    weather: &WeatherObservation,
) -> Result<FeatureVector, FeatureError> {
    let finite = |field: &'static str, value: f64| {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FeatureError::NonFinite { field, value })
        }
    };
    Ok(FeatureVector {
        weather_code: weather.weather_code,
        temperature_2m_max: finite("temperature_2m_max", weather.temperature_max)?,
        temperature_2m_min: finite("temperature_2m_min", weather.temperature_min)?,
        rain_sum: finite("rain_sum", weather.rain_sum)?,
        snowfall_sum: finite("snowfall_sum", weather.snowfall_sum)?,
        precipitation_hours: finite("precipitation_hours", weather.precipitation_hours)?,
        wind_speed_10m_max: finite("wind_speed_10m_max", weather.wind_speed_max)?,
        day: date.day(),
        month: date.month(),
        dayofweek: date.weekday().num_days_from_monday(),
        season_number: season_number(date.month()),
    })
}
