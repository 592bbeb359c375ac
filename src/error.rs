use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Failures while fetching or decoding a weather forecast.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("{date} is {days_ahead} days ahead; forecasts cover today up to {max} days ahead")]
    BeyondHorizon {
        date: NaiveDate,
        days_ahead: i64,
        max: i64,
    },
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("weather provider returned {status}: {reason}")]
    Provider { status: u16, reason: String },
    #[error("weather response has no entry for {0}")]
    MissingDate(NaiveDate),
    #[error("weather response has no value for `{field}` on {date}")]
    MissingField { field: &'static str, date: NaiveDate },
}

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("weather field `{field}` is not a finite number ({value})")]
    NonFinite { field: &'static str, value: f64 },
}

/// Failures while loading the historical tables. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed row in {table}: {source}")]
    Csv {
        table: &'static str,
        source: csv::Error,
    },
    #[error("{table} line {line}: {message}")]
    Invalid {
        table: &'static str,
        line: u64,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot read model {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("model file is corrupt: {0}")]
    Decode(#[from] bincode::Error),
    #[error("model was trained on columns {found:?}, expected {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Everything that can stop a single prediction request.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Weather(#[from] WeatherError),
    #[error(transparent)]
    Feature(#[from] FeatureError),
}
