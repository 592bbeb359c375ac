use std::collections::HashMap;
use std::io::Read;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::warn;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Deserialize;
use taxi_demand::features::{build_features, FeatureVector, N_FEATURES};
use taxi_demand::weather::WeatherObservation;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct DailyDemandRow {
    pub date: NaiveDate,
    pub demand: f64,
}

/// One row of the daily weather table, same columns as the forecast API.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct WeatherRow {
    pub date: NaiveDate,
    pub weather_code: f64,
    pub temperature_2m_max: f64,
    pub temperature_2m_min: f64,
    pub precipitation_sum: f64,
    pub rain_sum: f64,
    pub snowfall_sum: f64,
    pub precipitation_hours: f64,
    pub wind_speed_10m_max: f64,
}

impl WeatherRow {
    pub fn observation(&self) -> WeatherObservation {
        WeatherObservation {
            weather_code: self.weather_code.round() as i32,
            temperature_max: self.temperature_2m_max,
            temperature_min: self.temperature_2m_min,
            precipitation_sum: self.precipitation_sum,
            precipitation_hours: self.precipitation_hours,
            rain_sum: self.rain_sum,
            snowfall_sum: self.snowfall_sum,
            wind_speed_max: self.wind_speed_10m_max,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub date: NaiveDate,
    pub features: FeatureVector,
    pub demand: f64,
}

fn read_table<T: for<'de> Deserialize<'de>>(reader: impl Read, table: &str) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for (i, result) in rdr.deserialize().enumerate() {
        let row: T = result.with_context(|| format!("{} line {}", table, i + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_demand(reader: impl Read) -> Result<Vec<DailyDemandRow>> {
    read_table(reader, "daily demand")
}

pub fn read_weather(reader: impl Read) -> Result<Vec<WeatherRow>> {
    read_table(reader, "daily weather")
}

/// Inner join on date, ordered by date.
pub fn merge(demand: &[DailyDemandRow], weather: &[WeatherRow]) -> Result<Vec<Example>> {
    let mut by_date: HashMap<NaiveDate, &WeatherRow> = HashMap::with_capacity(weather.len());
    for row in weather {
        if by_date.insert(row.date, row).is_some() {
            warn!("weather table repeats {}; keeping the last row", row.date);
        }
    }

    let mut examples = Vec::with_capacity(demand.len());
    let mut unmatched = 0;
    for row in demand {
        let Some(weather) = by_date.get(&row.date) else {
            unmatched += 1;
            continue;
        };
        let features = build_features(row.date, &weather.observation())
            .with_context(|| format!("weather for {}", row.date))?;
        examples.push(Example {
            date: row.date,
            features,
            demand: row.demand,
        });
    }
    if unmatched > 0 {
        warn!("{} demand rows have no weather and were dropped", unmatched);
    }
    examples.sort_by_key(|example| example.date);
    Ok(examples)
}

/// Shuffles with a fixed seed and holds out `ceil(n * test_size)` examples.
pub fn train_test_split(
    mut examples: Vec<Example>,
    test_size: f64,
    seed: u64,
) -> (Vec<Example>, Vec<Example>) {
    let mut rng = StdRng::seed_from_u64(seed);
    examples.shuffle(&mut rng);
    let n_test = ((examples.len() as f64) * test_size).ceil() as usize;
    let train = examples.split_off(n_test.min(examples.len()));
    (train, examples)
}

pub fn to_arrays(examples: &[Example]) -> (Vec<[f64; N_FEATURES]>, Vec<f64>) {
    examples
        .iter()
        .map(|example| (example.features.values(), example.demand))
        .unzip()
}
