use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use serde::Deserialize;

use crate::error::DataError;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct HourlyDemandRecord {
    pub date: NaiveDate,
    pub hour: u32,
    /// 0 = Monday
    pub dayofweek: u32,
    pub demand: f64,
}

/// Trips per borough on one date, in the column order of the source table.
#[derive(Debug, Clone, PartialEq)]
pub struct BoroughDemandRecord {
    pub date: NaiveDate,
    pub demand: Vec<(String, f64)>,
}

impl BoroughDemandRecord {
    pub fn total(&self) -> f64 {
        self.demand.iter().map(|(_, demand)| demand).sum()
    }
}

/// Historical tables, loaded once at startup and never modified.
#[derive(Debug, Clone, Default)]
pub struct HistoricalData {
    pub hourly: Vec<HourlyDemandRecord>,
    boroughs: BTreeMap<NaiveDate, BoroughDemandRecord>,
}

fn open(path: &Path) -> Result<File, DataError> {
    File::open(path).map_err(|source| DataError::Io {
        path: path.to_owned(),
        source,
    })
}

impl HistoricalData {
    pub fn new(hourly: Vec<HourlyDemandRecord>, boroughs: Vec<BoroughDemandRecord>) -> Self {
        Self {
            hourly,
            boroughs: boroughs
                .into_iter()
                .map(|record| (record.date, record))
                .collect(),
        }
    }

    pub fn load(hourly_path: &Path, borough_path: &Path) -> Result<Self, DataError> {
        let hourly = read_hourly(open(hourly_path)?)?;
        let boroughs = read_boroughs(open(borough_path)?)?;
        info!(
            "loaded {} hourly rows from {} and {} borough days from {}",
            hourly.len(),
            hourly_path.display(),
            boroughs.len(),
            borough_path.display()
        );
        Ok(Self::new(hourly, boroughs))
    }

    pub fn borough_demand(&self, date: NaiveDate) -> Option<&BoroughDemandRecord> {
        self.boroughs.get(&date)
    }
}

pub fn read_hourly(reader: impl Read) -> Result<Vec<HourlyDemandRecord>, DataError> {
    const TABLE: &str = "hourly demand";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut mismatched_weekdays = 0;
    for result in rdr.deserialize() {
        let record: HourlyDemandRecord =
            result.map_err(|source| DataError::Csv { table: TABLE, source })?;
        let line = records.len() as u64 + 2;
        if record.hour > 23 {
            return Err(DataError::Invalid {
                table: TABLE,
                line,
                message: format!("hour {} is outside 0-23", record.hour),
            });
        }
        if record.dayofweek > 6 {
            return Err(DataError::Invalid {
                table: TABLE,
                line,
                message: format!("dayofweek {} is outside 0-6", record.dayofweek),
            });
        }
        if !record.demand.is_finite() || record.demand < 0.0 {
            return Err(DataError::Invalid {
                table: TABLE,
                line,
                message: format!("demand {} is not a trip count", record.demand),
            });
        }
        if record.date.weekday().num_days_from_monday() != record.dayofweek {
            mismatched_weekdays += 1;
        }
        records.push(record);
    }
    if mismatched_weekdays > 0 {
        warn!(
            "{} hourly rows carry a dayofweek that differs from their date",
            mismatched_weekdays
        );
    }
    Ok(records)
}

/// Reads `date,<borough>,<borough>,...`. Empty cells count as zero trips.
pub fn read_boroughs(reader: impl Read) -> Result<Vec<BoroughDemandRecord>, DataError> {
    const TABLE: &str = "borough demand";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|source| DataError::Csv { table: TABLE, source })?
        .clone();
    let date_column = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("date"))
        .ok_or_else(|| DataError::Invalid {
            table: TABLE,
            line: 1,
            message: "no `date` column".to_owned(),
        })?;

    let mut records = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let row = result.map_err(|source| DataError::Csv { table: TABLE, source })?;
        let line = i as u64 + 2;
        let invalid = |message: String| DataError::Invalid {
            table: TABLE,
            line,
            message,
        };

        let raw_date = row.get(date_column).unwrap_or_default();
        let date = raw_date
            .parse::<NaiveDate>()
            .map_err(|e| invalid(format!("bad date {:?}: {}", raw_date, e)))?;

        let mut demand = Vec::with_capacity(headers.len() - 1);
        for (column, (name, cell)) in headers.iter().zip(row.iter()).enumerate() {
            if column == date_column {
                continue;
            }
            let value = if cell.is_empty() {
                0.0
            } else {
                cell.parse::<f64>()
                    .map_err(|_| invalid(format!("{} has non-numeric demand {:?}", name, cell)))?
            };
            demand.push((name.to_owned(), value));
        }
        records.push(BoroughDemandRecord { date, demand });
    }
    Ok(records)
}
