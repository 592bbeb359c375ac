use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::history::{BoroughDemandRecord, HourlyDemandRecord};

/// The historical day chosen to shape a prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarDay {
    pub date: NaiveDate,
    pub total: f64,
    /// `|total - predicted|`
    pub distance: f64,
    /// Sorted by hour.
    pub hours: Vec<HourlyDemandRecord>,
}

/// Finds the date with weekday `dayofweek` whose summed demand is closest to
/// `predicted_total`. Equal distances resolve to the earliest date.
pub fn find_similar_day(
    history: &[HourlyDemandRecord],
    dayofweek: u32,
    predicted_total: f64,
) -> Option<SimilarDay> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in history.iter().filter(|r| r.dayofweek == dayofweek) {
        *totals.entry(record.date).or_insert(0.0) += record.demand;
    }

    let mut best: Option<(NaiveDate, f64, f64)> = None;
    for (&date, &total) in &totals {
        let distance = (total - predicted_total).abs();
        match best {
            Some((_, _, best_distance)) if distance >= best_distance => {}
            _ => best = Some((date, total, distance)),
        }
    }

    let (date, total, distance) = best?;
    let mut hours: Vec<HourlyDemandRecord> = history
        .iter()
        .filter(|r| r.date == date && r.dayofweek == dayofweek)
        .cloned()
        .collect();
    hours.sort_by_key(|r| r.hour);
    Some(SimilarDay {
        date,
        total,
        distance,
        hours,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyProjection {
    pub hour: u32,
    /// Fraction of the similar day's trips that fell in this hour.
    pub share: f64,
    pub demand: f64,
}

/// Spreads `total_demand` over the hours in proportion to the similar day's
/// curve. Returns nothing when that day had no trips.
pub fn project_hourly(hours: &[HourlyDemandRecord], total_demand: f64) -> Option<Vec<HourlyProjection>> {
    let day_total: f64 = hours.iter().map(|r| r.demand).sum();
    if day_total <= 0.0 {
        return None;
    }
    Some(
        hours
            .iter()
            .map(|r| {
                let share = r.demand / day_total;
                HourlyProjection {
                    hour: r.hour,
                    share,
                    demand: share * total_demand,
                }
            })
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoroughProjection {
    pub borough: String,
    pub historical: f64,
    pub share: f64,
    pub projected: f64,
}

/// Applies each borough's share of the similar day to `total_demand`.
pub fn project_boroughs(record: &BoroughDemandRecord, total_demand: f64) -> Vec<BoroughProjection> {
    let day_total = record.total();
    record
        .demand
        .iter()
        .map(|(borough, historical)| {
            let share = if day_total > 0.0 {
                historical / day_total
            } else {
                0.0
            };
            BoroughProjection {
                borough: borough.clone(),
                historical: *historical,
                share,
                projected: share * total_demand,
            }
        })
        .collect()
}
