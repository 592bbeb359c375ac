use chrono::NaiveDate;
use log::{error, info, warn};

use crate::error::PredictError;
use crate::features::build_features;
use crate::history::HistoricalData;
use crate::model::{trip_count, DemandRegressor};
use crate::similar::{
    find_similar_day, project_boroughs, project_hourly, BoroughProjection, HourlyProjection,
    SimilarDay,
};
use crate::weather::{WeatherObservation, WeatherSource};

/// Everything loaded at startup. Shared read-only by every request.
pub struct AppContext {
    pub model: Box<dyn DemandRegressor>,
    pub history: HistoricalData,
    pub weather: Box<dyn WeatherSource>,
}

/// Result of one prediction request.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub date: NaiveDate,
    pub weather: WeatherObservation,
    pub raw_prediction: f64,
    pub total_demand: i64,
    /// 0 = Monday
    pub dayofweek: u32,
}

impl AppContext {
    pub fn forecast(&self, date: NaiveDate, today: NaiveDate) -> Result<Forecast, PredictError> {
        let weather = self.weather.observation_for(date, today)?;
        let features = build_features(date, &weather)?;
        let raw_prediction = self.model.predict(&features);
        let total_demand = trip_count(raw_prediction);
        info!(
            "predicted {} trips for {} (model output {:.2}, weather code {})",
            total_demand, date, raw_prediction, weather.weather_code
        );
        Ok(Forecast {
            date,
            weather,
            raw_prediction,
            total_demand,
            dayofweek: features.dayofweek,
        })
    }

    pub fn similar_day(&self, forecast: &Forecast) -> Option<SimilarDay> {
        find_similar_day(
            &self.history.hourly,
            forecast.dayofweek,
            forecast.total_demand as f64,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Detail {
    Hourly {
        similar_date: NaiveDate,
        hours: Vec<HourlyProjection>,
    },
    Boroughs {
        similar_date: NaiveDate,
        rows: Vec<BoroughProjection>,
    },
}

/// State of one interactive session. A new date or a new prediction clears
/// everything derived from the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub date: NaiveDate,
    pub forecast: Option<Forecast>,
    pub similar_date: Option<NaiveDate>,
    pub detail: Option<Detail>,
    pub error: Option<String>,
}

impl Session {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            forecast: None,
            similar_date: None,
            detail: None,
            error: None,
        }
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        if date != self.date {
            *self = Self::new(date);
        }
    }

    pub fn predict(&mut self, ctx: &AppContext, today: NaiveDate) {
        *self = Self::new(self.date);
        match ctx.forecast(self.date, today) {
            Ok(forecast) => self.forecast = Some(forecast),
            Err(e) => {
                error!("prediction for {} failed: {}", self.date, e);
                self.error = Some(match e {
                    PredictError::Weather(e) => format!("Error al obtener datos climáticos: {}", e),
                    PredictError::Feature(e) => format!("Datos climáticos incompletos: {}", e),
                });
            }
        }
    }

    fn similar_day(&mut self, ctx: &AppContext) -> Option<(SimilarDay, f64)> {
        self.error = None;
        let Some(forecast) = &self.forecast else {
            self.error = Some("Primero obtén la predicción de demanda.".to_owned());
            return None;
        };
        let total = forecast.total_demand as f64;
        match ctx.similar_day(forecast) {
            Some(similar) => {
                info!(
                    "similar day for {}: {} (distance {:.0})",
                    forecast.date, similar.date, similar.distance
                );
                self.similar_date = Some(similar.date);
                Some((similar, total))
            }
            None => {
                warn!("no historical day with weekday {}", forecast.dayofweek);
                self.error = Some("No hay días históricos para ese día de la semana.".to_owned());
                None
            }
        }
    }

    pub fn show_hourly(&mut self, ctx: &AppContext) {
        let Some((similar, total)) = self.similar_day(ctx) else {
            return;
        };
        match project_hourly(&similar.hours, total) {
            Some(hours) => {
                self.detail = Some(Detail::Hourly {
                    similar_date: similar.date,
                    hours,
                })
            }
            None => {
                self.detail = None;
                self.error = Some(format!("El día similar {} no registra viajes.", similar.date));
            }
        }
    }

    pub fn show_boroughs(&mut self, ctx: &AppContext) {
        let Some((similar, total)) = self.similar_day(ctx) else {
            return;
        };
        match ctx.history.borough_demand(similar.date) {
            Some(record) => {
                self.detail = Some(Detail::Boroughs {
                    similar_date: similar.date,
                    rows: project_boroughs(record, total),
                })
            }
            None => {
                self.detail = None;
                self.error = Some(format!("No hay datos por distrito para {}.", similar.date));
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::WeatherError;
    use crate::features::{tests::sample_weather, FeatureVector};
    use crate::history::{BoroughDemandRecord, HourlyDemandRecord};
    use crate::weather::days_ahead;

    pub(crate) struct FixedWeather(pub Option<WeatherObservation>);

    impl WeatherSource for FixedWeather {
        fn observation_for(
            &self,
            date: NaiveDate,
            today: NaiveDate,
        ) -> Result<WeatherObservation, WeatherError> {
            days_ahead(date, today)?;
            self.0.clone().ok_or(WeatherError::Provider {
                status: 503,
                reason: "unavailable".to_owned(),
            })
        }
    }

    pub(crate) struct FixedModel(pub f64);

    impl DemandRegressor for FixedModel {
        fn predict(&self, _features: &FeatureVector) -> f64 {
            self.0
        }
    }

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Two Mondays totalling 900 (2024-04-29) and 1200 (2024-05-06).
    pub(crate) fn context(prediction: f64, weather: Option<WeatherObservation>) -> AppContext {
        let mut hourly = Vec::new();
        for (date, demand) in [
            (date(2024, 4, 29), [100.0, 300.0, 500.0]),
            (date(2024, 5, 6), [200.0, 400.0, 600.0]),
        ] {
            for (hour, demand) in demand.into_iter().enumerate() {
                hourly.push(HourlyDemandRecord {
                    date,
                    hour: hour as u32,
                    dayofweek: 0,
                    demand,
                });
            }
        }
        let boroughs = vec![BoroughDemandRecord {
            date: date(2024, 5, 6),
            demand: vec![("Manhattan".to_owned(), 90.0), ("Queens".to_owned(), 10.0)],
        }];
        AppContext {
            model: Box::new(FixedModel(prediction)),
            history: HistoricalData::new(hourly, boroughs),
            weather: Box::new(FixedWeather(weather)),
        }
    }

    // 2024-05-13 is a Monday.
    const TODAY: (i32, u32, u32) = (2024, 5, 13);

    fn today() -> NaiveDate {
        date(TODAY.0, TODAY.1, TODAY.2)
    }

    #[test]
    fn test_predict_truncates_and_records_weekday() {
        let ctx = context(1199.9, Some(sample_weather()));
        let mut session = Session::new(today());
        session.predict(&ctx, today());
        let forecast = session.forecast.as_ref().unwrap();
        assert_eq!(forecast.total_demand, 1199);
        assert_eq!(forecast.dayofweek, 0);
        assert_eq!(forecast.weather, sample_weather());
        assert!(session.error.is_none());
    }

    #[test]
    fn test_weather_failure_is_reported_not_predicted() {
        let ctx = context(1000.0, None);
        let mut session = Session::new(today());
        session.predict(&ctx, today());
        assert!(session.forecast.is_none());
        assert!(session
            .error
            .as_deref()
            .unwrap()
            .starts_with("Error al obtener datos climáticos"));
    }

    #[test]
    fn test_date_beyond_horizon_is_rejected() {
        let ctx = context(1000.0, Some(sample_weather()));
        let mut session = Session::new(date(2024, 5, 16));
        session.predict(&ctx, today());
        assert!(session.forecast.is_none());
        assert!(session.error.is_some());
    }

    #[test]
    fn test_hourly_uses_similar_monday() {
        let ctx = context(1200.0, Some(sample_weather()));
        let mut session = Session::new(today());
        session.predict(&ctx, today());
        session.show_hourly(&ctx);
        assert_eq!(session.similar_date, Some(date(2024, 5, 6)));
        match &session.detail {
            Some(Detail::Hourly {
                similar_date,
                hours,
            }) => {
                assert_eq!(*similar_date, date(2024, 5, 6));
                let sum: f64 = hours.iter().map(|h| h.demand).sum();
                assert!((sum - 1200.0).abs() < 1e-9);
                assert!((hours[2].demand - 600.0).abs() < 1e-9);
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_boroughs_for_similar_day() {
        let ctx = context(1150.0, Some(sample_weather()));
        let mut session = Session::new(today());
        session.predict(&ctx, today());
        session.show_boroughs(&ctx);
        match &session.detail {
            Some(Detail::Boroughs { rows, .. }) => {
                assert_eq!(rows[0].borough, "Manhattan");
                assert!((rows[0].projected - 1035.0).abs() < 1e-9);
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_missing_borough_day() {
        let ctx = context(900.0, Some(sample_weather()));
        let mut session = Session::new(today());
        session.predict(&ctx, today());
        session.show_boroughs(&ctx);
        assert_eq!(session.similar_date, Some(date(2024, 4, 29)));
        assert!(session.detail.is_none());
        assert!(session.error.as_deref().unwrap().contains("2024-04-29"));
    }

    #[test]
    fn test_detail_requires_prediction() {
        let ctx = context(900.0, Some(sample_weather()));
        let mut session = Session::new(today());
        session.show_hourly(&ctx);
        assert!(session.detail.is_none());
        assert!(session.error.is_some());
    }

    #[test]
    fn test_new_date_discards_previous_forecast() {
        let ctx = context(900.0, Some(sample_weather()));
        let mut session = Session::new(today());
        session.predict(&ctx, today());
        session.show_hourly(&ctx);
        session.select_date(date(2024, 5, 14));
        assert_eq!(session, Session::new(date(2024, 5, 14)));
    }
}
