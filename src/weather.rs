use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::WeatherConfig;
use crate::error::WeatherError;

/// Forecasts are requested for today and at most this many days ahead.
pub const MAX_DAYS_AHEAD: i64 = 2;

const DAILY_FIELDS: [&str; 8] = [
    "weather_code",
    "temperature_2m_max",
    "temperature_2m_min",
    "precipitation_sum",
    "rain_sum",
    "snowfall_sum",
    "precipitation_hours",
    "wind_speed_10m_max",
];

/// Daily weather for one date, rounded to one decimal place.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WeatherObservation {
    pub weather_code: i32,
    /// °C
    pub temperature_max: f64,
    /// °C
    pub temperature_min: f64,
    /// mm
    pub precipitation_sum: f64,
    pub precipitation_hours: f64,
    /// mm
    pub rain_sum: f64,
    /// mm
    pub snowfall_sum: f64,
    /// km/h
    pub wind_speed_max: f64,
}

impl WeatherObservation {
    pub fn description(&self) -> &'static str {
        describe_weather_code(self.weather_code)
    }
}

/// Spanish description of a WMO weather interpretation code.
pub fn describe_weather_code(code: i32) -> &'static str {
    match code {
        0 => "Despejado",
        1 => "Principalmente despejado",
        2 => "Parcialmente nublado",
        3 => "Nublado",
        45 => "Niebla",
        48 => "Escarcha",
        51 => "Llovizna ligera",
        53 => "Llovizna moderada",
        55 => "Llovizna densa",
        56 => "Llovizna helada ligera",
        57 => "Llovizna helada densa",
        61 => "Lluvia ligera",
        63 => "Lluvia moderada",
        65 => "Lluvia intensa",
        66 => "Lluvia helada ligera",
        67 => "Lluvia helada intensa",
        71 => "Nevadas ligeras",
        73 => "Nevadas moderadas",
        75 => "Nevadas intensas",
        77 => "Granizo",
        80 => "Chubascos ligeros",
        81 => "Chubascos moderados",
        82 => "Chubascos intensos",
        85 => "Chubascos de nieve ligeros",
        86 => "Chubascos de nieve intensos",
        95 => "Tormenta eléctrica ligera",
        96 => "Tormenta eléctrica con granizo ligero",
        99 => "Tormenta eléctrica con granizo intenso",
        _ => "Código desconocido",
    }
}

/// Days between `today` and `date`, or an error when the date is outside the forecast window.
pub fn days_ahead(date: NaiveDate, today: NaiveDate) -> Result<i64, WeatherError> {
    let days_ahead = (date - today).num_days();
    if !(0..=MAX_DAYS_AHEAD).contains(&days_ahead) {
        return Err(WeatherError::BeyondHorizon {
            date,
            days_ahead,
            max: MAX_DAYS_AHEAD,
        });
    }
    Ok(days_ahead)
}

/// Anything that can produce a daily observation for a date in the forecast window.
pub trait WeatherSource {
    fn observation_for(
        &self,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<WeatherObservation, WeatherError>;
}

// --- Open-Meteo wire format ---

#[derive(Deserialize, Debug)]
pub struct ForecastResponse {
    pub daily: Option<DailySeries>,
    #[serde(default)]
    pub error: bool,
    pub reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct DailySeries {
    pub time: Vec<NaiveDate>,
    #[serde(default)]
    pub weather_code: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    pub rain_sum: Vec<Option<f64>>,
    #[serde(default)]
    pub snowfall_sum: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation_hours: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m_max: Vec<Option<f64>>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl DailySeries {
    /// Picks the entry for `date`, expected at `offset` in the series.
    pub fn observation(
        &self,
        date: NaiveDate,
        offset: usize,
    ) -> Result<WeatherObservation, WeatherError> {
        let index = if self.time.get(offset) == Some(&date) {
            offset
        } else {
            self.time
                .iter()
                .position(|t| *t == date)
                .ok_or(WeatherError::MissingDate(date))?
        };
        let value = |series: &[Option<f64>], field: &'static str| {
            series
                .get(index)
                .copied()
                .flatten()
                .ok_or(WeatherError::MissingField { field, date })
        };
        Ok(WeatherObservation {
            weather_code: value(&self.weather_code, "weather_code")?.round() as i32,
            temperature_max: round1(value(&self.temperature_2m_max, "temperature_2m_max")?),
            temperature_min: round1(value(&self.temperature_2m_min, "temperature_2m_min")?),
            precipitation_sum: round1(value(&self.precipitation_sum, "precipitation_sum")?),
            precipitation_hours: round1(value(
                &self.precipitation_hours,
                "precipitation_hours",
            )?),
            rain_sum: round1(value(&self.rain_sum, "rain_sum")?),
            snowfall_sum: round1(value(&self.snowfall_sum, "snowfall_sum")?),
            wind_speed_max: round1(value(&self.wind_speed_10m_max, "wind_speed_10m_max")?),
        })
    }
}

/// Blocking Open-Meteo client for the fixed New York coordinates.
pub struct WeatherClient {
    http: reqwest::blocking::Client,
    config: WeatherConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            config,
        }
    }

    fn query(&self, forecast_days: i64) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", self.config.latitude.to_string()),
            ("longitude", self.config.longitude.to_string()),
            ("daily", DAILY_FIELDS.join(",")),
            ("timezone", self.config.timezone.to_owned()),
            ("forecast_days", forecast_days.to_string()),
        ]
    }
}

impl WeatherSource for WeatherClient {
    fn observation_for(
        &self,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<WeatherObservation, WeatherError> {
        let offset = days_ahead(date, today)?;
        info!("requesting forecast for {} ({} days ahead)", date, offset);

        let response = self
            .http
            .get(&self.config.url)
            .query(&self.query(offset + 1))
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let reason = response
                .json::<ForecastResponse>()
                .ok()
                .and_then(|body| body.reason)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_owned());
            warn!("weather provider answered {}: {}", status, reason);
            return Err(WeatherError::Provider {
                status: status.as_u16(),
                reason,
            });
        }

        let body: ForecastResponse = response.json()?;
        if body.error {
            return Err(WeatherError::Provider {
                status: status.as_u16(),
                reason: body.reason.unwrap_or_default(),
            });
        }
        let daily = body.daily.ok_or(WeatherError::MissingDate(date))?;
        daily.observation(date, offset as usize)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const BODY: &str = r#"{
        "latitude": 40.710335,
        "longitude": -73.99307,
        "timezone": "America/New_York",
        "daily_units": {"time": "iso8601", "weather_code": "wmo code"},
        "daily": {
            "time": ["2024-05-06", "2024-05-07", "2024-05-08"],
            "weather_code": [3, 61, 0],
            "temperature_2m_max": [18.34, 21.06, 24.0],
            "temperature_2m_min": [11.2, 12.96, 14.1],
            "precipitation_sum": [0.0, 4.26, 0.0],
            "rain_sum": [0.0, 4.26, 0.0],
            "snowfall_sum": [0.0, 0.0, null],
            "precipitation_hours": [0.0, 5.0, 0.0],
            "wind_speed_10m_max": [14.8, 22.44, 9.7]
        }
    }"#;

    /// Answers a single request with `status` and `body`, then hangs up.
    fn serve_once(status: &str, body: &str) -> WeatherClient {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/v1/forecast", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
        });
        WeatherClient::new(WeatherConfig {
            url,
            ..WeatherConfig::default()
        })
    }

    #[test]
    fn test_client_reads_requested_day() {
        let client = serve_once("200 OK", BODY);
        let obs = client
            .observation_for(date(2024, 5, 7), date(2024, 5, 6))
            .unwrap();
        assert_eq!(obs.weather_code, 61);
        assert_eq!(obs.temperature_max, 21.1);
    }

    #[test]
    fn test_client_error_status() {
        let client = serve_once(
            "400 Bad Request",
            r#"{"error": true, "reason": "out of range"}"#,
        );
        let day = date(2024, 5, 6);
        match client.observation_for(day, day) {
            Err(WeatherError::Provider { status, reason }) => {
                assert_eq!(status, 400);
                assert_eq!(reason, "out of range");
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[test]
    fn test_client_error_body_with_ok_status() {
        let client = serve_once("200 OK", r#"{"error": true, "reason": "bad"}"#);
        let day = date(2024, 5, 6);
        assert!(matches!(
            client.observation_for(day, day),
            Err(WeatherError::Provider { status: 200, .. })
        ));
    }

    #[test]
    fn test_client_empty_body() {
        let client = serve_once("200 OK", "");
        let day = date(2024, 5, 6);
        assert!(matches!(
            client.observation_for(day, day),
            Err(WeatherError::Http(_))
        ));
    }

    #[test]
    fn test_client_rejects_beyond_horizon_without_request() {
        let client = WeatherClient::new(WeatherConfig {
            url: "http://127.0.0.1:9/unreachable".to_owned(),
            ..WeatherConfig::default()
        });
        assert!(matches!(
            client.observation_for(date(2024, 5, 9), date(2024, 5, 6)),
            Err(WeatherError::BeyondHorizon { .. })
        ));
    }

    #[test]
    fn test_weather_code_descriptions() {
        assert_eq!(describe_weather_code(0), "Despejado");
        assert_eq!(describe_weather_code(61), "Lluvia ligera");
        assert_eq!(describe_weather_code(999), "Código desconocido");
        assert_eq!(describe_weather_code(-1), "Código desconocido");
    }

    #[test]
    fn test_horizon() {
        let today = date(2024, 5, 6);
        assert_eq!(days_ahead(today, today).unwrap(), 0);
        assert_eq!(days_ahead(date(2024, 5, 8), today).unwrap(), 2);
        assert!(matches!(
            days_ahead(date(2024, 5, 9), today),
            Err(WeatherError::BeyondHorizon { days_ahead: 3, .. })
        ));
        assert!(matches!(
            days_ahead(date(2024, 5, 5), today),
            Err(WeatherError::BeyondHorizon { days_ahead: -1, .. })
        ));
    }

    #[test]
    fn test_select_offset_and_round() {
        let body: ForecastResponse = serde_json::from_str(BODY).unwrap();
        let daily = body.daily.unwrap();
        let obs = daily.observation(date(2024, 5, 7), 1).unwrap();
        assert_eq!(obs.weather_code, 61);
        assert_eq!(obs.temperature_max, 21.1);
        assert_eq!(obs.temperature_min, 13.0);
        assert_eq!(obs.rain_sum, 4.3);
        assert_eq!(obs.precipitation_hours, 5.0);
        assert_eq!(obs.wind_speed_max, 22.4);
        assert_eq!(obs.description(), "Lluvia ligera");
    }

    #[test]
    fn test_wrong_offset_falls_back_to_date_lookup() {
        let body: ForecastResponse = serde_json::from_str(BODY).unwrap();
        let daily = body.daily.unwrap();
        let obs = daily.observation(date(2024, 5, 6), 2).unwrap();
        assert_eq!(obs.weather_code, 3);
    }

    #[test]
    fn test_missing_date_and_null_field() {
        let body: ForecastResponse = serde_json::from_str(BODY).unwrap();
        let daily = body.daily.unwrap();
        assert!(matches!(
            daily.observation(date(2024, 5, 10), 0),
            Err(WeatherError::MissingDate(_))
        ));
        assert!(matches!(
            daily.observation(date(2024, 5, 8), 2),
            Err(WeatherError::MissingField {
                field: "snowfall_sum",
                ..
            })
        ));
    }

    #[test]
    fn test_provider_error_body() {
        let body: ForecastResponse = serde_json::from_str(
            r#"{"error": true, "reason": "Parameter 'forecast_days' is out of allowed range"}"#,
        )
        .unwrap();
        assert!(body.error);
        assert!(body.daily.is_none());
    }

    #[test]
    fn test_query_requests_horizon_plus_one() {
        let client = WeatherClient::new(WeatherConfig::default());
        let query = client.query(3);
        assert!(query.contains(&("forecast_days", "3".to_owned())));
        assert!(query.contains(&("timezone", "America/New_York".to_owned())));
        let daily = &query.iter().find(|(k, _)| *k == "daily").unwrap().1;
        assert_eq!(daily.split(',').count(), 8);
    }
}
