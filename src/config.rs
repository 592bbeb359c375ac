use std::path::PathBuf;

pub const DEFAULT_MODEL_PATH: &str = "taxi_demand_model.bin";
pub const DEFAULT_HOURLY_PATH: &str = "data/taxis_hourlydemand.csv";
pub const DEFAULT_BOROUGH_PATH: &str = "data/taxis_borough_demand.csv";
pub const DEFAULT_LOG_PATH: &str = "taxi_demand.log";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Weather provider settings. Only the endpoint can be overridden.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherConfig {
    pub url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: &'static str,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FORECAST_URL.to_owned(),
            latitude: 40.7128,
            longitude: -74.006,
            timezone: "America/New_York",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub model_path: PathBuf,
    pub hourly_path: PathBuf,
    pub borough_path: PathBuf,
    pub log_path: PathBuf,
    pub weather: WeatherConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: DEFAULT_MODEL_PATH.into(),
            hourly_path: DEFAULT_HOURLY_PATH.into(),
            borough_path: DEFAULT_BOROUGH_PATH.into(),
            log_path: DEFAULT_LOG_PATH.into(),
            weather: WeatherConfig::default(),
        }
    }
}

impl Config {
    /// Defaults overridden by `TAXI_DEMAND_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup("TAXI_DEMAND_MODEL") {
            config.model_path = path.into();
        }
        if let Some(path) = lookup("TAXI_DEMAND_HOURLY") {
            config.hourly_path = path.into();
        }
        if let Some(path) = lookup("TAXI_DEMAND_BOROUGH") {
            config.borough_path = path.into();
        }
        if let Some(path) = lookup("TAXI_DEMAND_LOG") {
            config.log_path = path.into();
        }
        if let Some(url) = lookup("TAXI_DEMAND_WEATHER_URL") {
            config.weather.url = url;
        }
        config
    }
}
