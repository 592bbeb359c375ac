//! Weather-driven taxi demand forecasting for New York City.
//!
//! The library holds everything shared by the interactive forecaster and the
//! `model_builder` trainer: feature construction, the model artifact, the
//! weather client, the historical tables and the similar-day projections.

pub mod app;
pub mod config;
pub mod error;
pub mod features;
pub mod history;
pub mod model;
pub mod session;
pub mod similar;
pub mod ui;
pub mod weather;
