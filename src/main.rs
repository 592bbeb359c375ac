use std::fs::OpenOptions;
use std::io;

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};
use ratatui::prelude::*;

use taxi_demand::app::{run_app, today_in_new_york, App};
use taxi_demand::config::Config;
use taxi_demand::history::HistoricalData;
use taxi_demand::model::DemandModel;
use taxi_demand::session::AppContext;
use taxi_demand::weather::WeatherClient;

/// The terminal belongs to the UI, so log records go to a file.
fn init_logging(config: &Config) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
        .with_context(|| format!("cannot open log file {}", config.log_path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let config = Config::from_env();
    init_logging(&config)?;
    info!("starting with {:?}", config);

    // Load model and historical tables
    let model = DemandModel::load(&config.model_path)
        .with_context(|| format!("cannot load model {}", config.model_path.display()))?;
    let history = HistoricalData::load(&config.hourly_path, &config.borough_path)
        .context("cannot load historical demand tables")?;
    let ctx = AppContext {
        model: Box::new(model),
        history,
        weather: Box::new(WeatherClient::new(config.weather.clone())),
    };

    // Setup Terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run App
    let app = App::new(&ctx, today_in_new_york);
    let res = run_app(&mut terminal, app);

    // Restore Terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("terminal loop failed: {}", err);
        println!("{:?}", err)
    }

    Ok(())
}
