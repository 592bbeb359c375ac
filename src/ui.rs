use chrono::{Datelike, NaiveDate, Weekday};
use ratatui::{prelude::*, widgets::*};

use crate::app::App;
use crate::session::{Detail, Forecast};
use crate::similar::{BoroughProjection, HourlyProjection};

fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "lunes",
        Weekday::Tue => "martes",
        Weekday::Wed => "miércoles",
        Weekday::Thu => "jueves",
        Weekday::Fri => "viernes",
        Weekday::Sat => "sábado",
        Weekday::Sun => "domingo",
    }
}

pub fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // Title
            Constraint::Length(3), // Date picker
            Constraint::Length(8), // Weather + prediction
            Constraint::Min(8),    // Hourly chart / borough table
            Constraint::Length(1), // Status
            Constraint::Length(1), // Footer
        ])
        .split(f.area());

    let title = Paragraph::new("Predicción de Demanda de Taxis en New York City")
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    f.render_widget(title, chunks[0]);

    let session = &app.session;
    let date_widget = Paragraph::new(format!(
        " < {} ({}) > ",
        session.date,
        weekday_name(session.date)
    ))
    .style(Style::default().fg(Color::Green))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Fecha ({} a {})", app.today, app.max_date())),
    );
    f.render_widget(date_widget, chunks[1]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);
    match &session.forecast {
        Some(forecast) => {
            f.render_widget(weather_metrics(forecast), middle[0]);
            f.render_widget(prediction(forecast), middle[1]);
        }
        None => {
            let hint = Paragraph::new("Pulsa Enter para obtener datos climáticos y predecir demanda.")
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("Predicción"));
            f.render_widget(hint, chunks[2]);
        }
    }

    match &session.detail {
        Some(Detail::Hourly {
            similar_date,
            hours,
        }) => draw_hourly(f, chunks[3], *similar_date, hours),
        Some(Detail::Boroughs { similar_date, rows }) => {
            f.render_widget(borough_table(*similar_date, rows), chunks[3])
        }
        None => {
            let block = Block::default().borders(Borders::ALL).title("Detalle");
            f.render_widget(block, chunks[3]);
        }
    }

    if let Some(error) = &session.error {
        let status = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        f.render_widget(status, chunks[4]);
    }

    let footer = Paragraph::new(
        "←/→ cambiar fecha · Enter predecir · 'h' demanda horaria · 'b' distritos · 'q' salir",
    )
    .style(Style::default().fg(Color::DarkGray));
    f.render_widget(footer, chunks[5]);
}

fn weather_metrics(forecast: &Forecast) -> Paragraph<'static> {
    let weather = &forecast.weather;
    let metric = |label: &str, value: String| {
        Line::from(vec![
            Span::raw(format!("{}: ", label)),
            Span::styled(value, Style::default().add_modifier(Modifier::BOLD)),
        ])
    };
    Paragraph::new(vec![
        metric("Descripción del Clima", weather.description().to_owned()),
        metric(
            "Temperatura Máxima (°C)",
            format!("{:.1}", weather.temperature_max),
        ),
        metric(
            "Temperatura Mínima (°C)",
            format!("{:.1}", weather.temperature_min),
        ),
        metric(
            "Precipitación Total (mm)",
            format!("{:.1}", weather.precipitation_sum),
        ),
        metric(
            "Horas de Precipitación",
            format!("{:.1}", weather.precipitation_hours),
        ),
        metric(
            "Velocidad Máxima del Viento (km/h)",
            format!("{:.1}", weather.wind_speed_max),
        ),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Datos Climáticos Obtenidos"),
    )
}

fn prediction(forecast: &Forecast) -> Paragraph<'static> {
    Paragraph::new(format!(
        "La predicción de demanda de taxis para el {} {} es: {} viajes.",
        weekday_name(forecast.date),
        forecast.date,
        forecast.total_demand
    ))
    .style(
        Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::BOLD),
    )
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title("Predicción"))
}

fn draw_hourly(f: &mut Frame, area: Rect, similar_date: NaiveDate, hours: &[HourlyProjection]) {
    let labels: Vec<String> = hours.iter().map(|h| format!("{:02}", h.hour)).collect();
    let data: Vec<(&str, u64)> = labels
        .iter()
        .zip(hours)
        .map(|(label, h)| (label.as_str(), h.demand.round() as u64))
        .collect();
    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(format!(
            "Demanda horaria proyectada (perfil del {} {})",
            weekday_name(similar_date),
            similar_date
        )))
        .data(data.as_slice())
        .bar_width(4)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Yellow))
        .value_style(Style::default().fg(Color::Black).bg(Color::Yellow));
    f.render_widget(chart, area);
}

fn borough_table(similar_date: NaiveDate, rows: &[BoroughProjection]) -> Table<'static> {
    let header = Row::new(vec!["Distrito", "Histórico", "Proporción", "Proyectado"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = rows
        .iter()
        .map(|row| {
            Row::new(vec![
                row.borough.clone(),
                format!("{:.0}", row.historical),
                format!("{:.1}%", row.share * 100.0),
                format!("{:.0}", row.projected),
            ])
        })
        .collect();
    Table::new(
        rows,
        [
            Constraint::Percentage(34),
            Constraint::Percentage(22),
            Constraint::Percentage(22),
            Constraint::Percentage(22),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Demanda por distrito (día similar {})", similar_date)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::sample_weather;
    use crate::session::tests::{context, date};
    use crossterm::event::KeyCode;
    use ratatui::backend::TestBackend;

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_initial_screen() {
        let ctx = context(1000.0, Some(sample_weather()));
        let app = App::new(&ctx, || date(2024, 5, 13));
        let screen = render(&app);
        assert!(screen.contains("2024-05-13 (lunes)"));
        assert!(screen.contains("Fecha (2024-05-13 a 2024-05-15)"));
        assert!(screen.contains("Pulsa Enter"));
    }

    #[test]
    fn test_prediction_and_metrics() {
        let ctx = context(81234.7, Some(sample_weather()));
        let mut app = App::new(&ctx, || date(2024, 5, 13));
        app.handle_key(KeyCode::Enter);
        let screen = render(&app);
        assert!(screen.contains("81234"));
        assert!(screen.contains("viajes."));
        assert!(screen.contains("Descripción del Clima: Nublado"));
        assert!(screen.contains("Temperatura Máxima (°C): 21.4"));
        assert!(screen.contains("Velocidad Máxima del Viento (km/h): 17.3"));
    }

    #[test]
    fn test_error_line() {
        let ctx = context(1000.0, None);
        let mut app = App::new(&ctx, || date(2024, 5, 13));
        app.handle_key(KeyCode::Enter);
        assert!(render(&app).contains("Error al obtener datos climáticos"));
    }

    #[test]
    fn test_hourly_and_borough_views() {
        let ctx = context(1200.0, Some(sample_weather()));
        let mut app = App::new(&ctx, || date(2024, 5, 13));
        app.handle_key(KeyCode::Enter);
        app.handle_key(KeyCode::Char('h'));
        assert!(render(&app).contains("perfil del lunes 2024-05-06"));

        app.handle_key(KeyCode::Char('b'));
        let screen = render(&app);
        assert!(screen.contains("Demanda por distrito (día similar 2024-05-06)"));
        assert!(screen.contains("Manhattan"));
        assert!(screen.contains("90.0%"));
    }
}
