use std::io;

use chrono::{Duration, NaiveDate, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use log::info;
use ratatui::prelude::*;

use crate::session::{AppContext, Session};
use crate::ui::ui;
use crate::weather::MAX_DAYS_AHEAD;

/// The calendar date in New York right now.
pub fn today_in_new_york() -> NaiveDate {
    Utc::now()
        .with_timezone(&chrono_tz::America::New_York)
        .date_naive()
}

pub struct App<'a> {
    ctx: &'a AppContext,
    clock: Box<dyn Fn() -> NaiveDate + 'a>,
    pub today: NaiveDate,
    pub session: Session,
}

impl<'a> App<'a> {
    pub fn new(ctx: &'a AppContext, clock: impl Fn() -> NaiveDate + 'a) -> App<'a> {
        let today = clock();
        App {
            ctx,
            clock: Box::new(clock),
            today,
            session: Session::new(today),
        }
    }

    /// Moves the picker window forward once the date rolls over in New York.
    fn refresh_today(&mut self) {
        let today = (self.clock)();
        if today == self.today {
            return;
        }
        info!("date rolled over from {} to {}", self.today, today);
        self.today = today;
        let date = self.session.date.clamp(self.today, self.max_date());
        self.session.select_date(date);
    }

    pub fn max_date(&self) -> NaiveDate {
        self.today + Duration::days(MAX_DAYS_AHEAD)
    }

    fn shift_date(&mut self, days: i64) {
        let date = (self.session.date + Duration::days(days)).clamp(self.today, self.max_date());
        self.session.select_date(date);
    }

    /// Applies one key press. Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        if matches!(code, KeyCode::Char('q') | KeyCode::Esc) {
            return true;
        }
        self.refresh_today();
        match code {
            KeyCode::Right | KeyCode::Char('+') => self.shift_date(1),
            KeyCode::Left | KeyCode::Char('-') => self.shift_date(-1),
            KeyCode::Enter | KeyCode::Char('p') => {
                info!("predict requested for {}", self.session.date);
                self.session.predict(self.ctx, self.today);
            }
            KeyCode::Char('h') => self.session.show_hourly(self.ctx),
            KeyCode::Char('b') => self.session.show_boroughs(self.ctx),
            _ => {}
        }
        false
    }
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, &app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if app.handle_key(key.code) {
                return Ok(());
            }
        }
    }
}
