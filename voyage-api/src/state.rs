use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use voyage_booking::BookingEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine>,
    /// Pins "today" for trip windows; the UTC date is used when unset.
    pub today: Option<NaiveDate>,
}

impl AppState {
    pub fn new(engine: Arc<BookingEngine>) -> Self {
        Self { engine, today: None }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}
