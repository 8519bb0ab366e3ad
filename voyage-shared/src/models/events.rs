use chrono::{NaiveDate, Utc};
use uuid::Uuid;

pub const TOPIC_BOOKINGS: &str = "voyage.bookings";

/// Emitted once the store has accepted a reservation for a trip.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct BookingReservedEvent {
    pub booking_id: Uuid,
    pub trip_id: Uuid,
    pub package_id: Uuid,
    pub option_id: Option<Uuid>,
    pub trip_date: NaiveDate,
    pub pax: u32,
    pub total: i64,
    pub timestamp: i64,
}

impl BookingReservedEvent {
    pub fn key(&self) -> String {
        self.trip_id.to_string()
    }

    pub fn stamped(mut self) -> Self {
        self.timestamp = Utc::now().timestamp();
        self
    }
}
