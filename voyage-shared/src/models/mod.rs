pub mod events;

pub use events::{BookingReservedEvent, TOPIC_BOOKINGS};
