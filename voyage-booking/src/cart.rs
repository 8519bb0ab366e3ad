use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use voyage_catalog::{PassengerMix, PriceBreakdown, SlotTime};

/// A priced trip ready to be added to the traveler's cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub id: Uuid,
    pub package_id: Uuid,
    pub option_id: Option<Uuid>,
    pub trip_id: Uuid,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub passengers: PassengerMix,
    /// Seats held on the trip: billable travelers for the option's group type.
    pub seats: u32,
    pub price: PriceBreakdown,
    /// Set once the store has accepted the reservation.
    pub booking_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        package_id: Uuid,
        option_id: Option<Uuid>,
        trip_id: Uuid,
        date: NaiveDate,
        time: SlotTime,
        passengers: PassengerMix,
        seats: u32,
        price: PriceBreakdown,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            package_id,
            option_id,
            trip_id,
            date,
            time,
            passengers,
            seats,
            price,
            booking_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_reserved(&self) -> bool {
        self.booking_id.is_some()
    }
}
