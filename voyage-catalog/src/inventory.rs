use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;
use crate::option::SlotTime;

/// A scheduled, dated instance of a package with a fixed number of seats.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trip {
    pub id: Uuid,
    pub package_id: Uuid,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub max_participants: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Paid,
    Completed,
    #[serde(alias = "canceled")]
    Cancelled,
}

impl BookingStatus {
    pub fn consumes_capacity(self) -> bool {
        self != BookingStatus::Cancelled
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Paid => "paid",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "paid" => Ok(BookingStatus::Paid),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" | "canceled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub pax: u32,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(trip_id: Uuid, pax: u32, status: BookingStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            pax,
            status,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TripCapacity {
    pub max_participants: u32,
    pub booked: u32,
}

impl TripCapacity {
    pub fn remaining(&self) -> u32 {
        self.max_participants.saturating_sub(self.booked)
    }
}

/// Seats consumed per trip, derived from a snapshot of trips and bookings.
///
/// Read-only: build a fresh ledger for every availability check instead of
/// updating one in place.
#[derive(Debug, Clone, Default)]
pub struct CapacityLedger {
    entries: HashMap<Uuid, TripCapacity>,
}

impl CapacityLedger {
    /// Bookings for trips outside the snapshot are ignored.
    pub fn from_snapshot(trips: &[Trip], bookings: &[Booking]) -> Self {
        let mut entries: HashMap<Uuid, TripCapacity> = trips
            .iter()
            .map(|trip| {
                (
                    trip.id,
                    TripCapacity {
                        max_participants: trip.max_participants,
                        booked: 0,
                    },
                )
            })
            .collect();

        for booking in bookings.iter().filter(|b| b.status.consumes_capacity()) {
            if let Some(entry) = entries.get_mut(&booking.trip_id) {
                entry.booked = entry.booked.saturating_add(booking.pax);
            }
        }

        Self { entries }
    }

    pub fn get(&self, trip_id: &Uuid) -> Option<&TripCapacity> {
        self.entries.get(trip_id)
    }

    /// Seats left on a trip; unknown trips have none.
    pub fn remaining(&self, trip_id: &Uuid) -> u32 {
        self.entries.get(trip_id).map_or(0, TripCapacity::remaining)
    }

    pub fn has_room(&self, trip_id: &Uuid, pax: u32) -> bool {
        self.remaining(trip_id) >= pax
    }
}

/// Remaining seats for one trip given its bookings.
pub fn remaining_capacity(trip: &Trip, bookings: &[Booking]) -> u32 {
    let booked = bookings
        .iter()
        .filter(|b| b.trip_id == trip.id && b.status.consumes_capacity())
        .fold(0u32, |acc, b| acc.saturating_add(b.pax));
    trip.max_participants.saturating_sub(booked)
}
