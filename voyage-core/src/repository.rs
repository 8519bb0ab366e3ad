use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use voyage_catalog::{Booking, Package, RawPackageOption, Trip};
use voyage_shared::models::BookingReservedEvent;
use crate::CoreResult;

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Repository trait for package catalog access
#[async_trait]
pub trait PackageRepository: Send + Sync {
    async fn get_package(&self, package_id: Uuid) -> CoreResult<Option<Package>>;

    /// Options in their stored, unvalidated form.
    async fn get_package_options(&self, package_id: Uuid) -> CoreResult<Vec<RawPackageOption>>;
}

/// Repository trait for scheduled trips
#[async_trait]
pub trait TripRepository: Send + Sync {
    /// Trips ordered by date, then time, then creation.
    async fn list_trips_for_package(
        &self,
        package_id: Uuid,
        range: Option<DateRange>,
    ) -> CoreResult<Vec<Trip>>;
}

/// Repository trait for bookings against trips
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn list_bookings_for_trips(&self, trip_ids: &[Uuid]) -> CoreResult<Vec<Booking>>;

    /// Insert a booking only if the trip still has `pax` seats. The capacity
    /// read and the insert must be atomic with respect to other reservations.
    async fn reserve_seats(&self, trip_id: Uuid, pax: u32) -> CoreResult<Booking>;
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish_booking_reserved(&self, event: &BookingReservedEvent) -> CoreResult<()>;
}
