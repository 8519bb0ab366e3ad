use chrono::{Days, NaiveDate};
use std::sync::Arc;
use uuid::Uuid;
use voyage_catalog::schedule;
use voyage_catalog::{PackageOption, PriceBreakdown, SlotTime};
use voyage_core::repository::{
    BookingRepository, DateRange, EventPublisher, PackageRepository, TripRepository,
};
use voyage_core::CoreError;
use voyage_shared::models::BookingReservedEvent;
use crate::availability::{self, AvailabilityOutcome, ValidationError, DEFAULT_SUGGESTION_LIMIT};
use crate::cart::CartItem;
use crate::draft::{BookingDraft, DraftError, DraftEvent};
use crate::snapshot::PackageSnapshot;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of alternative trips returned by a failed check.
    pub suggestion_limit: usize,
    /// How many days ahead of today trips are loaded.
    pub horizon_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            horizon_days: 365,
        }
    }
}

/// Result of an availability check along with the draft it produced.
#[derive(Debug, Clone)]
pub struct AvailabilityCheck {
    pub outcome: AvailabilityOutcome,
    pub draft: BookingDraft,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Package not found: {0}")]
    PackageNotFound(Uuid),

    #[error("Option not found: {0}")]
    OptionNotFound(Uuid),

    #[error("Trip not found: {0}")]
    TripNotFound(Uuid),
}

/// Loads package snapshots from the store and answers storefront queries.
///
/// Every call reads a fresh snapshot; nothing is cached between requests.
pub struct BookingEngine {
    packages: Arc<dyn PackageRepository>,
    trips: Arc<dyn TripRepository>,
    bookings: Arc<dyn BookingRepository>,
    events: Option<Arc<dyn EventPublisher>>,
    config: EngineConfig,
}

impl BookingEngine {
    pub fn new(
        packages: Arc<dyn PackageRepository>,
        trips: Arc<dyn TripRepository>,
        bookings: Arc<dyn BookingRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            packages,
            trips,
            bookings,
            events: None,
            config,
        }
    }

    pub fn with_events(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(publisher);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read the package, its options, upcoming trips and their bookings.
    pub async fn load_snapshot(
        &self,
        package_id: Uuid,
        today: NaiveDate,
    ) -> Result<PackageSnapshot, EngineError> {
        let package = self
            .packages
            .get_package(package_id)
            .await?
            .ok_or(EngineError::PackageNotFound(package_id))?;
        let raw_options = self.packages.get_package_options(package_id).await?;

        let range = trip_window(today, self.config.horizon_days);
        let trips = self.trips.list_trips_for_package(package_id, Some(range)).await?;

        let trip_ids: Vec<Uuid> = trips.iter().map(|t| t.id).collect();
        let bookings = if trip_ids.is_empty() {
            Vec::new()
        } else {
            self.bookings.list_bookings_for_trips(&trip_ids).await?
        };

        tracing::info!(
            %package_id,
            options = raw_options.len(),
            trips = trips.len(),
            bookings = bookings.len(),
            "loaded package snapshot"
        );

        Ok(PackageSnapshot::new(package, raw_options, trips, &bookings))
    }

    /// Options orderable on `date`, or every option when no date is given.
    pub async fn visible_options(
        &self,
        package_id: Uuid,
        date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Vec<PackageOption>, EngineError> {
        let snapshot = self.load_snapshot(package_id, today).await?;
        let options = match date {
            Some(date) => snapshot.visible_options(date).into_iter().cloned().collect(),
            None => snapshot.options,
        };
        Ok(options)
    }

    pub async fn candidate_times(
        &self,
        package_id: Uuid,
        option_id: Uuid,
        date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Vec<SlotTime>, EngineError> {
        let snapshot = self.load_snapshot(package_id, today).await?;
        snapshot
            .candidate_times(&option_id, date)
            .ok_or(EngineError::OptionNotFound(option_id))
    }

    /// Run the availability check and bind the trip on success. A failed
    /// check always hands back an unconfirmed draft.
    pub async fn check_availability(
        &self,
        package_id: Uuid,
        draft: BookingDraft,
        today: NaiveDate,
    ) -> Result<AvailabilityCheck, EngineError> {
        let snapshot = self.load_snapshot(package_id, today).await?;
        let outcome = availability::check_availability(&snapshot, &draft, self.config.suggestion_limit)?;

        let draft = match outcome.confirmed_trip_id() {
            Some(trip_id) => draft.apply(DraftEvent::ConfirmAvailability { trip_id })?,
            None => draft.invalidated(),
        };

        Ok(AvailabilityCheck { outcome, draft })
    }

    pub async fn price_draft(
        &self,
        package_id: Uuid,
        draft: &BookingDraft,
        today: NaiveDate,
    ) -> Result<PriceBreakdown, EngineError> {
        let snapshot = self.load_snapshot(package_id, today).await?;
        if let Some(option_id) = draft.selected_option_id {
            if snapshot.option(&option_id).is_none() {
                return Err(EngineError::OptionNotFound(option_id));
            }
        }
        Ok(snapshot.price_draft(draft))
    }

    /// Commit a confirmed draft: price it, reserve the seats atomically in the
    /// store, and announce the reservation.
    ///
    /// The draft comes back from the client, so the selection is validated
    /// again and the confirmed trip must still be the one serving the
    /// selected slot. The store re-checks capacity and fails with
    /// [`CoreError::CapacityExceeded`] if the seats were taken meanwhile.
    pub async fn commit(
        &self,
        package_id: Uuid,
        draft: &BookingDraft,
        today: NaiveDate,
    ) -> Result<CartItem, EngineError> {
        let trip_id = draft.confirmed_trip()?;
        let snapshot = self.load_snapshot(package_id, today).await?;

        let trip = snapshot.trip(&trip_id).ok_or(EngineError::TripNotFound(trip_id))?;
        if Some(trip.date) != draft.selected_date || Some(trip.time) != draft.selected_time_slot {
            return Err(DraftError::TripMismatch(trip_id).into());
        }
        let (trip_date, trip_time) = (trip.date, trip.time);

        availability::validate_draft(&snapshot, draft)?;

        let serving = schedule::find_trip(&snapshot.trips, package_id, trip_date, trip_time);
        if serving.map(|t| t.id) != Some(trip_id) {
            tracing::warn!(%trip_id, "confirmed trip no longer serves the selected slot");
            return Err(DraftError::TripMismatch(trip_id).into());
        }

        let seats = snapshot.requested_seats(draft);
        let price = snapshot.price_draft(draft);
        let mut item = draft.commit(package_id, seats, price)?;

        let booking = self.bookings.reserve_seats(trip_id, seats).await?;
        item.booking_id = Some(booking.id);
        tracing::info!(
            %trip_id,
            booking_id = %booking.id,
            seats,
            total = item.price.total,
            "reserved seats for cart item"
        );

        if let Some(events) = &self.events {
            let event = BookingReservedEvent {
                booking_id: booking.id,
                trip_id,
                package_id,
                option_id: item.option_id,
                trip_date,
                pax: seats,
                total: item.price.total,
                timestamp: 0,
            }
            .stamped();
            // The booking exists either way; a lost event is not rolled back.
            if let Err(e) = events.publish_booking_reserved(&event).await {
                tracing::error!(booking_id = %booking.id, "failed to publish reservation event: {}", e);
            }
        }

        Ok(item)
    }
}

/// Trips loaded for a snapshot: today through the horizon, open-ended when
/// the horizon runs past the calendar.
fn trip_window(today: NaiveDate, horizon_days: u32) -> DateRange {
    let to = today
        .checked_add_days(Days::new(u64::from(horizon_days)))
        .unwrap_or(NaiveDate::MAX);
    DateRange::new(today, to)
}
