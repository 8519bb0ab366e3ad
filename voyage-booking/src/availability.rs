use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use voyage_catalog::schedule;
use voyage_catalog::{CapacityLedger, SlotTime, Trip};
use crate::draft::BookingDraft;
use crate::snapshot::PackageSnapshot;

pub const DEFAULT_SUGGESTION_LIMIT: usize = 3;

/// Selection problems found before any capacity is looked at.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Please select a travel date")]
    DateRequired,

    #[error("No package options are available on {date}")]
    NoOptionsOnDate { date: NaiveDate },

    #[error("Please select a package option")]
    OptionRequired,

    #[error("The selected option is not offered on this date")]
    OptionNotOffered { option_id: Uuid },

    #[error("At least one adult is required")]
    AdultRequired,

    #[error(
        "This option takes {min} to {} travelers, {requested} selected",
        .max.map_or_else(|| "any number of".to_string(), |m| m.to_string())
    )]
    PaxOutOfRange {
        min: u32,
        max: Option<u32>,
        requested: u32,
    },

    #[error("Please select a time slot")]
    TimeRequired,

    #[error("The {time} departure is no longer offered on this date")]
    TimeNotOffered { time: SlotTime },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnavailableReason {
    NoTrip,
    SoldOut { remaining: u32, requested: u32 },
}

/// An alternative trip offered when the requested one cannot be booked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub trip: Trip,
    pub remaining: u32,
    pub days_away: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AvailabilityOutcome {
    Available {
        trip_id: Uuid,
        remaining: u32,
    },
    Unavailable {
        reason: UnavailableReason,
        suggestions: Vec<Suggestion>,
    },
}

impl AvailabilityOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, AvailabilityOutcome::Available { .. })
    }

    pub fn confirmed_trip_id(&self) -> Option<Uuid> {
        match self {
            AvailabilityOutcome::Available { trip_id, .. } => Some(*trip_id),
            AvailabilityOutcome::Unavailable { .. } => None,
        }
    }
}

/// Check that the drafted selection is still well formed on this snapshot.
///
/// Checks run in a fixed order and stop at the first failure: date, visible
/// options, option choice, adults, passenger range, time choice, and finally
/// whether the chosen time is still offered.
pub fn validate_draft(snapshot: &PackageSnapshot, draft: &BookingDraft) -> Result<(), ValidationError> {
    let date = draft.selected_date.ok_or(ValidationError::DateRequired)?;

    let option = if snapshot.options.is_empty() {
        None
    } else {
        let visible = snapshot.visible_options(date);
        if visible.is_empty() {
            return Err(ValidationError::NoOptionsOnDate { date });
        }
        let option_id = draft.selected_option_id.ok_or(ValidationError::OptionRequired)?;
        let option = visible
            .into_iter()
            .find(|o| o.id == option_id)
            .ok_or(ValidationError::OptionNotOffered { option_id })?;
        Some(option)
    };

    if draft.adult_count < 1 {
        return Err(ValidationError::AdultRequired);
    }

    let requested = draft.passengers().billable_pax(option);
    if let Some(option) = option {
        let bounds = option.pax_bounds();
        if !bounds.contains(requested) {
            return Err(ValidationError::PaxOutOfRange {
                min: bounds.min,
                max: bounds.max,
                requested,
            });
        }
    }

    let time = draft.selected_time_slot.ok_or(ValidationError::TimeRequired)?;
    let offered = match option {
        Some(option) => schedule::candidate_times(option, Some(date), &snapshot.trips),
        None => snapshot.package_times(date),
    };
    if !offered.contains(&time) {
        return Err(ValidationError::TimeNotOffered { time });
    }

    Ok(())
}

/// Decide whether the drafted trip can be booked right now.
///
/// Validation errors are returned before the capacity ledger is consulted.
/// When the exact trip is missing or short of seats, up to `limit` nearby
/// trips are suggested instead.
pub fn check_availability(
    snapshot: &PackageSnapshot,
    draft: &BookingDraft,
    limit: usize,
) -> Result<AvailabilityOutcome, ValidationError> {
    validate_draft(snapshot, draft)?;

    // Both are guaranteed by validation.
    let (Some(date), Some(time)) = (draft.selected_date, draft.selected_time_slot) else {
        return Err(ValidationError::DateRequired);
    };
    let requested = snapshot.requested_seats(draft);

    let reason = match schedule::find_trip(&snapshot.trips, snapshot.package.id, date, time) {
        Some(trip) => {
            let remaining = snapshot.remaining(&trip.id);
            if remaining >= requested {
                tracing::debug!(trip_id = %trip.id, remaining, requested, "trip available");
                return Ok(AvailabilityOutcome::Available {
                    trip_id: trip.id,
                    remaining,
                });
            }
            UnavailableReason::SoldOut { remaining, requested }
        }
        None => UnavailableReason::NoTrip,
    };

    let suggestions = nearby_suggestions(&snapshot.trips, &snapshot.ledger, date, time, requested, limit);
    tracing::debug!(
        %date,
        %time,
        requested,
        ?reason,
        suggestions = suggestions.len(),
        "requested trip unavailable"
    );

    Ok(AvailabilityOutcome::Unavailable { reason, suggestions })
}

/// Trips closest in date to the request.
///
/// Prefers trips at the same time of day with enough seats. If there are
/// none, every trip is a candidate regardless of time or seats. Candidates
/// are ordered by distance in days; equal distances keep `trips` order.
pub fn nearby_suggestions(
    trips: &[Trip],
    ledger: &CapacityLedger,
    date: NaiveDate,
    time: SlotTime,
    requested: u32,
    limit: usize,
) -> Vec<Suggestion> {
    let same_time: Vec<&Trip> = trips
        .iter()
        .filter(|trip| trip.time == time && ledger.has_room(&trip.id, requested))
        .collect();

    let pool = if same_time.is_empty() {
        trips.iter().collect()
    } else {
        same_time
    };

    let mut ranked: Vec<(i64, &Trip)> = pool
        .into_iter()
        .map(|trip| ((trip.date - date).num_days().abs(), trip))
        .collect();
    ranked.sort_by_key(|(days_away, _)| *days_away);

    ranked
        .into_iter()
        .take(limit)
        .map(|(days_away, trip)| Suggestion {
            trip: trip.clone(),
            remaining: ledger.remaining(&trip.id),
            days_away,
        })
        .collect()
}
