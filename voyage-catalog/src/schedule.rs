use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;
use crate::inventory::Trip;
use crate::option::{PackageOption, SlotTime};

/// A candidate time on a date together with the trip that represents it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledSlot {
    pub time: SlotTime,
    pub trip_id: Uuid,
}

/// Times an option is offered at, before looking at scheduled trips.
///
/// With a date, only the slot rules for that weekday count; the flat `times`
/// list is never consulted. Without a date, every slot-rule time is a
/// candidate, and the flat list is used only when the option has no rules.
pub fn resolve_candidate_times(option: &PackageOption, date: Option<NaiveDate>) -> Vec<SlotTime> {
    let times: BTreeSet<SlotTime> = match date {
        Some(date) => {
            let weekday = date.weekday();
            option
                .slot_rules
                .iter()
                .filter(|rule| rule.day == weekday)
                .map(|rule| rule.time)
                .collect()
        }
        None if !option.slot_rules.is_empty() => {
            option.slot_rules.iter().map(|rule| rule.time).collect()
        }
        None => option.times.iter().copied().collect(),
    };
    times.into_iter().collect()
}

/// Candidate times on `date` that have at least one scheduled trip.
///
/// Trips are matched on date and minute. When several trips share a time the
/// first one in `trips` represents the slot.
pub fn scheduled_slots(option: &PackageOption, date: NaiveDate, trips: &[Trip]) -> Vec<ScheduledSlot> {
    resolve_candidate_times(option, Some(date))
        .into_iter()
        .filter_map(|time| {
            trips
                .iter()
                .find(|trip| {
                    trip.package_id == option.package_id && trip.date == date && trip.time == time
                })
                .map(|trip| ScheduledSlot { time, trip_id: trip.id })
        })
        .collect()
}

/// Times a traveler may pick for an option. Before a date is chosen this is
/// the catalog's hint; afterwards only times backed by a trip survive.
pub fn candidate_times(option: &PackageOption, date: Option<NaiveDate>, trips: &[Trip]) -> Vec<SlotTime> {
    match date {
        Some(date) => scheduled_slots(option, date, trips)
            .into_iter()
            .map(|slot| slot.time)
            .collect(),
        None => resolve_candidate_times(option, None),
    }
}

/// An option is visible on a date when any of its times has a trip.
/// Remaining seats are not considered here.
pub fn is_visible_on(option: &PackageOption, date: NaiveDate, trips: &[Trip]) -> bool {
    !scheduled_slots(option, date, trips).is_empty()
}

/// First trip scheduled at `date` and `time` for a package.
pub fn find_trip<'a>(
    trips: &'a [Trip],
    package_id: Uuid,
    date: NaiveDate,
    time: SlotTime,
) -> Option<&'a Trip> {
    trips
        .iter()
        .find(|trip| trip.package_id == package_id && trip.date == date && trip.time == time)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Date range is inverted: {from} is after {to}")]
    InvertedRange { from: NaiveDate, to: NaiveDate },

    #[error("No seat capacity given and option {0} has no quota")]
    MissingCapacity(Uuid),
}

/// Generate one trip per date in `from..=to` and slot rule matching that
/// date's weekday. Capacity defaults to the option quota.
pub fn generate_trips(
    option: &PackageOption,
    from: NaiveDate,
    to: NaiveDate,
    max_participants: Option<u32>,
) -> Result<Vec<Trip>, ScheduleError> {
    if from > to {
        return Err(ScheduleError::InvertedRange { from, to });
    }
    let capacity = max_participants
        .or(option.quota)
        .filter(|c| *c > 0)
        .ok_or(ScheduleError::MissingCapacity(option.id))?;

    let trips: Vec<Trip> = from
        .iter_days()
        .take_while(|date| *date <= to)
        .flat_map(|date| {
            resolve_candidate_times(option, Some(date))
                .into_iter()
                .map(move |time| Trip {
                    id: Uuid::new_v4(),
                    package_id: option.package_id,
                    date,
                    time,
                    max_participants: capacity,
                })
        })
        .collect();

    tracing::info!(
        option_id = %option.id,
        %from,
        %to,
        count = trips.len(),
        "generated trips from slot rules"
    );

    Ok(trips)
}
