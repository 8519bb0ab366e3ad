use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use voyage_catalog::{PassengerMix, PriceBreakdown, SlotTime};
use crate::cart::CartItem;

/// Where a draft is in the selection flow. Derived from the draft's fields.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftStage {
    Empty,
    DateSelected,
    OptionSelected,
    TimeSelected,
    Confirmed,
}

impl DraftStage {
    pub const ALL: [DraftStage; 5] = [
        DraftStage::Empty,
        DraftStage::DateSelected,
        DraftStage::OptionSelected,
        DraftStage::TimeSelected,
        DraftStage::Confirmed,
    ];

    /// Wire name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            DraftStage::Empty => "EMPTY",
            DraftStage::DateSelected => "DATE_SELECTED",
            DraftStage::OptionSelected => "OPTION_SELECTED",
            DraftStage::TimeSelected => "TIME_SELECTED",
            DraftStage::Confirmed => "CONFIRMED",
        }
    }
}

impl fmt::Display for DraftStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Changes a traveler can make to a draft.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DraftEvent {
    SelectDate { date: Option<NaiveDate> },
    SelectOption { option_id: Option<Uuid> },
    SelectTime { time: Option<SlotTime> },
    SetAdults { count: u32 },
    SetChildren { count: u32 },
    SetInfants { count: u32 },
    /// Bind the trip a successful availability check returned.
    ConfirmAvailability { trip_id: Uuid },
    Reset,
}

impl DraftEvent {
    fn name(&self) -> &'static str {
        match self {
            DraftEvent::SelectDate { .. } => "select_date",
            DraftEvent::SelectOption { .. } => "select_option",
            DraftEvent::SelectTime { .. } => "select_time",
            DraftEvent::SetAdults { .. } => "set_adults",
            DraftEvent::SetChildren { .. } => "set_children",
            DraftEvent::SetInfants { .. } => "set_infants",
            DraftEvent::ConfirmAvailability { .. } => "confirm_availability",
            DraftEvent::Reset => "reset",
        }
    }
}

/// A traveler's in-progress selection.
///
/// Transitions are pure: [`BookingDraft::apply`] consumes the draft and
/// returns the next one. Every change to a selection field drops any
/// availability confirmation, so a confirmed draft always describes exactly
/// the trip that was checked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BookingDraft {
    pub selected_date: Option<NaiveDate>,
    pub selected_option_id: Option<Uuid>,
    pub selected_time_slot: Option<SlotTime>,
    pub adult_count: u32,
    pub child_count: u32,
    pub infant_count: u32,
    pub availability_checked: bool,
    pub confirmed_trip_id: Option<Uuid>,
}

impl Default for BookingDraft {
    fn default() -> Self {
        Self {
            selected_date: None,
            selected_option_id: None,
            selected_time_slot: None,
            adult_count: 1,
            child_count: 0,
            infant_count: 0,
            availability_checked: false,
            confirmed_trip_id: None,
        }
    }
}

impl BookingDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn passengers(&self) -> PassengerMix {
        PassengerMix::new(self.adult_count, self.child_count, self.infant_count)
    }

    pub fn is_confirmed(&self) -> bool {
        self.availability_checked && self.confirmed_trip_id.is_some()
    }

    pub fn stage(&self) -> DraftStage {
        if self.is_confirmed() {
            DraftStage::Confirmed
        } else if self.selected_date.is_some() && self.selected_time_slot.is_some() {
            DraftStage::TimeSelected
        } else if self.selected_date.is_some() && self.selected_option_id.is_some() {
            DraftStage::OptionSelected
        } else if self.selected_date.is_some() {
            DraftStage::DateSelected
        } else {
            DraftStage::Empty
        }
    }

    /// Drop any availability confirmation.
    pub fn invalidated(mut self) -> Self {
        self.availability_checked = false;
        self.confirmed_trip_id = None;
        self
    }

    pub fn apply(self, event: DraftEvent) -> Result<Self, DraftError> {
        let from = self.stage();
        let event_name = event.name();
        let next = match event {
            DraftEvent::SelectDate { date } => {
                if date == self.selected_date {
                    return Ok(self);
                }
                // Times only make sense for the date they were picked on.
                Self {
                    selected_date: date,
                    selected_time_slot: None,
                    ..self
                }
                .invalidated()
            }
            DraftEvent::SelectOption { option_id } => {
                if option_id == self.selected_option_id {
                    return Ok(self);
                }
                Self {
                    selected_option_id: option_id,
                    selected_time_slot: None,
                    ..self
                }
                .invalidated()
            }
            DraftEvent::SelectTime { time } => {
                if time == self.selected_time_slot {
                    return Ok(self);
                }
                if time.is_some() && self.selected_date.is_none() {
                    return Err(DraftError::DateRequired);
                }
                Self {
                    selected_time_slot: time,
                    ..self
                }
                .invalidated()
            }
            DraftEvent::SetAdults { count } => {
                if count == self.adult_count {
                    return Ok(self);
                }
                Self { adult_count: count, ..self }.invalidated()
            }
            DraftEvent::SetChildren { count } => {
                if count == self.child_count {
                    return Ok(self);
                }
                Self { child_count: count, ..self }.invalidated()
            }
            DraftEvent::SetInfants { count } => {
                if count == self.infant_count {
                    return Ok(self);
                }
                Self { infant_count: count, ..self }.invalidated()
            }
            DraftEvent::ConfirmAvailability { trip_id } => {
                if !matches!(from, DraftStage::TimeSelected | DraftStage::Confirmed) {
                    return Err(DraftError::InvalidTransition {
                        from,
                        event: event_name,
                    });
                }
                Self {
                    availability_checked: true,
                    confirmed_trip_id: Some(trip_id),
                    ..self
                }
            }
            DraftEvent::Reset => Self::default(),
        };

        tracing::trace!(%from, to = %next.stage(), event = event_name, "draft transition");
        Ok(next)
    }

    /// Apply several events in order, stopping at the first rejected one.
    pub fn apply_all<I>(self, events: I) -> Result<Self, DraftError>
    where
        I: IntoIterator<Item = DraftEvent>,
    {
        events.into_iter().try_fold(self, |draft, event| draft.apply(event))
    }

    /// The trip bound by the last successful availability check.
    pub fn confirmed_trip(&self) -> Result<Uuid, DraftError> {
        match self.confirmed_trip_id {
            Some(trip_id) if self.availability_checked => Ok(trip_id),
            _ => Err(DraftError::NotConfirmed(self.stage())),
        }
    }

    /// Turn a confirmed draft into a cart item for the confirmed trip.
    pub fn commit(
        &self,
        package_id: Uuid,
        seats: u32,
        price: PriceBreakdown,
    ) -> Result<CartItem, DraftError> {
        let trip_id = self.confirmed_trip()?;
        let (Some(date), Some(time)) = (self.selected_date, self.selected_time_slot) else {
            return Err(DraftError::NotConfirmed(self.stage()));
        };

        Ok(CartItem::new(
            package_id,
            self.selected_option_id,
            trip_id,
            date,
            time,
            self.passengers(),
            seats,
            price,
        ))
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("Cannot {event} while the draft is {from}")]
    InvalidTransition { from: DraftStage, event: &'static str },

    #[error("Select a date before choosing a time slot")]
    DateRequired,

    #[error("Availability has not been confirmed for the current selection (draft is {0})")]
    NotConfirmed(DraftStage),

    #[error("Confirmed trip {0} does not match the selected date and time")]
    TripMismatch(Uuid),
}
