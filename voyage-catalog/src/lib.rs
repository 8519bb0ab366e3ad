pub mod option;
pub mod pricing;
pub mod schedule;
pub mod inventory;

pub use option::{
    CatalogWarning, GroupType, Package, PackageOption, PaxBounds, PricingScheme, PricingTier,
    RawPackageOption, RawPricingTier, RawSlotRule, SlotRule, SlotTime,
};
pub use pricing::{PassengerMix, PriceBreakdown, PriceQuote};
pub use schedule::{ScheduleError, ScheduledSlot};
pub use inventory::{Booking, BookingStatus, CapacityLedger, Trip, TripCapacity};
