pub mod draft;
pub mod cart;
pub mod snapshot;
pub mod availability;
pub mod engine;

pub use draft::{BookingDraft, DraftError, DraftEvent, DraftStage};
pub use cart::CartItem;
pub use snapshot::PackageSnapshot;
pub use availability::{AvailabilityOutcome, Suggestion, UnavailableReason, ValidationError};
pub use engine::{AvailabilityCheck, BookingEngine, EngineConfig, EngineError};
