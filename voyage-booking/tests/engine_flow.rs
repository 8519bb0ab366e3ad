use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use voyage_booking::{
    AvailabilityOutcome, BookingDraft, BookingEngine, DraftError, DraftEvent, EngineConfig,
    EngineError, UnavailableReason, ValidationError,
};
use voyage_catalog::{Package, RawPackageOption, RawSlotRule, SlotTime, Trip};
use voyage_core::repository::{BookingRepository, EventPublisher};
use voyage_core::{CoreError, CoreResult};
use voyage_shared::models::BookingReservedEvent;
use voyage_store::InMemoryStore;

#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<BookingReservedEvent>>,
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish_booking_reserved(&self, event: &BookingReservedEvent) -> CoreResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

struct BrokenPublisher;

#[async_trait]
impl EventPublisher for BrokenPublisher {
    async fn publish_booking_reserved(&self, _event: &BookingReservedEvent) -> CoreResult<()> {
        Err(CoreError::EventError("broker unreachable".to_string()))
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

fn nine() -> SlotTime {
    SlotTime::new(9, 0).unwrap()
}

fn trip(package_id: Uuid, date: NaiveDate, time: SlotTime, max: u32) -> Trip {
    Trip {
        id: Uuid::new_v4(),
        package_id,
        date,
        time,
        max_participants: max,
    }
}

struct World {
    store: Arc<InMemoryStore>,
    package_id: Uuid,
    option_id: Uuid,
}

impl World {
    async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let package_id = Uuid::new_v4();
        let option_id = Uuid::new_v4();

        store
            .insert_package(Package {
                id: package_id,
                name: "Similan snorkeling".to_string(),
                base_price: 2000,
            })
            .await;
        store
            .insert_options(
                package_id,
                vec![RawPackageOption {
                    id: option_id,
                    name: "Private longtail".to_string(),
                    group_type: Some("private".to_string()),
                    quota: Some(8),
                    is_flat_rate: true,
                    flat_rate_price: Some(26900),
                    slot_rules: ["fri", "sat"]
                        .iter()
                        .map(|day| RawSlotRule { day: json!(day), time: json!("09:00") })
                        .collect(),
                    ..Default::default()
                }],
            )
            .await;

        Self {
            store,
            package_id,
            option_id,
        }
    }

    fn engine(&self) -> BookingEngine {
        BookingEngine::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            EngineConfig::default(),
        )
    }

    fn draft(&self, date: NaiveDate, adults: u32) -> BookingDraft {
        BookingDraft::new()
            .apply_all([
                DraftEvent::SelectDate { date: Some(date) },
                DraftEvent::SelectOption { option_id: Some(self.option_id) },
                DraftEvent::SelectTime { time: Some(nine()) },
                DraftEvent::SetAdults { count: adults },
                DraftEvent::SetChildren { count: 2 },
            ])
            .unwrap()
    }
}

#[tokio::test]
async fn test_check_commit_and_publish() {
    let world = World::new().await;
    // 2025-08-08 is a Friday.
    let friday = trip(world.package_id, date(8, 8), nine(), 8);
    world.store.insert_trips([friday.clone()]).await;

    let publisher = Arc::new(RecordingPublisher::default());
    let engine = world.engine().with_events(publisher.clone());

    let check = engine
        .check_availability(world.package_id, world.draft(date(8, 8), 3), today())
        .await
        .unwrap();
    assert!(check.outcome.is_available());
    assert!(check.draft.is_confirmed());

    let item = engine.commit(world.package_id, &check.draft, today()).await.unwrap();
    // Private groups hold a seat per adult; the flat rate ignores headcount.
    assert_eq!(item.seats, 3);
    assert_eq!(item.price.total, 26900);
    assert!(item.is_reserved());

    let events = publisher.events.lock().unwrap().clone();
    assert_eq!(events.len(), 1);
    assert_eq!(Some(events[0].booking_id), item.booking_id);
    assert_eq!(events[0].trip_id, friday.id);
    assert_eq!(events[0].pax, 3);
    assert_eq!(events[0].total, 26900);
    assert!(events[0].timestamp > 0);

    let bookings = world.store.list_bookings_for_trips(&[friday.id]).await.unwrap();
    assert_eq!(bookings.len(), 1);
}

#[tokio::test]
async fn test_publish_failure_keeps_reservation() {
    let world = World::new().await;
    let friday = trip(world.package_id, date(8, 8), nine(), 8);
    world.store.insert_trips([friday.clone()]).await;
    let engine = world.engine().with_events(Arc::new(BrokenPublisher));

    let check = engine
        .check_availability(world.package_id, world.draft(date(8, 8), 2), today())
        .await
        .unwrap();
    let item = engine.commit(world.package_id, &check.draft, today()).await.unwrap();

    assert!(item.is_reserved());
    let bookings = world.store.list_bookings_for_trips(&[friday.id]).await.unwrap();
    assert_eq!(bookings.len(), 1);
}

#[tokio::test]
async fn test_confirmed_draft_loses_race() {
    let world = World::new().await;
    let friday = trip(world.package_id, date(8, 8), nine(), 8);
    world.store.insert_trips([friday.clone()]).await;
    let engine = world.engine();

    let first = engine
        .check_availability(world.package_id, world.draft(date(8, 8), 5), today())
        .await
        .unwrap();
    let second = engine
        .check_availability(world.package_id, world.draft(date(8, 8), 5), today())
        .await
        .unwrap();
    assert!(first.draft.is_confirmed());
    assert!(second.draft.is_confirmed());

    engine.commit(world.package_id, &first.draft, today()).await.unwrap();
    let err = engine
        .commit(world.package_id, &second.draft, today())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::CapacityExceeded { requested: 5, remaining: 3, .. })
    ));
}

#[tokio::test]
async fn test_sold_out_suggests_and_invalidates() {
    let world = World::new().await;
    let friday = trip(world.package_id, date(8, 8), nine(), 4);
    let saturday = trip(world.package_id, date(8, 9), nine(), 8);
    let next_friday = trip(world.package_id, date(8, 15), nine(), 8);
    world
        .store
        .insert_trips([friday.clone(), saturday.clone(), next_friday.clone()])
        .await;
    world.store.reserve_seats(friday.id, 2).await.unwrap();
    let engine = world.engine();

    let check = engine
        .check_availability(world.package_id, world.draft(date(8, 8), 3), today())
        .await
        .unwrap();

    match check.outcome {
        AvailabilityOutcome::Unavailable { reason, suggestions } => {
            assert_eq!(reason, UnavailableReason::SoldOut { remaining: 2, requested: 3 });
            let ids: Vec<Uuid> = suggestions.iter().map(|s| s.trip.id).collect();
            assert_eq!(ids, vec![saturday.id, next_friday.id]);
            assert_eq!(suggestions[0].days_away, 1);
            assert_eq!(suggestions[1].days_away, 7);
        }
        other => panic!("expected unavailable, got {:?}", other),
    }
    assert!(!check.draft.is_confirmed());
}

#[tokio::test]
async fn test_validation_surfaces_before_capacity() {
    let world = World::new().await;
    world
        .store
        .insert_trips([trip(world.package_id, date(8, 8), nine(), 8)])
        .await;
    let engine = world.engine();

    // 2025-08-10 is a Sunday: no slot rule, so no option is offered.
    let draft = BookingDraft::new()
        .apply(DraftEvent::SelectDate { date: Some(date(8, 10)) })
        .unwrap();
    let err = engine
        .check_availability(world.package_id, draft, today())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::NoOptionsOnDate { .. })
    ));

    // Quota of 8 bounds a private group.
    let err = engine
        .check_availability(world.package_id, world.draft(date(8, 8), 9), today())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::PaxOutOfRange { requested: 9, .. })
    ));
}

#[tokio::test]
async fn test_trips_outside_horizon_are_ignored() {
    let world = World::new().await;
    let past = trip(world.package_id, date(7, 25), nine(), 8);
    world.store.insert_trips([past]).await;
    let engine = world.engine();

    let options = engine
        .visible_options(world.package_id, Some(date(7, 25)), today())
        .await
        .unwrap();
    assert!(options.is_empty());

    let all = engine.visible_options(world.package_id, None, today()).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_commit_rejects_unconfirmed_and_stale_drafts() {
    let world = World::new().await;
    let friday = trip(world.package_id, date(8, 8), nine(), 8);
    world.store.insert_trips([friday.clone()]).await;
    let engine = world.engine();

    let err = engine
        .commit(world.package_id, &world.draft(date(8, 8), 2), today())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Draft(DraftError::NotConfirmed(_))));

    // A draft bound to a trip that no longer matches its selection.
    let forged = BookingDraft {
        selected_date: Some(date(8, 9)),
        availability_checked: true,
        confirmed_trip_id: Some(friday.id),
        ..world.draft(date(8, 9), 2)
    };
    let err = engine.commit(world.package_id, &forged, today()).await.unwrap_err();
    assert!(matches!(err, EngineError::Draft(DraftError::TripMismatch(id)) if id == friday.id));
}

#[tokio::test]
async fn test_commit_revalidates_edited_passengers() {
    let world = World::new().await;
    let friday = trip(world.package_id, date(8, 8), nine(), 40);
    world.store.insert_trips([friday.clone()]).await;
    let engine = world.engine();

    let check = engine
        .check_availability(world.package_id, world.draft(date(8, 8), 2), today())
        .await
        .unwrap();
    assert!(check.draft.is_confirmed());

    // Counters changed on the record itself, without going through `apply`.
    let emptied = BookingDraft {
        adult_count: 0,
        child_count: 0,
        ..check.draft.clone()
    };
    let err = engine.commit(world.package_id, &emptied, today()).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::AdultRequired)));

    let crowded = BookingDraft {
        adult_count: 20,
        child_count: 10,
        ..check.draft.clone()
    };
    let err = engine.commit(world.package_id, &crowded, today()).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::PaxOutOfRange { max: Some(8), requested: 20, .. })
    ));

    let swapped = BookingDraft {
        selected_option_id: Some(Uuid::new_v4()),
        ..check.draft.clone()
    };
    let err = engine.commit(world.package_id, &swapped, today()).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::OptionNotOffered { .. })));

    let bookings = world.store.list_bookings_for_trips(&[friday.id]).await.unwrap();
    assert!(bookings.is_empty());
}

#[tokio::test]
async fn test_commit_requires_the_trip_serving_the_slot() {
    let world = World::new().await;
    let friday = trip(world.package_id, date(8, 8), nine(), 8);
    let duplicate = trip(world.package_id, date(8, 8), nine(), 8);
    world.store.insert_trips([friday.clone(), duplicate.clone()]).await;
    let engine = world.engine();

    let check = engine
        .check_availability(world.package_id, world.draft(date(8, 8), 2), today())
        .await
        .unwrap();
    assert_eq!(check.outcome.confirmed_trip_id(), Some(friday.id));

    let rebound = BookingDraft {
        confirmed_trip_id: Some(duplicate.id),
        ..check.draft.clone()
    };
    let err = engine.commit(world.package_id, &rebound, today()).await.unwrap_err();
    assert!(matches!(err, EngineError::Draft(DraftError::TripMismatch(id)) if id == duplicate.id));

    let item = engine.commit(world.package_id, &check.draft, today()).await.unwrap();
    assert_eq!(item.trip_id, friday.id);
}

#[tokio::test]
async fn test_package_without_options_uses_trip_times_and_base_price() {
    let store = Arc::new(InMemoryStore::new());
    let package_id = Uuid::new_v4();
    store
        .insert_package(Package {
            id: package_id,
            name: "Night market walk".to_string(),
            base_price: 900,
        })
        .await;
    let evening = SlotTime::new(18, 30).unwrap();
    store
        .insert_trips([trip(package_id, date(8, 5), evening, 12)])
        .await;
    let engine = BookingEngine::new(store.clone(), store.clone(), store.clone(), EngineConfig::default());

    let draft = BookingDraft::new()
        .apply_all([
            DraftEvent::SelectDate { date: Some(date(8, 5)) },
            DraftEvent::SelectTime { time: Some(evening) },
            DraftEvent::SetAdults { count: 2 },
            DraftEvent::SetChildren { count: 1 },
        ])
        .unwrap();

    let price = engine.price_draft(package_id, &draft, today()).await.unwrap();
    assert_eq!(price.total, 2700);

    let check = engine.check_availability(package_id, draft, today()).await.unwrap();
    assert!(check.outcome.is_available());
    let item = engine.commit(package_id, &check.draft, today()).await.unwrap();
    assert_eq!(item.seats, 3);
    assert_eq!(item.option_id, None);
}

#[tokio::test]
async fn test_unknown_package() {
    let world = World::new().await;
    let err = world
        .engine()
        .check_availability(Uuid::new_v4(), BookingDraft::new(), today())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PackageNotFound(_)));
}
