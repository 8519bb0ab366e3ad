use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use uuid::Uuid;
use voyage_catalog::inventory::remaining_capacity;
use voyage_catalog::{Booking, BookingStatus, Package, RawPackageOption, Trip};
use voyage_core::repository::{BookingRepository, DateRange, PackageRepository, TripRepository};
use voyage_core::{CoreError, CoreResult};

/// Packages, options, trips and bookings to preload into the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSeed {
    #[serde(default)]
    pub packages: Vec<Package>,
    /// Options keyed by package id.
    #[serde(default)]
    pub options: HashMap<Uuid, Vec<RawPackageOption>>,
    #[serde(default)]
    pub trips: Vec<Trip>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Default)]
struct StoreState {
    packages: HashMap<Uuid, Package>,
    options: HashMap<Uuid, Vec<RawPackageOption>>,
    trips: Vec<Trip>,
    bookings: Vec<Booking>,
}

/// Store kept in process memory. Reservations take the write lock for the
/// whole capacity check and insert.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: StoreSeed) -> Self {
        let state = StoreState {
            packages: seed.packages.into_iter().map(|p| (p.id, p)).collect(),
            options: seed.options,
            trips: seed.trips,
            bookings: seed.bookings,
        };
        Self {
            state: RwLock::new(state),
        }
    }

    pub async fn load_seed_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CoreError::StorageError(format!("reading {}: {}", path.display(), e)))?;
        let seed: StoreSeed = serde_json::from_str(&raw)
            .map_err(|e| CoreError::StorageError(format!("parsing {}: {}", path.display(), e)))?;

        tracing::info!(
            packages = seed.packages.len(),
            trips = seed.trips.len(),
            "loaded store seed from {}",
            path.display()
        );
        Ok(Self::from_seed(seed))
    }

    pub async fn insert_package(&self, package: Package) {
        self.state.write().await.packages.insert(package.id, package);
    }

    pub async fn insert_options(&self, package_id: Uuid, options: Vec<RawPackageOption>) {
        self.state
            .write()
            .await
            .options
            .entry(package_id)
            .or_default()
            .extend(options);
    }

    pub async fn insert_trips(&self, trips: impl IntoIterator<Item = Trip>) {
        self.state.write().await.trips.extend(trips);
    }

    pub async fn insert_booking(&self, booking: Booking) {
        self.state.write().await.bookings.push(booking);
    }

    /// Mark a booking cancelled, releasing its seats.
    pub async fn cancel_booking(&self, booking_id: Uuid) -> CoreResult<()> {
        let mut state = self.state.write().await;
        let booking = state
            .bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or_else(|| CoreError::NotFound(format!("booking {}", booking_id)))?;
        booking.status = BookingStatus::Cancelled;
        Ok(())
    }
}

#[async_trait]
impl PackageRepository for InMemoryStore {
    async fn get_package(&self, package_id: Uuid) -> CoreResult<Option<Package>> {
        Ok(self.state.read().await.packages.get(&package_id).cloned())
    }

    async fn get_package_options(&self, package_id: Uuid) -> CoreResult<Vec<RawPackageOption>> {
        Ok(self
            .state
            .read()
            .await
            .options
            .get(&package_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl TripRepository for InMemoryStore {
    async fn list_trips_for_package(
        &self,
        package_id: Uuid,
        range: Option<DateRange>,
    ) -> CoreResult<Vec<Trip>> {
        let state = self.state.read().await;
        let mut trips: Vec<Trip> = state
            .trips
            .iter()
            .filter(|t| t.package_id == package_id)
            .filter(|t| range.map_or(true, |r| r.contains(t.date)))
            .cloned()
            .collect();
        // Stable, so insertion order breaks ties like creation order would.
        trips.sort_by_key(|t| (t.date, t.time));
        Ok(trips)
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn list_bookings_for_trips(&self, trip_ids: &[Uuid]) -> CoreResult<Vec<Booking>> {
        let state = self.state.read().await;
        Ok(state
            .bookings
            .iter()
            .filter(|b| trip_ids.contains(&b.trip_id))
            .cloned()
            .collect())
    }

    async fn reserve_seats(&self, trip_id: Uuid, pax: u32) -> CoreResult<Booking> {
        let mut state = self.state.write().await;
        let trip = state
            .trips
            .iter()
            .find(|t| t.id == trip_id)
            .ok_or_else(|| CoreError::NotFound(format!("trip {}", trip_id)))?;

        let remaining = remaining_capacity(trip, &state.bookings);
        if remaining < pax {
            tracing::warn!(%trip_id, remaining, requested = pax, "reservation rejected");
            return Err(CoreError::CapacityExceeded {
                trip_id,
                requested: pax,
                remaining,
            });
        }

        let booking = Booking::new(trip_id, pax, BookingStatus::Pending);
        state.bookings.push(booking.clone());
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use voyage_catalog::SlotTime;

    fn trip(package_id: Uuid, day: u32, hour: u32, max: u32) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            package_id,
            date: NaiveDate::from_ymd_opt(2025, 7, day).unwrap(),
            time: SlotTime::new(hour, 0).unwrap(),
            max_participants: max,
        }
    }

    #[tokio::test]
    async fn test_trips_filtered_and_ordered() {
        let store = InMemoryStore::new();
        let package_id = Uuid::new_v4();
        let late = trip(package_id, 20, 9, 10);
        let early_afternoon = trip(package_id, 3, 14, 10);
        let early_morning = trip(package_id, 3, 9, 10);
        let foreign = trip(Uuid::new_v4(), 3, 9, 10);
        store
            .insert_trips(vec![late.clone(), early_afternoon.clone(), early_morning.clone(), foreign])
            .await;

        let all = store.list_trips_for_package(package_id, None).await.unwrap();
        let ids: Vec<Uuid> = all.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![early_morning.id, early_afternoon.id, late.id]);

        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 7, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 31).unwrap(),
        );
        let ranged = store.list_trips_for_package(package_id, Some(range)).await.unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].id, late.id);
    }

    #[tokio::test]
    async fn test_reserve_respects_capacity() {
        let store = InMemoryStore::new();
        let trip = trip(Uuid::new_v4(), 1, 9, 6);
        store.insert_trips([trip.clone()]).await;
        store
            .insert_booking(Booking::new(trip.id, 4, BookingStatus::Cancelled))
            .await;

        let booking = store.reserve_seats(trip.id, 5).await.unwrap();
        assert_eq!(booking.pax, 5);

        let err = store.reserve_seats(trip.id, 2).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::CapacityExceeded { requested: 2, remaining: 1, .. }
        ));

        store.cancel_booking(booking.id).await.unwrap();
        assert!(store.reserve_seats(trip.id, 6).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_reservations_never_oversell() {
        let store = Arc::new(InMemoryStore::new());
        let trip = trip(Uuid::new_v4(), 1, 9, 10);
        store.insert_trips([trip.clone()]).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let trip_id = trip.id;
            handles.push(tokio::spawn(async move { store.reserve_seats(trip_id, 3).await }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 3);

        let bookings = store.list_bookings_for_trips(&[trip.id]).await.unwrap();
        assert_eq!(remaining_capacity(&trip, &bookings), 1);
    }

    #[tokio::test]
    async fn test_unknown_trip() {
        let store = InMemoryStore::new();
        let err = store.reserve_seats(Uuid::new_v4(), 1).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn test_seed_parses_from_json() {
        let package_id = Uuid::new_v4();
        let json = serde_json::json!({
            "packages": [{ "id": package_id, "name": "Krabi", "base_price": 1500 }],
            "options": { (package_id.to_string()): [{ "id": Uuid::new_v4(), "name": "Join", "times": ["09:00"] }] },
            "trips": [{
                "id": Uuid::new_v4(),
                "package_id": package_id,
                "date": "2025-07-01",
                "time": "09:00:00",
                "max_participants": 12
            }]
        });

        let seed: StoreSeed = serde_json::from_value(json).unwrap();
        assert_eq!(seed.packages[0].base_price, 1500);
        assert_eq!(seed.options[&package_id].len(), 1);
        assert_eq!(seed.trips[0].time, SlotTime::new(9, 0).unwrap());
        assert!(seed.bookings.is_empty());
    }
}
