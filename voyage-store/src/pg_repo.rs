use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;
use voyage_catalog::{Booking, BookingStatus, Package, RawPackageOption, SlotTime, Trip};
use voyage_core::repository::{BookingRepository, DateRange, PackageRepository, TripRepository};
use voyage_core::{CoreError, CoreResult};

/// Spellings of the cancelled status, compared after `lower(btrim(..))`.
/// Must cover every spelling `BookingStatus::from_str` maps to `Cancelled`.
const CANCELLED_SPELLINGS: [&str; 2] = ["cancelled", "canceled"];

/// Postgres-backed repositories. Capacity is re-checked under a row lock
/// on the trip when seats are reserved.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PackageRow {
    id: Uuid,
    name: String,
    base_price: i64,
}

#[derive(sqlx::FromRow)]
struct OptionRow {
    id: Uuid,
    document: Value,
}

#[derive(sqlx::FromRow)]
struct TripRow {
    id: Uuid,
    package_id: Uuid,
    trip_date: NaiveDate,
    trip_time: NaiveTime,
    max_participants: i32,
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    trip_id: Uuid,
    pax: i32,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<TripRow> for Trip {
    fn from(row: TripRow) -> Self {
        Trip {
            id: row.id,
            package_id: row.package_id,
            date: row.trip_date,
            time: SlotTime::from_time(row.trip_time),
            max_participants: u32::try_from(row.max_participants).unwrap_or(0),
        }
    }
}

impl TryFrom<BookingRow> for Booking {
    type Error = CoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status: BookingStatus = row
            .status
            .parse()
            .map_err(|e: String| CoreError::StorageError(format!("booking {}: {}", row.id, e)))?;
        Ok(Booking {
            id: row.id,
            trip_id: row.trip_id,
            pax: u32::try_from(row.pax).unwrap_or(0),
            status,
            created_at: row.created_at,
        })
    }
}

fn storage_error(e: sqlx::Error) -> CoreError {
    CoreError::StorageError(e.to_string())
}

fn to_db_int(value: u32) -> CoreResult<i32> {
    i32::try_from(value).map_err(|_| CoreError::ValidationError(format!("value {} out of range", value)))
}

#[async_trait]
impl PackageRepository for PostgresStore {
    async fn get_package(&self, package_id: Uuid) -> CoreResult<Option<Package>> {
        let row = sqlx::query_as::<_, PackageRow>(
            "SELECT id, name, base_price FROM packages WHERE id = $1",
        )
        .bind(package_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(row.map(|r| Package {
            id: r.id,
            name: r.name,
            base_price: r.base_price,
        }))
    }

    async fn get_package_options(&self, package_id: Uuid) -> CoreResult<Vec<RawPackageOption>> {
        let rows = sqlx::query_as::<_, OptionRow>(
            "SELECT id, document FROM package_options WHERE package_id = $1 ORDER BY position, id",
        )
        .bind(package_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        let mut options = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<RawPackageOption>(row.document) {
                Ok(mut raw) => {
                    raw.id = row.id;
                    options.push(raw);
                }
                // One broken document must not hide the rest of the package.
                Err(e) => tracing::warn!(option_id = %row.id, "skipping unreadable option document: {}", e),
            }
        }
        Ok(options)
    }
}

#[async_trait]
impl TripRepository for PostgresStore {
    async fn list_trips_for_package(
        &self,
        package_id: Uuid,
        range: Option<DateRange>,
    ) -> CoreResult<Vec<Trip>> {
        let (from, to) = match range {
            Some(r) => (Some(r.from), Some(r.to)),
            None => (None, None),
        };

        let rows = sqlx::query_as::<_, TripRow>(
            r#"
            SELECT id, package_id, trip_date, trip_time, max_participants
            FROM trips
            WHERE package_id = $1
              AND ($2::date IS NULL OR trip_date >= $2)
              AND ($3::date IS NULL OR trip_date <= $3)
            ORDER BY trip_date, trip_time, created_at
            "#,
        )
        .bind(package_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.into_iter().map(Trip::from).collect())
    }
}

#[async_trait]
impl BookingRepository for PostgresStore {
    async fn list_bookings_for_trips(&self, trip_ids: &[Uuid]) -> CoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT id, trip_id, pax, status, created_at FROM bookings WHERE trip_id = ANY($1)",
        )
        .bind(trip_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn reserve_seats(&self, trip_id: Uuid, pax: u32) -> CoreResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        // Serializes concurrent reservations for the same trip.
        let max_participants: Option<i32> = sqlx::query_scalar(
            "SELECT max_participants FROM trips WHERE id = $1 FOR UPDATE",
        )
        .bind(trip_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?;

        let max_participants = max_participants
            .ok_or_else(|| CoreError::NotFound(format!("trip {}", trip_id)))?;

        let booked: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(pax), 0)::BIGINT
            FROM bookings
            WHERE trip_id = $1 AND lower(btrim(status)) <> ALL($2)
            "#,
        )
        .bind(trip_id)
        .bind(&CANCELLED_SPELLINGS[..])
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_error)?;

        let remaining = (i64::from(max_participants) - booked).max(0);
        let remaining = u32::try_from(remaining).unwrap_or(u32::MAX);
        if remaining < pax {
            tracing::warn!(%trip_id, remaining, requested = pax, "reservation rejected");
            return Err(CoreError::CapacityExceeded {
                trip_id,
                requested: pax,
                remaining,
            });
        }

        let booking = Booking::new(trip_id, pax, BookingStatus::Pending);
        sqlx::query(
            r#"
            INSERT INTO bookings (id, trip_id, pax, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(booking.id)
        .bind(booking.trip_id)
        .bind(to_db_int(booking.pax)?)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        Ok(booking)
    }
}
