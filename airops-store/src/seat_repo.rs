use airops_core::flight::{SeatAvailability, SeatCapacity};
use airops_core::repository::{SeatStore, SeatTransaction};
use airops_core::reservation::Reservation;
use airops_core::{CoreError, CoreResult};
use airops_shared::{CustomerId, FlightInstanceId, ReservationId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::database::map_db_error;

pub struct PostgresSeatStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresSeatStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }
}

#[derive(sqlx::FromRow)]
struct CapacityRow {
    seats_total: i32,
    seats_sold: i32,
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    reservation_id: Uuid,
    customer_id: i32,
    flight_instance_id: i32,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = CoreError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        Ok(Reservation {
            id: ReservationId(row.reservation_id),
            customer_id: CustomerId(row.customer_id),
            flight_instance_id: FlightInstanceId(row.flight_instance_id),
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl SeatStore for PostgresSeatStore {
    async fn begin(&self) -> CoreResult<Box<dyn SeatTransaction>> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Scoped to this transaction; a blocked FOR UPDATE fails with 55P03 instead of waiting forever.
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(lock_timeout_setting(self.lock_timeout))
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        Ok(Box::new(PostgresSeatTransaction { tx }))
    }

    async fn seat_availability(
        &self,
        flight_instance_id: FlightInstanceId,
    ) -> CoreResult<Option<SeatAvailability>> {
        let row = sqlx::query_as::<_, CapacityRow>(
            r#"
            SELECT seats_total, seats_sold
            FROM flight_instance
            WHERE flight_instance_id = $1
            "#,
        )
        .bind(flight_instance_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(row.map(|r| {
            SeatAvailability::from_capacity(
                flight_instance_id,
                SeatCapacity::new(r.seats_total, r.seats_sold),
            )
        }))
    }

    async fn reservations_for(
        &self,
        flight_instance_id: FlightInstanceId,
    ) -> CoreResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT reservation_id, customer_id, flight_instance_id, status, created_at
            FROM reservation
            WHERE flight_instance_id = $1
            ORDER BY created_at, reservation_id
            "#,
        )
        .bind(flight_instance_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }
}

/// `lock_timeout` value for Postgres. Zero there means wait forever, so never round down to it.
fn lock_timeout_setting(timeout: Duration) -> String {
    format!("{}ms", timeout.as_millis().max(1))
}

pub struct PostgresSeatTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SeatTransaction for PostgresSeatTransaction {
    async fn lock_capacity(
        &mut self,
        flight_instance_id: FlightInstanceId,
    ) -> CoreResult<Option<SeatCapacity>> {
        let row = sqlx::query_as::<_, CapacityRow>(
            r#"
            SELECT seats_total, seats_sold
            FROM flight_instance
            WHERE flight_instance_id = $1
            FOR UPDATE
            "#,
        )
        .bind(flight_instance_id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        if row.is_some() {
            debug!("Row lock taken on flight instance {}", flight_instance_id);
        }
        Ok(row.map(|r| SeatCapacity::new(r.seats_total, r.seats_sold)))
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reservation (reservation_id, customer_id, flight_instance_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(reservation.id.as_uuid())
        .bind(reservation.customer_id.get())
        .bind(reservation.flight_instance_id.get())
        .bind(reservation.status.as_str())
        .bind(reservation.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    async fn increment_sold(&mut self, flight_instance_id: FlightInstanceId) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE flight_instance
            SET seats_sold = seats_sold + 1
            WHERE flight_instance_id = $1 AND seats_sold < seats_total
            "#,
        )
        .bind(flight_instance_id.get())
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::Conflict(format!(
                "flight instance {} has no seat left to sell",
                flight_instance_id
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        self.tx.commit().await.map_err(map_db_error)
    }

    async fn rollback(self: Box<Self>) -> CoreResult<()> {
        self.tx.rollback().await.map_err(map_db_error)
    }
}
