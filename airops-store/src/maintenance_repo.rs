use airops_core::maintenance::{
    MaintenanceRequestRecord, NewMaintenanceRequest, NewRepair, RepairRecord,
};
use airops_core::repository::MaintenanceStore;
use airops_core::{CoreError, CoreResult};
use airops_shared::PlaneId;
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use crate::database::map_db_error;

pub struct PostgresMaintenanceStore {
    pool: PgPool,
}

impl PostgresMaintenanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Lock the plane row for the rest of the transaction, or fail with `NotFound`.
async fn lock_plane(conn: &mut PgConnection, plane_id: &PlaneId) -> CoreResult<()> {
    let found: Option<(String,)> =
        sqlx::query_as("SELECT plane_id FROM plane WHERE plane_id = $1 FOR UPDATE")
            .bind(plane_id.as_str())
            .fetch_optional(conn)
            .await
            .map_err(map_db_error)?;

    found
        .map(|_| ())
        .ok_or_else(|| CoreError::NotFound(format!("plane {}", plane_id)))
}

#[async_trait]
impl MaintenanceStore for PostgresMaintenanceStore {
    async fn record_repair(&self, repair: &NewRepair) -> CoreResult<RepairRecord> {
        // Early returns drop `tx`, which rolls it back.
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        lock_plane(&mut tx, &repair.plane_id).await?;

        let (repair_id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO repair (plane_id, repair_code, repair_date, technician_id)
            VALUES ($1, $2, $3, $4)
            RETURNING repair_id
            "#,
        )
        .bind(repair.plane_id.as_str())
        .bind(repair.repair_code.as_str())
        .bind(repair.repair_date)
        .bind(repair.technician_id.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        // GREATEST skips NULLs, so a plane's first repair sets the date outright.
        sqlx::query(
            r#"
            UPDATE plane
            SET last_repair_date = GREATEST(last_repair_date, $1)
            WHERE plane_id = $2
            "#,
        )
        .bind(repair.repair_date)
        .bind(repair.plane_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(RepairRecord {
            repair_id,
            plane_id: repair.plane_id.clone(),
            technician_id: repair.technician_id.clone(),
            repair_code: repair.repair_code.clone(),
            repair_date: repair.repair_date,
        })
    }

    async fn submit_request(
        &self,
        request: &NewMaintenanceRequest,
    ) -> CoreResult<MaintenanceRequestRecord> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        lock_plane(&mut tx, &request.plane_id).await?;

        let (request_id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO maintenance_request (plane_id, repair_code, request_date, pilot_id)
            VALUES ($1, $2, $3, $4)
            RETURNING request_id
            "#,
        )
        .bind(request.plane_id.as_str())
        .bind(request.repair_code.as_str())
        .bind(request.request_date)
        .bind(request.pilot_id.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(MaintenanceRequestRecord {
            request_id,
            plane_id: request.plane_id.clone(),
            pilot_id: request.pilot_id.clone(),
            repair_code: request.repair_code.clone(),
            request_date: request.request_date,
        })
    }
}
