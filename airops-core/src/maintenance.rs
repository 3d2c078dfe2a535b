use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use airops_shared::models::ids::MAX_TEXT_ID_LEN;
use airops_shared::{PilotId, PlaneId, TechnicianId};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::repository::MaintenanceStore;
use crate::{CoreError, CoreResult};

/// Repair codes share the width of the other key columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepairCode(String);

impl RepairCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepairCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RepairCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CoreError::ValidationError("repair code must not be empty".into()));
        }
        if s.chars().count() > MAX_TEXT_ID_LEN {
            return Err(CoreError::ValidationError(format!(
                "repair code is longer than {} characters",
                MAX_TEXT_ID_LEN
            )));
        }
        Ok(Self(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRepair {
    pub plane_id: PlaneId,
    pub technician_id: TechnicianId,
    pub repair_code: RepairCode,
    pub repair_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairRecord {
    pub repair_id: i32,
    pub plane_id: PlaneId,
    pub technician_id: TechnicianId,
    pub repair_code: RepairCode,
    pub repair_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMaintenanceRequest {
    pub plane_id: PlaneId,
    pub pilot_id: PilotId,
    pub repair_code: RepairCode,
    pub request_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceRequestRecord {
    pub request_id: i32,
    pub plane_id: PlaneId,
    pub pilot_id: PilotId,
    pub repair_code: RepairCode,
    pub request_date: NaiveDate,
}

/// Technician repair entries and pilot maintenance requests.
#[derive(Clone)]
pub struct MaintenanceDesk {
    store: Arc<dyn MaintenanceStore>,
}

impl MaintenanceDesk {
    pub fn new(store: Arc<dyn MaintenanceStore>) -> Self {
        Self { store }
    }

    /// Log a completed repair; `repair_date` defaults to today (UTC).
    pub async fn record_repair(
        &self,
        technician_id: TechnicianId,
        plane_id: PlaneId,
        repair_code: RepairCode,
        repair_date: Option<NaiveDate>,
    ) -> CoreResult<RepairRecord> {
        let repair = NewRepair {
            plane_id,
            technician_id,
            repair_code,
            repair_date: repair_date.unwrap_or_else(today),
        };

        let record = self.store.record_repair(&repair).await?;
        info!(
            "Repair {} ({}) recorded on plane {} by technician {}",
            record.repair_id, record.repair_code, record.plane_id, record.technician_id
        );
        Ok(record)
    }

    /// File a maintenance request dated today.
    pub async fn submit_request(
        &self,
        pilot_id: PilotId,
        plane_id: PlaneId,
        repair_code: RepairCode,
    ) -> CoreResult<MaintenanceRequestRecord> {
        let request = NewMaintenanceRequest {
            plane_id,
            pilot_id,
            repair_code,
            request_date: today(),
        };

        let record = self.store.submit_request(&request).await?;
        info!(
            "Maintenance request {} ({}) filed for plane {} by pilot {}",
            record.request_id, record.repair_code, record.plane_id, record.pilot_id
        );
        Ok(record)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
