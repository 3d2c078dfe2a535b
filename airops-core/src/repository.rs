use airops_shared::{FlightInstanceId, Masked};
use async_trait::async_trait;

use crate::flight::{SeatAvailability, SeatCapacity};
use crate::identity::Account;
use crate::maintenance::{MaintenanceRequestRecord, NewMaintenanceRequest, NewRepair, RepairRecord};
use crate::reservation::Reservation;
use crate::CoreResult;

/// Capacity store and reservation ledger behind one transactional handle.
#[async_trait]
pub trait SeatStore: Send + Sync {
    async fn begin(&self) -> CoreResult<Box<dyn SeatTransaction>>;

    async fn seat_availability(
        &self,
        flight_instance_id: FlightInstanceId,
    ) -> CoreResult<Option<SeatAvailability>>;

    /// Reservations of one flight instance in creation order.
    async fn reservations_for(
        &self,
        flight_instance_id: FlightInstanceId,
    ) -> CoreResult<Vec<Reservation>>;
}

/// An open transaction against a [`SeatStore`].
///
/// Nothing written through it is visible to other transactions until [`commit`](Self::commit).
/// Dropping it without committing discards every write and releases its locks.
#[async_trait]
pub trait SeatTransaction: Send {
    /// Read the seat counters and take an exclusive lock on the flight instance row, held until
    /// the transaction ends. `None` when the flight instance does not exist.
    async fn lock_capacity(
        &mut self,
        flight_instance_id: FlightInstanceId,
    ) -> CoreResult<Option<SeatCapacity>>;

    async fn insert_reservation(&mut self, reservation: &Reservation) -> CoreResult<()>;

    /// Add one sold seat. Fails with `Conflict` instead of pushing `sold` past `total`.
    async fn increment_sold(&mut self, flight_instance_id: FlightInstanceId) -> CoreResult<()>;

    async fn commit(self: Box<Self>) -> CoreResult<()>;

    async fn rollback(self: Box<Self>) -> CoreResult<()>;
}

/// Repair log and maintenance request storage. Each call is one atomic unit.
#[async_trait]
pub trait MaintenanceStore: Send + Sync {
    /// Insert the repair and advance the plane's last repair date, both or neither.
    async fn record_repair(&self, repair: &NewRepair) -> CoreResult<RepairRecord>;

    async fn submit_request(
        &self,
        request: &NewMaintenanceRequest,
    ) -> CoreResult<MaintenanceRequestRecord>;
}

/// Login lookup against stored credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_account(
        &self,
        username: &str,
        password: &Masked<String>,
    ) -> CoreResult<Option<Account>>;
}

