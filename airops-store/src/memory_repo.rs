//! In-memory stores with the same transactional contract as the Postgres ones.
//!
//! Row locks are per-flight-instance `tokio` mutexes held by the open transaction; writes are
//! staged in the transaction and applied to the shared ledger only on commit. Failure injection
//! hooks let tests break a transaction between its writes.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use airops_core::flight::{SeatAvailability, SeatCapacity};
use airops_core::identity::Account;
use airops_core::maintenance::{
    MaintenanceRequestRecord, NewMaintenanceRequest, NewRepair, RepairRecord,
};
use airops_core::repository::{CredentialStore, MaintenanceStore, SeatStore, SeatTransaction};
use airops_core::reservation::Reservation;
use airops_core::{CoreError, CoreResult};
use airops_shared::{CustomerId, FlightInstanceId, Masked, PilotId, PlaneId, TechnicianId};
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::OwnedMutexGuard;

fn lock<T>(mutex: &Mutex<T>) -> CoreResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| CoreError::StorageError("in-memory store poisoned".to_string()))
}

type RowLocks = Mutex<HashMap<FlightInstanceId, Arc<tokio::sync::Mutex<()>>>>;

#[derive(Default)]
struct SeatLedger {
    capacities: HashMap<FlightInstanceId, SeatCapacity>,
    reservations: Vec<Reservation>,
    customers: HashSet<CustomerId>,
}

#[derive(Default)]
struct SeatFaults {
    fail_sold_update: AtomicBool,
    fail_commit: AtomicBool,
}

#[derive(Default)]
pub struct InMemorySeatStore {
    ledger: Arc<Mutex<SeatLedger>>,
    row_locks: Arc<RowLocks>,
    faults: Arc<SeatFaults>,
}

impl InMemorySeatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_flight_instance(
        &self,
        id: FlightInstanceId,
        seats_total: i32,
        seats_sold: i32,
    ) -> CoreResult<()> {
        lock(&self.ledger)?
            .capacities
            .insert(id, SeatCapacity::new(seats_total, seats_sold));
        Ok(())
    }

    pub fn add_customer(&self, id: CustomerId) -> CoreResult<()> {
        lock(&self.ledger)?.customers.insert(id);
        Ok(())
    }

    /// The next `increment_sold` fails after its reservation row has been staged.
    pub fn fail_next_sold_update(&self) {
        self.faults.fail_sold_update.store(true, Ordering::SeqCst);
    }

    /// The next commit fails without applying anything.
    pub fn fail_next_commit(&self) {
        self.faults.fail_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SeatStore for InMemorySeatStore {
    async fn begin(&self) -> CoreResult<Box<dyn SeatTransaction>> {
        Ok(Box::new(InMemorySeatTransaction {
            ledger: self.ledger.clone(),
            row_locks: self.row_locks.clone(),
            faults: self.faults.clone(),
            held: HashMap::new(),
            staged_reservations: Vec::new(),
            staged_sold: HashMap::new(),
        }))
    }

    async fn seat_availability(
        &self,
        flight_instance_id: FlightInstanceId,
    ) -> CoreResult<Option<SeatAvailability>> {
        let ledger = lock(&self.ledger)?;
        Ok(ledger
            .capacities
            .get(&flight_instance_id)
            .map(|cap| SeatAvailability::from_capacity(flight_instance_id, *cap)))
    }

    async fn reservations_for(
        &self,
        flight_instance_id: FlightInstanceId,
    ) -> CoreResult<Vec<Reservation>> {
        let ledger = lock(&self.ledger)?;
        Ok(ledger
            .reservations
            .iter()
            .filter(|r| r.flight_instance_id == flight_instance_id)
            .cloned()
            .collect())
    }
}

pub struct InMemorySeatTransaction {
    ledger: Arc<Mutex<SeatLedger>>,
    row_locks: Arc<RowLocks>,
    faults: Arc<SeatFaults>,
    held: HashMap<FlightInstanceId, OwnedMutexGuard<()>>,
    staged_reservations: Vec<Reservation>,
    staged_sold: HashMap<FlightInstanceId, i32>,
}

impl InMemorySeatTransaction {
    /// Committed counters plus this transaction's own pending increments.
    fn current_capacity(&self, id: FlightInstanceId) -> CoreResult<Option<SeatCapacity>> {
        let ledger = lock(&self.ledger)?;
        Ok(ledger.capacities.get(&id).map(|cap| {
            let pending = self.staged_sold.get(&id).copied().unwrap_or(0);
            SeatCapacity::new(cap.seats_total, cap.seats_sold + pending)
        }))
    }
}

#[async_trait]
impl SeatTransaction for InMemorySeatTransaction {
    async fn lock_capacity(
        &mut self,
        flight_instance_id: FlightInstanceId,
    ) -> CoreResult<Option<SeatCapacity>> {
        if self.current_capacity(flight_instance_id)?.is_none() {
            return Ok(None);
        }

        if !self.held.contains_key(&flight_instance_id) {
            let row = {
                let mut locks = lock(&self.row_locks)?;
                locks.entry(flight_instance_id).or_default().clone()
            };
            let guard = row.lock_owned().await;
            self.held.insert(flight_instance_id, guard);
        }

        // Re-read: the counters may have moved while we queued for the lock.
        self.current_capacity(flight_instance_id)
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> CoreResult<()> {
        {
            let ledger = lock(&self.ledger)?;
            if !ledger.capacities.contains_key(&reservation.flight_instance_id) {
                return Err(CoreError::NotFound(format!(
                    "flight instance {}",
                    reservation.flight_instance_id
                )));
            }
            if !ledger.customers.contains(&reservation.customer_id) {
                return Err(CoreError::NotFound(format!("customer {}", reservation.customer_id)));
            }
            if ledger.reservations.iter().any(|r| r.id == reservation.id) {
                return Err(CoreError::Conflict(format!(
                    "reservation {} already exists",
                    reservation.id
                )));
            }
        }
        if self.staged_reservations.iter().any(|r| r.id == reservation.id) {
            return Err(CoreError::Conflict(format!(
                "reservation {} already exists",
                reservation.id
            )));
        }

        self.staged_reservations.push(reservation.clone());
        Ok(())
    }

    async fn increment_sold(&mut self, flight_instance_id: FlightInstanceId) -> CoreResult<()> {
        if self.faults.fail_sold_update.swap(false, Ordering::SeqCst) {
            return Err(CoreError::StorageError(
                "injected failure while updating seats sold".to_string(),
            ));
        }

        let capacity = self
            .current_capacity(flight_instance_id)?
            .ok_or_else(|| CoreError::NotFound(format!("flight instance {}", flight_instance_id)))?;
        if capacity.available() <= 0 {
            return Err(CoreError::Conflict(format!(
                "flight instance {} has no seat left to sell",
                flight_instance_id
            )));
        }

        *self.staged_sold.entry(flight_instance_id).or_insert(0) += 1;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        if self.faults.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(CoreError::StorageError("injected commit failure".to_string()));
        }

        let mut ledger = lock(&self.ledger)?;
        for (id, added) in &self.staged_sold {
            let cap = ledger
                .capacities
                .get(id)
                .copied()
                .ok_or_else(|| CoreError::NotFound(format!("flight instance {}", id)))?;
            if cap.seats_sold + added > cap.seats_total {
                return Err(CoreError::Conflict(format!(
                    "commit would oversell flight instance {}",
                    id
                )));
            }
        }
        for (id, added) in &self.staged_sold {
            if let Some(cap) = ledger.capacities.get_mut(id) {
                cap.seats_sold += added;
            }
        }
        ledger
            .reservations
            .extend(self.staged_reservations.iter().cloned());

        // row locks in `self.held` are released when `self` drops, after the ledger guard
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> CoreResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct MaintenanceLedger {
    planes: HashMap<PlaneId, Option<NaiveDate>>,
    technicians: HashSet<TechnicianId>,
    pilots: HashSet<PilotId>,
    repairs: Vec<RepairRecord>,
    requests: Vec<MaintenanceRequestRecord>,
}

#[derive(Default)]
pub struct InMemoryMaintenanceStore {
    ledger: Mutex<MaintenanceLedger>,
    fail_plane_update: AtomicBool,
}

impl InMemoryMaintenanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_plane(&self, id: PlaneId, last_repair_date: Option<NaiveDate>) -> CoreResult<()> {
        lock(&self.ledger)?.planes.insert(id, last_repair_date);
        Ok(())
    }

    pub fn add_technician(&self, id: TechnicianId) -> CoreResult<()> {
        lock(&self.ledger)?.technicians.insert(id);
        Ok(())
    }

    pub fn add_pilot(&self, id: PilotId) -> CoreResult<()> {
        lock(&self.ledger)?.pilots.insert(id);
        Ok(())
    }

    /// The next repair fails after its row is staged but before the plane is updated.
    pub fn fail_next_plane_update(&self) {
        self.fail_plane_update.store(true, Ordering::SeqCst);
    }

    pub fn last_repair_date(&self, id: &PlaneId) -> Option<NaiveDate> {
        lock(&self.ledger)
            .ok()
            .and_then(|ledger| ledger.planes.get(id).copied().flatten())
    }

    pub fn repairs(&self) -> Vec<RepairRecord> {
        lock(&self.ledger)
            .map(|ledger| ledger.repairs.clone())
            .unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<MaintenanceRequestRecord> {
        lock(&self.ledger)
            .map(|ledger| ledger.requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MaintenanceStore for InMemoryMaintenanceStore {
    async fn record_repair(&self, repair: &NewRepair) -> CoreResult<RepairRecord> {
        let mut ledger = lock(&self.ledger)?;

        let previous = *ledger
            .planes
            .get(&repair.plane_id)
            .ok_or_else(|| CoreError::NotFound(format!("plane {}", repair.plane_id)))?;
        if !ledger.technicians.contains(&repair.technician_id) {
            return Err(CoreError::NotFound(format!(
                "technician {}",
                repair.technician_id
            )));
        }

        let record = RepairRecord {
            repair_id: ledger.repairs.len() as i32 + 1,
            plane_id: repair.plane_id.clone(),
            technician_id: repair.technician_id.clone(),
            repair_code: repair.repair_code.clone(),
            repair_date: repair.repair_date,
        };

        // Staged copies of both tables; the ledger only sees them once both writes succeed.
        let mut repairs = ledger.repairs.clone();
        repairs.push(record.clone());

        let mut planes = ledger.planes.clone();
        if self.fail_plane_update.swap(false, Ordering::SeqCst) {
            return Err(CoreError::StorageError(
                "injected failure while updating plane".to_string(),
            ));
        }
        let newest = previous.map_or(repair.repair_date, |d| d.max(repair.repair_date));
        planes.insert(repair.plane_id.clone(), Some(newest));

        ledger.repairs = repairs;
        ledger.planes = planes;
        Ok(record)
    }

    async fn submit_request(
        &self,
        request: &NewMaintenanceRequest,
    ) -> CoreResult<MaintenanceRequestRecord> {
        let mut ledger = lock(&self.ledger)?;

        if !ledger.planes.contains_key(&request.plane_id) {
            return Err(CoreError::NotFound(format!("plane {}", request.plane_id)));
        }
        if !ledger.pilots.contains(&request.pilot_id) {
            return Err(CoreError::NotFound(format!("pilot {}", request.pilot_id)));
        }

        let record = MaintenanceRequestRecord {
            request_id: ledger.requests.len() as i32 + 1,
            plane_id: request.plane_id.clone(),
            pilot_id: request.pilot_id.clone(),
            repair_code: request.repair_code.clone(),
            request_date: request.request_date,
        };
        ledger.requests.push(record.clone());
        Ok(record)
    }
}

#[derive(Default)]
pub struct InMemoryCredentialStore {
    accounts: Mutex<HashMap<String, (String, Account)>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(
        &self,
        username: &str,
        password: &str,
        user_type: &str,
        specific_id: Option<&str>,
    ) -> CoreResult<()> {
        let account = Account {
            username: username.to_string(),
            user_type: user_type.to_string(),
            specific_id: specific_id.map(String::from),
        };
        lock(&self.accounts)?.insert(username.to_string(), (password.to_string(), account));
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_account(
        &self,
        username: &str,
        password: &Masked<String>,
    ) -> CoreResult<Option<Account>> {
        let accounts = lock(&self.accounts)?;
        Ok(accounts
            .get(username.trim())
            .filter(|(stored, _)| stored == password.expose())
            .map(|(_, account)| account.clone()))
    }
}
