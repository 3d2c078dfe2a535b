use std::sync::Arc;
use std::time::Duration;

use airops_shared::{CustomerId, FlightInstanceId, ReservationId};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::repository::{SeatStore, SeatTransaction};
use crate::reservation::{Allocation, AllocationStatus, Reservation};
use crate::{CoreError, CoreResult};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Capacity-bounded seat allocation with waitlist fallback.
///
/// Holds no seat state of its own. Every decision is made on counters re-read under the flight
/// instance's row lock, so concurrent callers on one instance serialize on that lock while callers
/// on different instances never wait on each other.
#[derive(Clone)]
pub struct SeatAllocator {
    store: Arc<dyn SeatStore>,
    lock_timeout: Duration,
}

impl SeatAllocator {
    pub fn new(store: Arc<dyn SeatStore>) -> Self {
        Self {
            store,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Reserve a seat for `customer_id`, or waitlist the request when the flight is full.
    ///
    /// Either the reservation row and the sold-counter update both commit, or nothing does: every
    /// failure after the transaction opens is rolled back before the error is returned.
    pub async fn reserve(
        &self,
        flight_instance_id: FlightInstanceId,
        customer_id: CustomerId,
    ) -> CoreResult<Allocation> {
        let mut tx = self.store.begin().await?;

        let allocation = match self
            .allocate(tx.as_mut(), flight_instance_id, customer_id)
            .await
        {
            Ok(allocation) => allocation,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(
                        "Rollback failed for flight instance {}: {}",
                        flight_instance_id, rollback_err
                    );
                }
                return Err(e);
            }
        };

        tx.commit().await?;

        info!(
            "Reservation {} for customer {} on flight instance {}: {}",
            allocation.reservation_id, customer_id, flight_instance_id, allocation.status
        );
        Ok(allocation)
    }

    async fn allocate(
        &self,
        tx: &mut dyn SeatTransaction,
        flight_instance_id: FlightInstanceId,
        customer_id: CustomerId,
    ) -> CoreResult<Allocation> {
        let locked = tokio::time::timeout(self.lock_timeout, tx.lock_capacity(flight_instance_id))
            .await
            .map_err(|_| {
                warn!(
                    "Gave up waiting {:?} for the lock on flight instance {}",
                    self.lock_timeout, flight_instance_id
                );
                CoreError::Timeout(format!(
                    "seat lock on flight instance {} not acquired within {:?}",
                    flight_instance_id, self.lock_timeout
                ))
            })??;

        let capacity = locked.ok_or_else(|| {
            CoreError::NotFound(format!("flight instance {}", flight_instance_id))
        })?;
        debug!(
            "Locked flight instance {}: {} of {} seats sold",
            flight_instance_id, capacity.seats_sold, capacity.seats_total
        );

        if !capacity.is_consistent() {
            return Err(CoreError::Conflict(format!(
                "flight instance {} has {} seats sold out of {}",
                flight_instance_id, capacity.seats_sold, capacity.seats_total
            )));
        }

        let status = AllocationStatus::decide(&capacity);
        let reservation = Reservation {
            id: ReservationId::generate(),
            customer_id,
            flight_instance_id,
            status: status.into(),
            created_at: Utc::now(),
        };

        tx.insert_reservation(&reservation).await?;
        if status == AllocationStatus::Reserved {
            tx.increment_sold(flight_instance_id).await?;
        }

        Ok(Allocation {
            reservation_id: reservation.id,
            flight_instance_id,
            customer_id,
            status,
        })
    }
}
