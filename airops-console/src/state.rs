use std::sync::Arc;
use std::time::Duration;

use airops_core::repository::{CredentialStore, MaintenanceStore, SeatStore};
use airops_core::{MaintenanceDesk, SeatAllocator};

#[derive(Clone)]
pub struct AppState {
    pub allocator: SeatAllocator,
    pub seats: Arc<dyn SeatStore>,
    pub maintenance: MaintenanceDesk,
    pub credentials: Arc<dyn CredentialStore>,
}

impl AppState {
    pub fn new(
        seats: Arc<dyn SeatStore>,
        maintenance: Arc<dyn MaintenanceStore>,
        credentials: Arc<dyn CredentialStore>,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            allocator: SeatAllocator::new(seats.clone()).with_lock_timeout(lock_timeout),
            seats,
            maintenance: MaintenanceDesk::new(maintenance),
            credentials,
        }
    }
}
