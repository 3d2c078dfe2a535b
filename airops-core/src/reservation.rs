use airops_shared::{CustomerId, FlightInstanceId, ReservationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::flight::SeatCapacity;
use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    Reserved,
    Waitlisted,
    Flown,
}

impl ReservationStatus {
    /// Value stored in the `reservation.status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Reserved => "reserved",
            ReservationStatus::Waitlisted => "waitlist",
            ReservationStatus::Flown => "flown",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reserved" => Ok(ReservationStatus::Reserved),
            "waitlist" | "waitlisted" => Ok(ReservationStatus::Waitlisted),
            "flown" => Ok(ReservationStatus::Flown),
            other => Err(CoreError::StorageError(format!(
                "unknown reservation status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub customer_id: CustomerId,
    pub flight_instance_id: FlightInstanceId,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

/// The two statuses an allocation can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AllocationStatus {
    Reserved,
    Waitlisted,
}

impl AllocationStatus {
    pub fn decide(capacity: &SeatCapacity) -> Self {
        if capacity.available() > 0 {
            AllocationStatus::Reserved
        } else {
            AllocationStatus::Waitlisted
        }
    }
}

impl From<AllocationStatus> for ReservationStatus {
    fn from(status: AllocationStatus) -> Self {
        match status {
            AllocationStatus::Reserved => ReservationStatus::Reserved,
            AllocationStatus::Waitlisted => ReservationStatus::Waitlisted,
        }
    }
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationStatus::Reserved => f.write_str("RESERVED"),
            AllocationStatus::Waitlisted => f.write_str("WAITLISTED"),
        }
    }
}

/// Outcome of a committed `reserve` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub reservation_id: ReservationId,
    pub flight_instance_id: FlightInstanceId,
    pub customer_id: CustomerId,
    pub status: AllocationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_reserves_only_with_free_seat() {
        assert_eq!(AllocationStatus::decide(&SeatCapacity::new(2, 0)), AllocationStatus::Reserved);
        assert_eq!(AllocationStatus::decide(&SeatCapacity::new(2, 1)), AllocationStatus::Reserved);
        assert_eq!(AllocationStatus::decide(&SeatCapacity::new(2, 2)), AllocationStatus::Waitlisted);
        // oversold rows still waitlist rather than reserve
        assert_eq!(AllocationStatus::decide(&SeatCapacity::new(1, 3)), AllocationStatus::Waitlisted);
    }

    #[test]
    fn test_status_column_values() {
        assert_eq!(ReservationStatus::Waitlisted.as_str(), "waitlist");
        assert_eq!("waitlist".parse::<ReservationStatus>().unwrap(), ReservationStatus::Waitlisted);
        assert_eq!("flown".parse::<ReservationStatus>().unwrap(), ReservationStatus::Flown);
        assert!(matches!(
            "cancelled".parse::<ReservationStatus>(),
            Err(CoreError::StorageError(_))
        ));
        assert_eq!(
            ReservationStatus::from(AllocationStatus::Reserved),
            ReservationStatus::Reserved
        );
    }
}
