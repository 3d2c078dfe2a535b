use airops_shared::FlightInstanceId;
use serde::Serialize;

/// Seat counters of one flight instance as read under the row lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatCapacity {
    pub seats_total: i32,
    pub seats_sold: i32,
}

impl SeatCapacity {
    pub fn new(seats_total: i32, seats_sold: i32) -> Self {
        Self { seats_total, seats_sold }
    }

    pub fn available(&self) -> i32 {
        self.seats_total - self.seats_sold
    }

    /// `0 <= sold <= total`
    pub fn is_consistent(&self) -> bool {
        self.seats_sold >= 0 && self.seats_sold <= self.seats_total
    }
}

/// Read-only projection of a flight instance's seat counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeatAvailability {
    pub flight_instance_id: FlightInstanceId,
    pub seats_total: i32,
    pub seats_sold: i32,
    pub seats_available: i32,
}

impl SeatAvailability {
    pub fn from_capacity(flight_instance_id: FlightInstanceId, capacity: SeatCapacity) -> Self {
        Self {
            flight_instance_id,
            seats_total: capacity.seats_total,
            seats_sold: capacity.seats_sold,
            seats_available: capacity.available(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_arithmetic() {
        let cap = SeatCapacity::new(180, 179);
        assert_eq!(cap.available(), 1);
        assert!(cap.is_consistent());

        assert!(!SeatCapacity::new(2, 3).is_consistent());
        assert!(!SeatCapacity::new(2, -1).is_consistent());

        let view = SeatAvailability::from_capacity(FlightInstanceId(9), SeatCapacity::new(2, 2));
        assert_eq!(view.seats_available, 0);
    }
}
