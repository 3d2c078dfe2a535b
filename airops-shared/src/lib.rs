pub mod models;
pub mod pii;

pub use models::ids::{
    CustomerId, FlightInstanceId, IdParseError, PilotId, PlaneId, ReservationId, TechnicianId,
};
pub use pii::Masked;
