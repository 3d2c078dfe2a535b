use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Longest text identifier accepted from user input (matches the `VARCHAR(16)` key columns).
pub const MAX_TEXT_ID_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} must be a positive integer, got '{value}'")]
    NotPositiveInteger { kind: &'static str, value: String },

    #[error("{kind} is longer than {max} characters")]
    TooLong { kind: &'static str, max: usize },

    #[error("{kind} is not a valid identifier: '{value}'")]
    Malformed { kind: &'static str, value: String },
}

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl $name {
            pub fn get(self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                if s.is_empty() {
                    return Err(IdParseError::Empty { kind: $kind });
                }
                match s.parse::<i32>() {
                    Ok(v) if v > 0 => Ok(Self(v)),
                    _ => Err(IdParseError::NotPositiveInteger {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

macro_rules! text_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                if s.is_empty() {
                    return Err(IdParseError::Empty { kind: $kind });
                }
                if s.chars().count() > MAX_TEXT_ID_LEN {
                    return Err(IdParseError::TooLong { kind: $kind, max: MAX_TEXT_ID_LEN });
                }
                if s.chars().any(char::is_control) {
                    return Err(IdParseError::Malformed { kind: $kind, value: s.escape_debug().to_string() });
                }
                Ok(Self(s.to_string()))
            }
        }
    };
}

integer_id!(
    /// One concrete scheduled departure (a flight number on a date).
    FlightInstanceId,
    "flight instance id"
);
integer_id!(CustomerId, "customer id");

text_id!(PlaneId, "plane id");
text_id!(TechnicianId, "technician id");
text_id!(PilotId, "pilot id");

/// Reservation identifiers are random v4 UUIDs; uniqueness is also enforced by the ledger's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(pub Uuid);

impl ReservationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReservationId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| IdParseError::Malformed {
                kind: "reservation id",
                value: s.to_string(),
            })
    }
}
