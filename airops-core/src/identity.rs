use std::fmt;
use std::str::FromStr;

use airops_shared::{CustomerId, PilotId, TechnicianId};
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Management,
    Customer,
    Pilot,
    Technician,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Management => "Management",
            Role::Customer => "Customer",
            Role::Pilot => "Pilot",
            Role::Technician => "Technician",
        }
    }

    /// Menu entries this role may run, in display order.
    pub fn actions(&self) -> &'static [Action] {
        match self {
            Role::Management => &[Action::ViewSeatAvailability, Action::LogOut],
            Role::Customer => &[Action::ReserveSeat, Action::LogOut],
            Role::Pilot => &[Action::RequestMaintenance, Action::LogOut],
            Role::Technician => &[Action::RecordRepair, Action::LogOut],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Management" => Ok(Role::Management),
            "Customer" => Ok(Role::Customer),
            "Pilot" => Ok(Role::Pilot),
            "Technician" => Ok(Role::Technician),
            other => Err(CoreError::ValidationError(format!("unknown user type '{}'", other))),
        }
    }
}

/// Console menu entries. Codes are what the user types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewSeatAvailability,
    ReserveSeat,
    RecordRepair,
    RequestMaintenance,
    LogOut,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::ViewSeatAvailability,
        Action::ReserveSeat,
        Action::RecordRepair,
        Action::RequestMaintenance,
        Action::LogOut,
    ];

    pub fn code(&self) -> u32 {
        match self {
            Action::ViewSeatAvailability => 1,
            Action::ReserveSeat => 2,
            Action::RecordRepair => 3,
            Action::RequestMaintenance => 4,
            Action::LogOut => 9,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.code() == code)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::ViewSeatAvailability => "View flight seats",
            Action::ReserveSeat => "Make a reservation for a flight",
            Action::RecordRepair => "Make a repair entry",
            Action::RequestMaintenance => "Submit a maintenance request",
            Action::LogOut => "Log out",
        }
    }
}

/// Row of the credential table as the store returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub user_type: String,
    pub specific_id: Option<String>,
}

/// Who is logged in, with the role-specific id already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Management,
    Customer(CustomerId),
    Pilot(PilotId),
    Technician(TechnicianId),
}

impl Principal {
    pub fn role(&self) -> Role {
        match self {
            Principal::Management => Role::Management,
            Principal::Customer(_) => Role::Customer,
            Principal::Pilot(_) => Role::Pilot,
            Principal::Technician(_) => Role::Technician,
        }
    }
}

/// A permitted action, carrying the identity it runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant<'a> {
    ViewSeatAvailability,
    ReserveSeat(CustomerId),
    RecordRepair(&'a TechnicianId),
    RequestMaintenance(&'a PilotId),
    LogOut,
}

#[derive(Debug, Clone)]
pub struct Session {
    username: String,
    principal: Principal,
}

impl Session {
    /// Resolve a stored account into a session. Every role except Management must carry a valid
    /// role-specific id.
    pub fn open(account: Account) -> CoreResult<Self> {
        let role: Role = account.user_type.parse()?;
        let specific_id = account
            .specific_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let principal = match (role, specific_id) {
            (Role::Management, _) => Principal::Management,
            (Role::Customer, Some(id)) => Principal::Customer(id.parse()?),
            (Role::Pilot, Some(id)) => Principal::Pilot(id.parse()?),
            (Role::Technician, Some(id)) => Principal::Technician(id.parse()?),
            (role, None) => {
                return Err(CoreError::ValidationError(format!(
                    "{} account '{}' has no role-specific id",
                    role, account.username
                )))
            }
        };

        Ok(Self {
            username: account.username,
            principal,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn role(&self) -> Role {
        self.principal.role()
    }

    /// The single capability check: `None` when this session's role may not run `action`.
    pub fn authorize(&self, action: Action) -> Option<Grant<'_>> {
        match (&self.principal, action) {
            (_, Action::LogOut) => Some(Grant::LogOut),
            (Principal::Management, Action::ViewSeatAvailability) => {
                Some(Grant::ViewSeatAvailability)
            }
            (Principal::Customer(id), Action::ReserveSeat) => Some(Grant::ReserveSeat(*id)),
            (Principal::Technician(id), Action::RecordRepair) => Some(Grant::RecordRepair(id)),
            (Principal::Pilot(id), Action::RequestMaintenance) => {
                Some(Grant::RequestMaintenance(id))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(user_type: &str, specific_id: Option<&str>) -> Account {
        Account {
            username: "jdoe".to_string(),
            user_type: user_type.to_string(),
            specific_id: specific_id.map(String::from),
        }
    }

    #[test]
    fn test_session_resolves_role_specific_ids() {
        let session = Session::open(account("Customer", Some("17"))).unwrap();
        assert_eq!(session.principal(), &Principal::Customer(CustomerId(17)));

        let session = Session::open(account("Management", Some(""))).unwrap();
        assert_eq!(session.role(), Role::Management);

        assert!(matches!(
            Session::open(account("Pilot", None)),
            Err(CoreError::ValidationError(_))
        ));
        assert!(matches!(
            Session::open(account("Customer", Some("abc"))),
            Err(CoreError::ValidationError(_))
        ));
        assert!(matches!(
            Session::open(account("Admin", None)),
            Err(CoreError::ValidationError(_))
        ));
    }

    #[test]
    fn test_authorize_matches_role_actions() {
        let sessions = [
            Session::open(account("Management", None)).unwrap(),
            Session::open(account("Customer", Some("3"))).unwrap(),
            Session::open(account("Pilot", Some("PIL1"))).unwrap(),
            Session::open(account("Technician", Some("TEC1"))).unwrap(),
        ];

        for session in &sessions {
            for action in Action::ALL {
                let listed = session.role().actions().contains(&action);
                assert_eq!(
                    session.authorize(action).is_some(),
                    listed,
                    "{} / {:?}",
                    session.role(),
                    action
                );
            }
        }
    }

    #[test]
    fn test_grant_carries_session_identity() {
        let session = Session::open(account("Customer", Some("42"))).unwrap();
        assert_eq!(
            session.authorize(Action::ReserveSeat),
            Some(Grant::ReserveSeat(CustomerId(42)))
        );
        assert_eq!(session.authorize(Action::RecordRepair), None);
    }

    #[test]
    fn test_action_codes_round_trip() {
        for action in Action::ALL {
            assert_eq!(Action::from_code(action.code()), Some(action));
        }
        assert_eq!(Action::from_code(14), None);
    }
}
