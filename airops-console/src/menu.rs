use airops_core::identity::{Action, Grant, Session};
use airops_core::maintenance::RepairCode;
use airops_core::CoreError;
use airops_shared::{FlightInstanceId, Masked, PlaneId};
use chrono::NaiveDate;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::info;

use crate::console::Console;
use crate::error::AppError;
use crate::state::AppState;

const CHOICE_PROMPT: &str = "Please make your choice: ";

/// Drive the main menu until the user exits or input ends.
pub async fn run<R, W>(state: &AppState, console: &mut Console<R, W>) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        console
            .say("\nMAIN MENU\n---------\n1. Log in\n9. Exit")
            .await?;

        let outcome = match ask(console, CHOICE_PROMPT).await {
            Ok(choice) => match choice.as_str() {
                "1" => log_in_and_serve(state, console).await,
                "9" => {
                    console.say("Goodbye.").await?;
                    return Ok(());
                }
                _ => Err(AppError::InvalidChoice(choice)),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {}
            Err(AppError::EndOfInput) => return Ok(()),
            Err(e) if e.is_recoverable() => console.say(&e.user_message()).await?,
            Err(e) => return Err(e),
        }
    }
}

async fn log_in_and_serve<R, W>(state: &AppState, console: &mut Console<R, W>) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let username = ask(console, "Please enter user login: ").await?;
    let password = Masked(ask(console, "Please enter user password: ").await?);

    let Some(account) = state.credentials.find_account(&username, &password).await? else {
        info!("Failed login for '{}'", username);
        console.say("Invalid username or password.").await?;
        return Ok(());
    };

    let session = Session::open(account)?;
    info!("{} logged in as {}", session.username(), session.role());
    console
        .say(&format!("Welcome, {} ({}).", session.username(), session.role()))
        .await?;

    serve_session(state, console, &session).await?;

    info!("{} logged out", session.username());
    Ok(())
}

/// The per-role menu. Returns on log out; action errors are reported and the loop continues.
async fn serve_session<R, W>(
    state: &AppState,
    console: &mut Console<R, W>,
    session: &Session,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut menu = format!("\n{} MENU\n---------", session.role().as_str().to_uppercase());
    for action in session.role().actions() {
        menu.push_str(&format!("\n{}. {}", action.code(), action.label()));
    }

    loop {
        console.say(&menu).await?;
        let choice = ask(console, CHOICE_PROMPT).await?;

        let result = match choice.parse::<u32>().ok().and_then(Action::from_code) {
            None => Err(AppError::InvalidChoice(choice)),
            Some(action) => match session.authorize(action) {
                None => Err(AppError::Unauthorized(action.label())),
                Some(Grant::LogOut) => return Ok(()),
                Some(grant) => perform(state, console, grant).await,
            },
        };

        match result {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => console.say(&e.user_message()).await?,
            Err(e) => return Err(e),
        }
    }
}

async fn perform<R, W>(
    state: &AppState,
    console: &mut Console<R, W>,
    grant: Grant<'_>,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match grant {
        Grant::ViewSeatAvailability => {
            let flight_instance_id: FlightInstanceId =
                ask(console, "Enter flight instance id: ").await?.parse()?;
            let seats = state
                .seats
                .seat_availability(flight_instance_id)
                .await?
                .ok_or_else(|| {
                    CoreError::NotFound(format!("flight instance {}", flight_instance_id))
                })?;

            console
                .say(&format!(
                    "Flight instance {}: {} seats, {} sold, {} available.",
                    seats.flight_instance_id,
                    seats.seats_total,
                    seats.seats_sold,
                    seats.seats_available
                ))
                .await?;
        }
        Grant::ReserveSeat(customer_id) => {
            let flight_instance_id: FlightInstanceId =
                ask(console, "Enter flight instance id: ").await?.parse()?;
            let allocation = state.allocator.reserve(flight_instance_id, customer_id).await?;

            console
                .say(&format!(
                    "Reservation {} on flight instance {}: {}",
                    allocation.reservation_id, allocation.flight_instance_id, allocation.status
                ))
                .await?;
        }
        Grant::RecordRepair(technician_id) => {
            let plane_id: PlaneId = ask(console, "Enter plane id: ").await?.parse()?;
            let repair_code: RepairCode = ask(console, "Enter repair code: ").await?.parse()?;
            let repair_date = parse_optional_date(
                &ask(console, "Enter repair date (YYYY-MM-DD, blank for today): ").await?,
            )?;

            let record = state
                .maintenance
                .record_repair(technician_id.clone(), plane_id, repair_code, repair_date)
                .await?;

            console
                .say(&format!(
                    "Repair {} ({}) logged for plane {} on {}.",
                    record.repair_id, record.repair_code, record.plane_id, record.repair_date
                ))
                .await?;
        }
        Grant::RequestMaintenance(pilot_id) => {
            let plane_id: PlaneId = ask(console, "Enter plane id: ").await?.parse()?;
            let repair_code: RepairCode = ask(console, "Enter repair code: ").await?.parse()?;

            let record = state
                .maintenance
                .submit_request(pilot_id.clone(), plane_id, repair_code)
                .await?;

            console
                .say(&format!(
                    "Maintenance request {} ({}) filed for plane {} on {}.",
                    record.request_id, record.repair_code, record.plane_id, record.request_date
                ))
                .await?;
        }
        Grant::LogOut => {}
    }

    Ok(())
}

async fn ask<R, W>(console: &mut Console<R, W>, label: &str) -> Result<String, AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    console.prompt(label).await?.ok_or(AppError::EndOfInput)
}

fn parse_optional_date(input: &str) -> Result<Option<NaiveDate>, AppError> {
    if input.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| AppError::InvalidInput(format!("'{}' is not a date (YYYY-MM-DD)", input)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_repair_date_means_today() {
        assert_eq!(parse_optional_date("").unwrap(), None);
        assert_eq!(
            parse_optional_date("2024-03-09").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );
        assert!(matches!(
            parse_optional_date("09/03/2024"),
            Err(AppError::InvalidInput(_))
        ));
    }
}
