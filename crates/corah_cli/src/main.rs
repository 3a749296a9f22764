//! CLI smoke entry point.
//!
//! # Responsibility
//! - Drive core use cases against a real database for local checks.
//! - Keep output deterministic and line-oriented.
//!
//! Settings come from `CORAH_*` environment variables; see `CoreConfig`.

use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use corah_core::{
    init_logging, open_db, Capacity, CoreConfig, EventId, EventService, Identity,
    IdentityRepository, IdentityService, Price, RegistrationService, ScheduleEventRequest,
    SqliteEventRepository, SqliteIdentityRepository,
};
use log::error;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "corah_cli", version, about = "Event registration smoke checks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print core health and version
    Ping,
    /// List events ordered by date
    Events,
    /// Schedule a new event
    CreateEvent(CreateEventArgs),
    /// Create an identity and its attendee profile
    Signup(SignupArgs),
    /// Register an identity for an event
    Register(RegisterArgs),
}

#[derive(Args)]
struct CreateEventArgs {
    /// Event title, may carry title markup
    title: String,

    /// Event date (YYYY-MM-DD)
    date: NaiveDate,

    /// Start time (HH:MM)
    #[arg(long, value_parser = parse_time, value_name = "HH:MM")]
    start: Option<NaiveTime>,

    /// End time (HH:MM)
    #[arg(long, value_parser = parse_time, value_name = "HH:MM")]
    end: Option<NaiveTime>,

    /// Seats offered; defaults to CORAH_DEFAULT_CAPACITY
    #[arg(long)]
    capacity: Option<u32>,

    /// Ticket price such as 12.50
    #[arg(long, default_value = "0")]
    price: Price,

    /// Venue
    #[arg(long)]
    location: Option<String>,
}

#[derive(Args)]
struct SignupArgs {
    /// Unique login handle
    handle: String,

    /// Contact address
    #[arg(long)]
    email: Option<String>,

    /// First name
    #[arg(long, default_value = "")]
    first: String,

    /// Last name
    #[arg(long, default_value = "")]
    last: String,
}

#[derive(Args)]
struct RegisterArgs {
    /// Handle of an existing identity
    handle: String,

    /// Event identifier
    event_id: EventId,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    if let Command::Ping = cli.command {
        println!("corah_core ping={}", corah_core::ping());
        println!("corah_core version={}", corah_core::core_version());
        return Ok(());
    }

    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir).map_err(|err| err.to_string())?;
    }
    let mut conn = open_db(&config.db_path).map_err(|err| err.to_string())?;

    match cli.command {
        Command::Ping => Ok(()),
        Command::Events => {
            let service = EventService::new(SqliteEventRepository::new(&conn));
            for event in service.list_events().map_err(|err| err.to_string())? {
                println!(
                    "{} {} seats={}/{} price={} {}",
                    event.id,
                    event.date,
                    event.seats_available(),
                    event.capacity.get(),
                    event.price_display(),
                    event.display_title()
                );
            }
            Ok(())
        }
        Command::CreateEvent(args) => {
            let request = event_request(args, &config);
            let service = EventService::new(SqliteEventRepository::new(&conn));
            let event = service
                .schedule_event(&request)
                .map_err(|err| err.to_string())?;
            println!("created event {} ({})", event.id, event.display_title());
            Ok(())
        }
        Command::Signup(args) => {
            let mut identity = Identity::new(args.handle).with_name(args.first, args.last);
            identity.email = args.email;

            let mut service =
                IdentityService::with_fallback_policy(&mut conn, config.fallback_policy());
            let attendee = service
                .create_identity(&identity)
                .map_err(|err| err.to_string())?;
            println!("identity {} attendee {} {}", identity.id, attendee.id, attendee);
            Ok(())
        }
        Command::Register(args) => {
            let identity = SqliteIdentityRepository::new(&conn)
                .find_by_handle(&args.handle)
                .map_err(|err| err.to_string())?
                .ok_or_else(|| format!("unknown handle `{}`", args.handle))?;

            let mut service =
                RegistrationService::with_fallback_policy(&mut conn, config.fallback_policy());
            match service.register(&identity, args.event_id) {
                Ok(result) => {
                    println!(
                        "registered {} for {}",
                        result.attendee_name, result.event_title
                    );
                    Ok(())
                }
                Err(err) => {
                    error!("event=cli_register module=cli status=error reason={}", err.code());
                    Err(format!("{} ({})", err, err.code()))
                }
            }
        }
    }
}

fn event_request(args: CreateEventArgs, config: &CoreConfig) -> ScheduleEventRequest {
    let mut request = ScheduleEventRequest::new(args.title, args.date);
    request.start_time = args.start;
    request.end_time = args.end;
    request.capacity = Some(args.capacity.map_or(config.default_capacity, Capacity::new));
    request.price = args.price;
    request.location = args.location;
    request
}

fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| format!("invalid time `{value}`"))
}

#[cfg(test)]
mod tests {
    use super::{event_request, Cli, Command};
    use clap::{CommandFactory, Parser};
    use corah_core::CoreConfig;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn create_event_parses_typed_values() {
        let cli = Cli::try_parse_from([
            "corah_cli",
            "create-event",
            "Spring Gala",
            "2026-05-02",
            "--start",
            "18:00",
            "--end",
            "22:30",
            "--price",
            "12.50",
            "--location",
            "Main Hall",
        ])
        .unwrap();
        let Command::CreateEvent(args) = cli.command else {
            panic!("expected create-event");
        };

        let config = CoreConfig::default();
        let request = event_request(args, &config);
        assert_eq!(request.title, "Spring Gala");
        assert_eq!(request.date.to_string(), "2026-05-02");
        assert_eq!(request.end_time.map(|time| time.to_string()).as_deref(), Some("22:30:00"));
        assert_eq!(request.price.cents(), 1250);
        assert_eq!(request.capacity, Some(config.default_capacity));
        assert_eq!(request.location.as_deref(), Some("Main Hall"));
    }

    #[test]
    fn invalid_values_are_rejected_by_the_parser() {
        let rejected: [&[&str]; 3] = [
            &["corah_cli", "create-event", "Gala", "05/02/2026"],
            &["corah_cli", "create-event", "Gala", "2026-05-02", "--price", "1.234"],
            &["corah_cli", "register", "jdoe", "not-a-uuid"],
        ];
        for args in rejected {
            assert!(Cli::try_parse_from(args).is_err());
        }
    }
}
