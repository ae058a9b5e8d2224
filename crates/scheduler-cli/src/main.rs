use clap::Parser;
use owo_colors::{OwoColorize, Style};
use scheduler_core::db;
use scheduler_core::error::CoreError;
use scheduler_core::repository::{Repository, SqliteRepository};

mod cli;
mod commands;
mod config;
mod sink;
mod snapshot;
mod views;

use cli::{Commands, ExceptionSubcommand, HolidayCalendarSubcommand, HolidayEntrySubcommand, HolidaySubcommand, OverrideSubcommand, SeriesSubcommand};

#[tokio::main]
async fn main() {
    let config = config::Config::load().unwrap_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_level))
        .init();

    let cli = cli::Cli::parse();
    let db_path = cli.db.clone().unwrap_or_else(|| config.database_url.clone());

    let pool = match db::establish_connection(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{} {}", "Error:".style(Style::new().red().bold()), e);
            std::process::exit(1);
        }
    };
    let repo = SqliteRepository::new(pool);

    let result = dispatch(&repo, cli.command).await;
    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

async fn dispatch(repo: &dyn Repository, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Series(c) => match c.command {
            SeriesSubcommand::Add(c) => commands::series::add(repo, c).await,
            SeriesSubcommand::List => commands::series::list(repo).await,
            SeriesSubcommand::Show(c) => commands::series::show(repo, c).await,
            SeriesSubcommand::Edit(c) => commands::series::edit(repo, c).await,
            SeriesSubcommand::Delete(c) => commands::series::delete(repo, c).await,
        },
        Commands::Exception(c) => match c.command {
            ExceptionSubcommand::Add(c) => commands::exception::add(repo, c).await,
            ExceptionSubcommand::List(c) => commands::exception::list(repo, c).await,
            ExceptionSubcommand::Remove(c) => commands::exception::remove(repo, c).await,
        },
        Commands::Holiday(c) => match c.command {
            HolidaySubcommand::Calendar(c) => match c.command {
                HolidayCalendarSubcommand::Add(c) => commands::holiday::add_calendar(repo, c).await,
                HolidayCalendarSubcommand::List => commands::holiday::list_calendars(repo).await,
                HolidayCalendarSubcommand::SetDefault(c) => commands::holiday::set_default_calendar(repo, c).await,
            },
            HolidaySubcommand::Entry(c) => match c.command {
                HolidayEntrySubcommand::Add(c) => commands::holiday::add_entry(repo, c).await,
                HolidayEntrySubcommand::List(c) => commands::holiday::list_entries(repo, c).await,
            },
        },
        Commands::Category(c) => match c.command {
            cli::CategorySubcommand::List => commands::category::list(repo).await,
            cli::CategorySubcommand::Add(c) => commands::category::add(repo, c).await,
            cli::CategorySubcommand::Edit(c) => commands::category::edit(repo, c).await,
            cli::CategorySubcommand::Delete(c) => commands::category::delete(repo, c).await,
        },
        Commands::Override(c) => match c.command {
            OverrideSubcommand::Set(c) => commands::override_cmd::set(repo, c).await,
            OverrideSubcommand::Clear => commands::override_cmd::clear(repo).await,
            OverrideSubcommand::Show => commands::override_cmd::show(repo).await,
        },
        Commands::Resolve(c) => commands::resolve::run(repo, c).await,
        Commands::Status => commands::status::run(repo).await,
        Commands::Run(c) => commands::run::run(repo, c).await,
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();
    let tip_style = Style::new().cyan();
    let example_style = Style::new().green();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
                eprintln!("{} Run 'scheduler series list' to see what exists", "Tip:".style(tip_style));
            }
            CoreError::InvalidRule { series_id, reason } => {
                eprintln!("{} Invalid recurrence rule for series {series_id}: {reason}", "Error:".style(error_style));
                eprintln!("{} See the FREQ/BYDAY/BYMONTHDAY/DURATION grammar in the series add --help", "Tip:".style(tip_style));
            }
            CoreError::InUse { entity, refs } => {
                eprintln!("{} {entity} is referenced by {refs} record(s) and cannot be deleted", "Error:".style(error_style));
                eprintln!("{} Remove or reassign those records first", "Tip:".style(tip_style));
            }
            CoreError::SystemImmutable { entity } => {
                eprintln!("{} {entity} is a system record and cannot be renamed or deleted", "Error:".style(error_style));
            }
            CoreError::ValidationError { field, reason } => {
                eprintln!("{} Invalid value for {field}: {reason}", "Error:".style(error_style));
            }
            CoreError::SinkTransient(s) => {
                eprintln!("{} Transient sink failure: {s}", "Error:".style(error_style));
                eprintln!("{} The next tick will retry automatically", "Tip:".style(tip_style));
            }
            CoreError::SinkFatal(s) => {
                eprintln!("{} Fatal sink failure: {s}", "Error:".style(error_style));
            }
            CoreError::Database(e) => {
                eprintln!("{} Database error: {e}", "Error:".style(error_style));
            }
            CoreError::Migration(e) => {
                eprintln!("{} Migration error: {e}", "Error:".style(error_style));
            }
            CoreError::Io(e) => {
                eprintln!("{} I/O error: {e}", "Error:".style(error_style));
            }
        }
        eprintln!("{} scheduler --help", "Example:".style(example_style));
    } else {
        eprintln!("{} {}", "Error:".style(error_style), err);
    }
}
