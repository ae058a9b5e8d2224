use anyhow::{Context, Result};
use chrono::NaiveDate;
use owo_colors::OwoColorize;
use scheduler_core::models::{ExceptionAction, NewExceptionData};
use scheduler_core::repository::Repository;

use crate::cli::{ExceptionAddCommand, ExceptionListCommand, ExceptionRemoveCommand};

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

pub async fn add(repo: &dyn Repository, command: ExceptionAddCommand) -> Result<()> {
    let action = match command.action.as_str() {
        "cancel" => ExceptionAction::Cancel,
        "override" => ExceptionAction::Override,
        other => return Err(anyhow::anyhow!("invalid --action '{other}', expected cancel or override")),
    };

    let exception = repo
        .add_exception(NewExceptionData {
            schedule_id: command.series_id,
            occurrence_date: parse_date(&command.date)?,
            action,
            override_start: None,
            override_end: None,
            override_task_name: command.task_name,
            override_target_value: command.value,
            override_category_id: command.category,
            note: command.note,
        })
        .await?;

    println!(
        "{} Added {:?} exception for series {} on {}",
        "+".green().bold(),
        exception.action,
        exception.schedule_id,
        exception.occurrence_date
    );
    Ok(())
}

pub async fn list(repo: &dyn Repository, command: ExceptionListCommand) -> Result<()> {
    let exceptions = repo.list_exceptions_for_series(command.series_id).await?;
    if exceptions.is_empty() {
        println!("No exceptions for series {}.", command.series_id);
        return Ok(());
    }
    for exception in exceptions {
        println!(
            "{} {:?} (value={:?}, category={:?})",
            exception.occurrence_date, exception.action, exception.override_target_value, exception.override_category_id
        );
    }
    Ok(())
}

pub async fn remove(repo: &dyn Repository, command: ExceptionRemoveCommand) -> Result<()> {
    repo.remove_exception(command.series_id, parse_date(&command.date)?).await?;
    println!("{} Removed exception for series {} on {}", "-".red().bold(), command.series_id, command.date);
    Ok(())
}
