use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use owo_colors::OwoColorize;
use scheduler_core::models::{NewHolidayCalendarData, NewHolidayEntryData};
use scheduler_core::repository::Repository;

use crate::cli::{HolidayCalendarAddCommand, HolidayCalendarSetDefaultCommand, HolidayEntryAddCommand, HolidayEntryListCommand};

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").with_context(|| format!("invalid time '{s}', expected HH:MM"))
}

pub async fn add_calendar(repo: &dyn Repository, command: HolidayCalendarAddCommand) -> Result<()> {
    let calendar = repo
        .create_calendar(NewHolidayCalendarData {
            name: command.name,
            description: command.description,
            is_default: command.default,
        })
        .await?;
    println!("{} Created holiday calendar #{}: {}", "+".green().bold(), calendar.id, calendar.name);
    Ok(())
}

pub async fn list_calendars(repo: &dyn Repository) -> Result<()> {
    let calendars = repo.list_calendars().await?;
    if calendars.is_empty() {
        println!("No holiday calendars defined.");
        return Ok(());
    }
    for calendar in calendars {
        println!(
            "#{} {}{}",
            calendar.id,
            calendar.name,
            if calendar.is_default { " (default)" } else { "" }
        );
    }
    Ok(())
}

pub async fn set_default_calendar(repo: &dyn Repository, command: HolidayCalendarSetDefaultCommand) -> Result<()> {
    repo.set_default_calendar(command.id).await?;
    println!("{} Calendar #{} is now the default", "~".cyan().bold(), command.id);
    Ok(())
}

pub async fn add_entry(repo: &dyn Repository, command: HolidayEntryAddCommand) -> Result<()> {
    let start_time = command.start_time.as_deref().map(parse_time).transpose()?;
    let end_time = command.end_time.as_deref().map(parse_time).transpose()?;

    let entry = repo
        .add_entry(NewHolidayEntryData {
            calendar_id: command.calendar_id,
            date: parse_date(&command.date)?,
            name: command.name,
            is_full_day: command.full_day,
            start_time,
            end_time,
            override_category_id: command.category,
            override_target_value: command.value,
        })
        .await?;
    println!("{} Added holiday entry #{} on {}: {}", "+".green().bold(), entry.id, entry.date, entry.name);
    Ok(())
}

pub async fn list_entries(repo: &dyn Repository, command: HolidayEntryListCommand) -> Result<()> {
    let entries = repo.list_entries(command.calendar_id).await?;
    if entries.is_empty() {
        println!("No entries on calendar {}.", command.calendar_id);
        return Ok(());
    }
    for entry in entries {
        println!(
            "{} {} full_day={} category={:?} value={:?}",
            entry.date, entry.name, entry.is_full_day, entry.override_category_id, entry.override_target_value
        );
    }
    Ok(())
}
