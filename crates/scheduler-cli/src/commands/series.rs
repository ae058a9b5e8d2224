use std::str::FromStr;

use anyhow::Result;
use owo_colors::OwoColorize;
use scheduler_core::models::{DataType, NewSeriesData, UpdateSeriesData};
use scheduler_core::recurrence::RecurrenceRule;
use scheduler_core::repository::Repository;

use crate::cli::{SeriesAddCommand, SeriesDeleteCommand, SeriesEditCommand, SeriesShowCommand};
use crate::views::table;

pub async fn add(repo: &dyn Repository, command: SeriesAddCommand) -> Result<()> {
    let data_type = DataType::from_str(&command.data_type)
        .map_err(|e| anyhow::anyhow!("invalid --data-type: {e}"))?;

    // Validate the rule up front so a typo fails before the row is written.
    RecurrenceRule::parse_for_series(&command.rrule, 0)?;

    let series = repo
        .create_series(NewSeriesData {
            task_name: command.name,
            endpoint: command.endpoint,
            node_id: command.node_id,
            target_value: command.value,
            data_type,
            rrule_str: command.rrule,
            category_id: command.category,
            priority: command.priority,
            enabled: !command.disabled,
            credential: None,
        })
        .await?;

    println!("{} Created series #{}: {}", "+".green().bold(), series.id, series.task_name);
    Ok(())
}

pub async fn list(repo: &dyn Repository) -> Result<()> {
    let series = repo.list_all_series().await?;
    table::display_series_list(&series);
    Ok(())
}

pub async fn show(repo: &dyn Repository, command: SeriesShowCommand) -> Result<()> {
    match repo.find_series_by_id(command.id).await? {
        Some(series) => table::display_series_list(&[series]),
        None => println!("Series #{} not found.", command.id),
    }
    Ok(())
}

pub async fn edit(repo: &dyn Repository, command: SeriesEditCommand) -> Result<()> {
    if let Some(rrule) = &command.rrule {
        RecurrenceRule::parse_for_series(rrule, command.id)?;
    }
    let enabled = if command.enable {
        Some(true)
    } else if command.disable {
        Some(false)
    } else {
        None
    };

    let series = repo
        .update_series(
            command.id,
            UpdateSeriesData {
                task_name: command.name,
                rrule_str: command.rrule,
                target_value: command.value,
                category_id: command.category,
                priority: command.priority,
                enabled,
                ..Default::default()
            },
        )
        .await?;

    println!("{} Updated series #{}", "~".cyan().bold(), series.id);
    Ok(())
}

pub async fn delete(repo: &dyn Repository, command: SeriesDeleteCommand) -> Result<()> {
    repo.delete_series(command.id).await?;
    println!("{} Deleted series #{}", "-".red().bold(), command.id);
    Ok(())
}
