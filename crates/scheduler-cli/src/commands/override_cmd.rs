use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use scheduler_core::repository::Repository;

use crate::cli::OverrideSetCommand;

pub async fn set(repo: &dyn Repository, command: OverrideSetCommand) -> Result<()> {
    let until = command
        .until
        .as_deref()
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .with_context(|| format!("invalid --until '{s}', expected RFC 3339"))
        })
        .transpose()?;

    let over = repo.set_override(command.value, until).await?;
    println!(
        "{} Runtime override set to '{}'{}",
        "~".cyan().bold(),
        over.override_value,
        over.override_until.map(|u| format!(" until {u}")).unwrap_or_default()
    );
    Ok(())
}

pub async fn clear(repo: &dyn Repository) -> Result<()> {
    repo.clear_override().await?;
    println!("{} Runtime override cleared", "-".red().bold());
    Ok(())
}

pub async fn show(repo: &dyn Repository) -> Result<()> {
    match repo.get_override().await? {
        Some(over) => println!(
            "Runtime override: '{}'{}",
            over.override_value,
            over.override_until.map(|u| format!(" until {u}")).unwrap_or_default()
        ),
        None => println!("No runtime override set."),
    }
    Ok(())
}
