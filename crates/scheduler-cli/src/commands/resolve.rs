use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use scheduler_core::repository::Repository;
use scheduler_core::resolver::resolve;

use crate::cli::ResolveCommand;
use crate::snapshot::snapshot_for;
use crate::views::table;

pub async fn run(repo: &dyn Repository, command: ResolveCommand) -> Result<()> {
    let from = DateTime::parse_from_rfc3339(&command.from)
        .map(|d| d.with_timezone(&Utc))
        .with_context(|| format!("invalid --from '{}', expected RFC 3339", command.from))?;
    let to = DateTime::parse_from_rfc3339(&command.to)
        .map(|d| d.with_timezone(&Utc))
        .with_context(|| format!("invalid --to '{}', expected RFC 3339", command.to))?;

    let snapshot = snapshot_for(repo, from, to).await?;
    let occurrences = resolve(&snapshot, from, to, Utc::now());
    table::display_resolved_occurrences(&occurrences);
    Ok(())
}
