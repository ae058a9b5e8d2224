use anyhow::Result;
use chrono::Utc;
use scheduler_core::repository::Repository;
use scheduler_core::resolver::resolve;
use scheduler_core::runtime_state::{current_status, next_event, next_event_horizon, MIN_HORIZON};

use crate::snapshot::snapshot_for;
use crate::views::table;

pub async fn run(repo: &dyn Repository) -> Result<()> {
    let now = Utc::now();

    // The forward window must reach at least as far as the longest enabled
    // rule's natural period (spec §4.4), or a monthly/yearly series would
    // have no visible next occurrence inside a flat 7-day window.
    let enabled_series = repo.list_enabled_series().await?;
    let horizon = next_event_horizon(&enabled_series, now);

    let from = now - MIN_HORIZON;
    let to = now + horizon;

    let snapshot = snapshot_for(repo, from, to).await?;
    let runtime_override = snapshot.runtime_override.clone();
    let occurrences = resolve(&snapshot, from, to, now);

    let status = current_status(&occurrences, runtime_override.as_ref(), now);
    let next = next_event(&occurrences, now);

    table::display_status(status.as_ref(), next.as_ref());
    Ok(())
}
