use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use scheduler_core::repository::Repository;
use scheduler_core::resolver::ResolverSnapshot;

/// Assembles the `ResolverSnapshot` the Resolver needs for one `[from, to)`
/// pass, grounded on the same read sequence the core's own integration tests
/// use to exercise the Resolver against a real repository.
pub async fn snapshot_for(repo: &dyn Repository, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<ResolverSnapshot> {
    let series = repo.list_enabled_series().await?;

    let mut exceptions = HashMap::new();
    for s in &series {
        let ex = repo
            .list_exceptions_for_series_in_range(s.id, from.date_naive(), to.date_naive())
            .await?;
        exceptions.insert(s.id, ex);
    }

    let holiday_entries = repo
        .list_default_calendar_entries_in_range(from.date_naive(), to.date_naive())
        .await?;

    let mut categories = HashMap::new();
    for c in repo.list_categories().await? {
        categories.insert(c.id, c);
    }

    let runtime_override = repo.get_override().await?;

    Ok(ResolverSnapshot {
        series,
        exceptions,
        holiday_entries,
        categories,
        runtime_override,
    })
}
