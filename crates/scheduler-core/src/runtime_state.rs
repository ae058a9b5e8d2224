//! Runtime State Evaluator (spec §4.4).
//!
//! Computes the current effective output and the next upcoming event from a
//! Resolver timeline plus the live runtime override, for the Scheduler Loop
//! and the UI status display.

use chrono::{DateTime, Duration, Utc};

use crate::models::{OccurrenceSource, ResolvedOccurrence, RuntimeOverride, Series, TargetValue};
use crate::recurrence::RecurrenceRule;

/// The occurrence or override that is live at a given instant.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentStatus {
    pub value: TargetValue,
    pub title: String,
    pub source: OccurrenceSource,
    pub busy_until: DateTime<Utc>,
    pub priority: i32,
    pub override_value: Option<String>,
    pub override_until: Option<DateTime<Utc>>,
    pub occurrence_key: Option<String>,
    /// Carried from the underlying occurrence (spec §4.1 `DURATION`
    /// contract) so the Scheduler Loop's retry policy (spec §4.5) can tell
    /// a one-off event from a retry-until-end window. `false` when the
    /// status is a runtime override with no live occurrence underneath it.
    pub single_shot: bool,
}

/// The next occurrence strictly after `now`, within the evaluator's horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct NextEvent {
    pub start: DateTime<Utc>,
    pub title: String,
    pub value: TargetValue,
}

/// The forward horizon floor (spec §4.4): "at least the larger of 7 days and
/// the longest rule's natural period" — callers resolving windows wider than
/// this for `next_event` should prefer that wider window instead.
pub const MIN_HORIZON: Duration = Duration::days(7);

/// Upper bound on how far ahead a single series is searched for its next
/// natural occurrence — generous enough to find the next instance of a
/// yearly rule without an unbounded `rrule` scan.
const NATURAL_PERIOD_SEARCH_BOUND: Duration = Duration::days(400);

/// The forward window a `next_event` query should actually use (spec §4.4):
/// "at least the larger of 7 days and the longest rule's natural period".
/// A series with a sparse rule (monthly, yearly) would otherwise have no
/// visible next occurrence inside a flat 7-day window even though one
/// exists.
pub fn next_event_horizon(series: &[Series], now: DateTime<Utc>) -> Duration {
    series
        .iter()
        .filter(|s| s.enabled)
        .filter_map(|s| RecurrenceRule::parse_for_series(&s.rrule_str, s.id).ok())
        .filter_map(|rule| rule.next_after(now, NATURAL_PERIOD_SEARCH_BOUND))
        .map(|next| next - now)
        .fold(MIN_HORIZON, |widest, needed| widest.max(needed))
}

/// Computes the current status at `now` from a resolved timeline and the raw
/// runtime override row (needed here, not just inside the Resolver, because
/// an override with no live occurrence underneath it still has a status).
pub fn current_status(
    occurrences: &[ResolvedOccurrence],
    runtime_override: Option<&RuntimeOverride>,
    now: DateTime<Utc>,
) -> Option<CurrentStatus> {
    let live = occurrences
        .iter()
        .filter(|occ| occ.start <= now && now < occ.end)
        .min_by(|a, b| a.priority.cmp(&b.priority).reverse().then(a.series_id.cmp(&b.series_id)));

    match (live, runtime_override.filter(|o| o.is_live(now))) {
        (Some(occ), Some(over)) => Some(CurrentStatus {
            value: TargetValue::Auto(over.override_value.clone()),
            title: occ.title.clone(),
            source: OccurrenceSource::Override,
            busy_until: over.override_until.map_or(occ.end, |until| until.min(occ.end)),
            priority: occ.priority,
            override_value: Some(over.override_value.clone()),
            override_until: over.override_until,
            occurrence_key: Some(occ.occurrence_key.clone()),
            single_shot: occ.single_shot,
        }),
        (None, Some(over)) => Some(CurrentStatus {
            value: TargetValue::Auto(over.override_value.clone()),
            title: "override".to_string(),
            source: OccurrenceSource::Override,
            busy_until: over.override_until.unwrap_or(now),
            priority: 0,
            override_value: Some(over.override_value.clone()),
            override_until: over.override_until,
            occurrence_key: None,
            single_shot: false,
        }),
        (Some(occ), None) => Some(CurrentStatus {
            value: occ.target_value.clone(),
            title: occ.title.clone(),
            source: occ.source,
            busy_until: occ.end,
            priority: occ.priority,
            override_value: None,
            override_until: None,
            occurrence_key: Some(occ.occurrence_key.clone()),
            single_shot: occ.single_shot,
        }),
        (None, None) => None,
    }
}

/// Finds the first occurrence starting strictly after `now`.
pub fn next_event(occurrences: &[ResolvedOccurrence], now: DateTime<Utc>) -> Option<NextEvent> {
    occurrences
        .iter()
        .filter(|occ| occ.start > now)
        .min_by(|a, b| a.start.cmp(&b.start).then(b.priority.cmp(&a.priority)).then(a.series_id.cmp(&b.series_id)))
        .map(|occ| NextEvent {
            start: occ.start,
            title: occ.title.clone(),
            value: occ.target_value.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataType;
    use crate::models::Series;

    fn occ(series_id: i64, start: &str, end: &str, priority: i32) -> ResolvedOccurrence {
        let start = DateTime::parse_from_rfc3339(start).unwrap().with_timezone(&Utc);
        let end = DateTime::parse_from_rfc3339(end).unwrap().with_timezone(&Utc);
        ResolvedOccurrence {
            series_id,
            source: OccurrenceSource::Weekly,
            title: format!("series-{series_id}"),
            start,
            end,
            category_id: 1,
            bg_color: "#FF0000".to_string(),
            fg_color: "#FFFFFF".to_string(),
            target_value: TargetValue::from_raw("auto", DataType::Auto),
            priority,
            is_exception: false,
            is_holiday: false,
            is_override: false,
            single_shot: false,
            occurrence_key: ResolvedOccurrence::make_key(series_id, start),
        }
    }

    #[test]
    fn override_wins_value_and_busy_until_is_the_earlier_bound() {
        let occurrences = vec![occ(1, "2026-02-16T10:00:00Z", "2026-02-16T11:00:00Z", 1)];
        let over = RuntimeOverride {
            override_value: "0".to_string(),
            override_until: Some(DateTime::parse_from_rfc3339("2026-02-16T10:30:00Z").unwrap().with_timezone(&Utc)),
        };
        let now = DateTime::parse_from_rfc3339("2026-02-16T10:15:00Z").unwrap().with_timezone(&Utc);
        let status = current_status(&occurrences, Some(&over), now).unwrap();
        assert_eq!(status.value, TargetValue::Auto("0".to_string()));
        assert_eq!(status.source, OccurrenceSource::Override);
        assert_eq!(status.busy_until, over.override_until.unwrap());
    }

    #[test]
    fn override_expires_and_base_occurrence_resumes() {
        let occurrences = vec![occ(1, "2026-02-16T10:00:00Z", "2026-02-16T11:00:00Z", 1)];
        let over = RuntimeOverride {
            override_value: "0".to_string(),
            override_until: Some(DateTime::parse_from_rfc3339("2026-02-16T10:30:00Z").unwrap().with_timezone(&Utc)),
        };
        let now = DateTime::parse_from_rfc3339("2026-02-16T10:31:00Z").unwrap().with_timezone(&Utc);
        let status = current_status(&occurrences, Some(&over), now).unwrap();
        assert_eq!(status.source, OccurrenceSource::Weekly);
        assert_eq!(status.value, TargetValue::from_raw("auto", DataType::Auto));
    }

    #[test]
    fn ties_broken_by_priority_then_series_id() {
        let occurrences = vec![
            occ(2, "2026-02-16T10:00:00Z", "2026-02-16T11:00:00Z", 1),
            occ(1, "2026-02-16T10:00:00Z", "2026-02-16T11:00:00Z", 5),
        ];
        let now = DateTime::parse_from_rfc3339("2026-02-16T10:00:00Z").unwrap().with_timezone(&Utc);
        let status = current_status(&occurrences, None, now).unwrap();
        assert_eq!(status.priority, 5);
    }

    fn yearly_series(id: i64, rrule: &str) -> Series {
        Series {
            id,
            task_name: format!("series-{id}"),
            endpoint: "endpoint".to_string(),
            node_id: "node".to_string(),
            target_value: "auto".to_string(),
            data_type: DataType::Auto,
            rrule_str: rrule.to_string(),
            category_id: 1,
            priority: 1,
            enabled: true,
            credential: None,
        }
    }

    #[test]
    fn horizon_stays_at_minimum_with_no_series() {
        let now = DateTime::parse_from_rfc3339("2026-02-16T09:00:00Z").unwrap().with_timezone(&Utc);
        assert_eq!(next_event_horizon(&[], now), MIN_HORIZON);
    }

    #[test]
    fn horizon_widens_to_a_yearly_rules_natural_period() {
        let now = DateTime::parse_from_rfc3339("2026-02-16T09:00:00Z").unwrap().with_timezone(&Utc);
        let series = vec![yearly_series(
            1,
            "FREQ=YEARLY;BYDAY=SU,MO,TU,WE,TH,FR,SA;BYMONTH=12;BYMONTHDAY=25;BYHOUR=9;BYMINUTE=0;DTSTART:20260101T090000;DURATION=PT1H",
        )];
        let horizon = next_event_horizon(&series, now);
        assert!(horizon > MIN_HORIZON);
        assert!(now + horizon >= DateTime::parse_from_rfc3339("2026-12-25T09:00:00Z").unwrap().with_timezone(&Utc));
    }

    #[test]
    fn next_event_picks_first_future_start() {
        let occurrences = vec![
            occ(1, "2026-02-16T09:00:00Z", "2026-02-16T10:00:00Z", 1),
            occ(1, "2026-02-17T09:00:00Z", "2026-02-17T10:00:00Z", 1),
        ];
        let now = DateTime::parse_from_rfc3339("2026-02-16T09:30:00Z").unwrap().with_timezone(&Utc);
        let next = next_event(&occurrences, now).unwrap();
        assert_eq!(next.start.format("%Y-%m-%d").to_string(), "2026-02-17");
    }
}
