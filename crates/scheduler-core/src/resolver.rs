//! Resolver (spec §4.3).
//!
//! Merges the base series expansion with the holiday, exception and runtime
//! override layers into a single deterministic `ResolvedOccurrence` timeline.
//! Grounded on the teacher's `RecurrenceManager::generate_occurrences_between`
//! exception-application loop; the holiday and override layers are new but
//! follow the same "expand, then rewrite in a documented order" shape.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

use crate::category::CategoryResolver;
use crate::error::CoreError;
use crate::models::{
    Category, Exception, ExceptionAction, HolidayEntry, OccurrenceSource, ResolvedOccurrence,
    RuntimeOverride, Series, TargetValue,
};
use crate::recurrence::RecurrenceRule;

/// Everything the Resolver needs for one `[from, to)` pass, taken as a single
/// immutable snapshot from the Repository (spec §4.2, §5).
pub struct ResolverSnapshot {
    pub series: Vec<Series>,
    pub exceptions: HashMap<i64, Vec<Exception>>,
    pub holiday_entries: Vec<HolidayEntry>,
    pub categories: HashMap<i64, Category>,
    pub runtime_override: Option<RuntimeOverride>,
}

/// Resolves a time window into the ordered, merged occurrence timeline.
pub fn resolve(
    snapshot: &ResolverSnapshot,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<ResolvedOccurrence> {
    let category_resolver = CategoryResolver::from_map(&snapshot.categories);

    let mut occurrences = base_expansion(snapshot, from, to, &category_resolver);
    apply_holiday_layer(&mut occurrences, &snapshot.holiday_entries, &category_resolver);
    apply_exception_layer(&mut occurrences, snapshot, &category_resolver);
    apply_runtime_override_layer(&mut occurrences, snapshot.runtime_override.as_ref(), now);

    // Clip to the requested window last, after every layer has matched and
    // rewritten against the occurrences' true (unclipped) bounds — a
    // cross-midnight occurrence still gets its exception/holiday applied by
    // its real calendar date, and only the displayed start/end are clamped.
    // `occurrence_key` is untouched, so callers can still correlate a
    // clipped fragment with its original instant (spec §4.3 edge cases).
    for occ in occurrences.iter_mut() {
        occ.start = occ.start.max(from);
        occ.end = occ.end.min(to);
    }
    occurrences.retain(|occ| occ.end > occ.start);

    occurrences.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(b.priority.cmp(&a.priority))
            .then(a.series_id.cmp(&b.series_id))
    });
    occurrences
}

fn base_expansion(
    snapshot: &ResolverSnapshot,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    categories: &CategoryResolver,
) -> Vec<ResolvedOccurrence> {
    let mut out = Vec::new();
    for series in &snapshot.series {
        if !series.enabled {
            continue;
        }
        let rule = match RecurrenceRule::parse_for_series(&series.rrule_str, series.id) {
            Ok(rule) => rule,
            Err(CoreError::InvalidRule { series_id, reason }) => {
                warn!(series_id, reason, "skipping series with invalid rule");
                continue;
            }
            Err(other) => {
                warn!(series_id = series.id, error = %other, "unexpected error parsing rule");
                continue;
            }
        };

        let (bg_color, fg_color) = categories.resolve(series.category_id, &series.task_name);

        // Widen the lookback by the rule's own occurrence width (plus one
        // minute for `expand`'s exclusive lower bound) so an occurrence that
        // starts before `from` but still overlaps it is not silently
        // dropped — it is clipped to the window by `resolve`, further down,
        // instead.
        let lookback = chrono::Duration::minutes(rule.duration_minutes()) + chrono::Duration::minutes(1);
        for occ in rule.expand(from - lookback, to) {
            out.push(ResolvedOccurrence {
                series_id: series.id,
                source: OccurrenceSource::Weekly,
                title: series.task_name.clone(),
                start: occ.start,
                end: occ.end,
                category_id: series.category_id,
                bg_color: bg_color.clone(),
                fg_color: fg_color.clone(),
                target_value: TargetValue::from_raw(&series.target_value, series.data_type),
                priority: series.priority,
                is_exception: false,
                is_holiday: false,
                is_override: false,
                single_shot: occ.single_shot,
                occurrence_key: ResolvedOccurrence::make_key(series.id, occ.start),
            });
        }
    }
    out
}

fn apply_holiday_layer(
    occurrences: &mut [ResolvedOccurrence],
    entries: &[HolidayEntry],
    categories: &CategoryResolver,
) {
    for occ in occurrences.iter_mut() {
        let date = occ.start.date_naive();
        for entry in entries.iter().filter(|e| e.date == date) {
            let applies = entry.is_full_day || time_window_intersects(occ, entry, date);
            if !applies {
                continue;
            }
            if let Some(category_id) = entry.override_category_id {
                let (bg, fg) = categories.resolve(category_id, &occ.title);
                occ.category_id = category_id;
                occ.bg_color = bg;
                occ.fg_color = fg;
            }
            if let Some(value) = &entry.override_target_value {
                occ.target_value = TargetValue::Auto(value.clone());
            }
            occ.is_holiday = true;
            occ.source = OccurrenceSource::Holiday;
        }
    }
}

fn time_window_intersects(occ: &ResolvedOccurrence, entry: &HolidayEntry, date: NaiveDate) -> bool {
    let (Some(h_start), Some(h_end)) = (entry.start_time, entry.end_time) else {
        return false;
    };
    let window_start = DateTime::<Utc>::from_naive_utc_and_offset(date.and_time(h_start), Utc);
    let window_end = DateTime::<Utc>::from_naive_utc_and_offset(date.and_time(h_end), Utc);
    occ.start < window_end && occ.end > window_start
}

fn apply_exception_layer(
    occurrences: &mut Vec<ResolvedOccurrence>,
    snapshot: &ResolverSnapshot,
    categories: &CategoryResolver,
) {
    let mut cancelled: HashMap<(i64, NaiveDate), bool> = HashMap::new();

    for (series_id, exceptions) in &snapshot.exceptions {
        for exception in exceptions {
            match exception.action {
                ExceptionAction::Cancel => {
                    cancelled.insert((*series_id, exception.occurrence_date), true);
                }
                ExceptionAction::Override => {
                    for occ in occurrences
                        .iter_mut()
                        .filter(|o| o.series_id == *series_id && o.start.date_naive() == exception.occurrence_date)
                    {
                        apply_exception_override(occ, exception, categories);
                    }
                }
            }
        }
    }

    occurrences.retain(|occ| !cancelled.contains_key(&(occ.series_id, occ.start.date_naive())));
}

fn apply_exception_override(
    occ: &mut ResolvedOccurrence,
    exception: &Exception,
    categories: &CategoryResolver,
) {
    // Each half of the time override applies independently (spec §4.3 step
    // 3: "use the exception's override_start/override_end when present,
    // else keep base") — an exception may shift only the start or only the
    // end of the base occurrence.
    if let Some(start) = exception.override_start {
        occ.start = start;
        occ.occurrence_key = ResolvedOccurrence::make_key(occ.series_id, start);
    }
    if let Some(end) = exception.override_end {
        occ.end = end;
    }
    if let Some(name) = &exception.override_task_name {
        if !name.is_empty() {
            occ.title = name.clone();
        }
    }
    if let Some(value) = &exception.override_target_value {
        if !value.is_empty() {
            occ.target_value = TargetValue::Auto(value.clone());
        }
    }
    if let Some(category_id) = exception.override_category_id {
        let (bg, fg) = categories.resolve(category_id, &occ.title);
        occ.category_id = category_id;
        occ.bg_color = bg;
        occ.fg_color = fg;
    }
    occ.is_exception = true;
    occ.source = OccurrenceSource::Exception;
}

fn apply_runtime_override_layer(
    occurrences: &mut [ResolvedOccurrence],
    runtime_override: Option<&RuntimeOverride>,
    now: DateTime<Utc>,
) {
    let Some(over) = runtime_override else {
        return;
    };
    if !over.is_live(now) {
        return;
    }
    for occ in occurrences.iter_mut() {
        if occ.start <= now && now < occ.end {
            occ.target_value = TargetValue::Auto(over.override_value.clone());
            occ.is_override = true;
            occ.source = OccurrenceSource::Override;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataType;
    use std::collections::HashMap;

    fn series(id: i64, rrule: &str) -> Series {
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

    fn categories_map() -> HashMap<i64, Category> {
        crate::models::SYSTEM_CATEGORY_SEED
            .iter()
            .map(|(id, name, bg, fg)| {
                (
                    *id,
                    Category {
                        id: *id,
                        name: name.to_string(),
                        bg_color: bg.to_string(),
                        fg_color: fg.to_string(),
                        sort_order: *id as i32,
                        is_system: true,
                    },
                )
            })
            .collect()
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let from = DateTime::parse_from_rfc3339("2026-02-16T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        (from, from + chrono::Duration::days(7))
    }

    #[test]
    fn weekday_morning_series_yields_five_occurrences() {
        let (from, to) = window();
        let snapshot = ResolverSnapshot {
            series: vec![series(
                1,
                "FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;BYHOUR=9;BYMINUTE=0;DTSTART:20260216T090000;DURATION=PT1H",
            )],
            exceptions: HashMap::new(),
            holiday_entries: vec![],
            categories: categories_map(),
            runtime_override: None,
        };
        let result = resolve(&snapshot, from, to, from);
        assert_eq!(result.len(), 5);
        for occ in &result {
            assert_eq!(occ.source, OccurrenceSource::Weekly);
        }
    }

    #[test]
    fn single_day_cancel_removes_exactly_that_date() {
        let (from, to) = window();
        let mut exceptions = HashMap::new();
        exceptions.insert(
            1,
            vec![Exception {
                id: 1,
                schedule_id: 1,
                occurrence_date: NaiveDate::from_ymd_opt(2026, 2, 18).unwrap(),
                action: ExceptionAction::Cancel,
                override_start: None,
                override_end: None,
                override_task_name: None,
                override_target_value: None,
                override_category_id: None,
                note: None,
            }],
        );
        let snapshot = ResolverSnapshot {
            series: vec![series(
                1,
                "FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;BYHOUR=9;BYMINUTE=0;DTSTART:20260216T090000;DURATION=PT1H",
            )],
            exceptions,
            holiday_entries: vec![],
            categories: categories_map(),
            runtime_override: None,
        };
        let result = resolve(&snapshot, from, to, from);
        assert_eq!(result.len(), 4);
        assert!(result
            .iter()
            .all(|o| o.start.date_naive() != NaiveDate::from_ymd_opt(2026, 2, 18).unwrap()));
    }

    #[test]
    fn value_override_on_exception_sets_category_and_value() {
        let (from, to) = window();
        let mut exceptions = HashMap::new();
        exceptions.insert(
            1,
            vec![Exception {
                id: 1,
                schedule_id: 1,
                occurrence_date: NaiveDate::from_ymd_opt(2026, 2, 17).unwrap(),
                action: ExceptionAction::Override,
                override_start: None,
                override_end: None,
                override_task_name: None,
                override_target_value: Some("0".to_string()),
                override_category_id: Some(3),
                note: None,
            }],
        );
        let snapshot = ResolverSnapshot {
            series: vec![series(
                1,
                "FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;BYHOUR=9;BYMINUTE=0;DTSTART:20260216T090000;DURATION=PT1H",
            )],
            exceptions,
            holiday_entries: vec![],
            categories: categories_map(),
            runtime_override: None,
        };
        let result = resolve(&snapshot, from, to, from);
        let tuesday = result
            .iter()
            .find(|o| o.start.date_naive() == NaiveDate::from_ymd_opt(2026, 2, 17).unwrap())
            .unwrap();
        assert_eq!(tuesday.target_value, TargetValue::Auto("0".to_string()));
        assert_eq!(tuesday.category_id, 3);
        assert_eq!(tuesday.bg_color, "#DDA0DD");
    }

    #[test]
    fn exception_override_can_set_only_start_leaving_base_end() {
        let (from, to) = window();
        let mut exceptions = HashMap::new();
        exceptions.insert(
            1,
            vec![Exception {
                id: 1,
                schedule_id: 1,
                occurrence_date: NaiveDate::from_ymd_opt(2026, 2, 17).unwrap(),
                action: ExceptionAction::Override,
                override_start: Some(
                    DateTime::parse_from_rfc3339("2026-02-17T08:00:00Z")
                        .unwrap()
                        .with_timezone(&Utc),
                ),
                override_end: None,
                override_task_name: None,
                override_target_value: None,
                override_category_id: None,
                note: None,
            }],
        );
        let snapshot = ResolverSnapshot {
            series: vec![series(
                1,
                "FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;BYHOUR=9;BYMINUTE=0;DTSTART:20260216T090000;DURATION=PT1H",
            )],
            exceptions,
            holiday_entries: vec![],
            categories: categories_map(),
            runtime_override: None,
        };
        let result = resolve(&snapshot, from, to, from);
        let tuesday = result
            .iter()
            .find(|o| o.start.date_naive() == NaiveDate::from_ymd_opt(2026, 2, 17).unwrap())
            .unwrap();
        assert_eq!(tuesday.start.format("%H:%M").to_string(), "08:00");
        // Base end (9:00 + 1h) survives untouched since override_end is None.
        assert_eq!(tuesday.end.format("%H:%M").to_string(), "10:00");
    }

    #[test]
    fn cross_midnight_occurrence_is_clipped_but_key_preserves_original_start() {
        let series_row = series(
            1,
            "FREQ=DAILY;BYHOUR=23;BYMINUTE=30;DTSTART:20260216T233000;DURATION=PT2H",
        );
        let snapshot = ResolverSnapshot {
            series: vec![series_row],
            exceptions: HashMap::new(),
            holiday_entries: vec![],
            categories: categories_map(),
            runtime_override: None,
        };
        let from = DateTime::parse_from_rfc3339("2026-02-17T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let to = from + chrono::Duration::days(1);
        let result = resolve(&snapshot, from, to, from);

        // The occurrence starting 2026-02-16T23:30 overlaps the window's
        // start; the one starting 2026-02-17T23:30 overlaps its end. Both
        // are clipped, neither dropped.
        assert_eq!(result.len(), 2);

        let clipped_head = result.iter().find(|o| o.start == from).unwrap();
        assert_eq!(
            clipped_head.end,
            DateTime::parse_from_rfc3339("2026-02-17T01:30:00Z")
                .unwrap()
                .with_timezone(&Utc)
        );
        assert!(clipped_head.occurrence_key.contains("2026-02-16T23:30:00"));

        let clipped_tail = result.iter().find(|o| o.end == to).unwrap();
        assert_eq!(
            clipped_tail.start,
            DateTime::parse_from_rfc3339("2026-02-17T23:30:00Z")
                .unwrap()
                .with_timezone(&Utc)
        );
    }

    #[test]
    fn holiday_full_day_rewrite_applies() {
        let (from, to) = window();
        let snapshot = ResolverSnapshot {
            series: vec![series(
                1,
                "FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;BYHOUR=9;BYMINUTE=0;DTSTART:20260216T090000;DURATION=PT1H",
            )],
            exceptions: HashMap::new(),
            holiday_entries: vec![HolidayEntry {
                id: 1,
                calendar_id: 1,
                date: NaiveDate::from_ymd_opt(2026, 2, 19).unwrap(),
                name: "Holiday".to_string(),
                is_full_day: true,
                start_time: None,
                end_time: None,
                override_category_id: Some(3),
                override_target_value: Some("manual".to_string()),
            }],
            categories: categories_map(),
            runtime_override: None,
        };
        let result = resolve(&snapshot, from, to, from);
        let thursday = result
            .iter()
            .find(|o| o.start.date_naive() == NaiveDate::from_ymd_opt(2026, 2, 19).unwrap())
            .unwrap();
        assert_eq!(thursday.target_value, TargetValue::Auto("manual".to_string()));
        assert_eq!(thursday.category_id, 3);
        assert_eq!(thursday.source, OccurrenceSource::Holiday);
    }

    #[test]
    fn runtime_override_wins_on_value_only() {
        let from = DateTime::parse_from_rfc3339("2026-02-16T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let to = from + chrono::Duration::days(1);
        let snapshot = ResolverSnapshot {
            series: vec![series(
                1,
                "FREQ=DAILY;BYHOUR=10;BYMINUTE=0;DTSTART:20260216T100000;DURATION=PT1H",
            )],
            exceptions: HashMap::new(),
            holiday_entries: vec![],
            categories: categories_map(),
            runtime_override: Some(RuntimeOverride {
                override_value: "0".to_string(),
                override_until: Some(
                    DateTime::parse_from_rfc3339("2026-02-16T10:30:00Z")
                        .unwrap()
                        .with_timezone(&Utc),
                ),
            }),
        };
        let now = DateTime::parse_from_rfc3339("2026-02-16T10:15:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let result = resolve(&snapshot, from, to, now);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].target_value, TargetValue::Auto("0".to_string()));
        assert_eq!(result[0].source, OccurrenceSource::Override);
    }

    #[test]
    fn cancel_takes_precedence_over_runtime_override() {
        let (from, to) = window();
        let mut exceptions = HashMap::new();
        exceptions.insert(
            1,
            vec![Exception {
                id: 1,
                schedule_id: 1,
                occurrence_date: NaiveDate::from_ymd_opt(2026, 2, 16).unwrap(),
                action: ExceptionAction::Cancel,
                override_start: None,
                override_end: None,
                override_task_name: None,
                override_target_value: None,
                override_category_id: None,
                note: None,
            }],
        );
        let snapshot = ResolverSnapshot {
            series: vec![series(
                1,
                "FREQ=DAILY;BYHOUR=9;BYMINUTE=0;DTSTART:20260216T090000;DURATION=PT1H",
            )],
            exceptions,
            holiday_entries: vec![],
            categories: categories_map(),
            runtime_override: Some(RuntimeOverride {
                override_value: "0".to_string(),
                override_until: None,
            }),
        };
        let now = DateTime::parse_from_rfc3339("2026-02-16T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let result = resolve(&snapshot, from, to, now);
        assert!(result
            .iter()
            .all(|o| o.start.date_naive() != NaiveDate::from_ymd_opt(2026, 2, 16).unwrap()));
    }
}
