//! Scheduler Loop (spec §4.5).
//!
//! A cooperative `tokio::task` loop, grounded on the teacher's `#[tokio::main]`
//! CLI binary and its periodic-window `MaterializationManager` pattern: every
//! `scan_rate` seconds it asks the Runtime State Evaluator for the current
//! status and drives a [`ValueSink`], applying the retry policy and the
//! active-period / enabled gates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::models::{DataType, GeneralSettings, ResolvedOccurrence};
use crate::resolver::{resolve, ResolverSnapshot};
use crate::runtime_state::{current_status, CurrentStatus};

/// Outcome of a single [`ValueSink::write`] call (spec §6.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Ok,
    Transient(String),
    Fatal(String),
}

/// The external wire writer. The core depends only on this trait; concrete
/// sinks (logging, recording, a real OPC/MQTT client) live outside the core.
#[async_trait]
pub trait ValueSink: Send + Sync {
    async fn write(&self, endpoint: &str, node_id: &str, value_text: &str, data_type: DataType) -> SinkOutcome;
}

/// Everything one `scan_rate` tick needs to resolve the window and act on it.
/// Callers (the CLI's `run` command) own fetching this from the Repository
/// each tick, per spec §9's "owned configuration value, re-read every tick"
/// design note — never hidden module state.
pub struct TickInputs {
    pub snapshot: ResolverSnapshot,
    pub settings: GeneralSettings,
}

/// Tracks what was last written per occurrence key, so a tick never re-sends
/// an unchanged `(occurrence_key, value)` pair after a prior success (spec
/// §4.5: "never writes the same pair twice in a single interval after
/// success"), plus the bookkeeping the retry policy needs: the instant of
/// the last write attempt for the live occurrence (to pace retries every
/// `opc_write_timeout` seconds) and whether that occurrence already failed
/// terminally.
#[derive(Default)]
pub struct SchedulerState {
    last_written: Option<(String, String)>,
    last_status: Option<CurrentStatus>,
    last_attempt: Option<(String, DateTime<Utc>)>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Runs one tick of the Scheduler Loop: resolves the current window, applies
/// the active-period and enabled gates, and (if the status changed) drives
/// `sink`. Returns the computed status, if any, for the caller to log or
/// display.
pub async fn tick(
    inputs: &TickInputs,
    state: &mut SchedulerState,
    sink: &dyn ValueSink,
    now: DateTime<Utc>,
) -> Option<CurrentStatus> {
    let from = now - chrono::Duration::days(1);
    let to = now + chrono::Duration::days(1);
    let occurrences: Vec<ResolvedOccurrence> = resolve(&inputs.snapshot, from, to, now);
    let status = current_status(&occurrences, inputs.snapshot.runtime_override.as_ref(), now);

    if !inputs.settings.enable_schedule {
        state.last_status = status.clone();
        return status;
    }
    if !inputs.settings.active_period_admits(now) {
        state.last_status = status.clone();
        return status;
    }

    let Some(status) = status else {
        state.last_status = None;
        return None;
    };

    let changed = state.last_status.as_ref() != Some(&status);
    if changed {
        if let Some(series) = find_series(inputs, &status) {
            drive_sink(series, &status, sink, state, now).await;
        }
    } else if retry_due(&status, state, inputs.settings.opc_write_timeout, now) {
        // Retry policy (spec §4.5): a live, retry-until-end occurrence whose
        // last write attempt failed transiently is retried every
        // `opc_write_timeout` seconds for as long as it stays live.
        if let Some(series) = find_series(inputs, &status) {
            drive_sink(series, &status, sink, state, now).await;
        }
    }
    state.last_status = Some(status.clone());
    Some(status)
}

/// Whether `status`'s occurrence is due for a retry attempt: it was written
/// to before, that attempt is not recorded as a success or a terminal
/// failure (`last_written` would hold it if so), the occurrence is not
/// single-shot, it is still live, and `opc_write_timeout` seconds have
/// passed since the last attempt.
fn retry_due(status: &CurrentStatus, state: &SchedulerState, opc_write_timeout: i64, now: DateTime<Utc>) -> bool {
    if status.single_shot || now >= status.busy_until {
        return false;
    }
    let Some(key) = status.occurrence_key.as_ref() else {
        return false;
    };
    if state.last_written.as_ref().is_some_and(|(k, _)| k == key) {
        return false;
    }
    match &state.last_attempt {
        Some((k, at)) if k == key => now - *at >= chrono::Duration::seconds(opc_write_timeout.max(1)),
        _ => false,
    }
}

fn find_series<'a>(
    inputs: &'a TickInputs,
    status: &CurrentStatus,
) -> Option<&'a crate::models::Series> {
    let key = status.occurrence_key.as_ref()?;
    let series_id: i64 = key.split(':').next()?.parse().ok()?;
    inputs.snapshot.series.iter().find(|s| s.id == series_id)
}

async fn drive_sink(
    series: &crate::models::Series,
    status: &CurrentStatus,
    sink: &dyn ValueSink,
    state: &mut SchedulerState,
    now: DateTime<Utc>,
) {
    let value_text = status.value.as_text();
    let key = status.occurrence_key.clone().unwrap_or_default();

    if state.last_written.as_ref() == Some(&(key.clone(), value_text.clone())) {
        return;
    }

    state.last_attempt = Some((key.clone(), now));

    match sink
        .write(&series.endpoint, &series.node_id, &value_text, series.data_type)
        .await
    {
        SinkOutcome::Ok => {
            info!(series_id = series.id, value = %value_text, "sink write succeeded");
            state.last_written = Some((key, value_text));
        }
        SinkOutcome::Transient(reason) if status.single_shot => {
            // A single-shot occurrence has no "later" within its own window
            // to retry into — spec §4.5 treats this as a terminal failure.
            warn!(series_id = series.id, reason, "transient sink failure on single-shot occurrence, failed and not retried");
            state.last_written = Some((key, value_text));
        }
        SinkOutcome::Transient(reason) => {
            warn!(series_id = series.id, reason, "transient sink failure, will retry every opc_write_timeout seconds while occurrence is live");
        }
        SinkOutcome::Fatal(reason) => {
            warn!(series_id = series.id, reason, "fatal sink failure, not retrying");
            state.last_written = Some((key, value_text));
        }
    }
}

/// Shutdown signalling primitive shared between the Scheduler Loop task and
/// its owner (spec §5: "cooperative, checked at each suspension point").
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, DataType as DT, Series};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    struct RecordingSink {
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self { calls: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl ValueSink for RecordingSink {
        async fn write(&self, endpoint: &str, node_id: &str, value_text: &str, _data_type: DT) -> SinkOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((endpoint.to_string(), node_id.to_string(), value_text.to_string()));
            SinkOutcome::Ok
        }
    }

    struct ScriptedSink {
        outcomes: Mutex<VecDeque<SinkOutcome>>,
        calls: Mutex<usize>,
    }

    impl ScriptedSink {
        fn new(outcomes: Vec<SinkOutcome>) -> Self {
            Self { outcomes: Mutex::new(outcomes.into()), calls: Mutex::new(0) }
        }
    }

    #[async_trait]
    impl ValueSink for ScriptedSink {
        async fn write(&self, _endpoint: &str, _node_id: &str, _value_text: &str, _data_type: DT) -> SinkOutcome {
            *self.calls.lock().unwrap() += 1;
            self.outcomes.lock().unwrap().pop_front().unwrap_or(SinkOutcome::Ok)
        }
    }

    fn series() -> Series {
        Series {
            id: 1,
            task_name: "task".to_string(),
            endpoint: "opc.tcp://plc".to_string(),
            node_id: "ns=2;s=Value".to_string(),
            target_value: "auto".to_string(),
            data_type: DT::Auto,
            rrule_str: "FREQ=DAILY;BYHOUR=9;BYMINUTE=0;DTSTART:20260216T090000;DURATION=PT1H".to_string(),
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
                (*id, Category { id: *id, name: name.to_string(), bg_color: bg.to_string(), fg_color: fg.to_string(), sort_order: *id as i32, is_system: true })
            })
            .collect()
    }

    #[tokio::test]
    async fn tick_writes_to_sink_when_status_changes() {
        let sink = RecordingSink::new();
        let mut state = SchedulerState::new();
        let inputs = TickInputs {
            snapshot: ResolverSnapshot {
                series: vec![series()],
                exceptions: HashMap::new(),
                holiday_entries: vec![],
                categories: categories_map(),
                runtime_override: None,
            },
            settings: GeneralSettings::default(),
        };
        let now = DateTime::parse_from_rfc3339("2026-02-16T09:15:00Z").unwrap().with_timezone(&Utc);
        let status = tick(&inputs, &mut state, &sink, now).await;
        assert!(status.is_some());
        assert_eq!(sink.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tick_skips_sink_when_enable_schedule_is_false() {
        let sink = RecordingSink::new();
        let mut state = SchedulerState::new();
        let mut settings = GeneralSettings::default();
        settings.enable_schedule = false;
        let inputs = TickInputs {
            snapshot: ResolverSnapshot {
                series: vec![series()],
                exceptions: HashMap::new(),
                holiday_entries: vec![],
                categories: categories_map(),
                runtime_override: None,
            },
            settings,
        };
        let now = DateTime::parse_from_rfc3339("2026-02-16T09:15:00Z").unwrap().with_timezone(&Utc);
        let _ = tick(&inputs, &mut state, &sink, now).await;
        assert_eq!(sink.calls.lock().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn tick_does_not_rewrite_unchanged_status() {
        let sink = RecordingSink::new();
        let mut state = SchedulerState::new();
        let inputs = TickInputs {
            snapshot: ResolverSnapshot {
                series: vec![series()],
                exceptions: HashMap::new(),
                holiday_entries: vec![],
                categories: categories_map(),
                runtime_override: None,
            },
            settings: GeneralSettings::default(),
        };
        let now = DateTime::parse_from_rfc3339("2026-02-16T09:15:00Z").unwrap().with_timezone(&Utc);
        tick(&inputs, &mut state, &sink, now).await;
        tick(&inputs, &mut state, &sink, now + chrono::Duration::minutes(1)).await;
        assert_eq!(sink.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transient_failure_on_recurring_occurrence_retries_after_timeout() {
        let sink = ScriptedSink::new(vec![SinkOutcome::Transient("timeout".to_string()), SinkOutcome::Ok]);
        let mut state = SchedulerState::new();
        let inputs = TickInputs {
            snapshot: ResolverSnapshot {
                series: vec![series()],
                exceptions: HashMap::new(),
                holiday_entries: vec![],
                categories: categories_map(),
                runtime_override: None,
            },
            settings: GeneralSettings::default(),
        };
        let now = DateTime::parse_from_rfc3339("2026-02-16T09:15:00Z").unwrap().with_timezone(&Utc);

        tick(&inputs, &mut state, &sink, now).await;
        assert_eq!(*sink.calls.lock().unwrap(), 1);

        // Too soon after the failed attempt: opc_write_timeout (30s) hasn't elapsed.
        tick(&inputs, &mut state, &sink, now + chrono::Duration::seconds(10)).await;
        assert_eq!(*sink.calls.lock().unwrap(), 1);

        // Past the timeout and still live: retried, and this attempt succeeds.
        tick(&inputs, &mut state, &sink, now + chrono::Duration::seconds(31)).await;
        assert_eq!(*sink.calls.lock().unwrap(), 2);

        // No further writes once the retry succeeded.
        tick(&inputs, &mut state, &sink, now + chrono::Duration::seconds(40)).await;
        assert_eq!(*sink.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn transient_failure_on_single_shot_is_not_retried() {
        let sink = ScriptedSink::new(vec![SinkOutcome::Transient("nope".to_string())]);
        let mut state = SchedulerState::new();
        let mut single_shot_series = series();
        single_shot_series.rrule_str =
            "FREQ=DAILY;BYHOUR=9;BYMINUTE=0;DTSTART:20260216T090000;DURATION=PT0M".to_string();
        let inputs = TickInputs {
            snapshot: ResolverSnapshot {
                series: vec![single_shot_series],
                exceptions: HashMap::new(),
                holiday_entries: vec![],
                categories: categories_map(),
                runtime_override: None,
            },
            settings: GeneralSettings::default(),
        };
        let now = DateTime::parse_from_rfc3339("2026-02-16T09:00:30Z").unwrap().with_timezone(&Utc);

        tick(&inputs, &mut state, &sink, now).await;
        assert_eq!(*sink.calls.lock().unwrap(), 1);

        // Still the same (single-shot) occurrence, well past any retry
        // timeout — but single-shot failures are terminal, not retried.
        tick(&inputs, &mut state, &sink, now + chrono::Duration::seconds(10)).await;
        assert_eq!(*sink.calls.lock().unwrap(), 1);
    }
}
