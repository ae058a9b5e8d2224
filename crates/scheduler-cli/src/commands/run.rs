use anyhow::Result;
use chrono::Utc;
use scheduler_core::repository::Repository;
use scheduler_core::scheduler::{shutdown_channel, tick, SchedulerState, TickInputs};
use tracing::info;

use crate::cli::RunCommand;
use crate::sink::{LoggingValueSink, RecordingValueSink};
use crate::snapshot::snapshot_for;

/// Drives the Scheduler Loop until Ctrl-C, grounded on the teacher's
/// `#[tokio::main]` binary shape but long-running instead of one-shot: each
/// iteration re-reads `GeneralSettings.scan_rate`, so an operator changing it
/// through `scheduler` mid-run takes effect on the next tick without a
/// restart (spec §9's "owned configuration value, re-read every tick").
pub async fn run(repo: &dyn Repository, command: RunCommand) -> Result<()> {
    let (shutdown_tx, mut shutdown_rx) = shutdown_channel();
    let mut state = SchedulerState::new();

    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(true);
    });

    let sink: Box<dyn scheduler_core::scheduler::ValueSink> = match command.sink.as_str() {
        "recording" => Box::new(RecordingValueSink::new()),
        _ => Box::new(LoggingValueSink),
    };

    info!("scheduler loop starting");
    loop {
        let settings = repo.get_settings().await?;
        let now = Utc::now();
        let from = now - chrono::Duration::days(1);
        let to = now + chrono::Duration::days(1);
        let snapshot = snapshot_for(repo, from, to).await?;

        let inputs = TickInputs { snapshot, settings };
        tick(&inputs, &mut state, sink.as_ref(), now).await;

        let scan_rate = inputs.settings.scan_rate.max(1) as u64;
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(scan_rate)) => {}
            _ = shutdown_rx.changed() => {
                info!("scheduler loop shutting down");
                break;
            }
        }
    }
    Ok(())
}
