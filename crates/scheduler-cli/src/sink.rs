use std::sync::Mutex;

use async_trait::async_trait;
use scheduler_core::models::DataType;
use scheduler_core::scheduler::{SinkOutcome, ValueSink};
use tracing::info;

/// Default sink for `scheduler run`: logs every write via `tracing` and
/// always succeeds, standing in for a real wire writer (spec §6.3).
pub struct LoggingValueSink;

#[async_trait]
impl ValueSink for LoggingValueSink {
    async fn write(&self, endpoint: &str, node_id: &str, value_text: &str, data_type: DataType) -> SinkOutcome {
        info!(endpoint, node_id, value = value_text, ?data_type, "would write value");
        SinkOutcome::Ok
    }
}

/// In-memory sink used by tests to assert what the Scheduler Loop would have
/// written, grounded on the teacher's use of an in-memory repository clone
/// for CLI integration tests.
#[derive(Default)]
pub struct RecordingValueSink {
    writes: Mutex<Vec<(String, String, String, DataType)>>,
}

impl RecordingValueSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<(String, String, String, DataType)> {
        self.writes.lock().expect("recording sink mutex poisoned").clone()
    }
}

#[async_trait]
impl ValueSink for RecordingValueSink {
    async fn write(&self, endpoint: &str, node_id: &str, value_text: &str, data_type: DataType) -> SinkOutcome {
        self.writes
            .lock()
            .expect("recording sink mutex poisoned")
            .push((endpoint.to_string(), node_id.to_string(), value_text.to_string(), data_type));
        SinkOutcome::Ok
    }
}
