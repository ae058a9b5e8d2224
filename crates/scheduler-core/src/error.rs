use thiserror::Error;

/// Error kinds surfaced by the core (spec §7).
///
/// Propagation policy: the Resolver swallows `InvalidRule` per series and
/// continues with the rest of the window; repository writes surface every
/// other variant to the caller; the Scheduler Loop logs `Sink*` variants and
/// continues to the next tick. Nothing here is fatal to the process.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error("invalid recurrence rule for series {series_id}: {reason}")]
    InvalidRule { series_id: i64, reason: String },

    #[error("{entity} is in use by {refs} record(s)")]
    InUse { entity: String, refs: usize },

    #[error("{entity} is a system record and cannot be renamed or deleted")]
    SystemImmutable { entity: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid value for {field}: {reason}")]
    ValidationError { field: String, reason: String },

    #[error("transient sink failure: {0}")]
    SinkTransient(String),

    #[error("fatal sink failure: {0}")]
    SinkFatal(String),
}
