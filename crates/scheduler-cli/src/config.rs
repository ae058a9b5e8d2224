use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

/// CLI-level configuration, layered from `config.toml` then `SCHED_`-prefixed
/// env vars (grounded on the teacher's `rusk-cli` `Config`). Distinct from
/// the persisted `GeneralSettings` single row, which lives in the database
/// and is mutated through `scheduler series`/`scheduler override` etc.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_sink_kind")]
    pub default_sink: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_database_url() -> String {
    "scheduler.db".to_string()
}

fn default_sink_kind() -> String {
    "logging".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            default_sink: default_sink_kind(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("SCHED_"))
            .extract()
    }
}
