use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::GeneralSettings;
use crate::repository::SqliteRepository;

const SETTINGS_COLUMNS: &str = "profile_name, enable_schedule, scan_rate, refresh_rate, \
     active_from, active_to, output_type, refresh_output, generate_events, opc_write_timeout";

#[async_trait]
impl super::SettingsRepository for SqliteRepository {
    async fn get_settings(&self) -> Result<GeneralSettings, CoreError> {
        let settings = sqlx::query_as::<_, GeneralSettings>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM general_settings WHERE id = 1"
        ))
        .fetch_one(self.pool())
        .await?;
        Ok(settings)
    }

    async fn update_settings(&self, settings: GeneralSettings) -> Result<GeneralSettings, CoreError> {
        sqlx::query(
            r#"UPDATE general_settings SET
               profile_name = $1, enable_schedule = $2, scan_rate = $3, refresh_rate = $4,
               active_from = $5, active_to = $6, output_type = $7, refresh_output = $8,
               generate_events = $9, opc_write_timeout = $10
               WHERE id = 1"#,
        )
        .bind(&settings.profile_name)
        .bind(settings.enable_schedule)
        .bind(settings.scan_rate)
        .bind(settings.refresh_rate)
        .bind(settings.active_from)
        .bind(settings.active_to)
        .bind(&settings.output_type)
        .bind(settings.refresh_output)
        .bind(settings.generate_events)
        .bind(settings.opc_write_timeout)
        .execute(self.pool())
        .await?;

        self.get_settings().await
    }
}
