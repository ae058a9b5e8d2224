use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::models::RuntimeOverride;
use crate::repository::SqliteRepository;

#[async_trait]
impl super::OverrideRepository for SqliteRepository {
    async fn get_override(&self) -> Result<Option<RuntimeOverride>, CoreError> {
        let over = sqlx::query_as::<_, RuntimeOverride>(
            "SELECT override_value, override_until FROM runtime_override WHERE id = 1",
        )
        .fetch_optional(self.pool())
        .await?;
        Ok(over)
    }

    async fn set_override(
        &self,
        value: String,
        until: Option<DateTime<Utc>>,
    ) -> Result<RuntimeOverride, CoreError> {
        sqlx::query(
            r#"INSERT INTO runtime_override (id, override_value, override_until) VALUES (1, $1, $2)
               ON CONFLICT(id) DO UPDATE SET override_value = excluded.override_value,
                                              override_until = excluded.override_until"#,
        )
        .bind(&value)
        .bind(until)
        .execute(self.pool())
        .await?;

        self.get_override()
            .await?
            .ok_or_else(|| CoreError::NotFound("runtime override".to_string()))
    }

    async fn clear_override(&self) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM runtime_override WHERE id = 1")
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
