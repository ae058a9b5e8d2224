use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::{NewSeriesData, Series, UpdateSeriesData};
use crate::recurrence::RecurrenceRule;
use crate::repository::SqliteRepository;

#[async_trait]
impl super::SeriesRepository for SqliteRepository {
    async fn list_enabled_series(&self) -> Result<Vec<Series>, CoreError> {
        let series = sqlx::query_as::<_, Series>("SELECT * FROM series WHERE enabled = 1 ORDER BY id")
            .fetch_all(self.pool())
            .await?;
        Ok(series)
    }

    async fn list_all_series(&self) -> Result<Vec<Series>, CoreError> {
        let series = sqlx::query_as::<_, Series>("SELECT * FROM series ORDER BY id")
            .fetch_all(self.pool())
            .await?;
        Ok(series)
    }

    async fn find_series_by_id(&self, id: i64) -> Result<Option<Series>, CoreError> {
        let series = sqlx::query_as::<_, Series>("SELECT * FROM series WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(series)
    }

    async fn create_series(&self, data: NewSeriesData) -> Result<Series, CoreError> {
        if data.task_name.trim().is_empty() {
            return Err(CoreError::ValidationError {
                field: "task_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        // Validate rrule_str parses before it ever reaches the Resolver.
        RecurrenceRule::parse(&data.rrule_str)
            .map_err(|_| CoreError::ValidationError {
                field: "rrule_str".to_string(),
                reason: format!("does not parse: {}", data.rrule_str),
            })?;

        let mut tx = self.pool().begin().await?;

        let category_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE id = $1")
            .bind(data.category_id)
            .fetch_optional(&mut *tx)
            .await?;
        if category_exists.is_none() {
            return Err(CoreError::NotFound(format!("category {}", data.category_id)));
        }

        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO series
               (task_name, endpoint, node_id, target_value, data_type, rrule_str, category_id, priority, enabled, credential)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING id"#,
        )
        .bind(&data.task_name)
        .bind(&data.endpoint)
        .bind(&data.node_id)
        .bind(&data.target_value)
        .bind(data.data_type)
        .bind(&data.rrule_str)
        .bind(data.category_id)
        .bind(data.priority)
        .bind(data.enabled)
        .bind(&data.credential)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        self.find_series_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("series {id}")))
    }

    async fn update_series(&self, id: i64, data: UpdateSeriesData) -> Result<Series, CoreError> {
        let existing = self
            .find_series_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("series {id}")))?;

        if let Some(rrule_str) = &data.rrule_str {
            RecurrenceRule::parse(rrule_str).map_err(|_| CoreError::ValidationError {
                field: "rrule_str".to_string(),
                reason: format!("does not parse: {rrule_str}"),
            })?;
        }

        let merged = Series {
            id: existing.id,
            task_name: data.task_name.unwrap_or(existing.task_name),
            endpoint: data.endpoint.unwrap_or(existing.endpoint),
            node_id: data.node_id.unwrap_or(existing.node_id),
            target_value: data.target_value.unwrap_or(existing.target_value),
            data_type: data.data_type.unwrap_or(existing.data_type),
            rrule_str: data.rrule_str.unwrap_or(existing.rrule_str),
            category_id: data.category_id.unwrap_or(existing.category_id),
            priority: data.priority.unwrap_or(existing.priority),
            enabled: data.enabled.unwrap_or(existing.enabled),
            credential: existing.credential,
        };

        sqlx::query(
            r#"UPDATE series SET task_name = $1, endpoint = $2, node_id = $3, target_value = $4,
               data_type = $5, rrule_str = $6, category_id = $7, priority = $8, enabled = $9
               WHERE id = $10"#,
        )
        .bind(&merged.task_name)
        .bind(&merged.endpoint)
        .bind(&merged.node_id)
        .bind(&merged.target_value)
        .bind(merged.data_type)
        .bind(&merged.rrule_str)
        .bind(merged.category_id)
        .bind(merged.priority)
        .bind(merged.enabled)
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(merged)
    }

    async fn delete_series(&self, id: i64) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM exceptions WHERE schedule_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM series WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("series {id}")));
        }
        tx.commit().await?;
        Ok(())
    }
}
