use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::CoreError;
use crate::models::{Exception, ExceptionAction, NewExceptionData};
use crate::repository::SqliteRepository;

#[async_trait]
impl super::ExceptionRepository for SqliteRepository {
    async fn list_exceptions_for_series_in_range(
        &self,
        series_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Exception>, CoreError> {
        let exceptions = sqlx::query_as::<_, Exception>(
            "SELECT * FROM exceptions WHERE schedule_id = $1 AND occurrence_date >= $2 AND occurrence_date < $3 \
             ORDER BY occurrence_date",
        )
        .bind(series_id)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool())
        .await?;
        Ok(exceptions)
    }

    async fn list_exceptions_for_series(&self, series_id: i64) -> Result<Vec<Exception>, CoreError> {
        let exceptions = sqlx::query_as::<_, Exception>(
            "SELECT * FROM exceptions WHERE schedule_id = $1 ORDER BY occurrence_date",
        )
        .bind(series_id)
        .fetch_all(self.pool())
        .await?;
        Ok(exceptions)
    }

    async fn add_exception(&self, data: NewExceptionData) -> Result<Exception, CoreError> {
        if data.action == ExceptionAction::Override
            && data.override_start.is_none()
            && data.override_end.is_none()
            && data.override_task_name.is_none()
            && data.override_target_value.is_none()
            && data.override_category_id.is_none()
        {
            return Err(CoreError::ValidationError {
                field: "action".to_string(),
                reason: "override exception requires at least one override field".to_string(),
            });
        }
        if let (Some(start), Some(end)) = (data.override_start, data.override_end) {
            if end <= start {
                return Err(CoreError::ValidationError {
                    field: "override_end".to_string(),
                    reason: "must be after override_start".to_string(),
                });
            }
        }

        let mut tx = self.pool().begin().await?;

        let series_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM series WHERE id = $1")
            .bind(data.schedule_id)
            .fetch_optional(&mut *tx)
            .await?;
        if series_exists.is_none() {
            return Err(CoreError::NotFound(format!("series {}", data.schedule_id)));
        }

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM exceptions WHERE schedule_id = $1 AND occurrence_date = $2",
        )
        .bind(data.schedule_id)
        .bind(data.occurrence_date)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(CoreError::ValidationError {
                field: "occurrence_date".to_string(),
                reason: "an exception already exists for this (series, date) pair".to_string(),
            });
        }

        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO exceptions
               (schedule_id, occurrence_date, action, override_start, override_end,
                override_task_name, override_target_value, override_category_id, note)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING id"#,
        )
        .bind(data.schedule_id)
        .bind(data.occurrence_date)
        .bind(data.action)
        .bind(data.override_start)
        .bind(data.override_end)
        .bind(&data.override_task_name)
        .bind(&data.override_target_value)
        .bind(data.override_category_id)
        .bind(&data.note)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let exception = sqlx::query_as::<_, Exception>("SELECT * FROM exceptions WHERE id = $1")
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        Ok(exception)
    }

    async fn remove_exception(&self, series_id: i64, occurrence_date: NaiveDate) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM exceptions WHERE schedule_id = $1 AND occurrence_date = $2")
            .bind(series_id)
            .bind(occurrence_date)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!(
                "exception for series {series_id} on {occurrence_date}"
            )));
        }
        Ok(())
    }
}
