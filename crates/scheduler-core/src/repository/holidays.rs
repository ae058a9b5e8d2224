use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::CoreError;
use crate::models::{HolidayCalendar, HolidayEntry, NewHolidayCalendarData, NewHolidayEntryData};
use crate::repository::SqliteRepository;

#[async_trait]
impl super::HolidayRepository for SqliteRepository {
    async fn list_calendars(&self) -> Result<Vec<HolidayCalendar>, CoreError> {
        let calendars =
            sqlx::query_as::<_, HolidayCalendar>("SELECT * FROM holiday_calendars ORDER BY id")
                .fetch_all(self.pool())
                .await?;
        Ok(calendars)
    }

    async fn create_calendar(&self, data: NewHolidayCalendarData) -> Result<HolidayCalendar, CoreError> {
        let mut tx = self.pool().begin().await?;

        if data.is_default {
            sqlx::query("UPDATE holiday_calendars SET is_default = 0")
                .execute(&mut *tx)
                .await?;
        }

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO holiday_calendars (name, description, is_default) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let calendar = sqlx::query_as::<_, HolidayCalendar>("SELECT * FROM holiday_calendars WHERE id = $1")
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        Ok(calendar)
    }

    async fn set_default_calendar(&self, id: i64) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM holiday_calendars WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(CoreError::NotFound(format!("holiday calendar {id}")));
        }
        sqlx::query("UPDATE holiday_calendars SET is_default = 0")
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE holiday_calendars SET is_default = 1 WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_default_calendar_entries_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HolidayEntry>, CoreError> {
        let entries = sqlx::query_as::<_, HolidayEntry>(
            r#"SELECT he.* FROM holiday_entries he
               JOIN holiday_calendars hc ON hc.id = he.calendar_id
               WHERE hc.is_default = 1 AND he.date >= $1 AND he.date < $2
               ORDER BY he.date"#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(self.pool())
        .await?;
        Ok(entries)
    }

    async fn list_entries(&self, calendar_id: i64) -> Result<Vec<HolidayEntry>, CoreError> {
        let entries = sqlx::query_as::<_, HolidayEntry>(
            "SELECT * FROM holiday_entries WHERE calendar_id = $1 ORDER BY date",
        )
        .bind(calendar_id)
        .fetch_all(self.pool())
        .await?;
        Ok(entries)
    }

    async fn add_entry(&self, data: NewHolidayEntryData) -> Result<HolidayEntry, CoreError> {
        if !data.is_full_day {
            match (data.start_time, data.end_time) {
                (Some(start), Some(end)) if end > start => {}
                (Some(_), Some(_)) => {
                    return Err(CoreError::ValidationError {
                        field: "end_time".to_string(),
                        reason: "must be after start_time".to_string(),
                    })
                }
                _ => {
                    return Err(CoreError::ValidationError {
                        field: "start_time/end_time".to_string(),
                        reason: "both required for a non-full-day entry".to_string(),
                    })
                }
            }
        }

        let mut tx = self.pool().begin().await?;
        let calendar_exists: Option<i64> =
            sqlx::query_scalar("SELECT id FROM holiday_calendars WHERE id = $1")
                .bind(data.calendar_id)
                .fetch_optional(&mut *tx)
                .await?;
        if calendar_exists.is_none() {
            return Err(CoreError::NotFound(format!("holiday calendar {}", data.calendar_id)));
        }

        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO holiday_entries
               (calendar_id, date, name, is_full_day, start_time, end_time, override_category_id, override_target_value)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING id"#,
        )
        .bind(data.calendar_id)
        .bind(data.date)
        .bind(&data.name)
        .bind(data.is_full_day)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.override_category_id)
        .bind(&data.override_target_value)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let entry = sqlx::query_as::<_, HolidayEntry>("SELECT * FROM holiday_entries WHERE id = $1")
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        Ok(entry)
    }
}
