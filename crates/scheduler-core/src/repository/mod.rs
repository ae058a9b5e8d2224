use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    Category, Exception, GeneralSettings, HolidayCalendar, HolidayEntry, NewCategoryData,
    NewExceptionData, NewHolidayCalendarData, NewHolidayEntryData, NewSeriesData,
    RuntimeOverride, Series, UpdateCategoryData, UpdateSeriesData,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

pub mod categories;
pub mod exceptions;
pub mod holidays;
pub mod overrides;
pub mod series;
pub mod settings;

/// Read-side and write-side contract the Resolver, Category Resolver and CLI
/// depend on (spec §4.2, §6.2). Each read is a consistent snapshot — the
/// SQLite implementation serialises reads/writes behind `sqlx`'s pool so the
/// Resolver never observes a write-in-progress half-state (spec §5).
#[async_trait]
pub trait SeriesRepository {
    async fn list_enabled_series(&self) -> Result<Vec<Series>, CoreError>;
    async fn list_all_series(&self) -> Result<Vec<Series>, CoreError>;
    async fn find_series_by_id(&self, id: i64) -> Result<Option<Series>, CoreError>;
    async fn create_series(&self, data: NewSeriesData) -> Result<Series, CoreError>;
    async fn update_series(&self, id: i64, data: UpdateSeriesData) -> Result<Series, CoreError>;
    async fn delete_series(&self, id: i64) -> Result<(), CoreError>;
}

#[async_trait]
pub trait ExceptionRepository {
    async fn list_exceptions_for_series_in_range(
        &self,
        series_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Exception>, CoreError>;
    async fn list_exceptions_for_series(&self, series_id: i64) -> Result<Vec<Exception>, CoreError>;
    async fn add_exception(&self, data: NewExceptionData) -> Result<Exception, CoreError>;
    async fn remove_exception(&self, series_id: i64, occurrence_date: NaiveDate) -> Result<(), CoreError>;
}

#[async_trait]
pub trait HolidayRepository {
    async fn list_calendars(&self) -> Result<Vec<HolidayCalendar>, CoreError>;
    async fn create_calendar(&self, data: NewHolidayCalendarData) -> Result<HolidayCalendar, CoreError>;
    async fn set_default_calendar(&self, id: i64) -> Result<(), CoreError>;
    async fn list_default_calendar_entries_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HolidayEntry>, CoreError>;
    async fn list_entries(&self, calendar_id: i64) -> Result<Vec<HolidayEntry>, CoreError>;
    async fn add_entry(&self, data: NewHolidayEntryData) -> Result<HolidayEntry, CoreError>;
}

#[async_trait]
pub trait CategoryRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, CoreError>;
    async fn get_category(&self, id: i64) -> Result<Option<Category>, CoreError>;
    async fn create_category(&self, data: NewCategoryData) -> Result<Category, CoreError>;
    async fn update_category(&self, id: i64, data: UpdateCategoryData) -> Result<Category, CoreError>;
    async fn delete_category(&self, id: i64) -> Result<(), CoreError>;
}

#[async_trait]
pub trait SettingsRepository {
    async fn get_settings(&self) -> Result<GeneralSettings, CoreError>;
    async fn update_settings(&self, settings: GeneralSettings) -> Result<GeneralSettings, CoreError>;
}

#[async_trait]
pub trait OverrideRepository {
    async fn get_override(&self) -> Result<Option<RuntimeOverride>, CoreError>;
    async fn set_override(
        &self,
        value: String,
        until: Option<DateTime<Utc>>,
    ) -> Result<RuntimeOverride, CoreError>;
    async fn clear_override(&self) -> Result<(), CoreError>;
}

/// Composes every domain-specific trait into the one contract the Resolver
/// and CLI actually depend on.
pub trait Repository:
    SeriesRepository
    + ExceptionRepository
    + HolidayRepository
    + CategoryRepository
    + SettingsRepository
    + OverrideRepository
{
}

/// SQLite implementation of the [`Repository`] pattern.
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl Repository for SqliteRepository {}
