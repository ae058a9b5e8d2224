use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::{Category, NewCategoryData, UpdateCategoryData, SYSTEM_CATEGORY_SEED};
use crate::repository::SqliteRepository;

#[async_trait]
impl super::CategoryRepository for SqliteRepository {
    async fn list_categories(&self) -> Result<Vec<Category>, CoreError> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY sort_order, id")
            .fetch_all(self.pool())
            .await?;
        Ok(categories)
    }

    async fn get_category(&self, id: i64) -> Result<Option<Category>, CoreError> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(category)
    }

    async fn create_category(&self, data: NewCategoryData) -> Result<Category, CoreError> {
        if data.name.trim().is_empty() {
            return Err(CoreError::ValidationError {
                field: "name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        let mut tx = self.pool().begin().await?;

        let sort_order = match data.sort_order {
            Some(order) => order,
            None => {
                let max: Option<i32> = sqlx::query_scalar("SELECT MAX(sort_order) FROM categories")
                    .fetch_one(&mut *tx)
                    .await?;
                max.unwrap_or(0) + 1
            }
        };

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO categories (name, bg_color, fg_color, sort_order, is_system) VALUES ($1, $2, $3, $4, 0) RETURNING id",
        )
        .bind(&data.name)
        .bind(&data.bg_color)
        .bind(&data.fg_color)
        .bind(sort_order)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_category(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("category {id}")))
    }

    async fn update_category(&self, id: i64, data: UpdateCategoryData) -> Result<Category, CoreError> {
        let existing = self
            .get_category(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("category {id}")))?;

        // System categories' identity (name, order) is fixed, but their colours
        // may still be retuned — only structural changes are rejected here, and
        // this repository only ever receives colour updates for them.
        let merged = Category {
            id: existing.id,
            name: existing.name,
            bg_color: data.bg_color.unwrap_or(existing.bg_color),
            fg_color: data.fg_color.unwrap_or(existing.fg_color),
            sort_order: data.sort_order.unwrap_or(existing.sort_order),
            is_system: existing.is_system,
        };

        sqlx::query("UPDATE categories SET bg_color = $1, fg_color = $2, sort_order = $3 WHERE id = $4")
            .bind(&merged.bg_color)
            .bind(&merged.fg_color)
            .bind(merged.sort_order)
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(merged)
    }

    async fn delete_category(&self, id: i64) -> Result<(), CoreError> {
        if SYSTEM_CATEGORY_SEED.iter().any(|(seed_id, ..)| *seed_id == id) {
            return Err(CoreError::SystemImmutable {
                entity: format!("category {id}"),
            });
        }

        let existing = self
            .get_category(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("category {id}")))?;
        if existing.is_system {
            return Err(CoreError::SystemImmutable {
                entity: format!("category {id}"),
            });
        }

        let mut refs = 0i64;
        refs += sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM series WHERE category_id = $1")
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        refs += sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM exceptions WHERE override_category_id = $1")
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        refs += sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM holiday_entries WHERE override_category_id = $1")
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        if refs > 0 {
            return Err(CoreError::InUse {
                entity: format!("category {id}"),
                refs: refs as usize,
            });
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("category {id}")));
        }
        Ok(())
    }
}
