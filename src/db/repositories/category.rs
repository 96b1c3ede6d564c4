//! Category repository

use crate::db::DynDatabasePool;
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const CATEGORY_COLUMNS: &str =
    "id, name, slug, description, sort_order, created_at, updated_at, deleted_at";

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(
        &self,
        name: &str,
        slug: &str,
        description: Option<&str>,
        sort_order: i64,
    ) -> Result<Category>;

    /// Get by ID, including soft-deleted rows
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>>;

    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;

    /// Live categories ordered by sort order, then name
    async fn list(&self) -> Result<Vec<Category>>;

    async fn update(&self, category: &Category) -> Result<Category>;

    async fn soft_delete(&self, id: i64) -> Result<bool>;

    /// Number of visible posts filed under the category
    async fn count_visible_posts(&self, id: i64) -> Result<i64>;
}

pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(
        &self,
        name: &str,
        slug: &str,
        description: Option<&str>,
        sort_order: i64,
    ) -> Result<Category> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO categories (name, slug, description, sort_order, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(sort_order)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create category")?;

        Ok(Category {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            slug: slug.to_string(),
            description: description.map(str::to_string),
            sort_order,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get category by ID")?;
        Ok(row.as_ref().map(row_to_category))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        let sql = format!(
            "SELECT {} FROM categories WHERE LOWER(name) = LOWER(?)",
            CATEGORY_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get category by name")?;
        Ok(row.as_ref().map(row_to_category))
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE slug = ?")
            .bind(slug)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to check category slug")?;
        Ok(count > 0)
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT {} FROM categories WHERE deleted_at IS NULL ORDER BY sort_order, name",
            CATEGORY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list categories")?;
        Ok(rows.iter().map(row_to_category).collect())
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE categories
            SET name = ?, slug = ?, description = ?, sort_order = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.sort_order)
        .bind(now)
        .bind(category.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update category")?;

        self.get_by_id(category.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
    }

    async fn soft_delete(&self, id: i64) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE categories SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to delete category")?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_visible_posts(&self, id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE category_id = ? AND deleted_at IS NULL AND is_hidden = 0",
        )
        .bind(id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to count category posts")?;
        Ok(count)
    }
}

fn row_to_category(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        description: row.get("description"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}
