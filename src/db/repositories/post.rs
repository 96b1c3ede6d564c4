//! Post repository

use super::{search_key, search_needle};
use crate::db::DynDatabasePool;
use crate::models::{ListParams, Post, PostFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::sync::Arc;

const POST_COLUMNS: &str = "p.id, p.author_id, p.category_id, p.title, p.body, p.is_hidden, \
     p.is_locked, p.view_count, p.created_at, p.updated_at, p.deleted_at";

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(
        &self,
        author_id: i64,
        category_id: Option<i64>,
        title: &str,
        body: &str,
    ) -> Result<Post>;

    /// Get by ID, including hidden and soft-deleted posts
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Visible posts matching the filter
    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<(Vec<Post>, i64)>;

    /// Every post written by a user, newest first
    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Post>>;

    /// Persist title, body and category
    async fn update(&self, post: &Post) -> Result<Post>;

    async fn soft_delete(&self, id: i64) -> Result<bool>;

    async fn set_hidden(&self, id: i64, hidden: bool) -> Result<bool>;

    async fn set_locked(&self, id: i64, locked: bool) -> Result<bool>;

    async fn increment_view(&self, id: i64) -> Result<()>;
}

pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }

    async fn set_flag(&self, id: i64, column: &str, value: bool) -> Result<bool> {
        let sql = format!(
            "UPDATE posts SET {} = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            column
        );
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .with_context(|| format!("Failed to update post {}", column))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(
        &self,
        author_id: i64,
        category_id: Option<i64>,
        title: &str,
        body: &str,
    ) -> Result<Post> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO posts (author_id, category_id, title, body, search_key, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(author_id)
        .bind(category_id)
        .bind(title)
        .bind(body)
        .bind(search_key(&[title, body]))
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create post")?;

        Ok(Post {
            id: result.last_insert_rowid(),
            author_id,
            category_id,
            title: title.to_string(),
            body: body.to_string(),
            is_hidden: false,
            is_locked: false,
            view_count: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts p WHERE p.id = ?", POST_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get post by ID")?;
        Ok(row.as_ref().map(row_to_post))
    }

    async fn list(&self, filter: &PostFilter, params: &ListParams) -> Result<(Vec<Post>, i64)> {
        let mut count_query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE p.deleted_at IS NULL AND p.is_hidden = 0");
        push_post_filter(&mut count_query, filter);
        let total = count_query
            .build_query_scalar::<i64>()
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count posts")?;

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM posts p WHERE p.deleted_at IS NULL AND p.is_hidden = 0",
            POST_COLUMNS
        ));
        push_post_filter(&mut query, filter);
        query
            .push(" ORDER BY ")
            .push(filter.sort.order_clause())
            .push(" LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let rows = query
            .build()
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list posts")?;

        Ok((rows.iter().map(row_to_post).collect(), total))
    }

    async fn list_by_author(&self, author_id: i64) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM posts p WHERE p.author_id = ? ORDER BY p.created_at DESC, p.id DESC",
            POST_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(author_id)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list posts by author")?;
        Ok(rows.iter().map(row_to_post).collect())
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        sqlx::query(
            "UPDATE posts SET title = ?, body = ?, search_key = ?, category_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&post.title)
        .bind(&post.body)
        .bind(search_key(&[&post.title, &post.body]))
        .bind(post.category_id)
        .bind(Utc::now())
        .bind(post.id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update post")?;

        self.get_by_id(post.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
    }

    async fn soft_delete(&self, id: i64) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE posts SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to delete post")?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_hidden(&self, id: i64, hidden: bool) -> Result<bool> {
        self.set_flag(id, "is_hidden", hidden).await
    }

    async fn set_locked(&self, id: i64, locked: bool) -> Result<bool> {
        self.set_flag(id, "is_locked", locked).await
    }

    async fn increment_view(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to increment view count")?;
        Ok(())
    }
}

fn push_post_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &PostFilter) {
    if let Some(category_id) = filter.category_id {
        query.push(" AND p.category_id = ").push_bind(category_id);
    }
    if let Some(author_id) = filter.author_id {
        query.push(" AND p.author_id = ").push_bind(author_id);
    }
    if let Some(tag) = &filter.tag {
        query
            .push(" AND EXISTS (SELECT 1 FROM post_tags pt INNER JOIN tags t ON t.id = pt.tag_id WHERE pt.post_id = p.id AND t.name = ")
            .push_bind(tag.clone())
            .push(")");
    }
    if let Some(needle) = filter.search.as_deref().map(search_needle).filter(|s| !s.is_empty()) {
        query
            .push(" AND instr(p.search_key, ")
            .push_bind(needle)
            .push(") > 0");
    }
}

fn row_to_post(row: &sqlx::sqlite::SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        category_id: row.get("category_id"),
        title: row.get("title"),
        body: row.get("body"),
        is_hidden: row.get("is_hidden"),
        is_locked: row.get("is_locked"),
        view_count: row.get("view_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxTagRepository, SqlxUserRepository, TagRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{NewUser, PostSort, UserRole};

    async fn setup() -> (DynDatabasePool, SqlxPostRepository, i64) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let user = SqlxUserRepository::new(pool.clone())
            .create(&NewUser {
                email: "author@example.com".to_string(),
                username: "author".to_string(),
                nickname: "author".to_string(),
                password_hash: "hash".to_string(),
                role: UserRole::Member,
                email_verified: true,
            })
            .await
            .unwrap();
        (pool.clone(), SqlxPostRepository::new(pool), user.id)
    }

    #[tokio::test]
    async fn test_list_excludes_hidden_and_deleted() {
        let (_pool, repo, author) = setup().await;
        let a = repo.create(author, None, "First", "hello").await.unwrap();
        let b = repo.create(author, None, "Second", "world").await.unwrap();
        repo.create(author, None, "Third", "again").await.unwrap();

        repo.set_hidden(a.id, true).await.unwrap();
        repo.soft_delete(b.id).await.unwrap();

        let (posts, total) = repo.list(&PostFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].title, "Third");
        assert_eq!(repo.list_by_author(author).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let (_pool, repo, author) = setup().await;
        repo.create(author, None, "Async Rust", "tokio runtime").await.unwrap();
        repo.create(author, None, "Gardening", "Tomatoes and RUST spots").await.unwrap();
        repo.create(author, None, "Cooking", "pasta").await.unwrap();

        let filter = PostFilter {
            search: Some("rust".to_string()),
            ..Default::default()
        };
        let (_, total) = repo.list(&filter, &ListParams::default()).await.unwrap();
        assert_eq!(total, 2);
    }

    async fn search_total(repo: &SqlxPostRepository, search: &str) -> i64 {
        let filter = PostFilter {
            search: Some(search.to_string()),
            ..Default::default()
        };
        repo.list(&filter, &ListParams::default()).await.unwrap().1
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let (_pool, repo, author) = setup().await;
        repo.create(author, None, "Plain", "nothing special").await.unwrap();
        repo.create(author, None, "École", "rentrée").await.unwrap();

        assert_eq!(search_total(&repo, "%").await, 0);
        assert_eq!(search_total(&repo, "_").await, 0);
        assert_eq!(search_total(&repo, "école").await, 1);
        assert_eq!(search_total(&repo, "RENTRÉE").await, 1);

        repo.create(author, None, "100% uptime", "snake_case").await.unwrap();
        assert_eq!(search_total(&repo, "%").await, 1);
        assert_eq!(search_total(&repo, "e_c").await, 1);
    }

    #[tokio::test]
    async fn test_search_follows_edits() {
        let (_pool, repo, author) = setup().await;
        let mut post = repo.create(author, None, "Before", "body").await.unwrap();
        post.title = "Ärger".to_string();
        repo.update(&post).await.unwrap();

        assert_eq!(search_total(&repo, "before").await, 0);
        assert_eq!(search_total(&repo, "ärger").await, 1);
    }

    #[tokio::test]
    async fn test_popular_sort_and_tag_filter() {
        let (pool, repo, author) = setup().await;
        let quiet = repo.create(author, None, "Quiet", "q").await.unwrap();
        let busy = repo.create(author, None, "Busy", "b").await.unwrap();
        for _ in 0..3 {
            repo.increment_view(busy.id).await.unwrap();
        }

        let filter = PostFilter {
            sort: PostSort::Popular,
            ..Default::default()
        };
        let (posts, _) = repo.list(&filter, &ListParams::default()).await.unwrap();
        assert_eq!(posts[0].id, busy.id);
        assert_eq!(posts[0].view_count, 3);

        let tags = SqlxTagRepository::new(pool);
        let tag = tags.get_or_create("help").await.unwrap();
        tags.set_post_tags(quiet.id, &[tag.id]).await.unwrap();

        let filter = PostFilter {
            tag: Some("help".to_string()),
            ..Default::default()
        };
        let (posts, total) = repo.list(&filter, &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].id, quiet.id);
        assert_eq!(tags.list_with_counts().await.unwrap()[0].post_count, 1);
    }

    #[tokio::test]
    async fn test_lock_flag_and_update() {
        let (_pool, repo, author) = setup().await;
        let mut post = repo.create(author, None, "Title", "Body").await.unwrap();
        assert!(repo.set_locked(post.id, true).await.unwrap());

        post.title = "Edited".to_string();
        let updated = repo.update(&post).await.unwrap();
        assert_eq!(updated.title, "Edited");
        assert!(updated.is_locked);
    }
}
