//! User repository
//!
//! Database operations for accounts of every role.

use super::{search_key, search_needle};
use crate::db::DynDatabasePool;
use crate::models::{ListParams, NewUser, User, UserFilter, UserRole, UserStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::str::FromStr;
use std::sync::Arc;

const USER_COLUMNS: &str = "id, email, username, nickname, password_hash, role, status, \
     email_verified, last_login_at, created_at, updated_at, deleted_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &NewUser) -> Result<User>;

    /// Get user by ID, including soft-deleted accounts
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn get_by_nickname(&self, nickname: &str) -> Result<Option<User>>;

    /// Find a login candidate by email or username
    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>>;

    /// Count all accounts ever created
    async fn count(&self) -> Result<i64>;

    /// Count live accounts with the given role
    async fn count_by_role(&self, role: UserRole) -> Result<i64>;

    /// List live accounts matching the filter
    async fn list(&self, filter: &UserFilter, params: &ListParams) -> Result<(Vec<User>, i64)>;

    async fn update_nickname(&self, id: i64, nickname: &str) -> Result<bool>;

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool>;

    async fn update_role(&self, id: i64, role: UserRole) -> Result<bool>;

    async fn update_status(&self, id: i64, status: UserStatus) -> Result<bool>;

    async fn set_email_verified(&self, id: i64, verified: bool) -> Result<bool>;

    /// Record a successful login
    async fn touch_last_login(&self, id: i64) -> Result<()>;

    /// Soft delete an account
    async fn soft_delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }

    async fn get_by_column(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(self.pool.sqlite())
            .await
            .with_context(|| format!("Failed to get user by {}", column))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn set_column<T>(&self, id: i64, column: &str, value: T) -> Result<bool>
    where
        T: for<'q> sqlx::Encode<'q, Sqlite> + sqlx::Type<Sqlite> + Send + 'static,
    {
        let sql = format!("UPDATE users SET {} = ?, updated_at = ? WHERE id = ?", column);
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .with_context(|| format!("Failed to update user {}", column))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users (email, username, nickname, search_key, password_hash, role, status,
                               email_verified, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.nickname)
        .bind(search_key(&[&user.email, &user.username, &user.nickname]))
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(UserStatus::Active.to_string())
        .bind(user.email_verified)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create user")?;

        Ok(User {
            id: result.last_insert_rowid(),
            email: user.email.clone(),
            username: user.username.clone(),
            nickname: user.nickname.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            status: UserStatus::Active,
            email_verified: user.email_verified,
            last_login_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get user by ID")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_by_column("email", email).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.get_by_column("username", username).await
    }

    async fn get_by_nickname(&self, nickname: &str) -> Result<Option<User>> {
        self.get_by_column("nickname", nickname).await
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE email = ? OR username = ? LIMIT 1",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(identifier.to_lowercase())
            .bind(identifier)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to find user by login")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count users")?;
        Ok(count)
    }

    async fn count_by_role(&self, role: UserRole) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE role = ? AND deleted_at IS NULL",
        )
        .bind(role.to_string())
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to count users by role")?;
        Ok(count)
    }

    async fn list(&self, filter: &UserFilter, params: &ListParams) -> Result<(Vec<User>, i64)> {
        let mut count_query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL");
        push_user_filter(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count users")?;

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM users WHERE deleted_at IS NULL",
            USER_COLUMNS
        ));
        push_user_filter(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let rows = query
            .build()
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list users")?;

        let users = rows.iter().map(row_to_user).collect::<Result<Vec<_>>>()?;
        Ok((users, total))
    }

    async fn update_nickname(&self, id: i64, nickname: &str) -> Result<bool> {
        let Some(user) = self.get_by_id(id).await? else {
            return Ok(false);
        };
        let result = sqlx::query(
            "UPDATE users SET nickname = ?, search_key = ?, updated_at = ? WHERE id = ?",
        )
        .bind(nickname)
        .bind(search_key(&[&user.email, &user.username, nickname]))
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update user nickname")?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool> {
        self.set_column(id, "password_hash", password_hash.to_string()).await
    }

    async fn update_role(&self, id: i64, role: UserRole) -> Result<bool> {
        self.set_column(id, "role", role.to_string()).await
    }

    async fn update_status(&self, id: i64, status: UserStatus) -> Result<bool> {
        self.set_column(id, "status", status.to_string()).await
    }

    async fn set_email_verified(&self, id: i64, verified: bool) -> Result<bool> {
        self.set_column(id, "email_verified", verified).await
    }

    async fn touch_last_login(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update last login")?;
        Ok(())
    }

    async fn soft_delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to delete user")?;

        Ok(result.rows_affected() > 0)
    }
}

fn push_user_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &UserFilter) {
    if let Some(role) = filter.role {
        query.push(" AND role = ").push_bind(role.to_string());
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.to_string());
    }
    if let Some(needle) = filter.search.as_deref().map(search_needle).filter(|s| !s.is_empty()) {
        query
            .push(" AND instr(search_key, ")
            .push_bind(needle)
            .push(") > 0");
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    let status_str: String = row.get("status");
    let status = UserStatus::from_str(&status_str).unwrap_or(UserStatus::Active);

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        nickname: row.get("nickname"),
        password_hash: row.get("password_hash"),
        role,
        status,
        email_verified: row.get("email_verified"),
        last_login_at: row.get("last_login_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn new_user(name: &str, role: UserRole) -> NewUser {
        NewUser {
            email: format!("{}@example.com", name),
            username: name.to_string(),
            nickname: format!("{} nick", name),
            password_hash: "hash".to_string(),
            role,
            email_verified: true,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = setup_test_repo().await;
        let created = repo.create(&new_user("alice", UserRole::Member)).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().expect("User not found");
        assert_eq!(found.username, "alice");
        assert_eq!(found.role, UserRole::Member);
        assert!(found.email_verified);
        assert!(found.deleted_at.is_none());

        assert!(repo.get_by_nickname("alice nick").await.unwrap().is_some());
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_login_matches_email_or_username() {
        let repo = setup_test_repo().await;
        repo.create(&new_user("bob", UserRole::Member)).await.unwrap();

        assert!(repo.find_by_login("bob").await.unwrap().is_some());
        assert!(repo.find_by_login("BOB@example.com").await.unwrap().is_some());
        assert!(repo.find_by_login("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_and_excludes_deleted() {
        let repo = setup_test_repo().await;
        let alice = repo.create(&new_user("alice", UserRole::Member)).await.unwrap();
        repo.create(&new_user("bob", UserRole::Moderator)).await.unwrap();
        repo.create(&new_user("carol", UserRole::Member)).await.unwrap();

        let (all, total) = repo.list(&UserFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(all.len(), 3);

        let filter = UserFilter {
            role: Some(UserRole::Moderator),
            ..Default::default()
        };
        let (mods, total) = repo.list(&filter, &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(mods[0].username, "bob");

        let filter = UserFilter {
            search: Some("CAR".to_string()),
            ..Default::default()
        };
        let (found, _) = repo.list(&filter, &ListParams::default()).await.unwrap();
        assert_eq!(found.len(), 1);

        assert!(repo.soft_delete(alice.id).await.unwrap());
        assert!(!repo.soft_delete(alice.id).await.unwrap());
        let (_, total) = repo.list(&UserFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_search_matches_literal_underscore_and_accents() {
        let repo = setup_test_repo().await;
        repo.create(&new_user("john_doe", UserRole::Member)).await.unwrap();
        repo.create(&new_user("johnxdoe", UserRole::Member)).await.unwrap();
        let eve = repo.create(&new_user("eve", UserRole::Member)).await.unwrap();

        let search = |text: &str| UserFilter {
            search: Some(text.to_string()),
            ..Default::default()
        };
        let (found, _) = repo.list(&search("n_d"), &ListParams::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "john_doe");
        let (found, _) = repo.list(&search("%"), &ListParams::default()).await.unwrap();
        assert!(found.is_empty());

        assert!(repo.update_nickname(eve.id, "Éloïse").await.unwrap());
        let (found, _) = repo.list(&search("éloïse"), &ListParams::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, eve.id);
        let (found, _) = repo.list(&search("eve nick"), &ListParams::default()).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_role_status_and_verification_updates() {
        let repo = setup_test_repo().await;
        let user = repo.create(&new_user("dave", UserRole::Member)).await.unwrap();

        repo.update_role(user.id, UserRole::Administrator).await.unwrap();
        repo.update_status(user.id, UserStatus::Suspended).await.unwrap();
        repo.set_email_verified(user.id, false).await.unwrap();
        repo.touch_last_login(user.id).await.unwrap();

        let updated = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(updated.role, UserRole::Administrator);
        assert!(updated.is_suspended());
        assert!(!updated.email_verified);
        assert!(updated.last_login_at.is_some());
        assert_eq!(repo.count_by_role(UserRole::Administrator).await.unwrap(), 1);
    }
}
