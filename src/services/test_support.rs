//! Fixtures shared by service tests

use crate::db::repositories::{SqlxUserRepository, UserRepository};
use crate::db::{create_test_pool, migrations, DynDatabasePool};
use crate::models::{NewUser, User, UserRole};

use super::password::hash_password;

pub const TEST_PASSWORD: &str = "password123";

pub async fn migrated_pool() -> DynDatabasePool {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Insert a verified account whose password is [`TEST_PASSWORD`]
pub async fn insert_user(pool: &DynDatabasePool, username: &str, role: UserRole) -> User {
    let repo = SqlxUserRepository::new(pool.clone());
    repo.create(&NewUser {
        email: format!("{}@example.com", username),
        username: username.to_string(),
        nickname: format!("{} nick", username),
        password_hash: hash_password(TEST_PASSWORD).expect("Failed to hash password"),
        role,
        email_verified: true,
    })
    .await
    .expect("Failed to insert user")
}
