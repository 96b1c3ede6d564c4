//! Category service
//!
//! Names and slugs stay reserved after a category is deleted, so a new
//! category can never collide with rows that old posts still point at.

use std::sync::Arc;

use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CreateCategoryInput, UpdateCategoryInput};

use super::audit::AuditService;
use super::error::{ServiceError, ServiceResult};

const MAX_NAME_LENGTH: usize = 50;

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    audit: Arc<AuditService>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>, audit: Arc<AuditService>) -> Self {
        Self { repo, audit }
    }

    /// Live categories ordered by `sort_order`, then name
    pub async fn list(&self) -> ServiceResult<Vec<Category>> {
        Ok(self.repo.list().await?)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Category> {
        self.repo
            .get_by_id(id)
            .await?
            .filter(|c| !c.is_deleted())
            .ok_or_else(|| ServiceError::not_found("Category"))
    }

    pub async fn create(&self, admin_id: i64, input: CreateCategoryInput) -> ServiceResult<Category> {
        let name = validate_name(&input.name)?;
        if self.repo.get_by_name(&name).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category '{}' already exists",
                name
            )));
        }

        let slug = self.unique_slug(&name).await?;
        let description = clean_description(input.description.as_deref());
        let category = self
            .repo
            .create(&name, &slug, description.as_deref(), input.sort_order)
            .await?;

        self.audit
            .record(Some(admin_id), "category_create", "category", Some(category.id), Some(name), None)
            .await;
        Ok(category)
    }

    pub async fn update(
        &self,
        admin_id: i64,
        id: i64,
        input: UpdateCategoryInput,
    ) -> ServiceResult<Category> {
        let mut category = self.get(id).await?;

        if let Some(name) = &input.name {
            let name = validate_name(name)?;
            if name != category.name {
                if let Some(existing) = self.repo.get_by_name(&name).await? {
                    if existing.id != id {
                        return Err(ServiceError::Conflict(format!(
                            "Category '{}' already exists",
                            name
                        )));
                    }
                }
                category.slug = self.unique_slug(&name).await?;
                category.name = name;
            }
        }
        if let Some(description) = &input.description {
            category.description = clean_description(Some(description));
        }
        if let Some(sort_order) = input.sort_order {
            category.sort_order = sort_order;
        }

        let updated = self.repo.update(&category).await?;
        self.audit
            .record(Some(admin_id), "category_update", "category", Some(id), None, None)
            .await;
        Ok(updated)
    }

    /// Soft delete; refused while visible posts still use the category
    pub async fn delete(&self, admin_id: i64, id: i64) -> ServiceResult<()> {
        let category = self.get(id).await?;
        let in_use = self.repo.count_visible_posts(id).await?;
        if in_use > 0 {
            return Err(ServiceError::Conflict(format!(
                "Category '{}' still has {} posts",
                category.name, in_use
            )));
        }

        self.repo.soft_delete(id).await?;
        self.audit
            .record(
                Some(admin_id),
                "category_delete",
                "category",
                Some(id),
                Some(category.name),
                None,
            )
            .await;
        Ok(())
    }

    /// Slug from `name`, suffixed with a counter while taken
    async fn unique_slug(&self, name: &str) -> ServiceResult<String> {
        let mut base = generate_slug(name);
        if base.is_empty() {
            base = "category".to_string();
        }
        let mut slug = base.clone();
        let mut n = 2;
        while self.repo.exists_by_slug(&slug).await? {
            slug = format!("{}-{}", base, n);
            n += 1;
        }
        Ok(slug)
    }
}

fn validate_name(name: &str) -> ServiceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("Category name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ServiceError::Validation(format!(
            "Category name must be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// URL slug for a category name.
///
/// Lower-cases, turns separators and ASCII punctuation into single hyphens
/// and keeps non-ASCII letters.
pub fn generate_slug(name: &str) -> String {
    let mut result = String::new();
    let mut prev_hyphen = false;

    for c in name.to_lowercase().chars() {
        let c = if c.is_ascii_alphanumeric() || (!c.is_ascii() && c.is_alphanumeric()) {
            c
        } else {
            '-'
        };
        if c == '-' {
            if !prev_hyphen && !result.is_empty() {
                result.push(c);
                prev_hyphen = true;
            }
        } else {
            result.push(c);
            prev_hyphen = false;
        }
    }

    result.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{PostRepository, SqlxAuditRepository, SqlxCategoryRepository, SqlxPostRepository};
    use crate::db::DynDatabasePool;
    use crate::models::UserRole;
    use crate::services::test_support::{insert_user, migrated_pool};
    use proptest::prelude::*;

    async fn setup() -> (DynDatabasePool, CategoryService) {
        let pool = migrated_pool().await;
        let service = CategoryService::new(
            SqlxCategoryRepository::boxed(pool.clone()),
            Arc::new(AuditService::new(SqlxAuditRepository::boxed(pool.clone()))),
        );
        (pool, service)
    }

    fn input(name: &str, sort_order: i64) -> CreateCategoryInput {
        CreateCategoryInput {
            name: name.to_string(),
            description: None,
            sort_order,
        }
    }

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
        assert_eq!(generate_slug("  Rust & Go!! "), "rust-go");
        assert_eq!(generate_slug("C++"), "c");
        assert_eq!(generate_slug("Café Talk"), "café-talk");
        assert_eq!(generate_slug("---"), "");
    }

    proptest! {
        #[test]
        fn prop_slug_has_no_edge_or_double_hyphens(name in ".{0,40}") {
            let slug = generate_slug(&name);
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }
    }

    #[tokio::test]
    async fn test_create_list_order() {
        let (_pool, service) = setup().await;
        service.create(1, input("Zeta", 0)).await.expect("Create");
        service.create(1, input("Alpha", 5)).await.expect("Create");
        service.create(1, input("Beta", 0)).await.expect("Create");

        let names: Vec<String> = service
            .list()
            .await
            .expect("List")
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Beta", "Zeta", "Alpha"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_and_slug_suffix() {
        let (_pool, service) = setup().await;
        let first = service.create(1, input("Off Topic", 0)).await.expect("Create");
        assert_eq!(first.slug, "off-topic");

        let dup = service.create(1, input("off topic", 0)).await;
        assert!(matches!(dup, Err(ServiceError::Conflict(_))));

        let second = service.create(1, input("Off-Topic!", 0)).await.expect("Create");
        assert_eq!(second.slug, "off-topic-2");
    }

    #[tokio::test]
    async fn test_update() {
        let (_pool, service) = setup().await;
        let created = service.create(1, input("News", 0)).await.expect("Create");
        let updated = service
            .update(
                1,
                created.id,
                UpdateCategoryInput {
                    name: Some("Announcements".into()),
                    description: Some("  Official  ".into()),
                    sort_order: Some(3),
                },
            )
            .await
            .expect("Update");
        assert_eq!(updated.name, "Announcements");
        assert_eq!(updated.slug, "announcements");
        assert_eq!(updated.description.as_deref(), Some("Official"));
        assert_eq!(updated.sort_order, 3);
    }

    #[tokio::test]
    async fn test_delete_refused_while_in_use() {
        let (pool, service) = setup().await;
        let author = insert_user(&pool, "writer", UserRole::Member).await;
        let category = service.create(1, input("Help", 0)).await.expect("Create");

        let posts = SqlxPostRepository::new(pool.clone());
        let post = posts
            .create(author.id, Some(category.id), "Question", "Body")
            .await
            .expect("Create post");

        assert!(matches!(
            service.delete(1, category.id).await,
            Err(ServiceError::Conflict(_))
        ));

        posts.soft_delete(post.id).await.expect("Delete post");
        service.delete(1, category.id).await.expect("Delete category");
        assert!(matches!(service.get(category.id).await, Err(ServiceError::NotFound(_))));
        assert!(service.list().await.expect("List").is_empty());
    }
}
