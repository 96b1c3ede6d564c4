//! Tag service
//!
//! Tags have no admin "create": they appear the first time a post names
//! them and are stored normalised (trimmed, single-spaced, lower-case).

use std::sync::Arc;

use crate::db::repositories::TagRepository;
use crate::models::{normalize_tag_name, TagWithCount};

use super::audit::AuditService;
use super::error::{ServiceError, ServiceResult};

pub const MAX_TAGS_PER_POST: usize = 10;
pub const MAX_TAG_LENGTH: usize = 30;

pub struct TagService {
    repo: Arc<dyn TagRepository>,
    audit: Arc<AuditService>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>, audit: Arc<AuditService>) -> Self {
        Self { repo, audit }
    }

    /// All tags with their number of visible posts, most used first
    pub async fn list(&self) -> ServiceResult<Vec<TagWithCount>> {
        Ok(self.repo.list_with_counts().await?)
    }

    pub async fn names_for_post(&self, post_id: i64) -> ServiceResult<Vec<String>> {
        Ok(self.repo.names_for_post(post_id).await?)
    }

    /// Normalise `names`, create the missing ones and attach them to a post,
    /// replacing whatever it had before
    pub async fn set_post_tags(&self, post_id: i64, names: &[String]) -> ServiceResult<Vec<String>> {
        let names = normalize_tag_list(names)?;
        let mut ids = Vec::with_capacity(names.len());
        for name in &names {
            ids.push(self.repo.get_or_create(name).await?.id);
        }
        self.repo.set_post_tags(post_id, &ids).await?;
        Ok(names)
    }

    pub async fn delete(&self, admin_id: i64, id: i64) -> ServiceResult<()> {
        let tag = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tag"))?;
        self.repo.delete(id).await?;
        self.audit
            .record(Some(admin_id), "tag_delete", "tag", Some(id), Some(tag.name), None)
            .await;
        Ok(())
    }
}

/// Normalised, de-duplicated tag names in first-seen order
pub fn normalize_tag_list(names: &[String]) -> ServiceResult<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let Some(name) = normalize_tag_name(name) else {
            continue;
        };
        if name.chars().count() > MAX_TAG_LENGTH {
            return Err(ServiceError::Validation(format!(
                "Tag '{}' is longer than {} characters",
                name, MAX_TAG_LENGTH
            )));
        }
        if !out.contains(&name) {
            out.push(name);
        }
    }
    if out.len() > MAX_TAGS_PER_POST {
        return Err(ServiceError::Validation(format!(
            "A post can have at most {} tags",
            MAX_TAGS_PER_POST
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        PostRepository, SqlxAuditRepository, SqlxPostRepository, SqlxTagRepository,
    };
    use crate::models::UserRole;
    use crate::services::test_support::{insert_user, migrated_pool};

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_tag_list() {
        let names = normalize_tag_list(&strings(&["Rust", " rust ", "", "Async  IO"]))
            .expect("Valid tags");
        assert_eq!(names, vec!["rust", "async io"]);

        let too_long = normalize_tag_list(&strings(&[&"x".repeat(31)]));
        assert!(matches!(too_long, Err(ServiceError::Validation(_))));

        let many: Vec<String> = (0..11).map(|i| format!("t{}", i)).collect();
        assert!(normalize_tag_list(&many).is_err());
    }

    #[tokio::test]
    async fn test_set_post_tags_and_counts() {
        let pool = migrated_pool().await;
        let author = insert_user(&pool, "tagger", UserRole::Member).await;
        let service = TagService::new(
            SqlxTagRepository::boxed(pool.clone()),
            Arc::new(AuditService::new(SqlxAuditRepository::boxed(pool.clone()))),
        );
        let posts = SqlxPostRepository::new(pool.clone());
        let first = posts.create(author.id, None, "One", "Body").await.expect("Post");
        let second = posts.create(author.id, None, "Two", "Body").await.expect("Post");

        service
            .set_post_tags(first.id, &strings(&["Rust", "Web"]))
            .await
            .expect("Tag first");
        service
            .set_post_tags(second.id, &strings(&["rust"]))
            .await
            .expect("Tag second");

        let tags = service.list().await.expect("List");
        assert_eq!(tags[0].tag.name, "rust");
        assert_eq!(tags[0].post_count, 2);

        service
            .set_post_tags(first.id, &strings(&["web"]))
            .await
            .expect("Retag");
        let mut names = service.names_for_post(first.id).await.expect("Names");
        names.sort();
        assert_eq!(names, vec!["web"]);

        let web = tags.iter().find(|t| t.tag.name == "web").expect("web tag");
        service.delete(author.id, web.tag.id).await.expect("Delete");
        assert!(service.names_for_post(first.id).await.expect("Names").is_empty());
        assert!(matches!(
            service.delete(author.id, web.tag.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
