//! Forbidden word list and content filter
//!
//! Matching is case-insensitive substring containment: "Spam" blocks
//! "SPAMMER" as well as "spam".

use std::sync::Arc;

use crate::db::repositories::ForbiddenWordRepository;
use crate::models::ForbiddenWord;

use super::error::{ServiceError, ServiceResult};

/// First word from `words` contained in `text`, ignoring case
pub fn find_forbidden_word<'a>(text: &str, words: &'a [ForbiddenWord]) -> Option<&'a str> {
    let haystack = text.to_lowercase();
    words
        .iter()
        .map(|w| w.word.as_str())
        .find(|w| !w.is_empty() && haystack.contains(&w.to_lowercase()))
}

pub struct ContentFilterService {
    repo: Arc<dyn ForbiddenWordRepository>,
}

impl ContentFilterService {
    pub fn new(repo: Arc<dyn ForbiddenWordRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> ServiceResult<Vec<ForbiddenWord>> {
        Ok(self.repo.list().await?)
    }

    /// Store a word lower-cased; duplicates are a conflict
    pub async fn add(&self, word: &str, created_by: Option<i64>) -> ServiceResult<ForbiddenWord> {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return Err(ServiceError::validation("Word cannot be empty"));
        }
        if word.chars().count() > 100 {
            return Err(ServiceError::validation("Word must be at most 100 characters"));
        }
        if self.repo.get_by_word(&word).await?.is_some() {
            return Err(ServiceError::conflict(format!(
                "'{}' is already a forbidden word",
                word
            )));
        }
        let created = self.repo.create(&word, created_by).await?;
        tracing::info!("Forbidden word added: {}", created.word);
        Ok(created)
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        if !self.repo.delete(id).await? {
            return Err(ServiceError::not_found("Forbidden word"));
        }
        Ok(())
    }

    /// Reject `text` if it contains any forbidden word
    pub async fn check(&self, text: &str) -> ServiceResult<()> {
        let words = self.repo.list().await?;
        match find_forbidden_word(text, &words) {
            Some(word) => Err(ServiceError::Validation(format!(
                "Content contains a forbidden word: {}",
                word
            ))),
            None => Ok(()),
        }
    }
}
