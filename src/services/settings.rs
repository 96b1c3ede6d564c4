//! Board settings
//!
//! Settings live as key/value rows. Missing or unparsable values fall back
//! to `BoardSettings::default()`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::db::repositories::SettingsRepository;
use crate::models::settings::keys;
use crate::models::{BoardSettings, UpdateSettingsInput};

use super::error::{ServiceError, ServiceResult};

pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_board_settings(&self) -> ServiceResult<BoardSettings> {
        let values = self
            .repo
            .get_many(&[
                keys::BOARD_NAME,
                keys::BOARD_DESCRIPTION,
                keys::ALLOW_REGISTRATION,
                keys::REQUIRE_EMAIL_VERIFICATION,
            ])
            .await?;
        let defaults = BoardSettings::default();

        Ok(BoardSettings {
            board_name: values
                .get(keys::BOARD_NAME)
                .cloned()
                .unwrap_or(defaults.board_name),
            board_description: values
                .get(keys::BOARD_DESCRIPTION)
                .cloned()
                .unwrap_or(defaults.board_description),
            allow_registration: values
                .get(keys::ALLOW_REGISTRATION)
                .and_then(|v| parse_bool(v))
                .unwrap_or(defaults.allow_registration),
            require_email_verification: values
                .get(keys::REQUIRE_EMAIL_VERIFICATION)
                .and_then(|v| parse_bool(v))
                .unwrap_or(defaults.require_email_verification),
        })
    }

    /// Apply the fields present in `input` and return the new settings
    pub async fn update_board_settings(
        &self,
        input: &UpdateSettingsInput,
    ) -> ServiceResult<BoardSettings> {
        let mut changes = HashMap::new();

        if let Some(name) = &input.board_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ServiceError::validation("Board name cannot be empty"));
            }
            if name.chars().count() > 100 {
                return Err(ServiceError::validation(
                    "Board name must be at most 100 characters",
                ));
            }
            changes.insert(keys::BOARD_NAME.to_string(), name.to_string());
        }
        if let Some(description) = &input.board_description {
            changes.insert(
                keys::BOARD_DESCRIPTION.to_string(),
                description.trim().to_string(),
            );
        }
        if let Some(allow) = input.allow_registration {
            changes.insert(keys::ALLOW_REGISTRATION.to_string(), allow.to_string());
        }
        if let Some(require) = input.require_email_verification {
            changes.insert(
                keys::REQUIRE_EMAIL_VERIFICATION.to_string(),
                require.to_string(),
            );
        }

        if !changes.is_empty() {
            self.repo.set_many(&changes).await?;
        }
        self.get_board_settings().await
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
