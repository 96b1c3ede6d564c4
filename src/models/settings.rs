//! Board settings model

use serde::{Deserialize, Serialize};

/// Known setting keys
pub mod keys {
    pub const BOARD_NAME: &str = "board_name";
    pub const BOARD_DESCRIPTION: &str = "board_description";
    pub const ALLOW_REGISTRATION: &str = "allow_registration";
    pub const REQUIRE_EMAIL_VERIFICATION: &str = "require_email_verification";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSettings {
    pub board_name: String,
    pub board_description: String,
    pub allow_registration: bool,
    pub require_email_verification: bool,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            board_name: "Discussion Board".to_string(),
            board_description: String::new(),
            allow_registration: true,
            require_email_verification: false,
        }
    }
}

/// Partial settings update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSettingsInput {
    pub board_name: Option<String>,
    pub board_description: Option<String>,
    pub allow_registration: Option<bool>,
    pub require_email_verification: Option<bool>,
}
