//! Common API utilities and shared types
//!
//! This module contains shared utilities used across multiple API endpoints.

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size
pub fn default_per_page() -> u32 {
    20
}

/// Treat `?q=` the same as leaving the parameter out
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListParams;

    #[test]
    fn test_default_paging_matches_list_params() {
        let params = ListParams::new(default_page(), default_per_page());
        assert_eq!(params, ListParams::default());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  rust ".into())), Some("rust".into()));
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(None), None);
    }
}
