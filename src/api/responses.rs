//! Shared API response types
//!
//! Common response structures used across endpoints so list and status
//! payloads look the same everywhere.

use serde::Serialize;

use crate::models::PagedResult;

/// Paginated list response
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> From<PagedResult<T>> for PageResponse<T> {
    fn from(result: PagedResult<T>) -> Self {
        let total_pages = result.total_pages();
        Self {
            items: result.items,
            total: result.total,
            page: result.page,
            per_page: result.per_page,
            total_pages,
        }
    }
}

/// Plain acknowledgement for actions with nothing else to return
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Single counter, e.g. unread notifications
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}
