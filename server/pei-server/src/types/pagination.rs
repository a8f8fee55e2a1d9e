//! Pagination parameters shared by all list endpoints.

use serde::Deserialize;

/// Standard pagination query parameters.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PaginationParams {
    /// Page number (defaults to 1, minimum 1).
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size (defaults to 20, clamped between 1 and 100).
    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(20).clamp(1, 100)
    }

    /// Zero-based element offset of the requested page.
    pub fn offset(&self) -> usize {
        ((self.page() - 1) as usize) * self.page_size() as usize
    }
}
