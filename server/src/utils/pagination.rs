//! Page-number pagination for list endpoints.
//!
//! `?page=2&page_size=15` selects the second page of fifteen rows. Page size
//! defaults to 10 and is capped at 20; a bad `page_size` silently falls back
//! to the default while a bad or out-of-range `page` answers 404.
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::store::PageWindow;
use crate::utils::error::AppError;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 20;

const INVALID_PAGE: &str = "Invalid page.";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number.
    #[param(value_type = Option<u64>)]
    pub page: Option<String>,
    /// Rows per page, at most 20.
    #[param(value_type = Option<u64>)]
    pub page_size: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginationMeta {
    /// Total number of matching rows.
    pub count: u64,
    pub page: u64,
    pub page_size: u64,
    /// Link to the next page, or null on the last page.
    pub next: Option<String>,
    /// Link to the previous page, or null on the first page.
    pub previous: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
    /// Whether the client asked for a page size; only then is it echoed into links.
    explicit_page_size: bool,
}

impl Pagination {
    pub fn from_query(query: &PageQuery) -> Result<Self, AppError> {
        let page = match query.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => match raw.parse::<u64>() {
                Ok(page) if page >= 1 => page,
                _ => return Err(AppError::NotFound(INVALID_PAGE.to_string())),
            },
        };

        let requested_size = query
            .page_size
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|size| *size >= 1);

        Ok(Self {
            page,
            page_size: requested_size
                .map(|size| size.min(MAX_PAGE_SIZE))
                .unwrap_or(DEFAULT_PAGE_SIZE),
            explicit_page_size: requested_size.is_some(),
        })
    }

    pub fn window(&self) -> PageWindow {
        PageWindow {
            offset: (self.page - 1).saturating_mul(self.page_size),
            limit: self.page_size,
        }
    }

    /// Rejects pages past the end. The first page is always valid, even when empty.
    pub fn ensure_in_range(&self, total: u64) -> Result<(), AppError> {
        if self.page > 1 && self.window().offset >= total {
            return Err(AppError::NotFound(INVALID_PAGE.to_string()));
        }
        Ok(())
    }

    pub fn meta(&self, path: &str, total: u64) -> PaginationMeta {
        let has_next = self.page.saturating_mul(self.page_size) < total;
        PaginationMeta {
            count: total,
            page: self.page,
            page_size: self.page_size,
            next: has_next.then(|| self.link(path, Some(self.page + 1))),
            previous: (self.page > 1).then(|| {
                let previous = self.page - 1;
                self.link(path, (previous > 1).then_some(previous))
            }),
        }
    }

    fn link(&self, path: &str, page: Option<u64>) -> String {
        let mut params = Vec::new();
        if let Some(page) = page {
            params.push(format!("page={page}"));
        }
        if self.explicit_page_size {
            params.push(format!("page_size={}", self.page_size));
        }
        if params.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{}", params.join("&"))
        }
    }
}
