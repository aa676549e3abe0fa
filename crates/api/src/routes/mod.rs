//! HTTP handlers grouped by resource.

pub mod categories;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod system;
pub mod users;

use std::str::FromStr;

use domain::{DEFAULT_PAGE_SIZE, PageRequest, Paged};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Parses a path identifier, rejecting malformed ones as bad requests.
pub(crate) fn parse_id<T>(raw: &str, what: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {what} id: {e}")))
}

/// `?page=&page_size=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl PageParams {
    pub(crate) fn to_request(&self) -> Result<PageRequest, ApiError> {
        page_request(self.page, self.page_size)
    }
}

/// Page 1 and the default size when the client does not say.
pub(crate) fn page_request(
    page: Option<usize>,
    page_size: Option<usize>,
) -> Result<PageRequest, ApiError> {
    Ok(PageRequest::new(
        page.unwrap_or(1),
        page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    )?)
}

/// One page of results with navigation metadata.
#[derive(Debug, Serialize)]
pub struct PagedResponse<T> {
    pub results: Vec<T>,
    pub total: u64,
    pub total_pages: u64,
    pub current_page: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> PagedResponse<T> {
    pub(crate) fn from_paged<U>(paged: Paged<U>, f: impl FnMut(U) -> T) -> Self {
        let total_pages = paged.total_pages();
        let has_next = paged.has_next();
        let has_previous = paged.has_previous();
        let current_page = paged.page;
        let total = paged.total;
        Self {
            results: paged.items.into_iter().map(f).collect(),
            total,
            total_pages,
            current_page,
            has_next,
            has_previous,
        }
    }
}
