//! Page-number pagination.

use crate::{DomainError, Result};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// A validated page request. Pages are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    /// Builds a request, clamping `page_size` into `1..=100`.
    ///
    /// Pages whose offset would not fit a signed 64-bit SQL `OFFSET` are
    /// refused.
    pub fn new(page: usize, page_size: usize) -> Result<Self> {
        if page == 0 {
            return Err(DomainError::validation("page must be at least 1"));
        }
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let in_range = (page as u64 - 1)
            .checked_mul(page_size as u64)
            .is_some_and(|offset| offset <= i64::MAX as u64);
        if !in_range {
            return Err(DomainError::validation("page is out of range"));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results with navigation metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: usize,
    pub page_size: usize,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page(),
            page_size: request.page_size(),
        }
    }

    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.page_size as u64)
    }

    pub fn has_next(&self) -> bool {
        (self.page as u64) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(PageRequest::new(1, 500).unwrap().page_size(), 100);
        assert_eq!(PageRequest::new(1, 0).unwrap().page_size(), 1);
        assert!(PageRequest::new(0, 10).is_err());
    }

    #[test]
    fn huge_page_is_a_validation_error() {
        let err = PageRequest::new(usize::MAX, 20).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);

        let last = (i64::MAX as u64 / 20 + 1) as usize;
        let request = PageRequest::new(last, 20).unwrap();
        assert!(request.offset() as u64 <= i64::MAX as u64);
    }

    #[test]
    fn navigation_metadata() {
        let request = PageRequest::new(2, 10).unwrap();
        assert_eq!(request.offset(), 10);

        let page: Paged<u8> = Paged::new(vec![0; 10], 25, request);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(page.has_previous());

        let last: Paged<u8> = Paged::new(vec![0; 5], 25, PageRequest::new(3, 10).unwrap());
        assert!(!last.has_next());

        let empty: Paged<u8> = Paged::new(Vec::new(), 0, PageRequest::default());
        assert_eq!(empty.total_pages(), 0);
        assert!(!empty.has_next());
        assert!(!empty.has_previous());
    }
}
