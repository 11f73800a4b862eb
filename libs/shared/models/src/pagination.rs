use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;

/// `?page=&page_size=` query parameters, 1-based.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageRequest {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Saturates for absurd page numbers; such a page is simply empty.
    pub fn offset(&self) -> u32 {
        (self.page() - 1).saturating_mul(self.page_size())
    }

    /// PostgREST `limit`/`offset` pair. One extra row is requested so the
    /// caller can tell whether another page exists without a count query.
    pub fn to_query(&self) -> String {
        format!("limit={}&offset={}", self.page_size() + 1, self.offset())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Build a page from rows fetched with [`PageRequest::to_query`].
    pub fn from_overfetch(mut rows: Vec<T>, request: &PageRequest) -> Self {
        let page_size = request.page_size();
        let has_more = rows.len() > page_size as usize;
        rows.truncate(page_size as usize);

        Self {
            results: rows,
            page: request.page(),
            page_size,
            has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_caps() {
        let req = PageRequest::default();
        assert_eq!((req.page(), req.page_size(), req.offset()), (1, 10, 0));

        let req = PageRequest { page: Some(3), page_size: Some(500) };
        assert_eq!(req.page_size(), MAX_PAGE_SIZE);
        assert_eq!(req.offset(), 100);
        assert_eq!(req.to_query(), "limit=51&offset=100");

        let req = PageRequest { page: Some(0), page_size: Some(0) };
        assert_eq!((req.page(), req.page_size()), (1, 1));
    }

    #[test]
    fn huge_page_number_does_not_overflow() {
        let req = PageRequest { page: Some(u32::MAX), page_size: None };
        assert_eq!(req.offset(), u32::MAX);
        assert_eq!(req.to_query(), format!("limit=11&offset={}", u32::MAX));

        let req = PageRequest { page: Some(u32::MAX), page_size: Some(MAX_PAGE_SIZE) };
        assert_eq!(req.offset(), u32::MAX);
    }

    #[test]
    fn overfetch_detects_next_page() {
        let req = PageRequest { page: Some(1), page_size: Some(2) };
        let page = Page::from_overfetch(vec![1, 2, 3], &req);
        assert!(page.has_more);
        assert_eq!(page.results, vec![1, 2]);

        let page = Page::from_overfetch(vec![1], &req);
        assert!(!page.has_more);
    }
}
