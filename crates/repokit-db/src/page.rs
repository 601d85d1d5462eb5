//! Paginated results.

use serde::Serialize;

/// Page size used when a caller asks for zero rows per page.
pub const DEFAULT_PER_PAGE: u64 = 15;

/// One page of results with pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: u64, per_page: u64, current_page: u64) -> Self {
        let last_page = if per_page == 0 {
            1
        } else {
            total.div_ceil(per_page).max(1)
        };
        Self {
            data,
            total,
            per_page,
            current_page,
            last_page,
        }
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            per_page: self.per_page,
            current_page: self.current_page,
            last_page: self.last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_page() {
        assert_eq!(Page::<()>::new(vec![], 0, 15, 1).last_page, 1);
        assert_eq!(Page::<()>::new(vec![], 15, 15, 1).last_page, 1);
        assert_eq!(Page::<()>::new(vec![], 16, 15, 1).last_page, 2);

        let page = Page::new(vec![1, 2], 31, 15, 2);
        assert!(page.has_more_pages());
        assert_eq!(page.map(|n| n * 10).data, vec![10, 20]);
    }
}
