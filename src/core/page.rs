//! Page of results for list views. Pages are numbered from 0.

use serde::Serialize;

/// One page of a list view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Rows on this page
    pub items: Vec<T>,
    /// Zero-based page number
    pub page: u64,
    /// Requested rows per page
    pub page_size: u64,
    /// Rows across all pages
    pub total_items: u64,
    /// Number of pages
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Slices an already-ordered list into the requested page.
    #[must_use]
    pub fn from_vec(items: Vec<T>, page: u64, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        let total_items = items.len() as u64;
        let skip = usize::try_from(page.saturating_mul(page_size)).unwrap_or(usize::MAX);
        let take = usize::try_from(page_size).unwrap_or(usize::MAX);

        Self {
            items: items.into_iter().skip(skip).take(take).collect(),
            page,
            page_size,
            total_items,
            total_pages: total_items.div_ceil(page_size),
        }
    }

    /// Whether a page follows this one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_slices() {
        let page = Page::from_vec((0..40).collect::<Vec<_>>(), 2, 15);
        assert_eq!(page.items, (30..40).collect::<Vec<_>>());
        assert_eq!(page.total_items, 40);
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_next());
    }

    #[test]
    fn test_from_vec_past_end() {
        let page = Page::from_vec(vec![1, 2, 3], 5, 15);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next());
    }

    #[test]
    fn test_last_possible_page_has_no_next() {
        let page = Page::from_vec(vec![1], u64::MAX, 15);
        assert!(page.items.is_empty());
        assert_eq!(page.page, u64::MAX);
        assert!(!page.has_next());
    }

    #[test]
    fn test_zero_page_size_is_treated_as_one() {
        let page = Page::from_vec(vec![1, 2, 3], 0, 0);
        assert_eq!(page.items, vec![1]);
        assert_eq!(page.page_size, 1);
        assert!(page.has_next());
    }
}
