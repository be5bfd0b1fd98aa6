use serde::Deserialize;
use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Number of pages needed to show `total_items`, never less than one so an
/// empty collection still renders as "page 1 of 1".
///
/// A `page_size` of zero puts everything on a single page.
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    total_items.div_ceil(page_size).max(1)
}

pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Returns the items of `page` and the page count. Out-of-range pages are
/// clamped to the nearest boundary.
pub fn slice<T>(items: &[T], page: usize, page_size: usize) -> (&[T], usize) {
    let pages = total_pages(items.len(), page_size);
    if page_size == 0 {
        return (items, pages);
    }
    let page = clamp_page(page, pages);
    let start = ((page - 1) * page_size).min(items.len());
    let end = (page * page_size).min(items.len());
    (&items[start..end], pages)
}

/// Page metadata reported by server-paginated endpoints.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PageInfo {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaginationMode {
    /// The full collection is fetched once and sliced locally.
    Client,
    /// Every page is its own request carrying `page` and `limit`.
    Server,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageCursor {
    page: usize,
    page_size: usize,
    total_pages: usize,
}

impl PageCursor {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size,
            total_pages: 1,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn is_first(&self) -> bool {
        self.page == 1
    }

    pub fn is_last(&self) -> bool {
        self.page == self.total_pages
    }

    /// Moves forward one page. No-op on the last page.
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.page += 1;
        true
    }

    /// Moves back one page. No-op on the first page.
    pub fn previous(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.page -= 1;
        true
    }

    pub fn go_to(&mut self, page: usize) -> bool {
        let target = clamp_page(page, self.total_pages);
        let moved = target != self.page;
        self.page = target;
        moved
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    /// Rebounds the cursor after the collection changed size.
    pub fn reclamp(&mut self, total_items: usize) {
        self.set_total_pages(total_pages(total_items, self.page_size));
    }

    pub fn set_total_pages(&mut self, total_pages: usize) {
        self.total_pages = total_pages.max(1);
        self.page = clamp_page(self.page, self.total_pages);
    }

    /// Seeds the cursor from server metadata. A server page outside the
    /// reported range is clamped like any other page.
    pub fn apply_page_info(&mut self, info: &PageInfo) {
        if info.limit > 0 {
            self.page_size = info.limit;
        }
        self.total_pages = info.total_pages.max(1);
        self.page = clamp_page(info.page.max(1), self.total_pages);
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_is_at_least_one() {
        assert_eq!(total_pages(0, 5), 1);
        assert_eq!(total_pages(0, 0), 1);
        assert_eq!(total_pages(7, 0), 1);
    }

    #[test]
    fn total_pages_matches_ceiling_division() {
        for page_size in 1..8usize {
            for n in 0..40usize {
                let expected = std::cmp::max(1, (n + page_size - 1) / page_size);
                assert_eq!(total_pages(n, page_size), expected, "n={n} size={page_size}");
            }
        }
    }

    #[test]
    fn twelve_items_in_pages_of_five() {
        let items: Vec<u32> = (1..=12).collect();
        let (p1, total) = slice(&items, 1, 5);
        assert_eq!(total, 3);
        assert_eq!(p1, &[1, 2, 3, 4, 5]);
        let (p2, _) = slice(&items, 2, 5);
        assert_eq!(p2, &[6, 7, 8, 9, 10]);
        let (p3, _) = slice(&items, 3, 5);
        assert_eq!(p3, &[11, 12]);
    }

    #[test]
    fn out_of_range_pages_clamp_to_boundaries() {
        let items: Vec<u32> = (1..=12).collect();
        let (low, _) = slice(&items, 0, 5);
        assert_eq!(low, &[1, 2, 3, 4, 5]);
        let (high, _) = slice(&items, 99, 5);
        assert_eq!(high, &[11, 12]);
    }

    #[test]
    fn empty_collection_slices_to_empty_first_page() {
        let items: Vec<u32> = Vec::new();
        let (page, total) = slice(&items, 3, 5);
        assert!(page.is_empty());
        assert_eq!(total, 1);
    }

    #[test]
    fn cursor_navigation_is_noop_at_boundaries() {
        let mut cursor = PageCursor::new(5);
        cursor.reclamp(12);
        assert!(!cursor.previous());
        assert_eq!(cursor.page(), 1);
        assert!(cursor.next());
        assert!(cursor.next());
        assert!(!cursor.next());
        assert_eq!(cursor.page(), 3);
        assert!(cursor.previous());
        assert_eq!(cursor.page(), 2);
    }

    #[test]
    fn cursor_reclamps_when_collection_shrinks() {
        let mut cursor = PageCursor::new(5);
        cursor.reclamp(12);
        cursor.go_to(3);
        cursor.reclamp(10);
        assert_eq!(cursor.page(), 2);
        assert_eq!(cursor.total_pages(), 2);
        cursor.reclamp(0);
        assert_eq!(cursor.page(), 1);
    }

    #[test]
    fn cursor_takes_server_page_info() {
        let mut cursor = PageCursor::new(10);
        cursor.apply_page_info(&PageInfo {
            page: 4,
            limit: 20,
            total: 61,
            total_pages: 4,
        });
        assert_eq!(cursor.page(), 4);
        assert_eq!(cursor.page_size(), 20);
        assert!(cursor.is_last());

        cursor.apply_page_info(&PageInfo {
            page: 1,
            limit: 20,
            total: 0,
            total_pages: 0,
        });
        assert_eq!(cursor.total_pages(), 1);
    }
}
