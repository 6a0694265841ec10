//! Page window arithmetic shared by every list query.

use serde::Serialize;

/// A validated page window, computed eagerly from a page request.
///
/// `begin` is the row offset; `end` is the exclusive upper row bound clamped
/// to `total`. A request before page 1 or starting past the last row is
/// reported through `is_valid` rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pager {
    pub current: i64,
    pub size: i64,
    pub total: i64,
    pub pages: i64,
    pub page_slice: Vec<i64>,
    pub begin: i64,
    pub end: i64,
    pub prev: i64,
    pub next: i64,
    pub is_prev: bool,
    pub is_next: bool,
    pub is_valid: bool,
}

impl Pager {
    /// Compute the window for `page` of `size` rows over `total` rows.
    ///
    /// # Panics
    ///
    /// A non-positive `size` is a programming error and panics.
    pub fn compute(page: i64, size: i64, total: i64) -> Self {
        assert!(size > 0, "pager size must be positive, got {}", size);

        let pages = if total <= 0 { 1 } else { (total - 1) / size + 1 };

        // `page` is caller input; extreme values must yield an invalid window
        let begin = page.saturating_sub(1).saturating_mul(size);
        let is_valid = page >= 1 && begin <= total;
        let end = page.saturating_mul(size).min(total);

        Self {
            current: page,
            size,
            total,
            pages,
            page_slice: (1..=pages).collect(),
            begin,
            end,
            prev: page.saturating_sub(1).max(1),
            next: page.saturating_add(1).min(pages),
            is_prev: page > 1,
            is_next: page < pages,
            is_valid,
        }
    }

    /// Row offset for a LIMIT/OFFSET query.
    pub fn offset(&self) -> i64 {
        self.begin.max(0)
    }

    /// Row limit for a LIMIT/OFFSET query.
    pub fn limit(&self) -> i64 {
        self.size
    }
}
