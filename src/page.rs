//! Paging request/response carrier.

use crate::config::PagingConfig;
use serde::{Deserialize, Serialize};

/// Ascending order keyword accepted in `order_by` terms.
pub const ASC: &str = "asc";
/// Descending order keyword accepted in `order_by` terms.
pub const DESC: &str = "desc";
/// Direction applied to an `order_by` term that names no direction.
///
/// Note this is `desc`, not the usual `asc`: `"created"` sorts newest first.
pub const DEFAULT_ORDER_DIRECTION: &str = DESC;

/// Paging inputs and, after a `find_page*` call, paging outputs.
///
/// `page_no` is 1-based. `order_by` is a comma-separated list of `field [asc|desc]` terms
/// where `field` is a root property or `alias.property`; it is honoured on the structured
/// query path only. When `auto_count` is set the engine fills `total_count`.
///
/// ```
/// use lifeguard_dao::PageRequest;
///
/// let page: PageRequest<()> = PageRequest::new(3, 10).order_by("profile.city asc, id");
/// assert_eq!(page.first(), 21);
/// assert!(page.is_order_by_set());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest<T> {
    page_no: u64,
    page_size: usize,
    #[serde(default)]
    order_by: Option<String>,
    #[serde(default = "default_auto_count")]
    auto_count: bool,
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default = "Vec::new")]
    result: Vec<T>,
}

fn default_auto_count() -> bool {
    true
}

impl<T> Default for PageRequest<T> {
    fn default() -> Self {
        Self {
            page_no: 1,
            page_size: 0,
            order_by: None,
            auto_count: true,
            total_count: None,
            result: Vec::new(),
        }
    }
}

impl<T> PageRequest<T> {
    /// A request for page `page_no` (clamped to 1) of `page_size` rows.
    pub fn new(page_no: u64, page_size: usize) -> Self {
        Self {
            page_no: page_no.max(1),
            page_size,
            ..Self::default()
        }
    }

    /// First page sized and counted according to the loaded paging settings.
    pub fn from_config(config: &PagingConfig) -> Self {
        Self::new(1, config.default_page_size).auto_count(config.auto_count)
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn auto_count(mut self, auto_count: bool) -> Self {
        self.auto_count = auto_count;
        self
    }

    pub fn page_no(&self) -> u64 {
        self.page_no
    }

    pub fn set_page_no(&mut self, page_no: u64) {
        self.page_no = page_no.max(1);
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
    }

    /// 1-based index of the first row of this page, saturating at `u64::MAX`.
    pub fn first(&self) -> u64 {
        self.offset().map_or(u64::MAX, |offset| offset.saturating_add(1))
    }

    /// 0-based index of the first row of this page, `None` if it does not fit in a `u64`.
    pub fn offset(&self) -> Option<u64> {
        self.page_no
            .saturating_sub(1)
            .checked_mul(self.page_size as u64)
    }

    pub fn order_by_expr(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    pub fn is_order_by_set(&self) -> bool {
        self.order_by
            .as_deref()
            .is_some_and(|o| !o.trim().is_empty())
    }

    pub fn is_auto_count(&self) -> bool {
        self.auto_count
    }

    /// Total number of matching rows; `None` until an auto-counted page has been fetched.
    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    pub fn set_total_count(&mut self, total_count: u64) {
        self.total_count = Some(total_count);
    }

    pub fn result(&self) -> &[T] {
        &self.result
    }

    pub fn set_result(&mut self, result: Vec<T>) {
        self.result = result;
    }

    pub fn into_result(self) -> Vec<T> {
        self.result
    }

    /// Number of pages, known once the total count is.
    pub fn total_pages(&self) -> Option<u64> {
        let total = self.total_count?;
        if self.page_size == 0 {
            return None;
        }
        Some(total.div_ceil(self.page_size as u64))
    }

    pub fn has_next(&self) -> bool {
        self.total_pages().is_some_and(|pages| self.page_no < pages)
    }

    pub fn next_page(&self) -> u64 {
        if self.has_next() {
            self.page_no + 1
        } else {
            self.page_no
        }
    }

    pub fn has_pre(&self) -> bool {
        self.page_no > 1
    }

    pub fn pre_page(&self) -> u64 {
        if self.has_pre() {
            self.page_no - 1
        } else {
            self.page_no
        }
    }
}
