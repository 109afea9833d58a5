//! Pagination Engine
//!
//! A page is a window over one capped scan, not a stable cursor. `total`
//! counts the pairs that scan saw; when the scan fills its cap there may be
//! more, and the page says so through `total_is_estimate`.

use crate::error::{ConsoleError, Result};
use crate::model::{Mode, Page};

use super::{Context, RangeScanner};

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: usize = 100;

pub struct Paginator {
    scanner: RangeScanner,
    scan_cap: usize,
}

impl Paginator {
    pub fn new(ctx: Context) -> Self {
        let scan_cap = ctx.limits().scan_cap;
        Self {
            scanner: RangeScanner::new(ctx),
            scan_cap,
        }
    }

    /// Page `page` (1-based) of `page_size` managed pairs under `prefix`
    pub fn page(&self, mode: Mode, prefix: &[u8], page: usize, page_size: usize) -> Result<Page> {
        if page == 0 {
            return Err(ConsoleError::Validation("page must be >= 1".to_string()));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConsoleError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let offset = (page - 1).saturating_mul(page_size);
        let limit = offset.saturating_add(page_size).min(self.scan_cap);
        let scanned = self.scanner.scan(mode, prefix, limit)?;

        let total = scanned.len();
        let start = offset.min(total);
        let end = offset.saturating_add(page_size).min(total);
        let items = scanned[start..end].to_vec();

        Ok(Page {
            items,
            total,
            page,
            limit: page_size,
            total_pages: (total + page_size - 1) / page_size,
            total_is_estimate: total >= limit,
        })
    }
}
