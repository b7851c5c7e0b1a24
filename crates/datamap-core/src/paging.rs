// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Page boundary math.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Rows to read and rows to skip for one page.
///
/// # Example
///
/// ```rust
/// use datamap_core::Pagination;
///
/// let page = Pagination::new(10, 0); // First 10 items
/// let next = Pagination::new(10, 10); // Next 10 items
/// assert_eq!(Pagination::page(1, 10), page);
/// assert_eq!(Pagination::page(2, 10), next);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of rows in the page.
    pub limit: u64,

    /// Number of rows before the page.
    pub offset: u64
}

impl Pagination {
    /// Create new pagination parameters.
    pub const fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit,
            offset
        }
    }

    /// Pagination for page `number` of `per_page` rows.
    ///
    /// Pages are numbered from 1, as in [`pages`]; `0` is read as `1`.
    pub const fn page(number: u64, per_page: u64) -> Self {
        Self {
            limit:  per_page,
            offset: number.saturating_sub(1).saturating_mul(per_page)
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit:  100,
            offset: 0
        }
    }
}

/// Number of pages needed for `total` rows, `0` when `page_size` is `0`.
pub const fn page_count(total: u64, page_size: u64) -> u64 {
    if page_size == 0 { 0 } else { total.div_ceil(page_size) }
}

/// Every page of `total` rows keyed by 1-based page number.
///
/// The last page holds the remainder.
///
/// ```rust
/// use datamap_core::{Pagination, paging::pages};
///
/// let map = pages(7, 3);
/// assert_eq!(map[&3], Pagination::new(1, 6));
/// ```
pub fn pages(total: u64, page_size: u64) -> BTreeMap<u64, Pagination> {
    (0..page_count(total, page_size))
        .map(|index| {
            let offset = index * page_size;
            (index + 1, Pagination::new(page_size.min(total - offset), offset))
        })
        .collect()
}
