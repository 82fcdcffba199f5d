//! Strict page-number pagination.
//!
//! A requested page outside `1..=num_pages` is an error rather than being
//! clamped. An empty collection still has one (empty) first page.

use std::num::IntErrorKind;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AppError;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PageError {
    #[error("page {requested} is less than 1")]
    BelowFirst { requested: i64 },

    #[error("page {requested} is past the last page ({num_pages})")]
    PastLast { requested: i64, num_pages: usize },
}

impl From<PageError> for AppError {
    fn from(err: PageError) -> Self {
        AppError::page_out_of_range(err.to_string())
    }
}

/// `?page=` query parameter, kept raw so malformed values can fall back to
/// the first page instead of failing extraction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// A page request after parsing the query value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNumber {
    Number(i64),
    Last,
}

impl PageQuery {
    /// Absent or non-integer values select page 1; `last` selects the final
    /// page. Integers too wide for `i64` saturate, so they still fail range
    /// validation instead of falling back to the first page.
    pub fn number(&self) -> PageNumber {
        match self.page.as_deref().map(str::trim) {
            Some("last") => PageNumber::Last,
            Some(raw) => match raw.parse::<i64>() {
                Ok(number) => PageNumber::Number(number),
                Err(err) => match err.kind() {
                    IntErrorKind::PosOverflow => PageNumber::Number(i64::MAX),
                    IntErrorKind::NegOverflow => PageNumber::Number(i64::MIN),
                    _ => PageNumber::Number(1),
                },
            },
            None => PageNumber::Number(1),
        }
    }
}

/// Page metadata returned alongside every paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub per_page: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<usize>,
    pub next_page_number: Option<usize>,
    /// 1-based index of the first item on the page, 0 when empty
    pub start_index: usize,
    /// 1-based index of the last item on the page, 0 when empty
    pub end_index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: usize,
    per_page: usize,
}

impl Paginator {
    /// `per_page` of zero is treated as one.
    pub fn new(count: usize, per_page: usize) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    pub fn num_pages(&self) -> usize {
        self.count.div_ceil(self.per_page).max(1)
    }

    /// Resolve `number` to a concrete, in-range page.
    pub fn validate(&self, number: PageNumber) -> Result<usize, PageError> {
        let num_pages = self.num_pages();
        match number {
            PageNumber::Last => Ok(num_pages),
            PageNumber::Number(requested) if requested < 1 => {
                Err(PageError::BelowFirst { requested })
            }
            PageNumber::Number(requested) => match usize::try_from(requested) {
                Ok(page) if page <= num_pages => Ok(page),
                _ => Err(PageError::PastLast {
                    requested,
                    num_pages,
                }),
            },
        }
    }

    /// Metadata for an already validated page number.
    pub fn meta(&self, number: usize) -> PageMeta {
        let num_pages = self.num_pages();
        let offset = (number - 1) * self.per_page;
        let end = (offset + self.per_page).min(self.count);
        let len = end.saturating_sub(offset);

        PageMeta {
            number,
            num_pages,
            count: self.count,
            per_page: self.per_page,
            has_previous: number > 1,
            has_next: number < num_pages,
            previous_page_number: (number > 1).then(|| number - 1),
            next_page_number: (number < num_pages).then(|| number + 1),
            start_index: if len == 0 { 0 } else { offset + 1 },
            end_index: if len == 0 { 0 } else { offset + len },
        }
    }

    /// Slice `items` (which must hold exactly `count` elements, already in
    /// display order) down to the requested page.
    pub fn paginate<T>(&self, items: Vec<T>, number: PageNumber) -> Result<Page<T>, PageError> {
        debug_assert_eq!(items.len(), self.count);

        let number = self.validate(number)?;
        let meta = self.meta(number);
        let offset = (number - 1) * self.per_page;
        let items = items.into_iter().skip(offset).take(self.per_page).collect();

        Ok(Page { items, meta })
    }
}
