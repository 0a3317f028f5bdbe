use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use thiserror::Error;
use tracing::trace;

/// Page sizes offered by the size selector.
pub const PAGE_SIZE_OPTIONS: [usize; 3] = [5, 10, 20];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported page size {0}; choose one of 5, 10, 20")]
pub struct PageSizeError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageSize(usize);

impl PageSize {
    pub const DEFAULT: PageSize = PageSize(10);

    pub fn get(self) -> usize {
        self.0
    }

    pub fn options() -> impl Iterator<Item = PageSize> {
        PAGE_SIZE_OPTIONS.into_iter().map(PageSize)
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<usize> for PageSize {
    type Error = PageSizeError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if PAGE_SIZE_OPTIONS.contains(&value) {
            Ok(Self(value))
        } else {
            Err(PageSizeError(value.to_string()))
        }
    }
}

impl FromStr for PageSize {
    type Err = PageSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: usize = s.trim().parse().map_err(|_| PageSizeError(s.to_string()))?;
        Self::try_from(value)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNav {
    First,
    Previous,
    Next,
    Last,
}

/// `max(1, ceil(count / size))`; an empty view still has one (empty) page.
pub fn total_pages(count: usize, size: PageSize) -> usize {
    count.div_ceil(size.get()).max(1)
}

/// Current 1-based page over a filtered view whose length is passed in on
/// every call, so bounds always follow the latest filter result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    size: PageSize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(PageSize::DEFAULT)
    }
}

impl Pager {
    pub fn new(size: PageSize) -> Self {
        Self { page: 1, size }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn size(&self) -> PageSize {
        self.size
    }

    pub fn total_pages(&self, count: usize) -> usize {
        total_pages(count, self.size)
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn clamp(&mut self, count: usize) {
        self.page = self.page.clamp(1, self.total_pages(count));
    }

    /// Jumps to `page`, clamped into range.
    pub fn go_to(&mut self, page: usize, count: usize) {
        self.page = page.clamp(1, self.total_pages(count));
    }

    /// Boundary moves are no-ops. Returns whether the page changed.
    pub fn navigate(&mut self, nav: PageNav, count: usize) -> bool {
        let last = self.total_pages(count);
        let before = self.page;
        self.page = match nav {
            PageNav::First => 1,
            PageNav::Previous => self.page.saturating_sub(1).max(1),
            PageNav::Next => (self.page + 1).min(last),
            PageNav::Last => last,
        };
        trace!(?nav, from = before, to = self.page, total_pages = last, "navigated");
        self.page != before
    }

    pub fn set_size(&mut self, size: PageSize, count: usize) {
        self.size = size;
        self.clamp(count);
    }

    /// Index range of the current page; empty when the page lies past the end.
    pub fn bounds(&self, count: usize) -> Range<usize> {
        let size = self.size.get();
        let start = (self.page - 1).saturating_mul(size);
        let end = start.saturating_add(size);
        start.min(count)..end.min(count)
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.bounds(items.len())]
    }

    pub fn is_first(&self) -> bool {
        self.page == 1
    }

    pub fn is_last(&self, count: usize) -> bool {
        self.page >= self.total_pages(count)
    }
}
