//! Page-number pagination over an already ordered sequence.

use std::num::NonZeroUsize;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A requested page number as parsed from the query string.
///
/// Missing or non-numeric input means page 1. Numeric input is kept as-is and
/// clamped against the actual page count by [`paginate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNumber(i64);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(1);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn from_query(raw: Option<&str>) -> Self {
        let Some(value) = raw.map(str::trim) else {
            return Self::FIRST;
        };
        if let Ok(number) = value.parse::<i64>() {
            return Self(number);
        }

        // Digits that overflow still name a page past the end.
        let (negative, digits) = match value.as_bytes().first() {
            Some(b'-') => (true, &value[1..]),
            Some(b'+') => (false, &value[1..]),
            _ => (false, value),
        };
        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return Self::FIRST;
        }
        if negative { Self::FIRST } else { Self(i64::MAX) }
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

/// One page of an ordered sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    items: Vec<T>,
    number: usize,
    total_items: usize,
    total_pages: usize,
}

impl<T> Page<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// The 1-based number of this page after clamping.
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_number(&self) -> Option<usize> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn previous_number(&self) -> Option<usize> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

/// Slice `items` into pages of `page_size` and return the requested one.
///
/// An empty sequence still has a single, empty first page.
pub fn paginate<T: Clone>(items: &[T], page_size: NonZeroUsize, requested: PageNumber) -> Page<T> {
    let size = page_size.get();
    let total_items = items.len();
    let total_pages = total_items.div_ceil(size).max(1);

    let number = if requested.get() < 1 {
        1
    } else {
        usize::try_from(requested.get())
            .unwrap_or(usize::MAX)
            .min(total_pages)
    };

    let start = (number - 1) * size;
    let end = (start + size).min(total_items);
    let page_items = items.get(start..end).map(<[T]>::to_vec).unwrap_or_default();

    Page {
        items: page_items,
        number,
        total_items,
        total_pages,
    }
}

/// Fixed-size paginator used by the feed pages.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: NonZeroUsize,
}

impl Paginator {
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self { page_size }
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    pub fn paginate<T: Clone>(&self, items: &[T], requested: PageNumber) -> Page<T> {
        paginate(items, self.page_size, requested)
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroUsize::MIN))
    }
}
