//! Pure derived views over a record collection: search filter, page slice and
//! the page summary shown under the grid.

use std::fmt;

use shared::domain::{value_text, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based; stored as given, callers guard the range.
    pub current_page: usize,
    pub page_size: usize,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            current_page: 1,
            page_size: 10,
        }
    }
}

impl PageWindow {
    pub fn total_pages(&self, filtered_len: usize) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        filtered_len.div_ceil(self.page_size)
    }

    /// Index range of the current page, clipped to `len`.
    pub fn range(&self, len: usize) -> std::ops::Range<usize> {
        if self.current_page == 0 || self.page_size == 0 {
            return 0..0;
        }
        let start = (self.current_page - 1)
            .saturating_mul(self.page_size)
            .min(len);
        let end = self.current_page.saturating_mul(self.page_size).min(len);
        start..end
    }
}

/// True when any of `fields` contains `term` case-insensitively.
///
/// An empty term, or no fields, matches everything.
pub fn matches_search(record: &Record, fields: &[String], term: &str) -> bool {
    if term.is_empty() || fields.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    fields.iter().any(|field| {
        record
            .get(field)
            .and_then(value_text)
            .is_some_and(|text| text.to_lowercase().contains(&needle))
    })
}

pub fn filter_records(records: &[Record], fields: &[String], term: &str) -> Vec<Record> {
    records
        .iter()
        .filter(|record| matches_search(record, fields, term))
        .cloned()
        .collect()
}

pub fn paginate(records: &[Record], window: PageWindow) -> Vec<Record> {
    records[window.range(records.len())].to_vec()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSummary {
    /// 1-based index of the first visible record, 0 when nothing matches.
    pub start: usize,
    pub end: usize,
    pub filtered: usize,
    pub total: usize,
    pub current_page: usize,
    pub total_pages: usize,
}

impl PageSummary {
    pub fn new(filtered: usize, total: usize, window: PageWindow) -> Self {
        let start = if filtered > 0 {
            window
                .current_page
                .saturating_sub(1)
                .saturating_mul(window.page_size)
                .saturating_add(1)
        } else {
            0
        };
        let end = start
            .saturating_add(window.page_size)
            .saturating_sub(1)
            .min(filtered);

        Self {
            start,
            end,
            filtered,
            total,
            current_page: window.current_page,
            total_pages: window.total_pages(filtered),
        }
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

impl fmt::Display for PageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Records {} - {} of {}",
            self.start, self.end, self.filtered
        )?;
        if self.filtered != self.total {
            write!(f, " (filtered from {})", self.total)?;
        }
        if self.total_pages > 1 {
            write!(f, " | Page {} of {}", self.current_page, self.total_pages)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
