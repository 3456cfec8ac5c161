//! Client-side filtering and pagination over a loaded collection.

use std::time::{Duration, Instant};

use crate::model::{CollectionKind, Record};

pub const PAGE_SIZE: usize = 10;

/// Input inactivity required before a search term takes effect.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// One page of a filtered collection.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryView<'a> {
    /// Items matching the search term, across all pages.
    pub total_count: usize,
    /// Never less than 1, even for an empty result.
    pub total_pages: usize,
    /// Requested page clamped to `1..=total_pages`.
    pub current_page: usize,
    pub items: Vec<&'a Record>,
}

/// Filter `items` by `search` and cut out the requested page.
///
/// An item matches when its lowercased JSON rendering contains the
/// lowercased term; an empty term matches everything. Pure: the same inputs
/// always give the same view.
pub fn view<'a>(items: &'a [Record], page: usize, search: &str) -> QueryView<'a> {
    let needle = search.trim().to_lowercase();
    let filtered: Vec<&Record> = if needle.is_empty() {
        items.iter().collect()
    } else {
        items
            .iter()
            .filter(|record| record.search_text().contains(&needle))
            .collect()
    };

    let total_count = filtered.len();
    let total_pages = total_count.div_ceil(PAGE_SIZE).max(1);
    let current_page = page.clamp(1, total_pages);
    let items = filtered
        .into_iter()
        .skip((current_page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .collect();

    QueryView {
        total_count,
        total_pages,
        current_page,
        items,
    }
}

/// Holds raw search input until it has been quiet for the debounce delay.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
    applied: String,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            applied: String::new(),
        }
    }

    /// Record a keystroke. Restarts the quiet period.
    pub fn input(&mut self, text: &str, now: Instant) {
        self.pending = Some((text.trim().to_string(), now + self.delay));
    }

    /// Promote pending input once its deadline passed. Returns true when the
    /// effective term changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => {}
            _ => return false,
        }
        let Some((text, _)) = self.pending.take() else {
            return false;
        };
        if text == self.applied {
            return false;
        }
        self.applied = text;
        true
    }

    /// When the pending input will take effect, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// The term currently used for filtering.
    pub fn term(&self) -> &str {
        &self.applied
    }
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

/// Which collection is on screen, which page, and the search term.
#[derive(Debug, Clone)]
pub struct QueryState {
    active: CollectionKind,
    page: usize,
    search: SearchDebouncer,
}

impl QueryState {
    pub fn new(active: CollectionKind) -> Self {
        Self {
            active,
            page: 1,
            search: SearchDebouncer::default(),
        }
    }

    pub fn active(&self) -> CollectionKind {
        self.active
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn search_term(&self) -> &str {
        self.search.term()
    }

    pub fn search_deadline(&self) -> Option<Instant> {
        self.search.deadline()
    }

    /// Switch tabs. Always returns to the first page.
    pub fn select(&mut self, kind: CollectionKind) {
        self.active = kind;
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn next_page(&mut self, total_pages: usize) {
        self.page = (self.page + 1).min(total_pages.max(1));
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    pub fn input_search(&mut self, text: &str, now: Instant) {
        self.search.input(text, now);
    }

    /// Apply debounced search input. A changed term returns to page 1.
    pub fn tick(&mut self, now: Instant) -> bool {
        let changed = self.search.poll(now);
        if changed {
            self.page = 1;
        }
        changed
    }

    /// Evaluate the current query against `items`.
    pub fn view<'a>(&self, items: &'a [Record]) -> QueryView<'a> {
        view(items, self.page, self.search.term())
    }
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(CollectionKind::Users)
    }
}
