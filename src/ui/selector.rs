//! Category-filtered, searchable single-selection control over the catalog
//! snapshot. The selector never fetches anything: the host hands it the
//! store's snapshot through [`FilterableSelector::refresh`] and receives the
//! chosen code through the callback registered at construction.

use std::sync::Arc;

use crate::models::{CategoryFilter, SearchableEntry};

pub struct FilterableSelector {
    snapshot: Arc<[SearchableEntry]>,
    category: CategoryFilter,
    query: String,
    /// Snapshot indices that pass the category predicate.
    filtered: Vec<usize>,
    /// Subset of `filtered` that also matches the search query. This is what
    /// the list shows and the only set `choose` accepts codes from.
    visible: Vec<usize>,
    selected: usize,
    on_choose: Box<dyn FnMut(&str)>,
}

impl FilterableSelector {
    /// Create an empty selector on the `ALL` category. `on_choose` runs once
    /// per successful choice, synchronously, with the chosen code.
    pub fn new<F>(on_choose: F) -> Self
    where
        F: FnMut(&str) + 'static,
    {
        Self {
            snapshot: Arc::from(Vec::new()),
            category: CategoryFilter::All,
            query: String::new(),
            filtered: Vec::new(),
            visible: Vec::new(),
            selected: 0,
            on_choose: Box::new(on_choose),
        }
    }

    /// Adopt a new snapshot and recompute the view under the current
    /// category and query.
    pub fn refresh(&mut self, snapshot: Arc<[SearchableEntry]>) {
        let previous = self.highlighted_code();
        self.snapshot = snapshot;
        self.recompute(previous);
    }

    /// Switch category and re-filter the snapshot from scratch.
    pub fn set_category(&mut self, category: CategoryFilter) {
        let previous = self.highlighted_code();
        self.category = category;
        self.recompute(previous);
    }

    pub fn category(&self) -> CategoryFilter {
        self.category
    }

    /// Narrow the category view to labels or codes containing `query`,
    /// ignoring case. A blank query shows the whole category view.
    pub fn set_query<S: Into<String>>(&mut self, query: S) {
        let previous = self.highlighted_code();
        self.query = query.into();
        self.apply_query(previous);
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Entries passing the category filter, in snapshot order.
    pub fn filtered(&self) -> impl Iterator<Item = &SearchableEntry> + '_ {
        self.filtered.iter().map(|&index| &self.snapshot[index])
    }

    /// Entries currently offered for selection, in snapshot order.
    pub fn visible(&self) -> impl Iterator<Item = &SearchableEntry> + '_ {
        self.visible.iter().map(|&index| &self.snapshot[index])
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Number of entries in the snapshot the view was computed from.
    pub fn snapshot_len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn highlighted(&self) -> Option<&SearchableEntry> {
        self.visible
            .get(self.selected)
            .map(|&index| &self.snapshot[index])
    }

    pub fn move_selection(&mut self, offset: isize) {
        if self.visible.is_empty() {
            return;
        }
        let len = self.visible.len() as isize;
        let new = (self.selected as isize + offset).clamp(0, len - 1);
        self.selected = new as usize;
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.visible.len().saturating_sub(1);
    }

    /// Report `code` to the host if it is currently visible. Codes that were
    /// filtered out, searched away or never loaded are refused.
    pub fn choose(&mut self, code: &str) -> bool {
        let visible = self
            .visible
            .iter()
            .any(|&index| self.snapshot[index].value == code);
        if visible {
            (self.on_choose)(code);
        }
        visible
    }

    /// Choose the entry under the cursor. Returns false on an empty view.
    pub fn choose_highlighted(&mut self) -> bool {
        let Some(code) = self.highlighted_code() else {
            return false;
        };
        self.choose(&code)
    }

    fn highlighted_code(&self) -> Option<String> {
        self.highlighted().map(|entry| entry.value.clone())
    }

    fn recompute(&mut self, previous: Option<String>) {
        let category = self.category;
        self.filtered = self
            .snapshot
            .iter()
            .enumerate()
            .filter(|(_, entry)| category.matches(entry))
            .map(|(index, _)| index)
            .collect();
        self.apply_query(previous);
    }

    fn apply_query(&mut self, previous: Option<String>) {
        let needle = self.query.trim().to_lowercase();

        self.visible = if needle.is_empty() {
            self.filtered.clone()
        } else {
            self.filtered
                .iter()
                .copied()
                .filter(|&index| {
                    let entry = &self.snapshot[index];
                    entry.label.to_lowercase().contains(&needle)
                        || entry.value.to_lowercase().contains(&needle)
                })
                .collect()
        };

        // Keep the cursor on the same code when it survived the recompute.
        let kept = previous.and_then(|code| {
            self.visible
                .iter()
                .position(|&index| self.snapshot[index].value == code)
        });
        self.selected = match kept {
            Some(position) => position,
            None => self.selected.min(self.visible.len().saturating_sub(1)),
        };
    }
}
