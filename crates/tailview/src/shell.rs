#![forbid(unsafe_code)]

//! Bounded log buffer with filter and search, feeding a [`VirtualLogList`].
//!
//! [`TailBuffer`] is the embedding shell around the renderer: it owns the
//! items, stamps them with session-scoped ids, caps retention, and exposes
//! the filtered view the list renders. Navigation methods return positions
//! in that view; the host passes them to
//! [`VirtualLogList::scroll_to_index`].
//!
//! # Retention
//! When a push takes the buffer past `max_items`, the oldest items are
//! evicted in one batch down to `max_items`. Filter and search indices are
//! shifted in place rather than rebuilt.
//!
//! [`VirtualLogList`]: crate::list::VirtualLogList
//! [`VirtualLogList::scroll_to_index`]: crate::list::VirtualLogList::scroll_to_index

use std::collections::VecDeque;

use crate::item::{IdSource, ItemId, LogItem, LogLevel, SessionIds};

/// Substring matcher shared by filter and search.
#[derive(Debug, Clone)]
struct Matcher {
    pattern: String,
    folded: String,
    case_sensitive: bool,
}

impl Matcher {
    fn new(pattern: &str, case_sensitive: bool) -> Self {
        Self {
            pattern: pattern.to_string(),
            folded: pattern.to_lowercase(),
            case_sensitive,
        }
    }

    fn matches(&self, text: &str) -> bool {
        if self.case_sensitive {
            text.contains(self.pattern.as_str())
        } else {
            text.to_lowercase().contains(self.folded.as_str())
        }
    }
}

#[derive(Debug, Clone)]
struct SearchState {
    matcher: Matcher,
    /// Buffer indices of matching visible items, ascending.
    matches: Vec<usize>,
    current: usize,
}

/// Retained log items plus the view state layered on them.
#[derive(Debug, Clone)]
pub struct TailBuffer {
    items: VecDeque<LogItem>,
    max_items: usize,
    ids: SessionIds,
    case_sensitive: bool,
    filter: Option<Matcher>,
    /// Buffer indices passing the filter (None = show all).
    filtered: Option<Vec<usize>>,
    search: Option<SearchState>,
    evicted: u64,
}

impl TailBuffer {
    /// Create a buffer retaining at most `max_items` (at least 1).
    #[must_use]
    pub fn new(max_items: usize) -> Self {
        Self::with_ids(max_items, SessionIds::new())
    }

    /// Create a buffer drawing ids from `ids`.
    #[must_use]
    pub fn with_ids(max_items: usize, ids: SessionIds) -> Self {
        Self {
            items: VecDeque::new(),
            max_items: max_items.max(1),
            ids,
            case_sensitive: false,
            filter: None,
            filtered: None,
            search: None,
            evicted: 0,
        }
    }

    #[must_use]
    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Total items retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items dropped by the retention cap since creation.
    #[must_use]
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Append a line. The level is sniffed from the text.
    pub fn push(&mut self, content: impl Into<String>) -> ItemId {
        let content = content.into();
        let level = LogLevel::sniff(&content);
        let mut item = LogItem::new(ItemId::new(0, 0), content);
        item.level = level;
        self.push_item(item)
    }

    /// Append an item. Its id is replaced with one from this buffer's session.
    pub fn push_item(&mut self, mut item: LogItem) -> ItemId {
        item.id = self.ids.next_id();
        let id = item.id;
        let index = self.items.len();

        let visible = self
            .filter
            .as_ref()
            .is_none_or(|filter| filter.matches(&item.content));
        if visible {
            if let Some(filtered) = self.filtered.as_mut() {
                filtered.push(index);
            }
            if let Some(search) = self.search.as_mut()
                && search.matcher.matches(&item.content)
            {
                search.matches.push(index);
            }
        }

        self.items.push_back(item);
        if self.items.len() > self.max_items {
            self.evict_front(self.items.len() - self.max_items);
        }
        id
    }

    /// Append several lines.
    pub fn push_many<S: Into<String>>(&mut self, lines: impl IntoIterator<Item = S>) {
        for line in lines {
            self.push(line);
        }
    }

    /// Drop every item; filter and search patterns stay active.
    pub fn clear(&mut self) {
        self.items.clear();
        if let Some(filtered) = self.filtered.as_mut() {
            filtered.clear();
        }
        if let Some(search) = self.search.as_mut() {
            search.matches.clear();
            search.current = 0;
        }
    }

    /// Item by buffer index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&LogItem> {
        self.items.get(index)
    }

    /// Number of items in the filtered view.
    #[must_use]
    pub fn visible_len(&self) -> usize {
        self.filtered
            .as_ref()
            .map_or(self.items.len(), |filtered| filtered.len())
    }

    /// Item by position in the filtered view.
    #[must_use]
    pub fn visible(&self, position: usize) -> Option<&LogItem> {
        match self.filtered.as_ref() {
            Some(filtered) => self.items.get(*filtered.get(position)?),
            None => self.items.get(position),
        }
    }

    /// The filtered view, in order.
    #[must_use]
    pub fn visible_items(&self) -> Vec<&LogItem> {
        match self.filtered.as_ref() {
            Some(filtered) => filtered.iter().filter_map(|&i| self.items.get(i)).collect(),
            None => self.items.iter().collect(),
        }
    }

    /// Ids of the filtered view, in order.
    pub fn visible_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.visible_items().into_iter().map(|item| item.id)
    }

    /// Active filter pattern.
    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_ref().map(|filter| filter.pattern.as_str())
    }

    #[must_use]
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Show only items containing `pattern`. `None` or empty clears it.
    pub fn set_filter(&mut self, pattern: Option<&str>) {
        self.filter = pattern
            .filter(|pat| !pat.is_empty())
            .map(|pat| Matcher::new(pat, self.case_sensitive));
        self.rebuild_filter();
        self.rebuild_search();
    }

    /// Switch case sensitivity for both filter and search.
    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        if self.case_sensitive == case_sensitive {
            return;
        }
        self.case_sensitive = case_sensitive;
        if let Some(filter) = self.filter.as_mut() {
            *filter = Matcher::new(&filter.pattern, case_sensitive);
        }
        if let Some(search) = self.search.as_mut() {
            search.matcher = Matcher::new(&search.matcher.pattern, case_sensitive);
        }
        self.rebuild_filter();
        self.rebuild_search();
    }

    /// Search the filtered view for `query`; returns the match count.
    ///
    /// The current match is reset to the first one.
    pub fn search(&mut self, query: &str) -> usize {
        if query.is_empty() {
            self.search = None;
            return 0;
        }
        self.search = Some(SearchState {
            matcher: Matcher::new(query, self.case_sensitive),
            matches: Vec::new(),
            current: 0,
        });
        self.rebuild_search();
        self.search.as_ref().map_or(0, |search| search.matches.len())
    }

    /// View position of the current match.
    #[must_use]
    pub fn current_match(&self) -> Option<usize> {
        let search = self.search.as_ref()?;
        let index = *search.matches.get(search.current)?;
        self.view_position(index)
    }

    /// Advance to the next match (wrapping). Returns its view position.
    pub fn next_match(&mut self) -> Option<usize> {
        let search = self.search.as_mut()?;
        if search.matches.is_empty() {
            return None;
        }
        search.current = (search.current + 1) % search.matches.len();
        self.current_match()
    }

    /// Step back to the previous match (wrapping). Returns its view position.
    pub fn prev_match(&mut self) -> Option<usize> {
        let search = self.search.as_mut()?;
        if search.matches.is_empty() {
            return None;
        }
        search.current = search
            .current
            .checked_sub(1)
            .unwrap_or(search.matches.len() - 1);
        self.current_match()
    }

    /// Clear active search.
    pub fn clear_search(&mut self) {
        self.search = None;
    }

    /// Get current search match info: (current_match_1indexed, total_matches).
    #[must_use]
    pub fn search_info(&self) -> Option<(usize, usize)> {
        self.search.as_ref().and_then(|search| {
            if search.matches.is_empty() {
                None
            } else {
                Some((search.current + 1, search.matches.len()))
            }
        })
    }

    fn view_position(&self, index: usize) -> Option<usize> {
        match self.filtered.as_ref() {
            Some(filtered) => filtered.binary_search(&index).ok(),
            None => (index < self.items.len()).then_some(index),
        }
    }

    fn evict_front(&mut self, count: usize) {
        self.items.drain(..count);
        self.evicted += count as u64;

        let shift = |indices: &mut Vec<usize>| {
            indices.retain_mut(|idx| {
                if *idx < count {
                    false
                } else {
                    *idx -= count;
                    true
                }
            });
        };
        if let Some(filtered) = self.filtered.as_mut() {
            shift(filtered);
        }
        if let Some(search) = self.search.as_mut() {
            let before = search.matches.len();
            shift(&mut search.matches);
            let dropped = before - search.matches.len();
            search.current = search.current.saturating_sub(dropped);
            if !search.matches.is_empty() {
                search.current = search.current.min(search.matches.len() - 1);
            }
        }
    }

    fn rebuild_filter(&mut self) {
        self.filtered = self.filter.as_ref().map(|filter| {
            self.items
                .iter()
                .enumerate()
                .filter(|(_, item)| filter.matches(&item.content))
                .map(|(index, _)| index)
                .collect()
        });
    }

    fn rebuild_search(&mut self) {
        let Some(mut search) = self.search.take() else {
            return;
        };
        search.matches = match self.filtered.as_ref() {
            Some(filtered) => filtered
                .iter()
                .copied()
                .filter(|&i| search.matcher.matches(&self.items[i].content))
                .collect(),
            None => self
                .items
                .iter()
                .enumerate()
                .filter(|(_, item)| search.matcher.matches(&item.content))
                .map(|(index, _)| index)
                .collect(),
        };
        search.current = 0;
        self.search = Some(search);
    }
}
