#![forbid(unsafe_code)]

//! Terminal row measurement for log content.
//!
//! In a terminal the laid-out height of an item is the number of rows its
//! text occupies at the current width. [`RowMeasurer`] computes that count
//! (and the row slices themselves, for drawing) with:
//! - Grapheme cluster boundaries (never split emoji, ZWJ sequences, etc.)
//! - Cell widths (CJK characters are 2 cells wide)
//! - Word boundaries when possible, falling back to grapheme breaks for
//!   words wider than the row
//!
//! # Example
//! ```
//! use tailview::measure::{RowMeasurer, WrapMode};
//!
//! let measurer = RowMeasurer::new(10).with_wrap(WrapMode::Word);
//! assert_eq!(measurer.wrap("Hello world foo bar"), vec!["Hello", "world foo", "bar"]);
//! assert_eq!(measurer.rows("one\ntwo"), 2);
//! ```

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Row wrapping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// No wrapping; each source line is one row.
    None,
    /// Wrap at grapheme boundaries.
    Char,
    /// Wrap at word boundaries, breaking over-long words by grapheme.
    #[default]
    Word,
}

/// Counts and slices the terminal rows of a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowMeasurer {
    /// Total width in cells. 0 disables wrapping.
    pub width: usize,
    pub wrap: WrapMode,
    /// Cells reserved on the left of every row (level tag, line numbers).
    pub gutter: usize,
}

impl RowMeasurer {
    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            width,
            wrap: WrapMode::Word,
            gutter: 0,
        }
    }

    #[must_use]
    pub fn with_wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap = wrap;
        self
    }

    #[must_use]
    pub fn with_gutter(mut self, gutter: usize) -> Self {
        self.gutter = gutter;
        self
    }

    /// Cells available for text on each row, `None` when unbounded.
    #[must_use]
    pub fn text_width(&self) -> Option<usize> {
        if self.width == 0 || self.wrap == WrapMode::None {
            None
        } else {
            Some(self.width.saturating_sub(self.gutter).max(1))
        }
    }

    /// Number of rows `content` occupies. Always at least 1.
    #[must_use]
    pub fn rows(&self, content: &str) -> usize {
        let mut count = 0;
        self.for_each_row(content, |_| count += 1);
        count
    }

    /// Row count as a layout height.
    #[must_use]
    pub fn height(&self, content: &str) -> f64 {
        self.rows(content) as f64
    }

    /// The rows of `content`, as slices of it.
    #[must_use]
    pub fn wrap<'a>(&self, content: &'a str) -> Vec<&'a str> {
        let mut rows = Vec::new();
        self.for_each_row(content, |row| rows.push(row));
        rows
    }

    fn for_each_row<'a>(&self, content: &'a str, mut emit: impl FnMut(&'a str)) {
        for line in content.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            match (self.text_width(), self.wrap) {
                (None, _) | (_, WrapMode::None) => emit(line),
                (Some(width), WrapMode::Char) => wrap_graphemes(line, width, &mut emit),
                (Some(width), WrapMode::Word) => wrap_words(line, width, &mut emit),
            }
        }
    }
}

/// Longest prefix of `text` that fits in `max_width` cells.
///
/// Respects grapheme boundaries.
#[must_use]
pub fn clip_to_width(text: &str, max_width: usize) -> &str {
    let mut used = 0;
    for (i, grapheme) in text.grapheme_indices(true) {
        let width = grapheme.width();
        if used + width > max_width {
            return &text[..i];
        }
        used += width;
    }
    text
}

/// Break a single line at grapheme boundaries.
fn wrap_graphemes<'a>(line: &'a str, width: usize, emit: &mut impl FnMut(&'a str)) {
    let mut start = 0;
    let mut used = 0;
    for (i, grapheme) in line.grapheme_indices(true) {
        let grapheme_width = grapheme.width();
        if used + grapheme_width > width && i > start {
            emit(&line[start..i]);
            start = i;
            used = 0;
        }
        used += grapheme_width;
    }
    emit(&line[start..]);
}

/// Break a single line at word boundaries.
fn wrap_words<'a>(line: &'a str, width: usize, emit: &mut impl FnMut(&'a str)) {
    let mut start = 0;
    let mut used = 0;
    for (i, run) in runs(line) {
        let run_width = run.width();
        if used + run_width <= width {
            used += run_width;
            continue;
        }

        if is_whitespace(run) {
            // Break inside the gap; the gap itself is swallowed.
            emit(line[start..i].trim_end());
            start = i + run.len();
            used = 0;
            continue;
        }

        if i > start {
            emit(line[start..i].trim_end());
            start = i;
            used = 0;
        }

        if run_width > width {
            for (j, grapheme) in run.grapheme_indices(true) {
                let grapheme_width = grapheme.width();
                if used + grapheme_width > width && i + j > start {
                    emit(&line[start..i + j]);
                    start = i + j;
                    used = 0;
                }
                used += grapheme_width;
            }
        } else {
            used = run_width;
        }
    }
    emit(&line[start..]);
}

fn is_whitespace(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

/// Alternating runs of whitespace and non-whitespace, with byte offsets.
fn runs(line: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut graphemes = line.grapheme_indices(true).peekable();
    std::iter::from_fn(move || {
        let (start, first) = graphemes.next()?;
        let kind = is_whitespace(first);
        let mut end = start + first.len();
        while let Some((i, g)) = graphemes.next_if(|(_, g)| is_whitespace(g) == kind) {
            end = i + g.len();
        }
        Some((start, &line[start..end]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_is_one_row() {
        let measurer = RowMeasurer::new(20);
        assert_eq!(measurer.rows(""), 1);
        assert_eq!(measurer.wrap(""), vec![""]);
    }

    #[test]
    fn newlines_start_rows() {
        let measurer = RowMeasurer::new(20);
        assert_eq!(measurer.wrap("a\nb\n\nc"), vec!["a", "b", "", "c"]);
        assert_eq!(measurer.rows("trailing\n"), 2);
    }

    #[test]
    fn crlf_is_one_break() {
        let measurer = RowMeasurer::new(20);
        assert_eq!(measurer.wrap("a\r\nb"), vec!["a", "b"]);
    }

    #[test]
    fn zero_width_means_no_wrap() {
        let measurer = RowMeasurer::new(0);
        assert_eq!(measurer.rows(&"x".repeat(500)), 1);
    }

    #[test]
    fn none_mode_never_wraps() {
        let measurer = RowMeasurer::new(5).with_wrap(WrapMode::None);
        assert_eq!(measurer.wrap("hello world\nok"), vec!["hello world", "ok"]);
    }

    #[test]
    fn word_wrap_basic() {
        let measurer = RowMeasurer::new(10);
        assert_eq!(
            measurer.wrap("Hello world foo bar"),
            vec!["Hello", "world foo", "bar"]
        );
    }

    #[test]
    fn word_wrap_breaks_long_words() {
        let measurer = RowMeasurer::new(10);
        assert_eq!(
            measurer.wrap("id Supercalifragilistic"),
            vec!["id", "Supercalif", "ragilistic"]
        );
    }

    #[test]
    fn word_wrap_keeps_leading_indent() {
        let measurer = RowMeasurer::new(10);
        assert_eq!(measurer.wrap("  at foo()"), vec!["  at foo()"]);
    }

    #[test]
    fn char_wrap() {
        let measurer = RowMeasurer::new(4).with_wrap(WrapMode::Char);
        assert_eq!(measurer.wrap("abcdefghij"), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn cjk_respects_cell_width() {
        let measurer = RowMeasurer::new(4).with_wrap(WrapMode::Char);
        assert_eq!(measurer.wrap("日本語テ"), vec!["日本", "語テ"]);
        let measurer = RowMeasurer::new(5).with_wrap(WrapMode::Char);
        assert_eq!(measurer.wrap("日本語"), vec!["日本", "語"]);
    }

    #[test]
    fn zwj_sequence_is_never_split() {
        let family = "👨\u{200d}👩\u{200d}👧";
        let measurer = RowMeasurer::new(2).with_wrap(WrapMode::Char);
        let text = format!("{family}{family}");
        let rows = measurer.wrap(&text);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| *row == family));
    }

    #[test]
    fn gutter_narrows_rows() {
        let measurer = RowMeasurer::new(10).with_gutter(6).with_wrap(WrapMode::Char);
        assert_eq!(measurer.text_width(), Some(4));
        assert_eq!(measurer.rows("abcdefgh"), 2);

        let cramped = RowMeasurer::new(3).with_gutter(8);
        assert_eq!(cramped.text_width(), Some(1));
    }

    #[test]
    fn clip_respects_graphemes() {
        assert_eq!(clip_to_width("hello", 3), "hel");
        assert_eq!(clip_to_width("日本語", 3), "日");
        assert_eq!(clip_to_width("ok", 10), "ok");
    }

    #[test]
    fn height_matches_rows() {
        let measurer = RowMeasurer::new(10);
        assert_eq!(measurer.height("Hello world foo bar"), 3.0);
    }
}
