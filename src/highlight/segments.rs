//! Splitting analyzed text into plain and highlighted runs
//!
//! # Offsets
//!
//! - **Character offsets**: span offsets count Unicode scalar values, not bytes.
//!   Slicing converts through a boundary table so multi-byte text is never
//!   split inside a character.
//! - **Clamp, never reject**: spans come from an untrusted upstream. Negative
//!   starts, ends past the text, and inverted spans are clamped.
//! - **Clip to cursor**: a span starting before the end of the previous span
//!   is clipped to begin at that end. Every character is emitted exactly once,
//!   so the segments always concatenate back to the input text.

use std::iter::FusedIterator;

use tracing::debug;

use super::types::{HighlightSpan, Segment};

/// Lazy sequence of segments covering a text left to right.
///
/// Cloning before iteration gives an independent restart.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    text: &'a str,
    /// Byte offset of every character, followed by `text.len()`
    boundaries: Vec<usize>,
    /// Spans in walk order
    spans: Vec<&'a HighlightSpan>,
    /// Index of the next span to walk
    next: usize,
    /// Character offset already emitted
    cursor: usize,
    /// Highlight waiting behind a gap segment
    pending: Option<Segment<'a>>,
    finished: bool,
}

impl<'a> Segments<'a> {
    fn new(text: &'a str, highlights: &'a [HighlightSpan]) -> Self {
        let mut spans: Vec<&HighlightSpan> = highlights.iter().collect();
        // sort_by is stable: exact duplicates keep their input order
        spans.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then(a.end.cmp(&b.end))
                .then_with(|| a.id.cmp(&b.id))
        });

        let boundaries = if spans.is_empty() {
            Vec::new()
        } else {
            text.char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(text.len()))
                .collect()
        };

        Self {
            text,
            boundaries,
            spans,
            next: 0,
            cursor: 0,
            pending: None,
            finished: false,
        }
    }

    /// Length of the text in characters
    fn char_len(&self) -> usize {
        self.boundaries.len().saturating_sub(1)
    }

    /// Slice by character offsets (both already clamped)
    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.boundaries[start]..self.boundaries[end]]
    }
}

/// Clamp an untrusted offset into `[lo, hi]`
fn clamp_offset(value: i64, lo: usize, hi: usize) -> usize {
    if value <= lo as i64 {
        lo
    } else if value >= hi as i64 {
        hi
    } else {
        value as usize
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(segment) = self.pending.take() {
            return Some(segment);
        }

        if self.finished {
            return None;
        }

        if self.spans.is_empty() {
            self.finished = true;
            return Some(Segment::plain(self.text));
        }

        let len = self.char_len();

        if let Some(span) = self.spans.get(self.next).copied() {
            self.next += 1;

            if !span.is_well_formed(len) {
                debug!(
                    id = %span.id,
                    start = span.start,
                    end = span.end,
                    len,
                    "Clamping out-of-range highlight"
                );
            }
            let start = clamp_offset(span.start, self.cursor, len);
            let end = clamp_offset(span.end, start, len);
            let highlight = Segment::highlight(self.slice(start, end), &span.id);

            let gap_start = self.cursor;
            self.cursor = end;

            if start > gap_start {
                self.pending = Some(highlight);
                return Some(Segment::plain(self.slice(gap_start, start)));
            }
            return Some(highlight);
        }

        self.finished = true;
        if self.cursor < len {
            return Some(Segment::plain(self.slice(self.cursor, len)));
        }
        None
    }
}

impl FusedIterator for Segments<'_> {}

/// Segment `text` by `highlights`
///
/// # Arguments
/// * `text` - The analyzed text
/// * `highlights` - Spans in any order, possibly overlapping or out of range
///
/// # Returns
/// * A lazy iterator of segments covering `text` exactly once
pub fn segments<'a>(text: &'a str, highlights: &'a [HighlightSpan]) -> Segments<'a> {
    Segments::new(text, highlights)
}

/// Collect all segments eagerly
pub fn collect_segments<'a>(text: &'a str, highlights: &'a [HighlightSpan]) -> Vec<Segment<'a>> {
    segments(text, highlights).collect()
}

/// Render segments as plain text with bracket markers
///
/// Highlighted runs are wrapped in `[..]`; runs belonging to `active`
/// are wrapped in `[[..]]`. Empty highlighted runs are omitted.
pub fn render_marked(text: &str, highlights: &[HighlightSpan], active: Option<&str>) -> String {
    let mut out = String::with_capacity(text.len() + highlights.len() * 4);

    for segment in segments(text, highlights) {
        if !segment.is_highlight {
            out.push_str(segment.text);
            continue;
        }
        if segment.text.is_empty() {
            continue;
        }
        if active.is_some() && segment.id == active {
            out.push_str("[[");
            out.push_str(segment.text);
            out.push_str("]]");
        } else {
            out.push('[');
            out.push_str(segment.text);
            out.push(']');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(id: &str, start: i64, end: i64) -> HighlightSpan {
        HighlightSpan::new(id, start, end)
    }

    fn texts<'a>(segs: &[Segment<'a>]) -> Vec<&'a str> {
        segs.iter().map(|s| s.text).collect()
    }

    #[test]
    fn test_no_highlights_single_plain_segment() {
        let segs = collect_segments("hello world", &[]);
        assert_eq!(segs, vec![Segment::plain("hello world")]);
    }

    #[test]
    fn test_empty_text_no_highlights() {
        let segs = collect_segments("", &[]);
        assert_eq!(segs, vec![Segment::plain("")]);
    }

    #[test]
    fn test_highlight_at_start_has_no_leading_gap() {
        let spans = [span("a", 0, 5)];
        let segs = collect_segments("hello world", &spans);
        assert_eq!(texts(&segs), vec!["hello", " world"]);
        assert!(segs[0].is_highlight);
        assert!(!segs[1].is_highlight);
    }

    #[test]
    fn test_highlight_at_end_has_no_trailing_segment() {
        let spans = [span("a", 6, 11)];
        let segs = collect_segments("hello world", &spans);
        assert_eq!(texts(&segs), vec!["hello ", "world"]);
    }

    #[test]
    fn test_clamp_offset() {
        assert_eq!(clamp_offset(-3, 0, 10), 0);
        assert_eq!(clamp_offset(4, 0, 10), 4);
        assert_eq!(clamp_offset(42, 0, 10), 10);
        assert_eq!(clamp_offset(2, 5, 10), 5);
    }

    #[test]
    fn test_multibyte_offsets_are_characters() {
        // "Pacient má horečku" - 'á' and 'č' are two bytes each
        let text = "Pacient má horečku";
        let spans = [span("h1", 11, 18)];
        let segs = collect_segments(text, &spans);
        assert_eq!(texts(&segs), vec!["Pacient má ", "horečku"]);
    }

    #[test]
    fn test_restart_by_clone() {
        let spans = [span("a", 2, 4)];
        let iter = segments("abcdef", &spans);
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fused_after_exhaustion() {
        let spans = [span("a", 0, 1)];
        let mut iter = segments("ab", &spans);
        assert!(iter.next().is_some());
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_render_marked() {
        let spans = [span("h1", 12, 17), span("h2", 22, 26)];
        let text = "Patient has fever and pain";
        assert_eq!(
            render_marked(text, &spans, None),
            "Patient has [fever] and [pain]"
        );
        assert_eq!(
            render_marked(text, &spans, Some("h2")),
            "Patient has [fever] and [[pain]]"
        );
    }
}
