//! Highlight span and segment types
//!
//! Spans arrive from the analysis service; segments are derived on every
//! render and never persisted.

use serde::{Deserialize, Serialize};

/// A highlighted region of the analyzed text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HighlightSpan {
    /// Identifier shared with the diagnosis/procedure the span supports
    pub id: String,
    /// Character offset where the span starts (inclusive)
    pub start: i64,
    /// Character offset where the span ends (exclusive)
    pub end: i64,
}

impl HighlightSpan {
    /// Create a new span
    pub fn new(id: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            id: id.into(),
            start,
            end,
        }
    }

    /// True when the span fits `[0, len]` and is not inverted; `len` counts characters
    pub fn is_well_formed(&self, len: usize) -> bool {
        self.start >= 0 && self.start <= self.end && self.end as u64 <= len as u64
    }
}

/// A contiguous run of text, either plain or highlighted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment<'a> {
    /// The slice of the source text
    pub text: &'a str,
    /// Whether this run belongs to a highlight
    pub is_highlight: bool,
    /// Span id for highlighted runs
    pub id: Option<&'a str>,
}

impl<'a> Segment<'a> {
    pub fn plain(text: &'a str) -> Self {
        Self {
            text,
            is_highlight: false,
            id: None,
        }
    }

    pub fn highlight(text: &'a str, id: &'a str) -> Self {
        Self {
            text,
            is_highlight: true,
            id: Some(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed() {
        assert!(HighlightSpan::new("h1", 0, 5).is_well_formed(5));
        assert!(HighlightSpan::new("h1", 2, 2).is_well_formed(5));
        assert!(!HighlightSpan::new("h1", -1, 3).is_well_formed(5));
        assert!(!HighlightSpan::new("h1", 0, 6).is_well_formed(5));
        assert!(!HighlightSpan::new("h1", 4, 2).is_well_formed(5));
    }

    #[test]
    fn test_well_formed_counts_characters() {
        let text = "čaj";
        assert!(HighlightSpan::new("h1", 0, 3).is_well_formed(text.chars().count()));
        assert!(!HighlightSpan::new("h1", 0, 4).is_well_formed(text.chars().count()));
    }

    #[test]
    fn test_segment_serialization() {
        let seg = Segment::highlight("fever", "h1");
        let json = serde_json::to_value(seg).unwrap();
        assert_eq!(json["text"], "fever");
        assert_eq!(json["isHighlight"], true);
        assert_eq!(json["id"], "h1");

        let json = serde_json::to_value(Segment::plain("x")).unwrap();
        assert!(json["id"].is_null());
    }
}
