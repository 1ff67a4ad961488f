//! Highlighting of analyzed clinical text
//!
//! The analysis service returns character spans that justify each suggested
//! code. This module turns the text plus those spans into an ordered run of
//! plain and highlighted segments, ready for rendering.
//!
//! # Design Principles
//!
//! - **Pure**: segmentation is a function of (text, spans) with no side effects.
//! - **Total**: malformed spans are clamped, never rejected.
//! - **Deterministic**: the same set of spans in any input order yields the
//!   same segments.
//!
//! # Example
//!
//! ```
//! use drgcoder::highlight::{collect_segments, HighlightSpan};
//!
//! let text = "Patient has fever and pain";
//! let spans = vec![HighlightSpan::new("h1", 12, 17)];
//! let segs = collect_segments(text, &spans);
//! assert_eq!(segs[1].text, "fever");
//! assert_eq!(segs[1].id, Some("h1"));
//! ```

pub mod segments;
pub mod types;

pub use segments::{collect_segments, render_marked, segments, Segments};
pub use types::{HighlightSpan, Segment};
