//! Highlight Segmentation Integration Tests
//!
//! Tests for splitting analyzed text into plain and highlighted segments.

use drgcoder::adapters::mock::keyword_highlights;
use drgcoder::highlight::{collect_segments, render_marked, segments, HighlightSpan, Segment};

fn joined(segs: &[Segment<'_>]) -> String {
    segs.iter().map(|s| s.text).collect()
}

#[test]
fn test_fever_and_pain() {
    let text = "Patient has fever and pain";
    let spans = vec![HighlightSpan::new("h1", 12, 17), HighlightSpan::new("h2", 22, 26)];

    let segs = collect_segments(text, &spans);
    assert_eq!(
        segs,
        vec![
            Segment::plain("Patient has "),
            Segment::highlight("fever", "h1"),
            Segment::plain(" and "),
            Segment::highlight("pain", "h2"),
        ]
    );
}

#[test]
fn test_no_highlights_is_one_plain_segment() {
    let segs = collect_segments("Nothing to see", &[]);
    assert_eq!(segs, vec![Segment::plain("Nothing to see")]);
}

#[test]
fn test_segments_always_rebuild_the_text() {
    let text = "Fracture of the left femur after a fall, with severe pain";
    let span_sets = vec![
        vec![HighlightSpan::new("a", 0, 8)],
        vec![HighlightSpan::new("a", 5, 20), HighlightSpan::new("b", 10, 30)],
        vec![HighlightSpan::new("a", -10, 4), HighlightSpan::new("b", 50, 500)],
        vec![HighlightSpan::new("a", 30, 12)],
        vec![HighlightSpan::new("a", 3, 3), HighlightSpan::new("b", 3, 3)],
        vec![HighlightSpan::new("a", 1000, 2000)],
    ];

    for spans in span_sets {
        let segs = collect_segments(text, &spans);
        assert_eq!(joined(&segs), text, "spans: {:?}", spans);
    }
}

#[test]
fn test_input_order_does_not_change_output() {
    let text = "Patient has fever and pain";
    let forward = vec![
        HighlightSpan::new("h1", 12, 17),
        HighlightSpan::new("h2", 22, 26),
        HighlightSpan::new("h3", 0, 7),
    ];
    let mut backward = forward.clone();
    backward.reverse();

    assert_eq!(collect_segments(text, &forward), collect_segments(text, &backward));
}

#[test]
fn test_out_of_range_spans_are_clamped() {
    let text = "abcdef";

    let spans = [HighlightSpan::new("neg", -5, 3)];
    let segs = collect_segments(text, &spans);
    assert_eq!(segs, vec![Segment::highlight("abc", "neg"), Segment::plain("def")]);

    let spans = [HighlightSpan::new("long", 4, 100)];
    let segs = collect_segments(text, &spans);
    assert_eq!(segs, vec![Segment::plain("abcd"), Segment::highlight("ef", "long")]);
}

#[test]
fn test_inverted_span_is_empty() {
    let spans = [HighlightSpan::new("inv", 5, 2)];
    let segs = collect_segments("abcdef", &spans);
    assert_eq!(
        segs,
        vec![
            Segment::plain("abcde"),
            Segment::highlight("", "inv"),
            Segment::plain("f"),
        ]
    );
}

#[test]
fn test_overlap_is_clipped_to_previous_end() {
    let spans = [HighlightSpan::new("a", 0, 4), HighlightSpan::new("b", 2, 6)];
    let segs = collect_segments("abcdefgh", &spans);
    assert_eq!(
        segs,
        vec![
            Segment::highlight("abcd", "a"),
            Segment::highlight("ef", "b"),
            Segment::plain("gh"),
        ]
    );
}

#[test]
fn test_offsets_count_characters() {
    let text = "naïve café au lait";
    let spans = [HighlightSpan::new("c", 6, 10)];
    let segs = collect_segments(text, &spans);
    assert_eq!(segs[1], Segment::highlight("café", "c"));
    assert_eq!(joined(&segs), text);
}

#[test]
fn test_iterator_restarts_from_clone() {
    let text = "Patient has fever";
    let spans = vec![HighlightSpan::new("h1", 12, 17)];
    let iter = segments(text, &spans);

    let first: Vec<_> = iter.clone().collect();
    let second: Vec<_> = iter.collect();
    assert_eq!(first, second);
}

#[test]
fn test_render_marks_active_span() {
    let text = "Patient has fever and pain";
    let spans = vec![HighlightSpan::new("h1", 12, 17), HighlightSpan::new("h2", 22, 26)];

    assert_eq!(render_marked(text, &spans, None), "Patient has [fever] and [pain]");
    assert_eq!(
        render_marked(text, &spans, Some("h2")),
        "Patient has [fever] and [[pain]]"
    );
}

#[test]
fn test_mock_highlights_segment_cleanly() {
    let text = "Patient presents with fever and severe chest pain radiating to the left arm";
    let spans = keyword_highlights(text);
    assert!(!spans.is_empty());

    let segs = collect_segments(text, &spans);
    assert_eq!(joined(&segs), text);
    assert!(segs.iter().any(|s| s.is_highlight && s.text == "fever"));
    assert!(segs.iter().any(|s| s.is_highlight && s.text == "pain"));
}
