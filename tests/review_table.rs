//! Review Table Integration Tests
//!
//! Tests for filtering, sorting, selection and bulk actions over the
//! prediction table.

use chrono::{Duration, TimeZone, Utc};
use drgcoder::domain::{FeedbackType, PredictionListItem};
use drgcoder::review::{
    BulkAction, CaseTable, RowStatus, SortColumn, SortDirection, SortState, StatusFilter,
};

fn row(
    id: &str,
    pac_id: &str,
    code: &str,
    name: &str,
    confidence: f64,
    feedback: Option<FeedbackType>,
    hours: i64,
) -> PredictionListItem {
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    PredictionListItem {
        id: id.to_string(),
        case_id: format!("case-{}", id),
        pac_id: Some(pac_id.to_string()),
        main_code: code.to_string(),
        main_name: name.to_string(),
        main_confidence: confidence,
        validated: feedback.is_some(),
        feedback_type: feedback,
        created_at: base + Duration::hours(hours),
    }
}

fn table() -> CaseTable {
    CaseTable::new(vec![
        row("p1", "PAC-1001", "J18.9", "Pneumonia, unspecified organism", 0.92, None, 0),
        row(
            "p2",
            "PAC-1002",
            "J15.9",
            "Unspecified bacterial pneumonia",
            0.61,
            Some(FeedbackType::Approved),
            1,
        ),
        row(
            "p3",
            "PAC-1003",
            "I10",
            "Essential (primary) hypertension",
            0.77,
            Some(FeedbackType::Rejected),
            2,
        ),
    ])
}

fn visible_ids(table: &CaseTable) -> Vec<&str> {
    table.visible_rows().iter().map(|r| r.id.as_str()).collect()
}

#[test]
fn test_row_status() {
    let t = table();
    assert_eq!(RowStatus::of(t.row("p1").unwrap()), RowStatus::Pending);
    assert_eq!(RowStatus::of(t.row("p2").unwrap()), RowStatus::Approved);
    assert_eq!(RowStatus::of(t.row("p3").unwrap()), RowStatus::Rejected);
}

#[test]
fn test_search_and_status_compose() {
    let mut t = table();

    t.set_search("PNEUMONIA");
    assert_eq!(visible_ids(&t), vec!["p1", "p2"]);

    t.set_status(StatusFilter::Approved);
    assert_eq!(visible_ids(&t), vec!["p2"]);
    assert_eq!(t.active_filter_count(), 2);

    t.clear_filters();
    assert_eq!(visible_ids(&t), vec!["p1", "p2", "p3"]);
    assert_eq!(t.active_filter_count(), 0);
}

#[test]
fn test_search_matches_patient_and_code() {
    let mut t = table();
    t.set_search("pac-1003");
    assert_eq!(visible_ids(&t), vec!["p3"]);

    t.set_search("j1");
    assert_eq!(visible_ids(&t), vec!["p1", "p2"]);
}

#[test]
fn test_header_click_sort_cycle() {
    let mut t = table();

    t.toggle_sort(SortColumn::Confidence);
    assert_eq!(visible_ids(&t), vec!["p2", "p3", "p1"]);

    t.toggle_sort(SortColumn::Confidence);
    assert_eq!(
        t.sort(),
        Some(SortState {
            column: SortColumn::Confidence,
            direction: SortDirection::Descending,
        })
    );
    assert_eq!(visible_ids(&t), vec!["p1", "p3", "p2"]);

    // A new column starts ascending again
    t.toggle_sort(SortColumn::MainCode);
    assert_eq!(t.sort().unwrap().direction, SortDirection::Ascending);
    assert_eq!(visible_ids(&t), vec!["p3", "p2", "p1"]);
}

#[test]
fn test_sort_by_created_descending() {
    let mut t = table();
    t.set_sort(SortColumn::CreatedAt, SortDirection::Descending);
    assert_eq!(visible_ids(&t), vec!["p3", "p2", "p1"]);

    t.clear_sort();
    assert_eq!(visible_ids(&t), vec!["p1", "p2", "p3"]);
}

#[test]
fn test_select_all_only_touches_visible_rows() {
    let mut t = table();
    t.set_search("pneumonia");
    t.toggle_all_visible();

    assert!(t.is_selected("p1"));
    assert!(t.is_selected("p2"));
    assert!(!t.is_selected("p3"));
    assert!(t.all_visible_selected());

    t.clear_filters();
    assert!(!t.all_visible_selected());
    assert_eq!(t.visible_selected_count(), 2);

    t.toggle_all_visible();
    assert_eq!(t.selected_count(), 3);

    t.toggle_all_visible();
    assert_eq!(t.selected_count(), 0);
}

#[test]
fn test_hidden_selection_is_not_staged() {
    let mut t = table();
    t.toggle_row("p1");
    t.toggle_row("p3");

    t.set_status(StatusFilter::Pending);
    assert_eq!(t.stage_bulk(), vec!["p1".to_string()]);
    assert_eq!(t.selected_count(), 2);
}

#[test]
fn test_toggle_unknown_row_is_ignored() {
    let mut t = table();
    assert!(!t.toggle_row("nope"));
    assert_eq!(t.selected_count(), 0);
}

#[test]
fn test_reload_keeps_surviving_selection() {
    let mut t = table();
    t.toggle_row("p1");
    t.toggle_row("p2");

    t.set_rows(vec![row("p2", "PAC-1002", "J15.9", "Bacterial pneumonia", 0.6, None, 1)]);
    assert!(t.is_selected("p2"));
    assert!(!t.is_selected("p1"));
    assert_eq!(t.selected_count(), 1);
}

#[tokio::test]
async fn test_bulk_reports_partial_failure_and_clears_selection() {
    let mut t = table();
    t.toggle_all_visible();

    let outcome = t
        .run_bulk(BulkAction::Reject, |action, id| async move {
            assert_eq!(action, BulkAction::Reject);
            if id == "p2" {
                Err(format!("{} is locked", id))
            } else {
                Ok(())
            }
        })
        .await;

    assert_eq!(outcome.succeeded, vec!["p1".to_string(), "p3".to_string()]);
    assert_eq!(outcome.failed, vec![("p2".to_string(), "p2 is locked".to_string())]);
    assert!(!outcome.is_complete_success());
    assert_eq!(t.selected_count(), 0);
}

#[test]
fn test_bulk_action_feedback_type() {
    assert_eq!(BulkAction::Approve.feedback_type(), FeedbackType::Approved);
    assert_eq!(BulkAction::Reject.feedback_type(), FeedbackType::Rejected);
}
