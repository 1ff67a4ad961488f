//! In-memory prediction table: sort, filter, select, bulk staging.
//!
//! Everything here is a client-side projection over rows already fetched.
//! The table never talks to the service; bulk actions hand the staged ids
//! to a caller-supplied submit function.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{FeedbackType, PredictionListItem};

/// A table row
pub type PredictionRow = PredictionListItem;

/// Sortable columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    PacId,
    MainCode,
    MainName,
    Confidence,
    CreatedAt,
    Status,
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pac_id" | "patient" => Ok(SortColumn::PacId),
            "main_code" | "code" | "diagnosis" => Ok(SortColumn::MainCode),
            "main_name" | "name" => Ok(SortColumn::MainName),
            "confidence" | "main_confidence" => Ok(SortColumn::Confidence),
            "created_at" | "created" => Ok(SortColumn::CreatedAt),
            "status" | "validated" => Ok(SortColumn::Status),
            other => Err(format!("Unknown sort column: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Current single-column sort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: SortColumn,
    pub direction: SortDirection,
}

/// Review status of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Pending,
    Approved,
    Rejected,
}

impl RowStatus {
    /// Display status; a validated row without a verdict shows as approved
    pub fn of(row: &PredictionRow) -> Self {
        match (row.validated, row.feedback_type) {
            (false, _) => RowStatus::Pending,
            (true, Some(FeedbackType::Rejected)) => RowStatus::Rejected,
            (true, _) => RowStatus::Approved,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Pending => "pending",
            RowStatus::Approved => "approved",
            RowStatus::Rejected => "rejected",
        }
    }
}

/// Status filter values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Approved,
    Rejected,
}

impl StatusFilter {
    /// Whether a row passes this filter
    pub fn matches(&self, row: &PredictionRow) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => !row.validated,
            StatusFilter::Approved => {
                row.validated && row.feedback_type == Some(FeedbackType::Approved)
            }
            StatusFilter::Rejected => {
                row.validated && row.feedback_type == Some(FeedbackType::Rejected)
            }
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" | "" => Ok(StatusFilter::All),
            "pending" => Ok(StatusFilter::Pending),
            "approved" => Ok(StatusFilter::Approved),
            "rejected" => Ok(StatusFilter::Rejected),
            other => Err(format!("Unknown status filter: {}", other)),
        }
    }
}

/// Bulk verdicts offered for a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Approve,
    Reject,
}

impl BulkAction {
    pub fn feedback_type(&self) -> FeedbackType {
        match self {
            BulkAction::Approve => FeedbackType::Approved,
            BulkAction::Reject => FeedbackType::Rejected,
        }
    }
}

/// Result of a bulk action; each id is submitted independently
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub succeeded: Vec<String>,
    /// (id, error message)
    pub failed: Vec<(String, String)>,
}

impl BulkOutcome {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Prediction table state
#[derive(Debug, Clone, Default)]
pub struct CaseTable {
    rows: Vec<PredictionRow>,
    sort: Option<SortState>,
    search: String,
    status: StatusFilter,
    selected: HashSet<String>,
}

impl CaseTable {
    /// Create a table over the given rows
    pub fn new(rows: Vec<PredictionRow>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    /// Replace the rows, keeping selections whose ids still exist
    pub fn set_rows(&mut self, rows: Vec<PredictionRow>) {
        let ids: HashSet<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        self.selected.retain(|id| ids.contains(id.as_str()));
        self.rows = rows;
    }

    /// All rows in fetch order
    pub fn rows(&self) -> &[PredictionRow] {
        &self.rows
    }

    pub fn row(&self, id: &str) -> Option<&PredictionRow> {
        self.rows.iter().find(|r| r.id == id)
    }

    // ------------------------------------------------------------------
    // Sort
    // ------------------------------------------------------------------

    /// Header click: ascending first, ascending flips to descending
    pub fn toggle_sort(&mut self, column: SortColumn) {
        let direction = match self.sort {
            Some(SortState {
                column: current,
                direction: SortDirection::Ascending,
            }) if current == column => SortDirection::Descending,
            _ => SortDirection::Ascending,
        };
        self.sort = Some(SortState { column, direction });
    }

    pub fn set_sort(&mut self, column: SortColumn, direction: SortDirection) {
        self.sort = Some(SortState { column, direction });
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    pub fn sort(&self) -> Option<SortState> {
        self.sort
    }

    // ------------------------------------------------------------------
    // Filter
    // ------------------------------------------------------------------

    /// Free-text filter over patient id, diagnosis code and name
    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        self.status = status;
    }

    pub fn status(&self) -> StatusFilter {
        self.status
    }

    pub fn clear_filters(&mut self) {
        self.search.clear();
        self.status = StatusFilter::All;
    }

    /// Number of filters currently narrowing the table
    pub fn active_filter_count(&self) -> usize {
        usize::from(!self.search.is_empty()) + usize::from(self.status != StatusFilter::All)
    }

    fn matches_search(row: &PredictionRow, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let pac_id = row.pac_id.as_deref().unwrap_or("");
        [pac_id, row.main_code.as_str(), row.main_name.as_str()]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }

    /// Filtered and sorted rows
    pub fn visible_rows(&self) -> Vec<&PredictionRow> {
        let needle = self.search.to_lowercase();
        let mut rows: Vec<&PredictionRow> = self
            .rows
            .iter()
            .filter(|r| self.status.matches(r) && Self::matches_search(r, &needle))
            .collect();

        if let Some(sort) = self.sort {
            rows.sort_by(|a, b| {
                let ordering = compare_rows(a, b, sort.column);
                match sort.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        rows
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Flip one row; unknown ids are ignored. Returns the new state.
    pub fn toggle_row(&mut self, id: &str) -> bool {
        if self.row(id).is_none() {
            return false;
        }
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.to_string());
            true
        }
    }

    pub fn set_selected(&mut self, id: &str, selected: bool) {
        if selected {
            if self.row(id).is_some() {
                self.selected.insert(id.to_string());
            }
        } else {
            self.selected.remove(id);
        }
    }

    /// Select exactly the visible rows; hidden selections are left alone
    pub fn select_all_visible(&mut self) {
        let ids: Vec<String> = self.visible_rows().iter().map(|r| r.id.clone()).collect();
        self.selected.extend(ids);
    }

    /// Header checkbox: deselect the visible rows if all are selected,
    /// otherwise select them
    pub fn toggle_all_visible(&mut self) {
        if self.all_visible_selected() {
            let ids: Vec<String> = self.visible_rows().iter().map(|r| r.id.clone()).collect();
            for id in ids {
                self.selected.remove(&id);
            }
        } else {
            self.select_all_visible();
        }
    }

    pub fn all_visible_selected(&self) -> bool {
        let visible = self.visible_rows();
        !visible.is_empty() && visible.iter().all(|r| self.selected.contains(&r.id))
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Size of the whole selection, hidden rows included
    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// The "N selected" count shown to the user
    pub fn visible_selected_count(&self) -> usize {
        self.visible_rows()
            .iter()
            .filter(|r| self.selected.contains(&r.id))
            .count()
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    // ------------------------------------------------------------------
    // Bulk actions
    // ------------------------------------------------------------------

    /// Selected ids that are visible, in visible order
    pub fn stage_bulk(&self) -> Vec<String> {
        self.visible_rows()
            .into_iter()
            .filter(|r| self.selected.contains(&r.id))
            .map(|r| r.id.clone())
            .collect()
    }

    /// Submit every staged id, then clear the selection
    ///
    /// A failing id does not stop the remaining ones.
    pub async fn run_bulk<F, Fut, E>(&mut self, action: BulkAction, submit: F) -> BulkOutcome
    where
        F: FnMut(BulkAction, String) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let ids = self.stage_bulk();
        let outcome = submit_each(action, ids, submit).await;
        self.clear_selection();
        outcome
    }
}

/// Submit each id independently, in order
///
/// A failing id is recorded and does not stop the remaining ones.
pub async fn submit_each<F, Fut, E>(action: BulkAction, ids: Vec<String>, mut submit: F) -> BulkOutcome
where
    F: FnMut(BulkAction, String) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    debug!(?action, count = ids.len(), "Running bulk action");

    let mut outcome = BulkOutcome::default();
    for id in ids {
        match submit(action, id.clone()).await {
            Ok(()) => outcome.succeeded.push(id),
            Err(e) => {
                warn!(%id, error = %e, "Bulk action failed for row");
                outcome.failed.push((id, e.to_string()));
            }
        }
    }
    outcome
}

/// Case-insensitive text order, bytewise on ties
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Ascending comparison for one column
fn compare_rows(a: &PredictionRow, b: &PredictionRow, column: SortColumn) -> Ordering {
    match column {
        SortColumn::PacId => compare_text(
            a.pac_id.as_deref().unwrap_or(""),
            b.pac_id.as_deref().unwrap_or(""),
        ),
        SortColumn::MainCode => compare_text(&a.main_code, &b.main_code),
        SortColumn::MainName => compare_text(&a.main_name, &b.main_name),
        SortColumn::Confidence => a.main_confidence.total_cmp(&b.main_confidence),
        SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
        SortColumn::Status => RowStatus::of(a).cmp(&RowStatus::of(b)),
    }
}
