//! Prediction review: the table projection and the correction diff.

pub mod correction;
pub mod table;

pub use correction::{diff_secondary, seed_edits, EditedDiagnosis, FeedbackError};
pub use table::{
    submit_each, BulkAction, BulkOutcome, CaseTable, PredictionRow, RowStatus, SortColumn,
    SortDirection, SortState, StatusFilter,
};
