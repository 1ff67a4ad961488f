//! Page state owners.
//!
//! Each page owns its state exclusively. Inputs arrive as messages, the page
//! reduces them in `update`, and any remote work is returned as an [`Effect`]
//! for the [`Driver`] to run. The driver turns the finished work into a
//! [`Completion`], which the page maps back to one of its own messages.

pub mod analyzer;
pub mod driver;
pub mod review;

pub use analyzer::{AnalysisStatus, AnalyzerMsg, AnalyzerView};
pub use driver::Driver;
pub use review::{DetailSheet, DetailState, RejectEditor, ReviewMsg, ReviewView};

use crate::adapters::{ApiError, PredictionQuery};
use crate::domain::{
    CaseResult, CoderCaseData, FeedbackAck, FeedbackSubmission, PaginatedPredictions, Prediction, RepairAck,
};
use crate::review::{BulkAction, BulkOutcome};

/// Remote work requested by a view
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Analyze { token: u64, text: String },
    SubmitRepair(Box<CoderCaseData>),
    LoadPredictions(PredictionQuery),
    LoadPrediction { token: u64, id: String },
    /// `token` identifies the submission the reply belongs to
    SubmitFeedback {
        token: u64,
        id: String,
        feedback: FeedbackSubmission,
    },
    /// One independent feedback call per id
    BulkFeedback {
        action: BulkAction,
        ids: Vec<String>,
        validated_by: String,
    },
}

/// Finished remote work
#[derive(Debug)]
pub enum Completion {
    Analyzed {
        token: u64,
        result: Result<CaseResult, ApiError>,
    },
    RepairSubmitted(Result<RepairAck, ApiError>),
    PredictionsLoaded(Result<PaginatedPredictions, ApiError>),
    PredictionLoaded {
        token: u64,
        result: Result<Prediction, ApiError>,
    },
    FeedbackSubmitted {
        token: u64,
        id: String,
        result: Result<FeedbackAck, ApiError>,
    },
    BulkFinished(BulkOutcome),
}

/// Status of a one-shot submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmitStatus {
    #[default]
    Idle,
    Pending,
    Saved,
    Failed(String),
}

impl SubmitStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, SubmitStatus::Pending)
    }
}

/// A page driven by messages
pub trait View {
    type Msg;

    /// Reduce one message; may request remote work
    fn update(&mut self, msg: Self::Msg) -> Option<Effect>;

    /// Map finished work back to a message; `None` if it is not for this page
    fn on_completion(completion: Completion) -> Option<Self::Msg>;
}
