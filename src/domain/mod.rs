//! Domain types for the coding assistant.
//!
//! This module contains the core data structures:
//! - Case: editable case records and analysis results
//! - Prediction: prediction rows, details and reviewer feedback

pub mod case;
pub mod prediction;

// Re-export commonly used types
pub use case::{
    AgeUnit, BedType, CaseResult, CoderCaseData, CriticalItem, Diagnosis, Procedure,
    Rehabilitation, Sex, Source, TherapeuticDay, TherapeuticDays,
};
pub use prediction::{
    CodeSearchResult, CorrectedCode, CorrectionAction, DiagnosisCode, FeedbackAck,
    FeedbackSubmission, FeedbackType, PaginatedPredictions, Prediction, PredictionListItem,
    RepairAck,
};
