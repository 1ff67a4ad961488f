//! drgcoder - Medical coding assistant core
//!
//! Client-side core for a clinical coding workflow: free-text case notes go
//! to a coding service, which returns suggested diagnosis and procedure codes
//! with evidence spans. Coders repair the suggestion and resubmit; reviewers
//! approve or reject stored predictions with corrected codes.
//!
//! # Architecture
//!
//! Pages own their state and are driven by messages:
//! - A page reduces each message in `update` and may return an effect
//! - The driver runs effects against the coding service
//! - Finished work comes back as a message, stale responses are dropped
//!
//! # Modules
//!
//! - `highlight`: Split text into plain and highlighted segments
//! - `ranking`: Order diagnosis candidates, collapse secondary ones
//! - `review`: Prediction table, correction diff, feedback payloads
//! - `repair`: Editable case record for resubmission
//! - `search`: Debounced, last-query-wins code search
//! - `views`: Coder workspace and review dashboard pages
//! - `adapters`: Coding service client (HTTP) and local mock
//! - `preferences`: Persisted validator name and locale
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Analyze a case note
//! cat note.txt | drgcoder analyze
//!
//! # Review predictions
//! drgcoder predictions --status pending --sort confidence --desc
//! drgcoder approve pred-001 pred-002 --by "Dr. Novak"
//! drgcoder reject pred-003 --main J15.9 --comment "Organism confirmed"
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod highlight;
pub mod preferences;
pub mod ranking;
pub mod repair;
pub mod review;
pub mod search;
pub mod views;

// Re-export main types at crate root for convenience
pub use adapters::{ApiError, CodingApi, HttpApi, MockApi, PredictionQuery};
pub use domain::{CaseResult, CoderCaseData, Diagnosis, FeedbackSubmission, Prediction};
pub use highlight::{collect_segments, segments, HighlightSpan, Segment};
pub use ranking::{rank, set_as_principal, RankedList};
pub use repair::{RepairEdit, RepairForm};
pub use review::{diff_secondary, CaseTable};
pub use search::{CodeSearcher, SearchOutcome};
pub use views::{AnalyzerView, Driver, ReviewView, View};
