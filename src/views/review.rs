//! Prediction review dashboard: table, detail sheet, approval queue.

use tracing::{debug, warn};

use super::{Completion, Effect, SubmitStatus, View};
use crate::adapters::PredictionQuery;
use crate::domain::{FeedbackAck, FeedbackSubmission, PaginatedPredictions, Prediction};
use crate::preferences::{PreferenceStore, Preferences};
use crate::review::{
    seed_edits, BulkAction, BulkOutcome, CaseTable, EditedDiagnosis, FeedbackError, PredictionRow, SortColumn,
    StatusFilter,
};

/// Detail sheet contents
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading,
    Loaded(Box<Prediction>),
    Failed(String),
}

/// The open detail sheet; `token` identifies the request that fills it
#[derive(Debug, Clone, PartialEq)]
pub struct DetailSheet {
    pub id: String,
    token: u64,
    pub state: DetailState,
}

impl DetailSheet {
    pub fn prediction(&self) -> Option<&Prediction> {
        match &self.state {
            DetailState::Loaded(prediction) => Some(prediction.as_ref()),
            _ => None,
        }
    }
}

/// Working copy for a rejection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectEditor {
    pub main_code: String,
    pub main_name: String,
    pub secondary: Vec<EditedDiagnosis>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewMsg {
    Refresh,
    RowsLoaded(PaginatedPredictions),
    LoadFailed(String),
    Search(String),
    Status(StatusFilter),
    ClearFilters,
    Sort(SortColumn),
    ToggleRow(String),
    ToggleAllVisible,
    OpenDetail(String),
    CloseDetail,
    DetailLoaded { token: u64, prediction: Box<Prediction> },
    DetailFailed { token: u64, error: String },
    SetValidator(String),
    SetComment(String),
    Approve,
    BeginReject,
    CancelReject,
    EditMain { code: String, name: String },
    AddSecondary,
    RemoveSecondary(usize),
    UpdateSecondary { index: usize, code: String, name: String },
    SubmitReject,
    FeedbackSaved { token: u64, ack: FeedbackAck },
    FeedbackFailed { token: u64, error: String },
    Next,
    Previous,
    Bulk(BulkAction),
    BulkFinished(BulkOutcome),
}

/// Review dashboard state
#[derive(Debug)]
pub struct ReviewView<S> {
    query: PredictionQuery,
    table: CaseTable,
    loading: bool,
    load_error: Option<String>,
    detail: Option<DetailSheet>,
    last_token: u64,
    queue_position: usize,
    preferences: Preferences<S>,
    validator: String,
    comment: String,
    reject: Option<RejectEditor>,
    submission: SubmitStatus,
    /// Token of the feedback request awaiting a reply
    feedback_token: Option<u64>,
    last_feedback_token: u64,
    bulk_pending: bool,
    last_bulk: Option<BulkOutcome>,
}

impl<S: PreferenceStore> ReviewView<S> {
    /// Create the view; the validator name starts from the stored preference
    pub fn new(preferences: Preferences<S>, query: PredictionQuery) -> Self {
        let validator = preferences.validator_name().unwrap_or_default().to_string();
        Self {
            query,
            table: CaseTable::default(),
            loading: false,
            load_error: None,
            detail: None,
            last_token: 0,
            queue_position: 0,
            preferences,
            validator,
            comment: String::new(),
            reject: None,
            submission: SubmitStatus::Idle,
            feedback_token: None,
            last_feedback_token: 0,
            bulk_pending: false,
            last_bulk: None,
        }
    }

    pub fn table(&self) -> &CaseTable {
        &self.table
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn detail(&self) -> Option<&DetailSheet> {
        self.detail.as_ref()
    }

    pub fn validator(&self) -> &str {
        &self.validator
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn reject_editor(&self) -> Option<&RejectEditor> {
        self.reject.as_ref()
    }

    pub fn submission(&self) -> &SubmitStatus {
        &self.submission
    }

    pub fn is_bulk_pending(&self) -> bool {
        self.bulk_pending
    }

    pub fn last_bulk(&self) -> Option<&BulkOutcome> {
        self.last_bulk.as_ref()
    }

    pub fn preferences(&self) -> &Preferences<S> {
        &self.preferences
    }

    /// Rows still awaiting review, in fetch order
    pub fn pending_rows(&self) -> Vec<&PredictionRow> {
        self.table.rows().iter().filter(|r| !r.validated).collect()
    }

    /// Approval queue cursor
    pub fn queue_position(&self) -> usize {
        self.queue_position
    }

    fn open_detail(&mut self, id: String) -> Effect {
        self.last_token += 1;
        let token = self.last_token;
        self.detail = Some(DetailSheet {
            id: id.clone(),
            token,
            state: DetailState::Loading,
        });
        self.reject = None;
        self.comment.clear();
        self.submission = SubmitStatus::Idle;
        self.feedback_token = None;
        Effect::LoadPrediction { token, id }
    }

    fn open_queue_entry(&mut self) -> Option<Effect> {
        let id = self.pending_rows().get(self.queue_position)?.id.clone();
        Some(self.open_detail(id))
    }

    fn current_detail(&mut self, token: u64) -> Option<&mut DetailSheet> {
        self.detail.as_mut().filter(|d| d.token == token)
    }

    fn loaded_prediction(&self) -> Option<&Prediction> {
        self.detail.as_ref().and_then(DetailSheet::prediction)
    }

    fn submit(&mut self, built: Result<FeedbackSubmission, FeedbackError>) -> Option<Effect> {
        if self.submission.is_pending() {
            return None;
        }
        let id = self.loaded_prediction()?.prediction_id.clone();
        match built {
            Ok(feedback) => {
                self.last_feedback_token += 1;
                let token = self.last_feedback_token;
                self.feedback_token = Some(token);
                self.submission = SubmitStatus::Pending;
                Some(Effect::SubmitFeedback { token, id, feedback })
            }
            Err(e) => {
                self.submission = SubmitStatus::Failed(e.to_string());
                None
            }
        }
    }

    /// Take the pending submission if `token` is the one awaited
    fn settle_feedback(&mut self, token: u64) -> bool {
        if self.feedback_token == Some(token) && self.submission.is_pending() {
            self.feedback_token = None;
            true
        } else {
            false
        }
    }

    fn refresh(&mut self) -> Effect {
        self.loading = true;
        Effect::LoadPredictions(self.query)
    }
}

impl<S: PreferenceStore> View for ReviewView<S> {
    type Msg = ReviewMsg;

    fn update(&mut self, msg: ReviewMsg) -> Option<Effect> {
        match msg {
            ReviewMsg::Refresh => Some(self.refresh()),
            ReviewMsg::RowsLoaded(page) => {
                self.loading = false;
                self.load_error = None;
                self.table.set_rows(page.predictions);
                let pending = self.pending_rows().len();
                self.queue_position = self.queue_position.min(pending.saturating_sub(1));
                None
            }
            ReviewMsg::LoadFailed(error) => {
                self.loading = false;
                self.load_error = Some(error);
                None
            }
            ReviewMsg::Search(text) => {
                self.table.set_search(text);
                None
            }
            ReviewMsg::Status(status) => {
                self.table.set_status(status);
                None
            }
            ReviewMsg::ClearFilters => {
                self.table.clear_filters();
                None
            }
            ReviewMsg::Sort(column) => {
                self.table.toggle_sort(column);
                None
            }
            ReviewMsg::ToggleRow(id) => {
                self.table.toggle_row(&id);
                None
            }
            ReviewMsg::ToggleAllVisible => {
                self.table.toggle_all_visible();
                None
            }
            ReviewMsg::OpenDetail(id) => Some(self.open_detail(id)),
            ReviewMsg::CloseDetail => {
                self.detail = None;
                self.reject = None;
                None
            }
            ReviewMsg::DetailLoaded { token, prediction } => {
                match self.current_detail(token) {
                    Some(sheet) => sheet.state = DetailState::Loaded(prediction),
                    None => debug!(token, "Dropping detail for a closed or retargeted sheet"),
                }
                None
            }
            ReviewMsg::DetailFailed { token, error } => {
                if let Some(sheet) = self.current_detail(token) {
                    sheet.state = DetailState::Failed(error);
                }
                None
            }
            ReviewMsg::SetValidator(name) => {
                self.validator = name;
                None
            }
            ReviewMsg::SetComment(text) => {
                self.comment = text;
                None
            }
            ReviewMsg::Approve => {
                let comment = Some(self.comment.as_str());
                let built = FeedbackSubmission::approve(&self.validator, comment);
                self.submit(built)
            }
            ReviewMsg::BeginReject => {
                let prediction = self.loaded_prediction()?;
                self.reject = Some(RejectEditor {
                    main_code: prediction.main_diagnosis.code.clone(),
                    main_name: prediction.main_diagnosis.name.clone(),
                    secondary: seed_edits(&prediction.secondary_diagnoses),
                });
                None
            }
            ReviewMsg::CancelReject => {
                self.reject = None;
                None
            }
            ReviewMsg::EditMain { code, name } => {
                if let Some(editor) = self.reject.as_mut() {
                    editor.main_code = code;
                    editor.main_name = name;
                }
                None
            }
            ReviewMsg::AddSecondary => {
                if let Some(editor) = self.reject.as_mut() {
                    editor.secondary.push(EditedDiagnosis::blank());
                }
                None
            }
            ReviewMsg::RemoveSecondary(index) => {
                if let Some(editor) = self.reject.as_mut() {
                    if index < editor.secondary.len() {
                        editor.secondary.remove(index);
                    }
                }
                None
            }
            ReviewMsg::UpdateSecondary { index, code, name } => {
                if let Some(row) = self.reject.as_mut().and_then(|e| e.secondary.get_mut(index)) {
                    row.code = code;
                    row.name = name;
                }
                None
            }
            ReviewMsg::SubmitReject => {
                let editor = self.reject.as_ref()?;
                let prediction = self.loaded_prediction()?;
                let built = FeedbackSubmission::reject(
                    &self.validator,
                    &editor.main_code,
                    &editor.main_name,
                    &prediction.secondary_diagnoses,
                    &editor.secondary,
                    &self.comment,
                );
                self.submit(built)
            }
            ReviewMsg::FeedbackSaved { token, ack } => {
                if !self.settle_feedback(token) {
                    debug!(token, id = %ack.id, "Feedback reply for a closed sheet");
                    return Some(self.refresh());
                }
                self.submission = SubmitStatus::Saved;
                if let Err(e) = self.preferences.set_validator_name(&self.validator) {
                    warn!(error = %e, "Failed to persist validator name");
                }
                self.reject = None;
                self.comment.clear();
                debug!(id = %ack.id, "Feedback saved");
                Some(self.refresh())
            }
            ReviewMsg::FeedbackFailed { token, error } => {
                if self.settle_feedback(token) {
                    warn!(%error, "Feedback submission failed");
                    self.submission = SubmitStatus::Failed(error);
                } else {
                    debug!(token, %error, "Dropping failure for a closed sheet");
                }
                None
            }
            ReviewMsg::Next => {
                let pending = self.pending_rows().len();
                if self.queue_position + 1 >= pending {
                    return None;
                }
                self.queue_position += 1;
                self.open_queue_entry()
            }
            ReviewMsg::Previous => {
                if self.queue_position == 0 {
                    return None;
                }
                self.queue_position -= 1;
                self.open_queue_entry()
            }
            ReviewMsg::Bulk(action) => {
                if self.bulk_pending {
                    debug!(?action, "Bulk action already running");
                    return None;
                }
                let ids = self.table.stage_bulk();
                if ids.is_empty() {
                    return None;
                }
                if self.validator.trim().is_empty() {
                    self.submission = SubmitStatus::Failed(FeedbackError::MissingValidator.to_string());
                    return None;
                }
                self.bulk_pending = true;
                Some(Effect::BulkFeedback {
                    action,
                    ids,
                    validated_by: self.validator.trim().to_string(),
                })
            }
            ReviewMsg::BulkFinished(outcome) => {
                self.bulk_pending = false;
                self.table.clear_selection();
                if !outcome.succeeded.is_empty() {
                    if let Err(e) = self.preferences.set_validator_name(&self.validator) {
                        warn!(error = %e, "Failed to persist validator name");
                    }
                }
                self.last_bulk = Some(outcome);
                Some(self.refresh())
            }
        }
    }

    fn on_completion(completion: Completion) -> Option<ReviewMsg> {
        match completion {
            Completion::PredictionsLoaded(result) => Some(match result {
                Ok(page) => ReviewMsg::RowsLoaded(page),
                Err(e) => ReviewMsg::LoadFailed(e.to_string()),
            }),
            Completion::PredictionLoaded { token, result } => Some(match result {
                Ok(prediction) => ReviewMsg::DetailLoaded {
                    token,
                    prediction: Box::new(prediction),
                },
                Err(e) => ReviewMsg::DetailFailed {
                    token,
                    error: e.to_string(),
                },
            }),
            Completion::FeedbackSubmitted { token, result, .. } => Some(match result {
                Ok(ack) => ReviewMsg::FeedbackSaved { token, ack },
                Err(e) => ReviewMsg::FeedbackFailed {
                    token,
                    error: e.to_string(),
                },
            }),
            Completion::BulkFinished(outcome) => Some(ReviewMsg::BulkFinished(outcome)),
            _ => None,
        }
    }
}
