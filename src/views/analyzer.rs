//! Coder workspace: analyze text, inspect suggestions, repair and resubmit.

use tracing::{debug, warn};

use super::{Completion, Effect, SubmitStatus, View};
use crate::domain::{CaseResult, Diagnosis};
use crate::highlight::{collect_segments, Segment};
use crate::ranking::{set_as_principal, RankedList};
use crate::repair::{FormError, RepairEdit, RepairForm};

/// Reason attached to diagnoses picked by hand
const MANUAL_REASON: &str = "Manual selection";

/// Where the current analysis stands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AnalysisStatus {
    #[default]
    Idle,
    Pending {
        token: u64,
    },
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzerMsg {
    Analyze(String),
    AnalysisLoaded { token: u64, result: Box<CaseResult> },
    AnalysisFailed { token: u64, error: String },
    Clear,
    HoverHighlight(Option<String>),
    TogglePrincipal,
    SetPrincipal(String),
    AddManualDiagnosis { code: String, name: String },
    Repair(RepairEdit),
    SubmitRepair,
    RepairSaved,
    RepairFailed(String),
}

/// Coder workspace state
#[derive(Debug, Default)]
pub struct AnalyzerView {
    text: String,
    status: AnalysisStatus,
    last_token: u64,
    result: Option<CaseResult>,
    active_highlight: Option<String>,
    principal_expanded: bool,
    principal: Vec<Diagnosis>,
    repair: Option<RepairForm>,
    submit: SubmitStatus,
    edit_error: Option<FormError>,
}

impl AnalyzerView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> &AnalysisStatus {
        &self.status
    }

    pub fn result(&self) -> Option<&CaseResult> {
        self.result.as_ref()
    }

    pub fn active_highlight(&self) -> Option<&str> {
        self.active_highlight.as_deref()
    }

    /// Analyzed text split by the result's highlights
    pub fn segments(&self) -> Vec<Segment<'_>> {
        match &self.result {
            Some(result) => collect_segments(&self.text, &result.highlights),
            None => Vec::new(),
        }
    }

    /// Principal candidates, ranked, with the current collapse state
    pub fn ranked_principal(&self) -> RankedList<'_, Diagnosis> {
        RankedList::new(&self.principal, true).with_expanded(self.principal_expanded)
    }

    /// Principal candidates in list order; the first is the chosen principal
    pub fn principal(&self) -> &[Diagnosis] {
        &self.principal
    }

    pub fn repair(&self) -> Option<&RepairForm> {
        self.repair.as_ref()
    }

    pub fn submit_status(&self) -> &SubmitStatus {
        &self.submit
    }

    /// Error from the most recent rejected form edit
    pub fn edit_error(&self) -> Option<&FormError> {
        self.edit_error.as_ref()
    }

    fn is_pending(&self, token: u64) -> bool {
        self.status == AnalysisStatus::Pending { token }
    }

    fn load(&mut self, result: CaseResult) {
        self.principal = result.diagnoses.clone();
        self.repair = Some(RepairForm::hydrate(&result));
        self.result = Some(result);
        self.status = AnalysisStatus::Ready;
        self.principal_expanded = false;
        self.active_highlight = None;
        self.submit = SubmitStatus::Idle;
        self.edit_error = None;
    }
}

impl View for AnalyzerView {
    type Msg = AnalyzerMsg;

    fn update(&mut self, msg: AnalyzerMsg) -> Option<Effect> {
        match msg {
            AnalyzerMsg::Analyze(text) => {
                if text.trim().is_empty() {
                    return None;
                }
                self.last_token += 1;
                let token = self.last_token;
                debug!(token, text_len = text.len(), "Starting analysis");

                // The previous result is dropped as soon as a new analysis starts
                self.result = None;
                self.repair = None;
                self.principal.clear();
                self.active_highlight = None;
                self.submit = SubmitStatus::Idle;
                self.text = text.clone();
                self.status = AnalysisStatus::Pending { token };
                Some(Effect::Analyze { token, text })
            }
            AnalyzerMsg::AnalysisLoaded { token, result } => {
                if !self.is_pending(token) {
                    debug!(token, "Dropping stale analysis result");
                    return None;
                }
                self.load(*result);
                None
            }
            AnalyzerMsg::AnalysisFailed { token, error } => {
                if self.is_pending(token) {
                    warn!(token, %error, "Analysis failed");
                    self.status = AnalysisStatus::Failed(error);
                }
                None
            }
            AnalyzerMsg::Clear => {
                let last_token = self.last_token;
                *self = Self {
                    last_token,
                    ..Self::default()
                };
                None
            }
            AnalyzerMsg::HoverHighlight(id) => {
                self.active_highlight = id;
                None
            }
            AnalyzerMsg::TogglePrincipal => {
                self.principal_expanded = !self.principal_expanded;
                None
            }
            AnalyzerMsg::SetPrincipal(id) => {
                if let Some(reordered) = set_as_principal(&self.principal, &id) {
                    if let (Some(form), Some(first)) = (self.repair.as_mut(), reordered.first()) {
                        form.set_main_diagnosis(first.code.clone());
                    }
                    self.principal = reordered;
                }
                None
            }
            AnalyzerMsg::AddManualDiagnosis { code, name } => {
                if self.result.is_some() && !self.principal.iter().any(|d| d.code == code) {
                    self.principal.push(Diagnosis::manual(code, name, MANUAL_REASON));
                }
                None
            }
            AnalyzerMsg::Repair(edit) => {
                if let Some(form) = self.repair.as_mut() {
                    self.edit_error = edit.apply(form).err();
                }
                None
            }
            AnalyzerMsg::SubmitRepair => {
                if self.submit.is_pending() {
                    return None;
                }
                let form = self.repair.as_ref()?;
                self.submit = SubmitStatus::Pending;
                Some(Effect::SubmitRepair(Box::new(form.payload().clone())))
            }
            AnalyzerMsg::RepairSaved => {
                if self.submit.is_pending() {
                    self.submit = SubmitStatus::Saved;
                }
                None
            }
            AnalyzerMsg::RepairFailed(error) => {
                if self.submit.is_pending() {
                    warn!(%error, "Repair submission failed");
                    self.submit = SubmitStatus::Failed(error);
                }
                None
            }
        }
    }

    fn on_completion(completion: Completion) -> Option<AnalyzerMsg> {
        match completion {
            Completion::Analyzed { token, result } => Some(match result {
                Ok(result) => AnalyzerMsg::AnalysisLoaded {
                    token,
                    result: Box::new(result),
                },
                Err(e) => AnalyzerMsg::AnalysisFailed {
                    token,
                    error: e.to_string(),
                },
            }),
            Completion::RepairSubmitted(result) => Some(match result {
                Ok(_) => AnalyzerMsg::RepairSaved,
                Err(e) => AnalyzerMsg::RepairFailed(e.to_string()),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::demo_case;

    fn loaded_view() -> AnalyzerView {
        let mut view = AnalyzerView::new();
        view.update(AnalyzerMsg::Analyze("Patient has fever".to_string()));
        view.update(AnalyzerMsg::AnalysisLoaded {
            token: 1,
            result: Box::new(demo_case(Vec::new())),
        });
        view
    }

    #[test]
    fn test_blank_text_is_not_analyzed() {
        let mut view = AnalyzerView::new();
        assert!(view.update(AnalyzerMsg::Analyze("   ".to_string())).is_none());
        assert_eq!(view.status(), &AnalysisStatus::Idle);
    }

    #[test]
    fn test_analyze_issues_increasing_tokens() {
        let mut view = AnalyzerView::new();
        let first = view.update(AnalyzerMsg::Analyze("a b".to_string()));
        let second = view.update(AnalyzerMsg::Analyze("c d".to_string()));
        assert!(matches!(first, Some(Effect::Analyze { token: 1, .. })));
        assert!(matches!(second, Some(Effect::Analyze { token: 2, .. })));
    }

    #[test]
    fn test_load_hydrates_repair_form() {
        let view = loaded_view();
        assert_eq!(view.status(), &AnalysisStatus::Ready);
        let form = view.repair().unwrap();
        assert_eq!(form.payload().main_diagnosis, "J18.9");
        assert_eq!(view.ranked_principal().visible().len(), 1);
    }

    #[test]
    fn test_set_principal_updates_main_diagnosis() {
        let mut view = loaded_view();
        view.update(AnalyzerMsg::SetPrincipal("d3".to_string()));
        assert_eq!(view.principal()[0].id, "d3");
        assert_eq!(view.repair().unwrap().payload().main_diagnosis, "E11.9");
    }

    #[test]
    fn test_manual_diagnosis_skips_duplicate_code() {
        let mut view = loaded_view();
        view.update(AnalyzerMsg::AddManualDiagnosis {
            code: "J18.9".to_string(),
            name: "dup".to_string(),
        });
        assert_eq!(view.principal().len(), 3);
        view.update(AnalyzerMsg::AddManualDiagnosis {
            code: "I10".to_string(),
            name: "Hypertension".to_string(),
        });
        assert_eq!(view.principal().len(), 4);
        assert!(view.principal()[3].is_custom());
    }

    #[test]
    fn test_invalid_edit_is_recorded() {
        let mut view = loaded_view();
        view.update(AnalyzerMsg::Repair(RepairEdit::PatientWeight("heavy".to_string())));
        assert!(view.edit_error().is_some());
        assert_eq!(view.repair().unwrap().payload().patient_weight, Some(82));
    }

    #[test]
    fn test_clear_drops_in_flight_result() {
        let mut view = AnalyzerView::new();
        view.update(AnalyzerMsg::Analyze("some text here".to_string()));
        view.update(AnalyzerMsg::Clear);
        view.update(AnalyzerMsg::AnalysisLoaded {
            token: 1,
            result: Box::new(demo_case(Vec::new())),
        });
        assert!(view.result().is_none());
        assert_eq!(view.status(), &AnalysisStatus::Idle);
    }
}
