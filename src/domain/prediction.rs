//! Prediction records for the review dashboard.
//!
//! These mirror the prediction service's JSON (snake_case).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A predicted diagnosis code with model confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisCode {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl DiagnosisCode {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            confidence: None,
            reasoning: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Reviewer verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    Approved,
    Rejected,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Approved => "approved",
            FeedbackType::Rejected => "rejected",
        }
    }
}

/// Full prediction detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction_id: String,
    pub case_id: String,
    #[serde(default)]
    pub pac_id: Option<String>,

    /// Candidate codes chosen in the first model step
    #[serde(default)]
    pub selected_codes: Vec<String>,
    #[serde(default)]
    pub step1_reasoning: String,

    pub main_diagnosis: DiagnosisCode,
    #[serde(default)]
    pub secondary_diagnoses: Vec<DiagnosisCode>,

    #[serde(default)]
    pub model_used: String,
    /// Processing time in milliseconds
    #[serde(default)]
    pub processing_time: u64,

    #[serde(default)]
    pub validated: bool,
    #[serde(default)]
    pub validated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub validated_by: Option<String>,
    #[serde(default)]
    pub feedback_type: Option<FeedbackType>,
    #[serde(default)]
    pub feedback_comment: Option<String>,
    #[serde(default)]
    pub corrections: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,
}

/// One row of the prediction list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionListItem {
    pub id: String,
    pub case_id: String,
    #[serde(default)]
    pub pac_id: Option<String>,
    pub main_code: String,
    pub main_name: String,
    pub main_confidence: f64,
    pub validated: bool,
    #[serde(default)]
    pub feedback_type: Option<FeedbackType>,
    pub created_at: DateTime<Utc>,
}

impl From<&Prediction> for PredictionListItem {
    fn from(prediction: &Prediction) -> Self {
        Self {
            id: prediction.prediction_id.clone(),
            case_id: prediction.case_id.clone(),
            pac_id: prediction.pac_id.clone(),
            main_code: prediction.main_diagnosis.code.clone(),
            main_name: prediction.main_diagnosis.name.clone(),
            main_confidence: prediction.main_diagnosis.confidence.unwrap_or(0.0),
            validated: prediction.validated,
            feedback_type: prediction.feedback_type,
            created_at: prediction.created_at,
        }
    }
}

/// A page of prediction rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedPredictions {
    pub predictions: Vec<PredictionListItem>,
    pub total: u64,
    pub page: u32,
    pub pages: u32,
}

/// Kind of change recorded for a secondary diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionAction {
    Added,
    Removed,
    Modified,
    Kept,
}

/// A single secondary-diagnosis correction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectedCode {
    pub action: CorrectionAction,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_code: Option<String>,
}

/// Reviewer feedback on one prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub validated_by: String,
    pub feedback_type: FeedbackType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_main_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_main_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corrected_secondary: Vec<CorrectedCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_comment: Option<String>,
}

/// Server acknowledgement of feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAck {
    pub id: String,
    pub validated: bool,
    #[serde(default)]
    pub feedback_type: Option<FeedbackType>,
    #[serde(default)]
    pub validated_by: Option<String>,
    #[serde(default)]
    pub validated_at: Option<DateTime<Utc>>,
}

/// Server acknowledgement of a repair submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairAck {
    #[serde(default)]
    pub status: String,
}

/// A code-search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSearchResult {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_item_from_server_json() {
        let item: PredictionListItem = serde_json::from_str(
            r#"{
                "id": "p1",
                "case_id": "c1",
                "pac_id": null,
                "main_code": "J18.9",
                "main_name": "Pneumonia",
                "main_confidence": 0.92,
                "validated": false,
                "created_at": "2025-01-15T10:00:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(item.main_code, "J18.9");
        assert!(item.pac_id.is_none());
        assert!(item.feedback_type.is_none());
    }

    #[test]
    fn test_feedback_submission_omits_empty_fields() {
        let submission = FeedbackSubmission {
            validated_by: "Dr. Novak".to_string(),
            feedback_type: FeedbackType::Approved,
            corrected_main_code: None,
            corrected_main_name: None,
            corrected_secondary: Vec::new(),
            feedback_comment: None,
        };

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["feedback_type"], "approved");
        assert!(json.get("corrected_secondary").is_none());
        assert!(json.get("feedback_comment").is_none());
    }

    #[test]
    fn test_corrected_code_serialization() {
        let corrected = CorrectedCode {
            action: CorrectionAction::Modified,
            code: "E11.9".to_string(),
            name: Some("Type 2 diabetes".to_string()),
            original_code: Some("E10.9".to_string()),
        };

        let json = serde_json::to_value(&corrected).unwrap();
        assert_eq!(json["action"], "modified");
        assert_eq!(json["original_code"], "E10.9");
    }
}
