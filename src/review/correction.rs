//! Secondary-diagnosis correction diff and feedback construction

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CorrectedCode, CorrectionAction, DiagnosisCode, FeedbackSubmission, FeedbackType};

/// Feedback validation failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedbackError {
    #[error("Validator name is required")]
    MissingValidator,

    #[error("Corrected main diagnosis code is required for a rejection")]
    MissingMainCode,

    #[error("A comment explaining the rejection is required")]
    MissingComment,
}

/// One row of the reviewer's working list of secondary diagnoses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditedDiagnosis {
    pub code: String,
    pub name: String,
    /// Code this row had when the editor opened; `None` for new rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_code: Option<String>,
}

impl EditedDiagnosis {
    /// A row added by the reviewer
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            original_code: None,
        }
    }

    /// Blank row for the "add" button
    pub fn blank() -> Self {
        Self::new("", "")
    }

    fn is_blank(&self) -> bool {
        self.code.trim().is_empty()
    }
}

/// Pre-fill the working list from the predicted secondary diagnoses
pub fn seed_edits(original: &[DiagnosisCode]) -> Vec<EditedDiagnosis> {
    original
        .iter()
        .map(|d| EditedDiagnosis {
            code: d.code.clone(),
            name: d.name.clone(),
            original_code: Some(d.code.clone()),
        })
        .collect()
}

/// Compute the tagged correction list
///
/// Edited rows come first in their order, then one `removed` entry per
/// original code no edited row refers to. Rows with a blank code are
/// treated as deleted.
pub fn diff_secondary(original: &[DiagnosisCode], edited: &[EditedDiagnosis]) -> Vec<CorrectedCode> {
    let live: Vec<&EditedDiagnosis> = edited.iter().filter(|e| !e.is_blank()).collect();

    let mut corrections: Vec<CorrectedCode> = live
        .iter()
        .map(|e| match e.original_code.as_deref() {
            Some(orig) if orig != e.code => CorrectedCode {
                action: CorrectionAction::Modified,
                code: e.code.clone(),
                name: Some(e.name.clone()),
                original_code: Some(orig.to_string()),
            },
            Some(_) => CorrectedCode {
                action: CorrectionAction::Kept,
                code: e.code.clone(),
                name: Some(e.name.clone()),
                original_code: None,
            },
            None => CorrectedCode {
                action: CorrectionAction::Added,
                code: e.code.clone(),
                name: Some(e.name.clone()),
                original_code: None,
            },
        })
        .collect();

    for orig in original {
        let still_present = live
            .iter()
            .any(|e| e.original_code.as_deref() == Some(orig.code.as_str()) || e.code == orig.code);
        if !still_present {
            corrections.push(CorrectedCode {
                action: CorrectionAction::Removed,
                code: orig.code.clone(),
                name: None,
                original_code: None,
            });
        }
    }

    corrections
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn require_validator(validated_by: &str) -> Result<String, FeedbackError> {
    non_blank(Some(validated_by)).ok_or(FeedbackError::MissingValidator)
}

impl FeedbackSubmission {
    /// Approve the prediction as is
    pub fn approve(validated_by: &str, comment: Option<&str>) -> Result<Self, FeedbackError> {
        Ok(Self {
            validated_by: require_validator(validated_by)?,
            feedback_type: FeedbackType::Approved,
            corrected_main_code: None,
            corrected_main_name: None,
            corrected_secondary: Vec::new(),
            feedback_comment: non_blank(comment),
        })
    }

    /// Bare verdict for a bulk action: no corrections, no comment
    pub fn bulk(validated_by: &str, feedback_type: FeedbackType) -> Result<Self, FeedbackError> {
        Ok(Self {
            validated_by: require_validator(validated_by)?,
            feedback_type,
            corrected_main_code: None,
            corrected_main_name: None,
            corrected_secondary: Vec::new(),
            feedback_comment: None,
        })
    }

    /// Reject with a corrected main diagnosis and secondary diff
    pub fn reject(
        validated_by: &str,
        main_code: &str,
        main_name: &str,
        original: &[DiagnosisCode],
        edited: &[EditedDiagnosis],
        comment: &str,
    ) -> Result<Self, FeedbackError> {
        let validated_by = require_validator(validated_by)?;
        let main_code = non_blank(Some(main_code)).ok_or(FeedbackError::MissingMainCode)?;
        let comment = non_blank(Some(comment)).ok_or(FeedbackError::MissingComment)?;

        Ok(Self {
            validated_by,
            feedback_type: FeedbackType::Rejected,
            corrected_main_code: Some(main_code),
            corrected_main_name: non_blank(Some(main_name)),
            corrected_secondary: diff_secondary(original, edited),
            feedback_comment: Some(comment),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(c: &str) -> DiagnosisCode {
        DiagnosisCode::new(c, format!("Name {}", c))
    }

    fn actions(diff: &[CorrectedCode]) -> Vec<(CorrectionAction, &str)> {
        diff.iter().map(|c| (c.action, c.code.as_str())).collect()
    }

    #[test]
    fn test_modified_carries_original_code() {
        let original = vec![code("E10.9")];
        let mut edited = seed_edits(&original);
        edited[0].code = "E11.9".to_string();

        let diff = diff_secondary(&original, &edited);
        assert_eq!(actions(&diff), vec![(CorrectionAction::Modified, "E11.9")]);
        assert_eq!(diff[0].original_code.as_deref(), Some("E10.9"));
    }

    #[test]
    fn test_untouched_seed_is_all_kept() {
        let original = vec![code("A"), code("B")];
        let diff = diff_secondary(&original, &seed_edits(&original));
        assert_eq!(
            actions(&diff),
            vec![(CorrectionAction::Kept, "A"), (CorrectionAction::Kept, "B")]
        );
    }

    #[test]
    fn test_blank_rows_are_skipped_and_count_as_removed() {
        let original = vec![code("A")];
        let mut edited = seed_edits(&original);
        edited[0].code = "  ".to_string();
        edited.push(EditedDiagnosis::blank());

        let diff = diff_secondary(&original, &edited);
        assert_eq!(actions(&diff), vec![(CorrectionAction::Removed, "A")]);
    }

    #[test]
    fn test_readding_a_removed_code_matches_by_code() {
        let original = vec![code("A")];
        let edited = vec![EditedDiagnosis::new("A", "again")];
        let diff = diff_secondary(&original, &edited);
        assert_eq!(actions(&diff), vec![(CorrectionAction::Added, "A")]);
    }

    #[test]
    fn test_approve_requires_validator() {
        assert_eq!(
            FeedbackSubmission::approve("   ", None),
            Err(FeedbackError::MissingValidator)
        );
        let ok = FeedbackSubmission::approve(" Dr. Novak ", Some("")).unwrap();
        assert_eq!(ok.validated_by, "Dr. Novak");
        assert!(ok.feedback_comment.is_none());
    }

    #[test]
    fn test_reject_validation_order() {
        assert_eq!(
            FeedbackSubmission::reject("", "J18.9", "", &[], &[], "why"),
            Err(FeedbackError::MissingValidator)
        );
        assert_eq!(
            FeedbackSubmission::reject("Dr. Novak", "", "", &[], &[], "why"),
            Err(FeedbackError::MissingMainCode)
        );
        assert_eq!(
            FeedbackSubmission::reject("Dr. Novak", "J18.9", "", &[], &[], " "),
            Err(FeedbackError::MissingComment)
        );
    }

    #[test]
    fn test_reject_builds_diff() {
        let original = vec![code("A"), code("B")];
        let edited = vec![
            EditedDiagnosis {
                code: "A".to_string(),
                name: "Name A".to_string(),
                original_code: Some("A".to_string()),
            },
            EditedDiagnosis::new("C", "Name C"),
        ];
        let submission =
            FeedbackSubmission::reject("Dr. Novak", "J15.9", "Bacterial pneumonia", &original, &edited, "Wrong organism")
                .unwrap();

        assert_eq!(submission.feedback_type, FeedbackType::Rejected);
        assert_eq!(submission.corrected_main_code.as_deref(), Some("J15.9"));
        assert_eq!(submission.corrected_secondary.len(), 3);
    }
}
