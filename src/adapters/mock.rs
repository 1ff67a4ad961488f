//! Local mock of the coding service.
//!
//! Analysis returns a fixed pneumonia case with keyword-driven highlights.
//! Predictions live in memory, so feedback submitted through the mock is
//! visible in later list calls.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::{ApiError, CodingApi, PredictionQuery};
use crate::domain::{
    AgeUnit, CaseResult, CodeSearchResult, CoderCaseData, Diagnosis, DiagnosisCode, FeedbackAck,
    FeedbackSubmission, PaginatedPredictions, Prediction, PredictionListItem, Procedure, RepairAck, Sex, Source,
    TherapeuticDays,
};
use crate::highlight::HighlightSpan;

/// Words that always get a highlight
const KEYWORDS: [&str; 4] = ["fever", "pain", "fracture", "diabetes"];

/// Built-in ICD-10 sample: (code, name, chapter, category)
const CODES: &[(&str, &str, &str, &str)] = &[
    ("E10.9", "Type 1 diabetes mellitus without complications", "IV", "E10"),
    ("E11.9", "Type 2 diabetes mellitus without complications", "IV", "E11"),
    ("E11.65", "Type 2 diabetes mellitus with hyperglycemia", "IV", "E11"),
    ("I10", "Essential (primary) hypertension", "IX", "I10"),
    ("I21.9", "Acute myocardial infarction, unspecified", "IX", "I21"),
    ("I50.9", "Heart failure, unspecified", "IX", "I50"),
    ("J15.9", "Unspecified bacterial pneumonia", "X", "J15"),
    ("J18.9", "Pneumonia, unspecified organism", "X", "J18"),
    ("J44.1", "Chronic obstructive pulmonary disease with acute exacerbation", "X", "J44"),
    ("N39.0", "Urinary tract infection, site not specified", "XIV", "N39"),
    ("R06.02", "Shortness of breath", "XVIII", "R06"),
    ("R50.9", "Fever, unspecified", "XVIII", "R50"),
    ("R52", "Pain, unspecified", "XVIII", "R52"),
    ("S72.00", "Fracture of unspecified part of neck of femur", "XIX", "S72"),
    ("S82.80", "Fracture of other parts of lower leg", "XIX", "S82"),
    ("W19", "Unspecified fall", "XX", "W19"),
];

/// Highlight every tenth word and any word containing a keyword
///
/// Texts of five words or fewer get no highlights. Offsets are characters.
pub fn keyword_highlights(text: &str) -> Vec<HighlightSpan> {
    let mut words = Vec::new();
    let mut start: Option<usize> = None;
    let mut char_index = 0;

    for c in text.chars() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                words.push((s, char_index));
            }
        } else if start.is_none() {
            start = Some(char_index);
        }
        char_index += 1;
    }
    if let Some(s) = start {
        words.push((s, char_index));
    }

    if words.len() <= 5 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    words
        .iter()
        .enumerate()
        .filter(|(index, (s, e))| {
            let word: String = chars[*s..*e].iter().collect::<String>().to_lowercase();
            index % 10 == 0 || KEYWORDS.iter().any(|k| word.contains(k))
        })
        .map(|(index, (s, e))| HighlightSpan::new(format!("hl-{}", index), *s as i64, *e as i64))
        .collect()
}

/// The fixed demo case
pub fn demo_case(highlights: Vec<HighlightSpan>) -> CaseResult {
    let shortness = Diagnosis::new("d2", "R06.02", "Shortness of breath")
        .with_probability(0.88)
        .with_source(Source::Ai)
        .with_reason("Patient reported difficulty breathing upon admission.");
    let diabetes = Diagnosis::new("d3", "E11.9", "Type 2 diabetes mellitus without complications")
        .with_probability(0.75)
        .with_source(Source::Human)
        .with_reason("History of T2DM noted in patient records.");

    let mut vaccination = Procedure::new("p1", "3E0234Z", "Introduction of Serum/Toxoid into Muscle");
    vaccination.probability = Some(0.65);
    vaccination.source = Some(Source::Ai);
    vaccination.amount = Some(1);

    CaseResult {
        main_diagnosis: Some("J18.9".to_string()),
        hosp_end: Some("1".to_string()),
        patient_age: Some(65),
        patient_age_unit: Some(AgeUnit::Years),
        patient_weight: Some(82),
        patient_sex: Some(Sex::Male),
        ventilation_hours: Some(0),
        case_year: Some(2023),
        hosp_days: Some(5),
        primary_expenses: Some(15000.0),
        hospital_id: Some("12345678".to_string()),
        other_diagnoses: vec![
            Diagnosis {
                weight: Some(1.0),
                ..shortness.clone()
            },
            Diagnosis {
                weight: Some(1.0),
                ..diabetes.clone()
            },
        ],
        procedures: vec![vaccination],
        critical_items: Vec::new(),
        therapeutic_days: Some(TherapeuticDays::default()),
        rehabilitation: None,
        diagnoses: vec![
            Diagnosis::new("d1", "J18.9", "Pneumonia, unspecified organism")
                .with_probability(0.92)
                .with_source(Source::Ai)
                .with_reason("Chest X-ray shows consolidation consistent with pneumonia."),
            shortness,
            diabetes,
        ],
        drg_code: "194".to_string(),
        drg_name: "Simple Pneumonia & Pleurisy w/ CC".to_string(),
        reliability_score: 0.85,
        los: 4.2,
        rv: 1.2,
        revenue: 5400.0,
        cost: 3200.0,
        highlights,
    }
}

fn seed_prediction(
    n: u32,
    main: DiagnosisCode,
    secondary: Vec<DiagnosisCode>,
    hours_ago: i64,
) -> Prediction {
    Prediction {
        prediction_id: format!("pred-{:03}", n),
        case_id: format!("case-{:03}", n),
        pac_id: Some(format!("PAC-{}", 1000 + n)),
        selected_codes: std::iter::once(main.code.clone())
            .chain(secondary.iter().map(|d| d.code.clone()))
            .collect(),
        step1_reasoning: "Candidate codes selected from discharge summary.".to_string(),
        main_diagnosis: main,
        secondary_diagnoses: secondary,
        model_used: "mock".to_string(),
        processing_time: 1200,
        validated: false,
        validated_at: None,
        validated_by: None,
        feedback_type: None,
        feedback_comment: None,
        corrections: None,
        created_at: Utc::now() - chrono::Duration::hours(hours_ago),
    }
}

fn seed_predictions() -> Vec<Prediction> {
    vec![
        seed_prediction(
            1,
            DiagnosisCode::new("J18.9", "Pneumonia, unspecified organism").with_confidence(0.92),
            vec![
                DiagnosisCode::new("R06.02", "Shortness of breath").with_confidence(0.88),
                DiagnosisCode::new("E11.9", "Type 2 diabetes mellitus without complications").with_confidence(0.75),
            ],
            1,
        ),
        seed_prediction(
            2,
            DiagnosisCode::new("I21.9", "Acute myocardial infarction, unspecified").with_confidence(0.81),
            vec![DiagnosisCode::new("I10", "Essential (primary) hypertension").with_confidence(0.7)],
            5,
        ),
        seed_prediction(
            3,
            DiagnosisCode::new("S72.00", "Fracture of unspecified part of neck of femur").with_confidence(0.67),
            vec![DiagnosisCode::new("W19", "Unspecified fall").with_confidence(0.5)],
            26,
        ),
        seed_prediction(
            4,
            DiagnosisCode::new("E11.65", "Type 2 diabetes mellitus with hyperglycemia").with_confidence(0.58),
            Vec::new(),
            49,
        ),
    ]
}

/// In-process coding service
#[derive(Debug)]
pub struct MockApi {
    predictions: Mutex<Vec<Prediction>>,
    latency: Duration,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApi {
    /// Mock with demo predictions and no latency
    pub fn new() -> Self {
        Self::with_predictions(seed_predictions())
    }

    pub fn with_predictions(predictions: Vec<Prediction>) -> Self {
        Self {
            predictions: Mutex::new(predictions),
            latency: Duration::ZERO,
        }
    }

    /// Simulated network delay for every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn wait(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Prediction>> {
        // A poisoned lock only means a panicking test thread; the data is still usable
        self.predictions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CodingApi for MockApi {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze(&self, text: &str) -> Result<CaseResult, ApiError> {
        self.wait().await;
        let highlights = keyword_highlights(text);
        debug!(count = highlights.len(), "Mock analysis produced highlights");
        Ok(demo_case(highlights))
    }

    async fn submit_repair(&self, _payload: &CoderCaseData) -> Result<RepairAck, ApiError> {
        self.wait().await;
        Ok(RepairAck {
            status: "ok".to_string(),
        })
    }

    async fn list_predictions(&self, query: PredictionQuery) -> Result<PaginatedPredictions, ApiError> {
        self.wait().await;
        let predictions = self.lock();

        let mut rows: Vec<PredictionListItem> = predictions
            .iter()
            .filter(|p| query.validated.map_or(true, |v| p.validated == v))
            .map(PredictionListItem::from)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let limit = query.limit.max(1);
        let total = rows.len() as u64;
        let pages = rows.len().div_ceil(limit as usize) as u32;
        let offset = (query.page.max(1) as usize - 1) * limit as usize;

        Ok(PaginatedPredictions {
            predictions: rows.into_iter().skip(offset).take(limit as usize).collect(),
            total,
            page: query.page.max(1),
            pages,
        })
    }

    async fn get_prediction(&self, id: &str) -> Result<Prediction, ApiError> {
        self.wait().await;
        self.lock()
            .iter()
            .find(|p| p.prediction_id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    async fn submit_feedback(&self, id: &str, feedback: &FeedbackSubmission) -> Result<FeedbackAck, ApiError> {
        self.wait().await;
        let mut predictions = self.lock();
        let prediction = predictions
            .iter_mut()
            .find(|p| p.prediction_id == id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;

        let now = Utc::now();
        prediction.validated = true;
        prediction.validated_at = Some(now);
        prediction.validated_by = Some(feedback.validated_by.clone());
        prediction.feedback_type = Some(feedback.feedback_type);
        prediction.feedback_comment = feedback.feedback_comment.clone();
        prediction.corrections = Some(serde_json::json!({
            "corrected_main": feedback.corrected_main_code.as_ref().map(|code| serde_json::json!({
                "code": code,
                "name": feedback.corrected_main_name,
            })),
            "corrected_secondary": feedback.corrected_secondary,
        }));

        Ok(FeedbackAck {
            id: id.to_string(),
            validated: true,
            feedback_type: Some(feedback.feedback_type),
            validated_by: Some(feedback.validated_by.clone()),
            validated_at: Some(now),
        })
    }

    async fn search_codes(&self, query: &str, limit: usize) -> Result<Vec<CodeSearchResult>, ApiError> {
        self.wait().await;
        let needle = query.trim().to_lowercase();

        Ok(CODES
            .iter()
            .filter(|(code, name, _, _)| {
                code.to_lowercase().starts_with(&needle) || name.to_lowercase().contains(&needle)
            })
            .take(limit)
            .map(|(code, name, chapter, category)| CodeSearchResult {
                code: code.to_string(),
                name: name.to_string(),
                chapter: Some(chapter.to_string()),
                category: Some(category.to_string()),
            })
            .collect())
    }
}
