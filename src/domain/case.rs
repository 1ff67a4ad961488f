//! Case records for the coder workspace.
//!
//! `CaseResult` is what the analysis service returns; `CoderCaseData` is the
//! editable subset that is sent back as a repair.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::highlight::HighlightSpan;

/// Id prefix for diagnoses picked by hand from code search
pub const CUSTOM_ID_PREFIX: &str = "custom-";

/// Who proposed an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Suggested by the model
    Ai,
    /// Entered or confirmed by a coder
    Human,
}

/// A diagnosis (ICD-10 code) attached to a case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    /// Client or server identifier, used for list keys and highlight linking
    pub id: String,
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl Diagnosis {
    /// Create a diagnosis with just id, code and name
    pub fn new(id: impl Into<String>, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            name: name.into(),
            probability: None,
            reason: None,
            source: None,
            severity: None,
            cc_level: None,
            weight: None,
        }
    }

    /// Set the model probability
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability);
        self
    }

    /// Set the source
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the reasoning text
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Empty row for the repair form
    pub fn placeholder() -> Self {
        let mut diagnosis = Self::new(new_row_id("diag"), "", "");
        diagnosis.cc_level = Some(String::new());
        diagnosis.source = Some(Source::Human);
        diagnosis
    }

    /// Diagnosis picked by hand from code search
    pub fn manual(code: impl Into<String>, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(new_row_id("custom"), code, name)
            .with_probability(1.0)
            .with_source(Source::Human)
            .with_reason(reason)
    }

    /// Whether this entry was added by hand rather than suggested
    pub fn is_custom(&self) -> bool {
        self.id.starts_with(CUSTOM_ID_PREFIX)
    }
}

/// A procedure attached to a case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Procedure {
    pub id: String,
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Procedure {
    pub fn new(id: impl Into<String>, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            name: name.into(),
            probability: None,
            source: None,
            amount: None,
            date: None,
        }
    }

    /// Empty row for the repair form
    pub fn placeholder() -> Self {
        let mut procedure = Self::new(new_row_id("proc"), "", "");
        procedure.amount = Some(1);
        procedure.source = Some(Source::Human);
        procedure
    }
}

/// A separately billed critical item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalItem {
    pub id: String,
    pub code: String,
    pub amount: u32,
}

impl CriticalItem {
    /// Empty row for the repair form
    pub fn placeholder() -> Self {
        Self {
            id: new_row_id("crit"),
            code: String::new(),
            amount: 1,
        }
    }
}

/// Mint a fresh client-local row id
pub fn new_row_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

/// The fixed set of therapeutic-day counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TherapeuticDay {
    Radiation,
    Liver,
    Chest,
    Psychotherapy,
    ChestDrainage,
    Skull,
    Eye,
    Burn,
    Heart,
    Tissue,
    Veins,
    Pelvis,
    Blood,
    Orthopedic,
}

impl TherapeuticDay {
    /// All counters in form order
    pub const ALL: [TherapeuticDay; 14] = [
        TherapeuticDay::Radiation,
        TherapeuticDay::Liver,
        TherapeuticDay::Chest,
        TherapeuticDay::Psychotherapy,
        TherapeuticDay::ChestDrainage,
        TherapeuticDay::Skull,
        TherapeuticDay::Eye,
        TherapeuticDay::Burn,
        TherapeuticDay::Heart,
        TherapeuticDay::Tissue,
        TherapeuticDay::Veins,
        TherapeuticDay::Pelvis,
        TherapeuticDay::Blood,
        TherapeuticDay::Orthopedic,
    ];

    /// JSON key
    pub fn key(&self) -> &'static str {
        match self {
            TherapeuticDay::Radiation => "radiation",
            TherapeuticDay::Liver => "liver",
            TherapeuticDay::Chest => "chest",
            TherapeuticDay::Psychotherapy => "psychotherapy",
            TherapeuticDay::ChestDrainage => "chestDrainage",
            TherapeuticDay::Skull => "skull",
            TherapeuticDay::Eye => "eye",
            TherapeuticDay::Burn => "burn",
            TherapeuticDay::Heart => "heart",
            TherapeuticDay::Tissue => "tissue",
            TherapeuticDay::Veins => "veins",
            TherapeuticDay::Pelvis => "pelvis",
            TherapeuticDay::Blood => "blood",
            TherapeuticDay::Orthopedic => "orthopedic",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            TherapeuticDay::Radiation => "Radiotherapy days",
            TherapeuticDay::Liver => "Days with endoscopic/radiological liver procedure",
            TherapeuticDay::Chest => "Days with thoracic surgery",
            TherapeuticDay::Psychotherapy => "Days of acute psychiatric care",
            TherapeuticDay::ChestDrainage => "Days with chest drainage",
            TherapeuticDay::Skull => "Days with skull or brain procedure",
            TherapeuticDay::Eye => "Days with eye procedure",
            TherapeuticDay::Burn => "Burn/frostbite care days in burn centre",
            TherapeuticDay::Heart => "Days with heart or aorta procedure",
            TherapeuticDay::Tissue => "Days with soft/connective tissue procedure",
            TherapeuticDay::Veins => "Days with peripheral vessel procedure",
            TherapeuticDay::Pelvis => "Days with abdominal/pelvic surgery",
            TherapeuticDay::Blood => "Days with blood elimination methods",
            TherapeuticDay::Orthopedic => "Days with orthopedic surgery",
        }
    }

    /// Look up a counter by its JSON key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.key() == key)
    }
}

/// Therapeutic-day counters; absent keys deserialize to 0
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TherapeuticDays {
    pub radiation: u32,
    pub liver: u32,
    pub chest: u32,
    pub psychotherapy: u32,
    pub chest_drainage: u32,
    pub skull: u32,
    pub eye: u32,
    pub burn: u32,
    pub heart: u32,
    pub tissue: u32,
    pub veins: u32,
    pub pelvis: u32,
    pub blood: u32,
    pub orthopedic: u32,
}

impl TherapeuticDays {
    pub fn get(&self, day: TherapeuticDay) -> u32 {
        *self.slot(day)
    }

    pub fn set(&mut self, day: TherapeuticDay, value: u32) {
        *self.slot_mut(day) = value;
    }

    fn slot(&self, day: TherapeuticDay) -> &u32 {
        match day {
            TherapeuticDay::Radiation => &self.radiation,
            TherapeuticDay::Liver => &self.liver,
            TherapeuticDay::Chest => &self.chest,
            TherapeuticDay::Psychotherapy => &self.psychotherapy,
            TherapeuticDay::ChestDrainage => &self.chest_drainage,
            TherapeuticDay::Skull => &self.skull,
            TherapeuticDay::Eye => &self.eye,
            TherapeuticDay::Burn => &self.burn,
            TherapeuticDay::Heart => &self.heart,
            TherapeuticDay::Tissue => &self.tissue,
            TherapeuticDay::Veins => &self.veins,
            TherapeuticDay::Pelvis => &self.pelvis,
            TherapeuticDay::Blood => &self.blood,
            TherapeuticDay::Orthopedic => &self.orthopedic,
        }
    }

    fn slot_mut(&mut self, day: TherapeuticDay) -> &mut u32 {
        match day {
            TherapeuticDay::Radiation => &mut self.radiation,
            TherapeuticDay::Liver => &mut self.liver,
            TherapeuticDay::Chest => &mut self.chest,
            TherapeuticDay::Psychotherapy => &mut self.psychotherapy,
            TherapeuticDay::ChestDrainage => &mut self.chest_drainage,
            TherapeuticDay::Skull => &mut self.skull,
            TherapeuticDay::Eye => &mut self.eye,
            TherapeuticDay::Burn => &mut self.burn,
            TherapeuticDay::Heart => &mut self.heart,
            TherapeuticDay::Tissue => &mut self.tissue,
            TherapeuticDay::Veins => &mut self.veins,
            TherapeuticDay::Pelvis => &mut self.pelvis,
            TherapeuticDay::Blood => &mut self.blood,
            TherapeuticDay::Orthopedic => &mut self.orthopedic,
        }
    }
}

/// Admitting bed specialty for rehabilitation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BedType {
    #[default]
    #[serde(rename = "")]
    Unspecified,
    #[serde(rename = "1F1")]
    Rehab1F1,
    #[serde(rename = "2F1")]
    Rehab2F1,
    #[serde(rename = "2H1")]
    Rehab2H1,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rehabilitation {
    #[serde(default)]
    pub bed_type: BedType,
    #[serde(default)]
    pub days: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeUnit {
    #[default]
    Years,
    Days,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[default]
    #[serde(rename = "")]
    Unspecified,
    #[serde(rename = "1")]
    Male,
    #[serde(rename = "2")]
    Female,
}

/// The editable case record submitted as a repair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoderCaseData {
    // Basic info
    pub main_diagnosis: String,
    /// Discharge type, 0-8 or P
    pub hosp_end: String,
    pub patient_age: u32,
    pub patient_age_unit: AgeUnit,
    /// Birth weight in grams; absent rather than zero when unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_weight: Option<u32>,
    pub patient_sex: Sex,
    pub ventilation_hours: u32,
    pub case_year: i32,

    // Case info
    pub hosp_days: u32,
    pub primary_expenses: f64,
    pub hospital_id: String,

    // Lists
    pub other_diagnoses: Vec<Diagnosis>,
    pub procedures: Vec<Procedure>,
    pub critical_items: Vec<CriticalItem>,

    // Specifics
    pub therapeutic_days: TherapeuticDays,
    pub rehabilitation: Rehabilitation,
}

/// Analysis output for one text: case fields plus computed grouping metrics
///
/// Every case field is optional because the service may omit any of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaseResult {
    pub main_diagnosis: Option<String>,
    pub hosp_end: Option<String>,
    pub patient_age: Option<u32>,
    pub patient_age_unit: Option<AgeUnit>,
    pub patient_weight: Option<u32>,
    pub patient_sex: Option<Sex>,
    pub ventilation_hours: Option<u32>,
    pub case_year: Option<i32>,
    pub hosp_days: Option<u32>,
    pub primary_expenses: Option<f64>,
    pub hospital_id: Option<String>,
    pub other_diagnoses: Vec<Diagnosis>,
    pub procedures: Vec<Procedure>,
    pub critical_items: Vec<CriticalItem>,
    pub therapeutic_days: Option<TherapeuticDays>,
    pub rehabilitation: Option<Rehabilitation>,

    /// Principal diagnosis candidates
    pub diagnoses: Vec<Diagnosis>,
    pub drg_code: String,
    pub drg_name: String,
    pub reliability_score: f64,
    /// Length of stay (computed average)
    pub los: f64,
    /// Relative value
    pub rv: f64,
    pub revenue: f64,
    pub cost: f64,

    pub highlights: Vec<HighlightSpan>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_therapeutic_days_missing_keys_default_to_zero() {
        let days: TherapeuticDays = serde_json::from_str(r#"{"radiation": 3, "chestDrainage": 1}"#).unwrap();
        assert_eq!(days.get(TherapeuticDay::Radiation), 3);
        assert_eq!(days.get(TherapeuticDay::ChestDrainage), 1);
        assert_eq!(days.get(TherapeuticDay::Orthopedic), 0);
    }

    #[test]
    fn test_therapeutic_day_keys_match_serialization() {
        let mut days = TherapeuticDays::default();
        for (i, day) in TherapeuticDay::ALL.iter().enumerate() {
            days.set(*day, i as u32 + 1);
        }
        let json = serde_json::to_value(&days).unwrap();
        for (i, day) in TherapeuticDay::ALL.iter().enumerate() {
            assert_eq!(json[day.key()], i as u64 + 1);
            assert_eq!(TherapeuticDay::from_key(day.key()), Some(*day));
        }
    }

    #[test]
    fn test_enum_wire_values() {
        assert_eq!(serde_json::to_string(&Sex::Unspecified).unwrap(), r#""""#);
        assert_eq!(serde_json::to_string(&Sex::Female).unwrap(), r#""2""#);
        assert_eq!(serde_json::to_string(&BedType::Rehab2H1).unwrap(), r#""2H1""#);
        assert_eq!(serde_json::to_string(&AgeUnit::Days).unwrap(), r#""days""#);
    }

    #[test]
    fn test_case_result_tolerates_sparse_payload() {
        let result: CaseResult = serde_json::from_str(
            r#"{"drgCode": "194", "diagnoses": [{"id": "d1", "code": "J18.9", "name": "Pneumonia", "probability": 0.92}]}"#,
        )
        .unwrap();
        assert_eq!(result.drg_code, "194");
        assert_eq!(result.diagnoses[0].probability, Some(0.92));
        assert!(result.procedures.is_empty());
        assert!(result.patient_weight.is_none());
    }

    #[test]
    fn test_manual_diagnosis_is_custom() {
        let manual = Diagnosis::manual("E11.9", "Type 2 diabetes", "Manual selection");
        assert!(manual.is_custom());
        assert_eq!(manual.probability, Some(1.0));
        assert!(!Diagnosis::placeholder().is_custom());
    }

    #[test]
    fn test_placeholders_get_fresh_ids() {
        assert_ne!(Procedure::placeholder().id, Procedure::placeholder().id);
        assert!(CriticalItem::placeholder().id.starts_with("crit-"));
        assert_eq!(CriticalItem::placeholder().amount, 1);
    }
}
