//! Repair form: an editable copy of the analysis result
//!
//! The form is hydrated from a `CaseResult` and submitted whole as a
//! `CoderCaseData`. There is no per-field diffing; a failed submission leaves
//! the form untouched so the coder can retry.

use chrono::Datelike;
use thiserror::Error;

use crate::domain::{
    AgeUnit, BedType, CaseResult, CoderCaseData, CriticalItem, Diagnosis, Procedure, Rehabilitation, Sex,
    TherapeuticDay, TherapeuticDays,
};

/// Form editing failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Invalid number for {field}: {value:?}")]
    InvalidNumber { field: String, value: String },

    #[error("No {list} row at index {index}")]
    RowOutOfRange { list: &'static str, index: usize },
}

/// Parse a numeric text field; blank input yields `None`
fn parse_optional(field: &str, raw: &str) -> Result<Option<u32>, FormError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| FormError::InvalidNumber {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

fn row<'a, T>(items: &'a mut [T], list: &'static str, index: usize) -> Result<&'a mut T, FormError> {
    items.get_mut(index).ok_or(FormError::RowOutOfRange { list, index })
}

fn remove_row<T>(items: &mut Vec<T>, list: &'static str, index: usize) -> Result<T, FormError> {
    if index >= items.len() {
        return Err(FormError::RowOutOfRange { list, index });
    }
    Ok(items.remove(index))
}

/// Repair form state
#[derive(Debug, Clone, PartialEq)]
pub struct RepairForm {
    data: CoderCaseData,
}

impl RepairForm {
    /// Build the form defaults from an analysis result
    pub fn hydrate(result: &CaseResult) -> Self {
        Self::hydrate_for_year(result, chrono::Local::now().year())
    }

    /// Like [`RepairForm::hydrate`] with an explicit fallback case year
    pub fn hydrate_for_year(result: &CaseResult, current_year: i32) -> Self {
        let diagnoses = if result.other_diagnoses.is_empty() {
            &result.diagnoses
        } else {
            &result.other_diagnoses
        };

        let data = CoderCaseData {
            main_diagnosis: result.main_diagnosis.clone().unwrap_or_default(),
            hosp_end: result.hosp_end.clone().unwrap_or_default(),
            patient_age: result.patient_age.unwrap_or(0),
            patient_age_unit: result.patient_age_unit.unwrap_or_default(),
            patient_weight: result.patient_weight,
            patient_sex: result.patient_sex.unwrap_or_default(),
            ventilation_hours: result.ventilation_hours.unwrap_or(0),
            case_year: result.case_year.unwrap_or(current_year),
            hosp_days: result.hosp_days.unwrap_or(0),
            primary_expenses: result.primary_expenses.unwrap_or(0.0),
            hospital_id: result.hospital_id.clone().unwrap_or_default(),
            other_diagnoses: non_empty_or(diagnoses, Diagnosis::placeholder),
            procedures: non_empty_or(&result.procedures, Procedure::placeholder),
            critical_items: non_empty_or(&result.critical_items, CriticalItem::placeholder),
            therapeutic_days: result.therapeutic_days.clone().unwrap_or_default(),
            rehabilitation: result.rehabilitation.clone().unwrap_or_default(),
        };

        Self { data }
    }

    /// Wrap an existing record
    pub fn from_payload(data: CoderCaseData) -> Self {
        Self { data }
    }

    /// The record that would be submitted
    pub fn payload(&self) -> &CoderCaseData {
        &self.data
    }

    pub fn into_payload(self) -> CoderCaseData {
        self.data
    }

    // Scalars

    pub fn set_main_diagnosis(&mut self, code: impl Into<String>) {
        self.data.main_diagnosis = code.into();
    }

    pub fn set_hosp_end(&mut self, value: impl Into<String>) {
        self.data.hosp_end = value.into();
    }

    pub fn set_hospital_id(&mut self, value: impl Into<String>) {
        self.data.hospital_id = value.into();
    }

    pub fn set_case_year(&mut self, year: i32) {
        self.data.case_year = year;
    }

    pub fn set_patient_age(&mut self, age: u32) {
        self.data.patient_age = age;
    }

    pub fn set_patient_age_unit(&mut self, unit: AgeUnit) {
        self.data.patient_age_unit = unit;
    }

    pub fn set_patient_sex(&mut self, sex: Sex) {
        self.data.patient_sex = sex;
    }

    pub fn set_ventilation_hours(&mut self, hours: u32) {
        self.data.ventilation_hours = hours;
    }

    pub fn set_hosp_days(&mut self, days: u32) {
        self.data.hosp_days = days;
    }

    pub fn set_primary_expenses(&mut self, amount: f64) {
        self.data.primary_expenses = amount;
    }

    /// Birth weight from raw input; blank clears it
    pub fn set_patient_weight(&mut self, raw: &str) -> Result<(), FormError> {
        self.data.patient_weight = parse_optional("patientWeight", raw)?;
        Ok(())
    }

    /// Therapeutic-day counter from raw input; blank means 0
    pub fn set_therapeutic_day(&mut self, day: TherapeuticDay, raw: &str) -> Result<(), FormError> {
        let value = parse_optional(day.key(), raw)?.unwrap_or(0);
        self.data.therapeutic_days.set(day, value);
        Ok(())
    }

    pub fn therapeutic_days(&self) -> &TherapeuticDays {
        &self.data.therapeutic_days
    }

    pub fn set_bed_type(&mut self, bed_type: BedType) {
        self.data.rehabilitation.bed_type = bed_type;
    }

    pub fn set_rehabilitation_days(&mut self, days: u32) {
        self.data.rehabilitation.days = days;
    }

    pub fn rehabilitation(&self) -> &Rehabilitation {
        &self.data.rehabilitation
    }

    // Diagnoses

    pub fn diagnoses(&self) -> &[Diagnosis] {
        &self.data.other_diagnoses
    }

    /// Append a blank diagnosis row
    pub fn add_diagnosis(&mut self) -> &mut Diagnosis {
        self.data.other_diagnoses.push(Diagnosis::placeholder());
        let last = self.data.other_diagnoses.len() - 1;
        &mut self.data.other_diagnoses[last]
    }

    pub fn remove_diagnosis(&mut self, index: usize) -> Result<Diagnosis, FormError> {
        remove_row(&mut self.data.other_diagnoses, "diagnosis", index)
    }

    pub fn diagnosis_mut(&mut self, index: usize) -> Result<&mut Diagnosis, FormError> {
        row(&mut self.data.other_diagnoses, "diagnosis", index)
    }

    // Procedures

    pub fn procedures(&self) -> &[Procedure] {
        &self.data.procedures
    }

    /// Append a blank procedure row
    pub fn add_procedure(&mut self) -> &mut Procedure {
        self.data.procedures.push(Procedure::placeholder());
        let last = self.data.procedures.len() - 1;
        &mut self.data.procedures[last]
    }

    pub fn remove_procedure(&mut self, index: usize) -> Result<Procedure, FormError> {
        remove_row(&mut self.data.procedures, "procedure", index)
    }

    pub fn procedure_mut(&mut self, index: usize) -> Result<&mut Procedure, FormError> {
        row(&mut self.data.procedures, "procedure", index)
    }

    // Critical items

    pub fn critical_items(&self) -> &[CriticalItem] {
        &self.data.critical_items
    }

    /// Append a blank critical-item row
    pub fn add_critical_item(&mut self) -> &mut CriticalItem {
        self.data.critical_items.push(CriticalItem::placeholder());
        let last = self.data.critical_items.len() - 1;
        &mut self.data.critical_items[last]
    }

    pub fn remove_critical_item(&mut self, index: usize) -> Result<CriticalItem, FormError> {
        remove_row(&mut self.data.critical_items, "critical item", index)
    }

    pub fn critical_item_mut(&mut self, index: usize) -> Result<&mut CriticalItem, FormError> {
        row(&mut self.data.critical_items, "critical item", index)
    }
}

fn non_empty_or<T: Clone>(items: &[T], placeholder: fn() -> T) -> Vec<T> {
    if items.is_empty() {
        vec![placeholder()]
    } else {
        items.to_vec()
    }
}

/// A single edit to the repair form, as emitted by the form's inputs
#[derive(Debug, Clone, PartialEq)]
pub enum RepairEdit {
    MainDiagnosis(String),
    HospEnd(String),
    HospitalId(String),
    CaseYear(i32),
    PatientAge(u32),
    PatientAgeUnit(AgeUnit),
    /// Raw text; blank clears the weight
    PatientWeight(String),
    PatientSex(Sex),
    VentilationHours(u32),
    HospDays(u32),
    PrimaryExpenses(f64),
    /// Raw text; blank means 0
    TherapeuticDay(TherapeuticDay, String),
    BedType(BedType),
    RehabilitationDays(u32),
    AddDiagnosis,
    RemoveDiagnosis(usize),
    UpdateDiagnosis { index: usize, code: String, name: String },
    AddProcedure,
    RemoveProcedure(usize),
    UpdateProcedure { index: usize, code: String, name: String, amount: u32 },
    AddCriticalItem,
    RemoveCriticalItem(usize),
    UpdateCriticalItem { index: usize, code: String, amount: u32 },
}

impl RepairEdit {
    /// Apply to a form; on error the form is unchanged
    pub fn apply(self, form: &mut RepairForm) -> Result<(), FormError> {
        match self {
            RepairEdit::MainDiagnosis(v) => form.set_main_diagnosis(v),
            RepairEdit::HospEnd(v) => form.set_hosp_end(v),
            RepairEdit::HospitalId(v) => form.set_hospital_id(v),
            RepairEdit::CaseYear(v) => form.set_case_year(v),
            RepairEdit::PatientAge(v) => form.set_patient_age(v),
            RepairEdit::PatientAgeUnit(v) => form.set_patient_age_unit(v),
            RepairEdit::PatientWeight(raw) => form.set_patient_weight(&raw)?,
            RepairEdit::PatientSex(v) => form.set_patient_sex(v),
            RepairEdit::VentilationHours(v) => form.set_ventilation_hours(v),
            RepairEdit::HospDays(v) => form.set_hosp_days(v),
            RepairEdit::PrimaryExpenses(v) => form.set_primary_expenses(v),
            RepairEdit::TherapeuticDay(day, raw) => form.set_therapeutic_day(day, &raw)?,
            RepairEdit::BedType(v) => form.set_bed_type(v),
            RepairEdit::RehabilitationDays(v) => form.set_rehabilitation_days(v),
            RepairEdit::AddDiagnosis => {
                form.add_diagnosis();
            }
            RepairEdit::RemoveDiagnosis(i) => {
                form.remove_diagnosis(i)?;
            }
            RepairEdit::UpdateDiagnosis { index, code, name } => {
                let diagnosis = form.diagnosis_mut(index)?;
                diagnosis.code = code;
                diagnosis.name = name;
            }
            RepairEdit::AddProcedure => {
                form.add_procedure();
            }
            RepairEdit::RemoveProcedure(i) => {
                form.remove_procedure(i)?;
            }
            RepairEdit::UpdateProcedure {
                index,
                code,
                name,
                amount,
            } => {
                let procedure = form.procedure_mut(index)?;
                procedure.code = code;
                procedure.name = name;
                procedure.amount = Some(amount);
            }
            RepairEdit::AddCriticalItem => {
                form.add_critical_item();
            }
            RepairEdit::RemoveCriticalItem(i) => {
                form.remove_critical_item(i)?;
            }
            RepairEdit::UpdateCriticalItem { index, code, amount } => {
                let item = form.critical_item_mut(index)?;
                item.code = code;
                item.amount = amount;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Source;

    #[test]
    fn test_hydrate_falls_back_to_principal_candidates() {
        let result = CaseResult {
            diagnoses: vec![Diagnosis::new("d1", "J18.9", "Pneumonia")],
            ..Default::default()
        };
        let form = RepairForm::hydrate_for_year(&result, 2025);
        assert_eq!(form.diagnoses().len(), 1);
        assert_eq!(form.diagnoses()[0].code, "J18.9");
    }

    #[test]
    fn test_hydrate_prefers_other_diagnoses() {
        let result = CaseResult {
            diagnoses: vec![Diagnosis::new("d1", "J18.9", "Pneumonia")],
            other_diagnoses: vec![Diagnosis::new("o1", "E11.9", "Diabetes")],
            ..Default::default()
        };
        let form = RepairForm::hydrate_for_year(&result, 2025);
        assert_eq!(form.diagnoses()[0].id, "o1");
    }

    #[test]
    fn test_hydrate_scalar_defaults() {
        let form = RepairForm::hydrate_for_year(&CaseResult::default(), 2031);
        let data = form.payload();
        assert_eq!(data.case_year, 2031);
        assert_eq!(data.patient_age, 0);
        assert_eq!(data.patient_age_unit, AgeUnit::Years);
        assert_eq!(data.patient_sex, Sex::Unspecified);
        assert!(data.patient_weight.is_none());
        assert_eq!(data.rehabilitation, Rehabilitation::default());
        assert_eq!(data.critical_items.len(), 1);
        assert_eq!(data.other_diagnoses[0].source, Some(Source::Human));
    }

    #[test]
    fn test_invalid_number_leaves_value() {
        let mut form = RepairForm::hydrate_for_year(&CaseResult::default(), 2025);
        form.set_therapeutic_day(TherapeuticDay::Eye, "4").unwrap();
        let err = form.set_therapeutic_day(TherapeuticDay::Eye, "four").unwrap_err();
        assert!(matches!(err, FormError::InvalidNumber { .. }));
        assert_eq!(form.therapeutic_days().get(TherapeuticDay::Eye), 4);
    }

    #[test]
    fn test_row_out_of_range() {
        let mut form = RepairForm::hydrate_for_year(&CaseResult::default(), 2025);
        assert_eq!(
            form.remove_procedure(3).unwrap_err(),
            FormError::RowOutOfRange {
                list: "procedure",
                index: 3
            }
        );
    }

    #[test]
    fn test_repair_edit_apply() {
        let mut form = RepairForm::hydrate_for_year(&CaseResult::default(), 2025);
        RepairEdit::AddProcedure.apply(&mut form).unwrap();
        RepairEdit::UpdateProcedure {
            index: 1,
            code: "3E0234Z".to_string(),
            name: "Vaccination".to_string(),
            amount: 2,
        }
        .apply(&mut form)
        .unwrap();
        assert_eq!(form.procedures()[1].amount, Some(2));

        let before = form.clone();
        assert!(RepairEdit::UpdateCriticalItem {
            index: 9,
            code: "X".to_string(),
            amount: 1
        }
        .apply(&mut form)
        .is_err());
        assert_eq!(form, before);
    }
}
