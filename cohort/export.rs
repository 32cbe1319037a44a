//! CSV export of a scored population, one row per patient with the canonical
//! attributes followed by the derived columns.

use crate::cohort::pipeline::{Assessment, ScoredPatient};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write CSV export: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to write CSV export: {0}")]
    Io(#[from] std::io::Error),
}

/// Header row, in `ScoredRow` field order.
const COLUMNS: [&str; 23] = [
    "patient_id",
    "age",
    "gender",
    "ethnicity",
    "cognitive_score",
    "functional_assessment",
    "adl",
    "bmi",
    "cholesterol_total",
    "depression",
    "memory_complaints",
    "behavioral_problems",
    "personality_changes",
    "difficulty_completing_tasks",
    "cardiovascular_disease",
    "smoking",
    "physical_activity",
    "alcohol_consumption",
    "diet_quality",
    "diagnosis",
    "risk_score",
    "risk_tier",
    "early_detection_flag",
];

#[derive(Debug, Serialize)]
struct ScoredRow<'a> {
    patient_id: &'a str,
    age: Option<f64>,
    gender: Option<&'a str>,
    ethnicity: Option<&'a str>,
    cognitive_score: Option<f64>,
    functional_assessment: Option<f64>,
    adl: Option<f64>,
    bmi: Option<f64>,
    cholesterol_total: Option<f64>,
    depression: Option<bool>,
    memory_complaints: Option<bool>,
    behavioral_problems: Option<bool>,
    personality_changes: Option<bool>,
    difficulty_completing_tasks: Option<bool>,
    cardiovascular_disease: Option<bool>,
    smoking: Option<bool>,
    physical_activity: Option<f64>,
    alcohol_consumption: Option<f64>,
    diet_quality: Option<f64>,
    diagnosis: Option<bool>,
    risk_score: f64,
    risk_tier: &'static str,
    early_detection_flag: bool,
}

impl<'a> From<&ScoredPatient<'a>> for ScoredRow<'a> {
    fn from(patient: &ScoredPatient<'a>) -> Self {
        let r = patient.record;
        Self {
            patient_id: &r.patient_id,
            age: r.age,
            gender: r.gender.as_deref(),
            ethnicity: r.ethnicity.as_deref(),
            cognitive_score: r.cognitive_score,
            functional_assessment: r.functional_assessment,
            adl: r.adl,
            bmi: r.bmi,
            cholesterol_total: r.cholesterol_total,
            depression: r.depression,
            memory_complaints: r.memory_complaints,
            behavioral_problems: r.behavioral_problems,
            personality_changes: r.personality_changes,
            difficulty_completing_tasks: r.difficulty_completing_tasks,
            cardiovascular_disease: r.cardiovascular_disease,
            smoking: r.smoking,
            physical_activity: r.physical_activity,
            alcohol_consumption: r.alcohol_consumption,
            diet_quality: r.diet_quality,
            diagnosis: r.diagnosis,
            risk_score: patient.score.value(),
            risk_tier: patient.tier.label(),
            early_detection_flag: patient.early_detection,
        }
    }
}

/// Writes the scored patients of an assessment. Absent values are left empty.
/// The header row is written even when no patient was scored.
pub fn write_scored_csv(path: impl AsRef<Path>, assessment: &Assessment<'_>) -> Result<(), ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(COLUMNS)?;
    for patient in &assessment.patients {
        writer.serialize(ScoredRow::from(patient))?;
    }
    writer.flush()?;
    log::info!("Exported {} scored patients.", assessment.patients.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::config::DashboardConfig;
    use crate::cohort::pipeline::{PassOutcome, run_pass};
    use crate::cohort::record::{Cohort, PatientRecord};
    use tempfile::NamedTempFile;

    #[test]
    fn writes_header_and_derived_columns() {
        let mut r = PatientRecord::new("P-1");
        r.age = Some(85.0);
        r.cognitive_score = Some(8.0);
        r.bmi = Some(22.0);
        r.functional_assessment = Some(5.0);
        r.cholesterol_total = Some(200.0);
        r.smoking = Some(true);
        let cohort = Cohort::from_records(vec![r]);
        let PassOutcome::Assessed(assessment) = run_pass(&cohort, &DashboardConfig::default()).unwrap()
        else {
            panic!("Expected an assessment");
        };

        let file = NamedTempFile::new().unwrap();
        write_scored_csv(file.path(), &assessment).unwrap();

        let mut reader = csv::Reader::from_path(file.path()).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(0), Some("patient_id"));
        assert_eq!(headers.get(headers.len() - 3), Some("risk_score"));
        assert_eq!(headers.get(headers.len() - 1), Some("early_detection_flag"));

        let row = reader.records().next().unwrap().unwrap();
        let column = |name: &str| {
            let i = headers.iter().position(|h| h == name).unwrap();
            row.get(i).unwrap().to_string()
        };
        assert_eq!(column("patient_id"), "P-1");
        assert_eq!(column("risk_score"), "8.2");
        assert_eq!(column("risk_tier"), "High Risk");
        assert_eq!(column("early_detection_flag"), "true");
        assert_eq!(column("smoking"), "true");
        assert_eq!(column("gender"), "");
    }

    #[test]
    fn header_is_written_when_no_patient_was_scored() {
        let mut r = PatientRecord::new("P-1");
        r.cognitive_score = Some(20.0);
        r.bmi = Some(25.0);
        let cohort = Cohort::from_records(vec![r]);
        let assessment = match run_pass(&cohort, &DashboardConfig::default()).unwrap() {
            PassOutcome::Assessed(assessment) => assessment,
            other => panic!("Expected an assessment, got {:?}", other),
        };
        assert!(assessment.patients.is_empty());
        assert_eq!(assessment.excluded.len(), 1);

        let file = NamedTempFile::new().unwrap();
        write_scored_csv(file.path(), &assessment).unwrap();

        let mut reader = csv::Reader::from_path(file.path()).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), COLUMNS.len());
        assert_eq!(headers.get(0), Some("patient_id"));
        assert_eq!(headers.get(COLUMNS.len() - 1), Some("early_detection_flag"));
        assert_eq!(reader.records().count(), 0);
    }

    #[test]
    fn columns_line_up_with_row_fields() {
        let mut r = PatientRecord::new("P-2");
        r.age = Some(70.0);
        r.cognitive_score = Some(25.0);
        r.bmi = Some(24.0);
        r.gender = Some("Female".into());
        r.diet_quality = Some(6.5);
        let cohort = Cohort::from_records(vec![r]);
        let assessment = match run_pass(&cohort, &DashboardConfig::default()).unwrap() {
            PassOutcome::Assessed(assessment) => assessment,
            other => panic!("Expected an assessment, got {:?}", other),
        };

        let file = NamedTempFile::new().unwrap();
        write_scored_csv(file.path(), &assessment).unwrap();

        let mut reader = csv::Reader::from_path(file.path()).unwrap();
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(row.len(), COLUMNS.len());
        let column = |name: &str| {
            let i = COLUMNS.iter().position(|c| *c == name).unwrap();
            row.get(i).unwrap().to_string()
        };
        assert_eq!(column("patient_id"), "P-2");
        assert_eq!(column("age"), "70.0");
        assert_eq!(column("gender"), "Female");
        assert_eq!(column("diet_quality"), "6.5");
        assert_eq!(column("risk_tier"), assessment.patients[0].tier.label());
    }
}
