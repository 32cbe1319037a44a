//! # Dataset Loading and Normalization
//!
//! This module is the only entry point for the patient table. It reads a CSV
//! file, resolves its header onto the canonical schema and converts every cell
//! into a typed value exactly once.
//!
//! - Alias resolution: at least two generations of column names exist
//!   (`Age`/`PhysicalActivity` vs. `Patient_Age`/`Physical_Activity`). Headers
//!   are normalized (case-folded, separators removed) and looked up in a fixed
//!   alias table.
//! - Boolean normalization: yes/no, true/false and 0/1 spellings all become
//!   `bool` here, so scoring and filtering never look at text.
//! - Tolerant cells, strict header: a malformed cell becomes a marker the
//!   scorer can report per patient, but a missing mandatory column fails the
//!   whole load.

use crate::cohort::record::{
    Attribute, Cohort, FlagField, LabelField, NumericField, PatientRecord, Schema,
};
use ahash::AHashMap;
use log::{debug, info, warn};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Accepted spellings: {1}."
    )]
    ColumnNotFound(&'static str, String),
    #[error("Columns '{first}' and '{second}' both map to the attribute '{attribute}'.")]
    DuplicateColumn {
        attribute: Attribute,
        first: String,
        second: String,
    },
    #[error("The input file contains no patient rows.")]
    EmptyDataset,
}

/// Attributes whose columns must exist for any patient to be scorable.
const MANDATORY: [NumericField; 3] = [
    NumericField::Age,
    NumericField::CognitiveScore,
    NumericField::Bmi,
];

/// Accepted header spellings per attribute, already in normalized form.
const ALIASES: &[(Attribute, &[&str])] = &[
    (Attribute::PatientId, &["patientid", "id"]),
    (Attribute::Numeric(NumericField::Age), &["age", "patientage"]),
    (
        Attribute::Numeric(NumericField::CognitiveScore),
        &["mmse", "mmsescore", "cognitivescore"],
    ),
    (
        Attribute::Numeric(NumericField::FunctionalAssessment),
        &["functionalassessment"],
    ),
    (
        Attribute::Numeric(NumericField::Adl),
        &["adl", "activitiesofdailyliving"],
    ),
    (Attribute::Numeric(NumericField::Bmi), &["bmi", "bodymassindex"]),
    (
        Attribute::Numeric(NumericField::CholesterolTotal),
        &["cholesteroltotal", "totalcholesterol", "cholesterol"],
    ),
    (
        Attribute::Numeric(NumericField::PhysicalActivity),
        &["physicalactivity"],
    ),
    (
        Attribute::Numeric(NumericField::AlcoholConsumption),
        &["alcoholconsumption"],
    ),
    (Attribute::Numeric(NumericField::DietQuality), &["dietquality"]),
    (Attribute::Flag(FlagField::Depression), &["depression"]),
    (
        Attribute::Flag(FlagField::MemoryComplaints),
        &["memorycomplaints"],
    ),
    (
        Attribute::Flag(FlagField::BehavioralProblems),
        &["behavioralproblems", "behaviouralproblems"],
    ),
    (
        Attribute::Flag(FlagField::PersonalityChanges),
        &["personalitychanges"],
    ),
    (
        Attribute::Flag(FlagField::DifficultyCompletingTasks),
        &["difficultycompletingtasks", "taskdifficulty"],
    ),
    (
        Attribute::Flag(FlagField::CardiovascularDisease),
        &["cardiovasculardisease", "cvd"],
    ),
    (Attribute::Flag(FlagField::Smoking), &["smoking", "smoker"]),
    (
        Attribute::Flag(FlagField::Diagnosis),
        &["diagnosis", "alzheimersdiagnosis"],
    ),
    (Attribute::Label(LabelField::Gender), &["gender", "sex"]),
    (Attribute::Label(LabelField::Ethnicity), &["ethnicity"]),
];

/// Folds case and strips `_`, `-` and whitespace.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !matches!(c, '_' | '-') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// The canonical attribute a header names, if any.
pub fn resolve_header(header: &str) -> Option<Attribute> {
    let normalized = normalize_header(header);
    ALIASES
        .iter()
        .find(|(_, spellings)| spellings.contains(&normalized.as_str()))
        .map(|(attribute, _)| *attribute)
}

/// Normalizes a yes/no style token. `None` means the token is not recognized.
pub fn parse_flag(token: &str) -> Option<bool> {
    match token.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "t" | "1" | "1.0" => Some(true),
        "no" | "n" | "false" | "f" | "0" | "0.0" => Some(false),
        _ => None,
    }
}

fn is_blank(token: &str) -> bool {
    matches!(
        token.trim().to_ascii_lowercase().as_str(),
        "" | "na" | "n/a" | "nan" | "null" | "none"
    )
}

/// Loads the patient table from a comma-separated file.
pub fn load_cohort(path: impl AsRef<Path>) -> Result<Cohort, DataError> {
    let path = path.as_ref();
    info!("Loading patient data from '{}'", path.display());

    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(None),
        )
        .finish()?;

    info!(
        "Read {} rows and {} columns.",
        df.height(),
        df.width()
    );
    cohort_from_frame(&df)
}

/// Converts an already-read frame into a `Cohort`.
pub fn cohort_from_frame(df: &DataFrame) -> Result<Cohort, DataError> {
    // --- Resolve the header onto the canonical schema ---
    let mut columns: AHashMap<Attribute, String> = AHashMap::new();
    for name in df.get_column_names() {
        let name = name.to_string();
        match resolve_header(&name) {
            Some(attribute) => {
                if let Some(first) = columns.get(&attribute) {
                    return Err(DataError::DuplicateColumn {
                        attribute,
                        first: first.clone(),
                        second: name,
                    });
                }
                debug!("Column '{name}' resolved to '{attribute}'.");
                columns.insert(attribute, name);
            }
            None => debug!("Ignoring unrecognized column '{name}'."),
        }
    }

    for field in MANDATORY {
        if !columns.contains_key(&Attribute::Numeric(field)) {
            let spellings = ALIASES
                .iter()
                .find(|(attribute, _)| *attribute == Attribute::Numeric(field))
                .map(|(_, spellings)| spellings.join(", "))
                .unwrap_or_default();
            return Err(DataError::ColumnNotFound(field.column_name(), spellings));
        }
    }

    let n = df.height();
    if n == 0 {
        return Err(DataError::EmptyDataset);
    }

    // --- Convert column by column into typed records ---
    let mut records: Vec<PatientRecord> = match columns.get(&Attribute::PatientId) {
        Some(name) => internal::extract_text(df, name)?
            .into_iter()
            .enumerate()
            .map(|(i, id)| PatientRecord::new(id.unwrap_or_else(|| (i + 1).to_string())))
            .collect(),
        None => (1..=n).map(|i| PatientRecord::new(i.to_string())).collect(),
    };

    for field in NumericField::ALL {
        if let Some(name) = columns.get(&Attribute::Numeric(field)) {
            let values = internal::extract_numeric(df, name)?;
            for (record, value) in records.iter_mut().zip(values) {
                record.set_numeric(field, value);
            }
        }
    }

    for field in FlagField::ALL {
        if let Some(name) = columns.get(&Attribute::Flag(field)) {
            let values = internal::extract_flags(df, name)?;
            for (record, value) in records.iter_mut().zip(values) {
                record.set_flag(field, value);
            }
        }
    }

    for field in LabelField::ALL {
        if let Some(name) = columns.get(&Attribute::Label(field)) {
            let values = internal::extract_text(df, name)?;
            for (record, value) in records.iter_mut().zip(values) {
                record.set_label(field, value);
            }
        }
    }

    let schema = Schema::new(columns.keys().copied());
    info!(
        "Loaded {} patients with {} recognized attributes.",
        records.len(),
        columns.len()
    );
    Ok(Cohort::new(records, schema))
}

/// Column converters shared by the loader.
mod internal {
    use super::*;

    /// Trimmed text per row; blanks become `None`.
    pub(super) fn extract_text(
        df: &DataFrame,
        column_name: &str,
    ) -> Result<Vec<Option<String>>, DataError> {
        let casted = df.column(column_name)?.cast(&DataType::String)?;
        let values = casted
            .str()?
            .into_iter()
            .map(|cell| {
                cell.filter(|text| !is_blank(text))
                    .map(|text| text.trim().to_string())
            })
            .collect();
        Ok(values)
    }

    /// Numeric values per row. Blanks become `None`; text that is not a number
    /// becomes `Some(NaN)` so mandatory attributes can be reported as non-numeric.
    pub(super) fn extract_numeric(
        df: &DataFrame,
        column_name: &str,
    ) -> Result<Vec<Option<f64>>, DataError> {
        let series = df.column(column_name)?;
        match series.dtype() {
            DataType::String => {
                let mut malformed = 0usize;
                let values = series
                    .str()?
                    .into_iter()
                    .map(|cell| match cell {
                        None => None,
                        Some(text) if is_blank(text) => None,
                        Some(text) => match text.trim().parse::<f64>() {
                            Ok(v) => Some(v),
                            Err(_) => {
                                malformed += 1;
                                Some(f64::NAN)
                            }
                        },
                    })
                    .collect();
                if malformed > 0 {
                    warn!(
                        "Column '{column_name}' has {malformed} non-numeric cells; they are treated as invalid values."
                    );
                }
                Ok(values)
            }
            _ => {
                // A float NaN is a missing-value marker, like the `NaN` token.
                let casted = series.cast(&DataType::Float64)?;
                let values = casted
                    .f64()?
                    .into_iter()
                    .map(|cell| cell.filter(|v| !v.is_nan()))
                    .collect();
                Ok(values)
            }
        }
    }

    /// Normalized booleans per row. Unrecognized tokens become `None`.
    pub(super) fn extract_flags(
        df: &DataFrame,
        column_name: &str,
    ) -> Result<Vec<Option<bool>>, DataError> {
        let mut unrecognized = 0usize;
        let values = extract_text(df, column_name)?
            .into_iter()
            .map(|cell| {
                cell.and_then(|text| {
                    let parsed = parse_flag(&text);
                    if parsed.is_none() {
                        unrecognized += 1;
                    }
                    parsed
                })
            })
            .collect();
        if unrecognized > 0 {
            warn!(
                "Column '{column_name}' has {unrecognized} cells that are not yes/no values; they are treated as absent."
            );
        }
        Ok(values)
    }
}
