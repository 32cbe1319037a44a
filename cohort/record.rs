//! # Patient Records and the Canonical Schema
//!
//! Every column the engine understands is named by one of three field enums.
//! The loader resolves historical header spellings onto these enums once, so
//! the scorer, the flagger and the population filter never branch on column
//! names or re-parse text.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Continuous attributes of a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Age,
    /// Mini-Mental-State-style cognitive score, 0 to 30, lower is more impaired.
    CognitiveScore,
    FunctionalAssessment,
    /// Activities of daily living.
    Adl,
    Bmi,
    CholesterolTotal,
    PhysicalActivity,
    AlcoholConsumption,
    DietQuality,
}

impl NumericField {
    pub const ALL: [NumericField; 9] = [
        NumericField::Age,
        NumericField::CognitiveScore,
        NumericField::FunctionalAssessment,
        NumericField::Adl,
        NumericField::Bmi,
        NumericField::CholesterolTotal,
        NumericField::PhysicalActivity,
        NumericField::AlcoholConsumption,
        NumericField::DietQuality,
    ];

    /// The canonical column name used in exports and messages.
    pub fn column_name(self) -> &'static str {
        match self {
            NumericField::Age => "age",
            NumericField::CognitiveScore => "cognitive_score",
            NumericField::FunctionalAssessment => "functional_assessment",
            NumericField::Adl => "adl",
            NumericField::Bmi => "bmi",
            NumericField::CholesterolTotal => "cholesterol_total",
            NumericField::PhysicalActivity => "physical_activity",
            NumericField::AlcoholConsumption => "alcohol_consumption",
            NumericField::DietQuality => "diet_quality",
        }
    }
}

/// Yes/no attributes, normalized to `bool` at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagField {
    Depression,
    MemoryComplaints,
    BehavioralProblems,
    PersonalityChanges,
    DifficultyCompletingTasks,
    CardiovascularDisease,
    Smoking,
    Diagnosis,
}

impl FlagField {
    pub const ALL: [FlagField; 8] = [
        FlagField::Depression,
        FlagField::MemoryComplaints,
        FlagField::BehavioralProblems,
        FlagField::PersonalityChanges,
        FlagField::DifficultyCompletingTasks,
        FlagField::CardiovascularDisease,
        FlagField::Smoking,
        FlagField::Diagnosis,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            FlagField::Depression => "depression",
            FlagField::MemoryComplaints => "memory_complaints",
            FlagField::BehavioralProblems => "behavioral_problems",
            FlagField::PersonalityChanges => "personality_changes",
            FlagField::DifficultyCompletingTasks => "difficulty_completing_tasks",
            FlagField::CardiovascularDisease => "cardiovascular_disease",
            FlagField::Smoking => "smoking",
            FlagField::Diagnosis => "diagnosis",
        }
    }
}

/// Free-text categorical attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelField {
    Gender,
    Ethnicity,
}

impl LabelField {
    pub const ALL: [LabelField; 2] = [LabelField::Gender, LabelField::Ethnicity];

    pub fn column_name(self) -> &'static str {
        match self {
            LabelField::Gender => "gender",
            LabelField::Ethnicity => "ethnicity",
        }
    }
}

/// Any attribute of the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    PatientId,
    Numeric(NumericField),
    Flag(FlagField),
    Label(LabelField),
}

impl Attribute {
    pub fn column_name(self) -> &'static str {
        match self {
            Attribute::PatientId => "patient_id",
            Attribute::Numeric(field) => field.column_name(),
            Attribute::Flag(field) => field.column_name(),
            Attribute::Label(field) => field.column_name(),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// One row of the dataset.
///
/// Every attribute except the identifier may be absent. A numeric value of
/// `NaN` marks a cell that was present but not a number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientRecord {
    pub patient_id: String,
    pub age: Option<f64>,
    pub gender: Option<String>,
    pub ethnicity: Option<String>,
    pub cognitive_score: Option<f64>,
    pub functional_assessment: Option<f64>,
    pub adl: Option<f64>,
    pub bmi: Option<f64>,
    pub cholesterol_total: Option<f64>,
    pub depression: Option<bool>,
    pub memory_complaints: Option<bool>,
    pub behavioral_problems: Option<bool>,
    pub personality_changes: Option<bool>,
    pub difficulty_completing_tasks: Option<bool>,
    pub cardiovascular_disease: Option<bool>,
    pub smoking: Option<bool>,
    pub physical_activity: Option<f64>,
    pub alcohol_consumption: Option<f64>,
    pub diet_quality: Option<f64>,
    pub diagnosis: Option<bool>,
}

impl PatientRecord {
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            ..Default::default()
        }
    }

    /// Raw numeric value, including the `NaN` marker for malformed cells.
    pub fn numeric(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::Age => self.age,
            NumericField::CognitiveScore => self.cognitive_score,
            NumericField::FunctionalAssessment => self.functional_assessment,
            NumericField::Adl => self.adl,
            NumericField::Bmi => self.bmi,
            NumericField::CholesterolTotal => self.cholesterol_total,
            NumericField::PhysicalActivity => self.physical_activity,
            NumericField::AlcoholConsumption => self.alcohol_consumption,
            NumericField::DietQuality => self.diet_quality,
        }
    }

    /// Numeric value only when it is usable for arithmetic.
    pub fn finite(&self, field: NumericField) -> Option<f64> {
        self.numeric(field).filter(|v| v.is_finite())
    }

    pub fn flag(&self, field: FlagField) -> Option<bool> {
        match field {
            FlagField::Depression => self.depression,
            FlagField::MemoryComplaints => self.memory_complaints,
            FlagField::BehavioralProblems => self.behavioral_problems,
            FlagField::PersonalityChanges => self.personality_changes,
            FlagField::DifficultyCompletingTasks => self.difficulty_completing_tasks,
            FlagField::CardiovascularDisease => self.cardiovascular_disease,
            FlagField::Smoking => self.smoking,
            FlagField::Diagnosis => self.diagnosis,
        }
    }

    pub fn label(&self, field: LabelField) -> Option<&str> {
        match field {
            LabelField::Gender => self.gender.as_deref(),
            LabelField::Ethnicity => self.ethnicity.as_deref(),
        }
    }

    pub fn set_numeric(&mut self, field: NumericField, value: Option<f64>) {
        let slot = match field {
            NumericField::Age => &mut self.age,
            NumericField::CognitiveScore => &mut self.cognitive_score,
            NumericField::FunctionalAssessment => &mut self.functional_assessment,
            NumericField::Adl => &mut self.adl,
            NumericField::Bmi => &mut self.bmi,
            NumericField::CholesterolTotal => &mut self.cholesterol_total,
            NumericField::PhysicalActivity => &mut self.physical_activity,
            NumericField::AlcoholConsumption => &mut self.alcohol_consumption,
            NumericField::DietQuality => &mut self.diet_quality,
        };
        *slot = value;
    }

    pub fn set_flag(&mut self, field: FlagField, value: Option<bool>) {
        let slot = match field {
            FlagField::Depression => &mut self.depression,
            FlagField::MemoryComplaints => &mut self.memory_complaints,
            FlagField::BehavioralProblems => &mut self.behavioral_problems,
            FlagField::PersonalityChanges => &mut self.personality_changes,
            FlagField::DifficultyCompletingTasks => &mut self.difficulty_completing_tasks,
            FlagField::CardiovascularDisease => &mut self.cardiovascular_disease,
            FlagField::Smoking => &mut self.smoking,
            FlagField::Diagnosis => &mut self.diagnosis,
        };
        *slot = value;
    }

    pub fn set_label(&mut self, field: LabelField, value: Option<String>) {
        match field {
            LabelField::Gender => self.gender = value,
            LabelField::Ethnicity => self.ethnicity = value,
        }
    }
}

/// The set of canonical attributes present in a dataset's header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    attributes: BTreeSet<Attribute>,
}

impl Schema {
    pub fn new(attributes: impl IntoIterator<Item = Attribute>) -> Self {
        Self {
            attributes: attributes.into_iter().collect(),
        }
    }

    /// Every attribute of the canonical schema.
    pub fn complete() -> Self {
        let mut attributes = vec![Attribute::PatientId];
        attributes.extend(NumericField::ALL.map(Attribute::Numeric));
        attributes.extend(FlagField::ALL.map(Attribute::Flag));
        attributes.extend(LabelField::ALL.map(Attribute::Label));
        Self::new(attributes)
    }

    /// Attributes for which at least one record carries a value.
    pub fn inferred_from(records: &[PatientRecord]) -> Self {
        let mut attributes = vec![Attribute::PatientId];
        for field in NumericField::ALL {
            if records.iter().any(|r| r.numeric(field).is_some()) {
                attributes.push(Attribute::Numeric(field));
            }
        }
        for field in FlagField::ALL {
            if records.iter().any(|r| r.flag(field).is_some()) {
                attributes.push(Attribute::Flag(field));
            }
        }
        for field in LabelField::ALL {
            if records.iter().any(|r| r.label(field).is_some()) {
                attributes.push(Attribute::Label(field));
            }
        }
        Self::new(attributes)
    }

    pub fn contains(&self, attribute: Attribute) -> bool {
        self.attributes.contains(&attribute)
    }

    pub fn has_numeric(&self, field: NumericField) -> bool {
        self.contains(Attribute::Numeric(field))
    }

    pub fn attributes(&self) -> impl Iterator<Item = Attribute> + '_ {
        self.attributes.iter().copied()
    }
}

/// An inclusive numeric interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f64,
    pub max: f64,
}

impl Span {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn covers(&self, other: &Span) -> bool {
        self.min <= other.min && self.max >= other.max
    }
}

/// The immutable patient table shared by every computation pass.
///
/// Observed bounds are computed once from the full table and travel with every
/// filtered view, so "full range" always means the range of the loaded data.
#[derive(Debug, Clone)]
pub struct Cohort {
    records: Vec<PatientRecord>,
    schema: Schema,
    bounds: BTreeMap<NumericField, Span>,
}

impl Cohort {
    pub fn new(records: Vec<PatientRecord>, schema: Schema) -> Self {
        let mut bounds = BTreeMap::new();
        for field in NumericField::ALL {
            let mut observed: Option<Span> = None;
            for value in records.iter().filter_map(|r| r.finite(field)) {
                observed = Some(match observed {
                    Some(span) => Span::new(span.min.min(value), span.max.max(value)),
                    None => Span::new(value, value),
                });
            }
            if let Some(span) = observed {
                bounds.insert(field, span);
            }
        }
        Self {
            records,
            schema,
            bounds,
        }
    }

    /// Builds a cohort whose schema is inferred from the values present.
    pub fn from_records(records: Vec<PatientRecord>) -> Self {
        let schema = Schema::inferred_from(&records);
        Self::new(records, schema)
    }

    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Observed min/max of a numeric field over the whole cohort.
    pub fn observed_bounds(&self, field: NumericField) -> Option<Span> {
        self.bounds.get(&field).copied()
    }

    /// Distinct values of a label field, sorted.
    pub fn distinct_labels(&self, field: LabelField) -> Vec<String> {
        let values: BTreeSet<&str> = self.records.iter().filter_map(|r| r.label(field)).collect();
        values.into_iter().map(str::to_string).collect()
    }
}
