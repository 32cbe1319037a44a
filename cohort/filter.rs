//! # Population Filter
//!
//! A `FilterConfig` is the user-facing description of the active constraints:
//! one categorical selection per dimension (`"All"` disables it) and one
//! optional inclusive range per numeric dimension. It is compiled once against
//! the cohort into typed predicates and applied as a pure conjunction, so the
//! order in which constraints are applied never matters.

use crate::cohort::data::parse_flag;
use crate::cohort::record::{Cohort, FlagField, LabelField, NumericField, PatientRecord, Span};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("'{value}' is not a valid selection for '{field}' (expected All, yes or no)")]
    InvalidSelection { field: &'static str, value: String },
    #[error("range for '{field}' is invalid: min {min} must be finite and not greater than max {max}")]
    InvalidRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("no patients match the {active_filters} active filter(s)")]
    EmptyResult { active_filters: usize },
}

/// A categorical constraint: either disabled or pinned to one value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl From<String> for Selection {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("all") {
            Selection::All
        } else {
            Selection::Only(value.trim().to_string())
        }
    }
}

impl From<Selection> for String {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::All => "All".to_string(),
            Selection::Only(value) => value,
        }
    }
}

impl Selection {
    pub fn only(value: impl Into<String>) -> Self {
        Selection::from(value.into())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }
}

/// The active constraints narrowing the population.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    pub gender: Selection,
    pub ethnicity: Selection,
    pub smoking: Selection,
    pub depression: Selection,
    pub cardiovascular_disease: Selection,
    pub memory_complaints: Selection,
    pub behavioral_problems: Selection,
    pub personality_changes: Selection,
    pub difficulty_completing_tasks: Selection,
    pub diagnosis: Selection,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cognitive_score: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functional_assessment: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adl: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_activity: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alcohol_consumption: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diet_quality: Option<Span>,
}

/// Numeric dimensions exposed as range filters.
pub const RANGE_FIELDS: [NumericField; 8] = [
    NumericField::Age,
    NumericField::Bmi,
    NumericField::CognitiveScore,
    NumericField::FunctionalAssessment,
    NumericField::Adl,
    NumericField::PhysicalActivity,
    NumericField::AlcoholConsumption,
    NumericField::DietQuality,
];

/// Yes/no dimensions exposed as categorical filters.
pub const FLAG_FIELDS: [FlagField; 8] = [
    FlagField::Smoking,
    FlagField::Depression,
    FlagField::CardiovascularDisease,
    FlagField::MemoryComplaints,
    FlagField::BehavioralProblems,
    FlagField::PersonalityChanges,
    FlagField::DifficultyCompletingTasks,
    FlagField::Diagnosis,
];

impl FilterConfig {
    pub fn selection(&self, field: LabelField) -> &Selection {
        match field {
            LabelField::Gender => &self.gender,
            LabelField::Ethnicity => &self.ethnicity,
        }
    }

    pub fn flag_selection(&self, field: FlagField) -> &Selection {
        match field {
            FlagField::Smoking => &self.smoking,
            FlagField::Depression => &self.depression,
            FlagField::CardiovascularDisease => &self.cardiovascular_disease,
            FlagField::MemoryComplaints => &self.memory_complaints,
            FlagField::BehavioralProblems => &self.behavioral_problems,
            FlagField::PersonalityChanges => &self.personality_changes,
            FlagField::DifficultyCompletingTasks => &self.difficulty_completing_tasks,
            FlagField::Diagnosis => &self.diagnosis,
        }
    }

    /// The configured range of a numeric dimension, if any.
    pub fn range(&self, field: NumericField) -> Option<Span> {
        match field {
            NumericField::Age => self.age,
            NumericField::Bmi => self.bmi,
            NumericField::CognitiveScore => self.cognitive_score,
            NumericField::FunctionalAssessment => self.functional_assessment,
            NumericField::Adl => self.adl,
            NumericField::PhysicalActivity => self.physical_activity,
            NumericField::AlcoholConsumption => self.alcohol_consumption,
            NumericField::DietQuality => self.diet_quality,
            NumericField::CholesterolTotal => None,
        }
    }

    pub fn set_range(&mut self, field: NumericField, span: Option<Span>) {
        let slot = match field {
            NumericField::Age => &mut self.age,
            NumericField::Bmi => &mut self.bmi,
            NumericField::CognitiveScore => &mut self.cognitive_score,
            NumericField::FunctionalAssessment => &mut self.functional_assessment,
            NumericField::Adl => &mut self.adl,
            NumericField::PhysicalActivity => &mut self.physical_activity,
            NumericField::AlcoholConsumption => &mut self.alcohol_consumption,
            NumericField::DietQuality => &mut self.diet_quality,
            NumericField::CholesterolTotal => return,
        };
        *slot = span;
    }

    /// The widest configuration for a cohort: every selection is `All` and every
    /// range spans the observed values. Applying it keeps every patient.
    pub fn spanning(cohort: &Cohort) -> Self {
        let mut config = FilterConfig::default();
        for field in RANGE_FIELDS {
            config.set_range(field, cohort.observed_bounds(field));
        }
        config
    }

    /// Validates the configuration and turns it into typed predicates.
    ///
    /// Ranges that cover the cohort's whole observed range are dropped, so they
    /// keep patients whose value for that dimension is absent.
    pub fn compile(&self, cohort: &Cohort) -> Result<FilterSet, FilterError> {
        let mut predicates = Vec::new();

        for field in LabelField::ALL {
            if let Selection::Only(value) = self.selection(field) {
                predicates.push(Predicate::Label {
                    field,
                    value: value.clone(),
                });
            }
        }

        for field in FLAG_FIELDS {
            if let Selection::Only(value) = self.flag_selection(field) {
                let wanted = parse_flag(value).ok_or_else(|| FilterError::InvalidSelection {
                    field: field.column_name(),
                    value: value.clone(),
                })?;
                predicates.push(Predicate::Flag { field, wanted });
            }
        }

        for field in RANGE_FIELDS {
            let Some(span) = self.range(field) else {
                continue;
            };
            if !span.min.is_finite() || !span.max.is_finite() || span.min > span.max {
                return Err(FilterError::InvalidRange {
                    field: field.column_name(),
                    min: span.min,
                    max: span.max,
                });
            }
            match cohort.observed_bounds(field) {
                Some(observed) if span.covers(&observed) => {
                    debug!("Range on '{}' spans all observed values; ignored.", field.column_name());
                }
                _ => predicates.push(Predicate::Range { field, span }),
            }
        }

        Ok(FilterSet { predicates })
    }
}

/// One compiled constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Label { field: LabelField, value: String },
    Flag { field: FlagField, wanted: bool },
    Range { field: NumericField, span: Span },
}

impl Predicate {
    /// Absent values never satisfy an active constraint.
    pub fn matches(&self, record: &PatientRecord) -> bool {
        match self {
            Predicate::Label { field, value } => record.label(*field) == Some(value.as_str()),
            Predicate::Flag { field, wanted } => record.flag(*field) == Some(*wanted),
            Predicate::Range { field, span } => {
                record.finite(*field).is_some_and(|v| span.contains(v))
            }
        }
    }
}

/// A conjunction of compiled predicates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterSet {
    predicates: Vec<Predicate>,
}

impl FilterSet {
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Number of constraints that actually narrow the population.
    pub fn active(&self) -> usize {
        self.predicates.len()
    }

    pub fn matches(&self, record: &PatientRecord) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }
}

/// A read-only subset of a cohort, held as row indices in cohort order.
#[derive(Debug, Clone)]
pub struct PopulationView<'a> {
    cohort: &'a Cohort,
    rows: Vec<usize>,
}

impl<'a> PopulationView<'a> {
    /// The unfiltered population.
    pub fn all(cohort: &'a Cohort) -> Self {
        Self {
            cohort,
            rows: (0..cohort.len()).collect(),
        }
    }

    pub fn cohort(&self) -> &'a Cohort {
        self.cohort
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &'a PatientRecord> + '_ {
        let records = self.cohort.records();
        self.rows.iter().map(move |&i| &records[i])
    }

    /// Narrows this view further. Fails with `EmptyResult` when nothing is left.
    pub fn refine(&self, config: &FilterConfig) -> Result<PopulationView<'a>, FilterError> {
        let filters = config.compile(self.cohort)?;
        self.apply(&filters)
    }

    pub fn apply(&self, filters: &FilterSet) -> Result<PopulationView<'a>, FilterError> {
        let records = self.cohort.records();
        let rows: Vec<usize> = self
            .rows
            .iter()
            .copied()
            .filter(|&i| filters.matches(&records[i]))
            .collect();
        debug!(
            "{} of {} patients satisfy {} active filter(s).",
            rows.len(),
            self.rows.len(),
            filters.active()
        );
        if rows.is_empty() {
            return Err(FilterError::EmptyResult {
                active_filters: filters.active(),
            });
        }
        Ok(PopulationView {
            cohort: self.cohort,
            rows,
        })
    }
}

impl Cohort {
    /// Applies a filter configuration to the whole cohort.
    pub fn filter(&self, config: &FilterConfig) -> Result<PopulationView<'_>, FilterError> {
        PopulationView::all(self).refine(config)
    }
}
