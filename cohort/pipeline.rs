// ========================================================================================
//
//                 ONE RECOMPUTATION PASS: FILTER, SCORE, CLASSIFY, FLAG, SUMMARIZE
//
// ========================================================================================

use crate::cohort::config::DashboardConfig;
use crate::cohort::filter::{FilterError, PopulationView};
use crate::cohort::record::{Cohort, PatientRecord, Schema};
use crate::cohort::summary::{CohortSummary, summarize};
use crate::flag::early_detection_flag;
use crate::scorer::{ValidationError, score_patient};
use crate::types::{RiskScore, RiskTier, ScoringModel};
use log::{info, warn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid filter configuration: {0}")]
    Filter(#[from] FilterError),
}

/// A record together with the values derived from it during this pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPatient<'a> {
    pub record: &'a PatientRecord,
    pub score: RiskScore,
    pub tier: RiskTier,
    pub early_detection: bool,
}

impl<'a> ScoredPatient<'a> {
    pub fn assess(record: &'a PatientRecord, model: ScoringModel) -> Result<Self, ValidationError> {
        let score = score_patient(record, model)?;
        Ok(Self {
            record,
            score,
            tier: score.tier(),
            early_detection: early_detection_flag(record),
        })
    }
}

/// A record left out of scoring, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedRecord {
    pub patient_id: String,
    pub reason: ValidationError,
}

/// Everything derived for one filtered population.
#[derive(Debug, Clone)]
pub struct Assessment<'a> {
    pub model: ScoringModel,
    pub patients: Vec<ScoredPatient<'a>>,
    pub excluded: Vec<ExcludedRecord>,
    pub summary: CohortSummary,
}

impl<'a> Assessment<'a> {
    /// Scores every patient of the view. Invalid records are collected rather
    /// than aborting the pass.
    pub fn of(view: &PopulationView<'a>, model: ScoringModel, roster_limit: usize) -> Self {
        let mut patients = Vec::with_capacity(view.len());
        let mut excluded = Vec::new();
        for record in view.records() {
            match ScoredPatient::assess(record, model) {
                Ok(patient) => patients.push(patient),
                Err(reason) => excluded.push(ExcludedRecord {
                    patient_id: record.patient_id.clone(),
                    reason,
                }),
            }
        }
        if !excluded.is_empty() {
            warn!(
                "{} record(s) excluded from scoring because of invalid mandatory fields.",
                excluded.len()
            );
        }
        let summary = summarize(&patients, view.cohort().schema(), roster_limit);
        Self {
            model,
            patients,
            excluded,
            summary,
        }
    }

}

/// Result of one pass.
#[derive(Debug, Clone)]
pub enum PassOutcome<'a> {
    Assessed(Assessment<'a>),
    /// The filters matched nobody. `empty` is the zero-valued summary and
    /// `fallback` summarizes the unfiltered population.
    NoMatches {
        active_filters: usize,
        empty: CohortSummary,
        fallback: Box<Assessment<'a>>,
    },
}

/// Runs one synchronous pass over the cohort. The cohort is never mutated;
/// every derived value is computed fresh.
pub fn run_pass<'a>(
    cohort: &'a Cohort,
    config: &DashboardConfig,
) -> Result<PassOutcome<'a>, PipelineError> {
    let model = config.scoring_model;
    let roster = config.high_risk_listing;
    match cohort.filter(&config.filters) {
        Ok(view) => {
            info!(
                "Assessing {} of {} patients with the {} model.",
                view.len(),
                cohort.len(),
                model
            );
            Ok(PassOutcome::Assessed(Assessment::of(&view, model, roster)))
        }
        Err(FilterError::EmptyResult { active_filters }) => {
            warn!(
                "No patients match the {} active filter(s); summarizing the unfiltered population instead.",
                active_filters
            );
            let everyone = PopulationView::all(cohort);
            Ok(PassOutcome::NoMatches {
                active_filters,
                empty: empty_summary(cohort.schema(), roster),
                fallback: Box::new(Assessment::of(&everyone, model, roster)),
            })
        }
        Err(other) => Err(other.into()),
    }
}

fn empty_summary(schema: &Schema, roster: usize) -> CohortSummary {
    summarize(&[], schema, roster)
}
