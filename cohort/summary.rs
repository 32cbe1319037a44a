// ========================================================================================
//
//                          AGGREGATE STATISTICS OF A SCORED POPULATION
//
// ========================================================================================

use crate::cohort::pipeline::ScoredPatient;
use crate::cohort::record::{NumericField, Schema};
use crate::types::RiskTier;
use log::debug;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Minimum number of records carrying a variable, or a pair of variables,
/// for it to enter the correlation matrix.
pub const MIN_CORRELATION_ROWS: usize = 3;
/// Minimum number of non-degenerate variables for a correlation matrix.
pub const MIN_CORRELATION_VARIABLES: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsufficientData {
    #[error("only {found} record(s); at least {required} are needed for correlations")]
    TooFewRecords { found: usize, required: usize },
    #[error("only {found} variable(s) vary across the population; at least {required} are needed")]
    TooFewVariables { found: usize, required: usize },
}

/// A variable that may enter the correlation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    Attribute(NumericField),
    RiskScore,
}

impl Variable {
    /// Candidate variables in reporting order.
    pub const CANDIDATES: [Variable; 10] = [
        Variable::Attribute(NumericField::Age),
        Variable::Attribute(NumericField::CognitiveScore),
        Variable::Attribute(NumericField::Bmi),
        Variable::Attribute(NumericField::CholesterolTotal),
        Variable::Attribute(NumericField::FunctionalAssessment),
        Variable::Attribute(NumericField::PhysicalActivity),
        Variable::Attribute(NumericField::AlcoholConsumption),
        Variable::Attribute(NumericField::DietQuality),
        Variable::Attribute(NumericField::Adl),
        Variable::RiskScore,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Variable::Attribute(field) => field.column_name(),
            Variable::RiskScore => "risk_score",
        }
    }

    fn value(self, patient: &ScoredPatient<'_>) -> Option<f64> {
        match self {
            Variable::Attribute(field) => patient.record.finite(field),
            Variable::RiskScore => Some(patient.score.value()),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pearson coefficients over a named, ordered set of variables.
///
/// Each pair is computed over the records that carry both values. A pair with
/// fewer than `MIN_CORRELATION_ROWS` such records, or with no variation among
/// them, has a NaN coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub variables: Vec<String>,
    pub coefficients: Array2<f64>,
    /// Records with both values present, per pair. The diagonal counts the
    /// records carrying that variable.
    pub observations: Array2<usize>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.variables.iter().position(|v| v == a)?;
        let j = self.variables.iter().position(|v| v == b)?;
        Some(self.coefficients[[i, j]])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Correlation {
    Matrix(CorrelationMatrix),
    Insufficient(InsufficientData),
}

impl Correlation {
    pub fn matrix(&self) -> Option<&CorrelationMatrix> {
        match self {
            Correlation::Matrix(matrix) => Some(matrix),
            Correlation::Insufficient(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSummary {
    pub tier: RiskTier,
    pub count: usize,
    pub percentage: f64,
    pub early_detection_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_cognitive_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_age: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_bmi: Option<f64>,
}

/// One line of the high-risk roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub patient_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cognitive_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
    pub risk_score: f64,
    pub early_detection: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub total: usize,
    pub early_detection_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_risk_score: Option<f64>,
    /// Always three entries, High first.
    pub tiers: Vec<TierSummary>,
    pub high_risk: Vec<RosterEntry>,
    pub correlation: Correlation,
}

impl CohortSummary {
    pub fn tier(&self, tier: RiskTier) -> Option<&TierSummary> {
        self.tiers.iter().find(|t| t.tier == tier)
    }
}

/// Summarizes a scored population. An empty population yields zero counts,
/// 0% per tier and an insufficient-data correlation.
pub fn summarize(
    patients: &[ScoredPatient<'_>],
    schema: &Schema,
    roster_limit: usize,
) -> CohortSummary {
    let total = patients.len();

    let tiers = RiskTier::DESCENDING
        .iter()
        .map(|&tier| {
            let members: Vec<&ScoredPatient<'_>> =
                patients.iter().filter(|p| p.tier == tier).collect();
            let count = members.len();
            TierSummary {
                tier,
                count,
                percentage: percentage(count, total),
                early_detection_count: members.iter().filter(|p| p.early_detection).count(),
                mean_cognitive_score: mean(
                    members.iter().filter_map(|p| p.record.finite(NumericField::CognitiveScore)),
                ),
                mean_age: mean(members.iter().filter_map(|p| p.record.finite(NumericField::Age))),
                mean_bmi: mean(members.iter().filter_map(|p| p.record.finite(NumericField::Bmi))),
            }
        })
        .collect();

    let high_risk = patients
        .iter()
        .filter(|p| p.tier == RiskTier::High)
        .take(roster_limit)
        .map(|p| RosterEntry {
            patient_id: p.record.patient_id.clone(),
            age: p.record.finite(NumericField::Age),
            cognitive_score: p.record.finite(NumericField::CognitiveScore),
            bmi: p.record.finite(NumericField::Bmi),
            risk_score: p.score.value(),
            early_detection: p.early_detection,
        })
        .collect();

    let correlation = match correlation_matrix(patients, schema) {
        Ok(matrix) => Correlation::Matrix(matrix),
        Err(reason) => {
            debug!("Correlation matrix omitted: {}", reason);
            Correlation::Insufficient(reason)
        }
    };

    CohortSummary {
        total,
        early_detection_count: patients.iter().filter(|p| p.early_detection).count(),
        mean_risk_score: mean(patients.iter().map(|p| p.score.value())),
        tiers,
        high_risk,
        correlation,
    }
}

/// Pearson correlation over the candidate variables present in `schema`.
///
/// Values are paired per variable pair, so a sparse column never removes rows
/// from the other pairs. Variables with fewer than `MIN_CORRELATION_ROWS`
/// values, or with a single distinct value, are left out.
pub fn correlation_matrix(
    patients: &[ScoredPatient<'_>],
    schema: &Schema,
) -> Result<CorrelationMatrix, InsufficientData> {
    if patients.len() < MIN_CORRELATION_ROWS {
        return Err(InsufficientData::TooFewRecords {
            found: patients.len(),
            required: MIN_CORRELATION_ROWS,
        });
    }

    let (variables, columns): (Vec<Variable>, Vec<Vec<Option<f64>>>) = Variable::CANDIDATES
        .into_iter()
        .filter(|v| match v {
            Variable::Attribute(field) => schema.has_numeric(*field),
            Variable::RiskScore => true,
        })
        .map(|v| (v, patients.iter().map(|p| v.value(p)).collect::<Vec<_>>()))
        .filter(|(v, column)| {
            let present: Vec<f64> = column.iter().flatten().copied().collect();
            let usable = present.len() >= MIN_CORRELATION_ROWS && internal::variance(&present) > 0.0;
            if !usable {
                debug!("Variable '{}' left out of the correlation matrix.", v);
            }
            usable
        })
        .unzip();

    if variables.len() < MIN_CORRELATION_VARIABLES {
        return Err(InsufficientData::TooFewVariables {
            found: variables.len(),
            required: MIN_CORRELATION_VARIABLES,
        });
    }

    let n = variables.len();
    let mut coefficients = Array2::<f64>::eye(n);
    let mut observations = Array2::<usize>::zeros((n, n));
    for i in 0..n {
        observations[[i, i]] = columns[i].iter().flatten().count();
        for j in (i + 1)..n {
            let (x, y): (Vec<f64>, Vec<f64>) = columns[i]
                .iter()
                .zip(&columns[j])
                .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                .unzip();
            let r = if x.len() < MIN_CORRELATION_ROWS {
                f64::NAN
            } else {
                internal::pearson(&x, &y)
            };
            coefficients[[i, j]] = r;
            coefficients[[j, i]] = r;
            observations[[i, j]] = x.len();
            observations[[j, i]] = x.len();
        }
    }
    Ok(CorrelationMatrix {
        variables: variables.iter().map(|v| v.name().to_string()).collect(),
        coefficients,
        observations,
    })
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

mod internal {
    use super::*;

    pub(super) fn variance(values: &[f64]) -> f64 {
        let Some(m) = mean(values.iter().copied()) else {
            return 0.0;
        };
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
    }

    pub(super) fn pearson(x: &[f64], y: &[f64]) -> f64 {
        let n = x.len() as f64;
        let mx = x.iter().sum::<f64>() / n;
        let my = y.iter().sum::<f64>() / n;
        let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
        for (a, b) in x.iter().zip(y) {
            let (dx, dy) = (a - mx, b - my);
            sxy += dx * dy;
            sxx += dx * dx;
            syy += dy * dy;
        }
        let r = sxy / (sxx.sqrt() * syy.sqrt());
        if r.is_nan() { r } else { r.clamp(-1.0, 1.0) }
    }
}
