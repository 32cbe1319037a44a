//! # Weighted-Bucket Risk Scoring
//!
//! A risk score is the sum of per-factor contributions. Each factor maps one
//! attribute onto a ladder of non-overlapping threshold buckets that is walked
//! from the most severe rung down; the first rung that admits the value decides
//! the contribution.
//!
//! - Mandatory factors: age, cognitive score and BMI must be present, numeric
//!   and plausible, otherwise the record fails with a `ValidationError`.
//! - Optional factors: an absent or non-numeric value contributes zero.
//! - The total is rounded to two decimals.

use crate::cohort::record::{FlagField, NumericField, PatientRecord};
use crate::types::{RiskScore, ScoringModel};
use thiserror::Error;

/// Why a record cannot be scored.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("required attribute '{0}' is missing")]
    MissingField(&'static str),
    #[error("required attribute '{0}' is not numeric")]
    NonNumeric(&'static str),
    #[error("required attribute '{field}' has implausible value {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
}

/// One rung of a threshold ladder.
#[derive(Debug, Clone, Copy)]
enum Bound {
    AtLeast(f64),
    Below(f64),
    AtMost(f64),
    Above(f64),
    /// Strictly below `low` or strictly above `high`.
    Outside { low: f64, high: f64 },
}

impl Bound {
    fn admits(self, v: f64) -> bool {
        match self {
            Bound::AtLeast(t) => v >= t,
            Bound::Below(t) => v < t,
            Bound::AtMost(t) => v <= t,
            Bound::Above(t) => v > t,
            Bound::Outside { low, high } => v < low || v > high,
        }
    }
}

/// Ordered buckets, most severe first, with a fallback for values no rung admits.
#[derive(Debug)]
struct Ladder {
    rungs: &'static [(Bound, f64)],
    otherwise: f64,
}

impl Ladder {
    fn points(&self, v: f64) -> f64 {
        self.rungs
            .iter()
            .find(|(bound, _)| bound.admits(v))
            .map_or(self.otherwise, |&(_, points)| points)
    }
}

#[derive(Debug)]
enum Input {
    Measure(NumericField, Ladder),
    Flag(FlagField, f64),
}

#[derive(Debug)]
struct Factor {
    name: &'static str,
    input: Input,
}

// --- Legacy model: five factors ---

const LEGACY_FACTORS: &[Factor] = &[
    Factor {
        name: "age",
        input: Input::Measure(
            NumericField::Age,
            Ladder {
                rungs: &[
                    (Bound::AtLeast(80.0), 4.0),
                    (Bound::AtLeast(75.0), 3.0),
                    (Bound::AtLeast(70.0), 2.0),
                ],
                otherwise: 1.0,
            },
        ),
    },
    Factor {
        name: "cognitive_score",
        input: Input::Measure(
            NumericField::CognitiveScore,
            Ladder {
                rungs: &[
                    (Bound::Below(10.0), 3.0),
                    (Bound::Below(18.0), 2.5),
                    (Bound::Below(24.0), 1.5),
                ],
                otherwise: 0.5,
            },
        ),
    },
    Factor {
        name: "bmi",
        input: Input::Measure(
            NumericField::Bmi,
            Ladder {
                rungs: &[
                    (
                        Bound::Outside {
                            low: 18.5,
                            high: 35.0,
                        },
                        1.5,
                    ),
                    (
                        Bound::Outside {
                            low: 20.0,
                            high: 30.0,
                        },
                        1.0,
                    ),
                ],
                otherwise: 0.5,
            },
        ),
    },
    Factor {
        name: "functional_assessment",
        input: Input::Measure(
            NumericField::FunctionalAssessment,
            Ladder {
                rungs: &[(Bound::AtMost(2.0), 1.0), (Bound::AtMost(4.0), 0.7)],
                otherwise: 0.3,
            },
        ),
    },
    Factor {
        name: "cholesterol_total",
        input: Input::Measure(
            NumericField::CholesterolTotal,
            Ladder {
                rungs: &[
                    (
                        Bound::Outside {
                            low: 160.0,
                            high: 280.0,
                        },
                        0.5,
                    ),
                    (Bound::Above(240.0), 0.3),
                ],
                otherwise: 0.0,
            },
        ),
    },
];

// --- Extended model: clinical history and lifestyle ---

const EXTENDED_FACTORS: &[Factor] = &[
    Factor {
        name: "age",
        input: Input::Measure(
            NumericField::Age,
            Ladder {
                rungs: &[
                    (Bound::AtLeast(85.0), 3.5),
                    (Bound::AtLeast(80.0), 3.0),
                    (Bound::AtLeast(75.0), 2.5),
                    (Bound::AtLeast(70.0), 2.0),
                ],
                otherwise: 1.0,
            },
        ),
    },
    Factor {
        name: "cognitive_score",
        input: Input::Measure(
            NumericField::CognitiveScore,
            Ladder {
                rungs: &[
                    (Bound::Below(10.0), 3.5),
                    (Bound::Below(18.0), 3.0),
                    (Bound::Below(24.0), 2.0),
                    (Bound::Below(27.0), 1.0),
                ],
                otherwise: 0.5,
            },
        ),
    },
    Factor {
        name: "functional_assessment",
        input: Input::Measure(
            NumericField::FunctionalAssessment,
            Ladder {
                rungs: &[
                    (Bound::AtMost(2.0), 1.5),
                    (Bound::AtMost(4.0), 1.0),
                    (Bound::AtMost(6.0), 0.5),
                ],
                otherwise: 0.0,
            },
        ),
    },
    Factor {
        name: "adl",
        input: Input::Measure(
            NumericField::Adl,
            Ladder {
                rungs: &[
                    (Bound::AtMost(2.0), 1.5),
                    (Bound::AtMost(4.0), 1.0),
                    (Bound::AtMost(6.0), 0.5),
                ],
                otherwise: 0.0,
            },
        ),
    },
    Factor {
        name: "depression",
        input: Input::Flag(FlagField::Depression, 0.5),
    },
    Factor {
        name: "memory_complaints",
        input: Input::Flag(FlagField::MemoryComplaints, 1.0),
    },
    Factor {
        name: "behavioral_problems",
        input: Input::Flag(FlagField::BehavioralProblems, 0.5),
    },
    Factor {
        name: "personality_changes",
        input: Input::Flag(FlagField::PersonalityChanges, 0.5),
    },
    Factor {
        name: "difficulty_completing_tasks",
        input: Input::Flag(FlagField::DifficultyCompletingTasks, 0.5),
    },
    Factor {
        name: "bmi",
        input: Input::Measure(
            NumericField::Bmi,
            Ladder {
                rungs: &[
                    (
                        Bound::Outside {
                            low: 18.5,
                            high: 35.0,
                        },
                        1.0,
                    ),
                    (
                        Bound::Outside {
                            low: 20.0,
                            high: 30.0,
                        },
                        0.5,
                    ),
                ],
                otherwise: 0.0,
            },
        ),
    },
    Factor {
        name: "cardiovascular_disease",
        input: Input::Flag(FlagField::CardiovascularDisease, 0.5),
    },
    Factor {
        name: "physical_activity",
        input: Input::Measure(
            NumericField::PhysicalActivity,
            Ladder {
                rungs: &[(Bound::Below(1.0), 0.5), (Bound::Below(3.0), 0.3)],
                otherwise: 0.0,
            },
        ),
    },
    Factor {
        name: "smoking",
        input: Input::Flag(FlagField::Smoking, 0.3),
    },
    Factor {
        name: "diet_quality",
        input: Input::Measure(
            NumericField::DietQuality,
            Ladder {
                rungs: &[(Bound::Below(3.0), 0.5), (Bound::Below(5.0), 0.3)],
                otherwise: 0.0,
            },
        ),
    },
];

fn factors(model: ScoringModel) -> &'static [Factor] {
    match model {
        ScoringModel::Legacy => LEGACY_FACTORS,
        ScoringModel::Extended => EXTENDED_FACTORS,
    }
}

/// A single factor's share of a patient's score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub factor: &'static str,
    pub points: f64,
}

/// Checks the attributes every model depends on.
pub fn validate_mandatory(record: &PatientRecord) -> Result<(), ValidationError> {
    let age = required(record, NumericField::Age)?;
    if age <= 0.0 {
        return Err(ValidationError::OutOfRange {
            field: NumericField::Age.column_name(),
            value: age,
            expected: "a positive number of years",
        });
    }

    let cognitive = required(record, NumericField::CognitiveScore)?;
    if !(0.0..=30.0).contains(&cognitive) {
        return Err(ValidationError::OutOfRange {
            field: NumericField::CognitiveScore.column_name(),
            value: cognitive,
            expected: "a value between 0 and 30",
        });
    }

    let bmi = required(record, NumericField::Bmi)?;
    if bmi <= 0.0 {
        return Err(ValidationError::OutOfRange {
            field: NumericField::Bmi.column_name(),
            value: bmi,
            expected: "a positive number",
        });
    }

    Ok(())
}

fn required(record: &PatientRecord, field: NumericField) -> Result<f64, ValidationError> {
    match record.numeric(field) {
        None => Err(ValidationError::MissingField(field.column_name())),
        Some(v) if !v.is_finite() => Err(ValidationError::NonNumeric(field.column_name())),
        Some(v) => Ok(v),
    }
}

/// Per-factor contributions in the model's fixed factor order.
pub fn score_breakdown(
    record: &PatientRecord,
    model: ScoringModel,
) -> Result<Vec<Contribution>, ValidationError> {
    validate_mandatory(record)?;

    let contributions = factors(model)
        .iter()
        .map(|factor| {
            let points = match &factor.input {
                Input::Measure(field, ladder) => {
                    record.finite(*field).map_or(0.0, |v| ladder.points(v))
                }
                Input::Flag(field, points) => {
                    if record.flag(*field) == Some(true) {
                        *points
                    } else {
                        0.0
                    }
                }
            };
            Contribution {
                factor: factor.name,
                points,
            }
        })
        .collect();
    Ok(contributions)
}

/// Scores one patient. Pure; identical inputs always yield identical scores.
pub fn score_patient(
    record: &PatientRecord,
    model: ScoringModel,
) -> Result<RiskScore, ValidationError> {
    let total: f64 = score_breakdown(record, model)?
        .iter()
        .map(|c| c.points)
        .sum();
    Ok(RiskScore::from_points((total * 100.0).round() / 100.0, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskTier;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn legacy_patient(age: f64, cognitive: f64) -> PatientRecord {
        let mut r = PatientRecord::new("p");
        r.age = Some(age);
        r.cognitive_score = Some(cognitive);
        r.bmi = Some(22.0);
        r.functional_assessment = Some(5.0);
        r.cholesterol_total = Some(200.0);
        r
    }

    fn points_for(breakdown: &[Contribution], factor: &str) -> f64 {
        breakdown
            .iter()
            .find(|c| c.factor == factor)
            .map(|c| c.points)
            .unwrap()
    }

    #[test]
    fn legacy_high_risk_patient() {
        let record = legacy_patient(85.0, 8.0);
        let breakdown = score_breakdown(&record, ScoringModel::Legacy).unwrap();
        assert_abs_diff_eq!(points_for(&breakdown, "age"), 4.0);
        assert_abs_diff_eq!(points_for(&breakdown, "cognitive_score"), 3.0);
        assert_abs_diff_eq!(points_for(&breakdown, "bmi"), 0.5);
        assert_abs_diff_eq!(points_for(&breakdown, "functional_assessment"), 0.7);
        assert_abs_diff_eq!(points_for(&breakdown, "cholesterol_total"), 0.0);

        let score = score_patient(&record, ScoringModel::Legacy).unwrap();
        assert_abs_diff_eq!(score.value(), 8.2, epsilon = 1e-12);
        assert_eq!(score.tier(), RiskTier::High);
    }

    #[test]
    fn legacy_medium_risk_patient() {
        let score = score_patient(&legacy_patient(85.0, 26.0), ScoringModel::Legacy).unwrap();
        assert_abs_diff_eq!(score.value(), 5.2, epsilon = 1e-12);
        assert_eq!(score.tier(), RiskTier::Medium);
    }

    #[test]
    fn legacy_bmi_is_scored_by_extremity() {
        let mut r = legacy_patient(60.0, 28.0);
        let bmi_points = |r: &PatientRecord| {
            points_for(&score_breakdown(r, ScoringModel::Legacy).unwrap(), "bmi")
        };
        r.bmi = Some(17.0);
        assert_abs_diff_eq!(bmi_points(&r), 1.5);
        r.bmi = Some(36.0);
        assert_abs_diff_eq!(bmi_points(&r), 1.5);
        r.bmi = Some(19.0);
        assert_abs_diff_eq!(bmi_points(&r), 1.0);
        r.bmi = Some(31.0);
        assert_abs_diff_eq!(bmi_points(&r), 1.0);
        r.bmi = Some(35.0);
        assert_abs_diff_eq!(bmi_points(&r), 1.0);
        r.bmi = Some(25.0);
        assert_abs_diff_eq!(bmi_points(&r), 0.5);
    }

    #[test]
    fn legacy_cholesterol_buckets() {
        let mut r = legacy_patient(60.0, 28.0);
        let chol_points = |r: &PatientRecord| {
            points_for(
                &score_breakdown(r, ScoringModel::Legacy).unwrap(),
                "cholesterol_total",
            )
        };
        r.cholesterol_total = Some(150.0);
        assert_abs_diff_eq!(chol_points(&r), 0.5);
        r.cholesterol_total = Some(290.0);
        assert_abs_diff_eq!(chol_points(&r), 0.5);
        r.cholesterol_total = Some(250.0);
        assert_abs_diff_eq!(chol_points(&r), 0.3);
        r.cholesterol_total = Some(240.0);
        assert_abs_diff_eq!(chol_points(&r), 0.0);
    }

    #[test]
    fn absent_optional_factors_contribute_nothing() {
        let mut r = legacy_patient(72.0, 20.0);
        r.functional_assessment = None;
        r.cholesterol_total = Some(f64::NAN);
        let breakdown = score_breakdown(&r, ScoringModel::Legacy).unwrap();
        assert_abs_diff_eq!(points_for(&breakdown, "functional_assessment"), 0.0);
        assert_abs_diff_eq!(points_for(&breakdown, "cholesterol_total"), 0.0);
        let score = score_patient(&r, ScoringModel::Legacy).unwrap();
        assert_abs_diff_eq!(score.value(), 2.0 + 1.5 + 0.5, epsilon = 1e-12);
    }

    #[test]
    fn mandatory_fields_are_validated() {
        let mut r = legacy_patient(72.0, 20.0);
        r.age = None;
        assert_eq!(
            score_patient(&r, ScoringModel::Legacy).unwrap_err(),
            ValidationError::MissingField("age")
        );

        let mut r = legacy_patient(72.0, 20.0);
        r.cognitive_score = Some(f64::NAN);
        assert_eq!(
            score_patient(&r, ScoringModel::Extended).unwrap_err(),
            ValidationError::NonNumeric("cognitive_score")
        );

        let mut r = legacy_patient(72.0, 20.0);
        r.cognitive_score = Some(31.0);
        assert!(matches!(
            score_patient(&r, ScoringModel::Legacy),
            Err(ValidationError::OutOfRange {
                field: "cognitive_score",
                ..
            })
        ));

        let mut r = legacy_patient(72.0, 20.0);
        r.bmi = None;
        assert_eq!(
            score_patient(&r, ScoringModel::Legacy).unwrap_err(),
            ValidationError::MissingField("bmi")
        );
    }

    #[test]
    fn extended_model_counts_history_and_lifestyle() {
        let mut r = PatientRecord::new("x");
        r.age = Some(86.0);
        r.cognitive_score = Some(25.0);
        r.bmi = Some(25.0);
        r.functional_assessment = Some(3.0);
        r.adl = Some(7.0);
        r.depression = Some(true);
        r.memory_complaints = Some(true);
        r.behavioral_problems = Some(false);
        r.smoking = Some(true);
        r.physical_activity = Some(0.5);
        r.diet_quality = Some(4.0);

        let breakdown = score_breakdown(&r, ScoringModel::Extended).unwrap();
        assert_abs_diff_eq!(points_for(&breakdown, "age"), 3.5);
        assert_abs_diff_eq!(points_for(&breakdown, "cognitive_score"), 1.0);
        assert_abs_diff_eq!(points_for(&breakdown, "functional_assessment"), 1.0);
        assert_abs_diff_eq!(points_for(&breakdown, "adl"), 0.0);
        assert_abs_diff_eq!(points_for(&breakdown, "depression"), 0.5);
        assert_abs_diff_eq!(points_for(&breakdown, "memory_complaints"), 1.0);
        assert_abs_diff_eq!(points_for(&breakdown, "behavioral_problems"), 0.0);
        assert_abs_diff_eq!(points_for(&breakdown, "cardiovascular_disease"), 0.0);
        assert_abs_diff_eq!(points_for(&breakdown, "smoking"), 0.3);
        assert_abs_diff_eq!(points_for(&breakdown, "physical_activity"), 0.5);
        assert_abs_diff_eq!(points_for(&breakdown, "diet_quality"), 0.3);
        assert_abs_diff_eq!(points_for(&breakdown, "bmi"), 0.0);

        let score = score_patient(&r, ScoringModel::Extended).unwrap();
        assert_abs_diff_eq!(score.value(), 8.1, epsilon = 1e-12);
        assert_eq!(score.tier(), RiskTier::Medium);
    }

    fn random_record(rng: &mut StdRng) -> PatientRecord {
        let mut r = PatientRecord::new("r");
        r.age = Some(rng.gen_range(40.0..100.0));
        r.cognitive_score = Some(rng.gen_range(0.0..=30.0));
        r.bmi = Some(rng.gen_range(15.0..45.0));
        if rng.gen_bool(0.8) {
            r.functional_assessment = Some(rng.gen_range(0.0..10.0));
        }
        if rng.gen_bool(0.8) {
            r.adl = Some(rng.gen_range(0.0..10.0));
        }
        if rng.gen_bool(0.8) {
            r.cholesterol_total = Some(rng.gen_range(120.0..320.0));
        }
        r.physical_activity = Some(rng.gen_range(0.0..10.0));
        r.diet_quality = Some(rng.gen_range(0.0..10.0));
        r.depression = Some(rng.gen_bool(0.3));
        r.memory_complaints = Some(rng.gen_bool(0.3));
        r.smoking = Some(rng.gen_bool(0.3));
        r
    }

    #[test]
    fn scores_are_non_negative_hundredths() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1_000 {
            let r = random_record(&mut rng);
            for model in [ScoringModel::Legacy, ScoringModel::Extended] {
                let s = score_patient(&r, model).unwrap().value();
                assert!(s >= 0.0);
                let cents = s * 100.0;
                assert_abs_diff_eq!(cents, cents.round(), epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn older_never_scores_lower() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let younger = random_record(&mut rng);
            let mut older = younger.clone();
            older.age = Some(younger.age.unwrap() + rng.gen_range(0.0..30.0));
            for model in [ScoringModel::Legacy, ScoringModel::Extended] {
                let a = score_patient(&older, model).unwrap().value();
                let b = score_patient(&younger, model).unwrap().value();
                assert!(a >= b, "age monotonicity violated: {a} < {b}");
            }
        }
    }

    #[test]
    fn more_impaired_cognition_never_scores_lower() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let sharper = random_record(&mut rng);
            let mut impaired = sharper.clone();
            impaired.cognitive_score =
                Some(rng.gen_range(0.0..=sharper.cognitive_score.unwrap()));
            for model in [ScoringModel::Legacy, ScoringModel::Extended] {
                let a = score_patient(&impaired, model).unwrap().value();
                let b = score_patient(&sharper, model).unwrap().value();
                assert!(a >= b);
            }
        }
    }

    #[test]
    fn ladders_are_ordered_most_severe_first() {
        for model in [ScoringModel::Legacy, ScoringModel::Extended] {
            for factor in factors(model) {
                if let Input::Measure(_, ladder) = &factor.input {
                    let mut previous = f64::INFINITY;
                    for (_, points) in ladder.rungs {
                        assert!(*points <= previous, "{} rungs not descending", factor.name);
                        previous = *points;
                    }
                    assert!(ladder.otherwise <= previous);
                }
            }
        }
    }
}
