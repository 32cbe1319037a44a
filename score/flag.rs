//! Early-detection alarm.
//!
//! The flag is a plain disjunction over raw clinical thresholds. It never looks
//! at the risk score, so a Low-tier patient can still be flagged.

use crate::cohort::record::{NumericField, PatientRecord};

/// Cognitive score strictly below this value triggers the flag.
pub const COGNITIVE_SCORE_BELOW: f64 = 18.0;
/// Age strictly above this value triggers the flag.
pub const AGE_ABOVE: f64 = 75.0;
/// BMI strictly above this value triggers the flag.
pub const BMI_ABOVE: f64 = 35.0;
/// Functional assessment at or below this value triggers the flag.
pub const FUNCTIONAL_ASSESSMENT_AT_MOST: f64 = 3.0;

/// Which early-detection conditions a patient meets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EarlyDetection {
    pub cognitive_impairment: bool,
    pub advanced_age: bool,
    pub severe_obesity: bool,
    pub functional_dependency: bool,
}

impl EarlyDetection {
    /// Evaluates every condition. An absent or non-numeric attribute leaves its
    /// condition unmet.
    pub fn assess(record: &PatientRecord) -> Self {
        let check = |field: NumericField, trigger: fn(f64) -> bool| {
            record.finite(field).is_some_and(trigger)
        };
        Self {
            cognitive_impairment: check(NumericField::CognitiveScore, |v| {
                v < COGNITIVE_SCORE_BELOW
            }),
            advanced_age: check(NumericField::Age, |v| v > AGE_ABOVE),
            severe_obesity: check(NumericField::Bmi, |v| v > BMI_ABOVE),
            functional_dependency: check(NumericField::FunctionalAssessment, |v| {
                v <= FUNCTIONAL_ASSESSMENT_AT_MOST
            }),
        }
    }

    pub fn flagged(&self) -> bool {
        self.cognitive_impairment
            || self.advanced_age
            || self.severe_obesity
            || self.functional_dependency
    }
}

/// True when any single early-detection threshold is crossed.
pub fn early_detection_flag(record: &PatientRecord) -> bool {
    EarlyDetection::assess(record).flagged()
}
