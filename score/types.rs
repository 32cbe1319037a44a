// ========================================================================================
//
//                      SHARED TYPES OF THE RISK-SCORING CORE
//
// ========================================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which weighted-bucket formula produces a risk score.
///
/// Each model comes with its own tier thresholds. A `RiskScore` remembers the
/// model that produced it and is always classified with that model's
/// thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringModel {
    /// Five factors: age, cognitive score, BMI, functional assessment, cholesterol.
    #[default]
    Legacy,
    /// Clinical and lifestyle factors on top of age and cognition.
    Extended,
}

impl ScoringModel {
    pub fn thresholds(self) -> TierThresholds {
        match self {
            ScoringModel::Legacy => TierThresholds {
                medium: 5.0,
                high: 7.0,
            },
            ScoringModel::Extended => TierThresholds {
                medium: 6.0,
                high: 9.0,
            },
        }
    }
}

impl fmt::Display for ScoringModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringModel::Legacy => write!(f, "legacy"),
            ScoringModel::Extended => write!(f, "extended"),
        }
    }
}

/// Lower bounds of the Medium and High tiers. Scores below `medium` are Low.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierThresholds {
    pub medium: f64,
    pub high: f64,
}

/// Coarse risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Reporting order: most severe first.
    pub const DESCENDING: [RiskTier; 3] = [RiskTier::High, RiskTier::Medium, RiskTier::Low];

    pub fn label(self) -> &'static str {
        match self {
            RiskTier::Low => "Low Risk",
            RiskTier::Medium => "Medium Risk",
            RiskTier::High => "High Risk",
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            RiskTier::Low => "Routine monitoring",
            RiskTier::Medium => "Enhanced screening",
            RiskTier::High => "Immediate attention",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("risk score must be a finite number, got {0}")]
pub struct NonFiniteScore(pub f64);

/// A finite risk score tagged with the model that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskScore {
    value: f64,
    model: ScoringModel,
}

impl RiskScore {
    pub fn new(value: f64, model: ScoringModel) -> Result<Self, NonFiniteScore> {
        if !value.is_finite() {
            return Err(NonFiniteScore(value));
        }
        Ok(Self { value, model })
    }

    /// Contributions are finite constants, so their sum needs no check.
    pub(crate) fn from_points(value: f64, model: ScoringModel) -> Self {
        debug_assert!(value.is_finite());
        Self { value, model }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn model(&self) -> ScoringModel {
        self.model
    }

    /// The tier under the thresholds of the producing model.
    pub fn tier(&self) -> RiskTier {
        self.model.thresholds().classify(self.value)
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.value)
    }
}
