//! Mapping risk scores onto the three ordered tiers.

use crate::types::{RiskScore, RiskTier, TierThresholds};

impl TierThresholds {
    /// Total over all real numbers: `[high, +inf)` is High, `[medium, high)` is
    /// Medium and everything below `medium` is Low.
    pub fn classify(&self, score: f64) -> RiskTier {
        if score >= self.high {
            RiskTier::High
        } else if score >= self.medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

/// Classifies a score with the thresholds of the model that produced it.
pub fn classify(score: &RiskScore) -> RiskTier {
    score.tier()
}
