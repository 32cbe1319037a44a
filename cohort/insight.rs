//! Reporting helpers layered on top of a computed correlation matrix.

use crate::cohort::summary::{CorrelationMatrix, Variable};
use itertools::Itertools;
use std::cmp::Ordering;

/// A pair of variables and their coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedPair {
    pub first: String,
    pub second: String,
    pub coefficient: f64,
}

impl CorrelatedPair {
    pub fn direction(&self) -> &'static str {
        if self.coefficient >= 0.0 {
            "positive"
        } else {
            "negative"
        }
    }
}

/// The off-diagonal pair with the largest absolute coefficient.
///
/// Ties keep the pair that comes first in variable order.
pub fn strongest_pair(matrix: &CorrelationMatrix) -> Option<CorrelatedPair> {
    let mut best: Option<(usize, usize, f64)> = None;
    for (i, j) in (0..matrix.variables.len()).tuple_combinations() {
        let r = matrix.coefficients[[i, j]];
        if !r.is_finite() {
            continue;
        }
        if best.is_none_or(|(_, _, current)| r.abs() > current.abs()) {
            best = Some((i, j, r));
        }
    }
    best.map(|(i, j, coefficient)| CorrelatedPair {
        first: matrix.variables[i].clone(),
        second: matrix.variables[j].clone(),
        coefficient,
    })
}

/// Each variable's coefficient with the risk score, strongest first. Pairs
/// without a defined coefficient are skipped.
pub fn risk_drivers(matrix: &CorrelationMatrix) -> Vec<(String, f64)> {
    let target = Variable::RiskScore.name();
    let Some(k) = matrix.variables.iter().position(|v| v == target) else {
        return Vec::new();
    };
    matrix
        .variables
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != k && matrix.coefficients[[i, k]].is_finite())
        .map(|(i, name)| (name.clone(), matrix.coefficients[[i, k]]))
        .sorted_by(|a, b| b.1.abs().partial_cmp(&a.1.abs()).unwrap_or(Ordering::Equal))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    fn matrix() -> CorrelationMatrix {
        CorrelationMatrix {
            variables: vec![
                "age".into(),
                "cognitive_score".into(),
                "bmi".into(),
                "risk_score".into(),
            ],
            coefficients: array![
                [1.0, -0.4, 0.1, 0.7],
                [-0.4, 1.0, 0.0, -0.8],
                [0.1, 0.0, 1.0, 0.3],
                [0.7, -0.8, 0.3, 1.0],
            ],
            observations: Array2::from_elem((4, 4), 10),
        }
    }

    #[test]
    fn strongest_pair_ignores_the_diagonal() {
        let pair = strongest_pair(&matrix()).unwrap();
        assert_eq!(pair.first, "cognitive_score");
        assert_eq!(pair.second, "risk_score");
        assert_eq!(pair.coefficient, -0.8);
        assert_eq!(pair.direction(), "negative");
    }

    #[test]
    fn ties_keep_the_first_pair() {
        let mut m = matrix();
        m.coefficients[[0, 1]] = 0.8;
        m.coefficients[[1, 0]] = 0.8;
        let pair = strongest_pair(&m).unwrap();
        assert_eq!((pair.first.as_str(), pair.second.as_str()), ("age", "cognitive_score"));
    }

    #[test]
    fn risk_drivers_are_sorted_by_magnitude() {
        let drivers = risk_drivers(&matrix());
        let names: Vec<&str> = drivers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["cognitive_score", "age", "bmi"]);
    }

    #[test]
    fn undefined_coefficients_are_skipped() {
        let mut m = matrix();
        m.coefficients[[1, 3]] = f64::NAN;
        m.coefficients[[3, 1]] = f64::NAN;
        let pair = strongest_pair(&m).unwrap();
        assert_eq!((pair.first.as_str(), pair.second.as_str()), ("age", "risk_score"));
        let names: Vec<String> = risk_drivers(&m).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["age", "bmi"]);
    }

    #[test]
    fn risk_drivers_need_the_risk_score_column() {
        let mut m = matrix();
        m.variables[3] = "diet_quality".into();
        assert!(risk_drivers(&m).is_empty());
    }
}
