use serde::Serialize;

use crate::error::TathyaError;

/// Indicator labels and weights for the risk assessment page. Weights sum to
/// 1.0, so a full set of sliders at 10 scores exactly 100. The score is
/// informational only and feeds no workflow decision.
pub const INDICATORS: [(&str, f64); 10] = [
    ("Document authenticity concerns", 0.15),
    ("Income inflation indicators", 0.12),
    ("Employer verification failure", 0.12),
    ("Address mismatch", 0.08),
    ("Bureau history anomalies", 0.10),
    ("Early payment default", 0.13),
    ("Third-party involvement", 0.08),
    ("Collateral overvaluation", 0.09),
    ("Branch process deviation", 0.06),
    ("Customer untraceable", 0.07),
];

pub const BANDS: [&str; 4] = ["Low", "Medium", "High", "Critical"];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RiskScore {
    pub score: f64,
    pub band: &'static str,
}

pub struct Risk;

impl Risk {
    /// Weighted score over the indicator sliders, each valued 0 to 10.
    /// Expects exactly one value per indicator, in INDICATORS order.
    pub fn score(values: &[f64]) -> Result<RiskScore, TathyaError> {
        if values.len() != INDICATORS.len() {
            return Err(TathyaError::Error(format!(
                "Expected {} indicator values, got {}",
                INDICATORS.len(),
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite() || !(0.0..=10.0).contains(v)) {
            return Err(TathyaError::Error(
                "Indicator values must be between 0 and 10".to_string(),
            ));
        }

        let weighted: f64 = INDICATORS
            .iter()
            .zip(values)
            .map(|((_, weight), value)| weight * value)
            .sum();

        // One decimal place, banded after rounding so the display agrees
        let score = (weighted * 100.0).round() / 10.0;
        Ok(RiskScore {
            score,
            band: Self::band_for(score),
        })
    }

    pub fn band_for(score: f64) -> &'static str {
        if score < 25.0 {
            "Low"
        } else if score < 50.0 {
            "Medium"
        } else if score < 75.0 {
            "High"
        } else {
            "Critical"
        }
    }
}
