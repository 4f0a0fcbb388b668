use axum::{http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use super::{api_error, internal_error, ApiError};
use crate::error::TathyaError;
use crate::risk::{Risk, RiskScore, BANDS, INDICATORS};
use crate::sessions::Session;

#[derive(Debug, Serialize)]
pub struct IndicatorInfo {
    pub name: &'static str,
    pub weight: f64,
}

#[derive(Debug, Serialize)]
pub struct IndicatorsResponse {
    pub indicators: Vec<IndicatorInfo>,
    pub bands: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    /// One slider value per indicator, each 0 to 10.
    pub values: Vec<f64>,
}

/// GET /api/risk/indicators
pub async fn get_indicators(
    Extension(_session): Extension<Session>,
) -> Result<Json<IndicatorsResponse>, ApiError> {
    let indicators = INDICATORS
        .iter()
        .map(|&(name, weight)| IndicatorInfo { name, weight })
        .collect();
    Ok(Json(IndicatorsResponse {
        indicators,
        bands: BANDS.to_vec(),
    }))
}

/// POST /api/risk/score
///
/// Advisory scoring for the assessment sliders. Nothing is stored; the
/// result feeds back into the form only.
pub async fn score(
    Extension(_session): Extension<Session>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<RiskScore>, ApiError> {
    match Risk::score(&request.values) {
        Ok(score) => Ok(Json(score)),
        Err(TathyaError::Error(message)) => Err(api_error(StatusCode::BAD_REQUEST, message)),
        Err(e) => Err(internal_error("Failed to compute risk score", e)),
    }
}
