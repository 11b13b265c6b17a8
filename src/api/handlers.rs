use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{
        ClusterLabel, NormalizedFeatureVector, RawTrackInput, RawTrackRecord, Recommendations,
    },
    services::providers::TrackQuery,
};

use super::AppState;

// Request/Response types

/// Seed given either as raw attributes or as an already normalized vector
#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub track: Option<RawTrackInput>,
    #[serde(default)]
    pub vector: Option<Vec<f64>>,
    #[serde(default)]
    pub top_k: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub top_k: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PreprocessResponse {
    pub vector: NormalizedFeatureVector,
    pub cluster: ClusterLabel,
}

/// Resolves the requested result size, rejecting non-positive values
fn resolve_top_k(requested: Option<i64>, default: usize) -> AppResult<usize> {
    match requested {
        None => Ok(default),
        Some(k) if k > 0 => usize::try_from(k)
            .map_err(|_| AppError::InvalidArgument(format!("top_k {} is too large", k))),
        Some(k) => Err(AppError::InvalidArgument(format!(
            "top_k must be positive, got {}",
            k
        ))),
    }
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Runs the preprocessing pipeline on a raw track record
pub async fn preprocess(
    State(state): State<AppState>,
    Json(input): Json<RawTrackInput>,
) -> AppResult<Json<PreprocessResponse>> {
    let record = RawTrackRecord::try_from(input)?;
    let preprocessed = state.recommender.preprocess(&record)?;

    Ok(Json(PreprocessResponse {
        vector: preprocessed.vector,
        cluster: preprocessed.cluster,
    }))
}

/// Recommends for a seed supplied in the request body
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<Recommendations>> {
    let top_k = resolve_top_k(request.top_k, state.default_top_k)?;

    let recommendations = match (request.track, request.vector) {
        (Some(track), None) => {
            let record = RawTrackRecord::try_from(track)?;
            tracing::info!(
                request_id = %request_id,
                seed_id = %record.metadata.id,
                top_k,
                "Processing recommendation request"
            );
            state.recommender.recommend_record(&record, top_k)?
        }
        (None, Some(vector)) => {
            tracing::info!(
                request_id = %request_id,
                dimension = vector.len(),
                top_k,
                "Processing vector recommendation request"
            );
            state
                .recommender
                .recommend_vector(NormalizedFeatureVector::new(vector), top_k)?
        }
        _ => {
            return Err(AppError::InvalidArgument(
                "Provide exactly one of `track` or `vector`".to_string(),
            ))
        }
    };

    Ok(Json(recommendations))
}

/// Looks the seed up by title (and artist) before recommending
pub async fn recommend_by_query(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<Recommendations>> {
    let top_k = resolve_top_k(params.top_k, state.default_top_k)?;
    let query = TrackQuery::new(params.title, params.artist)?;

    tracing::info!(
        request_id = %request_id,
        query = %query,
        top_k,
        "Processing query recommendation request"
    );

    let recommendations = state.recommender.recommend_for_track(&query, top_k).await?;
    Ok(Json(recommendations))
}
