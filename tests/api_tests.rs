use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use soundalike::{
    api::{create_router, AppState},
    db::{Catalog, CatalogEntry},
    error::{AppError, AppResult},
    models::{ClusterLabel, NormalizedFeatureVector, RawTrackInput, TrackMetadata},
    services::{
        providers::{TrackQuery, TrackSource},
        ModelBundle, Preprocessor, Recommender, RecommenderSettings,
    },
};

/// tempo is standardized around 120 bpm, mode and explicit pass through
fn bundle() -> ModelBundle {
    ModelBundle::from_value(json!({
        "column_transformer": {
            "columns": [
                {"name": "tempo", "rule": {"standardize": {"mean": 120.0, "scale": 30.0}}},
                {"name": "mode", "rule": "passthrough"},
                {"name": "explicit", "rule": "passthrough"}
            ]
        },
        "k_means": {
            "centroids": [[-1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 1.0]],
            "feature_names": ["tempo", "mode", "explicit"]
        }
    }))
    .unwrap()
}

fn entry(id: &str, name: &str, cluster: usize, vector: Vec<f64>) -> CatalogEntry {
    CatalogEntry {
        metadata: TrackMetadata {
            id: id.to_string(),
            name: name.to_string(),
            album: "Test Album".to_string(),
            album_id: "album".to_string(),
            artists: vec!["Test Artist".to_string()],
            artist_ids: vec!["artist".to_string()],
            track_number: 4,
        },
        vector: NormalizedFeatureVector::new(vector),
        cluster: ClusterLabel(cluster),
    }
}

fn catalog() -> Catalog {
    Catalog::new(
        vec![
            entry("seed", "Seed", 1, vec![1.0, 1.0, 0.0]),
            entry("a", "Close", 1, vec![1.0, 1.0, 0.01]),
            entry("b", "Mid", 1, vec![1.0, 0.5, 0.0]),
            entry("c", "Far", 1, vec![0.0, 1.0, 1.0]),
            entry("d", "Slow", 0, vec![-1.0, 0.0, 0.0]),
        ],
        vec!["tempo".to_string(), "mode".to_string(), "explicit".to_string()],
    )
    .unwrap()
}

fn seed_track() -> Value {
    json!({
        "id": "seed",
        "name": "Seed",
        "album": "Test Album",
        "artists": ["Test Artist"],
        "track_number": 1,
        "disc_number": 1,
        "explicit": false,
        "danceability": 0.5, "energy": 0.5, "key": 2, "loudness": -7.0,
        "mode": 1, "speechiness": 0.05, "acousticness": 0.3,
        "instrumentalness": 0.0, "liveness": 0.1, "valence": 0.6,
        "tempo": 150.0, "duration_ms": 200000, "time_signature": 4,
        "year": "2010", "release_date": "2010-05-05", "popularity": 50
    })
}

struct StubSource {
    track: Option<Value>,
}

#[async_trait::async_trait]
impl TrackSource for StubSource {
    async fn find_track(&self, _query: &TrackQuery) -> AppResult<RawTrackInput> {
        match &self.track {
            Some(track) => Ok(serde_json::from_value(track.clone()).unwrap()),
            None => Err(AppError::SourceUnavailable("rate limited".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

fn create_test_server_with(source: Option<StubSource>) -> TestServer {
    let preprocessor = Preprocessor::from_bundle(bundle()).unwrap();
    let mut recommender = Recommender::new(
        preprocessor,
        Arc::new(catalog()),
        RecommenderSettings::default(),
    )
    .unwrap();
    if let Some(source) = source {
        recommender = recommender.with_source(Arc::new(source));
    }

    let state = AppState::new(Arc::new(recommender), 5);
    TestServer::new(create_router(state)).unwrap()
}

fn create_test_server() -> TestServer {
    create_test_server_with(None)
}

fn names(body: &Value) -> Vec<String> {
    body["tracks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let id = "5f0c8f4e-2b1a-4c3d-9e8f-0a1b2c3d4e5f";
    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static(id),
        )
        .await;
    assert_eq!(response.header("x-request-id"), id);
}

#[tokio::test]
async fn test_malformed_request_id_is_replaced() {
    let server = create_test_server();
    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("not-a-uuid"),
        )
        .await;
    let echoed = response.header("x-request-id");
    assert_ne!(echoed, "not-a-uuid");
    assert!(uuid_like(echoed.to_str().unwrap()));
}

fn uuid_like(value: &str) -> bool {
    value.len() == 36 && value.chars().filter(|c| *c == '-').count() == 4
}

#[tokio::test]
async fn test_preprocess_returns_vector_and_cluster() {
    let server = create_test_server();
    let response = server.post("/api/v1/preprocess").json(&seed_track()).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["vector"], json!([1.0, 1.0, 0.0]));
    assert_eq!(body["cluster"], 1);
}

#[tokio::test]
async fn test_preprocess_missing_key_is_bad_request() {
    let server = create_test_server();
    let mut track = seed_track();
    track.as_object_mut().unwrap().remove("key");

    let response = server.post("/api/v1/preprocess").json(&track).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("key"));
}

#[tokio::test]
async fn test_recommend_for_track_record() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "track": seed_track(), "top_k": 2 }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["cluster"], 1);
    // the seed's own entry is excluded
    assert_eq!(names(&body), vec!["Close", "Mid"]);
    assert_eq!(body["tracks"][0]["album"], "Test Album");
    assert_eq!(body["tracks"][0]["artists"], json!(["Test Artist"]));
    assert_eq!(body["tracks"][0]["track_number"], 4);
}

#[tokio::test]
async fn test_recommend_uses_default_top_k() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "track": seed_track() }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(names(&body), vec!["Close", "Mid", "Far"]);
}

#[tokio::test]
async fn test_recommend_for_vector() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "vector": [-2.0, 0.0, 0.0], "top_k": 3 }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["cluster"], 0);
    assert_eq!(names(&body), vec!["Slow"]);
}

#[tokio::test]
async fn test_recommend_for_empty_cluster() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "vector": [0.0, 1.0, 2.0] }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["cluster"], 2);
    assert!(body["tracks"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_recommend_rejects_non_positive_top_k() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "track": seed_track(), "top_k": 0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "track": seed_track(), "top_k": -1 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommend_requires_exactly_one_seed() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "top_k": 2 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_vector_dimension_mismatch() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "vector": [1.0, 2.0] }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_oversized_vector_is_bad_request() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "vector": [1e200, 0.0, 0.0] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_query_recommendation_via_source() {
    let server = create_test_server_with(Some(StubSource {
        track: Some(seed_track()),
    }));
    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("title", "Seed")
        .add_query_param("top_k", 1)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(names(&body), vec!["Close"]);
}

#[tokio::test]
async fn test_query_source_failure_is_bad_gateway() {
    let server = create_test_server_with(Some(StubSource { track: None }));
    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("title", "Seed")
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_query_without_source_is_bad_gateway() {
    let server = create_test_server();
    let response = server
        .get("/api/v1/recommendations")
        .add_query_param("title", "Seed")
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
}
