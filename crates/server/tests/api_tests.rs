//! API integration tests.
//!
//! Each test trains a small forest on the sample extract, writes the
//! artifacts to a temp dir and drives the router with `oneshot`.

use std::path::{Path, PathBuf};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use forest::{Algo, ClassificationModel, ForestParams, RegressionModel};
use pipeline::{ArtifactStore, BinMode, ModelMode, TrainingConfig, train_classification, train_regression};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use server::{AppState, ServerConfig, create_router};

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../data-loader/tests/fixtures/movie_metadata_sample.csv")
}

fn small_forest() -> ForestParams {
    ForestParams {
        n_trees: 10,
        ..ForestParams::default()
    }
}

fn write_regression_artifacts(dir: &Path, algo: Algo) {
    let dataset = data_loader::load_movies(sample_path()).unwrap();
    let config = TrainingConfig {
        algo: algo.to_string(),
        ..TrainingConfig::default()
    };
    let trained = train_regression(&dataset, &config, RegressionModel::new(algo, small_forest())).unwrap();
    ArtifactStore::open(dir)
        .save(&trained.pipeline, &trained.metadata, &trained.metrics)
        .unwrap();
}

fn write_classification_artifacts(dir: &Path) {
    let dataset = data_loader::load_movies(sample_path()).unwrap();
    let config = TrainingConfig {
        mode: ModelMode::Multiclass,
        bin_mode: BinMode::Fixed,
        ..TrainingConfig::default()
    };
    let model = ClassificationModel::new(Algo::RandomForest, small_forest());
    let trained = train_classification(&dataset, &config, model).unwrap();
    ArtifactStore::open(dir)
        .save(&trained.pipeline, &trained.metadata, &trained.metrics)
        .unwrap();
}

const ADMIN_TOKEN: &str = "test-admin-token";

fn server_config(dir: &Path, mode: ModelMode) -> ServerConfig {
    ServerConfig {
        artifacts_dir: dir.to_path_buf(),
        mode,
        admin_token: Some(ADMIN_TOKEN.to_string()),
        ..ServerConfig::default()
    }
}

fn regression_app() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    write_regression_artifacts(dir.path(), Algo::RandomForest);
    let state = AppState::load(server_config(dir.path(), ModelMode::Regression)).unwrap();
    (dir, create_router(state))
}

fn predict_body(content_rating: &str, genres: &[&str]) -> Value {
    json!({
        "duration": 120,
        "budget": 50_000_000,
        "title_year": 2015,
        "genres": genres,
        "content_rating": content_rating,
    })
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn post_admin(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, app) = regression_app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "mode": "REGRESSION" }));
}

#[tokio::test]
async fn test_predict_known_rating() {
    let (_dir, app) = regression_app();
    let (status, body) = post(&app, "/predict", predict_body("PG-13", &["Action", "Drama"])).await;
    assert_eq!(status, StatusCode::OK);

    let score = body["predicted_score"].as_f64().unwrap();
    let confidence = body["confidence"].as_f64().unwrap();
    assert!((0.0..=10.0).contains(&score));
    assert!((0.0..=1.0).contains(&confidence));
    assert!(body["explanation"].as_str().unwrap().contains("genres (multi-hot)"));
}

#[tokio::test]
async fn test_predict_unknown_rating_is_rejected() {
    let (_dir, app) = regression_app();
    let (status, body) = post(&app, "/predict", predict_body("XXX-UNKNOWN", &["Action"])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("XXX-UNKNOWN"));
}

#[tokio::test]
async fn test_predict_without_genres() {
    let (_dir, app) = regression_app();
    let (status, body) = post(&app, "/predict", predict_body("PG-13", &[])).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["predicted_score"].is_number());
}

#[tokio::test]
async fn test_predict_out_of_bounds() {
    let (_dir, app) = regression_app();
    let mut body = predict_body("PG-13", &["Action"]);
    body["duration"] = json!(0);
    let (status, _) = post(&app, "/predict", body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let mut body = predict_body("PG-13", &["Action"]);
    body["title_year"] = json!(1850);
    let (status, _) = post(&app, "/predict", body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_predict_missing_field() {
    let (_dir, app) = regression_app();
    let body = json!({ "duration": 120, "budget": 0, "genres": [], "content_rating": "PG-13" });
    let (status, _) = post(&app, "/predict", body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_meta_endpoint() {
    let (dir, app) = regression_app();
    let metadata = ArtifactStore::open(dir.path())
        .load_metadata(ModelMode::Regression)
        .unwrap();

    let (status, body) = get(&app, "/meta").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "REGRESSION");
    assert_eq!(body["genres_vocab"], json!(metadata.genres_vocab));
    assert_eq!(body["allowed_content_ratings"], json!(metadata.sorted_content_ratings()));
    assert!(body["numeric_ranges"]["duration"].is_array());
    assert!(body["observed_score_range"].is_array());
    assert_eq!(body["metrics"]["n_train"].as_u64().unwrap() + body["metrics"]["n_valid"].as_u64().unwrap(), 23);
}

#[tokio::test]
async fn test_reload_swaps_model() {
    let dir = TempDir::new().unwrap();
    write_regression_artifacts(dir.path(), Algo::RandomForest);
    let state = AppState::load(server_config(dir.path(), ModelMode::Regression)).unwrap();
    let app = create_router(state.clone());
    assert_eq!(state.model().metadata().algo, "random_forest");

    // retrain a single tree in place of the forest
    write_regression_artifacts(dir.path(), Algo::DecisionTree);
    let (status, body) = post_admin(&app, "/admin/reload", Some(ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "reloaded");

    assert_eq!(state.model().metadata().algo, "decision_tree");

    // a single tree exposes no member predictions
    let (status, body) = post(&app, "/predict", predict_body("PG-13", &["Drama"])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["confidence"], json!(0.5));
}

#[tokio::test]
async fn test_failed_reload_keeps_serving() {
    let (dir, app) = regression_app();
    let paths = ArtifactStore::open(dir.path()).paths(ModelMode::Regression);
    std::fs::write(&paths.model, "{ not json").unwrap();

    let (status, body) = post_admin(&app, "/admin/reload", Some(ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["detail"].is_string());

    let (status, _) = post(&app, "/predict", predict_body("PG-13", &["Action"])).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reload_requires_admin_token() {
    let (_dir, app) = regression_app();

    let (status, _) = post_admin(&app, "/admin/reload", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = post_admin(&app, "/admin/reload", Some("wrong")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_reload_not_mounted_without_admin_token() {
    let dir = TempDir::new().unwrap();
    write_regression_artifacts(dir.path(), Algo::RandomForest);
    let config = ServerConfig {
        admin_token: None,
        ..server_config(dir.path(), ModelMode::Regression)
    };
    let app = create_router(AppState::load(config).unwrap());

    let (status, _) = post_admin(&app, "/admin/reload", Some(ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_classification_server() {
    let dir = TempDir::new().unwrap();
    write_classification_artifacts(dir.path());
    let state = AppState::load(server_config(dir.path(), ModelMode::Multiclass)).unwrap();
    let app = create_router(state);

    let (status, body) = get(&app, "/meta").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "MULTICLASS");
    let labels: Vec<String> = serde_json::from_value(body["class_labels"].clone()).unwrap();
    assert_eq!(labels.len(), 5);
    assert!(body.get("observed_score_range").is_none());

    let (status, body) = post(&app, "/predict", predict_body("PG-13", &["Action", "Drama"])).await;
    assert_eq!(status, StatusCode::OK);
    let predicted = body["predicted_class"].as_str().unwrap();
    assert!(labels.iter().any(|l| l == predicted));

    let probabilities = body["class_probabilities"].as_object().unwrap();
    assert_eq!(probabilities.len(), labels.len());
    let total: f64 = probabilities.values().map(|p| p.as_f64().unwrap()).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn test_missing_artifacts_refuse_to_load() {
    let dir = TempDir::new().unwrap();
    assert!(AppState::load(server_config(dir.path(), ModelMode::Regression)).is_err());
    assert!(AppState::load(server_config(dir.path(), ModelMode::Multiclass)).is_err());
}
