//! HTTP surface tests driven through the router without binding a socket

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use microsim_vds::server::{router, AppState};
use microsim_vds::utils::le_bytes_to_f32;
use microsim_vds::{PhantomSimulator, Pipeline, ResultCache, Simulator};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let pipeline = Pipeline::new(Arc::new(PhantomSimulator::new()), Arc::new(ResultCache::default()));
    router(AppState::new(Arc::new(pipeline)), &["*".to_string()])
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, _, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn test_health_and_root() {
    let app = app();
    let (status, _, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&body),
        json!({"status": "ok", "message": "Microsim API is running"})
    );

    let (status, _, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    let root = json_body(&body);
    assert_eq!(root["message"], "Microsim Simulation API");
    assert_eq!(root["docs"], "/docs");
    assert_eq!(root["health"], "/health");
}

#[tokio::test]
async fn test_schema_passthrough() {
    let (status, _, body) = get(&app(), "/schema/simulation").await;
    assert_eq!(status, StatusCode::OK);
    let schema = json_body(&body);
    assert_eq!(schema, PhantomSimulator::new().schema());
}

#[tokio::test]
async fn test_simulate_validation_error() {
    let (status, body) = post_json(&app(), "/simulate", json!({"simulation": {"foo": "bar"}})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Invalid simulation parameters:"));
}

#[tokio::test]
async fn test_simulate_malformed_body() {
    let (status, body) = post_json(&app(), "/simulate", json!({"sim": {}})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_simulate_then_fetch_chunks() {
    let app = app();
    let (status, body) = post_json(
        &app,
        "/simulate",
        json!({"simulation": {"shape": [2, 3, 8, 10]}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shape"], json!([2, 3, 8, 10]));
    assert_eq!(body["dims"], json!(["C", "Z", "Y", "X"]));
    assert_eq!(body["z_slice_used"], 1);
    assert_eq!(body["stats"].as_array().unwrap().len(), 2);
    assert!(!body["preview_png_b64"].as_str().unwrap().is_empty());

    let (status, _, info) = get(&app, "/data/info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&info),
        json!({"shape": [2, 3, 8, 10], "dtype": "float32", "chunks": [2, 3, 8, 10]})
    );

    let (status, headers, bytes) = get(&app, "/data/chunk/1/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(headers[header::CONTENT_LENGTH], "320");
    assert_eq!(le_bytes_to_f32(&bytes).unwrap().len(), 80);

    let (status, _, body) = get(&app, "/data/chunk/2/0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(&body)["detail"],
        "Invalid indices: c=2, z=0 for shape [2, 3, 8, 10]"
    );
}

#[tokio::test]
async fn test_fallback_data_before_simulation() {
    let app = app();
    let (status, _, info) = get(&app, "/data/info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&info)["shape"], json!([2, 4, 64, 64]));

    let (status, headers, _) = get(&app, "/data/chunk/1/3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_LENGTH], (64 * 64 * 4).to_string().as_str());

    let (status, _, _) = get(&app, "/data/chunk/0/4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = get(&app, "/test-data").await;
    assert_eq!(status, StatusCode::OK);
    let summary = json_body(&body);
    assert_eq!(summary["shape"], json!([2, 4, 64, 64]));
    assert_eq!(summary["stats"].as_array().unwrap().len(), 2);
    assert_eq!(summary["zarr"]["data"], json!([]));
}

#[tokio::test]
async fn test_cors_headers() {
    let request = Request::get("/health")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
