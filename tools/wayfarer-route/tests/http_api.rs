use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use wayfarer_common::BuildError;
use wayfarer_route::{build_router, AppState};
use wayfarer_routing::{Engine, EngineConfig, Profile, VecSource};

/// Quay Street running east from (0, 0) for 0.002 degrees, then a footway
/// for another 0.001
fn quay_engine() -> wayfarer_routing::Result<Engine> {
    let mut src = VecSource::default();
    src.node(1, 0.0, 0.0)
        .node(2, 0.0, 0.001)
        .node(3, 0.0, 0.002)
        .node(4, 0.0, 0.003)
        .way(10, &[1, 2, 3], &[("highway", "residential"), ("name", "Quay Street")])
        .way(11, &[3, 4], &[("highway", "footway")]);
    let config = EngineConfig {
        profiles: vec![Profile::Car, Profile::Foot],
        ..Default::default()
    };
    Engine::build(&mut src, config)
}

fn app_with(loader: Arc<wayfarer_route::server::EngineLoader>) -> (Router, AppState) {
    let state = AppState::new(loader, Duration::from_secs(5));
    (build_router(state.clone()), state)
}

fn app() -> Router {
    app_with(Arc::new(quay_engine)).0
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_reports_engine_state() {
    let app = app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["engine"], "uninitialized");

    let (status, body) = get(&app, "/profiles").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profiles"], serde_json::json!(["car", "foot"]));

    let (_, body) = get(&app, "/health").await;
    assert_eq!(body["engine"], "ready");
}

#[tokio::test]
async fn test_resolve() {
    let app = app();
    let (status, body) = get(&app, "/resolve?profile=car&lat=0.0001&lon=0.0005").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["latitude"].as_f64().unwrap().abs() < 1e-7);
    assert!((body["longitude"].as_f64().unwrap() - 0.0005).abs() < 1e-6);

    let (status, _) = get(&app, "/resolve?profile=car&lat=1.0&lon=1.0").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_errors_are_bad_requests() {
    let app = app();
    let (status, body) = get(&app, "/resolve?profile=cra&lat=0.0&lon=0.0005").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cra"));

    let (status, body) = get(&app, "/resolve?profile=bike&lat=0.0&lon=0.0005").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not enabled"));
}

#[tokio::test]
async fn test_route_object_and_geojson() {
    let app = app();
    let uri = "/route?profile=car&from_lat=0.0&from_lon=0.0002&to_lat=0.0&to_lon=0.0017";
    let (status, body) = get(&app, uri).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["profile"], "car");
    // 0.0015 degrees of longitude on the equator
    assert!((body["distance_m"].as_f64().unwrap() - 166.79).abs() < 0.1);
    let instructions = body["instructions"].as_array().unwrap();
    assert_eq!(instructions.first().unwrap()["maneuver"]["type"], "depart");
    assert_eq!(instructions.last().unwrap()["maneuver"]["type"], "arrive");

    let (status, body) = get(&app, &format!("{uri}&geojson=true")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "Feature");
    assert_eq!(body["geometry"]["type"], "LineString");
}

#[tokio::test]
async fn test_route_misses_are_not_found() {
    let app = app();
    let (status, body) = get(
        &app,
        "/route?profile=car&from_lat=5.0&from_lon=5.0&to_lat=0.0&to_lon=0.001",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("start"));

    // Along the footway, which only pedestrians may use
    let (status, _) = get(
        &app,
        "/route?profile=foot&from_lat=0.0&from_lon=0.0005&to_lat=0.0&to_lon=0.0028",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_failed_build_is_unavailable() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let (app, state) = app_with(Arc::new(move || -> wayfarer_routing::Result<Engine> {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(BuildError::NoProfiles.into())
    }));

    let (status, _) = get(&app, "/profiles").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, _) = get(&app, "/resolve?profile=car&lat=0.0&lon=0.0").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(state.status(), wayfarer_routing::GateStatus::Failed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_requests_share_one_build() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let (app, _) = app_with(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        quay_engine()
    }));

    let requests: Vec<_> = (0..8)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                get(&app, "/resolve?profile=foot&lat=0.0&lon=0.0025")
                    .await
                    .0
            })
        })
        .collect();

    for request in requests {
        assert_eq!(request.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}
