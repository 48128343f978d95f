//! End-to-end tests of discovery, tracking, and statistics through
//! `AutoRouter`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Extension, Router};
use chrono::Utc;
use tower::ServiceExt;

use auto_router::discovery::{FailureKind, RegistryLoader};
use auto_router::tracking::CompletionHandle;
use auto_router::AutoRouter;

mod common;

async fn call(router: &Router, method: &str, uri: &str) -> StatusCode {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("user-agent", "integration-test")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_partial_failure_keeps_valid_modules() {
    let ws = common::Workspace::new("partial");
    common::write_demo_modules(&ws);

    let auto_router = AutoRouter::initialize(ws.config()).unwrap();
    let result = auto_router.load_result();

    assert!(result.has_errors);
    assert_eq!(
        result.loaded_routes,
        vec!["login.route.toml", "status.route.toml", "index.route.toml"]
    );
    assert_eq!(result.loaded_route_uris.len(), 4);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].kind, FailureKind::Module);
    assert!(result.failures[0].path.ends_with("broken.route.toml"));

    let router = auto_router.router();
    assert_eq!(call(&router, "GET", "/status").await, StatusCode::OK);
    assert_eq!(call(&router, "GET", "/users/42").await, StatusCode::OK);
    assert_eq!(call(&router, "POST", "/auth/login").await, StatusCode::UNAUTHORIZED);

    let trail = std::fs::read_to_string(ws.operational_log()).unwrap();
    assert!(trail.contains("[ERROR] Failed to load route"));
    assert!(trail.contains("[ERROR] Auto router initialization failed"));
    assert!(trail.contains("[SUCCESS] Route loaded successfully"));
}

#[tokio::test]
async fn test_requests_are_tracked_and_reported() {
    let ws = common::Workspace::new("tracked");
    common::write_demo_modules(&ws);

    let auto_router = AutoRouter::initialize(ws.config()).unwrap();
    let router = auto_router.router();

    for _ in 0..3 {
        call(&router, "GET", "/users/1").await;
    }
    call(&router, "GET", "/users/2").await;
    call(&router, "DELETE", "/users/2").await;
    call(&router, "POST", "/auth/login").await;

    let snapshot = auto_router.get_metrics().unwrap();
    assert_eq!(snapshot.summary.total_requests, 6);
    assert_eq!(snapshot.summary.unique_routes, 3);
    assert_eq!(snapshot.routes[0].endpoint, "GET /users/{id}");
    assert_eq!(snapshot.routes[0].total_requests, 4);
    assert_eq!(snapshot.routes[0].unique_visitors, 1);

    let report = auto_router.generate_report().unwrap();
    assert_eq!(report.error_routes.len(), 2);

    let today = Utc::now().date_naive();
    let daily = auto_router.get_daily_report(today).unwrap().unwrap();
    assert_eq!(daily.total_requests, 6);
    assert_eq!(daily.routes["/users/{id}"].count, 5);
    assert_eq!(daily.routes["/users/{id}"].methods["DELETE"], 1);
    assert_eq!(daily.errors.len(), 2);
    assert_eq!(daily.unique_ips, 1);

    let summary = auto_router.get_summary_report(7).unwrap().unwrap();
    assert_eq!(summary.total_requests, 6);
    assert_eq!(summary.error_rate, 33.33);
    assert_eq!(summary.top_routes[0].route, "/users/{id}");

    // Six request lines plus the report line.
    let log = std::fs::read_to_string(ws.metrics_log()).unwrap();
    assert_eq!(log.lines().count(), 7);
    assert_eq!(auto_router.clean_old_logs(30).unwrap().unwrap(), 0);
}

#[tokio::test]
async fn test_metrics_disabled() {
    let ws = common::Workspace::new("disabled");
    common::write_demo_modules(&ws);
    let mut config = ws.config();
    config.enable_metrics = false;

    let auto_router = AutoRouter::initialize(config).unwrap();
    assert_eq!(call(&auto_router.router(), "GET", "/status").await, StatusCode::OK);

    assert!(auto_router.get_metrics().is_none());
    assert!(auto_router.generate_report().is_none());
    assert!(auto_router.get_daily_report(Utc::now().date_naive()).is_none());
    assert!(auto_router.get_summary_report(7).is_none());
    assert!(auto_router.clean_old_logs(30).is_none());
    assert!(auto_router.admin_router().is_none());
    assert!(!ws.metrics_log().exists());
}

#[tokio::test]
async fn test_invalid_config_is_fatal() {
    let ws = common::Workspace::new("invalid");
    let mut config = ws.config();
    config.timeouts.request_secs = 0;

    assert!(AutoRouter::initialize(config).is_err());
}

#[tokio::test]
async fn test_registry_modules_complete_once() {
    let ws = common::Workspace::new("registry");
    ws.write_module("orders/index.route.toml", "");
    ws.write_module("orphan.route.toml", "");

    let loader = RegistryLoader::new(ws.modules()).register("orders/index", || {
        Router::new().route(
            "/orders",
            get(|Extension(handle): Extension<CompletionHandle>| async move {
                handle.complete(StatusCode::OK);
                "queued"
            }),
        )
    });

    let auto_router = AutoRouter::initialize_with(ws.config(), loader).unwrap();
    let result = auto_router.load_result();
    assert!(!result.has_errors);
    assert_eq!(result.loaded_routes, vec!["index.route.toml"]);
    assert_eq!(result.warnings.len(), 1);

    assert_eq!(call(&auto_router.router(), "GET", "/orders").await, StatusCode::OK);

    let snapshot = auto_router.get_metrics().unwrap();
    assert_eq!(snapshot.routes[0].total_requests, 1);
    let log = std::fs::read_to_string(ws.metrics_log()).unwrap();
    assert_eq!(log.lines().count(), 1);
}
