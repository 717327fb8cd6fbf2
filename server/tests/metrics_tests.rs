use actix_web::{http::StatusCode, test};
use cms_server::build_app;
use serde_json::json;

#[macro_use]
mod common;

#[actix_web::test]
async fn test_requests_are_counted_per_route() {
    let state = common::test_state().await;
    let app = test::init_service(build_app(&state)).await;

    for _ in 0..3 {
        let req = test::TestRequest::get().uri("/api/posts").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    assert_eq!(state.metrics.request_count("GET", "/api/posts", 200), 3);
    assert_eq!(state.metrics.active_requests(), 0);

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    let text = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();

    assert!(text.contains(
        "http_requests_total{method=\"GET\",route=\"/api/posts\",status_code=\"200\"} 3"
    ));
    assert!(text.contains(
        "http_request_duration_seconds_count{method=\"GET\",route=\"/api/posts\",status_code=\"200\"} 3"
    ));
    assert!(text.contains("process_start_time_seconds "));
    assert_eq!(state.metrics.active_requests(), 0);
}

#[actix_web::test]
async fn test_route_label_uses_pattern() {
    let state = common::test_state().await;
    let app = test::init_service(build_app(&state)).await;

    for uri in ["/api/users/1", "/api/users/999"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        test::call_service(&app, req).await;
    }

    assert_eq!(state.metrics.request_count("GET", "/api/users/{id}", 200), 1);
    assert_eq!(state.metrics.request_count("GET", "/api/users/{id}", 404), 1);
}

#[actix_web::test]
async fn test_unmatched_requests_use_raw_path() {
    let state = common::test_state().await;
    let app = test::init_service(build_app(&state)).await;

    let req = test::TestRequest::get().uri("/invalid-route").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    assert_eq!(state.metrics.request_count("GET", "/invalid-route", 404), 1);
    assert_eq!(state.metrics.active_requests(), 0);
}

#[actix_web::test]
async fn test_error_responses_are_counted() {
    let state = common::test_state().await;
    let app = test::init_service(build_app(&state)).await;
    let (cookie, token) = fetch_csrf!(app);

    let req = test::TestRequest::post()
        .uri("/api/users")
        .cookie(cookie)
        .insert_header(("csrf-token", token.as_str()))
        .set_json(json!({ "username": "incomplete" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(state.metrics.request_count("POST", "/api/users", 400), 1);
    assert_eq!(state.metrics.active_requests(), 0);
}

#[actix_web::test]
async fn test_apps_with_separate_state_do_not_share_metrics() {
    let first = common::test_state().await;
    let second = common::test_state().await;
    let app = test::init_service(build_app(&first)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    test::call_service(&app, req).await;

    assert_eq!(first.metrics.request_count("GET", "/health", 200), 1);
    assert_eq!(second.metrics.request_count("GET", "/health", 200), 0);
}
