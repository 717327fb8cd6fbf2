#![allow(dead_code)]

use actix_web::{cookie::Cookie, dev::ServiceResponse};
use cms_server::{config::AppConfig, csrf::CsrfGuard, db::Database, AppState};

pub async fn test_state() -> AppState {
    test_state_with(AppConfig::default()).await
}

pub async fn test_state_with(config: AppConfig) -> AppState {
    let db = Database::in_memory().await.expect("in-memory database");
    db.initialize().await.expect("initialize store");
    AppState::new(config, db, CsrfGuard::ephemeral(false))
}

pub fn cookie_named<B>(resp: &ServiceResponse<B>, name: &str) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == name)
        .map(|c| c.into_owned())
}

/// GET /api/csrf-token and return the seeded cookie with its token.
macro_rules! fetch_csrf {
    ($app:expr) => {{
        let resp = actix_web::test::call_service(
            &$app,
            actix_web::test::TestRequest::get()
                .uri("/api/csrf-token")
                .to_request(),
        )
        .await;
        assert!(resp.status().is_success());
        let cookie = common::cookie_named(&resp, "_csrf").expect("csrf cookie");
        let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
        let token = body["csrfToken"].as_str().expect("csrfToken").to_string();
        (cookie, token)
    }};
}
