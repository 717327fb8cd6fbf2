use std::collections::HashMap;

use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    error::ErrorInternalServerError,
    http::Method,
    middleware::Next,
    web, HttpMessage,
};

use super::body::ParsedBody;
use crate::csrf::{CsrfGuard, CsrfSession, CSRF_BODY_FIELD, CSRF_COOKIE, CSRF_HEADERS};

pub const API_PREFIX: &str = "/api";
pub const TOKEN_ENDPOINT: &str = "/api/csrf-token";

/// Whether the guard applies to this method and path.
pub fn is_protected(method: &Method, path: &str) -> bool {
    let under_api = path == API_PREFIX || path.starts_with("/api/");
    let safe_method = *method == Method::GET || *method == Method::HEAD || *method == Method::OPTIONS;
    under_api && !safe_method && path != TOKEN_ENDPOINT
}

fn csrf_guard(req: &ServiceRequest) -> Result<web::Data<CsrfGuard>, actix_web::Error> {
    req.app_data::<web::Data<CsrfGuard>>()
        .cloned()
        .ok_or_else(|| ErrorInternalServerError("CSRF guard not available"))
}

/// Verifies the `_csrf` cookie and exposes it as a [`CsrfSession`]. A missing
/// or forged cookie is not an error here.
pub async fn parse_csrf_cookie(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let guard = csrf_guard(&req)?;

    let session = req
        .cookie(CSRF_COOKIE)
        .map(|cookie| guard.open_cookie(cookie.value()))
        .unwrap_or_else(CsrfSession::unseeded);

    req.extensions_mut().insert(session);

    next.call(req).await
}

fn supplied_token(req: &ServiceRequest) -> Option<String> {
    for name in CSRF_HEADERS {
        if let Some(value) = req.headers().get(name).and_then(|v| v.to_str().ok()) {
            return Some(value.to_string());
        }
    }

    if let Some(token) = req
        .extensions()
        .get::<ParsedBody>()
        .and_then(|body| body.0.get(CSRF_BODY_FIELD))
        .and_then(|v| v.as_str())
    {
        return Some(token.to_string());
    }

    web::Query::<HashMap<String, String>>::from_query(req.query_string())
        .ok()
        .and_then(|query| query.get(CSRF_BODY_FIELD).cloned())
}

pub async fn csrf_protection(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    if is_protected(req.method(), req.path()) {
        let guard = csrf_guard(&req)?;
        let session = req
            .extensions()
            .get::<CsrfSession>()
            .cloned()
            .unwrap_or_default();
        let token = supplied_token(&req);

        if let Err(err) = guard.validate(&session, token.as_deref()) {
            log::warn!(
                "CSRF validation failed for {} {} (cookie: {}, token: {})",
                req.method(),
                req.path(),
                session.secret.is_some(),
                token.is_some()
            );
            return Err(err.into());
        }
    }

    next.call(req).await
}
