use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::{from_fn, Logger},
    web, App,
};

use crate::{
    config::AppConfig,
    csrf::CsrfGuard,
    db::Database,
    handlers,
    metrics::Metrics,
    middleware::{
        cors, csrf_protection, normalize_errors, parse_csrf_cookie, parse_json_body,
        track_requests, BODY_LIMIT,
    },
};

/// Shared components handed to every worker.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub metrics: Metrics,
    pub csrf: CsrfGuard,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database, csrf: CsrfGuard) -> Self {
        Self {
            config,
            db,
            metrics: Metrics::init(),
            csrf,
        }
    }
}

/// Builds the application with the fixed middleware chain. Actix runs the
/// last `wrap` first, so the stages below read bottom-up:
/// logger, CORS, error normalizer, body parsing, cookie parsing, CSRF,
/// metrics, then routing with the 404 fallback.
pub fn build_app(
    state: &AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state.config.clone()))
        .app_data(web::Data::new(state.db.clone()))
        .app_data(web::Data::new(state.metrics.clone()))
        .app_data(web::Data::new(state.csrf.clone()))
        .app_data(web::PayloadConfig::new(BODY_LIMIT))
        .configure(handlers::configure)
        .default_service(web::to(handlers::not_found))
        .wrap(from_fn(track_requests))
        .wrap(from_fn(csrf_protection))
        .wrap(from_fn(parse_csrf_cookie))
        .wrap(from_fn(parse_json_body))
        .wrap(from_fn(normalize_errors))
        .wrap(cors(&state.config))
        .wrap(Logger::default())
}
