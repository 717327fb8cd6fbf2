use actix_web::{get, web, HttpResponse};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::{db::Database, metrics::Metrics};

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: f64,
}

#[get("/health")]
pub async fn health_check(metrics: web::Data<Metrics>) -> HttpResponse {
    let response = HealthCheckResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: metrics.uptime_seconds(),
    };

    HttpResponse::Ok().json(response)
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub database: String,
}

#[get("/ready")]
pub async fn readiness(db: web::Data<Database>) -> HttpResponse {
    match db.ping().await {
        Ok(()) => HttpResponse::Ok().json(ReadinessResponse {
            status: "ready".to_string(),
            database: "connected".to_string(),
        }),
        Err(err) => {
            log::error!("Readiness check failed: {}", err);
            HttpResponse::ServiceUnavailable().json(ReadinessResponse {
                status: "not ready".to_string(),
                database: "disconnected".to_string(),
            })
        }
    }
}

#[get("/metrics")]
pub async fn metrics_endpoint(metrics: web::Data<Metrics>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(crate::metrics::CONTENT_TYPE)
        .body(metrics.render())
}
