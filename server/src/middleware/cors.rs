use actix_cors::Cors;

use crate::{config::AppConfig, csrf::CSRF_HEADERS};

const MAX_AGE_SECS: usize = 3600;

/// Only the configured frontend origin may call the API, with cookies.
pub fn cors(config: &AppConfig) -> Cors {
    let mut allowed_headers = vec!["content-type", "accept"];
    allowed_headers.extend(CSRF_HEADERS);

    Cors::default()
        .allowed_origin(&config.frontend_url)
        .allowed_methods(["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(allowed_headers)
        .supports_credentials()
        .max_age(MAX_AGE_SECS)
}
