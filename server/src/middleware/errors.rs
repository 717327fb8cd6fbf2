use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    error::InternalError,
    middleware::Next,
    web, HttpResponse,
};

use crate::{
    config::AppConfig,
    error::{AppError, ErrorResponse, GENERIC_ERROR_MESSAGE, INTERNAL_ERROR},
};

/// Rewrites an error into the JSON shape clients expect, or returns `None`
/// when the error already renders that way.
fn normalize(err: &actix_web::Error, production: bool) -> Option<HttpResponse> {
    let status = err.as_response_error().status_code();

    if status.is_server_error() {
        log::error!("Unhandled error ({}): {:?}", status, err);
        let message = if production {
            GENERIC_ERROR_MESSAGE.to_string()
        } else {
            err.to_string()
        };
        return Some(
            HttpResponse::InternalServerError().json(ErrorResponse::new(INTERNAL_ERROR, message)),
        );
    }

    if err.as_error::<AppError>().is_some() {
        return None;
    }

    let label = status.canonical_reason().unwrap_or("Error");
    Some(HttpResponse::build(status).json(ErrorResponse::new(label, err.to_string())))
}

/// Last line of defence: every error leaving the inner stages becomes a
/// structured `{error, message}` body. 5xx detail is hidden in production.
///
/// The request must not be held across `next.call`; routing needs sole
/// ownership of it.
pub async fn normalize_errors(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, actix_web::Error> {
    let production = req
        .app_data::<web::Data<AppConfig>>()
        .map(|config| config.is_production())
        .unwrap_or(true);

    match next.call(req).await {
        Ok(res) => {
            let replacement = res.response().error().and_then(|err| normalize(err, production));
            match replacement {
                Some(response) => {
                    let (http_req, _) = res.into_parts();
                    Ok(ServiceResponse::new(http_req, response))
                }
                None => Ok(res.map_into_boxed_body()),
            }
        }
        Err(err) => match normalize(&err, production) {
            Some(response) => Err(InternalError::from_response(err, response).into()),
            None => Err(err),
        },
    }
}
