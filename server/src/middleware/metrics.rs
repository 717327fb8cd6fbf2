use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    error::ErrorInternalServerError,
    middleware::Next,
    web,
};

use crate::metrics::Metrics;

/// Times the rest of the chain and records it under the matched route
/// pattern, or the raw path when nothing matched.
pub async fn track_requests(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let metrics = req
        .app_data::<web::Data<Metrics>>()
        .cloned()
        .ok_or_else(|| ErrorInternalServerError("Metrics collector not available"))?;

    let method = req.method().to_string();
    let path = req.path().to_string();

    // Released on drop, including when the client disconnects mid-request.
    let timer = metrics.start_request();
    let result = next.call(req).await;

    let (route, status) = match &result {
        Ok(res) => (
            res.request().match_pattern().unwrap_or(path),
            res.status(),
        ),
        Err(err) => (path, err.as_response_error().status_code()),
    };
    timer.finish(&method, &route, status.as_u16());

    result
}
